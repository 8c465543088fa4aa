use thiserror::Error;

/// Money is represented as integer cents to avoid floating-point drift in balances.
/// 1 unit = 100 cents, so 50.00 = 5000 cents.
pub type Cents = i64;

/// Interest rate applied by a plain `interest` run (2.5%).
pub const DEFAULT_INTEREST_RATE: f64 = 0.025;

/// Format cents as a human-readable amount.
/// Example: 5000 -> "50.00", -1234 -> "-12.34"
pub fn format_cents(cents: Cents) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs_cents = cents.unsigned_abs();
    let units = abs_cents / 100;
    let remainder = abs_cents % 100;
    format!("{}{}.{:02}", sign, units, remainder)
}

/// Parse a decimal string into cents.
/// Example: "50.00" -> 5000, "12.5" -> 1250, "100" -> 10000
///
/// At most one leading `-` is accepted and at least one digit is required.
/// Amounts that do not fit in `Cents` are rejected.
pub fn parse_cents(input: &str) -> Result<Cents, ParseCentsError> {
    let input = input.trim();
    let (negative, input) = match input.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, input),
    };

    let (units, decimals) = match input.split_once('.') {
        Some((units, decimals)) => (units, decimals),
        None => (input, ""),
    };
    if units.is_empty() && decimals.is_empty() {
        return Err(ParseCentsError::InvalidFormat);
    }
    if !is_digits(units) || !is_digits(decimals) {
        return Err(ParseCentsError::InvalidFormat);
    }

    let units: Cents = if units.is_empty() {
        0
    } else {
        units.parse().map_err(|_| ParseCentsError::InvalidFormat)?
    };
    // Pad or truncate the fractional part to two digits
    let decimal_cents: Cents = decimals
        .bytes()
        .chain(std::iter::repeat(b'0'))
        .take(2)
        .fold(0, |acc, b| acc * 10 + Cents::from(b - b'0'));

    let cents = units
        .checked_mul(100)
        .and_then(|c| c.checked_add(decimal_cents))
        .ok_or(ParseCentsError::InvalidFormat)?;

    Ok(if negative { -cents } else { cents })
}

fn is_digits(s: &str) -> bool {
    s.bytes().all(|b| b.is_ascii_digit())
}

/// Convert an amount in currency units (as carried by JSON numbers) to cents,
/// rounding to the nearest cent. Returns `None` for NaN, infinities and values
/// that do not fit.
pub fn cents_from_units(units: f64) -> Option<Cents> {
    let cents = (units * 100.0).round();
    if cents.is_finite() && cents.abs() < i64::MAX as f64 {
        Some(cents as Cents)
    } else {
        None
    }
}

/// Convert cents back to currency units for JSON output.
pub fn cents_to_units(cents: Cents) -> f64 {
    cents as f64 / 100.0
}

/// Interest earned by `balance` at `rate`, rounded to the nearest cent.
/// Negative balances earn negative interest.
pub fn interest_on(balance: Cents, rate: f64) -> Cents {
    (balance as f64 * rate).round() as Cents
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseCentsError {
    #[error("invalid money format")]
    InvalidFormat,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_cents() {
        assert_eq!(format_cents(15000), "150.00");
        assert_eq!(format_cents(1234), "12.34");
        assert_eq!(format_cents(1), "0.01");
        assert_eq!(format_cents(0), "0.00");
        assert_eq!(format_cents(-5000), "-50.00");
        assert_eq!(format_cents(-1), "-0.01");
    }

    #[test]
    fn test_parse_cents() {
        assert_eq!(parse_cents("50.00"), Ok(5000));
        assert_eq!(parse_cents("50"), Ok(5000));
        assert_eq!(parse_cents("12.5"), Ok(1250));
        assert_eq!(parse_cents(".50"), Ok(50));
        assert_eq!(parse_cents("-50.00"), Ok(-5000));
        assert_eq!(parse_cents("100.999"), Ok(10099)); // Truncates
        assert_eq!(parse_cents("7."), Ok(700));
        assert_eq!(parse_cents(" 3.1 "), Ok(310));
    }

    #[test]
    fn test_parse_cents_invalid() {
        assert!(parse_cents("abc").is_err());
        assert!(parse_cents("12.34.56").is_err());
        assert!(parse_cents("1.x").is_err());
        assert!(parse_cents("").is_err());
        assert!(parse_cents(".").is_err());
        assert!(parse_cents("-").is_err());
        assert!(parse_cents("--5").is_err());
        assert!(parse_cents("+5").is_err());
    }

    #[test]
    fn test_parse_cents_out_of_range() {
        assert_eq!(parse_cents("99999999999999999"), Err(ParseCentsError::InvalidFormat));
        assert_eq!(parse_cents("-99999999999999999"), Err(ParseCentsError::InvalidFormat));
        assert_eq!(parse_cents("92233720368547758.08"), Err(ParseCentsError::InvalidFormat));
        assert_eq!(parse_cents("92233720368547758.07"), Ok(i64::MAX));
        assert!(parse_cents("99999999999999999999999").is_err());
    }

    #[test]
    fn test_format_cents_extremes() {
        assert_eq!(format_cents(i64::MAX), "92233720368547758.07");
        assert_eq!(format_cents(i64::MIN), "-92233720368547758.08");
    }

    #[test]
    fn test_units_conversion() {
        assert_eq!(cents_from_units(50.0), Some(5000));
        assert_eq!(cents_from_units(12.5), Some(1250));
        assert_eq!(cents_from_units(0.1 + 0.2), Some(30));
        assert_eq!(cents_from_units(-3.0), Some(-300));
        assert_eq!(cents_from_units(f64::NAN), None);
        assert_eq!(cents_from_units(f64::INFINITY), None);
        assert_eq!(cents_to_units(102500), 1025.0);
    }

    #[test]
    fn test_interest_on() {
        assert_eq!(interest_on(100000, DEFAULT_INTEREST_RATE), 2500);
        assert_eq!(interest_on(0, DEFAULT_INTEREST_RATE), 0);
        // 0.25 cents rounds to nothing
        assert_eq!(interest_on(10, DEFAULT_INTEREST_RATE), 0);
        // 1.25 cents rounds down to 1
        assert_eq!(interest_on(50, DEFAULT_INTEREST_RATE), 1);
        assert_eq!(interest_on(-100000, DEFAULT_INTEREST_RATE), -2500);
    }
}
