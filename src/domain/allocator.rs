//! Sequential customer ID allocation.
//!
//! A customer ID is the group prefix followed by a zero-padded number, four
//! characters in total while the number fits: `AB01`, `XYZ1`, `DM07`.
//! The next number is derived from the greatest existing ID for the prefix,
//! compared as a string. Padding stops working once the number outgrows its
//! width (`XYZ10` sorts before `XYZ9`), at which point the same ID is computed
//! again and the insert is rejected by the store.

use thiserror::Error;

use super::{Group, DEFAULT_PREFIX};

/// Total width of a freshly padded customer ID.
pub const ID_WIDTH: usize = 4;

/// Prefix for customers of `group`, or the default prefix when there is none.
pub fn id_prefix(group: Option<&Group>) -> &str {
    group.map(|g| g.acronym.as_str()).unwrap_or(DEFAULT_PREFIX)
}

/// Number of digits the numeric suffix is padded to for `prefix`.
pub fn suffix_width(prefix: &str) -> usize {
    ID_WIDTH.saturating_sub(prefix.chars().count())
}

/// Compute the ID that follows `last_id` under `prefix`.
///
/// `last_id` is the greatest existing ID for the prefix, if any.
pub fn next_customer_id(prefix: &str, last_id: Option<&str>) -> Result<String, AllocationError> {
    let next = match last_id {
        Some(last) => {
            let suffix = last
                .strip_prefix(prefix)
                .ok_or_else(|| AllocationError::ForeignPrefix {
                    prefix: prefix.to_string(),
                    id: last.to_string(),
                })?;
            let number: u64 = suffix.parse().map_err(|_| AllocationError::BadSuffix {
                id: last.to_string(),
            })?;
            number
                .checked_add(1)
                .ok_or_else(|| AllocationError::Exhausted { id: last.to_string() })?
        }
        None => 1,
    };

    Ok(format!(
        "{}{:0width$}",
        prefix,
        next,
        width = suffix_width(prefix)
    ))
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AllocationError {
    /// The supplied ID does not start with the prefix being allocated.
    #[error("customer ID {id} does not start with prefix {prefix}")]
    ForeignPrefix { prefix: String, id: String },

    /// The part after the prefix is not a number.
    #[error("customer ID {id} has a non-numeric suffix")]
    BadSuffix { id: String },

    /// The next number no longer fits.
    #[error("customer ID {id} has no successor")]
    Exhausted { id: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group(acronym: &str) -> Group {
        Group {
            id: 1,
            name: format!("{} group", acronym),
            acronym: acronym.to_string(),
        }
    }

    #[test]
    fn test_prefix_falls_back_to_default() {
        assert_eq!(id_prefix(None), "DM");
        let g = group("AB");
        assert_eq!(id_prefix(Some(&g)), "AB");
    }

    #[test]
    fn test_first_id_for_two_letter_prefix() {
        assert_eq!(next_customer_id("AB", None).unwrap(), "AB01");
    }

    #[test]
    fn test_first_id_for_three_letter_prefix() {
        assert_eq!(next_customer_id("XYZ", None).unwrap(), "XYZ1");
    }

    #[test]
    fn test_increments_last_id() {
        assert_eq!(next_customer_id("AB", Some("AB01")).unwrap(), "AB02");
        assert_eq!(next_customer_id("DM", Some("DM09")).unwrap(), "DM10");
        assert_eq!(next_customer_id("XYZ", Some("XYZ8")).unwrap(), "XYZ9");
    }

    #[test]
    fn test_suffix_outgrows_its_width() {
        assert_eq!(next_customer_id("XYZ", Some("XYZ9")).unwrap(), "XYZ10");
        assert_eq!(next_customer_id("AB", Some("AB99")).unwrap(), "AB100");
    }

    #[test]
    fn test_lexicographic_maximum_repeats_after_overflow() {
        // Once XYZ10 exists the string maximum is still XYZ9, so the
        // allocator proposes XYZ10 again.
        let mut ids = vec!["XYZ9", "XYZ10", "XYZ1"];
        ids.sort();
        let last = ids.last().copied();
        assert_eq!(last, Some("XYZ9"));
        assert_eq!(next_customer_id("XYZ", last).unwrap(), "XYZ10");
    }

    #[test]
    fn test_rejects_malformed_last_id() {
        assert!(matches!(
            next_customer_id("AB", Some("ABxx")),
            Err(AllocationError::BadSuffix { .. })
        ));
        assert!(matches!(
            next_customer_id("AB", Some("CD01")),
            Err(AllocationError::ForeignPrefix { .. })
        ));
    }

    #[test]
    fn test_error_messages() {
        let err = next_customer_id("AB", Some("ABxx")).unwrap_err();
        assert_eq!(err.to_string(), "customer ID ABxx has a non-numeric suffix");

        let last = format!("AB{}", u64::MAX);
        let err = next_customer_id("AB", Some(&last)).unwrap_err();
        assert!(matches!(err, AllocationError::Exhausted { .. }));
    }

    #[test]
    fn test_suffix_width() {
        assert_eq!(suffix_width("DM"), 2);
        assert_eq!(suffix_width("XYZ"), 1);
        assert_eq!(suffix_width("ABCDE"), 0);
    }
}
