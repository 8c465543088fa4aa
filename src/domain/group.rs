use serde::{Deserialize, Serialize};

pub type GroupId = i64;

/// Shortest and longest acronym a group may be registered with.
pub const ACRONYM_MIN_LEN: usize = 2;
pub const ACRONYM_MAX_LEN: usize = 3;

/// A named customer segment. Its acronym doubles as the ID prefix of every
/// customer registered in the group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub name: String,
    pub acronym: String,
}

/// A group that has passed validation but has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewGroup {
    pub name: String,
    pub acronym: String,
}

impl NewGroup {
    /// Validate the raw input and normalize the acronym to upper case.
    /// Returns `None` if the name is blank or the acronym is not 2-3 characters.
    pub fn parse(name: &str, acronym: &str) -> Option<Self> {
        let name = name.trim();
        let acronym = normalize_acronym(acronym);
        let len = acronym.chars().count();

        if name.is_empty() || !(ACRONYM_MIN_LEN..=ACRONYM_MAX_LEN).contains(&len) {
            return None;
        }

        Some(Self {
            name: name.to_string(),
            acronym,
        })
    }
}

/// Acronyms are stored and compared upper-cased.
pub fn normalize_acronym(acronym: &str) -> String {
    acronym.trim().to_uppercase()
}
