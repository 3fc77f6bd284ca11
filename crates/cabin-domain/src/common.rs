//! Shared traits, identifiers, and scopes for usage records.

use std::{fmt, num::ParseIntError, str::FromStr};

use serde::{Deserialize, Serialize};

/// Identifier assigned to a usage record by the persistence layer.
///
/// Identifiers grow monotonically, so a larger id always denotes a record
/// created later.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct UsageId(pub u64);

impl UsageId {
    pub fn next(self) -> UsageId {
        UsageId(self.0 + 1)
    }
}

impl fmt::Display for UsageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for UsageId {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().trim_start_matches('#').parse::<u64>().map(UsageId)
    }
}

impl From<u64> for UsageId {
    fn from(value: u64) -> Self {
        UsageId(value)
    }
}

/// Converts an entity into a user-facing display label.
pub trait Displayable {
    fn display_label(&self) -> String;
}

/// Selects which usage records a ledger view or query covers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LedgerScope {
    /// Records of a single home, by home number.
    Home(String),
    /// Every record across the property.
    Property,
}

impl LedgerScope {
    pub fn home(number: impl Into<String>) -> Self {
        LedgerScope::Home(number.into())
    }

    /// Returns true when a record belonging to `home_number` falls inside this scope.
    pub fn includes(&self, home_number: &str) -> bool {
        match self {
            LedgerScope::Home(number) => number == home_number,
            LedgerScope::Property => true,
        }
    }

    pub fn home_number(&self) -> Option<&str> {
        match self {
            LedgerScope::Home(number) => Some(number.as_str()),
            LedgerScope::Property => None,
        }
    }
}

impl fmt::Display for LedgerScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LedgerScope::Home(number) => write!(f, "home {number}"),
            LedgerScope::Property => f.write_str("property"),
        }
    }
}
