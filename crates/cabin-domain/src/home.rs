//! Rental cabin model.

use serde::{Deserialize, Serialize};

use crate::common::Displayable;

/// A rental cabin, identified only by its human-assigned number (e.g. `"1"`, `"5a"`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Home {
    pub number: String,
}

impl Home {
    pub fn new(number: impl Into<String>) -> Self {
        Self {
            number: number.into().trim().to_string(),
        }
    }
}

impl Displayable for Home {
    fn display_label(&self) -> String {
        format!("Home {}", self.number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_trims_number() {
        let home = Home::new("  5a ");
        assert_eq!(home.number, "5a");
        assert_eq!(home.display_label(), "Home 5a");
    }
}
