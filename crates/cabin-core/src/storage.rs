use std::collections::HashSet;

use cabin_domain::{Home, LedgerScope, NewUsage, Usage, UsageId};

use crate::CoreError;

/// Abstraction over the persistence collaborator that owns homes and usage records.
///
/// Implementations assign usage ids, cascade usage deletion when a home is
/// removed, and perform completion as a compare-and-set: when the stored record
/// is already completed, [`UsageStore::save_completion`] must fail with a
/// conflict instead of overwriting the final reading.
pub trait UsageStore: Send + Sync {
    /// Homes ordered by number.
    fn list_homes(&self) -> Result<Vec<Home>, CoreError>;
    fn get_home(&self, number: &str) -> Result<Home, CoreError>;
    fn create_home(&self, home: Home) -> Result<Home, CoreError>;
    fn delete_home(&self, number: &str) -> Result<(), CoreError>;

    /// Usage records inside `scope`, newest reading date first.
    fn list_usages(&self, scope: &LedgerScope) -> Result<Vec<Usage>, CoreError>;
    fn get_usage(&self, id: UsageId) -> Result<Usage, CoreError>;
    fn insert_usage(&self, draft: NewUsage) -> Result<Usage, CoreError>;
    fn save_completion(&self, completed: &Usage) -> Result<Usage, CoreError>;
    fn delete_usage(&self, id: UsageId) -> Result<(), CoreError>;
}

/// Detects usage records that reference homes missing from the snapshot.
pub fn orphan_warnings(homes: &[Home], usages: &[Usage]) -> Vec<String> {
    let known: HashSet<&str> = homes.iter().map(|home| home.number.as_str()).collect();
    usages
        .iter()
        .filter(|usage| !known.contains(usage.home_number.as_str()))
        .map(|usage| {
            format!(
                "usage {} references unknown home {}",
                usage.id, usage.home_number
            )
        })
        .collect()
}
