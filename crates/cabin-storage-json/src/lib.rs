//! cabin-storage-json
//!
//! File-backed collaborator for homes and usage records, stored as one JSON document.

use std::{
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
    sync::{Mutex, MutexGuard},
};

use cabin_core::{
    storage::{orphan_warnings, UsageStore},
    ConflictError, CoreError, NotFoundError, UsageLedger,
};
use cabin_domain::{Home, LedgerScope, NewUsage, Usage, UsageId};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

const TMP_SUFFIX: &str = "tmp";

/// On-disk layout of the store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreDocument {
    #[serde(default)]
    pub homes: Vec<Home>,
    #[serde(default)]
    pub usages: Vec<Usage>,
    /// Last id handed out; the next record receives `next_id + 1`.
    #[serde(default)]
    pub next_id: u64,
}

impl StoreDocument {
    fn allocate_id(&mut self) -> UsageId {
        let floor = self.usages.iter().map(|usage| usage.id.0).max().unwrap_or(0);
        let id = UsageId(self.next_id.max(floor)).next();
        self.next_id = id.0;
        id
    }

    fn has_home(&self, number: &str) -> bool {
        self.homes.iter().any(|home| home.number == number)
    }
}

/// JSON persistence for homes and usage records.
///
/// Every mutation is a read-modify-write of the whole document under a mutex,
/// written to a temporary file and renamed into place.
pub struct JsonUsageStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonUsageStore {
    pub fn new(path: PathBuf) -> Result<Self, CoreError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(Self {
            path,
            lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Full document snapshot.
    pub fn snapshot(&self) -> Result<StoreDocument, CoreError> {
        let _guard = self.guard()?;
        load_document(&self.path)
    }

    /// Dangling references and cached-field drift found in the stored document.
    pub fn warnings(&self) -> Result<Vec<String>, CoreError> {
        let document = self.snapshot()?;
        let mut warnings = orphan_warnings(&document.homes, &document.usages);
        warnings.extend(UsageLedger::drift_warnings(&document.usages));
        Ok(warnings)
    }

    /// Seeds demo homes and stays into an empty store. Returns whether anything was written.
    pub fn seed_sample_data(&self) -> Result<bool, CoreError> {
        let _guard = self.guard()?;
        let mut document = load_document(&self.path)?;
        if !document.homes.is_empty() {
            return Ok(false);
        }
        document.homes = ["1", "2", "3"].into_iter().map(Home::new).collect();

        let finished = NewUsage::open(
            "1",
            "Jan Kowalski",
            1000.0,
            0.75,
            sample_day(2, 25),
            sample_day(3, 1),
        )
        .with_final_reading(1050.0)
        .with_date(sample_day(3, 1));
        let ongoing = NewUsage::open(
            "1",
            "Anna Nowak",
            1050.0,
            0.75,
            sample_day(3, 10),
            sample_day(3, 15),
        );
        for draft in [finished, ongoing] {
            let id = document.allocate_id();
            document.usages.push(Usage::from_draft(id, draft));
        }
        save_document(&self.path, &document)?;
        info!(path = %self.path.display(), "sample data seeded");
        Ok(true)
    }

    fn guard(&self) -> Result<MutexGuard<'_, ()>, CoreError> {
        self.lock
            .lock()
            .map_err(|_| CoreError::Storage("usage store lock poisoned".into()))
    }

    fn mutate<T>(
        &self,
        change: impl FnOnce(&mut StoreDocument) -> Result<T, CoreError>,
    ) -> Result<T, CoreError> {
        let _guard = self.guard()?;
        let mut document = load_document(&self.path)?;
        let outcome = change(&mut document)?;
        save_document(&self.path, &document)?;
        Ok(outcome)
    }
}

impl UsageStore for JsonUsageStore {
    fn list_homes(&self) -> Result<Vec<Home>, CoreError> {
        let mut homes = self.snapshot()?.homes;
        homes.sort();
        Ok(homes)
    }

    fn get_home(&self, number: &str) -> Result<Home, CoreError> {
        self.snapshot()?
            .homes
            .into_iter()
            .find(|home| home.number == number)
            .ok_or_else(|| NotFoundError::Home(number.to_string()).into())
    }

    fn create_home(&self, home: Home) -> Result<Home, CoreError> {
        self.mutate(|document| {
            if document.has_home(&home.number) {
                return Err(ConflictError::DuplicateHome(home.number.clone()).into());
            }
            document.homes.push(home.clone());
            info!(home = %home.number, "home stored");
            Ok(home)
        })
    }

    fn delete_home(&self, number: &str) -> Result<(), CoreError> {
        self.mutate(|document| {
            if !document.has_home(number) {
                return Err(NotFoundError::Home(number.to_string()).into());
            }
            document.homes.retain(|home| home.number != number);
            let before = document.usages.len();
            document.usages.retain(|usage| usage.home_number != number);
            info!(
                home = %number,
                cascaded = before - document.usages.len(),
                "home deleted with its usage records"
            );
            Ok(())
        })
    }

    fn list_usages(&self, scope: &LedgerScope) -> Result<Vec<Usage>, CoreError> {
        let mut usages: Vec<Usage> = self
            .snapshot()?
            .usages
            .into_iter()
            .filter(|usage| scope.includes(&usage.home_number))
            .map(|usage| UsageLedger::normalize(&usage))
            .collect();
        usages.sort_by(|a, b| b.date.cmp(&a.date).then(a.id.cmp(&b.id)));
        debug!(%scope, count = usages.len(), "usages listed");
        Ok(usages)
    }

    fn get_usage(&self, id: UsageId) -> Result<Usage, CoreError> {
        self.snapshot()?
            .usages
            .iter()
            .find(|usage| usage.id == id)
            .map(UsageLedger::normalize)
            .ok_or_else(|| NotFoundError::Usage(id).into())
    }

    fn insert_usage(&self, draft: NewUsage) -> Result<Usage, CoreError> {
        self.mutate(|document| {
            if !document.has_home(&draft.home_number) {
                return Err(NotFoundError::Home(draft.home_number.clone()).into());
            }
            let id = document.allocate_id();
            let usage = Usage::from_draft(id, draft);
            document.usages.push(usage.clone());
            info!(usage = %usage.id, home = %usage.home_number, "usage stored");
            Ok(usage)
        })
    }

    fn save_completion(&self, completed: &Usage) -> Result<Usage, CoreError> {
        self.mutate(|document| {
            let stored = document
                .usages
                .iter_mut()
                .find(|usage| usage.id == completed.id)
                .ok_or(NotFoundError::Usage(completed.id))?;
            if stored.final_reading.is_some() {
                return Err(ConflictError::AlreadyCompleted(completed.id).into());
            }
            stored.final_reading = completed.final_reading;
            stored.date = completed.date;
            stored.refresh_derived();
            info!(usage = %stored.id, "usage completion stored");
            Ok(stored.clone())
        })
    }

    fn delete_usage(&self, id: UsageId) -> Result<(), CoreError> {
        self.mutate(|document| {
            let before = document.usages.len();
            document.usages.retain(|usage| usage.id != id);
            if document.usages.len() == before {
                return Err(NotFoundError::Usage(id).into());
            }
            info!(usage = %id, "usage deleted");
            Ok(())
        })
    }
}

/// Loads a store document; a missing file is an empty store.
pub fn load_document(path: &Path) -> Result<StoreDocument, CoreError> {
    if !path.exists() {
        return Ok(StoreDocument::default());
    }
    let data = fs::read_to_string(path)?;
    serde_json::from_str(&data).map_err(|err| CoreError::Serde(err.to_string()))
}

/// Saves a store document atomically.
pub fn save_document(path: &Path, document: &StoreDocument) -> Result<(), CoreError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json =
        serde_json::to_string_pretty(document).map_err(|err| CoreError::Serde(err.to_string()))?;
    let tmp = tmp_path(path);
    write_atomic(&tmp, &json)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

fn sample_day(month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, month, day).unwrap_or_default()
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp = path.to_path_buf();
    let ext = match path.extension().and_then(|ext| ext.to_str()) {
        Some(existing) => format!("{}.{}", existing, TMP_SUFFIX),
        None => TMP_SUFFIX.to_string(),
    };
    tmp.set_extension(ext);
    tmp
}

fn write_atomic(path: &Path, data: &str) -> Result<(), CoreError> {
    let mut file = File::create(path)?;
    file.write_all(data.as_bytes())?;
    file.flush()?;
    Ok(())
}
