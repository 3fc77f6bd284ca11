#![allow(dead_code)]

use std::{path::PathBuf, sync::Arc, sync::Mutex};

use assert_cmd::Command;
use cabin_core::{time::FixedClock, UsageService};
use cabin_storage_json::JsonUsageStore;
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use tempfile::TempDir;

pub const BIN_NAME: &str = "cabin_energy_cli";

/// Holds TempDir guards so temporary folders live for the duration of the test run.
static TEST_DIRS: Lazy<Mutex<Vec<TempDir>>> = Lazy::new(|| Mutex::new(Vec::new()));

pub fn day(month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, month, day).expect("valid test date")
}

/// Creates an isolated directory that outlives the calling test.
pub fn temp_base() -> PathBuf {
    let temp = TempDir::new().expect("create temp dir");
    let base = temp.path().to_path_buf();
    TEST_DIRS.lock().expect("lock temp dir registry").push(temp);
    base
}

/// Service over a fresh JSON store whose clock is pinned to `today`.
pub fn setup_service(today: NaiveDate) -> (UsageService, PathBuf) {
    let base = temp_base();
    let path = base.join("data").join("usage.json");
    let store = JsonUsageStore::new(path.clone()).expect("create json store");
    let service = UsageService::new(Box::new(store), Arc::new(FixedClock(today)));
    (service, path)
}

/// The CLI binary in script mode with its base directory set to `base`.
pub fn script_command(base: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin(BIN_NAME).expect("binary exists");
    cmd.env("CABIN_ENERGY_CLI_SCRIPT", "1")
        .env("CABIN_ENERGY_HOME", base)
        .env_remove("RUST_LOG");
    cmd
}
