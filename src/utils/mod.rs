use std::{
    env,
    path::{Path, PathBuf},
    sync::Once,
};

use cabin_config::Config;
use tracing_subscriber::{filter::Directive, fmt, EnvFilter};

/// Overrides the base directory holding `config/` and `data/`.
pub const HOME_ENV: &str = "CABIN_ENERGY_HOME";

const APP_DIR_NAME: &str = "CabinEnergy";
const DATA_DIR: &str = "data";
const STORE_FILE: &str = "usage.json";
const DEFAULT_DIRECTIVE: &str = "cabin_energy=info";

static TRACING_INIT: Once = Once::new();

/// Initializes the global tracing subscriber with sensible defaults.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        let mut filter = EnvFilter::from_default_env();
        if let Ok(directive) = DEFAULT_DIRECTIVE.parse::<Directive>() {
            filter = filter.add_directive(directive);
        }
        // stdout is reserved for command output.
        let _ = fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init();
    });
}

/// Base directory named by `$CABIN_ENERGY_HOME`, if set.
pub fn base_dir_override() -> Option<PathBuf> {
    env::var_os(HOME_ENV)
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
}

/// Platform config directory used when no override is set.
pub fn default_base_dir() -> PathBuf {
    dirs::config_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR_NAME)
}

/// Location of the usage store.
///
/// An explicit `data_root` wins. Otherwise an overridden base dir keeps the
/// store next to the config, and the platform data dir is used last.
pub fn store_path(base_override: Option<&Path>, config: &Config) -> PathBuf {
    match (&config.data_root, base_override) {
        (None, Some(base)) => base.join(DATA_DIR).join(STORE_FILE),
        _ => config.resolve_store_path(),
    }
}
