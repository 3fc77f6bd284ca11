use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::ConfigError;

const DATA_DIR_NAME: &str = "CabinEnergy";
const STORE_FILE_NAME: &str = "usage.json";

/// Stores dashboard preferences and billing defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Single fixed currency code used when printing costs.
    pub currency: String,
    #[serde(default = "Config::default_currency_precision")]
    pub currency_precision: u8,
    /// Rate pre-filled for new stays.
    #[serde(default = "Config::default_cost_per_kwh")]
    pub default_cost_per_kwh: f64,
    /// Number of records shown in recent activity.
    #[serde(default = "Config::default_recent_limit")]
    pub recent_limit: usize,
    /// `permit` or `reject` concurrent open stays per home.
    #[serde(default = "Config::default_open_stay_policy")]
    pub open_stay_policy: String,
    #[serde(default = "Config::default_ui_color_enabled")]
    pub ui_color_enabled: bool,
    /// Populate an empty store with demo homes and stays.
    #[serde(default)]
    pub seed_sample_data: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Optional custom directory for the usage store. Defaults to the platform data dir.
    pub data_root: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            currency: "PLN".into(),
            currency_precision: Self::default_currency_precision(),
            default_cost_per_kwh: Self::default_cost_per_kwh(),
            recent_limit: Self::default_recent_limit(),
            open_stay_policy: Self::default_open_stay_policy(),
            ui_color_enabled: Self::default_ui_color_enabled(),
            seed_sample_data: false,
            data_root: None,
        }
    }
}

impl Config {
    pub fn default_currency_precision() -> u8 {
        2
    }

    pub fn default_cost_per_kwh() -> f64 {
        0.75
    }

    pub fn default_recent_limit() -> usize {
        5
    }

    pub fn default_open_stay_policy() -> String {
        "permit".into()
    }

    pub fn default_ui_color_enabled() -> bool {
        true
    }

    pub fn resolve_data_root(&self) -> PathBuf {
        if let Some(path) = &self.data_root {
            return path.clone();
        }

        let base = dirs::data_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."));

        base.join(DATA_DIR_NAME)
    }

    pub fn resolve_store_path(&self) -> PathBuf {
        self.resolve_data_root().join(STORE_FILE_NAME)
    }

    /// Formats an amount in the configured currency.
    pub fn format_amount(&self, amount: f64) -> String {
        format!(
            "{amount:.prec$} {code}",
            amount = amount,
            prec = self.currency_precision as usize,
            code = self.currency
        )
    }

    /// Rejects values the rest of the application cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.currency.trim().is_empty() {
            return Err(ConfigError::Invalid {
                key: "currency",
                message: "must not be empty".into(),
            });
        }
        if !self.default_cost_per_kwh.is_finite() || self.default_cost_per_kwh <= 0.0 {
            return Err(ConfigError::Invalid {
                key: "default_cost_per_kwh",
                message: format!("must be positive (got {})", self.default_cost_per_kwh),
            });
        }
        match self.open_stay_policy.trim().to_ascii_lowercase().as_str() {
            "permit" | "allow" | "reject" | "single" => Ok(()),
            other => Err(ConfigError::Invalid {
                key: "open_stay_policy",
                message: format!("expected `permit` or `reject`, got `{other}`"),
            }),
        }
    }
}
