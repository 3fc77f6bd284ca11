//! Shared runtime state for CLI interactions and command execution.

use std::{
    path::{Path, PathBuf},
    str::FromStr,
    sync::Arc,
};

use cabin_config::{Config, ConfigManager};
use cabin_core::{CoreError, OpenStayPolicy, ScopedLedger, UsageService};
use cabin_domain::LedgerScope;
use cabin_storage_json::JsonUsageStore;
use dialoguer::theme::ColorfulTheme;
use tracing::{info, warn};

use super::{
    commands,
    output::{self, OutputPreferences},
    registry::CommandRegistry,
    system_clock::SystemClock,
};
use crate::{errors::CliError, utils};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliMode {
    Interactive,
    Script,
}

pub struct ShellContext {
    pub mode: CliMode,
    pub registry: CommandRegistry,
    pub theme: ColorfulTheme,
    pub service: UsageService,
    pub config_manager: ConfigManager,
    pub config: Config,
    pub store_path: PathBuf,
    /// Ledger view of the home last shown, reused by follow-up commands.
    pub focus: Option<ScopedLedger>,
    pub last_command: Option<String>,
    pub running: bool,
}

impl ShellContext {
    /// Builds the shell from `$CABIN_ENERGY_HOME`, or the platform directories.
    pub fn new(mode: CliMode) -> Result<Self, CliError> {
        match utils::base_dir_override() {
            Some(base) => Self::with_base_dir(mode, base),
            None => Self::build(mode, utils::default_base_dir(), None),
        }
    }

    /// Builds the shell with config and store both rooted at `base`.
    pub fn with_base_dir(mode: CliMode, base: PathBuf) -> Result<Self, CliError> {
        let root = base.clone();
        Self::build(mode, base, Some(root.as_path()))
    }

    fn build(mode: CliMode, base: PathBuf, store_base: Option<&Path>) -> Result<Self, CliError> {
        let config_manager = ConfigManager::with_base_dir(base)?;
        let config = config_manager.load()?;
        output::set_preferences(OutputPreferences {
            color_enabled: config.ui_color_enabled && mode == CliMode::Interactive,
        });

        let store_path = utils::store_path(store_base, &config);
        let store = JsonUsageStore::new(store_path.clone())?;
        if config.seed_sample_data && store.seed_sample_data()? {
            info!(path = %store_path.display(), "empty store seeded with sample data");
        }
        for warning in store.warnings()? {
            warn!("{warning}");
        }

        let policy = OpenStayPolicy::from_str(&config.open_stay_policy)
            .map_err(CliError::Input)?;
        let service = UsageService::new(Box::new(store), Arc::new(SystemClock)).with_policy(policy);

        let mut registry = CommandRegistry::new();
        commands::register_all(&mut registry);

        Ok(Self {
            mode,
            registry,
            theme: ColorfulTheme::default(),
            service,
            config_manager,
            config,
            store_path,
            focus: None,
            last_command: None,
            running: true,
        })
    }

    pub fn command_names(&self) -> Vec<&'static str> {
        self.registry.names().collect()
    }

    pub fn prompt(&self) -> String {
        match self.focus.as_ref().map(ScopedLedger::scope) {
            Some(scope) => format!("cabin[{scope}]> "),
            None => "cabin> ".to_string(),
        }
    }

    /// Reloads the ledger for `home_number` and makes it the focused view.
    pub fn focus_home(&mut self, home_number: &str) -> Result<&ScopedLedger, CoreError> {
        let ledger = self.service.ledger(LedgerScope::home(home_number.trim()))?;
        Ok(&*self.focus.insert(ledger))
    }

    /// Drops the focused view when it covers `home_number`.
    pub fn release_home(&mut self, home_number: &str) {
        if self
            .focus
            .as_ref()
            .is_some_and(|ledger| ledger.depends_on(home_number))
        {
            self.focus = None;
        }
    }

    /// Stored records changed; the focused view must be rebuilt on next use.
    pub fn refresh_focus(&mut self) -> Result<(), CoreError> {
        let Some(scope) = self.focus.as_ref().map(|ledger| ledger.scope().clone()) else {
            return Ok(());
        };
        self.focus = Some(self.service.ledger(scope)?);
        Ok(())
    }

    pub fn format_amount(&self, amount: f64) -> String {
        self.config.format_amount(amount)
    }
}
