use std::str::FromStr;

use cabin_config::Config;
use cabin_core::OpenStayPolicy;

use crate::cli::core::{parse_count, parse_number, CommandError, CommandResult, ShellContext};
use crate::cli::io;
use crate::cli::output::{self, section as output_section, OutputPreferences};
use crate::cli::registry::CommandEntry;
use crate::cli::shell_context::CliMode;

pub(crate) const SUBCOMMANDS: &[&str] = &["set", "show"];
const USAGE: &str = "config <show|set <key> <value>>";

pub(crate) fn definitions() -> Vec<CommandEntry> {
    vec![CommandEntry::new(
        "config",
        "Show or change preferences and billing defaults",
        USAGE,
        cmd_config,
    )]
}

fn cmd_config(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    match args {
        [] | ["show"] => show(context),
        ["set", key, value] => set(context, key, value),
        _ => Err(CommandError::usage(USAGE)),
    }
}

fn show(context: &ShellContext) -> CommandResult {
    let cfg = &context.config;
    output_section("Configuration");
    io::print_line(format!("  currency             : {}", cfg.currency));
    io::print_line(format!("  currency_precision   : {}", cfg.currency_precision));
    io::print_line(format!("  default_cost_per_kwh : {}", cfg.default_cost_per_kwh));
    io::print_line(format!("  recent_limit         : {}", cfg.recent_limit));
    io::print_line(format!("  open_stay_policy     : {}", cfg.open_stay_policy));
    io::print_line(format!("  ui_color_enabled     : {}", cfg.ui_color_enabled));
    io::print_line(format!("  seed_sample_data     : {}", cfg.seed_sample_data));
    io::print_line(format!("  store                : {}", context.store_path.display()));
    io::print_line(format!(
        "  config file          : {}",
        context.config_manager.config_path().display()
    ));
    Ok(())
}

fn parse_flag(raw: &str) -> Result<bool, CommandError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "on" | "yes" => Ok(true),
        "false" | "off" | "no" => Ok(false),
        _ => Err(CommandError::InvalidArguments(format!(
            "expected true or false, got `{raw}`"
        ))),
    }
}

/// Applies one key to a config copy without touching disk.
fn apply(config: &mut Config, key: &str, value: &str) -> Result<(), CommandError> {
    match key {
        "currency" => config.currency = value.trim().to_ascii_uppercase(),
        "currency_precision" => {
            config.currency_precision = value.trim().parse::<u8>().map_err(|_| {
                CommandError::InvalidArguments(format!("invalid precision `{value}`"))
            })?
        }
        "default_cost_per_kwh" => {
            config.default_cost_per_kwh = parse_number("default_cost_per_kwh", value)?
        }
        "recent_limit" => config.recent_limit = parse_count(value)?,
        "open_stay_policy" => {
            let policy = OpenStayPolicy::from_str(value).map_err(CommandError::InvalidArguments)?;
            config.open_stay_policy = policy.to_string();
        }
        "ui_color_enabled" => config.ui_color_enabled = parse_flag(value)?,
        "seed_sample_data" => config.seed_sample_data = parse_flag(value)?,
        other => {
            return Err(CommandError::InvalidArguments(format!(
                "unknown config key `{other}`"
            )))
        }
    }
    Ok(())
}

fn set(context: &mut ShellContext, key: &str, value: &str) -> CommandResult {
    let mut candidate = context.config.clone();
    apply(&mut candidate, key, value)?;
    candidate.validate()?;

    let saved = context.config_manager.update(|cfg| *cfg = candidate)?;
    if let Ok(policy) = OpenStayPolicy::from_str(&saved.open_stay_policy) {
        context.service.set_policy(policy);
    }
    output::set_preferences(OutputPreferences {
        color_enabled: saved.ui_color_enabled && context.mode == CliMode::Interactive,
    });
    context.config = saved;
    io::print_success(format!("Configuration `{key}` updated."));
    Ok(())
}
