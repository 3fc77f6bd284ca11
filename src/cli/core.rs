//! Dispatch, argument parsing, and error reporting shared by every command.

use std::{collections::HashMap, io, str::FromStr};

use cabin_config::ConfigError;
use cabin_core::{CoreError, StayCalendar};
use cabin_domain::UsageId;
use chrono::NaiveDate;
use strsim::levenshtein;

use crate::cli::io as cli_io;
pub use crate::cli::shell_context::{CliMode, ShellContext};
pub use crate::errors::CliError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LoopControl {
    Continue,
    Exit,
}

pub type CommandResult = Result<(), CommandError>;

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("{0}")]
    InvalidArguments(String),
    #[error(transparent)]
    Core(#[from] CoreError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serde(#[from] serde_json::Error),
    #[error(transparent)]
    Dialoguer(#[from] dialoguer::Error),
    #[error("exit requested")]
    ExitRequested,
}

impl CommandError {
    pub(crate) fn usage(usage: &str) -> Self {
        CommandError::InvalidArguments(format!("usage: {usage}"))
    }
}

impl From<CommandError> for CliError {
    fn from(err: CommandError) -> Self {
        CliError::Command(err.to_string())
    }
}

impl ShellContext {
    pub(crate) fn dispatch(
        &mut self,
        command: &str,
        raw: &str,
        args: &[&str],
    ) -> Result<LoopControl, CommandError> {
        if let Some(handler) = self.registry.handler(command) {
            match handler(self, args) {
                Ok(()) => Ok(LoopControl::Continue),
                Err(CommandError::ExitRequested) => Ok(LoopControl::Exit),
                Err(err) => Err(err),
            }
        } else {
            self.suggest_command(raw);
            Ok(LoopControl::Continue)
        }
    }

    pub(crate) fn process_line(&mut self, line: &str) -> Result<LoopControl, CommandError> {
        let tokens = match crate::cli::shell::parse_command_line(line) {
            Ok(tokens) => tokens,
            Err(err) => {
                cli_io::print_warning(err);
                return Ok(LoopControl::Continue);
            }
        };

        let Some(raw) = tokens.first() else {
            return Ok(LoopControl::Continue);
        };
        let command = raw.to_lowercase();
        let args: Vec<&str> = tokens.iter().skip(1).map(String::as_str).collect();

        self.last_command = Some(line.trim().to_string());

        match self.dispatch(&command, raw, &args) {
            Ok(LoopControl::Exit) => {
                self.running = false;
                Ok(LoopControl::Exit)
            }
            other => other,
        }
    }

    pub(crate) fn suggest_command(&self, input: &str) {
        cli_io::print_warning(format!(
            "Unknown command `{}`. Type `help` to see available commands.",
            input
        ));

        let needle = input.to_lowercase();
        let best = self
            .registry
            .names()
            .map(|name| (levenshtein(name, &needle), name))
            .min_by_key(|(distance, _)| *distance);

        if let Some((distance, name)) = best {
            if distance <= 3 {
                cli_io::print_info(format!("Suggestion: `{}`?", name));
            }
        }
    }

    pub(crate) fn confirm_exit(&self) -> Result<bool, CliError> {
        if self.mode == CliMode::Script {
            return Ok(true);
        }
        Ok(cli_io::confirm_action(&self.theme, "Exit shell?", true)?)
    }

    /// Asks before destructive commands; script mode always proceeds.
    pub(crate) fn confirm(&self, prompt: &str) -> Result<bool, CommandError> {
        if self.mode == CliMode::Script {
            return Ok(true);
        }
        cli_io::confirm_action(&self.theme, prompt, false)
    }

    pub(crate) fn report_error(&self, err: CommandError) -> Result<(), CliError> {
        match err {
            CommandError::ExitRequested => Ok(()),
            CommandError::InvalidArguments(message) => {
                cli_io::print_error(message);
                cli_io::print_hint("Use `help <command>` for usage details.");
                Ok(())
            }
            CommandError::Core(CoreError::NotFound(inner)) => {
                cli_io::print_error(format!("Not found: {inner}"));
                cli_io::print_hint("Use `home list` or `usage list` to see what exists.");
                Ok(())
            }
            CommandError::Core(CoreError::Conflict(inner)) => {
                cli_io::print_error(format!("Conflict: {inner}"));
                Ok(())
            }
            CommandError::Core(CoreError::Validation(inner)) => {
                cli_io::print_error(format!("Invalid value: {inner}"));
                Ok(())
            }
            // Storage and I/O failures are reported but keep the shell alive.
            other => {
                cli_io::print_error(other.to_string());
                Ok(())
            }
        }
    }
}

/// Positional arguments and `--flag value` pairs of one command line.
#[derive(Debug, Default)]
pub(crate) struct ParsedArgs<'a> {
    pub positional: Vec<&'a str>,
    flags: HashMap<&'a str, &'a str>,
}

impl<'a> ParsedArgs<'a> {
    /// Splits `args`, accepting only the flag names listed in `allowed`.
    pub fn parse(args: &[&'a str], allowed: &[&str]) -> Result<Self, CommandError> {
        let mut parsed = ParsedArgs::default();
        let mut iter = args.iter();
        while let Some(arg) = iter.next() {
            let Some(name) = arg.strip_prefix("--") else {
                parsed.positional.push(arg);
                continue;
            };
            if !allowed.contains(&name) {
                return Err(CommandError::InvalidArguments(format!(
                    "unknown option `--{name}`"
                )));
            }
            let value = iter.next().ok_or_else(|| {
                CommandError::InvalidArguments(format!("option `--{name}` needs a value"))
            })?;
            parsed.flags.insert(name, value);
        }
        Ok(parsed)
    }

    pub fn flag(&self, name: &str) -> Option<&'a str> {
        self.flags.get(name).copied()
    }
}

pub(crate) fn parse_number(label: &str, raw: &str) -> Result<f64, CommandError> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or_else(|| CommandError::InvalidArguments(format!("{label} must be a number, got `{raw}`")))
}

pub(crate) fn parse_usage_id(raw: &str) -> Result<UsageId, CommandError> {
    UsageId::from_str(raw).map_err(|_| {
        CommandError::InvalidArguments(format!("invalid usage id `{raw}` (expected e.g. 12 or #12)"))
    })
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, CommandError> {
    StayCalendar::parse_day(raw).map_err(|err| CommandError::Core(err.into()))
}

/// Parses a record count; negative values clamp to zero.
pub(crate) fn parse_count(raw: &str) -> Result<usize, CommandError> {
    let value = raw.trim().parse::<i64>().map_err(|_| {
        CommandError::InvalidArguments(format!("count must be a whole number, got `{raw}`"))
    })?;
    Ok(usize::try_from(value.max(0)).unwrap_or(usize::MAX))
}

#[cfg(test)]
pub(crate) fn process_script(
    lines: &[&str],
    base: &std::path::Path,
) -> Result<ShellContext, CliError> {
    let mut app = ShellContext::with_base_dir(CliMode::Script, base.to_path_buf())?;
    for line in lines {
        match app.process_line(line) {
            Ok(LoopControl::Continue) => {}
            Ok(LoopControl::Exit) => break,
            Err(err) => app.report_error(err)?,
        }
    }
    Ok(app)
}
