pub mod config;
pub mod home;
pub mod stats;
pub mod system;
pub mod usage;

use cabin_core::{StayCalendar, UsageLedger};
use cabin_domain::{Usage, UsageState};

use crate::cli::registry::{CommandEntry, CommandRegistry};
use crate::cli::shell_context::ShellContext;

const ROOT_COMMAND_ORDER: &[&str] = &[
    "home", "usage", "stay", "stats", "recent", "config", "help", "exit",
];

pub(crate) fn all_entries() -> Vec<CommandEntry> {
    let mut commands = Vec::new();
    commands.extend(home::definitions());
    commands.extend(usage::definitions());
    commands.extend(stats::definitions());
    commands.extend(config::definitions());
    commands.extend(system::definitions());
    commands
}

pub(crate) fn register_all(registry: &mut CommandRegistry) {
    let mut entries = all_entries();
    entries.sort_by_key(|entry| {
        ROOT_COMMAND_ORDER
            .iter()
            .position(|name| entry.name.eq_ignore_ascii_case(name))
            .unwrap_or(ROOT_COMMAND_ORDER.len())
    });
    for entry in entries {
        registry.register(entry);
    }
}

/// Subcommand names offered by tab completion.
pub(crate) fn subcommands(command: &str) -> &'static [&'static str] {
    match command {
        "home" => home::SUBCOMMANDS,
        "usage" => usage::SUBCOMMANDS,
        "config" => config::SUBCOMMANDS,
        _ => &[],
    }
}

/// One table row describing a usage record.
pub(crate) fn usage_row(context: &ShellContext, usage: &Usage) -> String {
    let days = StayCalendar::days(usage.start_date, usage.end_date)
        .map(|days| format!("{days}d"))
        .unwrap_or_else(|_| "?".into());
    let consumption = match UsageLedger::classify(usage) {
        UsageState::Completed => format!(
            "{:>8.2} kWh  {}",
            usage.derived_kwh().unwrap_or_default(),
            context.format_amount(UsageLedger::cost(usage))
        ),
        UsageState::Open => format!("{:>8} kWh  from {:.2}", "-", usage.initial_reading),
    };
    format!(
        "  #{:<4} home {:<4} {:<18} {} .. {} {:>4}  {:<9} {}",
        usage.id,
        usage.home_number,
        usage.user_name,
        StayCalendar::format_day(usage.start_date),
        StayCalendar::format_day(usage.end_date),
        days,
        UsageLedger::classify(usage),
        consumption
    )
}
