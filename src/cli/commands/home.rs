use cabin_core::StatsAggregator;
use cabin_domain::{Displayable, LedgerScope};

use crate::cli::commands::usage_row;
use crate::cli::core::{CommandError, CommandResult, ShellContext};
use crate::cli::io;
use crate::cli::output::section as output_section;
use crate::cli::registry::CommandEntry;

pub(crate) const SUBCOMMANDS: &[&str] = &["add", "list", "remove", "show"];
const USAGE: &str = "home <add|list|show|remove> [number]";

pub(crate) fn definitions() -> Vec<CommandEntry> {
    vec![CommandEntry::new(
        "home",
        "Register, inspect, and remove homes",
        USAGE,
        cmd_home,
    )]
}

fn cmd_home(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let Some((action, rest)) = args.split_first() else {
        return Err(CommandError::usage(USAGE));
    };
    match action.to_lowercase().as_str() {
        "add" => handle_add(context, rest),
        "list" => handle_list(context),
        "show" => handle_show(context, rest),
        "remove" => handle_remove(context, rest),
        other => Err(CommandError::InvalidArguments(format!(
            "unknown home subcommand `{}`",
            other
        ))),
    }
}

fn home_number<'a>(args: &[&'a str], usage: &str) -> Result<&'a str, CommandError> {
    match args {
        [number] => Ok(*number),
        _ => Err(CommandError::usage(usage)),
    }
}

fn handle_add(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let number = home_number(args, "home add <number>")?;
    let home = context.service.add_home(number)?;
    io::print_success(format!("{} added.", home.display_label()));
    Ok(())
}

fn handle_list(context: &mut ShellContext) -> CommandResult {
    let homes = context.service.homes()?;
    if homes.is_empty() {
        io::print_info("No homes registered. Use `home add <number>`.");
        return Ok(());
    }
    let records = context.service.usages(&LedgerScope::Property)?;
    let by_home = StatsAggregator::summarize_by_home(&records);

    output_section("Homes");
    for home in homes {
        let scoped: Vec<_> = records
            .iter()
            .filter(|usage| usage.home_number == home.number)
            .cloned()
            .collect();
        let count = by_home.get(&home.number).map_or(0, |summary| summary.count);
        io::print_line(format!(
            "  {:<10} {:>3} stays  {:>3} open",
            home.display_label(),
            count,
            StatsAggregator::active_count(&scoped)
        ));
    }
    Ok(())
}

fn handle_show(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let number = home_number(args, "home show <number>")?;
    let overview = context.service.home_overview(number)?;
    context.focus_home(&overview.home.number)?;

    output_section(overview.home.display_label());
    match overview.current_reading {
        Some(reading) => io::print_line(format!("  Current reading : {reading:.2}")),
        None => io::print_line("  Current reading : no completed stay yet"),
    }
    match &overview.latest_open {
        Some(open) => io::print_line(format!(
            "  Open stay       : #{} {} (from {:.2})",
            open.id, open.user_name, open.initial_reading
        )),
        None => io::print_line("  Open stay       : none"),
    }
    io::print_line(format!(
        "  Totals          : {:.2} kWh, {}, {} days, {} stays ({} open)",
        overview.summary.total_kwh,
        context.format_amount(overview.summary.total_cost),
        overview.summary.total_days,
        overview.summary.count,
        overview.active_count
    ));
    for usage in &overview.usages {
        io::print_line(usage_row(context, usage));
    }
    Ok(())
}

fn handle_remove(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let number = home_number(args, "home remove <number>")?;
    let home = context.service.home_overview(number)?;
    let prompt = format!(
        "Remove {} and its {} usage record(s)?",
        home.home.display_label(),
        home.usages.len()
    );
    if !context.confirm(&prompt)? {
        io::print_info("Removal cancelled.");
        return Ok(());
    }
    context.service.remove_home(&home.home.number)?;
    context.release_home(&home.home.number);
    io::print_success(format!("{} removed.", home.home.display_label()));
    Ok(())
}
