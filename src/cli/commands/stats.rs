use cabin_core::UsageSummary;

use crate::cli::commands::usage_row;
use crate::cli::core::{parse_count, CommandError, CommandResult, ShellContext};
use crate::cli::io;
use crate::cli::output::section as output_section;
use crate::cli::registry::CommandEntry;

pub(crate) fn definitions() -> Vec<CommandEntry> {
    vec![
        CommandEntry::new(
            "stats",
            "Show consumption, cost, and stay totals",
            "stats [home]",
            cmd_stats,
        ),
        CommandEntry::new(
            "recent",
            "List the most recent usage records",
            "recent [n]",
            cmd_recent,
        ),
    ]
}

fn print_summary(context: &ShellContext, summary: &UsageSummary, active: usize) {
    io::print_line(format!("  Total usage   : {:.2} kWh", summary.total_kwh));
    io::print_line(format!(
        "  Total cost    : {}",
        context.format_amount(summary.total_cost)
    ));
    io::print_line(format!("  Total days    : {}", summary.total_days));
    io::print_line(format!("  Records       : {}", summary.count));
    io::print_line(format!("  Active stays  : {}", active));
}

fn cmd_stats(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    match args {
        [] => {
            let overview = context.service.property_overview(context.config.recent_limit)?;
            output_section(format!("Property ({} homes)", overview.home_count));
            print_summary(context, &overview.summary, overview.active_count);
            for (home, summary) in &overview.by_home {
                io::print_line(format!(
                    "    home {:<4} {:>10.2} kWh  {:>14}  {:>4} days  {:>3} records",
                    home,
                    summary.total_kwh,
                    context.format_amount(summary.total_cost),
                    summary.total_days,
                    summary.count
                ));
            }
            Ok(())
        }
        [home] => {
            let ledger = context.focus_home(home)?;
            let summary = ledger.summary();
            let active = ledger.open_records().count();
            let completed = ledger.completed_records().count();
            output_section(format!("Home {}", home.trim()));
            print_summary(context, &summary, active);
            io::print_line(format!("  Completed     : {}", completed));
            Ok(())
        }
        _ => Err(CommandError::usage("stats [home]")),
    }
}

fn cmd_recent(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let limit = match args {
        [] => context.config.recent_limit,
        [raw] => parse_count(raw)?,
        _ => return Err(CommandError::usage("recent [n]")),
    };
    let records = context.service.recent(limit)?;
    output_section(format!("Recent activity ({} of at most {})", records.len(), limit));
    if records.is_empty() {
        io::print_info("No usage records.");
    }
    for usage in &records {
        io::print_line(usage_row(context, usage));
    }
    Ok(())
}
