use cabin_core::{StayAction, UsageLedger};
use cabin_domain::{Displayable, LedgerScope, NewUsage, UsageCompletion, UsageState};

use crate::cli::commands::usage_row;
use crate::cli::core::{
    parse_date, parse_number, parse_usage_id, CommandError, CommandResult, ParsedArgs,
    ShellContext,
};
use crate::cli::io;
use crate::cli::output::section as output_section;
use crate::cli::registry::CommandEntry;

pub(crate) const SUBCOMMANDS: &[&str] = &["add", "complete", "export", "list", "remove", "show"];
const USAGE: &str = "usage <add|complete|list|show|remove|export> ...";
const ADD_USAGE: &str =
    "usage add <home> <guest> <start> <end> [--initial N] [--rate R] [--final F] [--date D]";
const ADD_FLAGS: &[&str] = &["initial", "rate", "final", "date"];

pub(crate) fn definitions() -> Vec<CommandEntry> {
    vec![
        CommandEntry::new(
            "usage",
            "Record, complete, and inspect guest stays",
            USAGE,
            cmd_usage,
        ),
        CommandEntry::new(
            "stay",
            "Show whether a home has a stay to complete or a new one to start",
            "stay <home>",
            cmd_stay,
        ),
    ]
}

fn cmd_usage(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let Some((action, rest)) = args.split_first() else {
        return Err(CommandError::usage(USAGE));
    };
    match action.to_lowercase().as_str() {
        "add" => handle_add(context, rest),
        "complete" => handle_complete(context, rest),
        "list" => handle_list(context, rest),
        "show" => handle_show(context, rest),
        "remove" => handle_remove(context, rest),
        "export" => handle_export(context, rest),
        other => Err(CommandError::InvalidArguments(format!(
            "unknown usage subcommand `{}`",
            other
        ))),
    }
}

fn scope_from(args: &[&str], usage: &str) -> Result<LedgerScope, CommandError> {
    match args {
        [] => Ok(LedgerScope::Property),
        [home] => Ok(LedgerScope::home(home.trim())),
        _ => Err(CommandError::usage(usage)),
    }
}

fn handle_add(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let parsed = ParsedArgs::parse(args, ADD_FLAGS)?;
    let &[home, guest, start, end] = parsed.positional.as_slice() else {
        return Err(CommandError::usage(ADD_USAGE));
    };
    let start = parse_date(start)?;
    let end = parse_date(end)?;
    let rate = match parsed.flag("rate") {
        Some(raw) => parse_number("rate", raw)?,
        None => context.config.default_cost_per_kwh,
    };

    let mut draft = match parsed.flag("initial") {
        Some(raw) => NewUsage::open(home, guest, parse_number("initial reading", raw)?, rate, start, end)
            .with_date(context.service.today()),
        None => context.service.draft_stay(home, guest, start, end, rate)?,
    };
    if let Some(raw) = parsed.flag("final") {
        draft = draft.with_final_reading(parse_number("final reading", raw)?);
    }
    if let Some(raw) = parsed.flag("date") {
        draft = draft.with_date(parse_date(raw)?);
    }

    let created = context.service.record_usage(draft)?;
    context.refresh_focus()?;
    match UsageLedger::classify(&created) {
        UsageState::Open => io::print_success(format!(
            "Recorded open stay #{} for {} at home {} from reading {:.2}.",
            created.id, created.user_name, created.home_number, created.initial_reading
        )),
        UsageState::Completed => io::print_success(format!(
            "Recorded completed stay #{} for {} at home {}: {:.2} kWh, {}.",
            created.id,
            created.user_name,
            created.home_number,
            created.derived_kwh().unwrap_or_default(),
            context.format_amount(UsageLedger::cost(&created))
        )),
    }
    Ok(())
}

fn handle_complete(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let completion = match args {
        [id, reading] => UsageCompletion {
            id: parse_usage_id(id)?,
            final_reading: parse_number("final reading", reading)?,
            date: None,
        },
        [id, reading, date] => UsageCompletion {
            id: parse_usage_id(id)?,
            final_reading: parse_number("final reading", reading)?,
            date: Some(parse_date(date)?),
        },
        _ => return Err(CommandError::usage("usage complete <id> <final> [date]")),
    };

    let completed = context.service.apply_completion(completion)?;
    context.refresh_focus()?;
    io::print_success(format!(
        "Usage #{} completed: {:.2} kWh, {}.",
        completed.id,
        completed.derived_kwh().unwrap_or_default(),
        context.format_amount(UsageLedger::cost(&completed))
    ));
    Ok(())
}

fn handle_list(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let scope = scope_from(args, "usage list [home]")?;
    let records = context.service.usages(&scope)?;
    output_section(format!("Usage records ({scope})"));
    if records.is_empty() {
        io::print_info("No usage records.");
        return Ok(());
    }
    for usage in &records {
        io::print_line(usage_row(context, usage));
    }
    Ok(())
}

fn handle_show(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let [id] = args else {
        return Err(CommandError::usage("usage show <id>"));
    };
    let id = parse_usage_id(id)?;
    let usage = match context.focus.as_ref().and_then(|ledger| ledger.find(id)) {
        Some(cached) => cached.clone(),
        None => context.service.usage(id)?,
    };

    output_section(format!("Usage #{}", usage.id));
    io::print_line(format!("  Home          : {}", usage.home_number));
    io::print_line(format!("  Guest         : {}", usage.user_name));
    io::print_line(format!(
        "  Stay          : {} .. {}",
        usage.start_date, usage.end_date
    ));
    io::print_line(format!("  State         : {}", UsageLedger::classify(&usage)));
    io::print_line(format!("  Initial       : {:.2}", usage.initial_reading));
    if let Some(final_reading) = usage.final_reading {
        io::print_line(format!("  Final         : {final_reading:.2}"));
        io::print_line(format!(
            "  Consumption   : {:.2} kWh",
            usage.derived_kwh().unwrap_or_default()
        ));
    }
    io::print_line(format!(
        "  Rate          : {}",
        context.format_amount(usage.cost_per_kwh)
    ));
    io::print_line(format!(
        "  Cost          : {}",
        context.format_amount(UsageLedger::cost(&usage))
    ));
    io::print_line(format!("  Reading date  : {}", usage.date));
    Ok(())
}

fn handle_remove(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let [id] = args else {
        return Err(CommandError::usage("usage remove <id>"));
    };
    let usage = context.service.usage(parse_usage_id(id)?)?;
    if !context.confirm(&format!("Remove {}?", usage.display_label()))? {
        io::print_info("Removal cancelled.");
        return Ok(());
    }
    context.service.remove_usage(usage.id)?;
    context.refresh_focus()?;
    io::print_success(format!("Usage #{} removed.", usage.id));
    Ok(())
}

fn handle_export(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let scope = scope_from(args, "usage export [home]")?;
    let records = context.service.usages(&scope)?;
    io::print_line(serde_json::to_string_pretty(&records)?);
    Ok(())
}

fn cmd_stay(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let [home] = args else {
        return Err(CommandError::usage("stay <home>"));
    };
    match context.service.stay_action(home)? {
        StayAction::CompleteOpen(open) => {
            io::print_info(format!(
                "Home {} has an open stay #{} for {} since {} (initial reading {:.2}).",
                open.home_number, open.id, open.user_name, open.start_date, open.initial_reading
            ));
            io::print_hint(format!(
                "Complete it with `usage complete {} <final reading>`.",
                open.id
            ));
        }
        StayAction::StartNew { initial_reading } => {
            io::print_info(format!(
                "No open stay at home {}. A new stay starts from reading {:.2}.",
                home.trim(),
                initial_reading
            ));
            io::print_hint(format!(
                "Start one with `usage add {} <guest> <start> <end>`.",
                home.trim()
            ));
        }
    }
    Ok(())
}
