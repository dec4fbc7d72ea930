use colored::Colorize;
use comfy_table::{Cell, Table};
use serde::Serialize;

use super::{detect_session, open_store};
use crate::audit::{build_report, summarize_apply, ApplySummary};
use crate::conflicts::{ConflictGroup, Resolution};
use crate::db::{delete_override, record_application, save_override};
use crate::error::{CrosscheckError, Result};
use crate::fmt::{confidence, date_or_unknown, money};
use crate::resolution::{apply_resolutions, checked_index, manual_select, ApplyResult, Override};
use crate::settings::load_settings;

pub(crate) const NOT_ENOUGH_SOURCES: &str =
    "Select at least two source files that contain transactions to compare.";

pub(crate) fn group_table(group: &ConflictGroup) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["#", "File", "Location", "Description", "Type", "Confidence", ""]);
    for (i, t) in group.members.iter().enumerate() {
        let status = if i == group.selected_index {
            "\u{2713} kept".green().to_string()
        } else {
            "discarded".dimmed().to_string()
        };
        table.add_row(vec![
            Cell::new(i + 1),
            Cell::new(&t.file_name),
            Cell::new(&t.source_location),
            Cell::new(&t.description),
            Cell::new(t.transaction_type.as_str()),
            Cell::new(confidence(t.confidence)),
            Cell::new(status),
        ]);
    }
    table
}

pub(crate) fn group_heading(number: usize, group: &ConflictGroup) -> String {
    let winner = group.winner();
    let resolution = match group.resolution {
        Resolution::Auto => "auto".cyan(),
        Resolution::Manual => "manual".yellow(),
    };
    format!(
        "Conflict {number}: {}  {}  ({} sources, {resolution})",
        date_or_unknown(winner.date),
        money(winner.amount).bold(),
        group.members.len(),
    )
}

pub fn show(files: &[String], json: bool, fresh: bool) -> Result<()> {
    let conn = open_store()?;
    let session = detect_session(&conn, files, fresh)?;

    if json {
        let report = build_report(&session.groups);
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    if !session.sufficient {
        println!("{}", NOT_ENOUGH_SOURCES.yellow());
        return Ok(());
    }
    if session.groups.is_empty() {
        println!("{}", "No duplicates found.".green());
        return Ok(());
    }

    for (i, group) in session.groups.iter().enumerate() {
        println!("{}", group_heading(i + 1, group));
        println!("{}\n", group_table(group));
    }
    let report = build_report(&session.groups);
    println!(
        "{} conflicts, {} transactions involved, {} manual overrides",
        report.total_groups, report.total_members, report.manual_overrides
    );
    Ok(())
}

/// Index for a 1-based number as typed on the command line.
fn from_one_based(number: i64, len: usize) -> Option<usize> {
    number
        .checked_sub(1)
        .and_then(|raw| checked_index(raw, len).ok())
}

pub fn select(files: &[String], group: i64, member: Option<i64>, auto: bool) -> Result<()> {
    let conn = open_store()?;
    let settings = load_settings();
    let mut session = detect_session(&conn, files, false)?;

    let total = session.groups.len();
    let group_idx = from_one_based(group, total)
        .ok_or_else(|| CrosscheckError::Other(format!("No conflict #{group} (found {total})")))?;
    let target = &mut session.groups[group_idx];

    if auto {
        let key = target.key.to_string();
        if delete_override(&conn, &key)? {
            println!("Conflict {group} reset to automatic resolution.");
        } else {
            println!("Conflict {group} has no manual override.");
        }
        return Ok(());
    }

    let Some(member) = member else {
        return Err(CrosscheckError::Other("member number is required".to_string()));
    };
    let len = target.members.len();
    let member_idx = from_one_based(member, len)
        .ok_or(CrosscheckError::OutOfRangeSelection { index: member, len })?;
    manual_select(target, member_idx)?;
    save_override(&conn, &Override::for_group(target, settings.reviewer()))?;

    let winner = target.winner();
    println!(
        "{}",
        format!(
            "\u{2192} Conflict {group}: keeping {} ({})",
            winner.file_name, winner.source_location
        )
        .green()
    );
    Ok(())
}

#[derive(Serialize)]
struct ApplyOutput<'a> {
    batch_id: Option<i64>,
    summary: ApplySummary,
    result: &'a ApplyResult,
}

pub fn apply(files: &[String], json: bool) -> Result<()> {
    let conn = open_store()?;
    let settings = load_settings();
    let session = detect_session(&conn, files, false)?;

    let result = apply_resolutions(&session.groups);
    let batch_id = if session.groups.is_empty() {
        None
    } else {
        Some(record_application(
            &conn,
            &session.groups,
            &session.file_ids,
            settings.reviewer(),
        )?)
    };
    let summary = summarize_apply(&result);

    if json {
        let out = ApplyOutput {
            batch_id,
            summary,
            result: &result,
        };
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    if !session.sufficient {
        println!("{}", NOT_ENOUGH_SOURCES.yellow());
        return Ok(());
    }
    if session.groups.is_empty() {
        println!("{}", "No duplicates found. Nothing to apply.".green());
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["Status", "Date", "Description", "Amount", "File", "Location"]);
    for t in &result.kept {
        table.add_row(vec![
            Cell::new("kept".green()),
            Cell::new(date_or_unknown(t.date)),
            Cell::new(&t.description),
            Cell::new(money(t.amount)),
            Cell::new(&t.file_name),
            Cell::new(&t.source_location),
        ]);
    }
    for t in &result.discarded {
        table.add_row(vec![
            Cell::new("discarded".red()),
            Cell::new(date_or_unknown(t.date)),
            Cell::new(&t.description),
            Cell::new(money(t.amount)),
            Cell::new(&t.file_name),
            Cell::new(&t.source_location),
        ]);
    }
    println!("Applied resolutions\n{table}");
    println!(
        "{} groups: {} kept ({}), {} discarded ({})",
        summary.group_count,
        summary.kept,
        money(summary.kept_total),
        summary.discarded,
        money(summary.discarded_total),
    );
    if session.reapplied > 0 {
        println!("{} manual overrides applied.", session.reapplied);
    }
    Ok(())
}
