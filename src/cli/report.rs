use colored::Colorize;
use comfy_table::{Cell, Table};

use super::open_store;
use crate::audit::get_last_application;
use crate::error::Result;
use crate::fmt::{confidence, money};

pub fn run() -> Result<()> {
    let conn = open_store()?;
    let Some(audit) = get_last_application(&conn)? else {
        println!("{}", "No resolutions applied yet.".yellow());
        return Ok(());
    };

    println!(
        "Batch {} applied {}{}",
        audit.batch_id,
        audit.applied_at,
        audit
            .reviewer
            .as_deref()
            .map(|r| format!(" by {r}"))
            .unwrap_or_default()
    );

    let mut table = Table::new();
    table.set_header(vec![
        "Group", "Status", "Resolution", "File", "Location", "Date", "Description", "Amount",
        "Confidence",
    ]);
    for row in &audit.rows {
        let status = if row.status == "kept" {
            row.status.green()
        } else {
            row.status.red()
        };
        table.add_row(vec![
            Cell::new(&row.group_key),
            Cell::new(status),
            Cell::new(&row.resolution),
            Cell::new(&row.file_name),
            Cell::new(&row.source_location),
            Cell::new(row.date.as_deref().unwrap_or("(no date)")),
            Cell::new(&row.description),
            Cell::new(money(row.amount)),
            Cell::new(confidence(row.confidence)),
        ]);
    }
    println!("{table}");

    let kept = audit.rows.iter().filter(|r| r.status == "kept").count();
    println!("{kept} kept, {} discarded", audit.rows.len() - kept);
    Ok(())
}
