use colored::Colorize;
use dialoguer::Select;

use super::conflicts::{group_heading, group_table, NOT_ENOUGH_SOURCES};
use super::{detect_session, open_store};
use crate::db::save_override;
use crate::error::Result;
use crate::fmt::confidence;
use crate::resolution::{manual_select, Override};
use crate::settings::load_settings;

pub fn run(files: &[String]) -> Result<()> {
    let conn = open_store()?;
    let settings = load_settings();
    let mut session = detect_session(&conn, files, false)?;

    if !session.sufficient {
        println!("{}", NOT_ENOUGH_SOURCES.yellow());
        return Ok(());
    }
    if session.groups.is_empty() {
        println!("{}", "No duplicates found.".green());
        return Ok(());
    }

    let total = session.groups.len();
    println!("\n{total} conflicts to review (Esc to pause)\n");

    let mut changed = 0usize;
    for (i, group) in session.groups.iter_mut().enumerate() {
        println!("{}", "\u{2500}".repeat(60));
        println!("{}", group_heading(i + 1, group));
        println!("{}", group_table(group));

        let items: Vec<String> = group
            .members
            .iter()
            .map(|t| {
                format!(
                    "{} ({}) {}",
                    t.file_name,
                    t.source_location,
                    confidence(t.confidence)
                )
            })
            .collect();

        let choice = Select::new()
            .with_prompt("Keep which record?")
            .items(&items)
            .default(group.selected_index)
            .interact_opt()
            .unwrap_or(None);

        let Some(idx) = choice else {
            println!("{}", "Review paused.".yellow());
            return Ok(());
        };
        if idx == group.selected_index {
            continue;
        }

        manual_select(group, idx)?;
        save_override(&conn, &Override::for_group(group, settings.reviewer()))?;
        changed += 1;
        let winner = group.winner();
        println!(
            "{}",
            format!("\u{2192} Keeping {} ({})", winner.file_name, winner.source_location).green()
        );
        println!();
    }

    println!("{}", format!("Review complete! {changed} of {total} changed.").green());
    Ok(())
}
