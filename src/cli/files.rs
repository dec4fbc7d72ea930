use std::path::PathBuf;

use colored::Colorize;
use comfy_table::{Cell, Table};

use super::open_store;
use crate::db::list_files;
use crate::error::Result;
use crate::importer::import_file;

pub fn add(path: &str, name: Option<&str>) -> Result<()> {
    let conn = open_store()?;
    let result = import_file(&conn, &PathBuf::from(path), name)?;

    if result.duplicate_file {
        println!("This file has already been loaded (duplicate checksum).");
        return Ok(());
    }

    let id = result.file_id.unwrap_or_default();
    println!(
        "{}",
        format!("Loaded {} transactions as source file #{id}", result.imported).green()
    );
    Ok(())
}

pub fn list() -> Result<()> {
    let conn = open_store()?;
    let files = list_files(&conn)?;

    if files.is_empty() {
        println!("No source files loaded. Add one with `crosscheck files add <path>`.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["ID", "Name", "Transactions", "Checksum", "Loaded"]);
    for f in &files {
        let checksum = f
            .checksum
            .as_deref()
            .map(|c| c.chars().take(12).collect::<String>())
            .unwrap_or_else(|| "\u{2014}".to_string());
        table.add_row(vec![
            Cell::new(f.id),
            Cell::new(&f.name),
            Cell::new(f.record_count),
            Cell::new(checksum),
            Cell::new(&f.imported_at),
        ]);
    }
    println!("{table}");
    Ok(())
}
