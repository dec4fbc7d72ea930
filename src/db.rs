use std::path::Path;

use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension, Row};
use tracing::debug;

use crate::conflicts::ConflictGroup;
use crate::error::{CrosscheckError, Result};
use crate::models::{ParsedRecord, SourceFile, Transaction, TransactionType};
use crate::resolution::Override;

pub const DB_FILE: &str = "crosscheck.db";

pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS files (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    checksum TEXT,
    record_count INTEGER NOT NULL DEFAULT 0,
    imported_at TEXT DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS transactions (
    id INTEGER PRIMARY KEY,
    file_id INTEGER NOT NULL,
    date TEXT,
    description TEXT NOT NULL,
    category TEXT,
    amount REAL NOT NULL,
    transaction_type TEXT NOT NULL,
    confidence REAL NOT NULL,
    source_location TEXT NOT NULL,
    created_at TEXT DEFAULT (datetime('now')),
    FOREIGN KEY (file_id) REFERENCES files(id)
);

CREATE TABLE IF NOT EXISTS overrides (
    id INTEGER PRIMARY KEY,
    group_key TEXT NOT NULL UNIQUE,
    file_id INTEGER NOT NULL,
    source_location TEXT NOT NULL,
    reviewer TEXT,
    created_at TEXT DEFAULT (datetime('now')),
    FOREIGN KEY (file_id) REFERENCES files(id)
);

CREATE TABLE IF NOT EXISTS apply_batches (
    id INTEGER PRIMARY KEY,
    applied_at TEXT DEFAULT (datetime('now')),
    reviewer TEXT,
    file_ids TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS applied_resolutions (
    id INTEGER PRIMARY KEY,
    batch_id INTEGER NOT NULL,
    transaction_id INTEGER NOT NULL,
    group_key TEXT NOT NULL,
    status TEXT NOT NULL,
    resolution TEXT NOT NULL,
    FOREIGN KEY (batch_id) REFERENCES apply_batches(id),
    FOREIGN KEY (transaction_id) REFERENCES transactions(id)
);
";

pub fn get_connection(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open(db_path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Files
// ---------------------------------------------------------------------------

pub fn checksum_exists(conn: &Connection, checksum: &str) -> Result<bool> {
    let mut stmt = conn.prepare("SELECT 1 FROM files WHERE checksum = ?1")?;
    Ok(stmt.exists([checksum])?)
}

/// Store a source file and its extracted records in one transaction.
pub fn insert_file(
    conn: &Connection,
    name: &str,
    checksum: Option<&str>,
    records: &[ParsedRecord],
) -> Result<i64> {
    let tx = conn.unchecked_transaction()?;
    tx.execute(
        "INSERT INTO files (name, checksum, record_count) VALUES (?1, ?2, ?3)",
        rusqlite::params![name, checksum, records.len() as i64],
    )?;
    let file_id = tx.last_insert_rowid();
    {
        let mut stmt = tx.prepare(
            "INSERT INTO transactions \
             (file_id, date, description, category, amount, transaction_type, confidence, source_location) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )?;
        for r in records {
            stmt.execute(rusqlite::params![
                file_id,
                r.date,
                r.description,
                r.category,
                r.amount,
                r.transaction_type.as_str(),
                r.confidence,
                r.source_location,
            ])?;
        }
    }
    tx.commit()?;
    debug!(file_id, name, records = records.len(), "stored source file");
    Ok(file_id)
}

fn row_to_file(row: &Row) -> rusqlite::Result<SourceFile> {
    Ok(SourceFile {
        id: row.get(0)?,
        name: row.get(1)?,
        checksum: row.get(2)?,
        record_count: row.get(3)?,
        imported_at: row.get(4)?,
    })
}

pub fn list_files(conn: &Connection) -> Result<Vec<SourceFile>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, checksum, record_count, imported_at FROM files ORDER BY id",
    )?;
    let rows = stmt
        .query_map([], row_to_file)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Look a file up by name, falling back to its numeric id.
pub fn find_file(conn: &Connection, ident: &str) -> Result<SourceFile> {
    let ident = ident.trim();
    let by_name = conn
        .query_row(
            "SELECT id, name, checksum, record_count, imported_at FROM files WHERE name = ?1",
            [ident],
            row_to_file,
        )
        .optional()?;
    if let Some(file) = by_name {
        return Ok(file);
    }
    let Ok(id) = ident.parse::<i64>() else {
        return Err(CrosscheckError::UnknownFile(ident.to_string()));
    };
    conn.query_row(
        "SELECT id, name, checksum, record_count, imported_at FROM files WHERE id = ?1",
        [id],
        row_to_file,
    )
    .optional()?
    .ok_or_else(|| CrosscheckError::UnknownFile(ident.to_string()))
}

// ---------------------------------------------------------------------------
// Transaction pool
// ---------------------------------------------------------------------------

fn row_to_transaction(row: &Row) -> rusqlite::Result<Transaction> {
    let raw_type: String = row.get(6)?;
    let transaction_type = TransactionType::parse(&raw_type).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            6,
            rusqlite::types::Type::Text,
            format!("unknown transaction type: {raw_type}").into(),
        )
    })?;
    Ok(Transaction {
        id: Some(row.get(0)?),
        date: row.get::<_, Option<NaiveDate>>(1)?,
        description: row.get(2)?,
        category: row.get(3)?,
        amount: row.get(4)?,
        transaction_type,
        confidence: row.get(5)?,
        source_location: row.get(7)?,
        file_id: row.get(8)?,
        file_name: row.get(9)?,
    })
}

/// Transactions of the selected files: files in selection order, rows in
/// insertion order within each file.
pub fn load_pool(conn: &Connection, file_ids: &[i64]) -> Result<Vec<Transaction>> {
    let mut stmt = conn.prepare(
        "SELECT t.id, t.date, t.description, t.category, t.amount, t.confidence, \
         t.transaction_type, t.source_location, t.file_id, f.name \
         FROM transactions t JOIN files f ON t.file_id = f.id \
         WHERE t.file_id = ?1 ORDER BY t.id",
    )?;
    let mut pool = Vec::new();
    for file_id in file_ids {
        let rows = stmt
            .query_map([file_id], row_to_transaction)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        pool.extend(rows);
    }
    debug!(files = file_ids.len(), pool = pool.len(), "loaded transaction pool");
    Ok(pool)
}

// ---------------------------------------------------------------------------
// Overrides
// ---------------------------------------------------------------------------

pub fn save_override(conn: &Connection, ov: &Override) -> Result<()> {
    conn.execute(
        "INSERT INTO overrides (group_key, file_id, source_location, reviewer) VALUES (?1, ?2, ?3, ?4) \
         ON CONFLICT(group_key) DO UPDATE SET file_id = excluded.file_id, \
         source_location = excluded.source_location, reviewer = excluded.reviewer, \
         created_at = datetime('now')",
        rusqlite::params![ov.group_key, ov.file_id, ov.source_location, ov.reviewer],
    )?;
    Ok(())
}

pub fn delete_override(conn: &Connection, group_key: &str) -> Result<bool> {
    let n = conn.execute("DELETE FROM overrides WHERE group_key = ?1", [group_key])?;
    Ok(n > 0)
}

pub fn load_overrides(conn: &Connection) -> Result<Vec<Override>> {
    let mut stmt = conn.prepare(
        "SELECT group_key, file_id, source_location, reviewer FROM overrides ORDER BY id",
    )?;
    let rows = stmt
        .query_map([], |row| {
            Ok(Override {
                group_key: row.get(0)?,
                file_id: row.get(1)?,
                source_location: row.get(2)?,
                reviewer: row.get(3)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

// ---------------------------------------------------------------------------
// Applied resolutions
// ---------------------------------------------------------------------------

/// Persist the outcome of every group: the winner as kept, the rest as
/// discarded. Returns the batch id.
pub fn record_application(
    conn: &Connection,
    groups: &[ConflictGroup],
    file_ids: &[i64],
    reviewer: Option<&str>,
) -> Result<i64> {
    let file_list = file_ids
        .iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(",");
    let tx = conn.unchecked_transaction()?;
    tx.execute(
        "INSERT INTO apply_batches (reviewer, file_ids) VALUES (?1, ?2)",
        rusqlite::params![reviewer, file_list],
    )?;
    let batch_id = tx.last_insert_rowid();
    {
        let mut stmt = tx.prepare(
            "INSERT INTO applied_resolutions (batch_id, transaction_id, group_key, status, resolution) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )?;
        for group in groups {
            let key = group.key.to_string();
            for (i, member) in group.members.iter().enumerate() {
                let txn_id = member.id.ok_or_else(|| {
                    CrosscheckError::Other(format!(
                        "transaction at {} was never stored",
                        member.source_location
                    ))
                })?;
                let status = if i == group.selected_index { "kept" } else { "discarded" };
                stmt.execute(rusqlite::params![
                    batch_id,
                    txn_id,
                    key,
                    status,
                    group.resolution.as_str(),
                ])?;
            }
        }
    }
    tx.commit()?;
    Ok(batch_id)
}
