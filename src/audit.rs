use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension};
use serde::Serialize;

use crate::conflicts::{ConflictGroup, Resolution};
use crate::error::Result;
use crate::models::{Transaction, TransactionType};
use crate::resolution::ApplyResult;

// ---------------------------------------------------------------------------
// Conflict report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct MemberAudit {
    pub file_id: i64,
    pub file_name: String,
    pub source_location: String,
    pub confidence: f64,
    pub transaction_type: TransactionType,
    pub category: Option<String>,
}

impl From<&Transaction> for MemberAudit {
    fn from(t: &Transaction) -> Self {
        Self {
            file_id: t.file_id,
            file_name: t.file_name.clone(),
            source_location: t.source_location.clone(),
            confidence: t.confidence,
            transaction_type: t.transaction_type,
            category: t.category.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GroupAudit {
    /// 1-based, in detection order.
    pub number: usize,
    pub key: String,
    pub date: Option<NaiveDate>,
    pub description: String,
    pub amount: f64,
    pub resolution: Resolution,
    pub selected_index: usize,
    pub winner: MemberAudit,
    pub discarded: Vec<MemberAudit>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConflictReport {
    pub groups: Vec<GroupAudit>,
    pub total_groups: usize,
    pub total_members: usize,
    pub manual_overrides: usize,
}

pub fn build_report(groups: &[ConflictGroup]) -> ConflictReport {
    let audits: Vec<GroupAudit> = groups
        .iter()
        .enumerate()
        .map(|(i, g)| {
            let winner = g.winner();
            GroupAudit {
                number: i + 1,
                key: g.key.to_string(),
                date: winner.date,
                description: winner.description.clone(),
                amount: winner.amount,
                resolution: g.resolution,
                selected_index: g.selected_index,
                winner: MemberAudit::from(winner),
                discarded: g.discarded().map(MemberAudit::from).collect(),
            }
        })
        .collect();

    ConflictReport {
        total_groups: audits.len(),
        total_members: groups.iter().map(|g| g.members.len()).sum(),
        manual_overrides: groups
            .iter()
            .filter(|g| g.resolution == Resolution::Manual)
            .count(),
        groups: audits,
    }
}

// ---------------------------------------------------------------------------
// Apply summary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct ApplySummary {
    pub group_count: usize,
    pub kept: usize,
    pub discarded: usize,
    /// Sum of kept amounts; the value that flows on to aggregation.
    pub kept_total: f64,
    /// Sum of discarded amounts; double counting avoided by resolving.
    pub discarded_total: f64,
}

pub fn summarize_apply(result: &ApplyResult) -> ApplySummary {
    ApplySummary {
        group_count: result.group_count,
        kept: result.kept.len(),
        discarded: result.discarded.len(),
        kept_total: result.kept.iter().map(|t| t.amount).sum(),
        discarded_total: result.discarded.iter().map(|t| t.amount).sum(),
    }
}

// ---------------------------------------------------------------------------
// Last committed application (from the store)
// ---------------------------------------------------------------------------

pub struct AppliedRow {
    pub group_key: String,
    pub status: String,
    pub resolution: String,
    pub date: Option<String>,
    pub description: String,
    pub amount: f64,
    pub confidence: f64,
    pub file_name: String,
    pub source_location: String,
}

pub struct AppliedAudit {
    pub batch_id: i64,
    pub applied_at: String,
    pub reviewer: Option<String>,
    pub rows: Vec<AppliedRow>,
}

pub fn get_last_application(conn: &Connection) -> Result<Option<AppliedAudit>> {
    let batch: Option<(i64, String, Option<String>)> = conn
        .query_row(
            "SELECT id, applied_at, reviewer FROM apply_batches ORDER BY id DESC LIMIT 1",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )
        .optional()?;
    let Some((batch_id, applied_at, reviewer)) = batch else {
        return Ok(None);
    };

    let mut stmt = conn.prepare(
        "SELECT r.group_key, r.status, r.resolution, t.date, t.description, t.amount, \
         t.confidence, f.name, t.source_location \
         FROM applied_resolutions r \
         JOIN transactions t ON r.transaction_id = t.id \
         JOIN files f ON t.file_id = f.id \
         WHERE r.batch_id = ?1 ORDER BY r.id",
    )?;
    let rows = stmt
        .query_map([batch_id], |row| {
            Ok(AppliedRow {
                group_key: row.get(0)?,
                status: row.get(1)?,
                resolution: row.get(2)?,
                date: row.get(3)?,
                description: row.get(4)?,
                amount: row.get(5)?,
                confidence: row.get(6)?,
                file_name: row.get(7)?,
                source_location: row.get(8)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(Some(AppliedAudit {
        batch_id,
        applied_at,
        reviewer,
        rows,
    }))
}
