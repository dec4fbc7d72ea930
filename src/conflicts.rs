use std::collections::{HashMap, HashSet};

use serde::Serialize;
use tracing::{debug, info};

use crate::models::Transaction;
use crate::normalizer::{normalize, NormalizedKey};
use crate::resolution::auto_resolve;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Resolution {
    Auto,
    Manual,
}

impl Resolution {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Manual => "manual",
        }
    }
}

/// Two or more transactions from the pool sharing one normalized key.
///
/// Groups are recomputed on every detection run; nothing here outlives the
/// caller that asked for them.
#[derive(Debug, Clone, Serialize)]
pub struct ConflictGroup {
    pub key: NormalizedKey,
    /// Confidence descending; equal confidence keeps pool order.
    pub members: Vec<Transaction>,
    pub resolution: Resolution,
    pub selected_index: usize,
}

impl ConflictGroup {
    pub fn winner(&self) -> &Transaction {
        &self.members[self.selected_index]
    }

    pub fn discarded(&self) -> impl Iterator<Item = &Transaction> {
        let selected = self.selected_index;
        self.members
            .iter()
            .enumerate()
            .filter(move |(i, _)| *i != selected)
            .map(|(_, t)| t)
    }

    pub fn position_of(&self, file_id: i64, source_location: &str) -> Option<usize> {
        self.members
            .iter()
            .position(|t| t.file_id == file_id && t.source_location == source_location)
    }
}

/// A pool needs at least two transactions from at least two files before any
/// cross-source conflict can exist.
pub fn has_sufficient_sources(transactions: &[Transaction]) -> bool {
    if transactions.len() < 2 {
        return false;
    }
    let files: HashSet<i64> = transactions.iter().map(|t| t.file_id).collect();
    files.len() >= 2
}

/// Duplicates reported by a single file are not cross-source conflicts.
fn spans_files(members: &[&Transaction]) -> bool {
    members.len() >= 2 && members.iter().any(|t| t.file_id != members[0].file_id)
}

pub fn detect_conflicts(transactions: &[Transaction]) -> Vec<ConflictGroup> {
    if !has_sufficient_sources(transactions) {
        debug!(pool = transactions.len(), "insufficient sources, no conflicts");
        return Vec::new();
    }

    // Ordered multimap: `order` keeps first-encounter order of keys.
    let mut index: HashMap<NormalizedKey, usize> = HashMap::new();
    let mut order: Vec<(NormalizedKey, Vec<&Transaction>)> = Vec::new();
    for txn in transactions {
        let key = normalize(txn);
        match index.get(&key) {
            Some(&slot) => order[slot].1.push(txn),
            None => {
                index.insert(key.clone(), order.len());
                order.push((key, vec![txn]));
            }
        }
    }

    let groups: Vec<ConflictGroup> = order
        .into_iter()
        .filter(|(_, members)| spans_files(members))
        .map(|(key, members)| {
            let mut members: Vec<Transaction> = members.into_iter().cloned().collect();
            // sort_by is stable, so equal confidence keeps pool order
            members.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
            let mut group = ConflictGroup {
                key,
                members,
                resolution: Resolution::Auto,
                selected_index: 0,
            };
            auto_resolve(&mut group);
            group
        })
        .collect();

    info!(
        pool = transactions.len(),
        groups = groups.len(),
        "conflict detection complete"
    );
    groups
}
