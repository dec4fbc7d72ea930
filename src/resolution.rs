use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::conflicts::{ConflictGroup, Resolution};
use crate::error::{CrosscheckError, Result};
use crate::models::Transaction;

pub fn auto_resolve(group: &mut ConflictGroup) {
    group.selected_index = 0;
    group.resolution = Resolution::Auto;
}

/// Pin `member_index` as the winner. Out-of-range indices are an error and
/// leave the group as it was.
pub fn manual_select(group: &mut ConflictGroup, member_index: usize) -> Result<()> {
    if member_index >= group.members.len() {
        return Err(CrosscheckError::OutOfRangeSelection {
            index: i64::try_from(member_index).unwrap_or(i64::MAX),
            len: group.members.len(),
        });
    }
    group.selected_index = member_index;
    group.resolution = Resolution::Manual;
    debug!(key = %group.key, member_index, "manual selection");
    Ok(())
}

/// Validate a signed index coming from outside (CLI, JSON) against a group size.
pub fn checked_index(raw: i64, len: usize) -> Result<usize> {
    usize::try_from(raw)
        .ok()
        .filter(|&i| i < len)
        .ok_or(CrosscheckError::OutOfRangeSelection { index: raw, len })
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ApplyResult {
    pub kept: Vec<Transaction>,
    pub discarded: Vec<Transaction>,
    pub group_count: usize,
}

pub fn apply_resolutions(groups: &[ConflictGroup]) -> ApplyResult {
    let mut result = ApplyResult {
        group_count: groups.len(),
        ..Default::default()
    };
    for group in groups {
        result.kept.push(group.winner().clone());
        result.discarded.extend(group.discarded().cloned());
    }
    info!(
        groups = result.group_count,
        kept = result.kept.len(),
        discarded = result.discarded.len(),
        "resolutions applied"
    );
    result
}

/// A manual selection persisted by the caller so it survives a re-run of
/// detection. Identified by the group key text and the winner's provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Override {
    pub group_key: String,
    pub file_id: i64,
    pub source_location: String,
    pub reviewer: Option<String>,
}

impl Override {
    pub fn for_group(group: &ConflictGroup, reviewer: Option<&str>) -> Self {
        let winner = group.winner();
        Self {
            group_key: group.key.to_string(),
            file_id: winner.file_id,
            source_location: winner.source_location.clone(),
            reviewer: reviewer.map(str::to_string),
        }
    }
}

/// Reapply persisted overrides to freshly detected groups. Returns how many
/// were applied; overrides whose group or member is gone are skipped.
pub fn reapply_overrides(groups: &mut [ConflictGroup], overrides: &[Override]) -> usize {
    let mut applied = 0usize;
    for ov in overrides {
        let Some(group) = groups.iter_mut().find(|g| g.key.to_string() == ov.group_key) else {
            debug!(key = %ov.group_key, "override has no matching group");
            continue;
        };
        let Some(idx) = group.position_of(ov.file_id, &ov.source_location) else {
            warn!(
                key = %ov.group_key,
                file_id = ov.file_id,
                location = %ov.source_location,
                "override member no longer in group"
            );
            continue;
        };
        if manual_select(group, idx).is_ok() {
            applied += 1;
        }
    }
    applied
}
