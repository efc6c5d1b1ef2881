use super::types::{FeatureId, InputError, ReconciliationResult};

use std::collections::BTreeSet;

/// Compares `live_ids` (from the query service) against `backup_ids`.
///
/// `matched` requires both sets to be non-empty and equal. An empty live set against a
/// non-empty backup is a full gap. The gap is rounded up, so any missing id yields at
/// least 1%.
pub fn reconcile(
    live_ids: &BTreeSet<FeatureId>,
    backup_ids: &BTreeSet<FeatureId>,
) -> Result<ReconciliationResult, InputError> {
    if live_ids.is_empty() && backup_ids.is_empty() {
        return Err(InputError::NothingToReconcile);
    }

    let missing_ids: Vec<FeatureId> = backup_ids.difference(live_ids).copied().collect();
    let extra_ids: Vec<FeatureId> = live_ids.difference(backup_ids).copied().collect();

    let matched = !live_ids.is_empty()
        && !backup_ids.is_empty()
        && missing_ids.is_empty()
        && extra_ids.is_empty();

    Ok(ReconciliationResult {
        matched,
        expected_count: backup_ids.len(),
        actual_count: live_ids.len(),
        gap_percentage: gap_percentage(missing_ids.len(), backup_ids.len()),
        missing_ids,
        extra_ids,
    })
}

fn gap_percentage(missing: usize, expected: usize) -> u32 {
    let denominator = expected.max(1) as u64;
    let scaled = missing as u64 * 100;
    scaled.div_ceil(denominator) as u32
}
