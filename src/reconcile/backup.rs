//! Backup Snapshot Reader
//!
//! Boundary backups are either a CSV id list (the Overpass `[out:csv(::id)]` shape) or a
//! GeoJSON export whose features carry the relation id as `id`, `@id` or `osm_id`,
//! sometimes prefixed with `relation/`.

use super::types::{BackupError, FeatureId};
use crate::query::validate::parse_csv_ids;

use regex::Regex;
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::OnceLock;

fn json_id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#""(?:@id|id|osm_id)"\s*:\s*"?(?:relation/)?(\d+)"?"#)
            .expect("static pattern is valid")
    })
}

/// Reads the id set out of a backup file.
pub fn read_backup_ids(path: &Path) -> Result<BTreeSet<FeatureId>, BackupError> {
    let content = std::fs::read_to_string(path).map_err(|source| BackupError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let ids = parse_backup_ids(&content);
    if ids.is_empty() {
        return Err(BackupError::Empty(path.to_path_buf()));
    }

    tracing::debug!("Read {} ids from backup {}", ids.len(), path.display());
    Ok(ids)
}

/// Detects the snapshot shape from its first non-blank character.
pub fn parse_backup_ids(content: &str) -> BTreeSet<FeatureId> {
    let looks_like_json = content
        .trim_start()
        .starts_with(|c: char| c == '{' || c == '[');

    if looks_like_json {
        json_id_pattern()
            .captures_iter(content)
            .filter_map(|cap| cap.get(1))
            .filter_map(|m| m.as_str().parse::<FeatureId>().ok())
            .collect()
    } else {
        parse_csv_ids(content)
    }
}
