//! Reconciliation Module Tests
//!
//! ## Test Scopes
//! - **Checker**: Match/mismatch decisions, gap rounding, empty-set handling.
//! - **Backup Reader**: CSV and GeoJSON snapshots, unreadable and empty files.

#[cfg(test)]
mod tests {
    use crate::reconcile::backup::{parse_backup_ids, read_backup_ids};
    use crate::reconcile::checker::reconcile;
    use crate::reconcile::types::{BackupError, InputError};
    use std::collections::BTreeSet;

    fn ids(values: &[u64]) -> BTreeSet<u64> {
        values.iter().copied().collect()
    }

    // ============================================================
    // CHECKER TESTS
    // ============================================================

    #[test]
    fn test_identical_sets_match() {
        let result = reconcile(&ids(&[1, 2, 3]), &ids(&[1, 2, 3])).unwrap();

        assert!(result.matched);
        assert_eq!(result.gap_percentage, 0);
        assert!(result.missing_ids.is_empty());
        assert!(result.extra_ids.is_empty());
        assert_eq!(result.expected_count, 3);
        assert_eq!(result.actual_count, 3);
    }

    #[test]
    fn test_one_missing_of_three_rounds_up() {
        let result = reconcile(&ids(&[1, 2]), &ids(&[1, 2, 3])).unwrap();

        assert!(!result.matched);
        assert_eq!(result.missing_ids, vec![3]);
        assert_eq!(result.gap_percentage, 34);
    }

    #[test]
    fn test_empty_live_set_is_full_gap() {
        let result = reconcile(&ids(&[]), &ids(&[1, 2, 3])).unwrap();

        assert!(!result.matched);
        assert_eq!(result.gap_percentage, 100);
        assert_eq!(result.missing_ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_extra_ids_do_not_count_toward_gap() {
        let result = reconcile(&ids(&[1, 2, 3, 4, 5]), &ids(&[1, 2, 3])).unwrap();

        assert!(!result.matched);
        assert_eq!(result.extra_ids, vec![4, 5]);
        assert_eq!(result.gap_percentage, 0);
    }

    #[test]
    fn test_empty_backup_never_matches() {
        let result = reconcile(&ids(&[9]), &ids(&[])).unwrap();

        assert!(!result.matched);
        assert_eq!(result.expected_count, 0);
        assert_eq!(result.gap_percentage, 0);
    }

    #[test]
    fn test_both_empty_is_input_error() {
        let result = reconcile(&ids(&[]), &ids(&[]));
        assert_eq!(result.unwrap_err(), InputError::NothingToReconcile);
    }

    #[test]
    fn test_small_gap_is_at_least_one_percent() {
        let backup: BTreeSet<u64> = (1..=1000).collect();
        let mut live = backup.clone();
        live.remove(&500);

        let result = reconcile(&live, &backup).unwrap();

        assert_eq!(result.gap_percentage, 1);
    }

    #[test]
    fn test_summary_caps_listed_ids() {
        let backup: BTreeSet<u64> = (1..=20).collect();
        let result = reconcile(&ids(&[1]), &backup).unwrap();

        let summary = result.summary(3);
        assert!(summary.contains("missing=[2, 3, 4, ... +16]"));
        assert!(summary.contains("gap=95%"));
    }

    // ============================================================
    // BACKUP READER TESTS
    // ============================================================

    #[test]
    fn test_parse_geojson_backup() {
        let content = r#"{"type":"FeatureCollection","features":[
            {"type":"Feature","properties":{"@id":"relation/51477","name":"Deutschland"}},
            {"type":"Feature","properties":{"osm_id": 62149,"name":"United Kingdom"}},
            {"type":"Feature","id":"relation/1428125","properties":{}}
        ]}"#;

        let parsed = parse_backup_ids(content);

        assert_eq!(parsed, ids(&[51477, 62149, 1428125]));
    }

    #[test]
    fn test_parse_csv_backup() {
        assert_eq!(parse_backup_ids("@id\n16239\n2202162\n"), ids(&[16239, 2202162]));
    }

    #[test]
    fn test_read_backup_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("countries.csv");
        std::fs::write(&path, "@id\n1\n2\n3\n").unwrap();

        assert_eq!(read_backup_ids(&path).unwrap(), ids(&[1, 2, 3]));
    }

    #[test]
    fn test_read_missing_backup_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = read_backup_ids(&dir.path().join("absent.geojson"));

        assert!(matches!(result, Err(BackupError::Io { .. })));
    }

    #[test]
    fn test_read_backup_without_ids_is_empty_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.csv");
        std::fs::write(&path, "@id\n").unwrap();

        assert!(matches!(read_backup_ids(&path), Err(BackupError::Empty(_))));
    }
}
