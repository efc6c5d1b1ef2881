//! Note Validator
//!
//! Record-level check of one materialized partition: every record (`<note>` unless other
//! markers are configured) must carry a numeric id and coordinates inside the WGS84
//! range. Invalid records are rejected individually; they never fail the whole partition.

use crate::partition::scanner::RecordScanner;
use crate::partition::types::{PartitionError, RecordMarkers};

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use std::path::Path;
use std::sync::OnceLock;

const SCAN_BLOCK: usize = 64 * 1024;

/// One validated note.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: u64,
    pub lat: f64,
    pub lon: f64,
    pub created_at: Option<String>,
    pub closed_at: Option<String>,
    pub comment_count: usize,
}

impl Note {
    pub fn is_open(&self) -> bool {
        self.closed_at.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RejectedRecord {
    /// Position of the record inside its partition, 0-based.
    pub ordinal: usize,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct ValidationOutcome {
    pub notes: Vec<Note>,
    pub rejected: Vec<RejectedRecord>,
}

impl ValidationOutcome {
    pub fn total(&self) -> usize {
        self.notes.len() + self.rejected.len()
    }
}

/// Attribute patterns for one record start marker.
pub struct NotePatterns {
    id: Regex,
    lat: Regex,
    lon: Regex,
    created_at: Regex,
    closed_at: Regex,
    comment: Regex,
}

impl NotePatterns {
    pub fn new(markers: &RecordMarkers) -> Self {
        let start = regex::escape(&String::from_utf8_lossy(&markers.start));
        // Attribute inside the opening tag only, never inside nested elements
        let pattern = |name: &str| {
            Regex::new(&format!(r#"^{}[^>]*?\s{}\s*=\s*"([^"]*)""#, start, name))
                .expect("escaped marker always compiles")
        };

        Self {
            id: pattern("id"),
            lat: pattern("lat"),
            lon: pattern("lon"),
            created_at: pattern("created_at"),
            closed_at: pattern("closed_at"),
            comment: Regex::new(r"<comment[\s>/]").expect("static pattern is valid"),
        }
    }

    /// Parses one record opened by this pattern set's start marker.
    pub fn parse(&self, record: &str) -> Result<Note, String> {
        let raw_id = attribute(&self.id, record).ok_or("missing id")?;
        let id: u64 = raw_id
            .parse()
            .map_err(|_| format!("id '{}' is not a number", raw_id))?;
        if id == 0 {
            return Err("id must be positive".to_string());
        }

        Ok(Note {
            id,
            lat: coordinate(&self.lat, record, "lat", 90.0)?,
            lon: coordinate(&self.lon, record, "lon", 180.0)?,
            created_at: attribute(&self.created_at, record).map(str::to_string),
            closed_at: attribute(&self.closed_at, record)
                .filter(|value| !value.is_empty())
                .map(str::to_string),
            comment_count: self.comment.find_iter(record).count(),
        })
    }
}

fn default_patterns() -> &'static NotePatterns {
    static PATTERNS: OnceLock<NotePatterns> = OnceLock::new();
    PATTERNS.get_or_init(|| NotePatterns::new(&RecordMarkers::default()))
}

fn attribute<'t>(pattern: &Regex, record: &'t str) -> Option<&'t str> {
    pattern
        .captures(record)
        .and_then(|cap| cap.get(1))
        .map(|m| m.as_str().trim())
}

fn coordinate(pattern: &Regex, record: &str, name: &str, limit: f64) -> Result<f64, String> {
    let raw = attribute(pattern, record).ok_or_else(|| format!("missing {}", name))?;
    let value: f64 = raw
        .parse()
        .map_err(|_| format!("{} '{}' is not a number", name, raw))?;
    if !value.is_finite() || value.abs() > limit {
        return Err(format!("{} {} outside [-{}, {}]", name, value, limit, limit));
    }
    Ok(value)
}

/// Parses one `<note ...>...</note>` record.
pub fn parse_note(record: &str) -> Result<Note, String> {
    default_patterns().parse(record)
}

/// Validates every record of an in-memory document.
pub fn validate_bytes(
    bytes: &[u8],
    markers: &RecordMarkers,
) -> Result<ValidationOutcome, PartitionError> {
    let mut source = Cursor::new(bytes);
    let mut scanner = RecordScanner::new(&mut source, markers, SCAN_BLOCK)?;
    let len = scanner.len();
    let records = scanner.walk_records(0, len)?;

    let patterns = if *markers == RecordMarkers::default() {
        None
    } else {
        Some(NotePatterns::new(markers))
    };
    let patterns = patterns.as_ref().unwrap_or_else(|| default_patterns());

    let mut outcome = ValidationOutcome::default();
    for (ordinal, range) in records.iter().enumerate() {
        let record = String::from_utf8_lossy(&bytes[range.start as usize..range.end as usize]);
        match patterns.parse(&record) {
            Ok(note) => outcome.notes.push(note),
            Err(reason) => outcome.rejected.push(RejectedRecord { ordinal, reason }),
        }
    }
    Ok(outcome)
}

/// Validates every record of a partition file.
pub fn validate_partition(
    path: &Path,
    markers: &RecordMarkers,
) -> Result<ValidationOutcome, PartitionError> {
    let bytes = std::fs::read(path)?;
    validate_bytes(&bytes, markers)
}
