//! Cut-Point Planning
//!
//! Both strategies decide the same record-to-part assignment: part sizes differ by at
//! most one record, larger parts first. They only differ in how the byte offset of each
//! cut is found.

use super::scanner::{Marker, RecordScanner};
use super::types::*;

use std::io::{Read, Seek};

/// First read when looking for the root wrapper; grown as needed.
const ROOT_SCAN_START: u64 = 64 * 1024;

/// Number of parts for `total` records.
///
/// Never more than `target`, never more than `total` (no empty parts), and reduced so
/// each part holds at least `min_records` when the document is large enough for that.
pub fn effective_parts(total: usize, target: usize, min_records: usize) -> usize {
    if total == 0 {
        return 0;
    }
    let floor = min_records.max(1);
    target.max(1).min(total).min((total / floor).max(1))
}

/// Record counts per part, larger parts first.
pub fn part_sizes(total: usize, parts: usize) -> Vec<usize> {
    if parts == 0 {
        return Vec::new();
    }
    let base = total / parts;
    let remainder = total % parts;
    (0..parts)
        .map(|i| base + usize::from(i < remainder))
        .collect()
}

/// Cumulative record count at the end of every part except the last.
pub fn cut_targets(sizes: &[usize]) -> Vec<usize> {
    sizes
        .iter()
        .take(sizes.len().saturating_sub(1))
        .scan(0, |acc, size| {
            *acc += size;
            Some(*acc)
        })
        .collect()
}

/// Linear strategy: one pass collecting every record span, cuts read off the list.
pub fn plan_linear<R: Read + Seek>(
    scanner: &mut RecordScanner<'_, R>,
    request: &PartitionRequest,
) -> Result<PartitionPlan, PartitionError> {
    let len = scanner.len();
    let records = scanner.walk_records(0, len)?;

    let (Some(first), Some(last)) = (records.first(), records.last()) else {
        let root = check_empty_wrapper(scanner)?;
        return Ok(empty_plan(PartitionStrategy::Linear, root, len));
    };

    let header = ByteRange::new(0, first.start);
    let footer = ByteRange::new(last.end, len);
    let root = check_wrapper(scanner, header, footer)?;

    let parts = effective_parts(records.len(), request.target_parts, request.min_records_per_part);
    let sizes = part_sizes(records.len(), parts);
    let cuts: Vec<u64> = cut_targets(&sizes)
        .into_iter()
        .map(|target| records[target - 1].end)
        .collect();

    Ok(PartitionPlan {
        strategy: PartitionStrategy::Linear,
        total_records: records.len(),
        root,
        header,
        footer,
        parts: build_parts(header.end, footer.start, &cuts, &sizes),
        seeks: 0,
    })
}

/// Binary strategy: census the blocks, then binary-search each cut offset.
///
/// The census keeps one counter pair and depth profile per block instead of one span per
/// record, and each cut costs `O(log size)` boundary seeks. Ordering errors are the
/// ones the linear walk reports.
pub fn plan_binary<R: Read + Seek>(
    scanner: &mut RecordScanner<'_, R>,
    request: &PartitionRequest,
) -> Result<PartitionPlan, PartitionError> {
    let len = scanner.len();
    scanner.check_order()?;
    let (starts, ends) = scanner.census()?;
    if ends == 0 {
        let root = check_empty_wrapper(scanner)?;
        return Ok(empty_plan(PartitionStrategy::Binary, root, len));
    }

    let unbalanced = || PartitionError::Unbalanced { starts, ends };
    let end_len = scanner.end_marker_len();
    let first_start = scanner.find(Marker::Start, 0, len)?.ok_or_else(unbalanced)?;
    let last_end = scanner
        .rfind_end(0, len)?
        .map(|at| at + end_len)
        .ok_or_else(unbalanced)?;
    if first_start >= last_end {
        return Err(PartitionError::UnexpectedEnd { offset: last_end });
    }

    let header = ByteRange::new(0, first_start);
    let footer = ByteRange::new(last_end, len);
    let root = check_wrapper(scanner, header, footer)?;

    let total = ends as usize;
    let parts = effective_parts(total, request.target_parts, request.min_records_per_part);
    let sizes = part_sizes(total, parts);

    let mut cuts = Vec::with_capacity(parts.saturating_sub(1));
    let mut lo = first_start;
    for target in cut_targets(&sizes) {
        let cut = locate_cut(scanner, target as u64, lo, last_end)?;
        cuts.push(cut);
        lo = cut;
    }

    tracing::debug!(
        "Binary plan located {} cut(s) with {} seek(s)",
        cuts.len(),
        scanner.seeks()
    );

    Ok(PartitionPlan {
        strategy: PartitionStrategy::Binary,
        total_records: total,
        root,
        header,
        footer,
        parts: build_parts(first_start, last_end, &cuts, &sizes),
        seeks: scanner.seeks(),
    })
}

/// Smallest record boundary after which `target` records are complete.
///
/// Searches offsets in `[lo, hi]`; the predicate "records completed by the next boundary
/// at or after this offset >= target" is monotonic in the offset.
fn locate_cut<R: Read + Seek>(
    scanner: &mut RecordScanner<'_, R>,
    target: u64,
    mut lo: u64,
    last_end: u64,
) -> Result<u64, PartitionError> {
    let mut hi = last_end;

    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        let boundary = scanner.next_boundary(mid, last_end)?.unwrap_or(last_end);
        if scanner.records_before(boundary)? >= target {
            hi = mid;
        } else {
            lo = mid + 1;
        }
    }

    let cut = scanner.next_boundary(lo, last_end)?.unwrap_or(last_end);
    debug_assert_eq!(scanner.records_before(cut).ok(), Some(target));
    Ok(cut)
}

fn build_parts(body_start: u64, body_end: u64, cuts: &[u64], sizes: &[usize]) -> Vec<PlannedPart> {
    let mut bounds = Vec::with_capacity(cuts.len() + 2);
    bounds.push(body_start);
    bounds.extend_from_slice(cuts);
    bounds.push(body_end);

    sizes
        .iter()
        .enumerate()
        .map(|(index, &record_count)| PlannedPart {
            index,
            range: ByteRange::new(bounds[index], bounds[index + 1]),
            record_count,
        })
        .collect()
}

fn empty_plan(strategy: PartitionStrategy, root: String, len: u64) -> PartitionPlan {
    PartitionPlan {
        strategy,
        total_records: 0,
        root,
        header: ByteRange::new(0, len),
        footer: ByteRange::new(len, len),
        parts: Vec::new(),
        seeks: 0,
    }
}

/// First element name in `head` that is not a declaration, comment or closing tag,
/// with the byte offset where its opening tag ends and whether it self-closes.
fn find_root(head: &[u8]) -> Option<(String, usize, bool)> {
    let mut i = 0;
    while i + 1 < head.len() {
        let next = head[i + 1];
        if head[i] == b'<' && (next.is_ascii_alphabetic() || next == b'_') {
            let name_end = head[i + 1..]
                .iter()
                .position(|b| b.is_ascii_whitespace() || *b == b'>' || *b == b'/')
                .map(|p| i + 1 + p)?;
            let tag_end = head[name_end..].iter().position(|b| *b == b'>')? + name_end;
            let self_closing = head[tag_end - 1] == b'/';
            let name = String::from_utf8_lossy(&head[i + 1..name_end]).into_owned();
            return Some((name, tag_end + 1, self_closing));
        }
        i += 1;
    }
    None
}

fn closes(tail: &[u8], root: &str) -> bool {
    let closing = format!("</{}", root);
    let closing = closing.as_bytes();
    tail.windows(closing.len() + 1).any(|w| {
        w.starts_with(closing) && {
            let after = w[closing.len()];
            after == b'>' || after.is_ascii_whitespace()
        }
    })
}

/// Finds the root element within the first `limit` bytes, reading a growing prefix so
/// long prologues (comments, DTDs) are still crossed.
fn locate_root<R: Read + Seek>(
    scanner: &mut RecordScanner<'_, R>,
    limit: u64,
) -> std::io::Result<Option<(String, usize, bool)>> {
    let mut prefix = ROOT_SCAN_START.min(limit);
    loop {
        let head = scanner.read_range(ByteRange::new(0, prefix))?;
        if let Some(found) = find_root(&head) {
            return Ok(Some(found));
        }
        if prefix >= limit {
            return Ok(None);
        }
        prefix = prefix.saturating_mul(2).min(limit);
    }
}

/// The header must open a root element and the footer must close it.
fn check_wrapper<R: Read + Seek>(
    scanner: &mut RecordScanner<'_, R>,
    header: ByteRange,
    footer: ByteRange,
) -> Result<String, PartitionError> {
    let (root, _, self_closing) =
        locate_root(scanner, header.end)?.ok_or(PartitionError::MissingRoot)?;
    if self_closing {
        return Err(PartitionError::MissingRoot);
    }

    let tail = scanner.read_range(footer)?;
    if !closes(&tail, &root) {
        return Err(PartitionError::MissingRoot);
    }
    Ok(root)
}

/// A record-free document is valid when its root self-closes or is closed later on.
/// A blank document is also accepted and reports an empty root name.
fn check_empty_wrapper<R: Read + Seek>(
    scanner: &mut RecordScanner<'_, R>,
) -> Result<String, PartitionError> {
    let len = scanner.len();
    let Some((root, open_end, self_closing)) = locate_root(scanner, len)? else {
        let blank = scanner
            .read_range(ByteRange::new(0, len))?
            .iter()
            .all(|b| b.is_ascii_whitespace());
        return if blank {
            Ok(String::new())
        } else {
            Err(PartitionError::MissingRoot)
        };
    };
    if self_closing {
        return Ok(root);
    }

    let tail_start = (open_end as u64).max(len.saturating_sub(ROOT_SCAN_START));
    let tail = scanner.read_range(ByteRange::new(tail_start, len))?;
    if !closes(&tail, &root) {
        return Err(PartitionError::MissingRoot);
    }
    Ok(root)
}
