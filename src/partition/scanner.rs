//! Record Boundary Scanner
//!
//! Byte-level marker search over a seekable source. Both partitioning strategies share
//! one marker matcher (`matches_at`, which knows what a record start and end look like)
//! and one windowed reader. On top of those, the linear strategy uses `walk_records`
//! and the binary strategy uses `next_boundary` plus the block census.
//!
//! Reads happen in windows of `block_size` bytes plus a short lookahead so markers that
//! straddle a window edge are still found exactly once (a match belongs to the window
//! containing its first byte).

use super::types::{ByteRange, PartitionError, RecordMarkers};

use std::io::{self, Read, Seek, SeekFrom};

/// Smallest window accepted, whatever the configuration says.
const MIN_BLOCK_SIZE: usize = 64;

/// Window used by forward searches; records are small, so most searches finish in one read.
const SEARCH_WINDOW: usize = 16 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    Start,
    End,
}

/// Start/end marker counts for one census block, plus its record depth profile.
///
/// Depths are relative to the depth on entry to the block: every start adds one, every
/// end removes one. `last_start` is the offset of the block's last start marker.
#[derive(Debug, Clone, Copy, Default)]
struct BlockCount {
    starts: u64,
    ends: u64,
    min_depth: i64,
    max_depth: i64,
    last_start: Option<u64>,
}

pub struct RecordScanner<'a, R> {
    source: &'a mut R,
    markers: &'a RecordMarkers,
    len: u64,
    block_size: usize,
    /// Lazily filled census, one entry per `block_size` block of the source.
    blocks: Vec<Option<BlockCount>>,
    seeks: usize,
}

impl<'a, R: Read + Seek> RecordScanner<'a, R> {
    pub fn new(source: &'a mut R, markers: &'a RecordMarkers, block_size: usize) -> io::Result<Self> {
        let len = source.seek(SeekFrom::End(0))?;
        let block_size = block_size.max(MIN_BLOCK_SIZE).max(markers.longest() * 4);
        let block_count = len.div_ceil(block_size as u64) as usize;

        Ok(Self {
            source,
            markers,
            len,
            block_size,
            blocks: vec![None; block_count],
            seeks: 0,
        })
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn end_marker_len(&self) -> u64 {
        self.markers.end.len() as u64
    }

    /// Boundary seeks performed so far.
    pub fn seeks(&self) -> usize {
        self.seeks
    }

    pub fn read_range(&mut self, range: ByteRange) -> io::Result<Vec<u8>> {
        let end = range.end.min(self.len);
        if range.start >= end {
            return Ok(Vec::new());
        }
        let mut buf = vec![0u8; (end - range.start) as usize];
        self.source.seek(SeekFrom::Start(range.start))?;
        self.source.read_exact(&mut buf)?;
        Ok(buf)
    }

    fn pattern(&self, marker: Marker) -> &'a [u8] {
        let markers: &'a RecordMarkers = self.markers;
        match marker {
            Marker::Start => &markers.start,
            Marker::End => &markers.end,
        }
    }

    /// Whether `marker` occurs at `buf[i]`. A start marker also needs a delimiter byte.
    fn matches_at(&self, buf: &[u8], i: usize, marker: Marker) -> bool {
        let pattern = self.pattern(marker);
        if !buf[i..].starts_with(pattern) {
            return false;
        }
        match marker {
            Marker::End => true,
            Marker::Start => matches!(
                buf.get(i + pattern.len()),
                Some(b) if b.is_ascii_whitespace() || *b == b'>' || *b == b'/'
            ),
        }
    }

    /// Visits windows covering match positions in `[from, until)`.
    ///
    /// The callback receives the window bytes, the number of leading positions that
    /// belong to the window, and the window's source offset. Returning `Some` stops.
    fn scan_windows<T, F>(
        &mut self,
        from: u64,
        until: u64,
        window: usize,
        mut visit: F,
    ) -> io::Result<Option<T>>
    where
        F: FnMut(&Self, &[u8], usize, u64) -> Option<T>,
    {
        let until = until.min(self.len);
        let lookahead = self.markers.longest() as u64 + 1;
        let mut window_start = from;

        while window_start < until {
            let window_end = (window_start + window as u64).min(until);
            let buf = self.read_range(ByteRange::new(window_start, window_end + lookahead))?;
            let positions = (window_end - window_start) as usize;

            if let Some(found) = visit(self, &buf, positions, window_start) {
                return Ok(Some(found));
            }
            window_start = window_end;
        }
        Ok(None)
    }

    /// First occurrence of `marker` starting in `[from, until)`.
    pub fn find(&mut self, marker: Marker, from: u64, until: u64) -> io::Result<Option<u64>> {
        let first = self.pattern(marker)[0];
        let window = SEARCH_WINDOW.min(self.block_size);
        self.scan_windows(from, until, window, |scanner, buf, positions, offset| {
            (0..positions)
                .filter(|&i| buf[i] == first)
                .find(|&i| scanner.matches_at(buf, i, marker))
                .map(|i| offset + i as u64)
        })
    }

    /// Counts start and end markers starting in `[from, until)`.
    fn count(&mut self, from: u64, until: u64) -> io::Result<BlockCount> {
        let mut total = BlockCount::default();
        let mut depth: i64 = 0;
        let start_first = self.markers.start[0];
        let end_first = self.markers.end[0];

        let window = self.block_size;
        self.scan_windows(from, until, window, |scanner, buf, positions, offset| {
            for i in 0..positions {
                let b = buf[i];
                if b == start_first && scanner.matches_at(buf, i, Marker::Start) {
                    total.starts += 1;
                    total.last_start = Some(offset + i as u64);
                    depth += 1;
                    total.max_depth = total.max_depth.max(depth);
                }
                if b == end_first && scanner.matches_at(buf, i, Marker::End) {
                    total.ends += 1;
                    depth -= 1;
                    total.min_depth = total.min_depth.min(depth);
                }
            }
            None::<()>
        })?;
        Ok(total)
    }

    /// Last end marker lying entirely inside `[floor, before)`.
    pub fn rfind_end(&mut self, floor: u64, before: u64) -> io::Result<Option<u64>> {
        let pattern = self.pattern(Marker::End);
        let plen = pattern.len() as u64;
        let mut window_end = before.min(self.len);

        while window_end >= floor + plen {
            let window_start = window_end.saturating_sub(self.block_size as u64).max(floor);
            let buf = self.read_range(ByteRange::new(window_start, window_end))?;

            if let Some(i) = (0..=buf.len() - plen as usize)
                .rev()
                .find(|&i| buf[i..].starts_with(pattern))
            {
                return Ok(Some(window_start + i as u64));
            }
            if window_start == floor {
                break;
            }
            window_end = window_start + plen - 1;
        }
        Ok(None)
    }

    /// Every record span in `[from, until)`, in one sequential pass.
    ///
    /// Fails on an end marker with no open record, on a record that opens while another
    /// is still open, and on a record still open when the range ends.
    pub fn walk_records(&mut self, from: u64, until: u64) -> Result<Vec<ByteRange>, PartitionError> {
        let (records, open) = self.walk_from(from, until, None)?;
        if let Some(start) = open {
            return Err(PartitionError::UnterminatedRecord { offset: start });
        }
        Ok(records)
    }

    /// Walks `[from, until)` with the record opened at `open` still pending, returning the
    /// completed spans and the record left open at `until`.
    fn walk_from(
        &mut self,
        from: u64,
        until: u64,
        mut open: Option<u64>,
    ) -> Result<(Vec<ByteRange>, Option<u64>), PartitionError> {
        let start_first = self.markers.start[0];
        let end_first = self.markers.end[0];
        let end_len = self.markers.end.len() as u64;
        let window = self.block_size;

        let mut records = Vec::new();

        let failure = self.scan_windows(from, until, window, |scanner, buf, positions, offset| {
            for i in 0..positions {
                let at = offset + i as u64;
                let b = buf[i];
                if b == start_first && scanner.matches_at(buf, i, Marker::Start) {
                    if let Some(start) = open {
                        return Some(PartitionError::UnterminatedRecord { offset: start });
                    }
                    open = Some(at);
                } else if b == end_first && scanner.matches_at(buf, i, Marker::End) {
                    match open.take() {
                        Some(start) => records.push(ByteRange::new(start, at + end_len)),
                        None => return Some(PartitionError::UnexpectedEnd { offset: at }),
                    }
                }
            }
            None
        })?;

        if let Some(err) = failure {
            return Err(err);
        }
        Ok((records, open))
    }

    /// Offset just past the first end marker that finishes at or after `from`.
    ///
    /// The forward scan stops at `until`; `None` means no record ends in that window.
    pub fn next_boundary(&mut self, from: u64, until: u64) -> io::Result<Option<u64>> {
        self.seeks += 1;
        let plen = self.markers.end.len() as u64;
        let found = self.find(Marker::End, from.saturating_sub(plen), until)?;
        Ok(found.map(|at| at + plen))
    }

    fn block(&mut self, index: usize) -> io::Result<BlockCount> {
        if let Some(count) = self.blocks[index] {
            return Ok(count);
        }
        let start = index as u64 * self.block_size as u64;
        let end = (start + self.block_size as u64).min(self.len);
        let count = self.count(start, end)?;
        self.blocks[index] = Some(count);
        Ok(count)
    }

    /// Start and end marker totals over the whole source, filling the block census.
    pub fn census(&mut self) -> io::Result<(u64, u64)> {
        let mut starts = 0;
        let mut ends = 0;
        for index in 0..self.blocks.len() {
            let count = self.block(index)?;
            starts += count.starts;
            ends += count.ends;
        }
        Ok((starts, ends))
    }

    /// Checks from the census that records open and close strictly in turn, failing with
    /// the same error `walk_records` reports for the first misplaced marker.
    ///
    /// Only a block whose depth profile leaves `{0, 1}` is read again, to find the offset.
    pub fn check_order(&mut self) -> Result<(), PartitionError> {
        let mut depth: i64 = 0;
        let mut open: Option<u64> = None;

        for index in 0..self.blocks.len() {
            let count = self.block(index)?;
            if depth + count.min_depth < 0 || depth + count.max_depth > 1 {
                let start = index as u64 * self.block_size as u64;
                let end = (start + self.block_size as u64).min(self.len);
                self.walk_from(start, end, open)?;
                // The profile and the walk see the same markers
                let (starts, ends) = self.census()?;
                return Err(PartitionError::Unbalanced { starts, ends });
            }

            depth += count.starts as i64 - count.ends as i64;
            open = if depth == 1 { count.last_start.or(open) } else { None };
        }

        match open {
            Some(start) => Err(PartitionError::UnterminatedRecord { offset: start }),
            None => Ok(()),
        }
    }

    /// Records completed at or before `offset`, i.e. end markers with `at + len <= offset`.
    ///
    /// Whole blocks come from the census; only the final partial block is read.
    pub fn records_before(&mut self, offset: u64) -> io::Result<u64> {
        let plen = self.markers.end.len() as u64;
        if offset < plen {
            return Ok(0);
        }
        // End markers must start strictly before this position
        let limit = (offset - plen + 1).min(self.len);
        let full_blocks = (limit / self.block_size as u64) as usize;

        let mut total = 0;
        for index in 0..full_blocks {
            total += self.block(index)?.ends;
        }
        let tail_start = full_blocks as u64 * self.block_size as u64;
        if tail_start < limit {
            total += self.count(tail_start, limit)?.ends;
        }
        Ok(total)
    }
}
