//! System statistics sources.

use super::types::ResourceSample;

use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Source of resource readings.
pub trait SystemStats: Send + Sync {
    fn sample(&self) -> io::Result<ResourceSample>;
}

/// Reads memory and load from the Linux `/proc` filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcStats;

impl SystemStats for ProcStats {
    fn sample(&self) -> io::Result<ResourceSample> {
        let meminfo = std::fs::read_to_string("/proc/meminfo")?;
        let loadavg = std::fs::read_to_string("/proc/loadavg")?;

        Ok(ResourceSample {
            memory_available_percent: parse_memory_available_percent(&meminfo)?,
            load_average: parse_load_average(&loadavg)?,
            cpu_count: detect_cpu_count(),
        })
    }
}

pub fn detect_cpu_count() -> usize {
    std::thread::available_parallelism()
        .map(|p| p.get())
        .unwrap_or(1)
}

/// Parses `/proc/meminfo` into an available percentage.
///
/// Uses `MemAvailable` when the kernel exposes it, otherwise `MemFree + Buffers + Cached`.
pub fn parse_memory_available_percent(meminfo: &str) -> io::Result<f64> {
    let field = |name: &str| -> Option<u64> {
        meminfo.lines().find_map(|line| {
            // Format: "MemAvailable:   12345678 kB"
            let rest = line.strip_prefix(name)?.strip_prefix(':')?;
            rest.split_whitespace().next()?.parse::<u64>().ok()
        })
    };

    let total = field("MemTotal").filter(|t| *t > 0).ok_or_else(|| {
        io::Error::new(io::ErrorKind::InvalidData, "MemTotal missing from meminfo")
    })?;

    let available = match field("MemAvailable") {
        Some(value) => value,
        None => {
            field("MemFree").unwrap_or(0)
                + field("Buffers").unwrap_or(0)
                + field("Cached").unwrap_or(0)
        }
    };

    Ok((available as f64 / total as f64 * 100.0).clamp(0.0, 100.0))
}

/// Parses the one-minute average out of `/proc/loadavg`.
pub fn parse_load_average(loadavg: &str) -> io::Result<f64> {
    loadavg
        .split_whitespace()
        .next()
        .and_then(|value| value.parse::<f64>().ok())
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "malformed loadavg"))
}

/// Returns a scripted sequence of readings; the last one repeats.
///
/// Used for deterministic scheduling decisions in tests and for hosts where `/proc` is
/// unavailable and the caller wants fixed behaviour. `None` entries read as failures.
pub struct FixedStats {
    samples: Vec<Option<ResourceSample>>,
    cursor: AtomicUsize,
}

impl FixedStats {
    pub fn new(sample: ResourceSample) -> Self {
        Self::sequence(vec![sample])
    }

    pub fn healthy(cpu_count: usize) -> Self {
        Self::new(ResourceSample {
            memory_available_percent: 80.0,
            load_average: 0.1,
            cpu_count,
        })
    }

    pub fn sequence(samples: Vec<ResourceSample>) -> Self {
        Self {
            samples: samples.into_iter().map(Some).collect(),
            cursor: AtomicUsize::new(0),
        }
    }

    /// A source whose reads always fail.
    pub fn unavailable() -> Self {
        Self {
            samples: vec![None],
            cursor: AtomicUsize::new(0),
        }
    }
}

impl SystemStats for FixedStats {
    fn sample(&self) -> io::Result<ResourceSample> {
        let index = self.cursor.fetch_add(1, Ordering::Relaxed);
        let last = self.samples.len().saturating_sub(1);

        self.samples
            .get(index.min(last))
            .copied()
            .flatten()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Unsupported, "no system statistics"))
    }
}
