//! Best-effort process limit configuration.
//!
//! Raises the soft open-file and process limits toward configured targets, never above
//! the hard limit. Lack of privilege or platform support degrades to `Partial`.

use super::types::{LimitsOutcome, LimitsReport};

#[derive(Debug, Clone, Copy)]
enum LimitKind {
    OpenFiles,
    Processes,
}

/// Attempts to raise both limits and reports what was achieved.
pub fn configure_limits(target_open_files: u64, target_processes: u64) -> LimitsReport {
    let open_files = raise_limit(LimitKind::OpenFiles, target_open_files);
    let processes = raise_limit(LimitKind::Processes, target_processes);

    let reached = |result: &std::io::Result<(u64, bool)>| matches!(result, Ok((_, true)));
    let outcome = if reached(&open_files) && reached(&processes) {
        LimitsOutcome::Applied
    } else {
        LimitsOutcome::Partial
    };

    for (name, result) in [("open files", &open_files), ("processes", &processes)] {
        match result {
            Ok((limit, true)) => tracing::debug!("Soft limit for {} is {}", name, limit),
            Ok((limit, false)) => {
                tracing::warn!("Soft limit for {} capped at {} (hard limit)", name, limit)
            }
            Err(e) => tracing::warn!("Could not adjust limit for {}: {}", name, e),
        }
    }

    LimitsReport {
        outcome,
        open_files: open_files.ok().map(|(limit, _)| limit),
        processes: processes.ok().map(|(limit, _)| limit),
    }
}

/// Returns the resulting soft limit and whether it reached `target`.
#[cfg(unix)]
#[allow(clippy::unnecessary_cast)] // rlim_t varies by platform
fn raise_limit(kind: LimitKind, target: u64) -> std::io::Result<(u64, bool)> {
    let mut rlim = libc::rlimit {
        rlim_cur: 0,
        rlim_max: 0,
    };

    // SAFETY: rlim is a valid, initialized rlimit for the duration of the call
    let rc = match kind {
        LimitKind::OpenFiles => unsafe { libc::getrlimit(libc::RLIMIT_NOFILE, &mut rlim) },
        LimitKind::Processes => unsafe { libc::getrlimit(libc::RLIMIT_NPROC, &mut rlim) },
    };
    if rc != 0 {
        return Err(std::io::Error::last_os_error());
    }

    let current = rlim.rlim_cur as u64;
    let hard = rlim.rlim_max as u64;
    if current >= target {
        return Ok((current, true));
    }

    let wanted = target.min(hard);
    if wanted <= current {
        return Ok((current, false));
    }

    rlim.rlim_cur = wanted as libc::rlim_t;
    // SAFETY: rlim is a valid rlimit with cur <= max
    let rc = match kind {
        LimitKind::OpenFiles => unsafe { libc::setrlimit(libc::RLIMIT_NOFILE, &rlim) },
        LimitKind::Processes => unsafe { libc::setrlimit(libc::RLIMIT_NPROC, &rlim) },
    };
    if rc != 0 {
        return Err(std::io::Error::last_os_error());
    }

    Ok((wanted, wanted >= target))
}

#[cfg(not(unix))]
fn raise_limit(_kind: LimitKind, _target: u64) -> std::io::Result<(u64, bool)> {
    Err(std::io::Error::new(
        std::io::ErrorKind::Unsupported,
        "rlimits not available on this platform",
    ))
}
