//! Run summary printed after the pool shuts down.

use std::fmt::Write as _;

use crate::pool::PoolReport;

/// Best-effort CPU user/system time snapshot (seconds) on Unix platforms.
#[cfg(unix)]
pub fn cpu_times_seconds() -> Option<(f64, f64)> {
    // SAFETY: `rusage` is plain old data and `getrusage` only writes into it.
    let mut usage: libc::rusage = unsafe { std::mem::zeroed() };
    let rc = unsafe { libc::getrusage(libc::RUSAGE_SELF, &mut usage) };
    if rc != 0 {
        return None;
    }
    let user = usage.ru_utime.tv_sec as f64 + (usage.ru_utime.tv_usec as f64 / 1_000_000.0);
    let sys = usage.ru_stime.tv_sec as f64 + (usage.ru_stime.tv_usec as f64 / 1_000_000.0);
    Some((user, sys))
}

/// Stub on non-Unix platforms.
#[cfg(not(unix))]
pub fn cpu_times_seconds() -> Option<(f64, f64)> {
    None
}

/// CPU time consumed between two [`cpu_times_seconds`] samples.
pub fn cpu_delta(
    start: Option<(f64, f64)>,
    end: Option<(f64, f64)>,
) -> (Option<f64>, Option<f64>) {
    match (start, end) {
        (Some((user_start, sys_start)), Some((user_end, sys_end))) => {
            (Some(user_end - user_start), Some(sys_end - sys_start))
        }
        _ => (None, None),
    }
}

fn fmt_cpu(value: Option<f64>) -> String {
    value
        .map(|v| format!("{v:.4}"))
        .unwrap_or_else(|| "NA".to_string())
}

/// Render the summary block written to stdout.
pub fn render(report: &PoolReport, cpu: (Option<f64>, Option<f64>)) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "RUN SUMMARY");
    for w in &report.workers {
        let _ = writeln!(
            out,
            "Processor {}: Real T: {} Work T: {} Wait T: {} Sched T: {} Done: {} Failed: {}",
            w.id, w.real_ms, w.work_ms, w.wait_ms, w.sched_ms, w.done, w.failed
        );
    }
    let _ = writeln!(out, "leftover_tasks={}", report.leftover);
    let _ = writeln!(out, "cpu_user_s={} cpu_sys_s={}", fmt_cpu(cpu.0), fmt_cpu(cpu.1));
    let _ = writeln!(out, "Elapsed: {}", report.elapsed.as_secs_f64());
    out
}
