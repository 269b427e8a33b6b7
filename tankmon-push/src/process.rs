//! Metrics about the exporting process itself.

use std::io::{self, Write};

use sysinfo::{ProcessesToUpdate, System};
use tracing::debug;

/// Write `process_*` metrics for the current process.
///
/// Writes nothing if the process cannot be inspected.
pub fn write_process_metrics(out: &mut dyn Write) -> io::Result<()> {
    let pid = match sysinfo::get_current_pid() {
        Ok(pid) => pid,
        Err(e) => {
            debug!(error = %e, "Cannot determine current pid, skipping process metrics");
            return Ok(());
        }
    };

    let mut system = System::new();
    system.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);

    let Some(process) = system.process(pid) else {
        debug!(%pid, "Current process not found, skipping process metrics");
        return Ok(());
    };

    let metrics = [
        ("process_resident_memory_bytes", process.memory()),
        ("process_virtual_memory_bytes", process.virtual_memory()),
        ("process_start_time_seconds", process.start_time()),
        ("process_run_time_seconds", process.run_time()),
    ];

    for (name, value) in metrics {
        writeln!(out, "# TYPE {} gauge", name)?;
        writeln!(out, "{} {}", name, value)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_process_metrics_are_well_formed() {
        let mut out = Vec::new();
        write_process_metrics(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        for line in text.lines() {
            if line.starts_with('#') {
                assert!(line.starts_with("# TYPE process_"));
            } else {
                assert!(line.starts_with("process_"));
                assert!(line.contains(' '), "missing value in {line:?}");
            }
        }
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_process_metrics_present_on_linux() {
        let mut out = Vec::new();
        write_process_metrics(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.contains("process_resident_memory_bytes "));
        assert!(text.contains("process_start_time_seconds "));
    }
}
