//! Resource usage sampling from the OS process table.

use kennel_core::{EnvironmentError, ProcessStats};
use std::time::Duration;
use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System};

/// Window CPU usage is measured over.
pub const SAMPLE_WINDOW: Duration = Duration::from_millis(50);

/// Resident memory in bytes and CPU percent of `pid`, measured over
/// [`SAMPLE_WINDOW`].
pub async fn sample(pid: u32) -> Result<ProcessStats, EnvironmentError> {
    let pid = Pid::from_u32(pid);
    let refresh = ProcessRefreshKind::nothing().with_memory().with_cpu();
    let mut system = System::new();

    // CPU usage is a delta between two refreshes.
    system.refresh_processes_specifics(ProcessesToUpdate::Some(&[pid]), true, refresh);
    tokio::time::sleep(SAMPLE_WINDOW).await;
    system.refresh_processes_specifics(ProcessesToUpdate::Some(&[pid]), true, refresh);

    let process = system.process(pid).ok_or(EnvironmentError::NotRunning)?;
    Ok(ProcessStats {
        memory: process.memory(),
        cpu: f64::from(process.cpu_usage()),
    })
}
