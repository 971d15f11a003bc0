//! Live process probes.

use sysinfo::{Pid, ProcessRefreshKind, ProcessStatus, ProcessesToUpdate, System};

/// Check if a PID exists using the null signal.
#[cfg(unix)]
pub fn pid_alive(pid: u32) -> bool {
    use nix::sys::signal;
    use nix::unistd::Pid as NixPid;

    let Ok(raw) = i32::try_from(pid) else {
        return false;
    };
    match signal::kill(NixPid::from_raw(raw), None) {
        Ok(()) => true,
        Err(nix::errno::Errno::ESRCH) => false,
        // EPERM: it exists, we just may not signal it.
        Err(_) => true,
    }
}

#[cfg(not(unix))]
pub fn pid_alive(pid: u32) -> bool {
    let mut system = System::new();
    system.refresh_processes_specifics(
        ProcessesToUpdate::Some(&[Pid::from_u32(pid)]),
        true,
        ProcessRefreshKind::nothing(),
    );
    system.process(Pid::from_u32(pid)).is_some()
}

/// Whether the process table lists `pid` as exited but not yet reaped.
pub fn is_zombie(pid: u32) -> bool {
    let pid = Pid::from_u32(pid);
    let mut system = System::new();
    system.refresh_processes_specifics(
        ProcessesToUpdate::Some(&[pid]),
        true,
        ProcessRefreshKind::nothing(),
    );
    system
        .process(pid)
        .is_some_and(|process| matches!(process.status(), ProcessStatus::Zombie))
}

/// Full liveness check: the PID answers the null signal and is not a zombie.
pub fn process_running(pid: u32) -> bool {
    pid_alive(pid) && !is_zombie(pid)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_own_process_is_running() {
        assert!(process_running(std::process::id()));
    }

    #[test]
    fn test_unlikely_pid_is_not_running() {
        assert!(!process_running(999_999_999));
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn test_exited_unreaped_child_is_not_running() {
        let child = tokio::process::Command::new("true").spawn().unwrap();
        let pid = child.id().unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(200)).await;

        // Not reaped yet: the PID still answers signals but is a zombie.
        assert!(!process_running(pid));
        drop(child);
    }
}
