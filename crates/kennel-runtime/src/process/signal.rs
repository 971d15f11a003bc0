//! Hard termination by PID.

use std::io;

/// Send SIGKILL to `pid`. A process that is already gone is not an error.
///
/// This does not reap; the owner of the child handle still has to wait on it.
#[cfg(unix)]
pub fn force_kill(pid: u32) -> io::Result<()> {
    use nix::errno::Errno;
    use nix::sys::signal::{self, Signal};
    use nix::unistd::Pid;

    let raw = i32::try_from(pid).map_err(io::Error::other)?;
    match signal::kill(Pid::from_raw(raw), Signal::SIGKILL) {
        Ok(()) | Err(Errno::ESRCH) => Ok(()),
        Err(e) => Err(io::Error::other(e)),
    }
}

#[cfg(not(unix))]
pub fn force_kill(pid: u32) -> io::Result<()> {
    use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System};

    let pid = Pid::from_u32(pid);
    let mut system = System::new();
    system.refresh_processes_specifics(
        ProcessesToUpdate::Some(&[pid]),
        true,
        ProcessRefreshKind::nothing(),
    );
    match system.process(pid) {
        Some(process) if !process.kill() => Err(io::Error::other("kill failed")),
        _ => Ok(()),
    }
}

/// SIGKILL the process group led by `pid`, falling back to `pid` alone when
/// it does not lead a group. Children that inherited the workload's output
/// pipes die with it.
#[cfg(unix)]
pub fn kill_group(pid: u32) -> io::Result<()> {
    use nix::errno::Errno;
    use nix::sys::signal::{self, Signal};
    use nix::unistd::Pid;

    let raw = i32::try_from(pid).map_err(io::Error::other)?;
    match signal::killpg(Pid::from_raw(raw), Signal::SIGKILL) {
        Ok(()) => Ok(()),
        Err(Errno::ESRCH | Errno::EPERM) => force_kill(pid),
        Err(e) => Err(io::Error::other(e)),
    }
}

#[cfg(not(unix))]
pub fn kill_group(pid: u32) -> io::Result<()> {
    force_kill(pid)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(unix)]
    fn test_force_kill_handles_already_gone() {
        assert!(force_kill(999_999_999).is_ok());
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn test_force_kill_terminates_process() {
        let mut child = tokio::process::Command::new("sleep")
            .arg("60")
            .spawn()
            .expect("failed to spawn sleep");
        let pid = child.id().expect("no PID");

        force_kill(pid).unwrap();
        let status = child.wait().await.unwrap();

        assert!(!status.success());
        assert!(!crate::process::pid_alive(pid));
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn test_kill_group_takes_down_children() {
        let mut child = tokio::process::Command::new("sh")
            .args(["-c", "sleep 60 & echo $!; wait"])
            .stdout(std::process::Stdio::piped())
            .process_group(0)
            .spawn()
            .expect("failed to spawn sh");
        let pid = child.id().expect("no PID");
        let mut stdout = child.stdout.take().expect("no stdout");

        let mut line = String::new();
        let mut reader = tokio::io::BufReader::new(&mut stdout);
        tokio::io::AsyncBufReadExt::read_line(&mut reader, &mut line)
            .await
            .unwrap();
        let grandchild: u32 = line.trim().parse().unwrap();

        kill_group(pid).unwrap();
        child.wait().await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;

        assert!(!crate::process::process_running(grandchild));
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn test_kill_group_falls_back_to_single_process() {
        let mut child = tokio::process::Command::new("sleep")
            .arg("60")
            .spawn()
            .expect("failed to spawn sleep");
        let pid = child.id().expect("no PID");

        kill_group(pid).unwrap();

        assert!(!child.wait().await.unwrap().success());
    }
}
