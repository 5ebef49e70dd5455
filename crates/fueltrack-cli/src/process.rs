//! Operating-system process control for the supervisor.

use std::collections::HashMap;
use std::ffi::OsString;
use std::fs::OpenOptions;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::{Mutex, PoisonError};

use tracing::debug;

/// Spawning, probing and signalling the server process.
pub trait ProcessControl: Send + Sync {
    /// Start the server detached from the terminal, appending its output
    /// to `log_file`. Returns the new process id.
    fn spawn_server(&self, log_file: &Path) -> io::Result<u32>;

    /// Whether a process with this id is running.
    fn is_alive(&self, pid: u32) -> bool;

    /// Ask the process to terminate.
    fn terminate(&self, pid: u32) -> io::Result<()>;
}

/// [`ProcessControl`] backed by the real operating system.
///
/// The server is this same executable run with the hidden `serve` command.
#[derive(Debug)]
pub struct SystemProcesses {
    exe: PathBuf,
    args: Vec<OsString>,
    /// Children spawned by this process; probing them through `try_wait`
    /// reaps them, so a crashed child is not mistaken for a live zombie.
    children: Mutex<HashMap<u32, Child>>,
}

impl SystemProcesses {
    /// Run `fueltrack serve`, passing `config` along when given.
    pub fn new(config: Option<&Path>) -> io::Result<Self> {
        let exe = std::env::current_exe()?;
        let mut args = vec![OsString::from("serve")];
        if let Some(path) = config {
            args.push(OsString::from("--config"));
            args.push(path.as_os_str().to_owned());
        }
        Ok(Self::with_command(exe, args))
    }

    /// Run an arbitrary command as the server.
    pub fn with_command(exe: PathBuf, args: Vec<OsString>) -> Self {
        Self {
            exe,
            args,
            children: Mutex::new(HashMap::new()),
        }
    }
}

impl ProcessControl for SystemProcesses {
    fn spawn_server(&self, log_file: &Path) -> io::Result<u32> {
        let log = OpenOptions::new().create(true).append(true).open(log_file)?;
        let log_err = log.try_clone()?;

        let mut command = Command::new(&self.exe);
        command
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::from(log))
            .stderr(Stdio::from(log_err));

        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            // Own process group, so the terminal's Ctrl-C does not reach it.
            command.process_group(0);
        }

        let child = command.spawn()?;
        let pid = child.id();
        debug!("Spawned {} as PID {}", self.exe.display(), pid);

        self.children
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(pid, child);
        Ok(pid)
    }

    fn is_alive(&self, pid: u32) -> bool {
        let mut children = self.children.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(child) = children.get_mut(&pid) {
            return matches!(child.try_wait(), Ok(None));
        }
        drop(children);
        probe(pid)
    }

    fn terminate(&self, pid: u32) -> io::Result<()> {
        send_terminate(pid)
    }
}

#[cfg(unix)]
fn to_pid(pid: u32) -> Option<nix::unistd::Pid> {
    i32::try_from(pid)
        .ok()
        .filter(|p| *p > 0)
        .map(nix::unistd::Pid::from_raw)
}

#[cfg(unix)]
fn probe(pid: u32) -> bool {
    use nix::errno::Errno;
    use nix::sys::signal::kill;

    let Some(pid) = to_pid(pid) else {
        return false;
    };
    match kill(pid, None) {
        Ok(()) => true,
        // Exists, but belongs to someone else.
        Err(Errno::EPERM) => true,
        Err(_) => false,
    }
}

#[cfg(unix)]
fn send_terminate(pid: u32) -> io::Result<()> {
    use nix::errno::Errno;
    use nix::sys::signal::{Signal, kill};

    let Some(target) = to_pid(pid) else {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("invalid process id {pid}"),
        ));
    };
    match kill(target, Signal::SIGTERM) {
        Ok(()) | Err(Errno::ESRCH) => Ok(()),
        Err(e) => Err(io::Error::from(e)),
    }
}

#[cfg(not(unix))]
fn probe(_pid: u32) -> bool {
    false
}

#[cfg(not(unix))]
fn send_terminate(_pid: u32) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "stopping the server is only supported on Unix",
    ))
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn test_current_process_is_alive() {
        let processes = SystemProcesses::with_command(PathBuf::from("true"), Vec::new());
        assert!(processes.is_alive(std::process::id()));
    }

    #[test]
    fn test_invalid_pid_is_not_alive() {
        assert!(!probe(0));
        assert!(!probe(u32::MAX));
    }

    #[test]
    fn test_spawned_child_is_reaped_after_exit() {
        let dir = tempfile::tempdir().unwrap();
        let processes = SystemProcesses::with_command(
            PathBuf::from("sh"),
            vec!["-c".into(), "echo started".into()],
        );

        let log = dir.path().join("server.log");
        let pid = processes.spawn_server(&log).unwrap();

        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(5);
        while processes.is_alive(pid) && std::time::Instant::now() < deadline {
            std::thread::sleep(std::time::Duration::from_millis(20));
        }
        assert!(!processes.is_alive(pid));
        assert_eq!(std::fs::read_to_string(log).unwrap(), "started\n");
    }

    #[test]
    fn test_terminate_running_child() {
        let dir = tempfile::tempdir().unwrap();
        let processes = SystemProcesses::with_command(
            PathBuf::from("sleep"),
            vec!["30".into()],
        );
        let pid = processes.spawn_server(&dir.path().join("server.log")).unwrap();
        assert!(processes.is_alive(pid));

        processes.terminate(pid).unwrap();
        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(5);
        while processes.is_alive(pid) && std::time::Instant::now() < deadline {
            std::thread::sleep(std::time::Duration::from_millis(20));
        }
        assert!(!processes.is_alive(pid));
    }
}
