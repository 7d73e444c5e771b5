//! Background service management.
//!
//! `service connect` saves the resolved options, then re-executes this binary
//! as `service run` in its own process group and records its pid. The
//! background process reads the saved options back, so nothing but the
//! subcommand crosses the process boundary.
//!
//! The child removes the pid file when it exits, which can happen before the
//! parent has written it. The parent therefore checks the child after writing
//! and releases the file itself if the child is already gone.

use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use cast_control_core::{AppPaths, DaemonArgs};

/// How long `stop` waits for the process to exit after SIGTERM.
const STOP_TIMEOUT: Duration = Duration::from_secs(5);
const STOP_POLL: Duration = Duration::from_millis(50);

// ─────────────────────────────────────────────────────────────────────────────
// Pid file
// ─────────────────────────────────────────────────────────────────────────────

/// Reads the recorded pid. Missing or garbled files read as `None`.
pub fn read_pid(path: &Path) -> Option<u32> {
    std::fs::read_to_string(path).ok()?.trim().parse().ok()
}

pub fn write_pid(path: &Path, pid: u32) -> Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create state directory: {}", dir.display()))?;
    }
    std::fs::write(path, format!("{}\n", pid))
        .with_context(|| format!("Failed to write pid file: {}", path.display()))
}

pub fn remove_pid(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        if e.kind() != std::io::ErrorKind::NotFound {
            log::warn!("[Service] failed to remove {}: {}", path.display(), e);
        }
    }
}

/// Removes the pid file if it still names `pid`.
pub fn release_pid(path: &Path, pid: u32) {
    if read_pid(path) == Some(pid) {
        remove_pid(path);
    }
}

/// Pid of the running service, if the pid file names a live process.
pub fn running_pid(paths: &AppPaths) -> Option<u32> {
    read_pid(&paths.pid_file()).filter(|pid| is_alive(*pid))
}

// ─────────────────────────────────────────────────────────────────────────────
// Processes
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(unix)]
pub fn is_alive(pid: u32) -> bool {
    let Ok(pid) = libc::pid_t::try_from(pid) else {
        return false;
    };
    if pid <= 0 {
        return false;
    }
    // SAFETY: signal 0 performs the permission and existence checks only.
    let result = unsafe { libc::kill(pid, 0) };
    result == 0 || std::io::Error::last_os_error().raw_os_error() == Some(libc::EPERM)
}

#[cfg(not(unix))]
pub fn is_alive(_pid: u32) -> bool {
    false
}

#[cfg(unix)]
fn terminate(pid: u32) -> std::io::Result<()> {
    let pid = libc::pid_t::try_from(pid)
        .map_err(|_| std::io::Error::from(std::io::ErrorKind::InvalidInput))?;
    // SAFETY: kill has no memory-safety preconditions.
    if unsafe { libc::kill(pid, libc::SIGTERM) } == 0 {
        Ok(())
    } else {
        Err(std::io::Error::last_os_error())
    }
}

#[cfg(not(unix))]
fn terminate(_pid: u32) -> std::io::Result<()> {
    Err(std::io::Error::from(std::io::ErrorKind::Unsupported))
}

/// Sends SIGTERM and waits briefly for the process to go away.
fn stop_process(pid: u32) {
    log::info!("[Service] stopping pid {}", pid);
    if let Err(e) = terminate(pid) {
        log::warn!("[Service] failed to signal pid {}: {}", pid, e);
        return;
    }

    let deadline = Instant::now() + STOP_TIMEOUT;
    while is_alive(pid) && Instant::now() < deadline {
        std::thread::sleep(STOP_POLL);
    }
    if is_alive(pid) {
        log::warn!("[Service] pid {} still running after SIGTERM", pid);
    }
}

fn spawn_background() -> Result<Child> {
    let exe = std::env::current_exe().context("Failed to locate the current executable")?;
    let mut command = Command::new(exe);
    command
        .args(["service", "run"])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());

    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        command.process_group(0);
    }

    command
        .spawn()
        .context("Failed to start the background service")
}

/// Records `child` in the pid file. Returns the exit status instead if the
/// child has already exited, leaving no pid file behind.
fn record_child(path: &Path, child: &mut Child) -> Result<Option<ExitStatus>> {
    let pid = child.id();
    write_pid(path, pid)?;

    match child.try_wait() {
        Ok(Some(status)) => {
            release_pid(path, pid);
            Ok(Some(status))
        }
        Ok(None) => Ok(None),
        Err(e) => {
            log::warn!("[Service] failed to check pid {}: {}", pid, e);
            Ok(None)
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Commands
// ─────────────────────────────────────────────────────────────────────────────

/// Starts the service with `args`, replacing a running one.
pub fn connect(paths: &AppPaths, args: &DaemonArgs) -> Result<()> {
    if let Some(pid) = running_pid(paths) {
        log::info!("[Service] replacing running service (pid {})", pid);
        stop_process(pid);
    }
    remove_pid(&paths.pid_file());

    args.save(paths).context("Failed to save service arguments")?;
    let mut child = spawn_background()?;
    if let Some(status) = record_child(&paths.pid_file(), &mut child)? {
        anyhow::bail!("Background service exited during startup ({})", status);
    }

    log::info!("[Service] started (pid {})", child.id());
    Ok(())
}

/// Stops the service and forgets its arguments.
pub fn disconnect(paths: &AppPaths) -> Result<()> {
    match running_pid(paths) {
        Some(pid) => stop_process(pid),
        None => log::warn!("Daemon isn't running."),
    }
    remove_pid(&paths.pid_file());
    DaemonArgs::delete(paths).context("Failed to delete service arguments")?;
    Ok(())
}

/// Outcome of `service reconnect`.
#[derive(Debug, PartialEq, Eq)]
pub enum Reconnect {
    Restarted,
    NotRunning,
}

/// Restarts the service with its saved arguments.
///
/// Reports [`Reconnect::NotRunning`] when nothing was saved or the recorded
/// process is gone.
pub fn reconnect(paths: &AppPaths) -> Result<Reconnect> {
    let args = DaemonArgs::load(paths).context("Failed to read service arguments")?;
    let (Some(args), Some(_)) = (args, running_pid(paths)) else {
        log::warn!("Daemon isn't running.");
        return Ok(Reconnect::NotRunning);
    };

    connect(paths, &args)?;
    Ok(Reconnect::Restarted)
}
