// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process Lifecycle (C5): spawn argv via the backend, own the child's
//! stdio, and escalate signals on stop. On Unix, liveness checks and
//! signal delivery go through `nix`'s safe wrapper around `kill(2)`
//! rather than shelling out, matching the pack's process-supervision
//! examples. On Windows there is no equivalent process-group signal API,
//! so the same escalation ladder shells out to `taskkill`/`tasklist`.

use std::process::Stdio;
use std::time::Duration;

use tc_adapters::AgentBackend;
use tc_core::Request;
use tokio::process::{Child, ChildStdin, Command};
use tracing::warn;

use crate::RunnerError;

/// Delays, from the moment `stop` is called, at which each signal in the
/// escalation ladder is sent.
pub const SIGINT_DELAY_MS: u64 = 0;
pub const SIGTERM_DELAY_MS: u64 = 500;
pub const SIGKILL_DELAY_MS: u64 = 1500;

/// Spawn a child for `req` using `backend`'s argv, in its own process
/// group so a single signal can reach the whole subtree. Returns the
/// child, its stdin handle, and its pid.
pub(crate) fn spawn_child(
    backend: &dyn AgentBackend,
    req: &Request,
    tide_server_url: &str,
) -> Result<(Child, ChildStdin, u32), RunnerError> {
    let executable = backend
        .executable_path()
        .map_err(|e| RunnerError::SpawnFailed(e.to_string()))?;

    let mut command = Command::new(&executable);
    command
        .args(backend.build_args(req))
        .current_dir(&req.working_dir)
        .env("LANG", "en_US.UTF-8")
        .env("LC_ALL", "en_US.UTF-8")
        .env("TIDE_SERVER", tide_server_url)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(false);

    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        command.process_group(0);
    }

    // Windows has no process-group-via-fork equivalent; a new process
    // group lets `taskkill /T` below reach the whole subtree instead of
    // just the immediate child.
    #[cfg(windows)]
    {
        use std::os::windows::process::CommandExt;
        const CREATE_NEW_PROCESS_GROUP: u32 = 0x0000_0200;
        command.creation_flags(CREATE_NEW_PROCESS_GROUP);
    }

    let mut child = command
        .spawn()
        .map_err(|e| RunnerError::SpawnFailed(e.to_string()))?;

    let pid = child.id().ok_or_else(|| {
        RunnerError::SpawnFailed("child exited before its pid could be read".to_string())
    })?;

    let stdin = child
        .stdin
        .take()
        .ok_or_else(|| RunnerError::SpawnFailed("child has no stdin handle".to_string()))?;

    Ok((child, stdin, pid))
}

/// Send `SIGINT` to the child's process group and the child itself.
/// Tolerates an already-dead process.
pub(crate) fn send_sigint(pid: u32) -> bool {
    send_signal(pid, Signal::Sigint)
}

/// Drive the stop escalation ladder for a pid that has already been
/// removed from the active table: SIGINT immediately, SIGTERM at 500 ms,
/// SIGKILL at 1500 ms. Each step tolerates the process already being
/// gone; the caller does not await completion, it races against the
/// child's own close event.
pub(crate) fn spawn_stop_escalation(pid: u32) {
    tokio::spawn(async move {
        send_signal(pid, Signal::Sigint);
        tokio::time::sleep(Duration::from_millis(SIGTERM_DELAY_MS - SIGINT_DELAY_MS)).await;
        if is_alive(pid) {
            send_signal(pid, Signal::Sigterm);
        }
        tokio::time::sleep(Duration::from_millis(SIGKILL_DELAY_MS - SIGTERM_DELAY_MS)).await;
        if is_alive(pid) {
            send_signal(pid, Signal::Sigkill);
        }
    });
}

#[derive(Debug, Clone, Copy)]
enum Signal {
    Sigint,
    Sigterm,
    Sigkill,
}

#[cfg(unix)]
fn send_signal(pid: u32, signal: Signal) -> bool {
    use nix::sys::signal::{kill, Signal as NixSignal};
    use nix::unistd::Pid;

    let nix_signal = match signal {
        Signal::Sigint => NixSignal::SIGINT,
        Signal::Sigterm => NixSignal::SIGTERM,
        Signal::Sigkill => NixSignal::SIGKILL,
    };

    // Negative pid targets the whole process group (spawn_child puts the
    // child in its own group), falling back to the single pid.
    let group = Pid::from_raw(-(pid as i32));
    let group_ok = kill(group, nix_signal).is_ok();
    let direct_ok = kill(Pid::from_raw(pid as i32), nix_signal).is_ok();
    if !group_ok && !direct_ok {
        warn!(pid, ?signal, "signal delivery failed, process likely already dead");
    }
    group_ok || direct_ok
}

/// `Sigint`/`Sigterm` both ask `taskkill` for a graceful close of the
/// process tree; `Sigkill` adds `/F` to force it, mirroring the
/// Unix ladder's soft-then-hard escalation.
#[cfg(windows)]
fn send_signal(pid: u32, signal: Signal) -> bool {
    let mut command = std::process::Command::new("taskkill");
    command.args(["/PID", &pid.to_string(), "/T"]);
    if matches!(signal, Signal::Sigkill) {
        command.arg("/F");
    }
    match command.output() {
        Ok(output) => output.status.success(),
        Err(e) => {
            warn!(pid, ?signal, error = %e, "taskkill failed, process likely already dead");
            false
        }
    }
}

#[cfg(not(any(unix, windows)))]
fn send_signal(_pid: u32, _signal: Signal) -> bool {
    false
}

/// True if the OS still has this pid. Uses signal 0 (no-op delivery) to
/// probe existence without affecting the process.
#[cfg(unix)]
pub(crate) fn is_alive(pid: u32) -> bool {
    use nix::errno::Errno;
    use nix::sys::signal::kill;
    use nix::unistd::Pid;

    match kill(Pid::from_raw(pid as i32), None) {
        Ok(()) => true,
        Err(Errno::EPERM) => true,
        Err(_) => false,
    }
}

/// True if `tasklist` still lists this pid.
#[cfg(windows)]
pub(crate) fn is_alive(pid: u32) -> bool {
    let output = std::process::Command::new("tasklist").args(["/FI", &format!("PID eq {pid}"), "/NH"]).output();
    match output {
        Ok(output) => String::from_utf8_lossy(&output.stdout).contains(&pid.to_string()),
        Err(_) => false,
    }
}

#[cfg(not(any(unix, windows)))]
pub(crate) fn is_alive(_pid: u32) -> bool {
    false
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
