// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Resource Monitor (C9): sample a child's resident memory. Pure
//! observation, platform-specific, no side effects.

/// Resident set size, in megabytes, for the given pid.
///
/// Returns `None` if the pid is gone or its memory couldn't be read.
#[cfg(target_os = "linux")]
pub fn process_memory_mb(pid: u32) -> Option<f64> {
    let status = std::fs::read_to_string(format!("/proc/{pid}/status")).ok()?;
    for line in status.lines() {
        if let Some(rest) = line.strip_prefix("VmRSS:") {
            let kb: u64 = rest.trim().trim_end_matches(" kB").trim().parse().ok()?;
            return Some(kb as f64 / 1024.0);
        }
    }
    None
}

#[cfg(target_os = "macos")]
pub fn process_memory_mb(pid: u32) -> Option<f64> {
    let output = std::process::Command::new("ps")
        .args(["-o", "rss=", "-p", &pid.to_string()])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let text = String::from_utf8_lossy(&output.stdout);
    let kb: u64 = text.trim().parse().ok()?;
    Some(kb as f64 / 1024.0)
}

#[cfg(target_os = "windows")]
pub fn process_memory_mb(pid: u32) -> Option<f64> {
    let output = std::process::Command::new("wmic")
        .args(["process", "where", &format!("ProcessId={pid}"), "get", "WorkingSetSize", "/value"])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let text = String::from_utf8_lossy(&output.stdout);
    let bytes: u64 = text.lines().find_map(|line| line.trim().strip_prefix("WorkingSetSize="))?.trim().parse().ok()?;
    Some(bytes as f64 / 1024.0 / 1024.0)
}

#[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
pub fn process_memory_mb(_pid: u32) -> Option<f64> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn current_process_reports_some_memory_on_supported_platforms() {
        let pid = std::process::id();
        let mb = process_memory_mb(pid);
        #[cfg(any(target_os = "linux", target_os = "macos", target_os = "windows"))]
        assert!(mb.unwrap() > 0.0);
        #[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
        assert!(mb.is_none());
    }

    #[test]
    fn unknown_pid_returns_none() {
        assert_eq!(process_memory_mb(u32::MAX), None);
    }
}
