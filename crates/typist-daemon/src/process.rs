use std::process::{Command, Stdio};

/// Check whether a process with `pid` is alive.
#[cfg(unix)]
pub fn verify_process_running(pid: u32) -> bool {
    Command::new("kill")
        .args(["-0", &pid.to_string()])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

#[cfg(windows)]
pub fn verify_process_running(pid: u32) -> bool {
    let output = Command::new("tasklist")
        .args(["/FI", &format!("PID eq {}", pid), "/NH"])
        .stderr(Stdio::null())
        .output();
    match output {
        Ok(output) => String::from_utf8_lossy(&output.stdout).contains(&pid.to_string()),
        Err(_) => false,
    }
}

#[cfg(not(any(unix, windows)))]
pub fn verify_process_running(_pid: u32) -> bool {
    false
}

/// Ask a process to exit, forcefully when `force` is set.
#[cfg(unix)]
pub fn terminate_process(pid: u32, force: bool) -> bool {
    let mut cmd = Command::new("kill");
    if force {
        cmd.arg("-9");
    }
    cmd.arg(pid.to_string())
        .stderr(Stdio::null())
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

#[cfg(windows)]
pub fn terminate_process(pid: u32, force: bool) -> bool {
    let mut cmd = Command::new("taskkill");
    if force {
        cmd.args(["/F", "/T"]);
    }
    cmd.args(["/PID", &pid.to_string()])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

#[cfg(not(any(unix, windows)))]
pub fn terminate_process(_pid: u32, _force: bool) -> bool {
    false
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn current_process_is_running() {
        assert!(verify_process_running(std::process::id()));
    }
}
