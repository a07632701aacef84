use crate::error::{Result, TypistError};
use std::process::Command;

/// Looks up a label (title or application name) for the focused window.
pub trait WindowLabeler {
    fn focused_label(&self) -> Result<Option<String>>;
}

/// Asks the platform's own tooling for the focused window.
#[derive(Debug, Default, Clone, Copy)]
pub struct CommandWindowLabeler;

#[cfg(target_os = "macos")]
fn focused_window_command() -> Option<Command> {
    let mut cmd = Command::new("osascript");
    cmd.arg("-e").arg(
        "tell application \"System Events\" to get name of first application process whose frontmost is true",
    );
    Some(cmd)
}

#[cfg(target_os = "linux")]
fn focused_window_command() -> Option<Command> {
    let mut cmd = Command::new("xdotool");
    cmd.args(["getactivewindow", "getwindowname"]);
    Some(cmd)
}

#[cfg(not(any(target_os = "macos", target_os = "linux")))]
fn focused_window_command() -> Option<Command> {
    None
}

impl WindowLabeler for CommandWindowLabeler {
    fn focused_label(&self) -> Result<Option<String>> {
        let Some(mut cmd) = focused_window_command() else {
            return Ok(None);
        };

        let output = cmd
            .output()
            .map_err(|e| TypistError::WindowLabel(e.to_string()))?;
        if !output.status.success() {
            return Err(TypistError::WindowLabel(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        let label = String::from_utf8_lossy(&output.stdout).trim().to_string();
        Ok(if label.is_empty() { None } else { Some(label) })
    }
}

/// Never returns a label.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoWindowLabel;

impl WindowLabeler for NoWindowLabel {
    fn focused_label(&self) -> Result<Option<String>> {
        Ok(None)
    }
}
