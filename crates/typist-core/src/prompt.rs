//! Asking the user for a value while an expansion is in progress.

use std::process::Command;
use std::thread;
use tokio::sync::oneshot;
use tracing::{debug, warn};

/// Shows a single "enter a value" interaction and answers through a oneshot
/// channel. `None`, or a dropped sender, means the user cancelled.
pub trait ValuePrompt {
    fn request(&self, field: &str) -> oneshot::Receiver<Option<String>>;
}

/// Prompts with the platform's dialog tooling on a dedicated thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct DialogPrompt;

#[cfg(target_os = "macos")]
fn dialog_command(field: &str) -> Option<Command> {
    let script = format!(
        "text returned of (display dialog \"{}\" default answer \"\" with title \"typist\")",
        field.replace('\\', "\\\\").replace('"', "\\\"")
    );
    let mut cmd = Command::new("osascript");
    cmd.arg("-e").arg(script);
    Some(cmd)
}

#[cfg(target_os = "linux")]
fn dialog_command(field: &str) -> Option<Command> {
    let mut cmd = Command::new("zenity");
    cmd.args(["--entry", "--title", "typist", "--text"]).arg(field);
    Some(cmd)
}

#[cfg(target_os = "windows")]
fn dialog_command(field: &str) -> Option<Command> {
    let script = format!(
        "Add-Type -AssemblyName Microsoft.VisualBasic; \
         [Microsoft.VisualBasic.Interaction]::InputBox('{}', 'typist')",
        field.replace('\'', "''")
    );
    let mut cmd = Command::new("powershell");
    cmd.args(["-NoProfile", "-Command"]).arg(script);
    Some(cmd)
}

#[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
fn dialog_command(_field: &str) -> Option<Command> {
    None
}

fn run_dialog(field: &str) -> Option<String> {
    let mut cmd = dialog_command(field)?;
    match cmd.output() {
        Ok(output) if output.status.success() => {
            let value = String::from_utf8_lossy(&output.stdout);
            Some(value.trim_end_matches(['\r', '\n']).to_string())
        }
        Ok(_) => {
            debug!(field, "Value prompt cancelled");
            None
        }
        Err(err) => {
            warn!(field, error = %err, "Failed to show value prompt");
            None
        }
    }
}

impl ValuePrompt for DialogPrompt {
    fn request(&self, field: &str) -> oneshot::Receiver<Option<String>> {
        let (tx, rx) = oneshot::channel();
        let field = field.to_string();
        thread::spawn(move || {
            // The receiver may be gone if the expansion was abandoned.
            let _ = tx.send(run_dialog(&field));
        });
        rx
    }
}

/// Answers every prompt with a cancellation.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPrompt;

impl ValuePrompt for NoPrompt {
    fn request(&self, _field: &str) -> oneshot::Receiver<Option<String>> {
        let (tx, rx) = oneshot::channel();
        let _ = tx.send(None);
        rx
    }
}
