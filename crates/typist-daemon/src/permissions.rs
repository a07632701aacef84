use typist_core::{Result, TypistError};

/// Make sure the process can watch the keyboard before the daemon starts.
pub fn check_permissions() -> Result<()> {
    #[cfg(target_os = "macos")]
    {
        if !has_accessibility_permission() {
            return Err(TypistError::PermissionDenied(
                "typist needs Accessibility access. Open System Settings > Privacy & Security > \
                 Accessibility, add your terminal, then run 'typist start' again."
                    .to_string(),
            ));
        }
    }

    #[cfg(all(target_os = "linux", feature = "grab"))]
    {
        if !can_read_input_devices() {
            return Err(TypistError::PermissionDenied(
                "typist cannot read /dev/input. Add your user to the 'input' group \
                 (sudo usermod -aG input $USER) and log in again."
                    .to_string(),
            ));
        }
    }

    #[cfg(all(target_os = "linux", not(feature = "grab")))]
    {
        if std::env::var_os("DISPLAY").is_none() {
            return Err(TypistError::PermissionDenied(
                "no X11 display found. typist needs an X11 session (DISPLAY) to watch the keyboard."
                    .to_string(),
            ));
        }
    }

    Ok(())
}

#[cfg(target_os = "macos")]
fn has_accessibility_permission() -> bool {
    std::process::Command::new("osascript")
        .args([
            "-e",
            "tell application \"System Events\" to return name of first process",
        ])
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false)
}

#[cfg(all(target_os = "linux", feature = "grab"))]
fn can_read_input_devices() -> bool {
    let Ok(entries) = std::fs::read_dir("/dev/input") else {
        return false;
    };
    entries.flatten().any(|entry| {
        entry.file_name().to_string_lossy().starts_with("event")
            && std::fs::File::open(entry.path()).is_ok()
    })
}
