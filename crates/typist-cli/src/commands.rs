use crate::cli::Commands;
use std::path::Path;
use typist_core::config::{get_history_file_path, get_settings_file_path};
use typist_core::prompt::DialogPrompt;
use typist_core::tokens::DateFormats;
use typist_core::{
    get_config_dir, normalize_combo, preview_text, ArboardGateway, ClipboardContent,
    ClipboardGateway, Result, Settings, Shortcut, ShortcutStore, SystemClock, TokenExpander,
};
use typist_daemon::{
    daemon_status, daemon_worker_entry, read_history, run_foreground, start_daemon, stop_daemon,
};

const PREVIEW_WIDTH: usize = 60;

pub fn handle_command(command: Commands) -> Result<()> {
    match command {
        Commands::Start => start_daemon(),
        Commands::Stop => stop_daemon(),
        Commands::Status => daemon_status(),
        Commands::Run => run_foreground(),
        Commands::DaemonWorker => daemon_worker_entry(),
        Commands::Expand { text } => handle_expand(&text),
        Commands::History { limit } => handle_history(&get_history_file_path(), limit),
        other => {
            let settings = Settings::load_or_default(&get_settings_file_path())?;
            let store = ShortcutStore::open_default()?.with_settings(settings);
            handle_store_command(&store, other)
        }
    }
}

/// Commands that only touch the shortcut store. A running daemon picks the
/// change up on its next store check.
fn handle_store_command(store: &ShortcutStore, command: Commands) -> Result<()> {
    match command {
        Commands::Add {
            trigger,
            content,
            hotkey,
        } => {
            let mut shortcut = Shortcut::new(trigger, content);
            if let Some(combo) = hotkey {
                shortcut = shortcut.with_hotkey(normalize_combo(&combo)?);
            }
            store
                .add(shortcut)
                .map(|_| println!("Shortcut added successfully"))
        }
        Commands::Delete { trigger } => store
            .delete(&trigger)
            .map(|_| println!("Shortcut deleted successfully")),
        Commands::Update { trigger, content } => store
            .update(&trigger, content)
            .map(|_| println!("Shortcut updated successfully")),
        Commands::Enable { trigger } => store
            .set_enabled(&trigger, true)
            .map(|_| println!("Shortcut '{}' enabled", trigger)),
        Commands::Disable { trigger } => store
            .set_enabled(&trigger, false)
            .map(|_| println!("Shortcut '{}' disabled", trigger)),
        Commands::List => handle_list(store),
        Commands::Hotkey { combo, bind } => {
            let canonical = normalize_combo(&combo)?;
            match bind {
                Some(trigger) => {
                    store.set_hotkey(&trigger, Some(canonical.clone()))?;
                    println!("Bound {} to '{}'", canonical, trigger);
                }
                None => println!("{}", canonical),
            }
            Ok(())
        }
        Commands::Unbind { trigger } => store
            .set_hotkey(&trigger, None)
            .map(|_| println!("Hotkey removed from '{}'", trigger)),
        _ => Ok(()),
    }
}

fn handle_list(store: &ShortcutStore) -> Result<()> {
    let shortcuts = store.load()?;
    if shortcuts.is_empty() {
        println!("No shortcuts yet. Add one with 'typist add <trigger> <content>'.");
        return Ok(());
    }

    for shortcut in &shortcuts {
        println!("{}", describe_shortcut(shortcut));
    }
    println!("\nShortcuts file: {}", store.path().display());
    Ok(())
}

fn describe_shortcut(shortcut: &Shortcut) -> String {
    let mut line = format!(
        "{:<16} {}",
        shortcut.trigger,
        preview_text(&shortcut.content, PREVIEW_WIDTH)
    );
    if let Some(hotkey) = &shortcut.hotkey {
        line.push_str(&format!("  [{}]", hotkey));
    }
    if !shortcut.enabled {
        line.push_str("  (disabled)");
    }
    line
}

/// Stand-in when no clipboard is reachable; `{clipboard}` expands to nothing.
struct EmptyClipboard;

impl ClipboardGateway for EmptyClipboard {
    fn read(&mut self) -> Result<ClipboardContent> {
        Ok(ClipboardContent::default())
    }

    fn write(&mut self, _content: &ClipboardContent) -> Result<()> {
        Ok(())
    }
}

fn handle_expand(text: &str) -> Result<()> {
    let settings = Settings::load_or_default(&get_settings_file_path())?;
    let expander = TokenExpander::new(Box::new(SystemClock), Box::new(DialogPrompt));
    let formats = DateFormats::from(&settings);

    let output = match ArboardGateway::new() {
        Ok(mut gateway) => expander.expand(text, &formats, &mut gateway),
        Err(err) => {
            eprintln!("Clipboard unavailable ({}); {{clipboard}} expands to nothing", err);
            expander.expand(text, &formats, &mut EmptyClipboard)
        }
    };
    println!("{}", output);
    Ok(())
}

fn handle_history(path: &Path, limit: usize) -> Result<()> {
    let items = read_history(path, limit)?;
    if items.is_empty() {
        println!("No clipboard history yet.");
        println!("History is recorded while the daemon runs ({}).", get_config_dir().display());
        return Ok(());
    }

    for (index, item) in items.iter().enumerate() {
        let source = item.source_label.as_deref().unwrap_or("-");
        println!(
            "{:>3}  {}  {:<20}  {}",
            index + 1,
            item.timestamp.format("%Y-%m-%d %H:%M:%S"),
            preview_text(source, 20),
            item.preview(PREVIEW_WIDTH)
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use typist_core::TypistError;

    fn store_in(dir: &Path) -> ShortcutStore {
        ShortcutStore::new(dir.join("typist.json"))
    }

    #[test]
    fn add_canonicalizes_hotkey() {
        let dir = tempdir().unwrap();
        let store = store_in(dir.path());

        handle_store_command(
            &store,
            Commands::Add {
                trigger: "sig".to_string(),
                content: "Regards".to_string(),
                hotkey: Some("shift+ctrl+s".to_string()),
            },
        )
        .unwrap();

        let shortcuts = store.load().unwrap();
        assert_eq!(shortcuts.len(), 1);
        assert_eq!(shortcuts[0].hotkey.as_deref(), Some("Ctrl+Shift+S"));
    }

    #[test]
    fn add_with_bad_hotkey_saves_nothing() {
        let dir = tempdir().unwrap();
        let store = store_in(dir.path());

        let result = handle_store_command(
            &store,
            Commands::Add {
                trigger: "sig".to_string(),
                content: "Regards".to_string(),
                hotkey: Some("ctrl+nope".to_string()),
            },
        );

        assert!(matches!(result, Err(TypistError::InvalidHotkey { .. })));
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn add_rejects_trigger_that_cannot_be_typed() {
        let dir = tempdir().unwrap();
        let store = store_in(dir.path());

        let result = handle_store_command(
            &store,
            Commands::Add {
                trigger: "Sig".to_string(),
                content: "Regards".to_string(),
                hotkey: None,
            },
        );

        assert!(matches!(result, Err(TypistError::InvalidConfig(_))));
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn bind_and_unbind_hotkey() {
        let dir = tempdir().unwrap();
        let store = store_in(dir.path());
        store.add(Shortcut::new("addr", "1 Main St")).unwrap();

        handle_store_command(
            &store,
            Commands::Hotkey {
                combo: "alt+a".to_string(),
                bind: Some("addr".to_string()),
            },
        )
        .unwrap();
        assert_eq!(store.load().unwrap()[0].hotkey.as_deref(), Some("Alt+A"));

        handle_store_command(
            &store,
            Commands::Unbind {
                trigger: "addr".to_string(),
            },
        )
        .unwrap();
        assert_eq!(store.load().unwrap()[0].hotkey, None);
    }

    #[test]
    fn disable_unknown_trigger_fails() {
        let dir = tempdir().unwrap();
        let store = store_in(dir.path());

        let result = handle_store_command(
            &store,
            Commands::Disable {
                trigger: "missing".to_string(),
            },
        );
        assert!(matches!(result, Err(TypistError::ShortcutNotFound(_))));
    }

    #[test]
    fn describe_marks_hotkey_and_disabled() {
        let shortcut = Shortcut::new("sig", "Best\nregards")
            .with_hotkey("Ctrl+Alt+S")
            .disabled();
        let line = describe_shortcut(&shortcut);
        assert!(line.starts_with("sig"));
        assert!(line.contains("Best regards"));
        assert!(line.contains("[Ctrl+Alt+S]"));
        assert!(line.ends_with("(disabled)"));
    }

    #[test]
    fn describe_truncates_long_content() {
        let shortcut = Shortcut::new("lorem", "x".repeat(PREVIEW_WIDTH + 10));
        let line = describe_shortcut(&shortcut);
        assert!(line.ends_with('…'));
        assert_eq!(line.chars().filter(|c| *c == 'x').count(), PREVIEW_WIDTH - 1);
    }
}
