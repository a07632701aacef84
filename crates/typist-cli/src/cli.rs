use clap::{Parser, Subcommand};
use std::env;

#[derive(Parser)]
#[command(
    author = "Gokul <@bahdotsh>",
    version = env!("CARGO_PKG_VERSION"),
    about = "typist - system-wide text expansion and clipboard history",
    long_about = "typist expands shortcuts as you type them anywhere on the desktop, \
                  and keeps a history of what you copy so it can be pasted again."
)]
pub struct Typist {
    #[clap(subcommand)]
    pub commands: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Add a new shortcut
    Add {
        #[clap(help = "Text that triggers the expansion")]
        trigger: String,

        #[clap(help = "Replacement text; may contain {date}, {time}, {clipboard} and {prompt:Name}")]
        content: String,

        #[clap(long, short = 'k', help = "Global hotkey that inserts the content, e.g. Ctrl+Alt+S")]
        hotkey: Option<String>,
    },
    /// Delete a shortcut by trigger
    Delete {
        #[clap(help = "Trigger of the shortcut to delete")]
        trigger: String,
    },
    /// Replace the content of an existing shortcut
    Update {
        #[clap(help = "Trigger of the shortcut to update")]
        trigger: String,

        #[clap(help = "New replacement text")]
        content: String,
    },
    /// Enable a shortcut
    Enable { trigger: String },
    /// Disable a shortcut without deleting it
    Disable { trigger: String },
    /// List all shortcuts
    List,
    /// Check a hotkey combo and print its canonical form
    Hotkey {
        #[clap(help = "Combo such as ctrl+shift+v")]
        combo: String,

        #[clap(long, short = 't', help = "Bind the combo to the shortcut with this trigger")]
        bind: Option<String>,
    },
    /// Remove the hotkey from a shortcut
    Unbind { trigger: String },
    /// Preview how a template expands right now
    Expand {
        #[clap(help = "Template text")]
        text: String,
    },
    /// Show the most recent clipboard items
    History {
        #[clap(long, short = 'n', default_value = "10", help = "Number of items to show")]
        limit: usize,
    },
    /// Start the daemon in the background
    Start,
    /// Stop the typist daemon
    Stop,
    /// Check the status of the typist daemon
    Status,
    /// Run the engine in the foreground
    Run,
    // Hidden command used internally to run the daemon worker
    #[clap(hide = true)]
    DaemonWorker,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_accepts_optional_hotkey() {
        let args = Typist::try_parse_from(["typist", "add", "sig", "Regards", "-k", "ctrl+alt+s"])
            .unwrap();
        match args.commands {
            Commands::Add {
                trigger,
                content,
                hotkey,
            } => {
                assert_eq!(trigger, "sig");
                assert_eq!(content, "Regards");
                assert_eq!(hotkey.as_deref(), Some("ctrl+alt+s"));
            }
            _ => panic!("expected add"),
        }
    }

    #[test]
    fn history_limit_defaults_to_ten() {
        let args = Typist::try_parse_from(["typist", "history"]).unwrap();
        assert!(matches!(args.commands, Commands::History { limit: 10 }));
    }

    #[test]
    fn daemon_worker_is_parsed_but_hidden() {
        let args = Typist::try_parse_from(["typist", "daemon-worker"]).unwrap();
        assert!(matches!(args.commands, Commands::DaemonWorker));
    }
}
