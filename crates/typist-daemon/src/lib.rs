pub mod daemon_manager;
pub mod history;
pub mod keyboard_listener;
pub mod logging;
pub mod permissions;
pub mod process;

pub use daemon_manager::{
    daemon_status, daemon_worker_entry, run_daemon_worker, run_foreground, start_daemon,
    stop_daemon,
};
pub use history::{read_history, HistoryRecorder};
pub use keyboard_listener::RdevSource;
