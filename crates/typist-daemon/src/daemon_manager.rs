use crate::history::HistoryRecorder;
use crate::keyboard_listener::RdevSource;
use crate::logging;
use crate::permissions::check_permissions;
use crate::process::{terminate_process, verify_process_running};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, SystemTime};
use tracing::{info, warn};
use typist_core::clipboard::ArboardGateway;
use typist_core::config::{
    ensure_config_dir, get_history_file_path, get_pid_file_path, get_settings_file_path,
    LOG_FILENAME,
};
use typist_core::engine::{Engine, EngineCommand, EngineParts, Feature};
use typist_core::focus::CommandWindowLabeler;
use typist_core::monitor::{spawn_input_monitor, ExpansionSwitch, InputMonitor};
use typist_core::prompt::DialogPrompt;
use typist_core::registrar::{GlobalHotkeyBackend, HotkeyBackend};
use typist_core::synth::EnigoSynthesizer;
use typist_core::tokens::{SystemClock, TokenExpander};
use typist_core::{
    find_trigger_conflicts, get_config_dir, is_daemon_running, Result, Settings, SharedSettings,
    ShortcutSet, ShortcutStore, TypistError,
};

const STORE_CHECK_INTERVAL: Duration = Duration::from_secs(1);

/// Start the daemon in the background
pub fn start_daemon() -> Result<()> {
    if let Some(pid) = is_daemon_running()? {
        if verify_process_running(pid) {
            return Err(TypistError::DaemonAlreadyRunning(pid));
        }
        println!("Found stale PID file. Cleaning up and starting new daemon...");
        let _ = fs::remove_file(get_pid_file_path());
    }

    println!("Starting typist daemon...");
    let config_dir = ensure_config_dir()?;
    check_permissions()?;

    let current_exe = std::env::current_exe()?;
    std::process::Command::new(current_exe)
        .arg("daemon-worker")
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .spawn()?;

    // Wait for the worker to write its PID file
    for _ in 0..20 {
        thread::sleep(Duration::from_millis(100));
        if is_daemon_running()?.is_some() {
            break;
        }
    }

    let log_file = config_dir.join(LOG_FILENAME);
    match is_daemon_running()? {
        Some(pid) if verify_process_running(pid) => {
            println!("Daemon started successfully with PID {}.", pid);
            Ok(())
        }
        _ => Err(TypistError::Other(format!(
            "Daemon failed to start. Check logs at {}",
            log_file.display()
        ))),
    }
}

/// Stop the daemon if it's running
pub fn stop_daemon() -> Result<()> {
    let pid_file = get_pid_file_path();
    let Some(pid) = read_pid(&pid_file)? else {
        return Err(TypistError::DaemonNotRunning);
    };

    println!("Attempting to stop daemon with PID {}...", pid);

    if !verify_process_running(pid) {
        println!("Process with PID {} is not running.", pid);
        let _ = fs::remove_file(&pid_file);
        return Ok(());
    }

    let mut stopped = terminate_process(pid, false);
    thread::sleep(Duration::from_millis(500));
    if verify_process_running(pid) {
        println!("Daemon didn't terminate gracefully, using force kill...");
        stopped = terminate_process(pid, true);
    }

    let _ = fs::remove_file(&pid_file);
    if stopped {
        println!("Daemon stopped successfully.");
    } else {
        println!("WARNING: Failed to stop daemon process. PID file was removed anyway.");
    }
    Ok(())
}

fn read_pid(pid_file: &Path) -> Result<Option<u32>> {
    if !pid_file.exists() {
        return Ok(None);
    }
    let content = match fs::read_to_string(pid_file) {
        Ok(content) => content,
        Err(err) => {
            let _ = fs::remove_file(pid_file);
            return Err(TypistError::Other(format!("Failed to read PID file: {}", err)));
        }
    };
    match content.trim().parse::<u32>() {
        Ok(pid) => Ok(Some(pid)),
        Err(_) => {
            let _ = fs::remove_file(pid_file);
            Err(TypistError::InvalidPid)
        }
    }
}

/// Check daemon status
pub fn daemon_status() -> Result<()> {
    match is_daemon_running()? {
        Some(pid) if verify_process_running(pid) => {
            println!("typist daemon is running with PID {}", pid);
            println!("Logs: {}", get_config_dir().join(LOG_FILENAME).display());
        }
        Some(pid) => {
            println!("PID file exists but process {} is not running", pid);
            println!("This could indicate the daemon crashed or was stopped abruptly");
            println!("Recommend running 'typist stop' followed by 'typist start'");
        }
        None => println!("typist daemon is not running"),
    }
    Ok(())
}

/// Entry point of the detached worker process started by `start_daemon`.
pub fn daemon_worker_entry() -> Result<()> {
    let config_dir = ensure_config_dir()?;
    let pid_file = get_pid_file_path();

    #[cfg(unix)]
    {
        use daemonize::Daemonize;

        let stderr = File::create(config_dir.join("daemon.err"))?;
        Daemonize::new()
            .pid_file(&pid_file)
            .working_directory(&config_dir)
            .stderr(stderr)
            .start()
            .map_err(|e| TypistError::Other(format!("Error starting daemon: {}", e)))?;
    }

    #[cfg(not(unix))]
    {
        use std::io::Write;
        let mut file = File::create(&pid_file)?;
        write!(file, "{}", std::process::id())?;
    }

    let _guard = logging::init(&config_dir, false)?;
    let result = run_daemon_worker();
    if let Err(err) = &result {
        tracing::error!(error = %err, "Daemon worker exited with an error");
    }

    let _ = fs::remove_file(&pid_file);
    result
}

/// Run the engine in the foreground, logging to stderr as well.
pub fn run_foreground() -> Result<()> {
    let config_dir = ensure_config_dir()?;
    let _guard = logging::init(&config_dir, true)?;
    check_permissions()?;
    run_daemon_worker()
}

/// Wire the keystroke hook, store watcher and engine together and run the
/// engine on the calling thread until it stops.
pub fn run_daemon_worker() -> Result<()> {
    let store = ShortcutStore::open_default()?;
    let settings_path = get_settings_file_path();

    let settings = Settings::load_or_default(&settings_path)?;
    let shortcuts = store.load()?;
    report_trigger_conflicts(&store)?;
    info!(
        shortcuts = shortcuts.len(),
        store = %store.path().display(),
        "Loaded shortcuts"
    );

    let shortcuts = ShortcutSet::new(shortcuts);
    let settings = SharedSettings::new(settings);
    let switch = ExpansionSwitch::default();
    let (tx, rx) = mpsc::channel();

    let monitor = InputMonitor::new(shortcuts.clone(), settings.clone(), switch.clone(), tx.clone());
    let _keyboard_thread = spawn_input_monitor(Box::new(RdevSource::new()), monitor)?;
    let _store_thread =
        spawn_store_watcher(store.path().to_path_buf(), settings_path, tx.clone())?;

    // Hotkeys are delivered to the registering thread, which is also the
    // thread that runs the engine below.
    let (hotkeys, hotkey_error) = match GlobalHotkeyBackend::new() {
        Ok(backend) => (Some(Box::new(backend) as Box<dyn HotkeyBackend>), None),
        Err(err) => (None, Some(err)),
    };
    let parts = EngineParts {
        gateway: Box::new(ArboardGateway::new()?),
        synth: Box::new(EnigoSynthesizer::new()?),
        expander: TokenExpander::new(Box::new(SystemClock), Box::new(DialogPrompt)),
        labeler: Box::new(CommandWindowLabeler),
        hotkeys,
        observer: Box::new(HistoryRecorder::new(get_history_file_path())),
        shortcuts,
        settings,
        switch,
    };

    let mut engine = Engine::new(parts, tx);
    if let Some(err) = hotkey_error {
        engine.feature_unavailable(Feature::Hotkeys, &err);
    }

    info!("typist daemon running");
    engine.run(rx);
    Ok(())
}

fn report_trigger_conflicts(store: &ShortcutStore) -> Result<()> {
    for (trigger, ids) in find_trigger_conflicts(&store.load()?) {
        warn!(
            trigger = %trigger,
            count = ids.len(),
            "Several shortcuts share a trigger; the first one wins"
        );
    }
    Ok(())
}

fn modified_at(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}

/// Poll the shortcut and settings files and push changes to the engine.
fn spawn_store_watcher(
    db_path: PathBuf,
    settings_path: PathBuf,
    commands: Sender<EngineCommand>,
) -> Result<JoinHandle<()>> {
    let handle = thread::Builder::new()
        .name("typist-store".to_string())
        .spawn(move || {
            let store = ShortcutStore::new(&db_path);
            let mut db_modified = modified_at(&db_path);
            let mut settings_modified = modified_at(&settings_path);

            loop {
                thread::sleep(STORE_CHECK_INTERVAL);

                let current = modified_at(&db_path);
                if current != db_modified {
                    db_modified = current;
                    match store.load() {
                        Ok(shortcuts) => {
                            if commands
                                .send(EngineCommand::ReplaceShortcuts(shortcuts))
                                .is_err()
                            {
                                break;
                            }
                        }
                        Err(err) => warn!(error = %err, "Failed to reload shortcuts"),
                    }
                }

                let current = modified_at(&settings_path);
                if current != settings_modified {
                    settings_modified = current;
                    match Settings::load_or_default(&settings_path) {
                        Ok(settings) => {
                            if commands
                                .send(EngineCommand::ReplaceSettings(settings))
                                .is_err()
                            {
                                break;
                            }
                        }
                        Err(err) => warn!(error = %err, "Failed to reload settings"),
                    }
                }
            }
        })?;
    Ok(handle)
}
