use once_cell::sync::OnceCell;
use std::path::Path;
use std::sync::Mutex;

use tracing_appender::{non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{
    fmt,
    layer::SubscriberExt,
    reload::{Handle, Layer as ReloadLayer},
    util::SubscriberInitExt,
    EnvFilter, Registry,
};

/// Global reload handle so the host application can change the filter at runtime.
static RELOAD: OnceCell<Mutex<Handle<EnvFilter, Registry>>> = OnceCell::new();
/// Keeps the file writer alive (and flushing) for the whole process.
static FILE_GUARD: OnceCell<WorkerGuard> = OnceCell::new();

/// Initialize logging: console, plus a daily rolling file in `log_dir`
/// ("group_outbox.log") when one is given.
///
/// Returns the filter string actually applied. Calling it a second time
/// leaves the first subscriber in place.
pub fn init_logging(default_level: &str, log_dir: Option<&Path>) -> String {
    // Use env var if present, else the provided default
    let level = std::env::var("RUST_LOG").unwrap_or_else(|_| default_level.to_string());

    let filter = EnvFilter::try_new(&level).unwrap_or_else(|_| EnvFilter::new("info"));
    let (reload_layer, handle) = ReloadLayer::new(filter);

    let file_layer = log_dir.map(|dir| {
        let (writer, guard) = tracing_appender::non_blocking(rolling::daily(dir, "group_outbox.log"));
        let _ = FILE_GUARD.set(guard);
        fmt::layer().with_writer(writer).with_ansi(false)
    });

    let installed = tracing_subscriber::registry()
        .with(reload_layer)
        .with(fmt::layer().with_writer(std::io::stdout))
        .with(file_layer)
        .try_init()
        .is_ok();

    if installed {
        RELOAD.set(Mutex::new(handle)).ok();
    }

    level
}

/// Set the global log level dynamically, e.g. "warn", "debug", or a full
/// filter string like "info,group_outbox=debug".
pub fn set_level(new_level: &str) -> Result<(), String> {
    let handle = RELOAD
        .get()
        .ok_or_else(|| "logger not initialized".to_string())?
        .lock()
        .map_err(|_| "reload handle poisoned".to_string())?;

    let filter = EnvFilter::try_new(new_level)
        .map_err(|e| format!("invalid level/filter '{new_level}': {e}"))?;

    handle
        .modify(|inner: &mut EnvFilter| *inner = filter)
        .map_err(|e| format!("failed to apply filter: {e}"))?;

    Ok(())
}
