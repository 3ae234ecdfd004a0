use std::env;
use std::ffi::OsStr;
use std::io;
use std::path::{Path, PathBuf};

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::fmt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{layer::SubscriberExt, EnvFilter};

const DEFAULT_LOG_FILE: &str = "logs/app.log";

/// Split a log file path into the rolling appender's directory and file prefix.
fn log_target(log_path: &str) -> (PathBuf, PathBuf) {
    let path = Path::new(log_path);
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let file = path.file_name().unwrap_or(OsStr::new("app.log"));
    (dir.to_path_buf(), PathBuf::from(file))
}

/// Daily rolling, non-blocking writer. Queued lines are flushed when the guard drops.
fn file_writer(log_path: &str) -> (NonBlocking, WorkerGuard) {
    let (dir, file) = log_target(log_path);
    tracing_appender::non_blocking(tracing_appender::rolling::daily(dir, file))
}

/// Install the subscriber and panic hook.
///
/// The returned guard owns the file writer's worker; keep it alive until the
/// process is about to exit so the last lines reach the log file.
#[must_use = "dropping the guard stops file logging"]
pub fn init() -> WorkerGuard {
    // Env filter: use RUST_LOG or default to info
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));

    // Console (stderr) layer with file/line
    let console_layer = fmt::layer()
        .with_writer(io::stderr)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_level(true)
        .compact();

    // File logging (RUST_LOG_FILE, default logs/app.log), rolled daily
    let log_path = env::var("RUST_LOG_FILE").unwrap_or_else(|_| DEFAULT_LOG_FILE.to_string());
    let (nb_writer, guard) = file_writer(&log_path);

    let file_layer = fmt::layer()
        .with_writer(nb_writer)
        .with_ansi(false)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_level(true)
        .compact();

    // try_init: a second call (tests, embedding) keeps the first subscriber
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .try_init();

    // Hook panics to log with backtrace
    std::panic::set_hook(Box::new(|info| {
        let mut msg = String::new();
        if let Some(loc) = info.location() {
            msg.push_str(&format!("panic at {}:{}:{} ", loc.file(), loc.line(), loc.column()));
        }
        if let Some(s) = info.payload().downcast_ref::<&str>() { msg.push_str(s); }
        else if let Some(s) = info.payload().downcast_ref::<String>() { msg.push_str(s); }
        else { msg.push_str("<non-string panic>"); }
        let bt = std::backtrace::Backtrace::force_capture();
        tracing::error!("{}\nBacktrace:\n{:?}", msg, bt);
    }));

    guard
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::Write;

    #[test]
    fn log_target_splits_path() {
        assert_eq!(log_target("logs/app.log"), (PathBuf::from("logs"), PathBuf::from("app.log")));
        assert_eq!(log_target("run.log"), (PathBuf::from("."), PathBuf::from("run.log")));
        assert_eq!(log_target("/var/log/x/demo.log"), (PathBuf::from("/var/log/x"), PathBuf::from("demo.log")));
    }

    #[test]
    fn dropping_guard_flushes_queued_lines() {
        let dir = env::temp_dir().join(format!("tablescape-log-{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        let path = dir.join("flush.log");

        let (mut writer, guard) = file_writer(&path.to_string_lossy());
        for i in 0..200 {
            writeln!(writer, "line {i}").unwrap();
        }
        writeln!(writer, "startup failed: missing asset").unwrap();
        drop(writer);
        drop(guard);

        // The daily appender suffixes the prefix with the date
        let contents: String = fs::read_dir(&dir)
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.file_name().to_string_lossy().starts_with("flush.log"))
            .map(|e| fs::read_to_string(e.path()).unwrap())
            .collect();
        let _ = fs::remove_dir_all(&dir);

        assert_eq!(contents.lines().count(), 201);
        assert!(contents.contains("startup failed: missing asset"));
    }
}
