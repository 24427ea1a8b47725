// utils/logging.rs
use std::{
    fs::{self, File, OpenOptions},
    io,
    path::Path,
    sync::Mutex,
};

use chrono::Local;
use tracing_subscriber::{
    fmt::{self, format::Writer, time::FormatTime},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

/// Environment variable holding the filter for stderr logging.
pub const LOG_ENV_VAR: &str = "KUBESEL_LOG";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Installs the global tracing subscriber.
///
/// Logs go to stderr, since stdout carries output meant for the shell. When
/// `log_file` is given, everything at info or above (debug with `debug`) is
/// also appended to it.
pub fn init_logging(debug: bool, log_file: Option<&Path>) -> io::Result<()> {
    let terminal_layer = fmt::layer()
        .with_target(false)
        .with_timer(timer())
        .with_writer(io::stderr)
        .with_filter(terminal_filter(debug));

    let file_layer = match log_file {
        Some(path) => Some(
            fmt::layer()
                .with_target(false)
                .with_ansi(false)
                .with_timer(timer())
                .with_writer(Mutex::new(open_log_file(path)?))
                .with_filter(file_filter(debug)),
        ),
        None => None,
    };

    tracing_subscriber::registry()
        .with(terminal_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))
}

/// `--debug` wins over `KUBESEL_LOG`, which wins over the default of `warn`.
pub fn terminal_filter(debug: bool) -> EnvFilter {
    if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new("warn"))
    }
}

fn file_filter(debug: bool) -> EnvFilter {
    EnvFilter::new(if debug { "debug" } else { "info" })
}

/// Local wall-clock timestamps, as written to the log file.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalTime;

impl FormatTime for LocalTime {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        write!(w, "{}", Local::now().format(TIMESTAMP_FORMAT))
    }
}

fn timer() -> LocalTime {
    LocalTime
}

/// Opens a log file for appending, creating its directory if needed.
pub fn open_log_file(path: &Path) -> io::Result<File> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    OpenOptions::new().create(true).append(true).open(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;
    use tracing_subscriber::filter::LevelFilter;

    #[test]
    fn debug_flag_overrides_environment() {
        let filter = terminal_filter(true);
        assert_eq!(
            Layer::<tracing_subscriber::Registry>::max_level_hint(&filter),
            Some(LevelFilter::DEBUG)
        );
    }

    #[test]
    fn timestamps_use_local_time_format() {
        let mut out = String::new();
        LocalTime.format_time(&mut Writer::new(&mut out)).unwrap();
        assert!(chrono::NaiveDateTime::parse_from_str(&out, TIMESTAMP_FORMAT).is_ok(), "{out}");
    }

    #[test]
    fn log_file_is_appended_to() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("logs").join("kubesel.log");

        writeln!(open_log_file(&path).unwrap(), "first").unwrap();
        writeln!(open_log_file(&path).unwrap(), "second").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "first\nsecond\n");
    }
}
