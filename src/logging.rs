//! Tracing configuration and log routing.
//!
//! Translations are written to stdout, so console logs always go to stderr. A second, plain-text
//! copy is appended to `DIGEST_TRANSLATOR_LOG_FILE` when set, or to `logs/digest-translator.log`.
use std::{
    fs::OpenOptions,
    path::{Path, PathBuf},
    sync::OnceLock,
};

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

const LOG_FILE_VAR: &str = "DIGEST_TRANSLATOR_LOG_FILE";
const DEFAULT_LOG_DIR: &str = "logs";
const DEFAULT_LOG_FILE: &str = "digest-translator.log";

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Where and how verbosely the CLI logs.
#[derive(Debug, Clone, PartialEq, Eq)]
struct LogSettings {
    level: &'static str,
    file: PathBuf,
}

impl LogSettings {
    fn resolve(debug: bool, file_override: Option<String>) -> Self {
        let file = file_override
            .filter(|path| !path.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| Path::new(DEFAULT_LOG_DIR).join(DEFAULT_LOG_FILE));
        Self {
            level: if debug { "debug" } else { "info" },
            file,
        }
    }

    fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(self.level))
    }
}

/// Install the stderr layer and, when the log file can be opened, a file layer.
///
/// `RUST_LOG` wins over the `debug` flag.
pub fn init_tracing(debug: bool) {
    let settings = LogSettings::resolve(debug, std::env::var(LOG_FILE_VAR).ok());
    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact();
    let file_layer = open_log_file(&settings.file).map(|writer| {
        fmt::layer()
            .with_writer(writer)
            .with_ansi(false)
            .compact()
    });

    tracing_subscriber::registry()
        .with(settings.filter())
        .with(stderr_layer)
        .with(file_layer)
        .init();
}

fn open_log_file(path: &Path) -> Option<NonBlocking> {
    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        if let Err(err) = std::fs::create_dir_all(dir) {
            eprintln!("Failed to create log directory {}: {err}", dir.display());
            return None;
        }
    }
    match OpenOptions::new().create(true).append(true).open(path) {
        Ok(file) => {
            let (writer, guard) = tracing_appender::non_blocking(file);
            let _ = LOG_GUARD.set(guard);
            Some(writer)
        }
        Err(err) => {
            eprintln!("Failed to open log file {}: {err}", path.display());
            None
        }
    }
}
