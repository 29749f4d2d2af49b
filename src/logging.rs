use std::path::PathBuf;

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_LOG_DIR: &str = "./logs";
const LOG_FILE_NAME: &str = "lexicon.log";

pub struct FileLogGuard {
    _guard: WorkerGuard,
}

/// Daily rolling file output, switched on with `ENABLE_FILE_LOGS`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileLogSettings {
    pub dir: PathBuf,
}

impl FileLogSettings {
    pub fn from_env() -> Option<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Option<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let enabled = lookup("ENABLE_FILE_LOGS")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);
        if !enabled {
            return None;
        }

        let dir = lookup("LOG_DIR")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_LOG_DIR.to_string());

        Some(Self {
            dir: PathBuf::from(dir),
        })
    }

    fn open_writer(&self) -> Option<(NonBlocking, WorkerGuard)> {
        if let Err(err) = std::fs::create_dir_all(&self.dir) {
            eprintln!("failed to create log directory {}: {err}", self.dir.display());
            return None;
        }

        let appender = RollingFileAppender::new(Rotation::DAILY, &self.dir, LOG_FILE_NAME);
        Some(tracing_appender::non_blocking(appender))
    }
}

/// Installs the global subscriber. Console output goes to stderr so command
/// results on stdout stay clean.
pub fn init_tracing(log_level: &str) -> Option<FileLogGuard> {
    let env_filter = EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    let (file_layer, guard) = match FileLogSettings::from_env().and_then(|s| s.open_writer()) {
        Some((writer, guard)) => (
            Some(
                fmt::layer()
                    .with_writer(writer)
                    .with_ansi(false)
                    .with_target(true),
            ),
            Some(FileLogGuard { _guard: guard }),
        ),
        None => (None, None),
    };

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init();

    guard
}
