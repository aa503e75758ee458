//! Boot — logging init and detector construction from config.

use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use thiserror::Error;
use tracing::info;
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::conf::{ConfError, LoggingConfig, LogsniffConfig};
use crate::parser::{ConfigurationError, FormatDetector, Normalizer, PatternRegistry};

#[derive(Debug, Error)]
pub enum BootError {
    #[error(transparent)]
    Conf(#[from] ConfError),

    #[error("invalid format registry: {0}")]
    Registry(#[from] ConfigurationError),

    #[error("invalid log filter: {0}")]
    Filter(#[from] ParseError),

    #[error("cannot open log file {}: {source}", path.display())]
    LogFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("logging already initialised: {0}")]
    Subscriber(#[from] TryInitError),
}

/// Shared, buffered handle on the diagnostics file.
#[derive(Clone)]
struct FileSink(Arc<Mutex<BufWriter<File>>>);

impl FileSink {
    fn open(path: &str) -> Result<Self, BootError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|source| BootError::LogFile {
                path: PathBuf::from(path),
                source,
            })?;
        Ok(Self(Arc::new(Mutex::new(BufWriter::new(file)))))
    }

    fn lock(&self) -> io::Result<MutexGuard<'_, BufWriter<File>>> {
        self.0
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "log file lock poisoned"))
    }
}

impl Write for FileSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.lock()?.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.lock()?.flush()
    }
}

/// Keeps the log file alive; flushes it when dropped.
#[must_use = "dropping the guard flushes and stops file logging output"]
pub struct LoggingGuard {
    file: Option<FileSink>,
}

impl Drop for LoggingGuard {
    fn drop(&mut self) {
        if let Some(sink) = self.file.as_mut() {
            let _ = sink.flush();
        }
    }
}

/// Initialise the tracing / logging subsystem.
///
/// `RUST_LOG` wins over `logging.level`. Diagnostics go to stderr so that
/// stdout carries only results; with `logging.file` set they are also
/// appended to that file without ANSI colours.
pub fn init_logging(logging: &LoggingConfig) -> Result<LoggingGuard, BootError> {
    let sink = logging.file.as_deref().map(FileSink::open).transpose()?;

    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&logging.level)?,
    };

    let file_layer = sink.clone().map(|sink| {
        fmt::layer()
            .with_ansi(false)
            .with_writer(move || sink.clone())
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .try_init()?;

    Ok(LoggingGuard { file: sink })
}

/// Build the detector described by `config`.
pub fn build_detector(config: &LogsniffConfig) -> Result<FormatDetector, BootError> {
    let registry = PatternRegistry::from_config(config)?;
    info!(
        "Registered {} formats: {}",
        registry.len(),
        registry.names().join(", ")
    );
    info!(
        "Year policy: {:?}, max line size: {} bytes",
        config.year_policy, config.max_line_size
    );

    Ok(FormatDetector::new(registry, Normalizer::new(config.year_policy))
        .with_max_line_size(config.max_line_size))
}
