//! Subscriber setup.
//!
//! `RUST_LOG` wins when set. Otherwise logging starts at `info` and is
//! narrowed or widened to the configured `server.log_level` once a
//! configuration file has been loaded. Output goes to stderr until
//! `server.log_file_path` attaches a file, after which every line is
//! appended there instead.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::Context;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{reload, EnvFilter, Registry};

use runguard_core::ServerSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

pub struct Logging {
    filter: reload::Handle<EnvFilter, Registry>,
    from_env: bool,
    sink: LogSink,
}

pub fn init(format: LogFormat) -> Logging {
    let from_env = std::env::var_os(EnvFilter::DEFAULT_ENV).is_some();
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let (filter, handle) = reload::Layer::new(env_filter);

    let sink = LogSink::default();
    let registry = tracing_subscriber::registry().with(filter);
    let fmt = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_writer(sink.clone());
    // A second init (tests) keeps the first subscriber.
    let _ = match format {
        LogFormat::Text => registry.with(fmt).try_init(),
        LogFormat::Json => registry.with(fmt.json()).try_init(),
    };

    Logging {
        filter: handle,
        from_env,
        sink,
    }
}

impl Logging {
    /// Apply the logging part of a loaded configuration: the level (unless
    /// `RUST_LOG` was given) and the optional log file.
    pub fn apply_config(&self, server: &ServerSettings) -> anyhow::Result<()> {
        if let Some(path) = &server.log_file_path {
            self.sink.attach(path)?;
        }
        if !self.from_env {
            self.apply_level(server.log_level);
        }
        Ok(())
    }

    fn apply_level(&self, level: tracing::Level) {
        let filter = EnvFilter::default().add_directive(LevelFilter::from_level(level).into());
        if let Err(e) = self.filter.reload(filter) {
            tracing::debug!(error = %e, "could not apply configured log level");
        }
    }
}

/// Writer target shared between the subscriber and [`Logging`].
#[derive(Clone, Default)]
pub(crate) struct LogSink {
    file: Arc<Mutex<Option<File>>>,
}

impl LogSink {
    /// Route all further output to `path`, opened for append.
    pub(crate) fn attach(&self, path: &Path) -> anyhow::Result<()> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("failed to open log file {}", path.display()))?;
        let mut slot = self
            .file
            .lock()
            .map_err(|_| anyhow::anyhow!("log sink lock poisoned"))?;
        *slot = Some(file);
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogSink {
    type Writer = SinkWriter;

    fn make_writer(&'a self) -> Self::Writer {
        SinkWriter {
            file: Arc::clone(&self.file),
            buf: Vec::with_capacity(256),
        }
    }
}

/// Buffers one formatted event and flushes it on drop.
pub(crate) struct SinkWriter {
    file: Arc<Mutex<Option<File>>>,
    buf: Vec<u8>,
}

impl Write for SinkWriter {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for SinkWriter {
    fn drop(&mut self) {
        if self.buf.is_empty() {
            return;
        }
        if let Ok(mut slot) = self.file.lock() {
            if let Some(file) = slot.as_mut() {
                let _ = file.write_all(&self.buf);
                return;
            }
        }
        let _ = io::stderr().write_all(&self.buf);
    }
}
