//! Logging initialization.
//!
//! Mirrors `utils/args.py::Args.check_args`'s sink selection: `-o log=syslog`
//! (the default) sends every `tracing` event to the syslog `LOG_USER`
//! facility; `-o log=<path>` writes to a daily-rotating file instead,
//! ported from `TimedRotatingFileHandler`. `-o log_level=` sets the level
//! filter; `-o debug=true` forces `debug` regardless of `log_level`,
//! exactly as the original does.
//!
//! Unlike the teacher's telemetry module, there's no OTLP/OTel pipeline
//! here — GitFS is a single long-lived mount daemon, not a distributed
//! pipeline, so spans/events go straight to one of these two sinks.

use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::EnvFilter;

/// Opaque guard; holding it keeps the log sink alive for the process
/// lifetime. Logging here is synchronous, so there's nothing to flush on
/// drop — the guard exists purely so `main` has something to bind.
pub struct TelemetryGuard;

/// Initialize `tracing` with the sink and level selected by the mount options.
///
/// # Errors
/// Returns an error if `log` is `"syslog"` and the syslog connection can't
/// be established.
pub fn init(log: &str, log_level: &str, debug: bool) -> io::Result<TelemetryGuard> {
    let level = if debug { "debug" } else { log_level };
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));

    if log == "syslog" {
        let writer = SyslogMakeWriter::connect()?;
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(writer)
            .with_ansi(false)
            .init();
    } else {
        let writer = DailyRotatingMakeWriter::new(PathBuf::from(log));
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(writer)
            .with_ansi(false)
            .init();
    }

    Ok(TelemetryGuard)
}

type SyslogLogger = syslog::Logger<syslog::LoggerBackend, syslog::Formatter3164>;

/// Routes every `tracing` event to syslog at `LOG_USER`, picking the
/// syslog severity from the event's `tracing` level.
struct SyslogMakeWriter {
    logger: Arc<Mutex<SyslogLogger>>,
}

impl SyslogMakeWriter {
    fn connect() -> io::Result<Self> {
        let formatter = syslog::Formatter3164 {
            facility: syslog::Facility::LOG_USER,
            hostname: None,
            process: "gitfs".to_owned(),
            pid: std::process::id(),
        };
        let logger = syslog::unix(formatter).map_err(|e| io::Error::other(e.to_string()))?;
        Ok(Self {
            logger: Arc::new(Mutex::new(logger)),
        })
    }
}

impl<'a> MakeWriter<'a> for SyslogMakeWriter {
    type Writer = SyslogWriter;

    fn make_writer(&'a self) -> Self::Writer {
        SyslogWriter {
            logger: Arc::clone(&self.logger),
            level: tracing::Level::INFO,
        }
    }

    fn make_writer_for(&'a self, meta: &tracing::Metadata<'_>) -> Self::Writer {
        SyslogWriter {
            logger: Arc::clone(&self.logger),
            level: *meta.level(),
        }
    }
}

struct SyslogWriter {
    logger: Arc<Mutex<SyslogLogger>>,
    level: tracing::Level,
}

impl io::Write for SyslogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let message = String::from_utf8_lossy(buf);
        let message = message.trim_end();
        if !message.is_empty() {
            let mut logger = self.logger.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
            let result = match self.level {
                tracing::Level::ERROR => logger.err(message),
                tracing::Level::WARN => logger.warning(message),
                tracing::Level::INFO => logger.info(message),
                tracing::Level::DEBUG | tracing::Level::TRACE => logger.debug(message),
            };
            if let Err(err) = result {
                eprintln!("gitfs: syslog write failed: {err}");
            }
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Appends to `<base_path>.<YYYY-MM-DD>`, reopening at midnight the way
/// `TimedRotatingFileHandler` rolls over — a fresh file handle per write
/// rather than a background rotation timer, since GitFS's write volume
/// (one log line per view op) doesn't warrant a cached handle.
struct DailyRotatingMakeWriter {
    base_path: PathBuf,
}

impl DailyRotatingMakeWriter {
    fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }
}

impl<'a> MakeWriter<'a> for DailyRotatingMakeWriter {
    type Writer = DailyRotatingWriter;

    fn make_writer(&'a self) -> Self::Writer {
        DailyRotatingWriter {
            base_path: self.base_path.clone(),
        }
    }
}

struct DailyRotatingWriter {
    base_path: PathBuf,
}

impl DailyRotatingWriter {
    fn rotated_path(&self) -> PathBuf {
        let date = chrono::Local::now().format("%Y-%m-%d");
        let mut name = self.base_path.clone().into_os_string();
        name.push(format!(".{date}"));
        PathBuf::from(name)
    }
}

impl io::Write for DailyRotatingWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        use std::io::Write as _;
        let mut file = std::fs::OpenOptions::new().create(true).append(true).open(self.rotated_path())?;
        file.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
