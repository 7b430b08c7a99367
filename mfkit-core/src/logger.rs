use std::sync::{Arc, OnceLock};

/// A sink for log messages produced by `mfkit`.
///
/// Implement this on the host side (e.g. forwarding to `console`) and hand it
/// to [`set_logger`] once at start-up.
///
/// ```rust
/// use mfkit_core::logger::{LogLevel, Logger};
///
/// struct ConsoleLogger;
///
/// impl Logger for ConsoleLogger {
///     fn log(&self, level: LogLevel, message: String) {
///         println!("[{level:?}] {message}");
///     }
/// }
/// ```
#[uniffi::export(with_foreign)]
pub trait Logger: Sync + Send {
    /// Logs a message at the specified log level.
    fn log(&self, level: LogLevel, message: String);
}

/// Severity of a log message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, uniffi::Enum)]
pub enum LogLevel {
    /// Very detailed tracing.
    Trace,
    /// Debugging information.
    Debug,
    /// Progress of the handshake, migration and gate.
    Info,
    /// Absorbed faults (store unavailable, verification mismatch, ...).
    Warn,
    /// Faults that still allow the application to continue.
    Error,
}

/// Forwards `log` records to the registered [`Logger`].
struct ForeignLogger;

impl log::Log for ForeignLogger {
    fn enabled(&self, _metadata: &log::Metadata) -> bool {
        true
    }

    fn log(&self, record: &log::Record) {
        if !should_forward(record.module_path(), record.level()) {
            return;
        }

        if let Some(logger) = LOGGER_INSTANCE.get() {
            logger.log(log_level(record.level()), format!("{}", record.args()));
        } else {
            eprintln!("Logger not set: {}", record.args());
        }
    }

    fn flush(&self) {}
}

/// Debug and trace records are only forwarded when they come from `mfkit`.
fn should_forward(module_path: Option<&str>, level: log::Level) -> bool {
    let from_mfkit = module_path.is_some_and(|path| path.starts_with("mfkit"));
    let verbose = matches!(level, log::Level::Debug | log::Level::Trace);
    from_mfkit || !verbose
}

const fn log_level(level: log::Level) -> LogLevel {
    match level {
        log::Level::Error => LogLevel::Error,
        log::Level::Warn => LogLevel::Warn,
        log::Level::Info => LogLevel::Info,
        log::Level::Debug => LogLevel::Debug,
        log::Level::Trace => LogLevel::Trace,
    }
}

static LOGGER_INSTANCE: OnceLock<Arc<dyn Logger>> = OnceLock::new();

/// Sets the global logger.
///
/// Only the first call has an effect; later calls print a notice and return.
#[uniffi::export]
pub fn set_logger(logger: Arc<dyn Logger>) {
    if LOGGER_INSTANCE.set(logger).is_err() {
        println!("Logger already set");
    }

    if let Err(e) = init_logger() {
        eprintln!("Failed to set logger: {e}");
    }
}

fn init_logger() -> Result<(), log::SetLoggerError> {
    static LOGGER: ForeignLogger = ForeignLogger;
    log::set_logger(&LOGGER)?;
    log::set_max_level(log::LevelFilter::Trace);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbose_records_from_dependencies_are_dropped() {
        assert!(!should_forward(Some("tokio::runtime"), log::Level::Debug));
        assert!(!should_forward(None, log::Level::Trace));
        assert!(should_forward(Some("mfkit_core::auth"), log::Level::Debug));
        assert!(should_forward(Some("tokio::runtime"), log::Level::Warn));
    }

    #[test]
    fn test_level_mapping() {
        assert_eq!(log_level(log::Level::Warn), LogLevel::Warn);
        assert_eq!(log_level(log::Level::Trace), LogLevel::Trace);
    }
}
