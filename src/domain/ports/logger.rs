use serde_json::Value;

/// Log level enumeration for structured logging
///
/// Levels are ordered from most verbose (Trace) to most severe (Error).
///
/// # Examples
///
/// ```
/// use tickwise::domain::ports::Level;
///
/// assert!(Level::Error > Level::Info);
/// assert!(Level::Trace < Level::Debug);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    /// Most verbose level - detailed trace information
    Trace,
    /// Debug information useful during development
    Debug,
    /// Informational messages about normal operations
    Info,
    /// Warning messages for potentially problematic situations
    Warn,
    /// Error messages for failure conditions
    Error,
}

impl Level {
    /// Returns the string representation of the log level
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "TRACE",
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warn => "WARN",
            Self::Error => "ERROR",
        }
    }
}

/// Port trait for structured logging from inside the kernel
///
/// The kernel never talks to a logging backend directly; the host injects
/// an implementation. Every message carries a structured `context` value
/// (usually a JSON object built with `serde_json::json!`) with fields such
/// as `process_id`, `epoch`, `cpu` or `error`.
///
/// Calls are synchronous: the kernel is single-threaded and logging happens
/// between process invocations.
///
/// # Examples
///
/// ```
/// use tickwise::domain::ports::Logger;
/// use serde_json::json;
///
/// fn report(logger: &dyn Logger, id: &str, epoch: u64) {
///     logger.warn("process suspended", json!({ "process_id": id, "epoch": epoch }));
/// }
/// ```
pub trait Logger: Send + Sync {
    /// Log a message with a specific level and structured context
    fn log(&self, level: Level, message: &str, context: Value);

    fn trace(&self, message: &str, context: Value) {
        self.log(Level::Trace, message, context);
    }

    fn debug(&self, message: &str, context: Value) {
        self.log(Level::Debug, message, context);
    }

    fn info(&self, message: &str, context: Value) {
        self.log(Level::Info, message, context);
    }

    fn warn(&self, message: &str, context: Value) {
        self.log(Level::Warn, message, context);
    }

    fn error(&self, message: &str, context: Value) {
        self.log(Level::Error, message, context);
    }
}
