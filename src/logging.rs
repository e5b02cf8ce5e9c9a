//! Structured logging for the diagnostic engine
//!
//! This module provides:
//! - Structured log entries with levels, fields and correlation IDs
//! - Console and JSON output formats
//! - A probe-oriented logger that records each stage of a diagnostic run
//!
//! Everything is written to stderr so that reports on stdout stay parseable.

use crate::diagnostics::Diagnosis;
use crate::error::{AppError, Result};
use crate::models::{Config, ProbeOutcome, ProbeSummary};
use crate::types::{ProbeMethod, ResolutionError, ResolvedAddress};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// Log level enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LogLevel {
    /// Trace level - most detailed
    Trace = 0,
    /// Debug level - detailed information for debugging
    Debug = 1,
    /// Info level - general application information
    Info = 2,
    /// Warning level - potentially harmful situations
    Warn = 3,
    /// Error level - error events but application can continue
    Error = 4,
    /// Fatal level - the invocation is aborted
    Fatal = 5,
}

impl LogLevel {
    /// Get log level name as string
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "TRACE",
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
            LogLevel::Fatal => "FATAL",
        }
    }

    /// Colorize the level name for console output
    fn colorize(&self, text: &str) -> String {
        use colored::Colorize;
        match self {
            LogLevel::Trace => text.white().to_string(),
            LogLevel::Debug => text.cyan().to_string(),
            LogLevel::Info => text.green().to_string(),
            LogLevel::Warn => text.yellow().to_string(),
            LogLevel::Error => text.red().to_string(),
            LogLevel::Fatal => text.magenta().bold().to_string(),
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_uppercase().as_str() {
            "TRACE" => Ok(LogLevel::Trace),
            "DEBUG" => Ok(LogLevel::Debug),
            "INFO" => Ok(LogLevel::Info),
            "WARN" | "WARNING" => Ok(LogLevel::Warn),
            "ERROR" => Ok(LogLevel::Error),
            "FATAL" => Ok(LogLevel::Fatal),
            _ => Err(AppError::parse(format!("Invalid log level: {}", s))),
        }
    }
}

/// Log entry structure for structured logging
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    /// Timestamp when log entry was created
    pub timestamp: DateTime<Utc>,
    /// Log level
    pub level: LogLevel,
    /// Log message
    pub message: String,
    /// Logger name/component
    pub logger: String,
    /// Correlation ID tying together the entries of one diagnostic run
    pub correlation_id: Option<String>,
    /// Additional structured fields, ordered for stable output
    pub fields: BTreeMap<String, serde_json::Value>,
    /// Source location, when recorded through the logging macros
    pub location: Option<LogLocation>,
}

/// Source code location information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogLocation {
    pub file: String,
    pub line: u32,
    pub module: Option<String>,
}

/// Log output format options
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LogFormat {
    /// Human-readable console format
    Console,
    /// JSON lines for log aggregators
    Json,
}

/// Correlation state shared by clones of one logger
#[derive(Debug, Default)]
struct LogContext {
    current_correlation_id: Option<String>,
}

/// Logger with configurable level and format
#[derive(Clone)]
pub struct Logger {
    min_level: LogLevel,
    use_color: bool,
    include_location: bool,
    format: LogFormat,
    name: String,
    context: Arc<RwLock<LogContext>>,
}

impl Logger {
    /// Create a new logger
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            min_level: LogLevel::Info,
            use_color: true,
            include_location: false,
            format: LogFormat::Console,
            name: name.into(),
            context: Arc::new(RwLock::new(LogContext::default())),
        }
    }

    /// Create a logger from application configuration.
    ///
    /// debug selects Debug level with JSON output, verbose selects Info,
    /// otherwise only warnings and errors are written.
    pub fn with_config(name: impl Into<String>, config: &Config) -> Self {
        let min_level = if config.debug {
            LogLevel::Debug
        } else if config.verbose {
            LogLevel::Info
        } else {
            LogLevel::Warn
        };

        Self {
            min_level,
            use_color: config.enable_color,
            include_location: config.debug,
            format: if config.debug { LogFormat::Json } else { LogFormat::Console },
            name: name.into(),
            context: Arc::new(RwLock::new(LogContext::default())),
        }
    }

    /// Logger that drops everything below Fatal
    pub fn quiet(name: impl Into<String>) -> Self {
        let mut logger = Self::new(name);
        logger.min_level = LogLevel::Fatal;
        logger.use_color = false;
        logger
    }

    pub fn level(&self) -> LogLevel {
        self.min_level
    }

    /// Start a correlated operation; entries logged without an explicit
    /// correlation ID pick up this one until the operation ends
    pub async fn start_operation(&self, operation_name: &str, correlation_id: &str) {
        {
            let mut context = self.context.write().await;
            context.current_correlation_id = Some(correlation_id.to_string());
        }

        self.debug(&format!("Started operation: {}", operation_name))
            .correlation_id(correlation_id)
            .field("operation", operation_name)
            .field("operation_type", "start")
            .log()
            .await;
    }

    /// End a correlated operation
    pub async fn end_operation(&self, correlation_id: &str, operation_name: &str, success: bool) {
        self.debug(&format!("Completed operation: {} (success: {})", operation_name, success))
            .correlation_id(correlation_id)
            .field("operation", operation_name)
            .field("operation_type", "end")
            .field("success", success)
            .log()
            .await;

        let mut context = self.context.write().await;
        if context.current_correlation_id.as_deref() == Some(correlation_id) {
            context.current_correlation_id = None;
        }
    }

    /// Correlation ID of the operation in progress, if any
    pub async fn current_correlation_id(&self) -> Option<String> {
        self.context.read().await.current_correlation_id.clone()
    }

    /// Create a log entry builder
    pub fn log(&self, level: LogLevel, message: &str) -> LogEntryBuilder<'_> {
        LogEntryBuilder::new(self, level, message.to_string())
    }

    pub fn debug(&self, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Debug, message)
    }

    pub fn info(&self, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Info, message)
    }

    pub fn warn(&self, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Warn, message)
    }

    pub fn error(&self, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Error, message)
    }

    /// Check if a log level would be output
    pub fn would_log(&self, level: LogLevel) -> bool {
        level >= self.min_level
    }

    async fn write_entry(&self, mut entry: LogEntry) {
        if !self.would_log(entry.level) {
            return;
        }

        if entry.correlation_id.is_none() {
            entry.correlation_id = self.current_correlation_id().await;
        }

        let output = self.render(&entry);
        let _ = writeln!(io::stderr().lock(), "{}", output);
    }

    fn render(&self, entry: &LogEntry) -> String {
        match self.format {
            LogFormat::Console => self.format_console(entry),
            LogFormat::Json => self.format_json(entry),
        }
    }

    fn format_console(&self, entry: &LogEntry) -> String {
        let timestamp = entry.timestamp.format("%Y-%m-%d %H:%M:%S%.3f");
        let level = format!("{:>5}", entry.level.as_str());
        let level = if self.use_color { entry.level.colorize(&level) } else { level };

        let mut output = format!("{} {} [{}] {}", timestamp, level, entry.logger, entry.message);

        if let Some(correlation_id) = &entry.correlation_id {
            let short: String = correlation_id.chars().take(8).collect();
            output.push_str(&format!(" [{}]", short));
        }

        if !entry.fields.is_empty() {
            let fields: Vec<String> = entry.fields.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
            output.push_str(&format!(" {{{}}}", fields.join(", ")));
        }

        if self.include_location {
            if let Some(location) = &entry.location {
                output.push_str(&format!(" @ {}:{}", location.file, location.line));
            }
        }

        output
    }

    fn format_json(&self, entry: &LogEntry) -> String {
        serde_json::to_string(entry).unwrap_or_else(|_| {
            serde_json::json!({ "error": "failed to serialize log entry", "message": entry.message }).to_string()
        })
    }
}

/// Builder for log entries
pub struct LogEntryBuilder<'a> {
    logger: &'a Logger,
    entry: LogEntry,
}

impl<'a> LogEntryBuilder<'a> {
    fn new(logger: &'a Logger, level: LogLevel, message: String) -> Self {
        Self {
            logger,
            entry: LogEntry {
                timestamp: Utc::now(),
                level,
                message,
                logger: logger.name.clone(),
                correlation_id: None,
                fields: BTreeMap::new(),
                location: None,
            },
        }
    }

    pub fn correlation_id(mut self, id: &str) -> Self {
        self.entry.correlation_id = Some(id.to_string());
        self
    }

    /// Add a structured field
    pub fn field<T: Serialize>(mut self, key: &str, value: T) -> Self {
        if let Ok(json_value) = serde_json::to_value(value) {
            self.entry.fields.insert(key.to_string(), json_value);
        }
        self
    }

    pub fn location(mut self, file: &str, line: u32, module: Option<&str>) -> Self {
        self.entry.location = Some(LogLocation {
            file: file.to_string(),
            line,
            module: module.map(String::from),
        });
        self
    }

    /// Add the fields of a single probe outcome
    pub fn outcome(self, outcome: &ProbeOutcome) -> Self {
        self.field("sequence", outcome.sequence)
            .field("kind", outcome.kind.as_str())
            .field("latency_ms", outcome.latency_ms())
            .field("detail", outcome.detail.as_deref())
    }

    /// Add the fields of a batch summary
    pub fn summary(self, summary: &ProbeSummary) -> Self {
        self.field("attempted", summary.attempted)
            .field("succeeded", summary.succeeded)
            .field("loss_ratio", summary.loss_ratio)
            .field("avg_ms", summary.latency.map(|l| l.avg_ms()))
    }

    /// Add error information
    pub fn error_info(self, error: &AppError) -> Self {
        self.field("error_category", error.category())
            .field("error_fatal", error.is_fatal())
            .field("error_exit_code", error.exit_code())
    }

    /// Finalize and write the log entry
    pub async fn log(self) {
        self.logger.write_entry(self.entry).await;
    }
}

/// Logger for the stages of a diagnostic run
#[derive(Clone)]
pub struct ProbeLogger {
    logger: Logger,
}

impl ProbeLogger {
    pub fn new(config: &Config) -> Self {
        Self { logger: Logger::with_config("PROBE", config) }
    }

    /// Silent logger for library callers that did not configure one
    pub fn quiet() -> Self {
        Self { logger: Logger::quiet("PROBE") }
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    /// Log the outcome of name resolution
    pub async fn log_resolution(
        &self,
        target: &str,
        resolver: &str,
        result: &std::result::Result<Vec<ResolvedAddress>, ResolutionError>,
        elapsed: Duration,
        correlation_id: &str,
    ) {
        let elapsed_ms = elapsed.as_secs_f64() * 1000.0;
        match result {
            Ok(addresses) => {
                let rendered: Vec<String> = addresses.iter().map(|a| a.ip.to_string()).collect();
                self.logger
                    .debug(&format!("Resolved {} via {} to {} address(es)", target, resolver, addresses.len()))
                    .correlation_id(correlation_id)
                    .field("target", target)
                    .field("resolver", resolver)
                    .field("addresses", rendered)
                    .field("duration_ms", elapsed_ms)
                    .log()
                    .await;
            }
            Err(error) => {
                self.logger
                    .warn(&format!("Resolution of {} via {} failed: {}", target, resolver, error))
                    .correlation_id(correlation_id)
                    .field("target", target)
                    .field("resolver", resolver)
                    .field("error_kind", error.kind())
                    .field("duration_ms", elapsed_ms)
                    .log()
                    .await;
            }
        }
    }

    /// Log one probe outcome
    pub async fn log_probe_outcome(
        &self,
        address: &ResolvedAddress,
        method: ProbeMethod,
        outcome: &ProbeOutcome,
        correlation_id: &str,
    ) {
        let level = if outcome.is_success() { LogLevel::Trace } else { LogLevel::Debug };
        self.logger
            .log(level, &format!("{} probe #{} to {}: {}", method, outcome.sequence, address, outcome.kind))
            .correlation_id(correlation_id)
            .field("address", address.to_string())
            .field("method", method.as_str())
            .outcome(outcome)
            .log()
            .await;
    }

    /// Log the summary of one probe batch
    pub async fn log_batch(
        &self,
        address: &ResolvedAddress,
        method: ProbeMethod,
        summary: &ProbeSummary,
        correlation_id: &str,
    ) {
        self.logger
            .info(&format!(
                "{} batch to {}: {}/{} replies, {:.1}% loss",
                method,
                address,
                summary.succeeded,
                summary.attempted,
                summary.loss_percent()
            ))
            .correlation_id(correlation_id)
            .field("address", address.to_string())
            .field("method", method.as_str())
            .summary(summary)
            .log()
            .await;
    }

    /// Log a switch from ICMP to TCP probing
    pub async fn log_fallback(&self, address: &ResolvedAddress, reason: &str, correlation_id: &str) {
        self.logger
            .warn(&format!("ICMP probing unavailable for {}, falling back to TCP", address))
            .correlation_id(correlation_id)
            .field("address", address.to_string())
            .field("reason", reason)
            .log()
            .await;
    }

    /// Log the final diagnosis
    pub async fn log_diagnosis(&self, target: &str, diagnosis: &Diagnosis, correlation_id: &str) {
        self.logger
            .info(&format!("Diagnosis for {}: {}", target, diagnosis.class))
            .correlation_id(correlation_id)
            .field("target", target)
            .field("class", diagnosis.class)
            .log()
            .await;
    }

    /// Log an application error with context
    pub async fn log_error(&self, error: &AppError, context: Option<&str>, correlation_id: Option<&str>) {
        let message = match context {
            Some(ctx) => format!("{}: {}", ctx, error),
            None => error.to_string(),
        };

        let level = if error.is_fatal() { LogLevel::Fatal } else { LogLevel::Error };
        let mut builder = self.logger.log(level, &message).error_info(error);

        if let Some(id) = correlation_id {
            builder = builder.correlation_id(id);
        }
        if let Some(ctx) = context {
            builder = builder.field("context", ctx);
        }

        builder.log().await;
    }
}

/// Convenience macros for logging with location information
#[macro_export]
macro_rules! log_debug {
    ($logger:expr, $($arg:tt)*) => {
        $logger.debug(&format!($($arg)*))
            .location(file!(), line!(), Some(module_path!()))
            .log()
            .await
    };
}

#[macro_export]
macro_rules! log_info {
    ($logger:expr, $($arg:tt)*) => {
        $logger.info(&format!($($arg)*))
            .location(file!(), line!(), Some(module_path!()))
            .log()
            .await
    };
}

#[macro_export]
macro_rules! log_warn {
    ($logger:expr, $($arg:tt)*) => {
        $logger.warn(&format!($($arg)*))
            .location(file!(), line!(), Some(module_path!()))
            .log()
            .await
    };
}
