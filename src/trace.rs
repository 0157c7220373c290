//! A [`Logger`] that turns records into `tracing` events.

use std::sync::Arc;

use tracing::Level;

use crate::config::TracingConfig;
use crate::context::Context;
use crate::parser::ParsedSql;
use crate::record::{Logger, Record};

/// Emits one `tracing` event per [`Record`], parented to the span carried by
/// the call's [`Context`].
///
/// Field names follow the OpenTelemetry database conventions:
///
/// | Field | Description |
/// |-------|-------------|
/// | `db.operation` | Leading SQL verb (SELECT, INSERT, ...) |
/// | `db.sql.table` | Target table, when detectable |
/// | `db.statement` | SQL text (opt-in) |
/// | `db.params` | Bound parameters (opt-in) |
/// | `db.name` | Configured database name |
/// | `db.effect` | Execution rather than query |
/// | `db.preparing` | Failed during preparation |
/// | `db.duration_ms` | Elapsed time |
/// | `otel.status_code` | "OK" or "ERROR" |
/// | `error.message` | Error details (on failure) |
/// | `slow_query` | Over the configured threshold |
///
/// Failures are logged at ERROR and slow calls at WARN. Everything else goes
/// out at [`TracingConfig::success_level`], and successful queries can be
/// left out entirely with [`TracingConfig::with_query_logging`].
#[derive(Debug, Clone, Default)]
pub struct TracingLogger {
    config: Arc<TracingConfig>,
}

impl TracingLogger {
    pub fn new(config: TracingConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &TracingConfig {
        &self.config
    }

    fn level(&self, record: &Record) -> Level {
        if !record.is_ok() {
            Level::ERROR
        } else if record.elapsed > self.config.slow_query_threshold {
            Level::WARN
        } else {
            self.config.success_level
        }
    }

    fn params(&self, record: &Record) -> Option<String> {
        if !self.config.log_parameters {
            return None;
        }
        let rendered: Vec<String> = record
            .args
            .iter()
            .map(|arg| {
                if arg.is_named() {
                    format!("{}={}", arg.name, arg.value)
                } else {
                    arg.value.to_string()
                }
            })
            .collect();
        Some(format!("[{}]", rendered.join(", ")))
    }
}

fn describe(record: &Record) -> &'static str {
    match (&record.err, record.preparing, record.effect) {
        (Some(_), true, _) => "Statement preparation failed",
        (Some(_), false, _) => "Database query failed",
        (None, _, true) => "Database execution completed",
        (None, _, false) => "Database query completed",
    }
}

impl Logger for TracingLogger {
    fn log(&self, ctx: &Context, record: Record) {
        let slow = record.elapsed > self.config.slow_query_threshold;
        if record.is_ok() && !self.config.wants(record.effect, slow) {
            return;
        }

        let parsed = ParsedSql::parse(&record.query);
        let summary = parsed.summary();
        let statement = self.config.statement(&record.query);
        let params = self.params(&record);
        let db_name = self.config.database_name.as_deref();
        let duration_ms = record.elapsed.as_millis() as u64;
        let status = if record.is_ok() { "OK" } else { "ERROR" };
        let error = record.err.as_ref().map(ToString::to_string);
        let message = describe(&record);

        // event! needs a constant level per callsite
        macro_rules! emit {
            ($level:expr) => {
                tracing::event!(
                    parent: ctx.span(),
                    $level,
                    otel.name = %summary,
                    db.operation = %parsed.operation,
                    db.sql.table = parsed.table.as_deref(),
                    db.statement = statement.as_deref(),
                    db.params = params.as_deref(),
                    db.name = db_name,
                    db.effect = record.effect,
                    db.preparing = record.preparing,
                    db.duration_ms = duration_ms,
                    otel.status_code = status,
                    error.message = error.as_deref(),
                    slow_query = slow,
                    "{}",
                    message
                )
            };
        }

        match self.level(&record) {
            Level::ERROR => emit!(Level::ERROR),
            Level::WARN => emit!(Level::WARN),
            Level::INFO => emit!(Level::INFO),
            Level::DEBUG => emit!(Level::DEBUG),
            _ => emit!(Level::TRACE),
        }
    }
}
