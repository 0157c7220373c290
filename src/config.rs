//! Configuration for the tracing logger.

use std::time::Duration;

use tracing::Level;

/// Which records [`TracingLogger`](crate::TracingLogger) turns into events,
/// at what level, and with how much detail.
///
/// Failed calls are always logged at ERROR and slow calls at WARN. The
/// settings below only shape everything else.
///
/// # Example
///
/// ```rust
/// use sqllog::TracingConfig;
/// use std::time::Duration;
/// use tracing::Level;
///
/// let config = TracingConfig::default()
///     .with_statement_logging(true)
///     .with_success_level(Level::TRACE)
///     .with_slow_query_threshold(Duration::from_millis(100));
/// ```
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Put the SQL text into `db.statement`. Off by default.
    pub log_statements: bool,

    /// Put the bound arguments into `db.params`. Off by default.
    pub log_parameters: bool,

    /// Emit events for successful queries. Executions, failures and slow
    /// calls are emitted regardless. On by default.
    pub log_queries: bool,

    /// Level for successful calls under the slow threshold. Default: DEBUG
    pub success_level: Level,

    /// Default: 500ms
    pub slow_query_threshold: Duration,

    /// `db.statement` is cut to this many characters, with a trailing `...`.
    /// Default: 2048
    pub max_statement_len: Option<usize>,

    /// Added to every event as `db.name`.
    pub database_name: Option<String>,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            log_statements: false,
            log_parameters: false,
            log_queries: true,
            success_level: Level::DEBUG,
            slow_query_threshold: Duration::from_millis(500),
            max_statement_len: Some(2048),
            database_name: None,
        }
    }
}

impl TracingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// SQL written with inline literals puts those literals in the logs.
    pub fn with_statement_logging(mut self, enabled: bool) -> Self {
        self.log_statements = enabled;
        self
    }

    /// Arguments usually carry user input; keep this off outside development.
    pub fn with_parameter_logging(mut self, enabled: bool) -> Self {
        self.log_parameters = enabled;
        self
    }

    pub fn with_query_logging(mut self, enabled: bool) -> Self {
        self.log_queries = enabled;
        self
    }

    pub fn with_success_level(mut self, level: Level) -> Self {
        self.success_level = level;
        self
    }

    pub fn with_slow_query_threshold(mut self, threshold: Duration) -> Self {
        self.slow_query_threshold = threshold;
        self
    }

    /// `None` keeps statements whole.
    pub fn with_max_statement_len(mut self, len: Option<usize>) -> Self {
        self.max_statement_len = len;
        self
    }

    pub fn with_database_name(mut self, name: impl Into<String>) -> Self {
        self.database_name = Some(name.into());
        self
    }

    /// SQL text and arguments included, nothing truncated, 100ms slow
    /// threshold.
    pub fn development() -> Self {
        Self {
            log_statements: true,
            log_parameters: true,
            slow_query_threshold: Duration::from_millis(100),
            max_statement_len: None,
            ..Self::default()
        }
    }

    /// Only executions, failures and calls over one second.
    pub fn production() -> Self {
        Self {
            log_queries: false,
            slow_query_threshold: Duration::from_secs(1),
            ..Self::default()
        }
    }

    /// Whether a successful record is worth an event at all.
    pub(crate) fn wants(&self, effect: bool, slow: bool) -> bool {
        self.log_queries || effect || slow
    }

    /// `query` as it should appear in `db.statement`.
    pub(crate) fn statement<'a>(&self, query: &'a str) -> Option<std::borrow::Cow<'a, str>> {
        if !self.log_statements {
            return None;
        }
        match self.max_statement_len {
            Some(max) if query.chars().count() > max => {
                let cut: String = query.chars().take(max).collect();
                Some(format!("{cut}...").into())
            }
            _ => Some(query.into()),
        }
    }
}
