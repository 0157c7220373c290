//! Instrumentation records and the logger they are delivered to.

use std::fmt;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

use crate::context::Context;
use crate::error::{Error, Result};
use crate::value::NamedValue;

/// One event per intercepted driver operation.
#[derive(Debug, Clone)]
pub struct Record {
    /// SQL text as prepared.
    pub query: String,
    /// Parameters as passed to the driver call; names are empty for positional ones.
    pub args: Vec<NamedValue>,
    /// `true` for executions, `false` for queries.
    pub effect: bool,
    /// `true` when the event comes from a failed preparation.
    pub preparing: bool,
    pub err: Option<Error>,
    /// When the call started.
    pub at: DateTime<Utc>,
    pub elapsed: Duration,
}

impl Record {
    pub(crate) fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            args: Vec::new(),
            effect: false,
            preparing: false,
            err: None,
            at: Utc::now(),
            elapsed: Duration::ZERO,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.err.is_none()
    }
}

/// Receives every [`Record`], synchronously, on the caller's task.
///
/// A slow logger slows down every database call that goes through the proxy.
pub trait Logger: Send + Sync {
    fn log(&self, ctx: &Context, record: Record);
}

/// A [`Logger`] backed by a plain callback, see [`from_fn`].
pub struct FnLogger<F>(F);

impl<F> fmt::Debug for FnLogger<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FnLogger")
    }
}

impl<F> Logger for FnLogger<F>
where
    F: Fn(&Context, Record) + Send + Sync,
{
    fn log(&self, ctx: &Context, record: Record) {
        (self.0)(ctx, record)
    }
}

/// Use a closure as a [`Logger`].
///
/// ```rust
/// use std::sync::Arc;
/// use sqllog::{from_fn, Logger};
///
/// let logger: Arc<dyn Logger> = Arc::new(from_fn(|_ctx, record| {
///     println!("{} took {:?}", record.query, record.elapsed);
/// }));
/// ```
pub fn from_fn<F>(f: F) -> FnLogger<F>
where
    F: Fn(&Context, Record) + Send + Sync,
{
    FnLogger(f)
}

/// A record for a call in flight.
///
/// Delivered at most once: by [`PendingRecord::complete`], or from `Drop` with
/// [`Error::Incomplete`] if the call never got that far. A record that
/// should only exist on failure is dropped with [`PendingRecord::disarm`].
pub(crate) struct PendingRecord<'a> {
    record: Option<Record>,
    started: Instant,
    ctx: &'a Context,
    logger: &'a dyn Logger,
}

impl<'a> PendingRecord<'a> {
    pub(crate) fn begin(mut record: Record, ctx: &'a Context, logger: &'a dyn Logger) -> Self {
        record.at = Utc::now();
        Self {
            record: Some(record),
            started: Instant::now(),
            ctx,
            logger,
        }
    }

    /// Attach the outcome and deliver.
    pub(crate) fn complete<T>(mut self, result: &Result<T>) {
        if let Some(record) = self.record.as_mut() {
            record.err = result.as_ref().err().cloned();
        }
        self.emit();
    }

    /// The call succeeded and reports nothing.
    pub(crate) fn disarm(mut self) {
        self.record = None;
    }

    fn emit(&mut self) {
        if let Some(mut record) = self.record.take() {
            record.elapsed = self.started.elapsed();
            self.logger.log(self.ctx, record);
        }
    }
}

impl Drop for PendingRecord<'_> {
    fn drop(&mut self) {
        if let Some(record) = self.record.as_mut() {
            record.err.get_or_insert(Error::Incomplete);
        }
        self.emit();
    }
}
