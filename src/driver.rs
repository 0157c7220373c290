//! The contract a database driver implements.
//!
//! Every driver provides the required traits ([`Driver`], [`Connection`],
//! [`Statement`], [`Rows`], [`Transaction`]). The context-aware variants
//! ([`PrepareContext`], [`QueryContext`], [`ExecContext`]) and [`Pinger`]
//! are optional: a driver opts in by returning `Some(self)` from the matching
//! `as_*` accessor. Callers look the capability up on every call and fall
//! back to the plain path when it is missing, see [`prepare_connection`],
//! [`query_statement`] and [`exec_statement`].

use std::sync::Arc;

use async_trait::async_trait;

use crate::context::Context;
use crate::convert::named_values_to_values;
use crate::error::Result;
use crate::value::{NamedValue, Value};

/// Outcome of a statement that does not return rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecResult {
    pub rows_affected: u64,
    pub last_insert_id: Option<i64>,
}

/// Opens physical connections from a data source string.
#[async_trait]
pub trait Driver: Send + Sync {
    async fn open(&self, dsn: &str) -> Result<Box<dyn Connection>>;
}

/// Produces connections for a pool, bound to one data source.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, ctx: &Context) -> Result<Box<dyn Connection>>;

    /// The driver behind this connector.
    fn driver(&self) -> Arc<dyn Driver>;
}

/// Connector that simply calls [`Driver::open`] with a fixed data source.
pub struct DsnConnector {
    driver: Arc<dyn Driver>,
    dsn: String,
}

impl DsnConnector {
    pub fn new(driver: Arc<dyn Driver>, dsn: impl Into<String>) -> Self {
        Self {
            driver,
            dsn: dsn.into(),
        }
    }
}

#[async_trait]
impl Connector for DsnConnector {
    async fn connect(&self, _ctx: &Context) -> Result<Box<dyn Connection>> {
        self.driver.open(&self.dsn).await
    }

    fn driver(&self) -> Arc<dyn Driver> {
        Arc::clone(&self.driver)
    }
}

/// A live connection. Used by one task at a time.
#[async_trait]
pub trait Connection: Send {
    async fn prepare(&mut self, query: &str) -> Result<Box<dyn Statement>>;

    async fn begin(&mut self) -> Result<Box<dyn Transaction>>;

    async fn close(&mut self) -> Result<()>;

    fn as_prepare_context(&mut self) -> Option<&mut dyn PrepareContext> {
        None
    }

    fn as_pinger(&mut self) -> Option<&mut dyn Pinger> {
        None
    }
}

/// Optional: preparation that honours a [`Context`].
#[async_trait]
pub trait PrepareContext: Send {
    async fn prepare_context(&mut self, ctx: &Context, query: &str) -> Result<Box<dyn Statement>>;
}

/// Optional: connection liveness check.
#[async_trait]
pub trait Pinger: Send {
    async fn ping(&mut self, ctx: &Context) -> Result<()>;
}

/// A prepared statement, owned exclusively by whoever prepared it.
#[async_trait]
pub trait Statement: Send {
    /// Number of placeholders, if the driver knows it.
    fn num_input(&self) -> Option<usize> {
        None
    }

    async fn query(&mut self, args: Vec<Value>) -> Result<Box<dyn Rows>>;

    async fn exec(&mut self, args: Vec<Value>) -> Result<ExecResult>;

    async fn close(&mut self) -> Result<()>;

    fn as_query_context(&mut self) -> Option<&mut dyn QueryContext> {
        None
    }

    fn as_exec_context(&mut self) -> Option<&mut dyn ExecContext> {
        None
    }
}

/// Optional: queries with named parameters and a [`Context`].
#[async_trait]
pub trait QueryContext: Send {
    async fn query_context(&mut self, ctx: &Context, args: &[NamedValue]) -> Result<Box<dyn Rows>>;
}

/// Optional: executions with named parameters and a [`Context`].
#[async_trait]
pub trait ExecContext: Send {
    async fn exec_context(&mut self, ctx: &Context, args: &[NamedValue]) -> Result<ExecResult>;
}

/// A result set cursor.
#[async_trait]
pub trait Rows: Send {
    fn columns(&self) -> &[String];

    /// The next row, or `None` once the set is exhausted.
    async fn next(&mut self) -> Result<Option<Vec<Value>>>;

    async fn close(&mut self) -> Result<()>;
}

#[async_trait]
pub trait Transaction: Send {
    async fn commit(self: Box<Self>) -> Result<()>;

    async fn rollback(self: Box<Self>) -> Result<()>;
}

/// Prepare through [`PrepareContext`] when the connection has it, else [`Connection::prepare`].
pub async fn prepare_connection(
    conn: &mut dyn Connection,
    ctx: &Context,
    query: &str,
) -> Result<Box<dyn Statement>> {
    match conn.as_prepare_context() {
        Some(conn) => conn.prepare_context(ctx, query).await,
        None => conn.prepare(query).await,
    }
}

/// Query through [`QueryContext`] when available, else convert the
/// parameters and use [`Statement::query`].
///
/// A conversion failure is returned before the statement is touched.
pub async fn query_statement(
    stmt: &mut dyn Statement,
    ctx: &Context,
    args: &[NamedValue],
) -> Result<Box<dyn Rows>> {
    match stmt.as_query_context() {
        Some(stmt) => stmt.query_context(ctx, args).await,
        None => {
            let values = named_values_to_values(args)?;
            stmt.query(values).await
        }
    }
}

/// Execute through [`ExecContext`] when available, else convert the
/// parameters and use [`Statement::exec`].
pub async fn exec_statement(
    stmt: &mut dyn Statement,
    ctx: &Context,
    args: &[NamedValue],
) -> Result<ExecResult> {
    match stmt.as_exec_context() {
        Some(stmt) => stmt.exec_context(ctx, args).await,
        None => {
            let values = named_values_to_values(args)?;
            stmt.exec(values).await
        }
    }
}
