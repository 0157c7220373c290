//! Pooled database handle.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::Notify;

use crate::context::Context;
use crate::driver::{
    self, Connection, Connector, Driver, DsnConnector, ExecResult, Statement, Transaction,
};
use crate::error::{Error, Result};
use crate::registry;
use crate::value::{to_named_values, Arg, NamedValue, Value};

const DEFAULT_MAX_IDLE: usize = 2;

/// A handle to a database, backed by a pool of driver connections.
///
/// Cheap to clone; clones share the pool. Every operation takes a
/// [`Context`] and runs on the caller's task.
///
/// # Example
///
/// ```rust,ignore
/// use sqllog::{args, Context, Database};
///
/// let db = Database::open("mysql", "root@tcp(127.0.0.1:3306)/test")?;
/// db.set_max_open_conns(25);
///
/// let ctx = Context::background();
/// let mut rows = db.query(&ctx, "select str from test where id = ?", &args![1]).await?;
/// while let Some(row) = rows.next().await? {
///     println!("{row:?}");
/// }
/// ```
#[derive(Clone)]
pub struct Database {
    inner: Arc<Pool>,
}

struct Pool {
    connector: Arc<dyn Connector>,
    idle: Mutex<Vec<Box<dyn Connection>>>,
    open: AtomicUsize,
    max_open: AtomicUsize,
    max_idle: AtomicUsize,
    closed: AtomicBool,
    released: Notify,
}

/// Snapshot of pool usage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DbStats {
    /// 0 means unlimited.
    pub max_open: usize,
    pub open: usize,
    pub in_use: usize,
    pub idle: usize,
}

impl Database {
    /// Open a handle on a registered driver. No connection is made until
    /// one is needed.
    pub fn open(driver_name: &str, dsn: &str) -> Result<Self> {
        let driver = registry::lookup(driver_name)?;
        Ok(Self::from_connector(Arc::new(DsnConnector::new(driver, dsn))))
    }

    /// Open a handle that obtains its connections from `connector`.
    pub fn from_connector(connector: Arc<dyn Connector>) -> Self {
        Self {
            inner: Arc::new(Pool {
                connector,
                idle: Mutex::new(Vec::new()),
                open: AtomicUsize::new(0),
                max_open: AtomicUsize::new(0),
                max_idle: AtomicUsize::new(DEFAULT_MAX_IDLE),
                closed: AtomicBool::new(false),
                released: Notify::new(),
            }),
        }
    }

    /// The driver connections come from.
    pub fn driver(&self) -> Arc<dyn Driver> {
        self.inner.connector.driver()
    }

    /// Limit the number of open connections. 0 removes the limit.
    pub fn set_max_open_conns(&self, n: usize) {
        self.inner.max_open.store(n, Ordering::Release);
        if n > 0 && self.inner.max_idle.load(Ordering::Acquire) > n {
            self.set_max_idle_conns(n);
        }
        self.inner.released.notify_waiters();
    }

    /// Limit the number of idle connections kept for reuse.
    pub fn set_max_idle_conns(&self, n: usize) {
        let max_open = self.inner.max_open.load(Ordering::Acquire);
        let n = if max_open > 0 { n.min(max_open) } else { n };
        self.inner.max_idle.store(n, Ordering::Release);

        let excess: Vec<_> = {
            let mut idle = self.inner.lock_idle();
            let keep = idle.len().min(n);
            idle.drain(keep..).collect()
        };
        if !excess.is_empty() {
            tracing::debug!(dropped = excess.len(), "trimmed idle connections");
            self.inner.open.fetch_sub(excess.len(), Ordering::AcqRel);
            self.inner.released.notify_waiters();
        }
    }

    pub fn stats(&self) -> DbStats {
        let open = self.inner.open.load(Ordering::Acquire);
        let idle = self.inner.lock_idle().len();
        DbStats {
            max_open: self.inner.max_open.load(Ordering::Acquire),
            open,
            in_use: open.saturating_sub(idle),
            idle,
        }
    }

    /// Check that a connection can be obtained and, if the driver supports
    /// it, that it is alive.
    pub async fn ping(&self, ctx: &Context) -> Result<()> {
        let mut conn = self.conn(ctx).await?;
        let result = match conn.get()?.as_pinger() {
            Some(pinger) => pinger.ping(ctx).await,
            None => Ok(()),
        };
        conn.observe(&result);
        result
    }

    /// Run a statement that returns rows.
    pub async fn query(&self, ctx: &Context, sql: &str, args: &[Arg]) -> Result<Rows> {
        let mut conn = self.conn(ctx).await?;
        let (stmt, rows) = query_on(&mut conn, ctx, sql, &to_named_values(args)).await?;
        Ok(Rows::new(rows, Some(stmt), Some(conn)))
    }

    /// Run a statement that does not return rows.
    pub async fn exec(&self, ctx: &Context, sql: &str, args: &[Arg]) -> Result<ExecResult> {
        let mut conn = self.conn(ctx).await?;
        exec_on(&mut conn, ctx, sql, &to_named_values(args)).await
    }

    /// Prepare a statement for repeated use. The statement keeps its
    /// connection until it is closed or dropped.
    pub async fn prepare(&self, ctx: &Context, sql: &str) -> Result<Prepared> {
        let mut conn = self.conn(ctx).await?;
        let stmt = conn.prepare(ctx, sql).await?;
        Ok(Prepared {
            sql: sql.to_string(),
            state: tokio::sync::Mutex::new(PreparedState {
                stmt: Some(stmt),
                conn,
            }),
        })
    }

    /// Start a transaction on a dedicated connection.
    pub async fn begin(&self, ctx: &Context) -> Result<Tx> {
        let mut conn = self.conn(ctx).await?;
        let result = conn.get()?.begin().await;
        conn.observe(&result);
        let tx = result?;
        Ok(Tx { conn, tx: Some(tx) })
    }

    /// Close idle connections and refuse new work. Connections in use are
    /// dropped when they are released.
    pub async fn close(&self) -> Result<()> {
        self.inner.closed.store(true, Ordering::Release);
        let idle = std::mem::take(&mut *self.inner.lock_idle());
        self.inner.open.fetch_sub(idle.len(), Ordering::AcqRel);
        self.inner.released.notify_waiters();

        let mut first_err = None;
        for mut conn in idle {
            if let Err(err) = conn.close().await {
                first_err.get_or_insert(err);
            }
        }
        first_err.map_or(Ok(()), Err)
    }

    async fn conn(&self, ctx: &Context) -> Result<PooledConn> {
        loop {
            if self.inner.closed.load(Ordering::Acquire) {
                return Err(Error::DatabaseClosed);
            }
            if let Some(err) = ctx.err() {
                return Err(err);
            }
            if let Some(conn) = self.inner.pop_idle() {
                return Ok(PooledConn::new(conn, Arc::clone(&self.inner)));
            }
            if let Some(slot) = Slot::reserve(&self.inner) {
                let conn = self.inner.connector.connect(ctx).await?;
                slot.keep();
                tracing::debug!(open = self.inner.open.load(Ordering::Acquire), "opened connection");
                return Ok(PooledConn::new(conn, Arc::clone(&self.inner)));
            }

            tracing::trace!("waiting for a free connection");
            tokio::select! {
                _ = self.inner.released.notified() => {}
                err = ctx.done() => return Err(err),
            }
        }
    }
}

impl fmt::Debug for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database").field("stats", &self.stats()).finish()
    }
}

impl Pool {
    fn lock_idle(&self) -> MutexGuard<'_, Vec<Box<dyn Connection>>> {
        self.idle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn pop_idle(&self) -> Option<Box<dyn Connection>> {
        self.lock_idle().pop()
    }

    fn release(&self, conn: Box<dyn Connection>, bad: bool) {
        if !bad && !self.closed.load(Ordering::Acquire) {
            let mut idle = self.lock_idle();
            if idle.len() < self.max_idle.load(Ordering::Acquire) {
                idle.push(conn);
                drop(idle);
                self.released.notify_one();
                return;
            }
        }

        tracing::debug!(bad, "discarding connection");
        drop(conn);
        self.open.fetch_sub(1, Ordering::AcqRel);
        self.released.notify_one();
    }
}

/// An open-connection slot taken before connecting; given back unless kept.
struct Slot<'a> {
    pool: &'a Pool,
    kept: bool,
}

impl<'a> Slot<'a> {
    fn reserve(pool: &'a Pool) -> Option<Self> {
        let max = pool.max_open.load(Ordering::Acquire);
        pool.open
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (max == 0 || n < max).then_some(n + 1)
            })
            .ok()
            .map(|_| Self { pool, kept: false })
    }

    fn keep(mut self) {
        self.kept = true;
    }
}

impl Drop for Slot<'_> {
    fn drop(&mut self) {
        if !self.kept {
            self.pool.open.fetch_sub(1, Ordering::AcqRel);
            self.pool.released.notify_one();
        }
    }
}

/// A connection checked out of the pool; goes back on drop.
struct PooledConn {
    conn: Option<Box<dyn Connection>>,
    pool: Arc<Pool>,
    bad: bool,
}

impl PooledConn {
    fn new(conn: Box<dyn Connection>, pool: Arc<Pool>) -> Self {
        Self {
            conn: Some(conn),
            pool,
            bad: false,
        }
    }

    fn get(&mut self) -> Result<&mut dyn Connection> {
        match self.conn.as_mut() {
            Some(conn) => Ok(conn.as_mut()),
            None => Err(Error::BadConnection),
        }
    }

    fn observe<T>(&mut self, result: &Result<T>) {
        if matches!(result, Err(err) if err.is_bad_connection()) {
            self.bad = true;
        }
    }

    async fn prepare(&mut self, ctx: &Context, sql: &str) -> Result<Box<dyn Statement>> {
        let result = driver::prepare_connection(self.get()?, ctx, sql).await;
        self.observe(&result);
        result
    }
}

impl Drop for PooledConn {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            self.pool.release(conn, self.bad);
        }
    }
}

async fn query_on(
    conn: &mut PooledConn,
    ctx: &Context,
    sql: &str,
    args: &[NamedValue],
) -> Result<(Box<dyn Statement>, Box<dyn driver::Rows>)> {
    let mut stmt = conn.prepare(ctx, sql).await?;
    let result = driver::query_statement(&mut *stmt, ctx, args).await;
    conn.observe(&result);
    match result {
        Ok(rows) => Ok((stmt, rows)),
        Err(err) => {
            close_statement(stmt).await;
            Err(err)
        }
    }
}

async fn exec_on(
    conn: &mut PooledConn,
    ctx: &Context,
    sql: &str,
    args: &[NamedValue],
) -> Result<ExecResult> {
    let mut stmt = conn.prepare(ctx, sql).await?;
    let result = driver::exec_statement(&mut *stmt, ctx, args).await;
    conn.observe(&result);
    close_statement(stmt).await;
    result
}

async fn close_statement(mut stmt: Box<dyn Statement>) {
    if let Err(err) = stmt.close().await {
        tracing::debug!(error = %err, "closing statement failed");
    }
}

/// A result set. Holds on to its statement and connection until closed or
/// dropped.
pub struct Rows {
    rows: Box<dyn driver::Rows>,
    stmt: Option<Box<dyn Statement>>,
    _conn: Option<PooledConn>,
}

impl Rows {
    fn new(rows: Box<dyn driver::Rows>, stmt: Option<Box<dyn Statement>>, conn: Option<PooledConn>) -> Self {
        Self {
            rows,
            stmt,
            _conn: conn,
        }
    }

    pub fn columns(&self) -> &[String] {
        self.rows.columns()
    }

    pub async fn next(&mut self) -> Result<Option<Vec<Value>>> {
        self.rows.next().await
    }

    /// Read the remaining rows and close. The rows are closed even when
    /// reading fails; the read error wins over a close error.
    pub async fn all(mut self) -> Result<Vec<Vec<Value>>> {
        let mut out = Vec::new();
        let read = loop {
            match self.rows.next().await {
                Ok(Some(row)) => out.push(row),
                Ok(None) => break Ok(()),
                Err(err) => break Err(err),
            }
        };
        let closed = self.close().await;
        read.and(closed)?;
        Ok(out)
    }

    pub async fn close(mut self) -> Result<()> {
        let result = self.rows.close().await;
        if let Some(stmt) = self.stmt.take() {
            close_statement(stmt).await;
        }
        result
    }
}

impl fmt::Debug for Rows {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rows").field("columns", &self.columns()).finish()
    }
}

/// A prepared statement bound to one pooled connection.
pub struct Prepared {
    sql: String,
    state: tokio::sync::Mutex<PreparedState>,
}

struct PreparedState {
    stmt: Option<Box<dyn Statement>>,
    conn: PooledConn,
}

impl Prepared {
    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub async fn query(&self, ctx: &Context, args: &[Arg]) -> Result<Rows> {
        let mut state = self.state.lock().await;
        let PreparedState { stmt, conn } = &mut *state;
        let stmt = stmt.as_mut().ok_or(Error::StatementClosed)?;

        let result = driver::query_statement(&mut **stmt, ctx, &to_named_values(args)).await;
        conn.observe(&result);
        Ok(Rows::new(result?, None, None))
    }

    pub async fn exec(&self, ctx: &Context, args: &[Arg]) -> Result<ExecResult> {
        let mut state = self.state.lock().await;
        let PreparedState { stmt, conn } = &mut *state;
        let stmt = stmt.as_mut().ok_or(Error::StatementClosed)?;

        let result = driver::exec_statement(&mut **stmt, ctx, &to_named_values(args)).await;
        conn.observe(&result);
        result
    }

    /// Close the driver statement. The connection returns to the pool when
    /// the `Prepared` is dropped.
    pub async fn close(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        match state.stmt.take() {
            Some(mut stmt) => stmt.close().await,
            None => Ok(()),
        }
    }
}

impl fmt::Debug for Prepared {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Prepared").field("sql", &self.sql).finish()
    }
}

/// A transaction pinned to one connection.
///
/// Dropping a `Tx` without committing or rolling back discards its
/// connection instead of returning it to the pool.
pub struct Tx {
    conn: PooledConn,
    tx: Option<Box<dyn Transaction>>,
}

impl Tx {
    pub async fn query(&mut self, ctx: &Context, sql: &str, args: &[Arg]) -> Result<Rows> {
        self.ensure_open()?;
        let (stmt, rows) = query_on(&mut self.conn, ctx, sql, &to_named_values(args)).await?;
        Ok(Rows::new(rows, Some(stmt), None))
    }

    pub async fn exec(&mut self, ctx: &Context, sql: &str, args: &[Arg]) -> Result<ExecResult> {
        self.ensure_open()?;
        exec_on(&mut self.conn, ctx, sql, &to_named_values(args)).await
    }

    pub async fn commit(mut self) -> Result<()> {
        let tx = self.tx.take().ok_or(Error::TxDone)?;
        let result = tx.commit().await;
        self.conn.observe(&result);
        result
    }

    pub async fn rollback(mut self) -> Result<()> {
        let tx = self.tx.take().ok_or(Error::TxDone)?;
        let result = tx.rollback().await;
        self.conn.observe(&result);
        result
    }

    fn ensure_open(&self) -> Result<()> {
        if self.tx.is_some() {
            Ok(())
        } else {
            Err(Error::TxDone)
        }
    }
}

impl Drop for Tx {
    fn drop(&mut self) {
        if self.tx.is_some() {
            tracing::warn!("transaction dropped while still open, discarding its connection");
            self.conn.bad = true;
        }
    }
}

impl fmt::Debug for Tx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tx").field("done", &self.tx.is_none()).finish()
    }
}
