//! In-memory driver and logger shared by the unit tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::context::Context;
use crate::convert::values_to_named_values;
use crate::driver::{
    Connection, Driver, ExecContext, ExecResult, Pinger, PrepareContext, QueryContext, Rows,
    Statement, Transaction,
};
use crate::error::{Error, Result};
use crate::record::{Logger, Record};
use crate::registry;
use crate::value::{NamedValue, Value};

/// Which optional capabilities the fake driver advertises.
#[derive(Debug, Clone, Copy, Default)]
pub struct Capabilities {
    pub prepare_context: bool,
    pub query_context: bool,
    pub exec_context: bool,
    pub ping: bool,
}

impl Capabilities {
    pub fn all() -> Self {
        Self {
            prepare_context: true,
            query_context: true,
            exec_context: true,
            ping: true,
        }
    }

    pub fn none() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Open(String),
    Prepare { query: String, with_context: bool },
    Query { args: Vec<NamedValue>, with_context: bool },
    Exec { args: Vec<NamedValue>, with_context: bool },
    Begin,
    Commit,
    Rollback,
    Ping,
    CloseStatement,
    CloseConnection,
}

#[derive(Debug, Default)]
struct CallLog(Mutex<Vec<Call>>);

impl CallLog {
    fn push(&self, call: Call) {
        self.0.lock().unwrap().push(call);
    }
}

/// Scripted driver.
///
/// - `open` fails when the driver was built with [`FakeDriver::refusing`].
/// - `prepare` fails for SQL starting with `bogus` and never finishes for SQL
///   starting with `hang`.
/// - `query`/`exec` fail for SQL mentioning `missing`, report a bad
///   connection for SQL mentioning `broken`, and never finish for SQL
///   mentioning `sleep`.
/// - `query` echoes each argument back as a row; for SQL mentioning
///   `truncated` the rows end in an error instead of a clean finish.
#[derive(Debug, Default)]
pub struct FakeDriver {
    caps: Capabilities,
    refuse: bool,
    calls: Arc<CallLog>,
}

impl FakeDriver {
    pub fn new(caps: Capabilities) -> Self {
        Self {
            caps,
            ..Self::default()
        }
    }

    pub fn refusing() -> Self {
        Self {
            refuse: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.0.lock().unwrap().clone()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls().iter().filter(|c| pred(c)).count()
    }

    pub fn connection(&self) -> FakeConnection {
        FakeConnection {
            caps: self.caps,
            calls: Arc::clone(&self.calls),
        }
    }
}

#[async_trait]
impl Driver for FakeDriver {
    async fn open(&self, dsn: &str) -> Result<Box<dyn Connection>> {
        self.calls.push(Call::Open(dsn.to_string()));
        if self.refuse {
            return Err(Error::msg("connection refused"));
        }
        Ok(Box::new(self.connection()))
    }
}

/// Register a fresh fake driver under a unique name.
pub fn register_fake(caps: Capabilities) -> (String, Arc<FakeDriver>) {
    static NEXT: AtomicUsize = AtomicUsize::new(0);
    let name = format!("fake-{}", NEXT.fetch_add(1, Ordering::Relaxed));
    let driver = Arc::new(FakeDriver::new(caps));
    registry::register(&name, driver.clone()).unwrap();
    (name, driver)
}

pub struct FakeConnection {
    caps: Capabilities,
    calls: Arc<CallLog>,
}

impl FakeConnection {
    async fn prepare_inner(&self, query: &str, with_context: bool) -> Result<Box<dyn Statement>> {
        self.calls.push(Call::Prepare {
            query: query.to_string(),
            with_context,
        });
        if query.starts_with("hang") {
            std::future::pending::<()>().await;
        }
        if query.starts_with("bogus") {
            return Err(Error::msg("syntax error near \"bogus\""));
        }
        Ok(Box::new(FakeStatement {
            query: query.to_string(),
            caps: self.caps,
            calls: Arc::clone(&self.calls),
        }))
    }
}

#[async_trait]
impl Connection for FakeConnection {
    async fn prepare(&mut self, query: &str) -> Result<Box<dyn Statement>> {
        self.prepare_inner(query, false).await
    }

    async fn begin(&mut self) -> Result<Box<dyn Transaction>> {
        self.calls.push(Call::Begin);
        Ok(Box::new(FakeTransaction {
            calls: Arc::clone(&self.calls),
        }))
    }

    async fn close(&mut self) -> Result<()> {
        self.calls.push(Call::CloseConnection);
        Ok(())
    }

    fn as_prepare_context(&mut self) -> Option<&mut dyn PrepareContext> {
        if self.caps.prepare_context {
            Some(self)
        } else {
            None
        }
    }

    fn as_pinger(&mut self) -> Option<&mut dyn Pinger> {
        if self.caps.ping {
            Some(self)
        } else {
            None
        }
    }
}

#[async_trait]
impl PrepareContext for FakeConnection {
    async fn prepare_context(&mut self, _ctx: &Context, query: &str) -> Result<Box<dyn Statement>> {
        self.prepare_inner(query, true).await
    }
}

#[async_trait]
impl Pinger for FakeConnection {
    async fn ping(&mut self, _ctx: &Context) -> Result<()> {
        self.calls.push(Call::Ping);
        Ok(())
    }
}

pub struct FakeStatement {
    query: String,
    caps: Capabilities,
    calls: Arc<CallLog>,
}

impl FakeStatement {
    async fn outcome(&self) -> Result<()> {
        if self.query.contains("sleep") {
            std::future::pending::<()>().await;
        }
        if self.query.contains("broken") {
            return Err(Error::BadConnection);
        }
        if self.query.contains("missing") {
            return Err(Error::msg("no such table: missing"));
        }
        Ok(())
    }

    async fn run_query(&self, args: Vec<NamedValue>, with_context: bool) -> Result<Box<dyn Rows>> {
        let rows = if args.is_empty() {
            vec![vec![Value::Int(1)]]
        } else {
            args.iter().map(|a| vec![a.value.clone()]).collect()
        };
        self.calls.push(Call::Query { args, with_context });
        self.outcome().await?;
        Ok(Box::new(FakeRows {
            columns: vec!["value".to_string()],
            rows: rows.into(),
            truncated: self.query.contains("truncated"),
        }))
    }

    async fn run_exec(&self, args: Vec<NamedValue>, with_context: bool) -> Result<ExecResult> {
        let rows_affected = args.len() as u64;
        self.calls.push(Call::Exec { args, with_context });
        self.outcome().await?;
        Ok(ExecResult {
            rows_affected,
            last_insert_id: Some(1),
        })
    }
}

#[async_trait]
impl Statement for FakeStatement {
    fn num_input(&self) -> Option<usize> {
        Some(self.query.matches('?').count())
    }

    async fn query(&mut self, args: Vec<Value>) -> Result<Box<dyn Rows>> {
        self.run_query(values_to_named_values(args), false).await
    }

    async fn exec(&mut self, args: Vec<Value>) -> Result<ExecResult> {
        self.run_exec(values_to_named_values(args), false).await
    }

    async fn close(&mut self) -> Result<()> {
        self.calls.push(Call::CloseStatement);
        Ok(())
    }

    fn as_query_context(&mut self) -> Option<&mut dyn QueryContext> {
        if self.caps.query_context {
            Some(self)
        } else {
            None
        }
    }

    fn as_exec_context(&mut self) -> Option<&mut dyn ExecContext> {
        if self.caps.exec_context {
            Some(self)
        } else {
            None
        }
    }
}

#[async_trait]
impl QueryContext for FakeStatement {
    async fn query_context(&mut self, _ctx: &Context, args: &[NamedValue]) -> Result<Box<dyn Rows>> {
        self.run_query(args.to_vec(), true).await
    }
}

#[async_trait]
impl ExecContext for FakeStatement {
    async fn exec_context(&mut self, _ctx: &Context, args: &[NamedValue]) -> Result<ExecResult> {
        self.run_exec(args.to_vec(), true).await
    }
}

pub struct FakeRows {
    columns: Vec<String>,
    rows: VecDeque<Vec<Value>>,
    truncated: bool,
}

#[async_trait]
impl Rows for FakeRows {
    fn columns(&self) -> &[String] {
        &self.columns
    }

    async fn next(&mut self) -> Result<Option<Vec<Value>>> {
        match self.rows.pop_front() {
            None if self.truncated => Err(Error::msg("result set truncated")),
            row => Ok(row),
        }
    }

    async fn close(&mut self) -> Result<()> {
        self.rows.clear();
        Ok(())
    }
}

pub struct FakeTransaction {
    calls: Arc<CallLog>,
}

#[async_trait]
impl Transaction for FakeTransaction {
    async fn commit(self: Box<Self>) -> Result<()> {
        self.calls.push(Call::Commit);
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        self.calls.push(Call::Rollback);
        Ok(())
    }
}

/// Keeps every record it receives.
#[derive(Debug, Clone, Default)]
pub struct CollectingLogger {
    records: Arc<Mutex<Vec<Record>>>,
}

impl CollectingLogger {
    pub fn records(&self) -> Vec<Record> {
        self.records.lock().unwrap().clone()
    }
}

impl Logger for CollectingLogger {
    fn log(&self, _ctx: &Context, record: Record) {
        self.records.lock().unwrap().push(record);
    }
}
