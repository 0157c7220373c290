//! Basic example showing how to use sqllog.
//!
//! Registers a toy in-memory driver that only binds positional parameters,
//! then runs the same statements through an instrumented handle.
//!
//! Run with: cargo run --example basic

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use sqllog::driver::{Connection, Driver, ExecResult, Rows, Statement, Transaction};
use sqllog::prelude::*;
use sqllog::{Result, Value};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Default)]
struct EchoDriver;

#[async_trait]
impl Driver for EchoDriver {
    async fn open(&self, _dsn: &str) -> Result<Box<dyn Connection>> {
        Ok(Box::new(EchoConnection))
    }
}

struct EchoConnection;

#[async_trait]
impl Connection for EchoConnection {
    async fn prepare(&mut self, _query: &str) -> Result<Box<dyn Statement>> {
        Ok(Box::new(EchoStatement))
    }

    async fn begin(&mut self) -> Result<Box<dyn Transaction>> {
        Ok(Box::new(EchoTransaction))
    }

    async fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

struct EchoStatement;

#[async_trait]
impl Statement for EchoStatement {
    async fn query(&mut self, args: Vec<Value>) -> Result<Box<dyn Rows>> {
        Ok(Box::new(EchoRows {
            columns: vec!["value".to_string()],
            rows: args.into_iter().map(|v| vec![v]).collect(),
        }))
    }

    async fn exec(&mut self, args: Vec<Value>) -> Result<ExecResult> {
        Ok(ExecResult {
            rows_affected: args.len() as u64,
            last_insert_id: None,
        })
    }

    async fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

struct EchoRows {
    columns: Vec<String>,
    rows: VecDeque<Vec<Value>>,
}

#[async_trait]
impl Rows for EchoRows {
    fn columns(&self) -> &[String] {
        &self.columns
    }

    async fn next(&mut self) -> Result<Option<Vec<Value>>> {
        Ok(self.rows.pop_front())
    }

    async fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

struct EchoTransaction;

#[async_trait]
impl Transaction for EchoTransaction {
    async fn commit(self: Box<Self>) -> Result<()> {
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing subscriber
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,sqllog=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    sqllog::register("echo", Arc::new(EchoDriver))?;

    // Option 1: bundled tracing logger
    let logger = Arc::new(TracingLogger::new(TracingConfig::development()));

    // Option 2: any closure
    // let logger = Arc::new(from_fn(|_ctx, record| println!("{record:?}")));

    let db = open("echo", "memory", Some(logger))?;
    db.set_max_open_conns(25);
    db.set_max_idle_conns(25);

    let ctx = Context::background();

    let rows = db
        .query(&ctx, "select ?, ?, ?, ?, ?", &args![123, 3.5, true, None::<i64>, "abc"])
        .await?
        .all()
        .await?;
    tracing::info!(rows = rows.len(), "selected");

    db.exec(&ctx, "insert into test set str = ?", &args![unix_now()])
        .await?;

    let stmt = db.prepare(&ctx, "select str from test where id = ?").await?;
    stmt.query(&ctx, &args![2]).await?.close().await?;
    stmt.query(&ctx, &args![3]).await?.close().await?;
    stmt.close().await?;

    // EchoDriver only binds by position: this fails and is recorded
    if let Err(err) = db
        .exec(&ctx, "insert into test set str = :str", &[named("str", "x")])
        .await
    {
        tracing::info!(error = %err, "named parameter rejected");
    }

    let mut tx = db.begin(&ctx).await?;
    tx.query(&ctx, "select str from test where id = ?", &args![4]).await?;
    tx.exec(&ctx, "insert into test set str = ?", &args!["in tx"]).await?;
    tx.commit().await?;

    db.close().await?;
    Ok(())
}

fn unix_now() -> String {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_default()
}
