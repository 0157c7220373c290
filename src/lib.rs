//! # sqllog
//!
//! Driver-level instrumentation for SQL databases.
//!
//! `sqllog` sits between a pooled [`Database`] handle and the driver
//! underneath it. Every statement preparation that fails, and every query and
//! execution, produces one [`Record`] that is handed to your [`Logger`]. The
//! driver's results and errors reach your code unchanged.
//!
//! ## Features
//!
//! - **Drop-in**: [`open`] returns the same [`Database`] type as an
//!   uninstrumented [`Database::open`]
//! - **Partial drivers**: context-aware prepare, query and exec are used when
//!   the driver has them, with a positional-parameter fallback when it does not
//! - **Exactly one record per call**, including failures and abandoned calls
//! - **Pluggable sink**: implement [`Logger`], pass a closure through
//!   [`from_fn`], or use the bundled [`TracingLogger`]
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use sqllog::{args, from_fn, Context};
//!
//! sqllog::register("mysql", Arc::new(MySqlDriver::default()))?;
//!
//! let logger = Arc::new(from_fn(|_ctx, record| {
//!     println!("[db:{}] {} {:?} {:?}", record.at, record.query, record.elapsed, record.err);
//! }));
//! let db = sqllog::open("mysql", dsn, Some(logger))?;
//!
//! let ctx = Context::background();
//! let stmt = db.prepare(&ctx, "select str from test where id = ?").await?;
//! let rows = stmt.query(&ctx, &args![2]).await?.all().await?;
//! ```
//!
//! ## Tracing
//!
//! ```rust,ignore
//! use sqllog::{TracingConfig, TracingLogger};
//!
//! let logger = TracingLogger::new(
//!     TracingConfig::default()
//!         .with_statement_logging(true)
//!         .with_slow_query_threshold(Duration::from_millis(100)),
//! );
//! let db = sqllog::open("mysql", dsn, Some(Arc::new(logger)))?;
//! ```

mod config;
mod connection;
mod connector;
mod context;
pub mod convert;
mod db;
pub mod driver;
mod error;
mod open;
mod parser;
mod record;
pub mod registry;
mod statement;
mod trace;
mod value;

#[cfg(test)]
mod testing;

pub use config::TracingConfig;
pub use connection::ConnectionProxy;
pub use connector::RecordingConnector;
pub use context::Context;
pub use db::{Database, DbStats, Prepared, Rows, Tx};
pub use error::{Error, Result};
pub use open::open;
pub use parser::{ParsedSql, SqlOperation};
pub use record::{from_fn, FnLogger, Logger, Record};
pub use registry::register;
pub use statement::StatementProxy;
pub use trace::TracingLogger;
pub use value::{named, Arg, NamedValue, Value};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        args, from_fn, named, open, Context, Database, Logger, Record, TracingConfig,
        TracingLogger,
    };
}
