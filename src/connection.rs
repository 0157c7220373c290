//! Recording wrapper around a live driver connection.

use std::sync::Arc;

use async_trait::async_trait;

use crate::context::Context;
use crate::driver::{self, Connection, Pinger, PrepareContext, Statement, Transaction};
use crate::error::Result;
use crate::record::{Logger, PendingRecord, Record};
use crate::statement::StatementProxy;

/// A driver connection whose statement preparation is instrumented.
///
/// Only preparation is intercepted. A failed prepare is reported right away
/// with `preparing` set; a successful one is silent and yields a
/// [`StatementProxy`] that reports each later query and execution.
/// Everything else (`begin`, `close`, ping) goes straight to the wrapped
/// connection.
///
/// # Example
///
/// ```rust,ignore
/// use std::sync::Arc;
/// use sqllog::{from_fn, ConnectionProxy, Context, driver::PrepareContext};
///
/// let conn = driver.open("file::memory:").await?;
/// let mut conn = ConnectionProxy::new(conn, Arc::new(from_fn(|_ctx, record| {
///     println!("{record:?}");
/// })));
///
/// let stmt = conn.prepare_context(&Context::background(), "select 1").await?;
/// ```
pub struct ConnectionProxy {
    inner: Box<dyn Connection>,
    logger: Arc<dyn Logger>,
}

impl ConnectionProxy {
    pub fn new(inner: Box<dyn Connection>, logger: Arc<dyn Logger>) -> Self {
        Self { inner, logger }
    }

    async fn recorded_prepare(&mut self, ctx: &Context, query: &str) -> Result<Box<dyn Statement>> {
        let logger = Arc::clone(&self.logger);
        let mut failure = Record::new(query);
        failure.preparing = true;
        let pending = PendingRecord::begin(failure, ctx, logger.as_ref());

        match driver::prepare_connection(&mut *self.inner, ctx, query).await {
            Ok(stmt) => {
                pending.disarm();
                Ok(Box::new(StatementProxy::new(stmt, Record::new(query), logger)))
            }
            Err(err) => {
                pending.complete::<()>(&Err(err.clone()));
                Err(err)
            }
        }
    }
}

#[async_trait]
impl Connection for ConnectionProxy {
    async fn prepare(&mut self, query: &str) -> Result<Box<dyn Statement>> {
        let ctx = Context::background();
        self.recorded_prepare(&ctx, query).await
    }

    async fn begin(&mut self) -> Result<Box<dyn Transaction>> {
        self.inner.begin().await
    }

    async fn close(&mut self) -> Result<()> {
        self.inner.close().await
    }

    fn as_prepare_context(&mut self) -> Option<&mut dyn PrepareContext> {
        Some(self)
    }

    fn as_pinger(&mut self) -> Option<&mut dyn Pinger> {
        self.inner.as_pinger()
    }
}

#[async_trait]
impl PrepareContext for ConnectionProxy {
    async fn prepare_context(&mut self, ctx: &Context, query: &str) -> Result<Box<dyn Statement>> {
        self.recorded_prepare(ctx, query).await
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::error::Error;
    use crate::testing::{Call, Capabilities, CollectingLogger, FakeDriver};
    use crate::value::NamedValue;

    fn proxy(caps: Capabilities) -> (ConnectionProxy, FakeDriver, CollectingLogger) {
        let driver = FakeDriver::new(caps);
        let logger = CollectingLogger::default();
        let conn = ConnectionProxy::new(Box::new(driver.connection()), Arc::new(logger.clone()));
        (conn, driver, logger)
    }

    #[tokio::test]
    async fn test_prepare_success_is_silent() {
        let (mut conn, driver, logger) = proxy(Capabilities::all());

        let mut stmt = conn
            .prepare_context(&Context::background(), "select str from test where id = ?")
            .await
            .unwrap();

        assert!(logger.records().is_empty());
        assert!(driver.calls().contains(&Call::Prepare {
            query: "select str from test where id = ?".to_string(),
            with_context: true,
        }));

        // the returned statement is the recording one
        let qc = stmt.as_query_context().expect("proxy advertises query context");
        qc.query_context(&Context::background(), &[NamedValue::positional(1, 2)])
            .await
            .unwrap();

        let records = logger.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].query, "select str from test where id = ?");
        assert!(!records[0].preparing);
    }

    #[tokio::test]
    async fn test_prepare_failure_is_recorded() {
        let (mut conn, _driver, logger) = proxy(Capabilities::all());

        let err = match conn.prepare_context(&Context::background(), "bogus sql").await {
            Ok(_) => panic!("bogus sql prepared"),
            Err(err) => err,
        };
        assert_eq!(err.to_string(), "syntax error near \"bogus\"");

        let records = logger.records();
        assert_eq!(records.len(), 1);
        assert!(records[0].preparing);
        assert!(!records[0].effect);
        assert!(records[0].args.is_empty());
        assert!(matches!(records[0].err, Some(Error::Message(_))));
    }

    #[tokio::test]
    async fn test_abandoned_prepare_is_recorded_once() {
        let (mut conn, _driver, logger) = proxy(Capabilities::all());

        let outcome = tokio::time::timeout(
            Duration::from_millis(10),
            conn.prepare_context(&Context::background(), "hang until canceled"),
        )
        .await;
        assert!(outcome.is_err());

        let records = logger.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].query, "hang until canceled");
        assert!(records[0].preparing);
        assert!(matches!(records[0].err, Some(Error::Incomplete)));
    }

    #[tokio::test]
    async fn test_prepare_falls_back_to_plain_path() {
        let (mut conn, driver, _logger) = proxy(Capabilities::none());

        conn.prepare_context(&Context::background(), "select 1")
            .await
            .unwrap();

        assert!(driver.calls().contains(&Call::Prepare {
            query: "select 1".to_string(),
            with_context: false,
        }));
    }

    #[tokio::test]
    async fn test_plain_prepare_is_recorded_too() {
        let (mut conn, _driver, logger) = proxy(Capabilities::none());

        assert!(conn.prepare("bogus").await.is_err());
        assert_eq!(logger.records().len(), 1);
    }

    #[tokio::test]
    async fn test_other_operations_pass_through() {
        let (mut conn, driver, logger) = proxy(Capabilities::all());

        let tx = conn.begin().await.unwrap();
        tx.commit().await.unwrap();
        conn.as_pinger()
            .expect("wrapped connection pings")
            .ping(&Context::background())
            .await
            .unwrap();
        conn.close().await.unwrap();

        assert_eq!(
            driver.calls(),
            vec![Call::Begin, Call::Commit, Call::Ping, Call::CloseConnection]
        );
        assert!(logger.records().is_empty());
    }

    #[tokio::test]
    async fn test_ping_capability_follows_wrapped_connection() {
        let (mut conn, _driver, _logger) = proxy(Capabilities::none());
        assert!(conn.as_pinger().is_none());
    }
}
