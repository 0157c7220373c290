//! Connector that wraps every new physical connection in a [`ConnectionProxy`].

use std::sync::Arc;

use async_trait::async_trait;

use crate::connection::ConnectionProxy;
use crate::context::Context;
use crate::driver::{Connection, Connector, Driver};
use crate::error::Result;
use crate::record::Logger;

/// Opens connections through the wrapped driver and instruments them.
///
/// The context is not consulted here; cancellation is left to the driver.
/// [`Connector::driver`] returns the wrapped driver itself, so code that
/// inspects the driver keeps seeing the real one.
pub struct RecordingConnector {
    driver: Arc<dyn Driver>,
    dsn: String,
    logger: Arc<dyn Logger>,
}

impl RecordingConnector {
    pub fn new(driver: Arc<dyn Driver>, dsn: impl Into<String>, logger: Arc<dyn Logger>) -> Self {
        Self {
            driver,
            dsn: dsn.into(),
            logger,
        }
    }

    pub fn dsn(&self) -> &str {
        &self.dsn
    }
}

#[async_trait]
impl Connector for RecordingConnector {
    async fn connect(&self, _ctx: &Context) -> Result<Box<dyn Connection>> {
        let conn = self.driver.open(&self.dsn).await?;
        tracing::trace!(dsn = %self.dsn, "opened recorded connection");
        Ok(Box::new(ConnectionProxy::new(conn, Arc::clone(&self.logger))))
    }

    fn driver(&self) -> Arc<dyn Driver> {
        Arc::clone(&self.driver)
    }
}
