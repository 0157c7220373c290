//! Entry point: open a database whose driver calls are recorded.

use std::sync::Arc;

use crate::connector::RecordingConnector;
use crate::db::Database;
use crate::error::Result;
use crate::record::Logger;

/// Open `dsn` with the driver registered as `driver_name`, sending a
/// [`Record`](crate::Record) to `logger` for every prepare failure, query and
/// execution.
///
/// With `logger` set to `None` the plain [`Database::open`] handle is
/// returned and nothing is instrumented.
///
/// # Example
///
/// ```rust,ignore
/// use std::sync::Arc;
/// use sqllog::{open, TracingConfig, TracingLogger};
///
/// let logger = Arc::new(TracingLogger::new(TracingConfig::development()));
/// let db = sqllog::open("mysql", dsn, Some(logger))?;
/// db.set_max_open_conns(25);
/// ```
pub fn open(driver_name: &str, dsn: &str, logger: Option<Arc<dyn Logger>>) -> Result<Database> {
    let db = Database::open(driver_name, dsn)?;
    let Some(logger) = logger else {
        return Ok(db);
    };

    tracing::debug!(driver = %driver_name, "recording driver calls");
    let connector = RecordingConnector::new(db.driver(), dsn, logger);
    Ok(Database::from_connector(Arc::new(connector)))
}
