//! Error type shared by the driver contract, the host handle and the proxies.

use std::sync::Arc;

/// Result alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors surfaced by drivers, the host handle and the instrumentation layer.
///
/// `Error` is cheap to clone so the same value can be attached to a
/// [`Record`](crate::Record) and returned to the caller unchanged.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// A named parameter reached a statement that only binds by position.
    #[error("sql: driver does not support the use of Named Parameters")]
    UnsupportedNamedParameters,

    /// No driver is registered under the requested name.
    #[error("sql: unknown driver {0:?} (forgotten register?)")]
    UnknownDriver(String),

    /// A driver was registered twice under the same name.
    #[error("sql: register called twice for driver {0}")]
    DuplicateDriver(String),

    #[error("sql: database is closed")]
    DatabaseClosed,

    #[error("sql: statement is closed")]
    StatementClosed,

    #[error("sql: transaction has already been committed or rolled back")]
    TxDone,

    /// Returned by drivers when a connection is no longer usable.
    /// The pool discards connections that report it.
    #[error("driver: bad connection")]
    BadConnection,

    #[error("context canceled")]
    Canceled,

    #[error("context deadline exceeded")]
    DeadlineExceeded,

    /// The call was abandoned (dropped future or panic) before it produced
    /// an outcome. Only ever seen on records.
    #[error("sql: operation did not complete")]
    Incomplete,

    /// Free-form driver failure.
    #[error("{0}")]
    Message(String),

    /// Opaque driver failure.
    #[error(transparent)]
    Driver(Arc<dyn std::error::Error + Send + Sync>),
}

impl Error {
    /// Build a free-form error.
    pub fn msg(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }

    /// Wrap any driver error.
    pub fn driver<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Driver(Arc::new(err))
    }

    /// Whether the pool should throw away the connection that produced this error.
    pub fn is_bad_connection(&self) -> bool {
        matches!(self, Self::BadConnection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_named_parameter_message() {
        assert_eq!(
            Error::UnsupportedNamedParameters.to_string(),
            "sql: driver does not support the use of Named Parameters"
        );
    }

    #[test]
    fn test_driver_error_is_transparent() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "socket closed");
        let err = Error::driver(io);
        assert_eq!(err.to_string(), "socket closed");

        let cloned = err.clone();
        assert_eq!(cloned.to_string(), err.to_string());
    }

    #[test]
    fn test_bad_connection() {
        assert!(Error::BadConnection.is_bad_connection());
        assert!(!Error::msg("boom").is_bad_connection());
    }
}
