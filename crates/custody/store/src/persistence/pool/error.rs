use diesel_async::pooled_connection::deadpool::BuildError;
use tokio::task::JoinError;

/// Errors raised while building the connection pool.
#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    /// The blocking task loading the native roots panicked or was cancelled.
    #[error("join error: {0}")]
    Join(#[from] JoinError),

    /// The pool configuration was rejected.
    #[error("build error: {0}")]
    Build(#[from] BuildError),

    /// A native root certificate could not be added.
    #[error("rustls error: {0}")]
    Rustls(#[from] rustls::Error),
}
