use thiserror::Error;

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("connection I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("request read timed out")]
    ReadTimeout(#[from] tokio::time::error::Elapsed),
    #[error("relay task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
    #[error("handshake receiver dropped")]
    HandshakeClosed,
}
