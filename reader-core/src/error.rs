use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("backing store unavailable: {0}")]
    Unavailable(String),
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("cache sync task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}
