use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("transport controls unavailable: {0}")]
    Unavailable(String),

    #[error("transport controls rejected update: {0}")]
    Rejected(String),
}

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("failed to initialize transport controls")]
    Initialization(#[source] SessionError),

    #[error("failed to spawn advertiser thread")]
    Spawn(#[source] std::io::Error),

    #[error("advertiser thread exited before reporting readiness")]
    ThreadExited,
}
