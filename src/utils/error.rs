use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionPoolError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to dial {addr}: {source}")]
    Dial {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Session pool is shut down")]
    PoolClosed,
}

pub type Result<T> = std::result::Result<T, SessionPoolError>;
