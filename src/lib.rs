// sessionpool - Bounded pool of reusable network session handles

pub mod config;
pub mod factory;
pub mod pool;
pub mod session;
pub mod utils;

// Re-export commonly used types
pub use factory::{Credentials, DialConfig, DialMode, SessionFactory, TcpDialer};
pub use pool::{PoolStats, SessionPool};
pub use session::{Session, TcpSession};
pub use utils::error::{Result, SessionPoolError};
