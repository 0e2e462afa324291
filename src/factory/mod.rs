use crate::session::{Session, TcpSession};
use crate::utils::error::{Result, SessionPoolError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io;
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, trace};

/// Creates new session handles on demand.
///
/// The pool calls `create` whenever its idle reserve is empty. Implementations
/// do their own dialing and handshaking; the pool treats the factory as an
/// opaque capability and never retries a failed `create`.
pub trait SessionFactory: Send + Sync {
    type Session: Session;

    fn create(&self) -> Result<Self::Session>;
}

impl<F, S> SessionFactory for F
where
    F: Fn() -> Result<S> + Send + Sync,
    S: Session,
{
    type Session = S;

    fn create(&self) -> Result<S> {
        self()
    }
}

/// Endpoint topology
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DialMode {
    /// Dial the first address directly
    #[default]
    Single,
    /// Treat the addresses as seeds of a replica set / cluster
    Cluster,
}

impl FromStr for DialMode {
    type Err = SessionPoolError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "single" => Ok(DialMode::Single),
            "cluster" => Ok(DialMode::Cluster),
            other => Err(SessionPoolError::Config(format!(
                "Invalid dial mode: {}. Must be 'single' or 'cluster'",
                other
            ))),
        }
    }
}

impl fmt::Display for DialMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DialMode::Single => f.write_str("single"),
            DialMode::Cluster => f.write_str("cluster"),
        }
    }
}

/// Credentials forwarded with a cluster dial
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Parameters for dialing new sessions
#[derive(Debug, Clone, Default)]
pub struct DialConfig {
    pub mode: DialMode,
    /// Ordered endpoint list ("host:port")
    pub addresses: Vec<String>,
    /// Zero means a blocking dial with the OS default timeout
    pub timeout: Duration,
    pub username: String,
    pub password: String,
}

impl DialConfig {
    /// Credentials that go with the dial. Only cluster mode forwards them.
    pub fn credentials(&self) -> Option<Credentials> {
        match self.mode {
            DialMode::Cluster if !self.username.is_empty() => Some(Credentials {
                username: self.username.clone(),
                password: self.password.clone(),
            }),
            _ => None,
        }
    }
}

/// Factory that dials plain TCP sessions
///
/// Nothing is dialed at construction; every `create` performs one dial
/// according to the configured mode.
#[derive(Debug, Clone)]
pub struct TcpDialer {
    config: DialConfig,
}

impl TcpDialer {
    pub fn new(config: DialConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DialConfig {
        &self.config
    }

    fn dial(&self, addr: &str) -> Result<(TcpStream, SocketAddr)> {
        let dial_err = |source: io::Error| SessionPoolError::Dial {
            addr: addr.to_string(),
            source,
        };

        if self.config.timeout.is_zero() {
            trace!("Dialing {} (blocking)", addr);
            let stream = TcpStream::connect(addr).map_err(dial_err)?;
            let peer = stream.peer_addr().map_err(dial_err)?;
            return Ok((stream, peer));
        }

        trace!("Dialing {} (timeout {:?})", addr, self.config.timeout);
        let mut last_err = None;
        for sock_addr in addr.to_socket_addrs().map_err(dial_err)? {
            match TcpStream::connect_timeout(&sock_addr, self.config.timeout) {
                Ok(stream) => return Ok((stream, sock_addr)),
                Err(e) => last_err = Some(e),
            }
        }

        Err(dial_err(last_err.unwrap_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                "address resolved to no socket addresses",
            )
        })))
    }
}

impl SessionFactory for TcpDialer {
    type Session = TcpSession;

    fn create(&self) -> Result<TcpSession> {
        let addresses = &self.config.addresses;
        let Some(first) = addresses.first() else {
            return Err(SessionPoolError::Config(
                "session endpoint address list is empty".to_string(),
            ));
        };

        match self.config.mode {
            DialMode::Single => {
                let (stream, peer) = self.dial(first)?;
                debug!("Dialed new session to {}", peer);
                Ok(TcpSession::new(stream, peer, DialMode::Single, None))
            }
            DialMode::Cluster => {
                let mut last_err = None;
                for addr in addresses {
                    match self.dial(addr) {
                        Ok((stream, peer)) => {
                            debug!("Dialed new cluster session to {}", peer);
                            return Ok(TcpSession::new(
                                stream,
                                peer,
                                DialMode::Cluster,
                                self.config.credentials(),
                            ));
                        }
                        Err(e) => {
                            debug!("Cluster member unreachable: {}", e);
                            last_err = Some(e);
                        }
                    }
                }
                Err(last_err.unwrap_or_else(|| {
                    SessionPoolError::Config("session endpoint address list is empty".to_string())
                }))
            }
        }
    }
}
