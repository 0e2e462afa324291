use crate::factory::{Credentials, DialMode};
use std::io;
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::time::{Duration, Instant};

/// A reusable handle to an established network session.
///
/// The pool never looks inside a handle; the only thing it can do with one is
/// close it. `close` consumes the handle, so a closed session cannot be stored
/// in a pool again.
pub trait Session: Send {
    fn close(self) -> io::Result<()>;
}

/// Session handle backed by a connected TCP stream
#[derive(Debug)]
pub struct TcpSession {
    stream: TcpStream,
    peer: SocketAddr,
    mode: DialMode,
    credentials: Option<Credentials>,
    created_at: Instant,
}

impl TcpSession {
    pub(crate) fn new(
        stream: TcpStream,
        peer: SocketAddr,
        mode: DialMode,
        credentials: Option<Credentials>,
    ) -> Self {
        Self {
            stream,
            peer,
            mode,
            credentials,
            created_at: Instant::now(),
        }
    }

    /// Address the session was dialed to
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    pub fn mode(&self) -> DialMode {
        self.mode
    }

    /// Credentials forwarded with the dial (cluster mode only)
    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    pub fn username(&self) -> Option<&str> {
        self.credentials.as_ref().map(|c| c.username.as_str())
    }

    /// Time since the session was dialed
    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }

    pub fn stream(&self) -> &TcpStream {
        &self.stream
    }

    pub fn stream_mut(&mut self) -> &mut TcpStream {
        &mut self.stream
    }
}

impl Session for TcpSession {
    fn close(self) -> io::Result<()> {
        match self.stream.shutdown(Shutdown::Both) {
            Ok(()) => Ok(()),
            // Peer already went away
            Err(e) if e.kind() == io::ErrorKind::NotConnected => Ok(()),
            Err(e) => Err(e),
        }
    }
}
