use crate::config::Config;
use crate::factory::{SessionFactory, TcpDialer};
use crate::session::Session;
use crate::utils::error::{Result, SessionPoolError};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info, trace};

/// Fixed-capacity FIFO of idle sessions
struct IdleReserve<S> {
    sessions: Mutex<VecDeque<S>>,
    capacity: usize,
}

impl<S> IdleReserve<S> {
    fn new(capacity: usize) -> Self {
        Self {
            sessions: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    /// Take the oldest idle session, if any. Never waits for a return.
    fn pop(&self) -> Option<S> {
        self.sessions.lock().pop_front()
    }

    /// Store a session, handing it back when the reserve is full.
    ///
    /// Takes `&mut self`: the caller holds the exclusive reserve lock, so the
    /// length check and the push cannot be interleaved with another `push`.
    fn push(&mut self, session: S) -> std::result::Result<(), S> {
        let sessions = self.sessions.get_mut();
        if sessions.len() >= self.capacity {
            return Err(session);
        }
        sessions.push_back(session);
        Ok(())
    }

    fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    fn into_sessions(self) -> VecDeque<S> {
        self.sessions.into_inner()
    }
}

#[derive(Debug, Default)]
struct PoolCounters {
    hits: AtomicU64,
    misses: AtomicU64,
    create_errors: AtomicU64,
    returned: AtomicU64,
    discarded: AtomicU64,
    closed: AtomicU64,
}

impl PoolCounters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Bounded pool of reusable session handles
///
/// Keeps at most `capacity` idle sessions for reuse. Borrowed sessions are not
/// tracked, so the number of sessions in use at once is unbounded; only idle
/// storage is capped. When the reserve is empty, `get` dials a new session
/// through the factory instead of waiting for one to be returned.
///
/// Idle sessions are reused oldest first.
pub struct SessionPool<F: SessionFactory> {
    capacity: usize,
    factory: F,
    /// `None` once the pool has been shut down
    reserve: RwLock<Option<IdleReserve<F::Session>>>,
    counters: PoolCounters,
}

impl<F: SessionFactory> SessionPool<F> {
    /// Create a pool holding up to `capacity` idle sessions.
    ///
    /// Nothing is dialed here; sessions are created on the first `get` calls.
    pub fn new(capacity: usize, factory: F) -> Self {
        Self {
            capacity,
            factory,
            reserve: RwLock::new(Some(IdleReserve::new(capacity))),
            counters: PoolCounters::default(),
        }
    }

    /// Borrow a session, reusing an idle one or creating a new one
    ///
    /// Makes at most one factory call and never waits on another caller's
    /// `put`. Factory errors are returned as-is and not retried.
    ///
    /// # Errors
    /// `PoolClosed` after `shutdown` (the factory is not called), or whatever
    /// the factory returns.
    pub fn get(&self) -> Result<F::Session> {
        let reused = {
            let reserve = self.reserve.read();
            let Some(reserve) = &*reserve else {
                return Err(SessionPoolError::PoolClosed);
            };
            reserve.pop()
        };

        if let Some(session) = reused {
            PoolCounters::bump(&self.counters.hits);
            trace!("Reusing idle session");
            return Ok(session);
        }

        PoolCounters::bump(&self.counters.misses);
        debug!("Idle reserve empty, creating new session");
        match self.factory.create() {
            Ok(session) => Ok(session),
            Err(e) => {
                PoolCounters::bump(&self.counters.create_errors);
                Err(e)
            }
        }
    }

    /// Return a borrowed session for reuse
    ///
    /// If the idle reserve is full, or the pool has been shut down, the
    /// session is closed instead. Close failures are swallowed.
    pub fn put(&self, session: F::Session) {
        let rejected = {
            let mut reserve = self.reserve.write();
            match &mut *reserve {
                Some(reserve) => reserve
                    .push(session)
                    .err()
                    .map(|session| (session, "idle reserve full")),
                None => Some((session, "pool shut down")),
            }
        };

        match rejected {
            None => {
                PoolCounters::bump(&self.counters.returned);
                trace!("Returned session to idle reserve");
            }
            Some((session, reason)) => {
                PoolCounters::bump(&self.counters.discarded);
                debug!("Closing returned session: {}", reason);
                self.close(session);
            }
        }
    }

    /// Close a session without returning it to the pool
    ///
    /// For sessions the caller knows are broken. Best-effort: a failure to
    /// close is logged and otherwise ignored.
    pub fn close(&self, session: F::Session) {
        PoolCounters::bump(&self.counters.closed);
        if let Err(e) = session.close() {
            debug!("Failed to close session: {}", e);
        }
    }

    /// Close every idle session and stop storing returned ones
    ///
    /// Returns the number of idle sessions closed. Afterwards `get` fails with
    /// `PoolClosed` and `put` closes what it is given. Calling it again is a
    /// no-op returning 0.
    pub fn shutdown(&self) -> usize {
        let reserve = self.reserve.write().take();
        let Some(reserve) = reserve else {
            debug!("Session pool already shut down");
            return 0;
        };

        let sessions = reserve.into_sessions();
        let count = sessions.len();
        for session in sessions {
            self.close(session);
        }

        info!("Session pool shut down, closed {} idle sessions", count);
        count
    }

    /// Number of idle sessions right now
    ///
    /// Diagnostic only: the value may be stale as soon as it is read.
    pub fn len(&self) -> usize {
        match &*self.reserve.read() {
            Some(reserve) => reserve.len(),
            None => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_shut_down(&self) -> bool {
        self.reserve.read().is_none()
    }

    pub fn factory(&self) -> &F {
        &self.factory
    }

    /// Describe the configured capacity
    pub fn dump(&self) -> String {
        let description = format!("session pool capacity: {}", self.capacity);
        info!("{}", description);
        description
    }

    /// Get pool statistics
    pub fn stats(&self) -> PoolStats {
        let load = |counter: &AtomicU64| counter.load(Ordering::Relaxed);
        PoolStats {
            capacity: self.capacity,
            idle: self.len(),
            hits: load(&self.counters.hits),
            misses: load(&self.counters.misses),
            create_errors: load(&self.counters.create_errors),
            returned: load(&self.counters.returned),
            discarded: load(&self.counters.discarded),
            closed: load(&self.counters.closed),
            shut_down: self.is_shut_down(),
        }
    }
}

impl SessionPool<TcpDialer> {
    /// Build a TCP session pool from the `[endpoint]` and `[pool]` sections
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.pool.capacity,
            TcpDialer::new(config.endpoint.dial_config()),
        )
    }
}

impl<F: SessionFactory> fmt::Debug for SessionPool<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionPool")
            .field("capacity", &self.capacity)
            .field("idle", &self.len())
            .field("shut_down", &self.is_shut_down())
            .finish_non_exhaustive()
    }
}

/// Statistics about the session pool
#[derive(Debug, Clone, Serialize)]
pub struct PoolStats {
    /// Maximum number of idle sessions kept
    pub capacity: usize,
    /// Idle sessions at the time of the snapshot
    pub idle: usize,
    /// Gets served from the idle reserve
    pub hits: u64,
    /// Gets that called the factory
    pub misses: u64,
    /// Factory calls that failed
    pub create_errors: u64,
    /// Puts that stored the session
    pub returned: u64,
    /// Puts that closed the session instead
    pub discarded: u64,
    /// Sessions closed by the pool on any path
    pub closed: u64,
    pub shut_down: bool,
}
