//! Per-endpoint connection pool.
//!
//! The pool starts with `initial_size` lazily-connected handles and grows by
//! one whenever `acquire` finds nothing idle. On release it shrinks back
//! toward `initial_size`, closing the least recently released idle handles
//! first. A poisoned handle is closed and forgotten; if that leaves the pool
//! below its floor, a fresh lazy handle takes its place.
//!
//! All bookkeeping happens under one short-lived lock. Network I/O happens
//! on the checked-out handle, never while the lock is held.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use bytes::Bytes;
use http::{Request, Response};
use parking_lot::Mutex;
use speedycloud_core::{Endpoint, SpeedyCloudError, SpeedyCloudResult, TransportError};
use tracing::{debug, warn};

use crate::transport::{Connector, TransportConnection};

/// Point-in-time counters for one pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    /// The floor the pool shrinks back to.
    pub initial_size: usize,
    /// Handles currently tracked (idle plus in use).
    pub size: usize,
    /// Handles waiting to be acquired.
    pub idle: usize,
    /// Handles checked out.
    pub in_use: usize,
}

#[derive(Debug)]
struct PoolState {
    /// Front is the least recently released handle, back the most recent.
    idle: VecDeque<TransportConnection>,
    in_use: HashSet<u64>,
    next_id: u64,
    closed: bool,
}

impl PoolState {
    fn size(&self) -> usize {
        self.idle.len() + self.in_use.len()
    }
}

/// A bounded-at-rest pool of connections to one endpoint.
#[derive(Debug)]
pub struct ConnectionPool {
    endpoint: Endpoint,
    initial_size: usize,
    connector: Arc<dyn Connector>,
    state: Mutex<PoolState>,
}

impl ConnectionPool {
    /// Create a pool holding `initial_size` unconnected handles.
    #[must_use]
    pub fn new(endpoint: Endpoint, initial_size: usize, connector: Arc<dyn Connector>) -> Self {
        let idle = (1..=initial_size as u64)
            .map(|id| TransportConnection::new(id, endpoint.clone(), Arc::clone(&connector)))
            .collect();

        Self {
            endpoint,
            initial_size,
            connector,
            state: Mutex::new(PoolState {
                idle,
                in_use: HashSet::new(),
                next_id: initial_size as u64 + 1,
                closed: false,
            }),
        }
    }

    /// The endpoint every handle in this pool talks to.
    #[must_use]
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Current counters.
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        let state = self.state.lock();
        PoolStats {
            initial_size: self.initial_size,
            size: state.size(),
            idle: state.idle.len(),
            in_use: state.in_use.len(),
        }
    }

    /// Whether [`ConnectionPool::close`] has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Check out a handle, growing the pool by one if none is idle.
    ///
    /// The most recently released idle handle is preferred, since it is the
    /// one most likely to still hold a live socket.
    ///
    /// # Errors
    ///
    /// Fails with [`SpeedyCloudError::PoolShutdown`] once the pool is closed.
    pub fn acquire(self: &Arc<Self>) -> SpeedyCloudResult<PooledConnection> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(SpeedyCloudError::PoolShutdown(self.endpoint.to_string()));
        }

        let connection = match state.idle.pop_back() {
            Some(connection) => connection,
            None => {
                let connection = self.new_handle(&mut state);
                debug!(
                    endpoint = %self.endpoint,
                    size = state.size() + 1,
                    "no idle connection, expanding pool"
                );
                connection
            }
        };
        state.in_use.insert(connection.id());
        drop(state);

        Ok(PooledConnection {
            pool: Arc::clone(self),
            connection: Some(connection),
        })
    }

    /// Close every handle and refuse further acquisitions.
    ///
    /// Handles checked out at this point are closed when they come back.
    pub fn close(&self) {
        let mut state = self.state.lock();
        state.closed = true;
        let idle = std::mem::take(&mut state.idle);
        let in_use = state.in_use.len();
        drop(state);

        let closed = idle.len();
        for mut connection in idle {
            connection.close();
        }
        debug!(endpoint = %self.endpoint, closed, in_use, "connection pool closed");
    }

    fn new_handle(&self, state: &mut PoolState) -> TransportConnection {
        let id = state.next_id;
        state.next_id += 1;
        TransportConnection::new(id, self.endpoint.clone(), Arc::clone(&self.connector))
    }

    fn release(&self, mut connection: TransportConnection) {
        let mut state = self.state.lock();
        if !state.in_use.remove(&connection.id()) {
            warn!(
                endpoint = %self.endpoint,
                connection = connection.id(),
                "released a connection this pool does not track"
            );
            return;
        }
        if state.closed {
            drop(state);
            connection.close();
            return;
        }

        state.idle.push_back(connection);

        // Shrink from the least recently released end.
        let mut evicted = Vec::new();
        while state.size() > self.initial_size {
            match state.idle.pop_front() {
                Some(connection) => evicted.push(connection),
                None => break,
            }
        }
        let size = state.size();
        drop(state);

        if !evicted.is_empty() {
            debug!(endpoint = %self.endpoint, closed = evicted.len(), size, "shrinking pool");
            for mut connection in evicted {
                connection.close();
            }
        }
    }

    fn poison(&self, mut connection: TransportConnection) {
        let mut state = self.state.lock();
        let tracked = state.in_use.remove(&connection.id());
        if tracked && !state.closed && state.size() < self.initial_size {
            let replacement = self.new_handle(&mut state);
            state.idle.push_front(replacement);
        }
        let size = state.size();
        drop(state);

        connection.close();
        debug!(
            endpoint = %self.endpoint,
            connection = connection.id(),
            size,
            "discarded poisoned connection"
        );
    }
}

/// A checked-out connection. Dropping it returns the handle to its pool.
#[derive(Debug)]
pub struct PooledConnection {
    pool: Arc<ConnectionPool>,
    connection: Option<TransportConnection>,
}

impl PooledConnection {
    /// Id of the underlying handle.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.connection.as_ref().map_or(0, TransportConnection::id)
    }

    /// Whether the underlying handle holds an open socket.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connection
            .as_ref()
            .is_some_and(TransportConnection::is_connected)
    }

    /// Send one request over this connection.
    pub async fn send(&mut self, request: Request<Bytes>) -> Result<Response<Bytes>, TransportError> {
        match self.connection.as_mut() {
            Some(connection) => connection.send(request).await,
            None => Err(TransportError::Connection(
                "connection already returned to its pool".into(),
            )),
        }
    }

    /// Discard this connection instead of returning it to the pool.
    pub fn poison(mut self) {
        if let Some(connection) = self.connection.take() {
            self.pool.poison(connection);
        }
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        if let Some(connection) = self.connection.take() {
            self.pool.release(connection);
        }
    }
}
