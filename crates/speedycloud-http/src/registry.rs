//! Explicitly owned registry of connection pools, one per endpoint.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use dashmap::DashMap;
use speedycloud_core::{ClientConfig, Endpoint, SpeedyCloudError, SpeedyCloudResult};
use tracing::info;

use crate::connector::HttpConnector;
use crate::pool::ConnectionPool;
use crate::transport::Connector;

/// Thread-safe map from [`Endpoint`] to its shared [`ConnectionPool`].
///
/// The first request for an endpoint creates its pool; later requests share
/// it. [`PoolRegistry::shutdown`] closes every pool and makes the registry
/// refuse new ones.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// use speedycloud_core::{Endpoint, Protocol};
/// use speedycloud_http::{HttpConnector, PoolRegistry};
///
/// let registry = PoolRegistry::new(Arc::new(HttpConnector::plain(Duration::from_secs(5))), 10);
/// let endpoint = Endpoint::new("osc.speedycloud.net", Protocol::Http);
/// let a = registry.pool(&endpoint).unwrap();
/// let b = registry.pool(&endpoint).unwrap();
/// assert!(Arc::ptr_eq(&a, &b));
/// ```
#[derive(Debug)]
pub struct PoolRegistry {
    pools: DashMap<Endpoint, Arc<ConnectionPool>>,
    connector: Arc<dyn Connector>,
    pool_size: usize,
    shut_down: AtomicBool,
}

impl PoolRegistry {
    /// Create an empty registry whose pools use `connector` and keep
    /// `pool_size` handles as their floor.
    #[must_use]
    pub fn new(connector: Arc<dyn Connector>, pool_size: usize) -> Self {
        Self {
            pools: DashMap::new(),
            connector,
            pool_size,
            shut_down: AtomicBool::new(false),
        }
    }

    /// Create a registry with a hyper connector configured from `config`.
    ///
    /// # Errors
    ///
    /// Fails with a configuration error for an unsupported protocol or, for
    /// `https`, when no TLS root certificates are available.
    pub fn from_config(config: &ClientConfig) -> SpeedyCloudResult<Self> {
        let protocol = config.protocol.parse()?;
        let connector = HttpConnector::for_protocol(protocol, config.connect_timeout())?;
        Ok(Self::new(Arc::new(connector), config.pool_size))
    }

    /// Get or create the pool for `endpoint`.
    ///
    /// # Errors
    ///
    /// Fails with [`SpeedyCloudError::PoolShutdown`] after [`PoolRegistry::shutdown`],
    /// or with a configuration error when the connector cannot reach the
    /// endpoint's protocol.
    pub fn pool(&self, endpoint: &Endpoint) -> SpeedyCloudResult<Arc<ConnectionPool>> {
        if self.is_shut_down() {
            return Err(SpeedyCloudError::PoolShutdown(endpoint.to_string()));
        }
        if !self.connector.supports(endpoint.protocol()) {
            return Err(SpeedyCloudError::Config(format!(
                "connector cannot reach {} endpoints",
                endpoint.protocol()
            )));
        }

        let pool = self
            .pools
            .entry(endpoint.clone())
            .or_insert_with(|| {
                Arc::new(ConnectionPool::new(
                    endpoint.clone(),
                    self.pool_size,
                    Arc::clone(&self.connector),
                ))
            })
            .clone();

        // Lost a race with shutdown: do not hand out a pool nobody will close.
        if self.is_shut_down() {
            pool.close();
            return Err(SpeedyCloudError::PoolShutdown(endpoint.to_string()));
        }
        Ok(pool)
    }

    /// Get the pool for `endpoint`, if one exists.
    #[must_use]
    pub fn get(&self, endpoint: &Endpoint) -> Option<Arc<ConnectionPool>> {
        self.pools.get(endpoint).map(|pool| pool.clone())
    }

    /// Close every pool and refuse further lookups.
    pub fn shutdown(&self) {
        if self.shut_down.swap(true, Ordering::SeqCst) {
            return;
        }
        let pools: Vec<_> = self.pools.iter().map(|entry| entry.value().clone()).collect();
        self.pools.clear();
        for pool in &pools {
            pool.close();
        }
        info!(pools = pools.len(), "connection pool registry shut down");
    }

    /// Whether [`PoolRegistry::shutdown`] has been called.
    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }

    /// Number of live pools.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pools.len()
    }

    /// Whether no pool has been created yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pools.is_empty()
    }
}
