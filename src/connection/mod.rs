pub mod tcp;

use crate::config::ManagerConfig;
use crate::core::{ManagerError, Result, ShardKey};
use crate::shard::ShardResolver;
use chrono::NaiveDate;
use std::ops::{Deref, DerefMut};
use tracing::debug;

pub use tcp::{TcpConnector, TyrantConnection};

/// Opens connections to a key-value server.
///
/// A refused connection must be reported as
/// [`ManagerError::ConnectionRefused`]; that is the only failure the
/// resolver recovers from.
pub trait KvConnector {
    type Connection;

    fn connect(&self, host: &str, port: u16) -> Result<Self::Connection>;
}

impl<T: KvConnector + ?Sized> KvConnector for &T {
    type Connection = T::Connection;

    fn connect(&self, host: &str, port: u16) -> Result<Self::Connection> {
        (**self).connect(host, port)
    }
}

/// A live connection together with where it ended up.
#[derive(Debug)]
pub struct ResolvedConnection<C> {
    connection: C,
    port: u16,
    fallback: bool,
}

impl<C> ResolvedConnection<C> {
    pub fn port(&self) -> u16 {
        self.port
    }

    /// True when the month had no instance and the legacy port was used.
    pub fn is_fallback(&self) -> bool {
        self.fallback
    }

    pub fn into_inner(self) -> C {
        self.connection
    }
}

impl<C> Deref for ResolvedConnection<C> {
    type Target = C;

    fn deref(&self) -> &C {
        &self.connection
    }
}

impl<C> DerefMut for ResolvedConnection<C> {
    fn deref_mut(&mut self) -> &mut C {
        &mut self.connection
    }
}

/// Finds the server holding a date's data.
///
/// The month's master port is tried first. If that connection is refused the
/// legacy instance on the default port is tried once. Any other failure on
/// the first attempt is returned as is.
pub struct ConnectionResolver<K> {
    resolver: ShardResolver,
    host: String,
    default_port: u16,
    connector: K,
}

impl<K: KvConnector> ConnectionResolver<K> {
    pub fn new(config: &ManagerConfig, connector: K) -> Self {
        Self {
            resolver: ShardResolver::new(config),
            host: config.host.clone(),
            default_port: config.default_port,
            connector,
        }
    }

    pub fn resolve(&self, date: NaiveDate) -> Result<ResolvedConnection<K::Connection>> {
        let shard = ShardKey::from_date(date)?;
        let port = self.resolver.ports_for(shard)?.master_port;

        match self.connector.connect(&self.host, port) {
            Ok(connection) => {
                debug!("Connected to {} shard at {}:{}", shard, self.host, port);
                Ok(ResolvedConnection {
                    connection,
                    port,
                    fallback: false,
                })
            }
            Err(ManagerError::ConnectionRefused { .. }) => {
                debug!(
                    "No instance for {} on port {}, falling back to {}",
                    shard, port, self.default_port
                );
                self.connect_legacy()
            }
            Err(e) => Err(e),
        }
    }

    fn connect_legacy(&self) -> Result<ResolvedConnection<K::Connection>> {
        match self.connector.connect(&self.host, self.default_port) {
            Ok(connection) => Ok(ResolvedConnection {
                connection,
                port: self.default_port,
                fallback: true,
            }),
            Err(e) => Err(ManagerError::Connection {
                host: self.host.clone(),
                port: self.default_port,
                code: error_code(&e),
                message: e.to_string(),
            }),
        }
    }
}

fn error_code(error: &ManagerError) -> i32 {
    match error {
        ManagerError::ConnectionRefused { code, .. } => *code,
        ManagerError::Connection { code, .. } => *code,
        ManagerError::Network { source, .. } => source.raw_os_error().unwrap_or(-1),
        _ => -1,
    }
}
