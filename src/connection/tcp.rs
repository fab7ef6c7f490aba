use super::KvConnector;
use crate::config::ManagerConfig;
use crate::core::{ManagerError, Result};
use std::io::ErrorKind;
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

/// Plain TCP connector for `ttserver` instances.
#[derive(Debug, Clone, Default)]
pub struct TcpConnector {
    connect_timeout: Option<Duration>,
}

impl TcpConnector {
    pub fn new(config: &ManagerConfig) -> Self {
        Self {
            connect_timeout: config.connect_timeout_duration(),
        }
    }

    fn open(&self, addr: &SocketAddr) -> std::io::Result<TcpStream> {
        match self.connect_timeout {
            Some(timeout) => TcpStream::connect_timeout(addr, timeout),
            None => TcpStream::connect(addr),
        }
    }
}

impl KvConnector for TcpConnector {
    type Connection = TyrantConnection;

    fn connect(&self, host: &str, port: u16) -> Result<TyrantConnection> {
        let network_error = |source: std::io::Error| ManagerError::Network {
            host: host.to_string(),
            port,
            source,
        };

        let addrs = (host, port).to_socket_addrs().map_err(network_error)?;

        let mut last_error = None;
        for addr in addrs {
            match self.open(&addr) {
                Ok(stream) => {
                    stream.set_nodelay(true).map_err(network_error)?;
                    return Ok(TyrantConnection::new(host, port, stream));
                }
                Err(e) => last_error = Some(e),
            }
        }

        let error = last_error.unwrap_or_else(|| {
            std::io::Error::new(ErrorKind::NotFound, format!("{} did not resolve", host))
        });
        if error.kind() == ErrorKind::ConnectionRefused {
            return Err(ManagerError::ConnectionRefused {
                host: host.to_string(),
                port,
                code: error.raw_os_error().unwrap_or(-1),
            });
        }
        Err(network_error(error))
    }
}

/// An open connection to one `ttserver` instance.
///
/// Closed when dropped.
#[derive(Debug)]
pub struct TyrantConnection {
    host: String,
    port: u16,
    stream: Option<TcpStream>,
}

impl TyrantConnection {
    fn new(host: &str, port: u16, stream: TcpStream) -> Self {
        Self {
            host: host.to_string(),
            port,
            stream: Some(stream),
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn is_active(&self) -> bool {
        self.stream.is_some()
    }

    /// Underlying stream for speaking the server protocol.
    pub fn stream(&mut self) -> Result<&mut TcpStream> {
        let (host, port) = (self.host.clone(), self.port);
        self.stream.as_mut().ok_or_else(|| ManagerError::Connection {
            host,
            port,
            code: -1,
            message: "Connection is closed".to_string(),
        })
    }

    pub fn close(&mut self) -> Result<()> {
        if let Some(stream) = self.stream.take() {
            match stream.shutdown(Shutdown::Both) {
                Ok(()) => {}
                // the peer already went away
                Err(e) if e.kind() == ErrorKind::NotConnected => {}
                Err(source) => {
                    return Err(ManagerError::Network {
                        host: self.host.clone(),
                        port: self.port,
                        source,
                    });
                }
            }
        }
        Ok(())
    }
}

impl Drop for TyrantConnection {
    fn drop(&mut self) {
        let _ = self.close();
    }
}
