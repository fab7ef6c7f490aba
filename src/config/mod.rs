use crate::core::{ManagerError, Result, Role};
use crate::shard::tuning::{self, TuningOptions};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Arithmetic that turns a month into a port.
///
/// `master = base_port + (year - epoch_year) * 12 + (month - 1)` and
/// `slave = master + slave_offset`. Only months whose index falls inside
/// `0..slave_offset` are routable, which keeps the master and slave ranges
/// disjoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PortScheme {
    pub base_port: u16,
    pub epoch_year: i32,
    pub slave_offset: u16,
}

impl Default for PortScheme {
    fn default() -> Self {
        Self {
            base_port: 10000,
            epoch_year: 1970,
            slave_offset: 2000,
        }
    }
}

impl PortScheme {
    /// Number of consecutive months this scheme can route.
    pub fn capacity(&self) -> u32 {
        self.slave_offset as u32
    }

    pub fn validate(&self) -> Result<()> {
        if self.slave_offset == 0 {
            return Err(ManagerError::InvalidConfig(
                "port_scheme.slave_offset must be > 0".to_string(),
            ));
        }
        let highest = self.base_port as u32 + 2 * self.slave_offset as u32 - 1;
        if highest > u16::MAX as u32 {
            return Err(ManagerError::InvalidConfig(format!(
                "port_scheme would assign port {} which exceeds {}",
                highest,
                u16::MAX
            )));
        }
        Ok(())
    }
}

/// Fleet-wide settings.
///
/// Loaded once (usually from a JSON file) and handed to each component at
/// construction. Nothing in the crate mutates it afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerConfig {
    /// Host the instances listen on and clients connect to
    pub host: String,

    /// Host slaves replicate from; defaults to `host`
    pub replication_host: Option<String>,

    /// Port of the legacy, unsharded instance
    pub default_port: u16,

    pub data_directory: PathBuf,
    pub log_directory: PathBuf,
    pub script_directory: PathBuf,

    /// Path of the `ttserver` executable written into launch units
    pub server_binary: PathBuf,

    pub port_scheme: PortScheme,

    pub master_defaults: TuningOptions,
    pub slave_defaults: TuningOptions,

    /// Months after which an instance gets its memory reduced
    pub retention_window: u32,

    pub master_reduced_memory: String,
    pub slave_reduced_memory: String,

    /// Connect timeout in milliseconds for the TCP connector
    pub connect_timeout_ms: Option<u64>,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            replication_host: None,
            default_port: 1978, // ttserver's stock port
            data_directory: PathBuf::from("/data/tokyotyrant"),
            log_directory: PathBuf::from("/var/log/tokyotyrant"),
            script_directory: PathBuf::from("/etc/init"),
            server_binary: PathBuf::from("/usr/bin/ttserver"),
            port_scheme: PortScheme::default(),
            master_defaults: TuningOptions::new()
                .with(tuning::THNUM, "8")
                .with(tuning::BNUM, "8000000")
                .with(tuning::XMSIZ, "1073741824"),
            slave_defaults: TuningOptions::new()
                .with(tuning::THNUM, "4")
                .with(tuning::BNUM, "8000000")
                .with(tuning::XMSIZ, "536870912"),
            retention_window: 2,
            master_reduced_memory: "268435456".to_string(), // 256 MiB
            slave_reduced_memory: "134217728".to_string(),  // 128 MiB
            connect_timeout_ms: None,
        }
    }
}

impl ManagerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a JSON config file. Missing fields keep their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|e| ManagerError::filesystem(path, e))?;
        let config: Self = serde_json::from_str(&raw).map_err(|e| {
            ManagerError::InvalidConfig(format!("{}: {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Set the host
    pub fn host(mut self, host: &str) -> Self {
        self.host = host.to_string();
        self
    }

    /// Set the host slaves replicate from
    pub fn replication_host(mut self, host: &str) -> Self {
        self.replication_host = Some(host.to_string());
        self
    }

    /// Set the legacy port
    pub fn default_port(mut self, port: u16) -> Self {
        self.default_port = port;
        self
    }

    pub fn data_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_directory = dir.into();
        self
    }

    pub fn log_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_directory = dir.into();
        self
    }

    pub fn script_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.script_directory = dir.into();
        self
    }

    pub fn server_binary(mut self, path: impl Into<PathBuf>) -> Self {
        self.server_binary = path.into();
        self
    }

    pub fn port_scheme(mut self, scheme: PortScheme) -> Self {
        self.port_scheme = scheme;
        self
    }

    /// Replace the default tuning of a role
    pub fn defaults_for(mut self, role: Role, options: TuningOptions) -> Self {
        match role {
            Role::Master => self.master_defaults = options,
            Role::Slave => self.slave_defaults = options,
        }
        self
    }

    pub fn retention_window(mut self, months: u32) -> Self {
        self.retention_window = months;
        self
    }

    /// Set the footprint an aging instance of `role` is shrunk to
    pub fn reduced_memory(mut self, role: Role, size: &str) -> Self {
        match role {
            Role::Master => self.master_reduced_memory = size.to_string(),
            Role::Slave => self.slave_reduced_memory = size.to_string(),
        }
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout_ms = Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));
        self
    }

    pub fn reduced_memory_for(&self, role: Role) -> &str {
        match role {
            Role::Master => &self.master_reduced_memory,
            Role::Slave => &self.slave_reduced_memory,
        }
    }

    pub fn effective_replication_host(&self) -> &str {
        self.replication_host.as_deref().unwrap_or(&self.host)
    }

    pub fn connect_timeout_duration(&self) -> Option<Duration> {
        self.connect_timeout_ms.map(Duration::from_millis)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(ManagerError::InvalidConfig("host cannot be empty".to_string()));
        }

        if let Some(replication_host) = &self.replication_host {
            if replication_host.trim().is_empty() {
                return Err(ManagerError::InvalidConfig(
                    "replication_host cannot be empty when set".to_string(),
                ));
            }
        }

        if self.default_port == 0 {
            return Err(ManagerError::InvalidConfig(
                "default_port must be > 0".to_string(),
            ));
        }

        self.port_scheme.validate()?;

        let sharded = self.port_scheme.base_port as u32
            ..self.port_scheme.base_port as u32 + 2 * self.port_scheme.slave_offset as u32;
        if sharded.contains(&(self.default_port as u32)) {
            return Err(ManagerError::InvalidConfig(format!(
                "default_port {} collides with the sharded port range {}..{}",
                self.default_port, sharded.start, sharded.end
            )));
        }

        if self.retention_window == 0 {
            return Err(ManagerError::InvalidConfig(
                "retention_window must be at least one month".to_string(),
            ));
        }

        if self.connect_timeout_ms == Some(0) {
            return Err(ManagerError::InvalidConfig(
                "connect_timeout_ms must be > 0 when set".to_string(),
            ));
        }

        for role in Role::ALL {
            let reduced = self.reduced_memory_for(role);
            if reduced.trim().is_empty() {
                return Err(ManagerError::InvalidConfig(format!(
                    "{}_reduced_memory cannot be empty",
                    role
                )));
            }
            tuning::check_token(&format!("{}_reduced_memory", role), reduced)
                .map_err(ManagerError::InvalidConfig)?;
        }

        for (name, defaults) in [("master_defaults", &self.master_defaults), ("slave_defaults", &self.slave_defaults)] {
            defaults
                .validate()
                .map_err(|e| ManagerError::InvalidConfig(format!("{}: {}", name, e)))?;
        }

        Ok(())
    }
}
