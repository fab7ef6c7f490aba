// ============================================================================
// Tyrant Manager Library
// ============================================================================

pub mod config;
pub mod connection;
pub mod core;
pub mod lifecycle;
pub mod shard;
pub mod supervisor;

// Re-export main types for convenience
pub use crate::config::{ManagerConfig, PortScheme};
pub use crate::core::{DataFileRef, LaunchUnitRef, ManagerError, PortAssignment, Result, Role, ShardKey};
pub use shard::{DescriptorBuilder, InstanceDescriptor, ShardResolver, TuningOptions};

// Re-export lifecycle and routing API
pub use connection::{
    ConnectionResolver, KvConnector, ResolvedConnection,
    tcp::{TcpConnector, TyrantConnection},
};
pub use lifecycle::{AgingPolicy, LifecycleController, ShrinkOutcome, should_shrink, shrink_target};
pub use supervisor::{
    CommandOutput, CommandRunner, Filesystem, LocalFilesystem, ProcessSupervisor, ShellRunner,
    UpstartSupervisor,
};

use tracing::debug;

// ============================================================================
// High-level Fleet API
// ============================================================================

/// The whole fleet as seen from one host.
///
/// Bundles the lifecycle controller and the connection resolver built from a
/// single [`ManagerConfig`].
///
/// # Examples
///
/// ```no_run
/// use tyrant_manager::{Fleet, ManagerConfig, Role, ShardKey, TuningOptions};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let fleet = Fleet::local(ManagerConfig::default().host("tt.example.com"))?;
/// let month: ShardKey = "2012-02".parse()?;
///
/// fleet.controller().bring_up(Role::Master, month, &TuningOptions::new())?;
/// let conn = fleet.connections().resolve(month.first_day())?;
/// println!("connected on port {}", conn.port());
/// # Ok(())
/// # }
/// ```
pub struct Fleet<S, F, K> {
    config: ManagerConfig,
    controller: LifecycleController<S, F>,
    connections: ConnectionResolver<K>,
}

impl Fleet<UpstartSupervisor<LocalFilesystem, ShellRunner>, LocalFilesystem, TcpConnector> {
    /// Fleet using local files, Upstart and plain TCP.
    pub fn local(config: ManagerConfig) -> Result<Self> {
        let supervisor = UpstartSupervisor::new(&config, LocalFilesystem::new(), ShellRunner::new());
        let connector = TcpConnector::new(&config);
        Self::with_collaborators(config, supervisor, LocalFilesystem::new(), connector)
    }
}

impl<S: ProcessSupervisor, F: Filesystem, K: KvConnector> Fleet<S, F, K> {
    pub fn with_collaborators(config: ManagerConfig, supervisor: S, fs: F, connector: K) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            controller: LifecycleController::new(&config, supervisor, fs),
            connections: ConnectionResolver::new(&config, connector),
            config,
        })
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    pub fn controller(&self) -> &LifecycleController<S, F> {
        &self.controller
    }

    pub fn connections(&self) -> &ConnectionResolver<K> {
        &self.connections
    }

    /// Monthly maintenance for `today`: bring up whichever role of the
    /// current month is not running yet, then shrink that role's instance in
    /// the month leaving the retention window.
    ///
    /// A role whose current month is already running was rotated earlier, so
    /// its aged month is left alone. Running this daily shrinks each aged
    /// instance once.
    pub fn rotate(&self, today: chrono::NaiveDate, overrides: &TuningOptions) -> Result<Vec<ShrinkOutcome>> {
        let current = ShardKey::from_date(today)?;
        let window = self.controller.aging_policy().retention_window();

        let mut rotated = Vec::new();
        for role in Role::ALL {
            if self.controller.is_running(role, current)? {
                debug!("{} {} already running, skipping rotation", role, current);
                continue;
            }
            self.controller.bring_up(role, current, overrides)?;
            rotated.push(role);
        }

        rotated
            .into_iter()
            .map(|role| self.controller.shrink_aging_instance(role, today, window, overrides, None))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_fleet_rejects_invalid_config() {
        assert!(matches!(
            Fleet::local(ManagerConfig::default().host("")),
            Err(ManagerError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_local_fleet_uses_config() {
        let fleet = Fleet::local(ManagerConfig::default().retention_window(5)).unwrap();
        assert_eq!(fleet.config().retention_window, 5);
        assert_eq!(fleet.controller().aging_policy().retention_window(), 5);
    }
}
