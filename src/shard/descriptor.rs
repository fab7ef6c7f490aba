use super::resolver::ShardResolver;
use super::tuning::TuningOptions;
use crate::config::ManagerConfig;
use crate::core::{DataFileRef, LaunchUnitRef, ManagerError, PortAssignment, Result, Role, ShardKey};
use std::path::PathBuf;

/// Where a slave pulls its updates from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplicationSource {
    pub host: String,
    pub port: u16,
    /// File the slave records its replication position in
    pub timestamp_file: PathBuf,
}

/// Everything needed to launch one instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceDescriptor {
    pub role: Role,
    pub shard: ShardKey,
    pub ports: PortAssignment,
    pub data_file: DataFileRef,
    pub unit: LaunchUnitRef,
    pub log_file: PathBuf,
    pub update_log: PathBuf,
    pub tuning: TuningOptions,
    /// Set for slaves only, always the same month's master
    pub replication: Option<ReplicationSource>,
}

impl InstanceDescriptor {
    /// Port this instance listens on.
    pub fn listen_port(&self) -> u16 {
        self.ports.port(self.role)
    }
}

/// Composes [`InstanceDescriptor`]s from the configured role defaults.
#[derive(Debug, Clone)]
pub struct DescriptorBuilder {
    resolver: ShardResolver,
    master_defaults: TuningOptions,
    slave_defaults: TuningOptions,
    replication_host: String,
}

impl DescriptorBuilder {
    pub fn new(config: &ManagerConfig) -> Self {
        Self {
            resolver: ShardResolver::new(config),
            master_defaults: config.master_defaults.clone(),
            slave_defaults: config.slave_defaults.clone(),
            replication_host: config.effective_replication_host().to_string(),
        }
    }

    pub fn resolver(&self) -> &ShardResolver {
        &self.resolver
    }

    pub fn defaults(&self, role: Role) -> &TuningOptions {
        match role {
            Role::Master => &self.master_defaults,
            Role::Slave => &self.slave_defaults,
        }
    }

    pub fn build(&self, role: Role, shard: ShardKey, overrides: &TuningOptions) -> Result<InstanceDescriptor> {
        let ports = self.resolver.ports_for(shard)?;
        let tuning = self.defaults(role).merged_with(overrides);
        tuning.validate().map_err(ManagerError::InvalidConfig)?;

        let replication = match role {
            Role::Master => None,
            Role::Slave => Some(ReplicationSource {
                host: self.replication_host.clone(),
                port: ports.master_port,
                timestamp_file: self.resolver.replication_stamp_for(shard),
            }),
        };

        Ok(InstanceDescriptor {
            role,
            shard,
            ports,
            data_file: self.resolver.data_file_for(role, shard),
            unit: self.resolver.unit_for(role, shard),
            log_file: self.resolver.log_file_for(role, shard),
            update_log: self.resolver.update_log_for(role, shard),
            tuning,
            replication,
        })
    }
}
