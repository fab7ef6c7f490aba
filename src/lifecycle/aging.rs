use crate::config::ManagerConfig;
use crate::core::{LaunchUnitRef, ManagerError, Result, Role, ShardKey};
use crate::shard::tuning::{self, TuningOptions};
use crate::shard::InstanceDescriptor;
use chrono::NaiveDate;

/// The single month that ages into the retention window at `current`.
///
/// Only this month is a shrink target; anything older was handled by an
/// earlier run.
pub fn shrink_target(current: NaiveDate, retention_window: u32) -> Result<ShardKey> {
    let window = i32::try_from(retention_window).map_err(|_| {
        ManagerError::InvalidShardKey(format!("retention window {} is too large", retention_window))
    })?;
    ShardKey::from_date(current)?.shift(-window)
}

pub fn should_shrink(current: NaiveDate, shard: ShardKey, retention_window: u32) -> Result<bool> {
    Ok(shrink_target(current, retention_window)? == shard)
}

/// What a shrink request ended up doing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShrinkOutcome {
    /// The aged instance was not running, so nothing was touched.
    NotRunning { shard: ShardKey, unit: LaunchUnitRef },
    /// The instance was re-provisioned with a smaller footprint and restarted.
    Shrunk(InstanceDescriptor),
}

impl ShrinkOutcome {
    pub fn shard(&self) -> ShardKey {
        match self {
            ShrinkOutcome::NotRunning { shard, .. } => *shard,
            ShrinkOutcome::Shrunk(descriptor) => descriptor.shard,
        }
    }

    pub fn was_shrunk(&self) -> bool {
        matches!(self, ShrinkOutcome::Shrunk(_))
    }
}

/// Retention settings plus the footprint each role is reduced to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgingPolicy {
    retention_window: u32,
    master_reduced_memory: String,
    slave_reduced_memory: String,
}

impl AgingPolicy {
    pub fn new(config: &ManagerConfig) -> Self {
        Self {
            retention_window: config.retention_window,
            master_reduced_memory: config.master_reduced_memory.clone(),
            slave_reduced_memory: config.slave_reduced_memory.clone(),
        }
    }

    pub fn retention_window(&self) -> u32 {
        self.retention_window
    }

    /// Overrides for re-provisioning an aged instance.
    ///
    /// The memory knob is forced to the role's reduced footprint, even over a
    /// plain `xmsiz` in `overrides`. Only `memory_override` beats it.
    pub fn reduced_overrides(
        &self,
        role: Role,
        overrides: &TuningOptions,
        memory_override: Option<&str>,
    ) -> TuningOptions {
        let memory = memory_override.unwrap_or(match role {
            Role::Master => self.master_reduced_memory.as_str(),
            Role::Slave => self.slave_reduced_memory.as_str(),
        });
        overrides.clone().with(tuning::XMSIZ, memory)
    }
}
