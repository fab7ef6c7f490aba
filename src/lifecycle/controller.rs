use super::aging::{self, AgingPolicy, ShrinkOutcome};
use crate::config::ManagerConfig;
use crate::core::{Result, Role, ShardKey};
use crate::shard::{DescriptorBuilder, InstanceDescriptor, ShardResolver, TuningOptions};
use crate::supervisor::{Filesystem, ProcessSupervisor};
use chrono::NaiveDate;
use tracing::{debug, info};

/// Drives instances through `absent → provisioned → running ⇄ stopped`,
/// the memory shrink of aging months, and explicit decommissioning.
///
/// Every operation is a straight sequence of collaborator calls. Errors
/// from the supervisor or filesystem are returned as they are; nothing is
/// retried here. Callers must not run two operations on the same
/// (role, month) at once.
pub struct LifecycleController<S, F> {
    builder: DescriptorBuilder,
    aging: AgingPolicy,
    supervisor: S,
    fs: F,
}

impl<S: ProcessSupervisor, F: Filesystem> LifecycleController<S, F> {
    pub fn new(config: &ManagerConfig, supervisor: S, fs: F) -> Self {
        Self {
            builder: DescriptorBuilder::new(config),
            aging: AgingPolicy::new(config),
            supervisor,
            fs,
        }
    }

    pub fn resolver(&self) -> &ShardResolver {
        self.builder.resolver()
    }

    pub fn aging_policy(&self) -> &AgingPolicy {
        &self.aging
    }

    /// Write (or overwrite) the launch unit for one instance.
    pub fn provision_launch_spec(
        &self,
        role: Role,
        shard: ShardKey,
        overrides: &TuningOptions,
    ) -> Result<InstanceDescriptor> {
        let descriptor = self.builder.build(role, shard, overrides)?;
        self.supervisor.install(&descriptor.unit, &descriptor)?;
        info!(
            "Provisioned {} (port {}, data {})",
            descriptor.unit,
            descriptor.listen_port(),
            descriptor.data_file
        );
        Ok(descriptor)
    }

    pub fn remove_launch_spec(&self, role: Role, shard: ShardKey) -> Result<()> {
        let unit = self.resolver().unit_for(role, shard);
        self.supervisor.remove(&unit)?;
        debug!("Removed launch unit {}", unit);
        Ok(())
    }

    pub fn remove_data_file(&self, role: Role, shard: ShardKey) -> Result<()> {
        let data_file = self.resolver().data_file_for(role, shard);
        self.fs.delete(data_file.path())?;
        debug!("Removed data file {}", data_file);
        Ok(())
    }

    pub fn start(&self, role: Role, shard: ShardKey) -> Result<()> {
        let unit = self.resolver().unit_for(role, shard);
        self.supervisor.start(&unit)?;
        info!("Started {}", unit);
        Ok(())
    }

    pub fn stop(&self, role: Role, shard: ShardKey) -> Result<()> {
        let unit = self.resolver().unit_for(role, shard);
        self.supervisor.stop(&unit)?;
        info!("Stopped {}", unit);
        Ok(())
    }

    pub fn is_running(&self, role: Role, shard: ShardKey) -> Result<bool> {
        self.supervisor
            .is_running(&self.resolver().unit_for(role, shard))
    }

    /// Provision and start an instance, typically when its month becomes
    /// current.
    pub fn bring_up(&self, role: Role, shard: ShardKey, overrides: &TuningOptions) -> Result<InstanceDescriptor> {
        let descriptor = self.provision_launch_spec(role, shard, overrides)?;
        self.supervisor.start(&descriptor.unit)?;
        info!("Brought up {}", descriptor.unit);
        Ok(descriptor)
    }

    /// Remove an instance's launch unit and data file.
    ///
    /// This is the only way an instance goes back to absent; aging never
    /// deletes anything.
    pub fn decommission(&self, role: Role, shard: ShardKey) -> Result<()> {
        self.remove_launch_spec(role, shard)?;
        self.remove_data_file(role, shard)?;
        info!("Decommissioned {} {}", role, shard);
        Ok(())
    }

    /// Restart the instance that is `retention_window` months older than
    /// `anchor` with a reduced memory footprint.
    ///
    /// An aged instance that is not running is left alone and reported as
    /// [`ShrinkOutcome::NotRunning`].
    pub fn shrink_aging_instance(
        &self,
        role: Role,
        anchor: NaiveDate,
        retention_window: u32,
        overrides: &TuningOptions,
        memory_override: Option<&str>,
    ) -> Result<ShrinkOutcome> {
        let shard = aging::shrink_target(anchor, retention_window)?;
        let unit = self.resolver().unit_for(role, shard);

        if !self.supervisor.is_running(&unit)? {
            debug!("{} is not running, nothing to shrink", unit);
            return Ok(ShrinkOutcome::NotRunning { shard, unit });
        }

        let reduced = self.aging.reduced_overrides(role, overrides, memory_override);
        let descriptor = self.provision_launch_spec(role, shard, &reduced)?;

        self.supervisor.stop(&descriptor.unit)?;
        self.supervisor.start(&descriptor.unit)?;
        info!(
            "Shrunk {} to xmsiz={}",
            descriptor.unit,
            descriptor.tuning.get(crate::shard::tuning::XMSIZ).unwrap_or("?")
        );
        Ok(ShrinkOutcome::Shrunk(descriptor))
    }
}
