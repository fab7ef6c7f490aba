use super::{CommandOutput, CommandRunner, Filesystem, ProcessSupervisor};
use crate::config::ManagerConfig;
use crate::core::{LaunchUnitRef, ManagerError, Result};
use crate::shard::InstanceDescriptor;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Render the Upstart job that runs `descriptor` in the foreground.
pub fn render_upstart_job(descriptor: &InstanceDescriptor, server_binary: &Path, host: &str) -> String {
    let mut exec = format!(
        "{} -host {} -port {}",
        server_binary.display(),
        host,
        descriptor.listen_port()
    );

    for (flag, value) in descriptor.tuning.server_flags() {
        let _ = write!(exec, " -{} {}", flag, value);
    }

    let _ = write!(
        exec,
        " -log {} -ulog {}",
        descriptor.log_file.display(),
        descriptor.update_log.display()
    );

    if let Some(source) = &descriptor.replication {
        let _ = write!(
            exec,
            " -mhost {} -mport {} -rts {}",
            source.host,
            source.port,
            source.timestamp_file.display()
        );
    }

    let _ = write!(exec, " {}", descriptor.data_file);
    for (knob, value) in descriptor.tuning.database_params() {
        let _ = write!(exec, "#{}={}", knob, value);
    }

    format!(
        "# {unit}\n\
         description \"ttserver {role} {shard}\"\n\
         \n\
         start on runlevel [2345]\n\
         stop on runlevel [!2345]\n\
         \n\
         respawn\n\
         \n\
         exec {exec}\n",
        unit = descriptor.unit,
        role = descriptor.role,
        shard = descriptor.shard,
        exec = exec,
    )
}

/// Upstart-style supervisor: job files in the script directory, controlled
/// through the `start`, `stop` and `status` commands.
#[derive(Debug, Clone)]
pub struct UpstartSupervisor<F, R> {
    fs: F,
    runner: R,
    server_binary: PathBuf,
    host: String,
}

impl<F: Filesystem, R: CommandRunner> UpstartSupervisor<F, R> {
    pub fn new(config: &ManagerConfig, fs: F, runner: R) -> Self {
        Self {
            fs,
            runner,
            server_binary: config.server_binary.clone(),
            host: config.host.clone(),
        }
    }

    fn control(&self, command: &str, unit: &LaunchUnitRef) -> Result<CommandOutput> {
        let output = self.runner.run(command, &[unit.name()])?;
        if !output.success {
            let message = match output.stderr.trim() {
                "" => format!("'{} {}' failed", command, unit.name()),
                stderr => stderr.to_string(),
            };
            return Err(ManagerError::supervision(unit.name(), message));
        }
        Ok(output)
    }
}

impl<F: Filesystem, R: CommandRunner> ProcessSupervisor for UpstartSupervisor<F, R> {
    fn install(&self, unit: &LaunchUnitRef, descriptor: &InstanceDescriptor) -> Result<()> {
        let job = render_upstart_job(descriptor, &self.server_binary, &self.host);
        self.fs.write_text(unit.path(), &job)
    }

    fn remove(&self, unit: &LaunchUnitRef) -> Result<()> {
        self.fs.delete(unit.path())
    }

    fn start(&self, unit: &LaunchUnitRef) -> Result<()> {
        self.control("start", unit).map(|_| ())
    }

    fn stop(&self, unit: &LaunchUnitRef) -> Result<()> {
        self.control("stop", unit).map(|_| ())
    }

    fn is_running(&self, unit: &LaunchUnitRef) -> Result<bool> {
        // `status` exits non-zero for unknown jobs, which just means not running
        let output = self.runner.run("status", &[unit.name()])?;
        let running = output.success && output.stdout.contains("start/running");
        debug!("Unit {} running: {}", unit.name(), running);
        Ok(running)
    }
}
