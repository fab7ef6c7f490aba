//! Collaborators the lifecycle controller drives.
//!
//! The controller only talks to these traits. The default implementations
//! write Upstart job files to the local disk and call the `start`, `stop` and
//! `status` commands through a [`CommandRunner`].

pub mod fs;
pub mod shell;
pub mod upstart;

use crate::core::{LaunchUnitRef, Result};
use crate::shard::InstanceDescriptor;
use std::path::Path;

pub use fs::LocalFilesystem;
pub use shell::ShellRunner;
pub use upstart::{UpstartSupervisor, render_upstart_job};

/// Text file access for data files and unit definitions.
pub trait Filesystem {
    /// Create or replace `path` with `content`.
    fn write_text(&self, path: &Path, content: &str) -> Result<()>;

    /// Remove `path`. A missing file is not an error.
    fn delete(&self, path: &Path) -> Result<()>;

    fn exists(&self, path: &Path) -> bool;
}

/// Installs and controls supervised launch units.
pub trait ProcessSupervisor {
    /// Write the unit definition for `descriptor`, replacing any existing one.
    fn install(&self, unit: &LaunchUnitRef, descriptor: &InstanceDescriptor) -> Result<()>;

    /// Remove the unit definition. A missing unit is not an error.
    fn remove(&self, unit: &LaunchUnitRef) -> Result<()>;

    fn start(&self, unit: &LaunchUnitRef) -> Result<()>;

    fn stop(&self, unit: &LaunchUnitRef) -> Result<()>;

    fn is_running(&self, unit: &LaunchUnitRef) -> Result<bool>;
}

/// Captured result of an external command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

/// Runs external commands on behalf of a supervisor.
pub trait CommandRunner {
    fn run(&self, program: &str, args: &[&str]) -> Result<CommandOutput>;
}

impl<T: Filesystem + ?Sized> Filesystem for &T {
    fn write_text(&self, path: &Path, content: &str) -> Result<()> {
        (**self).write_text(path, content)
    }

    fn delete(&self, path: &Path) -> Result<()> {
        (**self).delete(path)
    }

    fn exists(&self, path: &Path) -> bool {
        (**self).exists(path)
    }
}

impl<T: ProcessSupervisor + ?Sized> ProcessSupervisor for &T {
    fn install(&self, unit: &LaunchUnitRef, descriptor: &InstanceDescriptor) -> Result<()> {
        (**self).install(unit, descriptor)
    }

    fn remove(&self, unit: &LaunchUnitRef) -> Result<()> {
        (**self).remove(unit)
    }

    fn start(&self, unit: &LaunchUnitRef) -> Result<()> {
        (**self).start(unit)
    }

    fn stop(&self, unit: &LaunchUnitRef) -> Result<()> {
        (**self).stop(unit)
    }

    fn is_running(&self, unit: &LaunchUnitRef) -> Result<bool> {
        (**self).is_running(unit)
    }
}

impl<T: CommandRunner + ?Sized> CommandRunner for &T {
    fn run(&self, program: &str, args: &[&str]) -> Result<CommandOutput> {
        (**self).run(program, args)
    }
}
