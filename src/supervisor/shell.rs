use super::{CommandOutput, CommandRunner};
use crate::core::{ManagerError, Result};
use std::process::Command;
use tracing::debug;

/// Runs commands with [`std::process::Command`], waiting for them to exit.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShellRunner;

impl ShellRunner {
    pub fn new() -> Self {
        Self
    }
}

impl CommandRunner for ShellRunner {
    fn run(&self, program: &str, args: &[&str]) -> Result<CommandOutput> {
        debug!("Executing: {} {}", program, args.join(" "));

        let output = Command::new(program).args(args).output().map_err(|e| {
            ManagerError::supervision(args.first().copied().unwrap_or(program), format!(
                "failed to execute '{}': {}",
                program, e
            ))
        })?;

        Ok(CommandOutput {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}
