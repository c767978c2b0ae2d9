// src/process.rs

//! External tool invocation
//!
//! Adapters for `virt-install`, `ansible-playbook` and the container engines
//! describe their invocation through [`ExternalCommand`]; this module spawns
//! them and turns failures into errors.

use crate::error::{Error, Result};
use crate::formatters::shell_quote;
use std::process::{Command, Stdio};
use tracing::debug;

/// A fully described invocation of an external tool
pub trait ExternalCommand {
    /// Program to execute, looked up in `PATH`
    fn program(&self) -> &str;

    /// Command line arguments, without the program name
    fn build_args(&self) -> Result<Vec<String>>;

    /// Extra environment for the child process
    fn envs(&self) -> Vec<(String, String)> {
        Vec::new()
    }
}

/// Printable command line, for dry runs and logs
pub fn command_line(cmd: &dyn ExternalCommand) -> Result<String> {
    let mut words: Vec<String> = cmd
        .envs()
        .into_iter()
        .map(|(k, v)| format!("{}={}", k, shell_quote(&v)))
        .collect();
    words.push(shell_quote(cmd.program()));
    words.extend(cmd.build_args()?.iter().map(|a| shell_quote(a)));
    Ok(words.join(" "))
}

fn prepare(cmd: &dyn ExternalCommand) -> Result<Command> {
    let args = cmd.build_args()?;
    debug!("Running {} {:?}", cmd.program(), args);

    let mut command = Command::new(cmd.program());
    command.args(&args).envs(cmd.envs());
    Ok(command)
}

/// Run with inherited stdio; a non-zero exit is a `CommandError`
pub fn run(cmd: &dyn ExternalCommand) -> Result<()> {
    let status = prepare(cmd)?
        .status()
        .map_err(|e| Error::CommandError(format!("Failed to run {}: {}", cmd.program(), e)))?;

    if !status.success() {
        return Err(Error::CommandError(format!(
            "{} exited with {}",
            cmd.program(),
            status
        )));
    }
    Ok(())
}

/// Run and capture stdout
pub fn capture(cmd: &dyn ExternalCommand) -> Result<String> {
    let output = prepare(cmd)?
        .stdin(Stdio::null())
        .output()
        .map_err(|e| Error::CommandError(format!("Failed to run {}: {}", cmd.program(), e)))?;

    if !output.status.success() {
        return Err(Error::CommandError(format!(
            "{} failed: {}",
            cmd.program(),
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}
