// src/formatters/mod.rs

//! Recipe formatters
//!
//! Formatters turn the resolved packages of a set of projects into a textual
//! artifact for one target: a Dockerfile, or the build environment as shell
//! or JSON variables.

mod dockerfile;
mod variables;

pub use dockerfile::{DockerfileFormatter, Layers};
pub use variables::{
    JsonVariablesFormatter, ShellVariablesFormatter, VarMap, VarValue, build_varmap,
};

use crate::error::Result;
use crate::packages::PackageNames;
use crate::projects::Projects;
use crate::targets::BuildTarget;
use tracing::debug;

/// Internal project every generated recipe starts from
pub const BASE_PROJECT: &str = "base";

/// Produces one artifact for a target and a selection of projects
pub trait Formatter {
    fn format(
        &self,
        projects: &Projects,
        target: &BuildTarget,
        selected: &[String],
    ) -> Result<String>;
}

/// Resolve `base` plus the selected projects and split the result by class
pub fn package_names(
    projects: &Projects,
    target: &BuildTarget,
    selected: &[String],
) -> Result<PackageNames> {
    target.validate_cross()?;

    let mut wanted = Vec::with_capacity(selected.len() + 1);
    wanted.push(BASE_PROJECT.to_string());
    wanted.extend(selected.iter().cloned());
    debug!("Generating for {} with projects {:?}", target, wanted);

    let packages = projects.get_packages(&wanted, target)?;
    Ok(PackageNames::from_packages(&packages))
}

/// Comment block identifying a generated file and how to regenerate it
pub fn generated_header(command_line: &[String]) -> String {
    let command = command_line
        .iter()
        .map(|arg| shell_quote(arg))
        .collect::<Vec<_>>()
        .join(" ");

    format!(
        concat!(
            "# THIS FILE WAS AUTO-GENERATED\n#\n#  $ {}\n#\n",
            "# Changes made here will be lost on regeneration.\n\n",
        ),
        command
    )
}

/// Quote `s` for a POSIX shell when it needs it
pub fn shell_quote(s: &str) -> String {
    let safe = !s.is_empty()
        && s.chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./=:,@+%".contains(c));
    if safe {
        s.to_string()
    } else {
        format!("'{}'", s.replace('\'', "'\\''"))
    }
}
