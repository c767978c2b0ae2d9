// src/commands/mod.rs
//! Command handlers for the ciguest CLI

mod container;
mod generate;
mod hosts;
mod list;

pub use container::{cmd_container_build, cmd_container_engines, cmd_container_run};
pub use generate::{cmd_dockerfile, cmd_variables};
pub use hosts::{cmd_build, cmd_install, cmd_update};
pub use list::{cmd_hosts, cmd_projects, cmd_targets};

use anyhow::{Context, Result};
use ciguest::{BuildTarget, DataDir, Packages, Projects, Targets};

/// Facts, mappings and projects loaded from the data directories
pub(crate) struct Catalog {
    pub targets: Targets,
    pub projects: Projects,
}

impl Catalog {
    pub fn load(data_dir: &DataDir) -> Result<Self> {
        let targets = Targets::load(data_dir).context("Failed to load target facts")?;
        let packages = Packages::load(data_dir).context("Failed to load package mappings")?;
        let projects = Projects::load(data_dir, packages).context("Failed to load projects")?;
        Ok(Self { targets, projects })
    }

    /// Expand a project selection and build the target to resolve it for
    pub fn prepare(
        &mut self,
        target: &str,
        projects: &str,
        cross_arch: Option<&str>,
    ) -> Result<(BuildTarget, Vec<String>)> {
        let selected = self.projects.select(projects)?;
        let target = BuildTarget::new(&self.targets, target, cross_arch)?;
        Ok((target, selected))
    }
}
