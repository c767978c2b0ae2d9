// src/ansible.rs

//! Host updates and builds through `ansible-playbook`
//!
//! The playbooks ship under `ansible/` in the data directory. Everything a
//! playbook needs (configuration, group vars, selected projects, git
//! revision) is passed as a JSON extra-vars file.

use crate::config::Config;
use crate::datadir::DataDir;
use crate::error::{Error, Result};
use crate::process::{self, ExternalCommand};
use crate::targets::merge_yaml;
use serde_json::{Map, Value as JsonValue, json};
use serde_yaml::{Mapping, Value as YamlValue};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tempfile::TempDir;
use tracing::{debug, info};

const ANSIBLE_DIR: &str = "ansible";

/// `REMOTE/BRANCH` to check projects out from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitRevision {
    pub remote: String,
    pub branch: String,
}

impl Default for GitRevision {
    fn default() -> Self {
        Self {
            remote: "default".to_string(),
            branch: "master".to_string(),
        }
    }
}

impl FromStr for GitRevision {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.split_once('/') {
            Some((remote, branch)) if !remote.is_empty() && !branch.is_empty() => Ok(Self {
                remote: remote.to_string(),
                branch: branch.to_string(),
            }),
            _ => Err(Error::ValidationError(format!(
                "Missing or invalid git revision '{}'",
                s
            ))),
        }
    }
}

/// Projects for the `build` playbook must be named one by one
///
/// Projects carry no dependency tree, so `all` or a wildcard would build
/// them in an arbitrary order.
pub fn validate_build_selection(projects: &str) -> Result<()> {
    for project in projects.split(',') {
        if project == "all" || project.contains('*') {
            return Err(Error::ValidationError(
                "'build' doesn't support selecting projects by wildcard or 'all'".to_string(),
            ));
        }
    }
    Ok(())
}

/// Assemble the extra vars for one target group
pub fn extra_vars(
    config: &Config,
    group_vars: &Mapping,
    selected: &[String],
    revision: &GitRevision,
    base: &Path,
    playbook_base: &Path,
) -> Result<JsonValue> {
    // Config sections merge key by key into same-named fact sections (`install`)
    let mut merged = YamlValue::Mapping(group_vars.clone());
    for (section, values) in config.values() {
        let mut overlay = Mapping::new();
        overlay.insert(YamlValue::from(section.as_str()), YamlValue::Mapping(values.clone()));
        merge_yaml(&mut merged, YamlValue::Mapping(overlay));
    }

    let mut vars = match to_json("extra vars", &merged)? {
        JsonValue::Object(vars) => vars,
        _ => Map::new(),
    };

    vars.insert("base".to_string(), json!(base.display().to_string()));
    vars.insert(
        "playbook_base".to_string(),
        json!(playbook_base.display().to_string()),
    );
    vars.insert("selected_projects".to_string(), json!(selected));
    vars.insert("git_remote".to_string(), json!(revision.remote));
    vars.insert("git_branch".to_string(), json!(revision.branch));
    Ok(JsonValue::Object(vars))
}

fn to_json<T: serde::Serialize>(what: &str, value: &T) -> Result<JsonValue> {
    serde_json::to_value(value)
        .map_err(|e| Error::ParseError(format!("Can't encode {} as JSON: {}", what, e)))
}

#[derive(Debug)]
pub struct AnsiblePlaybook {
    playbook: PathBuf,
    ansible_cfg: PathBuf,
    hosts: Vec<String>,
    extra_vars_path: PathBuf,
    _workdir: TempDir,
}

impl AnsiblePlaybook {
    /// Locate the playbook and write the extra vars file
    pub fn new(
        data_dir: &DataDir,
        playbook: &str,
        hosts: &[String],
        vars: &JsonValue,
    ) -> Result<Self> {
        let base = Self::base_dir(data_dir)?;
        let playbook_path = Self::playbook_dir(&base, playbook).join("main.yml");
        if !playbook_path.is_file() {
            return Err(Error::CommandError(format!(
                "Playbook '{}' not found",
                playbook_path.display()
            )));
        }

        let workdir = tempfile::Builder::new().prefix("ciguest-ansible-").tempdir()?;
        let extra_vars_path = workdir.path().join("extra_vars.json");
        let content = serde_json::to_string(vars)
            .map_err(|e| Error::ParseError(format!("Can't encode extra vars: {}", e)))?;
        fs::write(&extra_vars_path, content)?;
        debug!("Wrote extra vars to '{}'", extra_vars_path.display());

        Ok(Self {
            playbook: playbook_path,
            ansible_cfg: base.join("ansible.cfg"),
            hosts: hosts.to_vec(),
            extra_vars_path,
            _workdir: workdir,
        })
    }

    /// Directory holding `ansible.cfg` and `playbooks/`
    pub fn base_dir(data_dir: &DataDir) -> Result<PathBuf> {
        data_dir
            .find(ANSIBLE_DIR)
            .ok_or_else(|| Error::CommandError("Ansible data directory not found".to_string()))
    }

    pub fn playbook_dir(base: &Path, playbook: &str) -> PathBuf {
        base.join("playbooks").join(playbook)
    }

    pub fn extra_vars_path(&self) -> &Path {
        &self.extra_vars_path
    }

    pub fn run(&self) -> Result<()> {
        info!("Running {} on {}", self.playbook.display(), self.hosts.join(","));
        process::run(self).map_err(|e| {
            Error::CommandError(format!(
                "Failed to run {} on '{}': {}",
                self.playbook.display(),
                self.hosts.join(","),
                e
            ))
        })
    }
}

impl ExternalCommand for AnsiblePlaybook {
    fn program(&self) -> &str {
        "ansible-playbook"
    }

    fn build_args(&self) -> Result<Vec<String>> {
        Ok(vec![
            "--limit".to_string(),
            self.hosts.join(","),
            "--extra-vars".to_string(),
            format!("@{}", self.extra_vars_path.display()),
            self.playbook.display().to_string(),
        ])
    }

    fn envs(&self) -> Vec<(String, String)> {
        vec![(
            "ANSIBLE_CONFIG".to_string(),
            self.ansible_cfg.display().to_string(),
        )]
    }
}
