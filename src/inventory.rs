// src/inventory.rs

//! Host inventory
//!
//! Hosts are listed in an Ansible YAML inventory, grouped by target name:
//!
//! ```yaml
//! all:
//!   children:
//!     debian-12:
//!       hosts:
//!         debian-12-1:
//!         192.168.1.30:
//!     fedora-41:
//!       hosts:
//!         fedora-test-1:
//!           fully_managed: true
//! ```
//!
//! Every host must belong to exactly one target group. Its facts are the
//! target facts overlaid with whatever the inventory sets for the host.

use crate::config::{Config, user_config_dir};
use crate::datadir::load_yaml_file;
use crate::error::{Error, Result};
use crate::packages::PackageNames;
use crate::pattern::expand_pattern;
use crate::projects::Projects;
use crate::targets::{BuildTarget, Targets, merge_yaml};
use serde_yaml::{Mapping, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const INVENTORY_FILE: &str = "inventory.yml";

/// Default inventory location, `$XDG_CONFIG_HOME/ciguest/inventory.yml`
pub fn default_inventory_path() -> Option<PathBuf> {
    user_config_dir().map(|d| d.join(INVENTORY_FILE))
}

#[derive(Debug, Clone, Default)]
pub struct Inventory {
    host_facts: BTreeMap<String, Mapping>,
}

/// Accumulates hosts while walking the group tree
#[derive(Default)]
struct Walker {
    facts: BTreeMap<String, Mapping>,
    groups: BTreeMap<String, BTreeSet<String>>,
}

impl Walker {
    fn walk(&mut self, targets: &Targets, group_name: &str, group: &Mapping) {
        for (key, value) in group {
            match key.as_str() {
                Some("hosts") => {
                    if group_name != "ungrouped" && !targets.contains(group_name) {
                        info!(
                            "Unsupported target OS group '{}' found in the inventory, skipping...",
                            group_name
                        );
                        return;
                    }
                    let Value::Mapping(hosts) = value else {
                        continue;
                    };
                    for (host, host_facts) in hosts {
                        let Some(host) = host_name(host) else {
                            continue;
                        };
                        debug!("Host '{}' is in group '{}'", host, group_name);
                        self.groups
                            .entry(host.clone())
                            .or_default()
                            .insert(group_name.to_string());

                        // Only the first non-empty definition of a host counts
                        let host_facts = match host_facts {
                            Value::Mapping(m) => m.clone(),
                            _ => Mapping::new(),
                        };
                        let known = self.facts.entry(host).or_default();
                        if known.is_empty() {
                            *known = host_facts;
                        }
                    }
                }
                Some("children") => {
                    if let Value::Mapping(children) = value {
                        for (child, subgroup) in children {
                            let (Some(child), Value::Mapping(subgroup)) = (child.as_str(), subgroup)
                            else {
                                continue;
                            };
                            debug!("Group '{}' is a children of group '{}'", child, group_name);
                            self.walk(targets, child, subgroup);
                        }
                    }
                }
                _ => {}
            }
        }
    }
}

/// Hosts can be named by address, which YAML may not parse as a string
fn host_name(key: &Value) -> Option<String> {
    match key {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

impl Inventory {
    /// Load an inventory file; a missing default inventory is empty
    pub fn load(targets: &Targets, path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => match default_inventory_path() {
                Some(p) if p.exists() => p,
                _ => {
                    debug!("No inventory found, using an empty one");
                    return Ok(Self::default());
                }
            },
        };

        debug!("Loading inventory from '{}'", path.display());
        let doc: Value = load_yaml_file(&path)
            .map_err(|e| Error::InventoryError(format!("Failed to load inventory: {}", e)))?;
        Self::from_value(targets, doc)
    }

    pub fn from_yaml_str(targets: &Targets, content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let doc: Value = serde_yaml::from_str(content)
            .map_err(|e| Error::InventoryError(format!("Failed to load inventory: {}", e)))?;
        Self::from_value(targets, doc)
    }

    fn from_value(targets: &Targets, doc: Value) -> Result<Self> {
        let mut walker = Walker::default();
        if !doc.is_null() {
            let Some(Value::Mapping(all)) = doc.get("all") else {
                return Err(Error::InventoryError(
                    "Inventory must define the 'all' group".to_string(),
                ));
            };
            walker.walk(targets, "all", all);
        }

        let mut host_facts = BTreeMap::new();
        for (host, groups) in walker.groups {
            let host_targets: Vec<&String> =
                groups.iter().filter(|g| targets.contains(g)).collect();

            let target = match host_targets.as_slice() {
                [] => {
                    return Err(Error::InventoryError(format!(
                        "Host '{}' not found in any target OS group",
                        host
                    )));
                }
                [target] => target.as_str(),
                _ => {
                    return Err(Error::InventoryError(format!(
                        "Host '{}' found in multiple target OS groups: {:?}",
                        host, host_targets
                    )));
                }
            };

            let mut facts = match targets.facts(target) {
                Some(f) => Value::Mapping(f.raw().clone()),
                None => Value::Mapping(Mapping::new()),
            };
            let own = walker.facts.remove(&host).unwrap_or_default();
            merge_yaml(&mut facts, Value::Mapping(own));

            let Value::Mapping(mut facts) = facts else {
                continue;
            };
            facts.insert(Value::from("target"), Value::from(target));
            debug!("Facts for host '{}': {:?}", host, facts);
            host_facts.insert(host, facts);
        }

        Ok(Self { host_facts })
    }

    /// Sorted host names
    pub fn hosts(&self) -> Vec<&str> {
        self.host_facts.keys().map(|s| s.as_str()).collect()
    }

    pub fn host_facts(&self, host: &str) -> Result<&Mapping> {
        self.host_facts
            .get(host)
            .ok_or_else(|| Error::InventoryError(format!("Host '{}' not in the inventory", host)))
    }

    pub fn host_target_name(&self, host: &str) -> Result<&str> {
        self.host_facts(host)?
            .get("target")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::InventoryError(format!("Host '{}' has no target", host)))
    }

    pub fn expand_hosts(&self, pattern: &str) -> Result<Vec<String>> {
        expand_pattern(pattern, self.host_facts.keys(), "host")
            .map(|hosts| hosts.into_iter().collect())
            .map_err(|e| {
                debug!("Failed to expand '{}'", pattern);
                Error::InventoryError(format!("Failed to expand '{}': {}", pattern, e))
            })
    }
}

/// Target facts plus the resolved package lists, as Ansible group vars
pub fn group_vars(
    config: &Config,
    target: &BuildTarget,
    projects: &Projects,
    selected: &[String],
) -> Result<Mapping> {
    let mut wanted: Vec<String> = ["base", "developer", "vm"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    if config.get_bool("install", "cloud_init") {
        wanted.push("cloud-init".to_string());
    }
    wanted.extend(selected.iter().cloned());

    let install = PackageNames::from_packages(&projects.get_packages(&wanted, target)?);
    let early = PackageNames::from_packages(&projects.get_packages(&["early_install"], target)?);
    let unwanted = PackageNames::from_packages(&projects.get_packages(&["unwanted"], target)?);

    let list = |names: &BTreeSet<String>| {
        Value::Sequence(names.iter().map(|n| Value::from(n.as_str())).collect())
    };

    let mut vars = target.facts().raw().clone();
    vars.insert(Value::from("packages"), list(&install.native));
    vars.insert(Value::from("pypi_packages"), list(&install.pypi));
    vars.insert(Value::from("cpan_packages"), list(&install.cpan));
    vars.insert(Value::from("unwanted_packages"), list(&unwanted.native));
    vars.insert(Value::from("early_install_packages"), list(&early.native));
    Ok(vars)
}
