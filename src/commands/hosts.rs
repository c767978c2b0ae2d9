// src/commands/hosts.rs

//! Host provisioning commands

use super::Catalog;
use anyhow::{Context, Result, bail};
use ciguest::ansible::{AnsiblePlaybook, GitRevision, extra_vars, validate_build_selection};
use ciguest::install::VirtInstall;
use ciguest::inventory::group_vars;
use ciguest::process::command_line;
use ciguest::{BuildTarget, Config, DataDir, Inventory};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

const UPDATE_PLAYBOOK: &str = "update";
const BUILD_PLAYBOOK: &str = "build";

/// Install a VM for an inventory host, or for a target given explicitly
pub fn cmd_install(
    data_dir: &DataDir,
    config_path: Option<&Path>,
    inventory_path: Option<&Path>,
    host: &str,
    target: Option<&str>,
    wait: bool,
    dry_run: bool,
) -> Result<()> {
    let config = Config::load(data_dir, config_path)?;
    config.validate_vm_settings()?;

    let catalog = Catalog::load(data_dir)?;
    let facts = match target {
        Some(name) => {
            let facts = catalog
                .targets
                .facts(name)
                .with_context(|| format!("Unknown target '{}'", name))?;
            let mut facts = facts.raw().clone();
            facts.insert("target".into(), name.into());
            facts
        }
        None => {
            let inventory = Inventory::load(&catalog.targets, inventory_path)?;
            inventory
                .host_facts(host)
                .with_context(|| format!("Host '{}' needs --target or an inventory entry", host))?
                .clone()
        }
    };

    let virt_install = VirtInstall::new(data_dir, host, &facts, &config, wait)?;
    if dry_run {
        println!("{}", command_line(&virt_install)?);
        return Ok(());
    }
    virt_install.run()?;
    Ok(())
}

/// Run the update playbook for each target group among `hosts`
pub fn cmd_update(
    data_dir: &DataDir,
    config_path: Option<&Path>,
    inventory_path: Option<&Path>,
    hosts: &str,
    projects: &str,
    git_revision: Option<&str>,
    dry_run: bool,
) -> Result<()> {
    let invocation = PlaybookRun {
        playbook: UPDATE_PLAYBOOK,
        hosts,
        projects,
        git_revision,
        dry_run,
    };
    execute_playbook(data_dir, config_path, inventory_path, &invocation)
}

/// Build the named projects on `hosts`
pub fn cmd_build(
    data_dir: &DataDir,
    config_path: Option<&Path>,
    inventory_path: Option<&Path>,
    hosts: &str,
    projects: &str,
    git_revision: Option<&str>,
    dry_run: bool,
) -> Result<()> {
    validate_build_selection(projects)?;

    let invocation = PlaybookRun {
        playbook: BUILD_PLAYBOOK,
        hosts,
        projects,
        git_revision,
        dry_run,
    };
    execute_playbook(data_dir, config_path, inventory_path, &invocation)
}

struct PlaybookRun<'a> {
    playbook: &'a str,
    hosts: &'a str,
    projects: &'a str,
    git_revision: Option<&'a str>,
    dry_run: bool,
}

/// Run a playbook once per target group among the selected hosts
fn execute_playbook(
    data_dir: &DataDir,
    config_path: Option<&Path>,
    inventory_path: Option<&Path>,
    run: &PlaybookRun<'_>,
) -> Result<()> {
    let revision: GitRevision = match run.git_revision {
        Some(rev) => rev.parse()?,
        None => GitRevision::default(),
    };

    let config = Config::load(data_dir, config_path)?;
    config.validate_vm_settings()?;

    let mut catalog = Catalog::load(data_dir)?;
    let inventory = Inventory::load(&catalog.targets, inventory_path)?;
    let selected = catalog.projects.select(run.projects)?;

    let mut groups: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for host in inventory.expand_hosts(run.hosts)? {
        let target = inventory.host_target_name(&host)?.to_string();
        groups.entry(target).or_default().push(host);
    }
    if groups.is_empty() {
        bail!("No hosts matched '{}'", run.hosts);
    }

    let base = AnsiblePlaybook::base_dir(data_dir)?;
    let playbook_base = AnsiblePlaybook::playbook_dir(&base, run.playbook);

    for (target_name, hosts) in &groups {
        let target = BuildTarget::new(&catalog.targets, target_name, None)?;
        let vars = group_vars(&config, &target, &catalog.projects, &selected)
            .with_context(|| format!("Failed to compute group vars for {}", target))?;
        let vars = extra_vars(&config, &vars, &selected, &revision, &base, &playbook_base)?;

        let playbook = AnsiblePlaybook::new(data_dir, run.playbook, hosts, &vars)?;
        if run.dry_run {
            println!("{}", command_line(&playbook)?);
            continue;
        }
        info!("Running {} on {} host(s) of {}", run.playbook, hosts.len(), target_name);
        playbook.run()?;
    }
    Ok(())
}
