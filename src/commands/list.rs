// src/commands/list.rs

//! Listing commands

use super::Catalog;
use anyhow::Result;
use ciguest::{DataDir, Inventory, Targets};
use std::path::Path;

/// List targets, optionally only those with a container base image
pub fn cmd_targets(data_dir: &DataDir, containerized: bool) -> Result<()> {
    let targets = Targets::load(data_dir)?;
    let names = if containerized {
        targets.containerized()
    } else {
        targets.names()
    };

    for name in names {
        println!("{}", name);
    }
    Ok(())
}

/// List public projects
pub fn cmd_projects(data_dir: &DataDir) -> Result<()> {
    let catalog = Catalog::load(data_dir)?;
    for name in catalog.projects.names() {
        println!("{}", name);
    }
    Ok(())
}

/// List inventory hosts
pub fn cmd_hosts(data_dir: &DataDir, inventory: Option<&Path>) -> Result<()> {
    let targets = Targets::load(data_dir)?;
    let inventory = Inventory::load(&targets, inventory)?;
    for host in inventory.hosts() {
        println!("{}", host);
    }
    Ok(())
}
