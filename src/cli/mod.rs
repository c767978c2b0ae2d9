// src/cli/mod.rs
//! CLI definitions for ciguest
//!
//! This module contains the command-line interface definitions using clap.
//! The command implementations are in the `commands` module.
//!
//! Listing:
//! - `targets` / `projects` / `hosts` - show what the data and inventory define
//!
//! Generators (write to stdout):
//! - `variables` - build environment as shell or JSON variables
//! - `dockerfile` - container recipe
//!
//! Provisioning:
//! - `install` - create a VM with virt-install
//! - `update` - run the update playbook against hosts
//! - `container` - build and run images with docker or podman

use clap::{Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use std::path::PathBuf;

mod container;

pub use container::ContainerCommands;

#[derive(Parser)]
#[command(name = "ciguest")]
#[command(author = "ciguest Contributors")]
#[command(version)]
#[command(
    about = "Generate CI guests and container recipes from generic package lists",
    long_about = None
)]
pub struct Cli {
    /// Log debugging information to stderr
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// Extra data directory, searched before the shipped data
    #[arg(long, global = true, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// Configuration file (default: ~/.config/ciguest/config.yml)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Output format of the `variables` command
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum VariablesFormat {
    Shell,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    // =========================================================================
    // Listing
    // =========================================================================
    /// List supported targets
    Targets {
        /// Only targets that can be built as containers
        #[arg(long)]
        containerized: bool,
    },

    /// List known projects
    Projects,

    /// List hosts in the inventory
    Hosts {
        /// Inventory file (default: ~/.config/ciguest/inventory.yml)
        #[arg(short, long)]
        inventory: Option<PathBuf>,
    },

    // =========================================================================
    // Generators
    // =========================================================================
    /// Generate the build environment as variables
    Variables {
        /// Target to generate for
        target: String,

        /// Projects: comma separated names, globs, paths or URLs
        projects: String,

        /// Cross compile for this architecture
        #[arg(short = 'x', long)]
        cross_arch: Option<String>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "shell")]
        format: VariablesFormat,
    },

    /// Generate a Dockerfile
    Dockerfile {
        /// Target to generate for
        target: String,

        /// Projects: comma separated names, globs, paths or URLs
        projects: String,

        /// Cross compile for this architecture
        #[arg(short = 'x', long)]
        cross_arch: Option<String>,

        /// Which package layers to emit: all, native, foreign
        #[arg(short, long, default_value = "all")]
        layers: String,

        /// Base image, instead of the target's default
        #[arg(short, long)]
        base: Option<String>,
    },

    // =========================================================================
    // Provisioning
    // =========================================================================
    /// Install a new VM
    Install {
        /// Name of the VM
        host: String,

        /// Install this target instead of the host's inventory target
        #[arg(short, long)]
        target: Option<String>,

        /// Inventory file (default: ~/.config/ciguest/inventory.yml)
        #[arg(short, long)]
        inventory: Option<PathBuf>,

        /// Stay attached to the console until installation finishes
        #[arg(short, long)]
        wait: bool,

        /// Print the virt-install command instead of running it
        #[arg(long)]
        dry_run: bool,
    },

    /// Prepare hosts for the selected projects
    Update {
        /// Hosts: comma separated names or globs
        hosts: String,

        /// Projects: comma separated names, globs, paths or URLs
        projects: String,

        /// Git revision to build (REMOTE/BRANCH)
        #[arg(short, long)]
        git_revision: Option<String>,

        /// Inventory file (default: ~/.config/ciguest/inventory.yml)
        #[arg(short, long)]
        inventory: Option<PathBuf>,

        /// Print the ansible-playbook commands instead of running them
        #[arg(long)]
        dry_run: bool,
    },

    /// Build the named projects on hosts
    Build {
        /// Hosts: comma separated names or globs
        hosts: String,

        /// Projects: comma separated names, no globs or 'all'
        projects: String,

        /// Git revision to build (REMOTE/BRANCH)
        #[arg(short, long)]
        git_revision: Option<String>,

        /// Inventory file (default: ~/.config/ciguest/inventory.yml)
        #[arg(short, long)]
        inventory: Option<PathBuf>,

        /// Print the ansible-playbook commands instead of running them
        #[arg(long)]
        dry_run: bool,
    },

    /// Container image operations
    #[command(subcommand)]
    Container(ContainerCommands),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}
