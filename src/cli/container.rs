// src/cli/container.rs
//! Container image commands

use clap::Subcommand;

#[derive(Subcommand)]
pub enum ContainerCommands {
    /// Build an image for a target
    Build {
        /// Target to build
        target: String,

        /// Projects: comma separated names, globs, paths or URLs
        projects: String,

        /// Cross compile for this architecture
        #[arg(short = 'x', long)]
        cross_arch: Option<String>,

        /// Image tag
        #[arg(short, long)]
        tag: String,

        /// Container engine: podman or docker (default: first available)
        #[arg(short, long)]
        engine: Option<String>,
    },

    /// Run a command in a throwaway container
    Run {
        /// Image to run
        image: String,

        /// User to run as, by name or ID
        #[arg(short, long, default_value = "root")]
        user: String,

        /// Environment for the command (KEY=VALUE)
        #[arg(long = "env", value_name = "KEY=VALUE")]
        env: Vec<String>,

        /// Container engine: podman or docker (default: first available)
        #[arg(short, long)]
        engine: Option<String>,

        /// Command and arguments
        #[arg(last = true, required = true)]
        command: Vec<String>,
    },

    /// List the container engines found on this host
    Engines,
}
