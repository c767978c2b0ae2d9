// src/main.rs

mod cli;
mod commands;

use anyhow::Result;
use ciguest::DataDir;
use clap::{CommandFactory, Parser};
use cli::{Cli, Commands, ContainerCommands};
use std::io;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn init_logging(debug: bool) {
    // Logs go to stderr; stdout carries the generated artifacts
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

/// Command line as typed, for the header of generated files
fn invocation() -> Vec<String> {
    let mut argv = vec!["ciguest".to_string()];
    argv.extend(std::env::args().skip(1));
    argv
}

fn run(cli: Cli) -> Result<()> {
    let data_dir = DataDir::new(cli.data_dir.clone());
    let config = cli.config.as_deref();

    match cli.command {
        Commands::Targets { containerized } => commands::cmd_targets(&data_dir, containerized),
        Commands::Projects => commands::cmd_projects(&data_dir),
        Commands::Hosts { inventory } => commands::cmd_hosts(&data_dir, inventory.as_deref()),

        Commands::Variables {
            target,
            projects,
            cross_arch,
            format,
        } => commands::cmd_variables(
            &data_dir,
            &target,
            &projects,
            cross_arch.as_deref(),
            format,
            &invocation(),
        ),
        Commands::Dockerfile {
            target,
            projects,
            cross_arch,
            layers,
            base,
        } => commands::cmd_dockerfile(
            &data_dir,
            &target,
            &projects,
            cross_arch.as_deref(),
            &layers,
            base.as_deref(),
            &invocation(),
        ),

        Commands::Install {
            host,
            target,
            inventory,
            wait,
            dry_run,
        } => commands::cmd_install(
            &data_dir,
            config,
            inventory.as_deref(),
            &host,
            target.as_deref(),
            wait,
            dry_run,
        ),
        Commands::Update {
            hosts,
            projects,
            git_revision,
            inventory,
            dry_run,
        } => commands::cmd_update(
            &data_dir,
            config,
            inventory.as_deref(),
            &hosts,
            &projects,
            git_revision.as_deref(),
            dry_run,
        ),
        Commands::Build {
            hosts,
            projects,
            git_revision,
            inventory,
            dry_run,
        } => commands::cmd_build(
            &data_dir,
            config,
            inventory.as_deref(),
            &hosts,
            &projects,
            git_revision.as_deref(),
            dry_run,
        ),

        Commands::Container(cmd) => match cmd {
            ContainerCommands::Build {
                target,
                projects,
                cross_arch,
                tag,
                engine,
            } => commands::cmd_container_build(
                &data_dir,
                &target,
                &projects,
                cross_arch.as_deref(),
                &tag,
                engine.as_deref(),
            ),
            ContainerCommands::Run {
                image,
                user,
                env,
                engine,
                command,
            } => commands::cmd_container_run(&image, &user, &env, engine.as_deref(), &command),
            ContainerCommands::Engines => commands::cmd_container_engines(),
        },

        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "ciguest", &mut io::stdout());
            Ok(())
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.debug);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("ciguest: error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
