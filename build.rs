// build.rs

use clap::{Arg, ArgAction, Command};
use clap_mangen::Man;
use std::env;
use std::fs;
use std::path::PathBuf;

/// Common argument: target name
fn target_arg() -> Arg {
    Arg::new("target").required(true).help("Target to generate for")
}

/// Common argument: project selection
fn projects_arg() -> Arg {
    Arg::new("projects")
        .required(true)
        .help("Projects: comma separated names, globs, paths or URLs")
}

/// Common argument: cross compilation architecture
fn cross_arch_arg() -> Arg {
    Arg::new("cross_arch")
        .short('x')
        .long("cross-arch")
        .value_name("ARCH")
        .help("Cross compile for this architecture")
}

fn inventory_arg() -> Arg {
    Arg::new("inventory")
        .short('i')
        .long("inventory")
        .value_name("PATH")
        .help("Inventory file")
}

fn dry_run_arg() -> Arg {
    Arg::new("dry_run")
        .long("dry-run")
        .action(ArgAction::SetTrue)
        .help("Print the command instead of running it")
}

fn build_cli() -> Command {
    Command::new("ciguest")
        .version(env!("CARGO_PKG_VERSION"))
        .author("ciguest Contributors")
        .about("Generate CI guests and container recipes from generic package lists")
        .subcommand_required(true)
        .arg(
            Arg::new("debug")
                .short('d')
                .long("debug")
                .action(ArgAction::SetTrue)
                .help("Log debugging information to stderr"),
        )
        .arg(
            Arg::new("data_dir")
                .long("data-dir")
                .value_name("DIR")
                .help("Extra data directory, searched before the shipped data"),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("PATH")
                .help("Configuration file"),
        )
        .subcommand(
            Command::new("targets").about("List supported targets").arg(
                Arg::new("containerized")
                    .long("containerized")
                    .action(ArgAction::SetTrue)
                    .help("Only targets that can be built as containers"),
            ),
        )
        .subcommand(Command::new("projects").about("List known projects"))
        .subcommand(
            Command::new("hosts")
                .about("List hosts in the inventory")
                .arg(inventory_arg()),
        )
        .subcommand(
            Command::new("variables")
                .about("Generate the build environment as variables")
                .arg(target_arg())
                .arg(projects_arg())
                .arg(cross_arch_arg())
                .arg(
                    Arg::new("format")
                        .short('f')
                        .long("format")
                        .value_parser(["shell", "json"])
                        .default_value("shell")
                        .help("Output format"),
                ),
        )
        .subcommand(
            Command::new("dockerfile")
                .about("Generate a Dockerfile")
                .arg(target_arg())
                .arg(projects_arg())
                .arg(cross_arch_arg())
                .arg(
                    Arg::new("layers")
                        .short('l')
                        .long("layers")
                        .value_parser(["all", "native", "foreign"])
                        .default_value("all")
                        .help("Which package layers to emit"),
                )
                .arg(
                    Arg::new("base")
                        .short('b')
                        .long("base")
                        .help("Base image, instead of the target's default"),
                ),
        )
        .subcommand(
            Command::new("install")
                .about("Install a new VM")
                .arg(Arg::new("host").required(true).help("Name of the VM"))
                .arg(
                    Arg::new("target")
                        .short('t')
                        .long("target")
                        .help("Install this target instead of the host's inventory target"),
                )
                .arg(inventory_arg())
                .arg(
                    Arg::new("wait")
                        .short('w')
                        .long("wait")
                        .action(ArgAction::SetTrue)
                        .help("Stay attached to the console until installation finishes"),
                )
                .arg(dry_run_arg()),
        )
        .subcommand(
            Command::new("update")
                .about("Prepare hosts for the selected projects")
                .arg(Arg::new("hosts").required(true).help("Hosts: comma separated names or globs"))
                .arg(projects_arg())
                .arg(
                    Arg::new("git_revision")
                        .short('g')
                        .long("git-revision")
                        .value_name("REMOTE/BRANCH")
                        .help("Git revision to build"),
                )
                .arg(inventory_arg())
                .arg(dry_run_arg()),
        )
        .subcommand(
            Command::new("build")
                .about("Build the named projects on hosts")
                .arg(Arg::new("hosts").required(true).help("Hosts: comma separated names or globs"))
                .arg(
                    Arg::new("projects")
                        .required(true)
                        .help("Projects: comma separated names, no globs or 'all'"),
                )
                .arg(
                    Arg::new("git_revision")
                        .short('g')
                        .long("git-revision")
                        .value_name("REMOTE/BRANCH")
                        .help("Git revision to build"),
                )
                .arg(inventory_arg())
                .arg(dry_run_arg()),
        )
        .subcommand(
            Command::new("container")
                .about("Container image operations")
                .subcommand(
                    Command::new("build")
                        .about("Build an image for a target")
                        .arg(target_arg())
                        .arg(projects_arg())
                        .arg(cross_arch_arg())
                        .arg(
                            Arg::new("tag")
                                .short('t')
                                .long("tag")
                                .required(true)
                                .help("Image tag"),
                        )
                        .arg(Arg::new("engine").short('e').long("engine").help("podman or docker")),
                )
                .subcommand(
                    Command::new("run")
                        .about("Run a command in a throwaway container")
                        .arg(Arg::new("image").required(true).help("Image to run"))
                        .arg(Arg::new("user").short('u').long("user").default_value("root"))
                        .arg(
                            Arg::new("env")
                                .long("env")
                                .value_name("KEY=VALUE")
                                .action(ArgAction::Append),
                        )
                        .arg(Arg::new("engine").short('e').long("engine").help("podman or docker"))
                        .arg(Arg::new("command").last(true).required(true).num_args(1..)),
                )
                .subcommand(
                    Command::new("engines")
                        .about("List the container engines found on this host"),
                ),
        )
        .subcommand(
            Command::new("completions")
                .about("Generate shell completions")
                .arg(Arg::new("shell").required(true).help("Shell to generate completions for")),
        )
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    // Create man directory - use CARGO_MANIFEST_DIR which is always set by cargo
    let manifest_dir = match env::var("CARGO_MANIFEST_DIR") {
        Ok(dir) => PathBuf::from(dir),
        Err(e) => {
            println!("cargo:warning=CARGO_MANIFEST_DIR not set: {}", e);
            return;
        }
    };
    let man_dir = manifest_dir.join("man");

    if let Err(e) = fs::create_dir_all(&man_dir) {
        println!("cargo:warning=Failed to create man directory: {}", e);
        return;
    }

    let man = Man::new(build_cli());
    let mut buffer = Vec::new();

    if let Err(e) = man.render(&mut buffer) {
        println!("cargo:warning=Failed to render man page: {}", e);
        return;
    }

    let man_path = man_dir.join("ciguest.1");
    if let Err(e) = fs::write(&man_path, buffer) {
        println!("cargo:warning=Failed to write man page: {}", e);
    }
}
