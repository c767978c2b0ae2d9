// src/formatters/dockerfile.rs

//! Dockerfile generation
//!
//! The recipe installs the native packages on top of the target's container
//! base image, then the language repository packages, then (when cross
//! compiling) the foreign packages. Only deb, rpm and apk targets are
//! supported.

use super::{Formatter, package_names};
use crate::arch;
use crate::error::{Error, Result};
use crate::packages::PackageNames;
use crate::projects::Projects;
use crate::targets::{BuildTarget, PackagingFormat};
use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::str::FromStr;

const CCACHE_WRAPPERS_DIR: &str = "/usr/libexec/ccache-wrappers";
const COMMAND_SEP: &str = " && \\\n    ";

/// Which parts of the recipe to emit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Layers {
    /// Native and foreign packages
    #[default]
    All,
    /// Only the native packages
    Native,
    /// Only the foreign packages, on top of an image with the native ones
    Foreign,
}

impl FromStr for Layers {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "all" => Ok(Self::All),
            "native" => Ok(Self::Native),
            "foreign" => Ok(Self::Foreign),
            other => Err(Error::ValidationError(format!("Unknown layers '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DockerfileFormatter {
    pub layers: Layers,
    /// Replaces the target's base image in the FROM line
    pub base: Option<String>,
}

impl DockerfileFormatter {
    pub fn new(layers: Layers, base: Option<String>) -> Self {
        Self { layers, base }
    }

    /// Render the recipe from already resolved package names
    pub fn render(&self, target: &BuildTarget, names: &PackageNames) -> Result<String> {
        let facts = target.facts();
        let format = target.format();
        if !format.supports_containers() {
            return Err(Error::ValidationError(format!(
                "Target {} uses '{}' packages, Dockerfiles need deb, rpm or apk",
                target, format
            )));
        }

        let base = match (&self.base, &facts.containers) {
            (Some(base), _) => base.clone(),
            (None, Some(containers)) => containers.base.clone(),
            (None, None) => {
                return Err(Error::FormatterError(format!(
                    "Target {} has no container base image",
                    target
                )));
            }
        };

        let cross_arch = target.cross_arch.as_deref();
        if self.layers == Layers::Foreign && cross_arch.is_none() {
            return Err(Error::ValidationError(
                "Foreign layers need a cross architecture".to_string(),
            ));
        }

        let mut out = format!("FROM {}\n", base);

        if self.layers != Layers::Foreign {
            let mut commands = native_commands(target, &names.native);
            commands.extend(ccache_wrappers(target, names, None)?);
            write_run(&mut out, &commands);

            if !names.pypi.is_empty() {
                let pip3 = facts.paths.pip3.as_deref().unwrap_or("pip3");
                write_run(&mut out, &[format!("{} install {}", pip3, pkglist(&names.pypi, 10))]);
            }
            if !names.cpan.is_empty() {
                write_run(&mut out, &[format!("cpanm --notest {}", pkglist(&names.cpan, 10))]);
            }

            out.push('\n');
            if names.uses("ccache") {
                write_env(&mut out, "CCACHE_WRAPPERSDIR", CCACHE_WRAPPERS_DIR);
            }
            write_env(&mut out, "LANG", "en_US.UTF-8");
            let paths = [
                ("MAKE", &facts.paths.make),
                ("NINJA", &facts.paths.ninja),
                ("PYTHON", &facts.paths.python),
            ];
            for (key, value) in paths {
                if let Some(value) = value {
                    write_env(&mut out, key, value);
                }
            }
        }

        if let Some(cross_arch) = cross_arch.filter(|_| self.layers != Layers::Native) {
            let mut commands = cross_commands(target, cross_arch, &names.cross)?;
            commands.extend(ccache_wrappers(target, names, Some(cross_arch))?);
            write_run(&mut out, &commands);

            out.push('\n');
            write_env(&mut out, "ABI", arch::arch_to_abi(cross_arch)?);
        }

        Ok(out)
    }
}

impl Formatter for DockerfileFormatter {
    fn format(
        &self,
        projects: &Projects,
        target: &BuildTarget,
        selected: &[String],
    ) -> Result<String> {
        let names = package_names(projects, target, selected)?;
        self.render(target, &names)
    }
}

fn write_run(out: &mut String, commands: &[String]) {
    if commands.is_empty() {
        return;
    }
    let _ = write!(out, "\nRUN {}\n", commands.join(COMMAND_SEP));
}

fn write_env(out: &mut String, key: &str, value: &str) {
    let _ = writeln!(out, "ENV {}=\"{}\"", key, value);
}

/// One package per line, aligned under the install command
fn pkglist(packages: &BTreeSet<String>, indent: usize) -> String {
    let sep = format!(" \\\n{}", " ".repeat(indent + 4));
    packages
        .iter()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(&sep)
}

fn is_zypper(command: &str) -> bool {
    command == "zypper"
}

fn needs_crb(os_name: &str) -> bool {
    matches!(os_name, "CentOS" | "AlmaLinux")
}

fn native_commands(target: &BuildTarget, packages: &BTreeSet<String>) -> Vec<String> {
    let cmd = target.facts().packaging.command.as_str();
    let mut commands = Vec::new();

    match target.format() {
        PackagingFormat::Deb => {
            commands.push("export DEBIAN_FRONTEND=noninteractive".to_string());
            commands.push(format!("{} update", cmd));
            commands.push(format!("{} install -y eatmydata", cmd));
            commands.push(format!("eatmydata {} dist-upgrade -y", cmd));
            if !packages.is_empty() {
                commands.push(format!(
                    "eatmydata {} install --no-install-recommends -y {}",
                    cmd,
                    pkglist(packages, 18)
                ));
            }
            commands.push(format!("eatmydata {} autoremove -y", cmd));
            commands.push(format!("eatmydata {} autoclean -y", cmd));
            commands.push(r"sed -Ei 's,^# (en_US\.UTF-8 .*)$,\1,' /etc/locale.gen".to_string());
            commands.push("dpkg-reconfigure locales".to_string());
            commands.push("rm -f /usr/lib*/python3*/EXTERNALLY-MANAGED".to_string());
            commands.push(dpkg_manifest());
        }
        PackagingFormat::Rpm if is_zypper(cmd) => {
            commands.push(format!("{} update -y", cmd));
            if !packages.is_empty() {
                commands.push(format!("{} install -y {}", cmd, pkglist(packages, 6)));
            }
            commands.push(format!("{} clean --all", cmd));
            commands.push(rpm_manifest());
        }
        PackagingFormat::Rpm => {
            if needs_crb(target.os_name()) {
                commands.push(format!("{} install 'dnf-command(config-manager)' -y", cmd));
                commands.push(format!("{} config-manager --set-enabled -y crb", cmd));
                commands.push(format!("{} install -y epel-release", cmd));
            }
            commands.push(format!("{} update -y", cmd));
            if !packages.is_empty() {
                commands.push(format!("{} install -y {}", cmd, pkglist(packages, 6)));
            }
            commands.push(format!("{} autoremove -y", cmd));
            commands.push(format!("{} clean all -y", cmd));
            commands.push(rpm_manifest());
        }
        PackagingFormat::Apk => {
            commands.push(format!("{} update", cmd));
            commands.push(format!("{} upgrade", cmd));
            if !packages.is_empty() {
                commands.push(format!("{} add {}", cmd, pkglist(packages, 6)));
            }
            commands.push(format!("{} list --installed | sort > /packages.txt", cmd));
        }
        PackagingFormat::Pkg | PackagingFormat::Brew | PackagingFormat::Other(_) => {}
    }

    commands
}

fn cross_commands(
    target: &BuildTarget,
    cross_arch: &str,
    packages: &BTreeSet<String>,
) -> Result<Vec<String>> {
    let cmd = target.facts().packaging.command.as_str();
    let mut commands = Vec::new();

    match target.format() {
        PackagingFormat::Deb => {
            commands.push("export DEBIAN_FRONTEND=noninteractive".to_string());
            commands.push(format!(
                "dpkg --add-architecture {}",
                arch::arch_to_deb_arch(cross_arch)?
            ));
            commands.push(format!("eatmydata {} update", cmd));
            commands.push(format!("eatmydata {} dist-upgrade -y", cmd));
            commands.push(format!(
                "eatmydata {} install --no-install-recommends -y dpkg-dev",
                cmd
            ));
            if !packages.is_empty() {
                commands.push(format!(
                    "eatmydata {} install --no-install-recommends -y {}",
                    cmd,
                    pkglist(packages, 18)
                ));
            }
            commands.push(format!("eatmydata {} autoremove -y", cmd));
            commands.push(format!("eatmydata {} autoclean -y", cmd));
            commands.push(dpkg_manifest());
        }
        PackagingFormat::Rpm => {
            if !packages.is_empty() {
                commands.push(format!(
                    "{} install -y --setopt=install_weak_deps=False {}",
                    cmd,
                    pkglist(packages, 6)
                ));
            }
            commands.push(format!("{} clean all -y", cmd));
            commands.push(rpm_manifest());
        }
        other => {
            return Err(Error::FormatterError(format!(
                "Cross compiling isn't supported for '{}' packages",
                other
            )));
        }
    }

    Ok(commands)
}

fn dpkg_manifest() -> String {
    r"dpkg-query --showformat '${Package}_${Version}_${Architecture}\n' --show > /packages.txt"
        .to_string()
}

fn rpm_manifest() -> String {
    "rpm -qa | sort > /packages.txt".to_string()
}

/// Compiler symlinks to ccache, when the recipe installs ccache
fn ccache_wrappers(
    target: &BuildTarget,
    names: &PackageNames,
    cross_arch: Option<&str>,
) -> Result<Vec<String>> {
    if !names.uses("ccache") {
        return Ok(Vec::new());
    }

    let ccache = target.facts().paths.ccache.as_deref().ok_or_else(|| {
        Error::FormatterError(format!("Target {} doesn't define a ccache path", target))
    })?;

    let mut compilers = vec!["cc"];
    for compiler in ["clang", "gcc"] {
        if names.uses(compiler) {
            compilers.push(compiler);
        }
    }

    let prefix = match cross_arch {
        Some(cross_arch) => format!("{}-", arch::arch_to_abi(cross_arch)?),
        None => String::new(),
    };

    let mut commands = vec![format!("mkdir -p {}", CCACHE_WRAPPERS_DIR)];
    for compiler in compilers {
        commands.push(format!(
            "ln -s {} {}/{}{}",
            ccache, CCACHE_WRAPPERS_DIR, prefix, compiler
        ));
    }
    Ok(commands)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::targets::TargetFacts;

    fn target(yaml: &str, cross_arch: Option<&str>) -> BuildTarget {
        BuildTarget::from_facts(TargetFacts::from_yaml_str(yaml).unwrap(), cross_arch)
            .with_native_arch("x86_64")
    }

    const DEBIAN: &str = r#"
target: debian-10
os: {name: Debian, version: '10'}
packaging: {format: deb, command: apt-get}
paths: {ccache: /usr/bin/ccache, make: /usr/bin/make, python: /usr/bin/python3}
containers: {base: 'docker.io/library/debian:10-slim'}
"#;

    const FREEBSD: &str = r#"
target: freebsd-14
os: {name: FreeBSD, version: '14'}
packaging: {format: pkg, command: pkg}
"#;

    fn names(native: &[&str], cross: &[&str], mappings: &[&str]) -> PackageNames {
        let mut names = PackageNames::default();
        names.native.extend(native.iter().map(|s| s.to_string()));
        names.cross.extend(cross.iter().map(|s| s.to_string()));
        names.mappings.extend(mappings.iter().map(|s| s.to_string()));
        names
    }

    #[test]
    fn test_native_debian() {
        let out = DockerfileFormatter::default()
            .render(&target(DEBIAN, None), &names(&["git", "make"], &[], &["git", "make"]))
            .unwrap();

        assert!(out.starts_with(concat!(
            "FROM docker.io/library/debian:10-slim\n\n",
            "RUN export DEBIAN_FRONTEND=noninteractive",
        )));
        assert!(out.contains(concat!(
            "install --no-install-recommends -y git \\\n",
            "                      make",
        )));
        assert!(out.contains("ENV MAKE=\"/usr/bin/make\"\n"));
        assert!(!out.contains("ccache-wrappers"));
        assert!(!out.contains("ENV ABI"));
    }

    #[test]
    fn test_ccache_wrappers_only_when_used() {
        let names = names(&["ccache", "gcc"], &[], &["ccache", "gcc"]);
        let out = DockerfileFormatter::default()
            .render(&target(DEBIAN, None), &names)
            .unwrap();
        assert!(out.contains("ln -s /usr/bin/ccache /usr/libexec/ccache-wrappers/cc"));
        assert!(out.contains("ln -s /usr/bin/ccache /usr/libexec/ccache-wrappers/gcc"));
        assert!(out.contains("ENV CCACHE_WRAPPERSDIR=\"/usr/libexec/ccache-wrappers\""));
    }

    #[test]
    fn test_cross_layers() {
        let names = names(
            &["ccache"],
            &["gcc", "libc6-dev:s390x"],
            &["ccache", "gcc", "libc6-dev"],
        );
        let t = target(DEBIAN, Some("s390x"));

        let all = DockerfileFormatter::default().render(&t, &names).unwrap();
        assert!(all.contains("dpkg --add-architecture s390x"));
        assert!(all.contains("/usr/libexec/ccache-wrappers/s390x-linux-gnu-gcc"));
        assert!(all.ends_with("ENV ABI=\"s390x-linux-gnu\"\n"));

        let native = DockerfileFormatter::new(Layers::Native, None)
            .render(&t, &names)
            .unwrap();
        assert!(!native.contains("--add-architecture"));

        let foreign = DockerfileFormatter::new(Layers::Foreign, Some("ci-debian-10".into()))
            .render(&t, &names)
            .unwrap();
        assert!(foreign.starts_with("FROM ci-debian-10\n"));
        assert!(foreign.contains("--add-architecture"));
        assert!(!foreign.contains("ENV LANG"));
    }

    #[test]
    fn test_foreign_layers_need_cross_arch() {
        let res = DockerfileFormatter::new(Layers::Foreign, None)
            .render(&target(DEBIAN, None), &PackageNames::default());
        assert!(matches!(res, Err(Error::ValidationError(_))));
    }

    #[test]
    fn test_unsupported_format() {
        let res = DockerfileFormatter::default()
            .render(&target(FREEBSD, None), &PackageNames::default());
        assert!(matches!(res, Err(Error::ValidationError(_))));
    }

    #[test]
    fn test_layers_parse() {
        assert_eq!("foreign".parse::<Layers>().unwrap(), Layers::Foreign);
        assert!("some".parse::<Layers>().is_err());
    }
}
