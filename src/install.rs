// src/install.rs

//! Unattended VM installation through `virt-install`
//!
//! The unattended installation file for the guest OS is rendered from the
//! templates in `configs/install/` into a scratch directory and injected
//! into the installer's initrd.

use crate::config::{Config, InstallSettings};
use crate::datadir::DataDir;
use crate::error::{Error, Result};
use crate::process::{self, ExternalCommand};
use serde_yaml::{Mapping, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, info};

const TEMPLATES_DIR: &str = "configs/install";

/// Unattended installation file name for an OS
pub fn install_config_name(os_name: &str) -> Option<&'static str> {
    match os_name {
        "Debian" | "Ubuntu" => Some("preseed.cfg"),
        "CentOS" | "Fedora" | "AlmaLinux" => Some("kickstart.cfg"),
        "OpenSUSE" => Some("autoinst.xml"),
        _ => None,
    }
}

/// Replace `{{ key }}` placeholders
pub fn render_template(template: &str, values: &[(&str, &str)]) -> String {
    values.iter().fold(template.to_string(), |content, (key, value)| {
        content.replace(&format!("{{{{ {} }}}}", key), value)
    })
}

fn fact_str<'a>(facts: &'a Mapping, section: &str, key: &str) -> Option<&'a str> {
    facts.get(section).and_then(|s| s.get(key)).and_then(Value::as_str)
}

#[derive(Debug)]
pub struct VirtInstall {
    host: String,
    location: String,
    initrd_inject: PathBuf,
    settings: InstallSettings,
    wait: bool,
    // Holds the rendered install file until virt-install is done with it
    _workdir: TempDir,
}

impl VirtInstall {
    /// Prepare the installation of `host` described by its inventory facts
    pub fn new(
        data_dir: &DataDir,
        host: &str,
        facts: &Mapping,
        config: &Config,
        wait: bool,
    ) -> Result<Self> {
        let unsupported =
            || Error::InstallError(format!("Host {} doesn't support installation", host));

        let os_name = fact_str(facts, "os", "name").ok_or_else(unsupported)?;
        let config_name = install_config_name(os_name).ok_or_else(unsupported)?;
        let location = fact_str(facts, "install", "url").ok_or_else(unsupported)?;

        let template_path = data_dir
            .find(&format!("{}/{}", TEMPLATES_DIR, config_name))
            .ok_or_else(|| {
                Error::InstallError(format!("Missing install template '{}'", config_name))
            })?;
        let template = fs::read_to_string(&template_path)?;
        let content = render_template(&template, &[("install.url", location)]);

        let workdir = tempfile::Builder::new().prefix("ciguest-install-").tempdir()?;
        let initrd_inject = workdir.path().join(config_name);
        fs::write(&initrd_inject, content)?;
        debug!("Rendered '{}' to '{}'", config_name, initrd_inject.display());

        Ok(Self {
            host: host.to_string(),
            location: location.to_string(),
            initrd_inject,
            settings: config.install()?,
            wait,
            _workdir: workdir,
        })
    }

    pub fn initrd_inject(&self) -> &Path {
        &self.initrd_inject
    }

    /// Spawn `virt-install`
    pub fn run(&self) -> Result<()> {
        info!("Installing {}", self.host);
        process::run(self)
            .map_err(|e| Error::InstallError(format!("Failed to install '{}': {}", self.host, e)))
    }
}

impl ExternalCommand for VirtInstall {
    fn program(&self) -> &str {
        "virt-install"
    }

    fn build_args(&self) -> Result<Vec<String>> {
        let s = &self.settings;
        let config_name = self
            .initrd_inject
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();

        // inst.ks is ignored by installers that don't use kickstart; install=
        // carries the URL for openSUSE guests
        let extra_args = format!(
            "console=ttyS0 inst.ks=file:/{} install={}",
            config_name, self.location
        );

        let vcpus = s.vcpus.to_string();
        let memory = (s.memory_size * 1024).to_string();
        let disk = format!("size={},pool={},bus=virtio", s.disk_size, s.storage_pool);
        let network = format!("network={},model=virtio", s.network);
        let inject = self.initrd_inject.to_string_lossy();

        let fixed: [&str; 32] = [
            "--name",
            &self.host,
            "--location",
            &self.location,
            "--virt-type",
            &s.virt_type,
            "--arch",
            &s.arch,
            "--machine",
            &s.machine,
            "--cpu",
            &s.cpu_model,
            "--vcpus",
            &vcpus,
            "--memory",
            &memory,
            "--disk",
            &disk,
            "--network",
            &network,
            "--graphics",
            "none",
            "--console",
            "pty",
            "--sound",
            "none",
            "--rng",
            "device=/dev/urandom,model=virtio",
            "--initrd-inject",
            &inject,
            "--extra-args",
            &extra_args,
        ];
        let mut args: Vec<String> = fixed.iter().map(|a| a.to_string()).collect();

        if !self.wait {
            args.push("--noautoconsole".to_string());
        }
        Ok(args)
    }
}
