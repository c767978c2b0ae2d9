// src/config.rs

//! User configuration
//!
//! The shipped `etc/config.yml` defines every known section and key along
//! with its default value. A user file in `~/.config/ciguest/` (or one given
//! on the command line) overrides individual keys; keys the defaults don't
//! know about are dropped.

use crate::datadir::DataDir;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

const DEFAULT_CONFIG: &str = "etc/config.yml";
const USER_CONFIG_NAMES: [&str; 2] = ["config.yml", "config.yaml"];

/// Valid values for `install.flavor`
const FLAVORS: [&str; 2] = ["test", "gitlab"];

/// Per-user configuration directory, `$XDG_CONFIG_HOME/ciguest`
pub fn user_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("ciguest"))
}

/// Typed view of the `install` section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstallSettings {
    #[serde(default)]
    pub cloud_init: bool,
    pub flavor: String,
    pub root_password: Option<String>,
    pub ssh_key: Option<String>,
    pub vcpus: u32,
    /// GiB
    pub memory_size: u64,
    /// GiB
    pub disk_size: u64,
    pub storage_pool: String,
    pub network: String,
    pub virt_type: String,
    pub arch: String,
    pub machine: String,
    pub cpu_model: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    values: BTreeMap<String, Mapping>,
    path: Option<PathBuf>,
}

impl Config {
    /// Load the defaults and overlay the user file
    ///
    /// With no explicit `path`, the user file is optional.
    pub fn load(data_dir: &DataDir, path: Option<&Path>) -> Result<Self> {
        let defaults_path = data_dir.find(DEFAULT_CONFIG).ok_or_else(|| {
            Error::ConfigError(format!("Default configuration '{}' not found", DEFAULT_CONFIG))
        })?;
        let defaults = fs::read_to_string(&defaults_path)?;

        let user_path = match path {
            Some(p) => Some(p.to_path_buf()),
            None => user_config_dir().and_then(|dir| {
                USER_CONFIG_NAMES
                    .iter()
                    .map(|name| dir.join(name))
                    .find(|p| p.exists())
            }),
        };

        let user = match &user_path {
            Some(p) => {
                debug!("Loading configuration from '{}'", p.display());
                Some(fs::read_to_string(p).map_err(|e| {
                    Error::ConfigError(format!("Failed to load config: '{}': {}", p.display(), e))
                })?)
            }
            None => None,
        };

        let mut config = Self::from_yaml(&defaults, user.as_deref())?;
        config.path = user_path;
        Ok(config)
    }

    /// Build a configuration from YAML text
    pub fn from_yaml(defaults: &str, user: Option<&str>) -> Result<Self> {
        let values: BTreeMap<String, Mapping> =
            serde_yaml::from_str(defaults).map_err(|e| Error::yaml("default config", e))?;
        let mut config = Self { values, path: None };

        if let Some(user) = user {
            if user.trim().is_empty() {
                return Err(Error::ConfigError(
                    "Failed to validate config: user configuration is empty".to_string(),
                ));
            }
            let user: Option<BTreeMap<String, Value>> = serde_yaml::from_str(user)
                .map_err(|e| Error::ConfigError(format!("Failed to load config: {}", e)))?;
            let user = user.ok_or_else(|| {
                Error::ConfigError(
                    "Failed to validate config: user configuration is empty".to_string(),
                )
            })?;
            config.update(user);
        }

        Ok(config)
    }

    /// Override known keys, dropping everything else
    fn update(&mut self, user: BTreeMap<String, Value>) {
        for (section, values) in user {
            let Some(known) = self.values.get_mut(&section) else {
                debug!("Removing unknown key '{}' from config", section);
                continue;
            };
            let Value::Mapping(values) = values else {
                debug!("Ignoring non-mapping config section '{}'", section);
                continue;
            };

            for (key, value) in values {
                if known.contains_key(&key) {
                    debug!("Applying user value for '{}.{:?}'", section, key);
                    known.insert(key, value);
                } else {
                    debug!("Removing unknown key '{}.{:?}' from config", section, key);
                }
            }
        }
    }

    /// The user file in effect, if any
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn values(&self) -> &BTreeMap<String, Mapping> {
        &self.values
    }

    pub fn get(&self, section: &str, key: &str) -> Option<&Value> {
        self.values.get(section).and_then(|s| s.get(key))
    }

    pub fn get_str(&self, section: &str, key: &str) -> Option<&str> {
        self.get(section, key).and_then(Value::as_str)
    }

    pub fn get_bool(&self, section: &str, key: &str) -> bool {
        self.get(section, key).and_then(Value::as_bool).unwrap_or(false)
    }

    pub fn install(&self) -> Result<InstallSettings> {
        let section = self
            .values
            .get("install")
            .cloned()
            .ok_or_else(|| Error::ConfigError("Missing 'install' section".to_string()))?;
        serde_yaml::from_value(Value::Mapping(section))
            .map_err(|e| Error::ConfigError(format!("Invalid 'install' section: {}", e)))
    }

    fn validate_section(&self, section: &str, mandatory: &[&str]) -> Result<()> {
        debug!("Validating section='[{}]' against keys='{:?}'", section, mandatory);
        let values = self
            .values
            .get(section)
            .ok_or_else(|| Error::ConfigError(format!("Missing section '{}'", section)))?;

        for key in mandatory {
            if values.get(*key).is_none_or(Value::is_null) {
                return Err(Error::ConfigError(format!(
                    "Failed to validate config: Missing or empty value for mandatory key '{}.{}'",
                    section, key
                )));
            }
        }

        for (key, value) in values {
            let key = key.as_str().unwrap_or_default();
            match value {
                Value::Null => {
                    return Err(Error::ConfigError(format!(
                        "Failed to validate config: Missing value for '{}.{}'",
                        section, key
                    )));
                }
                Value::String(_) | Value::Number(_) | Value::Bool(_) => {}
                _ => {
                    return Err(Error::ConfigError(format!(
                        "Failed to validate config: Invalid type for key '{}.{}'",
                        section, key
                    )));
                }
            }
        }

        Ok(())
    }

    /// Check that everything needed to install a VM is configured
    pub fn validate_vm_settings(&self) -> Result<()> {
        self.validate_section("install", &["root_password"])?;

        let flavor = self.get_str("install", "flavor").unwrap_or_default();
        if !FLAVORS.contains(&flavor) {
            return Err(Error::ConfigError(format!(
                "Failed to validate config: Invalid value '{}' for 'install.flavor'",
                flavor
            )));
        }

        if flavor == "gitlab" {
            self.validate_section("gitlab", &["runner_secret"])?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEFAULTS: &str = r#"
install:
  cloud_init: false
  flavor: test
  root_password:
  ssh_key: ~/.ssh/id_rsa.pub
  vcpus: 2
  memory_size: 2
  disk_size: 50
  storage_pool: default
  network: default
  virt_type: kvm
  arch: x86_64
  machine: pc
  cpu_model: host-passthrough
gitlab:
  url: https://gitlab.com
  runner_secret:
"#;

    #[test]
    fn test_defaults_need_password() {
        let config = Config::from_yaml(DEFAULTS, None).unwrap();
        assert_eq!(config.get_str("install", "flavor"), Some("test"));
        assert!(matches!(
            config.validate_vm_settings(),
            Err(Error::ConfigError(_))
        ));
    }

    #[test]
    fn test_user_overrides_and_unknown_keys() {
        let user = "install:\n  root_password: s3cret\n  bogus: 1\nweird:\n  a: b\n";
        let config = Config::from_yaml(DEFAULTS, Some(user)).unwrap();

        assert_eq!(config.get_str("install", "root_password"), Some("s3cret"));
        assert!(config.get("install", "bogus").is_none());
        assert!(!config.values().contains_key("weird"));
        config.validate_vm_settings().unwrap();

        let install = config.install().unwrap();
        assert_eq!(install.memory_size, 2);
        assert!(!install.cloud_init);
    }

    #[test]
    fn test_gitlab_flavor_needs_secret() {
        let user = "install:\n  root_password: x\n  flavor: gitlab\n";
        let config = Config::from_yaml(DEFAULTS, Some(user)).unwrap();
        assert!(config.validate_vm_settings().is_err());

        let user = concat!(
            "install:\n  root_password: x\n  flavor: gitlab\n",
            "gitlab:\n  runner_secret: abc\n",
        );
        let config = Config::from_yaml(DEFAULTS, Some(user)).unwrap();
        config.validate_vm_settings().unwrap();

        let user = "install:\n  root_password: x\n  flavor: prod\n";
        let config = Config::from_yaml(DEFAULTS, Some(user)).unwrap();
        assert!(config.validate_vm_settings().is_err());
    }

    #[test]
    fn test_empty_user_file() {
        assert!(matches!(
            Config::from_yaml(DEFAULTS, Some("")),
            Err(Error::ConfigError(_))
        ));
    }

    #[test]
    fn test_load_explicit_path() {
        let data = tempfile::tempdir().unwrap();
        fs::create_dir_all(data.path().join("etc")).unwrap();
        fs::write(data.path().join("etc/config.yml"), DEFAULTS).unwrap();

        let user = data.path().join("mine.yml");
        fs::write(&user, "install:\n  vcpus: 8\n").unwrap();

        let dd = DataDir::with_base(data.path(), None);
        let config = Config::load(&dd, Some(user.as_path())).unwrap();
        assert_eq!(config.install().unwrap().vcpus, 8);
        assert_eq!(config.path(), Some(user.as_path()));
    }
}
