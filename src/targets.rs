// src/targets.rs

//! Per-target platform facts
//!
//! Every supported OS platform ("target") is described by a YAML document
//! under `facts/targets/`. A shared `all.yml` provides defaults which the
//! per-target documents override. Facts are loaded once and never change
//! afterwards; a [`BuildTarget`] pairs a target's facts with an optional
//! cross-compilation architecture.

use crate::arch;
use crate::datadir::{DataDir, load_yaml_file};
use crate::error::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize};
use serde_yaml::{Mapping, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

const TARGETS_DIR: &str = "facts/targets";
const SHARED_FACTS: &str = "all";

/// Package manager family of a target
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PackagingFormat {
    Deb,
    Rpm,
    Apk,
    /// FreeBSD pkg
    Pkg,
    /// Homebrew
    Brew,
    Other(String),
}

impl PackagingFormat {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Deb => "deb",
            Self::Rpm => "rpm",
            Self::Apk => "apk",
            Self::Pkg => "pkg",
            Self::Brew => "brew",
            Self::Other(s) => s,
        }
    }

    /// Formats we know how to drive inside a Linux container
    pub fn supports_containers(&self) -> bool {
        matches!(self, Self::Deb | Self::Rpm | Self::Apk)
    }
}

impl From<String> for PackagingFormat {
    fn from(s: String) -> Self {
        match s.as_str() {
            "deb" => Self::Deb,
            "rpm" => Self::Rpm,
            "apk" => Self::Apk,
            "pkg" => Self::Pkg,
            "brew" => Self::Brew,
            _ => Self::Other(s),
        }
    }
}

impl From<PackagingFormat> for String {
    fn from(f: PackagingFormat) -> Self {
        f.as_str().to_string()
    }
}

impl fmt::Display for PackagingFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OsFacts {
    pub name: String,
    #[serde(deserialize_with = "string_or_number")]
    pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackagingFacts {
    pub format: PackagingFormat,
    pub command: String,
}

/// Well-known tool locations on the target
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PathFacts {
    pub bash: Option<String>,
    pub cc: Option<String>,
    pub ccache: Option<String>,
    pub make: Option<String>,
    pub ninja: Option<String>,
    pub pip3: Option<String>,
    pub python: Option<String>,
    pub sudoers: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerFacts {
    /// Base image reference, e.g. `docker.io/library/debian:12-slim`
    pub base: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InstallFacts {
    pub url: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Typed view over one target's merged fact document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetFacts {
    pub target: String,
    pub os: OsFacts,
    pub packaging: PackagingFacts,
    #[serde(default)]
    pub paths: PathFacts,
    #[serde(default)]
    pub containers: Option<ContainerFacts>,
    #[serde(default)]
    pub install: Option<InstallFacts>,

    /// The complete merged document, including keys we don't model
    #[serde(skip)]
    raw: Mapping,
}

impl TargetFacts {
    /// Build facts from an already merged document
    pub fn from_value(value: Value) -> Result<Self> {
        let raw = match &value {
            Value::Mapping(m) => m.clone(),
            _ => {
                return Err(Error::ConfigError(
                    "Target facts must be a mapping".to_string(),
                ));
            }
        };
        let mut facts: TargetFacts = serde_yaml::from_value(value)
            .map_err(|e| Error::ConfigError(format!("Invalid target facts: {}", e)))?;
        facts.raw = raw;
        Ok(facts)
    }

    /// Parse a standalone facts document
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let value: Value =
            serde_yaml::from_str(content).map_err(|e| Error::yaml("target facts", e))?;
        Self::from_value(value)
    }

    pub fn raw(&self) -> &Mapping {
        &self.raw
    }

    /// Identity used for caching resolved packages
    pub fn identity(&self) -> String {
        format!(
            "{}-{}",
            self.os.name.to_lowercase(),
            self.os.version.to_lowercase()
        )
    }
}

/// Check that a target name agrees with the OS facts it names
///
/// `centos-stream-9` must describe `CentOS` version `Stream9`.
pub fn validate_target_name(name: &str, os: &OsFacts) -> Result<()> {
    let (os_part, version_part) = name
        .split_once('-')
        .ok_or_else(|| Error::ConfigError(format!("Malformed target name '{}'", name)))?;

    if os_part != os.name.to_lowercase() {
        return Err(Error::ConfigError(format!(
            "Target '{}' declares OS name '{}'",
            name, os.name
        )));
    }

    if version_part.replace('-', "") != os.version.to_lowercase() {
        return Err(Error::ConfigError(format!(
            "Target '{}' declares OS version '{}'",
            name, os.version
        )));
    }

    Ok(())
}

/// Recursively overlay `overlay` onto `base`
pub fn merge_yaml(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Mapping(base_map), Value::Mapping(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(&key) {
                    Some(existing) => merge_yaml(existing, value),
                    None => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

/// The fact store: all known targets
#[derive(Debug, Clone, Default)]
pub struct Targets {
    facts: BTreeMap<String, Arc<TargetFacts>>,
}

impl Targets {
    /// Load every target under `facts/targets/`
    pub fn load(data_dir: &DataDir) -> Result<Self> {
        let shared_path = format!("{}/{}.yml", TARGETS_DIR, SHARED_FACTS);
        let shared: Value = match data_dir.find(&shared_path) {
            Some(path) => load_yaml_file(&path)?,
            None => Value::Mapping(Mapping::new()),
        };

        let mut facts = BTreeMap::new();
        for path in data_dir.list_files(TARGETS_DIR, ".yml", false)? {
            let Some(name) = file_stem(&path) else {
                continue;
            };
            if name == SHARED_FACTS || facts.contains_key(&name) {
                continue;
            }

            let target_facts = Self::load_target(&name, &path, &shared)?;
            facts.insert(name, Arc::new(target_facts));
        }

        debug!("Loaded facts for {} targets", facts.len());
        Ok(Self { facts })
    }

    fn load_target(name: &str, path: &Path, shared: &Value) -> Result<TargetFacts> {
        debug!("Loading facts for target '{}'", name);

        let doc: Value = load_yaml_file(path)?;
        let mut merged = shared.clone();
        merge_yaml(&mut merged, doc);
        if let Value::Mapping(m) = &mut merged {
            m.insert(Value::from("target"), Value::from(name));
        }

        let facts = TargetFacts::from_value(merged).map_err(|e| match e {
            Error::ConfigError(msg) => Error::ConfigError(format!("Target '{}': {}", name, msg)),
            other => other,
        })?;
        validate_target_name(name, &facts.os)?;
        Ok(facts)
    }

    /// Build a store from already parsed facts
    pub fn from_facts(facts: impl IntoIterator<Item = TargetFacts>) -> Self {
        Self {
            facts: facts
                .into_iter()
                .map(|f| (f.target.clone(), Arc::new(f)))
                .collect(),
        }
    }

    /// Sorted target names
    pub fn names(&self) -> Vec<&str> {
        self.facts.keys().map(|s| s.as_str()).collect()
    }

    pub fn facts(&self, name: &str) -> Option<&TargetFacts> {
        self.facts.get(name).map(|f| f.as_ref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.facts.contains_key(name)
    }

    /// Targets that can be turned into a container image
    pub fn containerized(&self) -> Vec<&str> {
        self.facts
            .iter()
            .filter(|(_, f)| f.packaging.format.supports_containers() && f.containers.is_some())
            .map(|(name, _)| name.as_str())
            .collect()
    }
}

/// A target paired with an optional cross-compilation architecture
#[derive(Debug, Clone)]
pub struct BuildTarget {
    pub name: String,
    pub cross_arch: Option<String>,
    native_arch: String,
    facts: Arc<TargetFacts>,
}

impl BuildTarget {
    pub fn new(targets: &Targets, name: &str, cross_arch: Option<&str>) -> Result<Self> {
        let facts = targets
            .facts
            .get(name)
            .ok_or_else(|| Error::TargetError(format!("Target not found: {}", name)))?;

        Ok(Self {
            name: name.to_string(),
            cross_arch: cross_arch.map(str::to_string),
            native_arch: arch::host_arch(),
            facts: Arc::clone(facts),
        })
    }

    pub fn from_facts(facts: TargetFacts, cross_arch: Option<&str>) -> Self {
        Self {
            name: facts.target.clone(),
            cross_arch: cross_arch.map(str::to_string),
            native_arch: arch::host_arch(),
            facts: Arc::new(facts),
        }
    }

    /// Override the detected native architecture
    pub fn with_native_arch(mut self, native_arch: impl Into<String>) -> Self {
        self.native_arch = native_arch.into();
        self
    }

    pub fn facts(&self) -> &TargetFacts {
        &self.facts
    }

    pub fn native_arch(&self) -> &str {
        &self.native_arch
    }

    pub fn format(&self) -> &PackagingFormat {
        &self.facts.packaging.format
    }

    pub fn os_name(&self) -> &str {
        &self.facts.os.name
    }

    pub fn os_version(&self) -> &str {
        &self.facts.os.version
    }

    /// Reject cross requests the host OS cannot satisfy
    pub fn validate_cross(&self) -> Result<()> {
        match &self.cross_arch {
            Some(cross_arch) => {
                arch::validate_cross_platform(cross_arch, &self.native_arch, self.os_name())
            }
            None => Ok(()),
        }
    }

    /// Cache key: OS identity plus the cross arch, if any
    pub fn identity(&self) -> String {
        match &self.cross_arch {
            Some(cross_arch) => format!("{}-{}-cross", self.facts.identity(), cross_arch),
            None => self.facts.identity(),
        }
    }
}

impl fmt::Display for BuildTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.cross_arch {
            Some(cross_arch) => write!(f, "{} (cross_arch={})", self.name, cross_arch),
            None => write!(f, "{}", self.name),
        }
    }
}

fn file_stem(path: &Path) -> Option<String> {
    path.file_stem().and_then(|s| s.to_str()).map(str::to_string)
}

/// Accept `version: 12` as well as `version: '12'`
fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected a string or number, found {:?}",
            other
        ))),
    }
}
