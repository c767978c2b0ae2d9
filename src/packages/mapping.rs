// src/packages/mapping.rs

//! The generic package mapping table
//!
//! `facts/mappings.yml` holds three tables:
//!
//! ```yaml
//! mappings:
//!   libxml2:
//!     default: libxml2-devel
//!     deb: libxml2-dev
//!     Alpine: libxml2-dev
//!   gcc:
//!     default: gcc
//!     cross-policy-deb: foreign
//! pypi_mappings:
//!   python3-dbus:
//!     default: dbus-python
//! cpan_mappings:
//!   perl-Test-Harness:
//!     default: Test-Harness
//! ```
//!
//! Each row maps lookup keys to a concrete package name, or to `null` when the
//! package is intentionally absent on the platforms selected by that key.

use crate::datadir::{DataDir, load_yaml_file};
use crate::error::{Error, Result};
use crate::targets::{BuildTarget, PackagingFormat};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

const MAPPINGS_FILE: &str = "facts/mappings.yml";

/// One row of a mapping table: lookup key -> concrete name (or disabled)
pub type MappingEntry = BTreeMap<String, Option<String>>;

/// Outcome of scanning a row with a list of candidate keys
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup<'a> {
    /// The winning key maps to a concrete name
    Found(&'a str),
    /// The winning key maps to null
    Disabled,
    /// None of the candidate keys is present
    Missing,
}

/// Scan `keys` in ascending specificity; the last key present wins
pub fn lookup<'a>(
    mapping: &str,
    entry: Option<&'a MappingEntry>,
    keys: &[String],
) -> Lookup<'a> {
    let Some(entry) = entry else {
        return Lookup::Missing;
    };

    let mut result = Lookup::Missing;
    let mut winner = None;
    for key in keys {
        if let Some(value) = entry.get(key) {
            result = match value {
                Some(name) => Lookup::Found(name.as_str()),
                None => Lookup::Disabled,
            };
            winner = Some(key);
        }
    }

    match winner {
        Some(key) => debug!("Eval of mapping='{}': key '{}' -> {:?}", mapping, key, result),
        None => debug!("Eval of mapping='{}': no key matched", mapping),
    }
    result
}

/// How a package is installed when cross compiling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CrossPolicy {
    /// Install the package for the build machine
    #[default]
    Native,
    /// Install the package for the foreign architecture
    Foreign,
    /// Don't install the package at all
    Skip,
}

impl CrossPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Native => "native",
            Self::Foreign => "foreign",
            Self::Skip => "skip",
        }
    }
}

impl FromStr for CrossPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "native" => Ok(Self::Native),
            "foreign" => Ok(Self::Foreign),
            "skip" => Ok(Self::Skip),
            other => Err(Error::ConfigError(format!(
                "Unknown cross policy '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for CrossPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered candidate keys for one resolution request
///
/// Every list is in ascending specificity, so a full scan that keeps the last
/// hit selects the most specific key available.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupKeys {
    base: Vec<String>,
}

impl LookupKeys {
    /// `default`, format, OS name, OS name + version
    pub fn new(format: &PackagingFormat, os_name: &str, os_version: &str) -> Self {
        Self {
            base: vec![
                "default".to_string(),
                format.as_str().to_string(),
                os_name.to_string(),
                format!("{}{}", os_name, os_version),
            ],
        }
    }

    pub fn for_target(target: &BuildTarget) -> Self {
        Self::new(target.format(), target.os_name(), target.os_version())
    }

    pub fn base(&self) -> &[String] {
        &self.base
    }

    fn prefixed(&self, prefix: &str) -> impl Iterator<Item = String> + '_ {
        let prefix = prefix.to_string();
        self.base.iter().map(move |k| format!("{}{}", prefix, k))
    }

    /// Base keys followed by the native-arch qualified keys
    pub fn native(&self, native_arch: &str) -> Vec<String> {
        self.base
            .iter()
            .cloned()
            .chain(self.prefixed(&format!("{}-", native_arch)))
            .collect()
    }

    /// Keys naming a package for the foreign architecture
    ///
    /// Debian foreign packages usually share the native name, so the plain
    /// and arch qualified keys are candidates too. Everywhere else only the
    /// explicit `cross-<arch>-` keys are.
    pub fn cross(&self, format: &PackagingFormat, cross_arch: &str) -> Vec<String> {
        let cross_keys = self.prefixed(&format!("cross-{}-", cross_arch));

        if *format == PackagingFormat::Deb {
            self.base
                .iter()
                .cloned()
                .chain(self.prefixed(&format!("{}-", cross_arch)))
                .chain(cross_keys)
                .collect()
        } else {
            cross_keys.collect()
        }
    }

    pub fn cross_policy(&self) -> Vec<String> {
        self.prefixed("cross-policy-").collect()
    }
}

/// The three mapping tables
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MappingTable {
    #[serde(default)]
    pub mappings: BTreeMap<String, MappingEntry>,
    #[serde(default)]
    pub pypi_mappings: BTreeMap<String, MappingEntry>,
    #[serde(default)]
    pub cpan_mappings: BTreeMap<String, MappingEntry>,
}

impl MappingTable {
    /// Load the shipped table, overlaid row by row with the extra data dir
    pub fn load(data_dir: &DataDir) -> Result<Self> {
        let files = data_dir.find_all(MAPPINGS_FILE);
        if files.is_empty() {
            return Err(Error::ConfigError(format!(
                "Data file '{}' not found",
                MAPPINGS_FILE
            )));
        }

        let mut table = MappingTable::default();
        for path in files {
            let overlay: MappingTable = load_yaml_file(&path)?;
            table.overlay(overlay);
        }

        debug!(
            "Loaded {} native, {} PyPI and {} CPAN mappings",
            table.mappings.len(),
            table.pypi_mappings.len(),
            table.cpan_mappings.len()
        );
        Ok(table)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).map_err(|e| Error::yaml("mappings", e))
    }

    /// Replace rows with those defined in `other`
    pub fn overlay(&mut self, other: MappingTable) {
        self.mappings.extend(other.mappings);
        self.pypi_mappings.extend(other.pypi_mappings);
        self.cpan_mappings.extend(other.cpan_mappings);
    }

    /// Is `generic` known to any of the tables
    pub fn contains(&self, generic: &str) -> bool {
        self.mappings.contains_key(generic)
            || self.pypi_mappings.contains_key(generic)
            || self.cpan_mappings.contains_key(generic)
    }
}
