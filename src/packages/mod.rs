// src/packages/mod.rs

//! Resolved packages
//!
//! A generic package name resolves to at most one concrete [`Package`]. The
//! variant records how the package gets installed: by the system package
//! manager for the build machine, for the foreign architecture, or from one
//! of the language repositories.

pub mod mapping;
mod resolver;

pub use mapping::{CrossPolicy, Lookup, LookupKeys, MappingEntry, MappingTable};
pub use resolver::Packages;

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// A concrete package resolved from a generic name
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Package {
    Native { mapping: String, name: String },
    Cross { mapping: String, name: String, arch: String },
    PyPI { mapping: String, name: String },
    Cpan { mapping: String, name: String },
}

impl Package {
    /// The generic name this package was resolved from
    pub fn mapping(&self) -> &str {
        match self {
            Self::Native { mapping, .. }
            | Self::Cross { mapping, .. }
            | Self::PyPI { mapping, .. }
            | Self::Cpan { mapping, .. } => mapping,
        }
    }

    /// The concrete package name
    pub fn name(&self) -> &str {
        match self {
            Self::Native { name, .. }
            | Self::Cross { name, .. }
            | Self::PyPI { name, .. }
            | Self::Cpan { name, .. } => name,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Native { .. } => "native",
            Self::Cross { .. } => "cross",
            Self::PyPI { .. } => "pypi",
            Self::Cpan { .. } => "cpan",
        }
    }
}

/// Resolved packages keyed by generic name
pub type PackageSet = BTreeMap<String, Package>;

/// Package names split by installation class
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PackageNames {
    pub native: BTreeSet<String>,
    pub cross: BTreeSet<String>,
    pub pypi: BTreeSet<String>,
    pub cpan: BTreeSet<String>,
    /// Every generic name that produced a package
    pub mappings: BTreeSet<String>,
}

impl PackageNames {
    pub fn from_packages(packages: &PackageSet) -> Self {
        let mut names = Self::default();

        for package in packages.values() {
            let set = match package {
                Package::Native { .. } => &mut names.native,
                Package::Cross { .. } => &mut names.cross,
                Package::PyPI { .. } => &mut names.pypi,
                Package::Cpan { .. } => &mut names.cpan,
            };
            set.insert(package.name().to_string());
            names.mappings.insert(package.mapping().to_string());
        }

        names
    }

    pub fn uses(&self, mapping: &str) -> bool {
        self.mappings.contains(mapping)
    }
}
