// src/formatters/variables.rs

//! Build environment as shell or JSON variables

use super::{Formatter, package_names};
use crate::arch;
use crate::error::{Error, Result};
use crate::packages::PackageNames;
use crate::projects::Projects;
use crate::targets::{BuildTarget, PackagingFormat};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum VarValue {
    Str(String),
    List(Vec<String>),
}

impl VarValue {
    fn list(items: &BTreeSet<String>) -> Self {
        Self::List(items.iter().cloned().collect())
    }

    /// Flat rendering; lists are space separated
    pub fn flatten(&self) -> String {
        match self {
            Self::Str(s) => s.clone(),
            Self::List(items) => items.join(" "),
        }
    }
}

pub type VarMap = BTreeMap<String, VarValue>;

/// Variables describing the build environment of `target`
///
/// Tool paths the target doesn't define are left out.
pub fn build_varmap(target: &BuildTarget, names: &PackageNames) -> Result<VarMap> {
    let facts = target.facts();
    let mut varmap = VarMap::new();

    varmap.insert(
        "packaging_command".to_string(),
        VarValue::Str(facts.packaging.command.clone()),
    );

    let paths = [
        ("ccache", &facts.paths.ccache),
        ("make", &facts.paths.make),
        ("ninja", &facts.paths.ninja),
        ("python", &facts.paths.python),
        ("pip3", &facts.paths.pip3),
    ];
    for (key, value) in paths {
        if let Some(path) = value {
            varmap.insert(key.to_string(), VarValue::Str(path.clone()));
        }
    }

    varmap.insert("pkgs".to_string(), VarValue::list(&names.native));
    varmap.insert("pypi_pkgs".to_string(), VarValue::list(&names.pypi));
    varmap.insert("cpan_pkgs".to_string(), VarValue::list(&names.cpan));

    if let Some(cross_arch) = &target.cross_arch {
        varmap.insert("cross_arch".to_string(), VarValue::Str(cross_arch.clone()));
        varmap.insert(
            "cross_abi".to_string(),
            VarValue::Str(arch::arch_to_abi(cross_arch)?.to_string()),
        );
        if *target.format() == PackagingFormat::Deb {
            varmap.insert(
                "cross_arch_deb".to_string(),
                VarValue::Str(arch::arch_to_deb_arch(cross_arch)?.to_string()),
            );
        }
        varmap.insert("cross_pkgs".to_string(), VarValue::list(&names.cross));
    }

    Ok(varmap)
}

/// `KEY='value'` lines, sorted by key
#[derive(Debug, Default, Clone)]
pub struct ShellVariablesFormatter;

impl ShellVariablesFormatter {
    pub fn render(varmap: &VarMap) -> String {
        varmap
            .iter()
            .map(|(key, value)| {
                let value = value.flatten().replace('\'', "'\\''");
                format!("{}='{}'\n", key.to_uppercase(), value)
            })
            .collect()
    }
}

impl Formatter for ShellVariablesFormatter {
    fn format(
        &self,
        projects: &Projects,
        target: &BuildTarget,
        selected: &[String],
    ) -> Result<String> {
        let names = package_names(projects, target, selected)?;
        Ok(Self::render(&build_varmap(target, &names)?))
    }
}

/// The variables as a JSON object
#[derive(Debug, Default, Clone)]
pub struct JsonVariablesFormatter;

impl Formatter for JsonVariablesFormatter {
    fn format(
        &self,
        projects: &Projects,
        target: &BuildTarget,
        selected: &[String],
    ) -> Result<String> {
        let names = package_names(projects, target, selected)?;
        let varmap = build_varmap(target, &names)?;
        let mut out = serde_json::to_string_pretty(&varmap)
            .map_err(|e| Error::FormatterError(format!("JSON encoding failed: {}", e)))?;
        out.push('\n');
        Ok(out)
    }
}
