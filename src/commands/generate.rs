// src/commands/generate.rs

//! Recipe generation commands
//!
//! Generated artifacts go to stdout. Those with a comment syntax start with
//! a header quoting the command line that produced them.

use super::Catalog;
use crate::cli::VariablesFormat;
use anyhow::{Context, Result};
use ciguest::DataDir;
use ciguest::formatters::{
    DockerfileFormatter, Formatter, JsonVariablesFormatter, Layers, ShellVariablesFormatter,
    generated_header,
};

/// Render one artifact for `target` and the selected projects
pub(crate) fn generate(
    data_dir: &DataDir,
    formatter: &dyn Formatter,
    target: &str,
    projects: &str,
    cross_arch: Option<&str>,
) -> Result<String> {
    let mut catalog = Catalog::load(data_dir)?;
    let (target, selected) = catalog.prepare(target, projects, cross_arch)?;

    formatter
        .format(&catalog.projects, &target, &selected)
        .with_context(|| format!("Failed to generate for {}", target))
}

pub fn cmd_variables(
    data_dir: &DataDir,
    target: &str,
    projects: &str,
    cross_arch: Option<&str>,
    format: VariablesFormat,
    argv: &[String],
) -> Result<()> {
    let formatter: &dyn Formatter = match format {
        VariablesFormat::Shell => &ShellVariablesFormatter,
        VariablesFormat::Json => &JsonVariablesFormatter,
    };

    let body = generate(data_dir, formatter, target, projects, cross_arch)?;
    // JSON has no comments
    match format {
        VariablesFormat::Shell => print!("{}{}", generated_header(argv), body),
        VariablesFormat::Json => print!("{}", body),
    }
    Ok(())
}

pub fn cmd_dockerfile(
    data_dir: &DataDir,
    target: &str,
    projects: &str,
    cross_arch: Option<&str>,
    layers: &str,
    base: Option<&str>,
    argv: &[String],
) -> Result<()> {
    let layers: Layers = layers.parse()?;
    let formatter = DockerfileFormatter::new(layers, base.map(str::to_string));
    let body = generate(data_dir, &formatter, target, projects, cross_arch)?;
    print!("{}{}", generated_header(argv), body);
    Ok(())
}
