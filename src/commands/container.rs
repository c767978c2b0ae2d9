// src/commands/container.rs

//! Container image commands

use super::generate::generate;
use anyhow::{Context, Result, anyhow};
use ciguest::DataDir;
use ciguest::containers::Engine;
use ciguest::formatters::{DockerfileFormatter, Layers};
use tracing::debug;

fn pick_engine(engine: Option<&str>) -> Result<Engine> {
    let engine = match engine {
        Some(name) => name.parse::<Engine>()?,
        None => Engine::available()
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("No container engine found, install podman or docker"))?,
    };

    if !engine.is_available() {
        return Err(anyhow!("{} is not installed", engine));
    }
    debug!("Using container engine {}", engine);
    Ok(engine)
}

/// Generate the Dockerfile for a target and build it
pub fn cmd_container_build(
    data_dir: &DataDir,
    target: &str,
    projects: &str,
    cross_arch: Option<&str>,
    tag: &str,
    engine: Option<&str>,
) -> Result<()> {
    let engine = pick_engine(engine)?;
    let formatter = DockerfileFormatter::new(Layers::All, None);
    let dockerfile = generate(data_dir, &formatter, target, projects, cross_arch)?;

    engine
        .build(tag, &dockerfile)
        .with_context(|| format!("Failed to build image '{}' for {}", tag, target))?;
    println!("Built {}", tag);
    Ok(())
}

/// Split `name:tag`; a colon before the last `/` belongs to a registry port
fn split_image(image: &str) -> (&str, &str) {
    match image.rsplit_once(':') {
        Some((name, tag)) if !tag.contains('/') => (name, tag),
        _ => (image, "latest"),
    }
}

pub fn cmd_container_run(
    image: &str,
    user: &str,
    env: &[String],
    engine: Option<&str>,
    command: &[String],
) -> Result<()> {
    let engine = pick_engine(engine)?;

    let env = env
        .iter()
        .map(|kv| {
            kv.split_once('=')
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .ok_or_else(|| anyhow!("Invalid environment '{}', expected KEY=VALUE", kv))
        })
        .collect::<Result<Vec<_>>>()?;

    let (reference, tag) = split_image(image);
    if !engine.image_exists(reference, tag)? {
        return Err(anyhow!(
            "Image '{}' not found, build it with 'ciguest container build'",
            image
        ));
    }

    engine.run(image, command, user, &env)?;
    Ok(())
}

pub fn cmd_container_engines() -> Result<()> {
    let engines = Engine::available();
    if engines.is_empty() {
        println!("No container engines found.");
        return Ok(());
    }
    for engine in engines {
        println!("{}", engine);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_image() {
        assert_eq!(split_image("ci-debian-12"), ("ci-debian-12", "latest"));
        assert_eq!(split_image("ci-debian-12:v2"), ("ci-debian-12", "v2"));
        assert_eq!(
            split_image("registry:5000/ci/fedora"),
            ("registry:5000/ci/fedora", "latest")
        );
    }
}
