// src/containers/mod.rs

//! Container engines
//!
//! Thin wrappers around the `docker` and `podman` command line tools for
//! building images from generated Dockerfiles and running commands in them.
//! Both engines share the same command surface; the differences (image
//! listing format, user namespace mapping) live in the submodules.

mod docker;
mod podman;

pub use podman::{id_map_args, subid_max};

use crate::error::{Error, Result};
use crate::process::{self, ExternalCommand};
use nix::unistd::{Uid, User};
use std::fmt;
use std::fs;
use std::str::FromStr;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Engine {
    Docker,
    Podman,
}

impl Engine {
    pub const ALL: [Engine; 2] = [Engine::Podman, Engine::Docker];

    pub fn program(&self) -> &'static str {
        match self {
            Engine::Docker => "docker",
            Engine::Podman => "podman",
        }
    }

    /// Whether the engine's binary is in `PATH`
    pub fn is_available(&self) -> bool {
        which::which(self.program()).is_ok()
    }

    pub fn available() -> Vec<Engine> {
        Self::ALL.into_iter().filter(Engine::is_available).collect()
    }

    fn command(&self, args: Vec<String>) -> EngineCommand {
        EngineCommand { engine: *self, args }
    }

    /// Build `tag` from the Dockerfile contents in `dockerfile`
    pub fn build(&self, tag: &str, dockerfile: &str) -> Result<()> {
        let context = tempfile::Builder::new().prefix("ciguest-build-").tempdir()?;
        let path = context.path().join("Dockerfile");
        fs::write(&path, dockerfile)?;

        info!("Building image '{}' with {}", tag, self);
        let file = path.display().to_string();
        let dir = context.path().display().to_string();
        let cmd = self.command(Self::build_args(tag, &file, &dir));
        process::run(&cmd)
            .map_err(|e| Error::ContainerError(format!("Failed to build '{}': {}", tag, e)))
    }

    fn build_args(tag: &str, file: &str, context: &str) -> Vec<String> {
        ["build", "--tag", tag, "--file", file, context]
            .iter()
            .map(|a| a.to_string())
            .collect()
    }

    fn images(&self) -> Result<Vec<ImageInfo>> {
        let args = match self {
            Engine::Docker => docker::IMAGES_ARGS,
            Engine::Podman => podman::IMAGES_ARGS,
        };
        let output = process::capture(&self.command(args.iter().map(|a| a.to_string()).collect()))
            .map_err(|e| Error::ContainerError(format!("Failed to list images: {}", e)))?;

        let images = match self {
            Engine::Docker => docker::parse_images(&output)?,
            Engine::Podman => podman::parse_images(&output)?,
        };
        debug!("{} knows {} images", self, images.len());
        Ok(images)
    }

    /// Whether an image matching an ID prefix or `reference:tag` exists
    pub fn image_exists(&self, reference: &str, tag: &str) -> Result<bool> {
        Ok(self.images()?.iter().any(|img| img.matches(reference, tag)))
    }

    /// Arguments for `run`, without the program name
    pub fn run_args(
        &self,
        image: &str,
        command: &[String],
        user: &str,
        env: &[(String, String)],
    ) -> Result<Vec<String>> {
        let user = ContainerUser::lookup(user)?;

        let mut args: Vec<String> = ["run", "--rm", "--interactive", "--tty"]
            .iter()
            .map(|a| a.to_string())
            .collect();
        args.push(format!("--user={}:{}", user.uid, user.gid));

        if *self == Engine::Podman && user.uid != 0 {
            let uid_max = subid_max(&read_subids("/etc/subuid")?)?;
            let gid_max = subid_max(&read_subids("/etc/subgid")?)?;
            args.extend(id_map_args(user.uid, uid_max, gid_max));
        }

        for (key, value) in env {
            args.push(format!("--env={}={}", key, value));
        }
        args.push(image.to_string());
        args.extend(command.iter().cloned());
        Ok(args)
    }

    /// Run `command` in a throwaway container of `image`
    pub fn run(
        &self,
        image: &str,
        command: &[String],
        user: &str,
        env: &[(String, String)],
    ) -> Result<()> {
        let cmd = self.command(self.run_args(image, command, user, env)?);
        process::run(&cmd)
            .map_err(|e| Error::ContainerError(format!("Failed to run '{}': {}", image, e)))
    }
}

impl fmt::Display for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.program())
    }
}

impl FromStr for Engine {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "docker" => Ok(Engine::Docker),
            "podman" => Ok(Engine::Podman),
            other => Err(Error::ValidationError(format!(
                "Unknown container engine '{}'",
                other
            ))),
        }
    }
}

fn read_subids(path: &str) -> Result<String> {
    fs::read_to_string(path)
        .map_err(|e| Error::ContainerError(format!("Failed to read '{}': {}", path, e)))
}

struct EngineCommand {
    engine: Engine,
    args: Vec<String>,
}

impl ExternalCommand for EngineCommand {
    fn program(&self) -> &str {
        self.engine.program()
    }

    fn build_args(&self) -> Result<Vec<String>> {
        Ok(self.args.clone())
    }
}

/// One entry of an engine's image listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageInfo {
    pub id: String,
    /// `repository:tag` names
    pub names: Vec<String>,
}

impl ImageInfo {
    pub fn matches(&self, reference: &str, tag: &str) -> bool {
        if reference.is_empty() {
            return false;
        }
        if self.id.starts_with(reference) {
            return true;
        }
        let wanted = format!("{}:{}", reference, tag);
        let local = format!("localhost/{}", wanted);
        self.names.iter().any(|n| *n == wanted || *n == local)
    }
}

/// Account a container process runs as
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerUser {
    pub name: String,
    pub uid: u32,
    pub gid: u32,
}

impl ContainerUser {
    /// Look up a user by name or numeric ID
    pub fn lookup(user: &str) -> Result<Self> {
        let found = match user.parse::<u32>() {
            Ok(uid) => User::from_uid(Uid::from_raw(uid)),
            Err(_) => User::from_name(user),
        }
        .map_err(|e| Error::ContainerError(format!("Failed to look up user '{}': {}", user, e)))?;

        let found = found
            .ok_or_else(|| Error::ContainerError(format!("User '{}' not found", user)))?;
        Ok(Self {
            name: found.name,
            uid: found.uid.as_raw(),
            gid: found.gid.as_raw(),
        })
    }
}
