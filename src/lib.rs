// src/lib.rs

//! ciguest: CI guest and container recipe generator
//!
//! Projects list the *generic* names of the packages they build with. A
//! mapping table translates each generic name into the concrete package for
//! a given target OS, packaging format and architecture, and the formatters
//! turn the result into Dockerfiles, shell or JSON variable files, or the
//! group vars used to provision VMs with Ansible.
//!
//! # Architecture
//!
//! - Facts: per-target YAML describing the OS, packaging tool and paths
//! - Mappings: generic name -> concrete name, most specific key wins
//! - Projects: generic package lists, resolved and cached per target
//! - Formatters: render resolved package sets for a consumer

pub mod ansible;
pub mod arch;
pub mod config;
pub mod containers;
pub mod datadir;
mod error;
pub mod formatters;
pub mod install;
pub mod inventory;
pub mod packages;
pub mod pattern;
pub mod process;
pub mod projects;
pub mod targets;

pub use config::Config;
pub use datadir::DataDir;
pub use error::{Error, Result};
pub use inventory::Inventory;
pub use packages::{CrossPolicy, Package, PackageNames, PackageSet, Packages};
pub use projects::{Project, Projects};
pub use targets::{BuildTarget, PackagingFormat, TargetFacts, Targets};
