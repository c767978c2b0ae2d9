// tests/common/mod.rs

//! Shared test utilities and helpers for integration tests.
//!
//! Tests run against the shipped `data/` directory overlaid with the
//! fixtures in `tests/data/`, and pin the native architecture so results
//! don't depend on the machine running them.

#![allow(dead_code)]

use ciguest::{BuildTarget, DataDir, Packages, Projects, Targets};
use std::path::PathBuf;

pub const NATIVE_ARCH: &str = "x86_64";

pub fn manifest_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
}

pub fn fixtures_dir() -> PathBuf {
    manifest_dir().join("tests").join("data")
}

/// Shipped data plus the test fixtures
pub fn data_dir() -> DataDir {
    DataDir::with_base(manifest_dir().join("data"), Some(fixtures_dir()))
}

pub fn targets() -> Targets {
    Targets::load(&data_dir()).unwrap()
}

pub fn projects() -> Projects {
    let dd = data_dir();
    Projects::load(&dd, Packages::load(&dd).unwrap()).unwrap()
}

pub fn packages() -> Packages {
    Packages::load(&data_dir()).unwrap()
}

/// A build target on an x86_64 build machine
pub fn target(targets: &Targets, name: &str, cross_arch: Option<&str>) -> BuildTarget {
    BuildTarget::new(targets, name, cross_arch)
        .unwrap()
        .with_native_arch(NATIVE_ARCH)
}

pub fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}
