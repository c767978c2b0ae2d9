// tests/resolver.rs

//! Resolution of generic package names against the shipped mapping table.

mod common;

use ciguest::{CrossPolicy, Error, Package};
use common::{packages, target, targets};

fn native(mapping: &str, name: &str) -> Option<Package> {
    Some(Package::Native {
        mapping: mapping.to_string(),
        name: name.to_string(),
    })
}

fn cross(mapping: &str, name: &str, arch: &str) -> Option<Package> {
    Some(Package::Cross {
        mapping: mapping.to_string(),
        name: name.to_string(),
        arch: arch.to_string(),
    })
}

#[test]
fn test_ccache_on_debian_10() {
    let targets = targets();
    let debian = target(&targets, "debian-10", None);
    assert_eq!(packages().resolve("ccache", &debian).unwrap(), native("ccache", "ccache"));
}

#[test]
fn test_resolution_is_deterministic() {
    let targets = targets();
    let packages = packages();
    let debian = target(&targets, "debian-12", Some("s390x"));

    for generic in ["gcc", "glib2", "make", "libbar", "meson"] {
        let first = packages.resolve(generic, &debian).unwrap();
        for _ in 0..3 {
            assert_eq!(packages.resolve(generic, &debian).unwrap(), first);
        }
    }
}

#[test]
fn test_most_specific_key_wins() {
    let targets = targets();
    let packages = packages();

    let debian10 = target(&targets, "debian-10", None);
    assert_eq!(
        packages.resolve("libbaz", &debian10).unwrap(),
        native("libbaz", "libbaz1-amd64")
    );

    let on_arm = debian10.clone().with_native_arch("aarch64");
    assert_eq!(packages.resolve("libbaz", &on_arm).unwrap(), native("libbaz", "libbaz1"));

    let debian12 = target(&targets, "debian-12", None);
    assert_eq!(packages.resolve("libbaz", &debian12).unwrap(), native("libbaz", "libbaz"));

    let fedora = target(&targets, "fedora-41", None);
    assert_eq!(packages.resolve("glib2", &fedora).unwrap(), native("glib2", "glib2-devel"));
    assert_eq!(
        packages.resolve("glib2", &debian12).unwrap(),
        native("glib2", "libglib2.0-dev")
    );
}

#[test]
fn test_null_disables_package() {
    let targets = targets();
    let packages = packages();

    let freebsd = target(&targets, "freebsd-14", None);
    assert_eq!(packages.resolve("gcc", &freebsd).unwrap(), None);

    let macos = target(&targets, "macos-14", None);
    assert_eq!(packages.resolve("ca-certificates", &macos).unwrap(), None);
}

#[test]
fn test_disabled_native_falls_back_to_pypi() {
    let targets = targets();
    let packages = packages();

    let centos = target(&targets, "centos-stream-9", None);
    assert_eq!(
        packages.resolve("meson", &centos).unwrap(),
        Some(Package::PyPI {
            mapping: "meson".to_string(),
            name: "meson==0.63.2".to_string(),
        })
    );

    // Native wins when it resolves
    let fedora = target(&targets, "fedora-41", None);
    assert_eq!(packages.resolve("meson", &fedora).unwrap(), native("meson", "meson"));

    let debian = target(&targets, "debian-12", None);
    assert!(matches!(
        packages.resolve("libbar", &debian).unwrap(),
        Some(Package::PyPI { name, .. }) if name == "pybar"
    ));
}

#[test]
fn test_disabled_native_falls_back_to_cpan() {
    let targets = targets();
    let alpine = target(&targets, "alpine-edge", None);
    assert_eq!(
        packages().resolve("perl-File-Slurp", &alpine).unwrap(),
        Some(Package::Cpan {
            mapping: "perl-File-Slurp".to_string(),
            name: "File::Slurp".to_string(),
        })
    );
}

#[test]
fn test_cross_policy() {
    let targets = targets();
    let packages = packages();
    let debian = target(&targets, "debian-12", Some("s390x"));
    let fedora = target(&targets, "fedora-41", Some("mingw64"));

    assert_eq!(packages.cross_policy("make", &debian).unwrap(), CrossPolicy::Native);
    assert_eq!(packages.cross_policy("glib2", &debian).unwrap(), CrossPolicy::Foreign);
    assert_eq!(packages.cross_policy("libbar", &debian).unwrap(), CrossPolicy::Skip);
    assert_eq!(packages.cross_policy("pkg-config", &debian).unwrap(), CrossPolicy::Foreign);
    assert_eq!(packages.cross_policy("pkg-config", &fedora).unwrap(), CrossPolicy::Foreign);

    // Policy native keeps the build machine package when cross compiling
    assert_eq!(packages.resolve("make", &debian).unwrap(), native("make", "make"));
}

#[test]
fn test_deb_foreign_packages_get_arch_suffix() {
    let targets = targets();
    let packages = packages();
    let debian = target(&targets, "debian-12", Some("s390x"));

    assert_eq!(
        packages.resolve("glib2", &debian).unwrap(),
        cross("glib2", "libglib2.0-dev:s390x", "s390x")
    );

    let arm = target(&targets, "debian-12", Some("aarch64"));
    assert_eq!(
        packages.resolve("pkg-config", &arm).unwrap(),
        cross("pkg-config", "pkgconf:arm64", "aarch64")
    );
}

#[test]
fn test_cross_compiler_keeps_native_name() {
    let targets = targets();
    let debian = target(&targets, "debian-12", Some("s390x"));
    assert_eq!(
        packages().resolve("gcc", &debian).unwrap(),
        cross("gcc", "gcc-s390x-linux-gnu", "s390x")
    );
}

#[test]
fn test_skip_policy_omits_package() {
    let targets = targets();
    let debian = target(&targets, "debian-12", Some("s390x"));
    assert_eq!(packages().resolve("libbar", &debian).unwrap(), None);
}

#[test]
fn test_rpm_cross_needs_explicit_keys() {
    let targets = targets();
    let packages = packages();

    let rawhide = target(&targets, "fedora-rawhide", Some("mingw64"));
    assert_eq!(packages.resolve("libfoo", &rawhide).unwrap(), None);
    assert_eq!(
        packages.resolve("glib2", &rawhide).unwrap(),
        cross("glib2", "mingw64-glib2", "mingw64")
    );

    let native_rawhide = target(&targets, "fedora-rawhide", None);
    assert_eq!(
        packages.resolve("libfoo", &native_rawhide).unwrap(),
        native("libfoo", "libfoo-devel")
    );
}

#[test]
fn test_unknown_generic_name() {
    let targets = targets();
    let debian = target(&targets, "debian-12", None);
    match packages().resolve("no-such-package", &debian) {
        Err(Error::MappingError(msg)) => assert!(msg.contains("no-such-package")),
        other => panic!("expected a mapping error, got {:?}", other),
    }
}

#[test]
fn test_invalid_cross_requests() {
    let targets = targets();
    let packages = packages();

    for (name, arch) in [
        ("debian-12", "mingw64"),
        ("fedora-41", "s390x"),
        ("ubuntu-2204", "aarch64"),
        ("debian-12", "x86_64"),
        ("debian-12", "sparc"),
    ] {
        let t = target(&targets, name, Some(arch));
        assert!(
            matches!(packages.resolve("make", &t), Err(Error::ValidationError(_))),
            "{} cross {} should be rejected",
            name,
            arch
        );
    }
}
