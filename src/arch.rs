// src/arch.rs

//! Architecture name translation and cross-compilation validation
//!
//! Architectures are named the way libvirt names them (`x86_64`, `aarch64`,
//! `armv7l`, ...) with the addition of the `mingw32`/`mingw64` pseudo
//! architectures used for Windows cross builds.

use crate::error::{Error, Result};
use std::env;

/// Canonical name of the architecture this binary runs on
///
/// Mirrors libvirt's host arch canonicalization.
pub fn host_arch() -> String {
    canonicalize_arch(env::consts::ARCH)
}

/// Translate Rust/uname style names to the canonical ones
pub fn canonicalize_arch(arch: &str) -> String {
    match arch {
        "i386" | "i486" | "i586" | "x86" => "i686",
        "amd64" | "x64" => "x86_64",
        "arm64" => "aarch64",
        "arm" => "armv7l",
        "powerpc64" if cfg!(target_endian = "little") => "ppc64le",
        other => other,
    }
    .to_string()
}

/// GNU ABI triple for an architecture
pub fn arch_to_abi(arch: &str) -> Result<&'static str> {
    let abi = match arch {
        "aarch64" => "aarch64-linux-gnu",
        "armv6l" => "arm-linux-gnueabi",
        "armv7l" => "arm-linux-gnueabihf",
        "i686" => "i686-linux-gnu",
        "mingw32" => "i686-w64-mingw32",
        "mingw64" => "x86_64-w64-mingw32",
        "mips" => "mips-linux-gnu",
        "mipsel" => "mipsel-linux-gnu",
        "mips64el" => "mips64el-linux-gnuabi64",
        "ppc64le" => "powerpc64le-linux-gnu",
        "riscv64" => "riscv64-linux-gnu",
        "s390x" => "s390x-linux-gnu",
        "x86_64" => "x86_64-linux-gnu",
        _ => return Err(unsupported(arch)),
    };
    Ok(abi)
}

/// Debian architecture name for an architecture
pub fn arch_to_deb_arch(arch: &str) -> Result<&'static str> {
    let deb = match arch {
        "aarch64" => "arm64",
        "armv6l" => "armel",
        "armv7l" => "armhf",
        "i686" => "i386",
        "mips" => "mips",
        "mipsel" => "mipsel",
        "mips64el" => "mips64el",
        "ppc64le" => "ppc64el",
        "riscv64" => "riscv64",
        "s390x" => "s390x",
        "x86_64" => "amd64",
        _ => return Err(unsupported(arch)),
    };
    Ok(deb)
}

/// Is this one of the Windows cross targets
pub fn is_mingw(arch: &str) -> bool {
    arch.starts_with("mingw")
}

/// Check that `cross_arch` can be built on the given host OS
///
/// Debian hosts build Linux foreign architectures through multiarch, Fedora
/// hosts only carry the MinGW toolchains. Nothing else cross compiles.
pub fn validate_cross_platform(cross_arch: &str, native_arch: &str, os_name: &str) -> Result<()> {
    arch_to_abi(cross_arch)?;

    if cross_arch == native_arch {
        return Err(Error::ValidationError(format!(
            "Cross arch '{}' must differ from the native arch",
            cross_arch
        )));
    }

    match os_name {
        "Debian" if is_mingw(cross_arch) => Err(Error::ValidationError(format!(
            "Cannot cross compile for {} on {}",
            cross_arch, os_name
        ))),
        "Fedora" if !is_mingw(cross_arch) => Err(Error::ValidationError(format!(
            "Cannot cross compile for {} on {}",
            cross_arch, os_name
        ))),
        "Debian" | "Fedora" => Ok(()),
        _ => Err(Error::ValidationError(format!(
            "Cannot cross compile on {}",
            os_name
        ))),
    }
}

fn unsupported(arch: &str) -> Error {
    Error::ValidationError(format!("Unsupported architecture {}", arch))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonicalize_arch() {
        assert_eq!(canonicalize_arch("i586"), "i686");
        assert_eq!(canonicalize_arch("amd64"), "x86_64");
        assert_eq!(canonicalize_arch("x86_64"), "x86_64");
        assert_eq!(canonicalize_arch("aarch64"), "aarch64");
        assert_eq!(canonicalize_arch("s390x"), "s390x");
    }

    #[test]
    fn test_arch_tables() {
        assert_eq!(arch_to_abi("s390x").unwrap(), "s390x-linux-gnu");
        assert_eq!(arch_to_abi("mingw64").unwrap(), "x86_64-w64-mingw32");
        assert_eq!(arch_to_deb_arch("aarch64").unwrap(), "arm64");
        assert_eq!(arch_to_deb_arch("ppc64le").unwrap(), "ppc64el");
        assert!(arch_to_deb_arch("mingw64").is_err());
        assert!(arch_to_abi("sparc").is_err());
    }

    #[test]
    fn test_validate_cross_platform() {
        assert!(validate_cross_platform("s390x", "x86_64", "Debian").is_ok());
        assert!(validate_cross_platform("mingw64", "x86_64", "Fedora").is_ok());

        assert!(validate_cross_platform("mingw64", "x86_64", "Debian").is_err());
        assert!(validate_cross_platform("s390x", "x86_64", "Fedora").is_err());
        assert!(validate_cross_platform("s390x", "x86_64", "Alpine").is_err());
        assert!(validate_cross_platform("aarch64", "aarch64", "Debian").is_err());
        assert!(validate_cross_platform("vax", "x86_64", "Debian").is_err());
    }
}
