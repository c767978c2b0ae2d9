// src/packages/resolver.rs

//! Generic package name resolution
//!
//! Resolution consults the native table first. When cross compiling, the
//! package's cross policy decides whether the native or the foreign keys are
//! used, or whether the package is dropped. A name the native table can't
//! resolve falls back to the PyPI table and then to the CPAN table.

use super::Package;
use super::mapping::{CrossPolicy, Lookup, LookupKeys, MappingTable, lookup};
use crate::arch;
use crate::datadir::DataDir;
use crate::error::{Error, Result};
use crate::targets::{BuildTarget, PackagingFormat};
use tracing::debug;

/// Compiler drivers keep their native name when cross compiling on Debian
const CROSS_COMPILERS: [&str; 2] = ["gcc", "g++"];

/// Owner of the mapping tables; resolves generic names for a target
#[derive(Debug, Clone, Default)]
pub struct Packages {
    table: MappingTable,
}

impl Packages {
    pub fn new(table: MappingTable) -> Self {
        Self { table }
    }

    pub fn load(data_dir: &DataDir) -> Result<Self> {
        Ok(Self::new(MappingTable::load(data_dir)?))
    }

    pub fn table(&self) -> &MappingTable {
        &self.table
    }

    /// Cross policy for `generic` on `target`; `native` unless a key says otherwise
    pub fn cross_policy(&self, generic: &str, target: &BuildTarget) -> Result<CrossPolicy> {
        let keys = LookupKeys::for_target(target).cross_policy();

        match lookup(generic, self.table.mappings.get(generic), &keys) {
            Lookup::Found(policy) => policy.parse().map_err(|e| match e {
                Error::ConfigError(msg) => {
                    Error::ConfigError(format!("Mapping '{}': {}", generic, msg))
                }
                other => other,
            }),
            Lookup::Disabled | Lookup::Missing => Ok(CrossPolicy::Native),
        }
    }

    /// Resolve `generic` to at most one concrete package
    ///
    /// `Ok(None)` means the package is intentionally not installed on this
    /// target. An unsupported cross request is a `ValidationError`, checked
    /// before names; a name unknown to every table is a `MappingError`.
    pub fn resolve(&self, generic: &str, target: &BuildTarget) -> Result<Option<Package>> {
        target.validate_cross()?;
        if !self.table.contains(generic) {
            return Err(Error::MappingError(format!(
                "No mapping for '{}' (target {})",
                generic, target
            )));
        }

        if self.table.mappings.contains_key(generic) {
            let keys = LookupKeys::for_target(target);
            let policy = match &target.cross_arch {
                Some(_) => self.cross_policy(generic, target)?,
                None => CrossPolicy::Native,
            };

            let package = match (policy, &target.cross_arch) {
                (CrossPolicy::Skip, _) => {
                    debug!("Skipping '{}' for {}", generic, target);
                    return Ok(None);
                }
                (CrossPolicy::Foreign, Some(cross_arch)) => {
                    self.resolve_cross(generic, &keys, target.format(), cross_arch)?
                }
                _ => self.resolve_native(generic, &keys, target.native_arch()),
            };

            if package.is_some() {
                return Ok(package);
            }
        }

        if let Some(package) = self.resolve_pypi(generic) {
            return Ok(Some(package));
        }

        Ok(self.resolve_cpan(generic))
    }

    fn resolve_native(
        &self,
        generic: &str,
        keys: &LookupKeys,
        native_arch: &str,
    ) -> Option<Package> {
        let entry = self.table.mappings.get(generic);
        match lookup(generic, entry, &keys.native(native_arch)) {
            Lookup::Found(name) => Some(Package::Native {
                mapping: generic.to_string(),
                name: name.to_string(),
            }),
            Lookup::Disabled | Lookup::Missing => None,
        }
    }

    fn resolve_cross(
        &self,
        generic: &str,
        keys: &LookupKeys,
        format: &PackagingFormat,
        cross_arch: &str,
    ) -> Result<Option<Package>> {
        let entry = self.table.mappings.get(generic);
        let name = match lookup(generic, entry, &keys.cross(format, cross_arch)) {
            Lookup::Found(name) => name,
            Lookup::Disabled | Lookup::Missing => return Ok(None),
        };

        let name = if *format == PackagingFormat::Deb && !CROSS_COMPILERS.contains(&generic) {
            format!("{}:{}", name, arch::arch_to_deb_arch(cross_arch)?)
        } else {
            name.to_string()
        };

        Ok(Some(Package::Cross {
            mapping: generic.to_string(),
            name,
            arch: cross_arch.to_string(),
        }))
    }

    fn resolve_pypi(&self, generic: &str) -> Option<Package> {
        match lookup(generic, self.table.pypi_mappings.get(generic), &default_key()) {
            Lookup::Found(name) => Some(Package::PyPI {
                mapping: generic.to_string(),
                name: name.to_string(),
            }),
            Lookup::Disabled | Lookup::Missing => None,
        }
    }

    fn resolve_cpan(&self, generic: &str) -> Option<Package> {
        match lookup(generic, self.table.cpan_mappings.get(generic), &default_key()) {
            Lookup::Found(name) => Some(Package::Cpan {
                mapping: generic.to_string(),
                name: name.to_string(),
            }),
            Lookup::Disabled | Lookup::Missing => None,
        }
    }
}

fn default_key() -> [String; 1] {
    ["default".to_string()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::targets::TargetFacts;

    const MAPPINGS: &str = r#"
mappings:
  ccache:
    default: ccache
  gcc:
    default: gcc
    cross-policy-deb: foreign
  libfoo:
    default: libfoo-devel
    deb: libfoo-dev
    cross-policy-default: foreign
  libbar:
    default: libbar
    Debian: null
    Debian10: libbar10
  libbaz:
    default: libbaz
    Debian:
  make:
    default: make
    cross-policy-default: skip
  meson:
    default: meson
    Debian10:
  pkg-config:
    default: pkgconf
    cross-policy-deb: native
    cross-policy-Debian: foreign
  bogus:
    default: bogus
    cross-policy-default: sideways
pypi_mappings:
  meson:
    default: meson
  python3-dbus:
    default: dbus-python
  python3-nopypi:
    default:
cpan_mappings:
  perl-Test-Harness:
    default: Test-Harness
"#;

    fn packages() -> Packages {
        Packages::new(MappingTable::from_yaml_str(MAPPINGS).unwrap())
    }

    fn target(yaml: &str, cross_arch: Option<&str>) -> BuildTarget {
        BuildTarget::from_facts(TargetFacts::from_yaml_str(yaml).unwrap(), cross_arch)
            .with_native_arch("x86_64")
    }

    fn debian10(cross_arch: Option<&str>) -> BuildTarget {
        target(
            concat!(
                "target: debian-10\nos: {name: Debian, version: '10'}\n",
                "packaging: {format: deb, command: apt-get}\n",
            ),
            cross_arch,
        )
    }

    fn fedora_rawhide(cross_arch: Option<&str>) -> BuildTarget {
        target(
            concat!(
                "target: fedora-rawhide\nos: {name: Fedora, version: Rawhide}\n",
                "packaging: {format: rpm, command: dnf}\n",
            ),
            cross_arch,
        )
    }

    fn resolve(generic: &str, target: &BuildTarget) -> Option<Package> {
        packages().resolve(generic, target).unwrap()
    }

    #[test]
    fn test_native_ccache() {
        assert_eq!(
            resolve("ccache", &debian10(None)),
            Some(Package::Native {
                mapping: "ccache".into(),
                name: "ccache".into()
            })
        );
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let pkgs = packages();
        let target = debian10(Some("s390x"));
        let first = pkgs.resolve("libfoo", &target).unwrap();
        for _ in 0..3 {
            assert_eq!(pkgs.resolve("libfoo", &target).unwrap(), first);
        }
    }

    #[test]
    fn test_specific_key_and_null() {
        assert_eq!(resolve("libbar", &debian10(None)).unwrap().name(), "libbar10");
        assert_eq!(resolve("libbaz", &debian10(None)), None);
        assert_eq!(resolve("libbaz", &fedora_rawhide(None)).unwrap().name(), "libbaz");
    }

    #[test]
    fn test_cross_policy_default_is_native() {
        let pkgs = packages();
        assert_eq!(
            pkgs.cross_policy("ccache", &debian10(Some("s390x"))).unwrap(),
            CrossPolicy::Native
        );
        assert_eq!(
            pkgs.cross_policy("ccache", &fedora_rawhide(Some("mingw64"))).unwrap(),
            CrossPolicy::Native
        );
        // The most specific policy key wins
        assert_eq!(
            pkgs.cross_policy("pkg-config", &debian10(Some("s390x"))).unwrap(),
            CrossPolicy::Foreign
        );
    }

    #[test]
    fn test_invalid_cross_policy() {
        let res = packages().resolve("bogus", &debian10(Some("s390x")));
        assert!(matches!(res, Err(Error::ConfigError(_))));
    }

    #[test]
    fn test_deb_cross_suffix_and_compiler_exception() {
        let target = debian10(Some("s390x"));
        assert_eq!(
            resolve("libfoo", &target),
            Some(Package::Cross {
                mapping: "libfoo".into(),
                name: "libfoo-dev:s390x".into(),
                arch: "s390x".into()
            })
        );
        assert_eq!(
            resolve("gcc", &target),
            Some(Package::Cross {
                mapping: "gcc".into(),
                name: "gcc".into(),
                arch: "s390x".into()
            })
        );

        let target = debian10(Some("aarch64"));
        assert_eq!(resolve("libfoo", &target).unwrap().name(), "libfoo-dev:arm64");
    }

    #[test]
    fn test_cross_skip_and_native_policy() {
        let target = debian10(Some("s390x"));
        assert_eq!(resolve("make", &target), None);
        assert!(matches!(
            resolve("ccache", &target),
            Some(Package::Native { .. })
        ));
        // Skip only applies when cross compiling
        assert!(resolve("make", &debian10(None)).is_some());
    }

    #[test]
    fn test_rpm_cross_is_narrow() {
        let pkgs = packages();
        let target = fedora_rawhide(Some("mingw64"));
        let keys = LookupKeys::for_target(&target).cross(target.format(), "mingw64");
        assert_eq!(
            lookup("libfoo", pkgs.table().mappings.get("libfoo"), &keys),
            Lookup::Missing
        );
        assert_eq!(pkgs.resolve("libfoo", &target).unwrap(), None);

        // The same row resolves natively
        assert_eq!(
            pkgs.resolve("libfoo", &fedora_rawhide(None)).unwrap().unwrap().name(),
            "libfoo-devel"
        );
    }

    #[test]
    fn test_language_repositories() {
        let target = debian10(None);
        assert_eq!(
            resolve("python3-dbus", &target),
            Some(Package::PyPI {
                mapping: "python3-dbus".into(),
                name: "dbus-python".into()
            })
        );
        assert_eq!(
            resolve("perl-Test-Harness", &target).unwrap().kind(),
            "cpan"
        );
        assert_eq!(resolve("python3-nopypi", &target), None);
    }

    #[test]
    fn test_native_takes_precedence_over_pypi() {
        assert!(matches!(
            resolve("meson", &fedora_rawhide(None)),
            Some(Package::Native { .. })
        ));
        // Disabled natively, so the PyPI package is used instead
        assert!(matches!(
            resolve("meson", &debian10(None)),
            Some(Package::PyPI { .. })
        ));
    }

    #[test]
    fn test_unknown_name_is_mapping_error() {
        let res = packages().resolve("no-such-package", &debian10(None));
        assert!(matches!(res, Err(Error::MappingError(_))));
    }

    #[test]
    fn test_invalid_cross_request() {
        let pkgs = packages();
        assert!(matches!(
            pkgs.resolve("ccache", &debian10(Some("mingw64"))),
            Err(Error::ValidationError(_))
        ));
        assert!(matches!(
            pkgs.resolve("ccache", &fedora_rawhide(Some("s390x"))),
            Err(Error::ValidationError(_))
        ));
        assert!(matches!(
            pkgs.resolve("ccache", &debian10(Some("x86_64"))),
            Err(Error::ValidationError(_))
        ));
    }

    #[test]
    fn test_invalid_cross_reported_before_unknown_name() {
        assert!(matches!(
            packages().resolve("no-such-package", &debian10(Some("mingw64"))),
            Err(Error::ValidationError(_))
        ));
    }
}
