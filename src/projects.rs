// src/projects.rs

//! Project catalog
//!
//! A project is a named list of generic package names. Public projects live
//! in `facts/projects/*.yml` and can be selected by users; internal projects
//! (`base`, `python-pip`, `perl-cpan`, `unwanted`, ...) live in
//! `facts/projects/internal/` and are folded in by the formatters.
//!
//! Projects may also be loaded from a local path or an `https://` URL to a
//! `.yml` file.

use crate::datadir::DataDir;
use crate::error::{Error, Result};
use crate::packages::{Package, PackageSet, Packages};
use crate::pattern::expand_pattern;
use crate::targets::BuildTarget;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::debug;
use url::Url;

const PUBLIC_DIR: &str = "facts/projects";
const INTERNAL_DIR: &str = "facts/projects/internal";

/// Internal project supplying `pip` when a PyPI package is needed
pub const PYPI_BOOTSTRAP: &str = "python-pip";
/// Internal project supplying `cpanm` when a CPAN package is needed
pub const CPAN_BOOTSTRAP: &str = "perl-cpan";

#[derive(Debug, Deserialize)]
struct ProjectFile {
    packages: Vec<String>,
}

/// Where a project definition came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectSource {
    DataFile(PathBuf),
    Remote(Url),
}

impl std::fmt::Display for ProjectSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DataFile(path) => write!(f, "{}", path.display()),
            Self::Remote(url) => write!(f, "{}", url),
        }
    }
}

#[derive(Debug)]
pub struct Project {
    name: String,
    source: ProjectSource,
    generic_packages: Vec<String>,
    /// Resolved packages per target identity
    cache: RwLock<HashMap<String, Arc<PackageSet>>>,
}

impl Project {
    pub fn new(
        name: impl Into<String>,
        source: ProjectSource,
        generic_packages: Vec<String>,
    ) -> Self {
        Self {
            name: name.into(),
            source,
            generic_packages,
            cache: RwLock::new(HashMap::new()),
        }
    }

    fn from_document(name: &str, source: ProjectSource, content: &str) -> Result<Self> {
        let doc: ProjectFile = serde_yaml::from_str(content).map_err(|e| {
            Error::ProjectError(format!(
                "Can't load packages for '{}' from '{}': {}",
                name, source, e
            ))
        })?;
        Ok(Self::new(name, source, doc.packages))
    }

    fn load_file(name: &str, path: &Path) -> Result<Self> {
        debug!(
            "Loading generic package list for project '{}' from '{}'",
            name,
            path.display()
        );
        let content = fs::read_to_string(path).map_err(|e| {
            Error::ProjectError(format!(
                "Can't load packages for '{}' from '{}': {}",
                name,
                path.display(),
                e
            ))
        })?;
        Self::from_document(name, ProjectSource::DataFile(path.to_path_buf()), &content)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> &ProjectSource {
        &self.source
    }

    pub fn generic_packages(&self) -> &[String] {
        &self.generic_packages
    }

    /// Target identities with a cached resolution
    pub fn cached_targets(&self) -> Vec<String> {
        let cache = self.cache.read().unwrap_or_else(PoisonError::into_inner);
        let mut keys: Vec<String> = cache.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Resolve this project's packages for `target`, memoized per target
    ///
    /// Entries are only ever inserted whole, so a lock poisoned by a
    /// panicking reader or writer still holds a consistent cache.
    pub fn get_packages(
        &self,
        projects: &Projects,
        target: &BuildTarget,
    ) -> Result<Arc<PackageSet>> {
        target.validate_cross()?;
        let identity = target.identity();

        {
            let cache = self.cache.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(packages) = cache.get(&identity) {
                debug!("Using cached packages of '{}' for {}", self.name, identity);
                return Ok(Arc::clone(packages));
            }
        }

        let packages = projects
            .eval_generic_packages(target, &self.generic_packages)
            .map_err(|e| match e {
                Error::MappingError(msg) => {
                    Error::MappingError(format!("{} in project '{}'", msg, self.name))
                }
                other => other,
            })?;
        let packages = Arc::new(packages);

        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(identity, Arc::clone(&packages));
        Ok(packages)
    }
}

/// All known projects plus the mapping tables used to resolve them
#[derive(Debug)]
pub struct Projects {
    packages: Packages,
    public: BTreeMap<String, Project>,
    internal: BTreeMap<String, Project>,
}

impl Projects {
    pub fn new(
        packages: Packages,
        public: impl IntoIterator<Item = Project>,
        internal: impl IntoIterator<Item = Project>,
    ) -> Self {
        let index = |projects: Vec<Project>| {
            projects
                .into_iter()
                .map(|p| (p.name.clone(), p))
                .collect::<BTreeMap<_, _>>()
        };
        Self {
            packages,
            public: index(public.into_iter().collect()),
            internal: index(internal.into_iter().collect()),
        }
    }

    /// Load every public and internal project definition
    pub fn load(data_dir: &DataDir, packages: Packages) -> Result<Self> {
        let public = Self::load_dir(data_dir, PUBLIC_DIR, false)?;
        let internal = Self::load_dir(data_dir, INTERNAL_DIR, true)?;
        debug!(
            "Loaded {} public and {} internal projects",
            public.len(),
            internal.len()
        );

        Ok(Self {
            packages,
            public,
            internal,
        })
    }

    fn load_dir(
        data_dir: &DataDir,
        subdir: &str,
        internal: bool,
    ) -> Result<BTreeMap<String, Project>> {
        let mut projects = BTreeMap::new();

        for path in data_dir.list_files(subdir, ".yml", internal)? {
            let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if projects.contains_key(name) {
                continue;
            }
            projects.insert(name.to_string(), Project::load_file(name, &path)?);
        }

        Ok(projects)
    }

    pub fn packages(&self) -> &Packages {
        &self.packages
    }

    /// Public project names, sorted
    pub fn names(&self) -> Vec<&str> {
        self.public.keys().map(|s| s.as_str()).collect()
    }

    pub fn internal_names(&self) -> Vec<&str> {
        self.internal.keys().map(|s| s.as_str()).collect()
    }

    pub fn public(&self, name: &str) -> Option<&Project> {
        self.public.get(name)
    }

    pub fn internal(&self, name: &str) -> Option<&Project> {
        self.internal.get(name)
    }

    fn project(&self, name: &str) -> Result<&Project> {
        self.public
            .get(name)
            .or_else(|| self.internal.get(name))
            .ok_or_else(|| Error::ProjectError(format!("Unknown project '{}'", name)))
    }

    pub fn expand_names(&self, pattern: &str) -> Result<Vec<String>> {
        expand_pattern(pattern, self.public.keys(), "project")
            .map(|names| names.into_iter().collect())
            .map_err(|e| {
                debug!("Failed to expand '{}'", pattern);
                Error::ProjectError(format!("Failed to expand '{}': {}", pattern, e))
            })
    }

    /// Expand a user selection, loading any path or URL parts on the way
    pub fn select(&mut self, selection: &str) -> Result<Vec<String>> {
        let mut names = Vec::new();
        let mut patterns = Vec::new();

        for part in selection.split(',') {
            if part.contains('/') {
                names.push(self.load_remote(part)?);
            } else {
                patterns.push(part);
            }
        }

        if !patterns.is_empty() {
            names.extend(self.expand_names(&patterns.join(","))?);
        }
        names.sort();
        names.dedup();
        Ok(names)
    }

    /// Load a project from a local path or a `file://`/`https://` URL
    ///
    /// Returns the project name, i.e. the file stem.
    pub fn load_remote(&mut self, location: &str) -> Result<String> {
        let url = parse_project_url(location)?;

        let name = Path::new(url.path())
            .file_stem()
            .and_then(|s| s.to_str())
            .map(str::to_string)
            .ok_or_else(|| {
                Error::ProjectError(format!(
                    "Project {} should refer to a project YML file",
                    location
                ))
            })?;

        if let Some(existing) = self.public.get(&name) {
            match existing.source() {
                ProjectSource::Remote(existing_url) if *existing_url == url => {
                    debug!("Project {} already loaded from {}", name, url);
                    return Ok(name);
                }
                ProjectSource::Remote(existing_url) => {
                    return Err(Error::ProjectError(format!(
                        "Cannot load project {} from {}, already defined with {}",
                        name, url, existing_url
                    )));
                }
                ProjectSource::DataFile(path) => {
                    debug!("Project {} loaded from {}, overriding", name, path.display());
                }
            }
        }

        debug!("Loading generic package list for project '{}' from '{}'", name, url);
        let content = fetch_project(&name, &url)?;
        let project = Project::from_document(&name, ProjectSource::Remote(url), &content)?;
        self.public.insert(name.clone(), project);
        Ok(name)
    }

    /// Union of the packages of the named projects
    ///
    /// Later projects overwrite earlier ones for the same generic name.
    pub fn get_packages<S: AsRef<str>>(
        &self,
        names: &[S],
        target: &BuildTarget,
    ) -> Result<PackageSet> {
        let mut packages = PackageSet::new();

        for name in names {
            let project = self.project(name.as_ref())?;
            let resolved = project.get_packages(self, target)?;
            packages.extend(resolved.iter().map(|(k, v)| (k.clone(), v.clone())));
        }

        Ok(packages)
    }

    /// Resolve a list of generic names, pulling in the language repository
    /// bootstrap projects when needed
    pub fn eval_generic_packages(
        &self,
        target: &BuildTarget,
        generic_packages: &[String],
    ) -> Result<PackageSet> {
        let mut packages = PackageSet::new();
        let mut needs_pypi = false;
        let mut needs_cpan = false;

        for generic in generic_packages {
            let Some(package) = self.packages.resolve(generic, target)? else {
                continue;
            };

            match package {
                Package::PyPI { .. } => needs_pypi = true,
                Package::Cpan { .. } => needs_cpan = true,
                _ => {}
            }
            packages.insert(generic.clone(), package);
        }

        let bootstrap = [(needs_pypi, PYPI_BOOTSTRAP), (needs_cpan, CPAN_BOOTSTRAP)];
        for (needed, name) in bootstrap {
            if !needed {
                continue;
            }
            let project = self.internal.get(name).ok_or_else(|| {
                Error::ProjectError(format!("Missing internal project '{}'", name))
            })?;
            let resolved = project.get_packages(self, target)?;
            packages.extend(resolved.iter().map(|(k, v)| (k.clone(), v.clone())));
        }

        Ok(packages)
    }
}

fn parse_project_url(location: &str) -> Result<Url> {
    let url = if location.contains("://") {
        Url::parse(location).map_err(|e| {
            Error::ProjectError(format!("Cannot parse project URL {}: {}", location, e))
        })?
    } else {
        let path = std::path::absolute(location)?;
        Url::from_file_path(&path).map_err(|_| {
            Error::ProjectError(format!("Cannot parse project URL {}", location))
        })?
    };

    if !matches!(url.scheme(), "https" | "file") {
        return Err(Error::ProjectError(format!(
            "Project {} must use a 'https' or 'file' URI scheme",
            location
        )));
    }
    if !url.path().ends_with(".yml") {
        return Err(Error::ProjectError(format!(
            "Project {} should refer to a project YML file",
            location
        )));
    }

    Ok(url)
}

fn fetch_project(name: &str, url: &Url) -> Result<String> {
    let load_error = |e: &dyn std::fmt::Display| {
        Error::ProjectError(format!(
            "Can't load packages for '{}' from '{}': {}",
            name, url, e
        ))
    };

    if url.scheme() == "file" {
        let path = url
            .to_file_path()
            .map_err(|_| load_error(&"not a local path"))?;
        return fs::read_to_string(path).map_err(|e| load_error(&e));
    }

    let response = reqwest::blocking::get(url.as_str())
        .and_then(|r| r.error_for_status())
        .map_err(|e| Error::DownloadError(format!("{}: {}", url, e)))?;
    response
        .text()
        .map_err(|e| Error::DownloadError(format!("{}: {}", url, e)))
}
