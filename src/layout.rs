//! On-disk layout of the services root.
//!
//! Every service lives in `<services_root>/<name>/` and is described by one
//! compose definition file in that directory. Directories whose names start
//! with `.` are reserved for internal use (archive staging) and are never
//! treated as services.

use crate::error::{Error, Result};
use regex::Regex;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{debug, info, warn};

/// Longest accepted service name (a DNS label).
pub const MAX_SERVICE_NAME_LEN: usize = 63;

static SERVICE_NAME: OnceLock<Regex> = OnceLock::new();

/// Check that `name` can be used both as a directory and a compose project name.
///
/// Compose project names must be lowercase, so uppercase is rejected here
/// rather than folded, which keeps the name, directory and project identical.
pub fn validate_service_name(name: &str) -> Result<()> {
    let invalid = |reason: &str| Error::InvalidName {
        name: name.to_string(),
        reason: reason.to_string(),
    };
    if name.is_empty() {
        return Err(invalid("name is empty"));
    }
    if name.len() > MAX_SERVICE_NAME_LEN {
        return Err(invalid("name is longer than 63 characters"));
    }
    let re = SERVICE_NAME.get_or_init(|| {
        Regex::new(r"^[a-z0-9][a-z0-9-]*$").expect("static regex pattern is valid")
    });
    if !re.is_match(name) {
        return Err(invalid(
            "only lowercase letters, digits and '-' are allowed, and it must start with a letter or digit",
        ));
    }
    Ok(())
}

/// Definition file names, in lookup order. New services are written with the first.
pub const DEFINITION_FILE_NAMES: &[&str] = &[
    "docker-compose.yml",
    "docker-compose.yaml",
    "compose.yml",
    "compose.yaml",
];

/// What was found when looking for a service's definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DefinitionLookup {
    Found { file: PathBuf, text: String },
    MissingDirectory,
    NotADirectory,
    MissingFile,
    Unreadable { file: PathBuf, reason: String },
}

impl DefinitionLookup {
    /// Human-readable reason when no definition text is available.
    pub fn problem(&self) -> Option<String> {
        match self {
            DefinitionLookup::Found { .. } => None,
            DefinitionLookup::MissingDirectory => Some("service directory does not exist".into()),
            DefinitionLookup::NotADirectory => Some("service path is not a directory".into()),
            DefinitionLookup::MissingFile => Some(format!(
                "no definition file found (looked for {})",
                DEFINITION_FILE_NAMES.join(", ")
            )),
            DefinitionLookup::Unreadable { file, reason } => Some(format!(
                "definition file {} is unreadable: {}",
                file.display(),
                reason
            )),
        }
    }
}

/// Find the definition file inside `dir`, if any.
pub fn find_definition(dir: &Path) -> Option<PathBuf> {
    DEFINITION_FILE_NAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|candidate| candidate.is_file())
}

/// Resolve and read the definition of the service stored at `dir`.
pub fn locate_definition(dir: &Path) -> DefinitionLookup {
    match fs::metadata(dir) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => return DefinitionLookup::MissingDirectory,
        Err(e) => {
            return DefinitionLookup::Unreadable {
                file: dir.to_path_buf(),
                reason: e.to_string(),
            }
        }
        Ok(meta) if !meta.is_dir() => return DefinitionLookup::NotADirectory,
        Ok(_) => {}
    }

    let Some(file) = find_definition(dir) else {
        return DefinitionLookup::MissingFile;
    };
    match fs::read_to_string(&file) {
        Ok(text) => DefinitionLookup::Found { file, text },
        Err(e) => DefinitionLookup::Unreadable {
            file,
            reason: e.to_string(),
        },
    }
}

/// The services root directory.
#[derive(Debug, Clone)]
pub struct ServicesLayout {
    root: PathBuf,
}

impl ServicesLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the root directory if it does not exist yet.
    pub fn ensure_root(&self) -> Result<()> {
        fs::create_dir_all(&self.root).map_err(|e| {
            Error::Filesystem(format!(
                "Failed to create services root {}: {}",
                self.root.display(),
                e
            ))
        })
    }

    /// Directory a service named `name` lives in.
    pub fn service_dir(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// Hidden scratch directory used while unpacking an archive for `name`.
    pub fn staging_dir(&self, name: &str) -> PathBuf {
        self.root.join(format!(".staging-{}", name))
    }

    /// Write a new service directory containing `definition_text`.
    ///
    /// Fails with [`Error::FolderConflict`] if the directory already exists.
    /// Nothing is left behind on failure.
    pub fn materialize(&self, name: &str, definition_text: &str) -> Result<PathBuf> {
        self.ensure_root()?;
        let dir = self.service_dir(name);

        match fs::create_dir(&dir) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                return Err(Error::FolderConflict {
                    name: name.to_string(),
                    path: dir.display().to_string(),
                })
            }
            Err(e) => {
                return Err(Error::Filesystem(format!(
                    "Failed to create {}: {}",
                    dir.display(),
                    e
                )))
            }
        }

        let file = dir.join(DEFINITION_FILE_NAMES[0]);
        if let Err(e) = fs::write(&file, definition_text) {
            self.discard(&dir);
            return Err(Error::Filesystem(format!(
                "Failed to write {}: {}",
                file.display(),
                e
            )));
        }

        debug!("Materialized service '{}' at {}", name, dir.display());
        Ok(dir)
    }

    /// Move a prepared directory into place as the service `name`.
    pub fn install(&self, staged: &Path, name: &str) -> Result<PathBuf> {
        let dir = self.service_dir(name);
        if dir.exists() {
            return Err(Error::FolderConflict {
                name: name.to_string(),
                path: dir.display().to_string(),
            });
        }
        fs::rename(staged, &dir).map_err(|e| {
            Error::Filesystem(format!(
                "Failed to move {} to {}: {}",
                staged.display(),
                dir.display(),
                e
            ))
        })?;
        Ok(dir)
    }

    /// Recursively delete a service directory. A missing directory is not an error.
    pub fn remove(&self, dir: &Path) -> Result<()> {
        match fs::remove_dir_all(dir) {
            Ok(()) => {
                info!("Removed service directory {}", dir.display());
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::Filesystem(format!(
                "Failed to remove {}: {}",
                dir.display(),
                e
            ))),
        }
    }

    /// Best-effort cleanup used on failure paths.
    pub fn discard(&self, dir: &Path) {
        if let Err(e) = fs::remove_dir_all(dir) {
            if e.kind() != io::ErrorKind::NotFound {
                warn!("Failed to clean up {}: {}", dir.display(), e);
            }
        }
    }

    /// Names of all non-hidden directories directly under the root, sorted.
    /// A missing root has no directories.
    pub fn scan(&self) -> Result<Vec<String>> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(Error::Filesystem(format!(
                    "Failed to read services root {}: {}",
                    self.root.display(),
                    e
                )))
            }
        };

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') {
                continue;
            }
            names.push(name);
        }
        names.sort();
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn layout() -> (ServicesLayout, TempDir) {
        let dir = TempDir::new().unwrap();
        (ServicesLayout::new(dir.path().join("services")), dir)
    }

    #[test]
    fn service_names() {
        for ok in ["web", "web-2", "a", "0-db"] {
            assert!(validate_service_name(ok).is_ok(), "{}", ok);
        }
        let long = "x".repeat(64);
        let bad_names = [
            "", "-web", "Web", "web-API", "web_1", "web.app", "../etc", "a b", long.as_str(),
        ];
        for bad in bad_names {
            let err = validate_service_name(bad).unwrap_err();
            assert!(matches!(err, Error::InvalidName { .. }), "{}", bad);
        }
        assert!(validate_service_name(&"x".repeat(63)).is_ok());
    }

    #[test]
    fn materialize_writes_default_definition_name() {
        let (layout, _tmp) = layout();
        let dir = layout.materialize("web", "services: {}\n").unwrap();
        assert_eq!(dir, layout.service_dir("web"));
        assert_eq!(
            find_definition(&dir),
            Some(dir.join("docker-compose.yml"))
        );
    }

    #[test]
    fn materialize_refuses_existing_folder() {
        let (layout, _tmp) = layout();
        layout.materialize("web", "a").unwrap();
        let err = layout.materialize("web", "b").unwrap_err();
        assert!(matches!(err, Error::FolderConflict { .. }));
        // Original content untouched.
        let text = fs::read_to_string(layout.service_dir("web").join("docker-compose.yml")).unwrap();
        assert_eq!(text, "a");
    }

    #[test]
    fn alternate_definition_names_are_found() {
        let (layout, _tmp) = layout();
        let dir = layout.service_dir("api");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("compose.yaml"), "services: {}").unwrap();
        match locate_definition(&dir) {
            DefinitionLookup::Found { file, text } => {
                assert!(file.ends_with("compose.yaml"));
                assert_eq!(text, "services: {}");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn lookup_distinguishes_missing_cases() {
        let (layout, tmp) = layout();
        assert_eq!(
            locate_definition(&layout.service_dir("ghost")),
            DefinitionLookup::MissingDirectory
        );

        let empty = layout.service_dir("empty");
        fs::create_dir_all(&empty).unwrap();
        assert_eq!(locate_definition(&empty), DefinitionLookup::MissingFile);

        let file = tmp.path().join("plain-file");
        fs::write(&file, "x").unwrap();
        assert_eq!(locate_definition(&file), DefinitionLookup::NotADirectory);
        assert!(DefinitionLookup::NotADirectory.problem().is_some());
    }

    #[test]
    fn scan_skips_hidden_and_files() {
        let (layout, _tmp) = layout();
        layout.ensure_root().unwrap();
        fs::create_dir(layout.root().join("b")).unwrap();
        fs::create_dir(layout.root().join("a")).unwrap();
        fs::create_dir(layout.root().join(".staging-x")).unwrap();
        fs::write(layout.root().join("notes.txt"), "").unwrap();
        assert_eq!(layout.scan().unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn scan_of_missing_root_is_empty() {
        let (layout, _tmp) = layout();
        assert!(layout.scan().unwrap().is_empty());
    }

    #[test]
    fn remove_is_idempotent() {
        let (layout, _tmp) = layout();
        let dir = layout.materialize("web", "x").unwrap();
        layout.remove(&dir).unwrap();
        assert!(!dir.exists());
        layout.remove(&dir).unwrap();
    }

    #[test]
    fn install_moves_staged_directory() {
        let (layout, _tmp) = layout();
        layout.ensure_root().unwrap();
        let staged = layout.staging_dir("web");
        fs::create_dir_all(&staged).unwrap();
        fs::write(staged.join("compose.yml"), "x").unwrap();
        let dir = layout.install(&staged, "web").unwrap();
        assert!(dir.join("compose.yml").is_file());
        assert!(!staged.exists());
    }
}
