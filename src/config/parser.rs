use super::Settings;
use crate::error::{Error, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Config file names, in lookup order.
pub const CONFIG_FILE_NAMES: &[&str] = &["stackhub.yaml", "stackhub.yml"];

pub const ENV_SERVICES_ROOT: &str = "STACKHUB_SERVICES_ROOT";
pub const ENV_DATABASE: &str = "STACKHUB_DATABASE";

pub struct Parser;

impl Parser {
    pub fn new() -> Self {
        Self
    }

    /// Find a config file starting from the current directory.
    pub fn find_config_file(&self) -> Result<Option<PathBuf>> {
        let current_dir = std::env::current_dir()?;
        Ok(Self::find_config_in_dir(&current_dir))
    }

    /// Search `dir` and then each of its ancestors.
    pub fn find_config_in_dir(dir: &Path) -> Option<PathBuf> {
        dir.ancestors().find_map(|candidate| {
            CONFIG_FILE_NAMES
                .iter()
                .map(|name| candidate.join(name))
                .find(|path| path.is_file())
        })
    }

    /// Load settings from a file. Relative paths inside it resolve against
    /// the file's directory.
    pub fn load_settings<P: AsRef<Path>>(&self, path: P) -> Result<Settings> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            Error::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        let mut settings = self.parse_settings(&content)?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        settings.resolve_paths(base);
        Ok(settings)
    }

    /// Parse settings from YAML. An empty document yields the defaults.
    pub fn parse_settings(&self, content: &str) -> Result<Settings> {
        if content.trim().is_empty() {
            return Ok(Settings::default());
        }
        serde_yaml::from_str(content)
            .map_err(|e| Error::Config(format!("Failed to parse stackhub.yaml: {}", e)))
    }

    /// Resolve the effective settings: explicit file, else discovered file,
    /// else defaults rooted at the current directory; then environment
    /// overrides; then validation.
    pub fn load(&self, explicit: Option<&Path>) -> Result<LoadedSettings> {
        let cwd = std::env::current_dir()?;
        let source = match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => Self::find_config_in_dir(&cwd),
        };

        let mut settings = match &source {
            Some(path) => {
                debug!("Loading settings from {}", path.display());
                self.load_settings(path)?
            }
            None => {
                debug!("No stackhub.yaml found; using defaults");
                let mut settings = Settings::default();
                settings.resolve_paths(&cwd);
                settings
            }
        };

        settings.apply_env_overrides(&cwd, |key| std::env::var(key).ok());
        settings.validate()?;
        Ok(LoadedSettings { settings, source })
    }
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

/// Settings plus the file they came from, if any.
#[derive(Debug, Clone)]
pub struct LoadedSettings {
    pub settings: Settings,
    pub source: Option<PathBuf>,
}

impl Settings {
    fn resolve_paths(&mut self, base: &Path) {
        if self.services_root.is_relative() {
            self.services_root = base.join(&self.services_root);
        }
        if self.database.is_relative() {
            self.database = base.join(&self.database);
        }
    }

    /// Apply `STACKHUB_*` overrides. Relative override paths resolve against `cwd`.
    pub fn apply_env_overrides<F>(&mut self, cwd: &Path, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let absolute = |raw: String| {
            let p = PathBuf::from(raw);
            if p.is_relative() {
                cwd.join(p)
            } else {
                p
            }
        };
        if let Some(root) = lookup(ENV_SERVICES_ROOT).filter(|v| !v.is_empty()) {
            self.services_root = absolute(root);
        }
        if let Some(db) = lookup(ENV_DATABASE).filter(|v| !v.is_empty()) {
            self.database = absolute(db);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_full_settings() {
        let yaml = r#"
services_root: /srv/stacks
database: /var/lib/stackhub/registry.db
runtime:
  command_timeout: 2m
  inspect_timeout: 5s
  max_concurrent_inspections: 4
  compose_command: v2
registry:
  enable_new_services: true
logs:
  default_tail: 250
auth:
  tokens: [abc123]
"#;
        let s = Parser::new().parse_settings(yaml).unwrap();
        assert_eq!(s.services_root, PathBuf::from("/srv/stacks"));
        assert_eq!(s.runtime.max_concurrent_inspections, 4);
        assert_eq!(s.runtime.timeouts().command, std::time::Duration::from_secs(120));
        assert_eq!(s.runtime.compose_flavour(), Some(crate::docker::ComposeCommand::V2));
        assert!(s.registry.enable_new_services);
        assert_eq!(s.logs.default_tail, 250);
        assert_eq!(s.auth.tokens, vec!["abc123"]);
    }

    #[test]
    fn test_partial_settings_fill_defaults() {
        let s = Parser::new().parse_settings("logs:\n  default_tail: 10\n").unwrap();
        assert_eq!(s.logs.default_tail, 10);
        assert_eq!(s.runtime, crate::config::RuntimeSettings::default());
    }

    #[test]
    fn test_unknown_keys_rejected() {
        assert!(Parser::new().parse_settings("servicez_root: /x\n").is_err());
    }

    #[test]
    fn test_find_config_walks_up() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("stackhub.yml"), "").unwrap();
        let nested = tmp.path().join("a").join("b");
        fs::create_dir_all(&nested).unwrap();
        assert_eq!(
            Parser::find_config_in_dir(&nested),
            Some(tmp.path().join("stackhub.yml"))
        );
    }

    #[test]
    fn test_relative_paths_resolve_against_config_dir() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("stackhub.yaml");
        fs::write(&path, "services_root: stacks\n").unwrap();
        let s = Parser::new().load_settings(&path).unwrap();
        assert_eq!(s.services_root, tmp.path().join("stacks"));
        assert_eq!(s.database, tmp.path().join("stackhub.db"));
    }

    #[test]
    fn test_env_overrides() {
        let mut s = Settings::default();
        s.apply_env_overrides(Path::new("/work"), |key| match key {
            ENV_SERVICES_ROOT => Some("/opt/stacks".to_string()),
            ENV_DATABASE => Some("db/reg.db".to_string()),
            _ => None,
        });
        assert_eq!(s.services_root, PathBuf::from("/opt/stacks"));
        assert_eq!(s.database, PathBuf::from("/work/db/reg.db"));
    }
}
