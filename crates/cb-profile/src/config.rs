//! Configuration loading and validation.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::ConfigError;

/// Top-level content blocking configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ContentBlockingConfig {
    /// Compile interior `*` in patterns as wildcards.
    #[serde(default = "default_enable_wildcards")]
    pub enable_wildcards: bool,

    /// Base directory for relative profile paths.
    pub lists_dir: Option<PathBuf>,

    /// `public_suffix_list.dat` used for third-party detection.
    pub psl_path: Option<PathBuf>,

    #[serde(default)]
    pub profiles: Vec<ProfileConfig>,
}

/// One filter list profile.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProfileConfig {
    pub name: String,

    /// Display title; the list header title is used when absent.
    pub title: Option<String>,

    /// Local copy of the filter list.
    pub path: PathBuf,

    /// Where updates are downloaded from.
    pub update_url: Option<String>,

    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

const fn default_enable_wildcards() -> bool {
    true
}

const fn default_enabled() -> bool {
    true
}

impl Default for ContentBlockingConfig {
    fn default() -> Self {
        Self {
            enable_wildcards: default_enable_wildcards(),
            lists_dir: None,
            psl_path: None,
            profiles: Vec::new(),
        }
    }
}

impl ContentBlockingConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        content.parse()
    }

    /// Resolve a profile path against `lists_dir`.
    pub fn resolve_path(&self, profile: &ProfileConfig) -> PathBuf {
        match &self.lists_dir {
            Some(dir) if profile.path.is_relative() => dir.join(&profile.path),
            _ => profile.path.clone(),
        }
    }

    /// Install the configured public suffix list, if any.
    pub fn install_psl(&self) -> Result<(), ConfigError> {
        if let Some(path) = &self.psl_path {
            cb_core::psl::load_psl_from_file(path)?;
        }
        Ok(())
    }

    /// Profiles with `enabled = true`.
    pub fn enabled_profiles(&self) -> impl Iterator<Item = &ProfileConfig> {
        self.profiles.iter().filter(|profile| profile.enabled)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let mut names = HashSet::new();

        for profile in &self.profiles {
            if profile.name.trim().is_empty() {
                return Err(ConfigError::Validation("profile name cannot be empty".into()));
            }
            if !names.insert(profile.name.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "duplicate profile name: {:?}",
                    profile.name
                )));
            }
            if profile.path.as_os_str().is_empty() {
                return Err(ConfigError::Validation(format!(
                    "profile {:?} has empty path",
                    profile.name
                )));
            }
            if let Some(url) = &profile.update_url {
                if !url.starts_with("http://") && !url.starts_with("https://") {
                    return Err(ConfigError::Validation(format!(
                        "profile {:?} has invalid update_url (must start with http:// or https://): {url:?}",
                        profile.name
                    )));
                }
            }
        }

        Ok(())
    }
}

impl std::str::FromStr for ContentBlockingConfig {
    type Err = ConfigError;

    fn from_str(content: &str) -> Result<Self, Self::Err> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cb_core::psl::PslError;

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
            enable_wildcards = false
            lists_dir = "/var/lib/lists"
            psl_path = "/usr/share/publicsuffix/public_suffix_list.dat"

            [[profiles]]
            name = "easylist"
            title = "EasyList"
            path = "easylist.txt"
            update_url = "https://easylist.to/easylist/easylist.txt"

            [[profiles]]
            name = "local"
            path = "/etc/local.txt"
            enabled = false
        "#;

        let config: ContentBlockingConfig = toml.parse().unwrap();
        assert!(!config.enable_wildcards);
        assert_eq!(
            config.psl_path.as_deref(),
            Some(Path::new("/usr/share/publicsuffix/public_suffix_list.dat"))
        );
        assert_eq!(config.profiles.len(), 2);
        assert_eq!(config.profiles[0].title.as_deref(), Some("EasyList"));
        assert!(config.profiles[0].enabled);
        assert_eq!(
            config.resolve_path(&config.profiles[0]),
            PathBuf::from("/var/lib/lists/easylist.txt")
        );
        assert_eq!(config.resolve_path(&config.profiles[1]), PathBuf::from("/etc/local.txt"));
        assert_eq!(config.enabled_profiles().count(), 1);
    }

    #[test]
    fn test_default_values() {
        let config: ContentBlockingConfig = "".parse().unwrap();
        assert!(config.enable_wildcards);
        assert!(config.lists_dir.is_none());
        assert!(config.psl_path.is_none());
        assert!(config.profiles.is_empty());
        assert!(config.install_psl().is_ok());
    }

    #[test]
    fn test_install_missing_psl() {
        let config: ContentBlockingConfig = r#"psl_path = "/nonexistent/public_suffix_list.dat""#.parse().unwrap();
        assert!(matches!(config.install_psl(), Err(ConfigError::Psl(PslError::Io { .. }))));
    }

    #[test]
    fn test_reject_unknown_fields() {
        let result = "enable_wildcard = true".parse::<ContentBlockingConfig>();
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_reject_duplicate_names() {
        let toml = r#"
            [[profiles]]
            name = "a"
            path = "a.txt"

            [[profiles]]
            name = "a"
            path = "b.txt"
        "#;
        let result = toml.parse::<ContentBlockingConfig>();
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_reject_bad_update_url() {
        let toml = r#"
            [[profiles]]
            name = "a"
            path = "a.txt"
            update_url = "ftp://lists.example/a.txt"
        "#;
        let result = toml.parse::<ContentBlockingConfig>();
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_load_missing_file() {
        let result = ContentBlockingConfig::load("/nonexistent/contentblocker.toml");
        assert!(matches!(result, Err(ConfigError::ReadFile { .. })));
    }
}
