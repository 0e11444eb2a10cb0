//! @ai:module:intent Load scan, check and language settings from a TOML file
//! @ai:module:layer infrastructure
//! @ai:module:public_api Config, ScanConfig, CheckConfig, LanguageConfig, CONFIG_FILE_NAME
//! @ai:module:depends_on language, annotation, extractor, error
//! @ai:module:stateless true

use crate::annotation::DiagnosticKind;
use crate::error::{Error, Result};
use crate::extractor::ScanOptions;
use crate::language::{CommentProfile, LanguageEntry, ProfileRegistry};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// File name looked up by [`Config::discover`].
pub const CONFIG_FILE_NAME: &str = ".atbang.toml";

/// @ai:intent Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub scan: ScanConfig,
    #[serde(default)]
    pub check: CheckConfig,
    /// Extra or overriding comment profiles, keyed by language name.
    #[serde(default)]
    pub languages: BTreeMap<String, LanguageConfig>,
}

/// @ai:intent Settings for file discovery and scanning
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ScanConfig {
    /// Directory names skipped during discovery.
    #[serde(default = "default_exclude")]
    pub exclude: Vec<String>,
    #[serde(default)]
    pub follow_links: bool,
    /// Worker threads; 0 uses the global rayon pool.
    #[serde(default)]
    pub threads: usize,
    /// Scan files with no recognized language using the permissive profile.
    #[serde(default)]
    pub include_unknown: bool,
    #[serde(default)]
    pub report_unrecognized_keys: bool,
}

/// @ai:intent Settings for the check command
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CheckConfig {
    #[serde(default = "default_fail_on")]
    pub fail_on: Vec<DiagnosticKind>,
}

/// @ai:intent A comment profile row supplied by configuration
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct LanguageConfig {
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub extensions: Vec<String>,
    #[serde(default)]
    pub file_names: Vec<String>,
    #[serde(flatten)]
    pub profile: CommentProfile,
}

fn default_exclude() -> Vec<String> {
    [".git", "target", "node_modules", ".venv", "dist", "build"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_fail_on() -> Vec<DiagnosticKind> {
    vec![
        DiagnosticKind::MalformedProperties,
        DiagnosticKind::UnmatchedEnd,
        DiagnosticKind::UnclosedBlock,
    ]
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            exclude: default_exclude(),
            follow_links: false,
            threads: 0,
            include_unknown: false,
            report_unrecognized_keys: false,
        }
    }
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            fail_on: default_fail_on(),
        }
    }
}

impl ScanConfig {
    pub fn scan_options(&self) -> ScanOptions {
        ScanOptions {
            report_unrecognized_keys: self.report_unrecognized_keys,
        }
    }
}

impl Config {
    /// @ai:intent Load configuration from a TOML file
    /// @ai:pre path exists and is readable
    /// @ai:post every configured language has a usable profile
    /// @ai:effects fs:read
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::parse(&content).map_err(|message| Error::Config {
            path: path.to_path_buf(),
            message,
        })
    }

    /// @ai:intent Parse and validate configuration text
    /// @ai:effects pure
    pub fn parse(content: &str) -> std::result::Result<Self, String> {
        let config: Self = toml::from_str(content).map_err(|e| e.to_string())?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> std::result::Result<(), String> {
        for (name, language) in &self.languages {
            if !language.profile.is_usable() {
                return Err(format!(
                    "language `{}` needs at least one line prefix or block delimiter",
                    name
                ));
            }
            if language
                .profile
                .block_delimiters
                .iter()
                .any(|b| b.open.is_empty() || b.close.is_empty())
            {
                return Err(format!(
                    "language `{}` has a block delimiter with an empty open or close",
                    name
                ));
            }
        }
        Ok(())
    }

    /// @ai:intent Find the nearest config file at or above `start`
    /// @ai:post Ok(None) when no config file exists in any ancestor
    /// @ai:effects fs:read
    pub fn discover(start: &Path) -> Result<Option<(PathBuf, Self)>> {
        let dir = if start.is_file() {
            start.parent().unwrap_or(start)
        } else {
            start
        };

        for ancestor in dir.ancestors() {
            let candidate = ancestor.join(CONFIG_FILE_NAME);
            if candidate.is_file() {
                let config = Self::load(&candidate)?;
                return Ok(Some((candidate, config)));
            }
        }

        Ok(None)
    }

    /// @ai:intent Build the profile registry: built-in rows plus configured ones
    /// @ai:effects pure
    pub fn registry(&self) -> ProfileRegistry {
        self.languages
            .iter()
            .fold(ProfileRegistry::builtin(), |registry, (name, language)| {
                registry.with_entry(LanguageEntry {
                    name: name.clone(),
                    aliases: language.aliases.clone(),
                    extensions: language.extensions.clone(),
                    file_names: language.file_names.clone(),
                    profile: language.profile.clone(),
                })
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config, Config::default());
        assert!(config.scan.exclude.contains(&".git".to_string()));
        assert!(config.check.fail_on.contains(&DiagnosticKind::UnclosedBlock));
    }

    #[test]
    fn test_custom_language_row() {
        let config = Config::parse(
            r##"
[check]
fail_on = ["unmatched_end", "malformed_tag_token"]

[languages.terraform]
extensions = ["tf", "tfvars"]
line_prefixes = ["#", "//"]
block_delimiters = [{ open = "/*", close = "*/", continuation = "*" }]
"##,
        )
        .unwrap();

        assert_eq!(
            config.check.fail_on,
            vec![DiagnosticKind::UnmatchedEnd, DiagnosticKind::MalformedTagToken]
        );

        let registry = config.registry();
        let entry = registry.detect(Path::new("main.tf")).unwrap();
        assert_eq!(entry.name, "terraform");
        assert_eq!(entry.profile.line_prefixes, vec!["#", "//"]);
        assert_eq!(
            entry.profile.block_delimiters[0].continuation.as_deref(),
            Some("*")
        );
    }

    #[test]
    fn test_language_without_delimiters_is_rejected() {
        let err = Config::parse("[languages.empty]\nextensions = [\"x\"]\n").unwrap_err();
        assert!(err.contains("empty"));
    }

    #[test]
    fn test_unknown_diagnostic_kind_is_rejected() {
        assert!(Config::parse("[check]\nfail_on = [\"bogus\"]\n").is_err());
    }

    #[test]
    fn test_discover_walks_up() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("a/b");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            "[scan]\nthreads = 2\n",
        )
        .unwrap();

        let (path, config) = Config::discover(&nested).unwrap().unwrap();
        assert_eq!(path, dir.path().join(CONFIG_FILE_NAME));
        assert_eq!(config.scan.threads, 2);
    }

    #[test]
    fn test_load_reports_path_on_bad_toml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "[scan\n").unwrap();
        assert!(matches!(Config::load(&path), Err(Error::Config { .. })));
    }
}
