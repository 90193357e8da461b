//! Session configuration.
//!
//! Two layers: [`SessionConfig`], the read-only snapshot injected into the
//! render entry points (never read from ambient global state), and the saved
//! CLI defaults in a flag-token config file (global path plus a local
//! `.markstreamrc` override).

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Read-only feature snapshot handed to the pipeline per render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Detect document artifacts for dedicated preview.
    pub enable_artifacts: bool,
    /// Fold tall code blocks behind a toggle.
    pub enable_code_fold: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            enable_artifacts: true,
            enable_code_fold: true,
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConfigFlags {
    pub watch: bool,
    pub no_artifacts: bool,
    pub no_fold: bool,
    pub artifacts_json: bool,
    pub font_size: Option<u16>,
}

impl ConfigFlags {
    pub fn union(&self, other: &Self) -> Self {
        Self {
            watch: self.watch || other.watch,
            no_artifacts: self.no_artifacts || other.no_artifacts,
            no_fold: self.no_fold || other.no_fold,
            artifacts_json: self.artifacts_json || other.artifacts_json,
            font_size: other.font_size.or(self.font_size),
        }
    }

    /// The session snapshot these flags describe.
    pub const fn session(&self) -> SessionConfig {
        SessionConfig {
            enable_artifacts: !self.no_artifacts,
            enable_code_fold: !self.no_fold,
        }
    }
}

pub fn global_config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        if let Some(appdata) = std::env::var_os("APPDATA") {
            return PathBuf::from(appdata).join("markstream").join("config");
        }
    }

    #[cfg(target_os = "macos")]
    {
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home)
                .join("Library")
                .join("Application Support")
                .join("markstream")
                .join("config");
        }
    }

    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME") {
            return PathBuf::from(xdg).join("markstream").join("config");
        }
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home)
                .join(".config")
                .join("markstream")
                .join("config");
        }
    }

    PathBuf::from(".markstreamrc")
}

pub fn local_override_path() -> PathBuf {
    PathBuf::from(".markstreamrc")
}

pub fn load_config_flags(path: &Path) -> Result<ConfigFlags> {
    if !path.exists() {
        return Ok(ConfigFlags::default());
    }
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    let tokens = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .flat_map(|line| line.split_whitespace().map(ToOwned::to_owned))
        .collect::<Vec<_>>();
    Ok(parse_flag_tokens(&tokens))
}

pub fn save_config_flags(path: &Path, flags: &ConfigFlags) -> Result<()> {
    let mut lines = Vec::new();
    lines.push("# markstream defaults (saved with --save)".to_string());
    if flags.watch {
        lines.push("--watch".to_string());
    }
    if flags.no_artifacts {
        lines.push("--no-artifacts".to_string());
    }
    if flags.no_fold {
        lines.push("--no-fold".to_string());
    }
    if flags.artifacts_json {
        lines.push("--artifacts-json".to_string());
    }
    if let Some(size) = flags.font_size {
        lines.push(format!("--font-size {size}"));
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config dir {}", parent.display()))?;
    }
    fs::write(path, format!("{}\n", lines.join("\n")))
        .with_context(|| format!("Failed to write config {}", path.display()))
}

pub fn clear_config_flags(path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_file(path).with_context(|| format!("Failed to remove {}", path.display()))?;
    }
    Ok(())
}

pub fn parse_flag_tokens(tokens: &[String]) -> ConfigFlags {
    let mut flags = ConfigFlags::default();
    let mut i = 0;
    while i < tokens.len() {
        let token = &tokens[i];
        if token == "--watch" {
            flags.watch = true;
        } else if token == "--no-artifacts" {
            flags.no_artifacts = true;
        } else if token == "--no-fold" {
            flags.no_fold = true;
        } else if token == "--artifacts-json" {
            flags.artifacts_json = true;
        } else if token == "--font-size" {
            if let Some(next) = tokens.get(i + 1) {
                flags.font_size = next.parse().ok();
                i += 1;
            }
        } else if let Some(value) = token.strip_prefix("--font-size=") {
            flags.font_size = value.parse().ok();
        }
        i += 1;
    }
    flags
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_parse_flag_tokens_extracts_known_flags() {
        let args = vec![
            "markstream".to_string(),
            "--watch".to_string(),
            "--no-artifacts".to_string(),
            "--font-size".to_string(),
            "16".to_string(),
            "--artifacts-json".to_string(),
            "notes.md".to_string(),
        ];
        let flags = parse_flag_tokens(&args);
        assert!(flags.watch);
        assert!(flags.no_artifacts);
        assert!(flags.artifacts_json);
        assert_eq!(flags.font_size, Some(16));
        assert!(!flags.no_fold);
    }

    #[test]
    fn test_parse_flag_tokens_accepts_equals_form() {
        let args = vec!["--font-size=18".to_string()];
        assert_eq!(parse_flag_tokens(&args).font_size, Some(18));
    }

    #[test]
    fn test_config_union_merges_cli_over_file_for_options() {
        let file = ConfigFlags {
            watch: true,
            font_size: Some(12),
            ..ConfigFlags::default()
        };
        let cli = ConfigFlags {
            no_fold: true,
            font_size: Some(16),
            ..ConfigFlags::default()
        };
        let merged = file.union(&cli);
        assert!(merged.watch);
        assert!(merged.no_fold);
        assert_eq!(merged.font_size, Some(16));
    }

    #[test]
    fn test_session_snapshot_inverts_disable_flags() {
        let flags = ConfigFlags {
            no_artifacts: true,
            ..ConfigFlags::default()
        };
        let session = flags.session();
        assert!(!session.enable_artifacts);
        assert!(session.enable_code_fold);
    }

    #[test]
    fn test_save_load_and_clear_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(".markstreamrc");
        let flags = ConfigFlags {
            watch: true,
            no_artifacts: true,
            no_fold: true,
            artifacts_json: true,
            font_size: Some(15),
        };

        save_config_flags(&path, &flags).unwrap();
        let loaded = load_config_flags(&path).unwrap();
        assert_eq!(loaded, flags);

        clear_config_flags(&path).unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_load_missing_config_defaults() {
        let dir = tempdir().unwrap();
        let loaded = load_config_flags(&dir.path().join("absent")).unwrap();
        assert_eq!(loaded, ConfigFlags::default());
    }
}
