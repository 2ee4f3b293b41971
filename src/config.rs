//! Curator configuration module.
//!
//! Handles loading, validating, and merging `config.toml`. Stock defaults are
//! overridden by a user `config.toml` found in the config directory (the
//! working directory unless `--config` names another).
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [server]
//! base_url = ""                                   # Prefix for absolute links in Markdown reports
//! image_prefix = "/images"                        # Images are served from {image_prefix}/{gallery}/{full_path}
//! placeholder = "/static/images/placeholder.jpg"  # Shown until an image scrolls into view
//!
//! [upload]
//! poll_interval_ms = 1000                         # Upload status polling interval
//! failsafe_secs = 300                             # Polling stops after this long regardless
//! accepted_mime_types = ["application/zip", "application/x-zip-compressed"]
//!
//! [report]
//! default_mode = "good_only"                      # or "good_and_neutral"
//! ```
//!
//! ## Partial Configuration
//!
//! Config files are sparse; override just the values you want:
//!
//! ```toml
//! [upload]
//! poll_interval_ms = 500
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::render::RenderContext;
use crate::report::ReportMode;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Configuration loaded from `config.toml`.
///
/// All fields have sensible defaults. User config files need only specify
/// the values they want to override. Unknown keys are rejected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Where the gallery server lives and how image URLs are built.
    pub server: ServerConfig,
    /// Upload status polling.
    pub upload: UploadConfig,
    /// Report export defaults.
    pub report: ReportConfig,
}

impl Config {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.upload.poll_interval_ms == 0 {
            return Err(ConfigError::Validation(
                "upload.poll_interval_ms must be non-zero".into(),
            ));
        }
        if self.upload.failsafe_secs.saturating_mul(1000) < self.upload.poll_interval_ms {
            return Err(ConfigError::Validation(
                "upload.failsafe_secs must cover at least one poll interval".into(),
            ));
        }
        if self.upload.accepted_mime_types.is_empty() {
            return Err(ConfigError::Validation(
                "upload.accepted_mime_types must not be empty".into(),
            ));
        }
        if self.server.image_prefix.is_empty() {
            return Err(ConfigError::Validation(
                "server.image_prefix must not be empty".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Prepended to image URLs in Markdown reports so links work outside
    /// the browser. Empty keeps them relative.
    pub base_url: String,
    pub image_prefix: String,
    pub placeholder: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            image_prefix: "/images".to_string(),
            placeholder: "/static/images/placeholder.jpg".to_string(),
        }
    }
}

impl ServerConfig {
    pub fn render_context(&self, gallery: &str) -> RenderContext {
        RenderContext {
            gallery: gallery.to_string(),
            image_prefix: self.image_prefix.clone(),
            placeholder: self.placeholder.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UploadConfig {
    pub poll_interval_ms: u64,
    pub failsafe_secs: u64,
    /// MIME types accepted as zip archives.
    pub accepted_mime_types: Vec<String>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1000,
            failsafe_secs: 300,
            accepted_mime_types: vec![
                "application/zip".to_string(),
                "application/x-zip-compressed".to_string(),
            ],
        }
    }
}

impl UploadConfig {
    pub fn accepts(&self, mime: &str) -> bool {
        self.accepted_mime_types.iter().any(|m| m == mime)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReportConfig {
    pub default_mode: ReportMode,
}

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the canonical representation of all default values, used as the
/// base layer for merging user overrides on top.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(Config::default())?)
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a `config.toml` from a directory as a raw TOML value.
///
/// Returns `Ok(None)` if no `config.toml` exists in the directory.
pub fn load_raw_config(dir: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = dir.join("config.toml");
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<Config, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: Config = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `config.toml` in the given directory.
pub fn load_config(dir: &Path) -> Result<Config, ConfigError> {
    let base = stock_defaults_value()?;
    let overlay = load_raw_config(dir)?;
    let config = resolve_config(base, overlay)?;
    log::debug!("Loaded config from {}", dir.display());
    Ok(config)
}

/// Returns a fully-commented stock `config.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Gallery Curator Configuration
# =============================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Server
# ---------------------------------------------------------------------------
[server]
# Prefix for absolute image links in Markdown reports, e.g.
# "https://curator.example.com". Empty keeps links relative.
base_url = ""

# Images are served from {image_prefix}/{gallery}/{full_path}.
image_prefix = "/images"

# Shown in place of each image until it scrolls into view.
placeholder = "/static/images/placeholder.jpg"

# ---------------------------------------------------------------------------
# Upload
# ---------------------------------------------------------------------------
[upload]
# How often to poll the server for processing progress.
poll_interval_ms = 1000

# Polling stops after this many seconds even if the server never reports
# completion.
failsafe_secs = 300

# MIME types accepted as zip archives.
accepted_mime_types = ["application/zip", "application/x-zip-compressed"]

# ---------------------------------------------------------------------------
# Reports
# ---------------------------------------------------------------------------
[report]
# Which images exported reports include:
#   "good_only"        - only images marked good
#   "good_and_neutral" - everything not marked bad
default_mode = "good_only"
"##
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_values() {
        let config = Config::default();
        assert_eq!(config.server.image_prefix, "/images");
        assert_eq!(config.upload.poll_interval_ms, 1000);
        assert_eq!(config.upload.failsafe_secs, 300);
        assert_eq!(config.report.default_mode, ReportMode::GoodOnly);
        assert!(config.upload.accepts("application/x-zip-compressed"));
        assert!(!config.upload.accepts("image/jpeg"));
    }

    #[test]
    fn parse_partial_config() {
        let toml = r#"
[upload]
poll_interval_ms = 250
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.upload.poll_interval_ms, 250);
        // Unspecified defaults preserved
        assert_eq!(config.upload.failsafe_secs, 300);
        assert_eq!(config.server.placeholder, "/static/images/placeholder.jpg");
    }

    #[test]
    fn parse_report_mode() {
        let config: Config = toml::from_str("[report]\ndefault_mode = \"good_and_neutral\"\n").unwrap();
        assert_eq!(config.report.default_mode, ReportMode::GoodAndNeutral);
    }

    #[test]
    fn unknown_keys_rejected() {
        assert!(toml::from_str::<Config>("[server]\nbase_uri = \"x\"\n").is_err());
        assert!(toml::from_str::<Config>("[toast]\nduration_ms = 5\n").is_err());
    }

    #[test]
    fn render_context_from_server_config() {
        let ctx = Config::default().server.render_context("demo");
        assert_eq!(ctx.gallery, "demo");
        assert_eq!(ctx.image_prefix, "/images");
    }

    // =========================================================================
    // Merge tests
    // =========================================================================

    #[test]
    fn merge_overrides_leaf_and_keeps_siblings() {
        let base = stock_defaults_value().unwrap();
        let overlay: toml::Value = toml::from_str("[server]\nbase_url = \"https://x\"\n").unwrap();
        let merged = merge_toml(base, overlay);
        let config: Config = merged.try_into().unwrap();
        assert_eq!(config.server.base_url, "https://x");
        assert_eq!(config.server.image_prefix, "/images");
    }

    #[test]
    fn merge_replaces_arrays_entirely() {
        let base = stock_defaults_value().unwrap();
        let overlay: toml::Value =
            toml::from_str("[upload]\naccepted_mime_types = [\"application/zip\"]\n").unwrap();
        let config: Config = merge_toml(base, overlay).try_into().unwrap();
        assert_eq!(config.upload.accepted_mime_types, vec!["application/zip"]);
    }

    // =========================================================================
    // load_config tests
    // =========================================================================

    #[test]
    fn load_config_returns_default_when_no_file() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn load_config_reads_file() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join("config.toml"),
            r#"
[server]
image_prefix = "/media"

[upload]
failsafe_secs = 60
"#,
        )
        .unwrap();

        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config.server.image_prefix, "/media");
        assert_eq!(config.upload.failsafe_secs, 60);
        assert_eq!(config.upload.poll_interval_ms, 1000);
    }

    #[test]
    fn load_config_invalid_toml() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("config.toml"), "[server\nbroken").unwrap();
        assert!(matches!(load_config(tmp.path()), Err(ConfigError::Toml(_))));
    }

    #[test]
    fn load_config_validates() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("config.toml"), "[upload]\npoll_interval_ms = 0\n").unwrap();
        assert!(matches!(load_config(tmp.path()), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn failsafe_must_cover_a_poll() {
        let mut config = Config::default();
        config.upload.poll_interval_ms = 5000;
        config.upload.failsafe_secs = 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn stock_config_parses_to_defaults() {
        let config: Config = toml::from_str(stock_config_toml()).unwrap();
        assert_eq!(config, Config::default());
    }
}
