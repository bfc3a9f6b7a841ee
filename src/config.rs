//! Import configuration.
//!
//! Settings come from the command line layered over an optional JSON config
//! file, and are carried as one `ImportConfig` value into the pipeline.
use crate::filter::FilterSet;
use crate::model::ExecutionInfo;
use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Current schema version for the JSON config file.
pub const CONFIG_SCHEMA_VERSION: u32 = 1;
/// Xray REST endpoint for execution imports, relative to the Jira URL.
pub const DEFAULT_ENDPOINT: &str = "rest/raven/1.0/import/execution";

const CONFIG_DIR_NAME: &str = "rf2xray";
const CONFIG_FILE_NAME: &str = "config.json";

fn default_log_keywords() -> Vec<String> {
    vec!["Log".to_string()]
}

fn default_evidence_keywords() -> Vec<String> {
    vec!["Capture Page Screenshot".to_string()]
}

/// Which evidences (and step details) are imported.
#[derive(clap::ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EvidenceMode {
    /// Do not import evidences
    None,
    /// Only import evidences of failed steps
    Fail,
    /// Import all evidences
    #[default]
    All,
}

/// Keyword names with special meaning during step aggregation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordConfig {
    pub log_keywords: Vec<String>,
    pub evidence_keywords: Vec<String>,
}

impl Default for KeywordConfig {
    fn default() -> Self {
        Self {
            log_keywords: default_log_keywords(),
            evidence_keywords: default_evidence_keywords(),
        }
    }
}

impl KeywordConfig {
    pub fn is_log(&self, name: &str) -> bool {
        self.log_keywords.iter().any(|keyword| keyword == name)
    }

    pub fn is_evidence(&self, name: &str) -> bool {
        self.evidence_keywords.iter().any(|keyword| keyword == name)
    }
}

/// Everything the pipeline needs for one run.
#[derive(Debug, Clone, Default)]
pub struct ImportConfig {
    pub evidence_mode: EvidenceMode,
    pub import_steps: bool,
    pub filters: FilterSet,
    pub keywords: KeywordConfig,
    /// Caller-supplied execution metadata, applied over synthesized defaults.
    pub info: ExecutionInfo,
}

/// Signed OAuth 1.0a credentials of a Jira application link, used when no
/// password is given.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OAuthConfig {
    pub consumer_key: String,
    pub access_token: String,
    /// PEM RSA private key (PKCS#1 or PKCS#8) registered with the link.
    pub private_key_path: PathBuf,
}

/// On-disk config file.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub schema_version: u32,
    #[serde(default)]
    pub log_keywords: Option<Vec<String>>,
    #[serde(default)]
    pub evidence_keywords: Option<Vec<String>>,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub info: ExecutionInfo,
    #[serde(default)]
    pub oauth: Option<OAuthConfig>,
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            schema_version: CONFIG_SCHEMA_VERSION,
            log_keywords: None,
            evidence_keywords: None,
            endpoint: None,
            info: ExecutionInfo::default(),
            oauth: None,
        }
    }
}

impl ConfigFile {
    pub fn keywords(&self) -> KeywordConfig {
        KeywordConfig {
            log_keywords: self
                .log_keywords
                .clone()
                .unwrap_or_else(default_log_keywords),
            evidence_keywords: self
                .evidence_keywords
                .clone()
                .unwrap_or_else(default_evidence_keywords),
        }
    }

    pub fn endpoint(&self) -> &str {
        self.endpoint.as_deref().unwrap_or(DEFAULT_ENDPOINT)
    }
}

/// Default config location (`<config_dir>/rf2xray/config.json`).
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

/// Load the explicit config, else the default one when present, else defaults.
pub fn resolve_config(explicit: Option<&Path>) -> Result<ConfigFile> {
    if let Some(path) = explicit {
        return load_config(path);
    }
    match default_config_path() {
        Some(path) if path.is_file() => load_config(&path),
        _ => Ok(ConfigFile::default()),
    }
}

pub fn load_config(path: &Path) -> Result<ConfigFile> {
    let bytes = fs::read(path).with_context(|| format!("read config {}", path.display()))?;
    let config: ConfigFile = serde_json::from_slice(&bytes)
        .with_context(|| format!("parse config JSON {}", path.display()))?;
    validate_config(&config)?;
    tracing::debug!(path = %path.display(), "loaded config");
    Ok(config)
}

pub fn validate_config(config: &ConfigFile) -> Result<()> {
    if config.schema_version != CONFIG_SCHEMA_VERSION {
        return Err(anyhow!(
            "unsupported config schema_version {}",
            config.schema_version
        ));
    }
    for (label, keywords) in [
        ("log_keywords", &config.log_keywords),
        ("evidence_keywords", &config.evidence_keywords),
    ] {
        if let Some(keywords) = keywords {
            if keywords.iter().any(|keyword| keyword.trim().is_empty()) {
                return Err(anyhow!("{label} entries must be non-empty"));
            }
        }
    }
    if let Some(endpoint) = config.endpoint.as_deref() {
        if endpoint.trim().is_empty() {
            return Err(anyhow!("endpoint must be non-empty"));
        }
    }
    if let Some(oauth) = config.oauth.as_ref() {
        for (label, value) in [
            ("oauth.consumer_key", oauth.consumer_key.as_str()),
            ("oauth.access_token", oauth.access_token.as_str()),
        ] {
            if value.trim().is_empty() {
                return Err(anyhow!("{label} must be non-empty"));
            }
        }
        if oauth.private_key_path.as_os_str().is_empty() {
            return Err(anyhow!("oauth.private_key_path must be non-empty"));
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
