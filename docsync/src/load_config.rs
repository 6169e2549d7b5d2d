/// `load_config` module: loads the static YAML run config and turns it into the
/// pieces the core pipeline needs.
///
/// This module is the only place where user-supplied YAML is parsed. Secrets are
/// never read from the file; credentials come from the environment (see
/// [`Credentials`]).
///
/// # Responsibilities
/// - Parse the run config into type-safe structs
/// - Fill stage defaults (models, token budgets, failure policies) for anything the file omits
/// - Read credentials from the environment and fail before any file is processed when one is missing
///
/// # Errors
/// All errors in this module use `anyhow::Error` and are surfaced at the CLI boundary.
use anyhow::Result;
use docsync_core::changes::DEFAULT_DOCS_PREFIX;
use docsync_core::stages::{FailurePolicy, StageSettings, Stages, DEFAULT_CONVERSION_ATTEMPTS};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info};

pub const ANTHROPIC_API_KEY: &str = "ANTHROPIC_API_KEY";
pub const GITHUB_TOKEN: &str = "GITHUB_TOKEN";

#[derive(Debug, Deserialize)]
pub struct RunConfig {
    /// JSON mapping table.
    pub mapping_table: PathBuf,
    /// JSON classification cache, created on first persist.
    pub classification_cache: PathBuf,
    /// Local checkout of the public repo.
    pub public_repo_path: PathBuf,
    /// Local checkout of the docs repo.
    pub docs_repo_path: PathBuf,
    /// Where forward sync lists the docs paths it wrote.
    #[serde(default)]
    pub synced_files_path: Option<PathBuf>,
    #[serde(default)]
    pub docs_path_prefix: Option<String>,
    #[serde(default)]
    pub conversion_attempts: Option<u32>,
    #[serde(default)]
    pub stages: StagesSection,
}

#[derive(Debug, Default, Deserialize)]
pub struct StagesSection {
    #[serde(default)]
    pub classifier: StageSection,
    #[serde(default)]
    pub comparator: StageSection,
    #[serde(default)]
    pub converter: StageSection,
    #[serde(default)]
    pub validator: StageSection,
}

/// Per-stage overrides; anything left out keeps the stage default.
#[derive(Debug, Default, Deserialize)]
pub struct StageSection {
    pub model: Option<String>,
    pub max_tokens: Option<u32>,
    pub on_failure: Option<FailurePolicy>,
}

impl StageSection {
    fn apply(&self, settings: &mut StageSettings) {
        if let Some(model) = &self.model {
            settings.model = model.clone();
        }
        if let Some(max_tokens) = self.max_tokens {
            settings.max_tokens = max_tokens;
        }
    }
}

impl RunConfig {
    pub fn docs_path_prefix(&self) -> &str {
        self.docs_path_prefix.as_deref().unwrap_or(DEFAULT_DOCS_PREFIX)
    }

    /// Stage set with defaults overlaid by the config file.
    pub fn to_stages(&self) -> Stages {
        let mut stages = Stages::default();

        self.stages.classifier.apply(&mut stages.classifier.settings);
        if let Some(policy) = self.stages.classifier.on_failure {
            stages.classifier.on_failure = policy;
        }
        self.stages.comparator.apply(&mut stages.comparator.settings);
        if let Some(policy) = self.stages.comparator.on_failure {
            stages.comparator.on_failure = policy;
        }
        self.stages.converter.apply(&mut stages.converter.settings);
        self.stages.validator.apply(&mut stages.validator.settings);
        if let Some(policy) = self.stages.validator.on_failure {
            stages.validator.on_failure = policy;
        }

        stages.conversion_attempts = self
            .conversion_attempts
            .unwrap_or(DEFAULT_CONVERSION_ATTEMPTS)
            .max(1);
        stages
    }
}

/// Loads the static YAML run config (no secrets).
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<RunConfig> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let config_content = match fs::read_to_string(path_ref) {
        Ok(content) => {
            info!(config_path = ?path_ref, "Config file read successfully");
            content
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
            return Err(anyhow::anyhow!(
                "Failed to read config file {:?}: {}",
                path_ref,
                e
            ));
        }
    };

    let config: RunConfig = match serde_yaml::from_str(&config_content) {
        Ok(conf) => {
            info!(config_path = ?path_ref, "Parsed config YAML successfully");
            conf
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
            return Err(anyhow::anyhow!("Failed to parse config YAML: {e}"));
        }
    };

    if config.conversion_attempts == Some(0) {
        error!(config_path = ?path_ref, "conversion_attempts must be at least 1");
        return Err(anyhow::anyhow!("conversion_attempts must be at least 1"));
    }

    Ok(config)
}

/// API credentials read from the environment.
#[derive(Clone)]
pub struct Credentials {
    pub anthropic_api_key: String,
    pub github_token: Option<String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("anthropic_api_key", &"<redacted>")
            .field("github_token", &self.github_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl Credentials {
    /// Reads credentials; `require_github` makes a missing `GITHUB_TOKEN` fatal.
    pub fn from_env(require_github: bool) -> Result<Self> {
        let anthropic_api_key = required_var(ANTHROPIC_API_KEY)?;
        let github_token = if require_github {
            Some(required_var(GITHUB_TOKEN)?)
        } else {
            non_empty_var(GITHUB_TOKEN)
        };
        info!(
            anthropic_api_key_set = true,
            github_token_set = github_token.is_some(),
            "Loaded credentials from environment"
        );
        Ok(Self {
            anthropic_api_key,
            github_token,
        })
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn required_var(name: &str) -> Result<String> {
    match non_empty_var(name) {
        Some(value) => Ok(value),
        None => {
            error!(variable = name, "Required environment variable missing");
            Err(docsync_core::SyncError::FatalConfig(format!("{name} environment variable is not set")).into())
        }
    }
}
