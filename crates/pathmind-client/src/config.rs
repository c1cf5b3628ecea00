//! Configuration and backend factory.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use pathmind_core::model::{UserId, DEFAULT_TIME_LIMIT_SECS};
use pathmind_core::traits::AssessmentBackend;

use crate::fallback::FallbackBackend;
use crate::http::{HttpBackend, DEFAULT_BASE_URL, DEFAULT_TIMEOUT_SECS};
use crate::mock::MockBackend;

/// Which backend serves tests.
///
/// Note: Custom Debug impl masks the token to prevent accidental exposure in logs.
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BackendConfig {
    Http {
        #[serde(default = "default_base_url")]
        base_url: String,
        #[serde(default)]
        token: Option<String>,
        #[serde(default = "default_timeout")]
        timeout_secs: u64,
    },
    Mock {
        /// A bank file or directory; the bundled banks when absent.
        #[serde(default)]
        bank_dir: Option<PathBuf>,
    },
}

impl std::fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendConfig::Http {
                base_url,
                token,
                timeout_secs,
            } => f
                .debug_struct("Http")
                .field("base_url", base_url)
                .field("token", &token.as_ref().map(|_| "***"))
                .field("timeout_secs", timeout_secs)
                .finish(),
            BackendConfig::Mock { bank_dir } => {
                f.debug_struct("Mock").field("bank_dir", bank_dir).finish()
            }
        }
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        BackendConfig::Http {
            base_url: default_base_url(),
            token: None,
            timeout_secs: default_timeout(),
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}
fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

/// Top-level PathMind configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathmindConfig {
    /// The learner commands act for, unless overridden on the command line.
    #[serde(default)]
    pub user_id: Option<UserId>,
    /// Time budget used when a test does not declare one.
    #[serde(default = "default_time_limit")]
    pub default_time_limit_secs: u64,
    /// Serve calls from the bundled banks when the backend fails.
    #[serde(default)]
    pub offline_fallback: bool,
    #[serde(default)]
    pub backend: BackendConfig,
}

fn default_time_limit() -> u64 {
    DEFAULT_TIME_LIMIT_SECS
}

impl Default for PathmindConfig {
    fn default() -> Self {
        Self {
            user_id: None,
            default_time_limit_secs: default_time_limit(),
            offline_fallback: false,
            backend: BackendConfig::default(),
        }
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
///
/// Substituted values are copied verbatim and never rescanned.
fn resolve_env_vars(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(start) = rest.find("${") {
        let Some(end) = rest[start..].find('}') else {
            break;
        };
        result.push_str(&rest[..start]);
        let var_name = &rest[start + 2..start + end];
        result.push_str(&std::env::var(var_name).unwrap_or_default());
        rest = &rest[start + end + 1..];
    }
    result.push_str(rest);
    result
}

fn resolve_backend_config(config: &BackendConfig) -> BackendConfig {
    match config {
        BackendConfig::Http {
            base_url,
            token,
            timeout_secs,
        } => BackendConfig::Http {
            base_url: resolve_env_vars(base_url),
            token: token
                .as_ref()
                .map(|t| resolve_env_vars(t))
                .filter(|t| !t.is_empty()),
            timeout_secs: *timeout_secs,
        },
        BackendConfig::Mock { bank_dir } => BackendConfig::Mock {
            bank_dir: bank_dir
                .as_ref()
                .map(|p| PathBuf::from(resolve_env_vars(&p.to_string_lossy()))),
        },
    }
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `pathmind.toml` in the current directory
/// 2. `~/.config/pathmind/config.toml`
///
/// Environment variable overrides: `PATHMIND_BASE_URL`, `PATHMIND_TOKEN`,
/// `PATHMIND_USER_ID`.
pub fn load_config() -> Result<PathmindConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<PathmindConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("pathmind.toml");
        if local.exists() {
            Some(local)
        } else {
            dirs_path()
                .map(|home| home.join("config.toml"))
                .filter(|global| global.exists())
        }
    };

    let mut config = match config_path {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            let config = toml::from_str::<PathmindConfig>(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?;
            tracing::debug!(path = %path.display(), "loaded config");
            config
        }
        None => PathmindConfig::default(),
    };

    // Apply env var overrides
    if let Ok(url) = std::env::var("PATHMIND_BASE_URL") {
        match &mut config.backend {
            BackendConfig::Http { base_url, .. } => *base_url = url,
            mock => {
                *mock = BackendConfig::Http {
                    base_url: url,
                    token: None,
                    timeout_secs: default_timeout(),
                }
            }
        }
    }
    if let Ok(key) = std::env::var("PATHMIND_TOKEN") {
        if let BackendConfig::Http { token, .. } = &mut config.backend {
            *token = Some(key);
        }
    }
    if let Ok(raw) = std::env::var("PATHMIND_USER_ID") {
        let user_id = raw
            .parse::<UserId>()
            .map_err(anyhow::Error::msg)
            .context("invalid PATHMIND_USER_ID")?;
        config.user_id = Some(user_id);
    }

    config.backend = resolve_backend_config(&config.backend);

    Ok(config)
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("pathmind"))
}

/// Create the backend described by the configuration.
///
/// With `offline_fallback`, the configured backend is wrapped so failures are
/// served from the bundled banks.
pub fn create_backend(config: &PathmindConfig) -> Result<Arc<dyn AssessmentBackend>> {
    let backend: Arc<dyn AssessmentBackend> = match &config.backend {
        BackendConfig::Http {
            base_url,
            token,
            timeout_secs,
        } => Arc::new(HttpBackend::new(base_url, token.clone(), *timeout_secs)?),
        BackendConfig::Mock { bank_dir: Some(dir) } => Arc::new(MockBackend::from_bank_path(dir)?),
        BackendConfig::Mock { bank_dir: None } => Arc::new(MockBackend::bundled()?),
    };

    if config.offline_fallback {
        let offline = Arc::new(MockBackend::bundled()?);
        return Ok(Arc::new(FallbackBackend::new(backend, offline)));
    }
    Ok(backend)
}
