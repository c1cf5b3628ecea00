pub mod dashboard;
pub mod init;
pub mod paths;
pub mod results;
pub mod take;
pub mod tests;
pub mod validate;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;

use pathmind_client::config::{create_backend, load_config_from, PathmindConfig};
use pathmind_core::model::UserId;
use pathmind_core::traits::AssessmentBackend;

/// Load the config and build its backend.
pub fn connect(config_path: Option<PathBuf>) -> Result<(PathmindConfig, Arc<dyn AssessmentBackend>)> {
    let config = load_config_from(config_path.as_deref())?;
    let backend = create_backend(&config)?;
    tracing::debug!(backend = backend.name(), "backend ready");
    Ok((config, backend))
}

/// The learner a command acts for: `--user`, else the configured `user_id`.
pub fn resolve_user(flag: Option<UserId>, config: &PathmindConfig) -> Result<UserId> {
    flag.or(config.user_id).ok_or_else(|| {
        anyhow::anyhow!("no learner id: pass --user or set user_id in pathmind.toml")
    })
}
