pub mod authorize;
pub mod check;
mod dispatch;
pub mod verify;

pub use dispatch::dispatch;

use std::path::Path;

use anyhow::Context;
use runguard_core::Settings;

use crate::logging::Logging;

/// Load configuration and switch logging to its level.
pub(crate) fn load_settings(path: &Path, logging: &Logging) -> anyhow::Result<Settings> {
    let settings = Settings::from_file(path)
        .with_context(|| format!("invalid configuration {}", path.display()))?;
    logging.apply_config(&settings.server)?;
    tracing::info!(config = %path.display(), "configuration loaded");
    Ok(settings)
}
