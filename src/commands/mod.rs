//! CLI command implementations.

pub mod predict;
pub mod serve;
pub mod train;

/// Runs the desktop command.
#[cfg(feature = "desktop")]
pub fn desktop(cfg: &crate::config::Config) -> anyhow::Result<()> {
    let service = predict::load_service(&cfg.model.artifact_path, cfg.limits)?;
    crate::desktop::run(std::sync::Arc::new(service))
}
