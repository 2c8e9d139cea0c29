pub mod compare;
pub mod config;
pub mod health;
pub mod run;
pub mod scenarios;

use anyhow::Context;
use std::path::Path;
use uavsim_core::config::HarnessConfig;

/// Effective configuration: defaults overlaid by the config file, if any.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<HarnessConfig> {
    match path {
        Some(p) => HarnessConfig::resolve(Some(p))
            .with_context(|| format!("failed to load config from {}", p.display())),
        None => HarnessConfig::resolve(None).context("failed to load config"),
    }
}
