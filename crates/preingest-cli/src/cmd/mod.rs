pub mod actions;
pub mod checksum;
pub mod config;
pub mod serve;

use anyhow::Context;
use preingest_core::Settings;
use std::path::Path;

pub fn load_settings(path: &Path) -> anyhow::Result<Settings> {
    Settings::load(path).with_context(|| format!("failed to load settings from {}", path.display()))
}
