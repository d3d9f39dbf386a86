//! Configuration file handling for nfcc

use std::path::Path;

use anyhow::{Context, Result};
use nfcc_power::NfccConfig;

/// Load controller configuration from `path`, or defaults when no path is given
pub fn load(path: Option<&Path>) -> Result<NfccConfig> {
    let Some(path) = path else {
        return Ok(NfccConfig::default());
    };
    NfccConfig::load(path)
        .with_context(|| format!("Failed to load config file: {}", path.display()))
}
