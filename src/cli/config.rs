//! TOML configuration file support.
//!
//! Every conversion flag can be given in a config file instead:
//!
//! ```toml
//! # csstar.toml
//! [convert]
//! boxsize = 256
//! classes = [1, 3]
//! min_phic = 0.9
//! strip_uid = 0
//!
//! [link]
//! ext = "mrcs"
//! converter = "e2proc2d.py"
//! ```
//!
//! Flags given on the command line win over file values.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use csstar::convert::ConversionConfig;
use csstar::link::LinkConfig;

use super::ConvertArgs;

/// Root configuration structure for csstar.toml files.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Settings for `convert`.
    #[serde(default)]
    pub convert: ConversionConfig,

    /// Settings for `link`.
    #[serde(default)]
    pub link: LinkConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse TOML configuration")
    }
}

/// Overlay command-line flags on file settings
pub fn apply_args(mut config: ConversionConfig, args: ConvertArgs) -> ConversionConfig {
    if args.boxsize.is_some() {
        config.boxsize = args.boxsize;
    }
    if !args.classes.is_empty() {
        config.classes = args.classes;
    }
    if args.min_phic.is_some() {
        config.min_phic = args.min_phic;
    }
    if args.micrograph_path.is_some() {
        config.micrograph_path = args.micrograph_path;
    }
    if args.copy_micrograph_coordinates.is_some() {
        config.copy_micrograph_coordinates = args.copy_micrograph_coordinates;
    }
    if args.transform.is_some() {
        config.transform = args.transform;
    }
    if args.strip_uid.is_some() {
        config.strip_uid = args.strip_uid;
    }
    config.swap_xy |= args.swap_xy;
    config.invert_x |= args.invert_x;
    config.invert_y |= args.invert_y;
    config.cached |= args.cached;
    config.relion2 |= args.relion2;
    config
}
