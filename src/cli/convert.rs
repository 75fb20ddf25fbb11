use anyhow::{Context, Result};
use log::info;
use std::path::PathBuf;

use csstar::convert::{ConversionConfig, Converter};

use super::config::apply_args;
use super::ConvertArgs;

/// Convert .cs arrays to a STAR particle table
pub fn run(
    inputs: Vec<PathBuf>,
    output: PathBuf,
    args: ConvertArgs,
    file_config: ConversionConfig,
) -> Result<()> {
    // Validate input files exist
    for input in &inputs {
        if !input.exists() {
            anyhow::bail!("Input file does not exist: {}", input.display());
        }
    }

    let config = apply_args(file_config, args);

    info!("csstar - cryoSPARC to STAR");
    info!("==========================");
    if let Some((primary, passthrough)) = inputs.split_first() {
        info!("Input:  {}", primary.display());
        for extra in passthrough {
            info!("Passthrough: {}", extra.display());
        }
    }
    info!("Output: {}", output.display());
    info!("Schema: {}", config.schema_version());
    if !config.classes.is_empty() {
        info!("Classes: {:?}", config.classes);
    }
    if let Some(min_phic) = config.min_phic {
        info!("Minimum posterior: {}", min_phic);
    }

    let converter = Converter::with_config(config);
    let stats = converter
        .convert(&inputs, &output)
        .context("Conversion failed")?;

    info!("Conversion complete!");
    info!("  Records read: {}", stats.rows_read);
    info!("  Particles written: {}", stats.rows_written);
    if stats.rows_filtered > 0 {
        info!("  Filtered out: {}", stats.rows_filtered);
    }
    info!("  Alignment: {}", stats.alignment);
    if stats.coordinates_copied > 0 {
        info!("  Coordinates copied: {}", stats.coordinates_copied);
    }

    Ok(())
}
