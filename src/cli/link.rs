use anyhow::{Context, Result};
use log::info;
use std::path::PathBuf;

use csstar::link::{link_particles, LinkConfig};

/// Export a STAR particle table and its stacks
pub fn run(
    star: PathBuf,
    output_dir: PathBuf,
    ext: Option<String>,
    converter: Option<String>,
    mut config: LinkConfig,
) -> Result<()> {
    if !star.exists() {
        anyhow::bail!("Input file does not exist: {}", star.display());
    }
    if let Some(ext) = ext {
        config.ext = ext.trim_start_matches('.').to_string();
    }
    if let Some(converter) = converter {
        config.converter = converter;
    }

    info!("csstar - STAR to cryoSPARC export");
    info!("=================================");
    info!("Input:  {}", star.display());
    info!("Output: {}", output_dir.display());
    info!("Stack extension: {}", config.ext);

    let stats = link_particles(&star, &output_dir, &config)
        .with_context(|| format!("Export of {} failed", star.display()))?;

    info!("Export complete!");
    info!("  Particles: {}", stats.particles);
    info!("  Stacks: {}", stats.stacks);
    info!("  Schema: {}", stats.version);

    Ok(())
}
