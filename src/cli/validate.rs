use anyhow::{Context, Result};
use log::info;
use std::path::PathBuf;

use csstar::validator::validate_star_file;

/// Validate a STAR particle file, exiting with 1 when a check failed
pub fn run(file: PathBuf) -> Result<()> {
    info!("Validating {}", file.display());

    let report = validate_star_file(&file)
        .with_context(|| format!("Cannot validate {}", file.display()))?;
    println!("{}", report.format_colored());

    if report.has_failures() {
        std::process::exit(1);
    }
    Ok(())
}
