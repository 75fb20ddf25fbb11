use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use csstar::convert::AlignmentSource;
use csstar::records::load_primary;
use csstar::schema::SchemaVersion;
use csstar::table::read_star;

/// Display information about a .cs or STAR file
pub fn run(file: PathBuf) -> Result<()> {
    if !file.exists() {
        anyhow::bail!("File does not exist: {}", file.display());
    }

    let is_star = file
        .extension()
        .map_or(false, |ext| ext.eq_ignore_ascii_case("star"));
    if is_star {
        star_info(&file)
    } else {
        records_info(&file)
    }
}

fn records_info(file: &Path) -> Result<()> {
    let array = load_primary(file).context("Failed to read record array")?;

    println!("cryoSPARC Record Array");
    println!("======================");
    println!("File: {}", file.display());
    println!();

    println!("Statistics:");
    println!("  Format: {}", array.version());
    println!("  Records: {}", array.len());
    println!("  Fields: {}", array.columns().len());
    println!("  Alignment: {}", AlignmentSource::detect(&array).kind());
    println!();

    println!("Fields:");
    for (i, column) in array.columns().iter().enumerate() {
        if column.width() > 1 {
            println!(
                "  {:3}. {} ({}, {})",
                i + 1,
                column.name(),
                column.type_name(),
                column.width()
            );
        } else {
            println!("  {:3}. {} ({})", i + 1, column.name(), column.type_name());
        }
    }

    Ok(())
}

fn star_info(file: &Path) -> Result<()> {
    let star = read_star(file).context("Failed to read STAR file")?;

    println!("STAR File Information");
    println!("=====================");
    println!("File: {}", file.display());
    if let Some(tag) = star.version_tag() {
        println!("Version header: {}", tag);
    }
    if let Some(block) = star.particle_block().and_then(|name| star.block(name)) {
        let version = SchemaVersion::detect(star.block_names(), &block.labels());
        println!("Schema: {}", version);
    }
    println!();

    for block in star.blocks() {
        println!("data_{}: {} rows", block.name(), block.len());
        for (i, label) in block.labels().iter().enumerate() {
            println!("  {:3}. _{}", i + 1, label.star_key());
        }
        println!();
    }

    Ok(())
}
