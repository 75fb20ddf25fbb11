//! # Particle Export
//!
//! The reverse direction of [`crate::convert`]: a STAR particle table is
//! prepared for the engine. Every image location is resolved against the
//! directory of the STAR file and the project-style root next to it, the
//! referenced stacks are linked or re-encoded into the output directory, and
//! the table is written again as `<output>/particles.star` with locations
//! pointing at the new stacks.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use log::{debug, info};
use serde::Deserialize;

use crate::location::{
    materialize_stacks, resolve_location, search_roots, CommandConverter, Location, LocationError,
};
use crate::mapper::{
    particle_to_row, row_to_particle, AlignmentKind, Image, ImageReadOptions, ImageRowOptions,
    MappingError,
};
use crate::schema::{Label, SchemaVersion};
use crate::table::{optics, read_star, write_table, Row, Table, TableError, WriteOptions};

/// Program used for stacks that need re-encoding
pub const DEFAULT_CONVERTER: &str = "e2proc2d.py";

/// Errors that can occur while exporting particles
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    /// Reading or writing the table failed
    #[error("Table error: {0}")]
    TableError(#[from] TableError),

    /// A row could not be mapped
    #[error("Mapping error: {0}")]
    MappingError(#[from] MappingError),

    /// A stack could not be found or prepared
    #[error("Location error: {0}")]
    LocationError(#[from] LocationError),

    /// The STAR file has no particle block
    #[error("No particle block in {0}")]
    NoParticles(String),

    /// The configured converter command is empty
    #[error("Empty stack converter command")]
    EmptyConverter,
}

/// Export settings, also the `[link]` table of a config file
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LinkConfig {
    /// Extension of the materialized stacks
    pub ext: String,
    /// Command line of the re-encoding program
    pub converter: String,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            ext: "mrcs".to_string(),
            converter: DEFAULT_CONVERTER.to_string(),
        }
    }
}

/// Statistics from an export
#[derive(Debug, Clone, Default)]
pub struct LinkStats {
    /// Particles written
    pub particles: usize,
    /// Distinct stacks materialized
    pub stacks: usize,
    /// Schema of the input, reused for the output
    pub version: SchemaVersion,
    /// How poses were read
    pub alignment: AlignmentKind,
}

/// Alignment kind implied by the columns of a particle table
pub fn detect_alignment(table: &Table) -> AlignmentKind {
    let labels = table.labels();
    if labels.contains(&Label::AngleRot) || labels.contains(&Label::AngleTilt) {
        AlignmentKind::Projection
    } else if labels.contains(&Label::AnglePsi) {
        AlignmentKind::TwoD
    } else {
        AlignmentKind::None
    }
}

/// Export the particles of `star_path` into `output_dir`
pub fn link_particles(
    star_path: &Path,
    output_dir: &Path,
    config: &LinkConfig,
) -> Result<LinkStats, LinkError> {
    let converter =
        CommandConverter::from_command_line(&config.converter).ok_or(LinkError::EmptyConverter)?;

    let star = read_star(star_path)?;
    let block = star
        .particle_block()
        .map(str::to_string)
        .ok_or_else(|| LinkError::NoParticles(star_path.display().to_string()))?;
    let (table, version) = optics::normalize(star, &block)?;
    let alignment = detect_alignment(&table);

    let read_options = ImageReadOptions {
        alignment,
        ..Default::default()
    };
    let particles = table
        .rows()
        .iter()
        .map(|row| row_to_particle(row, &read_options))
        .collect::<Result<Vec<Image>, _>>()?;

    // Resolve each referenced file once
    let mut resolved: HashMap<String, PathBuf> = HashMap::new();
    for particle in &particles {
        let location = &particle.location;
        if resolved.contains_key(&location.path) {
            continue;
        }
        let roots = search_roots(star_path, location);
        let path = resolve_location(location, &roots)?;
        debug!("{} -> {}", location.path, path.display());
        resolved.insert(location.path.clone(), path);
    }

    let mut sources: Vec<PathBuf> = resolved.values().cloned().collect();
    sources.sort();
    let materialized = materialize_stacks(&sources, output_dir, &config.ext, &converter)?;

    let relocate = |image: &Image, row: &mut Row| {
        let target = resolved
            .get(&image.location.path)
            .and_then(|source| materialized.get(source));
        if let Some(target) = target {
            let relative = target.strip_prefix(output_dir).unwrap_or(target);
            let location: Location = image.location.with_path(relative.to_string_lossy());
            row.set(Label::ImageName, location.to_string());
        }
    };
    let write_options = ImageRowOptions::new(alignment).postprocess(&relocate);

    let mut rows = Vec::with_capacity(particles.len());
    for particle in &particles {
        let mut row = Row::new();
        particle_to_row(particle, &mut row, &write_options)?;
        rows.push(row);
    }

    let output = output_dir.join("particles.star");
    write_table(
        &Table::with_rows("particles", rows),
        &output,
        &WriteOptions::new("particles").version(version),
    )?;

    info!(
        "Exported {} particles from {} stack(s) to {}",
        particles.len(),
        materialized.len(),
        output.display()
    );
    Ok(LinkStats {
        particles: particles.len(),
        stacks: materialized.len(),
        version,
        alignment,
    })
}
