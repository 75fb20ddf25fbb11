//! # Particle Conversion
//!
//! High-level pipeline from engine record arrays to a STAR particle table:
//!
//! 1. load the primary array and merge any passthrough arrays
//! 2. map every record to a [`Row`] through the engine field map
//! 3. read the row into an [`Image`](crate::mapper::Image) and write it back, so
//!    CTF, alignment and coordinate fields pass through the mapper
//! 4. filter and edit the rows as configured
//! 5. write the table for the target [`SchemaVersion`]
//!
//! The table is written to a temporary file next to the output and moved into
//! place only when everything succeeded, so a failed conversion leaves no
//! output behind.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::path::PathBuf;
//! use csstar::convert::{ConversionConfig, Converter};
//!
//! let config = ConversionConfig {
//!     min_phic: Some(0.9),
//!     ..Default::default()
//! };
//! let inputs = vec![PathBuf::from("J42_particles.cs")];
//! let stats = Converter::with_config(config).convert(&inputs, "particles.star")?;
//! println!("Wrote {} of {} particles", stats.rows_written, stats.rows_read);
//! # Ok::<(), csstar::convert::ConvertError>(())
//! ```

mod error;
mod fields;
mod particles;

#[cfg(test)]
mod tests;

pub use error::ConvertError;
pub use fields::{AlignmentSource, CoordinateFlips, RecordMapper};
pub use particles::{
    apply_transform, copy_micrograph_coordinates, filter_rows, parse_transform,
    rebase_job_path, rescale_shifts, PathRewrite,
};

use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use log::{debug, info};
use serde::Deserialize;
use tempfile::NamedTempFile;

use crate::mapper::{
    particle_to_row, row_to_particle, AlignmentKind, ImageReadOptions, ImageRowOptions,
};
use crate::records::{load_primary, merge_passthrough};
use crate::schema::{Label, SchemaVersion};
use crate::table::{remove_column, write_star_to, Row, Table, WriteOptions};

/// Configuration for a conversion, also the `[convert]` table of a config file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConversionConfig {
    /// Refinement box size; shifts are rescaled by particle box / this
    pub boxsize: Option<f64>,
    /// Keep only these class numbers
    pub classes: Vec<i64>,
    /// Minimum class posterior
    pub min_phic: Option<f64>,
    /// Directory replacing that of every micrograph
    pub micrograph_path: Option<PathBuf>,
    /// STAR file or glob to take coordinates from
    pub copy_micrograph_coordinates: Option<String>,
    /// Exchange coordinate axes
    pub swap_xy: bool,
    /// Mirror X coordinates
    pub invert_x: bool,
    /// Mirror Y coordinates
    pub invert_y: bool,
    /// Keep cache paths instead of rebasing at the job directory
    pub cached: bool,
    /// JSON 3×3 or 3×4 matrix applied to every pose
    pub transform: Option<String>,
    /// Write the legacy schema
    pub relion2: bool,
    /// Strip this many `<uid>_` prefixes from file names, 0 for all
    pub strip_uid: Option<usize>,
}

impl ConversionConfig {
    /// Schema written by this configuration
    pub fn schema_version(&self) -> SchemaVersion {
        if self.relion2 {
            SchemaVersion::Relion2
        } else {
            SchemaVersion::Relion31
        }
    }

    fn path_rewrite(&self) -> PathRewrite {
        PathRewrite {
            cached: self.cached,
            strip_uid: self.strip_uid.map(|n| if n == 0 { None } else { Some(n) }),
            micrograph_dir: self.micrograph_path.clone(),
        }
    }
}

/// Statistics from a conversion
#[derive(Debug, Clone, Default)]
pub struct ConversionStats {
    /// Records in the merged input
    pub rows_read: usize,
    /// Rows in the written table
    pub rows_written: usize,
    /// Rows removed by class or posterior filters
    pub rows_filtered: usize,
    /// How poses were stored
    pub alignment: AlignmentKind,
    /// Schema written
    pub version: SchemaVersion,
    /// Rows that received copied coordinates
    pub coordinates_copied: usize,
}

/// Converter from engine record arrays to STAR particle tables
#[derive(Debug, Clone, Default)]
pub struct Converter {
    config: ConversionConfig,
}

impl Converter {
    /// Create a converter with default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a converter with custom configuration
    pub fn with_config(config: ConversionConfig) -> Self {
        Self { config }
    }

    /// Active configuration
    pub fn config(&self) -> &ConversionConfig {
        &self.config
    }

    /// Build the particle table from a primary array and its passthrough arrays
    pub fn build_table(&self, inputs: &[PathBuf]) -> Result<(Table, ConversionStats), ConvertError> {
        let (primary, passthroughs) = inputs.split_first().ok_or(ConvertError::NoInput)?;
        let transform = self
            .config
            .transform
            .as_deref()
            .map(parse_transform)
            .transpose()?;

        let array = load_primary(primary)?;
        let extra = passthroughs
            .iter()
            .map(load_primary)
            .collect::<Result<Vec<_>, _>>()?;
        let array = merge_passthrough(array, extra)?;

        let mapper = RecordMapper::new(
            &array,
            CoordinateFlips {
                swap_xy: self.config.swap_xy,
                invert_x: self.config.invert_x,
                invert_y: self.config.invert_y,
            },
        );
        let kind = mapper.alignment().kind();
        info!(
            "{} records from {}, alignment {}",
            array.len(),
            primary.display(),
            kind
        );

        let read_options = ImageReadOptions {
            alignment: kind,
            ..Default::default()
        };
        let write_options = ImageRowOptions::new(kind);

        let mut rows = Vec::with_capacity(array.len());
        for r in 0..array.len() {
            let particle = row_to_particle(&mapper.row(r), &read_options)?;
            let mut row = Row::new();
            particle_to_row(&particle, &mut row, &write_options)?;
            rows.push(row);
        }

        let (mut rows, rows_filtered) =
            filter_rows(rows, &self.config.classes, self.config.min_phic);

        if let Some((rotation, translation)) = transform {
            apply_transform(&mut rows, &rotation, &translation);
        }
        if let Some(boxsize) = self.config.boxsize {
            rescale_shifts(&mut rows, boxsize)?;
        }
        self.config.path_rewrite().apply(&mut rows);

        let coordinates_copied = match &self.config.copy_micrograph_coordinates {
            Some(pattern) => copy_micrograph_coordinates(&mut rows, pattern)?,
            None => 0,
        };

        // Particles are 2D images
        remove_column(&mut rows, Label::ShiftZ);

        let stats = ConversionStats {
            rows_read: array.len(),
            rows_written: rows.len(),
            rows_filtered,
            alignment: kind,
            version: self.config.schema_version(),
            coordinates_copied,
        };
        Ok((Table::with_rows("particles", rows), stats))
    }

    /// Convert `inputs` (primary first, then passthrough arrays) into a STAR file
    pub fn convert<P: AsRef<Path>>(
        &self,
        inputs: &[PathBuf],
        output: P,
    ) -> Result<ConversionStats, ConvertError> {
        let output = output.as_ref();
        let (table, stats) = self.build_table(inputs)?;

        let dir = match output.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        let mut temp = NamedTempFile::new_in(dir)?;
        {
            let mut writer = BufWriter::new(&mut temp);
            let options = WriteOptions::new("particles").version(stats.version);
            write_star_to(&mut writer, &table, &options)?;
            writer.flush()?;
        }
        temp.persist(output).map_err(|e| e.error)?;

        debug!("Wrote {} rows to {}", stats.rows_written, output.display());
        Ok(stats)
    }
}
