//! # csstar - cryoSPARC metadata to STAR tables
//!
//! `csstar` converts the per-particle metadata arrays written by cryoSPARC
//! (`.cs` files) into STAR tables read by RELION and related tools, and
//! exports STAR particle tables with their image stacks in the other
//! direction.
//!
//! ## Key Features
//!
//! - **Record arrays**: NumPy structured `.cs` files (memory-mapped when large)
//!   and the legacy comma separated export, with passthrough arrays joined by
//!   a detected key.
//!
//! - **Typed mapping**: rows are translated into [`mapper::Image`],
//!   [`mapper::CtfModel`], [`mapper::Coordinate`] and [`mapper::Acquisition`]
//!   objects through one attribute registry, so every column flows through the
//!   same code whichever side it came from.
//!
//! - **Explicit schema versions**: optics blocks, Angstrom origins and
//!   deprecated columns are decided by one [`schema::SchemaVersion`] passed
//!   to the writer.
//!
//! - **Pose conversion**: axis-angle poses and in-plane angles become
//!   RELION Euler angles via `nalgebra`.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::path::PathBuf;
//! use csstar::convert::{ConversionConfig, Converter};
//!
//! let config = ConversionConfig {
//!     classes: vec![1, 2],
//!     ..Default::default()
//! };
//! let inputs = vec![
//!     PathBuf::from("J42_particles.cs"),
//!     PathBuf::from("P1_J42_passthrough_particles.cs"),
//! ];
//! let stats = Converter::with_config(config).convert(&inputs, "particles.star")?;
//! println!("Wrote {} particles", stats.rows_written);
//! # Ok::<(), csstar::convert::ConvertError>(())
//! ```
//!
//! ## Architecture
//!
//! - [`schema`]: field identifiers, attribute dictionaries and schema versions
//! - [`records`]: `.cs` record array reader and passthrough merge
//! - [`table`]: rows, tables and the STAR reader/writer
//! - [`mapper`]: row to domain object translation
//! - [`geometry`]: Euler angle and axis-angle conversions
//! - [`location`]: `index@path` locators and stack resolution
//! - [`convert`]: the `.cs` to STAR pipeline
//! - [`link`]: the STAR to engine export
//! - [`validator`]: STAR file integrity checks

// Documentation lints - enforce complete documentation for publication
#![deny(missing_docs)]
#![deny(rustdoc::missing_crate_level_docs)]

pub mod convert;
pub mod geometry;
pub mod link;
pub mod location;
pub mod mapper;
pub mod records;
pub mod schema;
pub mod table;
pub mod validator;

/// Re-export commonly used types for convenience
pub mod prelude {
    pub use crate::convert::{ConversionConfig, ConversionStats, ConvertError, Converter};
    pub use crate::link::{link_particles, LinkConfig, LinkError, LinkStats};
    pub use crate::location::{resolve_location, search_roots, Location, LocationError};
    pub use crate::mapper::{
        particle_to_row, row_to_particle, AlignmentKind, CtfModel, Image, MappingError,
    };
    pub use crate::records::{load_primary, merge_passthrough, RecordArray, RecordError};
    pub use crate::schema::{Label, SchemaVersion, Value};
    pub use crate::table::{read_star, write_table, Row, StarFile, Table, TableError, WriteOptions};
    pub use crate::validator::{validate_star_file, ValidationReport};
}
