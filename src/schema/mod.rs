//! # Schema Registry
//!
//! Static description of the metadata columns exchanged between cryoSPARC
//! particle arrays and STAR tables.
//!
//! ## Field identifiers
//!
//! Every column is a [`Label`]: a canonical name (`defocusU`), the STAR key
//! (`rlnDefocusU`) and a declared [`ValueType`]. Identifiers are globally
//! unique; the groups in [`registry`] only decide which converter touches which
//! columns.
//!
//! | Group | Required | Extra |
//! |-------|----------|-------|
//! | Coordinate | coordinateX, coordinateY | coordinateZ, autopickFigureOfMerit, helicalTubeId |
//! | CTF | defocusU, defocusV, defocusAngle | figure of merit, phase shift, B-factor, ... |
//! | CTF-PSD | ctfImage, micrographName | |
//! | Acquisition | voltage, Cs, amplitude contrast, magnification | |
//! | Alignment | origins, rot/tilt/psi | |
//!
//! ## Versions
//!
//! [`SchemaVersion`] captures the column differences between STAR generations
//! (optics block, Angstrom origins, deprecated magnification).

mod labels;
pub mod registry;
mod value;
mod version;

#[cfg(test)]
mod tests;

pub use labels::Label;
pub use registry::*;
pub use value::{Value, ValueType};
pub use version::SchemaVersion;
