//! # STAR Validation Module
//!
//! Integrity checks for particle STAR files before they are handed to other
//! tools or exported with [`crate::link`].
//!
//! ## Validation Checklist
//!
//! | Check | Failure mode |
//! |-------|--------------|
//! | file parses, particle block present | FAILED |
//! | schema version detected | OK, reports the version |
//! | every row has `_rlnImageName` | FAILED |
//! | columns deprecated for the detected version | WARNING |
//! | first image location resolves | WARNING |
//! | CTF parameters present | WARNING |
//!
//! ## Usage
//!
//! ```rust,no_run
//! use csstar::validator::validate_star_file;
//! use std::path::Path;
//!
//! let report = validate_star_file(Path::new("particles.star"))?;
//! println!("{}", report);
//! # Ok::<(), std::io::Error>(())
//! ```

use std::io;
use std::path::Path;

use log::debug;

pub use report::{CheckStatus, ValidationCheck, ValidationReport};

use crate::location::{resolve_location, search_roots, Location};
use crate::mapper::row_to_ctf_model;
use crate::schema::{Label, SchemaVersion};
use crate::table::{optics, read_star, StarFile, Table};

mod report;


/// Check names as they appear in the report
pub mod checks {
    /// File parses as STAR
    pub const PARSE: &str = "STAR syntax";
    /// Particle block present
    pub const PARTICLE_BLOCK: &str = "Particle block";
    /// Schema version
    pub const VERSION: &str = "Schema version";
    /// Image names on every row
    pub const IMAGE_NAMES: &str = "Image names";
    /// Deprecated columns
    pub const DEPRECATED: &str = "Deprecated columns";
    /// First location resolves
    pub const DATA_AVAILABLE: &str = "Image data available";
    /// CTF on every row
    pub const CTF: &str = "CTF parameters";
}

/// Main validation entry point
///
/// Only a missing or unreadable file is an error; everything else ends up in
/// the report.
pub fn validate_star_file(path: &Path) -> io::Result<ValidationReport> {
    let mut report = ValidationReport::new(path.display().to_string());

    if !path.is_file() {
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("{} is not a file", path.display()),
        ));
    }

    let star = match read_star(path) {
        Ok(star) => {
            report.add_check(ValidationCheck::ok(checks::PARSE));
            star
        }
        Err(e) => {
            report.add_check(ValidationCheck::failed(checks::PARSE, e.to_string()));
            return Ok(report);
        }
    };

    let Some(block) = star.particle_block().map(str::to_string) else {
        report.add_check(ValidationCheck::failed(
            checks::PARTICLE_BLOCK,
            "no data block besides optics",
        ));
        return Ok(report);
    };
    report.add_check(ValidationCheck::ok(checks::PARTICLE_BLOCK));

    check_version(&star, &block, &mut report);

    let (table, _) = match optics::normalize(star, &block) {
        Ok(normalized) => normalized,
        Err(e) => {
            report.add_check(ValidationCheck::failed(checks::PARTICLE_BLOCK, e.to_string()));
            return Ok(report);
        }
    };
    debug!("Validating {} rows of data_{}", table.len(), block);

    check_image_names(&table, &mut report);
    check_data_available(path, &table, &mut report);
    check_ctf(&table, &mut report);

    Ok(report)
}

fn check_version(star: &StarFile, block: &str, report: &mut ValidationReport) {
    let labels = star.block(block).map(Table::labels).unwrap_or_default();
    let version = SchemaVersion::detect(star.block_names(), &labels);

    let name = match star.version_tag() {
        Some(tag) => format!("{} (header {})", version, tag),
        None => version.to_string(),
    };
    report.add_check(ValidationCheck {
        name: format!("{}: {}", checks::VERSION, name),
        status: CheckStatus::Ok,
    });

    let deprecated: Vec<&str> = version
        .deprecated_labels()
        .iter()
        .filter(|l| labels.contains(*l))
        .map(|l| l.star_key())
        .collect();
    if deprecated.is_empty() {
        report.add_check(ValidationCheck::ok(checks::DEPRECATED));
    } else {
        report.add_check(ValidationCheck::warning(
            checks::DEPRECATED,
            format!(
                "{} not used by {}: {}",
                plural(deprecated.len(), "column"),
                version,
                deprecated.join(", ")
            ),
        ));
    }
}

fn check_image_names(table: &Table, report: &mut ValidationReport) {
    let missing = table
        .rows()
        .iter()
        .filter(|row| row.get_str(Label::ImageName).map_or(true, str::is_empty))
        .count();
    if table.is_empty() {
        report.add_check(ValidationCheck::warning(checks::IMAGE_NAMES, "table has no rows"));
    } else if missing == 0 {
        report.add_check(ValidationCheck::ok(checks::IMAGE_NAMES));
    } else {
        report.add_check(ValidationCheck::failed(
            checks::IMAGE_NAMES,
            format!("{} of {} rows have no image name", missing, table.len()),
        ));
    }
}

fn check_data_available(path: &Path, table: &Table, report: &mut ValidationReport) {
    let Some(name) = table.rows().first().and_then(|row| row.get_str(Label::ImageName)) else {
        return;
    };
    let location = Location::parse(name);
    let roots = search_roots(path, &location);
    match resolve_location(&location, &roots) {
        Ok(resolved) => {
            debug!("{} -> {}", location, resolved.display());
            report.add_check(ValidationCheck::ok(checks::DATA_AVAILABLE));
        }
        Err(e) => report.add_check(ValidationCheck::warning(checks::DATA_AVAILABLE, e.to_string())),
    }
}

fn check_ctf(table: &Table, report: &mut ValidationReport) {
    let missing = table
        .rows()
        .iter()
        .filter(|row| row_to_ctf_model(row).is_none())
        .count();
    if missing == 0 {
        report.add_check(ValidationCheck::ok(checks::CTF));
    } else {
        report.add_check(ValidationCheck::warning(
            checks::CTF,
            format!("{} of {} rows have no CTF", missing, table.len()),
        ));
    }
}

fn plural(n: usize, noun: &str) -> String {
    if n == 1 {
        format!("1 {}", noun)
    } else {
        format!("{} {}s", n, noun)
    }
}
