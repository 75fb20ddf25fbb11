//! Version-specific table layout: optics groups, origin units and the legacy
//! magnification columns.
//!
//! Writers call [`prepare_rows`] once with the target [`SchemaVersion`];
//! readers call [`normalize`] so downstream code always sees pixel origins and
//! per-row acquisition constants regardless of the file generation.

use log::{debug, warn};

use super::{fill_constant, remove_column, Row, StarFile, Table, TableError};
use crate::schema::{Label, SchemaVersion, Value, OPTICS_LABELS};

/// Nominal magnification written to legacy tables
pub const LEGACY_MAGNIFICATION: f64 = 10_000.0;

const PIXEL_ORIGINS: [Label; 3] = [Label::ShiftX, Label::ShiftY, Label::ShiftZ];
const ANGSTROM_ORIGINS: [Label; 3] = [Label::ShiftXAngst, Label::ShiftYAngst, Label::ShiftZAngst];

/// Move per-acquisition constants out of `rows` into an optics table.
///
/// Groups are formed from distinct combinations of the optics columns shared
/// by every row (and any existing optics group number); each row keeps only
/// its new 1-based `opticsGroup`. Returns `None` when no optics column is
/// shared by all rows.
pub fn split_optics(rows: &mut [Row]) -> Option<Table> {
    if rows.is_empty() {
        return None;
    }
    let present: Vec<Label> = OPTICS_LABELS
        .iter()
        .copied()
        .filter(|label| rows.iter().all(|r| r.has(*label)))
        .collect();
    if present.is_empty() {
        return None;
    }

    let mut keys: Vec<(Option<i64>, Vec<String>)> = Vec::new();
    let mut optics = Table::new("optics");

    for row in rows.iter_mut() {
        let values: Vec<String> = present
            .iter()
            .map(|label| row.get(*label).map(Value::to_string).unwrap_or_default())
            .collect();
        let key = (row.get_i64(Label::OpticsGroup), values);

        let group = match keys.iter().position(|k| *k == key) {
            Some(i) => i + 1,
            None => {
                keys.push(key);
                let number = keys.len();
                let mut optics_row = Row::new();
                optics_row.set(Label::OpticsGroupName, format!("opticsGroup{}", number));
                optics_row.set(Label::OpticsGroup, number as i64);
                for label in &present {
                    if let Some(value) = row.get(*label) {
                        optics_row.set(*label, value.clone());
                    }
                }
                optics.push(optics_row);
                number
            }
        };

        for label in &present {
            row.remove(*label);
        }
        row.remove(Label::OpticsGroupName);
        row.set(Label::OpticsGroup, group as i64);
    }

    debug!("Formed {} optics group(s)", optics.len());
    Some(optics)
}

/// Copy optics constants back onto every row of `particles`
pub fn merge_optics(particles: &mut Table, optics: &Table) {
    for row in particles.rows_mut().iter_mut() {
        let group = row.get_i64(Label::OpticsGroup);
        let source = match group {
            Some(g) => optics
                .rows()
                .iter()
                .find(|o| o.get_i64(Label::OpticsGroup) == Some(g)),
            None if optics.len() == 1 => optics.rows().first(),
            None => None,
        };
        match source {
            Some(optics_row) => {
                for (label, value) in optics_row.iter() {
                    if !row.has(label) {
                        row.set(label, value.clone());
                    }
                }
            }
            None => warn!("No optics group {:?} for particle row", group),
        }
    }
}

/// The same origin in the other unit: Angstrom for pixels and back
pub(crate) fn origin_counterpart(label: Label) -> Option<Label> {
    PIXEL_ORIGINS
        .iter()
        .zip(ANGSTROM_ORIGINS.iter())
        .find_map(|(px, angst)| {
            if label == *px {
                Some(*angst)
            } else if label == *angst {
                Some(*px)
            } else {
                None
            }
        })
}

fn pixel_size(row: &Row) -> Option<f64> {
    row.get_f64(Label::ImagePixelSize).or_else(|| {
        let detector = row.get_f64(Label::DetectorPixelSize)?;
        let magnification = row.get_f64(Label::Magnification)?;
        (magnification > 0.0).then(|| detector * 1e4 / magnification)
    })
}

/// Bring rows holding pixel origins and per-row acquisition constants into the
/// layout of `version`, just before writing.
pub fn prepare_rows(rows: &mut [Row], version: SchemaVersion) {
    if version.uses_angstrom_origins() {
        for row in rows.iter_mut() {
            let Some(psize) = pixel_size(row) else {
                continue;
            };
            for (px, angst) in PIXEL_ORIGINS.iter().zip(ANGSTROM_ORIGINS.iter()) {
                if let Some(shift) = row.get_f64(*px) {
                    row.set(*angst, shift * psize);
                }
            }
        }
        // A magnification column makes downstream tools recompute the pixel size
        remove_column(rows, Label::Magnification);
        remove_column(rows, Label::DetectorPixelSize);
        return;
    }

    for row in rows.iter_mut() {
        if let Some(psize) = pixel_size(row) {
            for (px, angst) in PIXEL_ORIGINS.iter().zip(ANGSTROM_ORIGINS.iter()) {
                if let Some(shift) = row.get_f64(*angst) {
                    if !row.has(*px) {
                        row.set(*px, shift / psize);
                    }
                }
            }
        }
    }

    // Legacy tables derive the pixel size from magnification and detector size,
    // written once as constants from the first row's sampling rate
    if let Some(psize) = rows.first().and_then(pixel_size) {
        fill_constant(rows, Label::Magnification, LEGACY_MAGNIFICATION);
        fill_constant(
            rows,
            Label::DetectorPixelSize,
            psize * LEGACY_MAGNIFICATION / 1e4,
        );
    }
}

/// Extract `block` from a parsed file as a version-independent table.
///
/// Optics constants are merged onto each row and Angstrom origins are turned
/// back into pixel origins. Returns the table with the detected version.
pub fn normalize(mut star: StarFile, block: &str) -> Result<(Table, SchemaVersion), TableError> {
    let block_names: Vec<String> = star.block_names().iter().map(|s| s.to_string()).collect();
    let mut table = star.take_block(block)?;
    let version = SchemaVersion::detect(block_names.iter().map(String::as_str), &table.labels());

    if let Some(optics) = star.block("optics") {
        merge_optics(&mut table, optics);
    }

    for row in table.rows_mut().iter_mut() {
        let psize = pixel_size(row);
        for (px, angst) in PIXEL_ORIGINS.iter().zip(ANGSTROM_ORIGINS.iter()) {
            if let Some(shift) = row.remove(*angst).and_then(|v| v.as_f64()) {
                match psize {
                    Some(psize) if psize > 0.0 => row.set(*px, shift / psize),
                    _ => {
                        warn!("Cannot convert _{} without a pixel size", angst.star_key());
                        row.set(*angst, shift);
                    }
                }
            }
        }
    }

    debug!(
        "Normalized data_{} ({} rows) from {}",
        table.name(),
        table.len(),
        version
    );
    Ok((table, version))
}
