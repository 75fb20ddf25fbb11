//! Version 0 exports: comma separated text with one header line.
//!
//! Vector fields are spread over dotted columns (`alignments2D/shift.0`,
//! `alignments2D/shift.1`) and folded back into one field here.

use std::io::Read;
use std::path::Path;

use log::debug;

use super::{Column, ColumnData, FormatVersion, RecordArray, RecordError};

/// Whether a first line looks like a v0 export header
pub(crate) fn is_legacy_header(line: &str) -> bool {
    line.trim_end()
        .split(',')
        .any(|h| matches!(h.trim(), "uid" | "data_input_relpath"))
}

fn vector_part(header: &str) -> Option<(&str, usize)> {
    let (base, idx) = header.rsplit_once('.')?;
    if base.is_empty() {
        return None;
    }
    idx.parse().ok().map(|i| (base, i))
}

enum Inferred {
    Int(Vec<i64>),
    Float(Vec<f64>),
    Str(Vec<String>),
}

fn infer(values: Vec<String>) -> Inferred {
    if let Ok(ints) = values.iter().map(|v| v.trim().parse::<i64>()).collect() {
        return Inferred::Int(ints);
    }
    if let Ok(floats) = values.iter().map(|v| v.trim().parse::<f64>()).collect() {
        return Inferred::Float(floats);
    }
    Inferred::Str(values)
}

/// Parse a v0 export
pub fn parse_legacy<R: Read>(reader: R, path: &Path) -> Result<RecordArray, RecordError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = csv_reader.headers()?.iter().map(str::to_string).collect();
    if !headers.iter().any(|h| h == "uid" || h == "data_input_relpath") {
        return Err(RecordError::format(path.display(), "v0 header has no uid column"));
    }

    let mut raw: Vec<Vec<String>> = vec![Vec::new(); headers.len()];
    for record in csv_reader.records() {
        let record = record?;
        for (i, cell) in record.iter().enumerate().take(headers.len()) {
            raw[i].push(cell.to_string());
        }
    }

    // Group dotted columns by base name, preserving first-seen order
    let mut groups: Vec<(String, Vec<(usize, usize)>)> = Vec::new();
    for (col, header) in headers.iter().enumerate() {
        let (base, component) = match vector_part(header) {
            Some((base, i)) => (base.to_string(), Some(i)),
            None => (header.clone(), None),
        };
        match groups.iter_mut().find(|(name, _)| *name == base) {
            Some((_, parts)) => parts.push((component.unwrap_or(0), col)),
            None => groups.push((base, vec![(component.unwrap_or(0), col)])),
        }
    }

    let mut raw: Vec<Option<Vec<String>>> = raw.into_iter().map(Some).collect();
    let mut columns = Vec::with_capacity(groups.len());
    for (name, mut parts) in groups {
        if parts.len() == 1 && !headers[parts[0].1].ends_with(".0") {
            let values = raw[parts[0].1].take().unwrap_or_default();
            let column = match infer(values) {
                Inferred::Int(v) => Column::new(name, "<i8", 1, ColumnData::Int(v)),
                Inferred::Float(v) => Column::new(name, "<f8", 1, ColumnData::Float(v)),
                Inferred::Str(v) => Column::strings(name, v),
            };
            columns.push(column);
            continue;
        }

        parts.sort_by_key(|(component, _)| *component);
        let width = parts.len();
        let components: Vec<Vec<f64>> = parts
            .iter()
            .map(|(_, col)| {
                let values = raw[*col].take().unwrap_or_default();
                values
                    .iter()
                    .map(|v| {
                        v.parse::<f64>().map_err(|_| {
                            RecordError::format(
                                path.display(),
                                format!("non-numeric value '{}' in vector field {}", v, name),
                            )
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()
            })
            .collect::<Result<_, _>>()?;

        let rows = components.first().map_or(0, Vec::len);
        let mut flat = Vec::with_capacity(rows * width);
        for r in 0..rows {
            flat.extend(components.iter().map(|c| c[r]));
        }
        columns.push(Column::new(name, "<f8", width, ColumnData::Float(flat)));
    }

    debug!("Read {} v0 fields from {}", columns.len(), path.display());
    RecordArray::from_columns(path, FormatVersion::LegacyCsv, columns)
}
