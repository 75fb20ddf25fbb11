use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use log::{debug, warn};

use super::optics::{origin_counterpart, prepare_rows, split_optics};
use super::{remove_column, Row, Table, TableError};
use crate::schema::{Label, SchemaVersion, Value};

/// Options controlling how a table is written
#[derive(Debug, Clone)]
pub struct WriteOptions {
    /// Name of the data block (without `data_`)
    pub block_name: String,
    /// Reorder rows by the item id column before writing
    pub resort_by_id: bool,
    /// Emit a leading optics block when the version supports it
    pub include_optics: bool,
    /// Target schema version
    pub version: SchemaVersion,
}

impl WriteOptions {
    /// Defaults: resort by id, include optics, latest schema
    pub fn new(block_name: impl Into<String>) -> Self {
        Self {
            block_name: block_name.into(),
            resort_by_id: true,
            include_optics: true,
            version: SchemaVersion::default(),
        }
    }

    /// Set whether rows are resorted by item id
    pub fn resort_by_id(mut self, resort: bool) -> Self {
        self.resort_by_id = resort;
        self
    }

    /// Set whether the optics block is written
    pub fn include_optics(mut self, include: bool) -> Self {
        self.include_optics = include;
        self
    }

    /// Set the target schema version
    pub fn version(mut self, version: SchemaVersion) -> Self {
        self.version = version;
        self
    }
}

/// Write a table to a STAR file
pub fn write_table<P: AsRef<Path>>(
    table: &Table,
    path: P,
    options: &WriteOptions,
) -> Result<(), TableError> {
    let file = File::create(path.as_ref())?;
    let mut writer = BufWriter::new(file);
    write_star_to(&mut writer, table, options)?;
    writer.flush()?;
    Ok(())
}

/// Write a table as STAR text to any writer
pub fn write_star_to<W: Write>(
    mut writer: W,
    table: &Table,
    options: &WriteOptions,
) -> Result<(), TableError> {
    let mut rows: Vec<Row> = table.rows().to_vec();
    prepare_rows(&mut rows, options.version);

    for label in options.version.deprecated_labels() {
        if let Some(counterpart) = origin_counterpart(*label) {
            let unconverted = rows
                .iter()
                .filter(|r| r.has(*label) && !r.has(counterpart))
                .count();
            if unconverted > 0 {
                if rows.iter().any(|r| r.has(counterpart)) {
                    return Err(TableError::InvalidTable(format!(
                        "{} rows hold _{} without a pixel size to convert it to _{}",
                        unconverted,
                        label.star_key(),
                        counterpart.star_key()
                    )));
                }
                warn!(
                    "Keeping _{} in {}: no pixel size to convert it to _{}",
                    label.star_key(),
                    options.version,
                    counterpart.star_key()
                );
                continue;
            }
        }
        if rows.iter().any(|r| r.has(*label)) {
            debug!(
                "Dropping column _{} deprecated in {}",
                label.star_key(),
                options.version
            );
            remove_column(&mut rows, *label);
        }
    }

    if options.resort_by_id {
        rows.sort_by_key(|row| row.get_i64(Label::ItemId).unwrap_or(i64::MAX));
    }

    if options.include_optics && options.version.has_optics() {
        if let Some(optics) = split_optics(&mut rows) {
            write_block(&mut writer, &optics, options.version)?;
        }
    }

    let body = Table::with_rows(options.block_name.clone(), rows);
    let partial = body.partial_labels();
    if !partial.is_empty() {
        warn!(
            "Omitting columns missing on some rows of data_{}: {}",
            body.name(),
            partial
                .iter()
                .map(|l| l.star_key())
                .collect::<Vec<_>>()
                .join(", ")
        );
    }
    write_block(&mut writer, &body, options.version)
}

fn write_block<W: Write>(
    writer: &mut W,
    table: &Table,
    version: SchemaVersion,
) -> Result<(), TableError> {
    let labels = table.labels();

    writeln!(writer)?;
    if let Some(tag) = version.header_tag() {
        writeln!(writer, "# version {}", tag)?;
        writeln!(writer)?;
    }
    writeln!(writer, "data_{}", table.name())?;
    writeln!(writer)?;
    writeln!(writer, "loop_ ")?;
    for (i, label) in labels.iter().enumerate() {
        writeln!(writer, "_{} #{}", label.star_key(), i + 1)?;
    }

    let mut line = String::new();
    for row in table.rows() {
        line.clear();
        for (i, label) in labels.iter().enumerate() {
            if i > 0 {
                line.push(' ');
            }
            // labels() only returns columns present on every row
            if let Some(value) = row.get(*label) {
                line.push_str(&format_token(value));
            }
        }
        writeln!(writer, "{}", line)?;
    }
    writeln!(writer)?;
    Ok(())
}

/// Words a bare token must not start with
const RESERVED_PREFIXES: [&str; 5] = ["data_", "loop_", "save_", "global_", "stop_"];

fn needs_quotes(s: &str) -> bool {
    let lower = s.to_ascii_lowercase();
    s.chars().any(char::is_whitespace)
        || s.starts_with(['#', '_', '\'', '"'])
        || RESERVED_PREFIXES.iter().any(|p| lower.starts_with(p))
}

fn format_token(value: &Value) -> String {
    match value {
        Value::Str(s) if s.is_empty() => "\"\"".to_string(),
        Value::Str(s) if needs_quotes(s) => {
            if s.contains('"') {
                format!("'{}'", s)
            } else {
                format!("\"{}\"", s)
            }
        }
        other => other.to_string(),
    }
}
