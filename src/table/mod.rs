//! # STAR Table Module
//!
//! In-memory tables of [`Row`]s and the plain-text STAR reader/writer.
//!
//! ## Format
//!
//! ```text
//! # version 30001
//!
//! data_optics
//!
//! loop_
//! _rlnOpticsGroupName #1
//! _rlnOpticsGroup #2
//! _rlnVoltage #3
//! opticsGroup1 1 300.000000
//!
//! # version 30001
//!
//! data_particles
//!
//! loop_
//! _rlnImageName #1
//! _rlnEnabled #2
//! _rlnOpticsGroup #3
//! 000001@J12/extract/stack.mrcs 1 1
//! ```
//!
//! A file holds one or more named blocks. A `loop_` block lists one column key
//! per line followed by whitespace-delimited data lines; a block without
//! `loop_` holds `_key value` pairs and is read as a single-row table.
//!
//! ## Example
//!
//! ```rust,no_run
//! use csstar::schema::{Label, SchemaVersion};
//! use csstar::table::{read_table, write_table, Row, Table, WriteOptions};
//!
//! let mut table = Table::new("particles");
//! let mut row = Row::new();
//! row.set(Label::ImageName, "000001@stack.mrcs");
//! row.set(Label::Enabled, true);
//! table.push(row);
//!
//! let options = WriteOptions::new("particles").version(SchemaVersion::Relion30);
//! write_table(&table, "particles.star", &options)?;
//!
//! let back = read_table("particles.star", "particles")?;
//! assert_eq!(back.len(), 1);
//! # Ok::<(), csstar::table::TableError>(())
//! ```

mod error;
pub mod optics;
mod reader;
mod row;
mod writer;


pub use error::TableError;
pub use reader::{parse_star, read_star, read_table, StarFile};
pub use row::Row;
pub use writer::{write_star_to, write_table, WriteOptions};

use crate::schema::{Label, Value};

/// A named block of rows sharing one column schema
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    name: String,
    rows: Vec<Row>,
}

impl Table {
    /// Create an empty table with the given block name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rows: Vec::new(),
        }
    }

    /// Create a table from existing rows
    pub fn with_rows(name: impl Into<String>, rows: Vec<Row>) -> Self {
        Self {
            name: name.into(),
            rows,
        }
    }

    /// Block name (without the `data_` prefix)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rename the block
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Rows in table order
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Mutable access to the rows
    pub fn rows_mut(&mut self) -> &mut Vec<Row> {
        &mut self.rows
    }

    /// Consume the table, returning its rows
    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }

    /// Append a row
    pub fn push(&mut self, row: Row) {
        self.rows.push(row);
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Columns shared by every row, in the order of the first row
    pub fn labels(&self) -> Vec<Label> {
        let Some(first) = self.rows.first() else {
            return Vec::new();
        };
        first
            .labels()
            .filter(|label| self.rows.iter().all(|row| row.has(*label)))
            .collect()
    }

    /// Columns present on at least one row but not on all of them
    pub fn partial_labels(&self) -> Vec<Label> {
        let mut partial: Vec<Label> = Vec::new();
        for row in &self.rows {
            for label in row.labels() {
                if !partial.contains(&label) && !self.rows.iter().all(|r| r.has(label)) {
                    partial.push(label);
                }
            }
        }
        partial
    }

    /// Set `label` to the same value on every row
    pub fn fill_constant(&mut self, label: Label, value: impl Into<Value>) {
        fill_constant(&mut self.rows, label, value);
    }

    /// Remove `label` from every row
    pub fn remove_column(&mut self, label: Label) {
        remove_column(&mut self.rows, label);
    }

    /// Stable sort by the item id column; rows without one keep their place at the end
    pub fn sort_by_item_id(&mut self) {
        self.rows
            .sort_by_key(|row| row.get_i64(Label::ItemId).unwrap_or(i64::MAX));
    }
}

/// Set `label` to one constant value across every row
pub fn fill_constant(rows: &mut [Row], label: Label, value: impl Into<Value>) {
    let value = value.into();
    for row in rows.iter_mut() {
        row.set(label, value.clone());
    }
}

/// Strip `label` from every row
pub fn remove_column(rows: &mut [Row], label: Label) {
    for row in rows.iter_mut() {
        row.remove(label);
    }
}
