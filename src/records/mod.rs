//! # Record Arrays
//!
//! Reader for the engine's per-particle metadata arrays (`.cs` files).
//!
//! ## Formats
//!
//! | Version | Layout | Detection |
//! |---------|--------|-----------|
//! | v2+ | NumPy `.npy` structured array, one record per particle | `\x93NUMPY` magic |
//! | v0 | comma separated text with dotted vector columns | CSV header with `uid` or `data_input_relpath` |
//!
//! Files larger than [`MMAP_THRESHOLD`] are memory-mapped instead of read
//! into memory.
//!
//! ## Example
//!
//! ```rust,no_run
//! use csstar::records::{load_primary, merge_passthrough};
//!
//! let primary = load_primary("J12_particles.cs")?;
//! let extra = load_primary("P3_J12_passthrough_particles.cs")?;
//! let merged = merge_passthrough(primary, vec![extra])?;
//! println!("{} rows, {} fields", merged.len(), merged.field_names().len());
//! # Ok::<(), csstar::records::RecordError>(())
//! ```

mod dtype;
mod error;
mod legacy;
mod merge;
mod npy;

#[cfg(test)]
mod tests;

pub use dtype::{DType, Endian, FieldSpec, ScalarKind};
pub use error::RecordError;
pub use legacy::parse_legacy;
pub use merge::{detect_merge_key, merge_passthrough, MERGE_KEYS};
pub use npy::parse_npy;

use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};

use log::debug;

/// Files at least this large are memory-mapped
pub const MMAP_THRESHOLD: u64 = 64 * 1024 * 1024;

const NPY_MAGIC: &[u8] = b"\x93NUMPY";

/// Which on-disk layout an array was read from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatVersion {
    /// Legacy comma separated export
    LegacyCsv,
    /// `.npy` structured array with the given header major version
    Npy(u8),
}

impl fmt::Display for FormatVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormatVersion::LegacyCsv => f.write_str("v0 (csv)"),
            FormatVersion::Npy(major) => write!(f, "npy v{}", major),
        }
    }
}

/// Values of one field for every record, flattened row-major
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    /// Booleans
    Bool(Vec<bool>),
    /// Signed integers
    Int(Vec<i64>),
    /// Unsigned integers (UIDs are full 64-bit)
    UInt(Vec<u64>),
    /// Floats
    Float(Vec<f64>),
    /// Decoded strings
    Str(Vec<String>),
}

impl ColumnData {
    fn len(&self) -> usize {
        match self {
            ColumnData::Bool(v) => v.len(),
            ColumnData::Int(v) => v.len(),
            ColumnData::UInt(v) => v.len(),
            ColumnData::Float(v) => v.len(),
            ColumnData::Str(v) => v.len(),
        }
    }

    fn take(&self, indices: &[usize], width: usize) -> ColumnData {
        fn pick<T: Clone>(values: &[T], indices: &[usize], width: usize) -> Vec<T> {
            indices
                .iter()
                .flat_map(|&i| values[i * width..(i + 1) * width].iter().cloned())
                .collect()
        }
        match self {
            ColumnData::Bool(v) => ColumnData::Bool(pick(v, indices, width)),
            ColumnData::Int(v) => ColumnData::Int(pick(v, indices, width)),
            ColumnData::UInt(v) => ColumnData::UInt(pick(v, indices, width)),
            ColumnData::Float(v) => ColumnData::Float(pick(v, indices, width)),
            ColumnData::Str(v) => ColumnData::Str(pick(v, indices, width)),
        }
    }
}

/// One named field of a record array
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    name: String,
    type_name: String,
    width: usize,
    data: ColumnData,
}

impl Column {
    /// Create a column; `data` holds `width` values per record
    pub fn new(name: impl Into<String>, type_name: impl Into<String>, width: usize, data: ColumnData) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            width: width.max(1),
            data,
        }
    }

    /// Scalar float column
    pub fn floats(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self::new(name, "<f8", 1, ColumnData::Float(values))
    }

    /// Scalar string column
    pub fn strings(name: impl Into<String>, values: Vec<String>) -> Self {
        Self::new(name, "str", 1, ColumnData::Str(values))
    }

    /// Field name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared element type, e.g. `<f4`
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Values per record
    pub fn width(&self) -> usize {
        self.width
    }

    /// Raw values
    pub fn data(&self) -> &ColumnData {
        &self.data
    }

    /// Number of records
    pub fn rows(&self) -> usize {
        self.data.len() / self.width
    }

    /// Numeric value of element `component` of record `row`
    pub fn f64_at(&self, row: usize, component: usize) -> Option<f64> {
        if component >= self.width {
            return None;
        }
        let i = row * self.width + component;
        match &self.data {
            ColumnData::Bool(v) => v.get(i).map(|b| if *b { 1.0 } else { 0.0 }),
            ColumnData::Int(v) => v.get(i).map(|x| *x as f64),
            ColumnData::UInt(v) => v.get(i).map(|x| *x as f64),
            ColumnData::Float(v) => v.get(i).copied(),
            ColumnData::Str(v) => v.get(i).and_then(|s| s.trim().parse().ok()),
        }
    }

    /// Numeric value of a scalar record
    pub fn f64(&self, row: usize) -> Option<f64> {
        self.f64_at(row, 0)
    }

    /// Integer value of a scalar record
    pub fn i64(&self, row: usize) -> Option<i64> {
        match &self.data {
            ColumnData::Int(v) => v.get(row * self.width).copied(),
            ColumnData::UInt(v) => v.get(row * self.width).and_then(|x| i64::try_from(*x).ok()),
            ColumnData::Bool(v) => v.get(row * self.width).map(|b| i64::from(*b)),
            ColumnData::Float(v) => v
                .get(row * self.width)
                .filter(|x| x.fract() == 0.0)
                .map(|x| *x as i64),
            ColumnData::Str(v) => v.get(row * self.width).and_then(|s| s.trim().parse().ok()),
        }
    }

    /// String value of a scalar record
    pub fn str(&self, row: usize) -> Option<&str> {
        match &self.data {
            ColumnData::Str(v) => v.get(row * self.width).map(String::as_str),
            _ => None,
        }
    }

    /// All elements of record `row` as floats
    pub fn vector(&self, row: usize) -> Option<Vec<f64>> {
        (0..self.width).map(|c| self.f64_at(row, c)).collect()
    }

    /// Text form of a record, used to compare join keys
    pub fn key(&self, row: usize) -> Option<String> {
        let i = row * self.width;
        match &self.data {
            ColumnData::Bool(v) => v.get(i).map(|b| b.to_string()),
            ColumnData::Int(v) => v.get(i).map(|x| x.to_string()),
            ColumnData::UInt(v) => v.get(i).map(|x| x.to_string()),
            ColumnData::Float(v) => v.get(i).map(|x| x.to_string()),
            ColumnData::Str(v) => v.get(i).cloned(),
        }
    }

    fn take(&self, indices: &[usize]) -> Column {
        Column {
            name: self.name.clone(),
            type_name: self.type_name.clone(),
            width: self.width,
            data: self.data.take(indices, self.width),
        }
    }
}

/// A column-oriented table of engine records
#[derive(Debug, Clone, PartialEq)]
pub struct RecordArray {
    path: PathBuf,
    version: FormatVersion,
    columns: Vec<Column>,
    len: usize,
}

impl RecordArray {
    /// Build an array from columns of equal record count
    pub fn from_columns(
        path: impl Into<PathBuf>,
        version: FormatVersion,
        columns: Vec<Column>,
    ) -> Result<Self, RecordError> {
        let path = path.into();
        let len = columns.first().map_or(0, Column::rows);
        if let Some(bad) = columns.iter().find(|c| c.rows() != len) {
            return Err(RecordError::format(
                path.display(),
                format!("field {} has {} records, expected {}", bad.name, bad.rows(), len),
            ));
        }
        Ok(Self {
            path,
            version,
            columns,
            len,
        })
    }

    /// File the array was read from
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// On-disk layout
    pub fn version(&self) -> FormatVersion {
        self.version
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether there are no records
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Columns in file order
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Field names in file order
    pub fn field_names(&self) -> Vec<&str> {
        self.columns.iter().map(Column::name).collect()
    }

    /// Look up a field
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Whether a field exists
    pub fn has_field(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    /// Numeric scalar of a field
    pub fn f64(&self, name: &str, row: usize) -> Option<f64> {
        self.column(name).and_then(|c| c.f64(row))
    }

    /// Element `component` of a vector field
    pub fn f64_at(&self, name: &str, row: usize, component: usize) -> Option<f64> {
        self.column(name).and_then(|c| c.f64_at(row, component))
    }

    /// Integer scalar of a field
    pub fn i64(&self, name: &str, row: usize) -> Option<i64> {
        self.column(name).and_then(|c| c.i64(row))
    }

    /// String scalar of a field
    pub fn str(&self, name: &str, row: usize) -> Option<&str> {
        self.column(name).and_then(|c| c.str(row))
    }

    /// All elements of a vector field
    pub fn vector(&self, name: &str, row: usize) -> Option<Vec<f64>> {
        self.column(name).and_then(|c| c.vector(row))
    }

    /// Add a column, replacing any field of the same name
    pub fn insert_column(&mut self, column: Column) -> Result<(), RecordError> {
        if !self.columns.is_empty() && column.rows() != self.len {
            return Err(RecordError::MergeError(format!(
                "field {} has {} records, expected {}",
                column.name,
                column.rows(),
                self.len
            )));
        }
        if self.columns.is_empty() {
            self.len = column.rows();
        }
        match self.columns.iter().position(|c| c.name == column.name) {
            Some(i) => self.columns[i] = column,
            None => self.columns.push(column),
        }
        Ok(())
    }

    /// Keep only the given records, in the given order
    pub fn take_rows(&self, indices: &[usize]) -> RecordArray {
        RecordArray {
            path: self.path.clone(),
            version: self.version,
            columns: self.columns.iter().map(|c| c.take(indices)).collect(),
            len: indices.len(),
        }
    }
}

/// Load an engine record array, detecting its format from the content
pub fn load_primary<P: AsRef<Path>>(path: P) -> Result<RecordArray, RecordError> {
    let path = path.as_ref();
    let mut file = File::open(path)?;
    let size = file.metadata()?.len();

    let mut magic = [0u8; 6];
    let read = read_prefix(&mut file, &mut magic)?;

    if read == NPY_MAGIC.len() && magic == NPY_MAGIC {
        let file = File::open(path)?;
        let array = if size >= MMAP_THRESHOLD {
            debug!("Memory-mapping {} ({} bytes)", path.display(), size);
            // SAFETY: read-only mapping, the file is only read for the duration of the parse
            let mmap = unsafe { memmap2::Mmap::map(&file)? };
            parse_npy(&mmap, path)?
        } else {
            let mut bytes = Vec::with_capacity(size as usize);
            BufReader::new(file).read_to_end(&mut bytes)?;
            parse_npy(&bytes, path)?
        };
        debug!(
            "Loaded {} records with {} fields from {}",
            array.len(),
            array.columns().len(),
            path.display()
        );
        return Ok(array);
    }

    let mut header = Vec::new();
    BufReader::new(File::open(path)?).read_until(b'\n', &mut header)?;
    if legacy::is_legacy_header(&String::from_utf8_lossy(&header)) {
        let array = parse_legacy(BufReader::new(File::open(path)?), path)?;
        debug!(
            "Loaded {} legacy records from {}",
            array.len(),
            path.display()
        );
        return Ok(array);
    }

    Err(RecordError::format(
        path.display(),
        "neither an npy structured array nor a v0 csv export",
    ))
}

fn read_prefix(file: &mut File, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match file.read(&mut buf[filled..])? {
            0 => break,
            n => filled += n,
        }
    }
    Ok(filled)
}
