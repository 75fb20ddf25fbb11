//! `.npy` structured-array decoding.

use std::path::Path;

use byteorder::{BigEndian, ByteOrder, LittleEndian};

use super::dtype::{DType, Endian, FieldSpec, ScalarKind};
use super::{Column, ColumnData, FormatVersion, RecordArray, RecordError, NPY_MAGIC};

/// Python literal as found in an `.npy` header
#[derive(Debug, Clone, PartialEq)]
enum PyValue {
    Str(String),
    Int(i64),
    Bool(bool),
    None,
    List(Vec<PyValue>),
    Tuple(Vec<PyValue>),
    Dict(Vec<(PyValue, PyValue)>),
}

impl PyValue {
    fn items(&self) -> Option<&[PyValue]> {
        match self {
            PyValue::List(v) | PyValue::Tuple(v) => Some(v),
            _ => None,
        }
    }

    fn get(&self, key: &str) -> Option<&PyValue> {
        match self {
            PyValue::Dict(pairs) => pairs
                .iter()
                .find(|(k, _)| matches!(k, PyValue::Str(s) if s == key))
                .map(|(_, v)| v),
            _ => None,
        }
    }
}

struct LiteralParser<'a> {
    src: &'a [u8],
    pos: usize,
}

impl<'a> LiteralParser<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src: src.as_bytes(),
            pos: 0,
        }
    }

    fn skip_ws(&mut self) {
        while self.pos < self.src.len() && self.src[self.pos].is_ascii_whitespace() {
            self.pos += 1;
        }
    }

    fn peek(&mut self) -> Option<u8> {
        self.skip_ws();
        self.src.get(self.pos).copied()
    }

    fn expect(&mut self, c: u8) -> Result<(), String> {
        match self.peek() {
            Some(found) if found == c => {
                self.pos += 1;
                Ok(())
            }
            Some(found) => Err(format!(
                "expected '{}' at offset {}, found '{}'",
                c as char, self.pos, found as char
            )),
            None => Err(format!("expected '{}', found end of header", c as char)),
        }
    }

    fn parse(&mut self) -> Result<PyValue, String> {
        match self.peek() {
            Some(b'{') => self.parse_dict(),
            Some(b'[') => self.parse_seq(b'[', b']').map(PyValue::List),
            Some(b'(') => self.parse_seq(b'(', b')').map(PyValue::Tuple),
            Some(q @ (b'\'' | b'"')) => self.parse_str(q),
            Some(c) if c == b'-' || c.is_ascii_digit() => self.parse_int(),
            Some(_) => self.parse_word(),
            None => Err("unexpected end of header".into()),
        }
    }

    fn parse_dict(&mut self) -> Result<PyValue, String> {
        self.expect(b'{')?;
        let mut pairs = Vec::new();
        loop {
            if self.peek() == Some(b'}') {
                self.pos += 1;
                return Ok(PyValue::Dict(pairs));
            }
            let key = self.parse()?;
            self.expect(b':')?;
            let value = self.parse()?;
            pairs.push((key, value));
            match self.peek() {
                Some(b',') => self.pos += 1,
                Some(b'}') => {}
                _ => return Err(format!("expected ',' or '}}' at offset {}", self.pos)),
            }
        }
    }

    fn parse_seq(&mut self, open: u8, close: u8) -> Result<Vec<PyValue>, String> {
        self.expect(open)?;
        let mut items = Vec::new();
        loop {
            if self.peek() == Some(close) {
                self.pos += 1;
                return Ok(items);
            }
            items.push(self.parse()?);
            match self.peek() {
                Some(b',') => self.pos += 1,
                Some(c) if c == close => {}
                _ => {
                    return Err(format!(
                        "expected ',' or '{}' at offset {}",
                        close as char, self.pos
                    ))
                }
            }
        }
    }

    fn parse_str(&mut self, quote: u8) -> Result<PyValue, String> {
        self.pos += 1;
        let start = self.pos;
        while self.pos < self.src.len() && self.src[self.pos] != quote {
            if self.src[self.pos] == b'\\' {
                self.pos += 1;
            }
            self.pos += 1;
        }
        if self.pos >= self.src.len() {
            return Err("unterminated string in header".into());
        }
        let text = String::from_utf8_lossy(&self.src[start..self.pos]).replace("\\'", "'");
        self.pos += 1;
        Ok(PyValue::Str(text))
    }

    fn parse_int(&mut self) -> Result<PyValue, String> {
        let start = self.pos;
        if self.src[self.pos] == b'-' {
            self.pos += 1;
        }
        while self.pos < self.src.len() && self.src[self.pos].is_ascii_digit() {
            self.pos += 1;
        }
        // Python 2 headers may carry long suffixes
        let digits = std::str::from_utf8(&self.src[start..self.pos]).map_err(|e| e.to_string())?;
        if self.pos < self.src.len() && self.src[self.pos] == b'L' {
            self.pos += 1;
        }
        digits
            .parse()
            .map(PyValue::Int)
            .map_err(|_| format!("bad integer '{}' in header", digits))
    }

    fn parse_word(&mut self) -> Result<PyValue, String> {
        let start = self.pos;
        while self.pos < self.src.len() && self.src[self.pos].is_ascii_alphabetic() {
            self.pos += 1;
        }
        match &self.src[start..self.pos] {
            b"True" => Ok(PyValue::Bool(true)),
            b"False" => Ok(PyValue::Bool(false)),
            b"None" => Ok(PyValue::None),
            other => Err(format!(
                "unexpected token '{}' in header",
                String::from_utf8_lossy(other)
            )),
        }
    }
}

fn parse_descr(descr: &PyValue) -> Result<Vec<FieldSpec>, String> {
    let entries = match descr {
        PyValue::List(entries) => entries,
        PyValue::Str(s) => return Err(format!("plain '{}' array is not a structured array", s)),
        _ => return Err("descr is neither a list nor a type string".into()),
    };

    entries
        .iter()
        .map(|entry| {
            let parts = entry
                .items()
                .ok_or_else(|| "descr entry is not a tuple".to_string())?;
            let name = match parts.first() {
                Some(PyValue::Str(name)) => name.clone(),
                // (('title', 'name'), type) form
                Some(PyValue::Tuple(titled)) => match titled.get(1) {
                    Some(PyValue::Str(name)) => name.clone(),
                    _ => return Err("bad titled field name".into()),
                },
                _ => return Err("descr entry without a field name".into()),
            };
            let dtype = match parts.get(1) {
                Some(PyValue::Str(typestr)) => DType::parse(typestr)?,
                Some(PyValue::List(_)) => return Err(format!("nested record field '{}'", name)),
                _ => return Err(format!("field '{}' has no type", name)),
            };
            let shape = match parts.get(2) {
                None => Vec::new(),
                Some(PyValue::Tuple(dims)) => dims
                    .iter()
                    .map(|d| match d {
                        PyValue::Int(n) if *n >= 0 => Ok(*n as usize),
                        _ => Err(format!("bad shape for field '{}'", name)),
                    })
                    .collect::<Result<Vec<_>, _>>()?,
                Some(PyValue::Int(n)) if *n >= 0 => vec![*n as usize],
                Some(_) => return Err(format!("bad shape for field '{}'", name)),
            };
            Ok(FieldSpec { name, dtype, shape })
        })
        .collect()
}

/// Decode an in-memory `.npy` structured array
pub fn parse_npy(bytes: &[u8], path: &Path) -> Result<RecordArray, RecordError> {
    let fail = |message: String| RecordError::format(path.display(), message);

    if bytes.len() < 10 || &bytes[..6] != NPY_MAGIC {
        return Err(fail("missing npy magic".into()));
    }
    let major = bytes[6];
    let (header_len, header_start) = match major {
        1 => (LittleEndian::read_u16(&bytes[8..10]) as usize, 10),
        2 | 3 if bytes.len() >= 12 => (LittleEndian::read_u32(&bytes[8..12]) as usize, 12),
        _ => return Err(fail(format!("unsupported npy version {}", major))),
    };
    let data_start = header_start + header_len;
    if bytes.len() < data_start {
        return Err(fail("truncated header".into()));
    }

    let header_text = String::from_utf8_lossy(&bytes[header_start..data_start]);
    let header = LiteralParser::new(&header_text).parse().map_err(&fail)?;

    if header.get("fortran_order") == Some(&PyValue::Bool(true)) {
        return Err(fail("fortran-ordered arrays are not supported".into()));
    }
    let rows = match header.get("shape").and_then(PyValue::items) {
        Some([PyValue::Int(n)]) if *n >= 0 => *n as usize,
        Some(dims) => return Err(fail(format!("expected a 1-D array, shape has {} dims", dims.len()))),
        None => return Err(fail("header has no shape".into())),
    };
    let fields = header
        .get("descr")
        .ok_or_else(|| fail("header has no descr".into()))
        .and_then(|d| parse_descr(d).map_err(&fail))?;

    let record_len = fields
        .iter()
        .try_fold(0usize, |acc, f| {
            f.shape
                .iter()
                .try_fold(f.dtype.size, |n, &d| n.checked_mul(d))
                .and_then(|len| acc.checked_add(len))
        })
        .ok_or_else(|| fail("record size overflows".into()))?;
    if record_len == 0 && rows > 0 {
        return Err(fail("records have no bytes".into()));
    }
    let needed = rows
        .checked_mul(record_len)
        .filter(|n| data_start.checked_add(*n).is_some())
        .ok_or_else(|| fail("record count overflows".into()))?;
    if bytes.len() - data_start < needed {
        return Err(fail(format!(
            "expected {} data bytes for {} records, found {}",
            needed,
            rows,
            bytes.len() - data_start
        )));
    }
    let data = &bytes[data_start..data_start + needed];

    let mut columns = Vec::with_capacity(fields.len());
    let mut offset = 0;
    for field in &fields {
        if field.dtype.kind != ScalarKind::Void && !field.name.is_empty() {
            let values = match field.dtype.endian {
                Endian::Little => decode_field::<LittleEndian>(data, rows, record_len, offset, field),
                Endian::Big => decode_field::<BigEndian>(data, rows, record_len, offset, field),
            };
            columns.push(Column::new(
                field.name.clone(),
                field.dtype.to_string(),
                field.count(),
                values,
            ));
        }
        offset += field.byte_len();
    }

    RecordArray::from_columns(path, FormatVersion::Npy(major), columns)
}

fn decode_field<B: ByteOrder>(
    data: &[u8],
    rows: usize,
    record_len: usize,
    offset: usize,
    field: &FieldSpec,
) -> ColumnData {
    let size = field.dtype.size;
    let count = field.count();
    let cells = (0..rows).flat_map(move |r| {
        (0..count).map(move |c| {
            let start = r * record_len + offset + c * size;
            &data[start..start + size]
        })
    });

    match field.dtype.kind {
        ScalarKind::Bool => ColumnData::Bool(cells.map(|b| b[0] != 0).collect()),
        ScalarKind::Int => ColumnData::Int(
            cells
                .map(|b| match size {
                    1 => i64::from(b[0] as i8),
                    2 => i64::from(B::read_i16(b)),
                    4 => i64::from(B::read_i32(b)),
                    _ => B::read_i64(b),
                })
                .collect(),
        ),
        ScalarKind::UInt => ColumnData::UInt(
            cells
                .map(|b| match size {
                    1 => u64::from(b[0]),
                    2 => u64::from(B::read_u16(b)),
                    4 => u64::from(B::read_u32(b)),
                    _ => B::read_u64(b),
                })
                .collect(),
        ),
        ScalarKind::Float => ColumnData::Float(
            cells
                .map(|b| match size {
                    4 => f64::from(B::read_f32(b)),
                    _ => B::read_f64(b),
                })
                .collect(),
        ),
        ScalarKind::Bytes => ColumnData::Str(
            cells
                .map(|b| {
                    let end = b.iter().position(|&x| x == 0).unwrap_or(b.len());
                    String::from_utf8_lossy(&b[..end]).into_owned()
                })
                .collect(),
        ),
        ScalarKind::Unicode => ColumnData::Str(
            cells
                .map(|b| {
                    b.chunks_exact(4)
                        .map(B::read_u32)
                        .take_while(|&cp| cp != 0)
                        .filter_map(char::from_u32)
                        .collect()
                })
                .collect(),
        ),
        ScalarKind::Void => ColumnData::Str(Vec::new()),
    }
}
