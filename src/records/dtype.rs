use std::fmt;

/// Byte order of a multi-byte field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endian {
    /// `<`
    Little,
    /// `>`
    Big,
}

impl Endian {
    fn native() -> Self {
        if cfg!(target_endian = "big") {
            Endian::Big
        } else {
            Endian::Little
        }
    }
}

/// Element kind of a structured-array field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    /// `b1`
    Bool,
    /// `i1`..`i8`
    Int,
    /// `u1`..`u8`
    UInt,
    /// `f4`, `f8`
    Float,
    /// `S<n>`: NUL padded bytes
    Bytes,
    /// `U<n>`: UTF-32 code points
    Unicode,
    /// `V<n>`: padding
    Void,
}

/// Parsed array-protocol type string such as `<f4` or `|S64`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DType {
    /// Element kind
    pub kind: ScalarKind,
    /// Bytes per element
    pub size: usize,
    /// Byte order of numeric elements
    pub endian: Endian,
}

impl DType {
    /// Parse a type string, returning a description of the problem on failure
    pub fn parse(typestr: &str) -> Result<DType, String> {
        let mut chars = typestr.chars();
        let (endian, rest) = match chars.next() {
            Some('<') => (Endian::Little, chars.as_str()),
            Some('>') => (Endian::Big, chars.as_str()),
            Some('=') | Some('|') => (Endian::native(), chars.as_str()),
            _ => (Endian::native(), typestr),
        };

        let mut rest_chars = rest.chars();
        let code = rest_chars
            .next()
            .ok_or_else(|| format!("empty type string '{}'", typestr))?;
        let count: usize = match rest_chars.as_str() {
            "" => 0,
            n => n
                .parse()
                .map_err(|_| format!("bad item size in type string '{}'", typestr))?,
        };

        let (kind, size) = match (code, count) {
            ('b', 1) | ('?', 0) => (ScalarKind::Bool, 1),
            ('i', 1 | 2 | 4 | 8) => (ScalarKind::Int, count),
            ('u', 1 | 2 | 4 | 8) => (ScalarKind::UInt, count),
            ('f', 4 | 8) => (ScalarKind::Float, count),
            ('S' | 'a', n) => (ScalarKind::Bytes, n),
            ('U', n) => (ScalarKind::Unicode, n * 4),
            ('V', n) => (ScalarKind::Void, n),
            ('O', _) => return Err("object fields cannot be read without Python".into()),
            _ => return Err(format!("unsupported type string '{}'", typestr)),
        };

        Ok(DType { kind, size, endian })
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let order = match (self.kind, self.endian) {
            (ScalarKind::Bool | ScalarKind::Bytes | ScalarKind::Void, _) => '|',
            (_, Endian::Little) => '<',
            (_, Endian::Big) => '>',
        };
        let (code, n) = match self.kind {
            ScalarKind::Bool => ('b', 1),
            ScalarKind::Int => ('i', self.size),
            ScalarKind::UInt => ('u', self.size),
            ScalarKind::Float => ('f', self.size),
            ScalarKind::Bytes => ('S', self.size),
            ScalarKind::Unicode => ('U', self.size / 4),
            ScalarKind::Void => ('V', self.size),
        };
        write!(f, "{}{}{}", order, code, n)
    }
}

/// One named field of a structured array
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    /// Field name, e.g. `blob/path`
    pub name: String,
    /// Element type
    pub dtype: DType,
    /// Fixed subarray shape, empty for scalars
    pub shape: Vec<usize>,
}

impl FieldSpec {
    /// Elements per record
    pub fn count(&self) -> usize {
        self.shape.iter().product()
    }

    /// Bytes per record
    pub fn byte_len(&self) -> usize {
        self.count() * self.dtype.size
    }
}
