use std::fmt;

/// Declared storage type of a field identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    /// Signed integer
    Int,
    /// Double precision float
    Float,
    /// Boolean flag (written as 1/0)
    Bool,
    /// Free text (paths, names)
    Str,
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueType::Int => "int",
            ValueType::Float => "float",
            ValueType::Bool => "bool",
            ValueType::Str => "string",
        };
        f.write_str(name)
    }
}

/// A single typed cell of a row
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Integer value
    Int(i64),
    /// Floating point value
    Float(f64),
    /// Boolean value
    Bool(bool),
    /// String value
    Str(String),
}

impl Value {
    /// Storage type of this value
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Int(_) => ValueType::Int,
            Value::Float(_) => ValueType::Float,
            Value::Bool(_) => ValueType::Bool,
            Value::Str(_) => ValueType::Str,
        }
    }

    /// Convert to the requested type.
    ///
    /// Returns `None` when the conversion would lose meaning (a non-numeric
    /// string into a number, a fractional float into an integer).
    pub fn coerce(self, target: ValueType) -> Option<Value> {
        if self.value_type() == target {
            return Some(self);
        }
        match (self, target) {
            (Value::Int(v), ValueType::Float) => Some(Value::Float(v as f64)),
            (Value::Int(v), ValueType::Bool) => Some(Value::Bool(v != 0)),
            (Value::Float(v), ValueType::Int) => {
                if v.fract() == 0.0 && v.is_finite() {
                    Some(Value::Int(v as i64))
                } else {
                    None
                }
            }
            (Value::Float(v), ValueType::Bool) => Some(Value::Bool(v != 0.0)),
            (Value::Bool(v), ValueType::Int) => Some(Value::Int(i64::from(v))),
            (Value::Bool(v), ValueType::Float) => Some(Value::Float(if v { 1.0 } else { 0.0 })),
            (Value::Str(s), ty) => Value::parse(&s, ty),
            (v, ValueType::Str) => Some(Value::Str(v.to_string())),
            _ => None,
        }
    }

    /// Parse a text token as a value of the given type
    pub fn parse(token: &str, ty: ValueType) -> Option<Value> {
        let token = token.trim();
        match ty {
            ValueType::Int => token
                .parse::<i64>()
                .ok()
                .or_else(|| {
                    // STAR writers sometimes emit integral columns as floats
                    token
                        .parse::<f64>()
                        .ok()
                        .filter(|v| v.fract() == 0.0 && v.is_finite())
                        .map(|v| v as i64)
                })
                .map(Value::Int),
            ValueType::Float => token.parse::<f64>().ok().map(Value::Float),
            ValueType::Bool => match token.to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => Some(Value::Bool(true)),
                "0" | "false" | "no" => Some(Value::Bool(false)),
                _ => None,
            },
            ValueType::Str => Some(Value::Str(token.to_string())),
        }
    }

    /// Numeric view of the value
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            Value::Bool(v) => Some(if *v { 1.0 } else { 0.0 }),
            Value::Str(s) => s.trim().parse().ok(),
        }
    }

    /// Integer view of the value
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            Value::Float(v) if v.fract() == 0.0 => Some(*v as i64),
            Value::Bool(v) => Some(i64::from(*v)),
            Value::Str(s) => s.trim().parse().ok(),
            Value::Float(_) => None,
        }
    }

    /// Boolean view of the value
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            Value::Int(v) => Some(*v != 0),
            Value::Float(v) => Some(*v != 0.0),
            Value::Str(s) => match Value::parse(s, ValueType::Bool) {
                Some(Value::Bool(b)) => Some(b),
                _ => None,
            },
        }
    }

    /// String view of the value, only for string values
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{:.6}", v),
            Value::Bool(v) => f.write_str(if *v { "1" } else { "0" }),
            Value::Str(s) => f.write_str(s),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}
