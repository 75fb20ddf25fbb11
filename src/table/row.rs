use crate::schema::{Label, Value};

/// One metadata record: an ordered mapping from field identifier to value
///
/// Both the cryoSPARC array adapter and the STAR reader produce rows, and the
/// mapper only ever talks to this type. Values are coerced to the type each
/// identifier declares when they are set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    entries: Vec<(Label, Value)>,
}

impl Row {
    /// Create an empty row
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty row with room for `capacity` fields
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    /// Number of fields set on this row
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no field is set
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn position(&self, label: Label) -> Option<usize> {
        self.entries.iter().position(|(l, _)| *l == label)
    }

    /// Value of a field, if present
    pub fn get(&self, label: Label) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(l, _)| *l == label)
            .map(|(_, v)| v)
    }

    /// Whether the field is present
    pub fn has(&self, label: Label) -> bool {
        self.position(label).is_some()
    }

    /// Whether every listed field is present
    pub fn has_all(&self, labels: &[Label]) -> bool {
        labels.iter().all(|l| self.has(*l))
    }

    /// Whether at least one listed field is present
    pub fn has_any(&self, labels: &[Label]) -> bool {
        labels.iter().any(|l| self.has(*l))
    }

    /// Set a field, replacing any previous value and keeping its position.
    ///
    /// The value is coerced to the declared type of `label`; a value that
    /// cannot be coerced is stored as given.
    pub fn set(&mut self, label: Label, value: impl Into<Value>) {
        let value = value.into();
        let value = match value.clone().coerce(label.value_type()) {
            Some(coerced) => coerced,
            None => {
                log::debug!(
                    "Keeping {} value {:?} for {} field {}",
                    value.value_type(),
                    value,
                    label.value_type(),
                    label
                );
                value
            }
        };
        match self.position(label) {
            Some(i) => self.entries[i].1 = value,
            None => self.entries.push((label, value)),
        }
    }

    /// Remove a field, returning its value
    pub fn remove(&mut self, label: Label) -> Option<Value> {
        self.position(label).map(|i| self.entries.remove(i).1)
    }

    /// Field identifiers in insertion order
    pub fn labels(&self) -> impl Iterator<Item = Label> + '_ {
        self.entries.iter().map(|(l, _)| *l)
    }

    /// Iterate over `(label, value)` pairs in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (Label, &Value)> {
        self.entries.iter().map(|(l, v)| (*l, v))
    }

    /// Numeric value of a field
    pub fn get_f64(&self, label: Label) -> Option<f64> {
        self.get(label).and_then(Value::as_f64)
    }

    /// Numeric value of a field, or `default` when absent
    pub fn f64_or(&self, label: Label, default: f64) -> f64 {
        self.get_f64(label).unwrap_or(default)
    }

    /// Integer value of a field
    pub fn get_i64(&self, label: Label) -> Option<i64> {
        self.get(label).and_then(Value::as_i64)
    }

    /// Boolean value of a field
    pub fn get_bool(&self, label: Label) -> Option<bool> {
        self.get(label).and_then(Value::as_bool)
    }

    /// String value of a field
    pub fn get_str(&self, label: Label) -> Option<&str> {
        self.get(label).and_then(Value::as_str)
    }
}

impl FromIterator<(Label, Value)> for Row {
    fn from_iter<T: IntoIterator<Item = (Label, Value)>>(iter: T) -> Self {
        let mut row = Row::new();
        for (label, value) in iter {
            row.set(label, value);
        }
        row
    }
}
