use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use log::debug;

use super::{Row, Table, TableError};
use crate::schema::{Label, Value};

/// All blocks parsed from one STAR file
#[derive(Debug, Clone, Default)]
pub struct StarFile {
    path: String,
    version_tag: Option<u32>,
    blocks: Vec<Table>,
}

impl StarFile {
    /// File (or stream name) the blocks were read from
    pub fn path(&self) -> &str {
        &self.path
    }

    /// First `# version <n>` tag seen in the file
    pub fn version_tag(&self) -> Option<u32> {
        self.version_tag
    }

    /// Blocks in file order
    pub fn blocks(&self) -> &[Table] {
        &self.blocks
    }

    /// Names of the blocks in file order
    pub fn block_names(&self) -> Vec<&str> {
        self.blocks.iter().map(|b| b.name()).collect()
    }

    /// Find a block by name
    pub fn block(&self, name: &str) -> Option<&Table> {
        self.blocks.iter().find(|b| b.name() == name)
    }

    /// Name of the per-particle block: `particles` when present, otherwise
    /// the first block that is not `optics`
    pub fn particle_block(&self) -> Option<&str> {
        self.block("particles")
            .or_else(|| self.blocks.iter().find(|b| b.name() != "optics"))
            .map(|b| b.name())
    }

    /// Remove and return a block by name
    pub fn take_block(&mut self, name: &str) -> Result<Table, TableError> {
        match self.blocks.iter().position(|b| b.name() == name) {
            Some(i) => Ok(self.blocks.remove(i)),
            None => Err(TableError::BlockNotFoundError {
                block: name.to_string(),
                path: self.path.clone(),
                available: self.block_names().join(", "),
            }),
        }
    }
}

/// Read every block of a STAR file
pub fn read_star<P: AsRef<Path>>(path: P) -> Result<StarFile, TableError> {
    let path = path.as_ref();
    let file = File::open(path)?;
    parse_star(BufReader::new(file), &path.display().to_string())
}

/// Read one named block of a STAR file
pub fn read_table<P: AsRef<Path>>(path: P, block: &str) -> Result<Table, TableError> {
    let mut star = read_star(path)?;
    star.take_block(block)
}

struct BlockBuilder {
    name: String,
    in_loop: bool,
    columns: Vec<(String, Option<Label>)>,
    rows: Vec<Row>,
    pairs: Row,
}

impl BlockBuilder {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            in_loop: false,
            columns: Vec::new(),
            rows: Vec::new(),
            pairs: Row::new(),
        }
    }

    fn finish(self) -> Table {
        let unknown: Vec<&str> = self
            .columns
            .iter()
            .filter(|(_, label)| label.is_none())
            .map(|(key, _)| key.as_str())
            .collect();
        if !unknown.is_empty() {
            debug!("Block data_{}: skipped unknown columns {:?}", self.name, unknown);
        }

        let mut rows = self.rows;
        if !self.in_loop && !self.pairs.is_empty() {
            rows.push(self.pairs);
        }
        Table::with_rows(self.name, rows)
    }
}

/// Parse STAR content from any buffered reader
///
/// `path` is only used in error messages.
pub fn parse_star<R: BufRead>(reader: R, path: &str) -> Result<StarFile, TableError> {
    let parse_error = |line: usize, message: String| TableError::ParseError {
        path: path.to_string(),
        line,
        message,
    };

    let mut star = StarFile {
        path: path.to_string(),
        ..Default::default()
    };
    let mut current: Option<BlockBuilder> = None;

    for (index, line) in reader.lines().enumerate() {
        let line_no = index + 1;
        let line = line?;
        let trimmed = line.trim();

        if trimmed.is_empty() {
            continue;
        }

        if let Some(comment) = trimmed.strip_prefix('#') {
            if star.version_tag.is_none() {
                star.version_tag = parse_version_tag(comment);
            }
            continue;
        }

        if let Some(name) = trimmed.strip_prefix("data_") {
            if let Some(block) = current.take() {
                star.blocks.push(block.finish());
            }
            current = Some(BlockBuilder::new(name.trim()));
            continue;
        }

        let block = current
            .as_mut()
            .ok_or_else(|| parse_error(line_no, "content before the first data_ block".into()))?;

        if trimmed.starts_with("loop_") {
            if block.in_loop || !block.pairs.is_empty() {
                return Err(parse_error(
                    line_no,
                    format!("second loop_ in block data_{}", block.name),
                ));
            }
            block.in_loop = true;
            continue;
        }

        let tokens = tokenize(trimmed).map_err(|msg| parse_error(line_no, msg))?;

        if trimmed.starts_with('_') {
            let key = tokens[0].trim_start_matches('_').to_string();
            let label = Label::from_star_key(&key);

            if block.in_loop {
                if !block.rows.is_empty() {
                    return Err(parse_error(
                        line_no,
                        format!("column header _{} after data lines", key),
                    ));
                }
                block.columns.push((key, label));
            } else {
                // Key/value block: "_rlnKey value"
                if tokens.len() != 2 {
                    return Err(parse_error(
                        line_no,
                        format!("expected `_key value`, found {} tokens", tokens.len()),
                    ));
                }
                match label {
                    Some(label) => {
                        let value = parse_value(label, &tokens[1])
                            .map_err(|msg| parse_error(line_no, msg))?;
                        block.pairs.set(label, value);
                    }
                    None => block.columns.push((key, None)),
                }
            }
            continue;
        }

        if !block.in_loop {
            return Err(parse_error(
                line_no,
                format!("data line outside of loop_ in block data_{}", block.name),
            ));
        }

        if tokens.len() != block.columns.len() {
            return Err(parse_error(
                line_no,
                format!(
                    "expected {} columns, found {} values",
                    block.columns.len(),
                    tokens.len()
                ),
            ));
        }

        let mut row = Row::with_capacity(block.columns.len());
        for ((_, label), token) in block.columns.iter().zip(&tokens) {
            if let Some(label) = label {
                let value = parse_value(*label, token).map_err(|msg| parse_error(line_no, msg))?;
                row.set(*label, value);
            }
        }
        block.rows.push(row);
    }

    if let Some(block) = current.take() {
        star.blocks.push(block.finish());
    }

    Ok(star)
}

fn parse_value(label: Label, token: &str) -> Result<Value, String> {
    Value::parse(token, label.value_type()).ok_or_else(|| {
        format!(
            "invalid {} value '{}' for _{}",
            label.value_type(),
            token,
            label.star_key()
        )
    })
}

fn parse_version_tag(comment: &str) -> Option<u32> {
    let mut parts = comment.split_whitespace();
    match (parts.next(), parts.next()) {
        (Some("version"), Some(tag)) => tag.parse().ok(),
        _ => None,
    }
}

/// Split a line on whitespace, honouring single and double quotes
pub(crate) fn tokenize(line: &str) -> Result<Vec<String>, String> {
    let mut tokens = Vec::new();
    let mut chars = line.chars().peekable();

    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }
        if c == '#' && !tokens.is_empty() {
            // Trailing "#n" column index in loop headers
            break;
        }
        if c == '"' || c == '\'' {
            chars.next();
            let mut token = String::new();
            let mut closed = false;
            for next in chars.by_ref() {
                if next == c {
                    closed = true;
                    break;
                }
                token.push(next);
            }
            if !closed {
                return Err(format!("unterminated {} quote", c));
            }
            tokens.push(token);
        } else {
            let mut token = String::new();
            while let Some(&next) = chars.peek() {
                if next.is_whitespace() {
                    break;
                }
                token.push(next);
                chars.next();
            }
            tokens.push(token);
        }
    }

    Ok(tokens)
}
