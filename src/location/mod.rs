//! # Image Locations
//!
//! An image inside a stack file is addressed as `index@path` (1-based index,
//! written zero-padded to six digits) or as a bare `path` when the file holds a
//! single image. [`resolve_location`] finds the file on disk and
//! [`materialize_stacks`] prepares stack files for the engine.
//!
//! ## Search roots
//!
//! | Root | Derived from |
//! |------|--------------|
//! | sibling | directory holding the metadata file |
//! | project | parent of the sibling joined with the locator's directory |

mod error;
mod stack;


pub use error::LocationError;
pub use stack::{materialize_stacks, CommandConverter, StackConverter};

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use log::debug;

/// Index value meaning "the whole file"
pub const NO_INDEX: u32 = 0;

/// One image within a stack file
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Location {
    /// 1-based index, or [`NO_INDEX`]
    pub index: u32,
    /// Relative or absolute file path
    pub path: String,
}

impl Location {
    /// Create a location from an index and a path
    pub fn new(index: u32, path: impl Into<String>) -> Self {
        Self {
            index,
            path: path.into(),
        }
    }

    /// Location of a single-image file
    pub fn whole_file(path: impl Into<String>) -> Self {
        Self::new(NO_INDEX, path)
    }

    /// Parse `index@path` or a bare path.
    ///
    /// A prefix that is not a number is kept as part of the path.
    pub fn parse(s: &str) -> Self {
        if let Some((index, path)) = s.split_once('@') {
            if let Ok(index) = index.trim().parse::<u32>() {
                return Self::new(index, path);
            }
        }
        Self::whole_file(s)
    }

    /// Whether an index is set
    pub fn has_index(&self) -> bool {
        self.index != NO_INDEX
    }

    /// File name part of the path
    pub fn file_name(&self) -> &str {
        Path::new(&self.path)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(&self.path)
    }

    /// Directory part of the path, empty for bare file names
    pub fn dir(&self) -> &Path {
        Path::new(&self.path).parent().unwrap_or_else(|| Path::new(""))
    }

    /// Same index, different file
    pub fn with_path(&self, path: impl Into<String>) -> Self {
        Self::new(self.index, path)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.has_index() {
            write!(f, "{:06}@{}", self.index, self.path)
        } else {
            f.write_str(&self.path)
        }
    }
}

impl From<&str> for Location {
    fn from(s: &str) -> Self {
        Location::parse(s)
    }
}

/// Roots searched for the stacks referenced by `metadata_file`
pub fn search_roots(metadata_file: &Path, location: &Location) -> Vec<PathBuf> {
    let sibling = match metadata_file.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let mut roots = vec![sibling.clone()];
    if let Some(parent) = sibling.parent() {
        let project = parent.join(location.dir());
        if project != sibling {
            roots.push(project);
        }
    }
    roots
}

/// Find the file a location points to.
///
/// Tries, in order: the path itself when absolute, `root/path` for every root,
/// `root/<file name>` for every root, and finally a file in a root whose name
/// is the file name behind a numeric `<uid>_` prefix.
pub fn resolve_location(location: &Location, roots: &[PathBuf]) -> Result<PathBuf, LocationError> {
    let path = Path::new(&location.path);

    if path.is_absolute() && path.is_file() {
        return Ok(path.to_path_buf());
    }

    for root in roots {
        let candidate = root.join(path);
        if candidate.is_file() {
            return absolute(&candidate);
        }
    }

    let name = location.file_name();
    for root in roots {
        let candidate = root.join(name);
        if candidate.is_file() {
            debug!("Resolved {} by file name in {}", location, root.display());
            return absolute(&candidate);
        }
    }

    for root in roots {
        if let Some(found) = find_uid_prefixed(root, name)? {
            debug!("Resolved {} to UID-prefixed {}", location, found.display());
            return absolute(&found);
        }
    }

    Err(LocationError::NotFoundError {
        location: location.to_string(),
        roots: roots.to_vec(),
    })
}

fn find_uid_prefixed(root: &Path, name: &str) -> Result<Option<PathBuf>, LocationError> {
    if !root.is_dir() {
        return Ok(None);
    }
    let mut matches: Vec<PathBuf> = Vec::new();
    for entry in fs::read_dir(root)? {
        let entry = entry?;
        let file_name = entry.file_name();
        let Some(file_name) = file_name.to_str() else {
            continue;
        };
        if strip_uid(file_name, None) == name && file_name != name && entry.path().is_file() {
            matches.push(entry.path());
        }
    }
    matches.sort();
    Ok(matches.into_iter().next())
}

/// Strip up to `count` leading `<digits>_` prefixes (all of them for `None`)
pub fn strip_uid(name: &str, count: Option<usize>) -> &str {
    let mut rest = name;
    let mut stripped = 0;
    while count.map_or(true, |n| stripped < n) {
        let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
        match rest[digits..].strip_prefix('_') {
            Some(tail) if digits > 0 && !tail.is_empty() => {
                rest = tail;
                stripped += 1;
            }
            _ => break,
        }
    }
    rest
}

/// `path` joined onto the working directory unless already absolute
pub(crate) fn absolute(path: &Path) -> Result<PathBuf, LocationError> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}
