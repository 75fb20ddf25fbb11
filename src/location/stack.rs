use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use log::{debug, info};

use super::{absolute, LocationError};

/// Extensions whose content is already a valid image stack under either name
const RENAMEABLE: &[&str] = &["mrc", "mrcs"];

/// Re-encodes an image stack into another file format
pub trait StackConverter {
    /// Write `source` re-encoded as `target`
    fn convert(&self, source: &Path, target: &Path) -> Result<(), LocationError>;
}

/// Runs an external program as `<program> [args...] <source> <target>`
#[derive(Debug, Clone)]
pub struct CommandConverter {
    pub(crate) program: String,
    pub(crate) args: Vec<String>,
}

impl CommandConverter {
    /// Converter invoking `program` with `args` before the two paths
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Split a command line such as `"e2proc2d.py --verbose"` on whitespace
    pub fn from_command_line(command: &str) -> Option<Self> {
        let mut parts = command.split_whitespace().map(str::to_string);
        let program = parts.next()?;
        Some(Self::new(program, parts.collect()))
    }
}

impl StackConverter for CommandConverter {
    fn convert(&self, source: &Path, target: &Path) -> Result<(), LocationError> {
        debug!(
            "Running {} {} {} {}",
            self.program,
            self.args.join(" "),
            source.display(),
            target.display()
        );
        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(source)
            .arg(target)
            .output()
            .map_err(|e| LocationError::ConversionError {
                source_path: source.to_path_buf(),
                message: format!("could not run {}: {}", self.program, e),
            })?;
        if !output.status.success() {
            return Err(LocationError::ConversionError {
                source_path: source.to_path_buf(),
                message: format!(
                    "{} exited with {}: {}",
                    self.program,
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            });
        }
        Ok(())
    }
}

fn extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase()
}

/// Make the given stacks available under `output_dir` with extension `target_ext`.
///
/// When every source already has the target extension and they share one
/// directory, that directory is linked as a whole. Otherwise each file is
/// linked under a renamed extension when that does not change its content, or
/// re-encoded through `converter`. Names already taken in the output directory
/// get a `_NNN` suffix. Returns the new path of every source.
pub fn materialize_stacks(
    sources: &[PathBuf],
    output_dir: &Path,
    target_ext: &str,
    converter: &dyn StackConverter,
) -> Result<HashMap<PathBuf, PathBuf>, LocationError> {
    let target_ext = target_ext.trim_start_matches('.').to_ascii_lowercase();
    let mut mapping = HashMap::new();
    if sources.is_empty() {
        return Ok(mapping);
    }
    fs::create_dir_all(output_dir)?;

    let unique: Vec<&PathBuf> = {
        let mut seen = HashSet::new();
        sources.iter().filter(|s| seen.insert(*s)).collect()
    };

    let parents: HashSet<&Path> = unique.iter().filter_map(|s| s.parent()).collect();
    let all_native = unique.iter().all(|s| extension(s) == target_ext);

    if all_native && parents.len() == 1 {
        if let Some(source_dir) = parents.into_iter().next() {
            let dir_name = source_dir
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("stacks");
            let link = unique_path(output_dir, dir_name, None, &HashSet::new());
            link_dir(source_dir, &link)?;
            info!("Linked {} -> {}", link.display(), source_dir.display());
            for source in unique {
                if let Some(name) = source.file_name() {
                    mapping.insert(source.clone(), link.join(name));
                }
            }
            return Ok(mapping);
        }
    }

    let mut taken: HashSet<PathBuf> = HashSet::new();
    for source in unique {
        let stem = source
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("stack");
        let dest = unique_path(output_dir, stem, Some(&target_ext), &taken);
        taken.insert(dest.clone());

        let source_ext = extension(source);
        if source_ext == target_ext
            || (RENAMEABLE.contains(&source_ext.as_str()) && RENAMEABLE.contains(&target_ext.as_str()))
        {
            link_file(source, &dest)?;
            debug!("Linked {} -> {}", dest.display(), source.display());
        } else {
            converter.convert(source, &dest)?;
            debug!("Converted {} -> {}", source.display(), dest.display());
        }
        mapping.insert(source.clone(), dest);
    }

    info!(
        "Materialized {} stack(s) in {}",
        mapping.len(),
        output_dir.display()
    );
    Ok(mapping)
}

fn unique_path(
    dir: &Path,
    stem: &str,
    ext: Option<&str>,
    taken: &HashSet<PathBuf>,
) -> PathBuf {
    let build = |suffix: Option<usize>| {
        let base = match suffix {
            Some(n) => format!("{}_{:03}", stem, n),
            None => stem.to_string(),
        };
        match ext {
            Some(ext) => dir.join(format!("{}.{}", base, ext)),
            None => dir.join(base),
        }
    };

    let mut candidate = build(None);
    let mut n = 0;
    // symlink_metadata also sees dangling links
    while taken.contains(&candidate) || fs::symlink_metadata(&candidate).is_ok() {
        n += 1;
        candidate = build(Some(n));
    }
    candidate
}

#[cfg(unix)]
fn link_file(source: &Path, dest: &Path) -> Result<(), LocationError> {
    std::os::unix::fs::symlink(absolute(source)?, dest)?;
    Ok(())
}

#[cfg(not(unix))]
fn link_file(source: &Path, dest: &Path) -> Result<(), LocationError> {
    fs::copy(absolute(source)?, dest)?;
    Ok(())
}

#[cfg(unix)]
fn link_dir(source: &Path, dest: &Path) -> Result<(), LocationError> {
    std::os::unix::fs::symlink(absolute(source)?, dest)?;
    Ok(())
}

#[cfg(not(unix))]
fn link_dir(source: &Path, dest: &Path) -> Result<(), LocationError> {
    fs::create_dir_all(dest)?;
    for entry in fs::read_dir(source)? {
        let entry = entry?;
        if entry.path().is_file() {
            fs::copy(entry.path(), dest.join(entry.file_name()))?;
        }
    }
    Ok(())
}
