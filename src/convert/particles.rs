//! Table-level edits applied to converted particle rows.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use nalgebra::{Matrix3, Vector3};

use super::ConvertError;
use crate::geometry::{euler_to_matrix, matrix_to_euler};
use crate::location::{strip_uid, Location};
use crate::schema::Label;
use crate::table::{optics, read_star, Row};

/// Keep rows of the listed classes whose class posterior reaches `min_phic`.
///
/// Returns the kept rows and the number removed.
pub fn filter_rows(rows: Vec<Row>, classes: &[i64], min_phic: Option<f64>) -> (Vec<Row>, usize) {
    let total = rows.len();
    if min_phic.is_some() && !rows.iter().any(|r| r.has(Label::MaxValueProbDistribution)) {
        warn!("No class posteriors to apply the minimum posterior to");
    }

    let kept: Vec<Row> = rows
        .into_iter()
        .filter(|row| {
            classes.is_empty()
                || row
                    .get_i64(Label::ClassNumber)
                    .map_or(false, |c| classes.contains(&c))
        })
        .filter(|row| match (min_phic, row.get_f64(Label::MaxValueProbDistribution)) {
            (Some(min), Some(phic)) => phic >= min,
            _ => true,
        })
        .collect();

    let removed = total - kept.len();
    if removed > 0 {
        info!("Filtered out {} of {} particles", removed, total);
    }
    (kept, removed)
}

/// Parse a JSON 3×3 rotation or 3×4 rotation + translation
pub fn parse_transform(json: &str) -> Result<(Matrix3<f64>, Vector3<f64>), ConvertError> {
    let rows: Vec<Vec<f64>> = serde_json::from_str(json)?;
    if rows.len() != 3 || !rows.iter().all(|r| r.len() == 3 || r.len() == 4) {
        return Err(ConvertError::TransformError(format!(
            "expected a 3x3 or 3x4 matrix, got {} rows",
            rows.len()
        )));
    }
    if rows.iter().any(|r| r.len() != rows[0].len()) {
        return Err(ConvertError::TransformError("rows differ in length".into()));
    }

    let rotation = Matrix3::from_fn(|i, j| rows[i][j]);
    let translation = Vector3::from_fn(|i, _| rows[i].get(3).copied().unwrap_or(0.0));
    Ok((rotation, translation))
}

/// Compose every particle pose with `rotation` and move its origin by `translation`
pub fn apply_transform(rows: &mut [Row], rotation: &Matrix3<f64>, translation: &Vector3<f64>) {
    let mut skipped = 0;
    for row in rows.iter_mut() {
        if !row.has_all(&[Label::AngleRot, Label::AngleTilt, Label::AnglePsi]) {
            skipped += 1;
            continue;
        }
        let pose = euler_to_matrix(
            row.f64_or(Label::AngleRot, 0.0),
            row.f64_or(Label::AngleTilt, 0.0),
            row.f64_or(Label::AnglePsi, 0.0),
        ) * rotation;

        let [rot, tilt, psi] = matrix_to_euler(&pose);
        row.set(Label::AngleRot, rot);
        row.set(Label::AngleTilt, tilt);
        row.set(Label::AnglePsi, psi);

        let moved = pose * translation;
        row.set(Label::ShiftX, row.f64_or(Label::ShiftX, 0.0) - moved[0]);
        row.set(Label::ShiftY, row.f64_or(Label::ShiftY, 0.0) - moved[1]);
    }
    if skipped > 0 {
        warn!("{} particles have no 3D pose and were not transformed", skipped);
    }
}

/// Scale shifts from a `boxsize` refinement box to each particle's box
pub fn rescale_shifts(rows: &mut [Row], boxsize: f64) -> Result<(), ConvertError> {
    if !(boxsize.is_finite() && boxsize > 0.0) {
        return Err(ConvertError::InvalidBoxSize(boxsize));
    }
    let mut missing = 0;
    for row in rows.iter_mut() {
        let Some(size) = row.get_f64(Label::ImageSize) else {
            missing += 1;
            continue;
        };
        let factor = size / boxsize;
        for label in [Label::ShiftX, Label::ShiftY] {
            if let Some(shift) = row.get_f64(label) {
                row.set(label, shift * factor);
            }
        }
    }
    if missing > 0 {
        warn!("{} particles have no box size, shifts left unscaled", missing);
    }
    Ok(())
}

/// Path starting at the first `J<digits>` job directory, or `path` unchanged
pub fn rebase_job_path(path: &str) -> String {
    let parts: Vec<&str> = path.split('/').collect();
    let is_job = |p: &&str| {
        p.len() > 1 && p.starts_with('J') && p[1..].bytes().all(|b| b.is_ascii_digit())
    };
    match parts.iter().position(|p| is_job(p)) {
        Some(i) => parts[i..].join("/"),
        None => path.to_string(),
    }
}

/// How file references are rewritten
#[derive(Debug, Clone, Default)]
pub struct PathRewrite {
    /// Keep cache paths as they are
    pub cached: bool,
    /// Strip `<uid>_` prefixes from file names; `Some(None)` strips them all
    pub strip_uid: Option<Option<usize>>,
    /// New directory for every micrograph
    pub micrograph_dir: Option<PathBuf>,
}

impl PathRewrite {
    fn path(&self, path: &str) -> String {
        let path = if self.cached {
            path.to_string()
        } else {
            rebase_job_path(path)
        };
        match self.strip_uid {
            Some(count) => {
                let location = Location::whole_file(path.as_str());
                let name = strip_uid(location.file_name(), count);
                join(location.dir(), name)
            }
            None => path,
        }
    }

    /// Rewrite image and micrograph references of every row
    pub fn apply(&self, rows: &mut [Row]) {
        for row in rows.iter_mut() {
            if let Some(name) = row.get_str(Label::ImageName) {
                let location = Location::parse(name);
                let rewritten = location.with_path(self.path(&location.path));
                row.set(Label::ImageName, rewritten.to_string());
            }
            if let Some(name) = row.get_str(Label::MicrographName) {
                let mut rewritten = self.path(name);
                if let Some(dir) = &self.micrograph_dir {
                    let file = Location::whole_file(rewritten.as_str());
                    rewritten = join(dir, file.file_name());
                }
                row.set(Label::MicrographName, rewritten);
            }
        }
    }
}

fn join(dir: &Path, name: &str) -> String {
    if dir.as_os_str().is_empty() {
        name.to_string()
    } else {
        dir.join(name).to_string_lossy().into_owned()
    }
}

fn coordinate_key(image_name: &str) -> String {
    let location = Location::parse(image_name);
    format!("{}@{}", location.index, strip_uid(location.file_name(), None))
}

/// Take coordinates and micrograph names from the particles of other STAR
/// files matched by UID-stripped image name. Returns the number of rows updated.
pub fn copy_micrograph_coordinates(rows: &mut [Row], pattern: &str) -> Result<usize, ConvertError> {
    let mut sources: HashMap<String, (f64, f64, Option<String>)> = HashMap::new();
    let mut files = 0;

    for path in glob::glob(pattern)? {
        let path = path.map_err(|e| ConvertError::IoError(e.into_error()))?;
        let star = read_star(&path)?;
        let Some(block) = star.particle_block().map(str::to_string) else {
            warn!("{} holds no particle block", path.display());
            continue;
        };
        let (table, _) = optics::normalize(star, &block)?;
        files += 1;

        for row in table.rows() {
            let (Some(name), Some(x), Some(y)) = (
                row.get_str(Label::ImageName),
                row.get_f64(Label::CoordinateX),
                row.get_f64(Label::CoordinateY),
            ) else {
                continue;
            };
            let micrograph = row.get_str(Label::MicrographName).map(str::to_string);
            sources.insert(coordinate_key(name), (x, y, micrograph));
        }
    }

    if files == 0 {
        return Err(ConvertError::NoCoordinateSource(pattern.to_string()));
    }
    debug!("Read {} coordinates from {} file(s)", sources.len(), files);

    let mut updated = 0;
    for row in rows.iter_mut() {
        let Some(key) = row.get_str(Label::ImageName).map(coordinate_key) else {
            continue;
        };
        if let Some((x, y, micrograph)) = sources.get(&key) {
            row.set(Label::CoordinateX, *x);
            row.set(Label::CoordinateY, *y);
            if let Some(micrograph) = micrograph {
                row.set(Label::MicrographName, micrograph.as_str());
            }
            updated += 1;
        }
    }

    if updated < rows.len() {
        warn!(
            "{} of {} particles have no coordinates in {}",
            rows.len() - updated,
            rows.len(),
            pattern
        );
    }
    Ok(updated)
}
