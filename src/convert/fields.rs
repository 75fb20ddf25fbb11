//! Engine field map: one record of a [`RecordArray`] becomes one [`Row`].
//!
//! | Engine field | Identifier | Conversion |
//! |--------------|------------|------------|
//! | `blob/path` + `blob/idx` | `imageName` | `%06d@path`, index + 1 |
//! | `blob/psize_A` | `imagePixelSize` | |
//! | `blob/shape` | `imageSize` | first dimension |
//! | `ctf/*` | voltage, Cs, defocus, ... | radians to degrees |
//! | `location/*` | `micrographName`, `coordinateX/Y` | fractions times micrograph shape |
//! | `<alignments>/pose` | `angleRot/Tilt/Psi` | rotation vector, or in-plane radians |
//! | `<alignments>/shift` | `shiftX/Y` | pixels |
//! | `<alignments>/class` | `classNumber` | + 1 |

use log::{debug, warn};
use nalgebra::Vector3;

use crate::geometry::{expmap, matrix_to_euler};
use crate::location::Location;
use crate::mapper::AlignmentKind;
use crate::records::{FormatVersion, RecordArray};
use crate::schema::Label;
use crate::table::Row;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Unit {
    Same,
    Degrees,
    OneBased,
}

impl Unit {
    fn apply(self, value: f64) -> f64 {
        match self {
            Unit::Same => value,
            Unit::Degrees => value.to_degrees(),
            Unit::OneBased => value + 1.0,
        }
    }
}

const SCALAR_FIELDS: &[(&str, Label, Unit)] = &[
    ("blob/psize_A", Label::ImagePixelSize, Unit::Same),
    ("ctf/accel_kv", Label::Voltage, Unit::Same),
    ("ctf/cs_mm", Label::SphericalAberration, Unit::Same),
    ("ctf/amp_contrast", Label::AmplitudeContrast, Unit::Same),
    ("ctf/df1_A", Label::DefocusU, Unit::Same),
    ("ctf/df2_A", Label::DefocusV, Unit::Same),
    ("ctf/df_angle_rad", Label::DefocusAngle, Unit::Degrees),
    ("ctf/phase_shift_rad", Label::PhaseShift, Unit::Degrees),
    ("ctf/bfactor", Label::CtfBfactor, Unit::Same),
    ("ctf/scale", Label::CtfScalefactor, Unit::Same),
    ("ctf/exp_group_id", Label::OpticsGroup, Unit::Same),
    ("pick_stats/ncc_score", Label::AutopickFigureOfMerit, Unit::Same),
];

const LEGACY_FIELDS: &[(&str, Label, Unit)] = &[
    ("ctf_params.akv", Label::Voltage, Unit::Same),
    ("ctf_params.cs", Label::SphericalAberration, Unit::Same),
    ("ctf_params.wgh", Label::AmplitudeContrast, Unit::Same),
    ("ctf_params.df1", Label::DefocusU, Unit::Same),
    ("ctf_params.df2", Label::DefocusV, Unit::Same),
    ("ctf_params.angast_deg", Label::DefocusAngle, Unit::Same),
    ("ctf_params.phase_shift", Label::PhaseShift, Unit::Degrees),
    ("ctf_params.psize", Label::ImagePixelSize, Unit::Same),
    ("split", Label::RandomSubset, Unit::OneBased),
];

const ALIGNMENT_FIELDS: &[(&str, Label, Unit)] = &[
    ("class", Label::ClassNumber, Unit::OneBased),
    ("class_posterior", Label::MaxValueProbDistribution, Unit::Same),
    ("split", Label::RandomSubset, Unit::OneBased),
];

const MULTI_CLASS_PREFIX: &str = "alignments_class_";

/// Where an array keeps its poses
#[derive(Debug, Clone, PartialEq)]
pub enum AlignmentSource {
    /// No pose fields
    None,
    /// One alignment group, e.g. `alignments3D/`
    Single {
        /// Field prefix including the trailing slash
        prefix: String,
        /// Whether `pose` is a 3D rotation vector
        three_d: bool,
    },
    /// Per-class groups `alignments_class_<k>/`; the best class wins
    MultiClass {
        /// `(k, prefix)` sorted by `k`
        prefixes: Vec<(usize, String)>,
        /// Whether `pose` is a 3D rotation vector
        three_d: bool,
    },
    /// v0 `alignments.model.r` / `alignments.model.t`
    Legacy,
}

impl AlignmentSource {
    /// Detect the pose layout of an array
    pub fn detect(array: &RecordArray) -> Self {
        let is_3d = |prefix: &str| {
            array
                .column(&format!("{}pose", prefix))
                .map_or(false, |c| c.width() == 3)
        };

        let mut classes: Vec<(usize, String)> = array
            .field_names()
            .iter()
            .filter_map(|name| {
                let rest = name.strip_prefix(MULTI_CLASS_PREFIX)?;
                let (k, _) = rest.split_once('/')?;
                let k = k.parse().ok()?;
                Some((k, format!("{}{}/", MULTI_CLASS_PREFIX, k)))
            })
            .collect();
        classes.sort();
        classes.dedup();
        if let Some((_, first)) = classes.first() {
            let three_d = is_3d(first);
            return AlignmentSource::MultiClass {
                prefixes: classes,
                three_d,
            };
        }

        for prefix in ["alignments3D/", "alignments2D/"] {
            if array.has_field(&format!("{}pose", prefix)) {
                return AlignmentSource::Single {
                    prefix: prefix.to_string(),
                    three_d: is_3d(prefix),
                };
            }
        }

        if array.version() == FormatVersion::LegacyCsv && array.has_field("alignments.model.r") {
            return AlignmentSource::Legacy;
        }
        AlignmentSource::None
    }

    /// How the mapper should read the resulting angles
    pub fn kind(&self) -> AlignmentKind {
        match self {
            AlignmentSource::None => AlignmentKind::None,
            AlignmentSource::Single { three_d: false, .. }
            | AlignmentSource::MultiClass { three_d: false, .. } => AlignmentKind::TwoD,
            _ => AlignmentKind::Projection,
        }
    }
}

/// Options applied while reading picking coordinates
#[derive(Debug, Clone, Copy, Default)]
pub struct CoordinateFlips {
    /// Exchange X and Y
    pub swap_xy: bool,
    /// Mirror X within the micrograph width
    pub invert_x: bool,
    /// Mirror Y within the micrograph height
    pub invert_y: bool,
}

/// Converts the records of one array into rows
pub struct RecordMapper<'a> {
    array: &'a RecordArray,
    alignment: AlignmentSource,
    flips: CoordinateFlips,
}

impl<'a> RecordMapper<'a> {
    /// Prepare a mapper, detecting the pose layout
    pub fn new(array: &'a RecordArray, flips: CoordinateFlips) -> Self {
        let alignment = AlignmentSource::detect(array);
        debug!("Alignment layout of {}: {:?}", array.path().display(), alignment);
        Self {
            array,
            alignment,
            flips,
        }
    }

    /// Detected pose layout
    pub fn alignment(&self) -> &AlignmentSource {
        &self.alignment
    }

    /// Row for record `r`
    pub fn row(&self, r: usize) -> Row {
        let mut row = Row::with_capacity(24);
        row.set(Label::ItemId, r as i64 + 1);

        if let Some(location) = self.location(r) {
            row.set(Label::ImageName, location.to_string());
        }

        let table = if self.array.version() == FormatVersion::LegacyCsv {
            LEGACY_FIELDS
        } else {
            SCALAR_FIELDS
        };
        self.copy_scalars(&mut row, r, "", table);

        // UIDs beyond i64 have no place in an integer column
        if let Some(id) = self.array.i64("location/micrograph_uid", r) {
            row.set(Label::MicrographId, id);
        }

        if let Some(size) = self.array.f64_at("blob/shape", r, 0) {
            row.set(Label::ImageSize, size);
            row.set(Label::ImageDimensionality, 2_i64);
        }

        self.coordinate(&mut row, r);
        self.pose(&mut row, r);
        row
    }

    fn copy_scalars(&self, row: &mut Row, r: usize, prefix: &str, fields: &[(&str, Label, Unit)]) {
        for (field, label, unit) in fields {
            let name = format!("{}{}", prefix, field);
            if let Some(value) = self.array.f64(&name, r) {
                row.set(*label, unit.apply(value));
            }
        }
    }

    fn location(&self, r: usize) -> Option<Location> {
        let (path, index) = match self.array.str("blob/path", r) {
            Some(path) => (path, self.array.i64("blob/idx", r)),
            None => (
                self.array.str("data_input_relpath", r)?,
                self.array.i64("data_input_idx", r),
            ),
        };
        let path = path.trim_start_matches('>');
        match index {
            Some(idx) => match u32::try_from(idx).ok().and_then(|i| i.checked_add(1)) {
                Some(index) => Some(Location::new(index, path)),
                None => {
                    warn!(
                        "Record {} of {} has stack index {} out of range, image name left out",
                        r,
                        self.array.path().display(),
                        idx
                    );
                    None
                }
            },
            None => Some(Location::parse(path)),
        }
    }

    fn coordinate(&self, row: &mut Row, r: usize) {
        if let Some(name) = self.array.str("location/micrograph_path", r) {
            row.set(Label::MicrographName, name.trim_start_matches('>'));
        }

        let (Some(fx), Some(fy)) = (
            self.array.f64("location/center_x_frac", r),
            self.array.f64("location/center_y_frac", r),
        ) else {
            return;
        };
        let Some(shape) = self.array.vector("location/micrograph_shape", r) else {
            return;
        };
        let (mut height, mut width) = match shape.as_slice() {
            [h, w, ..] => (*h, *w),
            _ => return,
        };
        let (mut x, mut y) = (fx * width, fy * height);

        if self.flips.swap_xy {
            std::mem::swap(&mut x, &mut y);
            std::mem::swap(&mut width, &mut height);
        }
        if self.flips.invert_x {
            x = width - x;
        }
        if self.flips.invert_y {
            y = height - y;
        }
        row.set(Label::CoordinateX, x.round());
        row.set(Label::CoordinateY, y.round());
    }

    fn pose(&self, row: &mut Row, r: usize) {
        let (prefix, three_d) = match &self.alignment {
            AlignmentSource::None => return,
            AlignmentSource::Legacy => {
                if let Some(v) = self.array.vector("alignments.model.r", r) {
                    set_euler(row, &v);
                }
                if let Some(t) = self.array.vector("alignments.model.t", r) {
                    set_shifts(row, &t);
                }
                return;
            }
            AlignmentSource::Single { prefix, three_d } => (prefix.as_str(), *three_d),
            AlignmentSource::MultiClass { prefixes, three_d } => {
                match self.best_class(prefixes, r) {
                    Some(prefix) => (prefix, *three_d),
                    None => return,
                }
            }
        };

        if let Some(pose) = self.array.vector(&format!("{}pose", prefix), r) {
            if three_d {
                set_euler(row, &pose);
            } else if let Some(theta) = pose.first() {
                row.set(Label::AnglePsi, -theta.to_degrees());
            }
        }
        if let Some(shift) = self.array.vector(&format!("{}shift", prefix), r) {
            set_shifts(row, &shift);
        }
        self.copy_scalars(row, r, prefix, ALIGNMENT_FIELDS);
    }

    fn best_class<'p>(&self, prefixes: &'p [(usize, String)], r: usize) -> Option<&'p str> {
        prefixes
            .iter()
            .filter_map(|(_, prefix)| {
                self.array
                    .f64(&format!("{}class_posterior", prefix), r)
                    .map(|p| (p, prefix.as_str()))
            })
            .fold(None, |best: Option<(f64, &'p str)>, (p, prefix)| match best {
                Some((b, _)) if b >= p => best,
                _ => Some((p, prefix)),
            })
            .map(|(_, prefix)| prefix)
    }
}

fn set_euler(row: &mut Row, pose: &[f64]) {
    if pose.len() < 3 {
        return;
    }
    let [rot, tilt, psi] = matrix_to_euler(&expmap(&Vector3::new(pose[0], pose[1], pose[2])));
    row.set(Label::AngleRot, rot);
    row.set(Label::AngleTilt, tilt);
    row.set(Label::AnglePsi, psi);
}

fn set_shifts(row: &mut Row, shift: &[f64]) {
    if let [x, y, ..] = shift {
        row.set(Label::ShiftX, *x);
        row.set(Label::ShiftY, *y);
    }
}
