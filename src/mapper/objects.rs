use std::collections::BTreeMap;
use std::fmt;

use super::Mappable;
use crate::geometry::Transform;
use crate::location::Location;
use crate::schema::{AcquisitionAttr, CoordinateAttr, CtfAttr, ImageAttr, Label, Value};

/// Optional fields carried through verbatim, keyed by field identifier
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extras {
    values: BTreeMap<Label, Value>,
}

impl Extras {
    /// Value of an extra field
    pub fn get(&self, label: Label) -> Option<&Value> {
        self.values.get(&label)
    }

    /// Set an extra field
    pub fn set(&mut self, label: Label, value: Value) {
        self.values.insert(label, value);
    }

    /// Remove an extra field
    pub fn remove(&mut self, label: Label) -> Option<Value> {
        self.values.remove(&label)
    }

    /// Whether the field is set
    pub fn contains(&self, label: Label) -> bool {
        self.values.contains_key(&label)
    }

    /// Number of fields set
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no field is set
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate in identifier order
    pub fn iter(&self) -> impl Iterator<Item = (Label, &Value)> {
        self.values.iter().map(|(l, v)| (*l, v))
    }
}

/// How a pose transform is stored in a row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AlignmentKind {
    /// No alignment columns
    #[default]
    None,
    /// In-plane angle and two shifts
    TwoD,
    /// Direct 3D pose of a volume
    ThreeD,
    /// Projection direction with three shifts
    Projection,
}

impl fmt::Display for AlignmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AlignmentKind::None => "none",
            AlignmentKind::TwoD => "2D",
            AlignmentKind::ThreeD => "3D",
            AlignmentKind::Projection => "projection",
        };
        f.write_str(name)
    }
}

/// Microscope acquisition constants
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Acquisition {
    /// kV
    pub voltage: Option<f64>,
    /// mm
    pub spherical_aberration: Option<f64>,
    /// Fraction, usually 0.07 to 0.1
    pub amplitude_contrast: Option<f64>,
    /// Nominal magnification
    pub magnification: Option<f64>,
    /// Pass-through fields
    pub extras: Extras,
}

impl Mappable for Acquisition {
    type Attr = AcquisitionAttr;

    fn get_attr(&self, attr: AcquisitionAttr) -> Option<Value> {
        match attr {
            AcquisitionAttr::Voltage => self.voltage,
            AcquisitionAttr::SphericalAberration => self.spherical_aberration,
            AcquisitionAttr::AmplitudeContrast => self.amplitude_contrast,
            AcquisitionAttr::Magnification => self.magnification,
        }
        .map(Value::Float)
    }

    fn set_attr(&mut self, attr: AcquisitionAttr, value: &Value) {
        let value = value.as_f64();
        match attr {
            AcquisitionAttr::Voltage => self.voltage = value,
            AcquisitionAttr::SphericalAberration => self.spherical_aberration = value,
            AcquisitionAttr::AmplitudeContrast => self.amplitude_contrast = value,
            AcquisitionAttr::Magnification => self.magnification = value,
        }
    }

    fn extras(&self) -> &Extras {
        &self.extras
    }

    fn extras_mut(&mut self) -> &mut Extras {
        &mut self.extras
    }
}

/// Contrast transfer function estimate
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CtfModel {
    /// Angstrom
    pub defocus_u: Option<f64>,
    /// Angstrom
    pub defocus_v: Option<f64>,
    /// Degrees
    pub defocus_angle: Option<f64>,
    /// Degrees, for phase-plate data
    pub phase_shift: Option<f64>,
    /// Power spectrum image
    pub psd_file: Option<String>,
    /// Micrograph the estimate belongs to
    pub micrograph_name: Option<String>,
    /// Pass-through fields
    pub extras: Extras,
}

impl CtfModel {
    /// CTF with the three required parameters
    pub fn new(defocus_u: f64, defocus_v: f64, defocus_angle: f64) -> Self {
        Self {
            defocus_u: Some(defocus_u),
            defocus_v: Some(defocus_v),
            defocus_angle: Some(defocus_angle),
            ..Default::default()
        }
    }

    /// Bring defocus values into the canonical form: `U >= V`, angle in `[0, 180)`
    pub fn standardize(&mut self) {
        if let (Some(u), Some(v)) = (self.defocus_u, self.defocus_v) {
            if v > u {
                self.defocus_u = Some(v);
                self.defocus_v = Some(u);
                self.defocus_angle = self.defocus_angle.map(|a| a + 90.0);
            }
        }
        self.defocus_angle = self.defocus_angle.map(|a| a.rem_euclid(180.0));
    }
}

impl Mappable for CtfModel {
    type Attr = CtfAttr;

    fn get_attr(&self, attr: CtfAttr) -> Option<Value> {
        match attr {
            CtfAttr::DefocusU => self.defocus_u.map(Value::Float),
            CtfAttr::DefocusV => self.defocus_v.map(Value::Float),
            CtfAttr::DefocusAngle => self.defocus_angle.map(Value::Float),
            CtfAttr::PsdFile => self.psd_file.clone().map(Value::Str),
            CtfAttr::MicrographName => self.micrograph_name.clone().map(Value::Str),
        }
    }

    fn set_attr(&mut self, attr: CtfAttr, value: &Value) {
        match attr {
            CtfAttr::DefocusU => self.defocus_u = value.as_f64(),
            CtfAttr::DefocusV => self.defocus_v = value.as_f64(),
            CtfAttr::DefocusAngle => self.defocus_angle = value.as_f64(),
            CtfAttr::PsdFile => self.psd_file = value.as_str().map(str::to_string),
            CtfAttr::MicrographName => self.micrograph_name = value.as_str().map(str::to_string),
        }
    }

    fn extras(&self) -> &Extras {
        &self.extras
    }

    fn extras_mut(&mut self) -> &mut Extras {
        &mut self.extras
    }
}

/// Particle position on a micrograph
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Coordinate {
    /// Pixels
    pub x: Option<f64>,
    /// Pixels
    pub y: Option<f64>,
    /// Source micrograph id
    pub micrograph_id: Option<i64>,
    /// Source micrograph file
    pub micrograph_name: Option<String>,
    /// Pass-through fields
    pub extras: Extras,
}

impl Coordinate {
    /// Coordinate at `(x, y)`
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x: Some(x),
            y: Some(y),
            ..Default::default()
        }
    }
}

impl Mappable for Coordinate {
    type Attr = CoordinateAttr;

    fn get_attr(&self, attr: CoordinateAttr) -> Option<Value> {
        match attr {
            CoordinateAttr::X => self.x,
            CoordinateAttr::Y => self.y,
        }
        .map(Value::Float)
    }

    fn set_attr(&mut self, attr: CoordinateAttr, value: &Value) {
        match attr {
            CoordinateAttr::X => self.x = value.as_f64(),
            CoordinateAttr::Y => self.y = value.as_f64(),
        }
    }

    fn extras(&self) -> &Extras {
        &self.extras
    }

    fn extras_mut(&mut self) -> &mut Extras {
        &mut self.extras
    }
}

/// A particle, class average or volume with its metadata
#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    /// Stable object id
    pub object_id: Option<i64>,
    /// Selection flag
    pub enabled: bool,
    /// Where the pixels live
    pub location: Location,
    /// Pixel size in Angstrom
    pub sampling_rate: Option<f64>,
    /// 1-based class assignment
    pub class_id: Option<i64>,
    /// Source micrograph id
    pub micrograph_id: Option<i64>,
    /// Acquisition constants
    pub acquisition: Option<Acquisition>,
    /// CTF estimate
    pub ctf: Option<CtfModel>,
    /// Pose
    pub transform: Option<Transform>,
    /// Picking position
    pub coordinate: Option<Coordinate>,
    /// Pass-through fields
    pub extras: Extras,
}

impl Default for Image {
    fn default() -> Self {
        Self {
            object_id: None,
            enabled: true,
            location: Location::default(),
            sampling_rate: None,
            class_id: None,
            micrograph_id: None,
            acquisition: None,
            ctf: None,
            transform: None,
            coordinate: None,
            extras: Extras::default(),
        }
    }
}

impl Image {
    /// Enabled image at `location`
    pub fn new(location: Location) -> Self {
        Self {
            location,
            ..Default::default()
        }
    }
}

impl Mappable for Image {
    type Attr = ImageAttr;

    fn get_attr(&self, attr: ImageAttr) -> Option<Value> {
        match attr {
            ImageAttr::ObjectId => self.object_id.map(Value::Int),
            ImageAttr::SamplingRate => self.sampling_rate.map(Value::Float),
            ImageAttr::ClassId => self.class_id.map(Value::Int),
            ImageAttr::MicrographId => self.micrograph_id.map(Value::Int),
        }
    }

    fn set_attr(&mut self, attr: ImageAttr, value: &Value) {
        match attr {
            ImageAttr::ObjectId => self.object_id = value.as_i64(),
            ImageAttr::SamplingRate => self.sampling_rate = value.as_f64(),
            ImageAttr::ClassId => self.class_id = value.as_i64(),
            ImageAttr::MicrographId => self.micrograph_id = value.as_i64(),
        }
    }

    fn extras(&self) -> &Extras {
        &self.extras
    }

    fn extras_mut(&mut self) -> &mut Extras {
        &mut self.extras
    }

    fn enabled(&self) -> bool {
        self.enabled
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }
}
