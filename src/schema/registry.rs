//! Attribute → field identifier dictionaries, grouped per entity.
//!
//! The mapper routes columns through these tables: a converter touches only
//! the identifiers its dictionary names, plus the "extra" identifiers that are
//! copied verbatim when present.

use super::labels::Label;

/// Attributes of an acquisition description
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AcquisitionAttr {
    /// Acceleration voltage (kV)
    Voltage,
    /// Spherical aberration (mm)
    SphericalAberration,
    /// Amplitude contrast
    AmplitudeContrast,
    /// Nominal magnification
    Magnification,
}

/// Attributes of a CTF model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CtfAttr {
    /// Defocus U
    DefocusU,
    /// Defocus V
    DefocusV,
    /// Astigmatism angle
    DefocusAngle,
    /// Power spectrum image file
    PsdFile,
    /// Micrograph the CTF was estimated on
    MicrographName,
}

/// Attributes of a picked coordinate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CoordinateAttr {
    /// X position
    X,
    /// Y position
    Y,
}

/// Attributes of an image (particle, class average, volume)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageAttr {
    /// Object identifier
    ObjectId,
    /// Pixel size
    SamplingRate,
    /// Class assignment
    ClassId,
    /// Source micrograph identifier
    MicrographId,
}

/// Acquisition dictionary
pub const ACQUISITION_DICT: &[(AcquisitionAttr, Label)] = &[
    (AcquisitionAttr::AmplitudeContrast, Label::AmplitudeContrast),
    (AcquisitionAttr::SphericalAberration, Label::SphericalAberration),
    (AcquisitionAttr::Voltage, Label::Voltage),
    (AcquisitionAttr::Magnification, Label::Magnification),
];

/// Required CTF dictionary; a row missing any of these has no CTF
pub const CTF_DICT: &[(CtfAttr, Label)] = &[
    (CtfAttr::DefocusU, Label::DefocusU),
    (CtfAttr::DefocusV, Label::DefocusV),
    (CtfAttr::DefocusAngle, Label::DefocusAngle),
];

/// Secondary CTF dictionary for power-spectrum locations
pub const CTF_PSD_DICT: &[(CtfAttr, Label)] = &[
    (CtfAttr::PsdFile, Label::CtfImage),
    (CtfAttr::MicrographName, Label::MicrographName),
];

/// Optional CTF identifiers copied through when present
pub const CTF_EXTRA_LABELS: &[Label] = &[
    Label::CtfFigureOfMerit,
    Label::CtfMaxResolution,
    Label::PhaseShift,
    Label::CtfBfactor,
    Label::CtfScalefactor,
    Label::CtfValidationScore,
    Label::DetectorPixelSize,
];

/// Required coordinate dictionary
pub const COORDINATE_DICT: &[(CoordinateAttr, Label)] = &[
    (CoordinateAttr::X, Label::CoordinateX),
    (CoordinateAttr::Y, Label::CoordinateY),
];

/// Optional coordinate identifiers copied through when present
pub const COORDINATE_EXTRA_LABELS: &[Label] = &[
    Label::CoordinateZ,
    Label::AutopickFigureOfMerit,
    Label::HelicalTubeId,
];

/// Image dictionary
pub const IMAGE_DICT: &[(ImageAttr, Label)] = &[
    (ImageAttr::ObjectId, Label::ItemId),
    (ImageAttr::SamplingRate, Label::ImagePixelSize),
    (ImageAttr::ClassId, Label::ClassNumber),
    (ImageAttr::MicrographId, Label::MicrographId),
];

/// Optional image identifiers copied through when present
pub const IMAGE_EXTRA_LABELS: &[Label] = &[
    Label::ImageOriginalName,
    Label::ImageSize,
    Label::ImageDimensionality,
    Label::MicrographName,
    Label::MicrographMovieName,
    Label::RandomSubset,
    Label::MaxValueProbDistribution,
    Label::LogLikeliContribution,
    Label::NrOfSignificantSamples,
    Label::NormCorrection,
    Label::ParticleSelectZScore,
    Label::MovieFrameNumber,
    Label::GroupNumber,
    Label::GroupName,
    Label::OpticsGroup,
    Label::HelicalTubeId,
];

/// Identifiers that make up a stored alignment
pub const ALIGNMENT_LABELS: &[Label] = &[
    Label::ShiftX,
    Label::ShiftY,
    Label::ShiftZ,
    Label::AngleRot,
    Label::AngleTilt,
    Label::AnglePsi,
];

/// Per-acquisition constants moved into the optics block
pub const OPTICS_LABELS: &[Label] = &[
    Label::Voltage,
    Label::SphericalAberration,
    Label::AmplitudeContrast,
    Label::ImagePixelSize,
    Label::ImageSize,
    Label::ImageDimensionality,
];

/// Dictionary labels as a plain list
pub fn dict_labels<A: Copy>(dict: &[(A, Label)]) -> Vec<Label> {
    dict.iter().map(|(_, label)| *label).collect()
}
