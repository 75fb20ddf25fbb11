//! Field identifiers and their STAR column keys.

use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;

use super::value::ValueType;

macro_rules! labels {
    ($( $(#[$doc:meta])* $variant:ident => ($name:literal, $key:literal, $ty:ident) ),* $(,)?) => {
        /// Canonical identifier of one metadata column
        ///
        /// Each identifier has a stable canonical name (e.g. `defocusU`), the
        /// key used in STAR tables (e.g. `rlnDefocusU`) and a declared type.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum Label {
            $( $(#[$doc])* $variant ),*
        }

        impl Label {
            /// Every known identifier, in declaration order
            pub const ALL: &'static [Label] = &[$(Label::$variant),*];

            /// Canonical identifier name
            pub fn name(self) -> &'static str {
                match self {
                    $(Label::$variant => $name),*
                }
            }

            /// Column key in STAR tables (without the leading underscore)
            pub fn star_key(self) -> &'static str {
                match self {
                    $(Label::$variant => $key),*
                }
            }

            /// Declared storage type
            pub fn value_type(self) -> ValueType {
                match self {
                    $(Label::$variant => ValueType::$ty),*
                }
            }
        }
    };
}

labels! {
    // Image identity
    /// Enabled/selected flag
    Enabled => ("enabled", "rlnEnabled", Bool),
    /// Stable item identifier used for ordering
    ItemId => ("itemId", "rlnImageId", Int),
    /// `index@path` image location
    ImageName => ("imageName", "rlnImageName", Str),
    /// Location of the image before any re-extraction
    ImageOriginalName => ("imageOriginalName", "rlnImageOriginalName", Str),
    /// Box size in pixels
    ImageSize => ("imageSize", "rlnImageSize", Int),
    /// 2 for particles, 3 for volumes
    ImageDimensionality => ("imageDimensionality", "rlnImageDimensionality", Int),
    /// Pixel size in Angstrom
    ImagePixelSize => ("imagePixelSize", "rlnImagePixelSize", Float),

    // Micrograph / coordinates
    /// Micrograph file the particle was picked from
    MicrographName => ("micrographName", "rlnMicrographName", Str),
    /// Numeric micrograph identifier
    MicrographId => ("micrographId", "rlnMicrographId", Int),
    /// Movie the micrograph was computed from
    MicrographMovieName => ("micrographMovieName", "rlnMicrographMovieName", Str),
    /// Particle center X in micrograph pixels
    CoordinateX => ("coordinateX", "rlnCoordinateX", Float),
    /// Particle center Y in micrograph pixels
    CoordinateY => ("coordinateY", "rlnCoordinateY", Float),
    /// Particle center Z in tomogram pixels
    CoordinateZ => ("coordinateZ", "rlnCoordinateZ", Float),
    /// Autopicking figure of merit
    AutopickFigureOfMerit => ("autopickFigureOfMerit", "rlnAutopickFigureOfMerit", Float),
    /// Helical tube the segment belongs to
    HelicalTubeId => ("helicalTubeId", "rlnHelicalTubeID", Int),

    // Classification / refinement bookkeeping
    /// 1-based class number
    ClassNumber => ("classNumber", "rlnClassNumber", Int),
    /// Half-set assignment (1 or 2)
    RandomSubset => ("randomSubset", "rlnRandomSubset", Int),
    /// Posterior of the best class
    MaxValueProbDistribution => ("maxValueProbDistribution", "rlnMaxValueProbDistribution", Float),
    /// Log-likelihood contribution
    LogLikeliContribution => ("logLikeliContribution", "rlnLogLikeliContribution", Float),
    /// Number of significant orientations
    NrOfSignificantSamples => ("nrOfSignificantSamples", "rlnNrOfSignificantSamples", Int),
    /// Intensity normalization correction
    NormCorrection => ("normCorrection", "rlnNormCorrection", Float),
    /// Z-score from particle sorting
    ParticleSelectZScore => ("particleSelectZScore", "rlnParticleSelectZScore", Float),
    /// Movie frame number
    MovieFrameNumber => ("movieFrameNumber", "rlnMovieFrameNumber", Int),
    /// Scale/noise group number
    GroupNumber => ("groupNumber", "rlnGroupNumber", Int),
    /// Scale/noise group name
    GroupName => ("groupName", "rlnGroupName", Str),
    /// Optics group number
    OpticsGroup => ("opticsGroup", "rlnOpticsGroup", Int),
    /// Optics group name
    OpticsGroupName => ("opticsGroupName", "rlnOpticsGroupName", Str),

    // Acquisition
    /// Acceleration voltage in kV
    Voltage => ("voltage", "rlnVoltage", Float),
    /// Spherical aberration in mm
    SphericalAberration => ("sphericalAberration", "rlnSphericalAberration", Float),
    /// Amplitude contrast fraction
    AmplitudeContrast => ("amplitudeContrast", "rlnAmplitudeContrast", Float),
    /// Nominal magnification (legacy schemas)
    Magnification => ("magnification", "rlnMagnification", Float),
    /// Detector pixel size in micrometer (legacy schemas)
    DetectorPixelSize => ("detectorPixelSize", "rlnDetectorPixelSize", Float),

    // CTF
    /// Defocus along the major axis in Angstrom
    DefocusU => ("defocusU", "rlnDefocusU", Float),
    /// Defocus along the minor axis in Angstrom
    DefocusV => ("defocusV", "rlnDefocusV", Float),
    /// Astigmatism angle in degrees
    DefocusAngle => ("defocusAngle", "rlnDefocusAngle", Float),
    /// Phase shift in degrees
    PhaseShift => ("phaseShift", "rlnPhaseShift", Float),
    /// CTF B-factor
    CtfBfactor => ("ctfBfactor", "rlnCtfBfactor", Float),
    /// CTF scale factor
    CtfScalefactor => ("ctfScalefactor", "rlnCtfScalefactor", Float),
    /// CTF fit figure of merit
    CtfFigureOfMerit => ("ctfFigureOfMerit", "rlnCtfFigureOfMerit", Float),
    /// Maximum resolution of the CTF fit
    CtfMaxResolution => ("ctfMaxResolution", "rlnCtfMaxResolution", Float),
    /// Power spectrum image of the CTF fit
    CtfImage => ("ctfImage", "rlnCtfImage", Str),
    /// CTF validation score
    CtfValidationScore => ("ctfValidationScore", "rlnCtfValidationScore", Float),

    // Alignment
    /// Origin X in pixels
    ShiftX => ("shiftX", "rlnOriginX", Float),
    /// Origin Y in pixels
    ShiftY => ("shiftY", "rlnOriginY", Float),
    /// Origin Z in pixels
    ShiftZ => ("shiftZ", "rlnOriginZ", Float),
    /// Origin X in Angstrom
    ShiftXAngst => ("shiftXAngst", "rlnOriginXAngst", Float),
    /// Origin Y in Angstrom
    ShiftYAngst => ("shiftYAngst", "rlnOriginYAngst", Float),
    /// Origin Z in Angstrom
    ShiftZAngst => ("shiftZAngst", "rlnOriginZAngst", Float),
    /// First Euler angle (degrees)
    AngleRot => ("angleRot", "rlnAngleRot", Float),
    /// Second Euler angle (degrees)
    AngleTilt => ("angleTilt", "rlnAngleTilt", Float),
    /// Third Euler angle, in-plane (degrees)
    AnglePsi => ("anglePsi", "rlnAnglePsi", Float),
}

fn star_key_index() -> &'static HashMap<&'static str, Label> {
    static INDEX: OnceLock<HashMap<&'static str, Label>> = OnceLock::new();
    INDEX.get_or_init(|| Label::ALL.iter().map(|l| (l.star_key(), *l)).collect())
}

fn name_index() -> &'static HashMap<&'static str, Label> {
    static INDEX: OnceLock<HashMap<&'static str, Label>> = OnceLock::new();
    INDEX.get_or_init(|| Label::ALL.iter().map(|l| (l.name(), *l)).collect())
}

impl Label {
    /// Look up an identifier by STAR key, with or without the leading underscore
    pub fn from_star_key(key: &str) -> Option<Label> {
        star_key_index()
            .get(key.strip_prefix('_').unwrap_or(key))
            .copied()
    }

    /// Look up an identifier by canonical name
    pub fn from_name(name: &str) -> Option<Label> {
        name_index().get(name).copied()
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
