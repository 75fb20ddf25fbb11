use log::debug;

use super::{
    alignment_to_row, object_to_row, row_to_alignment, row_to_object, Acquisition,
    AlignmentKind, Coordinate, CtfModel, Image, Mappable, MappingError,
};
use crate::location::Location;
use crate::schema::{
    dict_labels, Label, ACQUISITION_DICT, COORDINATE_DICT, COORDINATE_EXTRA_LABELS,
    CTF_DICT, CTF_EXTRA_LABELS, CTF_PSD_DICT, IMAGE_DICT, IMAGE_EXTRA_LABELS,
};
use crate::table::Row;

/// Caller-supplied hook run around [`image_to_row`]
pub type RowHook<'a> = &'a dyn Fn(&Image, &mut Row);

/// Options for writing an image into a row
#[derive(Clone, Copy)]
pub struct ImageRowOptions<'a> {
    /// How the image transform is stored
    pub alignment: AlignmentKind,
    /// Write CTF fields when the image has a CTF
    pub write_ctf: bool,
    /// Write acquisition fields when the image has them
    pub write_acquisition: bool,
    /// Runs before any field is written
    pub preprocess: Option<RowHook<'a>>,
    /// Runs after every field is written
    pub postprocess: Option<RowHook<'a>>,
}

impl Default for ImageRowOptions<'_> {
    fn default() -> Self {
        Self {
            alignment: AlignmentKind::None,
            write_ctf: true,
            write_acquisition: true,
            preprocess: None,
            postprocess: None,
        }
    }
}

impl<'a> ImageRowOptions<'a> {
    /// Default options with the given alignment kind
    pub fn new(alignment: AlignmentKind) -> Self {
        Self {
            alignment,
            ..Default::default()
        }
    }

    /// Hook run before the fields are written
    pub fn preprocess(mut self, hook: RowHook<'a>) -> Self {
        self.preprocess = Some(hook);
        self
    }

    /// Hook run after the fields are written
    pub fn postprocess(mut self, hook: RowHook<'a>) -> Self {
        self.postprocess = Some(hook);
        self
    }
}

/// Options for reading an image from a row
#[derive(Debug, Clone, Default)]
pub struct ImageReadOptions {
    /// How the transform is stored
    pub alignment: AlignmentKind,
    /// Skip CTF fields
    pub skip_ctf: bool,
    /// Skip acquisition fields
    pub skip_acquisition: bool,
    /// Magnification forced onto the acquisition
    pub magnification: Option<f64>,
    /// Identifiers kept in the image extras besides the standard ones
    pub extra_labels: Vec<Label>,
}

/// Write an image, its location and its sub-objects into `row`.
///
/// The hooks in `options` are always called when set: `preprocess` first,
/// `postprocess` last, so it can rewrite anything written here.
pub fn image_to_row(
    image: &Image,
    row: &mut Row,
    label: Label,
    options: &ImageRowOptions<'_>,
) -> Result<(), MappingError> {
    if let Some(hook) = options.preprocess {
        hook(image, row);
    }

    row.set(label, image.location.to_string());

    if options.write_ctf {
        if let Some(ctf) = &image.ctf {
            ctf_model_to_row(ctf, row);
        }
    }

    if options.alignment != AlignmentKind::None {
        match &image.transform {
            Some(transform) => {
                alignment_to_row(transform, row, options.alignment)?;
            }
            None => debug!("Image {} has no transform", image.location),
        }
    }

    if options.write_acquisition {
        if let Some(acquisition) = &image.acquisition {
            acquisition_to_row(acquisition, row);
        }
    }

    object_to_row(image, row, IMAGE_DICT, IMAGE_EXTRA_LABELS);

    if let Some(hook) = options.postprocess {
        hook(image, row);
    }
    Ok(())
}

/// Write a particle: coordinate, micrograph reference, then the image fields
pub fn particle_to_row(
    particle: &Image,
    row: &mut Row,
    options: &ImageRowOptions<'_>,
) -> Result<(), MappingError> {
    if let Some(coordinate) = &particle.coordinate {
        coordinate_to_row(coordinate, row);
    }
    if let Some(id) = particle.micrograph_id {
        row.set(Label::MicrographId, id);
        // Something to group CTF estimates by
        if !row.has(Label::MicrographName) {
            row.set(Label::MicrographName, fake_micrograph_name(id));
        }
    }
    image_to_row(particle, row, Label::ImageName, options)
}

fn fake_micrograph_name(id: i64) -> String {
    format!("fake_micrograph_{:06}", id)
}

/// Read an image from `row`; `label` holds the location.
///
/// Fails only when the location field or a requested alignment is unusable;
/// absent sub-objects are left as `None`.
pub fn row_to_image(
    row: &Row,
    label: Label,
    options: &ImageReadOptions,
) -> Result<Image, MappingError> {
    let location = row
        .get_str(label)
        .map(Location::parse)
        .ok_or_else(|| MappingError::MissingDataError {
            entity: "image",
            labels: vec![label.star_key().to_string()],
        })?;

    let mut image = Image::new(location);

    if !options.skip_ctf {
        image.ctf = row_to_ctf_model(row);
    }

    image.transform = row_to_alignment(row, options.alignment)?;

    if !options.skip_acquisition {
        image.acquisition = row_to_acquisition(row);
    }
    if let Some(magnification) = options.magnification {
        image
            .acquisition
            .get_or_insert_with(Acquisition::default)
            .magnification = Some(magnification);
    }

    let mut extras: Vec<Label> = IMAGE_EXTRA_LABELS.to_vec();
    extras.extend(options.extra_labels.iter().copied());
    row_to_object(row, &mut image, IMAGE_DICT, &extras);

    Ok(image)
}

/// Read a particle: the image plus its picking coordinate
pub fn row_to_particle(row: &Row, options: &ImageReadOptions) -> Result<Image, MappingError> {
    let mut particle = row_to_image(row, Label::ImageName, options)?;
    particle.coordinate = row_to_coordinate(row);
    Ok(particle)
}

/// Write coordinate fields and the micrograph reference
pub fn coordinate_to_row(coordinate: &Coordinate, row: &mut Row) {
    object_to_row(coordinate, row, COORDINATE_DICT, COORDINATE_EXTRA_LABELS);
    if let Some(id) = coordinate.micrograph_id {
        row.set(Label::MicrographId, id);
    }
    if let Some(name) = coordinate.micrograph_name.as_deref().filter(|n| !n.is_empty()) {
        row.set(Label::MicrographName, name);
    } else if let Some(id) = coordinate.micrograph_id {
        row.set(Label::MicrographName, fake_micrograph_name(id));
    }
}

/// Read a coordinate, failing when X or Y is missing
pub fn try_row_to_coordinate(row: &Row) -> Result<Coordinate, MappingError> {
    let required = dict_labels(COORDINATE_DICT);
    if !row.has_all(&required) {
        return Err(MappingError::MissingDataError {
            entity: "coordinate",
            labels: required
                .iter()
                .filter(|l| !row.has(**l))
                .map(|l| l.star_key().to_string())
                .collect(),
        });
    }

    let mut coordinate = Coordinate::default();
    row_to_object(row, &mut coordinate, COORDINATE_DICT, COORDINATE_EXTRA_LABELS);

    coordinate.micrograph_id = row.get_i64(Label::MicrographId);
    coordinate.micrograph_name = row
        .get_str(Label::MicrographName)
        .map(str::to_string)
        .or_else(|| coordinate.micrograph_id.map(fake_micrograph_name));
    Ok(coordinate)
}

/// Read a coordinate, `None` when the row has none
pub fn row_to_coordinate(row: &Row) -> Option<Coordinate> {
    match try_row_to_coordinate(row) {
        Ok(coordinate) => Some(coordinate),
        Err(e) => {
            debug!("No coordinate: {}", e);
            None
        }
    }
}

/// Write CTF fields, refreshing the phase shift and PSD references
pub fn ctf_model_to_row(ctf: &CtfModel, row: &mut Row) {
    if let Some(phase_shift) = ctf.phase_shift {
        row.set(Label::PhaseShift, phase_shift);
    }
    object_to_row(ctf, row, CTF_DICT, CTF_EXTRA_LABELS);
    for (attr, label) in CTF_PSD_DICT {
        if let Some(value) = ctf.get_attr(*attr) {
            row.set(*label, value);
        }
    }
}

/// Read a CTF model, `None` unless every required field is present
pub fn row_to_ctf_model(row: &Row) -> Option<CtfModel> {
    if !row.has_all(&dict_labels(CTF_DICT)) {
        return None;
    }
    let mut ctf = CtfModel::default();
    row_to_object(row, &mut ctf, CTF_DICT, CTF_EXTRA_LABELS);
    ctf.phase_shift = row.get_f64(Label::PhaseShift);
    // Extras hold a copy of the phase shift already modelled above
    ctf.extras.remove(Label::PhaseShift);
    ctf.standardize();
    row_to_object(row, &mut ctf, CTF_PSD_DICT, &[]);
    Some(ctf)
}

/// Write acquisition constants
pub fn acquisition_to_row(acquisition: &Acquisition, row: &mut Row) {
    object_to_row(acquisition, row, ACQUISITION_DICT, &[]);
}

/// Read acquisition constants, `None` unless voltage, Cs and amplitude contrast are present
pub fn row_to_acquisition(row: &Row) -> Option<Acquisition> {
    let required = [
        Label::Voltage,
        Label::SphericalAberration,
        Label::AmplitudeContrast,
    ];
    if !row.has_all(&required) {
        return None;
    }
    let mut acquisition = Acquisition::default();
    row_to_object(row, &mut acquisition, ACQUISITION_DICT, &[]);
    Some(acquisition)
}
