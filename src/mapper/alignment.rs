use log::warn;
use nalgebra::Vector3;

use super::{AlignmentKind, MappingError};
use crate::geometry::{geometry_from_matrix, matrix_from_geometry, Transform};
use crate::schema::{Label, ALIGNMENT_LABELS};
use crate::table::Row;

/// Store a transform in `row` as shifts and Euler angles.
///
/// Projection transforms are inverted before decomposition. A 2D alignment
/// folds rot and psi into one in-plane angle; a mirrored 2D transform is
/// reported through the return value and a warning but written unchanged.
/// Returns whether such a mirror was found.
pub fn alignment_to_row(
    transform: &Transform,
    row: &mut Row,
    kind: AlignmentKind,
) -> Result<bool, MappingError> {
    match kind {
        AlignmentKind::None => return Ok(false),
        AlignmentKind::ThreeD => return Err(MappingError::UnsupportedAlignmentError { kind }),
        AlignmentKind::TwoD | AlignmentKind::Projection => {}
    }

    let projection = kind == AlignmentKind::Projection;
    let (shifts, angles) = geometry_from_matrix(transform, projection)
        .ok_or_else(|| MappingError::InvalidTransform("singular projection matrix".into()))?;

    row.set(Label::ShiftX, shifts[0]);
    row.set(Label::ShiftY, shifts[1]);

    if kind == AlignmentKind::TwoD {
        row.set(Label::AnglePsi, -(angles[0] + angles[2]));
        let flipped = transform.is_flipped_2d();
        if flipped {
            // Mirrors have no rot/tilt/psi representation in 2D; left as is
            warn!("Mirrored 2D alignment written without the flip");
        }
        return Ok(flipped);
    }

    row.set(Label::ShiftZ, shifts[2]);
    row.set(Label::AngleRot, angles[0]);
    row.set(Label::AngleTilt, angles[1]);
    row.set(Label::AnglePsi, angles[2]);
    Ok(false)
}

/// Rebuild a transform from the shift and angle fields of `row`.
///
/// Returns `Ok(None)` when the row has no alignment field at all, which is
/// different from an identity transform. Missing individual fields read as 0.
pub fn row_to_alignment(row: &Row, kind: AlignmentKind) -> Result<Option<Transform>, MappingError> {
    match kind {
        AlignmentKind::None => return Ok(None),
        AlignmentKind::ThreeD => return Err(MappingError::UnsupportedAlignmentError { kind }),
        AlignmentKind::TwoD | AlignmentKind::Projection => {}
    }

    if !row.has_any(ALIGNMENT_LABELS) {
        return Ok(None);
    }

    let mut shifts = Vector3::new(row.f64_or(Label::ShiftX, 0.0), row.f64_or(Label::ShiftY, 0.0), 0.0);
    let mut angles = [0.0; 3];

    if kind == AlignmentKind::TwoD {
        angles[2] = -row.f64_or(Label::AnglePsi, 0.0);
    } else {
        angles = [
            row.f64_or(Label::AngleRot, 0.0),
            row.f64_or(Label::AngleTilt, 0.0),
            row.f64_or(Label::AnglePsi, 0.0),
        ];
        shifts[2] = row.f64_or(Label::ShiftZ, 0.0);
    }

    let projection = kind == AlignmentKind::Projection;
    matrix_from_geometry(&shifts, &angles, projection)
        .map(Some)
        .ok_or_else(|| MappingError::InvalidTransform("singular projection matrix".into()))
}
