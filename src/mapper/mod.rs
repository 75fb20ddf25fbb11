//! # Row Mapper
//!
//! Bidirectional translation between domain objects ([`Image`],
//! [`Coordinate`], [`CtfModel`], [`Acquisition`]) and table [`Row`]s.
//!
//! Every object exposes its attributes through [`Mappable`]; the attribute to
//! field identifier dictionaries live in [`crate::schema::registry`]. Fields an
//! object does not model are kept in its [`Extras`] and copied through when
//! they belong to the entity's extra-label list.
//!
//! ## Failure policy
//!
//! | Situation | Result |
//! |-----------|--------|
//! | optional sub-object absent (CTF, alignment, coordinate) | `None` |
//! | required coordinate fields missing | [`MappingError::MissingDataError`] from the `try_` variant |
//! | 3D non-projection alignment | [`MappingError::UnsupportedAlignmentError`] |

mod alignment;
mod error;
mod image;
mod objects;

#[cfg(test)]
mod tests;

pub use alignment::{alignment_to_row, row_to_alignment};
pub use error::MappingError;
pub use image::{
    acquisition_to_row, coordinate_to_row, ctf_model_to_row, image_to_row, particle_to_row,
    row_to_acquisition, row_to_coordinate, row_to_ctf_model, row_to_image, row_to_particle,
    try_row_to_coordinate, ImageReadOptions, ImageRowOptions, RowHook,
};
pub use objects::{Acquisition, AlignmentKind, Coordinate, CtfModel, Extras, Image};

use crate::schema::{Label, Value};
use crate::table::Row;

/// A domain object whose attributes can be read and written by name
pub trait Mappable {
    /// Attribute names understood by this object
    type Attr: Copy;

    /// Current value of an attribute, `None` when unset
    fn get_attr(&self, attr: Self::Attr) -> Option<Value>;

    /// Assign an attribute from a row value
    fn set_attr(&mut self, attr: Self::Attr, value: &Value);

    /// Pass-through fields
    fn extras(&self) -> &Extras;

    /// Mutable pass-through fields
    fn extras_mut(&mut self) -> &mut Extras;

    /// Selection state written to the `enabled` field
    fn enabled(&self) -> bool {
        true
    }

    /// Update the selection state
    fn set_enabled(&mut self, _enabled: bool) {}
}

/// Write `obj` into `row` through an attribute dictionary.
///
/// Always writes `enabled`; writes every attribute that is set; then copies
/// each extra identifier not covered by the dictionary from the object's
/// extras when present.
pub fn object_to_row<M: Mappable>(
    obj: &M,
    row: &mut Row,
    dict: &[(M::Attr, Label)],
    extra_labels: &[Label],
) {
    row.set(Label::Enabled, obj.enabled());

    for (attr, label) in dict {
        if let Some(value) = obj.get_attr(*attr) {
            row.set(*label, value);
        }
    }

    for label in extra_labels {
        if dict.iter().any(|(_, l)| l == label) {
            continue;
        }
        if let Some(value) = obj.extras().get(*label) {
            row.set(*label, value.clone());
        }
    }
}

/// Populate `obj` from `row`, the inverse of [`object_to_row`].
///
/// Attributes whose field is missing from the row are left untouched.
pub fn row_to_object<M: Mappable>(
    row: &Row,
    obj: &mut M,
    dict: &[(M::Attr, Label)],
    extra_labels: &[Label],
) {
    obj.set_enabled(row.get_i64(Label::Enabled).map_or(true, |v| v > 0));

    for (attr, label) in dict {
        if let Some(value) = row.get(*label) {
            obj.set_attr(*attr, value);
        }
    }

    for label in extra_labels {
        if dict.iter().any(|(_, l)| l == label) {
            continue;
        }
        if let Some(value) = row.get(*label) {
            obj.extras_mut().set(*label, value.clone());
        }
    }
}
