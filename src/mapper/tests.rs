use std::cell::Cell;

use nalgebra::{Matrix4, Rotation3, Vector3};
use proptest::prelude::*;

use super::*;
use crate::geometry::{matrix_from_geometry, Transform};
use crate::location::Location;
use crate::schema::{ACQUISITION_DICT, IMAGE_DICT, IMAGE_EXTRA_LABELS};

fn in_plane(theta_deg: f64, dx: f64, dy: f64) -> Transform {
    let rotation = Rotation3::from_axis_angle(&Vector3::z_axis(), theta_deg.to_radians());
    Transform::from_parts(rotation.matrix(), &Vector3::new(dx, dy, 0.0))
}

fn assert_transform_close(a: &Transform, b: &Transform, tol: f64) {
    for (x, y) in a.matrix().iter().zip(b.matrix().iter()) {
        assert!((x - y).abs() < tol, "\n{}\n!=\n{}", a.matrix(), b.matrix());
    }
}

fn sample_particle() -> Image {
    let mut image = Image::new(Location::new(7, "J3/extract/stack.mrcs"));
    image.object_id = Some(42);
    image.sampling_rate = Some(1.06);
    image.class_id = Some(3);
    image.ctf = Some(CtfModel::new(15000.0, 14000.0, 45.0));
    image.acquisition = Some(Acquisition {
        voltage: Some(300.0),
        spherical_aberration: Some(2.7),
        amplitude_contrast: Some(0.1),
        ..Default::default()
    });
    image.extras.set(Label::RandomSubset, Value::Int(2));
    image.extras.set(Label::GroupName, Value::from("group 1"));
    image
}

#[test]
fn test_object_to_row_writes_enabled_attrs_and_extras() {
    let mut acquisition = Acquisition {
        voltage: Some(200.0),
        ..Default::default()
    };
    acquisition.extras.set(Label::Magnification, Value::Float(1.0));
    let mut row = Row::new();
    object_to_row(&acquisition, &mut row, ACQUISITION_DICT, &[Label::Magnification]);

    assert_eq!(row.get_bool(Label::Enabled), Some(true));
    assert_eq!(row.get_f64(Label::Voltage), Some(200.0));
    assert!(!row.has(Label::SphericalAberration));
    // Covered by the dictionary, so the extra copy is ignored
    assert!(!row.has(Label::Magnification));
}

#[test]
fn test_row_to_object_leaves_missing_attributes_unset() {
    let mut row = Row::new();
    row.set(Label::Voltage, 300.0);
    row.set(Label::Enabled, false);

    let mut image = Image::default();
    image.sampling_rate = Some(2.0);
    row_to_object(&row, &mut image, IMAGE_DICT, IMAGE_EXTRA_LABELS);
    assert!(!image.enabled);
    assert_eq!(image.sampling_rate, Some(2.0));
    assert!(image.extras.is_empty());
}

#[test]
fn test_image_identifiers_round_trip() {
    let image = sample_particle();
    let mut row = Row::new();
    image_to_row(&image, &mut row, Label::ImageName, &ImageRowOptions::default()).unwrap();

    assert_eq!(row.get_str(Label::ImageName), Some("000007@J3/extract/stack.mrcs"));
    assert_eq!(row.get_i64(Label::ItemId), Some(42));

    let back = row_to_image(&row, Label::ImageName, &ImageReadOptions::default()).unwrap();
    assert_eq!(back.location, image.location);
    assert_eq!(back.object_id, Some(42));
    assert_eq!(back.sampling_rate, Some(1.06));
    assert_eq!(back.class_id, Some(3));
    assert!(back.enabled);
    assert_eq!(back.ctf, image.ctf);
    assert_eq!(back.acquisition, image.acquisition);
    assert_eq!(back.extras, image.extras);
}

#[test]
fn test_disabled_flag_round_trip() {
    let mut image = Image::new(Location::whole_file("vol.mrc"));
    image.enabled = false;
    let mut row = Row::new();
    image_to_row(&image, &mut row, Label::ImageName, &ImageRowOptions::default()).unwrap();
    assert_eq!(row.get_str(Label::ImageName), Some("vol.mrc"));
    let back = row_to_image(&row, Label::ImageName, &ImageReadOptions::default()).unwrap();
    assert!(!back.enabled);
}

#[test]
fn test_hooks_run_around_fields() {
    let pre_calls = Cell::new(0);
    let post_calls = Cell::new(0);
    let pre = |_: &Image, row: &mut Row| {
        pre_calls.set(pre_calls.get() + 1);
        row.set(Label::ImageName, "overwritten");
    };
    let post = |image: &Image, row: &mut Row| {
        post_calls.set(post_calls.get() + 1);
        row.set(Label::ImageName, image.location.with_path("moved.mrcs").to_string());
    };
    let options = ImageRowOptions::default().preprocess(&pre).postprocess(&post);

    let mut row = Row::new();
    image_to_row(&sample_particle(), &mut row, Label::ImageName, &options).unwrap();
    assert_eq!(pre_calls.get(), 1);
    assert_eq!(post_calls.get(), 1);
    assert_eq!(row.get_str(Label::ImageName), Some("000007@moved.mrcs"));
}

#[test]
fn test_particle_without_ctf_is_still_written() {
    let mut row = Row::new();
    row.set(Label::ImageName, "000001@stack.mrcs");
    row.set(Label::DefocusAngle, 10.0);
    row.set(Label::ClassNumber, 2);

    assert!(row_to_ctf_model(&row).is_none());
    let particle = row_to_particle(&row, &ImageReadOptions::default()).unwrap();
    assert!(particle.ctf.is_none());
    assert_eq!(particle.class_id, Some(2));
    assert!(particle.coordinate.is_none());
}

#[test]
fn test_missing_image_name() {
    let row = Row::new();
    let err = row_to_image(&row, Label::ImageName, &ImageReadOptions::default()).unwrap_err();
    assert!(matches!(err, MappingError::MissingDataError { entity: "image", .. }));
}

#[test]
fn test_ctf_standardize_on_read() {
    let mut row = Row::new();
    row.set(Label::DefocusU, 10000.0);
    row.set(Label::DefocusV, 12000.0);
    row.set(Label::DefocusAngle, 120.0);
    row.set(Label::PhaseShift, 90.0);
    row.set(Label::CtfImage, "psd/mic1.ctf");

    let ctf = row_to_ctf_model(&row).unwrap();
    assert_eq!(ctf.defocus_u, Some(12000.0));
    assert_eq!(ctf.defocus_v, Some(10000.0));
    assert_eq!(ctf.defocus_angle, Some(30.0));
    assert_eq!(ctf.phase_shift, Some(90.0));
    assert_eq!(ctf.psd_file.as_deref(), Some("psd/mic1.ctf"));
    assert!(!ctf.extras.contains(Label::PhaseShift));
}

#[test]
fn test_ctf_standardize_wraps_negative_angles() {
    let mut ctf = CtfModel::new(2.0, 1.0, -30.0);
    ctf.standardize();
    assert_eq!(ctf.defocus_angle, Some(150.0));
}

#[test]
fn test_ctf_to_row_refreshes_phase_shift() {
    let mut ctf = CtfModel::new(2.0, 1.0, 0.0);
    ctf.phase_shift = Some(45.0);
    ctf.micrograph_name = Some("mic.mrc".into());
    let mut row = Row::new();
    ctf_model_to_row(&ctf, &mut row);
    assert_eq!(row.get_f64(Label::PhaseShift), Some(45.0));
    assert_eq!(row.get_str(Label::MicrographName), Some("mic.mrc"));
}

#[test]
fn test_coordinate_requires_xy() {
    let mut row = Row::new();
    row.set(Label::CoordinateX, 10.0);
    match try_row_to_coordinate(&row) {
        Err(MappingError::MissingDataError { entity, labels }) => {
            assert_eq!(entity, "coordinate");
            assert_eq!(labels, vec!["rlnCoordinateY".to_string()]);
        }
        other => panic!("unexpected {:?}", other),
    }
    assert!(row_to_coordinate(&row).is_none());
}

#[test]
fn test_coordinate_fallback_micrograph_name() {
    let mut row = Row::new();
    row.set(Label::CoordinateX, 10.0);
    row.set(Label::CoordinateY, 20.0);
    row.set(Label::MicrographId, 17);
    row.set(Label::AutopickFigureOfMerit, 0.8);

    let coordinate = row_to_coordinate(&row).unwrap();
    assert_eq!(coordinate.micrograph_id, Some(17));
    assert_eq!(
        coordinate.micrograph_name.as_deref(),
        Some("fake_micrograph_000017")
    );
    assert_eq!(
        coordinate.extras.get(Label::AutopickFigureOfMerit),
        Some(&Value::Float(0.8))
    );
}

#[test]
fn test_coordinate_with_micrograph_id_round_trip() {
    let mut coordinate = Coordinate::new(10.0, 20.0);
    coordinate.micrograph_id = Some(17);
    let mut row = Row::new();
    coordinate_to_row(&coordinate, &mut row);
    assert_eq!(row.get_i64(Label::MicrographId), Some(17));
    assert_eq!(row.get_str(Label::MicrographName), Some("fake_micrograph_000017"));

    let back = row_to_coordinate(&row).unwrap();
    assert_eq!(back.x, Some(10.0));
    assert_eq!(back.y, Some(20.0));
    assert_eq!(back.micrograph_id, Some(17));
    assert_eq!(back.micrograph_name.as_deref(), Some("fake_micrograph_000017"));

    let mut named = Coordinate::new(1.0, 2.0);
    named.micrograph_id = Some(3);
    named.micrograph_name = Some("mics/a.mrc".to_string());
    let mut row = Row::new();
    coordinate_to_row(&named, &mut row);
    let back = row_to_coordinate(&row).unwrap();
    assert_eq!(back.micrograph_id, Some(3));
    assert_eq!(back.micrograph_name.as_deref(), Some("mics/a.mrc"));
}

#[test]
fn test_particle_to_row_with_micrograph_id() {
    let mut particle = Image::new(Location::new(1, "s.mrcs"));
    particle.micrograph_id = Some(5);
    particle.coordinate = Some(Coordinate::new(100.0, 200.0));
    let mut row = Row::new();
    particle_to_row(&particle, &mut row, &ImageRowOptions::default()).unwrap();
    assert_eq!(row.get_f64(Label::CoordinateX), Some(100.0));
    assert_eq!(row.get_str(Label::MicrographName), Some("fake_micrograph_000005"));
    assert_eq!(row.get_i64(Label::MicrographId), Some(5));
}

#[test]
fn test_2d_alignment_values() {
    let mut row = Row::new();
    let flipped = alignment_to_row(&in_plane(30.0, 1.0, -2.0), &mut row, AlignmentKind::TwoD).unwrap();
    assert!(!flipped);
    assert!((row.f64_or(Label::AnglePsi, f64::NAN) - 30.0).abs() < 1e-9);
    assert_eq!(row.get_f64(Label::ShiftX), Some(1.0));
    assert_eq!(row.get_f64(Label::ShiftY), Some(-2.0));
    assert!(!row.has(Label::AngleRot));
    assert!(!row.has(Label::ShiftZ));
}

#[test]
fn test_2d_flip_detected_not_corrected() {
    let mut m = *in_plane(0.0, 0.0, 0.0).matrix();
    m[(0, 0)] = -1.0;
    let mut row = Row::new();
    let flipped = alignment_to_row(&Transform::from_matrix(m), &mut row, AlignmentKind::TwoD).unwrap();
    assert!(flipped);
    assert!(row.has(Label::AnglePsi));
}

#[test]
fn test_3d_alignment_is_unsupported() {
    let mut row = Row::new();
    let err = alignment_to_row(&Transform::identity(), &mut row, AlignmentKind::ThreeD).unwrap_err();
    assert!(matches!(
        err,
        MappingError::UnsupportedAlignmentError {
            kind: AlignmentKind::ThreeD
        }
    ));
    assert!(row.is_empty());

    row.set(Label::AngleRot, 10.0);
    assert!(row_to_alignment(&row, AlignmentKind::ThreeD).is_err());
}

#[test]
fn test_absent_alignment_is_not_identity() {
    let mut row = Row::new();
    row.set(Label::ImageName, "1@a.mrcs");
    assert!(row_to_alignment(&row, AlignmentKind::Projection).unwrap().is_none());

    row.set(Label::AnglePsi, 0.0);
    let t = row_to_alignment(&row, AlignmentKind::Projection).unwrap().unwrap();
    assert_transform_close(&t, &Transform::identity(), 1e-12);
}

#[test]
fn test_singular_projection_is_an_error() {
    let mut row = Row::new();
    let t = Transform::from_matrix(Matrix4::zeros());
    assert!(matches!(
        alignment_to_row(&t, &mut row, AlignmentKind::Projection),
        Err(MappingError::InvalidTransform(_))
    ));
}

proptest! {
    #[test]
    fn test_2d_alignment_round_trip(
        theta in -180.0f64..180.0,
        dx in -50.0f64..50.0,
        dy in -50.0f64..50.0,
    ) {
        let transform = in_plane(theta, dx, dy);
        let mut row = Row::new();
        alignment_to_row(&transform, &mut row, AlignmentKind::TwoD).unwrap();
        let back = row_to_alignment(&row, AlignmentKind::TwoD).unwrap().unwrap();
        for (x, y) in transform.matrix().iter().zip(back.matrix().iter()) {
            prop_assert!((x - y).abs() < 1e-9);
        }
    }

    #[test]
    fn test_projection_alignment_round_trip(
        rot in -179.0f64..179.0,
        tilt in 1.0f64..179.0,
        psi in -179.0f64..179.0,
        dx in -20.0f64..20.0,
        dy in -20.0f64..20.0,
        dz in -20.0f64..20.0,
    ) {
        let transform = matrix_from_geometry(&Vector3::new(dx, dy, dz), &[rot, tilt, psi], true).unwrap();
        let mut row = Row::new();
        alignment_to_row(&transform, &mut row, AlignmentKind::Projection).unwrap();
        prop_assert!((row.f64_or(Label::ShiftZ, f64::NAN) - dz).abs() < 1e-9);
        let back = row_to_alignment(&row, AlignmentKind::Projection).unwrap().unwrap();
        for (x, y) in transform.matrix().iter().zip(back.matrix().iter()) {
            prop_assert!((x - y).abs() < 1e-9);
        }
    }

    #[test]
    fn test_extra_values_round_trip(
        subset in 1i64..3,
        norm in -1e6f64..1e6,
        group in "[a-z][a-z0-9_]{0,12}",
        enabled in any::<bool>(),
    ) {
        let mut image = Image::new(Location::new(1, "s.mrcs"));
        image.enabled = enabled;
        image.extras.set(Label::RandomSubset, Value::Int(subset));
        image.extras.set(Label::NormCorrection, Value::Float(norm));
        image.extras.set(Label::GroupName, Value::Str(group));

        let mut row = Row::new();
        image_to_row(&image, &mut row, Label::ImageName, &ImageRowOptions::default()).unwrap();
        let back = row_to_image(&row, Label::ImageName, &ImageReadOptions::default()).unwrap();
        prop_assert_eq!(back.enabled, enabled);
        prop_assert_eq!(back.extras, image.extras);
    }
}
