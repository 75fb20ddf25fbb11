use super::*;
use crate::geometry::{euler_to_matrix, expmap};
use crate::records::{Column, ColumnData, FormatVersion, RecordArray};
use nalgebra::{Matrix3, Vector3};
use std::fs;

fn array(columns: Vec<Column>) -> RecordArray {
    RecordArray::from_columns("J9_particles.cs", FormatVersion::Npy(1), columns).unwrap()
}

fn strings(name: &str, values: &[&str]) -> Column {
    Column::strings(name, values.iter().map(|s| s.to_string()).collect())
}

fn vectors(name: &str, width: usize, values: Vec<f64>) -> Column {
    Column::new(name, "<f4", width, ColumnData::Float(values))
}

fn assert_close(a: f64, b: f64) {
    assert!((a - b).abs() < 1e-6, "{} != {}", a, b);
}

#[test]
fn test_row_from_2d_record() {
    let records = array(vec![
        strings("blob/path", &["J3/stack.mrcs"]),
        Column::new("blob/idx", "<u4", 1, ColumnData::UInt(vec![4])),
        Column::floats("blob/psize_A", vec![1.1]),
        Column::floats("ctf/df_angle_rad", vec![std::f64::consts::FRAC_PI_2]),
        Column::floats("alignments2D/pose", vec![0.1]),
        vectors("alignments2D/shift", 2, vec![1.5, -2.0]),
        Column::new("alignments2D/class", "<u4", 1, ColumnData::UInt(vec![2])),
    ]);
    let mapper = RecordMapper::new(&records, CoordinateFlips::default());
    assert_eq!(mapper.alignment().kind(), AlignmentKind::TwoD);

    let row = mapper.row(0);
    assert_eq!(row.get_str(Label::ImageName), Some("000005@J3/stack.mrcs"));
    assert_eq!(row.get_i64(Label::ItemId), Some(1));
    assert_close(row.get_f64(Label::AnglePsi).unwrap(), -0.1_f64.to_degrees());
    assert_close(row.get_f64(Label::DefocusAngle).unwrap(), 90.0);
    assert_eq!(row.get_f64(Label::ShiftX), Some(1.5));
    assert_eq!(row.get_f64(Label::ShiftY), Some(-2.0));
    assert_eq!(row.get_i64(Label::ClassNumber), Some(3));
    assert!(!row.has(Label::AngleRot));
}

#[test]
fn test_location_without_index_is_parsed() {
    let records = array(vec![strings("blob/path", &[">000001@stack.mrcs"])]);
    let row = RecordMapper::new(&records, CoordinateFlips::default()).row(0);
    assert_eq!(row.get_str(Label::ImageName), Some("000001@stack.mrcs"));
}

#[test]
fn test_out_of_range_stack_index_is_skipped() {
    let records = array(vec![
        strings("blob/path", &["a.mrcs", "b.mrcs", "c.mrcs", "d.mrcs"]),
        Column::new("blob/idx", "<i8", 1, ColumnData::Int(vec![-1, 4294967295, 4294967296, 7])),
    ]);
    let mapper = RecordMapper::new(&records, CoordinateFlips::default());
    for r in 0..3 {
        let row = mapper.row(r);
        assert!(!row.has(Label::ImageName), "{:?}", row.get_str(Label::ImageName));
        assert_eq!(row.get_i64(Label::ItemId), Some(r as i64 + 1));
    }
    assert_eq!(mapper.row(3).get_str(Label::ImageName), Some("000008@d.mrcs"));
}

#[test]
fn test_3d_pose_matches_rotation_vector() {
    let pose = [0.3, -0.7, 1.2];
    let records = array(vec![
        strings("blob/path", &["a.mrcs"]),
        vectors("alignments3D/pose", 3, pose.to_vec()),
    ]);
    let mapper = RecordMapper::new(&records, CoordinateFlips::default());
    assert_eq!(mapper.alignment().kind(), AlignmentKind::Projection);

    let row = mapper.row(0);
    let from_angles = euler_to_matrix(
        row.get_f64(Label::AngleRot).unwrap(),
        row.get_f64(Label::AngleTilt).unwrap(),
        row.get_f64(Label::AnglePsi).unwrap(),
    );
    let expected = expmap(&Vector3::new(pose[0], pose[1], pose[2]));
    assert!((from_angles - expected).abs().max() < 1e-9);
}

#[test]
fn test_multi_class_takes_best_posterior() {
    let records = array(vec![
        strings("blob/path", &["a.mrcs", "a.mrcs"]),
        Column::floats("alignments_class_0/pose", vec![0.1, 0.2]),
        Column::floats("alignments_class_0/class_posterior", vec![0.9, 0.2]),
        Column::floats("alignments_class_1/pose", vec![0.3, 0.4]),
        Column::floats("alignments_class_1/class_posterior", vec![0.1, 0.8]),
        Column::floats("alignments_class_1/class", vec![1.0, 1.0]),
    ]);
    let mapper = RecordMapper::new(&records, CoordinateFlips::default());
    match mapper.alignment() {
        AlignmentSource::MultiClass { prefixes, three_d } => {
            assert_eq!(prefixes.len(), 2);
            assert!(!three_d);
        }
        other => panic!("unexpected layout {:?}", other),
    }

    let first = mapper.row(0);
    assert_close(first.get_f64(Label::AnglePsi).unwrap(), -0.1_f64.to_degrees());
    assert_eq!(first.get_f64(Label::MaxValueProbDistribution), Some(0.9));
    assert!(!first.has(Label::ClassNumber));

    let second = mapper.row(1);
    assert_close(second.get_f64(Label::AnglePsi).unwrap(), -0.4_f64.to_degrees());
    assert_eq!(second.get_i64(Label::ClassNumber), Some(2));
}

#[test]
fn test_coordinates_and_flips() {
    let records = array(vec![
        strings("blob/path", &["a.mrcs"]),
        strings("location/micrograph_path", &["J2/motioncorrected/mic.mrc"]),
        Column::floats("location/center_x_frac", vec![0.1]),
        Column::floats("location/center_y_frac", vec![0.5]),
        vectors("location/micrograph_shape", 2, vec![100.0, 200.0]),
    ]);

    let plain = RecordMapper::new(&records, CoordinateFlips::default()).row(0);
    assert_eq!(plain.get_f64(Label::CoordinateX), Some(20.0));
    assert_eq!(plain.get_f64(Label::CoordinateY), Some(50.0));
    assert_eq!(plain.get_str(Label::MicrographName), Some("J2/motioncorrected/mic.mrc"));

    let inverted = RecordMapper::new(
        &records,
        CoordinateFlips {
            invert_x: true,
            ..Default::default()
        },
    )
    .row(0);
    assert_eq!(inverted.get_f64(Label::CoordinateX), Some(180.0));

    let swapped = RecordMapper::new(
        &records,
        CoordinateFlips {
            swap_xy: true,
            invert_y: true,
            ..Default::default()
        },
    )
    .row(0);
    assert_eq!(swapped.get_f64(Label::CoordinateX), Some(50.0));
    assert_eq!(swapped.get_f64(Label::CoordinateY), Some(180.0));
}

fn particle(class: i64, phic: f64) -> Row {
    let mut row = Row::new();
    row.set(Label::ImageName, "000001@a.mrcs");
    row.set(Label::ClassNumber, class);
    row.set(Label::MaxValueProbDistribution, phic);
    row
}

#[test]
fn test_filter_rows() {
    let rows = vec![particle(1, 0.95), particle(2, 0.99), particle(1, 0.5)];

    let (kept, removed) = filter_rows(rows.clone(), &[1], None);
    assert_eq!((kept.len(), removed), (2, 1));

    let (kept, removed) = filter_rows(rows.clone(), &[], Some(0.9));
    assert_eq!((kept.len(), removed), (2, 1));

    let (kept, removed) = filter_rows(rows, &[1], Some(0.9));
    assert_eq!((kept.len(), removed), (1, 2));
    assert_eq!(kept[0].get_f64(Label::MaxValueProbDistribution), Some(0.95));
}

#[test]
fn test_parse_transform() {
    let (r, t) = parse_transform("[[1,0,0,1],[0,1,0,2],[0,0,1,3]]").unwrap();
    assert_eq!(r, Matrix3::identity());
    assert_eq!(t, Vector3::new(1.0, 2.0, 3.0));

    let (_, t) = parse_transform("[[0,-1,0],[1,0,0],[0,0,1]]").unwrap();
    assert_eq!(t, Vector3::zeros());

    assert!(matches!(
        parse_transform("[[1,0],[0,1]]"),
        Err(ConvertError::TransformError(_))
    ));
    assert!(matches!(parse_transform("[[1,0,0]"), Err(ConvertError::JsonError(_))));
}

#[test]
fn test_apply_transform() {
    let mut row = Row::new();
    row.set(Label::AngleRot, 0.0);
    row.set(Label::AngleTilt, 0.0);
    row.set(Label::AnglePsi, 0.0);
    row.set(Label::ShiftX, 5.0);
    row.set(Label::ShiftY, 5.0);
    let mut without_pose = particle(1, 1.0);
    without_pose.set(Label::ShiftX, 5.0);

    let mut rows = vec![row, without_pose];
    apply_transform(&mut rows, &Matrix3::identity(), &Vector3::new(1.0, 2.0, 3.0));

    assert_close(rows[0].get_f64(Label::ShiftX).unwrap(), 4.0);
    assert_close(rows[0].get_f64(Label::ShiftY).unwrap(), 3.0);
    assert_close(rows[0].get_f64(Label::AngleTilt).unwrap(), 0.0);
    assert_eq!(rows[1].get_f64(Label::ShiftX), Some(5.0));
}

#[test]
fn test_rescale_shifts() {
    let mut row = Row::new();
    row.set(Label::ImageSize, 128_i64);
    row.set(Label::ShiftX, 1.5);
    row.set(Label::ShiftY, -2.0);
    let mut rows = vec![row];
    rescale_shifts(&mut rows, 64.0).unwrap();
    assert_eq!(rows[0].get_f64(Label::ShiftX), Some(3.0));
    assert_eq!(rows[0].get_f64(Label::ShiftY), Some(-4.0));
}

#[test]
fn test_rescale_shifts_rejects_bad_box_size() {
    let mut row = Row::new();
    row.set(Label::ImageSize, 128_i64);
    row.set(Label::ShiftX, 1.5);
    let mut rows = vec![row];
    for boxsize in [0.0, -64.0, f64::NAN, f64::INFINITY] {
        assert!(matches!(
            rescale_shifts(&mut rows, boxsize),
            Err(ConvertError::InvalidBoxSize(_))
        ));
    }
    assert_eq!(rows[0].get_f64(Label::ShiftX), Some(1.5));
}

#[test]
fn test_rebase_job_path() {
    assert_eq!(
        rebase_job_path("/ssd/cache/instance_1/links/P3/J12/extract/a.mrc"),
        "J12/extract/a.mrc"
    );
    assert_eq!(rebase_job_path("J7/a.mrcs"), "J7/a.mrcs");
    assert_eq!(rebase_job_path("data/Jx/a.mrcs"), "data/Jx/a.mrcs");
    assert_eq!(rebase_job_path("stack.mrcs"), "stack.mrcs");
}

#[test]
fn test_path_rewrite() {
    let mut row = Row::new();
    row.set(Label::ImageName, "000003@/cache/P1/J3/extract/123_456_a.mrcs");
    row.set(Label::MicrographName, "/cache/P1/J2/mics/789_mic.mrc");
    let mut rows = vec![row];

    PathRewrite {
        cached: false,
        strip_uid: Some(Some(1)),
        micrograph_dir: Some(PathBuf::from("Micrographs")),
    }
    .apply(&mut rows);

    assert_eq!(rows[0].get_str(Label::ImageName), Some("000003@J3/extract/456_a.mrcs"));
    assert_eq!(rows[0].get_str(Label::MicrographName), Some("Micrographs/mic.mrc"));
}

#[test]
fn test_copy_micrograph_coordinates() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("picked.star"),
        "data_particles\n\nloop_\n_rlnImageName #1\n_rlnCoordinateX #2\n\
         _rlnCoordinateY #3\n_rlnMicrographName #4\n\
         000001@9999_a.mrcs 10.0 20.0 mic1.mrc\n000002@9999_a.mrcs 30.0 40.0 mic2.mrc\n",
    )
    .unwrap();

    let mut first = Row::new();
    first.set(Label::ImageName, "000002@J3/extract/a.mrcs");
    let mut second = Row::new();
    second.set(Label::ImageName, "000007@J3/extract/a.mrcs");
    let mut rows = vec![first, second];

    let pattern = dir.path().join("*.star");
    let updated = copy_micrograph_coordinates(&mut rows, &pattern.to_string_lossy()).unwrap();
    assert_eq!(updated, 1);
    assert_eq!(rows[0].get_f64(Label::CoordinateX), Some(30.0));
    assert_eq!(rows[0].get_str(Label::MicrographName), Some("mic2.mrc"));
    assert!(!rows[1].has(Label::CoordinateX));

    let missing = dir.path().join("none*.star");
    assert!(matches!(
        copy_micrograph_coordinates(&mut rows, &missing.to_string_lossy()),
        Err(ConvertError::NoCoordinateSource(_))
    ));
}

#[test]
fn test_config_from_toml() {
    let config: ConversionConfig = toml::from_str(
        r#"
            boxsize = 256
            classes = [1, 3]
            strip_uid = 0
            relion2 = true
        "#,
    )
    .unwrap();
    assert_eq!(config.boxsize, Some(256.0));
    assert_eq!(config.classes, vec![1, 3]);
    assert_eq!(config.schema_version(), SchemaVersion::Relion2);
    assert_eq!(config.path_rewrite().strip_uid, Some(None));
    assert!(toml::from_str::<ConversionConfig>("bogus = 1").is_err());
}

#[test]
fn test_convert_without_inputs() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("out.star");
    assert!(matches!(
        Converter::new().convert(&[], &output),
        Err(ConvertError::NoInput)
    ));
    assert!(!output.exists());
}
