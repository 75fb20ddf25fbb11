use super::*;
use std::io::Write;
use std::path::Path;

/// Wrap a header dict and raw records in a v1 `.npy` container
pub(crate) fn npy_bytes(header: &str, data: &[u8]) -> Vec<u8> {
    let mut header = header.to_string();
    // magic(6) + version(2) + len(2) + header + '\n' is padded to 64 bytes
    let unpadded = 10 + header.len() + 1;
    header.push_str(&" ".repeat((64 - unpadded % 64) % 64));
    header.push('\n');

    let mut out = Vec::new();
    out.extend_from_slice(NPY_MAGIC);
    out.extend_from_slice(&[1, 0]);
    out.extend_from_slice(&(header.len() as u16).to_le_bytes());
    out.extend_from_slice(header.as_bytes());
    out.extend_from_slice(data);
    out
}

fn fixed_bytes(s: &str, n: usize) -> Vec<u8> {
    let mut b = s.as_bytes().to_vec();
    b.resize(n, 0);
    b
}

fn particle_records() -> Vec<u8> {
    let mut data = Vec::new();
    for (uid, idx, pose, shift) in [(11u64, 0u32, 0.1f32, [1.5f32, -2.0]), (22, 1, -0.5, [0.0, 3.25])] {
        data.extend_from_slice(&uid.to_le_bytes());
        data.extend(fixed_bytes("J3/stack.mrcs", 16));
        data.extend_from_slice(&idx.to_le_bytes());
        data.extend_from_slice(&pose.to_le_bytes());
        for s in shift {
            data.extend_from_slice(&s.to_le_bytes());
        }
    }
    data
}

const PARTICLE_HEADER: &str = "{'descr': [('uid', '<u8'), ('blob/path', '|S16'), ('blob/idx', '<u4'), \
     ('alignments2D/pose', '<f4'), ('alignments2D/shift', '<f4', (2,))], \
     'fortran_order': False, 'shape': (2,), }";

#[test]
fn test_parse_structured_array() {
    let bytes = npy_bytes(PARTICLE_HEADER, &particle_records());
    let array = parse_npy(&bytes, Path::new("particles.cs")).unwrap();

    assert_eq!(array.len(), 2);
    assert_eq!(array.version(), FormatVersion::Npy(1));
    assert_eq!(
        array.field_names(),
        vec!["uid", "blob/path", "blob/idx", "alignments2D/pose", "alignments2D/shift"]
    );
    assert_eq!(array.column("uid").unwrap().type_name(), "<u8");
    assert_eq!(array.i64("uid", 1), Some(22));
    assert_eq!(array.str("blob/path", 0), Some("J3/stack.mrcs"));
    assert_eq!(array.i64("blob/idx", 1), Some(1));
    assert!((array.f64("alignments2D/pose", 0).unwrap() - 0.1).abs() < 1e-6);
    assert_eq!(array.vector("alignments2D/shift", 1), Some(vec![0.0, 3.25]));
    assert_eq!(array.column("alignments2D/shift").unwrap().width(), 2);
}

#[test]
fn test_big_endian_and_unicode_fields() {
    let header = "{'descr': [('n', '>i4'), ('name', '<U4'), ('pad', '|V3')], \
                  'fortran_order': False, 'shape': (1,), }";
    let mut data = Vec::new();
    data.extend_from_slice(&(-7i32).to_be_bytes());
    for c in ['a', 'b', '\0', '\0'] {
        data.extend_from_slice(&(c as u32).to_le_bytes());
    }
    data.extend_from_slice(&[0, 0, 0]);

    let array = parse_npy(&npy_bytes(header, &data), Path::new("x.cs")).unwrap();
    assert_eq!(array.i64("n", 0), Some(-7));
    assert_eq!(array.str("name", 0), Some("ab"));
    assert!(!array.has_field("pad"));
}

#[test]
fn test_rejects_unreadable_layouts() {
    let cases = [
        "{'descr': [('a', '<f4')], 'fortran_order': True, 'shape': (1,), }",
        "{'descr': [('a', '<f4')], 'fortran_order': False, 'shape': (1, 1), }",
        "{'descr': [('a', '|O')], 'fortran_order': False, 'shape': (1,), }",
        "{'descr': '<f4', 'fortran_order': False, 'shape': (1,), }",
    ];
    for header in cases {
        let err = parse_npy(&npy_bytes(header, &[0; 8]), Path::new("bad.cs")).unwrap_err();
        assert!(matches!(err, RecordError::FormatError { .. }), "{}", header);
    }
}

#[test]
fn test_truncated_data() {
    let records = particle_records();
    let bytes = npy_bytes(PARTICLE_HEADER, &records[..records.len() - 4]);
    let err = parse_npy(&bytes, Path::new("short.cs")).unwrap_err();
    assert!(err.to_string().contains("short.cs"));
}

#[test]
fn test_load_primary_detects_npy() {
    let mut file = tempfile::Builder::new().suffix(".cs").tempfile().unwrap();
    file.write_all(&npy_bytes(PARTICLE_HEADER, &particle_records())).unwrap();

    let array = load_primary(file.path()).unwrap();
    assert_eq!(array.len(), 2);
    assert_eq!(array.path(), file.path());
}

#[test]
fn test_load_primary_detects_legacy_csv() {
    let mut file = tempfile::Builder::new().suffix(".cs").tempfile().unwrap();
    writeln!(
        file,
        "uid,data_input_relpath,data_input_idx,ctf_params.df1,alignments.model.t.0,alignments.model.t.1"
    )
    .unwrap();
    writeln!(file, "5,stack.mrcs,0,12000.5,1.0,2.0").unwrap();
    writeln!(file, "6,stack.mrcs,1,13000,-1.0,0.5").unwrap();
    file.flush().unwrap();

    let array = load_primary(file.path()).unwrap();
    assert_eq!(array.version(), FormatVersion::LegacyCsv);
    assert_eq!(array.len(), 2);
    assert_eq!(array.i64("uid", 1), Some(6));
    assert_eq!(array.str("data_input_relpath", 0), Some("stack.mrcs"));
    assert_eq!(array.f64("ctf_params.df1", 1), Some(13000.0));
    assert_eq!(array.vector("alignments.model.t", 1), Some(vec![-1.0, 0.5]));
    assert!(!array.has_field("alignments.model.t.0"));
}

#[test]
fn test_load_primary_rejects_garbage() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(b"this is not a record array\n\x00\x01").unwrap();
    let err = load_primary(file.path()).unwrap_err();
    assert!(matches!(err, RecordError::FormatError { .. }));
}

fn array(path: &str, columns: Vec<Column>) -> RecordArray {
    RecordArray::from_columns(path, FormatVersion::Npy(1), columns).unwrap()
}

fn uids(values: &[u64]) -> Column {
    Column::new("uid", "<u8", 1, ColumnData::UInt(values.to_vec()))
}

#[test]
fn test_merge_by_uid() {
    let primary = array(
        "p.cs",
        vec![uids(&[1, 2, 3]), Column::floats("alignments2D/pose", vec![0.1, 0.2, 0.3])],
    );
    let passthrough = array(
        "pt.cs",
        vec![
            uids(&[3, 1]),
            Column::floats("ctf/df1_A", vec![30.0, 10.0]),
            Column::floats("alignments2D/pose", vec![9.0, 9.0]),
        ],
    );

    let merged = merge_passthrough(primary, vec![passthrough]).unwrap();
    assert_eq!(merged.len(), 2);
    assert_eq!(merged.i64("uid", 0), Some(1));
    assert_eq!(merged.f64("ctf/df1_A", 0), Some(10.0));
    assert_eq!(merged.f64("ctf/df1_A", 1), Some(30.0));
    // existing primary fields win
    assert_eq!(merged.f64("alignments2D/pose", 1), Some(0.3));
}

#[test]
fn test_merge_without_common_key() {
    let primary = array("p.cs", vec![Column::floats("a", vec![1.0])]);
    let passthrough = array("pt.cs", vec![Column::floats("b", vec![1.0])]);
    let err = merge_passthrough(primary, vec![passthrough]).unwrap_err();
    assert!(matches!(err, RecordError::MergeError(_)));
}

#[test]
fn test_merge_by_row_order() {
    let paths = |v: &[&str]| Column::strings("blob/path", v.iter().map(|s| s.to_string()).collect());
    let primary = array("p.cs", vec![paths(&["a.mrcs", "b.mrcs"])]);
    let good = array("pt.cs", vec![paths(&["a.mrcs", "b.mrcs"]), Column::floats("x", vec![1.0, 2.0])]);
    let merged = merge_passthrough(primary.clone(), vec![good]).unwrap();
    assert_eq!(merged.f64("x", 1), Some(2.0));

    let swapped = array("pt.cs", vec![paths(&["b.mrcs", "a.mrcs"]), Column::floats("x", vec![1.0, 2.0])]);
    assert!(matches!(
        merge_passthrough(primary, vec![swapped]),
        Err(RecordError::MergeError(_))
    ));
}

#[test]
fn test_detect_merge_key_preference() {
    let a = array("a.cs", vec![Column::floats("z", vec![0.0]), uids(&[1])]);
    let b = array("b.cs", vec![uids(&[1]), Column::floats("z", vec![0.0])]);
    assert_eq!(detect_merge_key(&[&a, &b]).as_deref(), Some("uid"));

    let c = array("c.cs", vec![Column::floats("z", vec![0.0])]);
    assert_eq!(detect_merge_key(&[&a, &c]).as_deref(), Some("z"));
}

#[test]
fn test_take_rows_and_insert() {
    let mut a = array("a.cs", vec![uids(&[1, 2, 3])]);
    assert!(a.insert_column(Column::floats("x", vec![1.0])).is_err());
    a.insert_column(Column::floats("x", vec![1.0, 2.0, 3.0])).unwrap();

    let picked = a.take_rows(&[2, 0]);
    assert_eq!(picked.len(), 2);
    assert_eq!(picked.i64("uid", 0), Some(3));
    assert_eq!(picked.f64("x", 1), Some(1.0));
}

#[test]
fn test_huge_record_count_is_format_error() {
    let header = "{'descr': [('uid', '<u8')], 'fortran_order': False, 'shape': (2305843009213693952,), }";
    let bytes = npy_bytes(header, &[0u8; 16]);
    let err = parse_npy(&bytes, Path::new("particles.cs")).unwrap_err();
    match err {
        RecordError::FormatError { message, .. } => assert!(message.contains("overflows"), "{}", message),
        other => panic!("unexpected error {:?}", other),
    }
}

#[test]
fn test_zero_size_records_rejected() {
    let header = "{'descr': [('pad', '|V0')], 'fortran_order': False, 'shape': (1000000000000,), }";
    let bytes = npy_bytes(header, &[]);
    assert!(matches!(
        parse_npy(&bytes, Path::new("particles.cs")),
        Err(RecordError::FormatError { .. })
    ));
}
