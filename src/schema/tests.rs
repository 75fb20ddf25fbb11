use super::*;
use std::collections::HashSet;

#[test]
fn test_identifiers_are_unique() {
    let names: HashSet<_> = Label::ALL.iter().map(|l| l.name()).collect();
    let keys: HashSet<_> = Label::ALL.iter().map(|l| l.star_key()).collect();
    assert_eq!(names.len(), Label::ALL.len());
    assert_eq!(keys.len(), Label::ALL.len());
}

#[test]
fn test_lookup_by_key_and_name() {
    assert_eq!(Label::from_star_key("rlnDefocusU"), Some(Label::DefocusU));
    assert_eq!(Label::from_star_key("_rlnImageName"), Some(Label::ImageName));
    assert_eq!(Label::from_star_key("rlnSomethingElse"), None);
    assert_eq!(Label::from_name("anglePsi"), Some(Label::AnglePsi));
    assert_eq!(Label::ShiftXAngst.star_key(), "rlnOriginXAngst");
}

#[test]
fn test_groups_are_disjoint() {
    let groups = [
        dict_labels(ACQUISITION_DICT),
        dict_labels(CTF_DICT),
        dict_labels(CTF_PSD_DICT),
        dict_labels(COORDINATE_DICT),
        ALIGNMENT_LABELS.to_vec(),
    ];
    for (i, a) in groups.iter().enumerate() {
        for b in groups.iter().skip(i + 1) {
            assert!(a.iter().all(|l| !b.contains(l)), "{:?} overlaps {:?}", a, b);
        }
    }
}

#[test]
fn test_value_coercion() {
    assert_eq!(Value::Int(3).coerce(ValueType::Float), Some(Value::Float(3.0)));
    assert_eq!(Value::Float(2.0).coerce(ValueType::Int), Some(Value::Int(2)));
    assert_eq!(Value::Float(2.5).coerce(ValueType::Int), None);
    assert_eq!(Value::from("1.5").coerce(ValueType::Float), Some(Value::Float(1.5)));
    assert_eq!(Value::Bool(true).coerce(ValueType::Int), Some(Value::Int(1)));
    assert_eq!(Value::Int(0).coerce(ValueType::Bool), Some(Value::Bool(false)));
    assert_eq!(Value::from("abc").coerce(ValueType::Int), None);
}

#[test]
fn test_value_display() {
    assert_eq!(Value::Float(1.5).to_string(), "1.500000");
    assert_eq!(Value::Int(42).to_string(), "42");
    assert_eq!(Value::Bool(true).to_string(), "1");
    assert_eq!(Value::from("a.mrcs").to_string(), "a.mrcs");
}

#[test]
fn test_parse_integral_float_as_int() {
    assert_eq!(Value::parse("2.000000", ValueType::Int), Some(Value::Int(2)));
    assert_eq!(Value::parse("2.5", ValueType::Int), None);
}

#[test]
fn test_version_deprecations() {
    let v31 = SchemaVersion::Relion31;
    assert!(v31.deprecated_labels().contains(&Label::Magnification));
    assert!(v31.deprecated_labels().contains(&Label::ShiftX));
    assert!(!v31.deprecated_labels().contains(&Label::ShiftXAngst));

    let v2 = SchemaVersion::Relion2;
    assert!(v2.deprecated_labels().contains(&Label::ShiftXAngst));
    assert!(!v2.has_optics());
}

#[test]
fn test_version_detection() {
    let labels = [Label::ImageName, Label::ShiftX];
    assert_eq!(
        SchemaVersion::detect(["particles"], &labels),
        SchemaVersion::Relion30
    );
    assert_eq!(
        SchemaVersion::detect(["optics", "particles"], &labels),
        SchemaVersion::Relion31
    );
    assert_eq!(
        SchemaVersion::detect(["particles"], &[Label::ShiftXAngst]),
        SchemaVersion::Relion31
    );
}

#[test]
fn test_version_from_str() {
    assert_eq!("relion2".parse::<SchemaVersion>(), Ok(SchemaVersion::Relion2));
    assert_eq!("3.1".parse::<SchemaVersion>(), Ok(SchemaVersion::Relion31));
    assert!("7".parse::<SchemaVersion>().is_err());
}
