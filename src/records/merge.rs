//! Joining passthrough arrays onto a primary array.

use std::collections::HashMap;

use log::{debug, warn};

use super::{RecordArray, RecordError};

/// Join keys in order of preference
///
/// Image identity comes first; the path-based keys only identify a row
/// when the arrays also agree on row order.
pub const MERGE_KEYS: &[&str] = &[
    "uid",
    "blob/path",
    "micrograph_blob/path",
    "location/micrograph_path",
    "movie_blob/path",
];

/// Pick the key shared by every array, preferring [`MERGE_KEYS`], then any
/// common field in the order of the first array
pub fn detect_merge_key(arrays: &[&RecordArray]) -> Option<String> {
    let (first, rest) = arrays.split_first()?;
    let shared = |name: &str| first.has_field(name) && rest.iter().all(|a| a.has_field(name));

    MERGE_KEYS
        .iter()
        .find(|key| shared(**key))
        .map(|key| key.to_string())
        .or_else(|| {
            first
                .field_names()
                .into_iter()
                .find(|name| shared(*name))
                .map(str::to_string)
        })
}

/// Merge passthrough arrays onto `primary`
///
/// Fields already present on the primary array are kept. With a `uid`
/// key, primary records missing from a passthrough array are dropped; with
/// any other key the arrays must line up record by record.
pub fn merge_passthrough(
    primary: RecordArray,
    passthroughs: Vec<RecordArray>,
) -> Result<RecordArray, RecordError> {
    if passthroughs.is_empty() {
        return Ok(primary);
    }

    let key = {
        let mut all: Vec<&RecordArray> = vec![&primary];
        all.extend(passthroughs.iter());
        detect_merge_key(&all).ok_or_else(|| {
            RecordError::MergeError(format!(
                "no field is shared by {} and its {} passthrough file(s)",
                primary.path().display(),
                passthroughs.len()
            ))
        })?
    };
    debug!("Merging {} passthrough array(s) on '{}'", passthroughs.len(), key);

    let mut merged = primary;
    for passthrough in passthroughs {
        let aligned = if key == "uid" {
            let (primary_rows, pass_rows) = match_by_key(&merged, &passthrough, &key);
            if primary_rows.len() < merged.len() {
                warn!(
                    "{} of {} records have no match in {} and are dropped",
                    merged.len() - primary_rows.len(),
                    merged.len(),
                    passthrough.path().display()
                );
                merged = merged.take_rows(&primary_rows);
            }
            passthrough.take_rows(&pass_rows)
        } else {
            check_row_order(&merged, &passthrough, &key)?;
            passthrough
        };

        let mut added = 0;
        for column in aligned.columns() {
            if !merged.has_field(column.name()) {
                merged.insert_column(column.clone())?;
                added += 1;
            }
        }
        debug!("Added {} fields from {}", added, aligned.path().display());
    }

    Ok(merged)
}

fn match_by_key(primary: &RecordArray, other: &RecordArray, key: &str) -> (Vec<usize>, Vec<usize>) {
    let (Some(left), Some(right)) = (primary.column(key), other.column(key)) else {
        return (Vec::new(), Vec::new());
    };

    let index: HashMap<String, usize> = (0..other.len())
        .filter_map(|r| right.key(r).map(|k| (k, r)))
        .collect();

    (0..primary.len())
        .filter_map(|r| left.key(r).and_then(|k| index.get(&k)).map(|&o| (r, o)))
        .unzip()
}

fn check_row_order(primary: &RecordArray, other: &RecordArray, key: &str) -> Result<(), RecordError> {
    if primary.len() != other.len() {
        return Err(RecordError::MergeError(format!(
            "{} has {} records but {} has {}, cannot join on '{}'",
            primary.path().display(),
            primary.len(),
            other.path().display(),
            other.len(),
            key
        )));
    }
    let (Some(left), Some(right)) = (primary.column(key), other.column(key)) else {
        return Err(RecordError::MergeError(format!("missing key field '{}'", key)));
    };
    match (0..primary.len()).find(|&r| left.key(r) != right.key(r)) {
        Some(r) => Err(RecordError::MergeError(format!(
            "'{}' differs at record {} between {} and {}",
            key,
            r,
            primary.path().display(),
            other.path().display()
        ))),
        None => Ok(()),
    }
}
