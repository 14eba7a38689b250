//! Merging and serialization of aligned logs

use crate::types::Record;

/// Concatenate `a` then `b` and sort by timestamp
///
/// The sort is stable: records with equal timestamps keep their
/// concatenation order, so the first log wins ties.
pub fn merge(a: Vec<Record>, b: Vec<Record>) -> Vec<Record> {
    let mut merged = a;
    merged.extend(b);
    merged.sort_by_key(|record| record.timestamp);
    merged
}

/// Render records one per line, without a trailing newline
pub fn serialize_records(records: &[Record]) -> String {
    records
        .iter()
        .map(|record| record.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}
