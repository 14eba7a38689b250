//! Time alignment of two C1 logs
//!
//! Each log is re-based onto its own first timestamp, then the log with the
//! smaller video offset is pushed forward by the difference between the two
//! offsets so both share one time base.

use crate::types::{C1Error, Offsets, Record, Result};

/// Parse a user-entered millisecond offset
pub fn parse_offset(input: &str) -> Result<i64> {
    let trimmed = input.trim();
    trimmed.parse::<i64>().map_err(|_| {
        C1Error::InputValidation(format!("{:?} is not an integer number of milliseconds", trimmed))
    })
}

/// Align two record sequences onto a shared time base
///
/// With equal offsets both logs are only zero-based. Offsets whose
/// difference or shifted timestamps do not fit in an `i64` are rejected.
pub fn align(a: &[Record], b: &[Record], offsets: Offsets) -> Result<(Vec<Record>, Vec<Record>)> {
    let delta = i64::try_from(offsets.a.abs_diff(offsets.b)).map_err(|_| {
        C1Error::InputValidation(format!(
            "offsets {} and {} ms are too far apart",
            offsets.a, offsets.b
        ))
    })?;
    let (shift_a, shift_b) = if offsets.a < offsets.b {
        (delta, 0)
    } else {
        (0, delta)
    };

    log::debug!(
        "Aligning logs: offsets {} / {} ms, shifting A by {} ms and B by {} ms",
        offsets.a,
        offsets.b,
        shift_a,
        shift_b
    );

    Ok((rebase(a, shift_a)?, rebase(b, shift_b)?))
}

/// Zero-base a sequence on its first record, then add `shift`
fn rebase(records: &[Record], shift: i64) -> Result<Vec<Record>> {
    let Some(first) = records.first() else {
        return Ok(Vec::new());
    };
    let zero = first.timestamp;

    records
        .iter()
        .map(|record| {
            record
                .timestamp
                .checked_sub(zero)
                .and_then(|ts| ts.checked_add(shift))
                .map(|ts| record.with_timestamp(ts))
                .ok_or_else(|| {
                    C1Error::InputValidation(format!(
                        "shifting timestamp {} by {} ms overflows",
                        record.timestamp, shift
                    ))
                })
        })
        .collect()
}
