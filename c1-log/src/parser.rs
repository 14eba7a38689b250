//! C1 log loader and validator
//!
//! Reads a C1 text log, drops blank and header lines, and parses every
//! remaining line into a [`Record`].

use crate::config::LogFormat;
use crate::types::{C1Error, Channel, Edge, Record, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};

static RECORD_RX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([0-9]) ([0-9]{1,2}) ([01]) ([0-9]+)$").expect("record pattern is valid")
});

/// A parsed C1 log and the file it came from
#[derive(Debug, Clone)]
pub struct C1Log {
    pub path: PathBuf,
    pub records: Vec<Record>,
}

impl C1Log {
    /// File name for user-facing messages
    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

/// Load and validate a C1 log file
///
/// The file must carry the configured extension and hold at least one
/// record once blank and header lines are removed.
pub fn load_log(path: &Path, format: &LogFormat) -> Result<C1Log> {
    if !format.matches_extension(path) {
        return Err(C1Error::Usage(format!(
            "{:?} is not a .{} file",
            path, format.extension
        )));
    }

    log::info!("Loading C1 log: {:?}", path);
    let text = std::fs::read_to_string(path)?;
    let records = parse_log(path, &text, format)?;
    log::debug!("Parsed {} records from {:?}", records.len(), path);

    Ok(C1Log {
        path: path.to_path_buf(),
        records,
    })
}

/// Parse the text of a C1 log
///
/// `source` is only used to label errors.
pub fn parse_log(source: &Path, text: &str, format: &LogFormat) -> Result<Vec<Record>> {
    let mut records = Vec::new();

    for (index, raw) in text.split('\n').enumerate() {
        let line = raw.trim_end_matches('\r');
        if line.is_empty() || format.is_header(line) {
            continue;
        }

        let record = parse_record(line).ok_or_else(|| C1Error::Format {
            path: source.to_path_buf(),
            line: index + 1,
            reason: format!("{:?} does not match `chip pin edge timestamp`", line),
        })?;
        records.push(record);
    }

    if records.is_empty() {
        return Err(C1Error::EmptyLog(source.to_path_buf()));
    }

    Ok(records)
}

/// Parse a single record line, `None` if it does not match the C1 pattern
pub fn parse_record(line: &str) -> Option<Record> {
    let caps = RECORD_RX.captures(line)?;

    let chip: u8 = caps[1].parse().ok()?;
    let pin_text = &caps[2];
    let pin: u8 = pin_text.parse().ok()?;
    let edge = Edge::from_digit(caps[3].parse().ok()?)?;
    let ts_text = &caps[4];
    // Over-long timestamps fail here rather than wrapping
    let timestamp: i64 = ts_text.parse().ok()?;

    Some(Record::with_widths(
        Channel::new(chip, pin),
        edge,
        timestamp,
        pin_text.len(),
        ts_text.len(),
    ))
}
