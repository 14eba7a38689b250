//! DVR file naming schemes
//!
//! DVR exports are named like
//! `NVR_ch1_main_20190612073015_20190612080015.dav`. Renamed footage follows
//! `<phase>_<HHMM start>-<HHMM end>.<ext>`, e.g. `2_0730-0800.mp4`.

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

static DVR_NAME_RX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9]*_ch[0-9]_[a-zA-Z]*_[0-9]{8}([0-9]{6})_[0-9]{8}([0-9]{6})\.dav$")
        .expect("DVR name pattern is valid")
});

static SEGMENT_NAME_RX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([0-9]{1,2})_([0-9]{4})-([0-9]{4})\.([a-zA-Z0-9]*)$")
        .expect("segment name pattern is valid")
});

/// A file following the renamed `<phase>_<start>-<end>.<ext>` scheme
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentName {
    pub phase: u32,
    /// Start time as four `HHMM` digits
    pub start: String,
    /// End time as four `HHMM` digits
    pub end: String,
    pub extension: String,
}

impl SegmentName {
    /// Parse a renamed file name
    pub fn parse(file_name: &str) -> Option<Self> {
        let caps = SEGMENT_NAME_RX.captures(file_name)?;
        Some(Self {
            phase: caps[1].parse().ok()?,
            start: caps[2].to_string(),
            end: caps[3].to_string(),
            extension: caps[4].to_string(),
        })
    }

    /// Parse a renamed file name that must carry `extension`
    pub fn parse_with_extension(file_name: &str, extension: &str) -> Option<Self> {
        Self::parse(file_name).filter(|name| name.extension == extension)
    }

    /// Same segment with another extension
    pub fn with_extension(&self, extension: &str) -> Self {
        Self {
            extension: extension.to_string(),
            ..self.clone()
        }
    }
}

impl fmt::Display for SegmentName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}-{}.{}", self.phase, self.start, self.end, self.extension)
    }
}

/// How a `.dav` file is named
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DavName {
    /// Straight from the DVR; start and end are `HHMMSS` times of day
    Dvr { start: u32, end: u32 },
    /// Already in the renamed scheme
    Renamed(SegmentName),
    /// Neither scheme
    Unrecognised,
}

/// Classify a `.dav` file name
pub fn classify_dav(file_name: &str) -> DavName {
    if let Some(caps) = DVR_NAME_RX.captures(file_name) {
        if let (Ok(start), Ok(end)) = (caps[1].parse(), caps[2].parse()) {
            return DavName::Dvr { start, end };
        }
    }

    match SegmentName::parse_with_extension(file_name, "dav") {
        Some(name) => DavName::Renamed(name),
        None => DavName::Unrecognised,
    }
}

/// Renamed form of a DVR export for the given phase
///
/// Seconds are dropped: `073015` becomes `0730`.
pub fn renamed_dav(phase: u32, start: u32, end: u32) -> SegmentName {
    SegmentName {
        phase,
        start: format!("{:04}", start / 100),
        end: format!("{:04}", end / 100),
        extension: "dav".to_string(),
    }
}

/// File name of the concatenation of `segments`
///
/// Takes the phase and start of the earliest segment and the end of the
/// latest one. `None` when `segments` is empty.
pub fn concat_name(segments: &[SegmentName]) -> Option<SegmentName> {
    let first = segments.iter().min_by(|a, b| a.start.cmp(&b.start))?;
    let last = segments.iter().max_by(|a, b| a.start.cmp(&b.start))?;
    Some(SegmentName {
        phase: first.phase,
        start: first.start.clone(),
        end: last.end.clone(),
        extension: "mp4".to_string(),
    })
}

/// Label used in resampled file names: `30` for whole rates, `29.97` otherwise
pub fn fps_label(fps: f64) -> String {
    if fps.fract() == 0.0 {
        format!("{}", fps as i64)
    } else {
        format!("{}", fps)
    }
}
