//! Core types for the C1 log library
//!
//! This module defines the record model shared by every stage of the merge
//! pipeline. A record keeps enough of its textual shape (pin and timestamp
//! widths) to serialize back to the exact line it was parsed from.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Result type for C1 log operations
pub type Result<T> = std::result::Result<T, C1Error>;

/// Width a timestamp is zero-filled to whenever it is rewritten
pub const TIMESTAMP_WIDTH: usize = 10;

/// Errors that can occur while loading, merging or trimming C1 logs
#[derive(Debug, thiserror::Error)]
pub enum C1Error {
    #[error("Usage error: {0}")]
    Usage(String),

    #[error("Format error in {path:?} line {line}: {reason}")]
    Format {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("Log file {0:?} contains no C1 records")]
    EmptyLog(PathBuf),

    #[error("Invalid input: {0}")]
    InputValidation(String),

    #[error("No replacement channels left in the pool for colliding channel {channel}")]
    PoolExhausted { channel: Channel },

    #[error("Invalid channel pool entry on line {line}: {reason}")]
    ChannelPool { line: usize, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A physical input line, identified by chip and pin
///
/// Ordering is numeric: chip first, then pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Channel {
    pub chip: u8,
    pub pin: u8,
}

impl Channel {
    pub fn new(chip: u8, pin: u8) -> Self {
        Self { chip, pin }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.chip, self.pin)
    }
}

/// Signal transition recorded by a C1 reader
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Edge {
    /// State `0`, the end of an activation
    Falling,
    /// State `1`, the start of an activation
    Rising,
}

impl Edge {
    pub fn from_digit(digit: u8) -> Option<Self> {
        match digit {
            0 => Some(Edge::Falling),
            1 => Some(Edge::Rising),
            _ => None,
        }
    }

    pub fn as_digit(&self) -> u8 {
        match self {
            Edge::Falling => 0,
            Edge::Rising => 1,
        }
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_digit())
    }
}

/// One line of a C1 log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Channel the event was seen on
    pub channel: Channel,
    /// Transition direction
    pub edge: Edge,
    /// Milliseconds since log start (may go negative after re-basing
    /// a log whose timestamps are not monotonic)
    pub timestamp: i64,
    /// Number of digits the pin was written with
    pin_width: usize,
    /// Number of characters the timestamp was written with
    timestamp_width: usize,
}

impl Record {
    /// Create a record in canonical form (natural pin width, 10-digit timestamp)
    pub fn new(channel: Channel, edge: Edge, timestamp: i64) -> Self {
        Self {
            channel,
            edge,
            timestamp,
            pin_width: 1,
            timestamp_width: TIMESTAMP_WIDTH,
        }
    }

    /// Create a record that remembers the widths it was read with
    pub(crate) fn with_widths(
        channel: Channel,
        edge: Edge,
        timestamp: i64,
        pin_width: usize,
        timestamp_width: usize,
    ) -> Self {
        Self {
            channel,
            edge,
            timestamp,
            pin_width,
            timestamp_width,
        }
    }

    /// Copy of this record with a rewritten timestamp
    pub fn with_timestamp(&self, timestamp: i64) -> Self {
        Self {
            timestamp,
            timestamp_width: TIMESTAMP_WIDTH,
            ..self.clone()
        }
    }

    /// Copy of this record moved onto another channel
    pub fn with_channel(&self, channel: Channel) -> Self {
        Self {
            channel,
            pin_width: 1,
            ..self.clone()
        }
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {:0pw$} {} {:0tw$}",
            self.channel.chip,
            self.channel.pin,
            self.edge,
            self.timestamp,
            pw = self.pin_width,
            tw = self.timestamp_width,
        )
    }
}

/// Per-log video offsets in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Offsets {
    /// Offset of the first (authoritative) log
    pub a: i64,
    /// Offset of the second (remapped) log
    pub b: i64,
}

impl Offsets {
    pub fn new(a: i64, b: i64) -> Self {
        Self { a, b }
    }

    /// Same offsets with the two logs' roles exchanged
    pub fn swapped(&self) -> Self {
        Self { a: self.b, b: self.a }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_ordering_is_numeric() {
        let mut channels = vec![Channel::new(1, 10), Channel::new(1, 5), Channel::new(0, 99)];
        channels.sort();
        assert_eq!(
            channels,
            vec![Channel::new(0, 99), Channel::new(1, 5), Channel::new(1, 10)]
        );
    }

    #[test]
    fn test_record_display_pads_rewritten_timestamp() {
        let record = Record::new(Channel::new(2, 6), Edge::Rising, 500);
        assert_eq!(record.to_string(), "2 6 1 0000000500");

        let negative = record.with_timestamp(-5);
        assert_eq!(negative.to_string(), "2 6 1 -000000005");
    }

    #[test]
    fn test_record_keeps_original_widths() {
        let record = Record::with_widths(Channel::new(3, 4), Edge::Falling, 42, 2, 3);
        assert_eq!(record.to_string(), "3 04 0 042");

        let moved = record.with_channel(Channel::new(4, 7));
        assert_eq!(moved.to_string(), "4 7 0 042");
    }

    #[test]
    fn test_edge_digits() {
        assert_eq!(Edge::from_digit(0), Some(Edge::Falling));
        assert_eq!(Edge::from_digit(1), Some(Edge::Rising));
        assert_eq!(Edge::from_digit(2), None);
        assert_eq!(Edge::Rising.to_string(), "1");
    }
}
