//! Segment trimming
//!
//! Cuts the events covered by one video segment out of a (possibly
//! multi-day) C1 log. The segment is located from wall-clock times: when the
//! C1 log started, when the video segment started and on which day, and how
//! long the segment runs.

use crate::types::{C1Error, Record, Result};
use chrono::{Duration, NaiveTime, Timelike};

const MS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

/// Extra time kept after the end of a segment
pub const TAIL_BUFFER_MS: i64 = 60 * 1000;

/// Parse a 24-hour `HH:MM:SS` clock time
pub fn parse_clock(input: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(input.trim(), "%H:%M:%S").map_err(|e| {
        C1Error::InputValidation(format!("{:?} is not a HH:MM:SS clock time: {}", input.trim(), e))
    })
}

/// Parse a `H:MM:SS` length; hours are not limited to one day
pub fn parse_length(input: &str) -> Result<Duration> {
    let invalid = || C1Error::InputValidation(format!("{:?} is not a H:MM:SS length", input.trim()));

    let parts: Vec<&str> = input.trim().split(':').collect();
    let [h, m, s] = parts.as_slice() else {
        return Err(invalid());
    };
    let hours: i64 = h.parse().map_err(|_| invalid())?;
    let minutes: i64 = m.parse().map_err(|_| invalid())?;
    let seconds: i64 = s.parse().map_err(|_| invalid())?;
    if hours < 0 || !(0..60).contains(&minutes) || !(0..60).contains(&seconds) {
        return Err(invalid());
    }

    hours
        .checked_mul(3600)
        .and_then(|total| total.checked_add(minutes * 60 + seconds))
        .and_then(Duration::try_seconds)
        .ok_or_else(invalid)
}

fn ms_of_day(time: NaiveTime) -> i64 {
    time.num_seconds_from_midnight() as i64 * 1000
}

/// Where a video segment sits relative to a C1 log
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentSpec {
    /// Wall-clock time the C1 log started
    pub log_start: NaiveTime,
    /// Timestamp of the first event in the log (ms)
    pub first_event_ms: i64,
    /// Wall-clock time the video segment started
    pub video_start: NaiveTime,
    /// Day of the recording the segment falls on, starting at 1
    pub day: u32,
    /// Length of the video segment
    pub video_length: Duration,
}

/// Inclusive range of log timestamps covered by a segment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentWindow {
    pub start: i64,
    pub end: i64,
}

impl SegmentWindow {
    /// Last timestamp kept, including the tail buffer
    pub fn buffered_end(&self) -> i64 {
        self.end.saturating_add(TAIL_BUFFER_MS)
    }

    pub fn contains(&self, timestamp: i64) -> bool {
        timestamp >= self.start && timestamp <= self.buffered_end()
    }
}

impl SegmentSpec {
    /// Locate the segment on the log's time base
    pub fn window(&self) -> Result<SegmentWindow> {
        if self.day == 0 {
            return Err(C1Error::InputValidation("day numbers start at 1".to_string()));
        }

        let out_of_range = || {
            C1Error::InputValidation(format!(
                "segment on day {} starting {} ms after the first event does not fit the log time base",
                self.day, self.first_event_ms
            ))
        };

        let video_ms = MS_PER_DAY
            .checked_mul(self.day as i64 - 1)
            .and_then(|days| days.checked_add(ms_of_day(self.video_start)))
            .ok_or_else(out_of_range)?;
        let start = (video_ms - ms_of_day(self.log_start))
            .checked_add(self.first_event_ms)
            .ok_or_else(out_of_range)?;
        let end = start
            .checked_add(self.video_length.num_milliseconds())
            .ok_or_else(out_of_range)?;

        Ok(SegmentWindow { start, end })
    }
}

/// Keep the records that fall inside `window`, in file order
pub fn trim(records: &[Record], window: SegmentWindow) -> Vec<Record> {
    let kept: Vec<Record> = records
        .iter()
        .filter(|record| window.contains(record.timestamp))
        .cloned()
        .collect();

    log::info!(
        "Kept {} of {} records between {} and {} ms",
        kept.len(),
        records.len(),
        window.start,
        window.buffered_end()
    );
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Channel, Edge};

    fn spec(day: u32) -> SegmentSpec {
        SegmentSpec {
            log_start: parse_clock("08:00:00").unwrap(),
            first_event_ms: 5_000,
            video_start: parse_clock("09:30:00").unwrap(),
            day,
            video_length: parse_length("0:15:00").unwrap(),
        }
    }

    #[test]
    fn test_window_on_first_day() {
        let window = spec(1).window().unwrap();
        assert_eq!(window.start, 90 * 60 * 1000 + 5_000);
        assert_eq!(window.end, window.start + 15 * 60 * 1000);
        assert_eq!(window.buffered_end(), window.end + 60_000);
    }

    #[test]
    fn test_later_days_add_whole_days() {
        let first = spec(1).window().unwrap();
        let third = spec(3).window().unwrap();
        assert_eq!(third.start - first.start, 2 * MS_PER_DAY);
    }

    #[test]
    fn test_day_zero_is_rejected() {
        assert!(matches!(spec(0).window(), Err(C1Error::InputValidation(_))));
    }

    #[test]
    fn test_trim_bounds_are_inclusive() {
        let window = SegmentWindow { start: 100, end: 200 };
        let records: Vec<Record> = [99, 100, 150, 60_200, 60_201]
            .iter()
            .map(|&ts| Record::new(Channel::new(1, 1), Edge::Rising, ts))
            .collect();

        let kept: Vec<_> = trim(&records, window).iter().map(|r| r.timestamp).collect();
        assert_eq!(kept, vec![100, 150, 60_200]);
    }

    #[test]
    fn test_clock_and_length_validation() {
        assert!(parse_clock("24:00:00").is_err());
        assert!(parse_clock("12:61:00").is_err());
        assert!(parse_clock("noon").is_err());

        assert_eq!(parse_length("26:00:00").unwrap().num_hours(), 26);
        assert!(parse_length("1:60:00").is_err());
        assert!(parse_length("1:00").is_err());
    }

    #[test]
    fn test_huge_length_is_rejected() {
        assert!(matches!(
            parse_length("3000000000000:00:00"),
            Err(C1Error::InputValidation(_))
        ));
        assert!(matches!(
            parse_length("9223372036854775807:00:00"),
            Err(C1Error::InputValidation(_))
        ));
    }

    #[test]
    fn test_window_overflow_is_rejected() {
        let mut late = spec(1);
        late.first_event_ms = i64::MAX;
        assert!(matches!(late.window(), Err(C1Error::InputValidation(_))));

        let mut long = spec(1);
        long.first_event_ms = i64::MAX - 10 * 60 * 60 * 1000;
        long.video_length = parse_length("2000:00:00").unwrap();
        assert!(matches!(long.window(), Err(C1Error::InputValidation(_))));
    }

    #[test]
    fn test_buffered_end_saturates() {
        let window = SegmentWindow {
            start: i64::MAX - 5,
            end: i64::MAX - 1,
        };
        assert_eq!(window.buffered_end(), i64::MAX);
        assert!(window.contains(i64::MAX));
    }
}
