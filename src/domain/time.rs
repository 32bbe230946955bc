//! Time - Clock Snapshots

use jiff::Timestamp;
use jiff::tz::TimeZone;
use std::sync::Arc;

/// Formatted wall-clock reading for one time zone
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSnapshot {
    /// Instant the snapshot was taken
    pub instant: Timestamp,
    /// Hours (0-23)
    pub hours: u8,
    /// Minutes (0-59)
    pub minutes: u8,
    /// Seconds (0-59)
    pub seconds: u8,
    /// Short date label (e.g., "Mon Jan 15")
    pub date_label: Arc<str>,
    /// Time zone abbreviation (e.g., "CET", "EEST")
    pub tz_abbreviation: Arc<str>,
}

impl TimeSnapshot {
    /// Format `instant` in `zone`
    ///
    /// All fields come from the same zoned conversion, so offset and DST
    /// changes show up without any manual arithmetic.
    pub fn at(instant: Timestamp, zone: &TimeZone) -> Self {
        let zoned = instant.to_zoned(zone.clone());

        Self {
            instant,
            hours: zoned.hour() as u8,
            minutes: zoned.minute() as u8,
            seconds: zoned.second() as u8,
            date_label: zoned.strftime("%a %b %-d").to_string().into(),
            tz_abbreviation: zoned.strftime("%Z").to_string().into(),
        }
    }

    /// Value shown before the first tick arrives
    pub fn placeholder() -> Self {
        Self {
            instant: Timestamp::UNIX_EPOCH,
            hours: 0,
            minutes: 0,
            seconds: 0,
            date_label: "".into(),
            tz_abbreviation: "".into(),
        }
    }

    /// "HH:MM:SS"
    pub fn clock_face(&self) -> String {
        format!("{:02}:{:02}:{:02}", self.hours, self.minutes, self.seconds)
    }
}
