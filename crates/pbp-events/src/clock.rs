//! Game clock parsing.
//!
//! Play-by-play feeds display the clock as `"11:42"` above one minute and
//! as `"45.3"` below it. Both forms parse into tenths of a second remaining
//! in the period.
//!
//! # Example
//!
//! ```
//! use pbp_events::GameClock;
//!
//! let clock: GameClock = "11:42".parse().unwrap();
//! assert_eq!(clock.tenths(), 7020);
//! assert_eq!(clock.to_string(), "11:42");
//! ```

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Tenths of a second in one minute.
pub const TENTHS_PER_MINUTE: u32 = 600;

/// Time remaining in a period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GameClock {
    tenths: u32,
}

impl GameClock {
    /// Creates a clock from tenths of a second remaining.
    pub fn from_tenths(tenths: u32) -> Self {
        Self { tenths }
    }

    /// Creates a clock from whole minutes and seconds remaining. Saturates
    /// at `u32::MAX` tenths.
    pub fn from_minutes_seconds(minutes: u32, seconds: u32) -> Self {
        Self {
            tenths: minutes
                .saturating_mul(TENTHS_PER_MINUTE)
                .saturating_add(seconds.saturating_mul(10)),
        }
    }

    /// Returns tenths of a second remaining.
    pub fn tenths(&self) -> u32 {
        self.tenths
    }

    /// Returns true once the period has expired.
    pub fn is_expired(&self) -> bool {
        self.tenths == 0
    }
}

impl fmt::Display for GameClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.tenths >= TENTHS_PER_MINUTE {
            let seconds = self.tenths / 10;
            write!(f, "{}:{:02}", seconds / 60, seconds % 60)
        } else {
            write!(f, "{}.{}", self.tenths / 10, self.tenths % 10)
        }
    }
}

/// Error type for parsing a GameClock from a display string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseClockError {
    #[error("invalid clock format: '{0}', expected 'M:SS' or 'S.t'")]
    InvalidFormat(String),
    #[error("clock seconds out of range: '{0}'")]
    SecondsOutOfRange(String),
    #[error("clock value too large: '{0}'")]
    OutOfRange(String),
}

impl FromStr for GameClock {
    type Err = ParseClockError;

    /// Parses `"M:SS"`, `"M:SS.t"` or `"S.t"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let invalid = || ParseClockError::InvalidFormat(s.to_string());

        let (minutes, rest) = match trimmed.split_once(':') {
            Some((m, rest)) => (m.parse::<u32>().map_err(|_| invalid())?, rest),
            None => (0, trimmed),
        };

        let (seconds, tenths) = match rest.split_once('.') {
            Some((sec, frac)) => {
                let digit = frac.chars().next().ok_or_else(invalid)?;
                let tenth = digit.to_digit(10).ok_or_else(invalid)?;
                (sec.parse::<u32>().map_err(|_| invalid())?, tenth)
            }
            None => (rest.parse::<u32>().map_err(|_| invalid())?, 0),
        };

        if minutes > 0 && seconds >= 60 {
            return Err(ParseClockError::SecondsOutOfRange(s.to_string()));
        }

        minutes
            .checked_mul(TENTHS_PER_MINUTE)
            .zip(seconds.checked_mul(10))
            .and_then(|(m, sec)| m.checked_add(sec))
            .and_then(|total| total.checked_add(tenths))
            .map(Self::from_tenths)
            .ok_or_else(|| ParseClockError::OutOfRange(s.to_string()))
    }
}

impl Serialize for GameClock {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for GameClock {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minutes_seconds() {
        let clock: GameClock = "11:42".parse().unwrap();
        assert_eq!(clock.tenths(), 7020);
    }

    #[test]
    fn test_parse_sub_minute() {
        let clock: GameClock = "45.3".parse().unwrap();
        assert_eq!(clock.tenths(), 453);
        assert_eq!(clock.to_string(), "45.3");
    }

    #[test]
    fn test_parse_minutes_with_tenths() {
        let clock: GameClock = "0:05.7".parse().unwrap();
        assert_eq!(clock.tenths(), 57);
    }

    #[test]
    fn test_display_pads_seconds() {
        assert_eq!(GameClock::from_minutes_seconds(3, 5).to_string(), "3:05");
        assert_eq!(GameClock::from_tenths(0).to_string(), "0.0");
    }

    #[test]
    fn test_expired() {
        assert!("0.0".parse::<GameClock>().unwrap().is_expired());
        assert!(!"0:01".parse::<GameClock>().unwrap().is_expired());
    }

    #[test]
    fn test_parse_errors() {
        assert!("".parse::<GameClock>().is_err());
        assert!("ab:cd".parse::<GameClock>().is_err());
        assert!("12:75".parse::<GameClock>().is_err());
        assert!("4.x".parse::<GameClock>().is_err());
    }

    #[test]
    fn test_overflowing_clock_is_out_of_range() {
        assert_eq!(
            "9999999:00".parse::<GameClock>(),
            Err(ParseClockError::OutOfRange("9999999:00".to_string()))
        );
        assert!(matches!(
            "4294967295.0".parse::<GameClock>(),
            Err(ParseClockError::OutOfRange(_))
        ));
        assert_eq!(
            GameClock::from_minutes_seconds(u32::MAX, 59).tenths(),
            u32::MAX
        );
    }

    #[test]
    fn test_ordering_counts_down() {
        let early: GameClock = "11:00".parse().unwrap();
        let late: GameClock = "2:00".parse().unwrap();
        assert!(early > late);
    }

    #[test]
    fn test_serialize_as_string() {
        let clock = GameClock::from_minutes_seconds(7, 30);
        assert_eq!(serde_json::to_string(&clock).unwrap(), r#""7:30""#);
        let parsed: GameClock = serde_json::from_str(r#""7:30""#).unwrap();
        assert_eq!(parsed, clock);
    }
}
