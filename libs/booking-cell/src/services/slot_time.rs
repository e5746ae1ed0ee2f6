use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;

use crate::models::{BookingError, MINUTES_PER_DAY};

static TWELVE_HOUR_TIME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{1,2}):(\d{2}) ([AaPp][Mm])$").expect("time pattern is valid")
});

/// A wall-clock time of day, stored as minutes since midnight.
///
/// The clinic stores and transports times as 12-hour strings ("10:00 AM"),
/// so parsing accepts `H:MM AM|PM` or `HH:MM AM|PM` with a case-insensitive
/// meridiem and exactly one space before it. `Display` writes the same shape
/// back without a leading zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SlotTime(u32);

impl SlotTime {
    pub const MIDNIGHT: SlotTime = SlotTime(0);

    pub fn from_minutes(minutes: u32) -> Option<Self> {
        (minutes < MINUTES_PER_DAY).then_some(SlotTime(minutes))
    }

    pub fn minutes(self) -> u32 {
        self.0
    }

    pub fn parse(raw: &str) -> Result<Self, BookingError> {
        let invalid = || {
            BookingError::TimeParse(format!("{:?} does not match H:MM AM|PM", raw))
        };

        let captures = TWELVE_HOUR_TIME.captures(raw).ok_or_else(invalid)?;
        let hour: u32 = captures[1].parse().map_err(|_| invalid())?;
        let minute: u32 = captures[2].parse().map_err(|_| invalid())?;
        let is_pm = captures[3].eq_ignore_ascii_case("pm");

        if !(1..=12).contains(&hour) || minute > 59 {
            return Err(invalid());
        }

        let hour = match (hour, is_pm) {
            (12, false) => 0,
            (12, true) => 12,
            (h, false) => h,
            (h, true) => h + 12,
        };

        Ok(SlotTime(hour * 60 + minute))
    }
}

impl FromStr for SlotTime {
    type Err = BookingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SlotTime::parse(s)
    }
}

impl fmt::Display for SlotTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hour = self.0 / 60;
        let minute = self.0 % 60;
        let meridiem = if hour < 12 { "AM" } else { "PM" };
        let display_hour = match hour % 12 {
            0 => 12,
            h => h,
        };
        write!(f, "{}:{:02} {}", display_hour, minute, meridiem)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn minutes(raw: &str) -> u32 {
        SlotTime::parse(raw).unwrap().minutes()
    }

    #[test]
    fn meridiem_boundaries() {
        assert_eq!(minutes("12:00 AM"), 0);
        assert_eq!(minutes("12:30 AM"), 30);
        assert_eq!(minutes("12:00 PM"), 720);
        assert_eq!(minutes("1:00 PM"), 780);
        assert_eq!(minutes("11:59 PM"), 1439);
    }

    #[test]
    fn accepts_padded_hours_and_any_meridiem_case() {
        assert_eq!(minutes("09:15 AM"), 555);
        assert_eq!(minutes("9:15 am"), 555);
        assert_eq!(minutes("9:15 Pm"), 1275);
    }

    #[test]
    fn requires_single_space_before_meridiem() {
        for raw in ["10:00AM", "10:00  AM", "  10:00 AM", "10:00 AM ", "10:00\tAM"] {
            assert_matches!(SlotTime::parse(raw), Err(BookingError::TimeParse(_)), "{raw:?}");
        }
    }

    #[test]
    fn rejects_malformed_times() {
        for raw in [
            "25:00 AM", "10:00", "0:30 AM", "13:00 PM", "10:60 AM", "10:5 AM",
            "10:00 XM", "100:00 AM", "ten o'clock", "", "10:00 AM PM",
        ] {
            assert_matches!(SlotTime::parse(raw), Err(BookingError::TimeParse(_)), "{raw}");
        }
    }

    #[test]
    fn formats_without_leading_zero() {
        assert_eq!(SlotTime::MIDNIGHT.to_string(), "12:00 AM");
        assert_eq!(SlotTime::from_minutes(545).unwrap().to_string(), "9:05 AM");
        assert_eq!(SlotTime::from_minutes(720).unwrap().to_string(), "12:00 PM");
        assert_eq!(SlotTime::from_minutes(780).unwrap().to_string(), "1:00 PM");
        assert!(SlotTime::from_minutes(MINUTES_PER_DAY).is_none());
    }

    #[test]
    fn every_minute_of_the_day_round_trips() {
        for m in 0..MINUTES_PER_DAY {
            let time = SlotTime::from_minutes(m).unwrap();
            let parsed: SlotTime = time.to_string().parse().unwrap();
            assert_eq!(parsed.minutes(), m);
        }
    }
}
