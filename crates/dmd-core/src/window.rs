//! Trading-session window and its minute cursors.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

/// Minutes between consecutive artifact cursors.
pub const CURSOR_STEP_MINUTES: i64 = 1;

/// Daily open and close of the trading clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionHours {
    #[serde(with = "hhmm")]
    pub open: NaiveTime,
    #[serde(with = "hhmm")]
    pub close: NaiveTime,
}

impl Default for SessionHours {
    fn default() -> Self {
        Self {
            open: NaiveTime::from_hms_opt(8, 0, 0).unwrap_or(NaiveTime::MIN),
            close: NaiveTime::from_hms_opt(16, 30, 0).unwrap_or(NaiveTime::MIN),
        }
    }
}

impl SessionHours {
    /// Window for `date`, or `None` on Saturday and Sunday.
    pub fn window_for(self, date: NaiveDate) -> Option<TradingWindow> {
        if date.weekday().number_from_monday() > 5 {
            return None;
        }
        Some(TradingWindow {
            open: date.and_time(self.open),
            close: date.and_time(self.close),
        })
    }
}

/// Inclusive `[open, close]` interval on one trading date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TradingWindow {
    pub open: NaiveDateTime,
    pub close: NaiveDateTime,
}

impl TradingWindow {
    /// Every cursor from open to close inclusive, one minute apart.
    pub fn cursors(self) -> impl Iterator<Item = NaiveDateTime> {
        let close = self.close;
        std::iter::successors(Some(self.open), |cursor| {
            Some(*cursor + Duration::minutes(CURSOR_STEP_MINUTES))
        })
        .take_while(move |cursor| *cursor <= close)
    }

    /// Cursors the loop would visit when "now" is `now`.
    pub fn cursors_before(self, now: NaiveDateTime) -> impl Iterator<Item = NaiveDateTime> {
        self.cursors().take_while(move |cursor| *cursor < now)
    }
}

pub(crate) mod hhmm {
    use chrono::NaiveTime;
    use serde::de::Error as DeError;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.format("%H:%M").to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        NaiveTime::parse_from_str(&value, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(&value, "%H:%M:%S"))
            .map_err(|_| D::Error::custom(format!("expected HH:MM, got '{value}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn weekend_has_no_window() {
        let hours = SessionHours::default();
        assert!(hours.window_for(date(2024, 3, 9)).is_none()); // Saturday
        assert!(hours.window_for(date(2024, 3, 10)).is_none()); // Sunday
        assert!(hours.window_for(date(2024, 3, 8)).is_some()); // Friday
    }

    #[test]
    fn full_default_session_has_511_cursors() {
        let window = SessionHours::default()
            .window_for(date(2024, 3, 5))
            .expect("weekday");

        let cursors: Vec<_> = window.cursors().collect();
        assert_eq!(cursors.len(), 511);
        assert_eq!(cursors.first().copied(), Some(window.open));
        assert_eq!(cursors.last().copied(), Some(window.close));
    }

    #[test]
    fn now_truncates_cursors() {
        let window = SessionHours::default()
            .window_for(date(2024, 3, 5))
            .expect("weekday");
        let now = window.open + Duration::minutes(10) + Duration::seconds(5);

        assert_eq!(window.cursors_before(now).count(), 11);
    }

    #[test]
    fn hours_round_trip_as_hh_mm() {
        let hours: SessionHours =
            serde_json::from_str(r#"{"open":"07:15","close":"17:00:00"}"#).expect("parse");
        assert_eq!(hours.open, NaiveTime::from_hms_opt(7, 15, 0).expect("time"));
        assert_eq!(
            serde_json::to_string(&hours).expect("serialize"),
            r#"{"open":"07:15","close":"17:00"}"#
        );
    }
}
