use std::{fmt::Display, str::FromStr};

use chrono::{Datelike, Days, NaiveDate, NaiveDateTime, Timelike};

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy)]
pub struct Date {
    date: NaiveDate,
}

impl Default for Date {
    fn default() -> Self {
        Self::today()
    }
}

impl Display for Date {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&format!(
            "{:04}-{:02}-{:02}",
            self.date.year_ce().1,
            self.date.month(),
            self.date.day()
        ))
    }
}

impl Date {
    pub fn new(year: i32, month: u32, day: u32) -> Option<Self> {
        Some(Self {
            date: NaiveDate::from_ymd_opt(year, month, day)?,
        })
    }

    pub fn today() -> Self {
        Self {
            date: chrono::Local::now().date_naive(),
        }
    }

    pub fn in_some_days(days: u64) -> Option<Self> {
        Self::today().add_days(days)
    }

    pub fn add_days(self, days: u64) -> Option<Self> {
        Some(Self {
            date: self.date.checked_add_days(Days::new(days))?,
        })
    }

    /// Parses the six digit `ddMMyy` dates used by Spanish bank exports.
    /// Two digit years are mapped into 2000-2099.
    pub fn from_ddmmyy(s: &str) -> Option<Self> {
        if s.len() != 6 || !s.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        let day = s[0..2].parse().ok()?;
        let month = s[2..4].parse().ok()?;
        let year: i32 = s[4..6].parse().ok()?;
        Self::new(2000 + year, month, day)
    }
}

/// Parses `YYYY-MM-DD`.
impl FromStr for Date {
    type Err = chrono::ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self {
            date: NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")?,
        })
    }
}

impl From<NaiveDate> for Date {
    fn from(date: NaiveDate) -> Self {
        Self { date }
    }
}

/// Local date and time with second precision, written as ISO 8601.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy)]
pub struct Timestamp {
    date_time: NaiveDateTime,
}

impl Timestamp {
    pub fn now() -> Self {
        let now = chrono::Local::now().naive_local();
        Self {
            date_time: now.with_nanosecond(0).unwrap_or(now),
        }
    }

    pub fn date(&self) -> Date {
        Date::from(self.date_time.date())
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Self::now()
    }
}

impl From<NaiveDateTime> for Timestamp {
    fn from(date_time: NaiveDateTime) -> Self {
        Self { date_time }
    }
}

impl Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.date_time.format("%Y-%m-%dT%H:%M:%S"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_iso() {
        assert_eq!(Date::new(2024, 3, 7).unwrap().to_string(), "2024-03-07");
    }

    #[test]
    fn parses_iso() {
        assert_eq!("2024-03-07".parse::<Date>().ok(), Date::new(2024, 3, 7));
        assert!("2024-02-30".parse::<Date>().is_err());
        assert!("07/03/2024".parse::<Date>().is_err());
    }

    #[test]
    fn parses_ddmmyy() {
        assert_eq!(Date::from_ddmmyy("310124"), Date::new(2024, 1, 31));
        assert_eq!(Date::from_ddmmyy("310224"), None);
        assert_eq!(Date::from_ddmmyy("3101"), None);
        assert_eq!(Date::from_ddmmyy("31o124"), None);
    }

    #[test]
    fn timestamp_has_seconds() {
        let dt = NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(9, 4, 2)
            .unwrap();
        assert_eq!(Timestamp::from(dt).to_string(), "2024-05-01T09:04:02");
    }
}
