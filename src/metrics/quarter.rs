use chrono::{DateTime, Datelike, Months, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::AppError;

/// A calendar quarter label such as `Q3 2024`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Quarter {
    pub year: i32,
    pub number: u8,
}

impl Quarter {
    pub fn new(number: u8, year: i32) -> Option<Self> {
        if (1..=4).contains(&number) {
            Some(Self { year, number })
        } else {
            None
        }
    }

    /// The quarter a calendar date falls in.
    pub fn containing(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            number: ((date.month() - 1) / 3 + 1) as u8,
        }
    }

    pub fn end_month(&self) -> u32 {
        self.number as u32 * 3
    }

    pub fn start_date(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.end_month() - 2, 1)
    }

    /// Last calendar day of the quarter's final month.
    pub fn end_date(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.end_month(), 1)?
            .checked_add_months(Months::new(1))?
            .pred_opt()
    }

    /// Midnight (UTC) opening the quarter's last day; "now" past this point
    /// means the quarter is over.
    pub fn end_instant(&self) -> Option<DateTime<Utc>> {
        let midnight = self.end_date()?.and_hms_opt(0, 0, 0)?;
        Some(Utc.from_utc_datetime(&midnight))
    }
}

impl fmt::Display for Quarter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Q{} {}", self.number, self.year)
    }
}

impl FromStr for Quarter {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || AppError::InvalidInput(format!("'{}' is not a quarter like 'Q3 2024'", s));

        let mut parts = s.split_whitespace();
        let (label, year) = match (parts.next(), parts.next(), parts.next()) {
            (Some(label), Some(year), None) => (label, year),
            _ => return Err(invalid()),
        };

        let number = match label {
            "Q1" => 1,
            "Q2" => 2,
            "Q3" => 3,
            "Q4" => 4,
            _ => return Err(invalid()),
        };
        let year = year.parse::<i32>().map_err(|_| invalid())?;

        let quarter = Quarter { year, number };
        // Years chrono cannot represent are rejected here rather than later.
        quarter.end_date().ok_or_else(invalid)?;
        Ok(quarter)
    }
}
