use serde::{Deserialize, Serialize};
use std::fmt;

const MONTH_ABBREVIATIONS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Calendar month bucket, ordered chronologically.
///
/// Field order matters: the derived `Ord` compares year first, then month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawYearMonth")]
pub struct YearMonth {
    year: i32,
    month: u8,
}

#[derive(Deserialize)]
struct RawYearMonth {
    year: i32,
    month: i32,
}

impl TryFrom<RawYearMonth> for YearMonth {
    type Error = String;

    fn try_from(raw: RawYearMonth) -> Result<Self, Self::Error> {
        YearMonth::new(raw.year, raw.month)
            .ok_or_else(|| format!("month {} is outside 1..=12", raw.month))
    }
}

impl YearMonth {
    /// Returns `None` unless `month` is in 1..=12
    pub fn new(year: i32, month: i32) -> Option<Self> {
        if (1..=12).contains(&month) {
            Some(Self {
                year,
                month: month as u8,
            })
        } else {
            None
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u8 {
        self.month
    }

    /// Chart label, e.g. `"Jul 2024"`
    pub fn label(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = MONTH_ABBREVIATIONS[usize::from(self.month) - 1];
        write!(f, "{} {}", name, self.year)
    }
}
