//! Month calendar and day classification.
//!
//! Classifies every day of a target month as an ordinary weekday, a
//! weekend/holiday, or a year-boundary day (Dec 30–31, Jan 1–3), and
//! splits the month into week windows for night staffing.
//!
//! # Day model
//! Days are addressed by 0-based index inside the crate (`0..days()`).
//! Public inputs such as requests use 1-based day numbers.
//!
//! # Week windows
//! Windows run Sunday through Saturday. The first window runs from day 1
//! to the first Saturday (a full week when the month starts on a Sunday);
//! the last window is cut at month end. Each window takes one slot of the
//! alternating night pattern.
//!
//! # Holidays
//! Japanese national holidays: fixed dates, Happy-Monday rules,
//! equinox days by the standard astronomical approximation (valid
//! 1980–2099), substitute holidays for holidays falling on Sunday, and
//! citizens' holidays sandwiched between two holidays. One-off moves
//! decided by special legislation are not modelled.

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::ShiftError;

/// Classification of a day for day-shift staffing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayKind {
    /// Ordinary weekday.
    Weekday,
    /// Saturday, Sunday or national holiday.
    WeekendOrHoliday,
    /// December 30–31.
    YearEnd,
    /// January 1–3.
    YearStart,
}

/// Calendar facts for one day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayInfo {
    /// Calendar date.
    pub date: NaiveDate,
    /// Day of week.
    pub weekday: Weekday,
    /// National holiday.
    pub holiday: bool,
    /// Staffing classification.
    pub kind: DayKind,
}

impl DayInfo {
    /// Saturday, Sunday or holiday (year-boundary days included).
    pub fn is_weekend_or_holiday(&self) -> bool {
        matches!(self.weekday, Weekday::Sat | Weekday::Sun) || self.holiday
    }

    /// Ordinary weekday: the only kind with an overstaffing tolerance.
    pub fn is_ordinary_weekday(&self) -> bool {
        self.kind == DayKind::Weekday
    }
}

/// A contiguous run of days sharing one night-staffing target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NightWindow {
    /// Window position within the month (0-based).
    pub index: usize,
    /// First day index (inclusive).
    pub start: usize,
    /// Last day index (inclusive).
    pub end: usize,
    /// Required night staff per day in this window.
    pub required: u32,
}

impl NightWindow {
    /// Whether a day index falls in this window.
    #[inline]
    pub fn contains(&self, day: usize) -> bool {
        day >= self.start && day <= self.end
    }
}

/// Calendar of one target month.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonthCalendar {
    /// Year.
    pub year: i32,
    /// Month (1–12).
    pub month: u32,
    days: Vec<DayInfo>,
}

impl MonthCalendar {
    /// Builds the calendar for a month (1-based).
    ///
    /// ```
    /// use u_shift::models::MonthCalendar;
    ///
    /// let cal = MonthCalendar::new(2025, 2).unwrap();
    /// assert_eq!(cal.days(), 28);
    /// assert!(cal.info(10).holiday); // Feb 11
    /// ```
    pub fn new(year: i32, month: u32) -> Result<Self, ShiftError> {
        let first = NaiveDate::from_ymd_opt(year, month, 1)
            .ok_or(ShiftError::InvalidMonth { year, month })?;

        let mut days = Vec::with_capacity(31);
        let mut date = first;
        while date.month() == month {
            let holiday = is_national_holiday(date);
            let weekday = date.weekday();
            let kind = if month == 12 && date.day() >= 30 {
                DayKind::YearEnd
            } else if month == 1 && date.day() <= 3 {
                DayKind::YearStart
            } else if holiday || matches!(weekday, Weekday::Sat | Weekday::Sun) {
                DayKind::WeekendOrHoliday
            } else {
                DayKind::Weekday
            };
            days.push(DayInfo {
                date,
                weekday,
                holiday,
                kind,
            });
            date = match date.succ_opt() {
                Some(next) => next,
                None => break,
            };
        }

        Ok(Self { year, month, days })
    }

    /// Number of days in the month.
    #[inline]
    pub fn days(&self) -> usize {
        self.days.len()
    }

    /// Facts for a day index. Panics if out of range.
    #[inline]
    pub fn info(&self, day: usize) -> &DayInfo {
        &self.days[day]
    }

    /// All days in order.
    pub fn iter(&self) -> impl Iterator<Item = &DayInfo> {
        self.days.iter()
    }

    /// Day of week for a day index.
    #[inline]
    pub fn weekday(&self, day: usize) -> Weekday {
        self.days[day].weekday
    }

    /// Whether a day index is a national holiday.
    #[inline]
    pub fn is_holiday(&self, day: usize) -> bool {
        self.days[day].holiday
    }

    /// Staffing classification of a day index.
    #[inline]
    pub fn kind(&self, day: usize) -> DayKind {
        self.days[day].kind
    }

    /// Whether a day index is a Sunday.
    #[inline]
    pub fn is_sunday(&self, day: usize) -> bool {
        self.days[day].weekday == Weekday::Sun
    }

    /// Whether a day index is a weekend day or holiday.
    #[inline]
    pub fn is_weekend_or_holiday(&self, day: usize) -> bool {
        self.days[day].is_weekend_or_holiday()
    }

    /// Single-character weekday label (日 月 火 水 木 金 土).
    pub fn weekday_label(&self, day: usize) -> &'static str {
        match self.days[day].weekday {
            Weekday::Sun => "日",
            Weekday::Mon => "月",
            Weekday::Tue => "火",
            Weekday::Wed => "水",
            Weekday::Thu => "木",
            Weekday::Fri => "金",
            Weekday::Sat => "土",
        }
    }

    /// Splits the month into Sunday-to-Saturday week windows, assigning
    /// `pattern[(window + offset) % pattern.len()]` to each.
    ///
    /// An empty pattern yields windows requiring zero night staff.
    pub fn night_windows(&self, pattern: &[u32], offset: usize) -> Vec<NightWindow> {
        let mut windows = Vec::new();
        let mut start = 0;
        while start < self.days.len() {
            let mut end = start;
            while end + 1 < self.days.len() && self.days[end].weekday != Weekday::Sat {
                end += 1;
            }
            let index = windows.len();
            let required = if pattern.is_empty() {
                0
            } else {
                pattern[(index + offset) % pattern.len()]
            };
            windows.push(NightWindow {
                index,
                start,
                end,
                required,
            });
            start = end + 1;
        }
        windows
    }
}

/// Whether a date is a Japanese national holiday (including substitute
/// and citizens' holidays).
pub fn is_national_holiday(date: NaiveDate) -> bool {
    if is_base_holiday(date) {
        return true;
    }
    is_substitute_holiday(date) || is_citizens_holiday(date)
}

/// Holidays defined directly by date rules.
fn is_base_holiday(date: NaiveDate) -> bool {
    let (y, m, d) = (date.year(), date.month(), date.day());
    let fixed = matches!(
        (m, d),
        (1, 1) | (2, 11) | (4, 29) | (5, 3) | (5, 4) | (5, 5) | (11, 3) | (11, 23)
    );
    if fixed {
        return true;
    }
    // Emperor's birthday moved in 2019; Mountain Day introduced in 2016.
    if (m, d) == (2, 23) && y >= 2020 {
        return true;
    }
    if (m, d) == (12, 23) && (1989..=2018).contains(&y) {
        return true;
    }
    if (m, d) == (8, 11) && y >= 2016 {
        return true;
    }

    let happy_monday = match m {
        1 => Some(2),
        7 => Some(3),
        9 => Some(3),
        10 => Some(2),
        _ => None,
    };
    if let Some(n) = happy_monday {
        if NaiveDate::from_weekday_of_month_opt(y, m, Weekday::Mon, n) == Some(date) {
            return true;
        }
    }

    match m {
        3 => equinox_day(y, 20.8431) == Some(d),
        9 => equinox_day(y, 23.2488) == Some(d),
        _ => false,
    }
}

/// Equinox day-of-month approximation for 1980–2099.
fn equinox_day(year: i32, base: f64) -> Option<u32> {
    if !(1980..=2099).contains(&year) {
        return None;
    }
    let offset = (year - 1980) as f64;
    let day = base + 0.242194 * offset - ((year - 1980) / 4) as f64;
    Some(day.floor() as u32)
}

/// A holiday falling on Sunday moves to the next non-holiday day.
fn is_substitute_holiday(date: NaiveDate) -> bool {
    let mut prev = match date.pred_opt() {
        Some(p) => p,
        None => return false,
    };
    // Walk back over consecutive holidays looking for a Sunday one.
    while is_base_holiday(prev) {
        if prev.weekday() == Weekday::Sun {
            return true;
        }
        prev = match prev.pred_opt() {
            Some(p) => p,
            None => return false,
        };
    }
    false
}

/// A non-Sunday day sandwiched between two holidays.
fn is_citizens_holiday(date: NaiveDate) -> bool {
    if date.weekday() == Weekday::Sun {
        return false;
    }
    match (date.pred_opt(), date.succ_opt()) {
        (Some(p), Some(n)) => is_base_holiday(p) && is_base_holiday(n),
        _ => false,
    }
}
