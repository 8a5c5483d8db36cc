//! Shift vocabulary.
//!
//! A cell of the monthly grid holds `Option<Shift>`; `None` is an
//! unassigned cell. Night shifts come in two parallel duty categories
//! (ward night and management night), each paired with its own
//! after-shift on the following day.
//!
//! # Classification
//!
//! | Shift | Work day | Day off | Night |
//! |-------|----------|---------|-------|
//! | Day | yes | | |
//! | Night / MgmtNight | yes | | yes |
//! | NightAfter / MgmtNightAfter | | | |
//! | Off / PaidLeave | | yes | |
//! | MorningHalf / AfternoonHalf | yes | | |
//!
//! After-shifts are neither work days nor days off: they break a run of
//! consecutive work days but are not counted against the days-off cap.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A shift value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Shift {
    /// Day shift.
    Day,
    /// Ward night shift.
    Night,
    /// Recovery day following a ward night shift.
    NightAfter,
    /// Management night shift.
    MgmtNight,
    /// Recovery day following a management night shift.
    MgmtNightAfter,
    /// Regular day off.
    Off,
    /// Paid leave.
    PaidLeave,
    /// Morning half-day leave (works the afternoon).
    MorningHalf,
    /// Afternoon half-day leave (works the morning).
    AfternoonHalf,
}

impl Shift {
    /// All shift values, in display order.
    pub const ALL: [Shift; 9] = [
        Shift::Day,
        Shift::Night,
        Shift::NightAfter,
        Shift::MgmtNight,
        Shift::MgmtNightAfter,
        Shift::Off,
        Shift::PaidLeave,
        Shift::MorningHalf,
        Shift::AfternoonHalf,
    ];

    /// Canonical one- or two-character symbol.
    pub fn symbol(self) -> &'static str {
        match self {
            Shift::Day => "日",
            Shift::Night => "夜",
            Shift::NightAfter => "明",
            Shift::MgmtNight => "管夜",
            Shift::MgmtNightAfter => "管明",
            Shift::Off => "休",
            Shift::PaidLeave => "有",
            Shift::MorningHalf => "前",
            Shift::AfternoonHalf => "後",
        }
    }

    /// Parses a symbol, long name or letter code.
    ///
    /// Surrounding whitespace is ignored. `nan`/`NaN` (blank spreadsheet
    /// cells) parse as [`Shift::Off`]. Returns `None` for anything
    /// unrecognized.
    ///
    /// ```
    /// use u_shift::models::Shift;
    ///
    /// assert_eq!(Shift::from_symbol("夜勤"), Some(Shift::Night));
    /// assert_eq!(Shift::from_symbol(" D "), Some(Shift::Day));
    /// assert_eq!(Shift::from_symbol("??"), None);
    /// ```
    pub fn from_symbol(raw: &str) -> Option<Shift> {
        let s = raw.trim();
        let shift = match s {
            "日" | "日勤" | "D" | "day" => Shift::Day,
            "夜" | "夜勤" | "N" | "night" => Shift::Night,
            "明" | "夜明" | "夜勤明" | "A" | "after" => Shift::NightAfter,
            "管夜" | "管理夜勤" | "M" | "mgmt_night" => Shift::MgmtNight,
            "管明" | "管理夜明" | "MA" | "mgmt_night_after" => Shift::MgmtNightAfter,
            "休" | "公休" | "公" | "O" | "off" | "nan" | "NaN" => Shift::Off,
            "有" | "有休" | "有給" | "Y" | "paid_leave" => Shift::PaidLeave,
            "前" | "午前半休" | "AM" | "morning_half" => Shift::MorningHalf,
            "後" | "午後半休" | "PM" | "afternoon_half" => Shift::AfternoonHalf,
            _ => return None,
        };
        Some(shift)
    }

    /// Normalizes raw input into a cell value.
    ///
    /// Blank and unrecognized symbols become an empty cell rather than an
    /// error, so malformed imports never abort generation.
    pub fn normalize(raw: &str) -> Option<Shift> {
        let s = raw.trim();
        if s.is_empty() {
            return None;
        }
        let parsed = Shift::from_symbol(s);
        if parsed.is_none() {
            tracing::warn!(event = "unknown_symbol", symbol = s, "normalized to empty");
        }
        parsed
    }

    /// Whether the cell counts toward a run of consecutive work days.
    #[inline]
    pub fn is_work(self) -> bool {
        matches!(
            self,
            Shift::Day | Shift::Night | Shift::MgmtNight | Shift::MorningHalf | Shift::AfternoonHalf
        )
    }

    /// Whether the cell counts against the days-off cap.
    #[inline]
    pub fn is_day_off(self) -> bool {
        matches!(self, Shift::Off | Shift::PaidLeave)
    }

    /// Either night variant.
    #[inline]
    pub fn is_night(self) -> bool {
        matches!(self, Shift::Night | Shift::MgmtNight)
    }

    /// Either after-shift variant.
    #[inline]
    pub fn is_after(self) -> bool {
        matches!(self, Shift::NightAfter | Shift::MgmtNightAfter)
    }

    /// The after-shift paired with a night variant.
    pub fn after_shift(self) -> Option<Shift> {
        match self {
            Shift::Night => Some(Shift::NightAfter),
            Shift::MgmtNight => Some(Shift::MgmtNightAfter),
            _ => None,
        }
    }

    /// The night variant an after-shift belongs to.
    pub fn night_for_after(self) -> Option<Shift> {
        match self {
            Shift::NightAfter => Some(Shift::Night),
            Shift::MgmtNightAfter => Some(Shift::MgmtNight),
            _ => None,
        }
    }
}

impl fmt::Display for Shift {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Whether an optional cell value is a work day.
#[inline]
pub fn is_work_cell(cell: Option<Shift>) -> bool {
    cell.is_some_and(Shift::is_work)
}

/// Whether an optional cell value is a day off.
#[inline]
pub fn is_off_cell(cell: Option<Shift>) -> bool {
    cell.is_some_and(Shift::is_day_off)
}
