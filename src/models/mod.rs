//! Shift rostering domain models.
//!
//! Provides the data types the generator consumes and produces: the
//! shift vocabulary, staff and their overrides, the month calendar,
//! generation configuration, staff requests, carry-over tails, and the
//! resulting schedule.
//!
//! # Domain Mappings
//!
//! | u-shift | Ward rostering |
//! |---------|----------------|
//! | Staff | Nurse |
//! | Shift | 日 夜 明 休 有 前 後 管夜 管明 |
//! | Preferences | 希望 (submitted requests) |
//! | CarryOverTail | 前月末の勤務 |
//! | Schedule | 勤務表 |

mod calendar;
mod config;
mod request;
mod schedule;
mod shift;
mod staff;

pub use calendar::{is_national_holiday, DayInfo, DayKind, MonthCalendar, NightWindow};
pub use config::{
    GenerationConfig, SearchParams, StaffOverrides, StaffingRequirement, WEEKDAY_DAY_SLACK,
};
pub use request::{CarryOverTail, Preferences, RequestEntry, RequestKind};
pub use schedule::{Cell, Provenance, Schedule, StaffRow, StaffStats};
pub use shift::{is_off_cell, is_work_cell, Shift};
pub use staff::{normalize_name, Rank, Staff};
