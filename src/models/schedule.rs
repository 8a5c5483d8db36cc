//! Monthly schedule (solution) model.
//!
//! A schedule maps each staff member to one cell per day of the target
//! month. Every cell carries its shift value and its provenance, so a
//! manual edit can tell a requested cell from one derived by a night
//! assignment without consulting a side table.

use serde::{Deserialize, Serialize};

use super::calendar::MonthCalendar;
use super::shift::Shift;

/// Where a cell's value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "source")]
pub enum Provenance {
    /// Unassigned or placed by the generator.
    #[default]
    Generated,
    /// Copied from a staff request.
    Requested,
    /// Forced by the previous month's tail.
    CarryOver,
    /// After-shift or rest day written for the night on `night_day`
    /// (0-based). `replaced` remembers the value it overwrote.
    Derived {
        night_day: usize,
        replaced: Option<Shift>,
    },
    /// Set by a manual edit.
    Manual,
}

impl Provenance {
    /// Derived from the night on `night_day`, not remembering a prior value.
    pub fn derived(night_day: usize) -> Self {
        Provenance::Derived {
            night_day,
            replaced: None,
        }
    }

    /// Whether the cell was derived from a night assignment.
    pub fn is_derived(&self) -> bool {
        matches!(self, Provenance::Derived { .. })
    }

    /// Whether the cell was derived from the night on a specific day.
    pub fn is_derived_from(&self, day: usize) -> bool {
        matches!(self, Provenance::Derived { night_day, .. } if *night_day == day)
    }
}

/// One (staff, day) cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Cell {
    /// Shift value (`None` = unassigned).
    pub shift: Option<Shift>,
    /// Origin of the value.
    pub provenance: Provenance,
}

impl Cell {
    /// Creates a cell.
    pub fn new(shift: Option<Shift>, provenance: Provenance) -> Self {
        Self { shift, provenance }
    }

    /// A generated cell holding `shift`.
    pub fn generated(shift: Shift) -> Self {
        Self::new(Some(shift), Provenance::Generated)
    }
}

/// One staff member's month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaffRow {
    /// Staff ID.
    pub staff_id: String,
    /// One cell per day.
    pub cells: Vec<Cell>,
}

impl StaffRow {
    /// Shift values only.
    pub fn shifts(&self) -> Vec<Option<Shift>> {
        self.cells.iter().map(|c| c.shift).collect()
    }
}

/// Per-staff counters over a month.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffStats {
    /// Ward and management night shifts.
    pub nights: u32,
    /// Day shifts.
    pub day_shifts: u32,
    /// Off + paid leave (after-shifts excluded).
    pub days_off: u32,
    /// Paid leave only.
    pub paid_leave: u32,
    /// Work days of any kind.
    pub total_work: u32,
    /// Work days falling on weekends or holidays.
    pub weekend_work: u32,
    /// Longest run of consecutive work days.
    pub max_consecutive: u32,
}

impl StaffStats {
    /// Computes counters for a sequence of cells.
    pub fn from_shifts(shifts: &[Option<Shift>], calendar: &MonthCalendar) -> Self {
        let mut stats = StaffStats::default();
        let mut run = 0u32;
        for (d, cell) in shifts.iter().enumerate() {
            match cell {
                Some(s) if s.is_work() => {
                    stats.total_work += 1;
                    if s.is_night() {
                        stats.nights += 1;
                    }
                    if *s == Shift::Day {
                        stats.day_shifts += 1;
                    }
                    if d < calendar.days() && calendar.is_weekend_or_holiday(d) {
                        stats.weekend_work += 1;
                    }
                    run += 1;
                    stats.max_consecutive = stats.max_consecutive.max(run);
                }
                Some(s) => {
                    if s.is_day_off() {
                        stats.days_off += 1;
                    }
                    if *s == Shift::PaidLeave {
                        stats.paid_leave += 1;
                    }
                    run = 0;
                }
                None => run = 0,
            }
        }
        stats
    }
}

/// A complete monthly schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    /// Target year.
    pub year: i32,
    /// Target month (1–12).
    pub month: u32,
    /// Rows in roster order.
    pub rows: Vec<StaffRow>,
}

impl Schedule {
    /// Creates an all-empty schedule.
    pub fn empty<'a>(
        year: i32,
        month: u32,
        days: usize,
        staff_ids: impl IntoIterator<Item = &'a str>,
    ) -> Self {
        let rows = staff_ids
            .into_iter()
            .map(|id| StaffRow {
                staff_id: id.to_string(),
                cells: vec![Cell::default(); days],
            })
            .collect();
        Self { year, month, rows }
    }

    /// Row for a staff member.
    pub fn row(&self, staff_id: &str) -> Option<&StaffRow> {
        self.rows.iter().find(|r| r.staff_id == staff_id)
    }

    /// Mutable row for a staff member.
    pub fn row_mut(&mut self, staff_id: &str) -> Option<&mut StaffRow> {
        self.rows.iter_mut().find(|r| r.staff_id == staff_id)
    }

    /// Shift for a staff member on a 0-based day.
    pub fn shift(&self, staff_id: &str, day: usize) -> Option<Shift> {
        self.row(staff_id)?.cells.get(day)?.shift
    }

    /// Number of staff assigned `shift` on a 0-based day.
    pub fn count_on_day(&self, day: usize, shift: Shift) -> usize {
        self.rows
            .iter()
            .filter(|r| r.cells.get(day).and_then(|c| c.shift) == Some(shift))
            .count()
    }

    /// Per-staff counters.
    pub fn staff_stats(&self, staff_id: &str, calendar: &MonthCalendar) -> Option<StaffStats> {
        let row = self.row(staff_id)?;
        Some(StaffStats::from_shifts(&row.shifts(), calendar))
    }

    /// Shift values only, for bit-exact comparisons.
    pub fn shift_grid(&self) -> Vec<Vec<Option<Shift>>> {
        self.rows.iter().map(StaffRow::shifts).collect()
    }

    /// Number of staff rows.
    pub fn staff_count(&self) -> usize {
        self.rows.len()
    }
}
