//! Manual cell edits.
//!
//! Setting a night writes its after-shift on the next day and a rest day
//! on the day after that. Both are tagged [`Provenance::Derived`] and
//! remember the value they replaced, so replacing the night later puts
//! those cells back. The rest day is only written over generated or
//! derived cells; requested, carry-over and manually set cells keep
//! their value.
//!
//! Edits do not consult the lock set: an operator may override a locked
//! cell, and the next [`crate::validation::validate`] reports it.

use crate::error::ShiftError;
use crate::models::{Cell, Provenance, Schedule, Shift};

/// Sets one cell of a schedule.
///
/// `day` is 1-based; `None` clears the cell.
///
/// # Errors
/// [`ShiftError::UnknownStaff`] when the schedule has no row for
/// `staff_id`, [`ShiftError::DayOutOfRange`] when `day` is outside the row.
///
/// # Example
///
/// ```
/// use u_shift::edit::set_cell;
/// use u_shift::models::{Schedule, Shift};
///
/// let mut schedule = Schedule::empty(2025, 4, 30, ["n1"]);
/// set_cell(&mut schedule, "n1", 10, Some(Shift::Night)).unwrap();
/// assert_eq!(schedule.shift("n1", 10), Some(Shift::NightAfter));
/// assert_eq!(schedule.shift("n1", 11), Some(Shift::Off));
///
/// set_cell(&mut schedule, "n1", 10, Some(Shift::Day)).unwrap();
/// assert_eq!(schedule.shift("n1", 10), None);
/// ```
pub fn set_cell(schedule: &mut Schedule, staff_id: &str, day: u32, shift: Option<Shift>) -> Result<(), ShiftError> {
    let row = schedule
        .row_mut(staff_id)
        .ok_or_else(|| ShiftError::UnknownStaff(staff_id.to_string()))?;
    let days = row.cells.len();
    if day == 0 || day as usize > days {
        return Err(ShiftError::DayOutOfRange {
            day,
            days: days as u32,
        });
    }
    let d = day as usize - 1;
    let cells = &mut row.cells;

    if cells[d].shift.is_some_and(Shift::is_night) {
        restore_derived(cells, d);
    }
    cells[d] = Cell::new(shift, Provenance::Manual);

    if let Some(after) = shift.and_then(Shift::after_shift) {
        write_derived(cells, d + 1, after, d);
        let rest_free = cells
            .get(d + 2)
            .is_some_and(|c| matches!(c.provenance, Provenance::Generated | Provenance::Derived { .. }));
        if rest_free {
            write_derived(cells, d + 2, Shift::Off, d);
        }
    }

    tracing::debug!(event = "manual_edit", staff = staff_id, day, shift = ?shift);
    Ok(())
}

/// Puts back the cells derived from the night on `night_day`.
fn restore_derived(cells: &mut [Cell], night_day: usize) {
    for cell in cells.iter_mut().skip(night_day + 1).take(2) {
        if let Provenance::Derived { night_day: n, replaced } = cell.provenance {
            if n == night_day {
                *cell = Cell::new(replaced, Provenance::Generated);
            }
        }
    }
}

fn write_derived(cells: &mut [Cell], day: usize, shift: Shift, night_day: usize) {
    let Some(prev) = cells.get(day).copied() else {
        return;
    };
    if prev.shift.is_some_and(Shift::is_night) {
        restore_derived(cells, day);
    }
    cells[day] = Cell::new(
        Some(shift),
        Provenance::Derived {
            night_day,
            replaced: prev.shift,
        },
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn days_schedule() -> Schedule {
        let mut s = Schedule::empty(2025, 4, 30, ["a", "b"]);
        for row in &mut s.rows {
            for cell in &mut row.cells {
                *cell = Cell::generated(Shift::Day);
            }
        }
        s
    }

    #[test]
    fn test_night_derives_chain() {
        let mut s = days_schedule();
        set_cell(&mut s, "a", 5, Some(Shift::Night)).unwrap();
        let row = s.row("a").unwrap();
        assert_eq!(row.cells[4], Cell::new(Some(Shift::Night), Provenance::Manual));
        assert_eq!(
            row.cells[5],
            Cell::new(
                Some(Shift::NightAfter),
                Provenance::Derived {
                    night_day: 4,
                    replaced: Some(Shift::Day)
                }
            )
        );
        assert_eq!(row.cells[6].shift, Some(Shift::Off));
        assert!(row.cells[6].provenance.is_derived_from(4));
        assert_eq!(s.shift("b", 5), Some(Shift::Day));
    }

    #[test]
    fn test_replacing_night_restores() {
        let mut s = days_schedule();
        set_cell(&mut s, "a", 5, Some(Shift::Night)).unwrap();
        set_cell(&mut s, "a", 5, Some(Shift::PaidLeave)).unwrap();
        assert_eq!(s.shift("a", 4), Some(Shift::PaidLeave));
        assert_eq!(s.shift("a", 5), Some(Shift::Day));
        assert_eq!(s.shift("a", 6), Some(Shift::Day));
        assert_eq!(s.row("a").unwrap().cells[5].provenance, Provenance::Generated);
    }

    #[test]
    fn test_management_night_pairs_with_its_after() {
        let mut s = days_schedule();
        set_cell(&mut s, "a", 1, Some(Shift::MgmtNight)).unwrap();
        assert_eq!(s.shift("a", 1), Some(Shift::MgmtNightAfter));
        assert_eq!(s.shift("a", 2), Some(Shift::Off));
    }

    #[test]
    fn test_rest_keeps_requested_cell() {
        let mut s = days_schedule();
        s.rows[0].cells[6] = Cell::new(Some(Shift::PaidLeave), Provenance::Requested);
        set_cell(&mut s, "a", 5, Some(Shift::Night)).unwrap();
        assert_eq!(s.shift("a", 5), Some(Shift::NightAfter));
        assert_eq!(s.shift("a", 6), Some(Shift::PaidLeave));
        assert_eq!(s.row("a").unwrap().cells[6].provenance, Provenance::Requested);
    }

    #[test]
    fn test_month_end_night() {
        let mut s = days_schedule();
        set_cell(&mut s, "a", 30, Some(Shift::Night)).unwrap();
        assert_eq!(s.shift("a", 29), Some(Shift::Night));
        set_cell(&mut s, "a", 29, Some(Shift::Night)).unwrap();
        // day 30's night is overwritten by day 29's after-shift
        assert_eq!(s.shift("a", 29), Some(Shift::NightAfter));
    }

    #[test]
    fn test_clear_cell() {
        let mut s = days_schedule();
        set_cell(&mut s, "b", 3, None).unwrap();
        assert_eq!(s.shift("b", 2), None);
        assert_eq!(s.row("b").unwrap().cells[2].provenance, Provenance::Manual);
    }

    #[test]
    fn test_errors() {
        let mut s = days_schedule();
        assert!(matches!(
            set_cell(&mut s, "zzz", 1, None),
            Err(ShiftError::UnknownStaff(_))
        ));
        assert!(matches!(
            set_cell(&mut s, "a", 0, None),
            Err(ShiftError::DayOutOfRange { day: 0, days: 30 })
        ));
        assert!(matches!(
            set_cell(&mut s, "a", 31, None),
            Err(ShiftError::DayOutOfRange { day: 31, .. })
        ));
    }
}
