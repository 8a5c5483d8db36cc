//! Locked cells: staff requests and carry-over constraints.
//!
//! The lock set is computed once per generation run. Every write path in
//! the generator consults it, and validation compares the final schedule
//! against it to prove no phase overwrote a locked cell.
//!
//! # Carry-over rules
//!
//! Derived from the last shifts of the previous month (oldest first):
//!
//! | Tail ends with | Day 1 | Day 2 | Day 3 |
//! |----------------|-------|-------|-------|
//! | `… N` | after | off | |
//! | `… N A N` | after | off | off |
//! | `… A` | off | | |
//! | `… N A N A` | off | off | |
//! | a work run ≥ max-consecutive | off | | |
//!
//! `N`/`A` stand for either night variant and its matching after-shift.
//! Carry-over outranks requests: a request on a carry-over day is not
//! placed.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::{CarryOverTail, Preferences, RequestKind, Schedule, Shift};

/// Why a cell is locked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockSource {
    /// Forced by the previous month's tail.
    CarryOver,
    /// Directly requested by the staff member.
    Request,
}

/// A locked cell's fixed value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockedCell {
    /// Value the cell must hold.
    pub shift: Shift,
    /// Lock origin.
    pub source: LockSource,
}

/// A locked cell whose value differs from the lock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockMismatch {
    /// Staff row index.
    pub staff: usize,
    /// Day index (0-based).
    pub day: usize,
    /// Locked value.
    pub expected: Shift,
    /// Value found.
    pub actual: Option<Shift>,
    /// Lock origin.
    pub source: LockSource,
}

/// Derives forced first-of-month shifts (1-based day → shift) from a tail.
///
/// A tail ending in a run of at least `max_consecutive` work days forces
/// day 1 off. After-shifts and days off end a run.
///
/// ```
/// use u_shift::locking::derive_carry_over;
/// use u_shift::models::Shift;
///
/// let tail = [Some(Shift::Day), Some(Shift::Night)];
/// let forced = derive_carry_over(&tail, 5);
/// assert_eq!(forced.get(&1), Some(&Shift::NightAfter));
/// assert_eq!(forced.get(&2), Some(&Shift::Off));
/// ```
pub fn derive_carry_over(tail: &[Option<Shift>], max_consecutive: u32) -> BTreeMap<u32, Shift> {
    let mut forced = BTreeMap::new();
    let back = |k: usize| -> Option<Shift> {
        if k <= tail.len() {
            tail[tail.len() - k]
        } else {
            None
        }
    };
    let (last, second, third, fourth) = (back(1), back(2), back(3), back(4));

    match last {
        Some(night) if night.is_night() => {
            let after = night.after_shift();
            if let Some(after) = after {
                forced.insert(1, after);
            }
            forced.insert(2, Shift::Off);
            if third == Some(night) && second == after {
                forced.insert(3, Shift::Off);
            }
        }
        Some(after) if after.is_after() => {
            forced.insert(1, Shift::Off);
            let night = after.night_for_after();
            if second == night && third == Some(after) && fourth == night {
                forced.insert(2, Shift::Off);
            }
        }
        _ => {}
    }

    let run = tail
        .iter()
        .rev()
        .take_while(|c| c.is_some_and(Shift::is_work))
        .count() as u32;
    if run >= max_consecutive && !forced.contains_key(&1) {
        forced.insert(1, Shift::Off);
    }

    forced
}

/// Per-staff, per-day locked cells for one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LockSet {
    cells: Vec<Vec<Option<LockedCell>>>,
    carry_over: Vec<BTreeMap<u32, Shift>>,
}

impl LockSet {
    /// Builds the lock set for staff rows in roster order.
    ///
    /// Requests outside the month and implied after/rest request entries
    /// are not locked.
    pub fn build<S: AsRef<str>>(
        staff_ids: &[S],
        days: usize,
        preferences: &Preferences,
        tails: &CarryOverTail,
        max_consecutive: u32,
    ) -> Self {
        let mut cells = vec![vec![None; days]; staff_ids.len()];
        let mut carry_over = Vec::with_capacity(staff_ids.len());

        for (s, id) in staff_ids.iter().enumerate() {
            let id = id.as_ref();
            let forced = tails
                .tail(id)
                .map(|t| derive_carry_over(t, max_consecutive))
                .unwrap_or_default();
            for (&day, &shift) in &forced {
                let d = day as usize - 1;
                if d < days {
                    cells[s][d] = Some(LockedCell {
                        shift,
                        source: LockSource::CarryOver,
                    });
                }
            }

            for entry in preferences.classified(id) {
                if entry.kind != RequestKind::Direct {
                    continue;
                }
                if entry.day == 0 || entry.day as usize > days {
                    tracing::warn!(
                        event = "request_out_of_range",
                        staff = id,
                        day = entry.day,
                        "request ignored"
                    );
                    continue;
                }
                let slot = &mut cells[s][entry.day as usize - 1];
                if slot.is_none() {
                    *slot = Some(LockedCell {
                        shift: entry.shift,
                        source: LockSource::Request,
                    });
                }
            }
            carry_over.push(forced);
        }

        Self { cells, carry_over }
    }

    /// Lock on a cell, if any.
    #[inline]
    pub fn get(&self, staff: usize, day: usize) -> Option<LockedCell> {
        self.cells.get(staff)?.get(day).copied().flatten()
    }

    /// Whether a cell is locked.
    #[inline]
    pub fn is_locked(&self, staff: usize, day: usize) -> bool {
        self.get(staff, day).is_some()
    }

    /// Forced first-of-month shifts for a staff row (1-based days).
    pub fn carry_over(&self, staff: usize) -> Option<&BTreeMap<u32, Shift>> {
        self.carry_over.get(staff)
    }

    /// Whether a 0-based day of a staff row is covered by carry-over.
    pub fn is_carry_over_day(&self, staff: usize, day: usize) -> bool {
        self.carry_over
            .get(staff)
            .is_some_and(|m| m.contains_key(&(day as u32 + 1)))
    }

    /// All locked cells as `(staff, day, lock)`.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, LockedCell)> + '_ {
        self.cells.iter().enumerate().flat_map(|(s, row)| {
            row.iter()
                .enumerate()
                .filter_map(move |(d, c)| c.map(|lock| (s, d, lock)))
        })
    }

    /// Number of locked cells.
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    /// Whether nothing is locked.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Locked cells whose value in `schedule` differs from the lock.
    /// Rows are matched by position.
    pub fn mismatches(&self, schedule: &Schedule) -> Vec<LockMismatch> {
        self.iter()
            .filter_map(|(s, d, lock)| {
                let actual = schedule
                    .rows
                    .get(s)
                    .and_then(|r| r.cells.get(d))
                    .and_then(|c| c.shift);
                (actual != Some(lock.shift)).then_some(LockMismatch {
                    staff: s,
                    day: d,
                    expected: lock.shift,
                    actual,
                    source: lock.source,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::models::Shift::{
        Day as D, MgmtNight as M, MgmtNightAfter as MA, Night as N, NightAfter as A, Off as O,
    };

    fn tail(shifts: &[Shift]) -> Vec<Option<Shift>> {
        shifts.iter().copied().map(Some).collect()
    }

    #[test]
    fn test_ends_on_night() {
        let f = derive_carry_over(&tail(&[D, O, N]), 5);
        assert_eq!(f.get(&1), Some(&A));
        assert_eq!(f.get(&2), Some(&O));
        assert_eq!(f.get(&3), None);
    }

    #[test]
    fn test_ends_on_second_night_cycle() {
        let f = derive_carry_over(&tail(&[O, N, A, N]), 5);
        assert_eq!(f.get(&1), Some(&A));
        assert_eq!(f.get(&2), Some(&O));
        assert_eq!(f.get(&3), Some(&O));
    }

    #[test]
    fn test_ends_on_after() {
        let f = derive_carry_over(&tail(&[D, D, N, A]), 5);
        assert_eq!(f.get(&1), Some(&O));
        assert_eq!(f.get(&2), None);
    }

    #[test]
    fn test_ends_on_two_cycles() {
        let f = derive_carry_over(&tail(&[D, N, A, N, A]), 5);
        assert_eq!(f.get(&1), Some(&O));
        assert_eq!(f.get(&2), Some(&O));
    }

    #[test]
    fn test_management_night_pair() {
        let f = derive_carry_over(&tail(&[D, M]), 5);
        assert_eq!(f.get(&1), Some(&MA));
        let f = derive_carry_over(&tail(&[M, MA]), 5);
        assert_eq!(f.get(&1), Some(&O));
    }

    #[test]
    fn test_long_work_run() {
        let f = derive_carry_over(&tail(&[O, D, D, D, D, D]), 5);
        assert_eq!(f.get(&1), Some(&O));
        let f = derive_carry_over(&tail(&[O, O, D, D, D, D]), 5);
        assert!(f.is_empty());
    }

    #[test]
    fn test_long_run_threshold_is_the_consecutive_cap() {
        // The run length that forces day 1 off moves with the configured
        // cap; it is not a fixed length.
        let four = tail(&[O, D, D, D, D]);
        assert!(derive_carry_over(&four, 5).is_empty());
        assert_eq!(derive_carry_over(&four, 4).get(&1), Some(&O));
        assert_eq!(derive_carry_over(&four, 3).get(&1), Some(&O));
        let five = tail(&[O, D, D, D, D, D]);
        assert!(derive_carry_over(&five, 6).is_empty());
    }

    #[test]
    fn test_malformed_tail_is_harmless() {
        let f = derive_carry_over(&[None, None], 5);
        assert!(f.is_empty());
        assert!(derive_carry_over(&[], 5).is_empty());
    }

    #[test]
    fn test_lock_set_priority() {
        let prefs = Preferences::new()
            .with("a", 1, Shift::Day) // superseded by carry-over
            .with("a", 10, Shift::Night)
            .with("a", 11, Shift::NightAfter) // implied, not locked
            .with("b", 40, Shift::Off); // out of range
        let tails = CarryOverTail::new().with("a", tail(&[D, N]));
        let locks = LockSet::build(&["a", "b"], 30, &prefs, &tails, 5);

        assert_eq!(locks.get(0, 0).unwrap().source, LockSource::CarryOver);
        assert_eq!(locks.get(0, 0).unwrap().shift, A);
        assert_eq!(locks.get(0, 9).unwrap().shift, N);
        assert!(!locks.is_locked(0, 10));
        assert!(locks.is_carry_over_day(0, 1));
        assert!(!locks.is_carry_over_day(1, 0));
        assert_eq!(locks.len(), 3);
    }

    #[test]
    fn test_mismatches() {
        let prefs = Preferences::new().with("a", 2, Shift::Off);
        let locks = LockSet::build(&["a"], 30, &prefs, &CarryOverTail::new(), 5);
        let mut schedule = Schedule::empty(2025, 4, 30, ["a"]);
        assert_eq!(locks.mismatches(&schedule).len(), 1);
        schedule.rows[0].cells[1].shift = Some(Shift::Off);
        assert!(locks.mismatches(&schedule).is_empty());
    }
}
