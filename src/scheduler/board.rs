//! Lock-aware working grid.
//!
//! Every write goes through [`Board::set`], which refuses locked cells, so
//! no phase can overwrite a request or carry-over cell. Writes are recorded
//! in an undo journal: trial moves are rolled back by popping the journal
//! instead of cloning the grid.

use crate::locking::{LockSet, LockSource};
use crate::models::{Cell, MonthCalendar, Provenance, Schedule, Shift, StaffRow};

/// One recorded write.
#[derive(Debug, Clone, Copy)]
struct Change {
    staff: usize,
    day: usize,
    prev: Cell,
}

/// Journal position returned by [`Board::checkpoint`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Checkpoint(usize);

/// Working grid for one candidate.
#[derive(Debug, Clone)]
pub struct Board<'a> {
    cells: Vec<Vec<Cell>>,
    locks: &'a LockSet,
    journal: Vec<Change>,
}

impl<'a> Board<'a> {
    /// Creates an empty grid.
    pub fn new(staff_count: usize, days: usize, locks: &'a LockSet) -> Self {
        Self {
            cells: vec![vec![Cell::default(); days]; staff_count],
            locks,
            journal: Vec::new(),
        }
    }

    /// Number of staff rows.
    #[inline]
    pub fn staff_count(&self) -> usize {
        self.cells.len()
    }

    /// Number of days.
    #[inline]
    pub fn days(&self) -> usize {
        self.cells.first().map_or(0, Vec::len)
    }

    /// Shift at a cell (`None` when unassigned or out of range).
    #[inline]
    pub fn get(&self, staff: usize, day: usize) -> Option<Shift> {
        self.cells.get(staff)?.get(day)?.shift
    }

    /// Full cell.
    #[inline]
    pub fn cell(&self, staff: usize, day: usize) -> Cell {
        self.cells[staff][day]
    }

    /// A staff row.
    #[inline]
    pub fn row(&self, staff: usize) -> &[Cell] {
        &self.cells[staff]
    }

    /// Whether a cell is locked.
    #[inline]
    pub fn is_locked(&self, staff: usize, day: usize) -> bool {
        self.locks.is_locked(staff, day)
    }

    /// Whether ordinary phases may rewrite a cell: unlocked and not
    /// derived from a night.
    #[inline]
    pub fn is_movable(&self, staff: usize, day: usize) -> bool {
        !self.is_locked(staff, day) && !self.cells[staff][day].provenance.is_derived()
    }

    /// Whether a cell is the unlocked, derived day off that follows a
    /// night's after-shift.
    pub fn is_rest_day(&self, staff: usize, day: usize) -> bool {
        let cell = self.cells[staff][day];
        !self.is_locked(staff, day) && cell.shift == Some(Shift::Off) && cell.provenance.is_derived()
    }

    /// Writes a cell. Returns `false` (and writes nothing) when the cell
    /// is locked or out of range.
    pub fn set(&mut self, staff: usize, day: usize, shift: Option<Shift>, provenance: Provenance) -> bool {
        if day >= self.days() || staff >= self.staff_count() || self.is_locked(staff, day) {
            return false;
        }
        self.write(staff, day, Cell::new(shift, provenance));
        true
    }

    /// Writes a generated shift.
    #[inline]
    pub fn assign(&mut self, staff: usize, day: usize, shift: Shift) -> bool {
        self.set(staff, day, Some(shift), Provenance::Generated)
    }

    /// Writes every locked value with its provenance. The only write path
    /// that touches locked cells.
    pub fn apply_locks(&mut self) {
        let locks = self.locks;
        for (s, d, lock) in locks.iter() {
            let provenance = match lock.source {
                LockSource::CarryOver => Provenance::CarryOver,
                LockSource::Request => Provenance::Requested,
            };
            if s < self.staff_count() && d < self.days() {
                self.write(s, d, Cell::new(Some(lock.shift), provenance));
            }
        }
    }

    fn write(&mut self, staff: usize, day: usize, cell: Cell) {
        let prev = self.cells[staff][day];
        if prev != cell {
            self.journal.push(Change { staff, day, prev });
            self.cells[staff][day] = cell;
        }
    }

    /// Current journal position.
    #[inline]
    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint(self.journal.len())
    }

    /// Undoes every write made after `cp`.
    pub fn rollback(&mut self, cp: Checkpoint) {
        while self.journal.len() > cp.0 {
            if let Some(change) = self.journal.pop() {
                self.cells[change.staff][change.day] = change.prev;
            }
        }
    }

    /// Drops undo history; writes before this point can no longer be
    /// rolled back.
    pub fn clear_journal(&mut self) {
        self.journal.clear();
    }

    /// Writes a night and its after-shift on the next day.
    ///
    /// The after-shift is skipped when the next day is locked (a locked
    /// after-shift already holds the right value). Returns `false` when
    /// the night cell itself is locked.
    pub fn place_night(&mut self, staff: usize, day: usize, night: Shift) -> bool {
        if !self.assign(staff, day, night) {
            return false;
        }
        if let Some(after) = night.after_shift() {
            let next = day + 1;
            if next < self.days() && !self.is_locked(staff, next) {
                let replaced = self.get(staff, next);
                self.set(
                    staff,
                    next,
                    Some(after),
                    Provenance::Derived {
                        night_day: day,
                        replaced,
                    },
                );
            }
        }
        true
    }

    /// Writes the rest day two days after the night on `night_day` when
    /// that cell is empty or already off and not locked.
    pub fn place_rest(&mut self, staff: usize, night_day: usize) -> bool {
        let rest = night_day + 2;
        if rest >= self.days() || self.is_locked(staff, rest) {
            return false;
        }
        let current = self.get(staff, rest);
        if !matches!(current, None | Some(Shift::Off)) || !self.is_movable(staff, rest) {
            return false;
        }
        self.set(
            staff,
            rest,
            Some(Shift::Off),
            Provenance::Derived {
                night_day,
                replaced: current,
            },
        )
    }

    /// Replaces the night on `day` and restores the cells derived from it
    /// to the values they replaced.
    pub fn release_night(&mut self, staff: usize, day: usize, replacement: Option<Shift>) -> bool {
        if !self.assign_opt(staff, day, replacement) {
            return false;
        }
        for next in [day + 1, day + 2] {
            if next >= self.days() {
                continue;
            }
            if let Provenance::Derived { night_day, replaced } = self.cells[staff][next].provenance {
                if night_day == day {
                    self.set(staff, next, replaced, Provenance::Generated);
                }
            }
        }
        true
    }

    fn assign_opt(&mut self, staff: usize, day: usize, shift: Option<Shift>) -> bool {
        self.set(staff, day, shift, Provenance::Generated)
    }

    /// Staff count holding `shift` on a day.
    pub fn count_on_day(&self, day: usize, shift: Shift) -> u32 {
        self.cells
            .iter()
            .filter(|row| row[day].shift == Some(shift))
            .count() as u32
    }

    /// Ward night headcount on a day.
    #[inline]
    pub fn night_count(&self, day: usize) -> u32 {
        self.count_on_day(day, Shift::Night)
    }

    /// Day-shift headcount on a day.
    #[inline]
    pub fn day_count(&self, day: usize) -> u32 {
        self.count_on_day(day, Shift::Day)
    }

    fn count_row(&self, staff: usize, pred: impl Fn(Shift) -> bool) -> u32 {
        self.cells[staff]
            .iter()
            .filter(|c| c.shift.is_some_and(&pred))
            .count() as u32
    }

    /// Nights of either variant for a staff row.
    pub fn nights(&self, staff: usize) -> u32 {
        self.count_row(staff, Shift::is_night)
    }

    /// Day shifts for a staff row.
    pub fn day_shifts(&self, staff: usize) -> u32 {
        self.count_row(staff, |s| s == Shift::Day)
    }

    /// Days off (off and paid leave) for a staff row.
    pub fn days_off(&self, staff: usize) -> u32 {
        self.count_row(staff, Shift::is_day_off)
    }

    /// Work days of any kind for a staff row.
    pub fn total_work(&self, staff: usize) -> u32 {
        self.count_row(staff, Shift::is_work)
    }

    /// Work days on weekends or holidays.
    pub fn weekend_work(&self, staff: usize, calendar: &MonthCalendar) -> u32 {
        self.cells[staff]
            .iter()
            .enumerate()
            .filter(|(d, c)| c.shift.is_some_and(Shift::is_work) && calendar.is_weekend_or_holiday(*d))
            .count() as u32
    }

    /// Whether the cell holds a work shift.
    #[inline]
    pub fn is_work(&self, staff: usize, day: usize) -> bool {
        self.get(staff, day).is_some_and(Shift::is_work)
    }

    /// Whether the cell holds either night variant.
    #[inline]
    pub fn is_night(&self, staff: usize, day: usize) -> bool {
        self.get(staff, day).is_some_and(Shift::is_night)
    }

    /// Length of the work run that `day` would belong to if it were a
    /// work day, given the current neighbours.
    pub fn run_through(&self, staff: usize, day: usize) -> u32 {
        let before = (0..day).rev().take_while(|&d| self.is_work(staff, d)).count();
        let after = (day + 1..self.days())
            .take_while(|&d| self.is_work(staff, d))
            .count();
        (before + 1 + after) as u32
    }

    /// Length of the work run ending on the day before `day`.
    pub fn run_before(&self, staff: usize, day: usize) -> u32 {
        (0..day).rev().take_while(|&d| self.is_work(staff, d)).count() as u32
    }

    /// Longest work run in a staff row.
    pub fn max_run(&self, staff: usize) -> u32 {
        let mut best = 0;
        let mut run = 0;
        for c in &self.cells[staff] {
            if c.shift.is_some_and(Shift::is_work) {
                run += 1;
                best = best.max(run);
            } else {
                run = 0;
            }
        }
        best
    }

    /// Copies the grid into a schedule with rows named by `staff_ids`.
    pub fn to_schedule<S: AsRef<str>>(&self, year: i32, month: u32, staff_ids: &[S]) -> Schedule {
        let rows = staff_ids
            .iter()
            .zip(&self.cells)
            .map(|(id, cells)| StaffRow {
                staff_id: id.as_ref().to_string(),
                cells: cells.clone(),
            })
            .collect();
        Schedule { year, month, rows }
    }

    /// Shift values only.
    pub fn shift_grid(&self) -> Vec<Vec<Option<Shift>>> {
        self.cells
            .iter()
            .map(|row| row.iter().map(|c| c.shift).collect())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CarryOverTail, Preferences};

    fn locks(prefs: &Preferences, days: usize) -> LockSet {
        LockSet::build(&["a", "b"], days, prefs, &CarryOverTail::new(), 5)
    }

    #[test]
    fn test_set_refuses_locked() {
        let prefs = Preferences::new().with("a", 3, Shift::Off);
        let locks = locks(&prefs, 30);
        let mut board = Board::new(2, 30, &locks);
        board.apply_locks();
        assert_eq!(board.get(0, 2), Some(Shift::Off));
        assert!(!board.assign(0, 2, Shift::Day));
        assert_eq!(board.get(0, 2), Some(Shift::Off));
        assert_eq!(board.cell(0, 2).provenance, Provenance::Requested);
        assert!(board.assign(1, 2, Shift::Day));
    }

    #[test]
    fn test_rollback() {
        let locks = locks(&Preferences::new(), 30);
        let mut board = Board::new(2, 30, &locks);
        board.assign(0, 0, Shift::Day);
        let cp = board.checkpoint();
        board.assign(0, 0, Shift::Off);
        board.assign(1, 5, Shift::Day);
        board.rollback(cp);
        assert_eq!(board.get(0, 0), Some(Shift::Day));
        assert_eq!(board.get(1, 5), None);
    }

    #[test]
    fn test_place_and_release_night() {
        let locks = locks(&Preferences::new(), 30);
        let mut board = Board::new(2, 30, &locks);
        board.assign(0, 6, Shift::Day);
        assert!(board.place_night(0, 5, Shift::Night));
        assert!(board.place_rest(0, 5));
        assert_eq!(board.get(0, 6), Some(Shift::NightAfter));
        assert_eq!(board.get(0, 7), Some(Shift::Off));
        assert!(board.cell(0, 6).provenance.is_derived_from(5));
        assert!(!board.is_movable(0, 7));

        assert!(board.release_night(0, 5, Some(Shift::Day)));
        assert_eq!(board.get(0, 5), Some(Shift::Day));
        assert_eq!(board.get(0, 6), Some(Shift::Day));
        assert_eq!(board.get(0, 7), None);
    }

    #[test]
    fn test_night_before_locked_after() {
        let prefs = Preferences::new().with("a", 11, Shift::Off);
        let locks = locks(&prefs, 30);
        let mut board = Board::new(2, 30, &locks);
        board.apply_locks();
        assert!(board.place_night(0, 9, Shift::Night));
        assert_eq!(board.get(0, 10), Some(Shift::Off));
    }

    #[test]
    fn test_runs_and_counts() {
        let locks = locks(&Preferences::new(), 10);
        let mut board = Board::new(2, 10, &locks);
        for d in [0, 1, 2, 4, 5] {
            board.assign(0, d, Shift::Day);
        }
        board.assign(0, 3, Shift::Off);
        assert_eq!(board.max_run(0), 3);
        assert_eq!(board.run_through(0, 3), 6);
        assert_eq!(board.run_before(0, 3), 3);
        assert_eq!(board.day_shifts(0), 5);
        assert_eq!(board.days_off(0), 1);
        assert_eq!(board.day_count(0), 1);
    }
}
