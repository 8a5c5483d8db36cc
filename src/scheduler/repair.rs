//! Phase 4: ordered repair sweeps.
//!
//! # Sweeps
//!
//! | Step | Sweep |
//! |------|-------|
//! | a | Night headcount exact match |
//! | b | Night/after chain integrity |
//! | c | Double night-cycle guard |
//! | d | Personal night cap |
//! | e | Orphan after-shift cleanup |
//! | f | Consecutive work cap |
//! | g | Days-off cap |
//! | h | Day headcount, both directions |
//! | i | Cross-day day-shift swap |
//! | j | Day headcount top-up |
//! | k | Final night headcount (relaxed cap fallback), then the guard again |
//! | l | Final chain cleanup |
//!
//! Steps a and k fall back to the rest day of an earlier night when no
//! other cell can take a short night; the third-cycle check and the guard
//! keep that to one night→after→night→after pair.
//!
//! Every sweep writes through the board, so locked cells are never
//! changed. Each retry loop is bounded by `repair_attempts`; days that
//! stay short are left for the validation report.

use serde::{Deserialize, Serialize};

use super::board::Board;
use super::construct::ensure_deputy_cover;
use super::context::GenerationContext;
use super::eligibility::{
    can_drop_day, can_take_day, can_take_night, can_take_night_over_rest, fill_priority, has_off_room,
};
use crate::models::{Provenance, Shift};

/// Number of cells changed by each sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepairStats {
    /// Nights added or removed (a, k).
    pub night_count: usize,
    /// Chain cells fixed (b, e, l).
    pub chain: usize,
    /// Cells forced off by the double-cycle guard (c).
    pub cycle_guard: usize,
    /// Nights trimmed to the personal cap (d).
    pub night_cap: usize,
    /// Work days turned off to split long runs (f).
    pub consecutive: usize,
    /// Days off turned into day shifts (g).
    pub days_off: usize,
    /// Day-shift headcount changes (h, j).
    pub day_count: usize,
    /// Cross-day swaps (i).
    pub swaps: usize,
}

impl RepairStats {
    /// Total cells changed.
    pub fn total(&self) -> usize {
        self.night_count
            + self.chain
            + self.cycle_guard
            + self.night_cap
            + self.consecutive
            + self.days_off
            + self.day_count
            + self.swaps
    }
}

/// Runs every sweep in order.
pub fn repair(board: &mut Board<'_>, ctx: &GenerationContext, attempts: usize) -> RepairStats {
    let mut stats = RepairStats::default();

    stats.night_count += fix_night_counts(board, ctx, attempts, false); // a
    stats.chain += fix_chains(board, ctx); // b
    stats.cycle_guard += guard_double_cycles(board, ctx); // c
    stats.night_cap += enforce_night_caps(board, ctx); // d
    stats.chain += fix_orphans(board, ctx); // e
    stats.consecutive += enforce_consecutive(board, ctx, attempts); // f
    stats.days_off += enforce_days_off(board, ctx); // g
    stats.day_count += fix_day_counts(board, ctx, attempts); // h
    stats.swaps += cross_day_swaps(board, ctx); // i
    stats.day_count += fix_day_counts(board, ctx, attempts); // j
    stats.night_count += fix_night_counts(board, ctx, attempts, true); // k
    stats.cycle_guard += guard_double_cycles(board, ctx);
    stats.day_count += top_up_days(board, ctx, attempts);
    stats.chain += fix_chains(board, ctx); // l

    board.clear_journal();
    stats
}

/// Value for a work cell being vacated: a day shift when allowed and
/// the run stays within the cap, otherwise a day off.
fn vacated_value(board: &Board<'_>, ctx: &GenerationContext, staff: usize, day: usize) -> Shift {
    if ctx.can_work_day(staff, day) && board.run_through(staff, day) <= ctx.max_consecutive() {
        Shift::Day
    } else {
        Shift::Off
    }
}

/// Removes the night on `day` and fills the cells it frees.
fn remove_night(board: &mut Board<'_>, ctx: &GenerationContext, staff: usize, day: usize, replacement: Option<Shift>) -> bool {
    let replacement = replacement.unwrap_or_else(|| vacated_value(board, ctx, staff, day));
    if !board.release_night(staff, day, Some(replacement)) {
        return false;
    }
    if replacement == Shift::Day && board.run_through(staff, day) > ctx.max_consecutive() {
        board.assign(staff, day, Shift::Off);
    }
    for next in [day + 1, day + 2] {
        if next < board.days() && board.get(staff, next).is_none() {
            let value = vacated_value(board, ctx, staff, next);
            board.assign(staff, next, value);
        }
    }
    true
}

/// Adds or removes ward nights until each day matches its requirement.
fn fix_night_counts(board: &mut Board<'_>, ctx: &GenerationContext, attempts: usize, relaxed: bool) -> usize {
    let mut changes = 0;
    for d in 0..board.days() {
        let required = ctx.requirements[d].night;
        for _ in 0..attempts {
            let count = board.night_count(d);
            if count == required {
                break;
            }
            if count < required {
                let Some(s) = pick_night_candidate(board, ctx, d, relaxed) else {
                    tracing::warn!(event = "night_shortfall", day = d + 1, count, required);
                    break;
                };
                board.place_night(s, d, Shift::Night);
                let rest_free = d + 2 < board.days()
                    && matches!(board.get(s, d + 2), None | Some(Shift::Off))
                    && (board.get(s, d + 2) == Some(Shift::Off) || has_off_room(board, ctx, s));
                if rest_free {
                    board.place_rest(s, d);
                }
            } else {
                let pick = (0..board.staff_count())
                    .filter(|&s| board.get(s, d) == Some(Shift::Night) && !board.is_locked(s, d))
                    .max_by_key(|&s| (board.nights(s), std::cmp::Reverse(s)));
                let Some(s) = pick else {
                    break;
                };
                remove_night(board, ctx, s, d, None);
            }
            changes += 1;
        }
    }
    changes
}

fn pick_night_candidate(board: &Board<'_>, ctx: &GenerationContext, day: usize, relaxed: bool) -> Option<usize> {
    let strict = best_night_candidate(board, ctx, day, 0);
    if strict.is_some() || !relaxed {
        return strict;
    }
    let pick = best_night_candidate(board, ctx, day, 1);
    if pick.is_some() {
        tracing::debug!(event = "relaxed_night_cap", day = day + 1);
    }
    pick
}

/// Best staff row for a night on `day` with caps raised by `extra`.
/// Rest days of earlier nights are only used when no other cell fits.
fn best_night_candidate(board: &Board<'_>, ctx: &GenerationContext, day: usize, extra: u32) -> Option<usize> {
    let key = |s: usize| {
        (
            u8::from(board.get(s, day) == Some(Shift::Day)),
            u8::from(board.get(s, day + 1) == Some(Shift::Day)),
            board.nights(s),
            s,
        )
    };
    let cap = |s: usize| ctx.staff[s].night_cap + extra;
    (0..board.staff_count())
        .filter(|&s| can_take_night(board, ctx, s, day, cap(s)))
        .min_by_key(|&s| key(s))
        .or_else(|| {
            (0..board.staff_count())
                .filter(|&s| can_take_night_over_rest(board, ctx, s, day, cap(s)))
                .min_by_key(|&s| key(s))
        })
}

/// Removes orphan after-shifts, then writes the missing after-shift of
/// every night. One ascending sweep per staff row.
fn fix_chains(board: &mut Board<'_>, ctx: &GenerationContext) -> usize {
    let mut changes = 0;
    let days = board.days();
    for s in 0..board.staff_count() {
        for d in 0..days {
            changes += fix_orphan_at(board, ctx, s, d);
            let Some(after) = board.get(s, d).and_then(Shift::after_shift) else {
                continue;
            };
            if d + 1 < days && !board.is_locked(s, d + 1) && board.get(s, d + 1) != Some(after) {
                let replaced = board.get(s, d + 1);
                board.set(
                    s,
                    d + 1,
                    Some(after),
                    Provenance::Derived {
                        night_day: d,
                        replaced,
                    },
                );
                changes += 1;
            }
        }
    }
    changes
}

/// Turns unlocked after-shifts without their matching night into days off.
fn fix_orphans(board: &mut Board<'_>, ctx: &GenerationContext) -> usize {
    let mut changes = 0;
    for s in 0..board.staff_count() {
        for d in 0..board.days() {
            changes += fix_orphan_at(board, ctx, s, d);
        }
    }
    changes
}

fn fix_orphan_at(board: &mut Board<'_>, ctx: &GenerationContext, staff: usize, day: usize) -> usize {
    let Some(night) = board.get(staff, day).and_then(Shift::night_for_after) else {
        return 0;
    };
    if board.is_locked(staff, day) || (day > 0 && board.get(staff, day - 1) == Some(night)) {
        return 0;
    }
    let value = if has_off_room(board, ctx, staff) {
        Shift::Off
    } else {
        vacated_value(board, ctx, staff, day)
    };
    usize::from(board.assign(staff, day, value))
}

/// After a night→after→night→after run, forces the next day off (and the
/// one after when that day held a night that had to be removed).
fn guard_double_cycles(board: &mut Board<'_>, ctx: &GenerationContext) -> usize {
    let mut changes = 0;
    let days = board.days();
    for s in 0..board.staff_count() {
        for d in 0..days.saturating_sub(4) {
            let cycle = |i: usize| {
                board
                    .get(s, i)
                    .and_then(Shift::after_shift)
                    .is_some_and(|after| board.get(s, i + 1) == Some(after))
            };
            if !(cycle(d) && cycle(d + 2)) {
                continue;
            }
            let guard = d + 4;
            if board.is_locked(s, guard) {
                continue;
            }
            let removed_night = board.is_night(s, guard);
            if removed_night {
                remove_night(board, ctx, s, guard, Some(Shift::Off));
            }
            if force_off(board, s, guard, d + 2) {
                changes += 1;
            }
            if removed_night && guard + 1 < days && !board.is_locked(s, guard + 1) && force_off(board, s, guard + 1, d + 2) {
                changes += 1;
            }
        }
    }
    changes
}

fn force_off(board: &mut Board<'_>, staff: usize, day: usize, night_day: usize) -> bool {
    let cell = board.cell(staff, day);
    if cell.shift == Some(Shift::Off) && cell.provenance.is_derived() {
        return false;
    }
    board.set(
        staff,
        day,
        Some(Shift::Off),
        Provenance::Derived {
            night_day,
            replaced: cell.shift,
        },
    )
}

/// Trims nights beyond the personal cap, latest first.
fn enforce_night_caps(board: &mut Board<'_>, ctx: &GenerationContext) -> usize {
    let mut changes = 0;
    for s in 0..board.staff_count() {
        let cap = ctx.staff[s].night_cap;
        while board.nights(s) > cap {
            let last = (0..board.days())
                .rev()
                .find(|&d| board.is_night(s, d) && !board.is_locked(s, d));
            let Some(d) = last else {
                break;
            };
            remove_night(board, ctx, s, d, Some(Shift::Off));
            changes += 1;
        }
    }
    changes
}

/// Splits work runs longer than the cap by turning a movable day shift
/// inside the run into a day off.
fn enforce_consecutive(board: &mut Board<'_>, ctx: &GenerationContext, attempts: usize) -> usize {
    let cap = ctx.max_consecutive() as usize;
    let mut changes = 0;
    for s in 0..board.staff_count() {
        for _ in 0..attempts {
            let Some((start, end)) = first_long_run(board, s, cap) else {
                break;
            };
            // Prefer the first day beyond the cap, then walk back, then forward.
            let pivot = start + cap;
            let order = (start..=pivot).rev().chain(pivot + 1..=end);
            let pick = order
                .filter(|&d| d <= end)
                .find(|&d| board.get(s, d) == Some(Shift::Day) && board.is_movable(s, d));
            let Some(d) = pick else {
                tracing::warn!(event = "run_unsplittable", staff = %ctx.staff[s].id, start = start + 1, end = end + 1);
                break;
            };
            board.assign(s, d, Shift::Off);
            changes += 1;
        }
    }
    changes
}

fn first_long_run(board: &Board<'_>, staff: usize, cap: usize) -> Option<(usize, usize)> {
    let mut start = 0;
    let mut len = 0;
    for d in 0..board.days() {
        if board.is_work(staff, d) {
            if len == 0 {
                start = d;
            }
            len += 1;
        } else {
            if len > cap {
                return Some((start, d - 1));
            }
            len = 0;
        }
    }
    (len > cap).then(|| (start, board.days() - 1))
}

/// Turns excess days off back into day shifts, latest first.
fn enforce_days_off(board: &mut Board<'_>, ctx: &GenerationContext) -> usize {
    let mut changes = 0;
    for s in 0..board.staff_count() {
        let Some(cap) = ctx.off_cap(s) else {
            continue;
        };
        while board.days_off(s) > cap {
            let pick = (0..board.days())
                .rev()
                .find(|&d| board.get(s, d) == Some(Shift::Off) && can_take_day(board, ctx, s, d));
            let Some(d) = pick else {
                break;
            };
            board.assign(s, d, Shift::Day);
            changes += 1;
        }
    }
    changes
}

/// Pulls staff onto short days and sends staff off on over-allowance days.
fn fix_day_counts(board: &mut Board<'_>, ctx: &GenerationContext, attempts: usize) -> usize {
    let mut changes = top_up_days(board, ctx, attempts);
    for d in 0..board.days() {
        let allowance = ctx.requirements[d].day_allowance;
        for _ in 0..attempts {
            if board.day_count(d) <= allowance {
                break;
            }
            let pick = (0..board.staff_count())
                .filter(|&s| can_drop_day(board, ctx, s, d))
                .filter(|&s| !keeps_deputy_cover(board, ctx, s, d))
                .max_by_key(|&s| (ctx.staff[s].rank.priority(), board.day_shifts(s), std::cmp::Reverse(s)));
            let Some(s) = pick else {
                break;
            };
            board.assign(s, d, Shift::Off);
            changes += 1;
        }
    }
    changes
}

/// Whether `staff` is the only chief/deputy on day shift while the head is
/// not working days.
fn keeps_deputy_cover(board: &Board<'_>, ctx: &GenerationContext, staff: usize, day: usize) -> bool {
    let Some(head) = ctx.head() else {
        return false;
    };
    if !ctx.staff[staff].rank.is_management() || board.get(head, day) == Some(Shift::Day) {
        return false;
    }
    (0..board.staff_count())
        .filter(|&s| s != staff && ctx.staff[s].rank.is_management())
        .all(|s| board.get(s, day) != Some(Shift::Day))
}

/// Brings short days up to their day-shift target.
fn top_up_days(board: &mut Board<'_>, ctx: &GenerationContext, attempts: usize) -> usize {
    let mut changes = 0;
    for d in 0..board.days() {
        let target = ctx.requirements[d].day;
        for _ in 0..attempts {
            if board.day_count(d) >= target {
                break;
            }
            let pick = (0..board.staff_count())
                .filter(|&s| can_take_day(board, ctx, s, d))
                .min_by_key(|&s| fill_priority(board, ctx, s));
            let Some(s) = pick else {
                tracing::debug!(event = "day_shortfall", day = d + 1, count = board.day_count(d), target);
                break;
            };
            board.assign(s, d, Shift::Day);
            changes += 1;
        }
        ensure_deputy_cover(board, ctx, d);
    }
    changes
}

/// Moves day shifts from days above target to days below it.
fn cross_day_swaps(board: &mut Board<'_>, ctx: &GenerationContext) -> usize {
    let mut swaps = 0;
    let days = board.days();
    for short in 0..days {
        if board.day_count(short) >= ctx.requirements[short].day {
            continue;
        }
        'search: for over in 0..days {
            if over == short || board.day_count(over) <= ctx.requirements[over].day {
                continue;
            }
            for s in 0..board.staff_count() {
                let fits = board.get(s, over) == Some(Shift::Day)
                    && board.is_movable(s, over)
                    && board.get(s, short) == Some(Shift::Off)
                    && board.is_movable(s, short)
                    && ctx.can_work_day(s, short)
                    && !keeps_deputy_cover(board, ctx, s, over);
                if !fits {
                    continue;
                }
                let cp = board.checkpoint();
                board.assign(s, over, Shift::Off);
                board.assign(s, short, Shift::Day);
                if board.run_through(s, short) <= ctx.max_consecutive() {
                    swaps += 1;
                    break 'search;
                }
                board.rollback(cp);
            }
        }
    }
    swaps
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locking::LockSet;
    use crate::models::{CarryOverTail, GenerationConfig, Preferences, Staff, StaffOverrides};
    use crate::scheduler::construct::build_candidate;
    use crate::scheduler::GenerationRequest;

    fn ctx_with(staff: usize, config: GenerationConfig) -> GenerationContext {
        let roster = (0..staff).map(|i| Staff::new(format!("n{i}"))).collect();
        GenerationContext::resolve(&GenerationRequest::new(2025, 4, roster).with_config(config)).unwrap()
    }

    fn all_off<'a>(locks: &'a LockSet, staff: usize) -> Board<'a> {
        let mut board = Board::new(staff, 30, locks);
        for s in 0..staff {
            for d in 0..30 {
                board.assign(s, d, Shift::Off);
            }
        }
        board
    }

    #[test]
    fn test_night_counts_filled_and_trimmed() {
        let config = GenerationConfig::default()
            .with_night_pattern(vec![1])
            .with_max_night_shifts(10)
            .with_max_days_off(30);
        let ctx = ctx_with(6, config);
        let mut board = all_off(&ctx.locks, 6);
        board.place_night(0, 3, Shift::Night);
        board.place_night(1, 3, Shift::Night);
        fix_night_counts(&mut board, &ctx, 20, false);
        for d in 0..30 {
            assert_eq!(board.night_count(d), 1, "day {d}");
        }
    }

    #[test]
    fn test_short_night_taken_on_rest_day() {
        let config = GenerationConfig::default()
            .with_night_pattern(vec![2])
            .with_max_night_shifts(15)
            .with_max_days_off(30);
        let ctx = ctx_with(5, config);
        let mut board = all_off(&ctx.locks, 5);
        fix_night_counts(&mut board, &ctx, 20, false);
        for d in 0..30 {
            assert_eq!(board.night_count(d), 2, "day {d}");
        }
        let n0: Vec<Option<Shift>> = (0..5).map(|d| board.get(0, d)).collect();
        assert_eq!(
            n0,
            [
                Some(Shift::Night),
                Some(Shift::NightAfter),
                Some(Shift::Night),
                Some(Shift::NightAfter),
                Some(Shift::Off)
            ]
        );
        assert!(board.is_rest_day(0, 4));
        assert_eq!(guard_double_cycles(&mut board, &ctx), 0);
    }

    #[test]
    fn test_chain_repair() {
        let ctx = ctx_with(2, GenerationConfig::default().with_max_days_off(30));
        let mut board = all_off(&ctx.locks, 2);
        board.assign(0, 4, Shift::Night); // missing after
        board.assign(1, 9, Shift::NightAfter); // orphan
        board.assign(1, 15, Shift::MgmtNight);
        board.assign(1, 16, Shift::NightAfter); // wrong variant
        fix_chains(&mut board, &ctx);
        assert_eq!(board.get(0, 5), Some(Shift::NightAfter));
        assert_eq!(board.get(1, 9), Some(Shift::Off));
        assert_eq!(board.get(1, 16), Some(Shift::MgmtNightAfter));
    }

    #[test]
    fn test_double_cycle_guard() {
        let ctx = ctx_with(1, GenerationConfig::default().with_max_days_off(30));
        let mut board = all_off(&ctx.locks, 1);
        board.place_night(0, 2, Shift::Night);
        board.place_night(0, 4, Shift::Night);
        board.place_night(0, 6, Shift::Night);
        assert_eq!(guard_double_cycles(&mut board, &ctx), 2);
        assert_eq!(board.get(0, 6), Some(Shift::Off));
        assert_eq!(board.get(0, 7), Some(Shift::Off));
        assert_eq!(board.nights(0), 2);
    }

    #[test]
    fn test_night_cap_trims_latest() {
        let config = GenerationConfig::default().with_max_days_off(30);
        let roster = vec![Staff::new("a")];
        let req = GenerationRequest::new(2025, 4, roster)
            .with_config(config)
            .with_override("a", StaffOverrides::default().with_max_night_shifts(1));
        let ctx = GenerationContext::resolve(&req).unwrap();
        let mut board = all_off(&ctx.locks, 1);
        board.place_night(0, 2, Shift::Night);
        board.place_night(0, 20, Shift::Night);
        assert_eq!(enforce_night_caps(&mut board, &ctx), 1);
        assert!(board.is_night(0, 2));
        assert!(!board.is_night(0, 20));
        assert_ne!(board.get(0, 21), Some(Shift::NightAfter));
    }

    #[test]
    fn test_long_run_split() {
        let config = GenerationConfig::default()
            .with_max_consecutive_days(3)
            .with_max_days_off(30);
        let ctx = ctx_with(1, config);
        let mut board = all_off(&ctx.locks, 1);
        for d in 0..8 {
            board.assign(0, d, Shift::Day);
        }
        enforce_consecutive(&mut board, &ctx, 20);
        assert!(board.max_run(0) <= 3);
    }

    #[test]
    fn test_days_off_cap() {
        let ctx = ctx_with(1, GenerationConfig::default().with_max_days_off(10));
        let mut board = all_off(&ctx.locks, 1);
        enforce_days_off(&mut board, &ctx);
        assert_eq!(board.days_off(0), 10);
        assert!(board.max_run(0) <= 5);
    }

    #[test]
    fn test_locked_cells_survive_repair() {
        let roster: Vec<Staff> = (0..12).map(|i| Staff::new(format!("n{i}"))).collect();
        let prefs = Preferences::new()
            .with("n0", 1, Shift::Day)
            .with("n0", 2, Shift::Day)
            .with("n3", 12, Shift::Off);
        let tails = CarryOverTail::new().with("n1", vec![Some(Shift::Night), Some(Shift::NightAfter)]);
        let req = GenerationRequest::new(2025, 4, roster)
            .with_preferences(prefs)
            .with_carry_over(tails)
            .with_config(GenerationConfig::default().with_max_night_shifts(8).with_day_staff(5, 3, 3, 3));
        let ctx = GenerationContext::resolve(&req).unwrap();
        let mut board = build_candidate(&ctx, 1);
        repair(&mut board, &ctx, 20);
        let schedule = board.to_schedule(2025, 4, &ctx.staff_ids());
        assert!(ctx.locks.mismatches(&schedule).is_empty());
        assert_eq!(board.get(1, 0), Some(Shift::Off));
    }
}
