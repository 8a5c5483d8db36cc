//! Phase 1: request-seeded greedy construction.
//!
//! # Algorithm
//!
//! 1. Write every locked cell (carry-over first, then direct requests).
//! 2. For each requested night, write its after-shift and rest day into
//!    cells that are still empty and unlocked.
//! 3. Place random days off up to each staff member's off target (the
//!    days-off cap minus the rest days their nights are expected to
//!    bring; two extra for staff with three or more paid-leave requests).
//! 4. Assign ward nights day by day to eligible staff, fewest nights
//!    first, then staff whose rest day is free, then lowest weekend load
//!    (weekends/holidays) or total load (weekdays). When empty cells run
//!    out, the rest day of an earlier night may take a second night.
//! 5. Assign day shifts day by day up to the target, fewest day shifts
//!    first. When the head is not on day shift, make sure a chief or
//!    deputy chief is.
//! 6. Fill the remaining empty cells: bring short days up to target,
//!    then decide day vs. off per cell from the staff member's running
//!    totals, then top up any day still short.
//!
//! All random choices come from one [`ChaCha8Rng`] seeded per candidate,
//! so a seed reproduces its candidate exactly.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use super::board::Board;
use super::context::GenerationContext;
use super::eligibility::{can_take_day, can_take_night, can_take_night_over_rest, fill_priority, has_off_room};
use crate::models::{Provenance, Shift};

/// Attempts at placing each staff member's random days off.
const OFF_PLACEMENT_ATTEMPTS: usize = 100;

/// Extra off target for staff with many paid-leave requests.
const PAID_LEAVE_BONUS: u32 = 2;
const PAID_LEAVE_BONUS_THRESHOLD: usize = 3;

/// Builds one candidate from a seed.
pub fn build_candidate(ctx: &GenerationContext, seed: u64) -> Board<'_> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut board = Board::new(ctx.staff_count(), ctx.days(), &ctx.locks);

    board.apply_locks();
    derive_request_chains(&mut board);
    place_random_offs(&mut board, ctx, &mut rng);
    assign_nights(&mut board, ctx, &mut rng);
    assign_days(&mut board, ctx, &mut rng);
    fill_remaining(&mut board, ctx);

    board.clear_journal();
    board
}

/// Writes after-shift and rest day for locked nights into free cells.
fn derive_request_chains(board: &mut Board<'_>) {
    let days = board.days();
    for s in 0..board.staff_count() {
        for d in 0..days {
            if !board.is_locked(s, d) {
                continue;
            }
            let Some(after) = board.get(s, d).and_then(Shift::after_shift) else {
                continue;
            };
            if d + 1 < days && !board.is_locked(s, d + 1) && board.get(s, d + 1).is_none() {
                board.set(s, d + 1, Some(after), Provenance::derived(d));
            }
            board.place_rest(s, d);
        }
    }
}

/// Nights each night-eligible staff member is expected to work.
fn expected_nights(ctx: &GenerationContext) -> u32 {
    let total: u32 = ctx.requirements.iter().map(|r| r.night).sum();
    let eligible = ctx.staff.iter().filter(|s| s.night_cap > 0).count() as u32;
    if eligible == 0 {
        0
    } else {
        total.div_ceil(eligible)
    }
}

fn place_random_offs(board: &mut Board<'_>, ctx: &GenerationContext, rng: &mut ChaCha8Rng) {
    let days = board.days();
    let per_staff_nights = expected_nights(ctx);
    for s in 0..board.staff_count() {
        let rules = &ctx.staff[s];
        let cap = ctx.config.max_days_off;
        let expected_rest = per_staff_nights.min(rules.night_cap);
        let mut target = cap.saturating_sub(expected_rest);
        if rules.paid_leave_requests >= PAID_LEAVE_BONUS_THRESHOLD {
            target = (target + PAID_LEAVE_BONUS).min(cap);
        }

        for _ in 0..OFF_PLACEMENT_ATTEMPTS {
            if board.days_off(s) >= target {
                break;
            }
            let d = rng.random_range(0..days);
            if board.get(s, d).is_none() && board.is_movable(s, d) {
                board.assign(s, d, Shift::Off);
            }
        }
    }
}

fn assign_nights(board: &mut Board<'_>, ctx: &GenerationContext, rng: &mut ChaCha8Rng) {
    for d in 0..board.days() {
        let required = ctx.requirements[d].night;
        let existing = board.night_count(d);
        if existing >= required {
            continue;
        }
        let weekend = ctx.calendar.is_weekend_or_holiday(d);
        let need = (required - existing) as usize;
        let mut placed = 0;

        // Rest days of earlier nights only when empty cells run out.
        for over_rest in [false, true] {
            if placed >= need {
                break;
            }
            let mut candidates: Vec<((u32, u8, u32, u32), usize)> = Vec::new();
            for s in 0..board.staff_count() {
                let tiebreak: u32 = rng.random();
                let cap = ctx.staff[s].night_cap;
                let fits = if over_rest {
                    can_take_night_over_rest(board, ctx, s, d, cap)
                } else {
                    board.get(s, d).is_none() && can_take_night(board, ctx, s, d, cap)
                };
                if !fits {
                    continue;
                }
                let rest_free = d + 2 >= board.days() || (board.get(s, d + 2).is_none() && !board.is_locked(s, d + 2));
                let load = if weekend {
                    board.weekend_work(s, &ctx.calendar)
                } else {
                    board.total_work(s)
                };
                candidates.push(((board.nights(s), u8::from(!rest_free), load, tiebreak), s));
            }
            candidates.sort();

            for &(_, s) in candidates.iter().take(need - placed) {
                board.place_night(s, d, Shift::Night);
                board.place_rest(s, d);
                placed += 1;
            }
        }
        if placed < need {
            tracing::debug!(event = "night_shortfall", day = d + 1, missing = need - placed);
        }
    }
}

fn assign_days(board: &mut Board<'_>, ctx: &GenerationContext, rng: &mut ChaCha8Rng) {
    for d in 0..board.days() {
        let required = ctx.requirements[d].day;
        let existing = board.day_count(d);
        if existing < required {
            let mut candidates: Vec<((u32, u32, u32), usize)> = Vec::new();
            for s in 0..board.staff_count() {
                let tiebreak: u32 = rng.random();
                if board.get(s, d).is_none() && can_take_day(board, ctx, s, d) {
                    candidates.push(((board.day_shifts(s), board.total_work(s), tiebreak), s));
                }
            }
            candidates.sort();
            for &(_, s) in candidates.iter().take((required - existing) as usize) {
                board.assign(s, d, Shift::Day);
            }
        }
        ensure_deputy_cover(board, ctx, d);
    }
}

/// When the head is not on day shift, puts a chief or deputy chief on it.
pub(crate) fn ensure_deputy_cover(board: &mut Board<'_>, ctx: &GenerationContext, day: usize) {
    let Some(head) = ctx.head() else {
        return;
    };
    if board.get(head, day) == Some(Shift::Day) {
        return;
    }
    let deputies: Vec<usize> = (0..board.staff_count())
        .filter(|&s| ctx.staff[s].rank.is_management())
        .collect();
    if deputies.iter().any(|&s| board.get(s, day) == Some(Shift::Day)) {
        return;
    }
    let pick = deputies
        .into_iter()
        .filter(|&s| can_take_day(board, ctx, s, day))
        .min_by_key(|&s| (ctx.staff[s].rank.priority(), board.day_shifts(s), s));
    if let Some(s) = pick {
        board.assign(s, day, Shift::Day);
    }
}

fn fill_remaining(board: &mut Board<'_>, ctx: &GenerationContext) {
    let days = board.days();

    // Short days first.
    for d in 0..days {
        while board.day_count(d) < ctx.requirements[d].day {
            let pick = (0..board.staff_count())
                .filter(|&s| board.get(s, d).is_none() && can_take_day(board, ctx, s, d))
                .min_by_key(|&s| fill_priority(board, ctx, s));
            match pick {
                Some(s) => {
                    board.assign(s, d, Shift::Day);
                }
                None => break,
            }
        }
    }

    // General fill.
    for s in 0..board.staff_count() {
        let off_target = ctx.config.max_days_off;
        for d in 0..days {
            if board.get(s, d).is_some() || !board.is_movable(s, d) {
                continue;
            }
            let req = ctx.requirements[d];
            let count = board.day_count(d);
            let can_day = can_take_day(board, ctx, s, d);
            let wants_day = can_day
                && (count < req.day
                    || (count < req.day_allowance && board.days_off(s) >= off_target)
                    || !has_off_room(board, ctx, s));
            let shift = if wants_day { Shift::Day } else { Shift::Off };
            board.assign(s, d, shift);
        }
    }

    // Top-up from generated days off.
    for d in 0..days {
        while board.day_count(d) < ctx.requirements[d].day {
            let pick = (0..board.staff_count())
                .filter(|&s| board.get(s, d) == Some(Shift::Off) && can_take_day(board, ctx, s, d))
                .min_by_key(|&s| fill_priority(board, ctx, s));
            match pick {
                Some(s) => {
                    board.assign(s, d, Shift::Day);
                }
                None => break,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{GenerationConfig, Preferences, Rank, Staff};
    use crate::scheduler::GenerationRequest;

    fn request(staff: usize) -> GenerationRequest {
        let mut roster = vec![Staff::head("h"), Staff::new("c").with_rank(Rank::Chief)];
        roster.extend((0..staff).map(|i| Staff::new(format!("n{i}"))));
        let config = GenerationConfig::default()
            .with_night_pattern(vec![2, 3])
            .with_max_night_shifts(8)
            .with_max_days_off(12)
            .with_day_staff(5, 3, 3, 3);
        GenerationRequest::new(2025, 4, roster).with_config(config)
    }

    #[test]
    fn test_candidate_is_complete_and_keeps_locks() {
        let req = request(12).with_preferences(
            Preferences::new()
                .with("n0", 5, Shift::Night)
                .with("n1", 10, Shift::PaidLeave),
        );
        let ctx = GenerationContext::resolve(&req).unwrap();
        let board = build_candidate(&ctx, 7);
        let grid = board.shift_grid();
        assert!(grid.iter().all(|row| row.iter().all(Option::is_some)));
        assert_eq!(grid[2][4], Some(Shift::Night));
        assert_eq!(grid[2][5], Some(Shift::NightAfter));
        assert_eq!(grid[2][6], Some(Shift::Off));
        assert_eq!(grid[3][9], Some(Shift::PaidLeave));
        let schedule = board.to_schedule(2025, 4, &ctx.staff_ids());
        assert!(ctx.locks.mismatches(&schedule).is_empty());
    }

    #[test]
    fn test_tight_night_pattern_filled() {
        // 4 nights a day from 10 staff only fits night, after, night, after, off.
        let roster = (0..10).map(|i| Staff::new(format!("n{i}"))).collect();
        let config = GenerationConfig::default()
            .with_night_pattern(vec![4, 4])
            .with_max_night_shifts(12)
            .with_max_days_off(10)
            .with_max_consecutive_days(3)
            .with_day_staff(0, 0, 0, 0);
        let req = GenerationRequest::new(2025, 4, roster).with_config(config);
        let ctx = GenerationContext::resolve(&req).unwrap();
        let board = build_candidate(&ctx, 5);
        for d in 0..ctx.days() {
            assert_eq!(board.night_count(d), 4, "day {}", d + 1);
        }
    }

    #[test]
    fn test_same_seed_same_candidate() {
        let ctx = GenerationContext::resolve(&request(10)).unwrap();
        let a = build_candidate(&ctx, 99).shift_grid();
        let b = build_candidate(&ctx, 99).shift_grid();
        assert_eq!(a, b);
    }

    #[test]
    fn test_head_never_on_sunday_day_shift() {
        let ctx = GenerationContext::resolve(&request(10)).unwrap();
        let board = build_candidate(&ctx, 3);
        for d in 0..ctx.days() {
            if ctx.calendar.is_sunday(d) {
                assert_ne!(board.get(0, d), Some(Shift::Day));
            }
        }
    }

    #[test]
    fn test_night_placement_respects_rules() {
        let ctx = GenerationContext::resolve(&request(12)).unwrap();
        let board = build_candidate(&ctx, 11);
        for s in 0..board.staff_count() {
            assert!(board.nights(s) <= 8);
            for d in 0..ctx.days() {
                if board.get(s, d) == Some(Shift::Night) && d + 1 < ctx.days() {
                    assert_eq!(board.get(s, d + 1), Some(Shift::NightAfter));
                }
            }
        }
    }

    #[test]
    fn test_expected_nights() {
        let ctx = GenerationContext::resolve(&request(10)).unwrap();
        let total: u32 = ctx.requirements.iter().map(|r| r.night).sum();
        assert_eq!(expected_nights(&ctx), total.div_ceil(12));
    }
}
