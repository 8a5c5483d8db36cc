//! Phase 3: day-shift fairness rebalancing.
//!
//! # Algorithm
//!
//! Each pass takes the staff member with the most day shifts and the one
//! with the fewest (among staff who may work day shifts). While their gap
//! exceeds the tolerated gap, find a day where the former works a movable
//! day shift and the latter has a movable day off, swap the two cells,
//! and keep the swap only if neither staff member breaks the consecutive
//! or days-off cap. Stops when the gap closes, no swap is found, or the
//! pass budget runs out.

use super::board::Board;
use super::context::GenerationContext;
use super::score::overflow;
use crate::models::Shift;

/// Runs the fairness passes; returns the number of committed swaps.
pub fn rebalance(board: &mut Board<'_>, ctx: &GenerationContext, passes: usize, gap: u32) -> usize {
    let eligible: Vec<usize> = (0..board.staff_count())
        .filter(|&s| !ctx.staff[s].no_day)
        .collect();
    if eligible.len() < 2 {
        return 0;
    }

    let mut swaps = 0;
    for _ in 0..passes {
        let Some(&most) = eligible.iter().max_by_key(|&&s| (board.day_shifts(s), std::cmp::Reverse(s))) else {
            break;
        };
        let Some(&least) = eligible.iter().min_by_key(|&&s| (board.day_shifts(s), s)) else {
            break;
        };
        if board.day_shifts(most) <= board.day_shifts(least) + gap {
            break;
        }
        if !try_swap(board, ctx, most, least) {
            break;
        }
        swaps += 1;
    }
    swaps
}

fn try_swap(board: &mut Board<'_>, ctx: &GenerationContext, from: usize, to: usize) -> bool {
    let before = [overflow(board, ctx, from), overflow(board, ctx, to)];
    for d in 0..board.days() {
        let candidate = board.get(from, d) == Some(Shift::Day)
            && board.is_movable(from, d)
            && board.get(to, d) == Some(Shift::Off)
            && board.is_movable(to, d)
            && ctx.can_work_day(to, d);
        if !candidate {
            continue;
        }

        let cp = board.checkpoint();
        board.assign(from, d, Shift::Off);
        board.assign(to, d, Shift::Day);
        let after = [overflow(board, ctx, from), overflow(board, ctx, to)];
        let keeps_caps = after
            .iter()
            .zip(&before)
            .all(|(a, b)| a.0 <= b.0 && a.1 <= b.1);
        if keeps_caps {
            tracing::trace!(event = "fairness_swap", day = d + 1, from, to);
            return true;
        }
        board.rollback(cp);
    }
    false
}
