//! Phase 2: simulated annealing over day/off cells.
//!
//! # Algorithm
//!
//! Moves flip one movable cell between day shift and day off. Night,
//! after-shift, derived and locked cells are never touched. A flip is
//! only tried when it keeps the staff member within the consecutive cap
//! (off → day, and day-shift eligible) or the days-off cap (day → off).
//! Accepted by the Metropolis criterion on [`anneal_cost`]; temperature
//! decays geometrically. Rejected moves are undone through the board
//! journal, and the best state seen is restored at the end.
//!
//! # Reference
//! Kirkpatrick, Gelatt & Vecchi (1983), "Optimization by Simulated Annealing"

use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use super::board::Board;
use super::context::GenerationContext;
use super::eligibility::{can_drop_day, can_take_day};
use super::score::anneal_cost;
use crate::models::{SearchParams, Shift};

/// Annealing run summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AnnealStats {
    /// Cost before the first move.
    pub initial_cost: f64,
    /// Cost of the restored best state.
    pub best_cost: f64,
    /// Accepted moves.
    pub accepted: usize,
    /// Iterations run.
    pub iterations: usize,
}

/// Runs simulated annealing in place.
pub fn anneal(
    board: &mut Board<'_>,
    ctx: &GenerationContext,
    params: &SearchParams,
    rng: &mut ChaCha8Rng,
) -> AnnealStats {
    let mut cells = Vec::new();
    for s in 0..board.staff_count() {
        for d in 0..board.days() {
            if board.is_movable(s, d) && matches!(board.get(s, d), Some(Shift::Day) | Some(Shift::Off)) {
                cells.push((s, d));
            }
        }
    }

    let initial_cost = anneal_cost(board, ctx);
    let mut stats = AnnealStats {
        initial_cost,
        best_cost: initial_cost,
        ..AnnealStats::default()
    };
    if cells.is_empty() {
        return stats;
    }

    board.clear_journal();
    let mut best_cp = board.checkpoint();
    let mut current = initial_cost;
    let mut temperature = params.initial_temperature;

    for _ in 0..params.anneal_iterations {
        stats.iterations += 1;
        let (s, d) = cells[rng.random_range(0..cells.len())];
        let cp = board.checkpoint();

        let flipped = match board.get(s, d) {
            Some(Shift::Day) if can_drop_day(board, ctx, s, d) => board.assign(s, d, Shift::Off),
            Some(Shift::Off) if can_take_day(board, ctx, s, d) => board.assign(s, d, Shift::Day),
            _ => false,
        };

        if flipped {
            let cost = anneal_cost(board, ctx);
            let delta = cost - current;
            if delta <= 0.0 || rng.random::<f64>() < (-delta / temperature).exp() {
                current = cost;
                stats.accepted += 1;
                if current < stats.best_cost {
                    stats.best_cost = current;
                    best_cp = board.checkpoint();
                }
            } else {
                board.rollback(cp);
            }
        }
        temperature *= params.cooling_rate;
    }

    board.rollback(best_cp);
    board.clear_journal();
    stats
}
