//! Candidate score and annealing cost.
//!
//! # Candidate score
//!
//! Higher is better. Starts from [`BASELINE`] and subtracts:
//!
//! | Term | Penalty |
//! |------|---------|
//! | Days off over cap (per staff) | excess² × 200 |
//! | Longest work run over cap (per staff) | over² × 100 |
//! | Night without its after-shift, or orphan after-shift | 100 each |
//! | Night headcount below requirement (per day) | 500 per missing |
//! | Night headcount above requirement (per day) | 300 per extra |
//! | Day headcount below target (per day) | diff² × 20 |
//! | Day headcount above allowance (per day) | diff² × 10 |
//!
//! Locked cells are exempt from the chain term.
//!
//! # Annealing cost
//!
//! Lower is better: 10 × standard deviation of day headcount over
//! ordinary weekdays, plus 5 per unit of day-headcount deviation, plus 50
//! per unit of run or days-off overflow.

use serde::{Deserialize, Serialize};

use super::board::Board;
use super::context::GenerationContext;

/// Score of an empty-penalty schedule.
pub const BASELINE: f64 = 1000.0;

/// Penalty terms of a candidate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    /// Days-off overflow penalty.
    pub days_off: f64,
    /// Consecutive-run overflow penalty.
    pub consecutive: f64,
    /// Broken night/after pairs.
    pub chain_breaks: u32,
    /// Night headcount deviation penalty.
    pub night: f64,
    /// Day headcount deviation penalty.
    pub day: f64,
}

impl ScoreBreakdown {
    /// Computes penalty terms for a board.
    pub fn calculate(board: &Board<'_>, ctx: &GenerationContext) -> Self {
        let mut out = ScoreBreakdown::default();
        let days = board.days();

        for s in 0..board.staff_count() {
            let (off_over, run_over) = overflow(board, ctx, s);
            out.days_off += (off_over * off_over) as f64 * 200.0;
            out.consecutive += (run_over * run_over) as f64 * 100.0;
            out.chain_breaks += chain_breaks(board, s);
        }

        for d in 0..days {
            let req = ctx.requirements[d];
            let nights = board.night_count(d);
            if nights < req.night {
                out.night += (req.night - nights) as f64 * 500.0;
            } else {
                out.night += (nights - req.night) as f64 * 300.0;
            }
            let (under, over) = day_deviation(board, ctx, d);
            out.day += (under * under) as f64 * 20.0 + (over * over) as f64 * 10.0;
        }
        out
    }

    /// Total penalty.
    pub fn penalty(&self) -> f64 {
        self.days_off + self.consecutive + self.chain_breaks as f64 * 100.0 + self.night + self.day
    }

    /// Candidate score (`BASELINE - penalty`).
    pub fn score(&self) -> f64 {
        BASELINE - self.penalty()
    }
}

/// Candidate score of a board.
pub fn score(board: &Board<'_>, ctx: &GenerationContext) -> f64 {
    ScoreBreakdown::calculate(board, ctx).score()
}

/// Annealing cost of a board.
pub fn anneal_cost(board: &Board<'_>, ctx: &GenerationContext) -> f64 {
    let weekday_counts: Vec<f64> = (0..board.days())
        .filter(|&d| ctx.calendar.info(d).is_ordinary_weekday())
        .map(|d| board.day_count(d) as f64)
        .collect();

    let mut cost = 10.0 * std_dev(&weekday_counts);
    for d in 0..board.days() {
        let (under, over) = day_deviation(board, ctx, d);
        cost += 5.0 * (under + over) as f64;
    }
    for s in 0..board.staff_count() {
        let (off_over, run_over) = overflow(board, ctx, s);
        cost += 50.0 * (off_over + run_over) as f64;
    }
    cost
}

/// Day headcount shortfall below target and excess above allowance.
pub(crate) fn day_deviation(board: &Board<'_>, ctx: &GenerationContext, day: usize) -> (u32, u32) {
    let req = ctx.requirements[day];
    let actual = board.day_count(day);
    (
        req.day.saturating_sub(actual),
        actual.saturating_sub(req.day_allowance),
    )
}

/// Days-off overflow (0 when exempt) and run overflow for a staff row.
pub(crate) fn overflow(board: &Board<'_>, ctx: &GenerationContext, staff: usize) -> (u32, u32) {
    let off_over = ctx
        .off_cap(staff)
        .map_or(0, |cap| board.days_off(staff).saturating_sub(cap));
    let run_over = board.max_run(staff).saturating_sub(ctx.max_consecutive());
    (off_over, run_over)
}

/// Unlocked nights without their after-shift plus unlocked orphan
/// after-shifts.
pub(crate) fn chain_breaks(board: &Board<'_>, staff: usize) -> u32 {
    let days = board.days();
    let mut breaks = 0;
    for d in 0..days {
        let Some(shift) = board.get(staff, d) else {
            continue;
        };
        if let Some(after) = shift.after_shift() {
            if d + 1 < days && !board.is_locked(staff, d + 1) && board.get(staff, d + 1) != Some(after) {
                breaks += 1;
            }
        } else if let Some(night) = shift.night_for_after() {
            let paired = d > 0 && board.get(staff, d - 1) == Some(night);
            if !paired && !board.is_locked(staff, d) {
                breaks += 1;
            }
        }
    }
    breaks
}

fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    var.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{GenerationConfig, Shift, Staff};
    use crate::scheduler::GenerationRequest;

    fn ctx(staff: usize) -> GenerationContext {
        let roster = (0..staff).map(|i| Staff::new(format!("s{i}"))).collect();
        let config = GenerationConfig::default()
            .with_night_pattern(vec![1])
            .with_day_staff(1, 1, 1, 1)
            .with_max_days_off(10)
            .with_max_consecutive_days(5);
        GenerationContext::resolve(&GenerationRequest::new(2025, 4, roster).with_config(config)).unwrap()
    }

    #[test]
    fn test_perfect_board_scores_baseline() {
        let ctx = ctx(3);
        let mut board = Board::new(3, 30, &ctx.locks);
        // Rotate N, A, D across three staff.
        for d in 0..30 {
            for s in 0..3 {
                let shift = match (d + s) % 3 {
                    0 => Shift::Night,
                    1 if d == 0 => Shift::Off,
                    1 => Shift::NightAfter,
                    _ => Shift::Day,
                };
                board.assign(s, d, shift);
            }
        }
        let b = ScoreBreakdown::calculate(&board, &ctx);
        assert_eq!(b.chain_breaks, 0);
        assert_eq!(b.night, 0.0);
        assert_eq!(b.day, 0.0);
        assert_eq!(b.score(), BASELINE);
    }

    #[test]
    fn test_penalties() {
        let ctx = ctx(2);
        let mut board = Board::new(2, 30, &ctx.locks);
        for d in 0..30 {
            board.assign(0, d, Shift::Off);
            board.assign(1, d, Shift::Off);
        }
        board.assign(0, 3, Shift::NightAfter); // orphan
        let b = ScoreBreakdown::calculate(&board, &ctx);
        assert_eq!(b.chain_breaks, 1);
        // 30 days each missing one night and one day shift.
        assert_eq!(b.night, 30.0 * 500.0);
        assert_eq!(b.day, 30.0 * 20.0);
        // 29 and 30 offs against a cap of 10.
        assert_eq!(b.days_off, (19.0f64 * 19.0 + 20.0 * 20.0) * 200.0);
        assert!(score(&board, &ctx) < 0.0);
    }

    #[test]
    fn test_anneal_cost_prefers_even_weekdays() {
        let ctx = ctx(4);
        let mut even = Board::new(4, 30, &ctx.locks);
        let mut uneven = Board::new(4, 30, &ctx.locks);
        for d in 0..30 {
            even.assign(d % 4, d, Shift::Day);
            if d % 2 == 0 {
                uneven.assign(0, d, Shift::Day);
                uneven.assign(1, d, Shift::Day);
            }
        }
        assert!(anneal_cost(&even, &ctx) < anneal_cost(&uneven, &ctx));
    }

    #[test]
    fn test_std_dev() {
        assert_eq!(std_dev(&[2.0, 2.0, 2.0]), 0.0);
        assert!((std_dev(&[1.0, 3.0]) - 1.0).abs() < 1e-12);
    }
}
