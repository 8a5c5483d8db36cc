//! Monthly shift generation.
//!
//! # Algorithm
//!
//! 1. **Construct**: build several Phase-1 candidates from derived seeds
//!    (in parallel when enabled) and keep the best-scoring one.
//! 2. **Anneal**: flip day/off cells to even out weekday day-shift
//!    headcounts without breaking hard caps.
//! 3. **Fairness**: swap day shifts from the most to the least loaded
//!    staff member.
//! 4. **Repair**: ordered sweeps enforcing night counts, night/after
//!    chains, caps and day-shift targets.
//! 5. **Validate**: compute the report returned with the schedule.
//!
//! Generation is deterministic for a given request, seed included. The
//! candidate reduction orders by score, then candidate index, so running
//! candidates in parallel yields the same schedule as running them in
//! sequence.
//!
//! # Reference
//! Burke et al. (2004), "The State of the Art of Nurse Rostering",
//! Journal of Scheduling 7(6)

mod anneal;
mod board;
mod construct;
mod context;
mod eligibility;
mod fairness;
mod repair;
mod score;

use std::collections::BTreeMap;
use std::fmt;
use std::time::Instant;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::ShiftError;
use crate::models::{Schedule, StaffStats};
use crate::validation::{check_schedule, ValidationReport};

pub use anneal::AnnealStats;
pub use board::{Board, Checkpoint};
pub use context::{GenerationContext, GenerationRequest, StaffRules};
pub use repair::RepairStats;
pub use score::{anneal_cost, score, ScoreBreakdown, BASELINE};

/// Stream constant separating the annealing seed from candidate seeds.
const ANNEAL_STREAM: u64 = 0xA5A5_5A5A_C3C3_3C3C;

/// Generation phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Phase 1: candidate construction and selection.
    Construct,
    /// Phase 2: simulated annealing.
    Anneal,
    /// Phase 3: fairness rebalancing.
    Fairness,
    /// Phase 4: repair sweeps.
    Repair,
    /// Final report.
    Validate,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Construct => "construct",
            Phase::Anneal => "anneal",
            Phase::Fairness => "fairness",
            Phase::Repair => "repair",
            Phase::Validate => "validate",
        };
        f.write_str(name)
    }
}

/// A coarse progress notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Progress {
    /// Phase about to run.
    pub phase: Phase,
    /// Zero-based phase position.
    pub step: usize,
    /// Number of phases.
    pub total: usize,
}

impl Progress {
    const TOTAL: usize = 5;

    fn new(phase: Phase, step: usize) -> Self {
        Self {
            phase,
            step,
            total: Self::TOTAL,
        }
    }
}

/// Receiver of progress notifications.
pub trait ProgressSink {
    /// Called at every phase boundary.
    fn notify(&mut self, progress: Progress);
}

impl<F: FnMut(Progress)> ProgressSink for F {
    fn notify(&mut self, progress: Progress) {
        self(progress)
    }
}

/// Result of a generation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationOutcome {
    /// The generated schedule.
    pub schedule: Schedule,
    /// Validation of the schedule against the request.
    pub report: ValidationReport,
    /// Score of the final schedule.
    pub score: f64,
    /// Score of the selected Phase-1 candidate.
    pub candidate_score: f64,
    /// Index of the selected Phase-1 candidate.
    pub candidate_index: usize,
    /// Annealing summary.
    pub anneal: AnnealStats,
    /// Fairness swaps committed.
    pub fairness_swaps: usize,
    /// Repair summary.
    pub repair: RepairStats,
    /// Per-staff counters.
    pub stats: BTreeMap<String, StaffStats>,
}

/// Shift generator with optional progress reporting.
///
/// # Example
///
/// ```
/// use u_shift::models::{GenerationConfig, SearchParams, Staff};
/// use u_shift::scheduler::{GenerationRequest, Phase, ShiftGenerator};
///
/// let roster: Vec<Staff> = (0..12).map(|i| Staff::new(format!("n{i}"))).collect();
/// let config = GenerationConfig::default()
///     .with_max_night_shifts(8)
///     .with_day_staff(5, 3, 3, 3)
///     .with_search(SearchParams { candidates: 3, anneal_iterations: 100, ..SearchParams::default() });
/// let request = GenerationRequest::new(2025, 4, roster).with_config(config).with_seed(7);
///
/// let mut phases = Vec::new();
/// let outcome = ShiftGenerator::new()
///     .with_progress(|p: u_shift::scheduler::Progress| phases.push(p.phase))
///     .generate(&request)
///     .unwrap();
///
/// assert_eq!(outcome.schedule.staff_count(), 12);
/// assert_eq!(phases.first(), Some(&Phase::Construct));
/// ```
#[derive(Default)]
pub struct ShiftGenerator<'p> {
    progress: Option<Box<dyn ProgressSink + 'p>>,
}

impl fmt::Debug for ShiftGenerator<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShiftGenerator")
            .field("progress", &self.progress.is_some())
            .finish()
    }
}

impl<'p> ShiftGenerator<'p> {
    /// Creates a generator without progress reporting.
    pub fn new() -> Self {
        Self { progress: None }
    }

    /// Sets a progress sink.
    pub fn with_progress(mut self, sink: impl ProgressSink + 'p) -> Self {
        self.progress = Some(Box::new(sink));
        self
    }

    fn report(&mut self, phase: Phase, step: usize) {
        tracing::info!(event = "phase_start", phase = %phase);
        if let Some(sink) = self.progress.as_mut() {
            sink.notify(Progress::new(phase, step));
        }
    }

    /// Generates a schedule.
    ///
    /// # Errors
    /// Only for input that makes generation meaningless: invalid month or
    /// configuration, duplicate staff IDs, no active staff. Staffing
    /// shortfalls are reported in [`GenerationOutcome::report`].
    pub fn generate(mut self, request: &GenerationRequest) -> Result<GenerationOutcome, ShiftError> {
        let started = Instant::now();
        let ctx = GenerationContext::resolve(request)?;
        let params = &ctx.config.search;
        tracing::info!(
            event = "generation_start",
            year = request.year,
            month = request.month,
            staff = ctx.staff_count(),
            seed = request.seed
        );

        self.report(Phase::Construct, 0);
        let phase_start = Instant::now();
        let (candidate_index, candidate_score, mut board) = select_candidate(&ctx, request.seed);
        tracing::info!(
            event = "phase_end",
            phase = %Phase::Construct,
            candidate = candidate_index,
            score = candidate_score,
            duration_ms = phase_start.elapsed().as_millis() as u64
        );

        self.report(Phase::Anneal, 1);
        let phase_start = Instant::now();
        let mut rng = ChaCha8Rng::seed_from_u64(splitmix64(request.seed ^ ANNEAL_STREAM));
        let anneal_stats = anneal::anneal(&mut board, &ctx, params, &mut rng);
        tracing::info!(
            event = "phase_end",
            phase = %Phase::Anneal,
            initial_cost = anneal_stats.initial_cost,
            best_cost = anneal_stats.best_cost,
            accepted = anneal_stats.accepted,
            duration_ms = phase_start.elapsed().as_millis() as u64
        );

        self.report(Phase::Fairness, 2);
        let fairness_swaps = fairness::rebalance(&mut board, &ctx, params.fairness_passes, params.fairness_gap);
        tracing::info!(event = "phase_end", phase = %Phase::Fairness, swaps = fairness_swaps);

        self.report(Phase::Repair, 3);
        let phase_start = Instant::now();
        let repair_stats = repair::repair(&mut board, &ctx, params.repair_attempts);
        tracing::info!(
            event = "phase_end",
            phase = %Phase::Repair,
            changes = repair_stats.total(),
            duration_ms = phase_start.elapsed().as_millis() as u64
        );

        self.report(Phase::Validate, 4);
        let final_score = score::score(&board, &ctx);
        let schedule = board.to_schedule(request.year, request.month, &ctx.staff_ids());
        let report = check_schedule(&schedule, request, &ctx);
        let stats = schedule
            .rows
            .iter()
            .map(|row| {
                (
                    row.staff_id.clone(),
                    StaffStats::from_shifts(&row.shifts(), &ctx.calendar),
                )
            })
            .collect();

        if report.is_valid() {
            tracing::info!(event = "generation_end", score = final_score, duration_ms = started.elapsed().as_millis() as u64);
        } else {
            tracing::warn!(
                event = "generation_end",
                score = final_score,
                violations = report.violations.len(),
                duration_ms = started.elapsed().as_millis() as u64
            );
        }

        Ok(GenerationOutcome {
            schedule,
            report,
            score: final_score,
            candidate_score,
            candidate_index,
            anneal: anneal_stats,
            fairness_swaps,
            repair: repair_stats,
            stats,
        })
    }
}

/// Generates a schedule without progress reporting.
///
/// See [`ShiftGenerator::generate`].
pub fn generate(request: &GenerationRequest) -> Result<GenerationOutcome, ShiftError> {
    ShiftGenerator::new().generate(request)
}

/// Seed of the `index`-th Phase-1 candidate.
pub fn candidate_seed(base: u64, index: usize) -> u64 {
    splitmix64(base.wrapping_add(index as u64))
}

/// SplitMix64 finalizer (Steele, Lea & Flood 2014).
fn splitmix64(x: u64) -> u64 {
    let mut z = x.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Builds and scores every candidate; returns (index, score, board) of
/// the best, lowest index winning ties.
fn select_candidate(ctx: &GenerationContext, seed: u64) -> (usize, f64, Board<'_>) {
    let count = ctx.config.search.candidates.max(1);
    let build = |i: usize| {
        let board = construct::build_candidate(ctx, candidate_seed(seed, i));
        let score = score::score(&board, ctx);
        tracing::debug!(event = "candidate", index = i, score);
        (i, score, board)
    };

    let candidates: Vec<(usize, f64, Board<'_>)> = if ctx.config.search.parallel_candidates {
        (0..count).into_par_iter().map(build).collect()
    } else {
        (0..count).map(build).collect()
    };

    let mut best: Option<(usize, f64, Board<'_>)> = None;
    for candidate in candidates {
        let better = best.as_ref().map_or(true, |(_, s, _)| candidate.1 > *s);
        if better {
            best = Some(candidate);
        }
    }
    match best {
        Some(best) => best,
        // count >= 1, so at least one candidate exists
        None => (0, f64::NEG_INFINITY, construct::build_candidate(ctx, candidate_seed(seed, 0))),
    }
}
