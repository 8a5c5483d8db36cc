//! Input integrity checks and schedule verification.
//!
//! [`validate_input`] checks a generation request before any work is
//! done. [`validate`] checks a finished schedule (generated or manually
//! edited) against the request it was built from and returns a
//! [`ValidationReport`]. Violations are accumulated, never raised: a
//! schedule with violations is still a schedule.
//!
//! Checks performed by [`validate`]:
//! - per-day night headcount equals the requirement; day headcount lies
//!   within `[target, allowance]`
//! - per-staff days off within the cap (exempt staff skipped; after-shifts
//!   never count as days off), longest work run within the cap, nights
//!   within the personal cap
//! - every night is followed by its after-shift, every after-shift
//!   follows its night (day 1 may follow the previous month's night);
//!   locked cells are exempt on either side of the pair
//! - locked cells still hold their locked value
//! - every direct request is honored unless a carry-over constraint
//!   covers the same day; request counts within quota
//! - no unassigned cells, one full-length row per scheduled staff member

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ShiftError;
use crate::locking::LockSource;
use crate::models::{
    Cell, MonthCalendar, RequestKind, Schedule, Shift, StaffRow, StaffStats,
};
use crate::scheduler::{GenerationContext, GenerationRequest};

/// Validation result.
pub type ValidationResult = Result<(), Vec<ValidationError>>;

/// An input integrity error.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    /// Error category.
    pub kind: ValidationErrorKind,
    /// Human-readable description.
    pub message: String,
}

/// Categories of input integrity errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// Two roster entries share the same ID.
    DuplicateId,
    /// The roster has no active staff.
    NoActiveStaff,
    /// Year/month do not form a calendar month.
    InvalidMonth,
    /// Requests, tails or overrides name a staff ID not in the roster.
    UnknownStaffReference,
    /// A request day outside the target month.
    RequestOutOfRange,
    /// The configuration fails its own validation.
    InvalidConfig,
}

impl ValidationError {
    fn new(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Validates a generation request.
///
/// Unlike [`GenerationContext::resolve`], which stops at the first hard
/// error, this collects every problem, including soft ones generation
/// would only warn about (references to unknown staff, out-of-range
/// request days).
///
/// # Returns
/// `Ok(())` if all checks pass, `Err(errors)` with all detected issues.
pub fn validate_input(request: &GenerationRequest) -> ValidationResult {
    let mut errors = Vec::new();

    if let Err(e) = request.config.validate() {
        errors.push(ValidationError::new(ValidationErrorKind::InvalidConfig, e.to_string()));
    }

    let days = match MonthCalendar::new(request.year, request.month) {
        Ok(cal) => Some(cal.days() as u32),
        Err(e) => {
            errors.push(ValidationError::new(ValidationErrorKind::InvalidMonth, e.to_string()));
            None
        }
    };

    let mut ids = BTreeSet::new();
    for staff in &request.roster {
        if !ids.insert(staff.id.as_str()) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateId,
                format!("Duplicate staff ID: {}", staff.id),
            ));
        }
    }
    if request.active_staff().next().is_none() {
        errors.push(ValidationError::new(
            ValidationErrorKind::NoActiveStaff,
            "Roster has no active staff",
        ));
    }

    let references = request
        .preferences
        .staff_ids()
        .map(|id| ("requests", id))
        .chain(request.carry_over.staff_ids().map(|id| ("carry-over", id)))
        .chain(request.overrides.keys().map(|id| ("overrides", id.as_str())));
    for (source, id) in references {
        if !ids.contains(id) {
            errors.push(ValidationError::new(
                ValidationErrorKind::UnknownStaffReference,
                format!("{source} reference unknown staff '{id}'"),
            ));
        }
    }

    if let Some(days) = days {
        for id in request.preferences.staff_ids() {
            for entry in request.preferences.classified(id) {
                if entry.day == 0 || entry.day > days {
                    errors.push(ValidationError::new(
                        ValidationErrorKind::RequestOutOfRange,
                        format!("Request of '{id}' on day {} outside 1..={days}", entry.day),
                    ));
                }
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Category of a schedule violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    /// Fewer ward nights than required.
    NightUnderstaffed,
    /// More ward nights than required.
    NightOverstaffed,
    /// Fewer day shifts than the target.
    DayUnderstaffed,
    /// More day shifts than the allowance.
    DayOverstaffed,
    /// Days off above the cap.
    DaysOffExceeded,
    /// Work run longer than the cap.
    ConsecutiveExceeded,
    /// Nights above the personal cap.
    NightCapExceeded,
    /// After-shift without its night on the previous day.
    OrphanAfterShift,
    /// Night not followed by its after-shift.
    MissingAfterShift,
    /// A locked cell no longer holds its locked value.
    LockedCellMutated,
    /// A direct request is not reflected in the schedule.
    RequestNotHonored,
    /// More direct requests than the staff member's quota.
    RequestQuotaExceeded,
    /// An empty cell.
    UnassignedCell,
    /// A row with the wrong number of cells.
    RowLengthMismatch,
    /// A row for a staff ID that is not scheduled.
    UnknownStaff,
    /// No row for a scheduled staff member.
    MissingStaffRow,
    /// The schedule belongs to another month.
    MonthMismatch,
}

/// One schedule violation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    /// Category.
    pub kind: ViolationKind,
    /// Staff member concerned, if any.
    pub staff_id: Option<String>,
    /// Day concerned (1-based), if any.
    pub day: Option<u32>,
    /// Human-readable description.
    pub message: String,
}

impl Violation {
    fn new(kind: ViolationKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            staff_id: None,
            day: None,
            message: message.into(),
        }
    }

    fn staff(mut self, id: &str) -> Self {
        self.staff_id = Some(id.to_string());
        self
    }

    fn on_day(mut self, day: usize) -> Self {
        self.day = Some(day as u32 + 1);
        self
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}]", self.kind)?;
        if let Some(id) = &self.staff_id {
            write!(f, " {id}")?;
        }
        if let Some(day) = self.day {
            write!(f, " day {day}")?;
        }
        write!(f, ": {}", self.message)
    }
}

/// Headcounts of one day against its requirement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayCoverage {
    /// Day (1-based).
    pub day: u32,
    /// Ward nights assigned.
    pub night: u32,
    /// Ward nights required.
    pub night_required: u32,
    /// Day shifts assigned.
    pub day_shifts: u32,
    /// Day-shift target.
    pub day_required: u32,
    /// Day-shift upper bound.
    pub day_allowance: u32,
}

/// One staff member's counters against their caps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffCompliance {
    /// Staff ID.
    pub staff_id: String,
    /// Counters over the month.
    pub stats: StaffStats,
    /// Days-off cap (`None` when exempt).
    pub days_off_cap: Option<u32>,
    /// Personal night cap.
    pub night_cap: u32,
}

/// Structured verification result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    /// Target year.
    pub year: i32,
    /// Target month.
    pub month: u32,
    /// Per-day coverage.
    pub coverage: Vec<DayCoverage>,
    /// Per-staff compliance in roster order.
    pub staff: Vec<StaffCompliance>,
    /// All violations found.
    pub violations: Vec<Violation>,
}

impl ValidationReport {
    /// Whether no violation was found.
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }

    /// Number of violations of a kind.
    pub fn count(&self, kind: ViolationKind) -> usize {
        self.violations_of(kind).count()
    }

    /// Violations of a kind.
    pub fn violations_of(&self, kind: ViolationKind) -> impl Iterator<Item = &Violation> {
        self.violations.iter().filter(move |v| v.kind == kind)
    }

    /// One-line pass/fail summary.
    pub fn summary(&self) -> String {
        if self.is_valid() {
            return format!("{}-{:02}: OK", self.year, self.month);
        }
        let mut kinds: Vec<(ViolationKind, usize)> = Vec::new();
        for v in &self.violations {
            match kinds.iter_mut().find(|(k, _)| *k == v.kind) {
                Some((_, n)) => *n += 1,
                None => kinds.push((v.kind, 1)),
            }
        }
        kinds.sort();
        let parts: Vec<String> = kinds.iter().map(|(k, n)| format!("{k:?}×{n}")).collect();
        format!(
            "{}-{:02}: {} violation(s): {}",
            self.year,
            self.month,
            self.violations.len(),
            parts.join(", ")
        )
    }
}

/// Validates a schedule against the request it was built for.
///
/// Rows are matched to the roster by staff ID, so a schedule whose rows
/// were reordered validates the same way.
///
/// # Errors
/// The same hard errors as generation: invalid month or configuration,
/// duplicate staff IDs, no active staff.
///
/// # Example
///
/// ```
/// use u_shift::models::{Schedule, Staff};
/// use u_shift::scheduler::GenerationRequest;
/// use u_shift::validation::{validate, ViolationKind};
///
/// let request = GenerationRequest::new(2025, 4, vec![Staff::new("a")]);
/// let empty = Schedule::empty(2025, 4, 30, ["a"]);
/// let report = validate(&empty, &request).unwrap();
/// assert!(!report.is_valid());
/// assert_eq!(report.count(ViolationKind::UnassignedCell), 1);
/// ```
pub fn validate(schedule: &Schedule, request: &GenerationRequest) -> Result<ValidationReport, ShiftError> {
    let ctx = GenerationContext::resolve(request)?;
    let days = ctx.days();
    let mut structural = Vec::new();

    if schedule.year != request.year || schedule.month != request.month {
        structural.push(Violation::new(
            ViolationKind::MonthMismatch,
            format!(
                "schedule is for {}-{:02}, request for {}-{:02}",
                schedule.year, schedule.month, request.year, request.month
            ),
        ));
    }

    let ids = ctx.staff_ids();
    for row in &schedule.rows {
        if !ids.contains(&row.staff_id.as_str()) {
            structural.push(
                Violation::new(ViolationKind::UnknownStaff, "row for a staff member not scheduled this month")
                    .staff(&row.staff_id),
            );
        }
    }

    let mut aligned = Schedule::empty(request.year, request.month, days, ids.iter().copied());
    for target in &mut aligned.rows {
        let Some(row) = schedule.row(&target.staff_id) else {
            structural.push(Violation::new(ViolationKind::MissingStaffRow, "no row").staff(&target.staff_id));
            continue;
        };
        if row.cells.len() != days {
            structural.push(
                Violation::new(
                    ViolationKind::RowLengthMismatch,
                    format!("{} cells for a {days}-day month", row.cells.len()),
                )
                .staff(&row.staff_id),
            );
        }
        for (cell, src) in target.cells.iter_mut().zip(&row.cells) {
            *cell = *src;
        }
    }

    let mut report = check_schedule(&aligned, request, &ctx);
    structural.append(&mut report.violations);
    report.violations = structural;
    Ok(report)
}

/// Checks a schedule whose rows are already in context order and of full
/// length.
pub(crate) fn check_schedule(schedule: &Schedule, request: &GenerationRequest, ctx: &GenerationContext) -> ValidationReport {
    let mut violations = Vec::new();
    let coverage = check_coverage(schedule, ctx, &mut violations);

    let mut staff = Vec::with_capacity(ctx.staff_count());
    for (s, row) in schedule.rows.iter().enumerate() {
        staff.push(check_staff(row, s, ctx, &mut violations));
        check_chains(row, s, request, ctx, &mut violations);
    }

    for lock in ctx.locks.mismatches(schedule) {
        let id = &ctx.staff[lock.staff].id;
        let source = match lock.source {
            LockSource::CarryOver => "carry-over",
            LockSource::Request => "request",
        };
        violations.push(
            Violation::new(
                ViolationKind::LockedCellMutated,
                format!("{source} lock {} holds {}", lock.expected, display_cell(lock.actual)),
            )
            .staff(id)
            .on_day(lock.day),
        );
    }

    check_requests(schedule, request, ctx, &mut violations);

    if !violations.is_empty() {
        tracing::debug!(event = "validation", violations = violations.len());
    }

    ValidationReport {
        year: schedule.year,
        month: schedule.month,
        coverage,
        staff,
        violations,
    }
}

fn display_cell(cell: Option<Shift>) -> String {
    cell.map_or_else(|| "nothing".to_string(), |s| s.to_string())
}

fn check_coverage(schedule: &Schedule, ctx: &GenerationContext, out: &mut Vec<Violation>) -> Vec<DayCoverage> {
    (0..ctx.days())
        .map(|d| {
            let req = ctx.requirements[d];
            let night = schedule.count_on_day(d, Shift::Night) as u32;
            let day_shifts = schedule.count_on_day(d, Shift::Day) as u32;

            if night < req.night {
                out.push(
                    Violation::new(ViolationKind::NightUnderstaffed, format!("{night} of {} nights", req.night))
                        .on_day(d),
                );
            } else if night > req.night {
                out.push(
                    Violation::new(ViolationKind::NightOverstaffed, format!("{night} of {} nights", req.night))
                        .on_day(d),
                );
            }
            if day_shifts < req.day {
                out.push(
                    Violation::new(
                        ViolationKind::DayUnderstaffed,
                        format!("{day_shifts} day shifts, target {}", req.day),
                    )
                    .on_day(d),
                );
            } else if day_shifts > req.day_allowance {
                out.push(
                    Violation::new(
                        ViolationKind::DayOverstaffed,
                        format!("{day_shifts} day shifts, allowance {}", req.day_allowance),
                    )
                    .on_day(d),
                );
            }

            DayCoverage {
                day: d as u32 + 1,
                night,
                night_required: req.night,
                day_shifts,
                day_required: req.day,
                day_allowance: req.day_allowance,
            }
        })
        .collect()
}

fn check_staff(row: &StaffRow, s: usize, ctx: &GenerationContext, out: &mut Vec<Violation>) -> StaffCompliance {
    let rules = &ctx.staff[s];
    let shifts = row.shifts();
    let stats = StaffStats::from_shifts(&shifts, &ctx.calendar);
    let days_off_cap = ctx.off_cap(s);

    if let Some(cap) = days_off_cap {
        if stats.days_off > cap {
            out.push(
                Violation::new(ViolationKind::DaysOffExceeded, format!("{} days off, cap {cap}", stats.days_off))
                    .staff(&rules.id),
            );
        }
    }
    if stats.max_consecutive > ctx.max_consecutive() {
        out.push(
            Violation::new(
                ViolationKind::ConsecutiveExceeded,
                format!("{} consecutive work days, cap {}", stats.max_consecutive, ctx.max_consecutive()),
            )
            .staff(&rules.id),
        );
    }
    if stats.nights > rules.night_cap {
        out.push(
            Violation::new(
                ViolationKind::NightCapExceeded,
                format!("{} nights, cap {}", stats.nights, rules.night_cap),
            )
            .staff(&rules.id),
        );
    }

    let empty: Vec<usize> = (0..shifts.len()).filter(|&d| shifts[d].is_none()).collect();
    if let Some(&first) = empty.first() {
        out.push(
            Violation::new(ViolationKind::UnassignedCell, format!("{} empty cell(s)", empty.len()))
                .staff(&rules.id)
                .on_day(first),
        );
    }

    StaffCompliance {
        staff_id: rules.id.clone(),
        stats,
        days_off_cap,
        night_cap: rules.night_cap,
    }
}

fn check_chains(
    row: &StaffRow,
    s: usize,
    request: &GenerationRequest,
    ctx: &GenerationContext,
    out: &mut Vec<Violation>,
) {
    let cells: &[Cell] = &row.cells;
    let id = &ctx.staff[s].id;
    let tail_last = request
        .carry_over
        .tail(id)
        .and_then(|t| t.last().copied().flatten());

    for d in 0..cells.len() {
        let Some(shift) = cells[d].shift else {
            continue;
        };
        if let Some(after) = shift.after_shift() {
            if d + 1 < cells.len() && cells[d + 1].shift != Some(after) && !ctx.locks.is_locked(s, d + 1) {
                out.push(
                    Violation::new(ViolationKind::MissingAfterShift, format!("{shift} not followed by {after}"))
                        .staff(id)
                        .on_day(d),
                );
            }
        }
        if let Some(night) = shift.night_for_after().filter(|_| !ctx.locks.is_locked(s, d)) {
            let prev = if d == 0 { tail_last } else { cells[d - 1].shift };
            if prev != Some(night) {
                out.push(
                    Violation::new(ViolationKind::OrphanAfterShift, format!("{shift} without preceding {night}"))
                        .staff(id)
                        .on_day(d),
                );
            }
        }
    }
}

fn check_requests(schedule: &Schedule, request: &GenerationRequest, ctx: &GenerationContext, out: &mut Vec<Violation>) {
    let days = ctx.days();
    for (s, row) in schedule.rows.iter().enumerate() {
        let id = &ctx.staff[s].id;
        for entry in request.preferences.classified(id) {
            if entry.kind != RequestKind::Direct || entry.day == 0 || entry.day as usize > days {
                continue;
            }
            let d = entry.day as usize - 1;
            if ctx.locks.is_carry_over_day(s, d) {
                continue;
            }
            let actual = row.cells.get(d).and_then(|c| c.shift);
            if actual != Some(entry.shift) {
                out.push(
                    Violation::new(
                        ViolationKind::RequestNotHonored,
                        format!("requested {}, scheduled {}", entry.shift, display_cell(actual)),
                    )
                    .staff(id)
                    .on_day(d),
                );
            }
        }

        if let Some(quota) = request.overrides_for(id).request_quota {
            let used = request.preferences.quota_usage(id);
            if used > quota as usize {
                out.push(
                    Violation::new(ViolationKind::RequestQuotaExceeded, format!("{used} requests, quota {quota}"))
                        .staff(id),
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        CarryOverTail, GenerationConfig, Preferences, Provenance, Staff, StaffOverrides,
    };

    fn request() -> GenerationRequest {
        let config = GenerationConfig::default()
            .with_night_pattern(vec![1])
            .with_max_night_shifts(10)
            .with_max_days_off(30)
            .with_max_consecutive_days(30)
            .with_day_staff(0, 0, 0, 0);
        GenerationRequest::new(2025, 4, vec![Staff::new("a"), Staff::new("b"), Staff::new("c")])
            .with_config(config)
            .with_carry_over(CarryOverTail::new().with("c", vec![Some(Shift::Night)]))
    }

    /// Night rotates a → b → c with after-shifts; the third member is off.
    /// c opens the month on the after-shift of last month's night.
    fn rotation() -> Schedule {
        let ids = ["a", "b", "c"];
        let mut s = Schedule::empty(2025, 4, 30, ids);
        for d in 0..30 {
            for (i, row) in s.rows.iter_mut().enumerate() {
                let shift = match (d + 3 - i) % 3 {
                    0 => Shift::Night,
                    1 => Shift::NightAfter,
                    _ => Shift::Off,
                };
                row.cells[d] = Cell::generated(shift);
            }
        }
        s
    }

    #[test]
    fn test_valid_input() {
        assert!(validate_input(&request()).is_ok());
    }

    #[test]
    fn test_input_errors_accumulate() {
        let mut req = request()
            .with_preferences(Preferences::new().with("ghost", 3, Shift::Off).with("a", 31, Shift::Off))
            .with_override("nobody", StaffOverrides::default());
        req.roster.push(Staff::new("a"));
        req.month = 13;
        let errors = validate_input(&req).unwrap_err();
        let has = |k: ValidationErrorKind| errors.iter().any(|e| e.kind == k);
        assert!(has(ValidationErrorKind::DuplicateId));
        assert!(has(ValidationErrorKind::InvalidMonth));
        assert!(has(ValidationErrorKind::UnknownStaffReference));
        assert_eq!(
            errors.iter().filter(|e| e.kind == ValidationErrorKind::UnknownStaffReference).count(),
            2
        );
    }

    #[test]
    fn test_request_out_of_range() {
        let req = request().with_preferences(Preferences::new().with("a", 31, Shift::Off));
        let errors = validate_input(&req).unwrap_err();
        assert_eq!(errors[0].kind, ValidationErrorKind::RequestOutOfRange);
    }

    #[test]
    fn test_no_active_staff() {
        let req = GenerationRequest::new(2025, 4, vec![Staff::new("a").deactivated()]);
        let errors = validate_input(&req).unwrap_err();
        assert!(errors.iter().any(|e| e.kind == ValidationErrorKind::NoActiveStaff));
    }

    #[test]
    fn test_rotation_is_valid() {
        let report = validate(&rotation(), &request()).unwrap();
        assert!(report.is_valid(), "{}", report.summary());
        assert_eq!(report.coverage.len(), 30);
        assert_eq!(report.coverage[0].night, 1);
        assert_eq!(report.staff[0].stats.nights, 10);
        assert!(report.summary().ends_with("OK"));
    }

    #[test]
    fn test_validation_idempotent() {
        let schedule = rotation();
        let req = request();
        assert_eq!(validate(&schedule, &req).unwrap(), validate(&schedule, &req).unwrap());
    }

    #[test]
    fn test_chain_violations() {
        let mut s = rotation();
        // a: night on day 1 loses its after-shift
        s.rows[0].cells[1] = Cell::generated(Shift::Off);
        let report = validate(&s, &request()).unwrap();
        assert_eq!(report.count(ViolationKind::MissingAfterShift), 1);

        let mut s = rotation();
        // c: night on day 3 removed, its after-shift left behind
        s.rows[2].cells[2] = Cell::generated(Shift::Off);
        let report = validate(&s, &request()).unwrap();
        assert_eq!(report.count(ViolationKind::OrphanAfterShift), 1);
        assert_eq!(report.count(ViolationKind::NightUnderstaffed), 1);
    }

    #[test]
    fn test_locked_cell_breaks_chain() {
        // a requests the night on day 4 and leave on day 5: the request wins
        // over the after-shift.
        let req = request().with_preferences(
            Preferences::new()
                .with("a", 4, Shift::Night)
                .with("a", 5, Shift::PaidLeave),
        );
        let mut s = rotation();
        s.rows[0].cells[4] = Cell::new(Some(Shift::PaidLeave), Provenance::Requested);
        let report = validate(&s, &req).unwrap();
        assert_eq!(report.count(ViolationKind::MissingAfterShift), 0);
        assert_eq!(report.count(ViolationKind::OrphanAfterShift), 0);
        assert_eq!(report.count(ViolationKind::RequestNotHonored), 0);
        assert_eq!(report.count(ViolationKind::LockedCellMutated), 0);

        // the same gap without the request is still a broken chain
        let report = validate(&s, &request()).unwrap();
        assert_eq!(report.count(ViolationKind::MissingAfterShift), 1);
    }

    #[test]
    fn test_first_day_after_follows_tail() {
        let report = validate(&rotation(), &request()).unwrap();
        assert_eq!(report.count(ViolationKind::OrphanAfterShift), 0);

        let report = validate(&rotation(), &request().with_carry_over(CarryOverTail::new())).unwrap();
        assert_eq!(report.count(ViolationKind::OrphanAfterShift), 1);
    }

    #[test]
    fn test_request_not_honored_and_locked_mutation() {
        let req = request().with_preferences(Preferences::new().with("a", 2, Shift::PaidLeave));
        let report = validate(&rotation(), &req).unwrap();
        assert_eq!(report.count(ViolationKind::RequestNotHonored), 1);
        assert_eq!(report.count(ViolationKind::LockedCellMutated), 1);
        let v = report.violations_of(ViolationKind::RequestNotHonored).next().unwrap();
        assert_eq!(v.staff_id.as_deref(), Some("a"));
        assert_eq!(v.day, Some(2));
    }

    #[test]
    fn test_carry_over_supersedes_request() {
        // c's tail ends on a night, so day 1 is carry-over; the request on
        // day 1 is tolerated even though it is not honored.
        let req = request().with_preferences(Preferences::new().with("c", 1, Shift::PaidLeave));
        let report = validate(&rotation(), &req).unwrap();
        assert_eq!(report.count(ViolationKind::RequestNotHonored), 0);
        assert_eq!(report.count(ViolationKind::LockedCellMutated), 0);
    }

    #[test]
    fn test_caps() {
        let req = request()
            .with_config(
                GenerationConfig::default()
                    .with_night_pattern(vec![1])
                    .with_max_days_off(5)
                    .with_max_night_shifts(6)
                    .with_max_consecutive_days(30)
                    .with_day_staff(0, 0, 0, 0),
            )
            .with_override("c", StaffOverrides::default().exempt_from_days_off_cap());
        let report = validate(&rotation(), &req).unwrap();
        assert_eq!(report.count(ViolationKind::DaysOffExceeded), 2);
        assert_eq!(report.count(ViolationKind::NightCapExceeded), 3);
        assert_eq!(report.staff[2].days_off_cap, None);
    }

    #[test]
    fn test_quota_reported() {
        let req = request()
            .with_preferences(Preferences::new().with("a", 3, Shift::Night).with("a", 9, Shift::Off))
            .with_override("a", StaffOverrides::default().with_request_quota(1));
        let report = validate(&rotation(), &req).unwrap();
        assert_eq!(report.count(ViolationKind::RequestQuotaExceeded), 1);
    }

    #[test]
    fn test_rows_matched_by_id() {
        let mut s = rotation();
        s.rows.reverse();
        assert!(validate(&s, &request()).unwrap().is_valid());

        s.rows.pop();
        s.rows[0].cells.truncate(29);
        s.rows.push(StaffRow {
            staff_id: "zed".into(),
            cells: vec![Cell::new(Some(Shift::Off), Provenance::Manual); 30],
        });
        let report = validate(&s, &request()).unwrap();
        assert_eq!(report.count(ViolationKind::MissingStaffRow), 1);
        assert_eq!(report.count(ViolationKind::RowLengthMismatch), 1);
        assert_eq!(report.count(ViolationKind::UnknownStaff), 1);
        assert!(report.count(ViolationKind::UnassignedCell) >= 1);
    }
}
