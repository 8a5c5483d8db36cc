//! Generation input and its resolved form.
//!
//! [`GenerationRequest`] is the plain-data input supplied by the caller.
//! [`GenerationContext`] is derived from it once per run: active roster in
//! order, calendar, per-day requirements, per-staff rules and the lock set.
//! Every phase reads the context; none of them mutate it.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::ShiftError;
use crate::locking::LockSet;
use crate::models::{
    CarryOverTail, GenerationConfig, MonthCalendar, Preferences, Rank, Staff, StaffOverrides,
    StaffingRequirement,
};

/// Input container for one generation run.
///
/// # Example
///
/// ```
/// use u_shift::models::{Shift, Staff, Preferences};
/// use u_shift::scheduler::GenerationRequest;
///
/// let roster = vec![Staff::head("h"), Staff::new("n1"), Staff::new("n2")];
/// let request = GenerationRequest::new(2025, 4, roster)
///     .with_preferences(Preferences::new().with("n1", 5, Shift::Night))
///     .with_seed(42);
/// assert_eq!(request.seed, 42);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Target year.
    pub year: i32,
    /// Target month (1–12).
    pub month: u32,
    /// Roster in display order; inactive staff are skipped.
    pub roster: Vec<Staff>,
    /// Staff requests.
    pub preferences: Preferences,
    /// Previous month's tails.
    pub carry_over: CarryOverTail,
    /// Per-staff overrides by staff ID.
    pub overrides: BTreeMap<String, StaffOverrides>,
    /// Generation configuration.
    pub config: GenerationConfig,
    /// Base seed for every random choice in the run.
    pub seed: u64,
}

impl GenerationRequest {
    /// Creates a request with default configuration and no requests.
    pub fn new(year: i32, month: u32, roster: Vec<Staff>) -> Self {
        Self {
            year,
            month,
            roster,
            preferences: Preferences::new(),
            carry_over: CarryOverTail::new(),
            overrides: BTreeMap::new(),
            config: GenerationConfig::default(),
            seed: 0,
        }
    }

    /// Sets staff requests.
    pub fn with_preferences(mut self, preferences: Preferences) -> Self {
        self.preferences = preferences;
        self
    }

    /// Sets previous-month tails.
    pub fn with_carry_over(mut self, carry_over: CarryOverTail) -> Self {
        self.carry_over = carry_over;
        self
    }

    /// Sets one staff member's overrides.
    pub fn with_override(mut self, staff_id: impl Into<String>, overrides: StaffOverrides) -> Self {
        self.overrides.insert(staff_id.into(), overrides);
        self
    }

    /// Replaces all overrides.
    pub fn with_overrides(mut self, overrides: BTreeMap<String, StaffOverrides>) -> Self {
        self.overrides = overrides;
        self
    }

    /// Sets the configuration.
    pub fn with_config(mut self, config: GenerationConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the base seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Active staff in roster order.
    pub fn active_staff(&self) -> impl Iterator<Item = &Staff> {
        self.roster.iter().filter(|s| s.active)
    }

    /// Overrides for a staff member (defaults when none are set).
    pub fn overrides_for(&self, staff_id: &str) -> StaffOverrides {
        self.overrides.get(staff_id).cloned().unwrap_or_default()
    }
}

/// Resolved per-staff rules.
#[derive(Debug, Clone, PartialEq)]
pub struct StaffRules {
    /// Staff ID.
    pub id: String,
    /// Rank.
    pub rank: Rank,
    /// Effective night cap (0 when excluded from nights).
    pub night_cap: u32,
    /// Excluded from day shifts.
    pub no_day: bool,
    /// Exempt from the days-off cap.
    pub days_off_exempt: bool,
    /// Paid-leave requests already submitted.
    pub paid_leave_requests: usize,
}

/// Everything a generation run reads, resolved once.
#[derive(Debug, Clone)]
pub struct GenerationContext {
    /// Target month calendar.
    pub calendar: MonthCalendar,
    /// Validated configuration.
    pub config: GenerationConfig,
    /// Active staff in roster order.
    pub staff: Vec<StaffRules>,
    /// Per-day requirements.
    pub requirements: Vec<StaffingRequirement>,
    /// Locked cells.
    pub locks: LockSet,
}

impl GenerationContext {
    /// Resolves a request.
    ///
    /// # Errors
    /// Invalid configuration or month, duplicate staff IDs, or a roster
    /// without active staff.
    pub fn resolve(request: &GenerationRequest) -> Result<Self, ShiftError> {
        request.config.validate()?;
        let calendar = MonthCalendar::new(request.year, request.month)?;

        let mut seen = BTreeSet::new();
        for staff in &request.roster {
            if !seen.insert(staff.id.as_str()) {
                return Err(ShiftError::DuplicateStaffId(staff.id.clone()));
            }
        }

        let staff: Vec<StaffRules> = request
            .active_staff()
            .map(|s| {
                let o = request.overrides_for(&s.id);
                StaffRules {
                    id: s.id.clone(),
                    rank: s.rank,
                    night_cap: o.night_cap(request.config.max_night_shifts),
                    no_day: o.no_day_shift,
                    days_off_exempt: o.days_off_exempt,
                    paid_leave_requests: request.preferences.paid_leave_count(&s.id),
                }
            })
            .collect();
        if staff.is_empty() {
            return Err(ShiftError::NoActiveStaff);
        }

        for id in request.preferences.staff_ids() {
            if !staff.iter().any(|s| s.id == id) {
                tracing::warn!(event = "request_for_unscheduled_staff", staff = id);
            }
        }

        let ids: Vec<&str> = staff.iter().map(|s| s.id.as_str()).collect();
        let locks = LockSet::build(
            &ids,
            calendar.days(),
            &request.preferences,
            &request.carry_over,
            request.config.max_consecutive_days,
        );
        let requirements = request.config.requirements(&calendar);

        Ok(Self {
            calendar,
            config: request.config.clone(),
            staff,
            requirements,
            locks,
        })
    }

    /// Days in the target month.
    #[inline]
    pub fn days(&self) -> usize {
        self.calendar.days()
    }

    /// Number of scheduled staff.
    #[inline]
    pub fn staff_count(&self) -> usize {
        self.staff.len()
    }

    /// Consecutive work day cap.
    #[inline]
    pub fn max_consecutive(&self) -> u32 {
        self.config.max_consecutive_days
    }

    /// Days-off cap for a staff row, `None` when exempt.
    pub fn off_cap(&self, staff: usize) -> Option<u32> {
        (!self.staff[staff].days_off_exempt).then_some(self.config.max_days_off)
    }

    /// Whether a staff row may work a day shift on a day: not excluded
    /// from day shifts, and not the head on a Sunday.
    pub fn can_work_day(&self, staff: usize, day: usize) -> bool {
        let rules = &self.staff[staff];
        !rules.no_day && !(rules.rank == Rank::Head && self.calendar.is_sunday(day))
    }

    /// Row index of the first head, if any.
    pub fn head(&self) -> Option<usize> {
        self.staff.iter().position(|s| s.rank == Rank::Head)
    }

    /// Staff IDs in row order.
    pub fn staff_ids(&self) -> Vec<&str> {
        self.staff.iter().map(|s| s.id.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Shift;

    fn roster() -> Vec<Staff> {
        vec![
            Staff::head("h"),
            Staff::new("c").with_rank(Rank::Chief),
            Staff::new("n1"),
            Staff::new("gone").deactivated(),
        ]
    }

    #[test]
    fn test_resolve_skips_inactive() {
        let req = GenerationRequest::new(2025, 4, roster())
            .with_override("n1", StaffOverrides::default().no_nights());
        let ctx = GenerationContext::resolve(&req).unwrap();
        assert_eq!(ctx.staff_count(), 3);
        assert_eq!(ctx.days(), 30);
        assert_eq!(ctx.staff[2].night_cap, 0);
        assert_eq!(ctx.staff[0].night_cap, 6);
        assert_eq!(ctx.head(), Some(0));
        assert_eq!(ctx.requirements.len(), 30);
    }

    #[test]
    fn test_head_sunday_rule() {
        let ctx = GenerationContext::resolve(&GenerationRequest::new(2025, 4, roster())).unwrap();
        // 2025-04-06 is a Sunday
        assert!(!ctx.can_work_day(0, 5));
        assert!(ctx.can_work_day(0, 4));
        assert!(ctx.can_work_day(1, 5));
    }

    #[test]
    fn test_resolve_errors() {
        let empty = GenerationRequest::new(2025, 4, vec![Staff::new("x").deactivated()]);
        assert!(matches!(
            GenerationContext::resolve(&empty),
            Err(ShiftError::NoActiveStaff)
        ));

        let dup = GenerationRequest::new(2025, 4, vec![Staff::new("x"), Staff::new("x")]);
        assert!(matches!(
            GenerationContext::resolve(&dup),
            Err(ShiftError::DuplicateStaffId(_))
        ));

        let bad_month = GenerationRequest::new(2025, 13, roster());
        assert!(matches!(
            GenerationContext::resolve(&bad_month),
            Err(ShiftError::InvalidMonth { .. })
        ));

        let bad_config = GenerationRequest::new(2025, 4, roster())
            .with_config(GenerationConfig::default().with_night_pattern(vec![]));
        assert!(matches!(
            GenerationContext::resolve(&bad_config),
            Err(ShiftError::Config(_))
        ));
    }

    #[test]
    fn test_locks_follow_roster_rows() {
        let req = GenerationRequest::new(2025, 4, roster())
            .with_preferences(Preferences::new().with("n1", 3, Shift::Off));
        let ctx = GenerationContext::resolve(&req).unwrap();
        assert!(ctx.locks.is_locked(2, 2));
        assert!(!ctx.locks.is_locked(0, 2));
    }

    #[test]
    fn test_off_cap_exemption() {
        let req = GenerationRequest::new(2025, 4, roster())
            .with_override("c", StaffOverrides::default().exempt_from_days_off_cap());
        let ctx = GenerationContext::resolve(&req).unwrap();
        assert_eq!(ctx.off_cap(0), Some(10));
        assert_eq!(ctx.off_cap(1), None);
    }
}
