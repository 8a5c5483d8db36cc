//! Generation configuration and per-staff overrides.
//!
//! Load from TOML to tune staffing targets and search effort without
//! code changes.
//!
//! ```
//! use u_shift::models::GenerationConfig;
//!
//! let config = GenerationConfig::from_toml_str(r#"
//!     night_pattern = [3, 3]
//!     max_days_off = 9
//!     weekday_day_staff = 6
//!
//!     [search]
//!     candidates = 10
//! "#).unwrap();
//!
//! assert_eq!(config.night_pattern, vec![3, 3]);
//! assert_eq!(config.max_consecutive_days, 5); // default
//! assert_eq!(config.search.candidates, 10);
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::calendar::{DayKind, MonthCalendar};
use crate::error::ConfigError;

/// Per-run generation parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Night staff per day, alternating by week window.
    pub night_pattern: Vec<u32>,
    /// Pattern slot used by the first week window. With the default `0`
    /// and pattern `[2, 3]` the month opens with two night staff.
    pub night_pattern_offset: usize,
    /// Default per-staff night-shift cap.
    pub max_night_shifts: u32,
    /// Maximum consecutive work days.
    pub max_consecutive_days: u32,
    /// Maximum days off (off + paid leave) per month.
    pub max_days_off: u32,
    /// Day staff on ordinary weekdays.
    pub weekday_day_staff: u32,
    /// Day staff on weekends and holidays.
    pub weekend_day_staff: u32,
    /// Day staff on December 30–31.
    pub year_end_day_staff: u32,
    /// Day staff on January 1–3.
    pub year_start_day_staff: u32,
    /// Search effort.
    pub search: SearchParams,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            night_pattern: vec![2, 3],
            night_pattern_offset: 0,
            max_night_shifts: 6,
            max_consecutive_days: 5,
            max_days_off: 10,
            weekday_day_staff: 7,
            weekend_day_staff: 5,
            year_end_day_staff: 4,
            year_start_day_staff: 4,
            search: SearchParams::default(),
        }
    }
}

/// Search effort and annealing schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchParams {
    /// Phase-1 candidates built per run.
    pub candidates: usize,
    /// Annealing iterations.
    pub anneal_iterations: usize,
    /// Starting temperature.
    pub initial_temperature: f64,
    /// Multiplicative cooling per iteration, in (0, 1).
    pub cooling_rate: f64,
    /// Fairness rebalancing pass budget.
    pub fairness_passes: usize,
    /// Day-shift gap between most and least loaded staff tolerated by
    /// the fairness pass.
    pub fairness_gap: u32,
    /// Retry bound for each repair loop.
    pub repair_attempts: usize,
    /// Build Phase-1 candidates on the rayon pool.
    pub parallel_candidates: bool,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            candidates: 30,
            anneal_iterations: 1000,
            initial_temperature: 10.0,
            cooling_rate: 0.995,
            fairness_passes: 50,
            fairness_gap: 2,
            repair_attempts: 20,
            parallel_candidates: true,
        }
    }
}

/// Day and night headcount targets for one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffingRequirement {
    /// Required day-shift staff.
    pub day: u32,
    /// Largest acceptable day-shift headcount (target + 2 on ordinary
    /// weekdays, exactly the target otherwise).
    pub day_allowance: u32,
    /// Required ward night staff.
    pub night: u32,
}

/// Weekday overstaffing tolerance for day shifts.
pub const WEEKDAY_DAY_SLACK: u32 = 2;

impl GenerationConfig {
    /// Creates the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Parses configuration from a TOML string and validates it.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Serializes to TOML.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string(self).map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    /// Checks values that would make generation meaningless.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.night_pattern.is_empty() {
            return Err(ConfigError::Invalid("night_pattern must not be empty".into()));
        }
        if self.max_consecutive_days == 0 {
            return Err(ConfigError::Invalid(
                "max_consecutive_days must be at least 1".into(),
            ));
        }
        let rate = self.search.cooling_rate;
        if !(rate > 0.0 && rate < 1.0) {
            return Err(ConfigError::Invalid(format!(
                "cooling_rate must be in (0, 1), got {rate}"
            )));
        }
        if self.search.initial_temperature <= 0.0 {
            return Err(ConfigError::Invalid(
                "initial_temperature must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Sets the alternating night pattern.
    pub fn with_night_pattern(mut self, pattern: Vec<u32>) -> Self {
        self.night_pattern = pattern;
        self
    }

    /// Sets the pattern slot of the first week window.
    pub fn with_night_pattern_offset(mut self, offset: usize) -> Self {
        self.night_pattern_offset = offset;
        self
    }

    /// Sets the global night cap.
    pub fn with_max_night_shifts(mut self, cap: u32) -> Self {
        self.max_night_shifts = cap;
        self
    }

    /// Sets the consecutive work day cap.
    pub fn with_max_consecutive_days(mut self, cap: u32) -> Self {
        self.max_consecutive_days = cap;
        self
    }

    /// Sets the days-off cap.
    pub fn with_max_days_off(mut self, cap: u32) -> Self {
        self.max_days_off = cap;
        self
    }

    /// Sets the four day-shift targets.
    pub fn with_day_staff(mut self, weekday: u32, weekend: u32, year_end: u32, year_start: u32) -> Self {
        self.weekday_day_staff = weekday;
        self.weekend_day_staff = weekend;
        self.year_end_day_staff = year_end;
        self.year_start_day_staff = year_start;
        self
    }

    /// Sets the search parameters.
    pub fn with_search(mut self, search: SearchParams) -> Self {
        self.search = search;
        self
    }

    /// Day-shift target for a day kind.
    pub fn day_target(&self, kind: DayKind) -> u32 {
        match kind {
            DayKind::Weekday => self.weekday_day_staff,
            DayKind::WeekendOrHoliday => self.weekend_day_staff,
            DayKind::YearEnd => self.year_end_day_staff,
            DayKind::YearStart => self.year_start_day_staff,
        }
    }

    /// Resolves staffing requirements for every day of a month.
    pub fn requirements(&self, calendar: &MonthCalendar) -> Vec<StaffingRequirement> {
        let windows = calendar.night_windows(&self.night_pattern, self.night_pattern_offset);
        calendar
            .iter()
            .enumerate()
            .map(|(d, info)| {
                let day = self.day_target(info.kind);
                let day_allowance = if info.is_ordinary_weekday() {
                    day + WEEKDAY_DAY_SLACK
                } else {
                    day
                };
                let night = windows
                    .iter()
                    .find(|w| w.contains(d))
                    .map(|w| w.required)
                    .unwrap_or(0);
                StaffingRequirement {
                    day,
                    day_allowance,
                    night,
                }
            })
            .collect()
    }
}

/// Per-staff constraint overrides.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StaffOverrides {
    /// Night cap replacing the global one.
    pub max_night_shifts: Option<u32>,
    /// Never assign night shifts.
    pub no_night_shift: bool,
    /// Never assign day shifts.
    pub no_day_shift: bool,
    /// Excluded from the days-off cap.
    pub days_off_exempt: bool,
    /// Maximum number of direct requests this staff member may submit.
    pub request_quota: Option<u32>,
}

impl StaffOverrides {
    /// Effective night cap.
    pub fn night_cap(&self, global: u32) -> u32 {
        if self.no_night_shift {
            0
        } else {
            self.max_night_shifts.unwrap_or(global)
        }
    }

    /// Sets a night cap.
    pub fn with_max_night_shifts(mut self, cap: u32) -> Self {
        self.max_night_shifts = Some(cap);
        self
    }

    /// Excludes from night shifts.
    pub fn no_nights(mut self) -> Self {
        self.no_night_shift = true;
        self
    }

    /// Excludes from day shifts.
    pub fn no_days(mut self) -> Self {
        self.no_day_shift = true;
        self
    }

    /// Exempts from the days-off cap.
    pub fn exempt_from_days_off_cap(mut self) -> Self {
        self.days_off_exempt = true;
        self
    }

    /// Sets the request quota.
    pub fn with_request_quota(mut self, quota: u32) -> Self {
        self.request_quota = Some(quota);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let c = GenerationConfig::default();
        assert_eq!(c.night_pattern, vec![2, 3]);
        assert_eq!(c.max_night_shifts, 6);
        assert_eq!(c.max_consecutive_days, 5);
        assert_eq!(c.weekday_day_staff, 7);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn test_toml_partial_override() {
        let c = GenerationConfig::from_toml_str(
            r#"
            max_night_shifts = 8
            [search]
            anneal_iterations = 200
            "#,
        )
        .unwrap();
        assert_eq!(c.max_night_shifts, 8);
        assert_eq!(c.search.anneal_iterations, 200);
        assert_eq!(c.search.candidates, 30);
        assert_eq!(c.weekend_day_staff, 5);
    }

    #[test]
    fn test_toml_round_trip() {
        let c = GenerationConfig::default().with_max_days_off(9);
        let s = c.to_toml_string().unwrap();
        let back = GenerationConfig::from_toml_str(&s).unwrap();
        assert_eq!(back, c);
    }

    #[test]
    fn test_validate_rejects() {
        let c = GenerationConfig::default().with_night_pattern(vec![]);
        assert!(matches!(c.validate(), Err(ConfigError::Invalid(_))));

        let c = GenerationConfig::default().with_max_consecutive_days(0);
        assert!(c.validate().is_err());

        let mut c = GenerationConfig::default();
        c.search.cooling_rate = 1.5;
        assert!(c.validate().is_err());

        assert!(matches!(
            GenerationConfig::from_toml_str("night_pattern = \"x\""),
            Err(ConfigError::Toml(_))
        ));
    }

    #[test]
    fn test_requirements_by_kind() {
        let c = GenerationConfig::default().with_day_staff(6, 5, 4, 3);
        let cal = MonthCalendar::new(2025, 12).unwrap();
        let reqs = c.requirements(&cal);
        assert_eq!(reqs.len(), 31);
        assert_eq!(reqs[0].day, 6); // Monday
        assert_eq!(reqs[0].day_allowance, 8);
        assert_eq!(reqs[5].day, 5); // Saturday
        assert_eq!(reqs[5].day_allowance, 5);
        assert_eq!(reqs[30].day, 4); // Dec 31
        assert_eq!(reqs[30].day_allowance, 4);

        let jan = MonthCalendar::new(2026, 1).unwrap();
        assert_eq!(c.requirements(&jan)[1].day, 3);
    }

    #[test]
    fn test_requirements_night_windows() {
        let c = GenerationConfig::default().with_night_pattern(vec![2, 3]);
        let cal = MonthCalendar::new(2025, 4).unwrap();
        let reqs = c.requirements(&cal);
        assert_eq!(reqs[0].night, 2);
        assert_eq!(reqs[4].night, 2); // Sat 5
        assert_eq!(reqs[5].night, 3); // Sun 6 opens the next window
        assert_eq!(reqs[6].night, reqs[5].night);
        assert_eq!(reqs[11].night, 3); // Sat 12
        assert_eq!(reqs[12].night, 2); // Sun 13
    }

    #[test]
    fn test_default_first_window_takes_first_slot() {
        let c = GenerationConfig::default();
        assert_eq!(c.night_pattern_offset, 0);
        let reqs = c.requirements(&MonthCalendar::new(2025, 4).unwrap());
        assert_eq!(reqs[0].night, 2);
        assert_eq!(reqs[5].night, 3);

        let shifted = c.clone().with_night_pattern_offset(1);
        assert_eq!(shifted.requirements(&MonthCalendar::new(2025, 4).unwrap())[0].night, 3);
    }

    #[test]
    fn test_overrides_night_cap() {
        assert_eq!(StaffOverrides::default().night_cap(6), 6);
        assert_eq!(StaffOverrides::default().with_max_night_shifts(3).night_cap(6), 3);
        assert_eq!(
            StaffOverrides::default().with_max_night_shifts(3).no_nights().night_cap(6),
            0
        );
    }
}
