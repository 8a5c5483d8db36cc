//! Monthly shift generation for hospital wards.
//!
//! Builds a month of day, night, after-night, off and leave shifts for a
//! roster of staff, honoring staff requests and the previous month's tail,
//! meeting per-day night and day-shift headcounts, and keeping every staff
//! member within the consecutive-day, days-off and night caps.
//!
//! # Modules
//!
//! - **`models`**: Domain types: `Shift`, `Staff`, `MonthCalendar`,
//!   `GenerationConfig`, `Preferences`, `CarryOverTail`, `Schedule`
//! - **`locking`**: Cells fixed by requests and carry-over
//! - **`scheduler`**: The four-phase generator (construct, anneal,
//!   rebalance, repair)
//! - **`validation`**: Input integrity checks and the schedule report
//! - **`edit`**: Manual cell edits that keep night chains consistent
//!
//! # Example
//!
//! ```
//! use u_shift::models::{GenerationConfig, Preferences, SearchParams, Shift, Staff};
//! use u_shift::{generate, validate, GenerationRequest};
//!
//! let roster: Vec<Staff> = (0..12).map(|i| Staff::new(format!("n{i}"))).collect();
//! let config = GenerationConfig::default()
//!     .with_max_night_shifts(8)
//!     .with_max_days_off(12)
//!     .with_day_staff(5, 3, 3, 3)
//!     .with_search(SearchParams { candidates: 2, anneal_iterations: 200, ..SearchParams::default() });
//! let request = GenerationRequest::new(2025, 4, roster)
//!     .with_preferences(Preferences::new().with("n3", 5, Shift::Night))
//!     .with_config(config)
//!     .with_seed(1);
//!
//! let outcome = generate(&request).unwrap();
//! assert_eq!(outcome.schedule.shift("n3", 4), Some(Shift::Night));
//! assert_eq!(outcome.schedule.shift("n3", 5), Some(Shift::NightAfter));
//!
//! let report = validate(&outcome.schedule, &request).unwrap();
//! assert_eq!(report, outcome.report);
//! ```
//!
//! # References
//!
//! - Burke et al. (2004), "The State of the Art of Nurse Rostering"
//! - Kirkpatrick, Gelatt & Vecchi (1983), "Optimization by Simulated Annealing"

pub mod edit;
pub mod error;
pub mod locking;
pub mod models;
pub mod scheduler;
pub mod validation;

pub use error::{ConfigError, ShiftError};
pub use scheduler::{generate, GenerationOutcome, GenerationRequest, ShiftGenerator};
pub use validation::{validate, ValidationReport};
