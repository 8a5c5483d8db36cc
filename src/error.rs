//! Error types.
//!
//! Only conditions that make generation meaningless abort with an error.
//! Staffing shortfalls, cap overflows and similar outcomes are reported
//! through [`crate::validation::ValidationReport`] instead.

use thiserror::Error;

/// Configuration loading/validation error.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Main error type for shift generation.
#[derive(Debug, Error)]
pub enum ShiftError {
    /// The roster contains no active staff.
    #[error("No active staff in roster")]
    NoActiveStaff,

    /// Year/month do not form a valid calendar month (month is 1-based).
    #[error("Invalid target month: {year}-{month}")]
    InvalidMonth { year: i32, month: u32 },

    /// Two roster entries share an ID.
    #[error("Duplicate staff ID: {0}")]
    DuplicateStaffId(String),

    /// A staff ID is not present in the roster.
    #[error("Unknown staff ID: {0}")]
    UnknownStaff(String),

    /// A day number outside `1..=days`.
    #[error("Day {day} out of range (month has {days} days)")]
    DayOutOfRange { day: u32, days: u32 },

    /// A request would exceed the staff member's request quota.
    #[error("Request quota exceeded for '{staff_id}' (quota {quota})")]
    QuotaExceeded { staff_id: String, quota: u32 },

    /// Invalid generation configuration.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Result type alias for shift operations.
pub type Result<T> = std::result::Result<T, ShiftError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let e = ShiftError::InvalidMonth { year: 2025, month: 13 };
        assert_eq!(e.to_string(), "Invalid target month: 2025-13");

        let e = ShiftError::QuotaExceeded {
            staff_id: "n1".into(),
            quota: 3,
        };
        assert!(e.to_string().contains("n1"));
    }

    #[test]
    fn test_config_error_wraps() {
        let e: ShiftError = ConfigError::Invalid("empty night pattern".into()).into();
        assert!(matches!(e, ShiftError::Config(_)));
        assert!(e.to_string().contains("empty night pattern"));
    }
}
