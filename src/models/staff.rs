//! Staff model.
//!
//! Staff are the rows of the monthly grid. Rank determines assignment
//! priority when filling understaffed days and which rules apply on
//! particular days (the head does not work Sunday day shifts; when the
//! head is off, a chief or deputy chief should be on day shift).

use serde::{Deserialize, Serialize};

/// Staff rank, ordered by assignment priority (head first).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rank {
    /// Unit head.
    Head,
    /// Chief (first deputy rank).
    Chief,
    /// Deputy chief (second deputy rank).
    DeputyChief,
    /// General staff.
    General,
}

impl Default for Rank {
    fn default() -> Self {
        Rank::General
    }
}

impl Rank {
    /// Assignment priority (1 = highest).
    pub fn priority(self) -> u8 {
        match self {
            Rank::Head => 1,
            Rank::Chief => 2,
            Rank::DeputyChief => 3,
            Rank::General => 4,
        }
    }

    /// Chief or deputy chief.
    pub fn is_management(self) -> bool {
        matches!(self, Rank::Chief | Rank::DeputyChief)
    }
}

/// A staff member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Staff {
    /// Stable, unique identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Rank.
    pub rank: Rank,
    /// Inactive staff keep their history but are not scheduled.
    pub active: bool,
}

impl Staff {
    /// Creates an active general-rank staff member.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            rank: Rank::General,
            active: true,
        }
    }

    /// Creates an active head.
    pub fn head(id: impl Into<String>) -> Self {
        Self::new(id).with_rank(Rank::Head)
    }

    /// Sets the display name, normalized with [`normalize_name`].
    pub fn with_name(mut self, name: impl AsRef<str>) -> Self {
        self.name = normalize_name(name.as_ref());
        self
    }

    /// Sets the rank.
    pub fn with_rank(mut self, rank: Rank) -> Self {
        self.rank = rank;
        self
    }

    /// Marks the staff member inactive.
    pub fn deactivated(mut self) -> Self {
        self.active = false;
        self
    }
}

/// Normalizes a display name for matching imported rows to staff:
/// full-width spaces become ASCII spaces, whitespace runs collapse,
/// and the ends are trimmed.
pub fn normalize_name(name: &str) -> String {
    name.replace('\u{3000}', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
