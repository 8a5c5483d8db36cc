//! Staff requests and previous-month carry-over data.
//!
//! Requests are submitted per staff member as `day → shift` (1-based
//! days). A night request implies an after-shift on the next day and a
//! rest day after that; request maps imported from the submission UI
//! may already contain those implied entries. They are classified as
//! [`RequestKind::Derived`] and do not count against a request quota.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::config::StaffOverrides;
use super::shift::Shift;
use crate::error::ShiftError;
use crate::locking::derive_carry_over;

/// Whether a request entry was chosen by the staff member or implied by
/// a night request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    /// Explicitly requested.
    Direct,
    /// After-shift or rest day implied by a night request.
    Derived,
}

/// One classified request entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestEntry {
    /// Day number (1-based).
    pub day: u32,
    /// Requested shift.
    pub shift: Shift,
    /// Classification.
    pub kind: RequestKind,
}

/// Staff requests for one target month.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Preferences {
    entries: BTreeMap<String, BTreeMap<u32, Shift>>,
}

impl Preferences {
    /// Creates an empty request set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds from raw symbols, dropping unrecognized ones.
    pub fn from_raw<I, K, D, V>(raw: I) -> Self
    where
        I: IntoIterator<Item = (K, D)>,
        K: Into<String>,
        D: IntoIterator<Item = (u32, V)>,
        V: AsRef<str>,
    {
        let mut prefs = Self::new();
        for (staff_id, days) in raw {
            let staff_id = staff_id.into();
            for (day, symbol) in days {
                if let Some(shift) = Shift::normalize(symbol.as_ref()) {
                    prefs.set(staff_id.clone(), day, shift);
                }
            }
        }
        prefs
    }

    /// Sets a request without quota checks (administrative import).
    pub fn set(&mut self, staff_id: impl Into<String>, day: u32, shift: Shift) {
        self.entries
            .entry(staff_id.into())
            .or_default()
            .insert(day, shift);
    }

    /// Builder form of [`Preferences::set`].
    pub fn with(mut self, staff_id: impl Into<String>, day: u32, shift: Shift) -> Self {
        self.set(staff_id, day, shift);
        self
    }

    /// Submits a request, enforcing the staff member's request quota.
    ///
    /// Submitting a night also records the implied after-shift and rest
    /// day when those days are free; implied entries never count against
    /// the quota. Replacing an existing direct request is always allowed.
    pub fn insert_request(
        &mut self,
        staff_id: &str,
        day: u32,
        shift: Shift,
        days_in_month: u32,
        overrides: &StaffOverrides,
    ) -> Result<(), ShiftError> {
        if day == 0 || day > days_in_month {
            return Err(ShiftError::DayOutOfRange {
                day,
                days: days_in_month,
            });
        }
        if let Some(quota) = overrides.request_quota {
            let replacing = self
                .classified(staff_id)
                .iter()
                .any(|e| e.day == day && e.kind == RequestKind::Direct);
            if !replacing && self.quota_usage(staff_id) >= quota as usize {
                return Err(ShiftError::QuotaExceeded {
                    staff_id: staff_id.to_string(),
                    quota,
                });
            }
        }

        self.set(staff_id, day, shift);
        if let Some(after) = shift.after_shift() {
            let row = self.entries.entry(staff_id.to_string()).or_default();
            if day < days_in_month {
                row.entry(day + 1).or_insert(after);
            }
            if day + 1 < days_in_month {
                row.entry(day + 2).or_insert(Shift::Off);
            }
        }
        Ok(())
    }

    /// Removes a request. Implied after/rest entries of a removed night
    /// are removed with it.
    pub fn remove_request(&mut self, staff_id: &str, day: u32) -> Option<Shift> {
        let derived: Vec<u32> = self
            .classified(staff_id)
            .into_iter()
            .filter(|e| e.kind == RequestKind::Derived && (e.day == day + 1 || e.day == day + 2))
            .map(|e| e.day)
            .collect();
        let row = self.entries.get_mut(staff_id)?;
        let removed = row.remove(&day)?;
        if removed.is_night() {
            for d in derived {
                row.remove(&d);
            }
        }
        Some(removed)
    }

    /// Raw request map for a staff member.
    pub fn for_staff(&self, staff_id: &str) -> Option<&BTreeMap<u32, Shift>> {
        self.entries.get(staff_id)
    }

    /// Request for a staff member on a day.
    pub fn get(&self, staff_id: &str, day: u32) -> Option<Shift> {
        self.entries.get(staff_id)?.get(&day).copied()
    }

    /// Staff IDs with at least one request.
    pub fn staff_ids(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Total number of request entries.
    pub fn len(&self) -> usize {
        self.entries.values().map(BTreeMap::len).sum()
    }

    /// Whether no requests were submitted.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Classifies a staff member's requests into direct and derived.
    ///
    /// An after-shift directly following the matching night request is
    /// derived; so is an off request directly following such a derived
    /// after-shift.
    pub fn classified(&self, staff_id: &str) -> Vec<RequestEntry> {
        let Some(row) = self.entries.get(staff_id) else {
            return Vec::new();
        };
        let mut out: Vec<RequestEntry> = Vec::with_capacity(row.len());
        for (&day, &shift) in row {
            let prev = day.checked_sub(1).and_then(|p| row.get(&p).copied());
            let prev2 = day.checked_sub(2).and_then(|p| row.get(&p).copied());
            let derived_after = shift
                .night_for_after()
                .is_some_and(|night| prev == Some(night));
            let derived_rest = shift == Shift::Off
                && matches!((prev2, prev), (Some(n), Some(a)) if n.after_shift() == Some(a));
            let kind = if derived_after || derived_rest {
                RequestKind::Derived
            } else {
                RequestKind::Direct
            };
            out.push(RequestEntry { day, shift, kind });
        }
        out
    }

    /// Number of direct requests (the quota-relevant count).
    pub fn quota_usage(&self, staff_id: &str) -> usize {
        self.classified(staff_id)
            .iter()
            .filter(|e| e.kind == RequestKind::Direct)
            .count()
    }

    /// Number of staff with a request on a given day.
    pub fn requests_on_day(&self, day: u32) -> usize {
        self.entries
            .values()
            .filter(|row| row.contains_key(&day))
            .count()
    }

    /// Number of paid-leave requests for a staff member.
    pub fn paid_leave_count(&self, staff_id: &str) -> usize {
        self.entries
            .get(staff_id)
            .map(|row| row.values().filter(|s| **s == Shift::PaidLeave).count())
            .unwrap_or(0)
    }
}

/// The last shifts of each staff member's previous month, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CarryOverTail {
    tails: BTreeMap<String, Vec<Option<Shift>>>,
}

impl CarryOverTail {
    /// Creates an empty tail set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds from raw symbols; unrecognized symbols become empty cells.
    pub fn from_raw<I, K, T, V>(raw: I) -> Self
    where
        I: IntoIterator<Item = (K, T)>,
        K: Into<String>,
        T: IntoIterator<Item = V>,
        V: AsRef<str>,
    {
        let tails = raw
            .into_iter()
            .map(|(id, shifts)| {
                let cells = shifts
                    .into_iter()
                    .map(|s| Shift::normalize(s.as_ref()))
                    .collect();
                (id.into(), cells)
            })
            .collect();
        Self { tails }
    }

    /// Sets a staff member's tail.
    pub fn with(mut self, staff_id: impl Into<String>, tail: Vec<Option<Shift>>) -> Self {
        self.tails.insert(staff_id.into(), tail);
        self
    }

    /// A staff member's tail.
    pub fn tail(&self, staff_id: &str) -> Option<&[Option<Shift>]> {
        self.tails.get(staff_id).map(Vec::as_slice)
    }

    /// Whether no tails are present.
    pub fn is_empty(&self) -> bool {
        self.tails.is_empty()
    }

    /// Staff IDs with a tail.
    pub fn staff_ids(&self) -> impl Iterator<Item = &str> {
        self.tails.keys().map(String::as_str)
    }

    /// Forced first-of-month shifts per staff member (1-based days),
    /// recomputed from the raw tails.
    pub fn derive_constraints(&self, max_consecutive: u32) -> BTreeMap<String, BTreeMap<u32, Shift>> {
        self.tails
            .iter()
            .map(|(id, tail)| (id.clone(), derive_carry_over(tail, max_consecutive)))
            .filter(|(_, forced)| !forced.is_empty())
            .collect()
    }
}
