//! Employee resolution
//!
//! Maps a free-text employee reference onto one roster entry. Names are
//! compared trimmed and lowercased, in strict tier order:
//!
//! 1. **Exact** - reference equals the display name
//! 2. **Substring** - either contains the other
//! 3. **First name** - the display name's first word, same containment test
//!
//! The first tier with any hit wins and, within a tier, the first roster
//! entry in API order. There is no scoring beyond tier order.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use shiftrelay_common::models::EmployeeRecord;
use tracing::debug;

use super::shift::{EmployeeRef, ShiftCandidate};

/// `for Jane` / `for Jane Doe` inside a comment; names are capitalized words
static FOR_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?i:for)\s+([A-Z][A-Za-z'\-]*(?:\s+[A-Z][A-Za-z'\-]*)?)").expect("valid regex")
});

/// Which rule produced a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchTier {
    Id,
    Exact,
    Substring,
    FirstName,
}

/// Outcome of resolving one reference
#[derive(Debug, Clone, PartialEq)]
pub enum MatchResult {
    Resolved {
        employee: EmployeeRecord,
        tier: MatchTier,
        candidates_checked: usize,
    },
    Unresolved {
        /// The reference exactly as extracted
        reference: String,
        candidates_checked: usize,
    },
}

impl MatchResult {
    pub fn candidates_checked(&self) -> usize {
        match self {
            MatchResult::Resolved { candidates_checked, .. }
            | MatchResult::Unresolved { candidates_checked, .. } => *candidates_checked,
        }
    }
}

/// Reference to resolve for a candidate
///
/// The explicit `employeeRef` wins; otherwise a `for <Name>` phrase in the
/// comment is used.
pub fn reference_for(candidate: &ShiftCandidate) -> Option<EmployeeRef> {
    if let Some(reference) = &candidate.employee_ref {
        return Some(reference.clone());
    }

    let comment = candidate.comment.as_deref()?;
    FOR_NAME
        .captures(comment)
        .and_then(|caps| caps.get(1))
        .map(|m| EmployeeRef::Name(m.as_str().trim().to_string()))
}

/// Resolve a reference against the roster
pub fn resolve(reference: &EmployeeRef, roster: &[EmployeeRecord]) -> MatchResult {
    let result = match reference {
        EmployeeRef::Id(id) => match roster.iter().find(|e| e.id == *id) {
            Some(employee) => MatchResult::Resolved {
                employee: employee.clone(),
                tier: MatchTier::Id,
                candidates_checked: roster.len(),
            },
            None => MatchResult::Unresolved {
                reference: id.to_string(),
                candidates_checked: roster.len(),
            },
        },
        EmployeeRef::Name(name) => match match_name(name, roster) {
            Some((employee, tier)) => MatchResult::Resolved {
                employee: employee.clone(),
                tier,
                candidates_checked: roster.len(),
            },
            None => MatchResult::Unresolved {
                reference: name.clone(),
                candidates_checked: roster.len(),
            },
        },
    };

    debug!(
        reference = %reference,
        candidates_checked = roster.len(),
        resolved = matches!(result, MatchResult::Resolved { .. }),
        "Employee resolution finished"
    );
    result
}

/// Tiered name match; `None` when no tier hits
pub fn match_name<'a>(
    name: &str,
    roster: &'a [EmployeeRecord],
) -> Option<(&'a EmployeeRecord, MatchTier)> {
    let needle = normalize(name);
    if needle.is_empty() {
        return None;
    }

    let names: Vec<String> = roster.iter().map(|e| normalize(&e.display_name)).collect();
    let first_hit = move |tier: MatchTier, test: &dyn Fn(&str) -> bool| {
        names
            .iter()
            .position(|n| !n.is_empty() && test(n.as_str()))
            .map(|idx| (&roster[idx], tier))
    };

    first_hit(MatchTier::Exact, &|n| n == needle)
        .or_else(|| first_hit(MatchTier::Substring, &|n| contains_either(&needle, n)))
        .or_else(|| {
            first_hit(MatchTier::FirstName, &|n| {
                n.split_whitespace()
                    .next()
                    .is_some_and(|first| contains_either(&needle, first))
            })
        })
}

fn normalize(s: &str) -> String {
    s.trim().to_lowercase()
}

fn contains_either(a: &str, b: &str) -> bool {
    a.contains(b) || b.contains(a)
}
