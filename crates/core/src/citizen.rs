// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Defensive display of citizen data.
//!
//! Upstream records frequently carry names assembled from missing parts
//! (`"undefined undefined"`, `"null Perez"`) or placeholder text. Display
//! resolution falls back, in order:
//!
//! 1. the sanitised full name, if anything meaningful is left
//! 2. `Citizen ID: {national_id}` when the national id is not a null sentinel
//! 3. `Data unavailable`

use crate::ticket::{Citizen, Ticket};

/// Shown when neither a name nor a national id can be resolved.
pub const DATA_UNAVAILABLE: &str = "Data unavailable";

/// Tokens produced by concatenating absent values.
const NULL_TOKENS: &[&str] = &["null", "undefined", "nan", "none", "-"];

/// Whole-name placeholders entered when the name was unknown.
const PLACEHOLDER_NAMES: &[&str] = &["sin nombre", "sin datos", "n/a", "no name", "unknown"];

/// Sanitises a raw full name, returning `None` when nothing usable remains.
///
/// Null tokens are dropped and whitespace is collapsed.
pub fn sanitize_name(raw: &str) -> Option<String> {
    let cleaned: Vec<&str> = raw
        .split_whitespace()
        .filter(|token| !NULL_TOKENS.contains(&token.to_lowercase().as_str()))
        .collect();

    if cleaned.is_empty() {
        return None;
    }

    let name = cleaned.join(" ");
    if PLACEHOLDER_NAMES.contains(&name.to_lowercase().as_str()) {
        return None;
    }
    Some(name)
}

/// Returns true if a national id value is missing or a null sentinel.
pub fn is_null_national_id(raw: &str) -> bool {
    let trimmed = raw.trim();
    trimmed.is_empty()
        || trimmed == "0"
        || NULL_TOKENS.contains(&trimmed.to_lowercase().as_str())
}

/// Resolves the name to display for a citizen.
pub fn display_name(citizen: &Citizen) -> String {
    if let Some(name) = citizen.full_name.as_deref().and_then(sanitize_name) {
        return name;
    }

    match citizen.national_id.as_deref() {
        Some(id) if !is_null_national_id(id) => format!("Citizen ID: {}", id.trim()),
        _ => DATA_UNAVAILABLE.to_string(),
    }
}

/// Free-text search predicate over a ticket.
///
/// Matches the ticket code, the citizen's national id, or the resolved
/// display name; case-insensitive substring match. An empty query matches
/// everything.
pub fn matches_query(ticket: &Ticket, query: &str) -> bool {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return true;
    }

    if ticket.code.to_lowercase().contains(&needle) {
        return true;
    }
    if let Some(id) = ticket.citizen.national_id.as_deref() {
        if !is_null_national_id(id) && id.to_lowercase().contains(&needle) {
            return true;
        }
    }
    display_name(&ticket.citizen).to_lowercase().contains(&needle)
}

#[cfg(test)]
#[path = "citizen_tests.rs"]
mod tests;
