// ⚖️ Tie-Break Sorter - Orders riders level on total
// Standings are sorted by total faults first. Only runs of equal totals are
// then reordered by the jump-off (tie-break round): faults, then time.

use crate::config::TieBreakMode;
use crate::row::Cell;
use crate::score::{elimination_code, time_to_seconds, TIME_SENTINEL};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Tie-break points of a rider without a jump-off result (sorts last)
pub const MISSING_TIE_BREAK: f64 = 999_999.0;

/// Tie-break points of a jump-off elimination (just ahead of "missing")
pub const ELIMINATED_TIE_BREAK: f64 = 999_998.0;

// ============================================================================
// KEYS
// ============================================================================

/// Secondary ordering key of one standing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TieBreakKey {
    pub score: f64,
    pub time: f64,
}

impl TieBreakKey {
    /// Key for a rider with no jump-off at all
    pub fn missing() -> Self {
        TieBreakKey {
            score: MISSING_TIE_BREAK,
            time: TIME_SENTINEL,
        }
    }

    /// Key built from the original jump-off score cell and time text.
    pub fn from_round(score: Option<&Cell>, time: Option<&str>) -> Self {
        TieBreakKey {
            score: tie_break_points(score),
            time: time_to_seconds(time),
        }
    }

    /// Key for formats that order only by the time of one day.
    pub fn time_only(time: Option<&str>) -> Self {
        TieBreakKey {
            score: 0.0,
            time: time_to_seconds(time),
        }
    }

    fn compare(&self, other: &TieBreakKey) -> Ordering {
        self.score
            .total_cmp(&other.score)
            .then_with(|| self.time.total_cmp(&other.time))
    }
}

/// Jump-off points used for ordering: numeric value, or a sentinel for
/// eliminations and missing/unreadable scores.
pub fn tie_break_points(score: Option<&Cell>) -> f64 {
    let Some(cell) = score else {
        return MISSING_TIE_BREAK;
    };
    if cell.is_blank() || cell.as_text().trim() == "-" {
        return MISSING_TIE_BREAK;
    }
    if elimination_code(cell).is_some() {
        return ELIMINATED_TIE_BREAK;
    }
    cell.to_number().unwrap_or(MISSING_TIE_BREAK)
}

/// Whether a jump-off entry deserves highlighting: an elimination or a number.
pub fn has_valid_tie_break(score: Option<&Cell>) -> bool {
    match score {
        Some(cell) if !cell.is_blank() && cell.as_text().trim() != "-" => {
            elimination_code(cell).is_some() || cell.to_number().is_some()
        }
        _ => false,
    }
}

/// Resolve the key for a standing under the configured tie-break mode.
///
/// `round` yields the (score, time) of the jump-off day for
/// [`TieBreakMode::ScoreThenTime`]; `day_time` yields the time of a given day
/// for [`TieBreakMode::TimeOnly`].
pub fn resolve_key<'a, R, D>(mode: &TieBreakMode, round: R, day_time: D) -> TieBreakKey
where
    R: FnOnce() -> Option<(Option<&'a Cell>, Option<String>)>,
    D: FnOnce(&str) -> Option<String>,
{
    match mode {
        TieBreakMode::ScoreThenTime => match round() {
            Some((score, time)) => TieBreakKey::from_round(score, time.as_deref()),
            None => TieBreakKey::missing(),
        },
        TieBreakMode::TimeOnly { day } => TieBreakKey::time_only(day_time(day).as_deref()),
    }
}

// ============================================================================
// ORDERING
// ============================================================================

/// Anything that can be placed in a standings table.
pub trait Standing {
    fn total(&self) -> f64;
    fn tie_break(&self) -> TieBreakKey;
}

/// Split an already total-sorted list into runs of equal totals,
/// preserving arrival order inside each run.
pub fn group_by_total<T: Standing>(entries: Vec<T>) -> Vec<Vec<T>> {
    let mut groups: Vec<Vec<T>> = Vec::new();

    for entry in entries {
        match groups.last_mut() {
            Some(group) if group.first().map(|g| g.total()) == Some(entry.total()) => {
                group.push(entry)
            }
            _ => groups.push(vec![entry]),
        }
    }

    groups
}

/// Sort ascending by total, then reorder each tied run by tie-break key.
/// Both sorts are stable.
pub fn order_standings<T: Standing>(mut entries: Vec<T>) -> Vec<T> {
    entries.sort_by(|a, b| a.total().total_cmp(&b.total()));

    group_by_total(entries)
        .into_iter()
        .flat_map(|mut group| {
            if group.len() > 1 {
                group.sort_by(|a, b| a.tie_break().compare(&b.tie_break()));
            }
            group
        })
        .collect()
}

/// 1-based competition ranks for an ordered list. An entry whose
/// (total, tie-break points, tie-break time) equals the previous one's
/// shares its rank; the next distinct entry takes its position.
pub fn shared_ranks<T: Standing>(ordered: &[T]) -> Vec<usize> {
    let mut ranks = Vec::with_capacity(ordered.len());
    let mut previous: Option<(f64, TieBreakKey)> = None;
    let mut current = 1;

    for (position, entry) in ordered.iter().enumerate() {
        let signature = (entry.total(), entry.tie_break());
        if previous != Some(signature) {
            current = position + 1;
            previous = Some(signature);
        }
        ranks.push(current);
    }

    ranks
}

// ============================================================================
// TESTS
// ============================================================================
