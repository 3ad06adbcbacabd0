// 🚩 Elimination Classifier - Score tokens, elimination codes and penalties
// A jumping score cell is either faults (lower is better) or a code saying the
// round was not completed. Non-finishes are replaced by the worst valid score
// of the same scope plus a fixed penalty.

use crate::row::{Cell, ResultRow};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Points added to the worst valid score of a scope for a non-finish
pub const ELIMINATION_PENALTY: f64 = 20.0;

/// Seconds used for a missing or unreadable time (sorts last)
pub const TIME_SENTINEL: f64 = 999_999.0;

// ============================================================================
// ELIMINATION CODES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EliminationCode {
    /// Generic non-finish
    E,
    /// Eliminated
    EL,
    /// Eliminated (long form)
    ELI,
    /// Retired
    R,
    /// Retired (long form)
    RET,
    /// Not continuing
    NC,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EliminationKind {
    Generic,
    Eliminated,
    Retired,
    NotContinuing,
}

impl EliminationCode {
    pub const ALL: [EliminationCode; 6] = [
        EliminationCode::E,
        EliminationCode::EL,
        EliminationCode::ELI,
        EliminationCode::R,
        EliminationCode::RET,
        EliminationCode::NC,
    ];

    /// Parse a token (trimmed, case-insensitive)
    pub fn parse(token: &str) -> Option<Self> {
        match token.trim().to_uppercase().as_str() {
            "E" => Some(EliminationCode::E),
            "EL" => Some(EliminationCode::EL),
            "ELI" => Some(EliminationCode::ELI),
            "R" => Some(EliminationCode::R),
            "RET" => Some(EliminationCode::RET),
            "NC" => Some(EliminationCode::NC),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EliminationCode::E => "E",
            EliminationCode::EL => "EL",
            EliminationCode::ELI => "ELI",
            EliminationCode::R => "R",
            EliminationCode::RET => "RET",
            EliminationCode::NC => "NC",
        }
    }

    pub fn kind(&self) -> EliminationKind {
        match self {
            EliminationCode::E => EliminationKind::Generic,
            EliminationCode::EL | EliminationCode::ELI => EliminationKind::Eliminated,
            EliminationCode::R | EliminationCode::RET => EliminationKind::Retired,
            EliminationCode::NC => EliminationKind::NotContinuing,
        }
    }

    /// Label shown in the tie-break column
    pub fn describe(&self) -> &'static str {
        match self.kind() {
            EliminationKind::NotContinuing => "NO CONTINUA",
            _ => "Eliminado",
        }
    }
}

impl fmt::Display for EliminationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Elimination code carried by a cell, if any. Numbers never are codes.
pub fn elimination_code(cell: &Cell) -> Option<EliminationCode> {
    match cell {
        Cell::Text(s) => EliminationCode::parse(s),
        Cell::Number(_) => None,
    }
}

pub fn is_elimination(cell: &Cell) -> bool {
    elimination_code(cell).is_some()
}

// ============================================================================
// SCORE TOKEN
// ============================================================================

/// Classified score cell of one rider on one day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ScoreToken {
    Points(f64),
    Elimination(EliminationCode),
    /// Neither a code nor numeric; carried through unchanged
    Malformed(String),
}

impl ScoreToken {
    /// Classify a row's score cell. A present row without a score counts as
    /// zero faults.
    pub fn classify(cell: Option<&Cell>) -> Self {
        let Some(cell) = cell else {
            return ScoreToken::Points(0.0);
        };
        if let Some(code) = elimination_code(cell) {
            return ScoreToken::Elimination(code);
        }
        match cell.to_number() {
            Some(n) => ScoreToken::Points(n),
            None => ScoreToken::Malformed(cell.as_text()),
        }
    }

    pub fn points(&self) -> Option<f64> {
        match self {
            ScoreToken::Points(n) => Some(*n),
            _ => None,
        }
    }

    pub fn is_elimination(&self) -> bool {
        matches!(self, ScoreToken::Elimination(_))
    }
}

impl fmt::Display for ScoreToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScoreToken::Points(n) => write!(f, "{}", n),
            ScoreToken::Elimination(code) => write!(f, "{}", code),
            ScoreToken::Malformed(s) => write!(f, "{}", s),
        }
    }
}

// ============================================================================
// SUBSTITUTION
// ============================================================================

/// Worst valid score of `scope` plus the elimination penalty.
///
/// Only non-eliminated numeric scores are considered; an empty scope (or one
/// without any numeric score) yields exactly the penalty.
pub fn substitute<'a, I>(scope: I) -> f64
where
    I: IntoIterator<Item = &'a ResultRow>,
{
    worst_valid_score(scope) + ELIMINATION_PENALTY
}

pub fn worst_valid_score<'a, I>(scope: I) -> f64
where
    I: IntoIterator<Item = &'a ResultRow>,
{
    scope
        .into_iter()
        .filter_map(|row| row.score.as_ref())
        .filter(|cell| !is_elimination(cell))
        .filter_map(|cell| cell.to_number())
        .fold(0.0, f64::max)
}

// ============================================================================
// TIME PARSING
// ============================================================================

/// `parseFloat`-style prefix parse: `"65.3s"` → 65.3
fn float_prefix(s: &str) -> Option<f64> {
    let s = s.trim_start();
    let mut end = 0;
    let mut seen_digit = false;
    let mut seen_dot = false;

    for (i, c) in s.char_indices() {
        match c {
            '+' | '-' if i == 0 => {}
            '0'..='9' => seen_digit = true,
            '.' if !seen_dot => seen_dot = true,
            _ => break,
        }
        end = i + c.len_utf8();
    }

    if !seen_digit {
        return None;
    }
    s[..end].trim_end_matches('.').parse::<f64>().ok()
}

/// Seconds of a `M:SS(.ss)` or `SS.ss` time, `None` when missing or unreadable.
pub fn parse_time(raw: &str) -> Option<f64> {
    let t = raw.trim();
    if t.is_empty() || t == "-" {
        return None;
    }

    let parts: Vec<&str> = t.split(':').collect();
    if parts.len() == 2 {
        let minutes = float_prefix(parts[0]).map(|m| m.trunc()).unwrap_or(0.0);
        let seconds = float_prefix(parts[1]).unwrap_or(0.0);
        return Some(minutes * 60.0 + seconds);
    }

    float_prefix(t)
}

/// Seconds of a time cell, with [`TIME_SENTINEL`] for missing/unreadable values.
pub fn time_to_seconds(raw: Option<&str>) -> f64 {
    raw.and_then(parse_time).unwrap_or(TIME_SENTINEL)
}

// ============================================================================
// TESTS
// ============================================================================
