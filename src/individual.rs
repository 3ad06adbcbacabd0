// 🏇 Individual Aggregator - Rider standings for one category
// Merges each rider's results across the configured days, drops riders who
// did not complete the required rounds or were eliminated twice, sums the
// scoring days and orders the field with the tie-break sorter.

use crate::config::{CompetitionConfig, DayDefinition, DayRole, Requirement};
use crate::row::{Cell, ResultRow};
use crate::score::{elimination_code, substitute, EliminationCode, ScoreToken};
use crate::snapshot::{DayResults, DaySheet};
use crate::tiebreak::{order_standings, resolve_key, shared_ranks, Standing, TieBreakKey};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, info, warn};

/// Riders with this many scoring-day eliminations are not ranked
pub const MAX_ELIMINATIONS: usize = 2;

// ============================================================================
// DAY ENTRY
// ============================================================================

/// Score of one rider on one day, as displayed and summed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum DayScore {
    /// No row for the rider that day (`-`)
    NoResult,
    Points(f64),
    /// Not numeric; shown as recorded and never summed
    Raw(String),
}

impl DayScore {
    pub fn points(&self) -> Option<f64> {
        match self {
            DayScore::Points(n) => Some(*n),
            _ => None,
        }
    }

    pub fn is_result(&self) -> bool {
        !matches!(self, DayScore::NoResult)
    }
}

impl fmt::Display for DayScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DayScore::NoResult => f.write_str("-"),
            DayScore::Points(n) => write!(f, "{}", n),
            DayScore::Raw(s) => f.write_str(s),
        }
    }
}

/// One rider's chosen result on one day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiderDayEntry {
    pub day: String,

    /// Score shown and summed (substituted for eliminations on scoring days)
    pub score: DayScore,

    /// Score cell exactly as recorded
    pub original: Option<Cell>,

    pub time: Option<String>,
    pub mount: Option<String>,

    /// Placement column, or the elimination code
    pub placement: String,
}

impl RiderDayEntry {
    /// Entry for a day the rider has no row on.
    pub fn no_result(day: &str) -> Self {
        RiderDayEntry {
            day: day.to_string(),
            score: DayScore::NoResult,
            original: None,
            time: None,
            mount: None,
            placement: "-".to_string(),
        }
    }

    pub fn elimination(&self) -> Option<EliminationCode> {
        self.original.as_ref().and_then(elimination_code)
    }

    pub fn time_or_dash(&self) -> &str {
        self.time.as_deref().unwrap_or("-")
    }

    pub fn mount_or_dash(&self) -> &str {
        self.mount.as_deref().unwrap_or("-")
    }

    /// Jump-off cell as published: `Eliminado`, `NO CONTINUA` or `points/time`.
    pub fn format_tie_break(&self) -> String {
        if let Some(code) = self.elimination() {
            return code.describe().to_string();
        }
        format!("{}/{}", self.score, self.time_or_dash())
    }
}

// ============================================================================
// STANDING
// ============================================================================

/// A ranked rider of one category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiderStanding {
    pub license: String,
    pub rider: String,
    pub mount: String,
    pub club: Option<String>,

    /// One entry per configured day, tie-break day included, in day order
    pub days: Vec<RiderDayEntry>,

    /// Sum of the numeric scoring-day scores
    pub total: f64,

    /// Number of scoring days that contributed to the total
    pub valid_days: usize,

    pub eliminations: usize,

    pub tie_break: TieBreakKey,

    /// Shared 1-based rank
    pub rank: usize,

    /// 1-based position among riders level on total
    pub tie_break_rank: usize,

    /// Whether placements may be shown (every scoring sheet published)
    pub display_eligible: bool,
}

impl RiderStanding {
    pub fn day(&self, day: &str) -> Option<&RiderDayEntry> {
        self.days.iter().find(|d| d.day == day)
    }

    /// Rank to print, hidden until all scoring sheets are in
    pub fn display_rank(&self) -> Option<usize> {
        self.display_eligible.then_some(self.rank)
    }
}

impl Standing for RiderStanding {
    fn total(&self) -> f64 {
        self.total
    }

    fn tie_break(&self) -> TieBreakKey {
        self.tie_break
    }
}

// ============================================================================
// AGGREGATION
// ============================================================================

/// Keep one row per licence: the lowest run order, first row on ties.
/// Rows without a licence are ignored. Licences keep first-appearance order.
pub fn collapse_duplicates(rows: &[ResultRow]) -> Vec<&ResultRow> {
    let mut order: Vec<&str> = Vec::new();
    let mut chosen: HashMap<&str, &ResultRow> = HashMap::new();

    for row in rows {
        let Some(license) = row.license.as_deref() else {
            continue;
        };
        match chosen.get(license) {
            Some(current) if row.run_order_rank() >= current.run_order_rank() => {}
            Some(_) => {
                chosen.insert(license, row);
            }
            None => {
                order.push(license);
                chosen.insert(license, row);
            }
        }
    }

    order
        .into_iter()
        .filter_map(|license| chosen.get(license).copied())
        .collect()
}

fn placement_text(row: &ResultRow) -> String {
    row.placement
        .as_ref()
        .map(|c| c.as_text().trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "-".to_string())
}

/// Build the displayed entry of a chosen row. `penalty` is the substituted
/// score for the sheet, computed once per sheet.
fn day_entry(day: &DayDefinition, row: &ResultRow, penalty: f64) -> RiderDayEntry {
    let original = row.score.clone();
    let token = ScoreToken::classify(original.as_ref());

    let (score, placement) = match (&day.role, &token) {
        (DayRole::TieBreak, _) => {
            let score = match &original {
                None => DayScore::NoResult,
                Some(Cell::Number(n)) => DayScore::Points(*n),
                Some(cell) => DayScore::Raw(cell.as_text()),
            };
            let placement = match &token {
                ScoreToken::Elimination(code) => code.as_str().to_string(),
                _ => placement_text(row),
            };
            (score, placement)
        }
        (DayRole::Scoring, ScoreToken::Elimination(code)) => {
            (DayScore::Points(penalty), code.as_str().to_string())
        }
        (DayRole::Scoring, ScoreToken::Points(n)) => (DayScore::Points(*n), placement_text(row)),
        (DayRole::Scoring, ScoreToken::Malformed(text)) => {
            let score = if text.trim() == "-" {
                DayScore::NoResult
            } else {
                warn!(
                    license = row.license.as_deref().unwrap_or(""),
                    day = %day.id,
                    score = %text,
                    "Score is neither numeric nor an elimination code"
                );
                DayScore::Raw(text.clone())
            };
            (score, placement_text(row))
        }
    };

    RiderDayEntry {
        day: day.id.clone(),
        score,
        original,
        time: row.time_text(),
        mount: row.mount.clone(),
        placement,
    }
}

struct RiderAccumulator {
    rider: String,
    mount: String,
    club: Option<String>,
    entries: HashMap<String, RiderDayEntry>,
}

fn is_required(day: &DayDefinition, category: &str, data: &impl DayResults) -> bool {
    if day.role != DayRole::Scoring {
        return false;
    }
    match day.requirement {
        Requirement::Always => true,
        Requirement::WhenSheetPresent => data.has_results(&day.id, category),
        Requirement::Optional => false,
    }
}

/// Whether placements may be shown for `category`: every scoring day has a
/// non-empty sheet.
pub fn display_eligible(category: &str, data: &impl DayResults, config: &CompetitionConfig) -> bool {
    config
        .scoring_days()
        .all(|day| data.has_results(&day.id, category))
}

/// Rank every eligible rider of `category`.
///
/// Never fails: absent sheets contribute nothing and odd tokens are carried
/// as-is. The result is ordered by total, then by tie-break.
pub fn rank_individuals(
    category: &str,
    data: &impl DayResults,
    config: &CompetitionConfig,
) -> Vec<RiderStanding> {
    let mut order: Vec<String> = Vec::new();
    let mut riders: HashMap<String, RiderAccumulator> = HashMap::new();

    for day in &config.days {
        let Some(sheet) = data.day_results(&day.id, category) else {
            continue;
        };
        collect_day(day, sheet, &mut order, &mut riders);
    }

    let display = display_eligible(category, data, config);
    let required: Vec<&DayDefinition> = config
        .days
        .iter()
        .filter(|day| is_required(day, category, data))
        .collect();

    let mut standings = Vec::new();
    for license in order {
        let Some(mut acc) = riders.remove(&license) else {
            continue;
        };

        let days: Vec<RiderDayEntry> = config
            .days
            .iter()
            .map(|day| {
                acc.entries
                    .remove(&day.id)
                    .unwrap_or_else(|| RiderDayEntry::no_result(&day.id))
            })
            .collect();
        let entry = |id: &str| days.iter().find(|d| d.day == id);

        let missing: Vec<&str> = required
            .iter()
            .filter(|day| !entry(&day.id).map(|e| e.score.is_result()).unwrap_or(false))
            .map(|day| day.id.as_str())
            .collect();
        if !missing.is_empty() {
            debug!(license = %license, rider = %acc.rider, ?missing, "Not ranked: missing required rounds");
            continue;
        }

        let scoring: Vec<&RiderDayEntry> = config
            .scoring_days()
            .filter_map(|day| entry(&day.id))
            .collect();

        let eliminations = scoring.iter().filter(|e| e.elimination().is_some()).count();
        if eliminations >= MAX_ELIMINATIONS {
            info!(license = %license, rider = %acc.rider, eliminations, "Not ranked: eliminated on several days");
            continue;
        }

        let total: f64 = scoring.iter().filter_map(|e| e.score.points()).sum();
        let valid_days = scoring.iter().filter(|e| e.score.points().is_some()).count();

        let tie_break = resolve_key(
            &config.tie_break,
            || {
                config
                    .tie_break_day()
                    .and_then(|day| entry(&day.id))
                    .filter(|e| e.score.is_result())
                    .map(|e| (e.original.as_ref(), e.time.clone()))
            },
            |day| entry(day).and_then(|e| e.time.clone()),
        );

        standings.push(RiderStanding {
            license,
            rider: acc.rider,
            mount: acc.mount,
            club: acc.club,
            days,
            total,
            valid_days,
            eliminations,
            tie_break,
            rank: 0,
            tie_break_rank: 0,
            display_eligible: display,
        });
    }

    let mut ordered = order_standings(standings);
    let ranks = shared_ranks(&ordered);

    let mut previous_total: Option<f64> = None;
    let mut position_in_group = 0;
    for (standing, rank) in ordered.iter_mut().zip(ranks) {
        if previous_total == Some(standing.total) {
            position_in_group += 1;
        } else {
            position_in_group = 1;
            previous_total = Some(standing.total);
        }
        standing.rank = rank;
        standing.tie_break_rank = position_in_group;
    }

    let display_eligible = display;
    info!(category, ranked = ordered.len(), display_eligible, "Individual standings computed");
    ordered
}

fn collect_day(
    day: &DayDefinition,
    sheet: &DaySheet,
    order: &mut Vec<String>,
    riders: &mut HashMap<String, RiderAccumulator>,
) {
    let penalty = substitute(&sheet.rows);

    for row in collapse_duplicates(&sheet.rows) {
        let Some(license) = row.license.clone() else {
            continue;
        };

        let acc = riders.entry(license.clone()).or_insert_with(|| {
            order.push(license.clone());
            RiderAccumulator {
                rider: row.rider_or_empty().to_string(),
                mount: row.mount_or_empty().to_string(),
                club: row.club.clone(),
                entries: HashMap::new(),
            }
        });

        acc.entries.insert(day.id.clone(), day_entry(day, row, penalty));
    }
}

// ============================================================================
// TESTS
// ============================================================================
