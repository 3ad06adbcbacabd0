// 👥 Team Roster Builder - Locates each team member's results
// The membership sheet only lists licences, and those licences are typed by
// hand: sometimes suffixed (`1234_2`), truncated, or filled with the horse's
// name. Members are identified on the reference day and then located on the
// scoring day through an explicit matcher with a fixed precedence.

use crate::config::TeamRules;
use crate::row::ResultRow;
use crate::score::{substitute, EliminationCode, ScoreToken};
use crate::snapshot::{DayResults, DaySheet};
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, info};

// ============================================================================
// IDENTITY MATCHER
// ============================================================================

/// How a membership licence matched a result row, in precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    /// Row licence equals the membership licence
    ExactLicense,
    /// Membership licence contains the row's mount name
    MountInLicense,
    /// Row licence is the membership licence plus `_suffix`
    SuffixedLicense,
    /// Membership licence (longer than 3 chars) prefixes the row licence
    LicensePrefix,
}

impl MatchKind {
    pub const PRECEDENCE: [MatchKind; 4] = [
        MatchKind::ExactLicense,
        MatchKind::MountInLicense,
        MatchKind::SuffixedLicense,
        MatchKind::LicensePrefix,
    ];

    /// Whether `row` satisfies this rule for the membership licence `wanted`.
    pub fn matches(&self, wanted: &str, row: &ResultRow) -> bool {
        let wanted = wanted.trim();
        let license = row.license.as_deref().unwrap_or("").trim();

        match self {
            MatchKind::ExactLicense => license == wanted,
            MatchKind::MountInLicense => {
                let mount = row.mount_or_empty().trim().to_uppercase();
                !mount.is_empty() && wanted.to_uppercase().contains(&mount)
            }
            MatchKind::SuffixedLicense => license.starts_with(&format!("{}_", wanted)),
            MatchKind::LicensePrefix => {
                wanted.chars().count() > 3 && license.starts_with(wanted) && license != wanted
            }
        }
    }
}

/// Who a member was on the reference day. Later rows must not contradict it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IdentityHint {
    pub rider: String,
    pub mount: String,
}

impl IdentityHint {
    /// A row is consistent unless its rider or mount (when both sides have
    /// one) differs, compared trimmed and case-insensitively.
    pub fn is_consistent(&self, row: &ResultRow) -> bool {
        let rider = self.rider.trim().to_uppercase();
        if rider.is_empty() {
            return true;
        }

        let row_rider = row.rider_or_empty().trim().to_uppercase();
        if !row_rider.is_empty() && row_rider != rider {
            return false;
        }

        let mount = self.mount.trim().to_uppercase();
        let row_mount = row.mount_or_empty().trim().to_uppercase();
        mount.is_empty() || row_mount.is_empty() || row_mount == mount
    }
}

/// A located result row.
#[derive(Debug, Clone, Copy)]
pub struct RowMatch<'a> {
    pub sheet: &'a DaySheet,
    pub row: &'a ResultRow,
    pub kind: MatchKind,
}

/// Find the row of `license` among `sheets`.
///
/// Rules are tried in [`MatchKind::PRECEDENCE`] order over every row, so an
/// exact licence anywhere beats a looser match earlier in the sheets. With a
/// `hint`, rows contradicting the reference identity are skipped.
pub fn find_member<'a>(
    license: &str,
    sheets: &[&'a DaySheet],
    hint: Option<&IdentityHint>,
) -> Option<RowMatch<'a>> {
    for kind in MatchKind::PRECEDENCE {
        for &sheet in sheets {
            for row in &sheet.rows {
                if let Some(hint) = hint {
                    if !hint.is_consistent(row) {
                        continue;
                    }
                }
                if kind.matches(license, row) {
                    debug!(
                        license,
                        day = %sheet.day,
                        category = %sheet.category,
                        matched = ?kind,
                        rider = row.rider_or_empty(),
                        "Located team member"
                    );
                    return Some(RowMatch { sheet, row, kind });
                }
            }
        }
    }
    None
}

// ============================================================================
// ROSTER
// ============================================================================

/// A team member with the results located for them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamMember {
    pub license: String,
    pub rider: String,
    pub category: String,
    pub mount: String,

    /// Scoring-day score as recorded; `None` when no row was found
    pub score: Option<ScoreToken>,

    /// Scoring-day time as recorded (`0` when absent)
    pub time: String,

    /// Score shown for a counted eliminated member (scoring-day scope + penalty)
    pub substituted: Option<f64>,

    pub reference_match: MatchKind,
    pub scoring_match: Option<MatchKind>,

    pub valid_for_total: bool,
    pub struck: bool,
}

impl TeamMember {
    /// Eliminated when either the score or the time carries an elimination code.
    pub fn is_eliminated(&self) -> bool {
        let in_score = self
            .score
            .as_ref()
            .map(ScoreToken::is_elimination)
            .unwrap_or(false);
        let in_time = EliminationCode::parse(&self.time).is_some();
        in_score || in_time
    }

    /// Numeric score used for selection and totals
    pub fn points(&self) -> Option<f64> {
        self.substituted
            .or_else(|| self.score.as_ref().and_then(ScoreToken::points))
    }

    /// Score as displayed
    pub fn score_text(&self) -> String {
        match (&self.substituted, &self.score) {
            (Some(points), _) => points.to_string(),
            (None, Some(token)) => token.to_string(),
            (None, None) => "-".to_string(),
        }
    }
}

/// Members of one team before selection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamRoster {
    pub name: String,
    pub captain: String,
    pub members: Vec<TeamMember>,

    /// Licences that could not be identified on the reference day
    pub unresolved: Vec<String>,
}

/// Build every team's roster from the membership records, in the order teams
/// first appear. Members without a name and category on the reference day
/// are left out of the team.
pub fn build_rosters(data: &impl DayResults, rules: &TeamRules) -> Vec<TeamRoster> {
    let reference_sheets = data.sheets_for_day(&rules.reference_day);
    let scoring_sheets = data.sheets_for_day(&rules.scoring_day);

    let mut order: Vec<String> = Vec::new();
    let mut rosters: HashMap<String, TeamRoster> = HashMap::new();

    for record in data.membership() {
        let roster = rosters.entry(record.team.clone()).or_insert_with(|| {
            order.push(record.team.clone());
            TeamRoster {
                name: record.team.clone(),
                captain: record.captain.clone(),
                members: Vec::new(),
                unresolved: Vec::new(),
            }
        });

        match locate_member(&record.license, &reference_sheets, &scoring_sheets) {
            Some(member) => roster.members.push(member),
            None => {
                info!(team = %record.team, license = %record.license, "Member not found on reference day, left out");
                roster.unresolved.push(record.license.clone());
            }
        }
    }

    order
        .into_iter()
        .filter_map(|name| rosters.remove(&name))
        .collect()
}

fn locate_member(
    license: &str,
    reference_sheets: &[&DaySheet],
    scoring_sheets: &[&DaySheet],
) -> Option<TeamMember> {
    let reference = find_member(license, reference_sheets, None)?;
    let rider = reference.row.rider_or_empty().trim().to_string();
    let category = reference.sheet.category.clone();
    if rider.is_empty() || category.is_empty() {
        return None;
    }

    let hint = IdentityHint {
        rider: rider.clone(),
        mount: reference.row.mount_or_empty().trim().to_string(),
    };

    let scoring = find_member(license, scoring_sheets, Some(&hint));
    if scoring.is_none() {
        debug!(license, rider = %rider, "No scoring-day result for team member");
    }

    Some(TeamMember {
        license: license.to_string(),
        rider,
        category,
        mount: hint.mount,
        score: scoring.map(|m| ScoreToken::classify(m.row.score.as_ref())),
        time: scoring
            .and_then(|m| m.row.time_text())
            .unwrap_or_else(|| "0".to_string()),
        substituted: None,
        reference_match: reference.kind,
        scoring_match: scoring.map(|m| m.kind),
        valid_for_total: false,
        struck: false,
    })
}

/// Substituted score for a team member of `category`.
///
/// Always scoped to the team scoring day of that category, unlike the
/// individual substitution which uses the day being ranked.
pub fn team_substitute(data: &impl DayResults, category: &str, rules: &TeamRules) -> f64 {
    match data.day_results(&rules.scoring_day, category) {
        Some(sheet) => substitute(&sheet.rows),
        None => substitute(std::iter::empty::<&ResultRow>()),
    }
}

// ============================================================================
// TESTS
// ============================================================================
