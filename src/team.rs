// 🏆 Team Aggregator - Team totals and team standings
// Sums the counted members' scoring-day results. A team with any counted
// member eliminated is itself eliminated and placed after every other team.

use crate::config::{CompetitionConfig, TeamRules};
use crate::roster::{build_rosters, team_substitute, TeamMember, TeamRoster};
use crate::score::time_to_seconds;
use crate::selection::select_counted_members;
use crate::snapshot::DayResults;
use crate::tiebreak::{order_standings, Standing, TieBreakKey};
use serde::{Serialize, Serializer};
use std::fmt;
use tracing::info;

/// Team total: summed points, or the eliminated marker.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TeamTotal {
    Points(f64),
    Eliminated,
}

impl TeamTotal {
    pub fn points(&self) -> Option<f64> {
        match self {
            TeamTotal::Points(n) => Some(*n),
            TeamTotal::Eliminated => None,
        }
    }
}

impl fmt::Display for TeamTotal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TeamTotal::Points(n) => write!(f, "{}", n),
            TeamTotal::Eliminated => f.write_str("ELI"),
        }
    }
}

impl Serialize for TeamTotal {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            TeamTotal::Points(n) => serializer.serialize_f64(*n),
            TeamTotal::Eliminated => serializer.serialize_str("ELI"),
        }
    }
}

/// A ranked team.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Team {
    pub name: String,
    pub captain: String,
    pub members: Vec<TeamMember>,
    pub total: TeamTotal,

    /// Sum of counted members' times in seconds (0 when eliminated)
    pub total_time: f64,

    pub eliminated: bool,

    /// 1-based position
    pub rank: usize,
}

impl Team {
    pub fn counted_members(&self) -> impl Iterator<Item = &TeamMember> {
        self.members.iter().filter(|m| m.valid_for_total)
    }
}

impl Standing for Team {
    fn total(&self) -> f64 {
        self.total.points().unwrap_or(f64::INFINITY)
    }

    fn tie_break(&self) -> TieBreakKey {
        TieBreakKey {
            score: 0.0,
            time: self.total_time,
        }
    }
}

/// Select counted members and compute the totals of one roster.
pub fn aggregate_team(roster: &TeamRoster, data: &impl DayResults, rules: &TeamRules) -> Team {
    let mut members = roster.members.clone();
    select_counted_members(&mut members, &rules.category_groups, rules.counted_members);

    for member in members.iter_mut().filter(|m| m.valid_for_total) {
        let eliminated_score = member
            .score
            .as_ref()
            .map(|s| s.is_elimination())
            .unwrap_or(false);
        if eliminated_score {
            member.substituted = Some(team_substitute(data, &member.category, rules));
        }
    }

    let eliminated = members
        .iter()
        .any(|m| m.valid_for_total && m.is_eliminated());

    let (total, total_time) = if eliminated {
        (TeamTotal::Eliminated, 0.0)
    } else {
        let counted = members.iter().filter(|m| m.valid_for_total);
        let points: f64 = counted.clone().filter_map(TeamMember::points).sum();
        let time: f64 = counted.map(|m| time_to_seconds(Some(&m.time))).sum();
        (TeamTotal::Points(points), time)
    };

    Team {
        name: roster.name.clone(),
        captain: roster.captain.clone(),
        members,
        total,
        total_time,
        eliminated,
        rank: 0,
    }
}

/// Order teams: non-eliminated by total then time, then eliminated teams in
/// roster order. Ranks are 1-based positions.
pub fn rank_rosters(rosters: &[TeamRoster], data: &impl DayResults, rules: &TeamRules) -> Vec<Team> {
    let (eliminated, standing): (Vec<Team>, Vec<Team>) = rosters
        .iter()
        .map(|roster| aggregate_team(roster, data, rules))
        .partition(|team| team.eliminated);

    let mut teams = order_standings(standing);
    teams.extend(eliminated);

    for (position, team) in teams.iter_mut().enumerate() {
        team.rank = position + 1;
    }

    info!(
        teams = teams.len(),
        eliminated = teams.iter().filter(|t| t.eliminated).count(),
        "Team standings computed"
    );
    teams
}

/// Build rosters from the membership sheet and rank every team.
pub fn rank_teams(data: &impl DayResults, config: &CompetitionConfig) -> Vec<Team> {
    let rosters = build_rosters(data, &config.team);
    rank_rosters(&rosters, data, &config.team)
}

// ============================================================================
// TESTS
// ============================================================================
