// ✂️ Team Member Selection - Which members count for the team
// Small teams count everyone. Larger teams may field at most one member per
// category group; the better one counts and the others are struck through,
// then the counted set is topped up from the struck pool if it fell short.

use crate::config::CategoryGroups;
use crate::roster::TeamMember;
use crate::score::time_to_seconds;
use std::cmp::Ordering;
use tracing::debug;

fn points_key(member: &TeamMember) -> f64 {
    member.points().unwrap_or(f64::INFINITY)
}

fn time_key(member: &TeamMember) -> f64 {
    time_to_seconds(Some(&member.time))
}

/// Score ascending, then time ascending. Non-numeric scores sort last.
fn by_score_then_time(a: &TeamMember, b: &TeamMember) -> Ordering {
    points_key(a)
        .total_cmp(&points_key(b))
        .then_with(|| time_key(a).total_cmp(&time_key(b)))
}

/// Finished members first, then score and time.
fn by_finish_then_score(a: &TeamMember, b: &TeamMember) -> Ordering {
    a.is_eliminated()
        .cmp(&b.is_eliminated())
        .then_with(|| by_score_then_time(a, b))
}

fn mark(member: &mut TeamMember, counted: bool) {
    member.valid_for_total = counted;
    member.struck = !counted;
}

/// Decide `valid_for_total`/`struck` for every member of one team.
///
/// `target` is the number of members that normally count (3).
pub fn select_counted_members(members: &mut [TeamMember], groups: &CategoryGroups, target: usize) {
    for member in members.iter_mut() {
        mark(member, false);
    }

    if members.len() <= target {
        for member in members.iter_mut() {
            mark(member, true);
        }
        return;
    }

    // group slot -> member indices, in first-appearance order
    let mut slots: Vec<(String, Vec<usize>)> = Vec::new();
    for (index, member) in members.iter().enumerate() {
        let key = groups.slot_key(&member.category);
        match slots.iter_mut().find(|(k, _)| *k == key) {
            Some((_, indices)) => indices.push(index),
            None => slots.push((key, vec![index])),
        }
    }

    if slots.iter().all(|(_, indices)| indices.len() == 1) {
        select_best(members, target);
        return;
    }

    let mut counted = 0;
    for (slot, mut indices) in slots {
        if indices.len() > 1 {
            indices.sort_by(|&a, &b| by_finish_then_score(&members[a], &members[b]));
            debug!(
                slot = %slot,
                chosen = %members[indices[0]].rider,
                candidates = indices.len(),
                "Category group shares one slot"
            );
        }
        mark(&mut members[indices[0]], true);
        counted += 1;
    }

    if counted < target {
        let mut pool: Vec<usize> = (0..members.len()).filter(|&i| members[i].struck).collect();
        pool.sort_by(|&a, &b| by_score_then_time(&members[a], &members[b]));
        for index in pool.into_iter().take(target - counted) {
            mark(&mut members[index], true);
        }
    }
}

/// Count the best `target` members by score and time, strike the rest.
fn select_best(members: &mut [TeamMember], target: usize) {
    let mut ranked: Vec<usize> = (0..members.len()).collect();
    ranked.sort_by(|&a, &b| by_score_then_time(&members[a], &members[b]));

    for (position, index) in ranked.into_iter().enumerate() {
        mark(&mut members[index], position < target);
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TeamRules;
    use crate::roster::MatchKind;
    use crate::score::{EliminationCode, ScoreToken};

    fn member(rider: &str, category: &str, score: ScoreToken, time: &str) -> TeamMember {
        TeamMember {
            license: rider.to_lowercase(),
            rider: rider.to_string(),
            category: category.to_string(),
            mount: format!("{} horse", rider),
            score: Some(score),
            time: time.to_string(),
            substituted: None,
            reference_match: MatchKind::ExactLicense,
            scoring_match: Some(MatchKind::ExactLicense),
            valid_for_total: false,
            struck: false,
        }
    }

    fn pts(n: f64) -> ScoreToken {
        ScoreToken::Points(n)
    }

    fn counted(members: &[TeamMember]) -> Vec<&str> {
        members
            .iter()
            .filter(|m| m.valid_for_total)
            .map(|m| m.rider.as_str())
            .collect()
    }

    fn groups() -> CategoryGroups {
        TeamRules::default().category_groups
    }

    #[test]
    fn test_three_members_all_count() {
        let mut members = vec![
            member("Ane", "Adultos", pts(12.0), "70"),
            member("Bea", "Juveniles1", pts(0.0), "60"),
            member("Carlos", "Adultos", pts(4.0), "65"),
        ];

        select_counted_members(&mut members, &groups(), 3);

        assert_eq!(counted(&members), vec!["Ane", "Bea", "Carlos"]);
        assert!(members.iter().all(|m| !m.struck));
    }

    #[test]
    fn test_group_keeps_best_and_singletons_count() {
        let mut members = vec![
            member("Ane", "Adultos", pts(8.0), "60"),
            member("Bea", "Juveniles1", pts(4.0), "70"),
            member("Carlos", "Alevines", pts(12.0), "61"),
            member("Dani", "Juveniles", pts(0.0), "62"),
            member("Eneko", "Ponis", pts(16.0), "63"),
        ];

        select_counted_members(&mut members, &groups(), 3);

        assert_eq!(counted(&members), vec!["Bea", "Carlos", "Dani", "Eneko"]);
        assert!(members[0].struck);
    }

    #[test]
    fn test_finished_member_beats_eliminated_one() {
        let mut members = vec![
            member("Ane", "Adultos", ScoreToken::Elimination(EliminationCode::EL), "-"),
            member("Bea", "Juveniles1", pts(24.0), "80"),
            member("Carlos", "Alevines", pts(0.0), "60"),
            member("Dani", "Juveniles", pts(0.0), "61"),
        ];
        members[0].substituted = Some(20.0);

        select_counted_members(&mut members, &groups(), 3);

        assert_eq!(counted(&members), vec!["Bea", "Carlos", "Dani"]);
    }

    #[test]
    fn test_equal_scores_decided_by_time() {
        let mut members = vec![
            member("Ane", "Adultos", pts(4.0), "1:05.00"),
            member("Bea", "Juveniles1", pts(4.0), "63.50"),
            member("Carlos", "Alevines", pts(0.0), "60"),
            member("Dani", "Juveniles", pts(0.0), "61"),
        ];

        select_counted_members(&mut members, &groups(), 3);

        assert_eq!(counted(&members), vec!["Bea", "Carlos", "Dani"]);
    }

    #[test]
    fn test_top_up_from_struck_pool() {
        let mut members = vec![
            member("Ane", "Adultos", pts(8.0), "60"),
            member("Bea", "Juveniles1", pts(4.0), "61"),
            member("Carlos", "Alevines", pts(12.0), "62"),
            member("Dani", "Infantiles", pts(0.0), "63"),
        ];

        select_counted_members(&mut members, &groups(), 3);

        // two slots (grupo1, grupo3) leave one place for the best struck member
        assert_eq!(counted(&members), vec!["Ane", "Bea", "Dani"]);
        assert!(members[2].struck);
    }

    #[test]
    fn test_no_shared_group_picks_best_three() {
        let mut members = vec![
            member("Ane", "Adultos", pts(8.0), "60"),
            member("Bea", "Juveniles", pts(4.0), "61"),
            member("Carlos", "Alevines", pts(12.0), "62"),
            member("Dani", "Ponis", pts(0.0), "63"),
        ];

        select_counted_members(&mut members, &groups(), 3);

        assert_eq!(counted(&members), vec!["Ane", "Bea", "Dani"]);
        assert!(members[2].struck);
    }

    #[test]
    fn test_at_most_one_counted_per_group_when_enough_slots() {
        let mut members = vec![
            member("Ane", "Adultos", pts(0.0), "60"),
            member("Bea", "Juveniles1", pts(0.0), "61"),
            member("Carlos", "Juveniles", pts(4.0), "62"),
            member("Dani", "Veteranos1", pts(8.0), "63"),
            member("Eneko", "Alevines", pts(4.0), "64"),
            member("Fer", "Veteranos", pts(0.0), "65"),
        ];
        let groups = groups();

        select_counted_members(&mut members, &groups, 3);

        let mut seen = std::collections::HashSet::new();
        for m in members.iter().filter(|m| m.valid_for_total) {
            assert!(seen.insert(groups.slot_key(&m.category)));
        }
        assert_eq!(counted(&members), vec!["Ane", "Carlos", "Fer"]);
    }
}
