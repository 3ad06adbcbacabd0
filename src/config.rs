// ⚙️ Competition Configuration - Formats and team rules as data
// Which days exist, which of them count, how ties are broken and which
// categories may share a team slot all change from one show to the next.
// None of it is logic, so it lives in a JSON file next to the result sheets.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;

// ============================================================================
// DAY FORMAT
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayRole {
    /// Counts towards the total
    Scoring,
    /// Only orders riders already level on total
    TieBreak,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Requirement {
    /// Rider must have a result on this day to be ranked
    #[default]
    Always,
    /// Required only when the category has a non-empty sheet for the day
    WhenSheetPresent,
    /// Never required
    Optional,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayDefinition {
    /// Day identifier as used in sheet names (e.g. "SABADO")
    pub id: String,

    /// Human-readable label (e.g. "Sábado")
    pub label: String,

    pub role: DayRole,

    #[serde(default)]
    pub requirement: Requirement,
}

impl DayDefinition {
    pub fn scoring(id: &str, label: &str, requirement: Requirement) -> Self {
        DayDefinition {
            id: id.to_string(),
            label: label.to_string(),
            role: DayRole::Scoring,
            requirement,
        }
    }

    pub fn tie_break(id: &str, label: &str) -> Self {
        DayDefinition {
            id: id.to_string(),
            label: label.to_string(),
            role: DayRole::TieBreak,
            requirement: Requirement::Optional,
        }
    }
}

/// How riders level on total are ordered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum TieBreakMode {
    /// Tie-break round faults, then tie-break round time
    #[default]
    ScoreThenTime,
    /// Only the time of the given day
    TimeOnly { day: String },
}

// ============================================================================
// CATEGORY GROUPS
// ============================================================================

/// Categories that are interchangeable for team composition.
///
/// Maps a group identifier to its member categories. Matching is trimmed and
/// case-insensitive. Categories outside every group form their own group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct CategoryGroups {
    groups: BTreeMap<String, Vec<String>>,
}

impl CategoryGroups {
    pub fn new(groups: BTreeMap<String, Vec<String>>) -> Self {
        CategoryGroups { groups }
    }

    pub fn from_pairs(pairs: &[(&str, &[&str])]) -> Self {
        let groups = pairs
            .iter()
            .map(|(id, cats)| {
                (
                    id.to_string(),
                    cats.iter().map(|c| c.to_string()).collect(),
                )
            })
            .collect();
        CategoryGroups { groups }
    }

    /// Configured group of `category`, if any
    pub fn group_of(&self, category: &str) -> Option<&str> {
        let wanted = category.trim().to_uppercase();
        self.groups
            .iter()
            .find(|(_, cats)| cats.iter().any(|c| c.trim().to_uppercase() == wanted))
            .map(|(id, _)| id.as_str())
    }

    /// Group key used for team slots: the configured group or a singleton.
    pub fn slot_key(&self, category: &str) -> String {
        match self.group_of(category) {
            Some(group) => group.to_string(),
            None => format!("individual_{}", category),
        }
    }

    pub fn are_compatible(&self, a: &str, b: &str) -> bool {
        match (self.group_of(a), self.group_of(b)) {
            (Some(ga), Some(gb)) => ga == gb,
            _ => false,
        }
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<String>)> {
        self.groups.iter()
    }
}

// ============================================================================
// TEAM RULES
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamRules {
    /// Day used to identify members (name, category, mount)
    pub reference_day: String,

    /// Day whose results count for teams
    pub scoring_day: String,

    /// Number of members that count towards the team total
    #[serde(default = "default_counted_members")]
    pub counted_members: usize,

    #[serde(default)]
    pub category_groups: CategoryGroups,

    /// Base name of the membership sheet
    #[serde(default = "default_membership_sheet")]
    pub membership_sheet: String,
}

fn default_counted_members() -> usize {
    3
}

fn default_membership_sheet() -> String {
    "EQUIPOS".to_string()
}

impl Default for TeamRules {
    fn default() -> Self {
        TeamRules {
            reference_day: "VIERNES".to_string(),
            scoring_day: "SABADO".to_string(),
            counted_members: default_counted_members(),
            category_groups: CategoryGroups::from_pairs(&[
                ("grupo1", &["Adultos", "Juveniles1"]),
                ("grupo2", &["Juveniles", "Veteranos1"]),
                ("grupo3", &["Alevines", "Infantiles", "Veteranos"]),
            ]),
            membership_sheet: default_membership_sheet(),
        }
    }
}

// ============================================================================
// COMPETITION CONFIG
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompetitionConfig {
    /// Show name (also the data sub-folder in multi-show setups)
    pub name: String,

    /// Category identifiers in display order
    pub categories: Vec<String>,

    /// Days in chronological order
    pub days: Vec<DayDefinition>,

    #[serde(default)]
    pub tie_break: TieBreakMode,

    #[serde(default)]
    pub team: TeamRules,
}

impl Default for CompetitionConfig {
    fn default() -> Self {
        Self::three_day()
    }
}

impl CompetitionConfig {
    /// Friday, Saturday and Sunday rounds plus a jump-off sheet.
    pub fn three_day() -> Self {
        CompetitionConfig {
            name: "SEDE".to_string(),
            categories: default_categories(),
            days: vec![
                DayDefinition::scoring("VIERNES", "Viernes", Requirement::Always),
                DayDefinition::scoring("SABADO", "Sábado", Requirement::Always),
                DayDefinition::scoring("DOMINGO", "Domingo", Requirement::WhenSheetPresent),
                DayDefinition::tie_break("DESEMPATE", "Desempate"),
            ],
            tie_break: TieBreakMode::ScoreThenTime,
            team: TeamRules::default(),
        }
    }

    /// Saturday and (when published) Sunday rounds plus a jump-off sheet.
    pub fn two_day() -> Self {
        CompetitionConfig {
            name: "SEDE".to_string(),
            categories: default_categories(),
            days: vec![
                DayDefinition::scoring("SABADO", "Sábado", Requirement::Always),
                DayDefinition::scoring("DOMINGO", "Domingo", Requirement::WhenSheetPresent),
                DayDefinition::tie_break("DESEMPATE", "Desempate"),
            ],
            tie_break: TieBreakMode::ScoreThenTime,
            team: TeamRules {
                reference_day: "SABADO".to_string(),
                ..TeamRules::default()
            },
        }
    }

    /// Load configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;

        let config: CompetitionConfig =
            serde_json::from_str(&content).context("Failed to parse config JSON")?;

        Ok(config)
    }

    pub fn scoring_days(&self) -> impl Iterator<Item = &DayDefinition> {
        self.days.iter().filter(|d| d.role == DayRole::Scoring)
    }

    pub fn tie_break_day(&self) -> Option<&DayDefinition> {
        self.days.iter().find(|d| d.role == DayRole::TieBreak)
    }

    pub fn day(&self, id: &str) -> Option<&DayDefinition> {
        self.days.iter().find(|d| d.id == id)
    }

    pub fn has_category(&self, category: &str) -> bool {
        self.categories.iter().any(|c| c == category)
    }

    /// Check the configuration, returning every problem at once.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.categories.is_empty() {
            errors.push("categories: at least one category is required".to_string());
        }

        let mut seen = HashSet::new();
        for (i, day) in self.days.iter().enumerate() {
            if day.id.trim().is_empty() {
                errors.push(format!("days[{}].id: must not be empty", i));
            }
            if !seen.insert(day.id.as_str()) {
                errors.push(format!("days[{}].id: duplicate day '{}'", i, day.id));
            }
            if day.role == DayRole::TieBreak && day.requirement != Requirement::Optional {
                errors.push(format!(
                    "days[{}].requirement: tie-break day '{}' cannot be required",
                    i, day.id
                ));
            }
        }

        if self.scoring_days().next().is_none() {
            errors.push("days: at least one scoring day is required".to_string());
        }

        if self.days.iter().filter(|d| d.role == DayRole::TieBreak).count() > 1 {
            errors.push("days: only one tie-break day is allowed".to_string());
        }

        if let TieBreakMode::TimeOnly { day } = &self.tie_break {
            if self.day(day).is_none() {
                errors.push(format!("tie_break.day: unknown day '{}'", day));
            }
        }

        if self.day(&self.team.reference_day).is_none() {
            errors.push(format!(
                "team.reference_day: unknown day '{}'",
                self.team.reference_day
            ));
        }
        if self.day(&self.team.scoring_day).is_none() {
            errors.push(format!(
                "team.scoring_day: unknown day '{}'",
                self.team.scoring_day
            ));
        }
        if self.team.counted_members == 0 {
            errors.push("team.counted_members: must be at least 1".to_string());
        }

        let mut grouped: HashSet<String> = HashSet::new();
        for (group, cats) in self.team.category_groups.iter() {
            for cat in cats {
                if !grouped.insert(cat.trim().to_uppercase()) {
                    errors.push(format!(
                        "team.category_groups.{}: category '{}' is in more than one group",
                        group, cat
                    ));
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

fn default_categories() -> Vec<String> {
    ["080", "100", "110", "120", "130"]
        .iter()
        .map(|c| c.to_string())
        .collect()
}

/// Display label of a category: height codes render in metres (`080` → `0,80m`).
pub fn category_label(category: &str) -> String {
    if category.len() == 3 && category.chars().all(|c| c.is_ascii_digit()) {
        format!("{},{}m", &category[..1], &category[1..])
    } else {
        category.to_string()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_three_day() {
        let config = CompetitionConfig::default();

        assert_eq!(config.scoring_days().count(), 3);
        assert_eq!(config.tie_break_day().map(|d| d.id.as_str()), Some("DESEMPATE"));
        assert_eq!(config.team.counted_members, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_two_day_preset_is_valid() {
        let config = CompetitionConfig::two_day();

        assert_eq!(config.scoring_days().count(), 2);
        assert_eq!(config.team.reference_day, "SABADO");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_category_groups_lookup() {
        let groups = TeamRules::default().category_groups;

        assert_eq!(groups.group_of("adultos"), Some("grupo1"));
        assert_eq!(groups.group_of(" Veteranos "), Some("grupo3"));
        assert_eq!(groups.group_of("Ponis"), None);
        assert_eq!(groups.slot_key("Ponis"), "individual_Ponis");
        assert!(groups.are_compatible("Alevines", "Infantiles"));
        assert!(!groups.are_compatible("Alevines", "Adultos"));
        assert!(!groups.are_compatible("Ponis", "Ponis"));
    }

    #[test]
    fn test_config_json_roundtrip() {
        let config = CompetitionConfig::three_day();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: CompetitionConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, parsed);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let json = r#"{
            "name": "GETXO",
            "categories": ["100"],
            "days": [
                {"id": "SABADO", "label": "Sábado", "role": "scoring"},
                {"id": "DESEMPATE", "label": "Desempate", "role": "tie_break", "requirement": "optional"}
            ],
            "tie_break": {"mode": "time_only", "day": "DESEMPATE"},
            "team": {"reference_day": "SABADO", "scoring_day": "SABADO"}
        }"#;

        let config: CompetitionConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.days[0].requirement, Requirement::Always);
        assert_eq!(
            config.tie_break,
            TieBreakMode::TimeOnly { day: "DESEMPATE".to_string() }
        );
        assert_eq!(config.team.counted_members, 3);
        assert!(config.team.category_groups.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_reports_all_errors() {
        let mut config = CompetitionConfig::three_day();
        config.categories.clear();
        config.tie_break = TieBreakMode::TimeOnly { day: "LUNES".to_string() };
        config.team.scoring_day = "MARTES".to_string();
        config.team.category_groups = CategoryGroups::from_pairs(&[
            ("a", &["Adultos"]),
            ("b", &["adultos"]),
        ]);

        let errors = config.validate().unwrap_err();

        assert_eq!(errors.len(), 4);
        assert!(errors.iter().any(|e| e.starts_with("categories")));
        assert!(errors.iter().any(|e| e.starts_with("tie_break.day")));
        assert!(errors.iter().any(|e| e.starts_with("team.scoring_day")));
        assert!(errors.iter().any(|e| e.contains("more than one group")));
    }

    #[test]
    fn test_category_label() {
        assert_eq!(category_label("080"), "0,80m");
        assert_eq!(category_label("130"), "1,30m");
        assert_eq!(category_label("Ponis"), "Ponis");
    }
}
