// 📦 Competition Snapshot - Already-loaded day sheets and team membership
// The ranking engine only ever reads from a snapshot. A missing
// (day, category) sheet is a normal state meaning "no data yet".

use crate::row::{RawRow, ResultRow};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// ============================================================================
// DAY SHEET
// ============================================================================

/// Result sheet of one category on one day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DaySheet {
    pub day: String,
    pub category: String,
    pub rows: Vec<ResultRow>,

    /// File the sheet was read from, when it came from disk
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<PathBuf>,
}

impl DaySheet {
    /// Build a sheet from raw rows, normalizing each one.
    pub fn new(day: &str, category: &str, rows: Vec<RawRow>) -> Self {
        DaySheet {
            day: day.to_string(),
            category: category.to_string(),
            rows: rows.iter().map(ResultRow::from_raw).collect(),
            source: None,
        }
    }

    pub fn with_source(mut self, source: PathBuf) -> Self {
        self.source = Some(source);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }
}

// ============================================================================
// MEMBERSHIP
// ============================================================================

/// One rostered athlete of a team, as listed in the membership sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipRecord {
    pub team: String,
    pub captain: String,
    pub license: String,
}

impl MembershipRecord {
    pub fn new(team: &str, captain: &str, license: &str) -> Self {
        MembershipRecord {
            team: team.to_string(),
            captain: captain.to_string(),
            license: license.to_string(),
        }
    }
}

// ============================================================================
// DATA ACCESS
// ============================================================================

/// Read access to loaded competition data.
pub trait DayResults {
    /// Sheet of `category` on `day`, if one was loaded
    fn day_results(&self, day: &str, category: &str) -> Option<&DaySheet>;

    /// Every loaded sheet of `day`, in category order
    fn sheets_for_day(&self, day: &str) -> Vec<&DaySheet>;

    fn membership(&self) -> &[MembershipRecord];

    /// Whether `category` has a non-empty sheet on `day`
    fn has_results(&self, day: &str, category: &str) -> bool {
        self.day_results(day, category)
            .map(|sheet| !sheet.is_empty())
            .unwrap_or(false)
    }
}

/// Everything loaded for one competition at one point in time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompetitionSnapshot {
    pub name: String,

    sheets: Vec<DaySheet>,

    membership: Vec<MembershipRecord>,

    /// Sheet names (e.g. `DOMINGO110`) that had no file
    pub missing: Vec<String>,

    /// SHA-256 over the loaded file contents
    pub fingerprint: String,
}

impl CompetitionSnapshot {
    pub fn new(name: &str) -> Self {
        CompetitionSnapshot {
            name: name.to_string(),
            ..Default::default()
        }
    }

    /// Add a sheet, replacing any sheet already loaded for the same day and category.
    pub fn add_sheet(&mut self, sheet: DaySheet) {
        match self
            .sheets
            .iter_mut()
            .find(|s| s.day == sheet.day && s.category == sheet.category)
        {
            Some(existing) => *existing = sheet,
            None => self.sheets.push(sheet),
        }
    }

    pub fn with_sheet(mut self, sheet: DaySheet) -> Self {
        self.add_sheet(sheet);
        self
    }

    pub fn set_membership(&mut self, membership: Vec<MembershipRecord>) {
        self.membership = membership;
    }

    pub fn with_membership(mut self, membership: Vec<MembershipRecord>) -> Self {
        self.membership = membership;
        self
    }

    pub fn sheets(&self) -> &[DaySheet] {
        &self.sheets
    }

    pub fn row_count(&self) -> usize {
        self.sheets.iter().map(DaySheet::len).sum()
    }
}

impl DayResults for CompetitionSnapshot {
    fn day_results(&self, day: &str, category: &str) -> Option<&DaySheet> {
        self.sheets
            .iter()
            .find(|s| s.day == day && s.category == category)
    }

    fn sheets_for_day(&self, day: &str) -> Vec<&DaySheet> {
        self.sheets.iter().filter(|s| s.day == day).collect()
    }

    fn membership(&self) -> &[MembershipRecord] {
        &self.membership
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row::Cell;

    fn raw(license: &str, score: f64) -> RawRow {
        let mut row = RawRow::new();
        row.insert("Lic".to_string(), Cell::text(license));
        row.insert("Faltas".to_string(), Cell::Number(score));
        row
    }

    #[test]
    fn test_sheet_rows_are_normalized() {
        let sheet = DaySheet::new("SABADO", "110", vec![raw("A1", 4.0)]);

        assert_eq!(sheet.rows[0].license.as_deref(), Some("A1"));
        assert_eq!(sheet.rows[0].score, Some(Cell::Number(4.0)));
    }

    #[test]
    fn test_lookup_by_day_and_category() {
        let snapshot = CompetitionSnapshot::new("SEDE")
            .with_sheet(DaySheet::new("SABADO", "110", vec![raw("A1", 0.0)]))
            .with_sheet(DaySheet::new("SABADO", "120", vec![]))
            .with_sheet(DaySheet::new("VIERNES", "110", vec![raw("A1", 4.0)]));

        assert!(snapshot.day_results("SABADO", "110").is_some());
        assert!(snapshot.day_results("DOMINGO", "110").is_none());
        assert_eq!(snapshot.sheets_for_day("SABADO").len(), 2);
        assert!(snapshot.has_results("VIERNES", "110"));
        assert!(!snapshot.has_results("SABADO", "120"));
        assert_eq!(snapshot.row_count(), 2);
    }

    #[test]
    fn test_add_sheet_replaces_same_slot() {
        let mut snapshot = CompetitionSnapshot::new("SEDE");
        snapshot.add_sheet(DaySheet::new("SABADO", "110", vec![raw("A1", 0.0)]));
        snapshot.add_sheet(DaySheet::new("SABADO", "110", vec![raw("B2", 8.0), raw("C3", 4.0)]));

        assert_eq!(snapshot.sheets().len(), 1);
        assert_eq!(snapshot.row_count(), 2);
    }
}
