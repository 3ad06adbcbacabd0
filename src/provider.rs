// 🗄️ Data Provider - Single-slot cache in front of a result source
// Holds at most one loaded snapshot and the team rosters parsed from it.
// Refreshing drops both, so standings are always recomputed from fresh data.

use crate::config::CompetitionConfig;
use crate::error::LoadError;
use crate::individual::{rank_individuals, RiderStanding};
use crate::loader::ResultSource;
use crate::roster::{build_rosters, TeamRoster};
use crate::snapshot::CompetitionSnapshot;
use crate::team::{rank_rosters, Team};
use tracing::{debug, info};

pub struct DataProvider<S: ResultSource> {
    source: S,
    config: CompetitionConfig,
    snapshot: Option<CompetitionSnapshot>,
    rosters: Option<Vec<TeamRoster>>,
}

impl<S: ResultSource> DataProvider<S> {
    pub fn new(source: S, config: CompetitionConfig) -> Self {
        DataProvider {
            source,
            config,
            snapshot: None,
            rosters: None,
        }
    }

    pub fn config(&self) -> &CompetitionConfig {
        &self.config
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn is_loaded(&self) -> bool {
        self.snapshot.is_some()
    }

    /// Loaded snapshot, reading the source on first use.
    pub fn snapshot(&mut self) -> Result<&CompetitionSnapshot, LoadError> {
        let snapshot = match self.snapshot.take() {
            Some(snapshot) => snapshot,
            None => {
                self.rosters = None;
                self.source.load()?
            }
        };
        Ok(self.snapshot.insert(snapshot))
    }

    /// Team rosters of the current snapshot, built once per snapshot.
    pub fn rosters(&mut self) -> Result<&[TeamRoster], LoadError> {
        let rosters = match self.rosters.take() {
            Some(rosters) => rosters,
            None => {
                let rules = self.config.team.clone();
                let snapshot = self.snapshot()?;
                debug!("Building team rosters");
                build_rosters(snapshot, &rules)
            }
        };
        Ok(self.rosters.insert(rosters).as_slice())
    }

    /// Drop the cached snapshot and rosters.
    pub fn invalidate(&mut self) {
        if self.snapshot.is_some() {
            debug!("Discarding cached competition data");
        }
        self.snapshot = None;
        self.rosters = None;
    }

    /// Reload if the source content changed. Returns whether fresh data was loaded.
    pub fn refresh_if_changed(&mut self) -> Result<bool, LoadError> {
        let current = self.source.fingerprint()?;
        let unchanged = self
            .snapshot
            .as_ref()
            .map(|s| s.fingerprint == current)
            .unwrap_or(false);
        if unchanged {
            return Ok(false);
        }

        self.invalidate();
        self.snapshot()?;
        info!(source = %self.source.describe(), "Competition data reloaded");
        Ok(true)
    }

    pub fn individual_standings(&mut self, category: &str) -> Result<Vec<RiderStanding>, LoadError> {
        self.snapshot()?;
        match &self.snapshot {
            Some(snapshot) => Ok(rank_individuals(category, snapshot, &self.config)),
            None => Ok(Vec::new()),
        }
    }

    pub fn team_standings(&mut self) -> Result<Vec<Team>, LoadError> {
        self.rosters()?;
        match (&self.snapshot, &self.rosters) {
            (Some(snapshot), Some(rosters)) => Ok(rank_rosters(rosters, snapshot, &self.config.team)),
            _ => Ok(Vec::new()),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row::{Cell, RawRow};
    use crate::snapshot::{DaySheet, MembershipRecord};
    use std::cell::{Cell as Counter, RefCell};

    struct FakeSource {
        loads: Counter<usize>,
        version: RefCell<String>,
        fail: bool,
    }

    impl FakeSource {
        fn new() -> Self {
            FakeSource {
                loads: Counter::new(0),
                version: RefCell::new("v1".to_string()),
                fail: false,
            }
        }
    }

    fn rider(license: &str, score: f64) -> RawRow {
        let mut raw = RawRow::new();
        raw.insert("Licencia".to_string(), Cell::text(license));
        raw.insert("Atleta".to_string(), Cell::text(&license.to_uppercase()));
        raw.insert("Puntos".to_string(), Cell::Number(score));
        raw
    }

    impl ResultSource for FakeSource {
        fn load(&self) -> Result<CompetitionSnapshot, LoadError> {
            if self.fail {
                return Err(LoadError::NoData { dir: "fake".into() });
            }
            self.loads.set(self.loads.get() + 1);
            let mut snapshot = CompetitionSnapshot::new("SEDE")
                .with_sheet(DaySheet::new("VIERNES", "110", vec![rider("a", 0.0), rider("b", 4.0)]))
                .with_sheet(DaySheet::new("SABADO", "110", vec![rider("a", 4.0), rider("b", 4.0)]))
                .with_membership(vec![MembershipRecord::new("T", "J", "a")]);
            snapshot.fingerprint = self.version.borrow().clone();
            Ok(snapshot)
        }

        fn fingerprint(&self) -> Result<String, LoadError> {
            Ok(self.version.borrow().clone())
        }

        fn describe(&self) -> String {
            "fake".to_string()
        }
    }

    #[test]
    fn test_snapshot_is_loaded_once() {
        let mut provider = DataProvider::new(FakeSource::new(), CompetitionConfig::three_day());

        provider.snapshot().unwrap();
        provider.individual_standings("110").unwrap();
        provider.team_standings().unwrap();

        assert_eq!(provider.source().loads.get(), 1);
    }

    #[test]
    fn test_invalidate_forces_reload() {
        let mut provider = DataProvider::new(FakeSource::new(), CompetitionConfig::three_day());
        provider.rosters().unwrap();

        provider.invalidate();
        assert!(!provider.is_loaded());
        provider.rosters().unwrap();

        assert_eq!(provider.source().loads.get(), 2);
    }

    #[test]
    fn test_refresh_only_when_fingerprint_changes() {
        let mut provider = DataProvider::new(FakeSource::new(), CompetitionConfig::three_day());

        assert!(provider.refresh_if_changed().unwrap());
        assert!(!provider.refresh_if_changed().unwrap());

        *provider.source().version.borrow_mut() = "v2".to_string();
        assert!(provider.refresh_if_changed().unwrap());
        assert_eq!(provider.source().loads.get(), 2);
    }

    #[test]
    fn test_standings_through_provider() {
        let mut provider = DataProvider::new(FakeSource::new(), CompetitionConfig::three_day());

        let riders = provider.individual_standings("110").unwrap();
        assert_eq!(riders.len(), 2);
        assert_eq!(riders[0].license, "a");

        let teams = provider.team_standings().unwrap();
        assert_eq!(teams.len(), 1);
        assert_eq!(teams[0].members.len(), 1);
    }

    #[test]
    fn test_load_failure_surfaces() {
        let mut source = FakeSource::new();
        source.fail = true;
        let mut provider = DataProvider::new(source, CompetitionConfig::three_day());

        assert!(matches!(provider.individual_standings("110"), Err(LoadError::NoData { .. })));
        assert!(!provider.is_loaded());
    }
}
