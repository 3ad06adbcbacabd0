// Jumping Standings - Core Library
// Exposes the ranking engine, the loaders and the report layer for use in the
// CLI, the terminal viewer and tests

pub mod row;        // Row Normalizer - header synonyms, typed cells
pub mod score;      // Elimination Classifier - codes, substitution, times
pub mod config;     // Competition format, day set, team rules
pub mod tiebreak;   // Tie-Break Sorter - grouping and shared ranks
pub mod snapshot;   // In-memory day sheets and membership
pub mod individual; // Individual Aggregator
pub mod roster;     // Team Roster Builder - identity matching
pub mod selection;  // Counted-member selection per category group
pub mod team;       // Team Aggregator
pub mod error;      // Data-loading failures
pub mod loader;     // CSV directory source
pub mod provider;   // Single-slot data cache
pub mod report;     // Text, CSV and JSON output
pub mod telemetry;  // tracing subscriber setup

// Re-export commonly used types
pub use config::{
    category_label, CategoryGroups, CompetitionConfig, DayDefinition, DayRole,
    Requirement, TeamRules, TieBreakMode,
};
pub use error::LoadError;
pub use individual::{rank_individuals, DayScore, RiderDayEntry, RiderStanding};
pub use loader::{CsvDirectorySource, ResultSource};
pub use provider::DataProvider;
pub use report::OutputFormat;
pub use roster::{build_rosters, MatchKind, TeamMember, TeamRoster};
pub use row::{Cell, RawRow, ResultRow};
pub use score::{EliminationCode, ScoreToken, ELIMINATION_PENALTY};
pub use snapshot::{CompetitionSnapshot, DayResults, DaySheet, MembershipRecord};
pub use team::{rank_teams, Team, TeamTotal};
pub use tiebreak::{Standing, TieBreakKey};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
