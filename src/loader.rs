// 📂 CSV Loader - Reads a show's result sheets from a directory
// One file per day and category (`SABADO110.csv`), plus the team
// membership sheet (`EQUIPOS.csv`). Files that do not exist yet are
// recorded as missing; only a directory with no results at all is fatal.

use crate::config::CompetitionConfig;
use crate::error::LoadError;
use crate::row::{Cell, RawRow};
use crate::snapshot::{CompetitionSnapshot, DayResults, DaySheet, MembershipRecord};
use csv::ReaderBuilder;
use sha2::{Digest, Sha256};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Anything able to produce a full competition snapshot.
pub trait ResultSource {
    /// Load every sheet and the membership list
    fn load(&self) -> Result<CompetitionSnapshot, LoadError>;

    /// Cheap content fingerprint, used to detect changes without parsing
    fn fingerprint(&self) -> Result<String, LoadError>;

    /// Human-readable origin (shown by `status`)
    fn describe(&self) -> String;
}

// ============================================================================
// CSV DIRECTORY SOURCE
// ============================================================================

pub struct CsvDirectorySource {
    dir: PathBuf,
    config: CompetitionConfig,
}

/// Base name of a day sheet: day id followed by category id.
pub fn sheet_name(day: &str, category: &str) -> String {
    format!("{}{}", day, category)
}

impl CsvDirectorySource {
    pub fn new<P: AsRef<Path>>(dir: P, config: CompetitionConfig) -> Self {
        CsvDirectorySource {
            dir: dir.as_ref().to_path_buf(),
            config,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn config(&self) -> &CompetitionConfig {
        &self.config
    }

    fn csv_path(&self, base_name: &str) -> PathBuf {
        self.dir.join(format!("{}.csv", base_name))
    }

    fn membership_path(&self) -> PathBuf {
        self.csv_path(&self.config.team.membership_sheet)
    }

    /// Every (day, category) sheet the configuration expects, in config order.
    fn expected_sheets(&self) -> Vec<(String, String, PathBuf)> {
        let mut sheets = Vec::new();
        for day in &self.config.days {
            for category in &self.config.categories {
                let path = self.csv_path(&sheet_name(&day.id, category));
                sheets.push((day.id.clone(), category.clone(), path));
            }
        }
        sheets
    }

    fn ensure_dir(&self) -> Result<(), LoadError> {
        let meta = fs::metadata(&self.dir).map_err(|e| LoadError::io(&self.dir, e))?;
        if meta.is_dir() {
            Ok(())
        } else {
            Err(LoadError::io(
                &self.dir,
                io::Error::new(io::ErrorKind::Other, "not a directory"),
            ))
        }
    }
}

/// Read a file, mapping "not found" to `None`.
fn read_optional(path: &Path) -> Result<Option<Vec<u8>>, LoadError> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(LoadError::io(path, e)),
    }
}

impl ResultSource for CsvDirectorySource {
    fn load(&self) -> Result<CompetitionSnapshot, LoadError> {
        self.ensure_dir()?;

        let mut snapshot = CompetitionSnapshot::new(&self.config.name);
        let mut hasher = Sha256::new();
        let mut loaded_rows = 0;

        for (day, category, path) in self.expected_sheets() {
            let Some(bytes) = read_optional(&path)? else {
                debug!(sheet = %sheet_name(&day, &category), "Sheet not published yet");
                snapshot.missing.push(sheet_name(&day, &category));
                continue;
            };

            hasher.update(sheet_name(&day, &category).as_bytes());
            hasher.update(&bytes);

            let rows = parse_rows(bytes.as_slice()).map_err(|e| LoadError::csv(&path, e))?;
            loaded_rows += rows.len();
            debug!(day = %day, category = %category, rows = rows.len(), "Loaded sheet");

            snapshot.add_sheet(DaySheet::new(&day, &category, rows).with_source(path));
        }

        if loaded_rows == 0 {
            return Err(LoadError::NoData {
                dir: self.dir.clone(),
            });
        }

        let membership_path = self.membership_path();
        match read_optional(&membership_path)? {
            Some(bytes) => {
                hasher.update(self.config.team.membership_sheet.as_bytes());
                hasher.update(&bytes);
                let records = parse_membership(bytes.as_slice())
                    .map_err(|e| LoadError::csv(&membership_path, e))?;
                snapshot.set_membership(records);
            }
            None => {
                warn!(path = %membership_path.display(), "No membership sheet, team standings will be empty");
            }
        }

        snapshot.fingerprint = format!("{:x}", hasher.finalize());

        info!(
            sheets = snapshot.sheets().len(),
            missing = snapshot.missing.len(),
            rows = loaded_rows,
            members = snapshot.membership().len(),
            "Loaded competition {}",
            snapshot.name
        );

        Ok(snapshot)
    }

    fn fingerprint(&self) -> Result<String, LoadError> {
        self.ensure_dir()?;

        let mut hasher = Sha256::new();
        for (day, category, path) in self.expected_sheets() {
            if let Some(bytes) = read_optional(&path)? {
                hasher.update(sheet_name(&day, &category).as_bytes());
                hasher.update(&bytes);
            }
        }
        if let Some(bytes) = read_optional(&self.membership_path())? {
            hasher.update(self.config.team.membership_sheet.as_bytes());
            hasher.update(&bytes);
        }

        Ok(format!("{:x}", hasher.finalize()))
    }

    fn describe(&self) -> String {
        format!("{} ({})", self.config.name, self.dir.display())
    }
}

// ============================================================================
// PARSING
// ============================================================================

fn clean_header(header: &str) -> String {
    header.trim_start_matches('\u{feff}').trim().to_string()
}

/// Parse a result sheet into raw rows. Rows whose cells are all blank are
/// dropped; numeric cells become numbers.
pub fn parse_rows<R: Read>(reader: R) -> Result<Vec<RawRow>, csv::Error> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers: Vec<String> = reader.headers()?.iter().map(clean_header).collect();

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result?;
        let mut row = RawRow::new();

        for (header, field) in headers.iter().zip(record.iter()) {
            if header.is_empty() {
                continue;
            }
            if let Some(cell) = Cell::from_field(field) {
                row.entry(header.clone()).or_insert(cell);
            }
        }

        if !row.is_empty() {
            rows.push(row);
        }
    }

    Ok(rows)
}

const TEAM_ALIASES: &[&str] = &["Equipo", "EQUIPO", "equipo"];
const CAPTAIN_ALIASES: &[&str] = &["Jefe_Equipo", "JEFE_EQUIPO", "jefe_equipo", "Jefe Equipo"];
const LICENSE_ALIASES: &[&str] = &["Licencia", "LICENCIA", "licencia"];

fn first_text(row: &RawRow, aliases: &[&str]) -> String {
    aliases
        .iter()
        .find_map(|alias| row.get(*alias))
        .map(|cell| cell.as_text().trim().to_string())
        .unwrap_or_default()
}

/// Parse the membership sheet. Entries without a team or a licence are dropped.
pub fn parse_membership<R: Read>(reader: R) -> Result<Vec<MembershipRecord>, csv::Error> {
    let records = parse_rows(reader)?
        .iter()
        .map(|row| MembershipRecord {
            team: first_text(row, TEAM_ALIASES),
            captain: first_text(row, CAPTAIN_ALIASES),
            license: first_text(row, LICENSE_ALIASES),
        })
        .filter(|record| !record.team.is_empty() && !record.license.is_empty())
        .collect();

    Ok(records)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, content: &str) {
        fs::write(dir.join(name), content).unwrap();
    }

    #[test]
    fn test_parse_rows_types_and_drops_blank_rows() {
        let csv = "\u{feff}O.S.,Atleta,Puntos,Tiempo\n1,Ane,4,61.2\n,,,\n2,Mikel,EL,\n";
        let rows = parse_rows(csv.as_bytes()).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("O.S."), Some(&Cell::Number(1.0)));
        assert_eq!(rows[0].get("Puntos"), Some(&Cell::Number(4.0)));
        assert_eq!(rows[1].get("Puntos"), Some(&Cell::text("EL")));
        assert!(rows[1].get("Tiempo").is_none());
    }

    #[test]
    fn test_parse_membership_aliases() {
        let csv = "EQUIPO,Jefe Equipo,licencia\nTxuri,Jon,A1\nTxuri,Jon,\n,Jon,B2\nBeltza,Amaia,C3\n";
        let records = parse_membership(csv.as_bytes()).unwrap();

        assert_eq!(
            records,
            vec![
                MembershipRecord::new("Txuri", "Jon", "A1"),
                MembershipRecord::new("Beltza", "Amaia", "C3"),
            ]
        );
    }

    #[test]
    fn test_load_directory_records_missing_sheets() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "VIERNES110.csv", "Licencia,Puntos\nA1,0\n");
        write(tmp.path(), "SABADO110.csv", "Licencia,Puntos\nA1,4\n");
        write(tmp.path(), "EQUIPOS.csv", "Equipo,Jefe_Equipo,Licencia\nT,J,A1\n");

        let source = CsvDirectorySource::new(tmp.path(), CompetitionConfig::three_day());
        let snapshot = source.load().unwrap();

        assert_eq!(snapshot.sheets().len(), 2);
        assert!(snapshot.missing.contains(&"DOMINGO110".to_string()));
        assert!(snapshot.missing.contains(&"VIERNES080".to_string()));
        assert_eq!(snapshot.membership().len(), 1);
        assert_eq!(snapshot.fingerprint, source.fingerprint().unwrap());
    }

    #[test]
    fn test_empty_directory_is_no_data() {
        let tmp = TempDir::new().unwrap();
        let source = CsvDirectorySource::new(tmp.path(), CompetitionConfig::three_day());

        assert!(matches!(source.load(), Err(LoadError::NoData { .. })));
    }

    #[test]
    fn test_missing_directory_is_io_error() {
        let tmp = TempDir::new().unwrap();
        let source = CsvDirectorySource::new(tmp.path().join("nope"), CompetitionConfig::three_day());

        assert!(matches!(source.load(), Err(LoadError::Io { .. })));
    }

    #[test]
    fn test_fingerprint_changes_with_content() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "SABADO100.csv", "Licencia,Puntos\nA1,4\n");
        let source = CsvDirectorySource::new(tmp.path(), CompetitionConfig::three_day());
        let before = source.fingerprint().unwrap();

        write(tmp.path(), "SABADO100.csv", "Licencia,Puntos\nA1,8\n");

        assert_ne!(before, source.fingerprint().unwrap());
    }
}
