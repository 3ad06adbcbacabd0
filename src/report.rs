// 📄 Standings Report - Text tables, CSV and JSON exports
// Renders ranked riders and teams for the terminal and writes the exports
// published after each round. The column layout follows the spreadsheet the
// organisers circulate (one Puntos/Tiempo/Caballo triple per day).

use crate::config::{category_label, CompetitionConfig, DayRole};
use crate::individual::{RiderDayEntry, RiderStanding};
use crate::row::Cell;
use crate::snapshot::DaySheet;
use crate::team::Team;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::ValueEnum;
use serde::Serialize;
use std::fmt::Write as _;
use std::io::Write;

/// Output format of the `individual` and `teams` commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    Csv,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Table => "txt",
            OutputFormat::Json => "json",
            OutputFormat::Csv => "csv",
        }
    }
}

// ============================================================================
// FILE NAMES
// ============================================================================

/// `Clasificacion_110_2025-06-14.csv`
pub fn individual_file_name(category: &str, date: NaiveDate, format: OutputFormat) -> String {
    format!(
        "Clasificacion_{}_{}.{}",
        category,
        date.format("%Y-%m-%d"),
        format.extension()
    )
}

/// `Clasificacion_Equipos_2025-06-14.csv`
pub fn team_file_name(date: NaiveDate, format: OutputFormat) -> String {
    format!(
        "Clasificacion_Equipos_{}.{}",
        date.format("%Y-%m-%d"),
        format.extension()
    )
}

pub fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

// ============================================================================
// INDIVIDUAL
// ============================================================================

pub fn individual_headers(config: &CompetitionConfig) -> Vec<String> {
    let mut headers = vec![
        "Clasificación".to_string(),
        "Jinete".to_string(),
        "Total".to_string(),
    ];
    for day in &config.days {
        headers.push(format!("{} Puntos", day.label));
        headers.push(format!("{} Tiempo", day.label));
        headers.push(format!("{} Caballo", day.label));
    }
    if let Some(day) = config.tie_break_day() {
        headers.push(format!("{} Formateado", day.label));
    }
    headers
}

pub fn individual_record(standing: &RiderStanding, config: &CompetitionConfig) -> Vec<String> {
    let mut record = vec![
        standing
            .display_rank()
            .map(|r| r.to_string())
            .unwrap_or_default(),
        standing.rider.clone(),
        standing.total.to_string(),
    ];

    for day in &config.days {
        match standing.day(&day.id) {
            Some(entry) => {
                record.push(entry.score.to_string());
                record.push(entry.time_or_dash().to_string());
                record.push(entry.mount_or_dash().to_string());
            }
            None => record.extend(["-", "-", "-"].iter().map(|s| s.to_string())),
        }
    }

    if let Some(day) = config.tie_break_day() {
        let formatted = standing.day(&day.id)
            .map(RiderDayEntry::format_tie_break)
            .unwrap_or_else(|| "-/-".to_string());
        record.push(formatted);
    }
    record
}

/// Write the individual standings of one category as CSV.
pub fn write_individual_csv<W: Write>(
    writer: W,
    standings: &[RiderStanding],
    config: &CompetitionConfig,
) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(individual_headers(config))
        .context("Failed to write CSV header")?;
    for standing in standings {
        csv.write_record(individual_record(standing, config))
            .with_context(|| format!("Failed to write CSV row for {}", standing.license))?;
    }
    csv.flush().context("Failed to flush CSV output")?;
    Ok(())
}

/// Plain-text table. The rank column is blank until every scoring sheet of
/// the category has been published.
pub fn render_individual_table(
    category: &str,
    standings: &[RiderStanding],
    config: &CompetitionConfig,
) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "🏇 {} - Categoría {}", config.name, category_label(category));
    if standings.first().map(|s| !s.display_eligible).unwrap_or(false) {
        let _ = writeln!(out, "   (clasificación provisional: faltan resultados)");
    }
    let _ = writeln!(out);

    let mut header = format!("{:>4}  {:<28} {:<22} {:>7}", "Cl", "Jinete", "Caballo", "Total");
    for day in &config.days {
        let _ = write!(header, "  {:<16}", day.label);
    }
    let _ = writeln!(out, "{}", header);
    let _ = writeln!(out, "{}", "─".repeat(header.chars().count()));

    for standing in standings {
        let rank = standing
            .display_rank()
            .map(|r| r.to_string())
            .unwrap_or_default();
        let mut line = format!(
            "{:>4}  {:<28} {:<22} {:>7}",
            rank,
            truncate(&standing.rider, 28),
            truncate(&standing.mount, 22),
            standing.total
        );
        for day in &config.days {
            let cell = match standing.day(&day.id) {
                Some(entry) if day.role == DayRole::TieBreak => entry.format_tie_break(),
                Some(entry) => format!("{}/{}", entry.score, entry.time_or_dash()),
                None => "-".to_string(),
            };
            let _ = write!(line, "  {:<16}", truncate(&cell, 16));
        }
        let _ = writeln!(out, "{}", line);
    }

    if standings.is_empty() {
        let _ = writeln!(out, "   No hay jinetes clasificados");
    }
    out
}

// ============================================================================
// TEAMS
// ============================================================================

fn team_member_columns(target: usize) -> usize {
    target + 1
}

pub fn team_headers(member_columns: usize) -> Vec<String> {
    let mut headers = vec![
        "Clasificación".to_string(),
        "Equipo".to_string(),
        "Jefe de Equipo".to_string(),
        "Total Puntos".to_string(),
        "Tiempo Total (s)".to_string(),
    ];
    for n in 1..=member_columns {
        headers.push(format!("Miembro {}", n));
        headers.push(format!("Licencia {}", n));
        headers.push(format!("Categoría {}", n));
        headers.push(format!("Caballo {}", n));
        headers.push(format!("Puntos {}", n));
        headers.push(format!("Tiempo {}", n));
        headers.push(format!("Válido para Total {}", n));
    }
    headers
}

pub fn team_record(team: &Team, member_columns: usize) -> Vec<String> {
    let mut record = vec![
        team.rank.to_string(),
        team.name.clone(),
        team.captain.clone(),
        team.total.to_string(),
        format!("{:.2}", team.total_time),
    ];

    for member in team.members.iter().take(member_columns) {
        let status = if member.struck {
            " (TACHADO)"
        } else if member.valid_for_total {
            " (VÁLIDO)"
        } else {
            ""
        };
        record.push(format!("{}{}", member.rider, status));
        record.push(member.license.clone());
        record.push(member.category.clone());
        record.push(member.mount.clone());
        record.push(member.score_text());
        record.push(member.time.clone());
        record.push(if member.valid_for_total { "SÍ" } else { "NO" }.to_string());
    }
    // pad short teams so every record has the header's width
    let width = team_headers(member_columns).len();
    record.resize(width, String::new());
    record
}

/// Write team standings as CSV, one row per team.
pub fn write_team_csv<W: Write>(writer: W, teams: &[Team], counted_members: usize) -> Result<()> {
    let widest = teams.iter().map(|t| t.members.len()).max().unwrap_or(0);
    let columns = widest.max(team_member_columns(counted_members));

    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(team_headers(columns))
        .context("Failed to write CSV header")?;
    for team in teams {
        csv.write_record(team_record(team, columns))
            .with_context(|| format!("Failed to write CSV row for team {}", team.name))?;
    }
    csv.flush().context("Failed to flush CSV output")?;
    Ok(())
}

pub fn render_team_table(teams: &[Team]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "🏆 Clasificación por equipos");
    let _ = writeln!(out);

    for team in teams {
        let _ = writeln!(
            out,
            "{:>3}. {:<30} Total: {:>6}  Tiempo: {:>8.2}s  (Jefe: {})",
            team.rank, team.name, team.total, team.total_time, team.captain
        );
        for member in &team.members {
            let marker = if member.struck {
                "✗"
            } else if member.valid_for_total {
                "✓"
            } else {
                " "
            };
            let _ = writeln!(
                out,
                "      {} {:<26} {:<12} {:<20} {:>6} {:>8}",
                marker,
                truncate(&member.rider, 26),
                truncate(&member.category, 12),
                truncate(&member.mount, 20),
                member.score_text(),
                member.time
            );
        }
    }

    if teams.is_empty() {
        let _ = writeln!(out, "   No hay equipos registrados");
    }
    out
}

// ============================================================================
// SHEET EXPLORER
// ============================================================================

const SHEET_COLUMNS: [&str; 7] = ["O.S.", "Cl", "Atleta", "Caballo", "Club", "Puntos", "Tiempo"];

fn cell_text(cell: Option<&Cell>) -> String {
    cell.map(Cell::as_text).unwrap_or_default()
}

/// Principal columns of one raw result sheet, in run order.
pub fn render_sheet(sheet: &DaySheet) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "📋 {} {} ({} filas)",
        sheet.day,
        category_label(&sheet.category),
        sheet.len()
    );
    let _ = writeln!(
        out,
        "{:>5} {:>4}  {:<26} {:<22} {:<18} {:>7} {:>8}",
        SHEET_COLUMNS[0],
        SHEET_COLUMNS[1],
        SHEET_COLUMNS[2],
        SHEET_COLUMNS[3],
        SHEET_COLUMNS[4],
        SHEET_COLUMNS[5],
        SHEET_COLUMNS[6]
    );

    let mut rows: Vec<_> = sheet.rows.iter().collect();
    rows.sort_by_key(|row| row.run_order_rank());

    for row in rows {
        let _ = writeln!(
            out,
            "{:>5} {:>4}  {:<26} {:<22} {:<18} {:>7} {:>8}",
            cell_text(row.run_order.as_ref()),
            cell_text(row.placement.as_ref()),
            truncate(row.rider_or_empty(), 26),
            truncate(row.mount_or_empty(), 22),
            truncate(row.club.as_deref().unwrap_or(""), 18),
            cell_text(row.score.as_ref()),
            row.time_text().unwrap_or_default()
        );
    }
    out
}

// ============================================================================
// JSON
// ============================================================================

pub fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).context("Failed to serialize standings to JSON")
}

/// Truncate string to max length, appending an ellipsis
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::individual::rank_individuals;
    use crate::row::RawRow;
    use crate::snapshot::{CompetitionSnapshot, MembershipRecord};
    use crate::team::rank_teams;

    fn row(license: &str, rider: &str, score: Cell, time: &str) -> RawRow {
        let mut raw = RawRow::new();
        raw.insert("Licencia".to_string(), Cell::text(license));
        raw.insert("Atleta".to_string(), Cell::text(rider));
        raw.insert("Caballo".to_string(), Cell::text(&format!("{} horse", rider)));
        raw.insert("Puntos".to_string(), score);
        raw.insert("Tiempo".to_string(), Cell::text(time));
        raw
    }

    fn snapshot() -> CompetitionSnapshot {
        CompetitionSnapshot::new("SEDE")
            .with_sheet(DaySheet::new(
                "VIERNES",
                "110",
                vec![
                    row("a", "Ane", Cell::Number(0.0), "60"),
                    row("b", "Bea", Cell::Number(0.0), "61"),
                ],
            ))
            .with_sheet(DaySheet::new(
                "SABADO",
                "110",
                vec![
                    row("a", "Ane", Cell::Number(4.0), "62"),
                    row("b", "Bea", Cell::Number(4.0), "63"),
                ],
            ))
            .with_sheet(DaySheet::new(
                "DESEMPATE",
                "110",
                vec![
                    row("a", "Ane", Cell::text("EL"), "-"),
                    row("b", "Bea", Cell::Number(0.0), "38.5"),
                ],
            ))
            .with_membership(vec![
                MembershipRecord::new("Rojo", "Jefe", "a"),
                MembershipRecord::new("Rojo", "Jefe", "b"),
            ])
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 14).unwrap()
    }

    #[test]
    fn test_file_names_are_date_stamped() {
        assert_eq!(
            individual_file_name("110", date(), OutputFormat::Csv),
            "Clasificacion_110_2025-06-14.csv"
        );
        assert_eq!(
            team_file_name(date(), OutputFormat::Json),
            "Clasificacion_Equipos_2025-06-14.json"
        );
    }

    #[test]
    fn test_individual_headers_follow_days() {
        let headers = individual_headers(&CompetitionConfig::three_day());

        assert_eq!(headers[..3], ["Clasificación", "Jinete", "Total"]);
        assert_eq!(headers[3], "Viernes Puntos");
        assert!(headers.contains(&"Domingo Caballo".to_string()));
        assert_eq!(headers.last().unwrap(), "Desempate Formateado");
        assert_eq!(headers.len(), 3 + 4 * 3 + 1);
    }

    #[test]
    fn test_individual_csv_contains_formatted_tie_break() {
        let config = CompetitionConfig::three_day();
        let standings = rank_individuals("110", &snapshot(), &config);

        let mut buffer = Vec::new();
        write_individual_csv(&mut buffer, &standings, &config).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 3);
        // Bea wins the jump-off; no Sunday sheet yet, so the rank stays blank
        assert!(lines[1].starts_with(",Bea,4,"));
        assert!(lines[1].ends_with(",0/38.5"));
        assert!(lines[2].ends_with(",Eliminado"));
    }

    #[test]
    fn test_rank_hidden_when_not_eligible() {
        let config = CompetitionConfig::three_day();
        let standings = rank_individuals("110", &snapshot(), &config);
        assert!(!standings[0].display_eligible);

        let table = render_individual_table("110", &standings, &config);
        assert!(table.contains("Categoría 1,10m"));
        assert!(table.contains("provisional"));
        let bea = table.lines().find(|l| l.contains("Bea")).unwrap();
        assert!(bea.starts_with("      Bea"));
    }

    #[test]
    fn test_rank_shown_once_every_sheet_is_in() {
        let config = CompetitionConfig::three_day();
        let data = snapshot().with_sheet(DaySheet::new(
            "DOMINGO",
            "110",
            vec![
                row("a", "Ane", Cell::Number(0.0), "60"),
                row("b", "Bea", Cell::Number(0.0), "61"),
            ],
        ));
        let standings = rank_individuals("110", &data, &config);

        let record = individual_record(&standings[0], &config);
        assert_eq!(record[0], "1");
        assert_eq!(record[1], "Bea");
    }

    #[test]
    fn test_team_csv_pads_members() {
        let config = CompetitionConfig::three_day();
        let teams = rank_teams(&snapshot(), &config);

        let mut buffer = Vec::new();
        write_team_csv(&mut buffer, &teams, config.team.counted_members).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let mut reader = csv::Reader::from_reader(text.as_bytes());
        let headers = reader.headers().unwrap().clone();
        let records: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();

        assert_eq!(headers.len(), 5 + 4 * 7);
        assert_eq!(records.len(), 1);
        assert_eq!(&records[0][1], "Rojo");
        assert_eq!(&records[0][3], "8");
        assert_eq!(&records[0][5], "Ane (VÁLIDO)");
        assert_eq!(&records[0][11], "SÍ");
        assert_eq!(&records[0][19], "");
    }

    #[test]
    fn test_team_table_marks_members() {
        let teams = rank_teams(&snapshot(), &CompetitionConfig::three_day());
        let table = render_team_table(&teams);

        assert!(table.contains("Rojo"));
        assert!(table.contains("✓ Ane"));
    }

    #[test]
    fn test_sheet_sorted_by_run_order() {
        let mut late = row("a", "Ane", Cell::Number(0.0), "60");
        late.insert("O.S.".to_string(), Cell::Number(2.0));
        let mut early = row("b", "Bea", Cell::Number(4.0), "61");
        early.insert("O.S.".to_string(), Cell::Number(1.0));
        let sheet = DaySheet::new("VIERNES", "110", vec![late, early]);

        let text = render_sheet(&sheet);
        let bea = text.find("Bea").unwrap();
        let ane = text.find("Ane").unwrap();

        assert!(bea < ane);
        assert!(text.starts_with("📋 VIERNES 1,10m"));
    }

    #[test]
    fn test_json_serializes_standings() {
        let config = CompetitionConfig::three_day();
        let standings = rank_individuals("110", &snapshot(), &config);
        let json = to_json(&standings).unwrap();

        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value[0]["rider"], "Bea");
        assert_eq!(value[0]["rank"], 1);
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("Short", 10), "Short");
        assert_eq!(truncate("Caballero de Sevilla", 10), "Caballe...");
    }
}
