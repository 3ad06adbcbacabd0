// 🧾 Row Normalizer - Canonical column names for result sheets
// Every organiser exports a slightly different header row ("Lic" vs "Licencia",
// "Faltas" vs "Puntos", "TIempo" typo...). Rows are normalized once so the
// rest of the engine reads a single logical schema.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Run-order value used when a row carries no usable O.S. column
pub const RUN_ORDER_SENTINEL: i64 = 9999;

// ============================================================================
// CELL VALUE
// ============================================================================

/// A single spreadsheet cell as loaded: either a number or free text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    Number(f64),
    Text(String),
}

impl Cell {
    /// Build a cell from a raw CSV field. Blank fields are absent.
    pub fn from_field(raw: &str) -> Option<Cell> {
        let trimmed = raw.trim().trim_matches('\u{feff}');
        if trimmed.is_empty() {
            return None;
        }

        // zero-padded codes ("0123") are identifiers, not numbers
        let zero_padded = trimmed.len() > 1
            && trimmed.starts_with('0')
            && trimmed.chars().all(|c| c.is_ascii_digit());

        match trimmed.parse::<f64>() {
            Ok(n) if n.is_finite() && !zero_padded => Some(Cell::Number(n)),
            _ => Some(Cell::Text(trimmed.to_string())),
        }
    }

    pub fn text(value: &str) -> Cell {
        Cell::Text(value.to_string())
    }

    /// Loose numeric coercion: numbers pass through, text is parsed after
    /// trimming and whitespace-only text counts as zero.
    pub fn to_number(&self) -> Option<f64> {
        match self {
            Cell::Number(n) => Some(*n),
            Cell::Text(s) => {
                let t = s.trim();
                if t.is_empty() {
                    return Some(0.0);
                }
                t.parse::<f64>().ok().filter(|n| n.is_finite())
            }
        }
    }

    /// Leading-integer parse (`"12b"` → 12). Used for run order values.
    pub fn leading_integer(&self) -> Option<i64> {
        match self {
            Cell::Number(n) => Some(n.trunc() as i64),
            Cell::Text(s) => {
                let t = s.trim();
                let (sign, digits) = match t.strip_prefix('-') {
                    Some(rest) => (-1, rest),
                    None => (1, t.strip_prefix('+').unwrap_or(t)),
                };
                let end = digits
                    .char_indices()
                    .find(|(_, c)| !c.is_ascii_digit())
                    .map(|(i, _)| i)
                    .unwrap_or(digits.len());
                digits[..end].parse::<i64>().ok().map(|v| sign * v)
            }
        }
    }

    pub fn is_blank(&self) -> bool {
        matches!(self, Cell::Text(s) if s.trim().is_empty())
    }

    pub fn as_text(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Number(n) => write!(f, "{}", n),
            Cell::Text(s) => write!(f, "{}", s),
        }
    }
}

/// A raw row: header name → cell, exactly as the sheet provided it.
pub type RawRow = BTreeMap<String, Cell>;

// ============================================================================
// LOGICAL FIELDS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    License,
    Rider,
    Mount,
    Club,
    Score,
    Time,
    Placement,
    RunOrder,
    MountNumber,
}

impl Field {
    pub const ALL: [Field; 9] = [
        Field::License,
        Field::Rider,
        Field::Mount,
        Field::Club,
        Field::Score,
        Field::Time,
        Field::Placement,
        Field::RunOrder,
        Field::MountNumber,
    ];

    /// Header written into normalized rows
    pub fn canonical(&self) -> &'static str {
        self.aliases()[0]
    }

    /// Known header variants, in lookup order. The first entry is canonical.
    pub fn aliases(&self) -> &'static [&'static str] {
        match self {
            Field::License => &["Licencia", "LICENCIA", "licencia", "Lic", "LIC", "lic"],
            Field::Rider => &["Atleta", "Jinete", "NOMBRE JINETE"],
            Field::Mount => &["Caballo", "CABALLO", "caballo", "Cab", "CAB", "cab"],
            Field::Club => &["Club", "CLUB", "club"],
            Field::Score => &["Puntos", "Faltas"],
            Field::Time => &["Tiempo", "TIempo"],
            Field::Placement => &["Cl", "CL", "cl", "Posicion"],
            Field::RunOrder => &["O.S.", "OS", "O S", "o.s.", "os"],
            Field::MountNumber => &["Dorsal", "No. caballo"],
        }
    }
}

fn header_key(header: &str) -> String {
    header
        .trim()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_uppercase()
}

fn present<'a>(row: &'a RawRow, header: &str) -> Option<&'a Cell> {
    row.get(header).filter(|c| !c.is_blank())
}

/// Find the first present synonym of `field`. Exact header matches win over
/// case/whitespace-insensitive ones.
pub fn lookup<'a>(row: &'a RawRow, field: Field) -> Option<&'a Cell> {
    for alias in field.aliases() {
        if let Some(cell) = present(row, alias) {
            return Some(cell);
        }
    }

    for alias in field.aliases() {
        let wanted = header_key(alias);
        let found = row
            .iter()
            .find(|(header, cell)| header_key(header) == wanted && !cell.is_blank());
        if let Some((_, cell)) = found {
            return Some(cell);
        }
    }

    None
}

/// Populate every canonical header from its first present synonym.
///
/// Original columns are never removed and a canonical header that is already
/// present is never overwritten, so normalizing twice is a no-op.
pub fn normalize_row(row: &RawRow) -> RawRow {
    let mut normalized = row.clone();

    for field in Field::ALL {
        if present(&normalized, field.canonical()).is_some() {
            continue;
        }
        if let Some(cell) = lookup(row, field).cloned() {
            normalized.insert(field.canonical().to_string(), cell);
        }
    }

    normalized
}

// ============================================================================
// RESULT ROW
// ============================================================================

/// One normalized result line of a day sheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRow {
    pub license: Option<String>,
    pub rider: Option<String>,
    pub mount: Option<String>,
    pub club: Option<String>,
    pub score: Option<Cell>,
    pub time: Option<Cell>,
    pub placement: Option<Cell>,
    pub run_order: Option<Cell>,
    pub mount_number: Option<Cell>,

    /// All columns after normalization, including ones the engine ignores
    pub fields: RawRow,
}

impl ResultRow {
    pub fn from_raw(raw: &RawRow) -> Self {
        let fields = normalize_row(raw);
        let text = |field: Field| {
            fields
                .get(field.canonical())
                .map(|c| c.as_text().trim().to_string())
                .filter(|s| !s.is_empty())
        };
        let cell = |field: Field| fields.get(field.canonical()).cloned();

        ResultRow {
            license: text(Field::License),
            rider: text(Field::Rider),
            mount: text(Field::Mount),
            club: text(Field::Club),
            score: cell(Field::Score),
            time: cell(Field::Time),
            placement: cell(Field::Placement),
            run_order: cell(Field::RunOrder),
            mount_number: cell(Field::MountNumber),
            fields,
        }
    }

    /// Run order used to collapse duplicate entries (lowest wins).
    pub fn run_order_rank(&self) -> i64 {
        self.run_order
            .as_ref()
            .and_then(|c| c.leading_integer())
            .unwrap_or(RUN_ORDER_SENTINEL)
    }

    pub fn get(&self, header: &str) -> Option<&Cell> {
        self.fields.get(header)
    }

    pub fn time_text(&self) -> Option<String> {
        self.time.as_ref().map(|c| c.as_text())
    }

    pub fn rider_or_empty(&self) -> &str {
        self.rider.as_deref().unwrap_or("")
    }

    pub fn mount_or_empty(&self) -> &str {
        self.mount.as_deref().unwrap_or("")
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(pairs: &[(&str, Cell)]) -> RawRow {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_cell_from_field_types() {
        assert_eq!(Cell::from_field(" 12 "), Some(Cell::Number(12.0)));
        assert_eq!(Cell::from_field("4.5"), Some(Cell::Number(4.5)));
        assert_eq!(Cell::from_field("EL"), Some(Cell::text("EL")));
        assert_eq!(Cell::from_field("   "), None);
        assert_eq!(Cell::from_field("NaN"), Some(Cell::text("NaN")));
        assert_eq!(Cell::from_field("0123"), Some(Cell::text("0123")));
        assert_eq!(Cell::from_field("0"), Some(Cell::Number(0.0)));
    }

    #[test]
    fn test_cell_numeric_coercion() {
        assert_eq!(Cell::Number(8.0).to_number(), Some(8.0));
        assert_eq!(Cell::text(" 4 ").to_number(), Some(4.0));
        assert_eq!(Cell::text("").to_number(), Some(0.0));
        assert_eq!(Cell::text("EL").to_number(), None);
        assert_eq!(Cell::text("inf").to_number(), None);
    }

    #[test]
    fn test_leading_integer() {
        assert_eq!(Cell::text("12b").leading_integer(), Some(12));
        assert_eq!(Cell::Number(3.9).leading_integer(), Some(3));
        assert_eq!(Cell::text("x1").leading_integer(), None);
    }

    #[test]
    fn test_normalize_fills_canonical_from_alias() {
        let row = raw(&[
            ("Lic", Cell::text("L-100")),
            ("Faltas", Cell::Number(4.0)),
            ("TIempo", Cell::text("1:02.50")),
            ("Posicion", Cell::Number(2.0)),
            ("No. caballo", Cell::Number(17.0)),
        ]);

        let normalized = normalize_row(&row);

        assert_eq!(normalized.get("Licencia"), Some(&Cell::text("L-100")));
        assert_eq!(normalized.get("Puntos"), Some(&Cell::Number(4.0)));
        assert_eq!(normalized.get("Tiempo"), Some(&Cell::text("1:02.50")));
        assert_eq!(normalized.get("Cl"), Some(&Cell::Number(2.0)));
        assert_eq!(normalized.get("Dorsal"), Some(&Cell::Number(17.0)));
        // originals are kept
        assert_eq!(normalized.get("Lic"), Some(&Cell::text("L-100")));
        assert_eq!(normalized.get("Faltas"), Some(&Cell::Number(4.0)));
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let row = raw(&[
            ("LICENCIA", Cell::text("A1")),
            ("Jinete", Cell::text("Ane Etxeberria")),
            ("cab", Cell::text("Txuri")),
            ("Faltas", Cell::text("EL")),
            ("os", Cell::Number(3.0)),
        ]);

        let once = normalize_row(&row);
        let twice = normalize_row(&once);

        assert_eq!(once, twice);
    }

    #[test]
    fn test_normalize_keeps_existing_canonical() {
        let row = raw(&[
            ("Puntos", Cell::Number(0.0)),
            ("Faltas", Cell::Number(8.0)),
        ]);

        let normalized = normalize_row(&row);
        assert_eq!(normalized.get("Puntos"), Some(&Cell::Number(0.0)));
    }

    #[test]
    fn test_lookup_is_case_insensitive_as_fallback() {
        let row = raw(&[(" licencia ", Cell::text("B7")), ("CLUB ", Cell::text("Hipica"))]);

        assert_eq!(lookup(&row, Field::License), Some(&Cell::text("B7")));
        assert_eq!(lookup(&row, Field::Club), Some(&Cell::text("Hipica")));
    }

    #[test]
    fn test_missing_fields_stay_absent() {
        let row = raw(&[("Atleta", Cell::text("Mikel"))]);
        let result = ResultRow::from_raw(&row);

        assert_eq!(result.rider.as_deref(), Some("Mikel"));
        assert!(result.license.is_none());
        assert!(result.score.is_none());
        assert_eq!(result.run_order_rank(), RUN_ORDER_SENTINEL);
    }

    #[test]
    fn test_result_row_license_from_number() {
        let row = raw(&[("Licencia", Cell::Number(123456.0)), ("O.S.", Cell::text("4"))]);
        let result = ResultRow::from_raw(&row);

        assert_eq!(result.license.as_deref(), Some("123456"));
        assert_eq!(result.run_order_rank(), 4);
    }
}
