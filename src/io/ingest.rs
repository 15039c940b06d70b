//! Panel CSV ingest and validation.
//!
//! Turns a solvent-test CSV into a `SolventPanel` that is safe to fit.
//!
//! - **Strict schema** for required columns (clear errors + exit code 2)
//! - **Row-level validation** (skip bad rows, but report what happened)
//! - **No fitting logic here**

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::StringRecord;
use tracing::warn;

use crate::domain::{HspPoint, SolventMeasurement, SolventPanel};
use crate::error::HspError;

const ID_COLUMNS: [&str; 4] = ["id", "cas", "nlm_num", "solvent_id"];
const LABEL_COLUMNS: [&str; 4] = ["good", "is_good_solvent", "soluble", "result"];
const NAME_COLUMNS: [&str; 2] = ["name", "subst_display_name"];

/// A row-level error encountered during ingest.
#[derive(Debug, Clone, PartialEq)]
pub struct RowError {
    pub line: usize,
    pub id: Option<String>,
    pub message: String,
}

/// Ingest output: the validated panel plus what was skipped.
#[derive(Debug, Clone)]
pub struct IngestedPanel {
    pub panel: SolventPanel,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
    pub rows_used: usize,
}

/// Load a labeled solvent panel from a CSV file.
pub fn load_panel(path: &Path) -> Result<IngestedPanel, HspError> {
    let file = File::open(path).map_err(|e| HspError::io(path, e))?;
    read_panel(file)
}

/// Load a labeled solvent panel from any CSV reader.
pub fn read_panel<R: Read>(source: R) -> Result<IngestedPanel, HspError> {
    let mut reader = csv_reader(source);
    let headers = reader.headers()?.clone();
    let header_map = build_header_map(&headers);

    let id_col = resolve_column(&header_map, &ID_COLUMNS)?;
    let label_col = resolve_column(&header_map, &LABEL_COLUMNS)?;
    for axis in ["delta_d", "delta_p", "delta_h"] {
        if !header_map.contains_key(axis) {
            return Err(HspError::InvalidInput(format!("Missing required column: `{axis}`")));
        }
    }
    let name_col = NAME_COLUMNS.iter().find(|c| header_map.contains_key(**c)).copied();

    let mut measurements = Vec::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;

    for (idx, result) in reader.records().enumerate() {
        // records() starts after the header line; CSV lines are 1-based.
        let line = idx + 2;
        rows_read += 1;

        let record = match result {
            Ok(r) => r,
            Err(e) => {
                row_errors.push(RowError {
                    line,
                    id: None,
                    message: format!("CSV parse error: {e}"),
                });
                continue;
            }
        };

        match parse_row(&record, &header_map, id_col, label_col, name_col) {
            Ok(m) => measurements.push(m),
            Err(message) => row_errors.push(RowError {
                line,
                id: get_optional(&record, &header_map, id_col).map(str::to_string),
                message,
            }),
        }
    }

    for e in &row_errors {
        warn!(line = e.line, id = e.id.as_deref().unwrap_or(""), "skipping row: {}", e.message);
    }

    let rows_used = measurements.len();
    if rows_used == 0 {
        return Err(HspError::EmptyPanel);
    }

    Ok(IngestedPanel {
        panel: SolventPanel::new(measurements)?,
        row_errors,
        rows_read,
        rows_used,
    })
}

/// Parse a good/poor label.
pub fn parse_label(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "y" | "good" => Some(true),
        "false" | "0" | "no" | "n" | "poor" | "bad" => Some(false),
        _ => None,
    }
}

pub(crate) fn csv_reader<R: Read>(source: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(source)
}

pub(crate) fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports often prefix the first header with a UTF-8 BOM.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_ascii_lowercase()
}

/// First of `candidates` present in the header.
pub(crate) fn resolve_column(
    header_map: &HashMap<String, usize>,
    candidates: &[&'static str],
) -> Result<&'static str, HspError> {
    candidates
        .iter()
        .find(|c| header_map.contains_key(**c))
        .copied()
        .ok_or_else(|| {
            HspError::InvalidInput(format!(
                "Missing required column: `{}` (or one of: {})",
                candidates[0],
                candidates[1..].join(", ")
            ))
        })
}

fn parse_row(
    record: &StringRecord,
    header_map: &HashMap<String, usize>,
    id_col: &str,
    label_col: &str,
    name_col: Option<&str>,
) -> Result<SolventMeasurement, String> {
    let id = get_required(record, header_map, id_col)?.to_string();
    let point = HspPoint::new(
        parse_f64(record, header_map, "delta_d")?,
        parse_f64(record, header_map, "delta_p")?,
        parse_f64(record, header_map, "delta_h")?,
    );

    let raw_label = get_required(record, header_map, label_col)?;
    let good = parse_label(raw_label).ok_or_else(|| format!("Invalid `{label_col}` label '{raw_label}'."))?;

    let mut m = SolventMeasurement::new(id, point, good);
    if let Some(name) = name_col.and_then(|c| get_optional(record, header_map, c)) {
        m = m.with_name(name);
    }
    Ok(m)
}

fn parse_f64(record: &StringRecord, header_map: &HashMap<String, usize>, name: &str) -> Result<f64, String> {
    let raw = get_required(record, header_map, name)?;
    let v = raw
        .parse::<f64>()
        .map_err(|_| format!("Invalid `{name}` value '{raw}'."))?;
    if v.is_finite() {
        Ok(v)
    } else {
        Err(format!("Non-finite `{name}` value."))
    }
}

pub(crate) fn get_required<'a>(
    record: &'a StringRecord,
    header_map: &HashMap<String, usize>,
    name: &str,
) -> Result<&'a str, String> {
    let idx = header_map
        .get(name)
        .ok_or_else(|| format!("Missing required column: `{name}`"))?;
    record
        .get(*idx)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| format!("Missing required value: `{name}`"))
}

pub(crate) fn get_optional<'a>(
    record: &'a StringRecord,
    header_map: &HashMap<String, usize>,
    name: &str,
) -> Option<&'a str> {
    let idx = header_map.get(name)?;
    record.get(*idx).map(str::trim).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn reads_aliases_labels_and_bom() {
        let csv = "\u{feff}CAS,Subst_Display_Name,Delta_D,Delta_P,Delta_H,Soluble\n\
                   67-64-1,Acetone,15.5,10.4,7.0,yes\n\
                   108-88-3,Toluene,18.0,1.4,2.0,poor\n\
                   75-09-2,,17.0,7.3,7.1,1\n";
        let ingested = read_panel(csv.as_bytes()).unwrap();

        assert_eq!(ingested.rows_read, 3);
        assert_eq!(ingested.rows_used, 3);
        assert!(ingested.row_errors.is_empty());

        let panel = &ingested.panel;
        assert_eq!(panel.good_count(), 2);
        let acetone = panel.get("67-64-1").unwrap();
        assert_eq!(acetone.name.as_deref(), Some("Acetone"));
        assert!(acetone.is_good_solvent);
        assert!(!panel.get("108-88-3").unwrap().is_good_solvent);
        assert_eq!(panel.get("75-09-2").unwrap().name, None);
    }

    #[test]
    fn bad_rows_are_reported_and_skipped() {
        let csv = "id,delta_d,delta_p,delta_h,good\n\
                   A,18.0,6.0,6.0,true\n\
                   B,abc,6.0,6.0,true\n\
                   C,18.0,6.0,6.0,maybe\n\
                   D,18.0,,6.0,false\n\
                   E,20.0,12.0,12.0,false\n";
        let ingested = read_panel(csv.as_bytes()).unwrap();

        assert_eq!(ingested.rows_read, 5);
        assert_eq!(ingested.rows_used, 2);
        let lines: Vec<usize> = ingested.row_errors.iter().map(|e| e.line).collect();
        assert_eq!(lines, vec![3, 4, 5]);
        assert_eq!(ingested.row_errors[0].id.as_deref(), Some("B"));
        assert!(ingested.row_errors[1].message.contains("maybe"));
    }

    #[test]
    fn missing_columns_are_fatal() {
        let csv = "id,delta_d,delta_p,good\nA,18,6,true\n";
        assert!(matches!(read_panel(csv.as_bytes()), Err(HspError::InvalidInput(_))));

        let csv = "id,delta_d,delta_p,delta_h\nA,18,6,6\n";
        let err = read_panel(csv.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("good"));
    }

    #[test]
    fn duplicates_and_empty_files_are_fatal() {
        let csv = "id,delta_d,delta_p,delta_h,good\nA,18,6,6,true\nA,17,5,5,false\n";
        assert!(matches!(
            read_panel(csv.as_bytes()),
            Err(HspError::DuplicateIdentifier(id)) if id == "A"
        ));

        let csv = "id,delta_d,delta_p,delta_h,good\nA,x,6,6,true\n";
        assert!(matches!(read_panel(csv.as_bytes()), Err(HspError::EmptyPanel)));
    }

    #[test]
    fn loads_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "id,delta_d,delta_p,delta_h,good").unwrap();
        writeln!(file, "A,18.0,6.0,6.0,good").unwrap();
        writeln!(file, "B,15.0,0.0,0.0,poor").unwrap();
        file.flush().unwrap();

        let ingested = load_panel(file.path()).unwrap();
        assert_eq!(ingested.panel.len(), 2);

        let missing = load_panel(Path::new("/definitely/not/here.csv"));
        assert!(matches!(missing, Err(HspError::Io { .. })));
    }

    #[test]
    fn label_spellings() {
        for s in ["true", "1", "YES", "y", "Good"] {
            assert_eq!(parse_label(s), Some(true), "{s}");
        }
        for s in ["false", "0", "no", "N", "poor"] {
            assert_eq!(parse_label(s), Some(false), "{s}");
        }
        assert_eq!(parse_label("2"), None);
    }
}
