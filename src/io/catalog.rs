//! Substance catalog: solvent coordinates keyed by registry number, plus a
//! short-name index.
//!
//! Two CSV tables are joined on `nlm_num`:
//! - `substances.csv`: `nlm_num, subst_display_name, subst_category, delta_d,
//!   delta_p, delta_h, mol_vol, src_id`
//! - `substance_names.csv`: `nlm_num, subst_short_name`
//!
//! A labeled panel can then be built from bare `(registry number, good)` tests.

use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::StringRecord;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::domain::{HspPoint, SolventMeasurement, SolventPanel};
use crate::error::HspError;
use crate::io::ingest::{
    RowError, build_header_map, csv_reader, get_optional, get_required, parse_label, resolve_column,
};

/// One substance row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubstanceRecord {
    pub nlm_num: String,
    pub display_name: String,
    pub category: Option<String>,
    pub delta_d: f64,
    pub delta_p: f64,
    pub delta_h: f64,
    pub mol_vol: Option<f64>,
    pub src_id: Option<i64>,
}

impl SubstanceRecord {
    pub fn point(&self) -> HspPoint {
        HspPoint::new(self.delta_d, self.delta_p, self.delta_h)
    }
}

/// Lookup payload. Unknown names produce `{"valid": false}` only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LookupResponse {
    pub valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delta_d: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delta_p: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delta_h: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mol_vol: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src_id: Option<i64>,
}

impl LookupResponse {
    pub fn not_found() -> Self {
        Self {
            valid: false,
            display_name: None,
            delta_d: None,
            delta_p: None,
            delta_h: None,
            mol_vol: None,
            src_id: None,
        }
    }

    fn found(record: &SubstanceRecord) -> Self {
        Self {
            valid: true,
            display_name: Some(record.display_name.clone()),
            delta_d: Some(record.delta_d),
            delta_p: Some(record.delta_p),
            delta_h: Some(record.delta_h),
            mol_vol: record.mol_vol,
            src_id: record.src_id,
        }
    }
}

/// A bare solvent test: registry number and observed outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolventTest {
    pub id: String,
    pub good: bool,
}

/// Parsed `tests.csv`.
#[derive(Debug, Clone)]
pub struct IngestedTests {
    pub tests: Vec<SolventTest>,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
}

#[derive(Debug, Clone, Default)]
pub struct SubstanceCatalog {
    substances: BTreeMap<String, SubstanceRecord>,
    /// short name -> registry number
    names: HashMap<String, String>,
}

impl SubstanceCatalog {
    pub fn new(records: Vec<SubstanceRecord>, names: Vec<(String, String)>) -> Result<Self, HspError> {
        let mut substances = BTreeMap::new();
        for r in records {
            if substances.contains_key(&r.nlm_num) {
                return Err(HspError::DuplicateIdentifier(r.nlm_num));
            }
            substances.insert(r.nlm_num.clone(), r);
        }
        let mut index = HashMap::with_capacity(names.len());
        for (short_name, nlm_num) in names {
            // First mapping wins, as a join with `.first()` would.
            index.entry(short_name).or_insert(nlm_num);
        }
        Ok(Self {
            substances,
            names: index,
        })
    }

    /// Load both tables from disk.
    pub fn load(substances: &Path, names: &Path) -> Result<Self, HspError> {
        let s = File::open(substances).map_err(|e| HspError::io(substances, e))?;
        let n = File::open(names).map_err(|e| HspError::io(names, e))?;
        Self::from_readers(s, n)
    }

    /// Load the substance table alone; short-name lookups will find nothing.
    pub fn load_substances(substances: &Path) -> Result<Self, HspError> {
        let s = File::open(substances).map_err(|e| HspError::io(substances, e))?;
        Self::new(read_substances(s)?, Vec::new())
    }

    pub fn from_readers<S: Read, N: Read>(substances: S, names: N) -> Result<Self, HspError> {
        let records = read_substances(substances)?;
        let names = read_names(names)?;
        debug!(substances = records.len(), names = names.len(), "loaded substance catalog");
        Self::new(records, names)
    }

    pub fn len(&self) -> usize {
        self.substances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.substances.is_empty()
    }

    pub fn get(&self, nlm_num: &str) -> Option<&SubstanceRecord> {
        self.substances.get(nlm_num)
    }

    /// Resolve a short name to its substance record.
    ///
    /// Names may only contain alphanumeric characters; anything else answers
    /// `{"valid": false}` without consulting the catalog.
    pub fn lookup(&self, short_name: &str) -> LookupResponse {
        if short_name.is_empty() || !short_name.chars().all(char::is_alphanumeric) {
            warn!(name = short_name, "rejected substance name: not alphanumeric");
            return LookupResponse::not_found();
        }
        self.names
            .get(short_name)
            .and_then(|nlm| self.substances.get(nlm))
            .map(LookupResponse::found)
            .unwrap_or_else(LookupResponse::not_found)
    }

    /// Attach catalog coordinates to each test.
    pub fn resolve_panel(&self, tests: &[SolventTest]) -> Result<SolventPanel, HspError> {
        let measurements = tests
            .iter()
            .map(|t| {
                let record = self.substances.get(&t.id).ok_or_else(|| {
                    HspError::InvalidInput(format!("unknown substance registry number '{}'", t.id))
                })?;
                Ok(SolventMeasurement::new(t.id.clone(), record.point(), t.good).with_name(record.display_name.clone()))
            })
            .collect::<Result<Vec<_>, HspError>>()?;
        SolventPanel::new(measurements)
    }
}

/// Load `tests.csv` (`id, good`, same aliases as the panel loader).
pub fn load_solvent_tests(path: &Path) -> Result<IngestedTests, HspError> {
    let file = File::open(path).map_err(|e| HspError::io(path, e))?;
    read_solvent_tests(file)
}

pub fn read_solvent_tests<R: Read>(source: R) -> Result<IngestedTests, HspError> {
    let mut reader = csv_reader(source);
    let header_map = build_header_map(&reader.headers()?.clone());
    let id_col = resolve_column(&header_map, &["id", "cas", "nlm_num", "solvent_id"])?;
    let label_col = resolve_column(&header_map, &["good", "is_good_solvent", "soluble", "result"])?;

    let mut tests = Vec::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;
    for (idx, result) in reader.records().enumerate() {
        let line = idx + 2;
        rows_read += 1;
        let parsed = result.map_err(|e| format!("CSV parse error: {e}")).and_then(|record| {
            let id = get_required(&record, &header_map, id_col)?.to_string();
            let raw = get_required(&record, &header_map, label_col)?;
            let good = parse_label(raw).ok_or_else(|| format!("Invalid `{label_col}` label '{raw}'."))?;
            Ok(SolventTest { id, good })
        });
        match parsed {
            Ok(t) => tests.push(t),
            Err(message) => {
                warn!(line, "skipping test row: {message}");
                row_errors.push(RowError {
                    line,
                    id: None,
                    message,
                });
            }
        }
    }

    if tests.is_empty() {
        return Err(HspError::EmptyPanel);
    }
    Ok(IngestedTests {
        tests,
        row_errors,
        rows_read,
    })
}

fn read_substances<R: Read>(source: R) -> Result<Vec<SubstanceRecord>, HspError> {
    let mut reader = csv_reader(source);
    let header_map = build_header_map(&reader.headers()?.clone());
    for col in ["nlm_num", "subst_display_name", "delta_d", "delta_p", "delta_h"] {
        if !header_map.contains_key(col) {
            return Err(HspError::InvalidInput(format!(
                "substances table is missing column `{col}`"
            )));
        }
    }

    let mut records = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        let line = idx + 2;
        match result
            .map_err(|e| format!("CSV parse error: {e}"))
            .and_then(|r| parse_substance(&r, &header_map, line))
        {
            Ok(r) => records.push(r),
            Err(message) => warn!(line, "skipping substance row: {message}"),
        }
    }
    Ok(records)
}

fn parse_substance(
    record: &StringRecord,
    header_map: &HashMap<String, usize>,
    line: usize,
) -> Result<SubstanceRecord, String> {
    let number = |name: &str| -> Result<f64, String> {
        let raw = get_required(record, header_map, name)?;
        raw.parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| format!("Invalid `{name}` value '{raw}'."))
    };

    let nlm_num = get_required(record, header_map, "nlm_num")?.to_string();
    // Optional columns: an unparseable value is dropped, not fatal to the row.
    let optional = |name: &str| -> Option<&str> { get_optional(record, header_map, name) };
    let mol_vol = optional("mol_vol").and_then(|raw| {
        let parsed = raw.parse::<f64>().ok().filter(|v| v.is_finite());
        if parsed.is_none() {
            warn!(line, nlm_num = %nlm_num, value = raw, "ignoring invalid `mol_vol`");
        }
        parsed
    });
    let src_id = optional("src_id").and_then(|raw| {
        let parsed = raw.parse::<i64>().ok();
        if parsed.is_none() {
            warn!(line, nlm_num = %nlm_num, value = raw, "ignoring invalid `src_id`");
        }
        parsed
    });

    Ok(SubstanceRecord {
        display_name: get_required(record, header_map, "subst_display_name")?.to_string(),
        category: get_optional(record, header_map, "subst_category").map(str::to_string),
        delta_d: number("delta_d")?,
        delta_p: number("delta_p")?,
        delta_h: number("delta_h")?,
        mol_vol,
        src_id,
        nlm_num,
    })
}

fn read_names<R: Read>(source: R) -> Result<Vec<(String, String)>, HspError> {
    let mut reader = csv_reader(source);
    let header_map = build_header_map(&reader.headers()?.clone());
    for col in ["nlm_num", "subst_short_name"] {
        if !header_map.contains_key(col) {
            return Err(HspError::InvalidInput(format!(
                "substance names table is missing column `{col}`"
            )));
        }
    }

    let mut names = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                warn!(line = idx + 2, "skipping substance name row: CSV parse error: {e}");
                continue;
            }
        };
        let (Some(nlm), Some(short)) = (
            get_optional(&record, &header_map, "nlm_num"),
            get_optional(&record, &header_map, "subst_short_name"),
        ) else {
            continue;
        };
        names.push((short.to_string(), nlm.to_string()));
    }
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SUBSTANCES: &str = "nlm_num,subst_display_name,subst_category,delta_d,delta_p,delta_h,mol_vol,src_id\n\
        67-64-1,Acetone,ketone,15.5,10.4,7.0,73.8,1\n\
        108-88-3,Toluene,aromatic,18.0,1.4,2.0,106.8,1\n\
        64-17-5,Ethanol,alcohol,15.8,8.8,19.4,,2\n\
        75-09-2,Dichloromethane,,17.0,7.3,7.1,63.9,\n\
        999-99-9,Broken,,n/a,1,1,,\n";

    const NAMES: &str = "nlm_num,subst_short_name\n\
        67-64-1,acetone\n\
        108-88-3,toluene\n\
        108-88-3,toluol\n\
        64-17-5,ethanol\n\
        75-09-2,DCM\n";

    fn catalog() -> SubstanceCatalog {
        SubstanceCatalog::from_readers(SUBSTANCES.as_bytes(), NAMES.as_bytes()).unwrap()
    }

    #[test]
    fn lookup_joins_names_to_substances() {
        let c = catalog();
        assert_eq!(c.len(), 4);

        let hit = c.lookup("toluol");
        assert!(hit.valid);
        assert_eq!(hit.display_name.as_deref(), Some("Toluene"));
        assert_eq!(hit.delta_d, Some(18.0));
        assert_eq!(hit.mol_vol, Some(106.8));
        assert_eq!(hit.src_id, Some(1));

        let ethanol = c.lookup("ethanol");
        assert_eq!(ethanol.mol_vol, None);
        assert_eq!(ethanol.src_id, Some(2));

        assert_eq!(c.lookup("benzene"), LookupResponse::not_found());
    }

    #[test]
    fn non_alphanumeric_names_are_not_found() {
        let c = catalog();
        for bad in ["", "ace tone", "acetone;drop", "di_chloro", "67-64-1"] {
            assert_eq!(c.lookup(bad), LookupResponse::not_found(), "{bad:?}");
        }
        assert!(c.lookup("DCM").valid);
    }

    #[test]
    fn malformed_name_rows_are_skipped() {
        let mut names = b"nlm_num,subst_short_name\n67-64-1,acetone\n".to_vec();
        names.extend_from_slice(b"\xff\xfe,bad\n");
        names.extend_from_slice(b"108-88-3,toluene\n");

        let c = SubstanceCatalog::from_readers(SUBSTANCES.as_bytes(), names.as_slice()).unwrap();
        assert!(c.lookup("acetone").valid);
        assert!(c.lookup("toluene").valid);
    }

    #[test]
    fn unparseable_optional_columns_keep_the_row() {
        let s = "nlm_num,subst_display_name,delta_d,delta_p,delta_h,mol_vol,src_id\n\
                 67-64-1,Acetone,15.5,10.4,7.0,abc,x1\n\
                 108-88-3,Toluene,18.0,1.4,2.0,106.8,3\n";
        let c = SubstanceCatalog::from_readers(s.as_bytes(), NAMES.as_bytes()).unwrap();
        assert_eq!(c.len(), 2);

        let acetone = c.get("67-64-1").unwrap();
        assert_eq!(acetone.delta_p, 10.4);
        assert_eq!(acetone.mol_vol, None);
        assert_eq!(acetone.src_id, None);
        assert_eq!(c.get("108-88-3").unwrap().src_id, Some(3));
    }

    #[test]
    fn not_found_serializes_as_valid_false_only() {
        let json = serde_json::to_string(&LookupResponse::not_found()).unwrap();
        assert_eq!(json, r#"{"valid":false}"#);
    }

    #[test]
    fn resolve_panel_attaches_coordinates() {
        let tests = read_solvent_tests("id,good\n67-64-1,1\n108-88-3,0\n75-09-2,yes\n".as_bytes()).unwrap();
        assert_eq!(tests.tests.len(), 3);

        let panel = catalog().resolve_panel(&tests.tests).unwrap();
        assert_eq!(panel.len(), 3);
        assert_eq!(panel.good_count(), 2);
        let toluene = panel.get("108-88-3").unwrap();
        assert_eq!(toluene.point(), HspPoint::new(18.0, 1.4, 2.0));
        assert_eq!(toluene.name.as_deref(), Some("Toluene"));
    }

    #[test]
    fn resolve_panel_rejects_unknown_ids() {
        let tests = vec![SolventTest {
            id: "1-2-3".to_string(),
            good: true,
        }];
        assert!(matches!(catalog().resolve_panel(&tests), Err(HspError::InvalidInput(_))));
    }

    #[test]
    fn tests_file_reports_bad_rows() {
        let parsed = read_solvent_tests("cas,soluble\n67-64-1,maybe\n108-88-3,no\n".as_bytes()).unwrap();
        assert_eq!(parsed.rows_read, 2);
        assert_eq!(parsed.tests.len(), 1);
        assert_eq!(parsed.row_errors[0].line, 2);
    }

    #[test]
    fn duplicate_substances_are_rejected() {
        let s = "nlm_num,subst_display_name,delta_d,delta_p,delta_h\nA,a,1,1,1\nA,b,2,2,2\n";
        let n = "nlm_num,subst_short_name\n";
        assert!(matches!(
            SubstanceCatalog::from_readers(s.as_bytes(), n.as_bytes()),
            Err(HspError::DuplicateIdentifier(_))
        ));
    }
}
