//! Category code → simple class lookup tables.
//!
//! A [`MappingTable`] is built once (from a built-in table or a file) and
//! consumed read-only. Every code that occurs in an input raster must be
//! present; there is no default class.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::class::SimpleClass;
use crate::error::{LandclassError, Result};
use crate::grid::Grid;
use crate::stats::{CodeCount, CodeHistogram, CoverageReport};

use SimpleClass::{Cropland, Forest, Grass, Other};

/// ESA CCI codes observed in the UK land-use scenarios, including the
/// scenario generator's non-standard variants (34, 65, 104, ...).
const UK_ESA_CCI: &[(i32, SimpleClass)] = &[
    (0, Other),
    (190, Other),
    (200, Other),
    (201, Other),
    (202, Other),
    (204, Other),
    (205, Other),
    (206, Other),
    (210, Other),
    (220, Other),
    (10, Cropland),
    (20, Cropland),
    (30, Cropland),
    (34, Cropland),
    (35, Cropland),
    (39, Cropland),
    (11, Grass),
    (40, Grass),
    (44, Grass),
    (49, Grass),
    (109, Grass),
    (110, Grass),
    (114, Grass),
    (115, Grass),
    (119, Grass),
    (120, Grass),
    (124, Grass),
    (130, Grass),
    (134, Grass),
    (140, Grass),
    (150, Grass),
    (154, Grass),
    (180, Grass),
    (184, Grass),
    (12, Forest),
    (50, Forest),
    (60, Forest),
    (65, Forest),
    (70, Forest),
    (75, Forest),
    (80, Forest),
    (85, Forest),
    (90, Forest),
    (95, Forest),
    (100, Forest),
    (104, Forest),
    (105, Forest),
    (160, Forest),
    (170, Forest),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingTable {
    name: String,
    entries: BTreeMap<i32, SimpleClass>,
}

// ── JSON schema ──────────────────────────────────────────────────────────────

#[derive(Serialize, Deserialize)]
struct MappingFile {
    #[serde(default)]
    name: Option<String>,
    entries: Vec<MappingEntry>,
}

#[derive(Serialize, Deserialize)]
struct MappingEntry {
    code: i32,
    class: SimpleClass,
}

impl MappingTable {
    /// Build from `(code, class)` pairs. Repeating a code with the same class
    /// is accepted; repeating it with a different class is an error.
    pub fn from_pairs<I>(name: impl Into<String>, pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (i32, SimpleClass)>,
    {
        let mut entries = BTreeMap::new();
        for (code, class) in pairs {
            if let Some(prev) = entries.insert(code, class) {
                if prev != class {
                    return Err(LandclassError::ConflictingEntry {
                        code,
                        first: prev.code(),
                        second: class.code(),
                    });
                }
            }
        }
        Ok(Self {
            name: name.into(),
            entries,
        })
    }

    /// The UK ESA CCI → Simple table.
    pub fn uk_esa_cci() -> Self {
        Self {
            name: "uk-esa-cci".to_string(),
            entries: UK_ESA_CCI.iter().copied().collect(),
        }
    }

    /// {0→Other, 1→Cropland, 2→Grass, 3→Forest}: remapping an already
    /// remapped grid under this table is a no-op.
    pub fn identity() -> Self {
        Self {
            name: "identity".to_string(),
            entries: SimpleClass::ALL
                .iter()
                .map(|c| (i32::from(c.code()), *c))
                .collect(),
        }
    }

    /// Load from a `.json` or `.csv` file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| LandclassError::io(path, e))?;
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("mapping")
            .to_string();
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        let mut table = match ext.as_deref() {
            Some("json") => Self::from_json_str(&text)?,
            Some("csv") => Self::from_csv_str(&text)?,
            _ => return Err(LandclassError::UnsupportedMappingFormat(path.to_path_buf())),
        };
        if table.name.is_empty() {
            table.name = stem;
        }
        tracing::debug!(path = %path.display(), codes = table.len(), "loaded mapping table");
        Ok(table)
    }

    /// Parse `{ "name": ..., "entries": [ { "code": 10, "class": 1 }, ... ] }`.
    pub fn from_json_str(text: &str) -> Result<Self> {
        let file: MappingFile = serde_json::from_str(text)?;
        Self::from_pairs(
            file.name.unwrap_or_default(),
            file.entries.into_iter().map(|e| (e.code, e.class)),
        )
    }

    pub fn to_json_string(&self) -> Result<String> {
        let file = MappingFile {
            name: Some(self.name.clone()),
            entries: self
                .entries
                .iter()
                .map(|(&code, &class)| MappingEntry { code, class })
                .collect(),
        };
        Ok(serde_json::to_string_pretty(&file)?)
    }

    /// Parse a CSV table with a header row. Headers named exactly
    /// `ESA_CCI_Code` and `Simple_Class` (case-insensitive) are used when
    /// present. Otherwise the code column is the first header containing
    /// "code" and the class column the first other one containing "class".
    pub fn from_csv_str(text: &str) -> Result<Self> {
        let mut lines = text
            .lines()
            .enumerate()
            .map(|(i, l)| (i + 1, l.trim()))
            .filter(|(_, l)| !l.is_empty());

        let Some((header_line, header)) = lines.next() else {
            return Err(LandclassError::MalformedMapping {
                line: 1,
                reason: "empty file".to_string(),
            });
        };
        let columns: Vec<String> = split_csv_row(header)
            .into_iter()
            .map(|c| c.to_ascii_lowercase())
            .collect();
        let exact = |name: &str| columns.iter().position(|c| c == name);
        let code_col = exact("esa_cci_code")
            .or_else(|| columns.iter().position(|c| c.contains("code")));
        let class_col = exact("simple_class").or_else(|| {
            columns
                .iter()
                .enumerate()
                .position(|(i, c)| Some(i) != code_col && c.contains("class"))
        });
        let (Some(code_col), Some(class_col)) = (code_col, class_col) else {
            return Err(LandclassError::MalformedMapping {
                line: header_line,
                reason: format!("header needs a code column and a class column, got {header:?}"),
            });
        };

        let mut pairs = Vec::new();
        for (line, row) in lines {
            let fields = split_csv_row(row);
            let field = |idx: usize| {
                fields.get(idx).ok_or_else(|| LandclassError::MalformedMapping {
                    line,
                    reason: format!("expected at least {} columns", idx + 1),
                })
            };
            let code: i32 = field(code_col)?
                .parse()
                .map_err(|e| LandclassError::MalformedMapping {
                    line,
                    reason: format!("bad code: {e}"),
                })?;
            let raw_class: i64 = field(class_col)?
                .parse()
                .map_err(|e| LandclassError::MalformedMapping {
                    line,
                    reason: format!("bad class: {e}"),
                })?;
            let class = SimpleClass::try_from(raw_class).map_err(|e| {
                LandclassError::MalformedMapping {
                    line,
                    reason: e.to_string(),
                }
            })?;
            pairs.push((code, class));
        }
        Self::from_pairs(String::new(), pairs)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn lookup(&self, code: i32) -> Option<SimpleClass> {
        self.entries.get(&code).copied()
    }

    pub fn require(&self, code: i32) -> Result<SimpleClass> {
        self.lookup(code).ok_or_else(|| LandclassError::UnmappedCodes {
            mapping: self.name.clone(),
            codes: vec![code],
            cells: 1,
        })
    }

    pub fn contains(&self, code: i32) -> bool {
        self.entries.contains_key(&code)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (i32, SimpleClass)> + '_ {
        self.entries.iter().map(|(&k, &v)| (k, v))
    }

    /// Source codes assigned to `class`, ascending.
    pub fn codes_for(&self, class: SimpleClass) -> Vec<i32> {
        self.iter()
            .filter(|&(_, c)| c == class)
            .map(|(code, _)| code)
            .collect()
    }

    /// Partition the distinct codes of `grid` into mapped and unmapped.
    pub fn coverage(&self, grid: &Grid<i32>) -> CoverageReport {
        self.coverage_of(&CodeHistogram::from_grid(grid))
    }

    /// Coverage of already-counted codes, e.g. merged over several rasters.
    pub fn coverage_of(&self, histogram: &CodeHistogram) -> CoverageReport {
        let mut mapped = Vec::new();
        let mut unmapped = Vec::new();
        for (code, cells) in histogram.iter() {
            let class = self.lookup(code);
            let entry = CodeCount { code, cells, class };
            if class.is_some() {
                mapped.push(entry);
            } else {
                unmapped.push(entry);
            }
        }
        CoverageReport {
            mapping: self.name.clone(),
            total_cells: histogram.total(),
            mapped,
            unmapped,
        }
    }
}

/// Split one CSV row on commas, honouring double-quoted fields.
fn split_csv_row(row: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut chars = row.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '"' if quoted && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => quoted = !quoted,
            ',' if !quoted => fields.push(std::mem::take(&mut current).trim().to_string()),
            _ => current.push(ch),
        }
    }
    fields.push(current.trim().to_string());
    fields
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Codes found across the UK scenario rasters.
    const UK_SCENARIO_CODES: &[i32] = &[
        0, 10, 11, 12, 30, 34, 35, 39, 40, 44, 49, 60, 65, 70, 75, 80, 85, 90, 95, 100, 104, 105,
        109, 110, 114, 115, 119, 120, 124, 130, 134, 150, 154, 180, 184, 190, 200, 201, 202, 204,
        205, 206, 210,
    ];

    #[test]
    fn uk_table_covers_every_scenario_code() {
        let table = MappingTable::uk_esa_cci();
        let missing: Vec<i32> = UK_SCENARIO_CODES
            .iter()
            .copied()
            .filter(|c| !table.contains(*c))
            .collect();
        assert!(missing.is_empty(), "missing codes: {missing:?}");
    }

    #[test]
    fn uk_table_has_no_duplicate_codes() {
        let table = MappingTable::uk_esa_cci();
        assert_eq!(table.len(), UK_ESA_CCI.len());
        assert!(MappingTable::from_pairs("check", UK_ESA_CCI.iter().copied()).is_ok());
    }

    #[test]
    fn uk_table_assignments() {
        let table = MappingTable::uk_esa_cci();
        assert_eq!(table.lookup(210), Some(Other));
        assert_eq!(table.lookup(10), Some(Cropland));
        assert_eq!(table.lookup(130), Some(Grass));
        assert_eq!(table.lookup(60), Some(Forest));
        assert_eq!(table.lookup(61), None);
        assert_eq!(table.codes_for(Cropland), vec![10, 20, 30, 34, 35, 39]);
    }

    #[test]
    fn identity_maps_each_class_to_itself() {
        let table = MappingTable::identity();
        for class in SimpleClass::ALL {
            assert_eq!(table.lookup(i32::from(class.code())), Some(class));
        }
        assert_eq!(table.len(), 4);
    }

    #[test]
    fn conflicting_pairs_are_rejected() {
        let err = MappingTable::from_pairs("t", [(10, Cropland), (10, Forest)]).unwrap_err();
        assert!(matches!(
            err,
            LandclassError::ConflictingEntry { code: 10, first: 1, second: 3 }
        ));
        let ok = MappingTable::from_pairs("t", [(10, Cropland), (10, Cropland)]).unwrap();
        assert_eq!(ok.len(), 1);
    }

    #[test]
    fn require_reports_unmapped_code() {
        let table = MappingTable::identity();
        assert_eq!(table.require(2).unwrap(), Grass);
        match table.require(9) {
            Err(LandclassError::UnmappedCodes { codes, .. }) => assert_eq!(codes, vec![9]),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn csv_with_extra_and_quoted_columns() {
        let text = "ESA_CCI_Code,Description,Simple_Class\n\
                    10,\"Cropland, rainfed\",1\n\
                    \n\
                    60,Tree cover,3\n";
        let table = MappingTable::from_csv_str(text).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.lookup(10), Some(Cropland));
        assert_eq!(table.lookup(60), Some(Forest));
    }

    #[test]
    fn csv_prefers_exact_column_names() {
        let text = "Land_Class_Note,ESA_CCI_Code,Simple_Class\n\
                    rainfed,10,1\n\
                    trees,60,3\n";
        let table = MappingTable::from_csv_str(text).unwrap();
        assert_eq!(table.lookup(10), Some(Cropland));
        assert_eq!(table.lookup(60), Some(Forest));

        let text = "Legacy_Code,esa_cci_code,SIMPLE_CLASS\n99,130,2\n";
        let table = MappingTable::from_csv_str(text).unwrap();
        assert_eq!(table.lookup(130), Some(Grass));
        assert!(!table.contains(99));
    }

    #[test]
    fn csv_with_description_columns() {
        let text = "ESA_CCI_Code,ESA_Description,Simple_Class,Simple_Description\n\
                    10,\"Cropland, rainfed\",1,Cropland\n\
                    130,Grassland,2,\"Grass, pasture\"\n";
        let table = MappingTable::from_csv_str(text).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.lookup(10), Some(Cropland));
        assert_eq!(table.lookup(130), Some(Grass));
    }

    #[test]
    fn csv_errors_name_the_line() {
        let bad_class = "code,class\n10,1\n20,7\n";
        match MappingTable::from_csv_str(bad_class) {
            Err(LandclassError::MalformedMapping { line, .. }) => assert_eq!(line, 3),
            other => panic!("unexpected: {other:?}"),
        }
        let bad_header = "a,b\n10,1\n";
        assert!(matches!(
            MappingTable::from_csv_str(bad_header),
            Err(LandclassError::MalformedMapping { line: 1, .. })
        ));
        assert!(MappingTable::from_csv_str("code,class\nten,1\n").is_err());
    }

    #[test]
    fn json_table_parses_and_serializes() {
        let text = r#"{ "name": "tiny", "entries": [ { "code": 0, "class": 0 }, { "code": 90, "class": 2 } ] }"#;
        let table = MappingTable::from_json_str(text).unwrap();
        assert_eq!(table.name(), "tiny");
        assert_eq!(table.lookup(90), Some(Grass));
        let again = MappingTable::from_json_str(&table.to_json_string().unwrap()).unwrap();
        assert_eq!(again, table);
        assert!(MappingTable::from_json_str(r#"{ "entries": [ { "code": 1, "class": 9 } ] }"#).is_err());
    }

    #[test]
    fn load_dispatches_on_extension() {
        let dir = tempfile::tempdir().unwrap();
        let csv = dir.path().join("uk_simple.csv");
        fs::write(&csv, "ESA_CCI_Code,Simple_Class\n10,1\n").unwrap();
        let table = MappingTable::load(&csv).unwrap();
        assert_eq!(table.name(), "uk_simple");
        assert_eq!(table.lookup(10), Some(Cropland));

        let txt = dir.path().join("table.txt");
        fs::write(&txt, "10,1\n").unwrap();
        assert!(matches!(
            MappingTable::load(&txt),
            Err(LandclassError::UnsupportedMappingFormat(_))
        ));
    }

    #[test]
    fn coverage_partitions_codes() {
        let grid = Grid::from_rows(vec![vec![10, 10, 61], vec![0, 61, 999]]).unwrap();
        let report = MappingTable::uk_esa_cci().coverage(&grid);
        assert_eq!(report.total_cells, 6);
        let mapped: Vec<(i32, usize)> = report.mapped.iter().map(|c| (c.code, c.cells)).collect();
        assert_eq!(mapped, vec![(0, 1), (10, 2)]);
        let unmapped: Vec<i32> = report.unmapped.iter().map(|c| c.code).collect();
        assert_eq!(unmapped, vec![61, 999]);
        assert!(!report.is_complete());
    }
}
