//! Tabular file parsing and column profiling.
//!
//! CSV files are read with `csv`, spreadsheets with `calamine` (first sheet
//! only). Cells are typed as they are read; column dtypes use the names
//! `int64`, `float64`, `bool` and `object`.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::io::Cursor;
use std::str::FromStr;

use calamine::{Data, Reader, Xlsx};
use serde::Serialize;

use crate::error::{LabbookError, Result};

/// Tokens read as a missing value.
const NA_TOKENS: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// Source format of a tabular file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableKind {
    Csv,
    Spreadsheet,
}

impl TableKind {
    pub fn extension(&self) -> &'static str {
        match self {
            TableKind::Csv => "csv",
            TableKind::Spreadsheet => "xlsx",
        }
    }

    /// Detect the kind from a file name's extension.
    pub fn from_filename(filename: &str) -> Result<Self> {
        let lower = filename.trim().to_ascii_lowercase();
        if lower.ends_with(".csv") {
            Ok(TableKind::Csv)
        } else if lower.ends_with(".xlsx") {
            Ok(TableKind::Spreadsheet)
        } else {
            Err(LabbookError::Validation(
                "Only CSV and XLSX files are supported".to_string(),
            ))
        }
    }
}

impl FromStr for TableKind {
    type Err = LabbookError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(TableKind::Csv),
            "xlsx" | "spreadsheet" => Ok(TableKind::Spreadsheet),
            other => Err(LabbookError::Validation(format!(
                "Unsupported dataset format '{}' (expected csv or xlsx)",
                other
            ))),
        }
    }
}

/// One typed cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    Empty,
    Int(i64),
    Float(f64),
    Bool(bool),
    Text(String),
}

impl Cell {
    /// Type a raw text field.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if NA_TOKENS.contains(&trimmed) {
            return Cell::Empty;
        }
        if let Ok(value) = trimmed.parse::<i64>() {
            return Cell::Int(value);
        }
        if let Ok(value) = trimmed.parse::<f64>() {
            return Cell::Float(value);
        }
        match trimmed {
            "True" | "TRUE" | "true" => Cell::Bool(true),
            "False" | "FALSE" | "false" => Cell::Bool(false),
            _ => Cell::Text(raw.to_string()),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Int(v) => Some(*v as f64),
            Cell::Float(v) if !v.is_nan() => Some(*v),
            _ => None,
        }
    }

    fn from_sheet(cell: &Data) -> Self {
        match cell {
            Data::Empty | Data::Error(_) => Cell::Empty,
            Data::Int(v) => Cell::Int(*v),
            Data::Float(v) if v.fract() == 0.0 && v.abs() < 9.0e15 => Cell::Int(*v as i64),
            Data::Float(v) => Cell::Float(*v),
            Data::Bool(v) => Cell::Bool(*v),
            Data::String(s) => {
                if NA_TOKENS.contains(&s.trim()) {
                    Cell::Empty
                } else {
                    Cell::Text(s.clone())
                }
            }
            other => Cell::Text(other.to_string()),
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Empty => Ok(()),
            Cell::Int(v) => write!(f, "{}", v),
            Cell::Float(v) => write!(f, "{}", v),
            Cell::Bool(v) => f.write_str(if *v { "True" } else { "False" }),
            Cell::Text(s) => f.write_str(s),
        }
    }
}

/// A parsed table: named columns and typed rows of equal width.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl Table {
    /// Parse file bytes of the given kind.
    ///
    /// # Errors
    ///
    /// Returns `LabbookError::Validation` carrying the parser's message when
    /// the bytes cannot be read as a table.
    pub fn parse(bytes: &[u8], kind: TableKind) -> Result<Self> {
        match kind {
            TableKind::Csv => Self::from_csv(bytes),
            TableKind::Spreadsheet => Self::from_spreadsheet(bytes),
        }
    }

    pub fn from_csv(bytes: &[u8]) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(bytes);

        let raw_headers: Vec<String> = reader
            .headers()
            .map_err(|e| LabbookError::Validation(e.to_string()))?
            .iter()
            .map(str::to_string)
            .collect();
        if raw_headers.is_empty() || raw_headers.iter().all(|h| h.trim().is_empty()) {
            return Err(LabbookError::Validation(
                "No columns to parse from file".to_string(),
            ));
        }
        let headers = dedupe_headers(&raw_headers);
        let width = headers.len();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|e| LabbookError::Validation(e.to_string()))?;
            if record.len() == 1 && record.get(0).map_or(true, str::is_empty) && width > 1 {
                continue;
            }
            if record.len() > width {
                let line = record.position().map(|p| p.line()).unwrap_or(0);
                return Err(LabbookError::Validation(format!(
                    "Error tokenizing data. Expected {} fields in line {}, saw {}",
                    width,
                    line,
                    record.len()
                )));
            }
            let mut row: Vec<Cell> = record.iter().map(Cell::parse).collect();
            row.resize(width, Cell::Empty);
            rows.push(row);
        }

        Ok(Table { headers, rows })
    }

    pub fn from_spreadsheet(bytes: &[u8]) -> Result<Self> {
        let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(bytes))
            .map_err(|e| LabbookError::Validation(e.to_string()))?;
        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| LabbookError::Validation("Workbook has no worksheets".to_string()))?
            .map_err(|e| LabbookError::Validation(e.to_string()))?;

        let mut sheet_rows = range.rows();
        let raw_headers: Vec<String> = match sheet_rows.next() {
            Some(header_row) => header_row
                .iter()
                .map(|cell| match cell {
                    Data::Empty => String::new(),
                    other => other.to_string(),
                })
                .collect(),
            None => {
                return Err(LabbookError::Validation(
                    "No columns to parse from file".to_string(),
                ))
            }
        };
        let headers = dedupe_headers(&raw_headers);
        let width = headers.len();

        let rows = sheet_rows
            .filter(|row| row.iter().any(|c| !matches!(c, Data::Empty)))
            .map(|row| {
                let mut cells: Vec<Cell> = row.iter().map(Cell::from_sheet).collect();
                cells.resize(width, Cell::Empty);
                cells
            })
            .collect();

        Ok(Table { headers, rows })
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Numeric view of a column; non-numeric and missing cells are `None`.
    pub fn numeric_column(&self, index: usize) -> Vec<Option<f64>> {
        self.rows
            .iter()
            .map(|row| row.get(index).and_then(Cell::as_f64))
            .collect()
    }

    /// First `limit` rows as JSON objects keyed by column name.
    pub fn preview(&self, limit: usize) -> Vec<serde_json::Map<String, serde_json::Value>> {
        self.rows
            .iter()
            .take(limit)
            .map(|row| {
                self.headers
                    .iter()
                    .zip(row.iter())
                    .map(|(h, c)| {
                        (
                            h.clone(),
                            serde_json::to_value(c).unwrap_or(serde_json::Value::Null),
                        )
                    })
                    .collect()
            })
            .collect()
    }

    /// Profile every column.
    ///
    /// # Errors
    ///
    /// Returns `LabbookError::Validation` if the table has no data rows.
    pub fn profile(&self) -> Result<TableProfile> {
        if self.rows.is_empty() {
            return Err(LabbookError::Validation(
                "Dataset is empty: no data rows found".to_string(),
            ));
        }

        let mut columns = Vec::with_capacity(self.headers.len());
        let mut stats = Vec::new();

        for (index, name) in self.headers.iter().enumerate() {
            let cells: Vec<&Cell> = self.rows.iter().filter_map(|r| r.get(index)).collect();
            let dtype = infer_dtype(&cells);
            let present: Vec<&Cell> = cells.iter().copied().filter(|c| !c.is_empty()).collect();

            let distinct: HashSet<String> = present
                .iter()
                .map(|c| match (dtype, c.as_f64()) {
                    (Dtype::Int64 | Dtype::Float64, Some(v)) => format!("{}", v),
                    _ => c.to_string(),
                })
                .collect();

            columns.push((
                name.clone(),
                ColumnProfile {
                    dtype: dtype.as_str().to_string(),
                    non_null: present.len(),
                    unique: distinct.len(),
                },
            ));

            if dtype.is_numeric() {
                let values: Vec<f64> = present.iter().filter_map(|c| c.as_f64()).collect();
                stats.push((name.clone(), ColumnStats::from_values(&values)));
            }
        }

        Ok(TableProfile {
            row_count: self.rows.len(),
            columns,
            stats,
        })
    }
}

/// `a, a, ""` becomes `a, a.1, Unnamed: 2`.
fn dedupe_headers(raw: &[String]) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut taken: HashSet<String> = HashSet::new();
    let mut headers = Vec::with_capacity(raw.len());

    for (index, header) in raw.iter().enumerate() {
        let base = if header.trim().is_empty() {
            format!("Unnamed: {}", index)
        } else {
            header.clone()
        };
        let mut name = base.clone();
        while taken.contains(&name) {
            let counter = seen.entry(base.clone()).or_insert(0);
            *counter += 1;
            name = format!("{}.{}", base, counter);
        }
        taken.insert(name.clone());
        headers.push(name);
    }
    headers
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Dtype {
    Int64,
    Float64,
    Bool,
    Object,
}

impl Dtype {
    fn as_str(&self) -> &'static str {
        match self {
            Dtype::Int64 => "int64",
            Dtype::Float64 => "float64",
            Dtype::Bool => "bool",
            Dtype::Object => "object",
        }
    }

    fn is_numeric(&self) -> bool {
        matches!(self, Dtype::Int64 | Dtype::Float64)
    }
}

fn infer_dtype(cells: &[&Cell]) -> Dtype {
    let has_missing = cells.iter().any(|c| c.is_empty());
    let present: Vec<&&Cell> = cells.iter().filter(|c| !c.is_empty()).collect();

    if present.is_empty() {
        return Dtype::Float64;
    }
    if present.iter().all(|c| matches!(c, Cell::Int(_))) {
        return if has_missing {
            Dtype::Float64
        } else {
            Dtype::Int64
        };
    }
    if present
        .iter()
        .all(|c| matches!(c, Cell::Int(_) | Cell::Float(_)))
    {
        return Dtype::Float64;
    }
    if present.iter().all(|c| matches!(c, Cell::Bool(_))) && !has_missing {
        return Dtype::Bool;
    }
    Dtype::Object
}

/// Per-column metadata stored in `columns_json`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnProfile {
    pub dtype: String,
    pub non_null: usize,
    pub unique: usize,
}

/// Summary statistics of a numeric column. Unavailable values are `None`
/// and serialize as `null`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnStats {
    pub mean: Option<f64>,
    pub std: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl ColumnStats {
    pub fn from_values(values: &[f64]) -> Self {
        let finite = |v: f64| if v.is_finite() { Some(v) } else { None };
        let n = values.len();
        if n == 0 {
            return Self {
                mean: None,
                std: None,
                min: None,
                max: None,
            };
        }

        let mean = values.iter().sum::<f64>() / n as f64;
        let std = if n > 1 {
            let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
            finite(var.sqrt())
        } else {
            None
        };
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        Self {
            mean: finite(mean),
            std,
            min: finite(min),
            max: finite(max),
        }
    }
}

/// Result of profiling a table.
#[derive(Debug, Clone, PartialEq)]
pub struct TableProfile {
    pub row_count: usize,
    pub columns: Vec<(String, ColumnProfile)>,
    pub stats: Vec<(String, ColumnStats)>,
}

impl TableProfile {
    pub fn columns_json(&self) -> Result<serde_json::Value> {
        let mut map = serde_json::Map::new();
        for (name, profile) in &self.columns {
            map.insert(name.clone(), serde_json::to_value(profile)?);
        }
        Ok(serde_json::Value::Object(map))
    }

    pub fn stats_json(&self) -> Result<serde_json::Value> {
        let mut map = serde_json::Map::new();
        for (name, stats) in &self.stats {
            map.insert(name.clone(), serde_json::to_value(stats)?);
        }
        Ok(serde_json::Value::Object(map))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_typing() {
        assert_eq!(Cell::parse("42"), Cell::Int(42));
        assert_eq!(Cell::parse("4.5"), Cell::Float(4.5));
        assert_eq!(Cell::parse("NA"), Cell::Empty);
        assert_eq!(Cell::parse("TRUE"), Cell::Bool(true));
        assert_eq!(Cell::parse("buffer"), Cell::Text("buffer".into()));
    }

    #[test]
    fn test_csv_headers_are_deduped() {
        let table = Table::from_csv(b"a,a,\n1,2,3\n").unwrap();
        assert_eq!(table.headers, vec!["a", "a.1", "Unnamed: 2"]);
    }

    #[test]
    fn test_csv_short_rows_are_padded() {
        let table = Table::from_csv(b"x,y\n1,2\n3\n").unwrap();
        assert_eq!(table.rows[1], vec![Cell::Int(3), Cell::Empty]);
    }

    #[test]
    fn test_csv_long_row_is_a_parse_error() {
        let err = Table::from_csv(b"x,y\n1,2\n3,4,5\n").unwrap_err();
        assert!(matches!(err, LabbookError::Validation(ref m) if m.contains("Expected 2 fields")));
    }

    #[test]
    fn test_header_only_csv_has_no_rows() {
        let table = Table::from_csv(b"x,y\n").unwrap();
        assert_eq!(table.row_count(), 0);
        let err = table.profile().unwrap_err();
        assert!(matches!(err, LabbookError::Validation(_)));
    }

    #[test]
    fn test_dtype_inference() {
        let table = Table::from_csv(
            b"i,f,gap,flag,label\n1,1.5,1,true,a\n2,2,,false,b\n3,3,3,true,a\n",
        )
        .unwrap();
        let profile = table.profile().unwrap();
        let dtypes: Vec<&str> = profile
            .columns
            .iter()
            .map(|(_, p)| p.dtype.as_str())
            .collect();
        assert_eq!(dtypes, vec!["int64", "float64", "float64", "bool", "object"]);

        let (_, gap) = &profile.columns[2];
        assert_eq!(gap.non_null, 2);
        let (_, label) = &profile.columns[4];
        assert_eq!(label.unique, 2);

        let stat_names: Vec<&str> = profile.stats.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(stat_names, vec!["i", "f", "gap"]);
    }

    #[test]
    fn test_stats_use_sample_std() {
        let stats = ColumnStats::from_values(&[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(stats.mean, Some(2.5));
        assert_eq!(stats.min, Some(1.0));
        assert_eq!(stats.max, Some(4.0));
        let std = stats.std.unwrap();
        assert!((std - 1.2909944487358056).abs() < 1e-12);
    }

    #[test]
    fn test_single_value_std_is_unavailable() {
        let stats = ColumnStats::from_values(&[7.0]);
        assert_eq!(stats.std, None);
        let json = serde_json::to_value(&stats).unwrap();
        assert!(json["std"].is_null());
        assert_eq!(json["mean"], serde_json::json!(7.0));
    }

    #[test]
    fn test_table_kind_detection() {
        assert_eq!(TableKind::from_filename("Run.CSV").unwrap(), TableKind::Csv);
        assert_eq!(
            TableKind::from_filename("plate.xlsx").unwrap(),
            TableKind::Spreadsheet
        );
        assert!(TableKind::from_filename("plate.xls").is_err());
        assert_eq!("spreadsheet".parse::<TableKind>().unwrap(), TableKind::Spreadsheet);
    }

    #[test]
    fn test_preview_keys_by_header() {
        let table = Table::from_csv(b"x,y\n1,a\n2,\n").unwrap();
        let preview = table.preview(1);
        assert_eq!(preview.len(), 1);
        assert_eq!(preview[0]["x"], serde_json::json!(1));
        assert_eq!(preview[0]["y"], serde_json::json!("a"));
    }
}
