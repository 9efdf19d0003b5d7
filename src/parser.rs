// 🏗️ NETS Parser - raw registry files → joined flat table
//
// Raw NETS extracts are tab-delimited text with a header row. Only the key,
// the SIC6 code and the columns of the requested years are kept; the address
// and SIC extracts are then inner-joined on DunsNumber.

use crate::records::{Column, ColumnKind, Year, KEY_COLUMN, SIC6_COLUMN, SIC_PREFIX};
use anyhow::{bail, Context, Result};
use csv::ReaderBuilder;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::path::Path;
use tracing::{info, warn};

// ============================================================================
// RAW TABLE
// ============================================================================

/// Flat table as read from disk. Empty fields are None.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTable {
    pub header: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,

    /// Lines that could not be read or had the wrong number of fields
    pub skipped_lines: usize,

    /// Rows removed by the selector's row filter
    pub dropped_rows: usize,
}

impl RawTable {
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.header.iter().position(|h| h == name)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

// ============================================================================
// COLUMN SELECTION
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowFilter {
    /// Keep rows with at least one non-key value
    AnyValue,
    /// Keep rows where every selected per-year column has a value
    AllYearValues,
}

#[derive(Debug, Clone)]
pub struct ColumnSelector {
    /// Matched against the field part of per-year columns (Address in Address14)
    field_pattern: Regex,
    /// Year-invariant columns always kept
    fixed: Vec<String>,
    years: Vec<Year>,
    trim_values: bool,
    filter: RowFilter,
}

impl ColumnSelector {
    pub fn new(field_pattern: &str, years: &[Year]) -> Result<Self> {
        let field_pattern = Regex::new(field_pattern)
            .with_context(|| format!("Invalid column pattern: {}", field_pattern))?;

        Ok(ColumnSelector {
            field_pattern,
            fixed: Vec::new(),
            years: years.to_vec(),
            trim_values: false,
            filter: RowFilter::AnyValue,
        })
    }

    /// Address, City, State and ZIP columns of the requested years
    pub fn address(years: &[Year]) -> Result<Self> {
        Ok(ColumnSelector::new(r"^(Address|City|State|ZIP)", years)?
            .trim_values(true)
            .filter(RowFilter::AnyValue))
    }

    /// SIC6 plus the primary SIC column of each requested year
    pub fn sic(years: &[Year]) -> Result<Self> {
        Ok(ColumnSelector::new(&format!("^{}$", SIC_PREFIX), years)?
            .with_fixed(SIC6_COLUMN)
            .filter(RowFilter::AllYearValues))
    }

    pub fn with_fixed(mut self, column: &str) -> Self {
        self.fixed.push(column.to_string());
        self
    }

    pub fn trim_values(mut self, trim: bool) -> Self {
        self.trim_values = trim;
        self
    }

    pub fn filter(mut self, filter: RowFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Whether a header column is kept, and whether it is a per-year column
    fn select(&self, name: &str) -> Option<bool> {
        if name == KEY_COLUMN || self.fixed.iter().any(|f| f == name) {
            return Some(false);
        }

        match Column::classify(name, &self.years).kind {
            ColumnKind::Sic(_) => self.field_pattern.is_match(SIC_PREFIX).then_some(true),
            ColumnKind::YearAttribute { field, .. } => {
                self.field_pattern.is_match(&field).then_some(true)
            }
            _ => None,
        }
    }
}

// ============================================================================
// READING
// ============================================================================

/// Decode a raw field. Extracts are Windows-1252; bytes that are not valid
/// UTF-8 are mapped one-to-one onto Latin-1 code points.
fn decode_field(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => bytes.iter().map(|&b| char::from(b)).collect(),
    }
}

/// Read a tab-delimited extract keeping only the selected columns
pub fn read_raw_table(path: &Path, selector: &ColumnSelector) -> Result<RawTable> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open file: {}", path.display()))?;

    let mut reader = ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .flexible(true)
        .from_reader(file);

    let all_columns: Vec<String> = reader
        .byte_headers()
        .with_context(|| format!("Failed to read header of {}", path.display()))?
        .iter()
        .map(|h| decode_field(h).trim().to_string())
        .collect();

    if !all_columns.iter().any(|c| c == KEY_COLUMN) {
        bail!("{} has no {} column", path.display(), KEY_COLUMN);
    }

    // (source index, is per-year column)
    let selected: Vec<(usize, bool)> = all_columns
        .iter()
        .enumerate()
        .filter_map(|(i, name)| selector.select(name).map(|per_year| (i, per_year)))
        .collect();

    let mut table = RawTable {
        header: selected.iter().map(|(i, _)| all_columns[*i].clone()).collect(),
        ..RawTable::default()
    };
    let key_position = table.column_index(KEY_COLUMN).unwrap_or_default();

    for (line_num, result) in reader.byte_records().enumerate() {
        // +2: 1-indexed + header row
        let line = line_num + 2;

        let record = match result {
            Ok(record) if record.len() == all_columns.len() => record,
            Ok(record) => {
                warn!(
                    file = %path.display(),
                    line,
                    fields = record.len(),
                    expected = all_columns.len(),
                    "Skipping line with wrong field count"
                );
                table.skipped_lines += 1;
                continue;
            }
            Err(e) => {
                warn!(file = %path.display(), line, error = %e, "Skipping unreadable line");
                table.skipped_lines += 1;
                continue;
            }
        };

        let row: Vec<Option<String>> = selected
            .iter()
            .map(|(i, _)| {
                let value = decode_field(&record[*i]);
                let value = if selector.trim_values {
                    value.trim().to_string()
                } else {
                    value
                };
                Some(value).filter(|v| !v.trim().is_empty())
            })
            .collect();

        let keep = match selector.filter {
            RowFilter::AnyValue => row
                .iter()
                .enumerate()
                .any(|(pos, v)| pos != key_position && v.is_some()),
            RowFilter::AllYearValues => selected
                .iter()
                .zip(&row)
                .all(|((_, per_year), v)| !per_year || v.is_some()),
        };

        if keep {
            table.rows.push(row);
        } else {
            table.dropped_rows += 1;
        }
    }

    info!(
        file = %path.display(),
        columns = table.header.len(),
        rows = table.rows.len(),
        dropped = table.dropped_rows,
        skipped = table.skipped_lines,
        "Read raw table"
    );

    Ok(table)
}

// ============================================================================
// JOIN
// ============================================================================

/// Inner join on DunsNumber. Left row order is kept; right columns are appended.
/// Duplicate keys keep their first occurrence.
pub fn join_tables(left: RawTable, right: RawTable) -> Result<RawTable> {
    let left_key = left
        .column_index(KEY_COLUMN)
        .with_context(|| format!("Left table has no {} column", KEY_COLUMN))?;
    let right_key = right
        .column_index(KEY_COLUMN)
        .with_context(|| format!("Right table has no {} column", KEY_COLUMN))?;

    if let Some(shared) = right
        .header
        .iter()
        .enumerate()
        .find(|(i, name)| *i != right_key && left.header.contains(name))
        .map(|(_, name)| name)
    {
        bail!("Column {} present in both tables", shared);
    }

    let mut header = left.header;
    header.extend(
        right
            .header
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != right_key)
            .map(|(_, name)| name.clone()),
    );

    let mut right_rows: HashMap<String, Vec<Option<String>>> = HashMap::new();
    let mut duplicates = 0;
    for mut row in right.rows {
        let Some(key) = row[right_key].take() else {
            continue;
        };
        if right_rows.contains_key(&key) {
            duplicates += 1;
            continue;
        }
        row.remove(right_key);
        right_rows.insert(key, row);
    }

    let mut rows = Vec::new();
    let mut seen = HashSet::new();
    let mut unmatched = 0;
    for mut row in left.rows {
        let Some(key) = row[left_key].clone() else {
            continue;
        };
        if !seen.insert(key.clone()) {
            duplicates += 1;
            continue;
        }
        match right_rows.remove(&key) {
            Some(extra) => {
                row.extend(extra);
                rows.push(row);
            }
            None => unmatched += 1,
        }
    }

    if duplicates > 0 {
        warn!(duplicates, "Duplicate business identifiers dropped during join");
    }
    info!(
        rows = rows.len(),
        unmatched_left = unmatched,
        unmatched_right = right_rows.len(),
        "Joined tables"
    );

    Ok(RawTable {
        header,
        rows,
        skipped_lines: left.skipped_lines + right.skipped_lines,
        dropped_rows: left.dropped_rows + right.dropped_rows,
    })
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn years() -> Vec<Year> {
        vec![Year::new("13").unwrap(), Year::new("14").unwrap()]
    }

    fn write(dir: &Path, name: &str, lines: &[&str]) -> std::path::PathBuf {
        let path = dir.join(name);
        fs::write(&path, lines.join("\n") + "\n").unwrap();
        path
    }

    fn cells(values: &[Option<&str>]) -> Vec<Option<String>> {
        values.iter().map(|v| v.map(String::from)).collect()
    }

    #[test]
    fn test_read_address_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "address.txt",
            &[
                "DunsNumber\tCompany\tAddress13\tAddress14\tCity14\tState14\tZIP14\tAddress90",
                "001\tMain Bar\t1 Main St \t 1 Main St\tSpringfield\tIL\t62701\told",
                "002\tGone Inc\t\t\t\t\t\told",
                "003\tshort line",
            ],
        );

        let table = read_raw_table(&path, &ColumnSelector::address(&years()).unwrap()).unwrap();

        assert_eq!(
            table.header,
            vec!["DunsNumber", "Address13", "Address14", "City14", "State14", "ZIP14"]
        );
        // Values trimmed, empty row dropped, bad line skipped
        assert_eq!(table.rows.len(), 1);
        assert_eq!(
            table.rows[0],
            cells(&[Some("001"), Some("1 Main St"), Some("1 Main St"), Some("Springfield"), Some("IL"), Some("62701")])
        );
        assert_eq!(table.dropped_rows, 1);
        assert_eq!(table.skipped_lines, 1);
    }

    #[test]
    fn test_read_sic_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "sic.txt",
            &[
                "DunsNumber\tSIC90\tSIC13\tSIC14\tSIC6",
                "001\t5812\t5813\t5813\t581301",
                "002\t\t5812\t\t",
                "003\t\t7933\t7933\t",
            ],
        );

        let table = read_raw_table(&path, &ColumnSelector::sic(&years()).unwrap()).unwrap();

        assert_eq!(table.header, vec!["DunsNumber", "SIC13", "SIC14", "SIC6"]);
        // 002 has no SIC14
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.dropped_rows, 1);
        assert_eq!(table.rows[1], cells(&[Some("003"), Some("7933"), Some("7933"), None]));
    }

    #[test]
    fn test_windows_1252_bytes_do_not_abort() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("address.txt");
        let mut bytes = b"DunsNumber\tCity14\n001\tSan Jos".to_vec();
        bytes.push(0xE9);
        bytes.push(b'\n');
        fs::write(&path, bytes).unwrap();

        let table = read_raw_table(&path, &ColumnSelector::address(&years()).unwrap()).unwrap();
        assert_eq!(table.rows[0][1].as_deref(), Some("San José"));
    }

    #[test]
    fn test_missing_key_column() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "sic.txt", &["Id\tSIC14", "1\t5813"]);

        assert!(read_raw_table(&path, &ColumnSelector::sic(&years()).unwrap()).is_err());
        assert!(read_raw_table(&dir.path().join("nope.txt"), &ColumnSelector::sic(&years()).unwrap()).is_err());
    }

    #[test]
    fn test_inner_join() {
        let left = RawTable {
            header: vec!["DunsNumber".into(), "Address14".into()],
            rows: vec![
                cells(&[Some("001"), Some("1 Main St")]),
                cells(&[Some("002"), Some("2 Elm St")]),
                cells(&[Some("003"), Some("3 Oak St")]),
                cells(&[Some("001"), Some("duplicate")]),
            ],
            ..RawTable::default()
        };
        let right = RawTable {
            header: vec!["DunsNumber".into(), "SIC14".into(), "SIC6".into()],
            rows: vec![
                cells(&[Some("003"), Some("7933"), None]),
                cells(&[Some("001"), Some("5813"), Some("581301")]),
                cells(&[Some("004"), Some("5921"), None]),
            ],
            ..RawTable::default()
        };

        let joined = join_tables(left, right).unwrap();

        assert_eq!(joined.header, vec!["DunsNumber", "Address14", "SIC14", "SIC6"]);
        assert_eq!(
            joined.rows,
            vec![
                cells(&[Some("001"), Some("1 Main St"), Some("5813"), Some("581301")]),
                cells(&[Some("003"), Some("3 Oak St"), Some("7933"), None]),
            ]
        );
    }

    #[test]
    fn test_join_rejects_shared_columns() {
        let left = RawTable {
            header: vec!["DunsNumber".into(), "SIC14".into()],
            ..RawTable::default()
        };
        let right = left.clone();

        assert!(join_tables(left, right).is_err());
    }
}
