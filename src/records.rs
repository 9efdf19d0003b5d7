// 🏢 Establishment Records - year-indexed view of the joined NETS table
//
// The raw registry flattens a business/year relation into repeated columns
// (SIC13, SIC14, Address13, Address14, ...). Here each record carries a
// Year -> YearAttributes map instead; flattening back to columns happens only
// at the input/output boundary (RecordTable::from_rows / row_values).

use crate::errors::{ConfigurationError, TableError};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::str::FromStr;

/// Business identifier column (join/primary key)
pub const KEY_COLUMN: &str = "DunsNumber";

/// Year-invariant 6-digit SIC column
pub const SIC6_COLUMN: &str = "SIC6";

/// Prefix of the per-year primary SIC columns (SIC14 or SIC_14)
pub const SIC_PREFIX: &str = "SIC";

// ============================================================================
// YEAR
// ============================================================================

/// Observation year label as it appears in column names (e.g. "13", "14")
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Year(String);

impl Year {
    pub fn new(label: impl Into<String>) -> Result<Self, ConfigurationError> {
        let label = label.into();
        let trimmed = label.trim();

        if trimmed.is_empty() || !trimmed.chars().all(|c| c.is_ascii_digit()) {
            return Err(ConfigurationError::InvalidYear(label));
        }

        Ok(Year(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parse a comma-separated year list ("13,14"), keeping caller order
    pub fn parse_list(input: &str) -> Result<Vec<Year>, ConfigurationError> {
        let years = input
            .split(',')
            .map(Year::new)
            .collect::<Result<Vec<_>, _>>()?;

        Year::check_unique(&years)?;
        Ok(years)
    }

    /// A requested year list must be non-empty and free of repeats
    pub fn check_unique(years: &[Year]) -> Result<(), ConfigurationError> {
        if years.is_empty() {
            return Err(ConfigurationError::NoYears);
        }

        let mut seen = HashSet::new();
        for year in years {
            if !seen.insert(year) {
                return Err(ConfigurationError::DuplicateYear(year.0.clone()));
            }
        }

        Ok(())
    }
}

impl fmt::Display for Year {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Year {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Year::new(s)
    }
}

impl TryFrom<String> for Year {
    type Error = ConfigurationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Year::new(value)
    }
}

impl From<Year> for String {
    fn from(year: Year) -> Self {
        year.0
    }
}

// ============================================================================
// COLUMN MODEL
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ColumnKind {
    /// DunsNumber
    Key,
    /// SIC6
    Sic6,
    /// SIC{year} / SIC_{year} for a requested year
    Sic(Year),
    /// Any other {field}{year} column for a requested year (Address14, City14, ...)
    YearAttribute { year: Year, field: String },
    /// Everything else, carried through untouched
    Passthrough,
}

/// One input column: original header text + what it means
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub kind: ColumnKind,
}

impl Column {
    /// Classify a header name against the requested years
    pub fn classify(name: &str, years: &[Year]) -> Column {
        let kind = if name == KEY_COLUMN {
            ColumnKind::Key
        } else if name == SIC6_COLUMN {
            ColumnKind::Sic6
        } else {
            years
                .iter()
                .find_map(|year| {
                    let prefix = name.strip_suffix(year.as_str())?;
                    let field = prefix.strip_suffix('_').unwrap_or(prefix);

                    // "SIC114" is not SIC for year 14
                    if field.is_empty() || field.ends_with(|c: char| c.is_ascii_digit()) {
                        return None;
                    }

                    Some(if field == SIC_PREFIX {
                        ColumnKind::Sic(year.clone())
                    } else {
                        ColumnKind::YearAttribute {
                            year: year.clone(),
                            field: field.to_string(),
                        }
                    })
                })
                .unwrap_or(ColumnKind::Passthrough)
        };

        Column {
            name: name.to_string(),
            kind,
        }
    }
}

// ============================================================================
// ESTABLISHMENT RECORD
// ============================================================================

/// Per-year slice of a record
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearAttributes {
    /// Primary SIC code for the year (string-encoded integer)
    pub sic: Option<String>,

    /// Pass-through per-year fields keyed by field name (Address, City, ...)
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
}

/// One business row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EstablishmentRecord {
    pub duns_number: String,
    pub sic6: Option<String>,
    pub years: BTreeMap<Year, YearAttributes>,

    /// Columns with no classification meaning, keyed by header name
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub passthrough: BTreeMap<String, String>,
}

impl EstablishmentRecord {
    pub fn new(duns_number: impl Into<String>) -> Self {
        EstablishmentRecord {
            duns_number: duns_number.into(),
            sic6: None,
            years: BTreeMap::new(),
            passthrough: BTreeMap::new(),
        }
    }

    pub fn with_sic6(mut self, code: impl Into<String>) -> Self {
        self.sic6 = Some(code.into());
        self
    }

    pub fn with_sic(mut self, year: &Year, code: impl Into<String>) -> Self {
        self.years.entry(year.clone()).or_default().sic = Some(code.into());
        self
    }

    pub fn with_attribute(
        mut self,
        year: &Year,
        field: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.years
            .entry(year.clone())
            .or_default()
            .attributes
            .insert(field.into(), value.into());
        self
    }

    /// Primary SIC code for a year, if present
    pub fn sic(&self, year: &Year) -> Option<&str> {
        self.years.get(year).and_then(|y| y.sic.as_deref())
    }

    pub fn sic6(&self) -> Option<&str> {
        self.sic6.as_deref()
    }

    fn value(&self, column: &Column) -> Option<&str> {
        match &column.kind {
            ColumnKind::Key => Some(self.duns_number.as_str()),
            ColumnKind::Sic6 => self.sic6(),
            ColumnKind::Sic(year) => self.sic(year),
            ColumnKind::YearAttribute { year, field } => self
                .years
                .get(year)
                .and_then(|y| y.attributes.get(field))
                .map(String::as_str),
            ColumnKind::Passthrough => self.passthrough.get(&column.name).map(String::as_str),
        }
    }

    fn set_value(&mut self, column: &Column, value: String) {
        match &column.kind {
            ColumnKind::Key => self.duns_number = value,
            ColumnKind::Sic6 => self.sic6 = Some(value),
            ColumnKind::Sic(year) => {
                self.years.entry(year.clone()).or_default().sic = Some(value);
            }
            ColumnKind::YearAttribute { year, field } => {
                self.years
                    .entry(year.clone())
                    .or_default()
                    .attributes
                    .insert(field.clone(), value);
            }
            ColumnKind::Passthrough => {
                self.passthrough.insert(column.name.clone(), value);
            }
        }
    }
}

// ============================================================================
// RECORD TABLE
// ============================================================================

/// The joined establishment dataset: header (original order) + one record per business
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordTable {
    columns: Vec<Column>,
    records: Vec<EstablishmentRecord>,

    /// Years the header was resolved against
    years: Vec<Year>,
}

impl RecordTable {
    /// Build from flat rows (input boundary).
    ///
    /// Empty fields are absent. SIC fields made only of whitespace are absent
    /// too; every other value is kept as given.
    pub fn from_rows<I>(header: Vec<String>, rows: I, years: &[Year]) -> Result<Self, TableError>
    where
        I: IntoIterator<Item = Vec<Option<String>>>,
    {
        let columns = Self::build_columns(&header, years)?;
        let key_index = columns
            .iter()
            .position(|c| c.kind == ColumnKind::Key)
            .ok_or_else(|| TableError::MissingKeyColumn(KEY_COLUMN.to_string()))?;

        let mut records = Vec::new();
        for (row_index, row) in rows.into_iter().enumerate() {
            if row.len() != columns.len() {
                return Err(TableError::RowWidth {
                    row: row_index,
                    expected: columns.len(),
                    found: row.len(),
                });
            }

            let duns = row[key_index]
                .as_deref()
                .filter(|k| !k.trim().is_empty())
                .ok_or(TableError::MissingKey(row_index))?;

            let mut record = EstablishmentRecord::new(duns);
            for (column, value) in columns.iter().zip(row) {
                let present = match &column.kind {
                    ColumnKind::Key => continue,
                    ColumnKind::Sic6 | ColumnKind::Sic(_) => {
                        value.filter(|v| !v.trim().is_empty())
                    }
                    _ => value.filter(|v| !v.is_empty()),
                };
                if let Some(value) = present {
                    record.set_value(column, value);
                }
            }

            records.push(record);
        }

        Self::from_parts(columns, records, years)
    }

    /// Build from already-structured records with an explicit header
    pub fn from_records(
        header: &[&str],
        records: Vec<EstablishmentRecord>,
        years: &[Year],
    ) -> Result<Self, TableError> {
        let header: Vec<String> = header.iter().map(|h| h.to_string()).collect();
        let columns = Self::build_columns(&header, years)?;

        if !columns.iter().any(|c| c.kind == ColumnKind::Key) {
            return Err(TableError::MissingKeyColumn(KEY_COLUMN.to_string()));
        }

        Self::from_parts(columns, records, years)
    }

    /// Header names must be unique, and so must the slot they resolve to:
    /// SIC14 and SIC_14 in one header would both feed the same year code.
    fn build_columns(header: &[String], years: &[Year]) -> Result<Vec<Column>, TableError> {
        let mut names = HashSet::new();
        let mut kinds = HashSet::new();
        header
            .iter()
            .map(|name| {
                let column = Column::classify(name, years);
                let clash = column.kind != ColumnKind::Passthrough && !kinds.insert(column.kind.clone());
                if !names.insert(name.as_str()) || clash {
                    return Err(TableError::DuplicateColumn(name.clone()));
                }
                Ok(column)
            })
            .collect()
    }

    fn from_parts(
        columns: Vec<Column>,
        records: Vec<EstablishmentRecord>,
        years: &[Year],
    ) -> Result<Self, TableError> {
        let mut keys = HashSet::new();
        for record in &records {
            if !keys.insert(record.duns_number.as_str()) {
                return Err(TableError::DuplicateKey(record.duns_number.clone()));
            }
        }

        Ok(RecordTable {
            columns,
            records,
            years: years.to_vec(),
        })
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn header(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    /// Years whose per-year columns were resolved when the table was built
    pub fn years(&self) -> &[Year] {
        &self.years
    }

    pub fn is_indexed_for(&self, year: &Year) -> bool {
        self.years.contains(year)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    /// Whether the table carries a primary SIC column for `year`
    pub fn has_sic_column(&self, year: &Year) -> bool {
        self.columns
            .iter()
            .any(|c| matches!(&c.kind, ColumnKind::Sic(y) if y == year))
    }

    /// Name of the primary SIC column for `year` ("SIC_{year}" when absent)
    pub fn sic_column_name(&self, year: &Year) -> String {
        self.columns
            .iter()
            .find(|c| matches!(&c.kind, ColumnKind::Sic(y) if y == year))
            .map(|c| c.name.clone())
            .unwrap_or_else(|| format!("{}_{}", SIC_PREFIX, year))
    }

    pub fn records(&self) -> &[EstablishmentRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Flatten one record back into header order (output boundary)
    pub fn row_values(&self, index: usize) -> Vec<Option<&str>> {
        match self.records.get(index) {
            Some(record) => self.columns.iter().map(|c| record.value(c)).collect(),
            None => Vec::new(),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn years() -> Vec<Year> {
        vec![Year::new("13").unwrap(), Year::new("14").unwrap()]
    }

    fn row(values: &[&str]) -> Vec<Option<String>> {
        values.iter().map(|v| Some(v.to_string())).collect()
    }

    #[test]
    fn test_year_parsing() {
        let years = Year::parse_list("13, 14").unwrap();
        assert_eq!(years, vec![Year::new("13").unwrap(), Year::new("14").unwrap()]);

        assert!(matches!(Year::parse_list("13,13"), Err(ConfigurationError::DuplicateYear(_))));
        assert!(matches!(Year::new("1x"), Err(ConfigurationError::InvalidYear(_))));
        assert!(matches!(Year::parse_list(""), Err(ConfigurationError::InvalidYear(_))));
        assert!(matches!(Year::check_unique(&[]), Err(ConfigurationError::NoYears)));
    }

    #[test]
    fn test_column_classification() {
        let years = years();
        let y14 = Year::new("14").unwrap();

        assert_eq!(Column::classify("DunsNumber", &years).kind, ColumnKind::Key);
        assert_eq!(Column::classify("SIC6", &years).kind, ColumnKind::Sic6);
        assert_eq!(Column::classify("SIC14", &years).kind, ColumnKind::Sic(y14.clone()));
        assert_eq!(Column::classify("SIC_14", &years).kind, ColumnKind::Sic(y14.clone()));
        assert_eq!(
            Column::classify("Address14", &years).kind,
            ColumnKind::YearAttribute { year: y14, field: "Address".to_string() }
        );
        // Not a requested year
        assert_eq!(Column::classify("SIC90", &years).kind, ColumnKind::Passthrough);
        assert_eq!(Column::classify("SIC114", &years).kind, ColumnKind::Passthrough);
    }

    #[test]
    fn test_from_rows_builds_year_index() {
        let years = years();
        let header = vec!["DunsNumber", "Address14", "SIC6", "SIC13", "SIC14", "Company"]
            .into_iter()
            .map(String::from)
            .collect();

        let mut second = row(&["002", "2 Elm St", "", "5812", "", "Elm Diner"]);
        second[2] = None;

        let table = RecordTable::from_rows(
            header,
            vec![row(&["001", "1 Main St", "581301", "5813", "5813", "Main Bar"]), second],
            &years,
        )
        .unwrap();

        assert_eq!(table.len(), 2);
        let first = &table.records()[0];
        assert_eq!(first.duns_number, "001");
        assert_eq!(first.sic6(), Some("581301"));
        assert_eq!(first.sic(&years[1]), Some("5813"));
        assert_eq!(first.passthrough.get("Company").map(String::as_str), Some("Main Bar"));

        // Empty strings are absent
        let second = &table.records()[1];
        assert_eq!(second.sic(&years[1]), None);
        assert_eq!(second.sic6(), None);

        // Flattening restores original column order
        assert_eq!(
            table.row_values(0),
            vec![Some("001"), Some("1 Main St"), Some("581301"), Some("5813"), Some("5813"), Some("Main Bar")]
        );
        assert_eq!(
            table.row_values(1),
            vec![Some("002"), Some("2 Elm St"), None, Some("5812"), None, Some("Elm Diner")]
        );
    }

    #[test]
    fn test_from_rows_structural_errors() {
        let years = years();
        let header = |names: &[&str]| names.iter().map(|n| n.to_string()).collect::<Vec<_>>();

        let missing_key = RecordTable::from_rows(header(&["SIC14"]), vec![row(&["5813"])], &years);
        assert!(matches!(missing_key, Err(TableError::MissingKeyColumn(_))));

        let width = RecordTable::from_rows(header(&["DunsNumber", "SIC14"]), vec![row(&["001"])], &years);
        assert!(matches!(width, Err(TableError::RowWidth { row: 0, expected: 2, found: 1 })));

        let duplicate = RecordTable::from_rows(
            header(&["DunsNumber", "SIC14"]),
            vec![row(&["001", "5813"]), row(&["001", "5812"])],
            &years,
        );
        assert!(matches!(duplicate, Err(TableError::DuplicateKey(_))));

        let columns = RecordTable::from_rows(header(&["DunsNumber", "SIC14", "SIC14"]), Vec::<Vec<Option<String>>>::new(), &years);
        assert!(matches!(columns, Err(TableError::DuplicateColumn(_))));
    }

    #[test]
    fn test_spellings_of_one_year_column_clash() {
        let years = years();
        let header = |names: &[&str]| names.iter().map(|n| n.to_string()).collect::<Vec<_>>();

        let sic = RecordTable::from_rows(
            header(&["DunsNumber", "SIC14", "SIC_14"]),
            vec![row(&["1", "5813", "5921"])],
            &years,
        );
        assert_eq!(sic, Err(TableError::DuplicateColumn("SIC_14".to_string())));

        let address = RecordTable::from_records(&["DunsNumber", "Address14", "Address_14"], Vec::new(), &years);
        assert_eq!(address, Err(TableError::DuplicateColumn("Address_14".to_string())));

        // Different years or fields are distinct slots
        let ok = RecordTable::from_records(&["DunsNumber", "SIC13", "SIC_14", "City14", "Note", "Note2"], Vec::new(), &years);
        assert!(ok.is_ok());
    }

    #[test]
    fn test_pass_through_values_kept_verbatim() {
        let years = years();
        let header = vec!["DunsNumber", "Company", "Address14", "SIC6", "SIC14"]
            .into_iter()
            .map(String::from)
            .collect();

        let table = RecordTable::from_rows(
            header,
            vec![row(&[" 001", "  ", " 1 Main St ", "   ", " "])],
            &years,
        )
        .unwrap();

        let record = &table.records()[0];
        assert_eq!(record.duns_number, " 001");
        // Whitespace-only SIC fields are absent, other fields untouched
        assert_eq!(record.sic6(), None);
        assert_eq!(record.sic(&years[1]), None);
        assert_eq!(
            table.row_values(0),
            vec![Some(" 001"), Some("  "), Some(" 1 Main St "), None, None]
        );

        let blank_key = RecordTable::from_rows(
            vec!["DunsNumber".to_string()],
            vec![row(&["  "])],
            &years,
        );
        assert_eq!(blank_key, Err(TableError::MissingKey(0)));
    }

    #[test]
    fn test_table_remembers_indexed_years() {
        let y14 = Year::new("14").unwrap();
        let table = RecordTable::from_records(&["DunsNumber", "SIC13", "SIC14"], Vec::new(), &[y14.clone()]).unwrap();

        assert_eq!(table.years(), &[y14.clone()][..]);
        assert!(table.is_indexed_for(&y14));
        assert!(!table.is_indexed_for(&Year::new("13").unwrap()));
        // SIC13 was not resolved for year 13
        assert_eq!(table.columns()[1].kind, ColumnKind::Passthrough);
    }

    #[test]
    fn test_sic_column_lookup() {
        let years = years();
        let table = RecordTable::from_records(
            &["DunsNumber", "SIC6", "SIC14"],
            vec![EstablishmentRecord::new("001").with_sic(&years[1], "5813")],
            &years,
        )
        .unwrap();

        assert!(table.has_sic_column(&years[1]));
        assert!(!table.has_sic_column(&years[0]));
        assert_eq!(table.sic_column_name(&years[1]), "SIC14");
        assert_eq!(table.sic_column_name(&years[0]), "SIC_13");
    }
}
