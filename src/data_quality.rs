// ✅ Data Quality - faults collected during classification
//
// One malformed record must not invalidate the rest of the dataset, so
// per-row and per-year problems are recorded here instead of aborting the run.

use crate::records::Year;
use serde::{Deserialize, Serialize};

// ============================================================================
// FAULTS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Critical, // A whole year could not be classified
    Warning,  // A single row contributed less than it could have
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Fault {
    /// Primary code present but not an integer where a range check needed it
    MalformedCode {
        duns_number: String,
        category: String,
        year: Year,
        value: String,
    },

    /// The SIC column for a requested year is missing from the table
    MissingField { year: Year, column: String },
}

impl Fault {
    pub fn severity(&self) -> Severity {
        match self {
            Fault::MalformedCode { .. } => Severity::Warning,
            Fault::MissingField { .. } => Severity::Critical,
        }
    }

    pub fn year(&self) -> &Year {
        match self {
            Fault::MalformedCode { year, .. } | Fault::MissingField { year, .. } => year,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Fault::MalformedCode { duns_number, category, year, value } => format!(
                "{}: SIC code {:?} for year {} is not numeric, range match for {} skipped",
                duns_number, value, year, category
            ),
            Fault::MissingField { year, column } => {
                format!("Column {} missing, year {} not classified", column, year)
            }
        }
    }
}

// ============================================================================
// CLASSIFICATION REPORT
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationReport {
    pub rows: usize,
    pub years_classified: Vec<Year>,
    pub years_skipped: Vec<Year>,
    pub columns_added: usize,
    pub faults: Vec<Fault>,
}

impl ClassificationReport {
    pub fn summary(&self) -> String {
        format!(
            "{} rows, {} flag columns, {} years classified, {} skipped | {} malformed codes",
            self.rows,
            self.columns_added,
            self.years_classified.len(),
            self.years_skipped.len(),
            self.malformed_count()
        )
    }

    pub fn malformed_count(&self) -> usize {
        self.faults
            .iter()
            .filter(|f| matches!(f, Fault::MalformedCode { .. }))
            .count()
    }

    pub fn has_faults(&self) -> bool {
        !self.faults.is_empty()
    }

    pub fn has_critical_faults(&self) -> bool {
        self.faults.iter().any(|f| f.severity() == Severity::Critical)
    }

    pub fn faults_for_year<'a>(&'a self, year: &'a Year) -> impl Iterator<Item = &'a Fault> {
        self.faults.iter().filter(move |f| f.year() == year)
    }
}

// ============================================================================
// TESTS
// ============================================================================
