// ⚠️ Error Types - fatal failures of the classification run
// Configuration errors abort before any flag is computed.
// Table errors are raised when building a RecordTable at the input boundary.
//
// Per-row data problems are NOT errors: see data_quality::Fault.

use thiserror::Error;

// ============================================================================
// CONFIGURATION ERRORS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    /// Rule document is not valid JSON or does not have the expected shape
    #[error("Malformed rule configuration: {0}")]
    MalformedDocument(String),

    #[error("Category name must not be empty")]
    EmptyCategoryName,

    /// A `sic_range` entry with low > high
    #[error("Category {category}: inverted SIC range [{low}, {high}]")]
    InvertedRange {
        category: String,
        low: i64,
        high: i64,
    },

    /// Aggregate refers to a category with no rule
    #[error("Aggregate {aggregate} references unknown category {category}")]
    UnknownAggregateSource {
        aggregate: String,
        category: String,
    },

    #[error("Invalid year label: {0:?}")]
    InvalidYear(String),

    #[error("Year {0} requested more than once")]
    DuplicateYear(String),

    #[error("No years requested")]
    NoYears,

    /// Requested year whose columns were not resolved when the table was built
    #[error("Year {0} was not indexed when the table was built")]
    YearNotIndexed(String),

    /// Output column would shadow an input column or another output column
    #[error("Output column {0} collides with an existing column")]
    ColumnCollision(String),
}

// ============================================================================
// TABLE ERRORS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TableError {
    #[error("Key column {0} not found in header")]
    MissingKeyColumn(String),

    #[error("Column {0} appears more than once in header")]
    DuplicateColumn(String),

    #[error("Business {0} appears more than once")]
    DuplicateKey(String),

    #[error("Row {row} has {found} fields, expected {expected}")]
    RowWidth {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("Row {0} has no business identifier")]
    MissingKey(usize),
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = ConfigurationError::UnknownAggregateSource {
            aggregate: "ALC".to_string(),
            category: "LIQ".to_string(),
        };
        assert_eq!(err.to_string(), "Aggregate ALC references unknown category LIQ");

        let err = TableError::RowWidth { row: 3, expected: 4, found: 2 };
        assert_eq!(err.to_string(), "Row 3 has 2 fields, expected 4");
    }
}
