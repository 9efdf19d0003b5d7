// NETS Wrangle - Core Library
// Classifies establishment records into business-type categories per year
// from SIC-code rules, and prepares the labeled NETS extract.

pub mod errors;
pub mod records;        // Year-indexed establishment records
pub mod rules;          // Category rules + rule evaluator
pub mod aggregates;     // ALC / NGT second-tier categories
pub mod classifier;     // Categories × years driver
pub mod data_quality;   // Faults collected during classification
pub mod parser;         // Raw NETS extracts + join
pub mod output;         // CSV writer
pub mod config;         // Run configuration
pub mod wrangle;        // End-to-end pipeline

// Re-export commonly used types
pub use errors::{ConfigurationError, TableError};
pub use records::{
    Column, ColumnKind, EstablishmentRecord, RecordTable, Year, YearAttributes,
    KEY_COLUMN, SIC6_COLUMN,
};
pub use rules::{evaluate, CategoryRule, Evaluation, RowMatch, RuleConfig, SicRange};
pub use aggregates::{build_aggregates, AggregateRule};
pub use classifier::{classify, ClassifiedTable, Classifier, FlagKey};
pub use data_quality::{ClassificationReport, Fault, Severity};
pub use parser::{join_tables, read_raw_table, ColumnSelector, RawTable, RowFilter};
pub use output::{digest, output_file_name, write_csv, write_csv_file};
pub use config::WrangleConfig;
pub use wrangle::{wrangle_nets, WrangleSummary};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
