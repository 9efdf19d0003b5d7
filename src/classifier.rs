// 🗂️ Category Classifier - drives the rule evaluator over categories × years
//
// 1. Validate configuration against the table (fatal, nothing computed yet)
// 2. Evaluate every (category, year) pair independently
// 3. Derive aggregate categories per year from the completed first tier
//
// The input records are never modified; flags are carried alongside them and
// flattened into `{category}_{year}` columns only at the output boundary.

use crate::aggregates::{build_aggregates, AggregateRule};
use crate::data_quality::{ClassificationReport, Fault};
use crate::errors::ConfigurationError;
use crate::records::{RecordTable, Year};
use crate::rules::{evaluate, RuleConfig};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::time::Instant;
use tracing::{info, warn};

// ============================================================================
// FLAG KEY
// ============================================================================

/// (category, year) identifier of one flag column
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FlagKey {
    pub category: String,
    pub year: Year,
}

impl FlagKey {
    pub fn new(category: impl Into<String>, year: Year) -> Self {
        FlagKey {
            category: category.into(),
            year,
        }
    }

    /// Flat output column name
    pub fn column_name(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for FlagKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.category, self.year)
    }
}

// ============================================================================
// CLASSIFIED TABLE
// ============================================================================

/// The input table plus every flag column, in output order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedTable {
    table: RecordTable,
    flags: Vec<(FlagKey, Vec<bool>)>,
    report: ClassificationReport,
}

impl ClassifiedTable {
    pub fn table(&self) -> &RecordTable {
        &self.table
    }

    pub fn report(&self) -> &ClassificationReport {
        &self.report
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn flag_keys(&self) -> impl Iterator<Item = &FlagKey> {
        self.flags.iter().map(|(key, _)| key)
    }

    pub fn column(&self, key: &FlagKey) -> Option<&[bool]> {
        self.flags
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, values)| values.as_slice())
    }

    /// 0/1 flag for one row, None if the row or column does not exist
    pub fn flag(&self, row: usize, key: &FlagKey) -> Option<u8> {
        self.column(key)
            .and_then(|values| values.get(row))
            .map(|&set| u8::from(set))
    }

    /// Input header followed by flag column names
    pub fn header(&self) -> Vec<String> {
        self.table
            .header()
            .map(str::to_string)
            .chain(self.flags.iter().map(|(key, _)| key.column_name()))
            .collect()
    }

    /// Flag values of one row, in flag column order
    pub fn row_flags(&self, row: usize) -> Vec<u8> {
        self.flags
            .iter()
            .filter_map(|(_, values)| values.get(row).map(|&set| u8::from(set)))
            .collect()
    }

    pub fn into_parts(self) -> (RecordTable, Vec<(FlagKey, Vec<bool>)>, ClassificationReport) {
        (self.table, self.flags, self.report)
    }
}

// ============================================================================
// CLASSIFIER
// ============================================================================

pub struct Classifier<'a> {
    rules: &'a RuleConfig,
    aggregates: Vec<AggregateRule>,
}

impl<'a> Classifier<'a> {
    /// Classifier with the standard aggregate set (ALC, NGT)
    pub fn new(rules: &'a RuleConfig) -> Self {
        Classifier {
            rules,
            aggregates: AggregateRule::standard(),
        }
    }

    pub fn with_aggregates(rules: &'a RuleConfig, aggregates: Vec<AggregateRule>) -> Self {
        Classifier { rules, aggregates }
    }

    pub fn rules(&self) -> &RuleConfig {
        self.rules
    }

    pub fn aggregates(&self) -> &[AggregateRule] {
        &self.aggregates
    }

    /// Reject anything that would make the run meaningless before computing
    pub fn check(&self, table: &RecordTable, years: &[Year]) -> Result<(), ConfigurationError> {
        Year::check_unique(years)?;

        // Header columns are resolved per year at build time
        if let Some(year) = years.iter().find(|y| !table.is_indexed_for(y)) {
            return Err(ConfigurationError::YearNotIndexed(year.to_string()));
        }

        for aggregate in &self.aggregates {
            aggregate.check_sources(self.rules)?;
        }

        let mut outputs = HashSet::new();
        let names = self
            .rules
            .names()
            .chain(self.aggregates.iter().map(|a| a.name.as_str()));

        for name in names {
            for year in years {
                let column = FlagKey::new(name, year.clone()).column_name();
                if table.has_column(&column) || !outputs.insert(column.clone()) {
                    return Err(ConfigurationError::ColumnCollision(column));
                }
            }
        }

        Ok(())
    }

    /// Classify every business for every configured category and requested year
    pub fn classify(
        &self,
        table: RecordTable,
        years: &[Year],
    ) -> Result<ClassifiedTable, ConfigurationError> {
        self.check(&table, years)?;

        let started = Instant::now();
        info!(
            rows = table.len(),
            categories = self.rules.len(),
            years = years.len(),
            "Beginning classification"
        );

        let mut faults = Vec::new();
        let (ready, skipped): (Vec<Year>, Vec<Year>) =
            years.iter().cloned().partition(|year| table.has_sic_column(year));

        for year in &skipped {
            let column = table.sic_column_name(year);
            warn!(year = %year, column = %column, "SIC column missing, year skipped");
            faults.push(Fault::MissingField {
                year: year.clone(),
                column,
            });
        }

        // First tier: (category, year) pairs never see each other's flags
        let mut layout = Vec::new();
        let mut first_tier: BTreeMap<FlagKey, Vec<bool>> = BTreeMap::new();

        for (category, rule) in self.rules.iter() {
            for year in &ready {
                match evaluate(&table, category, rule, year) {
                    Ok(evaluation) => {
                        let key = FlagKey::new(category, year.clone());
                        faults.extend(evaluation.faults);
                        layout.push(key.clone());
                        first_tier.insert(key, evaluation.flags);
                    }
                    Err(fault) => faults.push(fault),
                }
            }
        }

        // Second tier: only after every first-tier column exists
        let mut second_tier = Vec::new();
        for year in &ready {
            second_tier.extend(build_aggregates(&self.aggregates, &first_tier, year, table.len()));
        }

        let mut flags: Vec<(FlagKey, Vec<bool>)> = layout
            .into_iter()
            .filter_map(|key| first_tier.remove(&key).map(|values| (key, values)))
            .collect();
        flags.extend(second_tier);

        let report = ClassificationReport {
            rows: table.len(),
            years_classified: ready,
            years_skipped: skipped,
            columns_added: flags.len(),
            faults,
        };

        info!(
            "Time to classify: {:.2} seconds",
            started.elapsed().as_secs_f64()
        );
        info!("{}", report.summary());

        Ok(ClassifiedTable {
            table,
            flags,
            report,
        })
    }
}

/// Classify with the standard aggregate set
pub fn classify(
    table: RecordTable,
    rules: &RuleConfig,
    years: &[Year],
) -> Result<ClassifiedTable, ConfigurationError> {
    Classifier::new(rules).classify(table, years)
}

// ============================================================================
// TESTS
// ============================================================================
