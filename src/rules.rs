// 🏷️ Classification Rules - Rules as Data
// SIC-code rules per business category, loaded from a JSON document
//
// A category matches a business for a year when:
//   (exact primary code OR exact SIC6 code OR primary code in any range)
//   AND NOT primary code in sic_not

use crate::data_quality::Fault;
use crate::errors::ConfigurationError;
use crate::records::{RecordTable, Year};
use anyhow::{Context as AnyhowContext, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use tracing::debug;

// ============================================================================
// RULE DEFINITION
// ============================================================================

/// Closed integer interval [low, high], written as a two-element array
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "[i64; 2]", into = "[i64; 2]")]
pub struct SicRange {
    pub low: i64,
    pub high: i64,
}

impl SicRange {
    pub fn new(low: i64, high: i64) -> Self {
        SicRange { low, high }
    }

    /// Both endpoints inclusive
    pub fn contains(&self, code: i64) -> bool {
        self.low <= code && code <= self.high
    }
}

impl From<[i64; 2]> for SicRange {
    fn from([low, high]: [i64; 2]) -> Self {
        SicRange { low, high }
    }
}

impl From<SicRange> for [i64; 2] {
    fn from(range: SicRange) -> Self {
        [range.low, range.high]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRule {
    /// Primary codes that match directly
    #[serde(default)]
    pub sic_exclusive: BTreeSet<String>,

    /// 6-digit codes that match directly
    #[serde(default)]
    pub sic_6: BTreeSet<String>,

    /// Primary code ranges (inclusive)
    #[serde(default)]
    pub sic_range: Vec<SicRange>,

    /// Primary codes that force a non-match
    #[serde(default)]
    pub sic_not: BTreeSet<String>,
}

/// Outcome of one rule against one (business, year)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RowMatch {
    pub matched: bool,

    /// Primary code present but not an integer while ranges were checked
    pub malformed: bool,
}

impl CategoryRule {
    pub fn with_exclusive<I, S>(mut self, codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sic_exclusive.extend(codes.into_iter().map(Into::into));
        self
    }

    pub fn with_sic6<I, S>(mut self, codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sic_6.extend(codes.into_iter().map(Into::into));
        self
    }

    pub fn with_range(mut self, low: i64, high: i64) -> Self {
        self.sic_range.push(SicRange::new(low, high));
        self
    }

    pub fn with_not<I, S>(mut self, codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sic_not.extend(codes.into_iter().map(Into::into));
        self
    }

    /// Evaluate against one business's primary code for a year and its SIC6 code.
    ///
    /// No primary code for the year means the business did not operate that
    /// year: no criterion applies, SIC6 included. Codes are trimmed once so
    /// every lookup sees the same value.
    pub fn matches(&self, sic: Option<&str>, sic6: Option<&str>) -> RowMatch {
        let Some(code) = sic.map(str::trim).filter(|c| !c.is_empty()) else {
            return RowMatch::default();
        };
        let sic6 = sic6.map(str::trim);

        let exact_match = self.sic_exclusive.contains(code)
            || sic6.is_some_and(|c| self.sic_6.contains(c));

        let (range_match, malformed) = self.range_match(code);

        // sic_not is an override, not a fourth criterion
        let excluded = self.sic_not.contains(code);

        RowMatch {
            matched: (exact_match || range_match) && !excluded,
            malformed,
        }
    }

    fn range_match(&self, code: &str) -> (bool, bool) {
        if self.sic_range.is_empty() {
            return (false, false);
        }

        match code.parse::<i64>() {
            Ok(code) => (self.sic_range.iter().any(|r| r.contains(code)), false),
            Err(_) => (false, true),
        }
    }

    fn validate(&self, category: &str) -> Result<(), ConfigurationError> {
        if let Some(range) = self.sic_range.iter().find(|r| r.low > r.high) {
            return Err(ConfigurationError::InvertedRange {
                category: category.to_string(),
                low: range.low,
                high: range.high,
            });
        }
        Ok(())
    }
}

// ============================================================================
// RULE EVALUATOR
// ============================================================================

/// Flags for one (category, year) pair, one per table row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    pub flags: Vec<bool>,
    pub faults: Vec<Fault>,
}

/// Evaluate one category rule over every row of the table for one year.
///
/// Reads only `SIC{year}` and `SIC6`; never touches other flags, so calls are
/// independent of each other. A year whose SIC column is missing from the
/// table yields a `Fault::MissingField` instead of flags.
pub fn evaluate(
    table: &RecordTable,
    category: &str,
    rule: &CategoryRule,
    year: &Year,
) -> Result<Evaluation, Fault> {
    if !table.has_sic_column(year) {
        return Err(Fault::MissingField {
            year: year.clone(),
            column: table.sic_column_name(year),
        });
    }

    let mut flags = Vec::with_capacity(table.len());
    let mut faults = Vec::new();

    for record in table.records() {
        let sic = record.sic(year);
        let result = rule.matches(sic, record.sic6());

        if result.malformed {
            faults.push(Fault::MalformedCode {
                duns_number: record.duns_number.clone(),
                category: category.to_string(),
                year: year.clone(),
                value: sic.unwrap_or_default().to_string(),
            });
        }

        flags.push(result.matched);
    }

    debug!(
        category,
        year = %year,
        matched = flags.iter().filter(|f| **f).count(),
        malformed = faults.len(),
        "evaluated category"
    );

    Ok(Evaluation { flags, faults })
}

// ============================================================================
// RULE CONFIGURATION
// ============================================================================

/// Ordered category name -> rule mapping, validated once at load time
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleConfig {
    categories: IndexMap<String, CategoryRule>,
}

impl RuleConfig {
    /// Load rules from JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read rules file: {:?}", path.as_ref()))?;

        let config = RuleConfig::from_json_str(&content)
            .with_context(|| format!("Invalid rules file: {:?}", path.as_ref()))?;

        Ok(config)
    }

    pub fn from_json_str(content: &str) -> Result<Self, ConfigurationError> {
        let config: RuleConfig = serde_json::from_str(content)
            .map_err(|e| ConfigurationError::MalformedDocument(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Create a config from (name, rule) pairs, keeping their order
    pub fn from_rules<I, S>(rules: I) -> Result<Self, ConfigurationError>
    where
        I: IntoIterator<Item = (S, CategoryRule)>,
        S: Into<String>,
    {
        let config = RuleConfig {
            categories: rules.into_iter().map(|(name, rule)| (name.into(), rule)).collect(),
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigurationError> {
        for (name, rule) in &self.categories {
            if name.trim().is_empty() {
                return Err(ConfigurationError::EmptyCategoryName);
            }
            rule.validate(name)?;
        }
        Ok(())
    }

    pub fn get(&self, category: &str) -> Option<&CategoryRule> {
        self.categories.get(category)
    }

    pub fn contains(&self, category: &str) -> bool {
        self.categories.contains_key(category)
    }

    /// Category names in document order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.categories.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CategoryRule)> {
        self.categories.iter().map(|(name, rule)| (name.as_str(), rule))
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}

// ============================================================================
// TESTS
// ============================================================================
