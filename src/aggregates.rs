// ➕ Aggregate Categories - second-tier flags derived from first-tier flags
//
// ALC = BAR OR LIQ
// NGT = BAR OR EAT OR ART
//
// Aggregates are read-only consumers of the first-tier flags for the same
// year and run only once those are complete.

use crate::classifier::FlagKey;
use crate::errors::ConfigurationError;
use crate::records::Year;
use crate::rules::RuleConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateRule {
    pub name: String,

    /// First-tier categories OR-ed together
    pub sources: Vec<String>,
}

impl AggregateRule {
    pub fn new<S: Into<String>>(name: S, sources: &[&str]) -> Self {
        AggregateRule {
            name: name.into(),
            sources: sources.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Fixed aggregate set used for the pedestrian-injury NETS extract
    pub fn standard() -> Vec<AggregateRule> {
        vec![
            AggregateRule::new("ALC", &["BAR", "LIQ"]),
            AggregateRule::new("NGT", &["BAR", "EAT", "ART"]),
        ]
    }

    /// Every source must be a configured first-tier category
    pub fn check_sources(&self, rules: &RuleConfig) -> Result<(), ConfigurationError> {
        match self.sources.iter().find(|s| !rules.contains(s)) {
            Some(missing) => Err(ConfigurationError::UnknownAggregateSource {
                aggregate: self.name.clone(),
                category: missing.clone(),
            }),
            None => Ok(()),
        }
    }

    /// OR of the source flags for one year. A source with no column counts as all zeros.
    pub fn derive(&self, flags: &BTreeMap<FlagKey, Vec<bool>>, year: &Year, rows: usize) -> Vec<bool> {
        let sources: Vec<&Vec<bool>> = self
            .sources
            .iter()
            .filter_map(|source| flags.get(&FlagKey::new(source.as_str(), year.clone())))
            .collect();

        (0..rows)
            .map(|row| {
                sources
                    .iter()
                    .any(|column| column.get(row).copied().unwrap_or(false))
            })
            .collect()
    }
}

/// Build every aggregate column for one year from the completed first-tier flags
pub fn build_aggregates(
    aggregates: &[AggregateRule],
    flags: &BTreeMap<FlagKey, Vec<bool>>,
    year: &Year,
    rows: usize,
) -> Vec<(FlagKey, Vec<bool>)> {
    aggregates
        .iter()
        .map(|aggregate| {
            (
                FlagKey::new(aggregate.name.as_str(), year.clone()),
                aggregate.derive(flags, year, rows),
            )
        })
        .collect()
}

// ============================================================================
// TESTS
// ============================================================================
