// 🔄 NETS Wrangling - raw extracts → classified CSV
//
// rules → address table + SIC table → inner join → classify → write

use crate::classifier::Classifier;
use crate::config::WrangleConfig;
use crate::data_quality::ClassificationReport;
use crate::output::{digest, write_csv_file};
use crate::parser::{join_tables, read_raw_table, ColumnSelector};
use crate::records::RecordTable;
use crate::rules::RuleConfig;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Clone, Serialize)]
pub struct WrangleSummary {
    pub output_path: PathBuf,
    pub rows: usize,
    pub skipped_lines: usize,
    pub dropped_rows: usize,
    pub digest: String,
    pub finished_at: DateTime<Utc>,
    pub report: ClassificationReport,
}

impl WrangleSummary {
    pub fn summary(&self) -> String {
        format!(
            "{} rows → {} | {}",
            self.rows,
            self.output_path.display(),
            self.report.summary()
        )
    }
}

pub fn wrangle_nets(config: &WrangleConfig) -> Result<WrangleSummary> {
    info!("making final data set from raw data");

    let rules = RuleConfig::from_file(&config.category_config)?;
    let classifier = Classifier::new(&rules);
    info!(categories = rules.len(), "Loaded category rules");

    let address = read_raw_table(&config.address_file, &ColumnSelector::address(&config.years)?)?;
    let sic = read_raw_table(&config.sic_file, &ColumnSelector::sic(&config.years)?)?;

    // Some businesses have an address but no SIC; keep only rows with both
    let joined = join_tables(address, sic)?;
    let (skipped_lines, dropped_rows) = (joined.skipped_lines, joined.dropped_rows);

    let table = RecordTable::from_rows(joined.header, joined.rows, &config.years)
        .context("Joined NETS table is malformed")?;

    let classified = classifier
        .classify(table, &config.years)
        .context("Classification aborted")?;

    let output_path = config.output_path();
    write_csv_file(&classified, &output_path)?;
    let digest = digest(&classified)?;

    info!(
        path = %output_path.display(),
        digest = %digest,
        "NETS wrangling complete"
    );

    Ok(WrangleSummary {
        output_path,
        rows: classified.len(),
        skipped_lines,
        dropped_rows,
        digest,
        finished_at: Utc::now(),
        report: classified.report().clone(),
    })
}

// ============================================================================
// TESTS
// ============================================================================
