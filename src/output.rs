// 💾 Output - classified table → CSV
// Original columns first (original order), then one 0/1 column per flag.

use crate::classifier::ClassifiedTable;
use crate::records::Year;
use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

/// PI_NETS_13-14.csv for several years, PI_NETS_14.csv for one
pub fn output_file_name(years: &[Year]) -> String {
    match years {
        [] => "PI_NETS.csv".to_string(),
        [only] => format!("PI_NETS_{}.csv", only),
        [first, .., last] => format!("PI_NETS_{}-{}.csv", first, last),
    }
}

/// Write the classified table as comma-delimited CSV
pub fn write_csv<W: Write>(classified: &ClassifiedTable, writer: W) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);

    csv_writer
        .write_record(classified.header())
        .context("Failed to write CSV header")?;

    for row in 0..classified.len() {
        let values = classified.table().row_values(row);
        let flags = classified.row_flags(row);

        let record = values
            .into_iter()
            .map(|v| v.unwrap_or_default().to_string())
            .chain(flags.into_iter().map(|f| f.to_string()));

        csv_writer
            .write_record(record)
            .with_context(|| format!("Failed to write CSV row {}", row))?;
    }

    csv_writer.flush().context("Failed to flush CSV output")?;
    Ok(())
}

/// Write to a file, creating parent directories as needed
pub fn write_csv_file(classified: &ClassifiedTable, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    let file = File::create(path)
        .with_context(|| format!("Failed to create file: {}", path.display()))?;

    write_csv(classified, file)
}

/// SHA-256 of the serialised CSV. Identical inputs give identical digests.
pub fn digest(classified: &ClassifiedTable) -> Result<String> {
    let mut buffer = Vec::new();
    write_csv(classified, &mut buffer)?;

    let mut hasher = Sha256::new();
    hasher.update(&buffer);
    Ok(format!("{:x}", hasher.finalize()))
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregates::AggregateRule;
    use crate::classifier::Classifier;
    use crate::records::{EstablishmentRecord, RecordTable};
    use crate::rules::{CategoryRule, RuleConfig};

    fn y(label: &str) -> Year {
        Year::new(label).unwrap()
    }

    fn classified() -> ClassifiedTable {
        let year = y("14");
        let rules = RuleConfig::from_rules([
            ("BAR", CategoryRule::default().with_exclusive(["5813"])),
            ("LIQ", CategoryRule::default().with_exclusive(["5921"])),
        ])
        .unwrap();
        let table = RecordTable::from_records(
            &["DunsNumber", "City14", "SIC6", "SIC14"],
            vec![
                EstablishmentRecord::new("001")
                    .with_attribute(&year, "City", "Springfield")
                    .with_sic(&year, "5813"),
                EstablishmentRecord::new("002").with_sic6("592101").with_sic(&year, "5921"),
            ],
            &[year.clone()],
        )
        .unwrap();

        Classifier::with_aggregates(&rules, vec![AggregateRule::new("ALC", &["BAR", "LIQ"])])
            .classify(table, &[year])
            .unwrap()
    }

    #[test]
    fn test_output_file_name() {
        assert_eq!(output_file_name(&[y("13"), y("14")]), "PI_NETS_13-14.csv");
        assert_eq!(output_file_name(&[y("11"), y("12"), y("14")]), "PI_NETS_11-14.csv");
        assert_eq!(output_file_name(&[y("14")]), "PI_NETS_14.csv");
    }

    #[test]
    fn test_write_csv() {
        let mut buffer = Vec::new();
        write_csv(&classified(), &mut buffer).unwrap();

        let text = String::from_utf8(buffer).unwrap();
        assert_eq!(
            text,
            "DunsNumber,City14,SIC6,SIC14,BAR_14,LIQ_14,ALC_14\n\
             001,Springfield,,5813,1,0,1\n\
             002,,592101,5921,0,1,1\n"
        );
    }

    #[test]
    fn test_write_csv_file_creates_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("processed").join("PI_NETS_14.csv");

        write_csv_file(&classified(), &path).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 3);
    }

    #[test]
    fn test_digest_is_stable() {
        let first = digest(&classified()).unwrap();
        let second = digest(&classified()).unwrap();

        assert_eq!(first, second);
        assert_eq!(first.len(), 64);
    }
}
