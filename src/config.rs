// ⚙️ Run Configuration - where the NETS extracts live and which years to build
//
// Layout (relative to the project directory):
//   config/category_config.json
//   data/raw/NETS2014_AddressSpecial00to14_sample.txt
//   data/raw/NETS2014_SIC_sample.txt
//   data/processed/PI_NETS_{years}.csv

use crate::errors::ConfigurationError;
use crate::output::output_file_name;
use crate::records::Year;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_ADDRESS_FILE: &str = "raw/NETS2014_AddressSpecial00to14_sample.txt";
pub const DEFAULT_SIC_FILE: &str = "raw/NETS2014_SIC_sample.txt";
pub const DEFAULT_CATEGORY_CONFIG: &str = "config/category_config.json";
pub const DEFAULT_YEARS: [&str; 2] = ["13", "14"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WrangleConfig {
    /// Category rule document
    pub category_config: PathBuf,

    pub address_file: PathBuf,
    pub sic_file: PathBuf,
    pub output_dir: PathBuf,

    /// Requested years, in output order
    pub years: Vec<Year>,
}

impl WrangleConfig {
    /// Default layout under a project directory
    pub fn for_project(project_dir: &Path) -> Self {
        let data_dir = project_dir.join("data");

        WrangleConfig {
            category_config: project_dir.join(DEFAULT_CATEGORY_CONFIG),
            address_file: data_dir.join(DEFAULT_ADDRESS_FILE),
            sic_file: data_dir.join(DEFAULT_SIC_FILE),
            output_dir: data_dir.join("processed"),
            years: DEFAULT_YEARS
                .iter()
                .filter_map(|label| Year::new(*label).ok())
                .collect(),
        }
    }

    /// Re-point raw and processed paths at another data directory
    pub fn with_data_dir(mut self, data_dir: &Path) -> Self {
        self.address_file = data_dir.join(DEFAULT_ADDRESS_FILE);
        self.sic_file = data_dir.join(DEFAULT_SIC_FILE);
        self.output_dir = data_dir.join("processed");
        self
    }

    pub fn with_years(mut self, years: Vec<Year>) -> Result<Self, ConfigurationError> {
        Year::check_unique(&years)?;
        self.years = years;
        Ok(self)
    }

    pub fn output_path(&self) -> PathBuf {
        self.output_dir.join(output_file_name(&self.years))
    }
}

// ============================================================================
// TESTS
// ============================================================================
