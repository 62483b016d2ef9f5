pub mod toml_config;

pub use toml_config::TomlConfig;

#[cfg(feature = "cli")]
use crate::adapters::lookup::DEFAULT_CONNECT_TIMEOUT_SECS;
#[cfg(feature = "cli")]
use crate::core::engine::{MergeMode, MAX_DRAFTS_PER_RUN};
#[cfg(feature = "cli")]
use crate::core::transform::Transform;
#[cfg(feature = "cli")]
use crate::domain::ports::ConfigProvider;
#[cfg(feature = "cli")]
use crate::utils::error::{MergeError, Result};
#[cfg(feature = "cli")]
use clap::Parser;

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Parser)]
#[command(name = "mail-merge")]
#[command(about = "Generates draft emails by merging recipient data with a template")]
pub struct CliConfig {
    /// Recipient data file (.csv)
    #[arg(long)]
    pub csv: String,

    /// Draft template file (.txt, .html or .msg)
    #[arg(long)]
    pub template: String,

    /// Directory lookup endpoint
    #[arg(long)]
    pub lookup_endpoint: String,

    /// Directory the drafts are written to
    #[arg(long, default_value = "./drafts")]
    pub output_path: String,

    /// Send one draft blind-copied to all recipients instead of one per
    /// recipient
    #[arg(long)]
    pub bcc: bool,

    /// Identifier field override (normalized key); auto-detected when omitted
    #[arg(long)]
    pub id_field: Option<String>,

    /// Per-field transform as field=name, e.g. first_name=capitalize
    #[arg(long = "transform", value_delimiter = ',')]
    pub transforms: Vec<String>,

    #[arg(long, default_value_t = DEFAULT_CONNECT_TIMEOUT_SECS)]
    pub connect_timeout_secs: u64,

    #[arg(long, default_value_t = MAX_DRAFTS_PER_RUN)]
    pub max_records: usize,

    /// Probe the lookup endpoint before running the merge
    #[arg(long)]
    pub test_connection: bool,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,
}

#[cfg(feature = "cli")]
impl CliConfig {
    pub fn merge_mode(&self) -> MergeMode {
        if self.bcc {
            MergeMode::Bcc
        } else {
            MergeMode::Individual
        }
    }

    /// Parses the `field=name` transform arguments.
    pub fn parsed_transforms(&self) -> Result<Vec<(String, Transform)>> {
        let mut parsed = Vec::new();
        for raw in &self.transforms {
            let (field, name) =
                raw.split_once('=')
                    .ok_or_else(|| MergeError::InvalidConfigValueError {
                        field: "transform".to_string(),
                        value: raw.clone(),
                        reason: "Expected field=name, e.g. first_name=capitalize".to_string(),
                    })?;
            let transform =
                name.trim()
                    .parse::<Transform>()
                    .map_err(|reason| MergeError::InvalidConfigValueError {
                        field: "transform".to_string(),
                        value: raw.clone(),
                        reason,
                    })?;
            parsed.push((field.trim().to_string(), transform));
        }
        Ok(parsed)
    }

    pub fn validate_config(&self) -> Result<()> {
        crate::utils::validation::validate_url("lookup_endpoint", &self.lookup_endpoint)?;
        crate::utils::validation::validate_path("csv", &self.csv)?;
        crate::utils::validation::validate_path("template", &self.template)?;
        crate::utils::validation::validate_path("output_path", &self.output_path)?;
        crate::utils::validation::validate_range(
            "connect_timeout_secs",
            self.connect_timeout_secs,
            1,
            600,
        )?;
        crate::utils::validation::validate_positive_number("max_records", self.max_records, 1)?;
        self.parsed_transforms()?;
        Ok(())
    }
}

#[cfg(feature = "cli")]
impl ConfigProvider for CliConfig {
    fn lookup_endpoint(&self) -> &str {
        &self.lookup_endpoint
    }

    fn output_path(&self) -> &str {
        &self.output_path
    }

    fn connect_timeout_secs(&self) -> u64 {
        self.connect_timeout_secs
    }

    fn max_records(&self) -> usize {
        self.max_records
    }
}
