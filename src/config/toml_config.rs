use crate::core::engine::MergeMode;
use crate::domain::ports::ConfigProvider;
use crate::utils::error::{MergeError, Result};
use crate::utils::validation::Validate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    pub lookup: LookupConfig,
    pub output: OutputConfig,
    pub merge: Option<MergeConfig>,
    pub environment: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LookupConfig {
    pub endpoint: String,
    pub connect_timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeConfig {
    pub max_records: Option<usize>,
    pub mode: Option<String>,
}

impl TomlConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(MergeError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| MergeError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replaces `${VAR_NAME}` with the value from the environment. Unset
    /// variables are left as-is so validation can report them in context.
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").unwrap();

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn validate_config(&self) -> Result<()> {
        crate::utils::validation::validate_url("lookup.endpoint", &self.lookup.endpoint)?;
        crate::utils::validation::validate_path("output.path", &self.output.path)?;

        if let Some(timeout) = self.lookup.connect_timeout_seconds {
            crate::utils::validation::validate_range(
                "lookup.connect_timeout_seconds",
                timeout,
                1,
                600,
            )?;
        }

        if let Some(merge) = &self.merge {
            if let Some(max_records) = merge.max_records {
                crate::utils::validation::validate_positive_number(
                    "merge.max_records",
                    max_records,
                    1,
                )?;
            }
            if let Some(mode) = &merge.mode {
                self.parse_mode(mode)?;
            }
        }

        Ok(())
    }

    fn parse_mode(&self, mode: &str) -> Result<MergeMode> {
        match mode {
            "individual" => Ok(MergeMode::Individual),
            "bcc" => Ok(MergeMode::Bcc),
            other => Err(MergeError::InvalidConfigValueError {
                field: "merge.mode".to_string(),
                value: other.to_string(),
                reason: "Supported modes: individual, bcc".to_string(),
            }),
        }
    }

    pub fn merge_mode(&self) -> MergeMode {
        self.merge
            .as_ref()
            .and_then(|m| m.mode.as_deref())
            .and_then(|mode| self.parse_mode(mode).ok())
            .unwrap_or_default()
    }
}

impl ConfigProvider for TomlConfig {
    fn lookup_endpoint(&self) -> &str {
        &self.lookup.endpoint
    }

    fn output_path(&self) -> &str {
        &self.output.path
    }

    fn connect_timeout_secs(&self) -> u64 {
        self.lookup
            .connect_timeout_seconds
            .unwrap_or(crate::adapters::lookup::DEFAULT_CONNECT_TIMEOUT_SECS)
    }

    fn max_records(&self) -> usize {
        self.merge
            .as_ref()
            .and_then(|m| m.max_records)
            .unwrap_or(crate::core::engine::MAX_DRAFTS_PER_RUN)
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
