use crate::core::normalize::normalize;
use crate::domain::model::{DataQualityWarning, Field, Record, RecordSet};
use crate::domain::ports::RecordSource;
use crate::utils::error::{MergeError, Result};
use crate::utils::validation::validate_input_file;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

const MAX_FILE_SIZE_MB: u64 = 100;
const MAX_COLUMNS: usize = 100;
const MAX_ROWS: usize = 10_000;
const MAX_HEADER_LEN: usize = 100;

/// CSV-backed record source. Handles BOM sniffing (UTF-8 and UTF-16), a
/// Latin-1 fallback for files that are neither, header cleanup and
/// normalization, and the row/column/size caps that keep a bad export from
/// exhausting the process.
pub struct CsvRecordSource {
    max_rows: usize,
    max_columns: usize,
}

impl Default for CsvRecordSource {
    fn default() -> Self {
        Self::new()
    }
}

impl CsvRecordSource {
    pub fn new() -> Self {
        Self {
            max_rows: MAX_ROWS,
            max_columns: MAX_COLUMNS,
        }
    }

    /// Tightened caps, used by tests and small deployments.
    pub fn with_limits(max_rows: usize, max_columns: usize) -> Self {
        Self {
            max_rows,
            max_columns,
        }
    }

    fn parse(&self, text: &str) -> Result<RecordSet> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(text.as_bytes());

        let headers = reader
            .headers()
            .map_err(MergeError::CsvError)?
            .iter()
            .map(clean_header)
            .collect::<Vec<String>>();
        if headers.is_empty() || headers.iter().all(|h| h.is_empty()) {
            return Err(MergeError::ValidationError {
                message: "CSV file appears to have no headers".to_string(),
            });
        }

        let mut warnings = Vec::new();

        let headers = if headers.len() > self.max_columns {
            warnings.push(DataQualityWarning::ColumnLimitReached {
                limit: self.max_columns,
                total: headers.len(),
            });
            tracing::warn!(
                "CSV has {} columns; processing only the first {}",
                headers.len(),
                self.max_columns
            );
            headers[..self.max_columns].to_vec()
        } else {
            headers
        };

        let mut fields: Vec<Field> = Vec::with_capacity(headers.len());
        for header in &headers {
            if header.is_empty() {
                return Err(MergeError::ValidationError {
                    message: "Empty field name found in CSV headers".to_string(),
                });
            }
            if header.chars().count() > MAX_HEADER_LEN {
                return Err(MergeError::ValidationError {
                    message: format!(
                        "Field name too long: {}...",
                        header.chars().take(50).collect::<String>()
                    ),
                });
            }
            let normalized_key = normalize(header);
            if normalized_key.is_empty() {
                return Err(MergeError::ValidationError {
                    message: format!("Field name '{}' normalizes to nothing", header),
                });
            }
            // Duplicate normalized keys: the later column overwrites the
            // earlier one in each record. Explicit policy, reported per
            // collision.
            if fields.iter().any(|f| f.normalized_key == normalized_key) {
                tracing::warn!(
                    "Duplicate field name: '{}' also normalizes to '{}'",
                    header,
                    normalized_key
                );
                warnings.push(DataQualityWarning::DuplicateFieldName {
                    original_name: header.clone(),
                    normalized_key: normalized_key.clone(),
                });
            }
            fields.push(Field {
                original_name: header.clone(),
                normalized_key,
            });
        }

        let mut records = Vec::new();
        for (row_index, row) in reader.records().enumerate() {
            if row_index >= self.max_rows {
                warnings.push(DataQualityWarning::RowLimitReached {
                    limit: self.max_rows,
                });
                tracing::warn!(
                    "CSV has more than {} rows; processing stopped there",
                    self.max_rows
                );
                break;
            }

            let row = row.map_err(MergeError::CsvError)?;
            let mut record = Record::new();
            for (index, field) in fields.iter().enumerate() {
                let value = row.get(index).unwrap_or("").trim();
                record.insert(field.normalized_key.clone(), value);
            }
            if !record.is_blank() {
                records.push(record);
            }
        }

        tracing::info!(
            "Loaded {} record(s) across {} field(s)",
            records.len(),
            fields.len()
        );

        Ok(RecordSet {
            fields,
            records,
            warnings,
        })
    }
}

#[async_trait]
impl RecordSource for CsvRecordSource {
    async fn load(&self, path: &Path) -> Result<RecordSet> {
        validate_input_file("csv_path", path, &["csv"], MAX_FILE_SIZE_MB)?;
        let bytes = std::fs::read(path)?;
        let (text, encoding) = decode_bytes(bytes);
        tracing::debug!("Decoded {} as {}", path.display(), encoding);
        self.parse(&text)
    }
}

fn clean_header(header: &str) -> String {
    header
        .trim_matches(|c| c == '\u{feff}' || c == '\u{fffe}' || c == '\0')
        .trim()
        .to_string()
}

/// BOM-aware decode: UTF-8 BOM stripped, UTF-16 LE/BE decoded, anything that
/// is not valid UTF-8 falls back to a Latin-1 byte mapping.
fn decode_bytes(bytes: Vec<u8>) -> (String, &'static str) {
    if bytes.starts_with(&[0xEF, 0xBB, 0xBF]) {
        return (
            String::from_utf8_lossy(&bytes[3..]).into_owned(),
            "utf-8 (BOM)",
        );
    }
    if bytes.starts_with(&[0xFF, 0xFE]) {
        let units: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .collect();
        return (String::from_utf16_lossy(&units), "utf-16le");
    }
    if bytes.starts_with(&[0xFE, 0xFF]) {
        let units: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return (String::from_utf16_lossy(&units), "utf-16be");
    }
    match String::from_utf8(bytes) {
        Ok(text) => (text, "utf-8"),
        Err(e) => (
            e.into_bytes().iter().map(|b| *b as char).collect(),
            "latin-1 fallback",
        ),
    }
}

/// Lists the CSV files in a directory as (file name, full path) pairs, sorted
/// by name. Missing or unreadable directories yield an empty list with a
/// warning, not an error.
pub fn list_csv_files(dir: &Path) -> Vec<(String, PathBuf)> {
    list_files_with_extension(dir, "csv")
}

pub(crate) fn list_files_with_extension(dir: &Path, extension: &str) -> Vec<(String, PathBuf)> {
    let mut files = Vec::new();

    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!("Cannot list directory {}: {}", dir.display(), e);
            return files;
        }
    };

    for entry in entries.flatten() {
        let path = entry.path();
        let matches = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case(extension));
        if matches && path.is_file() {
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                files.push((name.to_string(), path.clone()));
            }
        }
    }

    files.sort_by(|a, b| a.0.cmp(&b.0));
    files
}
