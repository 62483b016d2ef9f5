use crate::adapters::csv_source::list_files_with_extension;
use crate::domain::model::{Placeholder, Template};
use crate::domain::ports::TemplateInspector;
use crate::utils::error::Result;
use crate::utils::validation::validate_input_file;
use async_trait::async_trait;
use regex::Regex;
use std::path::{Path, PathBuf};

const MAX_TEMPLATE_FILE_MB: u64 = 10;
const MAX_SCANNED_CHARS: usize = 1_000_000;
const MAX_PLACEHOLDER_LEN: usize = 100;

/// Reads draft templates from plain text files. The first `Subject:` line
/// becomes the draft subject; everything after it is the body. Placeholders
/// are `{{name}}` tokens; names survive embedded markup and whitespace.
pub struct FileTemplateInspector {
    token_re: Regex,
    markup_re: Regex,
}

impl Default for FileTemplateInspector {
    fn default() -> Self {
        Self::new()
    }
}

impl FileTemplateInspector {
    pub fn new() -> Self {
        Self {
            token_re: Regex::new(r"\{\{([^{}]+)\}\}").unwrap(),
            markup_re: Regex::new(r"<[^>]+>").unwrap(),
        }
    }

    fn extract_placeholders(&self, text: &str) -> Vec<Placeholder> {
        let scanned: String = text.chars().take(MAX_SCANNED_CHARS).collect();
        if scanned.len() < text.len() {
            tracing::warn!(
                "Template text longer than {} characters; placeholder scan truncated",
                MAX_SCANNED_CHARS
            );
        }

        let mut placeholders: Vec<Placeholder> = Vec::new();
        for capture in self.token_re.captures_iter(&scanned) {
            let raw_name = capture[1].to_string();
            let cleaned_name = self
                .markup_re
                .replace_all(&raw_name, "")
                .trim()
                .to_string();
            if cleaned_name.is_empty() {
                tracing::warn!("Skipping empty placeholder '{{{{{}}}}}'", raw_name);
                continue;
            }
            if cleaned_name.chars().count() >= MAX_PLACEHOLDER_LEN {
                tracing::warn!(
                    "Skipping over-long placeholder '{}...'",
                    cleaned_name.chars().take(30).collect::<String>()
                );
                continue;
            }
            // First occurrence wins; later duplicates are the same placeholder.
            if placeholders.iter().all(|p| p.cleaned_name != cleaned_name) {
                placeholders.push(Placeholder {
                    raw_name,
                    cleaned_name,
                });
            }
        }
        placeholders
    }
}

#[async_trait]
impl TemplateInspector for FileTemplateInspector {
    async fn inspect(&self, path: &Path) -> Result<Template> {
        validate_input_file(
            "template_path",
            path,
            &["txt", "html", "msg"],
            MAX_TEMPLATE_FILE_MB,
        )?;
        let content = std::fs::read_to_string(path)?;

        let (subject, body) = split_subject(&content);
        let placeholders = self.extract_placeholders(&format!("{} {}", subject, body));

        tracing::info!(
            "Template {}: {} placeholder(s)",
            path.display(),
            placeholders.len()
        );

        Ok(Template {
            subject,
            body,
            placeholders,
        })
    }
}

/// Splits template text into subject and body. The subject is the first line
/// starting with `Subject:` (case-insensitive); without one the subject is
/// empty and the whole text is the body.
fn split_subject(content: &str) -> (String, String) {
    let mut lines = content.lines();
    if let Some(first) = lines.next() {
        let trimmed = first.trim_start();
        if trimmed.to_ascii_lowercase().starts_with("subject:") {
            let subject = trimmed["subject:".len()..].trim().to_string();
            let body = lines.collect::<Vec<_>>().join("\n");
            return (subject, body.trim_start_matches('\n').to_string());
        }
    }
    (String::new(), content.to_string())
}

/// Lists the template files in a directory as (file name, full path) pairs.
pub fn list_template_files(dir: &Path) -> Vec<(String, PathBuf)> {
    let mut files = list_files_with_extension(dir, "txt");
    files.extend(list_files_with_extension(dir, "html"));
    files.extend(list_files_with_extension(dir, "msg"));
    files.sort_by(|a, b| a.0.cmp(&b.0));
    files
}
