use crate::core::matcher::is_email_placeholder;
use crate::core::transform::TransformAssignments;
use crate::domain::model::{DataQualityWarning, FieldMapping, Record, RenderedDraft, Template};
use regex::Regex;

/// Replacement values are capped at this many characters; longer values are
/// truncated with an ellipsis appended.
const VALUE_CAP: usize = 1000;

/// Renders template subject/body text for one recipient (or one
/// representative record in BCC mode), substituting `{{...}}` tokens from a
/// field mapping and reporting whatever could not be resolved. Rendering
/// always returns a result; unresolved tokens are warnings, not errors.
pub struct EmailAssembler {
    token_re: Regex,
    markup_re: Regex,
    email_re: Regex,
}

impl Default for EmailAssembler {
    fn default() -> Self {
        Self::new()
    }
}

/// One ready-to-substitute value: the lowercased placeholder name it answers
/// for, and the sanitized text to splice in.
struct Substitution {
    needle_lower: String,
    value: String,
}

impl EmailAssembler {
    pub fn new() -> Self {
        Self {
            token_re: Regex::new(r"\{\{([^{}]+)\}\}").unwrap(),
            markup_re: Regex::new(r"<[^>]+>").unwrap(),
            email_re: Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").unwrap(),
        }
    }

    pub fn is_valid_email(&self, address: &str) -> bool {
        self.email_re.is_match(address.trim())
    }

    /// Single-recipient mode: produces a "to"-addressed draft. An invalid
    /// recipient address leaves the `email` token unsubstituted and the "to"
    /// field unset.
    pub fn render(
        &self,
        template: &Template,
        record: &Record,
        mapping: &FieldMapping,
        transforms: &TransformAssignments,
        recipient_email: &str,
    ) -> RenderedDraft {
        let mut warnings = Vec::new();
        let mut substitutions = self.field_substitutions(record, mapping, transforms, &mut warnings);

        let recipient = recipient_email.trim();
        let to = if self.is_valid_email(recipient) {
            substitutions.push(Substitution {
                needle_lower: "email".to_string(),
                value: sanitize_value(recipient),
            });
            Some(recipient.to_string())
        } else {
            None
        };

        self.finish(template, substitutions, to, Vec::new(), warnings)
    }

    /// Bulk mode: substitutes from a single representative record and blind-
    /// copies every address that passes validation. Failing addresses are
    /// excluded and counted, not enumerated.
    pub fn render_bcc(
        &self,
        template: &Template,
        representative: &Record,
        mapping: &FieldMapping,
        transforms: &TransformAssignments,
        recipients: &[String],
    ) -> RenderedDraft {
        let mut warnings = Vec::new();
        let mut substitutions =
            self.field_substitutions(representative, mapping, transforms, &mut warnings);

        let bcc: Vec<String> = recipients
            .iter()
            .map(|addr| addr.trim().to_string())
            .filter(|addr| self.is_valid_email(addr))
            .collect();
        let excluded = recipients.len() - bcc.len();
        if excluded > 0 {
            warnings.push(DataQualityWarning::InvalidRecipientsExcluded { count: excluded });
        }

        // The representative record's own address feeds any {{email}} token.
        if let Some(representative_email) = representative.get("email") {
            if self.is_valid_email(representative_email) {
                substitutions.push(Substitution {
                    needle_lower: "email".to_string(),
                    value: sanitize_value(representative_email.trim()),
                });
            }
        }

        self.finish(template, substitutions, None, bcc, warnings)
    }

    /// Builds substitution values from the record in mapping order. A key
    /// absent from the record contributes nothing, leaving its token to be
    /// reported as unresolved.
    fn field_substitutions(
        &self,
        record: &Record,
        mapping: &FieldMapping,
        transforms: &TransformAssignments,
        warnings: &mut Vec<DataQualityWarning>,
    ) -> Vec<Substitution> {
        let mut substitutions = Vec::new();

        for entry in mapping.iter() {
            if is_email_placeholder(&entry.placeholder) {
                continue;
            }
            let Some(key) = entry.field.as_deref() else {
                continue;
            };
            let Some(raw) = record.get(key) else {
                continue;
            };

            let output = transforms.get(key).apply(raw);
            if let Some(warning) = output.warning {
                warnings.push(warning);
            }

            let needle_lower = entry.placeholder.to_lowercase();
            if needle_lower.is_empty() {
                continue;
            }
            substitutions.push(Substitution {
                needle_lower,
                value: sanitize_value(&output.value),
            });
        }

        substitutions
    }

    fn finish(
        &self,
        template: &Template,
        substitutions: Vec<Substitution>,
        to: Option<String>,
        bcc: Vec<String>,
        mut warnings: Vec<DataQualityWarning>,
    ) -> RenderedDraft {
        let subject = self.substitute(&template.subject, &substitutions);
        let body = self.substitute(&template.body, &substitutions);

        let mut unresolved = self.unresolved_names(&subject);
        for name in self.unresolved_names(&body) {
            if !unresolved.contains(&name) {
                unresolved.push(name);
            }
        }
        if !unresolved.is_empty() {
            tracing::warn!("Unreplaced variables found: {}", unresolved.join(", "));
            warnings.push(DataQualityWarning::UnresolvedTokens {
                names: unresolved.clone(),
            });
        }

        RenderedDraft {
            subject,
            body,
            to,
            bcc,
            unresolved,
            warnings,
        }
    }

    /// Replaces every `{{...}}` token whose markup-stripped text contains a
    /// substitution's placeholder name (case-insensitively). First
    /// substitution in mapping order wins; templates authored with rich-text
    /// decoration inside the braces still match.
    fn substitute(&self, text: &str, substitutions: &[Substitution]) -> String {
        if substitutions.is_empty() {
            return text.to_string();
        }

        self.token_re
            .replace_all(text, |caps: &regex::Captures| {
                let cleaned = self.clean_token_text(&caps[1]).to_lowercase();
                substitutions
                    .iter()
                    .find(|sub| cleaned.contains(&sub.needle_lower))
                    .map(|sub| sub.value.clone())
                    .unwrap_or_else(|| caps[0].to_string())
            })
            .into_owned()
    }

    /// Remaining token names in a rendered text, markup-stripped and trimmed,
    /// deduplicated in order of appearance.
    fn unresolved_names(&self, text: &str) -> Vec<String> {
        let mut names = Vec::new();
        for caps in self.token_re.captures_iter(text) {
            let cleaned = self.clean_token_text(&caps[1]);
            if !cleaned.is_empty() && !names.contains(&cleaned) {
                names.push(cleaned);
            }
        }
        names
    }

    fn clean_token_text(&self, raw: &str) -> String {
        self.markup_re.replace_all(raw, "").trim().to_string()
    }
}

/// Strips control characters and caps length before a value is spliced into
/// subject/body text.
fn sanitize_value(value: &str) -> String {
    let mut capped: String = value.chars().take(VALUE_CAP).collect();
    if value.chars().count() > VALUE_CAP {
        capped.push_str("...");
    }
    capped.chars().filter(|c| !c.is_control()).collect()
}
