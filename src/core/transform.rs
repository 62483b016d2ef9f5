use crate::domain::model::DataQualityWarning;
use serde::{Deserialize, Serialize};

const CAPITALIZE_INPUT_CAP: usize = 500;
const CURRENCY_INPUT_CAP: usize = 50;
const CURRENCY_LIMIT: f64 = 999_999_999.99;

/// The closed set of per-field value transforms. Dispatch is through this
/// enum; the set is fixed, so no dynamic lookup by display string.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transform {
    #[default]
    DoNothing,
    Capitalize,
    Currency,
    CurrencyWithSymbol,
}

/// A transformed value plus any quality condition hit while producing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformOutput {
    pub value: String,
    pub warning: Option<DataQualityWarning>,
}

impl TransformOutput {
    fn clean(value: String) -> Self {
        Self {
            value,
            warning: None,
        }
    }
}

impl Transform {
    pub fn is_identity(&self) -> bool {
        matches!(self, Transform::DoNothing)
    }

    pub fn apply(&self, value: &str) -> TransformOutput {
        match self {
            Transform::DoNothing => TransformOutput::clean(value.trim().to_string()),
            Transform::Capitalize => TransformOutput::clean(capitalize(value)),
            Transform::Currency => currency(value, false),
            Transform::CurrencyWithSymbol => currency(value, true),
        }
    }
}

impl std::fmt::Display for Transform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Transform::DoNothing => "do_nothing",
            Transform::Capitalize => "capitalize",
            Transform::Currency => "currency",
            Transform::CurrencyWithSymbol => "currency_with_symbol",
        };
        f.write_str(name)
    }
}

impl std::str::FromStr for Transform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "do_nothing" => Ok(Transform::DoNothing),
            "capitalize" => Ok(Transform::Capitalize),
            "currency" => Ok(Transform::Currency),
            "currency_with_symbol" => Ok(Transform::CurrencyWithSymbol),
            other => Err(format!(
                "unknown transform '{}' (expected do_nothing, capitalize, currency or currency_with_symbol)",
                other
            )),
        }
    }
}

/// Ordered assignment of transforms to normalized field keys. Keys without an
/// entry get the identity transform. The identifier-field rule (no
/// non-identity transform on the id field) is enforced by the owning session,
/// which knows which field is the identifier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformAssignments {
    entries: Vec<(String, Transform)>,
}

impl TransformAssignments {
    pub fn set(&mut self, key: impl Into<String>, transform: Transform) {
        let key = key.into();
        if let Some(slot) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = transform;
        } else {
            self.entries.push((key, transform));
        }
    }

    pub fn get(&self, key: &str) -> Transform {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, t)| *t)
            .unwrap_or_default()
    }

    pub fn remove(&mut self, key: &str) {
        self.entries.retain(|(k, _)| k != key);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Transform)> {
        self.entries.iter().map(|(k, t)| (k.as_str(), *t))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Title-cases each whitespace-separated word after stripping punctuation.
/// Over-long values are truncated before processing.
fn capitalize(value: &str) -> String {
    if value.trim().is_empty() {
        return value.to_string();
    }

    let capped: String = value.chars().take(CAPITALIZE_INPUT_CAP).collect();
    let stripped: String = capped
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || c.is_whitespace() || *c == '-')
        .collect();

    stripped
        .split_whitespace()
        .map(capitalize_word)
        .collect::<Vec<_>>()
        .join(" ")
}

fn capitalize_word(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(|c| c.to_lowercase()))
            .collect(),
        None => String::new(),
    }
}

/// Formats a value as a decimal amount with exactly two places, clamped to
/// the representable range. Empty or unparseable input defaults to zero and
/// reports the condition as a warning.
fn currency(value: &str, with_symbol: bool) -> TransformOutput {
    let prefix = if with_symbol { "$" } else { "" };

    let capped: String = value.trim().chars().take(CURRENCY_INPUT_CAP).collect();
    let cleaned: String = capped
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();

    let parsed = if cleaned.is_empty() {
        None
    } else {
        cleaned.parse::<f64>().ok()
    };

    match parsed {
        Some(number) => {
            let clamped = number.clamp(-CURRENCY_LIMIT, CURRENCY_LIMIT);
            TransformOutput::clean(format!("{}{:.2}", prefix, clamped))
        }
        None => TransformOutput {
            value: format!("{}0.00", prefix),
            warning: Some(DataQualityWarning::CurrencyParseDefaulted {
                value: value.to_string(),
            }),
        },
    }
}
