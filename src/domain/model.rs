use serde::{Deserialize, Serialize};

/// A single named attribute of a data record. `normalized_key` is derived from
/// `original_name` by `core::normalize`; two fields with the same key are the
/// same field for matching purposes regardless of casing or punctuation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub original_name: String,
    pub normalized_key: String,
}

/// One row of recipient data: an ordered mapping from normalized field key to
/// string value. Keys are unique; on a duplicate insert the last write wins
/// and the collision is surfaced as a [`DataQualityWarning`] by the producer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    entries: Vec<(String, String)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a value under `key`, replacing any existing entry.
    /// Returns true when an existing entry was overwritten.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> bool {
        let key = key.into();
        let value = value.into();
        if let Some(slot) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = value;
            true
        } else {
            self.entries.push((key, value));
            false
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True when every value is blank; such rows are dropped by record sources.
    pub fn is_blank(&self) -> bool {
        self.entries.iter().all(|(_, v)| v.trim().is_empty())
    }
}

impl FromIterator<(String, String)> for Record {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        let mut record = Record::new();
        for (key, value) in iter {
            record.insert(key, value);
        }
        record
    }
}

/// A token extracted from a template, identified by the text between the
/// `{{` / `}}` markers. `cleaned_name` has embedded markup stripped and
/// surrounding whitespace trimmed; placeholders with equal cleaned names are
/// the same placeholder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placeholder {
    pub raw_name: String,
    pub cleaned_name: String,
}

/// The resolved correspondence between template placeholders and record
/// fields. Ordered by first appearance in the template; the reserved `email`
/// placeholder never appears here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMapping {
    entries: Vec<MappingEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingEntry {
    pub placeholder: String,
    pub field: Option<String>,
}

impl FieldMapping {
    pub fn push(&mut self, placeholder: impl Into<String>, field: Option<String>) {
        self.entries.push(MappingEntry {
            placeholder: placeholder.into(),
            field,
        });
    }

    /// Outer Option: is the placeholder known at all; inner: is it matched.
    pub fn get(&self, placeholder: &str) -> Option<Option<&str>> {
        self.entries
            .iter()
            .find(|e| e.placeholder == placeholder)
            .map(|e| e.field.as_deref())
    }

    pub fn iter(&self) -> impl Iterator<Item = &MappingEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Normalized keys referenced by at least one placeholder.
    pub fn matched_keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().filter_map(|e| e.field.as_deref())
    }
}

/// Recoverable data-quality conditions. These are reported as values, never
/// thrown: processing always continues past them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DataQualityWarning {
    /// Two distinct original headers normalized to the same key; the later
    /// column overwrote the earlier one.
    DuplicateFieldName {
        original_name: String,
        normalized_key: String,
    },
    /// A placeholder had no field with an equal normalized key.
    UnmatchedPlaceholder { name: String },
    /// A field no placeholder references.
    UnmatchedField { normalized_key: String },
    /// Tokens still present in the rendered subject/body.
    UnresolvedTokens { names: Vec<String> },
    /// A currency transform could not parse its input and defaulted to zero.
    CurrencyParseDefaulted { value: String },
    /// Recipient addresses dropped from a BCC list; counted, not enumerated.
    InvalidRecipientsExcluded { count: usize },
    /// Input had more rows than the cap; the remainder was not processed.
    RowLimitReached { limit: usize },
    /// Input had more columns than the cap; extras were dropped.
    ColumnLimitReached { limit: usize, total: usize },
    /// No field matched any of the known identifier name patterns.
    NoDefaultIdentifier,
}

/// Everything a record source produces for one file: ordered fields, ordered
/// records, and any quality conditions hit along the way.
#[derive(Debug, Clone, Default)]
pub struct RecordSet {
    pub fields: Vec<Field>,
    pub records: Vec<Record>,
    pub warnings: Vec<DataQualityWarning>,
}

/// A template's text plus its ordered, de-duplicated placeholders.
#[derive(Debug, Clone, Default)]
pub struct Template {
    pub subject: String,
    pub body: String,
    pub placeholders: Vec<Placeholder>,
}

/// Output of one assembly pass, ready for a draft composer.
#[derive(Debug, Clone, Default)]
pub struct RenderedDraft {
    pub subject: String,
    pub body: String,
    pub to: Option<String>,
    pub bcc: Vec<String>,
    pub unresolved: Vec<String>,
    pub warnings: Vec<DataQualityWarning>,
}

impl RenderedDraft {
    /// BCC header value: semicolon-joined address list.
    pub fn bcc_joined(&self) -> String {
        self.bcc.join(";")
    }
}

/// Receipt for a persisted draft artifact.
#[derive(Debug, Clone)]
pub struct DraftReceipt {
    pub location: String,
    pub subject: String,
}

/// Transient username/password pair for the lookup collaborator. Never
/// persisted; Debug output redacts both halves.
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &"<redacted>")
            .field("password", &"<redacted>")
            .finish()
    }
}
