use crate::core::matcher::{detect_identifier_field, match_placeholders, MatchOutcome};
use crate::core::transform::{Transform, TransformAssignments};
use crate::domain::model::{DataQualityWarning, Field, Record, RecordSet, Template};
use crate::utils::error::{MergeError, Result};

/// Load/match/render pipeline state for one record-set generation.
/// Re-entrant loads are rejected by state, not by guard flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    Loading,
    Ready,
}

impl SessionState {
    fn name(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::Loading => "loading",
            SessionState::Ready => "ready",
        }
    }
}

/// Caller-owned context for one merge run: loaded fields and records, the
/// current template and match outcome, transform assignments and the selected
/// identifier field. All core operations take this by reference; there is no
/// ambient global state. Not thread-safe by design: callers serialize access
/// through their event loop.
#[derive(Debug, Default)]
pub struct MergeSession {
    state: SessionState,
    generation: u64,
    fields: Vec<Field>,
    records: Vec<Record>,
    template: Option<Template>,
    match_outcome: Option<MatchOutcome>,
    transforms: TransformAssignments,
    identifier_key: Option<String>,
    load_warnings: Vec<DataQualityWarning>,
}

impl MergeSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Bumped every time a record set finishes loading.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn records_mut(&mut self) -> &mut [Record] {
        &mut self.records
    }

    pub fn template(&self) -> Option<&Template> {
        self.template.as_ref()
    }

    pub fn match_outcome(&self) -> Option<&MatchOutcome> {
        self.match_outcome.as_ref()
    }

    pub fn transforms(&self) -> &TransformAssignments {
        &self.transforms
    }

    pub fn identifier_key(&self) -> Option<&str> {
        self.identifier_key.as_deref()
    }

    pub fn load_warnings(&self) -> &[DataQualityWarning] {
        &self.load_warnings
    }

    /// Marks the session as loading a new record set. Rejected while another
    /// load is in flight.
    pub fn begin_load(&mut self) -> Result<()> {
        if self.state == SessionState::Loading {
            return Err(MergeError::SessionBusy {
                state: self.state.name().to_string(),
                message: "a record set is already being loaded".to_string(),
            });
        }
        self.state = SessionState::Loading;
        Ok(())
    }

    /// Installs a freshly loaded record set: new generation, transforms
    /// reset, identifier re-detected, mapping recomputed against the current
    /// template.
    pub fn finish_load(&mut self, set: RecordSet) -> Result<()> {
        if self.state != SessionState::Loading {
            return Err(MergeError::SessionBusy {
                state: self.state.name().to_string(),
                message: "finish_load without begin_load".to_string(),
            });
        }

        self.fields = set.fields;
        self.records = set.records;
        self.load_warnings = set.warnings;
        self.transforms.clear();
        self.generation += 1;

        self.identifier_key = detect_identifier_field(&self.fields)
            .map(|field| field.normalized_key.clone());
        match &self.identifier_key {
            Some(key) => tracing::info!("Auto-selected identifier field: '{}'", key),
            None => {
                tracing::warn!("No identifier field auto-detected; explicit selection required");
                self.load_warnings.push(DataQualityWarning::NoDefaultIdentifier);
            }
        }

        self.state = SessionState::Ready;
        self.rematch();
        Ok(())
    }

    /// Rolls a failed load back to idle; previously loaded data is gone with
    /// the failed generation.
    pub fn abort_load(&mut self) {
        if self.state == SessionState::Loading {
            self.state = SessionState::Idle;
            self.fields.clear();
            self.records.clear();
            self.match_outcome = None;
            self.identifier_key = None;
        }
    }

    /// Installs a template and recomputes the mapping when records are ready.
    pub fn set_template(&mut self, template: Template) -> Result<()> {
        if self.state == SessionState::Loading {
            return Err(MergeError::SessionBusy {
                state: self.state.name().to_string(),
                message: "cannot change template while loading records".to_string(),
            });
        }
        self.template = Some(template);
        self.rematch();
        Ok(())
    }

    fn rematch(&mut self) {
        if self.state != SessionState::Ready {
            return;
        }
        let Some(template) = &self.template else {
            self.match_outcome = None;
            return;
        };
        let outcome = match_placeholders(&template.placeholders, &self.fields);
        if !outcome.unmatched_placeholders.is_empty() {
            tracing::warn!(
                "{} placeholder(s) have no matching CSV field: {}",
                outcome.unmatched_placeholders.len(),
                outcome
                    .unmatched_placeholders
                    .iter()
                    .map(|p| p.cleaned_name.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }
        self.match_outcome = Some(outcome);
    }

    /// Overrides the identifier field. The key must name a loaded field and
    /// must not currently carry a non-identity transform.
    pub fn set_identifier_field(&mut self, key: &str) -> Result<()> {
        self.require_ready("select identifier field")?;

        if !self.fields.iter().any(|f| f.normalized_key == key) {
            return Err(MergeError::ValidationError {
                message: format!("identifier field '{}' not found in the loaded CSV fields", key),
            });
        }
        if !self.transforms.get(key).is_identity() {
            return Err(MergeError::ContractViolation {
                message: format!(
                    "field '{}' carries a transform and cannot be the identifier",
                    key
                ),
            });
        }

        self.identifier_key = Some(key.to_string());
        Ok(())
    }

    /// Assigns a transform to a field. A non-identity transform on the
    /// current identifier field is rejected without mutating assignments.
    pub fn set_transform(&mut self, key: &str, transform: Transform) -> Result<()> {
        self.require_ready("assign transform")?;

        if !self.fields.iter().any(|f| f.normalized_key == key) {
            return Err(MergeError::ValidationError {
                message: format!("field '{}' not found in the loaded CSV fields", key),
            });
        }
        if self.identifier_key.as_deref() == Some(key) && !transform.is_identity() {
            return Err(MergeError::ContractViolation {
                message: format!(
                    "the identifier field '{}' may not carry a '{}' transform",
                    key, transform
                ),
            });
        }

        self.transforms.set(key, transform);
        Ok(())
    }

    /// The identifier key, required before assembly may proceed.
    pub fn require_identifier(&self) -> Result<&str> {
        self.identifier_key
            .as_deref()
            .ok_or_else(|| MergeError::ContractViolation {
                message: "no identifier field selected and none auto-detected".to_string(),
            })
    }

    fn require_ready(&self, action: &str) -> Result<()> {
        if self.state != SessionState::Ready {
            return Err(MergeError::SessionBusy {
                state: self.state.name().to_string(),
                message: format!("cannot {} before a record set is loaded", action),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::normalize::normalize;
    use crate::domain::model::Placeholder;

    fn record_set(headers: &[&str], rows: &[&[&str]]) -> RecordSet {
        let fields: Vec<Field> = headers
            .iter()
            .map(|h| Field {
                original_name: h.to_string(),
                normalized_key: normalize(h),
            })
            .collect();
        let records = rows
            .iter()
            .map(|row| {
                fields
                    .iter()
                    .zip(row.iter())
                    .map(|(f, v)| (f.normalized_key.clone(), v.to_string()))
                    .collect()
            })
            .collect();
        RecordSet {
            fields,
            records,
            warnings: Vec::new(),
        }
    }

    fn template_with(placeholders: &[&str]) -> Template {
        Template {
            subject: String::new(),
            body: String::new(),
            placeholders: placeholders
                .iter()
                .map(|p| Placeholder {
                    raw_name: p.to_string(),
                    cleaned_name: p.to_string(),
                })
                .collect(),
        }
    }

    fn loaded_session() -> MergeSession {
        let mut session = MergeSession::new();
        session.begin_load().unwrap();
        session
            .finish_load(record_set(
                &["Employee ID", "First Name", "Amount Due"],
                &[&["1001", "john", "500"]],
            ))
            .unwrap();
        session
    }

    #[test]
    fn test_load_lifecycle_and_generation() {
        let mut session = MergeSession::new();
        assert_eq!(session.state(), SessionState::Idle);
        assert_eq!(session.generation(), 0);

        session.begin_load().unwrap();
        assert_eq!(session.state(), SessionState::Loading);

        session
            .finish_load(record_set(&["emplid"], &[&["1"]]))
            .unwrap();
        assert_eq!(session.state(), SessionState::Ready);
        assert_eq!(session.generation(), 1);

        session.begin_load().unwrap();
        session
            .finish_load(record_set(&["emplid"], &[&["2"]]))
            .unwrap();
        assert_eq!(session.generation(), 2);
    }

    #[test]
    fn test_reentrant_load_rejected() {
        let mut session = MergeSession::new();
        session.begin_load().unwrap();
        assert!(matches!(
            session.begin_load(),
            Err(MergeError::SessionBusy { .. })
        ));
    }

    #[test]
    fn test_template_change_rejected_while_loading() {
        let mut session = MergeSession::new();
        session.begin_load().unwrap();
        assert!(matches!(
            session.set_template(template_with(&["First_Name"])),
            Err(MergeError::SessionBusy { .. })
        ));
    }

    #[test]
    fn test_abort_load_returns_to_idle() {
        let mut session = MergeSession::new();
        session.begin_load().unwrap();
        session.abort_load();
        assert_eq!(session.state(), SessionState::Idle);
        session.begin_load().unwrap();
    }

    #[test]
    fn test_identifier_auto_detected_on_load() {
        let session = loaded_session();
        assert_eq!(session.identifier_key(), Some("employee_id"));
        assert!(session.require_identifier().is_ok());
    }

    #[test]
    fn test_no_identifier_reported_and_required() {
        let mut session = MergeSession::new();
        session.begin_load().unwrap();
        session
            .finish_load(record_set(&["First Name"], &[&["john"]]))
            .unwrap();

        assert_eq!(session.identifier_key(), None);
        assert!(session
            .load_warnings()
            .contains(&DataQualityWarning::NoDefaultIdentifier));
        assert!(matches!(
            session.require_identifier(),
            Err(MergeError::ContractViolation { .. })
        ));

        session.set_identifier_field("first_name").unwrap();
        assert_eq!(session.require_identifier().unwrap(), "first_name");
    }

    #[test]
    fn test_transform_on_identifier_rejected_without_mutation() {
        let mut session = loaded_session();
        let before = session.transforms().clone();

        let result = session.set_transform("employee_id", Transform::Currency);
        assert!(matches!(result, Err(MergeError::ContractViolation { .. })));
        assert_eq!(session.transforms(), &before);

        // Identity assignment on the identifier is fine.
        session
            .set_transform("employee_id", Transform::DoNothing)
            .unwrap();
    }

    #[test]
    fn test_identifier_cannot_move_onto_transformed_field() {
        let mut session = loaded_session();
        session
            .set_transform("amount_due", Transform::Currency)
            .unwrap();

        assert!(matches!(
            session.set_identifier_field("amount_due"),
            Err(MergeError::ContractViolation { .. })
        ));
        assert_eq!(session.identifier_key(), Some("employee_id"));
    }

    #[test]
    fn test_transform_on_unknown_field_rejected() {
        let mut session = loaded_session();
        assert!(matches!(
            session.set_transform("nickname", Transform::Capitalize),
            Err(MergeError::ValidationError { .. })
        ));
    }

    #[test]
    fn test_transforms_reset_on_new_load() {
        let mut session = loaded_session();
        session
            .set_transform("first_name", Transform::Capitalize)
            .unwrap();

        session.begin_load().unwrap();
        session
            .finish_load(record_set(&["emplid", "first_name"], &[&["1", "a"]]))
            .unwrap();

        assert_eq!(session.transforms().get("first_name"), Transform::DoNothing);
    }

    #[test]
    fn test_mapping_recomputed_when_template_or_records_change() {
        let mut session = loaded_session();
        assert!(session.match_outcome().is_none());

        session
            .set_template(template_with(&["First_Name", "email", "Nickname"]))
            .unwrap();
        let outcome = session.match_outcome().unwrap();
        assert_eq!(outcome.mapping.get("First_Name"), Some(Some("first_name")));
        assert_eq!(outcome.mapping.get("Nickname"), Some(None));
        assert_eq!(outcome.mapping.get("email"), None);

        // New record set without the matched column drops the match.
        session.begin_load().unwrap();
        session
            .finish_load(record_set(&["emplid"], &[&["1"]]))
            .unwrap();
        let outcome = session.match_outcome().unwrap();
        assert_eq!(outcome.mapping.get("First_Name"), Some(None));
    }
}
