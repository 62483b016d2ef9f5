use crate::core::assembler::EmailAssembler;
use crate::core::session::MergeSession;
use crate::core::transform::Transform;
use crate::domain::model::FieldMapping;
use crate::domain::ports::{
    CredentialProvider, DraftComposer, EmailLookup, RecordSource, TemplateInspector,
};
use crate::utils::error::{MergeError, Result};
use std::path::PathBuf;

/// Processing cap per run; CSVs beyond this are truncated with a warning.
pub const MAX_DRAFTS_PER_RUN: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MergeMode {
    /// One "to"-addressed draft per recipient.
    #[default]
    Individual,
    /// One draft blind-copied to every recipient, rendered from the first
    /// record.
    Bcc,
}

/// One merge run: which CSV, which template, how to address, plus any
/// session overrides to apply after the load.
#[derive(Debug, Clone, Default)]
pub struct MergeRequest {
    pub csv_path: PathBuf,
    pub template_path: PathBuf,
    pub mode: MergeMode,
    pub identifier_override: Option<String>,
    pub transforms: Vec<(String, Transform)>,
}

/// Per-run outcome counts. Per-recipient failures are counted here instead of
/// aborting the batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeSummary {
    pub total_records: usize,
    pub emails_found: usize,
    pub drafts_created: usize,
    pub skipped_no_email: usize,
    pub failed: usize,
    pub with_unresolved: usize,
    pub bcc_excluded: usize,
    /// True when the record set exceeded the per-run cap and the tail was not
    /// processed.
    pub truncated: bool,
}

/// Orchestrates a full merge: load records, inspect the template, reconcile
/// placeholders with fields, look up recipient addresses, then render and
/// compose drafts. All state for a run lives in the caller-owned session.
pub struct MergeEngine<R, T, L, D, C> {
    record_source: R,
    template_inspector: T,
    lookup: L,
    composer: D,
    credentials: C,
    assembler: EmailAssembler,
    max_drafts: usize,
}

impl<R, T, L, D, C> MergeEngine<R, T, L, D, C>
where
    R: RecordSource,
    T: TemplateInspector,
    L: EmailLookup,
    D: DraftComposer,
    C: CredentialProvider,
{
    pub fn new(record_source: R, template_inspector: T, lookup: L, composer: D, credentials: C) -> Self {
        Self {
            record_source,
            template_inspector,
            lookup,
            composer,
            credentials,
            assembler: EmailAssembler::new(),
            max_drafts: MAX_DRAFTS_PER_RUN,
        }
    }

    pub fn with_max_drafts(mut self, max_drafts: usize) -> Self {
        self.max_drafts = max_drafts;
        self
    }

    pub async fn run(&self, session: &mut MergeSession, request: &MergeRequest) -> Result<MergeSummary> {
        tracing::info!("=== Starting email generation ===");

        // Load records
        tracing::info!("📄 Loading records from {}", request.csv_path.display());
        session.begin_load()?;
        let record_set = match self.record_source.load(&request.csv_path).await {
            Ok(set) => set,
            Err(e) => {
                session.abort_load();
                return Err(e);
            }
        };
        session.finish_load(record_set)?;
        for warning in session.load_warnings() {
            tracing::warn!("⚠ Data quality: {:?}", warning);
        }
        tracing::info!(
            "Loaded {} record(s) with {} field(s)",
            session.records().len(),
            session.fields().len()
        );

        // Inspect template and reconcile placeholders with fields
        tracing::info!("📧 Inspecting template {}", request.template_path.display());
        let template = self.template_inspector.inspect(&request.template_path).await?;
        tracing::info!(
            "Found {} placeholder(s): {}",
            template.placeholders.len(),
            template
                .placeholders
                .iter()
                .map(|p| p.cleaned_name.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );
        session.set_template(template)?;

        // Apply caller overrides; contract violations abort before any draft
        // is composed.
        if let Some(key) = &request.identifier_override {
            session.set_identifier_field(key)?;
        }
        for (key, transform) in &request.transforms {
            session.set_transform(key, *transform)?;
        }

        let identifier = session.require_identifier()?.to_string();
        tracing::info!("🆔 Identifier field: {}", identifier);

        // Look up recipient addresses
        let credentials = self.credentials.credentials()?;
        tracing::info!("🔍 Querying directory for recipient addresses...");
        let found = self
            .lookup
            .augment_with_emails(session.records_mut(), &identifier, &credentials)
            .await?;
        tracing::info!(
            "📬 Found {} address(es) for {} record(s)",
            found,
            session.records().len()
        );

        let mut summary = MergeSummary {
            total_records: session.records().len(),
            emails_found: found,
            ..Default::default()
        };

        if session.records().len() > self.max_drafts {
            summary.truncated = true;
            tracing::warn!(
                "⚠ {} records exceed the per-run cap; processing only the first {}",
                session.records().len(),
                self.max_drafts
            );
        }

        match request.mode {
            MergeMode::Individual => self.compose_individual(session, &identifier, &mut summary).await,
            MergeMode::Bcc => self.compose_bcc(session, &mut summary).await,
        }

        tracing::info!("📊 Summary:");
        tracing::info!("  ✅ Drafts created: {}", summary.drafts_created);
        if summary.skipped_no_email > 0 {
            tracing::warn!("  ⚠ Skipped (no address): {}", summary.skipped_no_email);
        }
        if summary.failed > 0 {
            tracing::warn!("  ❌ Failed: {}", summary.failed);
        }
        if summary.with_unresolved > 0 {
            tracing::warn!("  📝 With unresolved tokens: {}", summary.with_unresolved);
        }

        Ok(summary)
    }

    async fn compose_individual(
        &self,
        session: &mut MergeSession,
        identifier: &str,
        summary: &mut MergeSummary,
    ) {
        let template = session.template().cloned().unwrap_or_default();
        let mapping = session
            .match_outcome()
            .map(|o| o.mapping.clone())
            .unwrap_or_default();
        let transforms = session.transforms().clone();

        let count = session.records().len().min(self.max_drafts);
        for index in 0..count {
            let record = &session.records()[index];
            let recipient_id = record.get(identifier).unwrap_or("Unknown").to_string();
            let email = record.get("email").unwrap_or("").trim().to_string();

            if !self.assembler.is_valid_email(&email) {
                summary.skipped_no_email += 1;
                tracing::warn!(
                    "{:>3}. {}: no business email found, skipping draft",
                    index + 1,
                    recipient_id
                );
                continue;
            }

            let draft = self
                .assembler
                .render(&template, record, &mapping, &transforms, &email);
            if !draft.unresolved.is_empty() {
                summary.with_unresolved += 1;
            }

            // One recipient's failure never stops the rest of the batch.
            match self.composer.compose(&draft).await {
                Ok(receipt) => {
                    summary.drafts_created += 1;
                    tracing::info!(
                        "{:>3}. {}: drafted '{}' -> {}",
                        index + 1,
                        recipient_id,
                        receipt.subject,
                        receipt.location
                    );
                }
                Err(e) => {
                    summary.failed += 1;
                    tracing::error!("{:>3}. {}: draft failed: {}", index + 1, recipient_id, e);
                }
            }
        }
    }

    async fn compose_bcc(&self, session: &mut MergeSession, summary: &mut MergeSummary) {
        let template = session.template().cloned().unwrap_or_default();
        let mapping: FieldMapping = session
            .match_outcome()
            .map(|o| o.mapping.clone())
            .unwrap_or_default();
        let transforms = session.transforms().clone();

        let records = &session.records()[..session.records().len().min(self.max_drafts)];
        let mut recipients = Vec::new();
        for record in records {
            let email = record.get("email").unwrap_or("").trim();
            if email.is_empty() {
                summary.skipped_no_email += 1;
            } else {
                recipients.push(email.to_string());
            }
        }

        let Some(representative) = records.first() else {
            tracing::warn!("⚠ No records available for the BCC draft");
            return;
        };
        if recipients.is_empty() {
            tracing::warn!("⚠ No recipient addresses available for the BCC draft");
            summary.failed += 1;
            return;
        }

        let draft = self.assembler.render_bcc(
            &template,
            representative,
            &mapping,
            &transforms,
            &recipients,
        );
        summary.bcc_excluded = recipients.len() - draft.bcc.len();
        if !draft.unresolved.is_empty() {
            summary.with_unresolved += 1;
        }

        match self.composer.compose(&draft).await {
            Ok(receipt) => {
                summary.drafts_created += 1;
                tracing::info!(
                    "✅ BCC draft '{}' created with {} recipient(s) -> {}",
                    receipt.subject,
                    draft.bcc.len(),
                    receipt.location
                );
            }
            Err(e) => {
                summary.failed += 1;
                tracing::error!("❌ BCC draft failed: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{
        Credentials, DraftReceipt, Field, Placeholder, Record, RecordSet, RenderedDraft, Template,
    };
    use async_trait::async_trait;
    use std::path::Path;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    struct StubSource {
        set: RecordSet,
    }

    #[async_trait]
    impl RecordSource for StubSource {
        async fn load(&self, _path: &Path) -> crate::utils::error::Result<RecordSet> {
            Ok(self.set.clone())
        }
    }

    struct StubInspector {
        template: Template,
    }

    #[async_trait]
    impl TemplateInspector for StubInspector {
        async fn inspect(&self, _path: &Path) -> crate::utils::error::Result<Template> {
            Ok(self.template.clone())
        }
    }

    struct StubLookup {
        addresses: Vec<(String, String)>,
    }

    #[async_trait]
    impl EmailLookup for StubLookup {
        async fn test_connection(
            &self,
            _credentials: &Credentials,
        ) -> crate::utils::error::Result<()> {
            Ok(())
        }

        async fn augment_with_emails(
            &self,
            records: &mut [Record],
            id_key: &str,
            _credentials: &Credentials,
        ) -> crate::utils::error::Result<usize> {
            let mut found = 0;
            for record in records.iter_mut() {
                let id = record.get(id_key).unwrap_or("").to_string();
                let email = self
                    .addresses
                    .iter()
                    .find(|(k, _)| *k == id)
                    .map(|(_, v)| v.clone())
                    .unwrap_or_default();
                if !email.is_empty() {
                    found += 1;
                }
                record.insert("email", email);
            }
            Ok(found)
        }
    }

    #[derive(Clone, Default)]
    struct RecordingComposer {
        drafts: Arc<Mutex<Vec<RenderedDraft>>>,
        fail_subjects: Vec<String>,
    }

    #[async_trait]
    impl DraftComposer for RecordingComposer {
        async fn compose(
            &self,
            draft: &RenderedDraft,
        ) -> crate::utils::error::Result<DraftReceipt> {
            if self.fail_subjects.contains(&draft.subject) {
                return Err(MergeError::ProcessingError {
                    message: format!("compose refused for '{}'", draft.subject),
                });
            }
            self.drafts.lock().await.push(draft.clone());
            Ok(DraftReceipt {
                location: format!("draft-{}.eml", self.drafts.lock().await.len()),
                subject: draft.subject.clone(),
            })
        }
    }

    struct StubCredentials;

    impl CredentialProvider for StubCredentials {
        fn credentials(&self) -> crate::utils::error::Result<Credentials> {
            Ok(Credentials::new("svc", "secret"))
        }
    }

    fn field(name: &str) -> Field {
        Field {
            original_name: name.to_string(),
            normalized_key: crate::core::normalize::normalize(name),
        }
    }

    fn test_record_set() -> RecordSet {
        let fields = vec![field("emplid"), field("First Name")];
        let rows = [("1001", "john"), ("1002", "jane"), ("1003", "pat")];
        let records = rows
            .iter()
            .map(|(id, name)| {
                [
                    ("emplid".to_string(), id.to_string()),
                    ("first_name".to_string(), name.to_string()),
                ]
                .into_iter()
                .collect()
            })
            .collect();
        RecordSet {
            fields,
            records,
            warnings: Vec::new(),
        }
    }

    fn test_template() -> Template {
        Template {
            subject: "Hello {{First_Name}}".to_string(),
            body: "Dear {{First_Name}}, mail to {{email}}.".to_string(),
            placeholders: vec![
                Placeholder {
                    raw_name: "First_Name".to_string(),
                    cleaned_name: "First_Name".to_string(),
                },
                Placeholder {
                    raw_name: "email".to_string(),
                    cleaned_name: "email".to_string(),
                },
            ],
        }
    }

    fn engine_with(
        addresses: Vec<(&str, &str)>,
        composer: RecordingComposer,
    ) -> MergeEngine<StubSource, StubInspector, StubLookup, RecordingComposer, StubCredentials>
    {
        MergeEngine::new(
            StubSource {
                set: test_record_set(),
            },
            StubInspector {
                template: test_template(),
            },
            StubLookup {
                addresses: addresses
                    .into_iter()
                    .map(|(a, b)| (a.to_string(), b.to_string()))
                    .collect(),
            },
            composer,
            StubCredentials,
        )
    }

    #[tokio::test]
    async fn test_individual_run_skips_missing_addresses() {
        let composer = RecordingComposer::default();
        let engine = engine_with(
            vec![("1001", "john@x.com"), ("1003", "pat@x.com")],
            composer.clone(),
        );
        let mut session = MergeSession::new();

        let summary = engine
            .run(&mut session, &MergeRequest::default())
            .await
            .unwrap();

        assert_eq!(summary.total_records, 3);
        assert_eq!(summary.emails_found, 2);
        assert_eq!(summary.drafts_created, 2);
        assert_eq!(summary.skipped_no_email, 1);
        assert_eq!(summary.failed, 0);

        let drafts = composer.drafts.lock().await;
        assert_eq!(drafts[0].subject, "Hello john");
        assert_eq!(drafts[0].to.as_deref(), Some("john@x.com"));
        assert_eq!(drafts[1].subject, "Hello pat");
    }

    #[tokio::test]
    async fn test_individual_failure_does_not_abort_batch() {
        let composer = RecordingComposer {
            fail_subjects: vec!["Hello john".to_string()],
            ..Default::default()
        };
        let engine = engine_with(
            vec![("1001", "john@x.com"), ("1002", "jane@x.com")],
            composer.clone(),
        );
        let mut session = MergeSession::new();

        let summary = engine
            .run(&mut session, &MergeRequest::default())
            .await
            .unwrap();

        assert_eq!(summary.failed, 1);
        assert_eq!(summary.drafts_created, 1);
        assert_eq!(composer.drafts.lock().await[0].subject, "Hello jane");
    }

    #[tokio::test]
    async fn test_bcc_run_renders_from_first_record() {
        let composer = RecordingComposer::default();
        let engine = engine_with(
            vec![("1001", "john@x.com"), ("1002", "jane@x.com")],
            composer.clone(),
        );
        let mut session = MergeSession::new();

        let request = MergeRequest {
            mode: MergeMode::Bcc,
            ..Default::default()
        };
        let summary = engine.run(&mut session, &request).await.unwrap();

        assert_eq!(summary.drafts_created, 1);
        assert_eq!(summary.skipped_no_email, 1); // record 1003 had no address

        let drafts = composer.drafts.lock().await;
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].subject, "Hello john");
        assert!(drafts[0].to.is_none());
        assert_eq!(
            drafts[0].bcc,
            vec!["john@x.com".to_string(), "jane@x.com".to_string()]
        );
    }

    #[tokio::test]
    async fn test_run_respects_draft_cap() {
        let composer = RecordingComposer::default();
        let engine = engine_with(
            vec![
                ("1001", "john@x.com"),
                ("1002", "jane@x.com"),
                ("1003", "pat@x.com"),
            ],
            composer.clone(),
        )
        .with_max_drafts(2);
        let mut session = MergeSession::new();

        let summary = engine
            .run(&mut session, &MergeRequest::default())
            .await
            .unwrap();

        assert_eq!(summary.drafts_created, 2);
        assert!(summary.truncated);
        assert_eq!(composer.drafts.lock().await.len(), 2);
    }

    #[tokio::test]
    async fn test_run_within_cap_is_not_truncated() {
        let composer = RecordingComposer::default();
        let engine = engine_with(vec![("1001", "john@x.com")], composer.clone());
        let mut session = MergeSession::new();

        let summary = engine
            .run(&mut session, &MergeRequest::default())
            .await
            .unwrap();

        assert!(!summary.truncated);
    }

    #[tokio::test]
    async fn test_transform_override_applies_to_rendering() {
        let composer = RecordingComposer::default();
        let engine = engine_with(vec![("1001", "john@x.com")], composer.clone());
        let mut session = MergeSession::new();

        let request = MergeRequest {
            transforms: vec![("first_name".to_string(), Transform::Capitalize)],
            ..Default::default()
        };
        engine.run(&mut session, &request).await.unwrap();

        assert_eq!(composer.drafts.lock().await[0].subject, "Hello John");
    }

    #[tokio::test]
    async fn test_transform_on_identifier_aborts_run() {
        let composer = RecordingComposer::default();
        let engine = engine_with(vec![("1001", "john@x.com")], composer.clone());
        let mut session = MergeSession::new();

        let request = MergeRequest {
            transforms: vec![("emplid".to_string(), Transform::Currency)],
            ..Default::default()
        };
        let result = engine.run(&mut session, &request).await;

        assert!(matches!(result, Err(MergeError::ContractViolation { .. })));
        assert!(composer.drafts.lock().await.is_empty());
    }
}
