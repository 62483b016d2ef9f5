use crate::domain::model::{
    Credentials, DraftReceipt, Record, RecordSet, RenderedDraft, Template,
};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::path::Path;

/// Recipient data loader. Owns encoding detection, size/row/column limits and
/// malformed-input rejection; malformed input is an error, quality conditions
/// ride along as warnings in the returned set.
#[async_trait]
pub trait RecordSource: Send + Sync {
    async fn load(&self, path: &Path) -> Result<RecordSet>;
}

/// Extracts a template's subject/body text and its ordered, de-duplicated
/// placeholders.
#[async_trait]
pub trait TemplateInspector: Send + Sync {
    async fn inspect(&self, path: &Path) -> Result<Template>;
}

/// Directory lookup that augments each record with an `email` value keyed by
/// the identifier field (empty string when no address is on file).
#[async_trait]
pub trait EmailLookup: Send + Sync {
    /// Connectivity probe. A failure here is a collaborator failure, not a
    /// data-quality condition.
    async fn test_connection(&self, credentials: &Credentials) -> Result<()>;

    /// Fills in `email` on every record in place; returns how many addresses
    /// were found.
    async fn augment_with_emails(
        &self,
        records: &mut [Record],
        id_key: &str,
        credentials: &Credentials,
    ) -> Result<usize>;
}

/// Persists one rendered draft and reports success or failure for that draft
/// alone.
#[async_trait]
pub trait DraftComposer: Send + Sync {
    async fn compose(&self, draft: &RenderedDraft) -> Result<DraftReceipt>;
}

/// Supplies the transient credential pair for the lookup collaborator.
pub trait CredentialProvider: Send + Sync {
    fn credentials(&self) -> Result<Credentials>;
}

pub trait ConfigProvider: Send + Sync {
    fn lookup_endpoint(&self) -> &str;
    fn output_path(&self) -> &str;
    fn connect_timeout_secs(&self) -> u64;
    fn max_records(&self) -> usize;
}
