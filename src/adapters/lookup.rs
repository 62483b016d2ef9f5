use crate::domain::model::{Credentials, Record};
use crate::domain::ports::EmailLookup;
use crate::utils::error::{MergeError, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 30;

/// Directory service client. One POST per run: the distinct identifier values
/// go out as a JSON list, a JSON object mapping identifier to address comes
/// back. Requests carry HTTP basic auth from the transient credential pair.
pub struct HttpEmailLookup {
    client: reqwest::Client,
    endpoint: String,
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    #[serde(flatten)]
    addresses: HashMap<String, String>,
}

impl HttpEmailLookup {
    pub fn new(endpoint: impl Into<String>, timeout_secs: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(MergeError::LookupError)?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    async fn fetch_addresses(
        &self,
        ids: &[String],
        credentials: &Credentials,
    ) -> Result<HashMap<String, String>> {
        let response = self
            .client
            .post(&self.endpoint)
            .basic_auth(&credentials.username, Some(&credentials.password))
            .json(&serde_json::json!({ "ids": ids }))
            .send()
            .await?
            .error_for_status()?;

        let parsed: LookupResponse = response.json().await?;
        Ok(parsed.addresses)
    }
}

#[async_trait]
impl EmailLookup for HttpEmailLookup {
    async fn test_connection(&self, credentials: &Credentials) -> Result<()> {
        let response = self
            .client
            .get(&self.endpoint)
            .basic_auth(&credentials.username, Some(&credentials.password))
            .send()
            .await?;

        if response.status().is_success() {
            tracing::debug!("Lookup endpoint reachable: {}", self.endpoint);
            Ok(())
        } else {
            Err(MergeError::ProcessingError {
                message: format!(
                    "Lookup endpoint returned status {}: {}",
                    response.status(),
                    self.endpoint
                ),
            })
        }
    }

    async fn augment_with_emails(
        &self,
        records: &mut [Record],
        id_key: &str,
        credentials: &Credentials,
    ) -> Result<usize> {
        let mut ids: Vec<String> = Vec::new();
        for record in records.iter() {
            if let Some(id) = record.get(id_key) {
                let id = id.trim();
                if !id.is_empty() && !ids.iter().any(|seen| seen == id) {
                    ids.push(id.to_string());
                }
            }
        }

        if ids.is_empty() {
            tracing::warn!("No usable '{}' values; skipping address lookup", id_key);
            for record in records.iter_mut() {
                record.insert("email", "");
            }
            return Ok(0);
        }

        tracing::info!("Looking up addresses for {} identifier(s)", ids.len());
        let addresses = self.fetch_addresses(&ids, credentials).await?;

        let mut found = 0;
        for record in records.iter_mut() {
            let email = record
                .get(id_key)
                .map(str::trim)
                .and_then(|id| addresses.get(id))
                .cloned()
                .unwrap_or_default();
            if !email.is_empty() {
                found += 1;
            }
            record.insert("email", email);
        }

        tracing::info!("📧 Found addresses for {}/{} record(s)", found, records.len());
        Ok(found)
    }
}

/// Outcome of a bounded connectivity probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionStatus {
    Connected,
    Failed(String),
    TimedOut,
}

/// Probes the lookup collaborator without letting a hung connection stall the
/// caller. The probe runs on its own task; when the deadline passes first, any
/// result the task later produces is dropped with its handle.
pub async fn probe_connection(
    lookup: Arc<dyn EmailLookup>,
    credentials: Credentials,
    timeout: Duration,
) -> ConnectionStatus {
    let handle = tokio::spawn(async move { lookup.test_connection(&credentials).await });

    match tokio::time::timeout(timeout, handle).await {
        Ok(Ok(Ok(()))) => ConnectionStatus::Connected,
        Ok(Ok(Err(e))) => ConnectionStatus::Failed(e.to_string()),
        Ok(Err(join_error)) => ConnectionStatus::Failed(format!("probe task failed: {}", join_error)),
        Err(_) => ConnectionStatus::TimedOut,
    }
}
