use crate::domain::model::{DraftReceipt, RenderedDraft};
use crate::domain::ports::DraftComposer;
use crate::utils::error::Result;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Writes each rendered draft as an .eml-style text file under the output
/// directory. Filenames carry a timestamp plus a per-composer sequence number
/// so drafts from one run sort in creation order.
pub struct FileDraftComposer {
    output_dir: PathBuf,
    sequence: AtomicUsize,
}

impl FileDraftComposer {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            sequence: AtomicUsize::new(0),
        }
    }

    fn render_message(draft: &RenderedDraft) -> String {
        let mut message = String::new();
        if let Some(to) = &draft.to {
            message.push_str(&format!("To: {}\n", to));
        }
        if !draft.bcc.is_empty() {
            message.push_str(&format!("Bcc: {}\n", draft.bcc_joined()));
        }
        message.push_str(&format!("Subject: {}\n\n", draft.subject));
        message.push_str(&draft.body);
        if !message.ends_with('\n') {
            message.push('\n');
        }
        message
    }
}

#[async_trait]
impl DraftComposer for FileDraftComposer {
    async fn compose(&self, draft: &RenderedDraft) -> Result<DraftReceipt> {
        std::fs::create_dir_all(&self.output_dir)?;

        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        let filename = format!("draft_{}_{:04}.eml", timestamp, sequence);
        let path = self.output_dir.join(&filename);

        std::fs::write(&path, Self::render_message(draft))?;
        tracing::debug!("📄 Draft written: {}", path.display());

        Ok(DraftReceipt {
            location: path.display().to_string(),
            subject: draft.subject.clone(),
        })
    }
}
