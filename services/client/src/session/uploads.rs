//! services/client/src/session/uploads.rs
//!
//! Turns staged attachments into uploaded file references before a message is
//! composed. All uploads of a batch run in parallel; the first failure aborts the
//! whole batch without waiting for slower uploads.

use crate::error::{ClientError, ClientResult};
use docustream_core::{FileUploadService, PortError, StagedAttachment, UploadedFile};
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinSet;
use tracing::{error, info};

#[derive(Clone)]
pub struct UploadCoordinator {
    uploader: Arc<dyn FileUploadService>,
    max_upload_bytes: Option<u64>,
}

impl UploadCoordinator {
    pub fn new(uploader: Arc<dyn FileUploadService>, max_upload_bytes: Option<u64>) -> Self {
        Self {
            uploader,
            max_upload_bytes,
        }
    }

    /// Validation hook run over the whole batch before anything is uploaded.
    pub fn validate(&self, staged: &[StagedAttachment]) -> ClientResult<()> {
        if let Some(limit) = self.max_upload_bytes {
            if let Some(too_big) = staged.iter().find(|file| file.size > limit) {
                return Err(ClientError::InvalidAttachment {
                    name: too_big.name.clone(),
                    reason: format!("{} bytes exceeds the {} byte limit", too_big.size, limit),
                });
            }
        }
        Ok(())
    }

    /// Uploads every staged attachment and returns the references in selection order.
    pub async fn upload_all(&self, staged: &[StagedAttachment]) -> ClientResult<Vec<UploadedFile>> {
        self.validate(staged)?;
        if staged.is_empty() {
            return Ok(Vec::new());
        }

        let start_time = Instant::now();
        info!("Uploading {} attachments in parallel.", staged.len());

        let mut upload_tasks = JoinSet::new();
        for (index, attachment) in staged.iter().cloned().enumerate() {
            let uploader = self.uploader.clone();
            upload_tasks.spawn(async move { (index, uploader.upload_file(&attachment).await) });
        }

        // Results arrive in completion order; the first failure aborts the rest.
        let mut uploaded: Vec<Option<UploadedFile>> = vec![None; staged.len()];
        while let Some(joined) = upload_tasks.join_next().await {
            let (index, result) = joined
                .map_err(|e| ClientError::UploadFailed(PortError::Unexpected(e.to_string())))?;
            match result {
                Ok(file) => uploaded[index] = Some(file),
                Err(e) => {
                    error!("Upload of '{}' failed: {}", staged[index].name, e);
                    upload_tasks.abort_all();
                    return Err(ClientError::UploadFailed(e));
                }
            }
        }

        info!("Uploads finished in {:?}.", start_time.elapsed());
        Ok(uploaded.into_iter().flatten().collect())
    }
}

/// Prepends one tag per uploaded file, in order, separated from the typed text by
/// a blank line.
pub fn compose_message(uploaded: &[UploadedFile], text: &str) -> String {
    if uploaded.is_empty() {
        return text.to_string();
    }
    let tags: Vec<String> = uploaded.iter().map(UploadedFile::tag).collect();
    format!("{}\n\n{}", tags.join("\n"), text)
}
