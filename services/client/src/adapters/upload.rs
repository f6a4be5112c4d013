//! services/client/src/adapters/upload.rs
//!
//! This module contains the adapter for the backend's upload endpoint.
//! It implements the `FileUploadService` port from the `core` crate.

use crate::adapters::{
    http::{endpoint, ensure_success, transport_error},
    protocol::UploadResponse,
};
use async_trait::async_trait;
use docustream_core::{FileUploadService, PortError, PortResult, StagedAttachment, UploadedFile};
use reqwest::{
    multipart::{Form, Part},
    Client, Url,
};
use std::time::Duration;
use tracing::info;

/// An adapter that implements `FileUploadService` with multipart HTTP requests.
#[derive(Clone)]
pub struct HttpUploadAdapter {
    client: Client,
    base_url: Url,
    timeout: Duration,
}

impl HttpUploadAdapter {
    /// Creates a new `HttpUploadAdapter`.
    pub fn new(client: Client, base_url: Url, timeout: Duration) -> Self {
        Self {
            client,
            base_url,
            timeout,
        }
    }
}

#[async_trait]
impl FileUploadService for HttpUploadAdapter {
    async fn upload_file(&self, attachment: &StagedAttachment) -> PortResult<UploadedFile> {
        let url = endpoint(&self.base_url, "upload")?;
        let part = Part::bytes(attachment.bytes.to_vec()).file_name(attachment.name.clone());
        let form = Form::new().part("file", part);

        let response = self
            .client
            .post(url)
            .timeout(self.timeout)
            .multipart(form)
            .send()
            .await
            .map_err(transport_error)?;
        let response = ensure_success(response, &attachment.name).await?;

        let uploaded: UploadResponse = response
            .json()
            .await
            .map_err(|e| PortError::Unexpected(format!("Malformed upload response: {}", e)))?;
        info!(
            "Uploaded '{}' ({} bytes) as file {}.",
            attachment.name, attachment.size, uploaded.id
        );
        Ok(uploaded.into())
    }
}
