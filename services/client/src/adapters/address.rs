//! services/client/src/adapters/address.rs
//!
//! A file-backed navigable address. The terminal has no location bar, so the
//! current location is written to a small file; reading it back on start-up is
//! what lets a relaunch resume the same conversation.

use async_trait::async_trait;
use docustream_core::{ports::ROOT_LOCATION, NavigableAddress, PortError, PortResult};
use std::io::ErrorKind;
use std::path::PathBuf;
use tracing::debug;

#[derive(Clone, Debug)]
pub struct FileAddress {
    path: PathBuf,
}

impl FileAddress {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl NavigableAddress for FileAddress {
    async fn current(&self) -> PortResult<String> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(location) if !location.trim().is_empty() => Ok(location.trim().to_string()),
            Ok(_) => Ok(ROOT_LOCATION.to_string()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(ROOT_LOCATION.to_string()),
            Err(e) => Err(PortError::Unexpected(e.to_string())),
        }
    }

    async fn replace(&self, location: &str) -> PortResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| PortError::Unexpected(e.to_string()))?;
        }
        tokio::fs::write(&self.path, location)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        debug!("Location replaced with {}.", location);
        Ok(())
    }
}
