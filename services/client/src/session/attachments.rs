//! services/client/src/session/attachments.rs
//!
//! Files the user selected but has not sent yet.

use docustream_core::StagedAttachment;

/// Ordered staging area for attachments. Order is selection order and
/// duplicates are allowed; no validation happens here.
#[derive(Debug, Clone, Default)]
pub struct AttachmentBuffer {
    items: Vec<StagedAttachment>,
}

impl AttachmentBuffer {
    pub fn add(&mut self, files: impl IntoIterator<Item = StagedAttachment>) {
        self.items.extend(files);
    }

    /// Removes exactly one entry by position.
    pub fn remove(&mut self, index: usize) -> Option<StagedAttachment> {
        (index < self.items.len()).then(|| self.items.remove(index))
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Drops the `count` oldest entries, i.e. the ones a send just consumed.
    /// Files staged while that send was uploading stay staged.
    pub fn consume_sent(&mut self, count: usize) {
        let count = count.min(self.items.len());
        self.items.drain(..count);
    }

    pub fn as_slice(&self) -> &[StagedAttachment] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
