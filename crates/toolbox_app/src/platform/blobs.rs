use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use bytes::Bytes;
use toolbox_core::ObjectUrl;
use toolbox_logging::{toolbox_trace, toolbox_warn};

const URL_PREFIX: &str = "blob:toolbox/";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    pub bytes: Bytes,
    pub mime_type: String,
}

#[derive(Default)]
struct BlobTable {
    next_id: u64,
    blobs: HashMap<ObjectUrl, Blob>,
    created: u64,
    revoked: u64,
}

/// In-process stand-in for browser object URLs.
#[derive(Default)]
pub struct BlobStore {
    table: Mutex<BlobTable>,
}

impl BlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&self, bytes: Bytes, mime_type: &str) -> ObjectUrl {
        let mut table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
        table.next_id += 1;
        let url = ObjectUrl::new(format!("{URL_PREFIX}{}", table.next_id));
        toolbox_trace!("create {} ({} bytes, {})", url, bytes.len(), mime_type);
        table.blobs.insert(
            url.clone(),
            Blob {
                bytes,
                mime_type: mime_type.to_string(),
            },
        );
        table.created += 1;
        url
    }

    pub fn get(&self, url: &ObjectUrl) -> Option<Blob> {
        self.table
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .blobs
            .get(url)
            .cloned()
    }

    /// Releases `url`. Returns `false` if it was unknown or already revoked.
    pub fn revoke(&self, url: &ObjectUrl) -> bool {
        let mut table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
        if table.blobs.remove(url).is_none() {
            toolbox_warn!("revoke of unknown object url {}", url);
            return false;
        }
        table.revoked += 1;
        toolbox_trace!("revoke {}", url);
        true
    }

    pub fn created(&self) -> u64 {
        self.table.lock().unwrap_or_else(PoisonError::into_inner).created
    }

    pub fn revoked(&self) -> u64 {
        self.table.lock().unwrap_or_else(PoisonError::into_inner).revoked
    }

    pub fn live(&self) -> usize {
        self.table
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .blobs
            .len()
    }
}
