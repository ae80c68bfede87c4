use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Frozen output of one capture session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    mime_type: String,
    bytes: Arc<[u8]>,
}

impl Artifact {
    pub fn new(mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            mime_type: mime_type.into(),
            bytes: bytes.into(),
        }
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn shared_bytes(&self) -> Arc<[u8]> {
        self.bytes.clone()
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// File extension for this artifact's container.
    pub fn extension(&self) -> &str {
        extension_for_mime(&self.mime_type)
    }
}

/// Strips codec parameters from a MIME type: `video/webm;codecs=vp9` becomes
/// `video/webm`.
pub fn container_mime(mime: &str) -> &str {
    mime.split(';').next().unwrap_or(mime).trim()
}

/// Maps `video/webm` to `webm`, `application/x-ndjson` to `ndjson`.
pub fn extension_for_mime(mime: &str) -> &str {
    let container = container_mime(mime);
    let subtype = container.rsplit('/').next().unwrap_or(container);
    let subtype = subtype.strip_prefix("x-").unwrap_or(subtype);
    if subtype.is_empty() {
        "bin"
    } else {
        subtype
    }
}

/// Revocable reference to an artifact held by an [`ArtifactStore`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArtifactHandle {
    id: u64,
    url: String,
}

impl ArtifactHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

/// Keeps finalized artifacts alive until their handle is revoked.
#[derive(Debug, Default)]
pub struct ArtifactStore {
    next_id: u64,
    live: HashMap<u64, Artifact>,
}

impl ArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&mut self, artifact: Artifact) -> ArtifactHandle {
        self.next_id += 1;
        let id = self.next_id;
        let handle = ArtifactHandle {
            id,
            url: format!("blob:lava-icecream/{id}"),
        };
        tracing::debug!(url = %handle.url, bytes = artifact.len(), "artifact registered");
        self.live.insert(id, artifact);
        handle
    }

    /// Releases the artifact behind `handle`. Returns `false` when it was
    /// already revoked.
    pub fn revoke(&mut self, handle: &ArtifactHandle) -> bool {
        let released = self.live.remove(&handle.id).is_some();
        if released {
            tracing::debug!(url = %handle.url, "artifact revoked");
        }
        released
    }

    pub fn get(&self, handle: &ArtifactHandle) -> Option<&Artifact> {
        self.live.get(&handle.id)
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }
}
