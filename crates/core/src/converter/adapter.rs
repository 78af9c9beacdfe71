//! The single-hop adapter capability.

use std::fmt;
use std::sync::Arc;

use super::error::AdapterError;

/// Mime type used when nothing more specific is known.
pub const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

/// Output of one adapter invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Converted {
    pub content: Vec<u8>,
    pub mime_type: String,
}

impl Converted {
    pub fn new(content: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            content,
            mime_type: mime_type.into(),
        }
    }
}

/// Signature shared by every adapter: `(content, target_hint) -> (bytes, mime)`.
pub type AdapterFn = dyn Fn(&[u8], &str) -> Result<Converted, AdapterError> + Send + Sync;

/// Shared handle to a registered adapter.
///
/// Two handles are equal when they point at the same registered function.
#[derive(Clone)]
pub struct AdapterRef(Arc<AdapterFn>);

impl AdapterRef {
    pub fn new<F>(func: F) -> Self
    where
        F: Fn(&[u8], &str) -> Result<Converted, AdapterError> + Send + Sync + 'static,
    {
        Self(Arc::new(func))
    }

    /// Runs the adapter. May block (subprocesses, heavy decoding).
    pub fn convert(&self, content: &[u8], target_hint: &str) -> Result<Converted, AdapterError> {
        (self.0)(content, target_hint)
    }
}

impl PartialEq for AdapterRef {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for AdapterRef {}

impl fmt::Debug for AdapterRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AdapterRef({:p})", Arc::as_ptr(&self.0))
    }
}
