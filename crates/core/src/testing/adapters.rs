use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::converter::{AdapterError, AdapterRef, Converted, DEFAULT_MIME_TYPE};

/// Returns the input unchanged.
pub fn echo() -> AdapterRef {
    AdapterRef::new(|content, _| Ok(Converted::new(content.to_vec(), DEFAULT_MIME_TYPE)))
}

/// Appends `|tag` to the input and reports `application/x-{tag}`.
///
/// Makes the hops a chain went through visible in the output bytes.
pub fn marker(tag: &'static str) -> AdapterRef {
    AdapterRef::new(move |content, _| {
        let mut out = content.to_vec();
        out.push(b'|');
        out.extend_from_slice(tag.as_bytes());
        Ok(Converted::new(out, format!("application/x-{}", tag)))
    })
}

/// Always fails with `message`.
pub fn always_fails(message: &'static str) -> AdapterRef {
    AdapterRef::new(move |_, _| Err(AdapterError::tool_failed("test", message)))
}

/// Wraps `inner`, counting how many times it runs.
pub fn counting(inner: AdapterRef) -> (AdapterRef, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let adapter = AdapterRef::new(move |content, hint| {
        counter.fetch_add(1, Ordering::SeqCst);
        inner.convert(content, hint)
    });
    (adapter, calls)
}
