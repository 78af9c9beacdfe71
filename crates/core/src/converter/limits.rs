//! Ceilings on data decompressed out of zip, OOXML and tar containers.

use std::io::Read;

use super::error::AdapterError;

/// Largest decompressed size accepted for one container entry.
pub(crate) const MAX_ENTRY_BYTES: u64 = 256 * 1024 * 1024;

/// Largest decompressed size accepted across all entries of one container.
pub(crate) const MAX_EXPANDED_BYTES: u64 = 1024 * 1024 * 1024;

/// Tracks how much one conversion has decompressed so far.
#[derive(Debug, Clone)]
pub(crate) struct ExpansionBudget {
    entry_limit: u64,
    remaining: u64,
}

impl Default for ExpansionBudget {
    fn default() -> Self {
        Self::new(MAX_ENTRY_BYTES, MAX_EXPANDED_BYTES)
    }
}

impl ExpansionBudget {
    pub(crate) fn new(entry_limit: u64, total_limit: u64) -> Self {
        Self {
            entry_limit,
            remaining: total_limit,
        }
    }

    /// Reads one entry whose header claims `declared` bytes.
    ///
    /// The header size is checked up front and the stream is capped
    /// regardless, so a header understating its entry still fails.
    pub(crate) fn read<R: Read>(
        &mut self,
        reader: R,
        declared: u64,
        format: &str,
        name: &str,
    ) -> Result<Vec<u8>, AdapterError> {
        let limit = self.entry_limit.min(self.remaining);
        if declared > limit {
            return Err(exceeded(format, name, limit));
        }

        let mut data = Vec::new();
        reader
            .take(limit.saturating_add(1))
            .read_to_end(&mut data)
            .map_err(|e| AdapterError::decode(format, format!("failed to read {}: {}", name, e)))?;

        let read = data.len() as u64;
        if read > limit {
            return Err(exceeded(format, name, limit));
        }
        self.remaining -= read;
        Ok(data)
    }
}

fn exceeded(format: &str, name: &str, limit: u64) -> AdapterError {
    AdapterError::decode(
        format,
        format!("{} expands beyond the {} byte limit", name, limit),
    )
}
