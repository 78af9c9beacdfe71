//! Format detection and output naming for uploaded files.

use std::path::Path;

use super::ConvertError;
use crate::registry::{normalize_label, ConversionRegistry};

/// Base name of an upload, without any client-supplied directories.
pub fn upload_name(filename: &str) -> String {
    Path::new(filename)
        .file_name()
        .and_then(|name| name.to_str())
        .filter(|name| !name.is_empty())
        .unwrap_or("uploaded")
        .to_string()
}

/// Source label for an uploaded file name.
///
/// Compound labels the registry knows (`tar.gz`) win over the last
/// extension. A name with no extension is rejected.
pub fn detect_source_format(
    filename: &str,
    registry: &ConversionRegistry,
) -> Result<String, ConvertError> {
    let name = upload_name(filename).to_lowercase();

    let compound = registry
        .labels()
        .into_iter()
        .filter(|label| label.contains('.'))
        .filter(|label| name.len() > label.len() + 1 && name.ends_with(&format!(".{}", label)))
        .max_by_key(|label| label.len());
    if let Some(label) = compound {
        return Ok(label);
    }

    Path::new(&name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(normalize_label)
        .filter(|ext| !ext.is_empty())
        .ok_or(ConvertError::MissingExtension)
}

/// `{stem}.{target}` where the stem drops the detected source label.
pub fn output_filename(source_name: &str, source_format: &str, target_format: &str) -> String {
    let name = upload_name(source_name);
    let suffix_len = source_format.len() + 1;

    let stem = if name.len() > suffix_len
        && name.is_char_boundary(name.len() - suffix_len)
        && name[name.len() - suffix_len..].eq_ignore_ascii_case(&format!(".{}", source_format))
    {
        &name[..name.len() - suffix_len]
    } else {
        Path::new(&name)
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or("converted")
    };

    format!("{}.{}", stem, target_format)
}
