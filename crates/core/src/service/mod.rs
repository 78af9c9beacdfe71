//! The conversion service: one entry point per request type.

mod conversion;
mod error;
mod naming;

pub use conversion::{
    ArtifactDelivery, ConversionResult, ConversionService, ConvertRequest, ServiceSettings,
    ShareLink,
};
pub use error::{ConvertError, ErrorKind};
pub use naming::{detect_source_format, output_filename, upload_name};
