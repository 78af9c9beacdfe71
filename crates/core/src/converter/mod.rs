//! Single-hop format adapters.
//!
//! Every adapter has the same shape, `(content, target_hint) -> (bytes, mime)`,
//! and is stored as an [`AdapterRef`] on one registry edge. Adapters are
//! synchronous and may block on decoding or on a host subprocess; callers
//! run them on a blocking worker.
//!
//! # Features
//!
//! - Text documents: docx, pdf, txt, plus docx/txt rendered into png
//! - Office text extraction: pptx slides, first xlsx sheet
//! - Raster images: png, jpg/jpeg, webp, bmp, gif, plus png into pdf
//! - Archives: zip and tar.gz repacking
//! - Host tools: LibreOffice office-to-pdf, FFmpeg audio/video, rsvg-convert
//!   for svg to png/pdf
//!
//! # Example
//!
//! ```ignore
//! use omniconvert_core::converter::builtin_registry;
//! use omniconvert_core::config::ConvertersConfig;
//!
//! let registry = builtin_registry(&ConvertersConfig::default());
//! let adapter = registry.resolve("txt", "pdf")?;
//! let converted = adapter.convert(b"hello", "pdf")?;
//! assert!(converted.content.starts_with(b"%PDF"));
//! ```

mod adapter;
mod archive;
mod builtin;
pub(crate) mod document;
mod error;
mod external;
mod limits;
mod office;
mod raster;
mod text_image;

pub use adapter::{AdapterFn, AdapterRef, Converted, DEFAULT_MIME_TYPE};
pub use archive::{tar_gz_to_zip, zip_to_tar_gz};
pub use builtin::{builtin_edges, builtin_registry, EdgeSpec};
pub use document::{docx_to_txt, pdf_to_docx, pdf_to_txt, txt_to_docx, txt_to_pdf};
pub use error::AdapterError;
pub use external::{ffmpeg_adapter, locate_tool, rsvg_adapter, soffice_adapter};
pub use office::{pptx_to_txt, xlsx_to_csv};
pub use raster::{convert_raster, image_to_pdf, RASTER_FORMATS};
pub use text_image::{docx_to_png, txt_to_png};
