//! The built-in adapter table.

use tracing::info;

use super::adapter::AdapterRef;
use super::archive::{tar_gz_to_zip, zip_to_tar_gz};
use super::document::{docx_to_txt, pdf_to_docx, pdf_to_txt, txt_to_docx, txt_to_pdf};
use super::external::{ffmpeg_adapter, locate_tool, rsvg_adapter, soffice_adapter, RSVG_CANDIDATES};
use super::office::{pptx_to_txt, xlsx_to_csv};
use super::raster::{convert_raster, image_to_pdf, RASTER_FORMATS};
use super::text_image::{docx_to_png, txt_to_png};
use crate::config::ConvertersConfig;
use crate::registry::{ConversionRegistry, RegistryBuilder};

/// One row of the adapter table.
pub struct EdgeSpec {
    pub source: &'static str,
    pub target: &'static str,
    pub adapter: AdapterRef,
    pub note: Option<String>,
}

impl EdgeSpec {
    fn new(
        source: &'static str,
        target: &'static str,
        adapter: AdapterRef,
        note: impl Into<String>,
    ) -> Self {
        Self {
            source,
            target,
            adapter,
            note: Some(note.into()),
        }
    }
}

const FFMPEG_JOBS: &[(&str, &str, &[&str], &str)] = &[
    (
        "mp4",
        "gif",
        &["-vf", "fps=10,scale=480:-1:flags=lanczos"],
        "Convert MP4 to GIF using FFmpeg",
    ),
    (
        "mp4",
        "mp3",
        &["-vn", "-codec:a", "libmp3lame", "-q:a", "2"],
        "Extract audio from MP4 via FFmpeg",
    ),
    ("mp3", "wav", &[], "Convert MP3 to WAV via FFmpeg"),
    (
        "wav",
        "mp3",
        &["-codec:a", "libmp3lame", "-q:a", "2"],
        "Convert WAV to MP3 via FFmpeg",
    ),
];

const SOFFICE_JOBS: &[(&str, &str)] = &[("docx", "pdf"), ("pptx", "pdf"), ("xlsx", "pdf")];

const SVG_TARGETS: &[&str] = &["png", "pdf"];

/// Enumerates every built-in edge.
///
/// Tool-backed edges are always listed; their note says whether the host
/// binary was found when the table was built.
pub fn builtin_edges(config: &ConvertersConfig) -> Vec<EdgeSpec> {
    let mut edges = vec![
        EdgeSpec::new("docx", "txt", AdapterRef::new(docx_to_txt), "Extracts plain text from DOCX"),
        EdgeSpec::new("pdf", "txt", AdapterRef::new(pdf_to_txt), "Extracts text from PDF pages"),
        EdgeSpec::new("pdf", "docx", AdapterRef::new(pdf_to_docx), "Creates DOCX with extracted text"),
        EdgeSpec::new("txt", "pdf", AdapterRef::new(txt_to_pdf), "Wraps plaintext into PDF"),
        EdgeSpec::new("txt", "docx", AdapterRef::new(txt_to_docx), "Wraps plaintext into DOCX"),
        EdgeSpec::new("txt", "png", AdapterRef::new(txt_to_png), "Renders plaintext into PNG"),
        EdgeSpec::new("docx", "png", AdapterRef::new(docx_to_png), "Text rendered into PNG (no layout)"),
        EdgeSpec::new("pptx", "txt", AdapterRef::new(pptx_to_txt), "Extract slides text from PPTX into plain text"),
        EdgeSpec::new("xlsx", "csv", AdapterRef::new(xlsx_to_csv), "Extracts first sheet to CSV"),
        EdgeSpec::new("png", "pdf", AdapterRef::new(image_to_pdf), "Embeds image into single-page PDF"),
        EdgeSpec::new("zip", "tar.gz", AdapterRef::new(zip_to_tar_gz), "Repackages ZIP entries into tar.gz"),
        EdgeSpec::new("tar.gz", "zip", AdapterRef::new(tar_gz_to_zip), "Repackages tar.gz entries into ZIP"),
    ];

    let raster = AdapterRef::new(convert_raster);
    for &source in RASTER_FORMATS {
        for &target in RASTER_FORMATS {
            if source != target {
                edges.push(EdgeSpec::new(source, target, raster.clone(), "Re-encode via image"));
            }
        }
    }

    let soffice_found = locate_tool(config.soffice_path.as_deref(), &["soffice", "libreoffice"]).is_some();
    for &(source, target) in SOFFICE_JOBS {
        let note = if soffice_found {
            format!("High-fidelity {}->{} via LibreOffice", source.to_uppercase(), target.to_uppercase())
        } else {
            "Requires LibreOffice installed on host".to_string()
        };
        edges.push(EdgeSpec::new(
            source,
            target,
            soffice_adapter(config.soffice_path.clone(), source, target),
            note,
        ));
    }

    let ffmpeg_found = locate_tool(Some(config.ffmpeg_path.as_path()), &["ffmpeg"]).is_some();
    for &(source, target, args, note) in FFMPEG_JOBS {
        let note = if ffmpeg_found {
            note.to_string()
        } else {
            "Requires FFmpeg installed on host".to_string()
        };
        edges.push(EdgeSpec::new(
            source,
            target,
            ffmpeg_adapter(config.ffmpeg_path.clone(), source, target, args),
            note,
        ));
    }

    let rsvg_found = locate_tool(config.rsvg_path.as_deref(), RSVG_CANDIDATES).is_some();
    for &target in SVG_TARGETS {
        let note = if rsvg_found {
            format!("Render SVG to {} via rsvg-convert", target.to_uppercase())
        } else {
            "Requires rsvg-convert (librsvg) installed on host".to_string()
        };
        edges.push(EdgeSpec::new(
            "svg",
            target,
            rsvg_adapter(config.rsvg_path.clone(), target),
            note,
        ));
    }

    info!(
        edges = edges.len(),
        libreoffice = soffice_found,
        ffmpeg = ffmpeg_found,
        rsvg = rsvg_found,
        "Built-in converters enumerated"
    );
    edges
}

/// Builds the process-wide registry from the built-in table.
pub fn builtin_registry(config: &ConvertersConfig) -> ConversionRegistry {
    let mut builder = RegistryBuilder::new();
    for edge in builtin_edges(config) {
        builder.register(edge.source, edge.target, edge.adapter, edge.note.as_deref());
    }
    builder.build()
}
