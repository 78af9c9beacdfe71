//! Text document adapters: docx, pdf and plain text.

use std::io::{Cursor, Read, Seek, Write};

use lopdf::{dictionary, Document, Object, Stream};
use quick_xml::events::Event;
use quick_xml::Reader;
use zip::write::SimpleFileOptions;
use zip::ZipArchive;

use super::adapter::Converted;
use super::error::AdapterError;
use super::limits::ExpansionBudget;

pub const TEXT_MIME: &str = "text/plain; charset=utf-8";
pub const PDF_MIME: &str = "application/pdf";
pub const DOCX_MIME: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

const LINES_PER_PAGE: usize = 50;

/// docx -> txt
pub fn docx_to_txt(content: &[u8], _hint: &str) -> Result<Converted, AdapterError> {
    let text = extract_docx_text(content)?;
    Ok(Converted::new(text.into_bytes(), TEXT_MIME))
}

/// pdf -> txt
pub fn pdf_to_txt(content: &[u8], _hint: &str) -> Result<Converted, AdapterError> {
    let text = extract_pdf_text(content)?;
    Ok(Converted::new(text.into_bytes(), TEXT_MIME))
}

/// txt -> pdf
pub fn txt_to_pdf(content: &[u8], _hint: &str) -> Result<Converted, AdapterError> {
    let text = String::from_utf8_lossy(content);
    Ok(Converted::new(render_text_pdf(&text)?, PDF_MIME))
}

/// txt -> docx
pub fn txt_to_docx(content: &[u8], _hint: &str) -> Result<Converted, AdapterError> {
    let text = String::from_utf8_lossy(content);
    Ok(Converted::new(write_docx(&text)?, DOCX_MIME))
}

/// pdf -> docx, text only.
pub fn pdf_to_docx(content: &[u8], _hint: &str) -> Result<Converted, AdapterError> {
    let text = extract_pdf_text(content)?;
    Ok(Converted::new(write_docx(&text)?, DOCX_MIME))
}

/// Reads one XML part of an OOXML package, charging it to `budget`.
pub(crate) fn read_zip_entry<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    name: &str,
    format: &str,
    budget: &mut ExpansionBudget,
) -> Result<String, AdapterError> {
    let mut entry = archive
        .by_name(name)
        .map_err(|e| AdapterError::decode(format, format!("missing {}: {}", name, e)))?;

    let declared = entry.size();
    let data = budget.read(&mut entry, declared, format, name)?;
    String::from_utf8(data)
        .map_err(|e| AdapterError::decode(format, format!("{} is not UTF-8: {}", name, e)))
}

pub(crate) fn extract_docx_text(content: &[u8]) -> Result<String, AdapterError> {
    let mut archive = ZipArchive::new(Cursor::new(content))
        .map_err(|e| AdapterError::decode("docx", format!("not a zip container: {}", e)))?;

    let xml = read_zip_entry(
        &mut archive,
        "word/document.xml",
        "docx",
        &mut ExpansionBudget::default(),
    )?;
    collect_paragraph_text(&xml, "docx")
}

/// Collects `<t>` runs, emitting a newline at the end of each `<p>`.
///
/// Works for both WordprocessingML and DrawingML since they share the
/// local names.
pub(crate) fn collect_paragraph_text(xml: &str, format: &str) -> Result<String, AdapterError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);

    let mut text = String::new();
    let mut in_text_element = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                if e.local_name().as_ref() == b"t" {
                    in_text_element = true;
                }
            }
            Ok(Event::Empty(ref e)) => match e.local_name().as_ref() {
                b"tab" => text.push('\t'),
                b"br" | b"p" => text.push('\n'),
                _ => {}
            },
            Ok(Event::End(ref e)) => match e.local_name().as_ref() {
                b"t" => in_text_element = false,
                b"p" => text.push('\n'),
                _ => {}
            },
            Ok(Event::Text(e)) => {
                if in_text_element {
                    let decoded = e.decode().unwrap_or_default();
                    text.push_str(&decoded);
                }
            }
            Ok(Event::GeneralRef(e)) => {
                if in_text_element {
                    if let Some(c) = resolve_entity(&e) {
                        text.push(c);
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(AdapterError::decode(
                    format,
                    format!("XML parsing error: {}", e),
                ));
            }
            _ => {}
        }
    }

    Ok(text)
}

/// Resolves a character or predefined entity reference.
pub(crate) fn resolve_entity(e: &quick_xml::events::BytesRef<'_>) -> Option<char> {
    if let Ok(Some(c)) = e.resolve_char_ref() {
        return Some(c);
    }
    match e.decode().ok()?.as_ref() {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        _ => None,
    }
}

pub(crate) fn extract_pdf_text(content: &[u8]) -> Result<String, AdapterError> {
    let doc = Document::load_mem(content).map_err(|e| AdapterError::decode("pdf", e))?;

    let mut text = String::new();
    for (page_num, _) in doc.get_pages() {
        if let Ok(page_text) = doc.extract_text(&[page_num]) {
            text.push_str(&page_text);
            if !page_text.ends_with('\n') {
                text.push('\n');
            }
        }
    }

    Ok(text)
}

/// Renders plain text to a Letter-sized PDF with Helvetica, paging every
/// fifty lines.
pub(crate) fn render_text_pdf(text: &str) -> Result<Vec<u8>, AdapterError> {
    let mut doc = Document::with_version("1.5");

    let pages_id = doc.new_object_id();
    let font_id = doc.new_object_id();
    let resources_id = doc.new_object_id();

    doc.objects.insert(
        font_id,
        Object::Dictionary(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "Encoding" => "WinAnsiEncoding",
        }),
    );

    doc.objects.insert(
        resources_id,
        Object::Dictionary(dictionary! {
            "Font" => dictionary! {
                "F1" => font_id,
            },
        }),
    );

    let lines: Vec<&str> = text.lines().collect();
    let page_count = lines.len().div_ceil(LINES_PER_PAGE).max(1);

    let mut page_ids = Vec::with_capacity(page_count);
    for page_num in 0..page_count {
        let start = (page_num * LINES_PER_PAGE).min(lines.len());
        let end = ((page_num + 1) * LINES_PER_PAGE).min(lines.len());

        let content_id = doc.new_object_id();
        let page_id = doc.new_object_id();

        let stream = Stream::new(dictionary! {}, text_content_stream(&lines[start..end]).into_bytes());
        doc.objects.insert(content_id, Object::Stream(stream));

        doc.objects.insert(
            page_id,
            Object::Dictionary(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
                "Resources" => resources_id,
                "Contents" => content_id,
            }),
        );
        page_ids.push(page_id);
    }

    let kids: Vec<Object> = page_ids.iter().map(|id| (*id).into()).collect();
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => page_ids.len() as i64,
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)
        .map_err(|e| AdapterError::encode("pdf", e))?;
    Ok(buffer)
}

fn text_content_stream(lines: &[&str]) -> String {
    let mut content = String::from("BT\n/F1 11 Tf\n50 742 Td\n14 TL\n");
    for line in lines {
        content.push_str(&format!("({}) Tj T*\n", escape_pdf_string(line)));
    }
    content.push_str("ET\n");
    content
}

fn escape_pdf_string(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            '(' => "\\(".to_string(),
            ')' => "\\)".to_string(),
            '\\' => "\\\\".to_string(),
            c if c.is_ascii() && !c.is_control() => c.to_string(),
            _ => " ".to_string(),
        })
        .collect()
}

/// Writes a minimal WordprocessingML package, one paragraph per line.
pub(crate) fn write_docx(text: &str) -> Result<Vec<u8>, AdapterError> {
    let mut body = String::new();
    for line in text.lines() {
        if line.is_empty() {
            body.push_str("<w:p/>");
        } else {
            body.push_str(&format!(
                "<w:p><w:r><w:t xml:space=\"preserve\">{}</w:t></w:r></w:p>",
                escape_xml(line)
            ));
        }
    }

    let document = format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
<w:document xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\">\
<w:body>{}</w:body></w:document>",
        body
    );

    write_package(&[
        ("[Content_Types].xml", DOCX_CONTENT_TYPES),
        ("_rels/.rels", DOCX_RELS),
        ("word/document.xml", &document),
    ])
    .map_err(|e| AdapterError::encode("docx", e))
}

/// Zips `(path, body)` pairs into an in-memory package.
pub(crate) fn write_package(entries: &[(&str, &str)]) -> Result<Vec<u8>, zip::result::ZipError> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();

    for (name, body) in entries {
        writer.start_file(*name, options)?;
        writer.write_all(body.as_bytes())?;
    }

    Ok(writer.finish()?.into_inner())
}

pub(crate) fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\t' => out.push(' '),
            c if c.is_control() => {}
            c => out.push(c),
        }
    }
    out
}

const DOCX_CONTENT_TYPES: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
<Types xmlns=\"http://schemas.openxmlformats.org/package/2006/content-types\">\
<Default Extension=\"rels\" ContentType=\"application/vnd.openxmlformats-package.relationships+xml\"/>\
<Default Extension=\"xml\" ContentType=\"application/xml\"/>\
<Override PartName=\"/word/document.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml\"/>\
</Types>";

const DOCX_RELS: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
<Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">\
<Relationship Id=\"rId1\" Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument\" Target=\"word/document.xml\"/>\
</Relationships>";
