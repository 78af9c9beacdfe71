//! Presentation and spreadsheet text extraction.

use std::io::Cursor;

use quick_xml::events::Event;
use quick_xml::Reader;
use zip::ZipArchive;

use super::adapter::Converted;
use super::document::{collect_paragraph_text, read_zip_entry, resolve_entity, TEXT_MIME};
use super::error::AdapterError;
use super::limits::ExpansionBudget;

pub const CSV_MIME: &str = "text/csv; charset=utf-8";

/// Column count of a worksheet (`A` through `XFD`).
const MAX_COLUMNS: usize = 16_384;

/// Cells materialised for one sheet, counting the blanks that pad sparse rows.
const MAX_SHEET_CELLS: usize = 4_000_000;

/// pptx -> txt, one block per slide in slide order.
pub fn pptx_to_txt(content: &[u8], _hint: &str) -> Result<Converted, AdapterError> {
    let mut archive = ZipArchive::new(Cursor::new(content))
        .map_err(|e| AdapterError::decode("pptx", format!("not a zip container: {}", e)))?;

    let mut slides: Vec<(u32, String)> = archive
        .file_names()
        .filter_map(|name| {
            let number = name
                .strip_prefix("ppt/slides/slide")?
                .strip_suffix(".xml")?
                .parse::<u32>()
                .ok()?;
            Some((number, name.to_string()))
        })
        .collect();
    slides.sort_by_key(|(number, _)| *number);

    if slides.is_empty() {
        return Err(AdapterError::decode("pptx", "presentation has no slides"));
    }

    let mut budget = ExpansionBudget::default();
    let mut text = String::new();
    for (_, name) in &slides {
        let xml = read_zip_entry(&mut archive, name, "pptx", &mut budget)?;
        let slide_text = collect_paragraph_text(&xml, "pptx")?;
        if !text.is_empty() {
            text.push('\n');
        }
        text.push_str(&slide_text);
    }

    Ok(Converted::new(text.into_bytes(), TEXT_MIME))
}

/// xlsx -> csv for the first worksheet.
pub fn xlsx_to_csv(content: &[u8], _hint: &str) -> Result<Converted, AdapterError> {
    let mut archive = ZipArchive::new(Cursor::new(content))
        .map_err(|e| AdapterError::decode("xlsx", format!("not a zip container: {}", e)))?;

    let mut budget = ExpansionBudget::default();
    // Workbooks without any text cells omit the shared strings part.
    let shared = if archive.index_for_name("xl/sharedStrings.xml").is_some() {
        let xml = read_zip_entry(&mut archive, "xl/sharedStrings.xml", "xlsx", &mut budget)?;
        parse_shared_strings(&xml)?
    } else {
        Vec::new()
    };
    let sheet = read_zip_entry(&mut archive, "xl/worksheets/sheet1.xml", "xlsx", &mut budget)?;
    let rows = parse_sheet(&sheet, &shared)?;

    let mut csv = String::new();
    for row in rows {
        let line: Vec<String> = row.iter().map(|cell| csv_field(cell)).collect();
        csv.push_str(&line.join(","));
        csv.push_str("\r\n");
    }

    Ok(Converted::new(csv.into_bytes(), CSV_MIME))
}

fn parse_shared_strings(xml: &str) -> Result<Vec<String>, AdapterError> {
    let mut reader = Reader::from_str(xml);
    let mut strings = Vec::new();
    let mut current = String::new();
    let mut in_item = false;
    let mut in_text = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => match e.local_name().as_ref() {
                b"si" => {
                    in_item = true;
                    current.clear();
                }
                b"t" => in_text = in_item,
                _ => {}
            },
            Ok(Event::Empty(ref e)) if e.local_name().as_ref() == b"si" => {
                strings.push(String::new());
            }
            Ok(Event::End(ref e)) => match e.local_name().as_ref() {
                b"si" => {
                    strings.push(std::mem::take(&mut current));
                    in_item = false;
                }
                b"t" => in_text = false,
                _ => {}
            },
            Ok(Event::Text(e)) if in_text => {
                current.push_str(&e.decode().unwrap_or_default());
            }
            Ok(Event::GeneralRef(e)) if in_text => {
                if let Some(c) = resolve_entity(&e) {
                    current.push(c);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(AdapterError::decode("xlsx", format!("XML parsing error: {}", e))),
            _ => {}
        }
    }

    Ok(strings)
}

#[derive(Default)]
struct CellState {
    column: Option<usize>,
    shared: bool,
    value: String,
}

fn parse_sheet(xml: &str, shared: &[String]) -> Result<Vec<Vec<String>>, AdapterError> {
    let mut reader = Reader::from_str(xml);
    let mut rows: Vec<Vec<String>> = Vec::new();
    let mut row: Vec<String> = Vec::new();
    let mut cell: Option<CellState> = None;
    let mut in_value = false;
    let mut cells = 0usize;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => match e.local_name().as_ref() {
                b"row" => row.clear(),
                b"c" => {
                    let mut state = CellState::default();
                    for attr in e.attributes().flatten() {
                        let value = String::from_utf8_lossy(&attr.value);
                        match attr.key.local_name().as_ref() {
                            b"r" => state.column = column_index(&value)?,
                            b"t" => state.shared = value == "s",
                            _ => {}
                        }
                    }
                    cell = Some(state);
                }
                b"v" | b"t" => in_value = cell.is_some(),
                _ => {}
            },
            Ok(Event::End(ref e)) => match e.local_name().as_ref() {
                b"v" | b"t" => in_value = false,
                b"c" => {
                    if let Some(state) = cell.take() {
                        let text = if state.shared {
                            state
                                .value
                                .trim()
                                .parse::<usize>()
                                .ok()
                                .and_then(|i| shared.get(i).cloned())
                                .unwrap_or_default()
                        } else {
                            state.value
                        };
                        let index = state.column.unwrap_or(row.len());
                        if row.len() <= index {
                            cells += index + 1 - row.len();
                            if cells > MAX_SHEET_CELLS {
                                return Err(AdapterError::decode(
                                    "xlsx",
                                    format!("worksheet exceeds {} cells", MAX_SHEET_CELLS),
                                ));
                            }
                            row.resize(index + 1, String::new());
                        }
                        row[index] = text;
                    }
                }
                b"row" => rows.push(std::mem::take(&mut row)),
                _ => {}
            },
            Ok(Event::Empty(ref e)) if e.local_name().as_ref() == b"row" => rows.push(Vec::new()),
            Ok(Event::Text(e)) if in_value => {
                if let Some(state) = cell.as_mut() {
                    state.value.push_str(&e.decode().unwrap_or_default());
                }
            }
            Ok(Event::GeneralRef(e)) if in_value => {
                if let (Some(state), Some(c)) = (cell.as_mut(), resolve_entity(&e)) {
                    state.value.push(c);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(AdapterError::decode("xlsx", format!("XML parsing error: {}", e))),
            _ => {}
        }
    }

    Ok(rows)
}

/// Converts an A1-style reference ("C7") to a zero-based column index.
///
/// `Ok(None)` when the reference has no column letters.
fn column_index(reference: &str) -> Result<Option<usize>, AdapterError> {
    let mut index = 0usize;
    for c in reference.chars().take_while(|c| c.is_ascii_alphabetic()) {
        let digit = usize::from(c.to_ascii_uppercase() as u8 - b'A') + 1;
        index = index
            .checked_mul(26)
            .and_then(|i| i.checked_add(digit))
            .filter(|&i| i <= MAX_COLUMNS)
            .ok_or_else(|| {
                AdapterError::decode(
                    "xlsx",
                    format!("cell reference {} is beyond column XFD", reference),
                )
            })?;
    }
    Ok(index.checked_sub(1))
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
