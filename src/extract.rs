//! Text extraction for binary document formats (PDF, OOXML).
//!
//! Loaders supply raw bytes; this module returns plain UTF-8 text. PDF and
//! PPTX extraction keep per-page / per-slide granularity so each unit can
//! become its own document with its number in the metadata.

use std::io::Read;
use thiserror::Error;

/// Maximum decompressed bytes to read from a single ZIP entry (zip-bomb protection).
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;

/// Extraction failure. Non-fatal during ingestion: the pipeline logs the
/// file and moves on.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("unsupported file type: {0}")]
    UnsupportedType(String),
    #[error("PDF extraction failed: {0}")]
    Pdf(String),
    #[error("OOXML extraction failed: {0}")]
    Ooxml(String),
}

/// Extract PDF text page by page. Page numbers are 1-based; blank pages
/// are skipped.
pub fn extract_pdf_pages(bytes: &[u8]) -> Result<Vec<(u32, String)>, ExtractError> {
    let pages = pdf_extract::extract_text_from_mem_by_pages(bytes)
        .map_err(|e| ExtractError::Pdf(e.to_string()))?;
    Ok(pages
        .into_iter()
        .enumerate()
        .filter(|(_, text)| !text.trim().is_empty())
        .map(|(i, text)| (i as u32 + 1, text))
        .collect())
}

/// Extract the body text of a DOCX (`word/document.xml`, `<w:t>` runs).
pub fn extract_docx(bytes: &[u8]) -> Result<String, ExtractError> {
    let mut archive = open_archive(bytes)?;
    let xml = read_zip_entry_bounded(&mut archive, "word/document.xml", MAX_XML_ENTRY_BYTES)
        .map_err(|_| ExtractError::Ooxml("word/document.xml not found".to_string()))?;
    extract_text_elements(&xml)
}

/// Extract PPTX slide texts in slide order, one string per slide.
///
/// Empty slides are skipped; slide numbers in the result are 1-based and
/// reflect the deck's own numbering.
pub fn extract_pptx_slides(bytes: &[u8]) -> Result<Vec<(u32, String)>, ExtractError> {
    let mut archive = open_archive(bytes)?;

    let mut slide_names: Vec<(u32, String)> = archive
        .file_names()
        .filter(|n| n.starts_with("ppt/slides/slide") && n.ends_with(".xml"))
        .filter_map(|name| {
            name.trim_start_matches("ppt/slides/slide")
                .trim_end_matches(".xml")
                .parse::<u32>()
                .ok()
                .map(|num| (num, name.to_string()))
        })
        .collect();
    slide_names.sort_by_key(|(num, _)| *num);

    let mut slides = Vec::new();
    for (num, name) in slide_names {
        let xml = read_zip_entry_bounded(&mut archive, &name, MAX_XML_ENTRY_BYTES)?;
        let text = extract_text_elements(&xml)?;
        if !text.trim().is_empty() {
            slides.push((num, text));
        }
    }
    Ok(slides)
}

fn open_archive(bytes: &[u8]) -> Result<zip::ZipArchive<std::io::Cursor<&[u8]>>, ExtractError> {
    zip::ZipArchive::new(std::io::Cursor::new(bytes)).map_err(|e| ExtractError::Ooxml(e.to_string()))
}

fn read_zip_entry_bounded(
    archive: &mut zip::ZipArchive<std::io::Cursor<&[u8]>>,
    name: &str,
    max_bytes: u64,
) -> Result<Vec<u8>, ExtractError> {
    let entry = archive
        .by_name(name)
        .map_err(|e| ExtractError::Ooxml(e.to_string()))?;
    let mut out = Vec::new();
    entry
        .take(max_bytes)
        .read_to_end(&mut out)
        .map_err(|e| ExtractError::Ooxml(e.to_string()))?;
    if out.len() as u64 >= max_bytes {
        return Err(ExtractError::Ooxml(format!(
            "ZIP entry {} exceeds size limit ({} bytes)",
            name, max_bytes
        )));
    }
    Ok(out)
}

/// Collect the contents of every `<w:t>` / `<a:t>` text element, joined
/// with spaces.
fn extract_text_elements(xml: &[u8]) -> Result<String, ExtractError> {
    let mut out = String::new();
    let mut reader = quick_xml::Reader::from_reader(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(quick_xml::events::Event::Start(e)) => {
                if e.local_name().as_ref() == b"t" {
                    if let Ok(quick_xml::events::Event::Text(te)) = reader.read_event_into(&mut buf)
                    {
                        if !out.is_empty() {
                            out.push(' ');
                        }
                        out.push_str(te.unescape().unwrap_or_default().as_ref());
                    }
                }
            }
            Ok(quick_xml::events::Event::Eof) => break,
            Err(e) => return Err(ExtractError::Ooxml(e.to_string())),
            _ => {}
        }
        buf.clear();
    }
    Ok(out)
}
