//! In-process rendering of OOXML, PDF and plain text into the markup shape
//! the extraction server produces.
//!
//! Archive members are read with a size cap; sheet count and cells per sheet
//! are bounded.

use std::collections::HashMap;
use std::io::Read;

use async_trait::async_trait;
use quick_xml::escape::escape;
use quick_xml::events::Event;
use tracing::warn;

use super::{DocumentParser, ParseError, ParsedDocument};
use crate::extract::{MIME_DOCX, MIME_PDF, MIME_TEXT, MIME_XLSX};

const XLSX_MAX_SHEETS: usize = 100;
const XLSX_MAX_CELLS_PER_SHEET: usize = 100_000;
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;

type Archive<'a> = zip::ZipArchive<std::io::Cursor<&'a [u8]>>;

#[derive(Debug, Clone, Copy, Default)]
pub struct LocalParser;

impl LocalParser {
    pub fn new() -> Self {
        Self
    }

    /// Renders `bytes` synchronously.
    pub fn render(&self, bytes: &[u8], media_type: &str) -> Result<ParsedDocument, ParseError> {
        if bytes.is_empty() {
            return Err(ParseError::Empty);
        }
        let markup = match media_type {
            MIME_XLSX => render_xlsx(bytes)?,
            MIME_DOCX => render_docx(bytes)?,
            MIME_PDF => render_pdf(bytes)?,
            MIME_TEXT => render_text(bytes),
            other => return Err(ParseError::Unsupported(other.to_string())),
        };
        Ok(ParsedDocument { markup })
    }
}

#[async_trait]
impl DocumentParser for LocalParser {
    async fn parse(&self, bytes: Vec<u8>, media_type: &str) -> Result<ParsedDocument, ParseError> {
        let media_type = media_type.to_string();
        tokio::task::spawn_blocking(move || LocalParser.render(&bytes, &media_type))
            .await
            .map_err(|e| ParseError::Failed(e.to_string()))?
    }
}

fn ooxml_err(e: impl std::fmt::Display) -> ParseError {
    ParseError::Failed(format!("OOXML: {}", e))
}

fn document(title: Option<&str>, body: &str) -> String {
    let mut out = String::from("<html xmlns=\"http://www.w3.org/1999/xhtml\"><head>");
    if let Some(t) = title {
        out.push_str("<meta name=\"dc:title\" content=\"");
        out.push_str(&escape(t));
        out.push_str("\"/>");
    }
    out.push_str("</head><body>");
    out.push_str(body);
    out.push_str("</body></html>");
    out
}

fn read_entry(archive: &mut Archive<'_>, name: &str) -> Result<Option<Vec<u8>>, ParseError> {
    let entry = match archive.by_name(name) {
        Ok(e) => e,
        Err(zip::result::ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(ooxml_err(e)),
    };
    let mut out = Vec::new();
    entry
        .take(MAX_XML_ENTRY_BYTES)
        .read_to_end(&mut out)
        .map_err(ooxml_err)?;
    if out.len() as u64 >= MAX_XML_ENTRY_BYTES {
        return Err(ooxml_err(format!("{} exceeds size limit", name)));
    }
    Ok(Some(out))
}

/// `dc:title` from `docProps/core.xml`, if set.
fn core_title(archive: &mut Archive<'_>) -> Result<Option<String>, ParseError> {
    let Some(xml) = read_entry(archive, "docProps/core.xml")? else {
        return Ok(None);
    };
    let mut reader = quick_xml::Reader::from_reader(xml.as_slice());
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut in_title = false;
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"title" => in_title = true,
            Ok(Event::Text(te)) if in_title => {
                let t = te.unescape().unwrap_or_default().trim().to_string();
                return Ok((!t.is_empty()).then_some(t));
            }
            Ok(Event::End(_)) => in_title = false,
            Ok(Event::Eof) => break,
            Err(e) => return Err(ooxml_err(e)),
            _ => {}
        }
        buf.clear();
    }
    Ok(None)
}

// ── xlsx ────────────────────────────────────────────────────────────────

fn render_xlsx(bytes: &[u8]) -> Result<String, ParseError> {
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes)).map_err(ooxml_err)?;
    let shared = read_shared_strings(&mut archive)?;
    let sheets = list_sheets(&mut archive)?;
    let title = core_title(&mut archive)?;

    let mut body = String::new();
    for (name, member) in sheets.into_iter().take(XLSX_MAX_SHEETS) {
        let Some(xml) = read_entry(&mut archive, &member)? else {
            continue;
        };
        let rows = sheet_rows(&name, &xml, &shared)?;
        body.push_str("<div class=\"page\"><h1>");
        body.push_str(&escape(name.as_str()));
        body.push_str("</h1><table><tbody>");
        for row in rows {
            body.push_str("<tr>");
            for cell in row {
                body.push_str("<td>");
                body.push_str(&escape(cell.as_str()));
                body.push_str("</td>");
            }
            body.push_str("</tr>");
        }
        body.push_str("</tbody></table></div>");
    }
    Ok(document(title.as_deref(), &body))
}

fn read_shared_strings(archive: &mut Archive<'_>) -> Result<Vec<String>, ParseError> {
    let Some(xml) = read_entry(archive, "xl/sharedStrings.xml")? else {
        return Ok(Vec::new());
    };
    let mut strings = Vec::new();
    let mut reader = quick_xml::Reader::from_reader(xml.as_slice());
    let mut buf = Vec::new();
    let mut current: Option<String> = None;
    let mut in_t = false;
    // Phonetic guides (`rPh`) carry readings, not cell text.
    let mut in_rph = false;
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"si" => current = Some(String::new()),
                b"t" => in_t = true,
                b"rPh" => in_rph = true,
                _ => {}
            },
            Ok(Event::Text(te)) if in_t && !in_rph => {
                if let Some(s) = current.as_mut() {
                    s.push_str(te.unescape().unwrap_or_default().as_ref());
                }
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"si" => strings.extend(current.take()),
                b"t" => in_t = false,
                b"rPh" => in_rph = false,
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(ooxml_err(e)),
            _ => {}
        }
        buf.clear();
    }
    Ok(strings)
}

fn attr_map(e: &quick_xml::events::BytesStart<'_>) -> HashMap<String, String> {
    e.attributes()
        .flatten()
        .map(|a| {
            (
                String::from_utf8_lossy(a.key.local_name().as_ref()).into_owned(),
                a.unescape_value().unwrap_or_default().into_owned(),
            )
        })
        .collect()
}

/// Sheet names with their archive member, in workbook order.
///
/// Falls back to numbered `xl/worksheets/sheetN.xml` members when the
/// workbook part is missing.
fn list_sheets(archive: &mut Archive<'_>) -> Result<Vec<(String, String)>, ParseError> {
    let workbook = read_entry(archive, "xl/workbook.xml")?;
    let rels = read_entry(archive, "xl/_rels/workbook.xml.rels")?;

    if let Some(wb) = workbook {
        let mut targets: HashMap<String, String> = HashMap::new();
        if let Some(rels) = rels {
            let mut reader = quick_xml::Reader::from_reader(rels.as_slice());
            let mut buf = Vec::new();
            loop {
                match reader.read_event_into(&mut buf) {
                    Ok(Event::Start(e)) | Ok(Event::Empty(e))
                        if e.local_name().as_ref() == b"Relationship" =>
                    {
                        let a = attr_map(&e);
                        if let (Some(id), Some(target)) = (a.get("Id"), a.get("Target")) {
                            let member = match target.strip_prefix('/') {
                                Some(abs) => abs.to_string(),
                                None => format!("xl/{}", target),
                            };
                            targets.insert(id.clone(), member);
                        }
                    }
                    Ok(Event::Eof) => break,
                    Err(e) => return Err(ooxml_err(e)),
                    _ => {}
                }
                buf.clear();
            }
        }

        let mut sheets = Vec::new();
        let mut reader = quick_xml::Reader::from_reader(wb.as_slice());
        let mut buf = Vec::new();
        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) | Ok(Event::Empty(e)) if e.local_name().as_ref() == b"sheet" => {
                    let a = attr_map(&e);
                    let name = a.get("name").cloned().unwrap_or_default();
                    let member = a
                        .get("id")
                        .and_then(|rid| targets.get(rid).cloned())
                        .unwrap_or_else(|| format!("xl/worksheets/sheet{}.xml", sheets.len() + 1));
                    sheets.push((name, member));
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(ooxml_err(e)),
                _ => {}
            }
            buf.clear();
        }
        return Ok(sheets);
    }

    let mut members: Vec<String> = archive
        .file_names()
        .filter(|n| n.starts_with("xl/worksheets/sheet") && n.ends_with(".xml"))
        .map(str::to_string)
        .collect();
    members.sort_by_key(|m| {
        m.trim_start_matches("xl/worksheets/sheet")
            .trim_end_matches(".xml")
            .parse::<u32>()
            .unwrap_or(u32::MAX)
    });
    Ok(members
        .into_iter()
        .enumerate()
        .map(|(i, m)| (format!("Sheet{}", i + 1), m))
        .collect())
}

/// Cell texts per `<row>`, in document order. Rows without cells are kept
/// as empty rows.
fn sheet_rows(
    sheet: &str,
    xml: &[u8],
    shared: &[String],
) -> Result<Vec<Vec<String>>, ParseError> {
    let mut rows: Vec<Vec<String>> = Vec::new();
    let mut reader = quick_xml::Reader::from_reader(xml);
    let mut buf = Vec::new();

    let mut cell_type = String::new();
    let mut cell: Option<String> = None;
    let mut in_text = false;
    let mut in_rph = false;
    let mut cells = 0usize;

    loop {
        if cells >= XLSX_MAX_CELLS_PER_SHEET {
            warn!(
                sheet,
                limit = XLSX_MAX_CELLS_PER_SHEET,
                "cell limit reached, remaining rows dropped"
            );
            break;
        }
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"row" => rows.push(Vec::new()),
                b"c" => {
                    cell_type = attr_map(&e).remove("t").unwrap_or_default();
                    cell = Some(String::new());
                }
                b"v" | b"t" => in_text = true,
                b"rPh" => in_rph = true,
                _ => {}
            },
            Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                b"row" => rows.push(Vec::new()),
                b"c" => {
                    if let Some(r) = rows.last_mut() {
                        r.push(String::new());
                        cells += 1;
                    }
                }
                _ => {}
            },
            Ok(Event::Text(te)) if in_text && !in_rph => {
                if let Some(c) = cell.as_mut() {
                    c.push_str(te.unescape().unwrap_or_default().as_ref());
                }
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"v" | b"t" => in_text = false,
                b"rPh" => in_rph = false,
                b"c" => {
                    let raw = cell.take().unwrap_or_default();
                    let value = match cell_type.as_str() {
                        "s" => raw
                            .trim()
                            .parse::<usize>()
                            .ok()
                            .and_then(|i| shared.get(i).cloned())
                            .unwrap_or_default(),
                        "b" => {
                            if raw.trim() == "1" {
                                "TRUE".to_string()
                            } else {
                                "FALSE".to_string()
                            }
                        }
                        _ => raw,
                    };
                    if let Some(r) = rows.last_mut() {
                        r.push(value);
                        cells += 1;
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(ooxml_err(e)),
            _ => {}
        }
        buf.clear();
    }
    Ok(rows)
}

// ── docx ────────────────────────────────────────────────────────────────

fn render_docx(bytes: &[u8]) -> Result<String, ParseError> {
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes)).map_err(ooxml_err)?;
    let xml = read_entry(&mut archive, "word/document.xml")?
        .ok_or_else(|| ooxml_err("word/document.xml not found"))?;
    let title = core_title(&mut archive)?;

    let mut body = String::new();
    let mut reader = quick_xml::Reader::from_reader(xml.as_slice());
    let mut buf = Vec::new();
    // Open paragraphs, innermost last. Text boxes nest `w:p` inside a run.
    let mut paras: Vec<String> = Vec::new();
    let mut in_t = false;
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"p" => paras.push(String::new()),
                b"t" => in_t = true,
                _ => {}
            },
            Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                b"tab" | b"br" => {
                    if let Some(p) = paras.last_mut() {
                        p.push(' ');
                    }
                }
                b"p" => body.push_str("<p></p>"),
                _ => {}
            },
            Ok(Event::Text(te)) if in_t => {
                if let Some(p) = paras.last_mut() {
                    p.push_str(te.unescape().unwrap_or_default().as_ref());
                }
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_t = false,
                b"p" => {
                    if let Some(p) = paras.pop() {
                        body.push_str("<p>");
                        body.push_str(&escape(p.as_str()));
                        body.push_str("</p>");
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(ooxml_err(e)),
            _ => {}
        }
        buf.clear();
    }
    Ok(document(title.as_deref(), &body))
}

// ── pdf / text ──────────────────────────────────────────────────────────

fn render_pdf(bytes: &[u8]) -> Result<String, ParseError> {
    let pages = pdf_extract::extract_text_from_mem_by_pages(bytes)
        .map_err(|e| ParseError::Failed(format!("PDF: {}", e)))?;
    Ok(document(None, &pages_markup(&pages)))
}

fn pages_markup<S: AsRef<str>>(pages: &[S]) -> String {
    let mut body = String::new();
    for page in pages {
        body.push_str("<div class=\"page\"><p>");
        body.push_str(&escape(page.as_ref()));
        body.push_str("</p></div>");
    }
    body
}

/// Blank-line separated blocks become paragraphs.
fn render_text(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes).replace("\r\n", "\n");
    let mut body = String::new();
    for block in text.split("\n\n") {
        let block = block.trim();
        if block.is_empty() {
            continue;
        }
        body.push_str("<p>");
        body.push_str(&escape(block));
        body.push_str("</p>");
    }
    document(None, &body)
}
