//! Word (DOCX) extraction

use quick_xml::events::Event;
use quick_xml::Reader;

use super::ooxml::{self, attr, xml_error};
use super::{ExtractionDepth, Extracted};
use crate::domain::document::{Section, TableData};
use crate::domain::parser::ParseError;

const DOCUMENT_PART: &str = "word/document.xml";

/// Heading level implied by a paragraph style id such as `Heading2` or `Title`
fn heading_level(style: &str) -> Option<u8> {
    let lower = style.to_ascii_lowercase();

    if lower == "title" {
        return Some(1);
    }

    let rest = lower.strip_prefix("heading")?.trim();
    rest.parse::<u8>().ok().map(|level| level.clamp(1, 6))
}

#[derive(Default)]
struct TableState {
    depth: usize,
    rows: Vec<Vec<String>>,
    row: Vec<String>,
    cell: String,
}

fn page_count(package: &mut ooxml::Package<'_>) -> Option<u32> {
    let xml = ooxml::read_optional_part(package, "docProps/app.xml").ok()??;
    let start = xml.find("<Pages>")? + "<Pages>".len();
    let end = xml[start..].find("</Pages>")? + start;
    xml[start..end].trim().parse().ok()
}

pub fn extract(content: &[u8], depth: ExtractionDepth) -> Result<Extracted, ParseError> {
    let mut package = ooxml::open(content)?;
    let xml = ooxml::read_part(&mut package, DOCUMENT_PART)?;
    let rels = if depth.images {
        ooxml::relationships(&mut package, "word/_rels/document.xml.rels", "word")
    } else {
        Default::default()
    };

    let mut extracted = Extracted {
        properties: ooxml::core_properties(&mut package),
        page_count: page_count(&mut package),
        ..Default::default()
    };

    let mut reader = Reader::from_str(&xml);
    let mut body: Vec<String> = Vec::new();
    let mut paragraph = String::new();
    let mut style: Option<String> = None;
    let mut in_text = false;
    let mut table = TableState::default();
    let mut pending_alt: Option<String> = None;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| xml_error(DOCUMENT_PART, e))?;

        match event {
            Event::Start(e) if e.name().as_ref() == b"w:t" => in_text = true,
            Event::Start(e) | Event::Empty(e) => match e.name().as_ref() {
                b"w:p" => {
                    paragraph.clear();
                    style = None;
                }
                b"w:pStyle" => style = attr(&e, b"w:val"),
                b"w:tab" => paragraph.push('\t'),
                b"w:br" | b"w:cr" => paragraph.push('\n'),
                b"w:tbl" => {
                    table.depth += 1;
                    if table.depth == 1 {
                        table.rows.clear();
                    }
                }
                b"w:tr" if table.depth == 1 => table.row.clear(),
                b"w:tc" if table.depth == 1 => table.cell.clear(),
                b"wp:docPr" => pending_alt = attr(&e, b"descr"),
                b"a:blip" if depth.images => {
                    let rel_id = attr(&e, b"r:embed");
                    let image = ooxml::embedded_image(&mut package, &rels, rel_id.as_deref(), None)
                        .with_alt_text(pending_alt.take().unwrap_or_default());
                    extracted.images.push(image);
                }
                _ => {}
            },
            Event::Text(t) if in_text => {
                let text = t.unescape().map_err(|e| xml_error(DOCUMENT_PART, e))?;
                paragraph.push_str(&text);
            }
            Event::End(e) => match e.name().as_ref() {
                b"w:t" => in_text = false,
                b"w:p" => {
                    let text = paragraph.trim().to_string();

                    if table.depth > 0 {
                        if !table.cell.is_empty() && !text.is_empty() {
                            table.cell.push(' ');
                        }
                        table.cell.push_str(&text);
                    } else if !text.is_empty() {
                        if depth.structure {
                            if let Some(level) = style.as_deref().and_then(heading_level) {
                                extracted.structure.push(Section::new(text.clone(), level, None));
                            }
                        }
                        body.push(text);
                    }
                }
                b"w:tc" if table.depth == 1 => {
                    let cell = std::mem::take(&mut table.cell);
                    table.row.push(cell);
                }
                b"w:tr" if table.depth == 1 => {
                    let row = std::mem::take(&mut table.row);
                    if !row.is_empty() {
                        table.rows.push(row);
                    }
                }
                b"w:tbl" => {
                    table.depth = table.depth.saturating_sub(1);

                    if table.depth == 0 {
                        let rows = std::mem::take(&mut table.rows);

                        for row in &rows {
                            body.push(row.join("\t"));
                        }

                        if depth.tables && !rows.is_empty() {
                            extracted.tables.push(TableData::from_rows(rows, None));
                        }
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    if extracted.properties.title.is_none() {
        extracted.properties.title = extracted
            .structure
            .headings
            .iter()
            .find(|s| s.level == 1)
            .map(|s| s.text.clone());
    }

    extracted.text = body.join("\n");

    Ok(extracted)
}
