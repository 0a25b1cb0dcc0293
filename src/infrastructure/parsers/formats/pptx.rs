//! PowerPoint (PPTX) extraction; each slide counts as one page

use quick_xml::events::Event;
use quick_xml::Reader;

use super::ooxml::{self, attr, xml_error};
use super::{ExtractionDepth, Extracted};
use crate::domain::document::{Section, TableData};
use crate::domain::parser::ParseError;

/// Slide part names in presentation order
fn slide_parts(package: &ooxml::Package<'_>) -> Vec<(u32, String)> {
    let mut slides: Vec<(u32, String)> = package
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
    slides
}

#[derive(Default)]
struct SlideText {
    paragraphs: Vec<String>,
    title: Option<String>,
}

pub fn extract(content: &[u8], depth: ExtractionDepth) -> Result<Extracted, ParseError> {
    let mut package = ooxml::open(content)?;
    let slides = slide_parts(&package);

    if slides.is_empty() {
        return Err(ParseError::corrupt("Presentation contains no slides"));
    }

    let mut extracted = Extracted {
        properties: ooxml::core_properties(&mut package),
        page_count: Some(slides.len() as u32),
        ..Default::default()
    };
    let mut blocks: Vec<String> = Vec::new();

    for (page, (number, part)) in slides.iter().enumerate() {
        let page = page as u32 + 1;
        let xml = ooxml::read_part(&mut package, part)?;
        let rels = if depth.images {
            ooxml::relationships(
                &mut package,
                &format!("ppt/slides/_rels/slide{}.xml.rels", number),
                "ppt/slides",
            )
        } else {
            Default::default()
        };

        let mut reader = Reader::from_str(&xml);
        let mut slide = SlideText::default();
        let mut paragraph = String::new();
        let mut in_text = false;
        let mut is_title_shape = false;
        let mut table: Option<Vec<Vec<String>>> = None;
        let mut row: Vec<String> = Vec::new();
        let mut cell = String::new();
        let mut pending_alt: Option<String> = None;

        loop {
            let event = reader.read_event().map_err(|e| xml_error(part, e))?;

            match event {
                Event::Start(e) if e.name().as_ref() == b"a:t" => in_text = true,
                Event::Start(e) | Event::Empty(e) => match e.name().as_ref() {
                    b"p:sp" => is_title_shape = false,
                    b"p:ph" => {
                        is_title_shape = matches!(
                            attr(&e, b"type").as_deref(),
                            Some("title") | Some("ctrTitle")
                        );
                    }
                    b"a:p" => paragraph.clear(),
                    b"a:br" => paragraph.push('\n'),
                    b"a:tbl" => table = Some(Vec::new()),
                    b"a:tr" => row.clear(),
                    b"a:tc" => cell.clear(),
                    b"p:cNvPr" => pending_alt = attr(&e, b"descr"),
                    b"a:blip" if depth.images => {
                        let rel_id = attr(&e, b"r:embed");
                        let image =
                            ooxml::embedded_image(&mut package, &rels, rel_id.as_deref(), Some(page))
                                .with_alt_text(pending_alt.take().unwrap_or_default());
                        extracted.images.push(image);
                    }
                    _ => {}
                },
                Event::Text(t) if in_text => {
                    let text = t.unescape().map_err(|e| xml_error(part, e))?;
                    paragraph.push_str(&text);
                }
                Event::End(e) => match e.name().as_ref() {
                    b"a:t" => in_text = false,
                    b"a:p" => {
                        let text = paragraph.trim().to_string();

                        if text.is_empty() {
                            continue;
                        }

                        if table.is_some() {
                            if !cell.is_empty() {
                                cell.push(' ');
                            }
                            cell.push_str(&text);
                        } else {
                            if is_title_shape && slide.title.is_none() {
                                slide.title = Some(text.clone());
                            }
                            slide.paragraphs.push(text);
                        }
                    }
                    b"a:tc" => row.push(std::mem::take(&mut cell)),
                    b"a:tr" => {
                        if let Some(rows) = table.as_mut() {
                            rows.push(std::mem::take(&mut row));
                        }
                    }
                    b"a:tbl" => {
                        if let Some(rows) = table.take() {
                            for r in &rows {
                                slide.paragraphs.push(r.join("\t"));
                            }

                            if depth.tables && !rows.is_empty() {
                                extracted.tables.push(TableData::from_rows(rows, Some(page)));
                            }
                        }
                    }
                    _ => {}
                },
                Event::Eof => break,
                _ => {}
            }
        }

        if depth.structure {
            if let Some(title) = &slide.title {
                extracted
                    .structure
                    .push(Section::new(title.clone(), 1, Some(page)));
            }
        }

        if extracted.properties.title.is_none() && page == 1 {
            extracted.properties.title = slide.title.clone();
        }

        blocks.push(slide.paragraphs.join("\n"));
    }

    extracted.text = blocks
        .into_iter()
        .filter(|b| !b.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n");

    Ok(extracted)
}
