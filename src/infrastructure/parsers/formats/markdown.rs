//! Markdown extraction

use pulldown_cmark::{Event, Options, Parser, Tag};

use super::{extension_of, text::decode, ExtractionDepth, Extracted};
use crate::domain::document::{ImageInfo, Section, TableData};

#[derive(Default)]
struct TableBuilder {
    rows: Vec<Vec<String>>,
    row: Vec<String>,
    cell: String,
}

struct ImageBuilder {
    url: String,
    title: String,
    alt: String,
}

pub fn extract(content: &[u8], depth: ExtractionDepth) -> Extracted {
    let markdown = decode(content);
    let parser = Parser::new_ext(&markdown, Options::ENABLE_TABLES);

    let mut extracted = Extracted::default();
    let mut text = String::new();
    let mut heading: Option<(u8, String)> = None;
    let mut table: Option<TableBuilder> = None;
    let mut image: Option<ImageBuilder> = None;

    for event in parser {
        match event {
            Event::Start(Tag::Heading(level, ..)) => {
                heading = Some((level as u8, String::new()));
            }
            Event::End(Tag::Heading(..)) => {
                if let Some((level, title)) = heading.take() {
                    let title = title.trim().to_string();

                    if level == 1 && extracted.properties.title.is_none() && !title.is_empty() {
                        extracted.properties.title = Some(title.clone());
                    }

                    if !text.is_empty() {
                        text.push('\n');
                    }
                    text.push_str(&title);
                    text.push('\n');

                    if depth.structure && !title.is_empty() {
                        extracted.structure.push(Section::new(title, level, None));
                    }
                }
            }
            Event::Start(Tag::Table(_)) => {
                table = Some(TableBuilder::default());
                if !text.is_empty() && !text.ends_with('\n') {
                    text.push('\n');
                }
            }
            Event::End(Tag::Table(_)) => {
                if let Some(builder) = table.take() {
                    if depth.tables {
                        extracted.tables.push(TableData::from_rows(builder.rows, None));
                    }
                }
            }
            Event::Start(Tag::TableHead) | Event::Start(Tag::TableRow) => {
                if let Some(builder) = table.as_mut() {
                    builder.row.clear();
                }
            }
            Event::End(Tag::TableHead) | Event::End(Tag::TableRow) => {
                if let Some(builder) = table.as_mut() {
                    let row = std::mem::take(&mut builder.row);
                    text.push_str(&row.join("\t"));
                    text.push('\n');
                    builder.rows.push(row);
                }
            }
            Event::Start(Tag::TableCell) => {
                if let Some(builder) = table.as_mut() {
                    builder.cell.clear();
                }
            }
            Event::End(Tag::TableCell) => {
                if let Some(builder) = table.as_mut() {
                    let cell = std::mem::take(&mut builder.cell);
                    builder.row.push(cell.trim().to_string());
                }
            }
            Event::Start(Tag::Image(_, url, title)) => {
                image = Some(ImageBuilder {
                    url: url.to_string(),
                    title: title.to_string(),
                    alt: String::new(),
                });
            }
            Event::End(Tag::Image(..)) => {
                if let Some(builder) = image.take() {
                    if depth.images {
                        let format =
                            extension_of(&builder.url).unwrap_or_else(|| "unknown".to_string());
                        extracted.images.push(
                            ImageInfo::new(format, None)
                                .with_alt_text(builder.alt.trim())
                                .with_caption(builder.title.trim()),
                        );
                    }
                }
            }
            Event::Text(t) | Event::Code(t) => {
                if let Some(builder) = image.as_mut() {
                    builder.alt.push_str(&t);
                } else if let Some((_, title)) = heading.as_mut() {
                    title.push_str(&t);
                } else if let Some(builder) = table.as_mut() {
                    builder.cell.push_str(&t);
                } else {
                    text.push_str(&t);
                }
            }
            Event::SoftBreak | Event::HardBreak => {
                if let Some((_, title)) = heading.as_mut() {
                    title.push(' ');
                } else {
                    text.push('\n');
                }
            }
            Event::Start(Tag::Paragraph) | Event::Start(Tag::CodeBlock(_)) => {
                if !text.is_empty() && !text.ends_with('\n') {
                    text.push('\n');
                }
            }
            Event::End(Tag::Paragraph) | Event::End(Tag::CodeBlock(_)) => {
                text.push('\n');
            }
            Event::Start(Tag::Item) => {
                if !text.is_empty() && !text.ends_with('\n') {
                    text.push('\n');
                }
                text.push_str("• ");
            }
            Event::End(Tag::Item) => {
                if !text.ends_with('\n') {
                    text.push('\n');
                }
            }
            _ => {}
        }
    }

    extracted.text = text
        .lines()
        .map(str::trim)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string();

    extracted
}
