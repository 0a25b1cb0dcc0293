//! HTML extraction

use scraper::{ElementRef, Html, Selector};

use super::{extension_of, text::decode, ExtractionDepth, Extracted};
use crate::domain::document::{ImageInfo, Section, TableData};

fn selector(css: &str) -> Option<Selector> {
    Selector::parse(css).ok()
}

fn element_text(element: &ElementRef) -> String {
    element
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn extract_title(document: &Html) -> Option<String> {
    let title = selector("title")?;
    document
        .select(&title)
        .next()
        .map(|el| element_text(&el))
        .filter(|s| !s.is_empty())
}

fn meta_content(document: &Html, name: &str) -> Option<String> {
    let meta = selector(&format!("meta[name=\"{}\"]", name))?;
    document
        .select(&meta)
        .next()
        .and_then(|el| el.value().attr("content"))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn collect_block_text(element: &ElementRef, out: &mut String) {
    for node in element.children() {
        if let Some(el) = ElementRef::wrap(node) {
            let tag_name = el.value().name();

            if matches!(tag_name, "script" | "style" | "noscript" | "head" | "template") {
                continue;
            }

            let block = matches!(
                tag_name,
                "p" | "div"
                    | "section"
                    | "article"
                    | "h1"
                    | "h2"
                    | "h3"
                    | "h4"
                    | "h5"
                    | "h6"
                    | "br"
                    | "li"
                    | "tr"
                    | "table"
                    | "blockquote"
                    | "pre"
            );

            if block && !out.is_empty() && !out.ends_with('\n') {
                out.push('\n');
            }

            collect_block_text(&el, out);

            if matches!(tag_name, "td" | "th") {
                out.push('\t');
            }

            if block {
                out.push('\n');
            }
        } else if let Some(txt) = node.value().as_text() {
            out.push_str(txt);
        }
    }
}

fn extract_text(document: &Html) -> String {
    let mut text = String::new();

    match selector("body").and_then(|sel| document.select(&sel).next()) {
        Some(body) => collect_block_text(&body, &mut text),
        None => collect_block_text(&document.root_element(), &mut text),
    }

    text.lines()
        .map(|l| l.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn extract_headings(document: &Html) -> Vec<Section> {
    let Some(headings) = selector("h1, h2, h3, h4, h5, h6") else {
        return Vec::new();
    };

    document
        .select(&headings)
        .filter_map(|el| {
            let level = el.value().name()[1..].parse::<u8>().ok()?;
            let text = element_text(&el);
            (!text.is_empty()).then(|| Section::new(text, level, None))
        })
        .collect()
}

fn extract_tables(document: &Html) -> Vec<TableData> {
    let (Some(tables), Some(rows), Some(cells), Some(caption)) = (
        selector("table"),
        selector("tr"),
        selector("th, td"),
        selector("caption"),
    ) else {
        return Vec::new();
    };

    document
        .select(&tables)
        .map(|table| {
            let data: Vec<Vec<String>> = table
                .select(&rows)
                .map(|row| row.select(&cells).map(|c| element_text(&c)).collect())
                .filter(|row: &Vec<String>| !row.is_empty())
                .collect();

            let table_data = TableData::from_rows(data, None);

            match table.select(&caption).next().map(|c| element_text(&c)) {
                Some(text) if !text.is_empty() => table_data.with_caption(text),
                _ => table_data,
            }
        })
        .collect()
}

fn extract_images(document: &Html) -> Vec<ImageInfo> {
    let Some(images) = selector("img") else {
        return Vec::new();
    };

    document
        .select(&images)
        .map(|img| {
            let attrs = img.value();
            let format = attrs
                .attr("src")
                .and_then(extension_of)
                .unwrap_or_else(|| "unknown".to_string());

            let mut info = ImageInfo::new(format, None)
                .with_alt_text(attrs.attr("alt").unwrap_or_default().trim())
                .with_caption(attrs.attr("title").unwrap_or_default().trim());

            info.width = attrs.attr("width").and_then(|w| w.trim().parse().ok());
            info.height = attrs.attr("height").and_then(|h| h.trim().parse().ok());
            info
        })
        .collect()
}

pub fn extract(content: &[u8], depth: ExtractionDepth) -> Extracted {
    let raw = decode(content);
    let document = Html::parse_document(&raw);

    let mut extracted = Extracted::from_text(extract_text(&document));
    extracted.properties.title = extract_title(&document);
    extracted.properties.author = meta_content(&document, "author");
    extracted.properties.subject = meta_content(&document, "description");
    extracted.properties.creator = meta_content(&document, "generator");

    if depth.structure {
        for section in extract_headings(&document) {
            extracted.structure.push(section);
        }
    }

    if depth.tables {
        extracted.tables = extract_tables(&document);
    }

    if depth.images {
        extracted.images = extract_images(&document);
    }

    extracted
}
