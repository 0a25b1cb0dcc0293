//! Shared helpers for Office Open XML packages

use std::collections::HashMap;
use std::io::{Cursor, Read};

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use zip::ZipArchive;

use super::{extension_of, image::probe_dimensions, DocumentProperties};
use crate::domain::document::ImageInfo;
use crate::domain::parser::ParseError;

pub type Package<'a> = ZipArchive<Cursor<&'a [u8]>>;

pub fn open(content: &[u8]) -> Result<Package<'_>, ParseError> {
    ZipArchive::new(Cursor::new(content))
        .map_err(|e| ParseError::corrupt(format!("Not a valid OOXML package: {}", e)))
}

/// Read a required part as UTF-8
pub fn read_part(package: &mut Package<'_>, name: &str) -> Result<String, ParseError> {
    read_optional_part(package, name)?
        .ok_or_else(|| ParseError::corrupt(format!("Package is missing '{}'", name)))
}

pub fn read_optional_part(
    package: &mut Package<'_>,
    name: &str,
) -> Result<Option<String>, ParseError> {
    let mut file = match package.by_name(name) {
        Ok(file) => file,
        Err(zip::result::ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(ParseError::corrupt(format!("Cannot open '{}': {}", name, e))),
    };

    let mut xml = String::new();
    file.read_to_string(&mut xml)
        .map_err(|e| ParseError::corrupt(format!("Cannot read '{}': {}", name, e)))?;

    Ok(Some(xml))
}

fn read_binary_part(package: &mut Package<'_>, name: &str) -> Option<Vec<u8>> {
    let mut file = package.by_name(name).ok()?;
    let mut data = Vec::new();
    file.read_to_end(&mut data).ok()?;
    Some(data)
}

/// Attribute value by qualified name
pub fn attr(element: &BytesStart<'_>, name: &[u8]) -> Option<String> {
    element
        .try_get_attribute(name)
        .ok()
        .flatten()
        .and_then(|a| {
            let raw = std::str::from_utf8(&a.value).ok()?;
            quick_xml::escape::unescape(raw).ok().map(|v| v.into_owned())
        })
}

pub fn xml_error(part: &str, error: quick_xml::Error) -> ParseError {
    ParseError::corrupt(format!("Malformed XML in '{}': {}", part, error))
}

/// Dublin Core properties from `docProps/core.xml`
pub fn core_properties(package: &mut Package<'_>) -> DocumentProperties {
    let mut props = DocumentProperties::default();

    let Ok(Some(xml)) = read_optional_part(package, "docProps/core.xml") else {
        return props;
    };

    let mut reader = Reader::from_str(&xml);
    let mut current: Option<Vec<u8>> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => current = Some(e.name().as_ref().to_vec()),
            Ok(Event::Text(t)) => {
                let Some(name) = current.as_deref() else {
                    continue;
                };
                let Ok(value) = t.unescape() else {
                    continue;
                };
                let value = value.trim().to_string();

                if value.is_empty() {
                    continue;
                }

                match name {
                    b"dc:title" => props.title = Some(value),
                    b"dc:creator" => props.author = Some(value),
                    b"dc:subject" => props.subject = Some(value),
                    b"cp:lastModifiedBy" => props.creator = Some(value),
                    b"dcterms:created" => props.creation_date = Some(value),
                    b"dcterms:modified" => props.modification_date = Some(value),
                    _ => {}
                }
            }
            Ok(Event::End(_)) => current = None,
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
    }

    props
}

/// Relationship id to package path for a part's `_rels` file
pub fn relationships(package: &mut Package<'_>, rels_part: &str, base_dir: &str) -> HashMap<String, String> {
    let mut map = HashMap::new();

    let Ok(Some(xml)) = read_optional_part(package, rels_part) else {
        return map;
    };

    let mut reader = Reader::from_str(&xml);

    loop {
        match reader.read_event() {
            Ok(Event::Empty(e)) | Ok(Event::Start(e)) if e.name().as_ref() == b"Relationship" => {
                if let (Some(id), Some(target)) = (attr(&e, b"Id"), attr(&e, b"Target")) {
                    map.insert(id, resolve_target(base_dir, &target));
                }
            }
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
    }

    map
}

fn resolve_target(base_dir: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }

    let mut parts: Vec<&str> = base_dir.split('/').filter(|p| !p.is_empty()).collect();

    for segment in target.split('/') {
        match segment {
            ".." => {
                parts.pop();
            }
            "." | "" => {}
            other => parts.push(other),
        }
    }

    parts.join("/")
}

/// Describe an embedded image referenced by relationship id
pub fn embedded_image(
    package: &mut Package<'_>,
    rels: &HashMap<String, String>,
    rel_id: Option<&str>,
    page: Option<u32>,
) -> ImageInfo {
    let target = rel_id.and_then(|id| rels.get(id));
    let format = target
        .and_then(|t| extension_of(t))
        .unwrap_or_else(|| "unknown".to_string());
    let mut info = ImageInfo::new(format, page);

    if let Some(data) = target.and_then(|t| read_binary_part(package, t)) {
        if let Some((width, height)) = probe_dimensions(&data) {
            info = info.with_dimensions(width, height);
        }
    }

    info
}
