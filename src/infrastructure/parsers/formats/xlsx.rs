//! Excel (XLSX) extraction; each worksheet counts as one page

use std::io::Cursor;

use calamine::{open_workbook_from_rs, Data, Reader, Xlsx};

use super::ooxml;
use super::{ExtractionDepth, Extracted};
use crate::domain::document::{Section, TableData};
use crate::domain::parser::ParseError;

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        other => other.to_string().trim().to_string(),
    }
}

pub fn extract(content: &[u8], depth: ExtractionDepth) -> Result<Extracted, ParseError> {
    let mut workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(content))
        .map_err(|e| ParseError::corrupt(format!("Not a readable workbook: {}", e)))?;

    let properties = ooxml::open(content)
        .map(|mut package| ooxml::core_properties(&mut package))
        .unwrap_or_default();

    let sheet_names = workbook.sheet_names();
    let mut extracted = Extracted {
        properties,
        page_count: Some(sheet_names.len() as u32),
        ..Default::default()
    };
    let mut blocks = Vec::new();

    for (index, name) in sheet_names.iter().enumerate() {
        let page = index as u32 + 1;
        let range = workbook
            .worksheet_range(name)
            .map_err(|e| ParseError::corrupt(format!("Worksheet '{}' is unreadable: {}", name, e)))?;

        let rows: Vec<Vec<String>> = range
            .rows()
            .map(|row| row.iter().map(cell_text).collect::<Vec<_>>())
            .filter(|row| row.iter().any(|c| !c.is_empty()))
            .collect();

        let mut block = vec![name.clone()];
        block.extend(rows.iter().map(|row| row.join("\t").trim_end().to_string()));
        blocks.push(block.join("\n"));

        if depth.structure {
            extracted.structure.push(Section::new(name.clone(), 1, Some(page)));
        }

        if depth.tables && !rows.is_empty() {
            extracted
                .tables
                .push(TableData::from_rows(rows, Some(page)).with_caption(name.clone()));
        }
    }

    extracted.text = blocks.join("\n\n");

    Ok(extracted)
}

#[cfg(test)]
pub(crate) mod fixtures {
    use crate::infrastructure::parsers::formats::docx::fixtures::package;

    fn sheet_xml(rows: &[&[&str]]) -> String {
        let mut xml = String::from(
            r#"<?xml version="1.0" encoding="UTF-8"?><worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>"#,
        );

        for (r, row) in rows.iter().enumerate() {
            xml.push_str(&format!(r#"<row r="{}">"#, r + 1));
            for (c, value) in row.iter().enumerate() {
                let column = (b'A' + c as u8) as char;
                xml.push_str(&format!(
                    r#"<c r="{}{}" t="inlineStr"><is><t>{}</t></is></c>"#,
                    column,
                    r + 1,
                    value
                ));
            }
            xml.push_str("</row>");
        }

        xml.push_str("</sheetData></worksheet>");
        xml
    }

    /// Minimal workbook with inline-string cells
    pub fn xlsx(sheets: &[(&str, &[&[&str]])]) -> Vec<u8> {
        let mut workbook = String::from(
            r#"<?xml version="1.0" encoding="UTF-8"?><workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets>"#,
        );
        let mut rels = String::from(
            r#"<?xml version="1.0" encoding="UTF-8"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
        );
        let mut content_types = String::from(
            r#"<?xml version="1.0" encoding="UTF-8"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>"#,
        );
        let mut sheet_parts = Vec::new();

        for (i, (name, rows)) in sheets.iter().enumerate() {
            let n = i + 1;
            workbook.push_str(&format!(
                r#"<sheet name="{}" sheetId="{}" r:id="rId{}"/>"#,
                name, n, n
            ));
            rels.push_str(&format!(
                r#"<Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet{}.xml"/>"#,
                n, n
            ));
            content_types.push_str(&format!(
                r#"<Override PartName="/xl/worksheets/sheet{}.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>"#,
                n
            ));
            sheet_parts.push((format!("xl/worksheets/sheet{}.xml", n), sheet_xml(rows)));
        }

        workbook.push_str("</sheets></workbook>");
        rels.push_str("</Relationships>");
        content_types.push_str("</Types>");

        let root_rels = r#"<?xml version="1.0" encoding="UTF-8"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#;

        let mut parts: Vec<(&str, &[u8])> = vec![
            ("[Content_Types].xml", content_types.as_bytes()),
            ("_rels/.rels", root_rels.as_bytes()),
            ("xl/workbook.xml", workbook.as_bytes()),
            ("xl/_rels/workbook.xml.rels", rels.as_bytes()),
        ];
        for (name, xml) in &sheet_parts {
            parts.push((name.as_str(), xml.as_bytes()));
        }

        package(&parts)
    }
}
