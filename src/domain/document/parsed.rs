//! Canonical parsed document representation

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::parser::ParserVariant;

/// Descriptive facts about a parsed document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub filename: String,
    pub file_size: u64,
    /// Variant that produced this result
    pub parser_used: ParserVariant,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub word_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub character_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creator: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub producer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creation_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modification_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_count: Option<usize>,
    /// Format-specific extras; ordered so serialization is deterministic
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl DocumentMetadata {
    pub fn new(filename: impl Into<String>, file_size: u64, parser_used: ParserVariant) -> Self {
        Self {
            filename: filename.into(),
            file_size,
            parser_used,
            mime_type: None,
            page_count: None,
            word_count: None,
            character_count: None,
            line_count: None,
            title: None,
            author: None,
            subject: None,
            creator: None,
            producer: None,
            creation_date: None,
            modification_date: None,
            table_count: None,
            image_count: None,
            extra: BTreeMap::new(),
        }
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    pub fn with_page_count(mut self, page_count: u32) -> Self {
        self.page_count = Some(page_count);
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }
}

/// A heading discovered in the document, in reading order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub text: String,
    /// Heading level, always within 1..=6
    pub level: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
}

impl Section {
    pub fn new(text: impl Into<String>, level: u8, page: Option<u32>) -> Self {
        Self {
            text: text.into(),
            level: level.clamp(1, 6),
            page,
        }
    }
}

/// Ordered sequence of headings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentStructure {
    pub headings: Vec<Section>,
}

impl DocumentStructure {
    pub fn push(&mut self, section: Section) {
        self.headings.push(section);
    }

    pub fn is_empty(&self) -> bool {
        self.headings.is_empty()
    }

    pub fn len(&self) -> usize {
        self.headings.len()
    }
}

/// A rectangular table; every row has exactly `columns` cells
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableData {
    pub table_id: usize,
    pub rows: usize,
    pub columns: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    pub data: Vec<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
}

impl TableData {
    /// Build a table, padding short rows with empty cells
    pub fn from_rows(rows: Vec<Vec<String>>, page: Option<u32>) -> Self {
        let columns = rows.iter().map(Vec::len).max().unwrap_or(0);
        let data: Vec<Vec<String>> = rows
            .into_iter()
            .map(|mut row| {
                row.resize(columns, String::new());
                row
            })
            .collect();

        Self {
            table_id: 0,
            rows: data.len(),
            columns,
            page,
            data,
            caption: None,
        }
    }

    pub fn with_caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = Some(caption.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0 || self.columns == 0
    }
}

/// An embedded image
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageInfo {
    pub image_id: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    pub format: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alt_text: Option<String>,
}

impl ImageInfo {
    pub fn new(format: impl Into<String>, page: Option<u32>) -> Self {
        Self {
            image_id: 0,
            page,
            width: None,
            height: None,
            format: format.into(),
            caption: None,
            alt_text: None,
        }
    }

    pub fn with_dimensions(mut self, width: u32, height: u32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    pub fn with_alt_text(mut self, alt_text: impl Into<String>) -> Self {
        let alt_text = alt_text.into();
        if !alt_text.is_empty() {
            self.alt_text = Some(alt_text);
        }
        self
    }

    pub fn with_caption(mut self, caption: impl Into<String>) -> Self {
        let caption = caption.into();
        if !caption.is_empty() {
            self.caption = Some(caption);
        }
        self
    }
}

/// Normalized output of any parser variant
///
/// Shared read-only once cached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedDocument {
    pub content: String,
    pub metadata: DocumentMetadata,
    pub structure: DocumentStructure,
    pub tables: Vec<TableData>,
    pub images: Vec<ImageInfo>,
}

impl ParsedDocument {
    pub fn new(content: String, metadata: DocumentMetadata) -> Self {
        Self {
            content,
            metadata,
            structure: DocumentStructure::default(),
            tables: Vec::new(),
            images: Vec::new(),
        }
    }

    pub fn with_structure(mut self, structure: DocumentStructure) -> Self {
        self.structure = structure;
        self
    }

    pub fn with_tables(mut self, tables: Vec<TableData>) -> Self {
        self.tables = tables;
        self
    }

    pub fn with_images(mut self, images: Vec<ImageInfo>) -> Self {
        self.images = images;
        self
    }

    /// Assign discovery-order ids and fill derived counts
    pub fn finalize(mut self) -> Self {
        self.tables.retain(|t| !t.is_empty());

        for (index, table) in self.tables.iter_mut().enumerate() {
            table.table_id = index;
        }

        for (index, image) in self.images.iter_mut().enumerate() {
            image.image_id = index;
        }

        let metadata = &mut self.metadata;
        metadata.word_count = Some(self.content.split_whitespace().count());
        metadata.character_count = Some(self.content.chars().count());
        metadata.line_count = Some(self.content.lines().count());
        metadata.table_count = Some(self.tables.len());
        metadata.image_count = Some(self.images.len());

        self
    }

    pub fn has_structure(&self) -> bool {
        !self.structure.is_empty()
    }

    pub fn has_tables(&self) -> bool {
        !self.tables.is_empty()
    }

    pub fn has_images(&self) -> bool {
        !self.images.is_empty()
    }

    /// Approximate in-memory footprint in bytes
    pub fn size_estimate(&self) -> usize {
        let tables: usize = self
            .tables
            .iter()
            .flat_map(|t| t.data.iter().flatten())
            .map(String::len)
            .sum();
        let headings: usize = self.structure.headings.iter().map(|s| s.text.len()).sum();

        self.content.len()
            + tables
            + headings
            + self.images.len() * std::mem::size_of::<ImageInfo>()
            + std::mem::size_of::<Self>()
    }
}
