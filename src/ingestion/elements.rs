//! Typed document elements and the per-category buckets fed to summarization.

use base64::{Engine as _, engine::general_purpose::STANDARD};

/// Category assigned to a partitioned element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementCategory {
    /// Running header repeated at the top of pages.
    Header,
    /// Running footer or page number at the bottom of pages.
    Footer,
    /// Heading or title line.
    Title,
    /// Prose made of full sentences.
    NarrativeText,
    /// Text that fits no other category.
    Text,
    /// Bulleted or numbered list entry.
    ListItem,
    /// Tabular block.
    Table,
    /// Embedded raster image.
    Image,
}

/// One partitioned piece of a document.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    /// Category assigned by the partitioner.
    pub category: ElementCategory,
    /// Plain text content (empty for images).
    pub text: String,
    /// HTML rendering for tables.
    pub text_as_html: Option<String>,
    /// Raw image bytes for images.
    pub image_data: Option<Vec<u8>>,
    /// 1-based page the element came from, when known.
    pub page_number: Option<u32>,
}

impl Element {
    /// Text-bearing element.
    pub fn text(category: ElementCategory, text: impl Into<String>, page_number: Option<u32>) -> Self {
        Self {
            category,
            text: text.into(),
            text_as_html: None,
            image_data: None,
            page_number,
        }
    }

    /// Table element with its HTML rendering.
    pub fn table(text: impl Into<String>, html: impl Into<String>, page_number: Option<u32>) -> Self {
        Self {
            category: ElementCategory::Table,
            text: text.into(),
            text_as_html: Some(html.into()),
            image_data: None,
            page_number,
        }
    }

    /// Image element carrying encoded image bytes.
    pub fn image(data: Vec<u8>, page_number: Option<u32>) -> Self {
        Self {
            category: ElementCategory::Image,
            text: String::new(),
            text_as_html: None,
            image_data: Some(data),
            page_number,
        }
    }
}

/// Element payloads grouped by category, ready for summarization.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ElementBuckets {
    /// Header texts.
    pub headers: Vec<String>,
    /// Footer texts.
    pub footers: Vec<String>,
    /// Title texts.
    pub titles: Vec<String>,
    /// Narrative texts.
    pub narrative_texts: Vec<String>,
    /// Uncategorized texts.
    pub texts: Vec<String>,
    /// List item texts.
    pub list_items: Vec<String>,
    /// Table HTML.
    pub tables: Vec<String>,
    /// Base64-encoded images.
    pub images: Vec<String>,
}

impl ElementBuckets {
    /// Distribute elements into buckets, dropping elements without a usable payload.
    pub fn from_elements(elements: &[Element]) -> Self {
        let mut buckets = Self::default();
        for element in elements {
            let has_text = !element.text.trim().is_empty();
            match element.category {
                ElementCategory::Header if has_text => buckets.headers.push(element.text.clone()),
                ElementCategory::Footer if has_text => buckets.footers.push(element.text.clone()),
                ElementCategory::Title if has_text => buckets.titles.push(element.text.clone()),
                ElementCategory::NarrativeText if has_text => {
                    buckets.narrative_texts.push(element.text.clone())
                }
                ElementCategory::Text if has_text => buckets.texts.push(element.text.clone()),
                ElementCategory::ListItem if has_text => {
                    buckets.list_items.push(element.text.clone())
                }
                ElementCategory::Table => {
                    if let Some(html) = element.text_as_html.as_ref().filter(|html| !html.is_empty()) {
                        buckets.tables.push(html.clone());
                    }
                }
                ElementCategory::Image => {
                    if let Some(data) = element.image_data.as_ref().filter(|data| !data.is_empty()) {
                        buckets.images.push(STANDARD.encode(data));
                    }
                }
                _ => {}
            }
        }
        buckets
    }

    /// Total number of payloads across all buckets.
    pub fn len(&self) -> usize {
        self.headers.len()
            + self.footers.len()
            + self.titles.len()
            + self.narrative_texts.len()
            + self.texts.len()
            + self.list_items.len()
            + self.tables.len()
            + self.images.len()
    }

    /// Whether every bucket is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
