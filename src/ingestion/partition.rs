//! PDF partitioning into typed elements.
//!
//! Page text is rebuilt from the content stream: every vertical move of the text position
//! (`Td`, `TD`, `Tm`, `T*`, `'`, `"`) starts a new line, and a horizontal jump wider than one em
//! becomes a column gap. The lines are then classified:
//!
//! - Header / Footer: the first or last line of a page when the same line (digits ignored)
//!   opens or closes at least two pages, or when the last line is a bare page number.
//! - Table: two or more consecutive lines that split into the same number (>= 2) of columns on
//!   runs of whitespace. Rendered to HTML for summarization.
//! - ListItem: bullet or enumerator prefix.
//! - Title: short title-cased or numbered heading lines without trailing punctuation.
//! - NarrativeText / Text: remaining lines merged into paragraphs; paragraphs made of sentences
//!   are narrative, the rest are generic text.
//!
//! JPEG image XObjects referenced from a page's resources become image elements on that page.

use super::elements::{Element, ElementCategory};
use super::types::PartitionError;
use lopdf::{Dictionary, Document, Encoding, Object, ObjectId, Stream};
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;
use std::time::Instant;

static LIST_ITEM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[•●◦▪■‣\-\*–·]|\(?\d{1,3}[.)]|\(?[a-zA-Z][.)])\s+\S").expect("valid regex")
});
static NUMBERED_HEADING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:(?i:chapter|unit|section|lesson|part)\s+\w+|\d+(?:\.\d+)*\s+\p{Lu})")
        .expect("valid regex")
});
static PAGE_NUMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?i:page\s*)?\d{1,4}(?:\s*(?i:of|/)\s*\d{1,4})?$").expect("valid regex")
});
static COLUMN_GAP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\t+|\s{2,}").expect("valid regex"));

const MINOR_WORDS: [&str; 12] = [
    "a", "an", "and", "as", "at", "by", "for", "in", "of", "on", "the", "to",
];

/// Separator written between cells when text jumps right by more than one em.
const COLUMN_SEPARATOR: &str = "    ";
/// Average glyph advance as a fraction of the font size, used to estimate where text ends.
const GLYPH_ADVANCE: f32 = 0.5;

/// Extracted text of one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageText {
    /// 1-based page number.
    pub number: u32,
    /// Raw page text.
    pub text: String,
}

/// Partition a PDF into typed elements.
///
/// Text elements come first for each page, followed by that page's images.
pub fn partition_pdf(bytes: &[u8]) -> Result<Vec<Element>, PartitionError> {
    let started = Instant::now();
    let document = Document::load_mem(bytes)?;
    let page_ids = document.get_pages();

    let pages: Vec<PageText> = page_ids
        .iter()
        .map(|(&number, &page_id)| {
            let text = page_text(&document, page_id).unwrap_or_else(|error| {
                tracing::warn!(page = number, error = %error, "Failed to extract page text");
                String::new()
            });
            PageText { number, text }
        })
        .collect();

    let mut text_elements = classify_pages(&pages).into_iter().peekable();
    let mut elements = Vec::new();
    let mut image_count = 0;
    for (&number, &page_id) in &page_ids {
        while let Some(element) = text_elements.next_if(|element| element.page_number == Some(number)) {
            elements.push(element);
        }
        for data in page_images(&document, page_id, number) {
            elements.push(Element::image(data, Some(number)));
            image_count += 1;
        }
    }
    elements.extend(text_elements);

    tracing::info!(
        pages = pages.len(),
        elements = elements.len(),
        images = image_count,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "partition_pdf finished"
    );
    Ok(elements)
}

/// Rebuild the text of one page from its content stream.
fn page_text(document: &Document, page_id: ObjectId) -> Result<String, lopdf::Error> {
    let encodings: HashMap<Vec<u8>, Encoding> = document
        .get_page_fonts(page_id)?
        .into_iter()
        .filter_map(|(name, font)| match font.get_font_encoding(document) {
            Ok(encoding) => Some((name, encoding)),
            Err(error) => {
                tracing::debug!(
                    font = %String::from_utf8_lossy(&name),
                    error = %error,
                    "Skipping font without usable encoding"
                );
                None
            }
        })
        .collect();
    let content = document.get_and_decode_page_content(page_id)?;

    let mut writer = TextWriter::default();
    let mut encoding = None;
    for operation in &content.operations {
        let operands = operation.operands.as_slice();
        match operation.operator.as_str() {
            "BT" => writer.begin_text(),
            "ET" => writer.line_break(),
            "Tf" => {
                encoding = operands
                    .first()
                    .and_then(|name| name.as_name().ok())
                    .and_then(|name| encodings.get(name));
                if let Some(size) = number(operands, 1) {
                    writer.font_size = size.abs();
                }
            }
            "TL" => writer.leading = number(operands, 0).unwrap_or(0.0),
            "Td" => writer.move_line(number(operands, 0), number(operands, 1)),
            "TD" => {
                let ty = number(operands, 1);
                writer.leading = -ty.unwrap_or(0.0);
                writer.move_line(number(operands, 0), ty);
            }
            "Tm" => writer.set_matrix(operands),
            "T*" => writer.next_line(),
            "Tj" | "TJ" => writer.show(encoding, operands)?,
            "'" => {
                writer.next_line();
                writer.show(encoding, operands)?;
            }
            "\"" => {
                writer.next_line();
                writer.show(encoding, operands.get(2..).unwrap_or_default())?;
            }
            _ => {}
        }
    }
    Ok(writer.text)
}

fn number(operands: &[Object], index: usize) -> Option<f32> {
    operands.get(index).and_then(|operand| operand.as_float().ok())
}

/// Tracks the text position closely enough to place line breaks and column gaps.
#[derive(Debug)]
struct TextWriter {
    text: String,
    font_size: f32,
    scale: f32,
    leading: f32,
    line_x: f32,
    line_y: f32,
    cursor_x: f32,
    pending_gap: Option<&'static str>,
}

impl Default for TextWriter {
    fn default() -> Self {
        Self {
            text: String::new(),
            font_size: 12.0,
            scale: 1.0,
            leading: 0.0,
            line_x: 0.0,
            line_y: 0.0,
            cursor_x: 0.0,
            pending_gap: None,
        }
    }
}

impl TextWriter {
    fn em(&self) -> f32 {
        (self.font_size * self.scale).max(1.0)
    }

    fn line_is_empty(&self) -> bool {
        self.text.is_empty() || self.text.ends_with('\n')
    }

    fn begin_text(&mut self) {
        self.scale = 1.0;
        self.line_x = 0.0;
        self.line_y = 0.0;
        self.cursor_x = 0.0;
        self.pending_gap = None;
    }

    fn line_break(&mut self) {
        self.pending_gap = None;
        if !self.line_is_empty() {
            self.text.push('\n');
        }
    }

    fn move_line(&mut self, tx: Option<f32>, ty: Option<f32>) {
        let x = self.line_x + tx.unwrap_or(0.0) * self.scale;
        let y = self.line_y + ty.unwrap_or(0.0) * self.scale;
        self.move_to(x, y);
    }

    fn next_line(&mut self) {
        self.line_break();
        let y = self.line_y - self.leading * self.scale;
        self.move_to(self.line_x, y);
    }

    fn set_matrix(&mut self, operands: &[Object]) {
        let d = number(operands, 3).unwrap_or(1.0).abs();
        self.scale = if d > 0.0 { d } else { 1.0 };
        self.move_to(
            number(operands, 4).unwrap_or(0.0),
            number(operands, 5).unwrap_or(0.0),
        );
    }

    fn move_to(&mut self, x: f32, y: f32) {
        if (y - self.line_y).abs() > 0.5 {
            self.line_break();
        } else if !self.line_is_empty() {
            self.note_gap(x - self.cursor_x);
        }
        self.line_x = x;
        self.line_y = y;
        self.cursor_x = x;
    }

    fn note_gap(&mut self, gap: f32) {
        let em = self.em();
        if gap > em {
            self.pending_gap = Some(COLUMN_SEPARATOR);
        } else if gap > em * 0.2 && self.pending_gap.is_none() {
            self.pending_gap = Some(" ");
        }
    }

    fn show(&mut self, encoding: Option<&Encoding>, operands: &[Object]) -> Result<(), lopdf::Error> {
        let Some(encoding) = encoding else {
            tracing::debug!("Text shown without a decodable font");
            return Ok(());
        };
        for operand in operands {
            match operand {
                Object::String(bytes, _) => {
                    let decoded = Document::decode_text(encoding, bytes)?;
                    self.push_text(&decoded);
                }
                Object::Array(items) => self.show(Some(encoding), items)?,
                Object::Integer(_) | Object::Real(_) => {
                    // TJ adjustments are thousandths of an em; negative values move right.
                    let shift = -operand.as_float().unwrap_or(0.0) / 1000.0 * self.em();
                    self.cursor_x += shift;
                    if !self.line_is_empty() {
                        self.note_gap(shift);
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn push_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        if let Some(gap) = self.pending_gap.take()
            && !self.line_is_empty()
            && !self.text.ends_with(' ')
            && !text.starts_with(' ')
        {
            self.text.push_str(gap);
        }
        self.text.push_str(text);
        self.cursor_x += text.chars().count() as f32 * GLYPH_ADVANCE * self.em();
    }
}

/// Classify the text of every page into elements, in reading order.
pub fn classify_pages(pages: &[PageText]) -> Vec<Element> {
    let page_lines: Vec<Vec<&str>> = pages
        .iter()
        .map(|page| {
            page.text
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .collect()
        })
        .collect();

    let repeated_first = repeated_edge_lines(page_lines.iter().filter_map(|lines| lines.first().copied()));
    let repeated_last = repeated_edge_lines(page_lines.iter().filter_map(|lines| lines.last().copied()));

    let mut elements = Vec::new();
    for (page, lines) in pages.iter().zip(&page_lines) {
        let page_number = Some(page.number);
        let mut body = lines.as_slice();

        let mut header = None;
        if let Some((first, rest)) = body.split_first()
            && repeated_first.contains(&normalize_edge(first))
        {
            header = Some(*first);
            body = rest;
        }

        let mut footer = None;
        if let Some((last, rest)) = body.split_last()
            && (repeated_last.contains(&normalize_edge(last)) || PAGE_NUMBER.is_match(last))
        {
            footer = Some(*last);
            body = rest;
        }

        if let Some(text) = header {
            elements.push(Element::text(ElementCategory::Header, text, page_number));
        }
        classify_body(body, page_number, &mut elements);
        if let Some(text) = footer {
            elements.push(Element::text(ElementCategory::Footer, text, page_number));
        }
    }
    elements
}

fn classify_body(lines: &[&str], page_number: Option<u32>, elements: &mut Vec<Element>) {
    let mut paragraph: Vec<&str> = Vec::new();
    let mut index = 0;

    while index < lines.len() {
        let table_rows = table_run_length(&lines[index..]);
        if table_rows >= 2 {
            flush_paragraph(&mut paragraph, page_number, elements);
            elements.push(table_element(&lines[index..index + table_rows], page_number));
            index += table_rows;
            continue;
        }

        let line = lines[index];
        if LIST_ITEM.is_match(line) {
            flush_paragraph(&mut paragraph, page_number, elements);
            elements.push(Element::text(ElementCategory::ListItem, line, page_number));
        } else if looks_like_title(line) {
            flush_paragraph(&mut paragraph, page_number, elements);
            elements.push(Element::text(ElementCategory::Title, line, page_number));
        } else {
            paragraph.push(line);
        }
        index += 1;
    }

    flush_paragraph(&mut paragraph, page_number, elements);
}

fn flush_paragraph(paragraph: &mut Vec<&str>, page_number: Option<u32>, elements: &mut Vec<Element>) {
    if paragraph.is_empty() {
        return;
    }
    let text = paragraph.join(" ");
    paragraph.clear();
    let category = if is_narrative(&text) {
        ElementCategory::NarrativeText
    } else {
        ElementCategory::Text
    };
    elements.push(Element::text(category, text, page_number));
}

/// Lines appearing at the same page edge on at least two pages.
fn repeated_edge_lines<'a>(edges: impl Iterator<Item = &'a str>) -> HashSet<String> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for line in edges {
        *counts.entry(normalize_edge(line)).or_default() += 1;
    }
    counts
        .into_iter()
        .filter(|(_, count)| *count >= 2)
        .map(|(line, _)| line)
        .collect()
}

fn normalize_edge(line: &str) -> String {
    line.split_whitespace()
        .map(|word| {
            word.chars()
                .map(|c| if c.is_ascii_digit() { '#' } else { c.to_ascii_lowercase() })
                .collect::<String>()
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn cells(line: &str) -> Vec<&str> {
    COLUMN_GAP
        .split(line)
        .map(str::trim)
        .filter(|cell| !cell.is_empty())
        .collect()
}

fn table_run_length(lines: &[&str]) -> usize {
    let Some(first) = lines.first() else {
        return 0;
    };
    let columns = cells(first).len();
    if columns < 2 {
        return 0;
    }
    lines
        .iter()
        .take_while(|line| cells(line).len() == columns)
        .count()
}

fn table_element(rows: &[&str], page_number: Option<u32>) -> Element {
    let mut html = String::from("<table>");
    for row in rows {
        html.push_str("<tr>");
        for cell in cells(row) {
            html.push_str("<td>");
            html.push_str(&escape_html(cell));
            html.push_str("</td>");
        }
        html.push_str("</tr>");
    }
    html.push_str("</table>");
    Element::table(rows.join("\n"), html, page_number)
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn looks_like_title(line: &str) -> bool {
    let words: Vec<&str> = line.split_whitespace().collect();
    if words.is_empty() || words.len() > 12 || line.chars().count() > 100 {
        return false;
    }
    if !line.chars().any(char::is_alphabetic) {
        return false;
    }
    if line.ends_with(['.', ',', ';', ':', '?', '!']) {
        return false;
    }
    if NUMBERED_HEADING.is_match(line) {
        return true;
    }

    words.iter().enumerate().all(|(position, word)| {
        let lower = word.to_lowercase();
        (position > 0 && MINOR_WORDS.contains(&lower.as_str()))
            || word.chars().next().is_some_and(|c| c.is_uppercase() || !c.is_alphabetic())
    })
}

fn is_narrative(text: &str) -> bool {
    if text.split_whitespace().count() < 5 {
        return false;
    }
    if !text.contains(['.', '!', '?']) {
        return false;
    }
    let visible = text.chars().filter(|c| !c.is_whitespace()).count();
    let alphabetic = text.chars().filter(|c| c.is_alphabetic()).count();
    visible > 0 && alphabetic * 2 >= visible
}

/// JPEG payloads of the image XObjects a page references, in resource order.
fn page_images(document: &Document, page_id: ObjectId, page_number: u32) -> Vec<Vec<u8>> {
    let Ok((own, inherited)) = document.get_page_resources(page_id) else {
        return Vec::new();
    };
    let resources = own.into_iter().chain(
        inherited
            .into_iter()
            .filter_map(|id| document.get_dictionary(id).ok()),
    );

    let mut seen = HashSet::new();
    let mut images = Vec::new();
    for resources in resources {
        let Ok(xobjects) = resources
            .get(b"XObject")
            .and_then(|object| document.dereference(object))
            .and_then(|(_, object)| object.as_dict())
        else {
            continue;
        };
        for (name, value) in xobjects.iter() {
            let Ok((id, object)) = document.dereference(value) else {
                continue;
            };
            if let Some(id) = id
                && !seen.insert(id)
            {
                continue;
            }
            let Ok(stream) = object.as_stream() else {
                continue;
            };
            match jpeg_payload(stream) {
                ImagePayload::Jpeg(data) => images.push(data),
                ImagePayload::NotJpeg => {}
                ImagePayload::Unreadable(reason) => tracing::warn!(
                    page = page_number,
                    image = %String::from_utf8_lossy(name),
                    reason = %reason,
                    "Skipping image"
                ),
            }
        }
    }
    images
}

#[derive(Debug, PartialEq)]
enum ImagePayload {
    Jpeg(Vec<u8>),
    NotJpeg,
    Unreadable(String),
}

/// Undo every filter applied on top of `DCTDecode` so the payload is plain JPEG.
fn jpeg_payload(stream: &Stream) -> ImagePayload {
    if !is_image(&stream.dict) {
        return ImagePayload::NotJpeg;
    }
    let Ok(filters) = stream.filters() else {
        return ImagePayload::NotJpeg;
    };
    let Some((last, outer)) = filters.split_last() else {
        return ImagePayload::NotJpeg;
    };
    if last != "DCTDecode" {
        return if filters.iter().any(|filter| filter == "DCTDecode") {
            ImagePayload::Unreadable(format!("DCTDecode is not the last filter in {filters:?}"))
        } else {
            ImagePayload::NotJpeg
        };
    }
    if outer.is_empty() {
        return checked_jpeg(stream.content.clone());
    }

    // lopdf refuses to decode image streams, so decode the outer filters on a plain copy.
    let mut wrapped = Stream::new(Dictionary::new(), stream.content.clone());
    wrapped.dict.set(
        "Filter",
        outer
            .iter()
            .map(|filter| Object::Name(filter.as_bytes().to_vec()))
            .collect::<Vec<_>>(),
    );
    if let Ok(params) = stream.dict.get(b"DecodeParms") {
        wrapped.dict.set("DecodeParms", params.clone());
    }
    match wrapped.decompressed_content() {
        Ok(data) => checked_jpeg(data),
        Err(error) => ImagePayload::Unreadable(format!("could not decode {outer:?}: {error}")),
    }
}

/// Corrupt Flate data decodes to nothing rather than failing, so check the JPEG SOI marker.
fn checked_jpeg(data: Vec<u8>) -> ImagePayload {
    if data.starts_with(&[0xFF, 0xD8]) {
        ImagePayload::Jpeg(data)
    } else {
        ImagePayload::Unreadable("payload does not start with a JPEG marker".to_string())
    }
}

fn is_image(dict: &Dictionary) -> bool {
    dict.get(b"Subtype")
        .and_then(Object::as_name)
        .is_ok_and(|name| name == b"Image")
}

/// Build an in-memory PDF the way a typesetter lays it out: one `BT` block per page, 12pt
/// Helvetica, lines 20pt apart. `|` in a line separates cells placed 150pt apart. `image` is
/// attached to the first page as `/Im1`.
#[cfg(test)]
pub(crate) fn pdf_with_pages(pages: &[&[&str]], image: Option<Stream>) -> Vec<u8> {
    use lopdf::content::{Content, Operation};
    use lopdf::dictionary;

    let mut document = Document::with_version("1.5");
    let pages_id = document.new_object_id();
    let font_id = document.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let image_id = image.map(|image| document.add_object(image));

    let mut kids = Vec::new();
    for (index, lines) in pages.iter().enumerate() {
        let mut operations = vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 12.into()]),
            Operation::new("Td", vec![50.into(), 780.into()]),
        ];
        let mut column_shift: i32 = 0;
        for (row, line) in lines.iter().enumerate() {
            if row > 0 {
                operations.push(Operation::new("Td", vec![(-column_shift).into(), (-20).into()]));
                column_shift = 0;
            }
            for (column, cell) in line.split('|').enumerate() {
                if column > 0 {
                    operations.push(Operation::new("Td", vec![150.into(), 0.into()]));
                    column_shift += 150;
                }
                operations.push(Operation::new("Tj", vec![Object::string_literal(cell)]));
            }
        }
        operations.push(Operation::new("ET", vec![]));

        let mut resources = dictionary! { "Font" => dictionary! { "F1" => font_id } };
        if let Some(image_id) = image_id
            && index == 0
        {
            resources.set("XObject", dictionary! { "Im1" => image_id });
            operations.extend([
                Operation::new("q", vec![]),
                Operation::new(
                    "cm",
                    vec![100.into(), 0.into(), 0.into(), 100.into(), 50.into(), 400.into()],
                ),
                Operation::new("Do", vec!["Im1".into()]),
                Operation::new("Q", vec![]),
            ]);
        }

        let content = Content { operations }.encode().expect("encode content");
        let content_id = document.add_object(Stream::new(Dictionary::new(), content));
        let page_id = document.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources,
        });
        kids.push(Object::from(page_id));
    }

    let count = kids.len() as i64;
    document.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        }),
    );
    let catalog_id = document.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    document.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    document.save_to(&mut bytes).expect("save pdf");
    bytes
}

/// A 1x1 `DCTDecode` image XObject carrying `data` unchanged.
#[cfg(test)]
pub(crate) fn jpeg_xobject(data: Vec<u8>) -> Stream {
    use lopdf::dictionary;

    Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => 1,
            "Height" => 1,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
            "Filter" => "DCTDecode",
        },
        data,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::dictionary;

    fn page(number: u32, text: &str) -> PageText {
        PageText {
            number,
            text: text.to_string(),
        }
    }

    fn categories(elements: &[Element]) -> Vec<ElementCategory> {
        elements.iter().map(|element| element.category).collect()
    }

    #[test]
    fn repeated_edges_become_header_and_footer() {
        let pages = vec![
            page(
                1,
                "Physics for Class 10\nChapter 1: Force\nA force is a push or a pull acting on an object.\n1",
            ),
            page(
                2,
                "Physics for Class 10\nNewton described three laws that relate force and motion.\n2",
            ),
        ];

        let elements = classify_pages(&pages);
        assert_eq!(
            categories(&elements),
            vec![
                ElementCategory::Header,
                ElementCategory::Title,
                ElementCategory::NarrativeText,
                ElementCategory::Footer,
                ElementCategory::Header,
                ElementCategory::NarrativeText,
                ElementCategory::Footer,
            ]
        );
        assert_eq!(elements[0].text, "Physics for Class 10");
        assert_eq!(elements[3].text, "1");
        assert_eq!(elements[6].page_number, Some(2));
    }

    #[test]
    fn single_page_first_line_is_not_a_header() {
        let elements = classify_pages(&[page(1, "Light travels in straight lines through air.")]);
        assert_eq!(categories(&elements), vec![ElementCategory::NarrativeText]);
    }

    #[test]
    fn list_items_and_paragraph_text_are_split() {
        let elements = classify_pages(&[page(
            1,
            "• Speed is a scalar quantity\n2) Velocity has direction\nv = d / t\nm/s",
        )]);
        assert_eq!(
            categories(&elements),
            vec![
                ElementCategory::ListItem,
                ElementCategory::ListItem,
                ElementCategory::Text,
            ]
        );
        assert_eq!(elements[2].text, "v = d / t m/s");
    }

    #[test]
    fn column_aligned_lines_form_a_table() {
        let elements = classify_pages(&[page(
            1,
            "Quantity    Unit    Symbol\nForce    newton    N\nEnergy    joule    J\nThe table lists SI units used in this chapter.",
        )]);
        assert_eq!(
            categories(&elements),
            vec![ElementCategory::Table, ElementCategory::NarrativeText]
        );
        let html = elements[0].text_as_html.as_deref().expect("html");
        assert!(html.starts_with("<table><tr><td>Quantity</td><td>Unit</td><td>Symbol</td></tr>"));
        assert!(html.contains("<tr><td>Energy</td><td>joule</td><td>J</td></tr>"));
    }

    #[test]
    fn table_cells_are_escaped() {
        let element = table_element(&["a < b    x & y"], None);
        assert_eq!(
            element.text_as_html.as_deref(),
            Some("<table><tr><td>a &lt; b</td><td>x &amp; y</td></tr></table>")
        );
    }

    #[test]
    fn title_heuristics() {
        assert!(looks_like_title("Chapter 3: Work and Energy"));
        assert!(looks_like_title("3.2 Kinetic Energy"));
        assert!(looks_like_title("Laws of Motion"));
        assert!(!looks_like_title("the body keeps moving"));
        assert!(!looks_like_title("Energy Is Conserved."));
        assert!(!looks_like_title("42"));
    }

    #[test]
    fn page_number_footer_patterns() {
        assert!(PAGE_NUMBER.is_match("12"));
        assert!(PAGE_NUMBER.is_match("Page 3 of 10"));
        assert!(PAGE_NUMBER.is_match("3/10"));
        assert!(!PAGE_NUMBER.is_match("12 apples"));
    }

    const FAKE_JPEG: [u8; 6] = [0xFF, 0xD8, 0xFF, 0xE0, 0xFF, 0xD9];

    fn chapter_pages() -> [&'static [&'static str]; 2] {
        [
            &[
                "Physics for Class 10",
                "Chapter 1 Force",
                "- Force is a push or pull",
                "Quantity|Unit|Symbol",
                "Force|newton|N",
                "A force acts on a body and changes its motion.",
                "1",
            ],
            &[
                "Physics for Class 10",
                "Newton described three laws of motion in detail.",
                "2",
            ],
        ]
    }

    #[test]
    fn positioned_lines_are_split_and_classified() {
        let bytes = pdf_with_pages(&chapter_pages(), Some(jpeg_xobject(FAKE_JPEG.to_vec())));
        let elements = partition_pdf(&bytes).expect("partition");

        assert_eq!(
            categories(&elements),
            vec![
                ElementCategory::Header,
                ElementCategory::Title,
                ElementCategory::ListItem,
                ElementCategory::Table,
                ElementCategory::NarrativeText,
                ElementCategory::Footer,
                ElementCategory::Image,
                ElementCategory::Header,
                ElementCategory::NarrativeText,
                ElementCategory::Footer,
            ]
        );
        assert_eq!(elements[0].text, "Physics for Class 10");
        assert_eq!(elements[1].text, "Chapter 1 Force");
        assert_eq!(
            elements[3].text_as_html.as_deref(),
            Some(
                "<table><tr><td>Quantity</td><td>Unit</td><td>Symbol</td></tr>\
                 <tr><td>Force</td><td>newton</td><td>N</td></tr></table>"
            )
        );
        assert_eq!(elements[6].image_data.as_deref(), Some(FAKE_JPEG.as_slice()));
        assert_eq!(elements[6].page_number, Some(1));
        assert_eq!(elements[9].text, "2");
    }

    #[test]
    fn page_text_breaks_on_text_position_moves() {
        let bytes = pdf_with_pages(&[&["Work and Energy", "Energy|joule"]], None);
        let document = Document::load_mem(&bytes).expect("load");
        let page_id = document.get_pages()[&1];
        let text = page_text(&document, page_id).expect("text");
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines, vec!["Work and Energy", "Energy    joule"]);
    }

    #[test]
    fn unreferenced_images_are_ignored() {
        let bytes = pdf_with_pages(&[&["Light travels in straight lines through air."]], None);
        let mut document = Document::load_mem(&bytes).expect("load");
        document.add_object(jpeg_xobject(FAKE_JPEG.to_vec()));
        let mut with_orphan = Vec::new();
        document.save_to(&mut with_orphan).expect("save");

        let elements = partition_pdf(&with_orphan).expect("partition");
        assert_eq!(categories(&elements), vec![ElementCategory::NarrativeText]);
    }

    #[test]
    fn jpeg_payload_requires_dct_as_last_filter() {
        let plain = jpeg_xobject(FAKE_JPEG.to_vec());
        assert_eq!(jpeg_payload(&plain), ImagePayload::Jpeg(FAKE_JPEG.to_vec()));

        let flate = Stream::new(
            dictionary! { "Subtype" => "Image", "Filter" => "FlateDecode" },
            vec![1, 2, 3],
        );
        assert_eq!(jpeg_payload(&flate), ImagePayload::NotJpeg);

        let truncated = jpeg_xobject(vec![0x00, 0x01]);
        assert!(matches!(jpeg_payload(&truncated), ImagePayload::Unreadable(_)));

        let form = Stream::new(dictionary! { "Subtype" => "Form" }, Vec::new());
        assert_eq!(jpeg_payload(&form), ImagePayload::NotJpeg);

        let reversed = Stream::new(
            dictionary! {
                "Subtype" => "Image",
                "Filter" => vec![Object::from("DCTDecode"), Object::from("FlateDecode")],
            },
            FAKE_JPEG.to_vec(),
        );
        assert!(matches!(jpeg_payload(&reversed), ImagePayload::Unreadable(_)));
    }

    #[test]
    fn outer_filters_are_decoded_before_the_jpeg() {
        let mut padded = FAKE_JPEG.to_vec();
        padded.extend(std::iter::repeat_n(0u8, 256));
        let mut stream = Stream::new(Dictionary::new(), padded.clone());
        stream.compress().expect("compress");
        assert_ne!(stream.content, padded);
        stream.dict.set("Subtype", "Image");
        stream.dict.set(
            "Filter",
            vec![Object::from("FlateDecode"), Object::from("DCTDecode")],
        );

        assert_eq!(jpeg_payload(&stream), ImagePayload::Jpeg(padded));
    }

    #[test]
    fn undecodable_outer_filter_skips_the_image() {
        let stream = Stream::new(
            dictionary! {
                "Subtype" => "Image",
                "Filter" => vec![Object::from("FlateDecode"), Object::from("DCTDecode")],
            },
            FAKE_JPEG.to_vec(),
        );
        assert!(matches!(jpeg_payload(&stream), ImagePayload::Unreadable(_)));
    }

    #[test]
    fn invalid_pdf_bytes_fail() {
        assert!(matches!(
            partition_pdf(b"not a pdf"),
            Err(PartitionError::Pdf(_))
        ));
    }
}
