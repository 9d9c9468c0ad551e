//! Word document text extraction.

use super::types::DocxError;
use quick_xml::Reader;
use quick_xml::events::Event;
use std::io::{Cursor, Read};

const DOCUMENT_PART: &str = "word/document.xml";

/// Extract paragraph text from a DOCX archive, one paragraph per line.
///
/// Tabs and explicit breaks inside a paragraph are kept as `\t` and `\n`. Empty paragraphs are
/// preserved as blank lines so the splitter still sees section breaks.
pub fn extract_docx(bytes: &[u8]) -> Result<String, DocxError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))?;
    let mut xml = String::new();
    archive.by_name(DOCUMENT_PART)?.read_to_string(&mut xml)?;
    document_text(&xml)
}

fn document_text(xml: &str) -> Result<String, DocxError> {
    let mut reader = Reader::from_str(xml);
    let mut paragraphs = Vec::new();
    let mut current = String::new();
    let mut in_text = false;
    // Tab stops in `w:pPr/w:tabs` are also named `tab`; only run content counts.
    let mut in_run = false;

    loop {
        match reader.read_event()? {
            Event::Start(element) => match element.local_name().as_ref() {
                b"t" => in_text = true,
                b"r" => in_run = true,
                _ => {}
            },
            Event::Empty(element) => match element.local_name().as_ref() {
                b"tab" if in_run => current.push('\t'),
                b"br" | b"cr" if in_run => current.push('\n'),
                b"p" => paragraphs.push(String::new()),
                _ => {}
            },
            Event::Text(text) if in_text => {
                current.push_str(&text.unescape().map_err(quick_xml::Error::from)?)
            }
            Event::End(element) => match element.local_name().as_ref() {
                b"t" => in_text = false,
                b"r" => in_run = false,
                b"p" => paragraphs.push(std::mem::take(&mut current)),
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(paragraphs.join("\n").trim().to_string())
}

/// Build an in-memory DOCX whose body is `body` (raw WordprocessingML).
#[cfg(test)]
pub(crate) fn docx_with_body(body: &str) -> Vec<u8> {
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    let mut buffer = Cursor::new(Vec::new());
    {
        let mut writer = zip::ZipWriter::new(&mut buffer);
        writer
            .start_file(DOCUMENT_PART, SimpleFileOptions::default())
            .expect("start file");
        write!(
            writer,
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{body}</w:body></w:document>"#
        )
        .expect("write xml");
        writer.finish().expect("finish");
    }
    buffer.into_inner()
}
