//! Bounded plain-text extraction across supported file formats
//!
//! Supported: txt, md, csv, json, pdf, docx. Paginated formats accumulate
//! page/paragraph at a time and stop at the first structural boundary past
//! the character budget, then hard-trim to the budget.

use std::ffi::OsStr;
use std::io::Read;
use std::path::Path;

use quick_xml::events::Event;

use crate::{Error, Result};

const SUPPORTED_EXTENSIONS: [&str; 6] = ["txt", "md", "csv", "json", "pdf", "docx"];

/// Extracts bounded plain-text content from a resolved file
#[derive(Debug, Clone, Copy, Default)]
pub struct ContentReader;

impl ContentReader {
    /// Create a new content reader
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Read up to `max_chars` characters of text from `path`
    ///
    /// The result is trimmed of leading and trailing whitespace.
    ///
    /// # Errors
    ///
    /// - [`Error::NotFound`] if the file does not exist
    /// - [`Error::UnsupportedFormat`] if the extension is not supported
    /// - [`Error::Parse`] if a structured file cannot be parsed
    pub fn read(&self, path: &Path, max_chars: usize) -> Result<String> {
        if !path.exists() {
            return Err(Error::NotFound(format!("file not found: {}", path.display())));
        }

        let ext = path
            .extension()
            .and_then(OsStr::to_str)
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        let text = match ext.as_str() {
            "txt" | "md" | "csv" | "json" => read_plain(path, max_chars)?,
            "pdf" => read_pdf(path, max_chars)?,
            "docx" => read_docx(path, max_chars)?,
            other => {
                return Err(Error::UnsupportedFormat(format!(
                    "unsupported file type '.{other}'; supported: {}",
                    SUPPORTED_EXTENSIONS.join(", ")
                )));
            }
        };

        Ok(text.trim().to_string())
    }
}

/// Read a plain-text file lossily, truncated to `max_chars` characters
fn read_plain(path: &Path, max_chars: usize) -> Result<String> {
    let bytes = std::fs::read(path)?;
    let content = String::from_utf8_lossy(&bytes);
    Ok(truncate_chars(&content, max_chars))
}

/// Extract PDF text page by page until the budget is exceeded
fn read_pdf(path: &Path, max_chars: usize) -> Result<String> {
    let doc = lopdf::Document::load(path)
        .map_err(|e| Error::Parse(format!("failed to parse PDF {}: {e}", path.display())))?;

    let mut text = String::new();
    for &page_number in doc.get_pages().keys() {
        // Pages that fail text extraction contribute nothing
        let page_text = doc.extract_text(&[page_number]).unwrap_or_default();
        text.push_str(&page_text);

        if text.chars().count() > max_chars {
            text = truncate_chars(&text, max_chars);
            break;
        }
    }

    Ok(text)
}

/// Extract Word-document text paragraph by paragraph until the budget is
/// exceeded
fn read_docx(path: &Path, max_chars: usize) -> Result<String> {
    let file = std::fs::File::open(path)?;
    let mut archive = zip::ZipArchive::new(file)
        .map_err(|e| Error::Parse(format!("failed to open {}: {e}", path.display())))?;

    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|e| Error::Parse(format!("document body missing in {}: {e}", path.display())))?
        .read_to_string(&mut xml)
        .map_err(|e| Error::Parse(format!("document body unreadable: {e}")))?;

    let mut reader = quick_xml::Reader::from_str(&xml);
    let mut text = String::new();
    let mut in_run_text = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"t" => in_run_text = true,
            Ok(Event::Text(t)) if in_run_text => {
                let run = t
                    .unescape()
                    .map_err(|e| Error::Parse(format!("malformed document xml: {e}")))?;
                text.push_str(&run);
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_run_text = false,
                b"p" => {
                    text.push('\n');
                    if text.chars().count() > max_chars {
                        text = truncate_chars(&text, max_chars);
                        break;
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(Error::Parse(format!("malformed document xml: {e}"))),
            Ok(_) => {}
        }
    }

    Ok(text)
}

/// Truncate to at most `max` characters on a character boundary
fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        s.chars().take(max).collect()
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::io::Write;

    use super::*;

    fn write_file(dir: &Path, name: &str, content: &[u8]) -> std::path::PathBuf {
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        path
    }

    /// Build a minimal docx archive with the given paragraphs
    fn write_docx(dir: &Path, name: &str, paragraphs: &[&str]) -> std::path::PathBuf {
        let path = dir.join(name);
        let file = fs::File::create(&path).unwrap();
        let mut zip = zip::ZipWriter::new(file);
        let options = zip::write::SimpleFileOptions::default();

        let body: String = paragraphs
            .iter()
            .map(|p| format!("<w:p><w:r><w:t>{p}</w:t></w:r></w:p>"))
            .collect();
        let document = format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
             <w:document xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\">\
             <w:body>{body}</w:body></w:document>"
        );

        zip.start_file("word/document.xml", options).unwrap();
        zip.write_all(document.as_bytes()).unwrap();
        zip.finish().unwrap();
        path
    }

    #[test]
    fn plain_text_is_truncated_and_trimmed() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "notes.txt", b"  hello world, this is a note  ");

        let reader = ContentReader::new();
        assert_eq!(
            reader.read(&path, 1000).unwrap(),
            "hello world, this is a note"
        );

        let truncated = reader.read(&path, 7).unwrap();
        assert_eq!(truncated, "hello");
        assert!(truncated.chars().count() <= 7);
    }

    #[test]
    fn invalid_utf8_is_read_lossily() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "data.csv", b"a,b\xff,c");

        let reader = ContentReader::new();
        let content = reader.read(&path, 100).unwrap();
        assert!(content.starts_with("a,b"));
    }

    #[test]
    fn missing_file_is_not_found() {
        let reader = ContentReader::new();
        let err = reader.read(Path::new("/nonexistent/ghost.txt"), 100).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn unsupported_extension_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "song.mp3", b"not text");

        let reader = ContentReader::new();
        let err = reader.read(&path, 100).unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat(_)));
    }

    #[test]
    fn corrupt_pdf_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "broken.pdf", b"this is not a pdf");

        let reader = ContentReader::new();
        let err = reader.read(&path, 100).unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
    }

    #[test]
    fn docx_paragraphs_are_extracted() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_docx(dir.path(), "memo.docx", &["First paragraph.", "Second one."]);

        let reader = ContentReader::new();
        let content = reader.read(&path, 1000).unwrap();
        assert_eq!(content, "First paragraph.\nSecond one.");
    }

    #[test]
    fn docx_truncates_at_paragraph_boundary_then_hard_trims() {
        let dir = tempfile::tempdir().unwrap();
        let long = "x".repeat(40);
        let path = write_docx(dir.path(), "long.docx", &[&long, &long, "never reached"]);

        let reader = ContentReader::new();
        let content = reader.read(&path, 50).unwrap();
        // Budget exceeded after the second paragraph: hard-trimmed to 50,
        // before trailing trim
        assert!(content.chars().count() <= 50);
        assert!(!content.contains("never reached"));
    }

    #[test]
    fn corrupt_docx_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "broken.docx", b"not a zip archive");

        let reader = ContentReader::new();
        let err = reader.read(&path, 100).unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
    }
}
