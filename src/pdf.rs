use std::panic::AssertUnwindSafe;
use std::path::Path;

use crate::error::{LedgerError, Result};
use crate::models::{ExtractedDocument, Page};

/// Extract page text from a PDF, or from a `.txt` file that already holds
/// extracted text. Pages are separated by form feeds in both cases.
pub fn extract_document(path: &Path) -> Result<ExtractedDocument> {
    let is_text = path
        .extension()
        .is_some_and(|e| e.eq_ignore_ascii_case("txt"));
    let text = if is_text {
        std::fs::read_to_string(path)?
    } else {
        let bytes = std::fs::read(path)?;
        extract_pdf_text(&bytes).map_err(|detail| LedgerError::Extraction {
            path: path.display().to_string(),
            detail,
        })?
    };
    let pages = split_pages(&text);
    if pages.is_empty() {
        return Err(LedgerError::Extraction {
            path: path.display().to_string(),
            detail: "no text found (scanned or empty document?)".to_string(),
        });
    }
    tracing::debug!(path = %path.display(), pages = pages.len(), "extracted text");
    Ok(ExtractedDocument {
        path: path.to_path_buf(),
        pages,
    })
}

/// pdf-extract panics on some malformed documents, so a panic is caught and
/// reported as a failure of this file only.
fn extract_pdf_text(bytes: &[u8]) -> std::result::Result<String, String> {
    match std::panic::catch_unwind(AssertUnwindSafe(|| pdf_extract::extract_text_from_mem(bytes))) {
        Ok(Ok(text)) => Ok(text),
        Ok(Err(e)) => Err(e.to_string()),
        Err(_) => Err("pdf parser panicked".to_string()),
    }
}

/// Split flattened text into pages of right-trimmed lines. Blank pages are
/// dropped but page numbers still count them.
pub fn split_pages(text: &str) -> Vec<Page> {
    text.split('\x0C')
        .enumerate()
        .filter(|(_, content)| !content.trim().is_empty())
        .map(|(i, content)| Page {
            number: i + 1,
            lines: content.lines().map(|l| l.trim_end().to_string()).collect(),
        })
        .collect()
}

/// One page whose content stream selects a font the page never declares.
#[cfg(test)]
pub(crate) fn pdf_with_undeclared_font() -> Vec<u8> {
    let stream = "BT /F1 12 Tf 72 712 Td (Job # 4285671) Tj ET";
    let objects = [
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        "<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_string(),
        "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Contents 4 0 R >>".to_string(),
        format!("<< /Length {} >>\nstream\n{stream}\nendstream", stream.len()),
    ];
    let mut pdf = String::from("%PDF-1.4\n");
    let mut offsets = Vec::new();
    for (i, body) in objects.iter().enumerate() {
        offsets.push(pdf.len());
        pdf.push_str(&format!("{} 0 obj\n{body}\nendobj\n", i + 1));
    }
    let xref = pdf.len();
    pdf.push_str(&format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1));
    for offset in offsets {
        pdf.push_str(&format!("{offset:010} 00000 n \n"));
    }
    pdf.push_str(&format!(
        "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{xref}\n%%EOF\n",
        objects.len() + 1
    ));
    pdf.into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_single_page() {
        let pages = split_pages("Job # 1\nAcme Corp  \n");
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].number, 1);
        assert_eq!(pages[0].lines, vec!["Job # 1".to_string(), "Acme Corp".to_string()]);
    }

    #[test]
    fn test_split_skips_blank_pages() {
        let pages = split_pages("one\x0C\x0C  \x0Cfour");
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].number, 1);
        assert_eq!(pages[1].number, 4);
    }

    #[test]
    fn test_extract_text_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sheet.txt");
        std::fs::write(&path, "Job # 1\nAcme\x0CJob # 2\nBeta").unwrap();
        let doc = extract_document(&path).unwrap();
        assert_eq!(doc.pages.len(), 2);
        assert_eq!(doc.all_lines().count(), 4);
    }

    #[test]
    fn test_corrupt_pdf_is_extraction_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.pdf");
        std::fs::write(&path, b"not a pdf at all").unwrap();
        let err = extract_document(&path).unwrap_err();
        assert!(matches!(err, LedgerError::Extraction { .. }));
    }

    #[test]
    fn test_empty_text_file_is_extraction_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.txt");
        std::fs::write(&path, "\n\n").unwrap();
        assert!(matches!(extract_document(&path), Err(LedgerError::Extraction { .. })));
    }

    #[test]
    fn test_pdf_parser_panic_is_extraction_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("no_resources.pdf");
        std::fs::write(&path, pdf_with_undeclared_font()).unwrap();
        let err = extract_document(&path).unwrap_err();
        assert!(matches!(err, LedgerError::Extraction { .. }));
    }

    #[test]
    fn test_document_keeps_source_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sheet.txt");
        std::fs::write(&path, "Job # 1\n").unwrap();
        assert_eq!(extract_document(&path).unwrap().path, path);
    }
}
