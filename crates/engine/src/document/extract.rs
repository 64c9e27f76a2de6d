use std::path::Path;

use crate::errors::EngineError;

/// Extracts normalized plain text from a CV file on disk.
///
/// Supported formats: `.pdf` (via pdf-extract on the blocking pool, since
/// PDF parsing is CPU-bound) and `.txt`. Anything else is rejected with
/// `UnsupportedFormat` so callers can tell "bad file" from "bad format".
pub async fn extract_text(path: &Path) -> Result<String, EngineError> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_default();

    let raw = match extension.as_str() {
        "pdf" => extract_pdf(path).await?,
        "txt" => tokio::fs::read_to_string(path).await.map_err(|e| {
            EngineError::Extraction(format!("Failed to read {}: {e}", path.display()))
        })?,
        _ => {
            return Err(EngineError::UnsupportedFormat(format!(
                "{} (supported: .pdf, .txt)",
                path.display()
            )))
        }
    };

    Ok(clean_text(&raw))
}

async fn extract_pdf(path: &Path) -> Result<String, EngineError> {
    let path = path.to_owned();
    let text = tokio::task::spawn_blocking(move || pdf_extract::extract_text(&path))
        .await
        .map_err(|e| EngineError::Extraction(format!("PDF extraction task failed: {e}")))?
        .map_err(|e| EngineError::Extraction(format!("Failed to extract PDF text: {e}")))?;
    Ok(text)
}

/// Normalizes whitespace while keeping line structure intact (the segmenter
/// is line-oriented): runs of spaces and tabs collapse to one space, runs of
/// blank lines collapse to a single newline, and the ends are trimmed.
pub fn clean_text(text: &str) -> String {
    // horizontal whitespace first
    let mut collapsed = String::with_capacity(text.len());
    let mut in_gap = false;
    for ch in text.chars() {
        if ch == ' ' || ch == '\t' {
            if !in_gap {
                collapsed.push(' ');
            }
            in_gap = true;
        } else {
            collapsed.push(ch);
            in_gap = false;
        }
    }

    // then newline runs, swallowing any whitespace trapped between them
    let mut out = String::with_capacity(collapsed.len());
    let mut iter = collapsed.chars().peekable();
    while let Some(ch) = iter.next() {
        if ch != '\n' {
            out.push(ch);
            continue;
        }
        let mut tail = String::new();
        while let Some(&next) = iter.peek() {
            if !next.is_whitespace() {
                break;
            }
            if next == '\n' {
                tail.clear();
            } else {
                tail.push(next);
            }
            iter.next();
        }
        out.push('\n');
        out.push_str(&tail);
    }

    out.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unknown_extension_rejected() {
        let err = extract_text(Path::new("cv.docx")).await.unwrap_err();
        assert!(matches!(err, EngineError::UnsupportedFormat(_)));
    }

    #[tokio::test]
    async fn test_missing_extension_rejected() {
        let err = extract_text(Path::new("cv")).await.unwrap_err();
        assert!(matches!(err, EngineError::UnsupportedFormat(_)));
    }

    #[tokio::test]
    async fn test_txt_file_read_and_cleaned() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cv.txt");
        tokio::fs::write(&path, "Jane  Smith\n\n\nEngineer\t at  Acme\n")
            .await
            .unwrap();

        let text = extract_text(&path).await.unwrap();
        assert_eq!(text, "Jane Smith\nEngineer at Acme");
    }

    #[test]
    fn test_clean_text_collapses_spaces_and_tabs() {
        assert_eq!(clean_text("a  \t b"), "a b");
    }

    #[test]
    fn test_clean_text_collapses_blank_lines() {
        assert_eq!(clean_text("a\n\n\nb"), "a\nb");
        assert_eq!(clean_text("a\n \n b"), "a\n b");
    }

    #[test]
    fn test_clean_text_keeps_single_newlines() {
        assert_eq!(clean_text("line one\nline two"), "line one\nline two");
    }

    #[test]
    fn test_clean_text_trims_ends() {
        assert_eq!(clean_text("  \n text \n  "), "text");
    }
}
