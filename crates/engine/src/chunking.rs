//! Overlapping text windows for embedding.
//!
//! Windows prefer natural break points (paragraph break, then line break,
//! then space) and carry a fixed character overlap into the next window so
//! context is not lost at the seams. Offsets are in characters, not bytes;
//! CVs are full of non-ASCII names.

use crate::document::segmenter::SectionMap;

/// One window of section text plus its position metadata.
#[derive(Debug, Clone)]
pub struct SectionChunk {
    pub text: String,
    pub section: &'static str,
    pub chunk_id: usize,
    pub total_chunks: usize,
}

impl SectionChunk {
    /// Metadata object stored alongside the chunk text in the vector index.
    pub fn metadata(&self) -> serde_json::Value {
        serde_json::json!({
            "section": self.section,
            "chunk_id": self.chunk_id,
            "total_chunks": self.total_chunks,
        })
    }
}

/// Chunks every non-empty entry of a section map (the verbatim `full_text`
/// included) and tags each piece with its origin.
pub fn split_sections(sections: &SectionMap, size: usize, overlap: usize) -> Vec<SectionChunk> {
    let mut chunks = Vec::new();
    for (name, body) in sections.entries() {
        if body.trim().is_empty() {
            continue;
        }
        let pieces = split_text(body, size, overlap);
        let total = pieces.len();
        for (chunk_id, text) in pieces.into_iter().enumerate() {
            chunks.push(SectionChunk {
                text,
                section: name,
                chunk_id,
                total_chunks: total,
            });
        }
    }
    chunks
}

/// Splits text into windows of at most `size` characters overlapping by
/// exactly `overlap` characters. Each cut lands just after the rightmost
/// paragraph break in the window, else the rightmost line break, else the
/// rightmost space, else at the hard limit; the separator stays with the
/// chunk before it. Whitespace-only windows are dropped, and whitespace
/// is otherwise preserved so overlaps stay exact.
pub fn split_text(text: &str, size: usize, overlap: usize) -> Vec<String> {
    if text.trim().is_empty() || size == 0 {
        return Vec::new();
    }
    // keeps the walk advancing even if called with a bad pair directly
    let overlap = overlap.min(size - 1);

    let chars: Vec<char> = text.chars().collect();
    let mut chunks = Vec::new();
    let mut start = 0usize;

    while start < chars.len() {
        let end = (start + size).min(chars.len());
        let cut = if end == chars.len() {
            end
        } else {
            pick_break(&chars, start, end, overlap)
        };

        let chunk: String = chars[start..cut].iter().collect();
        if !chunk.trim().is_empty() {
            chunks.push(chunk);
        }

        if cut == chars.len() {
            break;
        }
        start = cut - overlap;
    }

    chunks
}

/// Best cut position in the current window. A break is only usable if the
/// next window would still start after the current one (`cut - overlap >
/// start`), which is what makes the overlap exact rather than best-effort.
fn pick_break(chars: &[char], start: usize, end: usize, overlap: usize) -> usize {
    let min_cut = start + overlap + 1;

    let paragraph = rightmost_cut(min_cut, end, |cut| {
        cut >= 2 && chars[cut - 1] == '\n' && chars[cut - 2] == '\n'
    });
    if let Some(cut) = paragraph {
        return cut;
    }

    let line = rightmost_cut(min_cut, end, |cut| chars[cut - 1] == '\n');
    if let Some(cut) = line {
        return cut;
    }

    let space = rightmost_cut(min_cut, end, |cut| chars[cut - 1] == ' ');
    if let Some(cut) = space {
        return cut;
    }

    end
}

fn rightmost_cut(min_cut: usize, end: usize, is_break: impl Fn(usize) -> bool) -> Option<usize> {
    (min_cut..=end).rev().find(|&cut| is_break(cut))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::segmenter::segment;

    #[test]
    fn test_empty_and_whitespace_input() {
        assert!(split_text("", 200, 20).is_empty());
        assert!(split_text("   \n\n  ", 200, 20).is_empty());
    }

    #[test]
    fn test_short_text_is_one_chunk() {
        let chunks = split_text("short text", 500, 50);
        assert_eq!(chunks, vec!["short text".to_string()]);
    }

    #[test]
    fn test_unbroken_text_hard_cuts_with_exact_overlap() {
        let text: String = std::iter::repeat('x').take(1000).collect();
        let chunks = split_text(&text, 200, 20);

        assert_eq!(chunks.len(), 6);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 200);
        }
        for pair in chunks.windows(2) {
            let tail: String = pair[0].chars().rev().take(20).collect::<Vec<_>>().iter().rev().collect();
            let head: String = pair[1].chars().take(20).collect();
            assert_eq!(tail, head);
        }
        // stitching the chunks back together minus overlaps restores the text
        let mut rebuilt = chunks[0].clone();
        for chunk in &chunks[1..] {
            rebuilt.extend(chunk.chars().skip(20));
        }
        assert_eq!(rebuilt, text);
    }

    #[test]
    fn test_paragraph_break_preferred_over_space() {
        // the window also holds a space later in the text; the earlier
        // paragraph break still wins
        let text = format!("{}\n\n{} {}", "a".repeat(30), "b".repeat(10), "c".repeat(60));
        let chunks = split_text(&text, 50, 5);
        assert_eq!(chunks[0], format!("{}\n\n", "a".repeat(30)));
    }

    #[test]
    fn test_line_break_preferred_over_space() {
        let text = format!("{}\n{} {}", "a".repeat(30), "b".repeat(10), "c".repeat(60));
        let chunks = split_text(&text, 50, 5);
        assert_eq!(chunks[0], format!("{}\n", "a".repeat(30)));
    }

    #[test]
    fn test_space_break_keeps_words_whole() {
        let text = "alpha beta gamma delta epsilon zeta eta theta iota";
        let chunks = split_text(text, 20, 4);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 20);
        }
        // no word is split: every chunk edge that is not the text edge
        // falls on a space carried at the end of the earlier chunk
        for chunk in &chunks[..chunks.len() - 1] {
            assert!(chunk.ends_with(' '), "chunk {chunk:?} should end on a space");
        }
    }

    #[test]
    fn test_overlap_is_exact_at_soft_breaks() {
        let text = "alpha beta gamma delta epsilon zeta eta theta iota";
        let chunks = split_text(text, 20, 4);
        for pair in chunks.windows(2) {
            let tail: String = pair[0].chars().rev().take(4).collect::<Vec<_>>().iter().rev().collect();
            let head: String = pair[1].chars().take(4).collect();
            assert_eq!(tail, head);
        }
    }

    #[test]
    fn test_split_sections_tags_origin() {
        let sections = segment(
            "Jane A. Smith\njane@example.com\n555-123-4567\n\nSKILLS\nRust, Tokio\n\nEXPERIENCE\nAcme Corp",
        );
        let chunks = split_sections(&sections, 500, 50);

        let sections_seen: Vec<&str> = chunks.iter().map(|c| c.section).collect();
        assert!(sections_seen.contains(&"contact_info"));
        assert!(sections_seen.contains(&"skills"));
        assert!(sections_seen.contains(&"experience"));
        assert!(sections_seen.contains(&"full_text"));
        assert!(!sections_seen.contains(&"education"));

        for chunk in &chunks {
            assert_eq!(chunk.total_chunks, 1, "small sections fit one chunk");
            assert_eq!(chunk.chunk_id, 0);
            let meta = chunk.metadata();
            assert_eq!(meta["section"], chunk.section);
            assert_eq!(meta["chunk_id"], 0);
        }
    }

    #[test]
    fn test_split_sections_numbers_chunks_in_order() {
        let long_skills = "rust tokio axum serde sqlx redis kafka ".repeat(30);
        let sections = SectionMap {
            skills: long_skills,
            ..SectionMap::default()
        };
        let chunks = split_sections(&sections, 100, 10);

        assert!(chunks.len() > 1);
        let total = chunks.len();
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.chunk_id, i);
            assert_eq!(chunk.total_chunks, total);
            assert_eq!(chunk.section, "skills");
        }
    }
}
