//! Section segmentation for CV text.
//!
//! CVs arrive as one flat string. Two strategies, picked by line count:
//! documents with real line breaks go through a line-oriented state machine
//! (a section cursor advanced by header lines), while short or single-line
//! blobs fall back to windowing the text between header keyword hits.

use serde::{Deserialize, Serialize};

// ────────────────────────────────────────────────────────────────────────────
// Section labels
// ────────────────────────────────────────────────────────────────────────────

/// The fixed set of labeled CV regions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionLabel {
    ContactInfo,
    Summary,
    Experience,
    Education,
    Skills,
    Certifications,
}

impl SectionLabel {
    /// Labels with header keywords, in match order. First match wins, so
    /// this order is part of the segmentation contract: a line like
    /// "EDUCATION AND EXPERIENCE" files under experience.
    pub const HEADER_PRIORITY: [SectionLabel; 5] = [
        SectionLabel::Experience,
        SectionLabel::Education,
        SectionLabel::Skills,
        SectionLabel::Summary,
        SectionLabel::Certifications,
    ];

    /// All labels, in section-map field order.
    pub const ALL: [SectionLabel; 6] = [
        SectionLabel::ContactInfo,
        SectionLabel::Summary,
        SectionLabel::Experience,
        SectionLabel::Education,
        SectionLabel::Skills,
        SectionLabel::Certifications,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SectionLabel::ContactInfo => "contact_info",
            SectionLabel::Summary => "summary",
            SectionLabel::Experience => "experience",
            SectionLabel::Education => "education",
            SectionLabel::Skills => "skills",
            SectionLabel::Certifications => "certifications",
        }
    }

    fn header_keywords(self) -> &'static [&'static str] {
        match self {
            SectionLabel::ContactInfo => &[],
            SectionLabel::Experience => &[
                "experience",
                "work history",
                "employment",
                "professional experience",
            ],
            SectionLabel::Education => &[
                "education",
                "academic",
                "qualification",
                "academic background",
            ],
            SectionLabel::Skills => &[
                "skills",
                "technical skills",
                "competencies",
                "core competencies",
            ],
            SectionLabel::Summary => &[
                "summary",
                "profile",
                "objective",
                "professional summary",
            ],
            SectionLabel::Certifications => &[
                "certification",
                "certificate",
                "license",
                "certifications",
            ],
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Section map
// ────────────────────────────────────────────────────────────────────────────

/// Labeled section bodies plus the verbatim input under `full_text`.
/// Every field is always present; sections the CV lacks stay empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SectionMap {
    pub contact_info: String,
    pub summary: String,
    pub experience: String,
    pub education: String,
    pub skills: String,
    pub certifications: String,
    pub full_text: String,
}

impl SectionMap {
    pub fn get(&self, label: SectionLabel) -> &str {
        match label {
            SectionLabel::ContactInfo => &self.contact_info,
            SectionLabel::Summary => &self.summary,
            SectionLabel::Experience => &self.experience,
            SectionLabel::Education => &self.education,
            SectionLabel::Skills => &self.skills,
            SectionLabel::Certifications => &self.certifications,
        }
    }

    fn set(&mut self, label: SectionLabel, value: String) {
        let field = match label {
            SectionLabel::ContactInfo => &mut self.contact_info,
            SectionLabel::Summary => &mut self.summary,
            SectionLabel::Experience => &mut self.experience,
            SectionLabel::Education => &mut self.education,
            SectionLabel::Skills => &mut self.skills,
            SectionLabel::Certifications => &mut self.certifications,
        };
        *field = value;
    }

    /// (name, body) pairs in fixed order, `full_text` last. The chunker
    /// indexes everything here, empty bodies included (it skips them).
    pub fn entries(&self) -> [(&'static str, &str); 7] {
        [
            ("contact_info", self.contact_info.as_str()),
            ("summary", self.summary.as_str()),
            ("experience", self.experience.as_str()),
            ("education", self.education.as_str()),
            ("skills", self.skills.as_str()),
            ("certifications", self.certifications.as_str()),
            ("full_text", self.full_text.as_str()),
        ]
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Segmentation
// ────────────────────────────────────────────────────────────────────────────

/// Splits raw CV text into labeled sections. Never fails: text with no
/// recognizable headers lands in `contact_info` (line mode) or only in
/// `full_text` (window mode).
pub fn segment(text: &str) -> SectionMap {
    let mut sections = SectionMap {
        full_text: text.to_string(),
        ..SectionMap::default()
    };

    let lines: Vec<&str> = text.split('\n').collect();
    if lines.len() > 5 {
        segment_lines(&lines, &mut sections);
    } else {
        segment_windows(text, &mut sections);
    }
    sections
}

/// Line-oriented state machine. The cursor starts at `ContactInfo`; a line
/// containing a header keyword flushes the accumulator into the current
/// section and moves the cursor. Header lines themselves are dropped, blank
/// lines are skipped, and a label seen twice keeps its later block.
fn segment_lines(lines: &[&str], sections: &mut SectionMap) {
    let mut current = SectionLabel::ContactInfo;
    let mut accumulated: Vec<&str> = Vec::new();

    for line in lines {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let header = SectionLabel::HEADER_PRIORITY
            .iter()
            .copied()
            .find(|&label| matches_header(line, label));

        match header {
            Some(next) => {
                if !accumulated.is_empty() {
                    sections.set(current, accumulated.join("\n"));
                    accumulated.clear();
                }
                current = next;
            }
            None => accumulated.push(line),
        }
    }

    if !accumulated.is_empty() {
        sections.set(current, accumulated.join("\n"));
    }
}

/// Strategy for text without real line breaks: each section body starts
/// right after its own first header keyword and stops at the nearest
/// following hit of any other section's headers. The prefix before the
/// earliest header becomes contact info.
fn segment_windows(text: &str, sections: &mut SectionMap) {
    let earliest = SectionLabel::HEADER_PRIORITY
        .iter()
        .filter_map(|&label| first_header_hit(text, label).map(|(start, _)| start))
        .min();
    if let Some(first) = earliest {
        let prefix = text[..first].trim();
        if !prefix.is_empty() {
            sections.contact_info = prefix.to_string();
        }
    }

    for &label in &SectionLabel::HEADER_PRIORITY {
        let (_, header_end) = match first_header_hit(text, label) {
            Some(hit) => hit,
            None => continue,
        };

        let rest = &text[header_end..];
        let mut body_end = rest.len();
        for &other in &SectionLabel::HEADER_PRIORITY {
            if other == label {
                continue;
            }
            if let Some((other_start, _)) = first_header_hit(rest, other) {
                body_end = body_end.min(other_start);
            }
        }

        let body = rest[..body_end].trim();
        if !body.is_empty() {
            sections.set(label, body.to_string());
        }
    }
}

fn matches_header(line: &str, label: SectionLabel) -> bool {
    label
        .header_keywords()
        .iter()
        .any(|keyword| find_keyword(line, keyword).is_some())
}

/// Earliest occurrence of any of the label's keywords, as a byte range.
/// Longer keywords still win at the same position because a shorter keyword
/// that stops mid-word fails the trailing boundary check.
fn first_header_hit(text: &str, label: SectionLabel) -> Option<(usize, usize)> {
    label
        .header_keywords()
        .iter()
        .filter_map(|keyword| find_keyword(text, keyword))
        .min_by_key(|&(start, _)| start)
}

/// Case-insensitive keyword search with word boundaries on both ends.
/// A space inside the keyword matches any whitespace run, so multi-word
/// headers survive the uneven spacing PDF extraction produces. Returns the
/// byte range of the first occurrence.
fn find_keyword(text: &str, keyword: &str) -> Option<(usize, usize)> {
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let keyword_chars: Vec<char> = keyword.chars().collect();

    for start in 0..chars.len() {
        let end = match keyword_match_at(&chars, start, &keyword_chars) {
            Some(end) => end,
            None => continue,
        };
        let before_ok = start == 0 || !is_word_char(chars[start - 1].1);
        let after_ok = end >= chars.len() || !is_word_char(chars[end].1);
        if before_ok && after_ok {
            let start_byte = chars[start].0;
            let end_byte = chars.get(end).map_or(text.len(), |&(byte, _)| byte);
            return Some((start_byte, end_byte));
        }
    }
    None
}

/// Matches `keyword` starting at `chars[start]`, returning the char index
/// one past the match.
fn keyword_match_at(chars: &[(usize, char)], start: usize, keyword: &[char]) -> Option<usize> {
    let mut pos = start;
    for &kc in keyword {
        if kc == ' ' {
            let begin = pos;
            while pos < chars.len() && chars[pos].1.is_whitespace() {
                pos += 1;
            }
            if pos == begin {
                return None;
            }
        } else {
            match chars.get(pos) {
                Some(&(_, tc)) if tc.eq_ignore_ascii_case(&kc) => pos += 1,
                _ => return None,
            }
        }
    }
    Some(pos)
}

pub(crate) fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_CV: &str = "Jane A. Smith\n\
jane.smith@example.com\n\
(555) 123-4567\n\
\n\
EXPERIENCE\n\
Senior Engineer at Acme Corp\n\
Built distributed systems in Rust\n\
\n\
EDUCATION\n\
BSc Computer Science, State University\n\
\n\
SKILLS\n\
Rust, Tokio, PostgreSQL";

    #[test]
    fn test_segment_labels_standard_cv() {
        let sections = segment(SAMPLE_CV);
        assert_eq!(
            sections.experience,
            "Senior Engineer at Acme Corp\nBuilt distributed systems in Rust"
        );
        assert_eq!(sections.education, "BSc Computer Science, State University");
        assert_eq!(sections.skills, "Rust, Tokio, PostgreSQL");
        assert_eq!(
            sections.contact_info,
            "Jane A. Smith\njane.smith@example.com\n(555) 123-4567"
        );
        assert_eq!(sections.full_text, SAMPLE_CV);
    }

    #[test]
    fn test_header_lines_are_dropped() {
        let sections = segment(SAMPLE_CV);
        assert!(!sections.experience.contains("EXPERIENCE"));
        assert!(!sections.skills.contains("SKILLS"));
    }

    #[test]
    fn test_duplicate_header_keeps_later_block() {
        let text = "One\nTwo\nSKILLS\nPython\nSKILLS\nRust\nmore lines\npadding";
        let sections = segment(text);
        assert_eq!(sections.skills, "Rust\nmore lines\npadding");
    }

    #[test]
    fn test_priority_order_on_combined_header() {
        let text = "a\nb\nc\nd\nEDUCATION AND EXPERIENCE\nAcme Corp, 5 years\n";
        let sections = segment(text);
        assert_eq!(sections.experience, "Acme Corp, 5 years");
        assert_eq!(sections.education, "");
    }

    #[test]
    fn test_headerless_text_lands_in_contact_info() {
        let text = "line1\nline2\nline3\nline4\nline5\nline6";
        let sections = segment(text);
        assert_eq!(sections.contact_info, "line1\nline2\nline3\nline4\nline5\nline6");
    }

    #[test]
    fn test_inflected_keyword_is_not_a_header() {
        // "Qualifications" does not hit the "qualification" keyword; the
        // boundary check requires the whole word.
        let text = "a\nb\nc\nd\ne\nQualifications listed on request\n";
        let sections = segment(text);
        assert_eq!(sections.education, "");
        assert!(sections.contact_info.contains("Qualifications listed on request"));
    }

    #[test]
    fn test_multiword_header_with_uneven_spacing() {
        let text = "a\nb\nc\nd\nWORK   HISTORY\nAcme Corp\n";
        let sections = segment(text);
        assert_eq!(sections.experience, "Acme Corp");
    }

    #[test]
    fn test_window_mode_for_single_line_text() {
        let text = "John Doe Experience: 5 years at Acme Skills: Rust and SQL";
        let sections = segment(text);
        assert_eq!(sections.contact_info, "John Doe");
        assert_eq!(sections.experience, ": 5 years at Acme");
        assert_eq!(sections.skills, ": Rust and SQL");
        assert_eq!(sections.full_text, text);
    }

    #[test]
    fn test_window_mode_without_headers() {
        let text = "just a short note";
        let sections = segment(text);
        assert_eq!(sections.contact_info, "");
        assert_eq!(sections.full_text, text);
    }

    #[test]
    fn test_find_keyword_boundaries() {
        assert!(find_keyword("my experience here", "experience").is_some());
        assert!(find_keyword("EXPERIENCE", "experience").is_some());
        assert!(find_keyword("inexperienced", "experience").is_none());
        assert!(find_keyword("experiences", "experience").is_none());
        assert_eq!(find_keyword("experience", "experience"), Some((0, 10)));
    }

    #[test]
    fn test_entries_order_ends_with_full_text() {
        let sections = segment(SAMPLE_CV);
        let entries = sections.entries();
        assert_eq!(entries[0].0, "contact_info");
        assert_eq!(entries[6].0, "full_text");
    }
}
