//! Candidate identity heuristics: name, email, and phone pulled out of raw
//! CV text. Everything here is best-effort; absence is `None`, never an
//! error, because a CV with no detectable contact block is still scorable.

use serde::{Deserialize, Serialize};

use crate::document::segmenter::is_word_char;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CandidateIdentity {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// Words that disqualify a name candidate (section headers that the prefix
/// heuristics routinely pick up).
const NAME_BLOCKLIST: &[&str] = &[
    "education",
    "experience",
    "skills",
    "contact",
    "objective",
    "summary",
];

/// Extra blocked words for the line-scan fallback, which also sees ID-card
/// style lines ("Roll Number: ...") that the prefix methods never reach.
const LINE_SCAN_BLOCKLIST: &[&str] = &["roll", "number"];

/// Name heuristics only look at the top of the document.
const NAME_WINDOW_CHARS: usize = 300;
const MAX_NAME_CHARS: usize = 50;

/// Extracts name, email, and phone from raw CV text.
///
/// Email and phone are the first match anywhere in the text. The name is
/// tried three ways against the first 300 characters: the prefix before the
/// first phone number, then the prefix before the first email, then a scan
/// of the first three lines.
pub fn extract_candidate_info(text: &str) -> CandidateIdentity {
    let email = find_email(text).map(|(start, end)| text[start..end].to_string());
    let phone = find_phone(text).map(|(start, end)| text[start..end].to_string());

    let window_end = text
        .char_indices()
        .nth(NAME_WINDOW_CHARS)
        .map_or(text.len(), |(byte, _)| byte);
    let window = &text[..window_end];

    let mut name = None;
    if let Some((phone_start, _)) = find_phone(window) {
        name = name_from_prefix(&window[..phone_start]);
    }
    if name.is_none() {
        if let Some((email_start, _)) = find_email(window) {
            name = name_from_prefix(&window[..email_start]);
        }
    }
    if name.is_none() {
        name = name_from_leading_lines(text);
    }

    CandidateIdentity { name, email, phone }
}

/// Validates a prefix-based candidate: cut to the first non-blank line (a
/// prefix spanning several lines is never one name), strip boilerplate and
/// punctuation, then apply the shape rules.
fn name_from_prefix(prefix: &str) -> Option<String> {
    let stripped = strip_boilerplate(prefix.trim());
    let first_line = stripped.lines().map(str::trim).find(|line| !line.is_empty())?;
    let candidate = strip_punctuation(first_line);
    let candidate = candidate.trim();
    if is_plausible_name(candidate, &[]) {
        Some(candidate.to_string())
    } else {
        None
    }
}

/// Fallback: the first three lines of multi-line text, first plausible line
/// wins. Lines holding an email or phone are never names.
fn name_from_leading_lines(text: &str) -> Option<String> {
    let lines: Vec<&str> = text.split('\n').collect();
    if lines.len() < 2 {
        return None;
    }
    for line in lines.iter().take(3) {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let stripped = strip_boilerplate(line);
        let candidate = strip_punctuation(stripped);
        let candidate = candidate.trim();
        if is_plausible_name(candidate, LINE_SCAN_BLOCKLIST)
            && find_email(candidate).is_none()
            && find_phone(candidate).is_none()
        {
            return Some(candidate.to_string());
        }
    }
    None
}

/// 2 to 4 words, at most 50 characters, nothing from the blocklists.
fn is_plausible_name(candidate: &str, extra_blocked: &[&str]) -> bool {
    let word_count = candidate.split_whitespace().count();
    if !(2..=4).contains(&word_count) || candidate.chars().count() > MAX_NAME_CHARS {
        return false;
    }
    let lower = candidate.to_lowercase();
    !NAME_BLOCKLIST
        .iter()
        .chain(extra_blocked)
        .any(|blocked| lower.contains(blocked))
}

/// Strips a leading "Resume" / "CV" / "Curriculum Vitae" label and the
/// whitespace after it.
fn strip_boilerplate(text: &str) -> &str {
    for label in ["resume", "cv", "curriculum vitae"] {
        if let Some(end) = label_prefix_end(text, label) {
            return text[end..].trim_start();
        }
    }
    text
}

/// Case-insensitive anchored match of `label` at the start of `text`; a
/// space in the label matches any whitespace run. Returns the byte offset
/// one past the match.
fn label_prefix_end(text: &str, label: &str) -> Option<usize> {
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let mut pos = 0;
    for lc in label.chars() {
        if lc == ' ' {
            let begin = pos;
            while pos < chars.len() && chars[pos].1.is_whitespace() {
                pos += 1;
            }
            if pos == begin {
                return None;
            }
        } else {
            match chars.get(pos) {
                Some(&(_, tc)) if tc.eq_ignore_ascii_case(&lc) => pos += 1,
                _ => return None,
            }
        }
    }
    Some(chars.get(pos).map_or(text.len(), |&(byte, _)| byte))
}

/// Drops everything except word characters, whitespace, hyphens, and dots.
fn strip_punctuation(text: &str) -> String {
    text.chars()
        .filter(|&c| is_word_char(c) || c.is_whitespace() || c == '-' || c == '.')
        .collect()
}

// ────────────────────────────────────────────────────────────────────────────
// Email and phone matching
// ────────────────────────────────────────────────────────────────────────────

/// Finds the first email-shaped substring: a local part of letters, digits,
/// and `._%+-` starting at a word boundary, an `@`, and a dotted domain
/// ending in an alphabetic TLD of at least two characters. Returns the byte
/// range of the match, so trailing punctuation is naturally excluded.
pub fn find_email(text: &str) -> Option<(usize, usize)> {
    let chars: Vec<(usize, char)> = text.char_indices().collect();

    for at in 0..chars.len() {
        if chars[at].1 != '@' {
            continue;
        }

        // local part: expand left as far as allowed, then shrink to the
        // first position that sits on a word boundary
        let mut start = at;
        while start > 0 && is_local_char(chars[start - 1].1) {
            start -= 1;
        }
        while start < at {
            let prev_is_word = start > 0 && is_word_char(chars[start - 1].1);
            if prev_is_word == is_word_char(chars[start].1) {
                start += 1;
            } else {
                break;
            }
        }
        if start == at {
            continue;
        }

        // domain: expand right, then find the rightmost '.' whose
        // alphabetic run forms a valid TLD
        let mut domain_end = at + 1;
        while domain_end < chars.len() && is_domain_char(chars[domain_end].1) {
            domain_end += 1;
        }

        for dot in ((at + 2)..domain_end).rev() {
            if chars[dot].1 != '.' {
                continue;
            }
            let mut tld_end = dot + 1;
            while tld_end < chars.len() && chars[tld_end].1.is_ascii_alphabetic() {
                tld_end += 1;
            }
            let tld_len = tld_end - dot - 1;
            let boundary_ok = tld_end >= chars.len() || !is_word_char(chars[tld_end].1);
            if tld_len >= 2 && boundary_ok {
                let start_byte = chars[start].0;
                let end_byte = chars.get(tld_end).map_or(text.len(), |&(byte, _)| byte);
                return Some((start_byte, end_byte));
            }
        }
    }
    None
}

fn is_local_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '%' | '+' | '-')
}

fn is_domain_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '.' || c == '-'
}

/// Finds the first phone-shaped substring: an optional country code (`+`
/// and 1-3 digits), then 3-3-4 digits with optional parentheses around the
/// area code and `-`, `.`, or whitespace between groups.
pub fn find_phone(text: &str) -> Option<(usize, usize)> {
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    for start in 0..chars.len() {
        if let Some(end) = phone_match_at(&chars, start) {
            let start_byte = chars[start].0;
            let end_byte = chars.get(end).map_or(text.len(), |&(byte, _)| byte);
            return Some((start_byte, end_byte));
        }
    }
    None
}

fn phone_match_at(chars: &[(usize, char)], start: usize) -> Option<usize> {
    // with a country code first, longest digit count first
    let mut after_plus = start;
    if char_at(chars, start) == Some('+') {
        after_plus += 1;
    }
    let available = digit_run(chars, after_plus).min(3);
    for take in (1..=available).rev() {
        let mut pos = after_plus + take;
        if is_separator(char_at(chars, pos)) {
            pos += 1;
        }
        if let Some(end) = phone_core_at(chars, pos) {
            return Some(end);
        }
    }
    // then without one
    phone_core_at(chars, start)
}

/// The 3-3-4 core: `(?ddd)? sep? ddd sep? dddd`.
fn phone_core_at(chars: &[(usize, char)], mut pos: usize) -> Option<usize> {
    if char_at(chars, pos) == Some('(') {
        pos += 1;
    }
    pos = expect_digits(chars, pos, 3)?;
    if char_at(chars, pos) == Some(')') {
        pos += 1;
    }
    if is_separator(char_at(chars, pos)) {
        pos += 1;
    }
    pos = expect_digits(chars, pos, 3)?;
    if is_separator(char_at(chars, pos)) {
        pos += 1;
    }
    expect_digits(chars, pos, 4)
}

fn char_at(chars: &[(usize, char)], pos: usize) -> Option<char> {
    chars.get(pos).map(|&(_, c)| c)
}

fn expect_digits(chars: &[(usize, char)], pos: usize, count: usize) -> Option<usize> {
    for offset in 0..count {
        if !chars.get(pos + offset)?.1.is_ascii_digit() {
            return None;
        }
    }
    Some(pos + count)
}

fn digit_run(chars: &[(usize, char)], pos: usize) -> usize {
    chars[pos.min(chars.len())..]
        .iter()
        .take_while(|&&(_, c)| c.is_ascii_digit())
        .count()
}

fn is_separator(c: Option<char>) -> bool {
    matches!(c, Some(c) if c == '-' || c == '.' || c.is_whitespace())
}
