//! Deterministic line-pattern classification.
//!
//! This is the rule engine behind the same [`Classifier`] interface as the
//! hosted capability: speaker tags, scripture references, quoted titles and
//! music cues are recognized from surface patterns alone. Quality is lower
//! than the hosted classifier's, but the output is reproducible and the
//! engine has no availability failure mode, which makes it both a usable
//! fallback and the reference implementation of the detection contract.
//!
//! The same primitives also drive paragraph categorization in the style
//! extractor and the assembler, so every component agrees on what counts as
//! a speaker line or a music cue.

use async_trait::async_trait;

use crate::classifier::Classifier;
use crate::error::Result;
use crate::style::Category;
use crate::transcript::{ClassifiedParagraph, Run, TranscriptDocument};

/// Longest prefix (in bytes) we accept as a speaker name before a colon.
const MAX_SPEAKER_NAME_LEN: usize = 60;

/// Most words a speaker name may contain.
const MAX_SPEAKER_NAME_WORDS: usize = 5;

/// A classifier that applies the deterministic rule engine.
pub struct RuleClassifier;

#[async_trait]
impl Classifier for RuleClassifier {
    async fn classify(
        &self,
        transcript: &str,
        _style_context: Option<&str>,
    ) -> Result<TranscriptDocument> {
        Ok(classify_text(transcript))
    }
}

/// Classify a whole transcript.
///
/// The first non-empty line becomes the title. Pure music-glyph bumper lines
/// between the title and the first real paragraph are dropped; everything
/// else is classified line by line. Transcripts that arrive as one long line
/// are first segmented at speaker boundaries.
pub fn classify_text(text: &str) -> TranscriptDocument {
    let lines: Vec<String> = if text.trim().contains('\n') {
        text.lines().map(|line| line.trim().to_string()).collect()
    } else {
        split_single_line(text.trim())
    };

    let mut title = String::new();
    let mut title_seen = false;
    let mut body_seen = false;
    let mut paragraphs = Vec::new();

    for line in &lines {
        let line = line.as_str();
        if line.is_empty() {
            // Blank lines after the title carry vertical spacing.
            if title_seen {
                paragraphs.push(ClassifiedParagraph::plain(""));
            }
            continue;
        }
        if !title_seen {
            title = line.to_string();
            title_seen = true;
            continue;
        }
        if !body_seen && is_glyph_noise(line) {
            continue;
        }
        body_seen = true;
        paragraphs.push(classify_line(line));
    }

    TranscriptDocument { title, paragraphs }
}

/// Classify a single line into styled runs.
pub fn classify_line(line: &str) -> ClassifiedParagraph {
    if is_music_line(line) {
        // Music cues are preserved verbatim as one italic run.
        return ClassifiedParagraph {
            text: line.to_string(),
            runs: vec![Run {
                text: line.to_string(),
                bold: false,
                italic: true,
            }],
        };
    }

    // Collect attributed spans: (start, end, bold, italic).
    let mut spans: Vec<(usize, usize, bool, bool)> = Vec::new();
    if let Some(end) = speaker_prefix(line) {
        spans.push((0, end, true, false));
    }
    for (start, end) in scripture_spans(line) {
        spans.push((start, end, true, false));
    }
    for (start, end) in quoted_spans(line) {
        spans.push((start, end, false, true));
    }
    spans.sort_by_key(|span| span.0);

    // Overlaps resolve first-come: a scripture reference inside a quotation
    // stays part of the italic quotation.
    let mut kept: Vec<(usize, usize, bool, bool)> = Vec::new();
    for span in spans {
        if kept.last().is_none_or(|last| span.0 >= last.1) {
            kept.push(span);
        }
    }

    let mut runs = Vec::new();
    let mut pos = 0;
    for (start, end, bold, italic) in kept {
        if start > pos {
            let gap = &line[pos..start];
            if gap.chars().all(char::is_whitespace) {
                // A whitespace-only gap belongs to the styled run that
                // follows it, so a speaker tag plus a quotation yields
                // exactly two runs.
                runs.push(Run {
                    text: format!("{gap}{}", &line[start..end]),
                    bold,
                    italic,
                });
                pos = end;
                continue;
            }
            runs.push(Run {
                text: gap.to_string(),
                bold: false,
                italic: false,
            });
        }
        runs.push(Run {
            text: line[start..end].to_string(),
            bold,
            italic,
        });
        pos = end;
    }

    if runs.is_empty() {
        // No patterns matched; let the assembler apply category defaults.
        return ClassifiedParagraph::plain(line);
    }

    if pos < line.len() {
        runs.push(Run {
            text: line[pos..].to_string(),
            bold: false,
            italic: false,
        });
    }

    ClassifiedParagraph {
        text: line.to_string(),
        runs,
    }
}

/// Paragraph-level category for style selection.
pub(crate) fn categorize_line(line: &str) -> Category {
    let trimmed = line.trim();
    if is_music_line(trimmed) {
        Category::Music
    } else if speaker_prefix(trimmed).is_some() {
        Category::Speaker
    } else if !scripture_spans(trimmed).is_empty() {
        Category::Scripture
    } else {
        Category::Narration
    }
}

/// A line beginning with a music glyph is a music cue.
pub(crate) fn is_music_line(line: &str) -> bool {
    line.trim_start().starts_with('♪')
}

/// A non-empty line made of nothing but music glyphs and whitespace.
fn is_glyph_noise(line: &str) -> bool {
    !line.trim().is_empty() && line.chars().all(|c| c == '♪' || c.is_whitespace())
}

/// If the line opens with a capitalized name followed by a colon, return the
/// byte index just past the colon.
pub(crate) fn speaker_prefix(line: &str) -> Option<usize> {
    let colon = line.find(':')?;
    let name = line[..colon].trim_end();
    if name.is_empty() || name.len() > MAX_SPEAKER_NAME_LEN {
        return None;
    }
    let first = name.chars().next()?;
    if !first.is_uppercase() {
        return None;
    }
    if !name
        .chars()
        .all(|c| c.is_alphabetic() || matches!(c, ' ' | '.' | '\'' | '-'))
    {
        return None;
    }
    if name.split_whitespace().count() > MAX_SPEAKER_NAME_WORDS {
        return None;
    }
    Some(colon + 1)
}

/// Byte ranges of scripture references ("1 John 2:18", "2 Timothy 3:1-5",
/// "John 3:16").
pub(crate) fn scripture_spans(text: &str) -> Vec<(usize, usize)> {
    let words = words_with_offsets(text);
    let mut spans = Vec::new();
    let mut i = 0;
    while i < words.len() {
        if let Some((end, consumed)) = match_reference(&words[i..]) {
            spans.push((words[i].0, end));
            i += consumed;
        } else {
            i += 1;
        }
    }
    spans
}

/// Match an ordinal-book-chapter:verse reference at the head of `words`.
/// Returns the byte index past the match and the number of words consumed.
fn match_reference(words: &[(usize, &str)]) -> Option<(usize, usize)> {
    let mut idx = 0;

    // Optional leading ordinal ("1 John", "2 Timothy").
    if words.get(idx).is_some_and(|(_, w)| is_ordinal(w)) {
        idx += 1;
    }

    // One book-name word, optionally two ("Song Solomon" style is rare
    // enough that two suffices).
    if !words.get(idx).is_some_and(|(_, w)| is_book_word(w)) {
        return None;
    }
    idx += 1;
    if words.get(idx).is_some_and(|(_, w)| is_book_word(w))
        && words
            .get(idx + 1)
            .is_some_and(|(_, w)| chapter_verse_len(w).is_some())
    {
        idx += 1;
    }

    let (start, token) = *words.get(idx)?;
    let len = chapter_verse_len(token)?;
    Some((start + len, idx + 1))
}

fn is_ordinal(word: &str) -> bool {
    !word.is_empty() && word.len() <= 2 && word.bytes().all(|b| b.is_ascii_digit())
}

fn is_book_word(word: &str) -> bool {
    word.chars().next().is_some_and(char::is_uppercase) && word.chars().all(char::is_alphabetic)
}

/// Length of a leading "chapter:verse" pattern in `token`, excluding any
/// trailing punctuation. Chapter and verse both admit a "-range" suffix.
fn chapter_verse_len(token: &str) -> Option<usize> {
    let bytes = token.as_bytes();
    let mut i = eat_digits(bytes, 0)?;
    if bytes.get(i) == Some(&b'-') {
        i = eat_digits(bytes, i + 1)?;
    }
    if bytes.get(i) != Some(&b':') {
        return None;
    }
    i = eat_digits(bytes, i + 1)?;
    if bytes.get(i) == Some(&b'-') {
        if let Some(j) = eat_digits(bytes, i + 1) {
            i = j;
        }
    }
    Some(i)
}

fn eat_digits(bytes: &[u8], start: usize) -> Option<usize> {
    let mut i = start;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    (i > start).then_some(i)
}

/// Byte ranges of quoted spans, quote marks included. Straight and curly
/// double quotes are both recognized; an unmatched opener yields no span.
fn quoted_spans(text: &str) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut open: Option<(usize, char)> = None;
    for (i, c) in text.char_indices() {
        match open {
            None if c == '"' => open = Some((i, '"')),
            None if c == '“' => open = Some((i, '”')),
            Some((start, close)) if c == close => {
                spans.push((start, i + c.len_utf8()));
                open = None;
            }
            _ => {}
        }
    }
    spans
}

fn words_with_offsets(text: &str) -> Vec<(usize, &str)> {
    let mut out = Vec::new();
    let mut start = None;
    for (i, c) in text.char_indices() {
        if c.is_whitespace() {
            if let Some(s) = start.take() {
                out.push((s, &text[s..i]));
            }
        } else if start.is_none() {
            start = Some(i);
        }
    }
    if let Some(s) = start {
        out.push((s, &text[s..]));
    }
    out
}

/// Segment a transcript that arrived as one long line.
///
/// Scans for capitalized-name-plus-colon speaker boundaries and splits just
/// before each one. Text with no such boundary comes back whole.
fn split_single_line(text: &str) -> Vec<String> {
    let mut points = Vec::new();
    let mut prev: Option<char> = None;
    let mut skip_until = 0;

    for (i, c) in text.char_indices() {
        let at_boundary = prev.is_none_or(char::is_whitespace);
        prev = Some(c);
        if i < skip_until || !at_boundary || !c.is_uppercase() {
            continue;
        }
        if let Some(len) = speaker_prefix(&text[i..]) {
            let after = &text[i + len..];
            if after.is_empty() || after.starts_with(' ') {
                if i > 0 {
                    points.push(i);
                }
                skip_until = i + len;
            }
        }
    }

    if points.is_empty() {
        return vec![text.to_string()];
    }

    let mut segments = Vec::new();
    let mut start = 0;
    for point in points {
        let segment = text[start..point].trim();
        if !segment.is_empty() {
            segments.push(segment.to_string());
        }
        start = point;
    }
    let last = text[start..].trim();
    if !last.is_empty() {
        segments.push(last.to_string());
    }
    segments
}
