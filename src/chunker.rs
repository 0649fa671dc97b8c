//! Splitting long transcripts into capability-sized chunks.
//!
//! The classification capability has a hard input budget, so transcripts
//! above a size threshold are cut into pieces before being sent. Cuts prefer
//! a speaker boundary (a colon shortly before the size limit) over an
//! arbitrary mid-sentence position, and always land on UTF-8 char
//! boundaries. Concatenating the chunks reproduces the input exactly.

/// Default per-chunk budget in bytes.
pub const DEFAULT_MAX_CHUNK_BYTES: usize = 15_000;

/// How far back from the size limit we search for a speaker colon.
const BOUNDARY_LOOKBACK: usize = 500;

/// How far past a found colon the cut lands, so the start of the speaker's
/// line stays attached to its chunk.
const BOUNDARY_OVERSHOOT: usize = 50;

/// Split `text` into chunks of at most roughly `max_bytes` bytes.
///
/// Text at or under the budget comes back as a single chunk. The overshoot
/// past a speaker boundary means a chunk can slightly exceed `max_bytes`;
/// callers should treat the budget as approximate.
pub fn split_into_chunks(text: &str, max_bytes: usize) -> Vec<String> {
    if text.len() <= max_bytes {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut pos = 0;

    while pos < text.len() {
        let mut end = floor_char_boundary(text, (pos + max_bytes).min(text.len()));

        if end >= text.len() {
            chunks.push(text[pos..].to_string());
            break;
        }

        // Prefer cutting just after a speaker colon near the limit.
        let window_start = floor_char_boundary(text, end.saturating_sub(BOUNDARY_LOOKBACK).max(pos));
        if let Some(colon) = text[window_start..end].find(':') {
            let candidate =
                floor_char_boundary(text, (window_start + colon + BOUNDARY_OVERSHOOT).min(text.len()));
            if candidate > pos {
                end = candidate;
            }
        }

        if end <= pos {
            // Degenerate budget; take the rest rather than loop forever.
            end = text.len();
        }

        chunks.push(text[pos..end].to_string());
        pos = end;
    }

    chunks
}

/// Largest char boundary at or below `index`.
fn floor_char_boundary(text: &str, mut index: usize) -> usize {
    while index > 0 && !text.is_char_boundary(index) {
        index -= 1;
    }
    index
}
