//! Separator-priority text chunker.
//!
//! Splits document body text into [`Chunk`]s of at most `max_chars`
//! characters. Within each window the cut lands after the highest-priority
//! separator available (paragraph break, then line break, then sentence
//! terminator, then space), with a hard cut when the window has none.
//! Adjacent chunks share `overlap` characters across the boundary so
//! retrieval never loses context that straddles a cut.
//!
//! Each chunk receives a UUID, its contiguous index within the document,
//! and a SHA-256 hash of its text.

use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::models::Chunk;

/// Split text into overlapping chunks, respecting `max_chars`.
/// Requires `overlap < max_chars` (enforced at config load).
/// Empty or whitespace-only input yields no chunks; input shorter than
/// `max_chars` yields exactly one chunk equal to the input.
pub fn chunk_text(document_id: &str, text: &str, max_chars: usize, overlap: usize) -> Vec<Chunk> {
    let chars: Vec<char> = text.chars().collect();
    let mut chunks = Vec::new();
    let mut chunk_index: i64 = 0;
    let mut start = 0usize;

    while start < chars.len() {
        let window_end = (start + max_chars).min(chars.len());
        let cut = if window_end == chars.len() {
            window_end
        } else {
            find_cut(&chars, start, window_end)
        };

        let piece: String = chars[start..cut].iter().collect();
        if !piece.trim().is_empty() {
            chunks.push(make_chunk(document_id, chunk_index, &piece));
            chunk_index += 1;
        }

        if cut == chars.len() {
            break;
        }

        // Step back by the overlap, unless the chunk was so short that the
        // step would stall the scan.
        start = if cut - start > overlap { cut - overlap } else { cut };
    }

    chunks
}

/// Position to cut the window `chars[start..end]`, one past the
/// highest-priority separator found, or `end` when there is none.
fn find_cut(chars: &[char], start: usize, end: usize) -> usize {
    // Paragraph break first
    if end - start >= 2 {
        for i in (start..=end - 2).rev() {
            if chars[i] == '\n' && chars[i + 1] == '\n' {
                return i + 2;
            }
        }
    }

    for sep in ['\n', '.', ' '] {
        for i in (start..end).rev() {
            if chars[i] == sep {
                return i + 1;
            }
        }
    }

    end
}

fn make_chunk(document_id: &str, index: i64, text: &str) -> Chunk {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let hash = format!("{:x}", hasher.finalize());

    Chunk {
        id: Uuid::new_v4().to_string(),
        document_id: document_id.to_string(),
        chunk_index: index,
        text: text.to_string(),
        hash,
    }
}
