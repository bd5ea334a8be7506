/// Platform-message chunking for long summaries.
///
/// Replies over `SINGLE_MESSAGE_LIMIT` characters are split into chunks of at
/// most `MAX_CHUNK_CHARS`, capped at `MAX_CHUNKS`; anything past the cap is
/// dropped. That truncation is a documented limitation of the reference
/// behavior, kept as-is. Non-final chunks get a trailing ellipsis, including
/// the last kept chunk when more were dropped.
pub const SINGLE_MESSAGE_LIMIT: usize = 1024;
pub const MAX_CHUNK_CHARS: usize = 1020;
pub const MAX_CHUNKS: usize = 3;

pub fn chunk_reply(text: &str) -> Vec<String> {
    if text.chars().count() <= SINGLE_MESSAGE_LIMIT {
        return vec![text.to_string()];
    }

    let chars: Vec<char> = text.chars().collect();
    let total_chunks = chars.len().div_ceil(MAX_CHUNK_CHARS);

    chars
        .chunks(MAX_CHUNK_CHARS)
        .take(MAX_CHUNKS)
        .enumerate()
        .map(|(i, chunk)| {
            let mut piece: String = chunk.iter().collect();
            if i + 1 < total_chunks {
                piece.push_str("...");
            }
            piece
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_reply_is_one_chunk() {
        let chunks = chunk_reply("all done");
        assert_eq!(chunks, vec!["all done".to_string()]);
    }

    #[test]
    fn at_limit_is_one_chunk() {
        let text = "x".repeat(SINGLE_MESSAGE_LIMIT);
        assert_eq!(chunk_reply(&text).len(), 1);
    }

    #[test]
    fn long_reply_splits_with_ellipsis() {
        let text = "x".repeat(2000);
        let chunks = chunk_reply(&text);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].chars().count(), MAX_CHUNK_CHARS + 3);
        assert!(chunks[0].ends_with("..."));
        assert!(!chunks[1].ends_with("..."));
    }

    #[test]
    fn caps_at_three_chunks_and_marks_truncation() {
        let text = "x".repeat(MAX_CHUNK_CHARS * 5);
        let chunks = chunk_reply(&text);
        assert_eq!(chunks.len(), MAX_CHUNKS);
        // Two more chunks existed, so even the last kept one is elided.
        assert!(chunks[2].ends_with("..."));
    }
}
