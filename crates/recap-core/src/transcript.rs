//! Bounded, author-grouped transcript assembly.
//!
//! Truncation is fairness-biased: the character budget is spread across
//! authors in first-seen order instead of cutting chronologically from the
//! end, so one prolific author cannot starve everyone else's representation
//! in the summary.

use recap_types::StoredMessage;
use std::collections::HashMap;

/// Default character budget: 900k tokens at a conservative 3 chars/token.
pub const DEFAULT_CHAR_BUDGET: usize = 900_000 * 3;

/// Format one message line: `[HH:MM] content ( attachments/embeds suffix)`.
/// The parenthetical is omitted when both counts are zero; when only one is
/// nonzero, only that part is shown. HH:MM is the UTC wall clock.
pub fn format_line(msg: &StoredMessage) -> String {
    let mut extras = Vec::new();
    if msg.attachment_count > 0 {
        extras.push(format!("{} attachments", msg.attachment_count));
    }
    if msg.embed_count > 0 {
        extras.push(format!("{} embeds", msg.embed_count));
    }
    let suffix = if extras.is_empty() {
        String::new()
    } else {
        format!(" ({})", extras.join(", "))
    };
    format!("[{}] {}{}\n", msg.sent_at.format("%H:%M"), msg.content, suffix)
}

/// Assemble the bounded transcript for one channel/day.
///
/// `messages` must already be in ascending `sent_at` order. Output is one
/// block per author in first-seen order, each a `**author:**` header plus
/// that author's lines in chronological order.
///
/// `budget` counts characters, the same unit the token estimate and the
/// reply chunker use, so multibyte content is not penalized.
///
/// Guarantees: never empty for non-empty input (the very first message is
/// force-appended even if it alone blows the budget), and otherwise the
/// total output never exceeds `budget` characters.
pub fn assemble(messages: &[StoredMessage], budget: usize) -> String {
    if messages.is_empty() {
        return String::new();
    }

    // Group by author, preserving first-seen author order.
    let mut order: Vec<&str> = Vec::new();
    let mut by_author: HashMap<&str, Vec<&StoredMessage>> = HashMap::new();
    for msg in messages {
        let author = msg.author_name.as_str();
        if !by_author.contains_key(author) {
            order.push(author);
        }
        by_author.entry(author).or_default().push(msg);
    }

    let mut blocks: Vec<String> = Vec::new();
    let mut total = 0usize;
    let mut emitted_any = false;

    'authors: for author in order {
        let header = format!("\n**{author}:**\n");
        let header_chars = header.chars().count();
        let mut block = header;
        let mut block_chars = header_chars;

        for msg in &by_author[author] {
            let line = format_line(msg);
            let line_chars = line.chars().count();
            if total + block_chars + line_chars > budget {
                if !emitted_any {
                    // Floor: non-empty input must never yield an empty
                    // transcript. Force the first message, emit its block,
                    // and stop everything.
                    block.push_str(&line);
                    blocks.push(block);
                    break 'authors;
                }
                // This author is out of budget; later authors may still
                // fit shorter lines.
                break;
            }
            block.push_str(&line);
            block_chars += line_chars;
            emitted_any = true;
        }

        // Bare headers are dropped.
        if block_chars > header_chars {
            total += block_chars;
            blocks.push(block);
        }

        if total > budget {
            break;
        }
    }

    blocks.concat()
}
