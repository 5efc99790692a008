use std::fmt::Write;

use crate::types::Memory;

/// Returned when there is nothing to recall. The downstream agent reads it
/// as "don't personalize".
pub const FIRST_CONVERSATION: &str = "This is the first conversation with this user.";

const HEADER: &str = "Relevant memories from previous conversations:";

const INSTRUCTION: &str = "Use this context to provide personalized, empathetic responses \
that acknowledge the user's history.";

/// Render retrieved memories into a prompt-ready block of plain text.
///
/// Entries keep their input order and are numbered from 1. Each carries the
/// note's date and content, plus `Sentiment:` and `Topic:` lines when known.
/// Pure: same memories in, same string out.
pub fn build_context(memories: &[Memory]) -> String {
    if memories.is_empty() {
        return FIRST_CONVERSATION.to_string();
    }

    let mut out = String::new();
    out.push_str(HEADER);
    out.push_str("\n\n");

    for (i, memory) in memories.iter().enumerate() {
        // Writing into a String can't fail.
        let _ = writeln!(
            out,
            "{}. [{}] {}",
            i + 1,
            memory.timestamp.format("%B %-d, %Y"),
            memory.content
        );
        if let Some(ref sentiment) = memory.sentiment {
            let _ = writeln!(out, "   Sentiment: {sentiment}");
        }
        if let Some(ref topic) = memory.topic {
            let _ = writeln!(out, "   Topic: {topic}");
        }
    }

    out.push('\n');
    out.push_str(INSTRUCTION);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};

    fn memory(id: &str, content: &str, ts: &str) -> Memory {
        Memory {
            id: id.into(),
            content: content.into(),
            timestamp: ts.parse::<DateTime<Utc>>().unwrap(),
            sentiment: None,
            topic: None,
            similarity: None,
        }
    }

    #[test]
    fn empty_is_first_conversation() {
        assert_eq!(build_context(&[]), FIRST_CONVERSATION);
    }

    #[test]
    fn single_entry_with_sentiment() {
        let mut m = memory("1", "Hello", "2024-01-01T00:00:00Z");
        m.sentiment = Some("happy".into());

        let context = build_context(&[m]);
        assert!(context.contains("Hello"));
        assert!(context.contains("1. [January 1, 2024] Hello"));
        assert!(context.lines().any(|l| l.contains("Sentiment: happy")));
        assert!(!context.contains("Topic:"));
        assert!(context.starts_with(HEADER));
        assert!(context.ends_with(INSTRUCTION));
    }

    #[test]
    fn entries_keep_input_order() {
        let mut second = memory("b", "Started a new job", "2023-12-24T18:30:00Z");
        second.topic = Some("work".into());
        let context = build_context(&[
            memory("a", "Feeling better today", "2024-03-15T09:00:00Z"),
            second,
        ]);

        let expected = "Relevant memories from previous conversations:\n\n\
            1. [March 15, 2024] Feeling better today\n\
            2. [December 24, 2023] Started a new job\n   Topic: work\n\n";
        assert!(context.starts_with(expected), "got:\n{context}");
    }

    #[test]
    fn similarity_is_not_rendered() {
        let mut m = memory("1", "Hello", "2024-01-01T00:00:00Z");
        m.similarity = Some(0.93);
        assert!(!build_context(&[m]).contains("0.93"));
    }
}
