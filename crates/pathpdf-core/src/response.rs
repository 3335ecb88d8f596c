//! Boundary helpers around the generation step: pulling the roadmap JSON out
//! of a model reply and splitting long documents before they are sent.

use crate::{RoadmapData, TreeError, repair_roadmap};
use regex::Regex;
use std::sync::LazyLock;

static FENCED_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"```[A-Za-z0-9_+-]*\s*([\s\S]*?)\s*```").expect("fence pattern is valid")
});
static PARAGRAPH_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n\s*\n").expect("paragraph pattern is valid"));
static SENTENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^.!?]+[.!?]+|[^.!?]+$").expect("sentence pattern is valid"));

/// Default chunk size used before prompting, in characters.
pub const DEFAULT_CHUNK_CHARS: usize = 10_000;

/// Extracts and repairs the roadmap carried by a model reply.
///
/// Accepts a fenced code block, a bare object embedded in prose, or a reply
/// that is JSON already. A reply without a title is rejected; everything
/// below the root is repaired.
pub fn parse_roadmap_response(text: &str) -> Result<RoadmapData, TreeError> {
    let candidate = FENCED_BLOCK
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .or_else(|| outermost_object(text))
        .unwrap_or(text);

    let value: serde_json::Value = serde_json::from_str(candidate)?;
    let has_title = value
        .get("title")
        .and_then(serde_json::Value::as_str)
        .is_some_and(|title| !title.trim().is_empty());
    if !has_title {
        return Err(TreeError::InvalidStructure("missing title".to_string()));
    }
    repair_roadmap(&value)
}

fn outermost_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// Splits `content` into chunks of at most `max_chars` characters, preferring
/// paragraph boundaries, then sentence boundaries, then hard cuts.
pub fn chunk_content(content: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    if content.chars().count() <= max_chars {
        return vec![content.to_string()];
    }

    let mut chunks = Vec::new();
    let mut current = String::new();

    for paragraph in PARAGRAPH_BREAK.split(content) {
        if fits(&current, paragraph, "\n\n", max_chars) {
            append(&mut current, paragraph, "\n\n");
            continue;
        }

        flush(&mut chunks, &mut current);

        if paragraph.chars().count() <= max_chars {
            current = paragraph.to_string();
            continue;
        }

        for sentence in SENTENCE.find_iter(paragraph).map(|m| m.as_str().trim()) {
            if sentence.is_empty() {
                continue;
            }
            if fits(&current, sentence, " ", max_chars) {
                append(&mut current, sentence, " ");
                continue;
            }
            flush(&mut chunks, &mut current);
            let mut pieces = hard_split(sentence, max_chars);
            if let Some(last) = pieces.pop() {
                chunks.extend(pieces);
                current = last;
            }
        }
    }

    flush(&mut chunks, &mut current);
    chunks
}

fn fits(current: &str, next: &str, separator: &str, max_chars: usize) -> bool {
    let separator_len = if current.is_empty() {
        0
    } else {
        separator.chars().count()
    };
    current.chars().count() + separator_len + next.chars().count() <= max_chars
}

fn append(current: &mut String, next: &str, separator: &str) {
    if !current.is_empty() {
        current.push_str(separator);
    }
    current.push_str(next);
}

fn flush(chunks: &mut Vec<String>, current: &mut String) {
    if !current.is_empty() {
        chunks.push(std::mem::take(current));
    }
}

fn hard_split(text: &str, max_chars: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(max_chars)
        .map(|piece| piece.iter().collect())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_fenced_response() {
        let reply = "Here you go:\n```json\n{\"title\": \"Chem\", \"rootNode\": {\"id\": \"node-1\", \"title\": \"Atoms\"}}\n```\nEnjoy!";
        let roadmap = parse_roadmap_response(reply).unwrap();
        assert_eq!(roadmap.title, "Chem");
        assert_eq!(roadmap.root_node.id.0, "node-1");
    }

    #[test]
    fn test_parse_fence_with_other_language_tag() {
        let reply = "```typescript\n{\"title\": \"TS\", \"rootNode\": {\"title\": \"Types\"}}\n```";
        assert_eq!(parse_roadmap_response(reply).unwrap().title, "TS");

        let reply = "```\n{\"title\": \"Plain\", \"rootNode\": {\"title\": \"Root\"}}\n```";
        assert_eq!(parse_roadmap_response(reply).unwrap().root_node.title, "Root");
    }

    #[test]
    fn test_parse_embedded_object() {
        let reply = "Sure! {\"title\": \"Bio\", \"rootNode\": {\"title\": \"Cells\"}} Hope it helps.";
        let roadmap = parse_roadmap_response(reply).unwrap();
        assert_eq!(roadmap.root_node.title, "Cells");
        assert!(!roadmap.root_node.id.0.is_empty());
    }

    #[test]
    fn test_parse_garbage_is_an_error() {
        assert!(matches!(
            parse_roadmap_response("no json here"),
            Err(TreeError::InvalidJson(_))
        ));
        assert!(matches!(
            parse_roadmap_response("{\"title\": \"x\"}"),
            Err(TreeError::InvalidStructure(_))
        ));
        assert!(matches!(
            parse_roadmap_response("{\"rootNode\": {\"title\": \"Cells\"}}"),
            Err(TreeError::InvalidStructure(_))
        ));
    }

    #[test]
    fn test_short_content_is_one_chunk() {
        assert_eq!(chunk_content("hello", 10), vec!["hello".to_string()]);
        assert_eq!(chunk_content("", 10), vec![String::new()]);
    }

    #[test]
    fn test_chunks_prefer_paragraphs() {
        let content = "aaaa aaaa\n\nbbbb bbbb\n\ncccc cccc";
        let chunks = chunk_content(content, 20);
        assert_eq!(chunks, vec!["aaaa aaaa\n\nbbbb bbbb", "cccc cccc"]);
    }

    #[test]
    fn test_long_paragraph_splits_on_sentences() {
        let content = "One two three. Four five six. Seven eight nine.";
        let chunks = chunk_content(content, 20);
        assert_eq!(
            chunks,
            vec!["One two three.", "Four five six.", "Seven eight nine."]
        );
        assert!(chunks.iter().all(|c| c.chars().count() <= 20));
    }

    #[test]
    fn test_overlong_sentence_is_hard_split_without_loss() {
        let content = "x".repeat(25);
        let chunks = chunk_content(&content, 10);
        assert_eq!(chunks.concat(), content);
        assert!(chunks.iter().all(|c| c.chars().count() <= 10));
    }
}
