//! Separates model "thinking" from the answer shown to the user.

use std::sync::LazyLock;

use regex::Regex;

pub const EMPTY_RESPONSE_FALLBACK: &str =
    "I wasn't able to produce a response this time. Please try rephrasing your request.";

const REASONING_TAGS: &[&str] = &["think", "thinking", "reasoning"];

/// Openers that mark an untagged reply as the model talking to itself.
static REASONING_OPENER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^\s*(?:okay,|ok,|alright,|hmm\b|let me\b|let's see\b|first, i\b|i need to\b|i should\b|so,|wait,|the user (?:is|wants|asked|has)\b)",
    )
    .expect("reasoning opener pattern")
});

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SanitizedResponse {
    pub answer: String,
    pub reasoning: Option<String>,
}

impl SanitizedResponse {
    /// Text for display: the answer, then the reasoning folded into a
    /// collapsed block. Never blank.
    pub fn render(&self) -> String {
        let reasoning = self
            .reasoning
            .as_deref()
            .map(str::trim)
            .filter(|text| !text.is_empty());

        match (self.answer.trim(), reasoning) {
            ("", None) => EMPTY_RESPONSE_FALLBACK.to_string(),
            (answer, None) => answer.to_string(),
            ("", Some(reasoning)) => details_block(reasoning),
            (answer, Some(reasoning)) => format!("{answer}\n\n{}", details_block(reasoning)),
        }
    }
}

fn details_block(reasoning: &str) -> String {
    format!("<details><summary>Reasoning</summary>\n\n{reasoning}\n\n</details>")
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum TagState {
    Answer,
    Reasoning { close: usize },
}

struct TagMatch {
    start: usize,
    end: usize,
    tag: usize,
}

/// Earliest `<tag>` (or `</tag>` when `closing`) at or after `from`.
/// `lowered` must be the ASCII-lowercased text so byte offsets line up.
fn find_tag(lowered: &str, from: usize, closing: bool, only: Option<usize>) -> Option<TagMatch> {
    REASONING_TAGS
        .iter()
        .enumerate()
        .filter(|(index, _)| only.is_none_or(|only| only == *index))
        .filter_map(|(index, name)| {
            let needle = if closing {
                format!("</{name}>")
            } else {
                format!("<{name}>")
            };
            lowered[from..].find(&needle).map(|offset| TagMatch {
                start: from + offset,
                end: from + offset + needle.len(),
                tag: index,
            })
        })
        .min_by_key(|found| found.start)
}

/// Split tagged reasoning from the answer. Returns `None` when the text has
/// no reasoning tags at all.
fn split_tagged(text: &str) -> Option<(String, Vec<String>)> {
    let lowered = text.to_ascii_lowercase();
    let mut answer = String::new();
    let mut reasoning = Vec::new();
    let mut cursor = 0;
    let mut state = TagState::Answer;
    let mut saw_tag = false;

    // A closing tag with no opener: everything before it was reasoning.
    let first_open = find_tag(&lowered, 0, false, None);
    if let Some(close) = find_tag(&lowered, 0, true, None) {
        if first_open.as_ref().is_none_or(|open| close.start < open.start) {
            reasoning.push(text[..close.start].to_string());
            cursor = close.end;
            saw_tag = true;
        }
    }

    while cursor < text.len() {
        match state {
            TagState::Answer => match find_tag(&lowered, cursor, false, None) {
                Some(open) => {
                    answer.push_str(&text[cursor..open.start]);
                    cursor = open.end;
                    state = TagState::Reasoning { close: open.tag };
                    saw_tag = true;
                }
                None => {
                    answer.push_str(&text[cursor..]);
                    cursor = text.len();
                }
            },
            TagState::Reasoning { close } => {
                match find_tag(&lowered, cursor, true, Some(close)) {
                    Some(end) => {
                        reasoning.push(text[cursor..end.start].to_string());
                        cursor = end.end;
                        state = TagState::Answer;
                    }
                    // Unclosed: the rest of the text is reasoning.
                    None => {
                        reasoning.push(text[cursor..].to_string());
                        cursor = text.len();
                    }
                }
            }
        }
    }

    saw_tag.then_some((answer, reasoning))
}

pub fn sanitize(text: &str) -> SanitizedResponse {
    if let Some((answer, parts)) = split_tagged(text) {
        let reasoning = parts
            .iter()
            .map(|part| part.trim())
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n");
        return SanitizedResponse {
            answer: answer.trim().to_string(),
            reasoning: (!reasoning.is_empty()).then_some(reasoning),
        };
    }

    let trimmed = text.trim();
    if REASONING_OPENER.is_match(trimmed) {
        return SanitizedResponse {
            answer: String::new(),
            reasoning: Some(trimmed.to_string()),
        };
    }

    SanitizedResponse {
        answer: trimmed.to_string(),
        reasoning: None,
    }
}
