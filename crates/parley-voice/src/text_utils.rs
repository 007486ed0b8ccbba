//! Text preparation for speech synthesis.
//!
//! Utterances arrive one sentence at a time, so a reasoning block or a
//! fenced code block can start in one utterance and end several utterances
//! later. [`SpeechFilter`] carries that state between utterances; the
//! playback worker resets it whenever a new turn begins.

/// Opening prefix and closing tag of blocks that are never spoken.
/// Matched case-insensitively; `<think` also covers `<think duration="5">`.
const REASONING_TAGS: &[(&str, &str)] = &[
    ("<think", "</think>"),
    ("<reasoning>", "</reasoning>"),
    ("<seed:think>", "</seed:think>"),
    ("<|start_thinking|>", "<|end_thinking|>"),
];

const CODE_FENCE: &str = "```";

const CODE_PLACEHOLDER: &str = "Code omitted.";

/// Strips markdown and reasoning blocks across a sequence of utterances.
#[derive(Debug, Default, Clone)]
pub struct SpeechFilter {
    /// Index into `REASONING_TAGS` of the block we are inside, if any.
    open_reasoning: Option<usize>,
    in_code_block: bool,
}

impl SpeechFilter {
    pub const fn new() -> Self {
        Self {
            open_reasoning: None,
            in_code_block: false,
        }
    }

    /// Forget any open block. Called at turn boundaries.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Convert one utterance into speakable text.
    ///
    /// Returns `None` when nothing speakable remains. The code placeholder
    /// alone does not count as speakable, so an utterance that is only a
    /// fence (or only code) is skipped.
    pub fn prepare(&mut self, text: &str) -> Option<String> {
        let visible = self.strip_reasoning(text);
        let visible = self.strip_code_blocks(&visible);

        let spoken = visible
            .lines()
            .map(str::trim)
            .filter(|line| !is_horizontal_rule(line))
            .map(strip_line_markdown)
            .collect::<Vec<_>>()
            .join(" ");

        let spoken = collapse_whitespace(&spoken);
        is_speakable(&spoken.replace(CODE_PLACEHOLDER, "")).then_some(spoken)
    }

    fn strip_reasoning(&mut self, text: &str) -> String {
        // ASCII lowercasing keeps byte offsets aligned with `text`.
        let haystack = text.to_ascii_lowercase();
        let mut out = String::with_capacity(text.len());
        let mut cursor = 0;

        loop {
            if let Some(tag) = self.open_reasoning {
                let close = REASONING_TAGS[tag].1;
                match haystack[cursor..].find(close) {
                    Some(offset) => {
                        cursor += offset + close.len();
                        self.open_reasoning = None;
                    }
                    None => return out,
                }
            }

            let next_open = REASONING_TAGS
                .iter()
                .enumerate()
                .filter_map(|(i, (open, _))| {
                    haystack[cursor..].find(open).map(|offset| (cursor + offset, i))
                })
                .min();

            let Some((start, tag)) = next_open else {
                out.push_str(&text[cursor..]);
                return out;
            };

            // The opening tag must be complete to count.
            let Some(gt) = haystack[start..].find('>') else {
                out.push_str(&text[cursor..]);
                return out;
            };

            out.push_str(&text[cursor..start]);
            cursor = start + gt + 1;
            self.open_reasoning = Some(tag);
        }
    }

    fn strip_code_blocks(&mut self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        for (i, part) in text.split(CODE_FENCE).enumerate() {
            if i > 0 {
                self.in_code_block = !self.in_code_block;
                if self.in_code_block {
                    out.push(' ');
                    out.push_str(CODE_PLACEHOLDER);
                    out.push(' ');
                }
            }
            if !self.in_code_block {
                out.push_str(part);
            }
        }
        out
    }
}

/// Text to send to the synthesizer without markdown stripping.
///
/// Only trims surrounding whitespace; `None` if nothing speakable is left.
pub fn plain_speech(text: &str) -> Option<String> {
    let trimmed = text.trim();
    is_speakable(trimmed).then(|| trimmed.to_string())
}

/// At least one letter or digit; punctuation alone produces no audio.
fn is_speakable(text: &str) -> bool {
    text.chars().any(char::is_alphanumeric)
}

fn is_horizontal_rule(line: &str) -> bool {
    let mut chars = line.chars().filter(|c| !c.is_whitespace());
    let Some(first) = chars.next() else {
        return false;
    };
    matches!(first, '-' | '*' | '_') && {
        let rest: Vec<char> = chars.collect();
        rest.len() >= 2 && rest.iter().all(|&c| c == first)
    }
}

fn strip_line_markdown(line: &str) -> String {
    let mut s = line.trim_start_matches(|c: char| c == '>' || c.is_whitespace());
    s = s.trim_start_matches('#').trim_start();
    let s = strip_list_marker(s);
    let s = strip_images(s);
    let s = strip_links(&s);
    let s = s.replace('`', "");
    let s = strip_emphasis(&s);
    strip_html_tags(&s)
}

fn strip_list_marker(line: &str) -> &str {
    if let Some(rest) = line
        .strip_prefix("- ")
        .or_else(|| line.strip_prefix("* "))
        .or_else(|| line.strip_prefix("+ "))
    {
        return rest;
    }

    // Numbered: "1. item", "2) item". A bare "3." is left alone so that a
    // sentence ending in a number stays intact.
    let digits = line.chars().take_while(char::is_ascii_digit).count();
    if digits > 0 {
        let after = &line[digits..];
        if let Some(rest) = after
            .strip_prefix(". ")
            .or_else(|| after.strip_prefix(") "))
        {
            return rest;
        }
    }
    line
}

/// `![alt](url)` becomes `image: alt`.
fn strip_images(text: &str) -> String {
    replace_bracketed(text, "![", |alt| {
        if alt.is_empty() {
            String::new()
        } else {
            format!("image: {alt}")
        }
    })
}

/// `[text](url)` becomes `text`.
fn strip_links(text: &str) -> String {
    replace_bracketed(text, "[", str::to_string)
}

/// Replace every `<opener>label](target)` with `render(label)`.
/// Brackets not followed by a `(...)` target are kept verbatim.
fn replace_bracketed(text: &str, opener: &str, render: impl Fn(&str) -> String) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find(opener) {
        let after_open = &rest[start + opener.len()..];
        let parsed = after_open.find("](").and_then(|label_end| {
            let target = &after_open[label_end + 2..];
            target
                .find(')')
                .map(|target_end| (label_end, label_end + 2 + target_end + 1))
        });

        match parsed {
            Some((label_end, consumed)) if !after_open[..label_end].contains(']') => {
                out.push_str(&rest[..start]);
                out.push_str(&render(&after_open[..label_end]));
                rest = &after_open[consumed..];
            }
            _ => {
                out.push_str(&rest[..start + opener.len()]);
                rest = after_open;
            }
        }
    }

    out.push_str(rest);
    out
}

fn strip_emphasis(text: &str) -> String {
    // Single `_` is left alone: it is common inside identifiers.
    text.replace("**", "")
        .replace("__", "")
        .replace("~~", "")
        .replace('*', "")
}

/// Remove `<tag ...>` and `</tag>`. A `<` not followed by a letter or `/`,
/// or with no closing `>`, is text (`x < 10`).
fn strip_html_tags(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find('<') {
        let after = &rest[start + 1..];
        let opens_tag = after.starts_with(|c: char| c == '/' || c.is_ascii_alphabetic());
        match after.find('>') {
            Some(end) if opens_tag => {
                result.push_str(&rest[..start]);
                rest = &after[end + 1..];
            }
            _ => {
                result.push_str(&rest[..=start]);
                rest = after;
            }
        }
    }

    result.push_str(rest);
    result
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
