//! The unit of speech handed from the conversation loop to playback.

use std::fmt;
use std::sync::Arc;

/// One immutable piece of text queued for speech rendering.
///
/// Produced by the [`SentenceSegmenter`](crate::segmenter::SentenceSegmenter)
/// at a sentence boundary or at the end-of-turn flush, and consumed exactly
/// once by the playback worker. Cloning is cheap (shared buffer).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Utterance(Arc<str>);

impl Utterance {
    /// Create an utterance from any string-like value.
    pub fn new(text: impl Into<Arc<str>>) -> Self {
        Self(text.into())
    }

    /// The text to speak.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.0
    }

    /// Length of the text in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the text is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Utterance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Utterance {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl From<String> for Utterance {
    fn from(text: String) -> Self {
        Self::new(text)
    }
}

impl AsRef<str> for Utterance {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn utterance_exposes_text() {
        let u = Utterance::from("Hello world.");
        assert_eq!(u.text(), "Hello world.");
        assert_eq!(u.len(), 12);
        assert!(!u.is_empty());
        assert_eq!(u.to_string(), "Hello world.");
    }

    #[test]
    fn clones_share_the_same_buffer() {
        let a = Utterance::from(String::from("shared"));
        let b = a.clone();
        assert!(std::ptr::eq(a.text(), b.text()));
    }
}
