//! Incremental sentence segmentation for streamed model output.
//!
//! The model replies token by token. Waiting for the full reply before
//! speaking would add the whole generation time to the perceived latency, so
//! the segmenter cuts the stream at sentence terminators and hands each
//! completed sentence to playback as soon as it is seen.
//!
//! Splitting is inclusive: everything up to and including the terminator
//! belongs to the emitted utterance, and everything after it stays buffered.
//! The segmenter also keeps the complete transcript separately so that the
//! stored assistant turn never depends on how the text was chunked for
//! speech.
//!
//! ```
//! use parley_core::SentenceSegmenter;
//!
//! let mut seg = SentenceSegmenter::new();
//! let mut spoken: Vec<String> = Vec::new();
//! for delta in ["Hello ", "world. How ", "are you", "?"] {
//!     spoken.extend(seg.push(delta).into_iter().map(|u| u.text().to_string()));
//! }
//! let turn = seg.finish();
//! spoken.extend(turn.tail.map(|u| u.text().to_string()));
//!
//! assert_eq!(spoken, ["Hello world.", " How are you?"]);
//! assert_eq!(turn.transcript, "Hello world. How are you?");
//! ```

use crate::domain::Utterance;

/// Character that ends a speakable sentence.
pub const SENTENCE_TERMINATOR: char = '.';

/// Folds a sequence of text deltas into completed sentences.
///
/// One segmenter is used per turn; [`finish`](Self::finish) consumes it.
#[derive(Debug, Default)]
pub struct SentenceSegmenter {
    /// Text received since the last emitted sentence. Never contains a terminator.
    pending: String,
    /// Every delta received this turn, verbatim.
    transcript: String,
}

/// What is left when the stream signals completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinishedTurn {
    /// The unterminated remainder, if non-empty.
    pub tail: Option<Utterance>,
    /// The complete response text of the turn.
    pub transcript: String,
}

impl SentenceSegmenter {
    /// Create an empty segmenter.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            pending: String::new(),
            transcript: String::new(),
        }
    }

    /// Append a delta and return every sentence it completed, in order.
    ///
    /// A delta may complete several sentences at once; all of them are
    /// returned. Empty deltas are no-ops.
    pub fn push(&mut self, delta: &str) -> Vec<Utterance> {
        if delta.is_empty() {
            return Vec::new();
        }

        self.transcript.push_str(delta);

        // The buffered prefix holds no terminator, so only the new delta
        // needs scanning.
        let mut scan_from = self.pending.len();
        self.pending.push_str(delta);

        let mut sentences = Vec::new();
        let mut start = 0;
        while let Some(offset) = self.pending[scan_from..].find(SENTENCE_TERMINATOR) {
            let end = scan_from + offset + SENTENCE_TERMINATOR.len_utf8();
            sentences.push(Utterance::new(&self.pending[start..end]));
            start = end;
            scan_from = end;
        }

        if start > 0 {
            self.pending.drain(..start);
        }

        sentences
    }

    /// Text buffered since the last sentence boundary.
    #[must_use]
    pub fn pending(&self) -> &str {
        &self.pending
    }

    /// Everything received so far this turn.
    #[must_use]
    pub fn transcript(&self) -> &str {
        &self.transcript
    }

    /// Flush the remainder and hand back the full transcript.
    #[must_use]
    pub fn finish(self) -> FinishedTurn {
        let tail = (!self.pending.is_empty()).then(|| Utterance::new(self.pending));
        FinishedTurn {
            tail,
            transcript: self.transcript,
        }
    }
}
