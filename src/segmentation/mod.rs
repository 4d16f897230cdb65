// Utterance segmentation over streaming recognition fragments
// Turns an unbounded stream of timestamped word fragments into discrete
// spoken sentences, separated by closing pauses

use serde::{Deserialize, Serialize};

/// Minimum silence gap (in seconds) between fragments that closes a sentence.
pub const PAUSE_THRESHOLD_SECS: f64 = 1.0;

/// One recognized word/phrase unit from the streaming recognizer.
///
/// Fragments arrive in order, with monotonically non-decreasing `start_time`
/// within a single recognition subscription.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fragment {
    /// The recognized text of this unit
    pub text: String,
    /// Offset from the start of the subscription, in seconds
    pub start_time: f64,
    /// Duration of the spoken unit, in seconds
    pub duration: f64,
    /// Recognizer confidence (0.0 - 1.0); zero for tentative results
    pub confidence: f32,
}

impl Fragment {
    pub fn new(text: impl Into<String>, start_time: f64, duration: f64, confidence: f32) -> Self {
        Self {
            text: text.into(),
            start_time,
            duration,
            confidence,
        }
    }

    /// End of the spoken unit, in seconds from the start of the subscription.
    pub fn end_time(&self) -> f64 {
        self.start_time + self.duration
    }
}

/// A complete sentence reconstructed from a run of fragments.
///
/// Immutable once emitted; the text is the space-joined fragment texts in
/// chronological order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Utterance {
    pub text: String,
}

impl std::fmt::Display for Utterance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.text)
    }
}

/// Configuration for utterance segmentation
#[derive(Debug, Clone)]
pub struct SegmenterConfig {
    /// Minimum silence gap in seconds that closes a sentence
    pub pause_threshold: f64,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            pause_threshold: PAUSE_THRESHOLD_SECS,
        }
    }
}

/// Incremental sentence-boundary detector.
///
/// Consumes fragments one at a time in arrival order. When a fragment opens
/// after a closing pause, the *previous* sentence is complete and is emitted;
/// the triggering fragment starts the next one. Fragments belonging to
/// emitted sentences are discarded to bound memory.
pub struct UtteranceSegmenter {
    config: SegmenterConfig,
    buffer: Vec<Fragment>,
}

impl UtteranceSegmenter {
    /// Create a segmenter with the default pause threshold
    pub fn new() -> Self {
        Self::with_config(SegmenterConfig::default())
    }

    /// Create a segmenter with custom configuration
    pub fn with_config(config: SegmenterConfig) -> Self {
        Self {
            config,
            buffer: Vec::new(),
        }
    }

    /// Silence between two consecutive fragments: the gap between where the
    /// previous unit ended and where the next one starts.
    fn gap(previous: &Fragment, next: &Fragment) -> f64 {
        next.start_time - previous.end_time()
    }

    /// Feed the next fragment. Returns the previous completed sentence when
    /// this fragment opens after a closing pause, `None` otherwise.
    ///
    /// With fewer than two buffered fragments no boundary is ever declared,
    /// and a zero-confidence fragment never closes a sentence.
    pub fn push(&mut self, fragment: Fragment) -> Option<Utterance> {
        self.buffer.push(fragment);

        if !self.tail_opens_new_sentence() {
            return None;
        }

        let boundary = self.buffer.len() - 1;
        let start = self.sentence_start(boundary);
        let text = self.buffer[start..boundary]
            .iter()
            .map(|f| f.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");

        // The emitted sentence is closed; only the boundary fragment is still
        // part of the sentence being spoken.
        self.buffer.drain(..boundary);

        if text.is_empty() {
            None
        } else {
            Some(Utterance { text })
        }
    }

    /// Whether the most recent fragment started a new sentence.
    fn tail_opens_new_sentence(&self) -> bool {
        if self.buffer.len() < 2 {
            return false;
        }
        let last = &self.buffer[self.buffer.len() - 1];
        let previous = &self.buffer[self.buffer.len() - 2];
        Self::gap(previous, last) >= self.config.pause_threshold && last.confidence > 0.0
    }

    /// Walk backward from the fragment before the boundary until the buffer
    /// start or a fragment that itself opened after a closing pause. That
    /// fragment is the first word of the closed sentence.
    fn sentence_start(&self, boundary: usize) -> usize {
        for i in (1..boundary).rev() {
            let fragment = &self.buffer[i];
            let previous = &self.buffer[i - 1];
            if Self::gap(previous, fragment) >= self.config.pause_threshold
                && fragment.confidence > 0.0
            {
                return i;
            }
        }
        0
    }

    /// Number of fragments currently buffered
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Discard all buffered fragments, starting a fresh session
    pub fn reset(&mut self) {
        self.buffer.clear();
    }
}

impl Default for UtteranceSegmenter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "segmenter_test.rs"]
mod tests;
