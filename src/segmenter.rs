use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::{Result, SubweldError};

/// One timed subtitle cue
///
/// Cues are produced as an ordered sequence that exactly tiles the audio
/// timeline: 1-based contiguous indices, `start < end`, each cue's end equal
/// to the next cue's start, and the final end equal to the total duration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cue {
    /// Sequential number, 1-based
    pub index: u32,
    /// Start offset from the beginning of the timeline
    pub start: Duration,
    /// End offset from the beginning of the timeline
    pub end: Duration,
    /// Subtitle text
    pub text: String,
}

impl Cue {
    pub fn new(index: u32, start: Duration, end: Duration, text: String) -> Self {
        Self {
            index,
            start,
            end,
            text: text.trim().to_string(),
        }
    }

    /// Cue duration on the timeline
    pub fn duration(&self) -> Duration {
        self.end.saturating_sub(self.start)
    }
}

/// Converts a raw transcript into timed subtitle cues
///
/// Words are grouped left-to-right into chunks: a chunk closes once it holds
/// `max_words_per_cue` words, or as soon as a word carrying sentence-ending
/// punctuation is added. Every chunk then receives an equal share of the
/// total duration. The equal-share timing is deliberate; cue length does not
/// scale with word count.
#[derive(Debug, Clone)]
pub struct SubtitleSegmenter {
    max_words_per_cue: usize,
}

const SENTENCE_PUNCTUATION: [char; 3] = ['.', '!', '?'];

impl SubtitleSegmenter {
    /// Create a segmenter with the given chunk word limit
    pub fn new(max_words_per_cue: usize) -> Result<Self> {
        if max_words_per_cue == 0 {
            return Err(SubweldError::Configuration(
                "max_words_per_cue must be greater than 0".to_string(),
            ));
        }
        Ok(Self { max_words_per_cue })
    }

    /// Segment a transcript over a timeline of `total_duration`
    pub fn segment(&self, transcript: &str, total_duration: Duration) -> Result<Vec<Cue>> {
        let total_seconds = total_duration.as_secs_f64();
        if total_seconds <= 0.0 {
            return Err(SubweldError::InvalidDuration(total_seconds));
        }

        let chunks = self.split_into_chunks(transcript);
        if chunks.is_empty() {
            return Err(SubweldError::EmptyTranscript);
        }

        let duration_per_chunk = total_seconds / chunks.len() as f64;
        debug!(
            "Segmented transcript into {} chunks of {:.3}s each",
            chunks.len(),
            duration_per_chunk
        );

        let last = chunks.len() - 1;
        let cues = chunks
            .into_iter()
            .enumerate()
            .map(|(i, text)| {
                let start = Duration::from_secs_f64(i as f64 * duration_per_chunk);
                // The last end is pinned to the total duration so accumulated
                // float error cannot push it past the timeline boundary.
                let end = if i == last {
                    total_duration
                } else {
                    Duration::from_secs_f64((i + 1) as f64 * duration_per_chunk)
                };
                Cue::new(i as u32 + 1, start, end, text)
            })
            .collect();

        Ok(cues)
    }

    /// Group whitespace-separated words into chunks, single pass, no lookahead
    fn split_into_chunks(&self, transcript: &str) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut current: Vec<&str> = Vec::new();

        for word in transcript.split_whitespace() {
            current.push(word);
            let ends_sentence = word.contains(&SENTENCE_PUNCTUATION[..]);
            if current.len() >= self.max_words_per_cue || ends_sentence {
                chunks.push(current.join(" "));
                current.clear();
            }
        }

        if !current.is_empty() {
            chunks.push(current.join(" "));
        }

        chunks
    }
}
