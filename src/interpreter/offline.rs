// Offline interpreter
//
// Resolves spoken commands against the control maps it has been given,
// without a network provider. It honors the same message conventions as a
// real interpreter: contract messages are acknowledged, control maps are
// remembered, and anything it cannot resolve gets a bare "OK".

use super::{Interpreter, InterpreterError};
use crate::context::{INITIAL_CONTRACT_ACK, SCREEN_MAP_ACK};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Deserialize;
use strsim::normalized_levenshtein;
use uuid::Uuid;

/// Minimum per-word similarity for a fuzzy word hit
const WORD_SIMILARITY_THRESHOLD: f64 = 0.8;
/// Minimum fraction of command words that must hit a target's text
const MATCH_THRESHOLD: f64 = 0.5;
/// Words shorter than this carry no meaning for matching
const MIN_WORD_LEN: usize = 3;

const CONTRACT_MARKER: &str = "--- Instruction set ---";
const MAP_MARKER: &str = "control mapping:";
const NOTICE_MARKER: &str = "You are now in the screen called:";

/// The subset of a serialized target the matcher cares about
#[derive(Debug, Clone, Deserialize)]
struct MapEntry {
    id: Uuid,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    accessibility: Option<String>,
    description: String,
}

impl MapEntry {
    fn text(&self) -> String {
        let mut text = String::new();
        if let Some(title) = &self.title {
            text.push_str(title);
            text.push(' ');
        }
        if let Some(accessibility) = &self.accessibility {
            text.push_str(accessibility);
            text.push(' ');
        }
        text.push_str(&self.description);
        text.to_lowercase()
    }
}

/// Network-free interpreter with the same conversational surface as a
/// provider-backed one.
pub struct OfflineInterpreter {
    map: Mutex<Vec<MapEntry>>,
}

impl OfflineInterpreter {
    pub fn new() -> Self {
        Self {
            map: Mutex::new(Vec::new()),
        }
    }

    /// Fraction of meaningful command words found in the entry's text,
    /// with a fuzzy comparison per word.
    fn score(command: &str, entry_text: &str) -> f64 {
        let entry_words: Vec<String> = entry_text
            .split_whitespace()
            .map(|word| word.trim_matches(|c: char| !c.is_alphanumeric()).to_string())
            .filter(|word| !word.is_empty())
            .collect();

        let command_words: Vec<String> = command
            .to_lowercase()
            .split_whitespace()
            .map(|word| word.trim_matches(|c: char| !c.is_alphanumeric()).to_string())
            .filter(|word| word.len() >= MIN_WORD_LEN)
            .collect();

        if command_words.is_empty() || entry_words.is_empty() {
            return 0.0;
        }

        let hits = command_words
            .iter()
            .filter(|word| {
                entry_words.iter().any(|candidate| {
                    candidate == *word
                        // inflections: "select" hits "selected", "jackets" hits "jacket"
                        || (candidate.len() >= MIN_WORD_LEN
                            && (candidate.starts_with(word.as_str())
                                || word.starts_with(candidate)))
                        || normalized_levenshtein(candidate, word.as_str())
                            >= WORD_SIMILARITY_THRESHOLD
                })
            })
            .count();

        hits as f64 / command_words.len() as f64
    }
}

impl Default for OfflineInterpreter {
    fn default() -> Self {
        Self::new()
    }
}

fn extract_map(text: &str) -> Option<Vec<MapEntry>> {
    let after_marker = &text[text.find(MAP_MARKER)? + MAP_MARKER.len()..];
    let start = after_marker.find('[')?;
    let end = after_marker.rfind(']')?;
    serde_json::from_str(&after_marker[start..=end]).ok()
}

#[async_trait]
impl Interpreter for OfflineInterpreter {
    async fn send(&self, text: &str) -> Result<String, InterpreterError> {
        if text.contains(CONTRACT_MARKER) {
            return Ok(INITIAL_CONTRACT_ACK.to_string());
        }

        if text.contains(MAP_MARKER) {
            match extract_map(text) {
                Some(map) => {
                    crate::debug!("offline interpreter stored a map of {} controls", map.len());
                    *self.map.lock() = map;
                    return Ok(SCREEN_MAP_ACK.to_string());
                }
                None => return Ok("OK".to_string()),
            }
        }

        if text.contains(NOTICE_MARKER) {
            return Ok("OK".to_string());
        }

        // Anything else is a spoken command
        let map = self.map.lock();
        let best = map
            .iter()
            .map(|entry| (Self::score(text, &entry.text()), entry))
            .max_by(|a, b| a.0.total_cmp(&b.0));

        match best {
            Some((score, entry)) if score >= MATCH_THRESHOLD => {
                crate::debug!(
                    "offline interpreter matched \"{}\" to {} (score {:.2})",
                    text,
                    entry.id,
                    score
                );
                Ok(format!("{{\"id\":\"{}\"}}", entry.id))
            }
            _ => Ok("OK".to_string()),
        }
    }

    fn clear_history(&self) {
        self.map.lock().clear();
    }
}

#[cfg(test)]
#[path = "offline_test.rs"]
mod tests;
