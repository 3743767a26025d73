use crate::matcher::{update_match, MatchState};
use crate::metrics::char_len;

/// One participant attempt at one target sentence.
///
/// Holds the authoritative input text, the growth-only timestamp trace and
/// the one-shot completion flag. Match state is recomputed from the full
/// input on every update.
#[derive(Debug, Clone)]
pub struct Attempt {
    target: String,
    target_chars: Vec<char>,
    input: String,
    char_times: Vec<i64>,
    started_at: Option<i64>,
    completed_at: Option<i64>,
    state: MatchState,
}

impl Attempt {
    pub fn new(target: impl Into<String>) -> Self {
        let target = target.into();
        let target_chars = target.chars().collect();
        Self {
            target,
            target_chars,
            input: String::new(),
            char_times: Vec::new(),
            started_at: None,
            completed_at: None,
            state: MatchState::default(),
        }
    }

    /// Feed the current contents of the entry surface, observed at `at` (epoch ms).
    ///
    /// The first call fixes the start time. A timestamp is captured whenever
    /// the input is longer than the trace, once per call.
    pub fn record_input(&mut self, text: &str, at: i64) -> &MatchState {
        if self.started_at.is_none() {
            self.started_at = Some(at);
        }

        if char_len(text) > self.char_times.len() {
            self.char_times.push(at);
        }

        self.input.clear();
        self.input.push_str(text);
        self.state = update_match(&self.target_chars, text);

        if self.state.complete && self.completed_at.is_none() {
            self.completed_at = Some(at);
        }

        &self.state
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn target_chars(&self) -> &[char] {
        &self.target_chars
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn char_times(&self) -> &[i64] {
        &self.char_times
    }

    pub fn match_state(&self) -> &MatchState {
        &self.state
    }

    pub fn completed_at(&self) -> Option<i64> {
        self.completed_at
    }

    pub fn has_started(&self) -> bool {
        self.started_at.is_some()
    }

    pub fn is_complete(&self) -> bool {
        self.completed_at.is_some()
    }

    /// Seconds from the first keystroke to `end` (epoch ms).
    pub fn elapsed_secs(&self, end: i64) -> f64 {
        match self.started_at {
            Some(start) => (end - start) as f64 / 1000.0,
            None => 0.0,
        }
    }
}
