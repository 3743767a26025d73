use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::attempt::Attempt;
use crate::metrics::{self, Ending};
use crate::util::{mean, typing_intervals};

/// Final record of one sentence. Created once and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SentenceResult {
    /// 1-based position in the sentence list.
    pub sentence_index: usize,
    pub original_text: String,
    pub input_text: String,
    /// Seconds from first keystroke to completion or interruption.
    pub input_time: f64,
    /// Characters per second.
    pub speed: f64,
    pub accuracy: f64,
    pub msd: usize,
    pub cer: f64,
    /// Epoch milliseconds, one per net-new character position.
    pub char_times: Vec<i64>,
    pub inter_char_ms: Vec<i64>,
    pub interrupted: bool,
}

impl SentenceResult {
    /// Close out `attempt` at `ended_at` (epoch ms).
    pub fn from_attempt(index: usize, attempt: &Attempt, ending: Ending, ended_at: i64) -> Self {
        let original = attempt.target();
        let input = attempt.input();
        let input_time = attempt.elapsed_secs(ended_at);

        Self {
            sentence_index: index + 1,
            original_text: original.to_string(),
            input_text: input.to_string(),
            input_time,
            speed: metrics::speed(ending, original, input, input_time),
            accuracy: metrics::accuracy(original, input),
            msd: metrics::edit_distance(original, input),
            cer: metrics::cer(original, input),
            char_times: attempt.char_times().to_vec(),
            inter_char_ms: metrics::inter_char_intervals(attempt.char_times()),
            interrupted: ending == Ending::Interrupted,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub total_sentences: usize,
    pub completed_sentences: usize,
    pub interrupted_sentences: usize,
    pub average_speed: f64,
    pub average_accuracy: f64,
    #[serde(rename = "averageCER")]
    pub average_cer: f64,
    pub total_time: f64,
    pub average_inter_char_ms: f64,
}

impl SessionSummary {
    /// Aggregate `results` for a session that presented `total_sentences`.
    ///
    /// Averages over speed, accuracy and CER only use completed records and
    /// are 0 when none exist. Total time and the pooled inter-character
    /// interval include interrupted records.
    pub fn from_results(total_sentences: usize, results: &[SentenceResult]) -> Self {
        let (interrupted, completed): (Vec<&SentenceResult>, Vec<&SentenceResult>) =
            results.iter().partition(|r| r.interrupted);

        let average_of = |f: fn(&SentenceResult) -> f64| {
            mean(&completed.iter().map(|&r| f(r)).collect_vec()).unwrap_or(0.0)
        };

        let pooled_intervals = results
            .iter()
            .flat_map(|r| typing_intervals(&r.inter_char_ms))
            .collect_vec();

        Self {
            total_sentences,
            completed_sentences: completed.len(),
            interrupted_sentences: interrupted.len(),
            average_speed: average_of(|r| r.speed),
            average_accuracy: average_of(|r| r.accuracy),
            average_cer: average_of(|r| r.cer),
            total_time: results.iter().map(|r| r.input_time).sum(),
            average_inter_char_ms: mean(&pooled_intervals).unwrap_or(0.0),
        }
    }
}
