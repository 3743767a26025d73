/// Classification of a single typed character against the target.
#[derive(Clone, Debug, Copy, PartialEq, Eq)]
pub enum Outcome {
    Correct,
    Incorrect,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CharFeedback {
    pub char: char,
    pub outcome: Outcome,
}

/// Result of matching the whole input against a target.
///
/// Always derived from scratch; nothing here survives between keystrokes.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MatchState {
    pub feedback: Vec<CharFeedback>,
    /// How many target characters have been found, in order.
    pub matched: usize,
    pub complete: bool,
}

impl MatchState {
    /// Typed characters that did not advance the match.
    pub fn incorrect_count(&self) -> usize {
        self.feedback
            .iter()
            .filter(|f| f.outcome == Outcome::Incorrect)
            .count()
    }
}

/// Ordered subsequence match of `input` against `target`.
///
/// Each input character either consumes the next pending target character or
/// is marked incorrect and skipped; a wrong character never blocks later ones.
/// Completion holds as soon as every target character was consumed, even with
/// extra characters interleaved or trailing.
pub fn update_match(target: &[char], input: &str) -> MatchState {
    let mut match_pos = 0;
    let feedback = input
        .chars()
        .map(|c| {
            let outcome = if match_pos < target.len() && c == target[match_pos] {
                match_pos += 1;
                Outcome::Correct
            } else {
                Outcome::Incorrect
            };
            CharFeedback { char: c, outcome }
        })
        .collect();

    MatchState {
        feedback,
        matched: match_pos,
        complete: match_pos == target.len(),
    }
}
