//! Accuracy and timing metrics for a single sentence.
//!
//! All lengths are counted in `char`s so that kana and latin text are
//! measured the same way the matcher indexes them.

/// Number of characters, not bytes.
pub fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Minimum string distance (Levenshtein) with unit costs.
pub fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    let mut dp = vec![vec![0usize; b.len() + 1]; a.len() + 1];
    for (i, row) in dp.iter_mut().enumerate() {
        row[0] = i;
    }
    for (j, cell) in dp[0].iter_mut().enumerate() {
        *cell = j;
    }

    for i in 1..=a.len() {
        for j in 1..=b.len() {
            dp[i][j] = if a[i - 1] == b[j - 1] {
                dp[i - 1][j - 1]
            } else {
                1 + dp[i - 1][j].min(dp[i][j - 1]).min(dp[i - 1][j - 1])
            };
        }
    }

    dp[a.len()][b.len()]
}

/// Accuracy in percent, `100 * (1 - msd / max_len)` clamped at zero.
pub fn accuracy(original: &str, input: &str) -> f64 {
    let max_len = char_len(original).max(char_len(input));
    if max_len == 0 {
        return 100.0;
    }
    let msd = edit_distance(original, input) as f64;
    (100.0 * (1.0 - msd / max_len as f64)).max(0.0)
}

/// Character error rate relative to the number of characters typed.
///
/// The denominator is the input length, not the reference length; recorded
/// datasets were produced with this definition.
pub fn cer(original: &str, input: &str) -> f64 {
    let input_len = char_len(input);
    if input_len == 0 {
        return 0.0;
    }
    edit_distance(original, input) as f64 / input_len as f64
}

/// How a sentence attempt ended, which decides the speed numerator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ending {
    Completed,
    Interrupted,
}

/// Characters per second.
///
/// Completed attempts are credited with the target length, interrupted ones
/// with what was actually typed. A non-positive elapsed time yields 0.
pub fn speed(ending: Ending, target: &str, input: &str, elapsed_secs: f64) -> f64 {
    let chars = match ending {
        Ending::Completed => char_len(target),
        Ending::Interrupted => char_len(input),
    };
    if chars == 0 || elapsed_secs <= 0.0 || !elapsed_secs.is_finite() {
        return 0.0;
    }
    chars as f64 / elapsed_secs
}

/// Milliseconds between consecutive captures; the first entry is always 0.
pub fn inter_char_intervals(timestamps: &[i64]) -> Vec<i64> {
    timestamps
        .iter()
        .enumerate()
        .map(|(i, t)| if i == 0 { 0 } else { t - timestamps[i - 1] })
        .collect()
}
