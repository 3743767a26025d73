use log::{debug, info, warn};
use thiserror::Error;

use crate::attempt::Attempt;
use crate::matcher::MatchState;
use crate::metrics::Ending;
use crate::results::{SentenceResult, SessionSummary};
use crate::timer::Countdown;

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum SessionMode {
    /// Results are recorded and the session ends after the last sentence.
    Measurement,
    /// Nothing is recorded; sentences cycle until the driver ends practice.
    Practice,
}

/// Where the current sentence stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Displayed, waiting for the participant to begin.
    Pending,
    Countdown(Countdown),
    /// Accepting input, no keystroke yet.
    Active,
    /// At least one keystroke recorded.
    InProgress,
    /// Every target character matched; input is closed.
    Complete,
    /// No sentences left (or practice ended).
    Finished,
}

impl Phase {
    pub fn name(&self) -> &'static str {
        match self {
            Phase::Pending => "pending",
            Phase::Countdown(_) => "counting down",
            Phase::Active => "active",
            Phase::InProgress => "in progress",
            Phase::Complete => "complete",
            Phase::Finished => "finished",
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("a session needs at least one sentence")]
    NoSentences,
    #[error("cannot {action} while {phase}")]
    InvalidPhase {
        action: &'static str,
        phase: &'static str,
    },
    #[error("sentences can only be skipped during practice")]
    SkipNotAllowed,
}

/// Ordered run over a fixed sentence list.
///
/// Owns the current attempt and the append-only list of results. Every
/// external event (begin, tick, input, interrupt, advance) is a method taking
/// the event's timestamp in epoch milliseconds.
#[derive(Debug, Clone)]
pub struct Session {
    mode: SessionMode,
    sentences: Vec<String>,
    index: usize,
    countdown_secs: u64,
    phase: Phase,
    attempt: Attempt,
    results: Vec<SentenceResult>,
    practiced: usize,
}

impl Session {
    pub fn new(
        sentences: Vec<String>,
        mode: SessionMode,
        countdown_secs: u64,
    ) -> Result<Self, TransitionError> {
        let first = sentences.first().ok_or(TransitionError::NoSentences)?.clone();
        info!("{mode} session created with {} sentences", sentences.len());

        Ok(Self {
            mode,
            sentences,
            index: 0,
            countdown_secs,
            phase: Phase::Pending,
            attempt: Attempt::new(first),
            results: Vec::new(),
            practiced: 0,
        })
    }

    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// 0-based index of the sentence on screen.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn sentence_count(&self) -> usize {
        self.sentences.len()
    }

    pub fn current_target(&self) -> &str {
        self.attempt.target()
    }

    pub fn attempt(&self) -> &Attempt {
        &self.attempt
    }

    pub fn match_state(&self) -> &MatchState {
        self.attempt.match_state()
    }

    pub fn results(&self) -> &[SentenceResult] {
        &self.results
    }

    /// Sentences completed during practice.
    pub fn practiced(&self) -> usize {
        self.practiced
    }

    pub fn is_finished(&self) -> bool {
        self.phase == Phase::Finished
    }

    pub fn accepts_input(&self) -> bool {
        matches!(self.phase, Phase::Active | Phase::InProgress)
    }

    pub fn countdown_remaining(&self, now: i64) -> Option<u64> {
        match self.phase {
            Phase::Countdown(countdown) => Some(countdown.remaining_secs(now)),
            _ => None,
        }
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary::from_results(self.sentences.len(), &self.results)
    }

    fn invalid(&self, action: &'static str) -> TransitionError {
        TransitionError::InvalidPhase {
            action,
            phase: self.phase.name(),
        }
    }

    fn set_phase(&mut self, phase: Phase) {
        debug!(
            "sentence {}: {} -> {}",
            self.index + 1,
            self.phase.name(),
            phase.name()
        );
        self.phase = phase;
    }

    /// Participant is ready: start the countdown, or open input directly
    /// when no countdown is configured.
    pub fn begin(&mut self, at: i64) -> Result<(), TransitionError> {
        if self.phase != Phase::Pending {
            return Err(self.invalid("begin"));
        }
        if self.countdown_secs == 0 {
            self.set_phase(Phase::Active);
        } else {
            self.set_phase(Phase::Countdown(Countdown::start(self.countdown_secs, at)));
        }
        Ok(())
    }

    /// Timer tick. Returns true when the phase changed.
    pub fn on_tick(&mut self, now: i64) -> bool {
        match self.phase {
            Phase::Countdown(countdown) if countdown.is_done(now) => {
                self.set_phase(Phase::Active);
                true
            }
            _ => false,
        }
    }

    /// New contents of the entry surface.
    ///
    /// Completion is one-shot: the completing call records the result (in
    /// measurement) and closes input for this sentence.
    pub fn on_input(&mut self, text: &str, at: i64) -> Result<&MatchState, TransitionError> {
        match self.phase {
            Phase::Active => self.set_phase(Phase::InProgress),
            Phase::InProgress => {}
            _ => return Err(self.invalid("accept input")),
        }

        let complete = self.attempt.record_input(text, at).complete;
        if complete {
            self.set_phase(Phase::Complete);
            match self.mode {
                SessionMode::Measurement => {
                    let result =
                        SentenceResult::from_attempt(self.index, &self.attempt, Ending::Completed, at);
                    info!(
                        "sentence {} complete: {:.2}s, {:.2} cps, accuracy {:.1}, msd {}",
                        result.sentence_index,
                        result.input_time,
                        result.speed,
                        result.accuracy,
                        result.msd
                    );
                    self.results.push(result);
                }
                SessionMode::Practice => self.practiced += 1,
            }
        }

        Ok(self.attempt.match_state())
    }

    /// Stop the current sentence early.
    ///
    /// During the countdown the sentence is skipped without a record. Once
    /// typing has started an interrupted result is recorded (measurement
    /// only). Either way the session moves to the next sentence.
    pub fn interrupt(&mut self, at: i64) -> Result<Option<&SentenceResult>, TransitionError> {
        match self.phase {
            Phase::Countdown(_) => {
                warn!("sentence {} skipped during countdown", self.index + 1);
                self.next_sentence();
                Ok(None)
            }
            Phase::InProgress => {
                let recorded = self.mode == SessionMode::Measurement;
                if recorded {
                    let result =
                        SentenceResult::from_attempt(self.index, &self.attempt, Ending::Interrupted, at);
                    warn!(
                        "sentence {} interrupted after {:.2}s with {:?}",
                        result.sentence_index, result.input_time, result.input_text
                    );
                    self.results.push(result);
                }
                self.next_sentence();
                Ok(if recorded { self.results.last() } else { None })
            }
            _ => Err(self.invalid("interrupt")),
        }
    }

    /// Move on after a completed sentence.
    pub fn advance(&mut self) -> Result<(), TransitionError> {
        if self.phase != Phase::Complete {
            return Err(self.invalid("advance"));
        }
        self.next_sentence();
        Ok(())
    }

    /// Practice only: drop the current sentence whatever its phase.
    pub fn skip(&mut self) -> Result<(), TransitionError> {
        if self.mode != SessionMode::Practice {
            return Err(TransitionError::SkipNotAllowed);
        }
        if self.phase == Phase::Finished {
            return Err(self.invalid("skip"));
        }
        self.next_sentence();
        Ok(())
    }

    /// End the session where it stands. The current attempt is discarded.
    pub fn end(&mut self) {
        if self.mode == SessionMode::Measurement && !self.is_finished() {
            warn!(
                "measurement ended early at sentence {} of {}",
                self.index + 1,
                self.sentences.len()
            );
        }
        self.set_phase(Phase::Finished);
    }

    fn next_sentence(&mut self) {
        let next = self.index + 1;
        let next = match self.mode {
            SessionMode::Measurement if next >= self.sentences.len() => {
                self.set_phase(Phase::Finished);
                return;
            }
            SessionMode::Practice if next >= self.sentences.len() => 0,
            _ => next,
        };

        self.index = next;
        self.attempt = Attempt::new(self.sentences[next].clone());
        self.phase = Phase::Pending;
        debug!("showing sentence {}", next + 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn sentences(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn measurement(list: &[&str]) -> Session {
        Session::new(sentences(list), SessionMode::Measurement, 3).unwrap()
    }

    fn type_all(session: &mut Session, target: &str, start: i64, step: i64) -> i64 {
        let mut at = start;
        let mut typed = String::new();
        for c in target.chars() {
            typed.push(c);
            session.on_input(&typed, at).unwrap();
            at += step;
        }
        at - step
    }

    #[test]
    fn test_empty_sentence_list_rejected() {
        assert_matches!(
            Session::new(vec![], SessionMode::Measurement, 3),
            Err(TransitionError::NoSentences)
        );
    }

    #[test]
    fn test_countdown_then_active() {
        let mut session = measurement(&["ねこ"]);
        assert_eq!(session.phase(), Phase::Pending);
        assert!(!session.accepts_input());

        session.begin(0).unwrap();
        assert_matches!(session.phase(), Phase::Countdown(_));
        assert_eq!(session.countdown_remaining(0), Some(3));
        assert!(!session.on_tick(2_000));
        assert_eq!(session.countdown_remaining(2_000), Some(1));
        assert!(session.on_tick(3_000));
        assert_eq!(session.phase(), Phase::Active);
        assert_eq!(session.countdown_remaining(3_000), None);
        assert!(session.accepts_input());
    }

    #[test]
    fn test_zero_countdown_goes_straight_to_active() {
        let mut session = Session::new(sentences(&["ねこ"]), SessionMode::Measurement, 0).unwrap();
        session.begin(0).unwrap();

        assert_eq!(session.phase(), Phase::Active);
    }

    #[test]
    fn test_input_rejected_before_active() {
        let mut session = measurement(&["ねこ"]);

        assert_matches!(
            session.on_input("ね", 0),
            Err(TransitionError::InvalidPhase { action: "accept input", phase: "pending" })
        );

        session.begin(0).unwrap();
        assert_matches!(session.on_input("ね", 500), Err(TransitionError::InvalidPhase { .. }));
    }

    #[test]
    fn test_completion_records_once_and_closes_input() {
        let mut session = measurement(&["ねこ", "いぬ"]);
        session.begin(0).unwrap();
        session.on_tick(3_000);

        session.on_input("x", 4_000).unwrap();
        assert_eq!(session.phase(), Phase::InProgress);
        session.on_input("xね", 4_500).unwrap();
        session.on_input("xねx", 5_000).unwrap();
        let state = session.on_input("xねxこ", 6_000).unwrap();
        assert!(state.complete);
        assert_eq!(session.phase(), Phase::Complete);
        assert_eq!(session.results().len(), 1);

        // input is closed once complete
        assert_matches!(session.on_input("xねxこz", 6_500), Err(TransitionError::InvalidPhase { .. }));
        assert_eq!(session.results().len(), 1);

        let result = &session.results()[0];
        assert_eq!(result.sentence_index, 1);
        assert_eq!(result.input_time, 2.0);
        assert_eq!(result.char_times, vec![4_000, 4_500, 5_000, 6_000]);
        assert_eq!(result.inter_char_ms, vec![0, 500, 500, 1_000]);
    }

    #[test]
    fn test_elapsed_time_starts_at_first_keystroke_not_display() {
        let mut session = measurement(&["あ", "い"]);
        session.begin(0).unwrap();
        session.on_tick(3_000);
        // long pause before typing is not counted
        session.on_input("x", 60_000).unwrap();
        session.on_input("xあ", 61_000).unwrap();

        assert_eq!(session.results()[0].input_time, 1.0);
    }

    #[test]
    fn test_advance_moves_to_next_sentence() {
        let mut session = measurement(&["ねこ", "いぬ"]);
        assert_matches!(session.advance(), Err(TransitionError::InvalidPhase { .. }));

        session.begin(0).unwrap();
        session.on_tick(3_000);
        type_all(&mut session, "ねこ", 4_000, 300);
        session.advance().unwrap();

        assert_eq!(session.index(), 1);
        assert_eq!(session.current_target(), "いぬ");
        assert_eq!(session.phase(), Phase::Pending);
        assert_eq!(session.attempt().input(), "");
        assert!(session.attempt().char_times().is_empty());
    }

    #[test]
    fn test_interrupt_in_progress_records_and_advances() {
        let mut session = measurement(&["ゆめをみる", "あさになる"]);
        session.begin(0).unwrap();
        session.on_tick(3_000);
        session.on_input("ゆ", 4_000).unwrap();
        session.on_input("ゆめ", 5_000).unwrap();

        let result = session.interrupt(8_000).unwrap().cloned().unwrap();

        assert!(result.interrupted);
        assert_eq!(result.sentence_index, 1);
        assert_eq!(result.input_time, 4.0);
        assert_eq!(result.speed, 0.5);
        assert_eq!(session.index(), 1);
        assert_eq!(session.phase(), Phase::Pending);
    }

    #[test]
    fn test_interrupt_during_countdown_skips_without_record() {
        let mut session = measurement(&["ねこ", "いぬ"]);
        session.begin(0).unwrap();

        assert_matches!(session.interrupt(1_000), Ok(None));
        assert!(session.results().is_empty());
        assert_eq!(session.index(), 1);
    }

    #[test]
    fn test_interrupt_rejected_before_first_keystroke() {
        let mut session = measurement(&["ねこ"]);
        assert_matches!(session.interrupt(0), Err(TransitionError::InvalidPhase { .. }));

        session.begin(0).unwrap();
        session.on_tick(3_000);
        assert_matches!(
            session.interrupt(3_500),
            Err(TransitionError::InvalidPhase { action: "interrupt", phase: "active" })
        );
    }

    #[test]
    fn test_interrupt_rejected_after_complete() {
        let mut session = measurement(&["ね", "こ"]);
        session.begin(0).unwrap();
        session.on_tick(3_000);
        session.on_input("ね", 4_000).unwrap();

        assert_matches!(session.interrupt(4_100), Err(TransitionError::InvalidPhase { .. }));
        assert_eq!(session.results().len(), 1);
        assert!(!session.results()[0].interrupted);
    }

    #[test]
    fn test_single_keystroke_completion_has_zero_speed_not_infinite() {
        let mut session = Session::new(sentences(&["ね"]), SessionMode::Measurement, 0).unwrap();
        session.begin(0).unwrap();
        session.on_input("ね", 1_000).unwrap();

        let result = &session.results()[0];
        assert_eq!(result.input_time, 0.0);
        assert_eq!(result.speed, 0.0);
        assert!(result.speed.is_finite());
    }

    #[test]
    fn test_measurement_finishes_after_last_sentence() {
        let mut session = measurement(&["ね", "こ"]);
        for (i, target) in ["ね", "こ"].iter().enumerate() {
            let base = i as i64 * 10_000;
            session.begin(base).unwrap();
            session.on_tick(base + 3_000);
            session.on_input("x", base + 4_000).unwrap();
            session.on_input(&format!("x{target}"), base + 5_000).unwrap();
            session.advance().unwrap();
        }

        assert!(session.is_finished());
        assert_eq!(session.results().len(), 2);
        assert_matches!(session.begin(30_000), Err(TransitionError::InvalidPhase { .. }));
    }

    #[test]
    fn test_summary_over_mixed_session() {
        let mut session = measurement(&["ねこ", "いぬ"]);
        session.begin(0).unwrap();
        session.on_tick(3_000);
        session.on_input("ね", 4_000).unwrap();
        session.interrupt(6_000).unwrap();

        session.begin(10_000).unwrap();
        session.on_tick(13_000);
        session.on_input("い", 14_000).unwrap();
        session.on_input("いぬ", 15_000).unwrap();
        session.advance().unwrap();

        let summary = session.summary();
        assert_eq!(summary.total_sentences, 2);
        assert_eq!(summary.completed_sentences, 1);
        assert_eq!(summary.interrupted_sentences, 1);
        assert_eq!(summary.average_speed, 2.0);
        assert_eq!(summary.average_accuracy, 100.0);
        assert_eq!(summary.total_time, 3.0);
    }

    #[test]
    fn test_practice_cycles_and_does_not_record() {
        let mut session = Session::new(sentences(&["ね", "こ"]), SessionMode::Practice, 0).unwrap();
        for target in ["ね", "こ", "ね"] {
            assert_eq!(session.current_target(), target);
            session.begin(0).unwrap();
            session.on_input(target, 100).unwrap();
            session.advance().unwrap();
        }

        assert!(session.results().is_empty());
        assert_eq!(session.practiced(), 3);
        assert!(!session.is_finished());
    }

    #[test]
    fn test_skip_only_in_practice() {
        let mut practice = Session::new(sentences(&["ね", "こ"]), SessionMode::Practice, 3).unwrap();
        practice.skip().unwrap();
        assert_eq!(practice.current_target(), "こ");

        let mut session = measurement(&["ね", "こ"]);
        assert_matches!(session.skip(), Err(TransitionError::SkipNotAllowed));
    }

    #[test]
    fn test_end_finishes_session() {
        let mut practice = Session::new(sentences(&["ね"]), SessionMode::Practice, 3).unwrap();
        practice.begin(0).unwrap();
        practice.end();

        assert!(practice.is_finished());
        assert_matches!(practice.skip(), Err(TransitionError::InvalidPhase { .. }));
    }

    #[test]
    fn test_transition_error_messages() {
        let session = measurement(&["ねこ"]);
        assert_eq!(
            session.invalid("advance").to_string(),
            "cannot advance while pending"
        );
        assert_eq!(
            TransitionError::SkipNotAllowed.to_string(),
            "sentences can only be skipped during practice"
        );
    }
}
