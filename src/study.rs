//! Participant flow: optional timed practice, the measured block, the
//! questionnaire, then export.

use std::path::PathBuf;

use chrono::Utc;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use log::{error, info, warn};

use crate::export::{ExperimentRecord, ExportPaths};
use crate::runtime::StudyEvent;
use crate::session::{Phase, Session, SessionMode, TransitionError};
use crate::survey::{QuestionKind, Questionnaire, SurveyForm};
use crate::timer::PracticeTimer;

/// Everything needed to run one participant.
#[derive(Debug, Clone)]
pub struct StudyPlan {
    pub participant_id: String,
    /// `None` skips practice.
    pub practice: Option<Vec<String>>,
    pub practice_secs: u64,
    pub measurement: Vec<String>,
    pub countdown_secs: u64,
    pub questionnaire: Questionnaire,
    pub output_dir: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum Stage {
    Practice,
    Measurement,
    Survey,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

#[derive(Debug)]
pub struct Study {
    participant_id: String,
    stage: Stage,
    practice: Option<(Session, PracticeTimer)>,
    measurement: Session,
    /// Contents of the entry surface for the current sentence.
    input: String,
    survey: SurveyForm,
    output_dir: PathBuf,
    exported: Option<ExportPaths>,
    status: Option<String>,
}

impl Study {
    /// `now` starts the practice clock.
    pub fn new(plan: StudyPlan, now: i64) -> anyhow::Result<Self> {
        let measurement = Session::new(plan.measurement, SessionMode::Measurement, plan.countdown_secs)?;
        let practice = match plan.practice {
            Some(sentences) if plan.practice_secs > 0 => Some((
                Session::new(sentences, SessionMode::Practice, plan.countdown_secs)?,
                PracticeTimer::start(plan.practice_secs, now),
            )),
            _ => None,
        };
        let stage = if practice.is_some() {
            Stage::Practice
        } else {
            Stage::Measurement
        };
        info!("participant {} starting in {stage}", plan.participant_id);

        Ok(Self {
            participant_id: plan.participant_id,
            stage,
            practice,
            measurement,
            input: String::new(),
            survey: SurveyForm::new(plan.questionnaire),
            output_dir: plan.output_dir,
            exported: None,
            status: None,
        })
    }

    pub fn participant_id(&self) -> &str {
        &self.participant_id
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Session on screen during the typing stages.
    pub fn session(&self) -> &Session {
        match (&self.stage, &self.practice) {
            (Stage::Practice, Some((session, _))) => session,
            _ => &self.measurement,
        }
    }

    fn session_mut(&mut self) -> &mut Session {
        match (&self.stage, &mut self.practice) {
            (Stage::Practice, Some((session, _))) => session,
            _ => &mut self.measurement,
        }
    }

    pub fn measurement(&self) -> &Session {
        &self.measurement
    }

    pub fn practice_timer(&self) -> Option<&PracticeTimer> {
        match self.stage {
            Stage::Practice => self.practice.as_ref().map(|(_, timer)| timer),
            _ => None,
        }
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn survey(&self) -> &SurveyForm {
        &self.survey
    }

    pub fn exported(&self) -> Option<&ExportPaths> {
        self.exported.as_ref()
    }

    /// Last rejected action or export failure, shown until the next key.
    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    pub fn on_event(&mut self, event: StudyEvent, now: i64) -> Flow {
        match event {
            StudyEvent::Tick => {
                self.on_tick(now);
                Flow::Continue
            }
            StudyEvent::Resize => Flow::Continue,
            StudyEvent::Paste(text) if text.is_empty() => Flow::Continue,
            StudyEvent::Paste(text) => {
                match self.stage {
                    Stage::Practice | Stage::Measurement => self.type_text(|input| input.push_str(&text), now),
                    Stage::Survey => text.chars().for_each(|c| self.survey.push_char(c)),
                    Stage::Done => {}
                }
                Flow::Continue
            }
            StudyEvent::Key(key) => self.on_key(key, now),
        }
    }

    fn on_tick(&mut self, now: i64) {
        if let Stage::Practice | Stage::Measurement = self.stage {
            self.session_mut().on_tick(now);
        }
        if self.practice_timer().is_some_and(|timer| timer.is_expired(now)) {
            info!("practice time is up");
            self.end_practice();
        }
    }

    fn on_key(&mut self, key: KeyEvent, now: i64) -> Flow {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        if key.code == KeyCode::Esc || (ctrl && key.code == KeyCode::Char('c')) {
            if matches!(self.stage, Stage::Measurement | Stage::Survey) {
                warn!("participant {} quit during {}", self.participant_id, self.stage);
            }
            return Flow::Quit;
        }
        self.status = None;

        match self.stage {
            Stage::Practice | Stage::Measurement => self.on_typing_key(key, ctrl, now),
            Stage::Survey => self.on_survey_key(key),
            Stage::Done => {
                if matches!(key.code, KeyCode::Enter | KeyCode::Char('q')) {
                    return Flow::Quit;
                }
            }
        }
        Flow::Continue
    }

    fn on_typing_key(&mut self, key: KeyEvent, ctrl: bool, now: i64) {
        match key.code {
            KeyCode::Char('e') if ctrl && self.stage == Stage::Practice => self.end_practice(),
            KeyCode::Enter => {
                let result = match self.session().phase() {
                    Phase::Pending => self.session_mut().begin(now),
                    Phase::Complete => self.session_mut().advance(),
                    _ => Ok(()),
                };
                self.after_transition(result);
            }
            KeyCode::Tab => {
                let result = match self.stage {
                    Stage::Practice => self.session_mut().skip(),
                    _ => self.measurement.interrupt(now).map(|_| ()),
                };
                self.after_transition(result);
            }
            KeyCode::Backspace => {
                if !self.input.is_empty() {
                    self.type_text(
                        |input| {
                            input.pop();
                        },
                        now,
                    );
                }
            }
            KeyCode::Char(c) if !ctrl => self.type_text(|input| input.push(c), now),
            _ => {}
        }
    }

    /// Apply an edit to the entry surface and feed the result to the session.
    fn type_text(&mut self, edit: impl FnOnce(&mut String), now: i64) {
        if !self.session().accepts_input() {
            return;
        }
        edit(&mut self.input);
        let text = self.input.clone();
        let result = self.session_mut().on_input(&text, now).map(|_| ());
        if let Err(e) = result {
            self.reject(e);
        }
    }

    fn after_transition(&mut self, result: Result<(), TransitionError>) {
        match result {
            Ok(()) => {
                if self.session().phase() == Phase::Pending || self.session().is_finished() {
                    self.input.clear();
                }
                if self.stage == Stage::Measurement && self.measurement.is_finished() {
                    self.start_survey();
                }
            }
            Err(e) => self.reject(e),
        }
    }

    fn reject(&mut self, e: TransitionError) {
        warn!("{e}");
        self.status = Some(e.to_string());
    }

    fn end_practice(&mut self) {
        if let Some((session, _)) = &mut self.practice {
            info!("practice ended after {} sentences", session.practiced());
            session.end();
        }
        self.input.clear();
        self.stage = Stage::Measurement;
    }

    fn start_survey(&mut self) {
        self.stage = Stage::Survey;
        if self.survey.is_done() {
            self.finish();
        }
    }

    fn on_survey_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char(c) if self.survey_takes_text() => self.survey.push_char(c),
            KeyCode::Backspace if self.survey_takes_text() => self.survey.pop_char(),
            KeyCode::Char(c @ '1'..='9') => {
                // digit keys only ever carry a single decimal digit
                let n = c as u8 - b'0';
                if !self.survey.pick(n) {
                    self.status = Some(format!("{n} is not an option"));
                }
            }
            KeyCode::Left => self.survey.adjust(-1),
            KeyCode::Right => self.survey.adjust(1),
            KeyCode::Enter => {
                self.survey.confirm();
            }
            KeyCode::Tab => self.survey.skip(),
            KeyCode::Up | KeyCode::BackTab => self.survey.back(),
            _ => {}
        }
        if self.survey.is_done() {
            self.finish();
        }
    }

    fn survey_takes_text(&self) -> bool {
        self.survey
            .current()
            .is_some_and(|q| q.kind == QuestionKind::Text)
    }

    fn finish(&mut self) {
        let survey = std::mem::replace(&mut self.survey, SurveyForm::new(Questionnaire::None));
        let record = ExperimentRecord::new(&self.participant_id, Utc::now(), &self.measurement, survey.into_data());
        match record.write(&self.output_dir) {
            Ok(paths) => self.exported = Some(paths),
            Err(e) => {
                error!("export failed: {e:#}");
                self.status = Some(format!("export failed: {e:#}"));
            }
        }
        self.stage = Stage::Done;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn key(code: KeyCode) -> StudyEvent {
        StudyEvent::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn ctrl(c: char) -> StudyEvent {
        StudyEvent::Key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL))
    }

    fn plan(dir: &std::path::Path, practice_secs: u64, questionnaire: Questionnaire) -> StudyPlan {
        StudyPlan {
            participant_id: "P01".into(),
            practice: Some(vec!["あ".into(), "い".into()]),
            practice_secs,
            measurement: vec!["ねこ".into(), "いぬ".into()],
            countdown_secs: 0,
            questionnaire,
            output_dir: dir.to_path_buf(),
        }
    }

    fn type_str(study: &mut Study, text: &str, mut at: i64) -> i64 {
        for c in text.chars() {
            study.on_event(key(KeyCode::Char(c)), at);
            at += 100;
        }
        at
    }

    #[test]
    fn test_practice_skipped_when_zero_secs() {
        let dir = tempdir().unwrap();
        let study = Study::new(plan(dir.path(), 0, Questionnaire::None), 0).unwrap();

        assert_eq!(study.stage(), Stage::Measurement);
        assert!(study.practice_timer().is_none());
    }

    #[test]
    fn test_practice_ends_on_timer_and_ctrl_e() {
        let dir = tempdir().unwrap();
        let mut study = Study::new(plan(dir.path(), 60, Questionnaire::None), 0).unwrap();
        assert_eq!(study.stage(), Stage::Practice);

        study.on_event(StudyEvent::Tick, 59_000);
        assert_eq!(study.stage(), Stage::Practice);
        study.on_event(StudyEvent::Tick, 60_000);
        assert_eq!(study.stage(), Stage::Measurement);

        let mut study = Study::new(plan(dir.path(), 60, Questionnaire::None), 0).unwrap();
        study.on_event(ctrl('e'), 1_000);
        assert_eq!(study.stage(), Stage::Measurement);
        assert_eq!(study.session().current_target(), "ねこ");
    }

    #[test]
    fn test_practice_skip_and_cycle() {
        let dir = tempdir().unwrap();
        let mut study = Study::new(plan(dir.path(), 60, Questionnaire::None), 0).unwrap();

        study.on_event(key(KeyCode::Tab), 100);
        assert_eq!(study.session().current_target(), "い");

        study.on_event(key(KeyCode::Enter), 200);
        type_str(&mut study, "い", 300);
        assert_eq!(study.session().phase(), Phase::Complete);
        study.on_event(key(KeyCode::Enter), 500);
        assert_eq!(study.session().current_target(), "あ");
        assert_eq!(study.input(), "");
        assert!(study.measurement().results().is_empty());
    }

    #[test]
    fn test_measurement_to_export() {
        let dir = tempdir().unwrap();
        let mut study = Study::new(plan(dir.path(), 0, Questionnaire::None), 0).unwrap();

        study.on_event(key(KeyCode::Enter), 0);
        let at = type_str(&mut study, "xねこ", 1_000);
        assert_eq!(study.session().phase(), Phase::Complete);
        study.on_event(key(KeyCode::Enter), at);

        study.on_event(key(KeyCode::Enter), at + 1_000);
        type_str(&mut study, "い", at + 2_000);
        study.on_event(key(KeyCode::Tab), at + 4_000);

        assert_eq!(study.stage(), Stage::Done);
        let results = study.measurement().results();
        assert_eq!(results.len(), 2);
        assert!(!results[0].interrupted);
        assert!(results[1].interrupted);
        assert_eq!(results[1].input_text, "い");

        let paths = study.exported().unwrap();
        let record = ExperimentRecord::load(&paths.json).unwrap();
        assert_eq!(record.participant_id, "P01");
        assert_eq!(record.summary.interrupted_sentences, 1);
    }

    #[test]
    fn test_backspace_and_paste_feed_session() {
        let dir = tempdir().unwrap();
        let mut study = Study::new(plan(dir.path(), 0, Questionnaire::None), 0).unwrap();

        // typing before Enter is ignored
        type_str(&mut study, "ね", 0);
        assert_eq!(study.input(), "");

        study.on_event(key(KeyCode::Enter), 0);
        type_str(&mut study, "ねx", 1_000);
        study.on_event(key(KeyCode::Backspace), 1_200);
        assert_eq!(study.input(), "ね");
        assert_eq!(study.session().attempt().char_times(), &[1_000, 1_100]);

        study.on_event(StudyEvent::Paste("こ".into()), 1_300);
        assert_eq!(study.session().phase(), Phase::Complete);
    }

    #[test]
    fn test_empty_paste_does_not_start_input() {
        let dir = tempdir().unwrap();
        let mut study = Study::new(plan(dir.path(), 0, Questionnaire::None), 0).unwrap();
        study.on_event(key(KeyCode::Enter), 0);
        assert_eq!(study.session().phase(), Phase::Active);

        study.on_event(StudyEvent::Paste(String::new()), 500);
        assert_eq!(study.session().phase(), Phase::Active);
        assert!(!study.session().attempt().has_started());
        assert!(study.session().attempt().char_times().is_empty());

        study.on_event(StudyEvent::Paste("ね".into()), 1_000);
        assert_eq!(study.session().attempt().char_times(), &[1_000]);
    }

    #[test]
    fn test_rejected_interrupt_sets_status() {
        let dir = tempdir().unwrap();
        let mut study = Study::new(plan(dir.path(), 0, Questionnaire::None), 0).unwrap();

        study.on_event(key(KeyCode::Tab), 0);
        assert_eq!(study.status(), Some("cannot interrupt while pending"));
        assert_eq!(study.measurement().index(), 0);

        study.on_event(key(KeyCode::Enter), 100);
        assert_eq!(study.status(), None);
    }

    #[test]
    fn test_survey_flow_collects_answers() {
        let dir = tempdir().unwrap();
        let mut study = Study::new(plan(dir.path(), 0, Questionnaire::Sus), 0).unwrap();
        for (i, target) in ["ねこ", "いぬ"].iter().enumerate() {
            let base = i as i64 * 10_000;
            study.on_event(key(KeyCode::Enter), base);
            type_str(&mut study, target, base + 1_000);
            study.on_event(key(KeyCode::Enter), base + 5_000);
        }
        assert_eq!(study.stage(), Stage::Survey);

        study.on_event(key(KeyCode::Char('1')), 30_000); // flick_input: yes
        study.on_event(key(KeyCode::Char('9')), 30_000);
        assert!(study.status().is_some());
        study.on_event(key(KeyCode::Char('2')), 30_000);
        study.on_event(key(KeyCode::Tab), 30_000);
        study.on_event(StudyEvent::Paste("ぬ".into()), 30_000);
        study.on_event(key(KeyCode::Enter), 30_000);
        for _ in 0..10 {
            study.on_event(key(KeyCode::Char('3')), 30_000);
        }

        assert_eq!(study.stage(), Stage::Done);
        let record = ExperimentRecord::load(&study.exported().unwrap().json).unwrap();
        assert_eq!(record.survey_summary.sus_score, Some(50.0));
        assert_eq!(record.survey_data.additional["flick_input"], "yes");
        assert_eq!(record.survey_data.additional["eyelid_misaction"], "2");
        assert_eq!(record.survey_data.additional["head_misaction"], "");
        assert_eq!(record.survey_data.additional["difficult_chars"], "ぬ");
    }

    #[test]
    fn test_quit_keys() {
        let dir = tempdir().unwrap();
        let mut study = Study::new(plan(dir.path(), 60, Questionnaire::None), 0).unwrap();

        assert_eq!(study.on_event(StudyEvent::Tick, 10), Flow::Continue);
        assert_eq!(study.on_event(ctrl('c'), 10), Flow::Quit);
        assert_eq!(study.on_event(key(KeyCode::Esc), 10), Flow::Quit);
        assert!(study.exported().is_none());
    }
}
