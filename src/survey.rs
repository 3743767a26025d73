//! Post-task questionnaires.
//!
//! Answers are opaque to the metrics; they are scored where a standard
//! scoring exists (SUS, raw NASA-TLX) and merged into the exported record.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub const SUS_ITEMS: [&str; 10] = [
    "I think that I would like to use this input method frequently.",
    "I found this input method unnecessarily complex.",
    "I thought this input method was easy to use.",
    "I think that I would need the support of an expert to use this input method.",
    "I found the functions of this input method (consonant and vowel selection) well integrated.",
    "I thought there was too much inconsistency in this input method.",
    "I would imagine that most people would learn to use this input method very quickly.",
    "I found this input method very cumbersome to use.",
    "I felt very confident using this input method.",
    "I needed to learn a lot of things before I could get going with this input method.",
];

pub const TLX_SCALES: [(&str, &str); 6] = [
    ("mentalDemand", "Mental demand: how mentally demanding was the task?"),
    ("physicalDemand", "Physical demand: how physically demanding was the task?"),
    ("temporalDemand", "Temporal demand: how hurried or rushed was the pace of the task?"),
    ("performance", "Performance: how unsuccessful were you in accomplishing the task?"),
    ("effort", "Effort: how hard did you have to work to reach your level of performance?"),
    ("frustration", "Frustration: how insecure, discouraged, irritated or stressed were you?"),
];

pub const TLX_MAX: u8 = 100;
pub const TLX_STEP: u8 = 5;

/// SUS score (0-100) when all ten items were answered on the 1-5 scale.
///
/// Odd items contribute `answer - 1`, even items `5 - answer`; the sum is
/// scaled by 2.5.
pub fn sus_score(answers: &[Option<u8>; 10]) -> Option<f64> {
    let mut total = 0u32;
    for (i, answer) in answers.iter().enumerate() {
        let a = (*answer).filter(|a| (1..=5).contains(a))? as u32;
        total += if i % 2 == 0 { a - 1 } else { 5 - a };
    }
    Some(total as f64 * 2.5)
}

/// Raw (unweighted) TLX: mean of the six subscales.
pub fn raw_tlx_score(answers: &[Option<u8>; 6]) -> Option<f64> {
    let mut total = 0u32;
    for answer in answers {
        total += (*answer)? as u32;
    }
    Some(total as f64 / answers.len() as f64)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct SusRecord {
    q1: Option<u8>,
    q2: Option<u8>,
    q3: Option<u8>,
    q4: Option<u8>,
    q5: Option<u8>,
    q6: Option<u8>,
    q7: Option<u8>,
    q8: Option<u8>,
    q9: Option<u8>,
    q10: Option<u8>,
}

/// SUS answers, serialized as `{ "q1": .., "q10": .. }`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "SusRecord", into = "SusRecord")]
pub struct SusAnswers(pub [Option<u8>; 10]);

impl From<SusRecord> for SusAnswers {
    fn from(r: SusRecord) -> Self {
        Self([r.q1, r.q2, r.q3, r.q4, r.q5, r.q6, r.q7, r.q8, r.q9, r.q10])
    }
}

impl From<SusAnswers> for SusRecord {
    fn from(a: SusAnswers) -> Self {
        let [q1, q2, q3, q4, q5, q6, q7, q8, q9, q10] = a.0;
        Self {
            q1,
            q2,
            q3,
            q4,
            q5,
            q6,
            q7,
            q8,
            q9,
            q10,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TlxRecord {
    mental_demand: Option<u8>,
    physical_demand: Option<u8>,
    temporal_demand: Option<u8>,
    performance: Option<u8>,
    effort: Option<u8>,
    frustration: Option<u8>,
}

/// NASA-TLX subscale ratings (0-100), in `TLX_SCALES` order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "TlxRecord", into = "TlxRecord")]
pub struct TlxAnswers(pub [Option<u8>; 6]);

impl From<TlxRecord> for TlxAnswers {
    fn from(r: TlxRecord) -> Self {
        Self([
            r.mental_demand,
            r.physical_demand,
            r.temporal_demand,
            r.performance,
            r.effort,
            r.frustration,
        ])
    }
}

impl From<TlxAnswers> for TlxRecord {
    fn from(a: TlxAnswers) -> Self {
        let [mental_demand, physical_demand, temporal_demand, performance, effort, frustration] =
            a.0;
        Self {
            mental_demand,
            physical_demand,
            temporal_demand,
            performance,
            effort,
            frustration,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveyData {
    /// Study-specific answers keyed by question id; empty string when skipped.
    pub additional: BTreeMap<String, String>,
    pub sus: SusAnswers,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nasa_tlx: Option<TlxAnswers>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SurveySummary {
    pub sus_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nasa_tlx_score: Option<f64>,
}

impl SurveyData {
    pub fn summary(&self) -> SurveySummary {
        SurveySummary {
            sus_score: sus_score(&self.sus.0),
            nasa_tlx_score: self.nasa_tlx.as_ref().and_then(|t| raw_tlx_score(&t.0)),
        }
    }
}

/// Which standardized questionnaires follow the measurement.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum, strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
pub enum Questionnaire {
    #[default]
    Sus,
    Tlx,
    Both,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Additional,
    Sus,
    Tlx,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuestionKind {
    /// `(value, label)` pairs picked with digit keys.
    Choice(&'static [(&'static str, &'static str)]),
    /// Agreement scale 1..=points.
    Likert { points: u8 },
    /// 0..=max in `step` increments.
    Slider { max: u8, step: u8 },
    Text,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    pub id: &'static str,
    pub prompt: &'static str,
    pub section: Section,
    pub kind: QuestionKind,
}

const ADDITIONAL_QUESTIONS: [(&str, &str, QuestionKind); 4] = [
    (
        "flick_input",
        "Do you usually use flick input on a smartphone?",
        QuestionKind::Choice(&[("yes", "yes"), ("no", "no")]),
    ),
    (
        "eyelid_misaction",
        "How often did an eyelid selection trigger against your intention?",
        QuestionKind::Choice(&[
            ("1", "once"),
            ("2", "twice"),
            ("3", "3 times"),
            ("4", "4 times"),
            ("5", "5 or more"),
        ]),
    ),
    (
        "head_misaction",
        "How often did head pointing move against your intention?",
        QuestionKind::Choice(&[
            ("1", "once"),
            ("2", "twice"),
            ("3", "3 times"),
            ("4", "4 times"),
            ("5", "5-10 times"),
            ("6", "more than 10"),
        ]),
    ),
    (
        "difficult_chars",
        "Were any positions (characters) particularly hard to enter?",
        QuestionKind::Text,
    ),
];

pub fn questions_for(questionnaire: Questionnaire) -> Vec<Question> {
    if questionnaire == Questionnaire::None {
        return Vec::new();
    }

    let mut questions: Vec<Question> = ADDITIONAL_QUESTIONS
        .iter()
        .map(|(id, prompt, kind)| Question {
            id: *id,
            prompt: *prompt,
            section: Section::Additional,
            kind: kind.clone(),
        })
        .collect();

    if matches!(questionnaire, Questionnaire::Sus | Questionnaire::Both) {
        questions.extend(SUS_ITEMS.iter().map(|&prompt| Question {
            id: "sus",
            prompt,
            section: Section::Sus,
            kind: QuestionKind::Likert { points: 5 },
        }));
    }

    if matches!(questionnaire, Questionnaire::Tlx | Questionnaire::Both) {
        questions.extend(TLX_SCALES.iter().map(|&(id, prompt)| Question {
            id,
            prompt,
            section: Section::Tlx,
            kind: QuestionKind::Slider {
                max: TLX_MAX,
                step: TLX_STEP,
            },
        }));
    }

    questions
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Answer {
    Number(u8),
    Text(String),
}

/// Question-by-question walk through a questionnaire.
#[derive(Debug, Clone)]
pub struct SurveyForm {
    questionnaire: Questionnaire,
    questions: Vec<Question>,
    answers: Vec<Option<Answer>>,
    cursor: usize,
    /// Pending slider value or text for the current question.
    draft: Answer,
}

impl SurveyForm {
    pub fn new(questionnaire: Questionnaire) -> Self {
        let questions = questions_for(questionnaire);
        let answers = vec![None; questions.len()];
        let mut form = Self {
            questionnaire,
            questions,
            answers,
            cursor: 0,
            draft: Answer::Number(0),
        };
        form.reset_draft();
        form
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn position(&self) -> usize {
        self.cursor
    }

    pub fn current(&self) -> Option<&Question> {
        self.questions.get(self.cursor)
    }

    pub fn draft(&self) -> &Answer {
        &self.draft
    }

    pub fn answer(&self, idx: usize) -> Option<&Answer> {
        self.answers.get(idx).and_then(|a| a.as_ref())
    }

    pub fn is_done(&self) -> bool {
        self.cursor >= self.questions.len()
    }

    fn reset_draft(&mut self) {
        let existing = self.answers.get(self.cursor).cloned().flatten();
        let kind = self.current().map(|q| q.kind.clone());
        self.draft = match (kind, existing) {
            (_, Some(answer)) => answer,
            (Some(QuestionKind::Text), None) => Answer::Text(String::new()),
            (Some(QuestionKind::Slider { max, .. }), None) => Answer::Number(max / 2),
            _ => Answer::Number(0),
        };
    }

    fn commit(&mut self, answer: Answer) {
        self.answers[self.cursor] = Some(answer);
        self.cursor += 1;
        self.reset_draft();
    }

    /// Digit key `n` (1-based) on a choice or Likert question.
    /// Returns false when `n` is not a valid option.
    pub fn pick(&mut self, n: u8) -> bool {
        let valid = match self.current().map(|q| &q.kind) {
            Some(QuestionKind::Choice(options)) => (1..=options.len() as u8).contains(&n),
            Some(QuestionKind::Likert { points }) => (1..=*points).contains(&n),
            _ => false,
        };
        if valid {
            self.commit(Answer::Number(n));
        }
        valid
    }

    /// Move a slider by `steps` increments, clamped to its range.
    pub fn adjust(&mut self, steps: i32) {
        if let (Some(QuestionKind::Slider { max, step }), Answer::Number(value)) =
            (self.current().map(|q| q.kind.clone()), &self.draft)
        {
            let next = (*value as i32 + steps * step as i32).clamp(0, max as i32);
            self.draft = Answer::Number(next as u8);
        }
    }

    pub fn push_char(&mut self, c: char) {
        if let Answer::Text(text) = &mut self.draft {
            text.push(c);
        }
    }

    pub fn pop_char(&mut self) {
        if let Answer::Text(text) = &mut self.draft {
            text.pop();
        }
    }

    /// Accept the draft of a slider or text question.
    pub fn confirm(&mut self) -> bool {
        match self.current().map(|q| &q.kind) {
            Some(QuestionKind::Slider { .. }) | Some(QuestionKind::Text) => {
                let draft = self.draft.clone();
                self.commit(draft);
                true
            }
            _ => false,
        }
    }

    /// Leave the current question unanswered.
    pub fn skip(&mut self) {
        if !self.is_done() {
            self.cursor += 1;
            self.reset_draft();
        }
    }

    pub fn back(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            self.reset_draft();
        }
    }

    pub fn into_data(self) -> SurveyData {
        let mut data = SurveyData {
            nasa_tlx: matches!(self.questionnaire, Questionnaire::Tlx | Questionnaire::Both)
                .then(TlxAnswers::default),
            ..SurveyData::default()
        };
        let (mut sus_idx, mut tlx_idx) = (0, 0);

        for (question, answer) in self.questions.iter().zip(self.answers) {
            match question.section {
                Section::Additional => {
                    let value = match (&question.kind, answer) {
                        (QuestionKind::Choice(options), Some(Answer::Number(n))) => (n as usize)
                            .checked_sub(1)
                            .and_then(|i| options.get(i))
                            .map(|(value, _)| value.to_string())
                            .unwrap_or_default(),
                        (_, Some(Answer::Text(text))) => text,
                        (_, Some(Answer::Number(n))) => n.to_string(),
                        (_, None) => String::new(),
                    };
                    data.additional.insert(question.id.to_string(), value);
                }
                Section::Sus => {
                    data.sus.0[sus_idx] = number(answer);
                    sus_idx += 1;
                }
                Section::Tlx => {
                    if let Some(tlx) = data.nasa_tlx.as_mut() {
                        tlx.0[tlx_idx] = number(answer);
                    }
                    tlx_idx += 1;
                }
            }
        }

        data
    }
}

fn number(answer: Option<Answer>) -> Option<u8> {
    match answer {
        Some(Answer::Number(n)) => Some(n),
        _ => None,
    }
}
