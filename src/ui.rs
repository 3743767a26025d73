use entrylab::{
    matcher::Outcome,
    session::{Phase, SessionMode},
    study::{Stage, Study},
    survey::{Answer, QuestionKind, Section},
    timer::format_clock,
    util::{std_dev, typing_intervals},
};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Paragraph, Wrap},
    Frame,
};
use unicode_width::UnicodeWidthStr;

const HORIZONTAL_MARGIN: u16 = 5;
const VERTICAL_MARGIN: u16 = 2;

const LIKERT_LABELS: [&str; 5] = [
    "strongly disagree",
    "disagree",
    "neutral",
    "agree",
    "strongly agree",
];

pub fn draw(study: &Study, now: i64, f: &mut Frame) {
    let area = f.area();
    match study.stage() {
        Stage::Practice | Stage::Measurement => render_typing(study, now, f, area),
        Stage::Survey => render_survey(study, f, area),
        Stage::Done => render_done(study, f, area),
    }
}

fn bold() -> Style {
    Style::default().add_modifier(Modifier::BOLD)
}

fn dim_bold() -> Style {
    bold().add_modifier(Modifier::DIM)
}

fn italic() -> Style {
    Style::default().add_modifier(Modifier::ITALIC)
}

/// Short lines look best centered; wrapped ones read better left aligned.
fn alignment_for(text: &str, area: Rect) -> Alignment {
    let max_width = area.width.saturating_sub(HORIZONTAL_MARGIN * 2) as usize;
    if text.width() <= max_width {
        Alignment::Center
    } else {
        Alignment::Left
    }
}

fn render_typing(study: &Study, now: i64, f: &mut Frame, area: Rect) {
    let session = study.session();
    let state = session.match_state();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([
            Constraint::Length(1), // header
            Constraint::Min(1),    // padding
            Constraint::Length(2), // target
            Constraint::Length(2), // input
            Constraint::Length(1), // phase hint
            Constraint::Min(1),    // padding
            Constraint::Length(1), // status
            Constraint::Length(1), // legend
        ])
        .split(area);

    let header = match (session.mode(), study.practice_timer()) {
        (SessionMode::Practice, Some(timer)) => {
            let style = if timer.is_warning(now) {
                bold().fg(Color::Red)
            } else {
                bold().fg(Color::Yellow)
            };
            Line::from(vec![
                Span::styled("practice  ", bold()),
                Span::styled(format_clock(timer.remaining_secs(now)), style),
                Span::styled(format!("  {} done", session.practiced()), dim_bold()),
            ])
        }
        _ => Line::from(vec![
            Span::styled(
                format!(
                    "{}  sentence {}/{}",
                    study.participant_id(),
                    session.index() + 1,
                    session.sentence_count()
                ),
                bold(),
            ),
            Span::styled(format!("  {} errors", state.incorrect_count()), dim_bold()),
        ]),
    };
    f.render_widget(Paragraph::new(header).alignment(Alignment::Center), chunks[0]);

    let target_spans: Vec<Span> = session
        .attempt()
        .target_chars()
        .iter()
        .enumerate()
        .map(|(idx, c)| {
            let style = if idx < state.matched {
                bold().fg(Color::Green)
            } else if idx == state.matched && session.accepts_input() {
                dim_bold().add_modifier(Modifier::UNDERLINED)
            } else {
                dim_bold()
            };
            Span::styled(c.to_string(), style)
        })
        .collect();
    let target_alignment = alignment_for(session.current_target(), area);

    // no progress highlighting until input opens
    if !matches!(session.phase(), Phase::Pending | Phase::Countdown(_)) {
        f.render_widget(
            Paragraph::new(Line::from(target_spans))
                .alignment(target_alignment)
                .wrap(Wrap { trim: true }),
            chunks[2],
        );
    } else {
        f.render_widget(
            Paragraph::new(Span::styled(session.current_target(), dim_bold()))
                .alignment(target_alignment)
                .wrap(Wrap { trim: true }),
            chunks[2],
        );
    }

    let mut input_spans: Vec<Span> = state
        .feedback
        .iter()
        .map(|fb| {
            let style = match fb.outcome {
                Outcome::Correct => bold().fg(Color::Green),
                Outcome::Incorrect => bold().fg(Color::Red),
            };
            Span::styled(fb.char.to_string(), style)
        })
        .collect();
    if session.accepts_input() {
        input_spans.push(Span::styled("▏", dim_bold()));
    }
    f.render_widget(
        Paragraph::new(Line::from(input_spans))
            .alignment(alignment_for(study.input(), area))
            .wrap(Wrap { trim: true }),
        chunks[3],
    );

    let hint = match session.phase() {
        Phase::Pending => Span::styled("press enter when ready", italic()),
        Phase::Countdown(_) => Span::styled(
            session
                .countdown_remaining(now)
                .map(|s| s.to_string())
                .unwrap_or_default(),
            bold().fg(Color::Cyan),
        ),
        Phase::Complete => Span::styled("done - enter for the next sentence", bold().fg(Color::Green)),
        Phase::Active | Phase::InProgress | Phase::Finished => Span::raw(""),
    };
    f.render_widget(Paragraph::new(hint).alignment(Alignment::Center), chunks[4]);

    render_status(study, f, chunks[6]);

    let legend = match session.mode() {
        SessionMode::Practice => "(enter) start/next / (tab) skip / (ctrl+e) end practice / (esc)ape",
        SessionMode::Measurement => "(enter) start/next / (tab) interrupt / (esc)ape",
    };
    f.render_widget(Paragraph::new(Span::styled(legend, italic())), chunks[7]);
}

fn render_status(study: &Study, f: &mut Frame, area: Rect) {
    if let Some(status) = study.status() {
        f.render_widget(
            Paragraph::new(Span::styled(status, italic().fg(Color::Red))).alignment(Alignment::Center),
            area,
        );
    }
}

fn render_survey(study: &Study, f: &mut Frame, area: Rect) {
    let form = study.survey();
    let Some(question) = form.current() else {
        return;
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([
            Constraint::Length(1), // progress
            Constraint::Length(1), // padding
            Constraint::Length(3), // prompt
            Constraint::Min(3),    // options
            Constraint::Length(1), // status
            Constraint::Length(1), // legend
        ])
        .split(area);

    let section = match question.section {
        Section::Additional => "about the session",
        Section::Sus => "system usability scale",
        Section::Tlx => "NASA-TLX",
    };
    f.render_widget(
        Paragraph::new(Span::styled(
            format!("{section}  {}/{}", form.position() + 1, form.questions().len()),
            dim_bold(),
        ))
        .alignment(Alignment::Center),
        chunks[0],
    );

    f.render_widget(
        Paragraph::new(Span::styled(question.prompt, bold()))
            .alignment(alignment_for(question.prompt, area))
            .wrap(Wrap { trim: true }),
        chunks[2],
    );

    let previous = form.answer(form.position());
    let selected = |n: usize| matches!(previous, Some(Answer::Number(v)) if *v as usize == n);
    let option_line = |n: usize, label: &str| {
        let style = if selected(n) {
            bold().fg(Color::Green)
        } else {
            Style::default()
        };
        Line::from(Span::styled(format!("({n}) {label}"), style))
    };

    let (lines, legend): (Vec<Line>, &str) = match &question.kind {
        QuestionKind::Choice(options) => (
            options
                .iter()
                .enumerate()
                .map(|(i, &(_, label))| option_line(i + 1, label))
                .collect(),
            "(1-9) answer / (tab) skip / (up) back / (esc)ape",
        ),
        QuestionKind::Likert { points } => (
            (1..=*points as usize)
                .map(|n| option_line(n, LIKERT_LABELS.get(n - 1).copied().unwrap_or("")))
                .collect(),
            "(1-5) answer / (tab) skip / (up) back / (esc)ape",
        ),
        QuestionKind::Slider { max, step } => {
            let value = match form.draft() {
                Answer::Number(v) => *v,
                Answer::Text(_) => 0,
            };
            let filled = (value / step) as usize;
            let total = (max / step) as usize;
            (
                vec![
                    Line::from(vec![
                        Span::styled("low ", dim_bold()),
                        Span::styled("█".repeat(filled), bold().fg(Color::Cyan)),
                        Span::styled("░".repeat(total - filled), dim_bold()),
                        Span::styled(" high", dim_bold()),
                    ]),
                    Line::from(Span::styled(value.to_string(), bold())),
                ],
                "(left/right) adjust / (enter) confirm / (tab) skip / (up) back / (esc)ape",
            )
        }
        QuestionKind::Text => {
            let text = match form.draft() {
                Answer::Text(t) => t.as_str(),
                Answer::Number(_) => "",
            };
            (
                vec![Line::from(vec![
                    Span::styled(text, bold()),
                    Span::styled("▏", dim_bold()),
                ])],
                "(enter) confirm / (tab) skip / (up) back / (esc)ape",
            )
        }
    };

    f.render_widget(
        Paragraph::new(lines)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true }),
        chunks[3],
    );
    render_status(study, f, chunks[4]);
    f.render_widget(Paragraph::new(Span::styled(legend, italic())), chunks[5]);
}

fn render_done(study: &Study, f: &mut Frame, area: Rect) {
    let summary = study.measurement().summary();
    let intervals: Vec<f64> = study
        .measurement()
        .results()
        .iter()
        .flat_map(|r| typing_intervals(&r.inter_char_ms))
        .collect();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([
            Constraint::Min(1),    // padding
            Constraint::Length(1), // title
            Constraint::Length(1), // counts
            Constraint::Length(1), // rates
            Constraint::Length(1), // timing
            Constraint::Length(1), // padding
            Constraint::Length(2), // export
            Constraint::Min(1),    // padding
            Constraint::Length(1), // legend
        ])
        .split(area);

    let centered = |text: String, style: Style| Paragraph::new(Span::styled(text, style)).alignment(Alignment::Center);

    f.render_widget(
        centered(format!("thank you, {}", study.participant_id()), bold().fg(Color::Cyan)),
        chunks[1],
    );
    f.render_widget(
        centered(
            format!(
                "{} sentences   {} completed   {} interrupted",
                summary.total_sentences, summary.completed_sentences, summary.interrupted_sentences
            ),
            bold(),
        ),
        chunks[2],
    );
    f.render_widget(
        centered(
            format!(
                "{:.2} cps   {:.1}% acc   {:.3} cer",
                summary.average_speed, summary.average_accuracy, summary.average_cer
            ),
            bold(),
        ),
        chunks[3],
    );
    f.render_widget(
        centered(
            format!(
                "{:.1}s total   {:.0} ms/char   {:.1} sd",
                summary.total_time,
                summary.average_inter_char_ms,
                std_dev(&intervals).unwrap_or(0.0)
            ),
            dim_bold(),
        ),
        chunks[4],
    );

    let export = match study.exported() {
        Some(paths) => centered(format!("saved to {}", paths.json.display()), italic().fg(Color::Green)),
        None => centered(
            study.status().unwrap_or("nothing was saved").to_string(),
            italic().fg(Color::Red),
        ),
    };
    f.render_widget(export.wrap(Wrap { trim: true }), chunks[6]);

    f.render_widget(Paragraph::new(Span::styled("(enter) / (q) / (esc)ape", italic())), chunks[8]);
}
