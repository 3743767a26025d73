use std::path::{Path, PathBuf};

use assert_cmd::Command;
use chrono::{TimeZone, Utc};
use entrylab::export::ExperimentRecord;
use entrylab::session::{Session, SessionMode};
use entrylab::survey::{SurveyData, SusAnswers};

fn export(dir: &Path, participant: &str, day: u32, sus: u8) -> PathBuf {
    let sentences = vec!["ねこ".to_string(), "いぬ".to_string()];
    let mut session = Session::new(sentences, SessionMode::Measurement, 0).unwrap();

    session.begin(0).unwrap();
    session.on_input("ね", 1_000).unwrap();
    session.on_input("ねこ", 2_000).unwrap();
    session.advance().unwrap();

    session.begin(3_000).unwrap();
    session.on_input("い", 4_000).unwrap();
    session.interrupt(6_000).unwrap();

    let survey = SurveyData {
        sus: SusAnswers([Some(sus); 10]),
        ..SurveyData::default()
    };
    let at = Utc.with_ymd_and_hms(2025, 6, day, 12, 0, 0).unwrap();
    ExperimentRecord::new(participant, at, &session, survey)
        .write(dir)
        .unwrap()
        .json
}

#[test]
fn analyze_writes_filtered_rows() {
    let dir = tempfile::tempdir().unwrap();
    let a = export(dir.path(), "P01", 27, 3);
    let b = export(dir.path(), "P02", 28, 3);

    let output = Command::cargo_bin("entrylab")
        .unwrap()
        .arg("analyze")
        .arg(&a)
        .arg(&b)
        .args(["--sentence", "2"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let text = String::from_utf8(output).unwrap();
    let lines: Vec<&str> = text.lines().collect();

    assert_eq!(
        lines[0],
        "participantId,sentenceIndex,originalText,inputText,inputTime,speed,accuracy,msd,cer,interrupted"
    );
    assert_eq!(lines.len(), 3);
    assert!(lines[1].starts_with("P01,2,いぬ,い,"));
    assert!(lines[1].ends_with(",true"));
    assert!(lines[2].starts_with("P02,2,"));
}

#[test]
fn analyze_skips_unreadable_files() {
    let dir = tempfile::tempdir().unwrap();
    let good = export(dir.path(), "P01", 27, 3);
    let bad = dir.path().join("notes.json");
    std::fs::write(&bad, "[]").unwrap();
    let out = dir.path().join("rows.csv");

    Command::cargo_bin("entrylab")
        .unwrap()
        .arg("analyze")
        .arg(&bad)
        .arg(&good)
        .arg("--out")
        .arg(&out)
        .assert()
        .success();

    let text = std::fs::read_to_string(&out).unwrap();
    assert_eq!(text.lines().count(), 3);
}

#[test]
fn sus_scores_sorted_by_timestamp() {
    let dir = tempfile::tempdir().unwrap();
    let late = export(dir.path(), "late", 28, 5);
    let early = export(dir.path(), "early", 27, 3);

    let output = Command::cargo_bin("entrylab")
        .unwrap()
        .arg("sus-scores")
        .arg(&late)
        .arg(&early)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let text = String::from_utf8(output).unwrap();
    let lines: Vec<&str> = text.lines().collect();

    assert_eq!(lines[0], "participant_id,timestamp,sus_score,filename");
    assert!(lines[1].starts_with("early,2025-06-27T12:00:00.000Z,50.0,"));
    // all fives: odd items 4 each, even items 0 each
    assert!(lines[2].starts_with("late,2025-06-28T12:00:00.000Z,50.0,"));
}

#[test]
fn stats_groups_by_target() {
    let dir = tempfile::tempdir().unwrap();
    let a = export(dir.path(), "P01", 27, 3);
    let b = export(dir.path(), "P02", 28, 3);

    let run = |extra: &[&str]| {
        let output = Command::cargo_bin("entrylab")
            .unwrap()
            .arg("stats")
            .arg(&a)
            .arg(&b)
            .args(extra)
            .assert()
            .success()
            .get_output()
            .stdout
            .clone();
        String::from_utf8(output).unwrap()
    };

    let text = run(&[]);
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("original_text,attempts,interrupted,"));
    assert!(lines[1].starts_with("ねこ,2,0,4,0,0.0,0.0,2.0,1.0,0.0,0.0"));
    assert!(lines[2].starts_with("いぬ,2,2,2,2,1.0,"));

    let text = run(&["--completed-only"]);
    assert_eq!(text.lines().count(), 2);
}

#[test]
fn sus_detail_lists_items_and_score() {
    let dir = tempfile::tempdir().unwrap();
    let a = export(dir.path(), "P01", 27, 3);
    let b = export(dir.path(), "P02", 28, 5);

    let output = Command::cargo_bin("entrylab")
        .unwrap()
        .arg("sus-detail")
        .arg(&a)
        .arg(&b)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let text = String::from_utf8(output).unwrap();
    let lines: Vec<&str> = text.lines().collect();

    assert_eq!(lines[0], "item,responses,mean,std,min,max");
    assert_eq!(lines.len(), 12);
    assert!(lines[1].starts_with("q1,2,4.0,"));
    assert!(lines[1].ends_with(",3.0,5.0"));
    assert_eq!(lines[11], "sus_score,2,50.0,0.0,50.0,50.0");
}

#[test]
fn analyze_requires_files() {
    Command::cargo_bin("entrylab")
        .unwrap()
        .arg("analyze")
        .assert()
        .failure();
}
