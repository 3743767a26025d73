//! Offline extraction over exported experiment records.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Result;
use itertools::Itertools;
use log::{info, warn};
use serde::Serialize;

use crate::export::{write_rows, ExperimentRecord, SentenceRow};
use crate::metrics::char_len;
use crate::survey::SUS_ITEMS;
use crate::util::{mean, sample_std_dev};

/// Load every readable record, logging and skipping the rest.
pub fn load_records(paths: &[PathBuf]) -> Vec<(PathBuf, ExperimentRecord)> {
    paths
        .iter()
        .filter_map(|path| match ExperimentRecord::load(path) {
            Ok(record) => Some((path.clone(), record)),
            Err(e) => {
                warn!("skipping {}: {e:#}", path.display());
                None
            }
        })
        .collect()
}

/// Per-sentence rows, optionally restricted to some 1-based sentence indexes.
pub fn sentence_rows(records: &[(PathBuf, ExperimentRecord)], only: &[usize]) -> Vec<SentenceRow> {
    records
        .iter()
        .flat_map(|(_, record)| record.rows())
        .filter(|row| only.is_empty() || only.contains(&row.sentence_index))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SusRow {
    pub participant_id: String,
    pub timestamp: String,
    pub sus_score: Option<f64>,
    pub filename: String,
}

/// One SUS row per record, ordered by record timestamp.
pub fn sus_rows(records: &[(PathBuf, ExperimentRecord)]) -> Vec<SusRow> {
    records
        .iter()
        .map(|(path, record)| SusRow {
            participant_id: record.participant_id.clone(),
            timestamp: record.timestamp.clone(),
            sus_score: record.survey_summary.sus_score,
            filename: file_name(path),
        })
        .sorted_by(|a, b| a.timestamp.cmp(&b.timestamp))
        .collect()
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Aggregates over every attempt at one target sentence.
///
/// `pooled_cer` sums edit distances over the summed typed length, so long
/// attempts weigh more than in `mean_cer`. Deviations are sample deviations
/// and stay empty below two attempts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TargetStats {
    pub original_text: String,
    pub attempts: usize,
    pub interrupted: usize,
    pub typed_chars: usize,
    pub total_msd: usize,
    pub pooled_cer: f64,
    pub mean_cer: f64,
    pub mean_cps: f64,
    pub mean_input_time: f64,
    pub input_time_std: Option<f64>,
    pub msd_std: Option<f64>,
}

impl TargetStats {
    fn from_rows(original_text: &str, rows: &[&SentenceRow]) -> Self {
        let column = |f: fn(&SentenceRow) -> f64| rows.iter().map(|&r| f(r)).collect::<Vec<f64>>();
        let typed_chars = rows.iter().map(|r| char_len(&r.input_text)).sum::<usize>();
        let total_msd = rows.iter().map(|r| r.msd).sum::<usize>();
        let pooled_cer = if typed_chars == 0 {
            0.0
        } else {
            total_msd as f64 / typed_chars as f64
        };

        Self {
            original_text: original_text.to_string(),
            attempts: rows.len(),
            interrupted: rows.iter().filter(|r| r.interrupted).count(),
            typed_chars,
            total_msd,
            pooled_cer,
            mean_cer: mean(&column(|r| r.cer)).unwrap_or(0.0),
            mean_cps: mean(&column(|r| r.speed)).unwrap_or(0.0),
            mean_input_time: mean(&column(|r| r.input_time)).unwrap_or(0.0),
            input_time_std: sample_std_dev(&column(|r| r.input_time)),
            msd_std: sample_std_dev(&column(|r| r.msd as f64)),
        }
    }
}

/// One stats row per distinct target, in order of first sentence position.
pub fn target_stats(rows: &[SentenceRow], completed_only: bool) -> Vec<TargetStats> {
    rows.iter()
        .filter(|row| !completed_only || !row.interrupted)
        .into_group_map_by(|&row| row.original_text.as_str())
        .into_iter()
        .sorted_by_key(|(text, group)| {
            let first = group.iter().map(|r| r.sentence_index).min().unwrap_or(0);
            (first, *text)
        })
        .map(|(text, group)| TargetStats::from_rows(text, &group))
        .collect()
}

/// Distribution of one SUS item (`q1`..`q10`) or of the overall score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SusItemStats {
    pub item: String,
    pub responses: usize,
    pub mean: Option<f64>,
    pub std: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl SusItemStats {
    fn new(item: impl Into<String>, values: &[f64]) -> Self {
        let (min, max) = values
            .iter()
            .copied()
            .minmax()
            .into_option()
            .map_or((None, None), |(lo, hi)| (Some(lo), Some(hi)));

        Self {
            item: item.into(),
            responses: values.len(),
            mean: mean(values),
            std: sample_std_dev(values),
            min,
            max,
        }
    }
}

/// Per-question rows followed by the overall score; unanswered items are left out.
pub fn sus_item_stats(records: &[(PathBuf, ExperimentRecord)]) -> Vec<SusItemStats> {
    let mut stats = (0..SUS_ITEMS.len())
        .map(|i| {
            let values = records
                .iter()
                .filter_map(|(_, record)| record.survey_data.sus.0[i])
                .map(f64::from)
                .collect_vec();
            SusItemStats::new(format!("q{}", i + 1), &values)
        })
        .collect_vec();

    let scores = records
        .iter()
        .filter_map(|(_, record)| record.survey_summary.sus_score)
        .collect_vec();
    stats.push(SusItemStats::new("sus_score", &scores));
    stats
}

fn write_csv<W: Write, T: Serialize>(writer: W, rows: &[T]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_sentence_table<W: Write>(writer: W, paths: &[PathBuf], only: &[usize]) -> Result<usize> {
    let records = load_records(paths);
    let rows = sentence_rows(&records, only);
    write_rows(writer, &rows)?;
    info!("extracted {} rows from {} records", rows.len(), records.len());
    Ok(rows.len())
}

pub fn write_sus_table<W: Write>(writer: W, paths: &[PathBuf]) -> Result<usize> {
    let records = load_records(paths);
    let rows = sus_rows(&records);
    write_csv(writer, &rows)?;
    Ok(rows.len())
}

pub fn write_target_stats<W: Write>(writer: W, paths: &[PathBuf], completed_only: bool) -> Result<usize> {
    let records = load_records(paths);
    let stats = target_stats(&sentence_rows(&records, &[]), completed_only);
    write_csv(writer, &stats)?;
    info!("summarised {} targets from {} records", stats.len(), records.len());
    Ok(stats.len())
}

pub fn write_sus_detail<W: Write>(writer: W, paths: &[PathBuf]) -> Result<usize> {
    let records = load_records(paths);
    let stats = sus_item_stats(&records);
    write_csv(writer, &stats)?;
    Ok(records.len())
}
