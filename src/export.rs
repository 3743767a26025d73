use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use log::info;
use serde::{Deserialize, Serialize};

use crate::results::{SentenceResult, SessionSummary};
use crate::session::Session;
use crate::survey::{SurveyData, SurveySummary};

/// Everything collected from one participant, as written to disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExperimentRecord {
    pub participant_id: String,
    /// ISO-8601 UTC with millisecond precision.
    pub timestamp: String,
    pub experiment_data: Vec<SentenceResult>,
    pub survey_data: SurveyData,
    pub survey_summary: SurveySummary,
    pub summary: SessionSummary,
}

/// Flat per-sentence row shared by the CSV sidecar and `analyze`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SentenceRow {
    pub participant_id: String,
    pub sentence_index: usize,
    pub original_text: String,
    pub input_text: String,
    pub input_time: f64,
    pub speed: f64,
    pub accuracy: f64,
    pub msd: usize,
    pub cer: f64,
    pub interrupted: bool,
}

impl SentenceRow {
    pub fn new(participant_id: &str, result: &SentenceResult) -> Self {
        Self {
            participant_id: participant_id.to_string(),
            sentence_index: result.sentence_index,
            original_text: result.original_text.clone(),
            input_text: result.input_text.clone(),
            input_time: result.input_time,
            speed: result.speed,
            accuracy: result.accuracy,
            msd: result.msd,
            cer: result.cer,
            interrupted: result.interrupted,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExportPaths {
    pub json: PathBuf,
    pub csv: PathBuf,
}

impl ExperimentRecord {
    pub fn new(
        participant_id: impl Into<String>,
        at: DateTime<Utc>,
        session: &Session,
        survey: SurveyData,
    ) -> Self {
        Self {
            participant_id: participant_id.into(),
            timestamp: at.to_rfc3339_opts(SecondsFormat::Millis, true),
            experiment_data: session.results().to_vec(),
            survey_summary: survey.summary(),
            survey_data: survey,
            summary: session.summary(),
        }
    }

    /// `experiment_data_2025-06-27T05-12-33-123Z`
    pub fn file_stem(&self) -> String {
        format!("experiment_data_{}", self.timestamp.replace([':', '.'], "-"))
    }

    pub fn rows(&self) -> Vec<SentenceRow> {
        self.experiment_data
            .iter()
            .map(|r| SentenceRow::new(&self.participant_id, r))
            .collect()
    }

    /// Write the JSON record and its CSV sidecar into `dir`.
    pub fn write(&self, dir: &Path) -> Result<ExportPaths> {
        fs::create_dir_all(dir).with_context(|| format!("unable to create {}", dir.display()))?;

        let stem = self.file_stem();
        let json = dir.join(format!("{stem}.json"));
        let csv = dir.join(format!("{stem}.csv"));

        let mut file =
            File::create(&json).with_context(|| format!("unable to create {}", json.display()))?;
        serde_json::to_writer_pretty(&mut file, self)?;
        writeln!(file)?;

        let file =
            File::create(&csv).with_context(|| format!("unable to create {}", csv.display()))?;
        write_rows(file, &self.rows())?;

        info!(
            "exported {} sentence results for {} to {}",
            self.experiment_data.len(),
            self.participant_id,
            json.display()
        );
        Ok(ExportPaths { json, csv })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let bytes = fs::read(path).with_context(|| format!("unable to read {}", path.display()))?;
        serde_json::from_slice(&bytes)
            .with_context(|| format!("{} is not an experiment record", path.display()))
    }
}

pub fn write_rows<W: Write>(writer: W, rows: &[SentenceRow]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}
