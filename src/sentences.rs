use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use include_dir::{include_dir, Dir};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

static SENTENCE_DIR: Dir = include_dir!("$CARGO_MANIFEST_DIR/src/sentences");

/// Sentence lists shipped with the binary.
#[derive(
    Debug,
    Copy,
    Clone,
    PartialEq,
    Eq,
    Default,
    Serialize,
    Deserialize,
    clap::ValueEnum,
    strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
pub enum SentenceSet {
    #[default]
    Measurement,
    Practice,
    Warmup,
}

#[derive(Deserialize, Clone, Debug, PartialEq)]
pub struct SentenceList {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub sentences: Vec<String>,
}

impl SentenceSet {
    pub fn load(&self) -> Result<SentenceList> {
        let file_name = format!("{}.json", self.to_string().to_lowercase());
        let file = SENTENCE_DIR
            .get_file(&file_name)
            .with_context(|| format!("sentence set {file_name} is not embedded"))?;
        let contents = file
            .contents_utf8()
            .with_context(|| format!("{file_name} is not valid UTF-8"))?;

        parse_list(contents).with_context(|| format!("unable to read {file_name}"))
    }
}

fn parse_list(contents: &str) -> Result<SentenceList> {
    let list: SentenceList = serde_json::from_str(contents)?;
    if list.sentences.iter().any(|s| s.trim().is_empty()) {
        bail!("sentence list {} contains an empty sentence", list.name);
    }
    Ok(list)
}

/// Read sentences from a `.json` list or a plain text file with one sentence
/// per line (blank lines and `#` comments ignored).
pub fn load_file(path: &Path) -> Result<Vec<String>> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("unable to read {}", path.display()))?;

    let sentences = if path.extension().is_some_and(|ext| ext == "json") {
        parse_list(&contents)
            .with_context(|| format!("invalid sentence list {}", path.display()))?
            .sentences
    } else {
        contents
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(String::from)
            .collect()
    };

    if sentences.is_empty() {
        bail!("{} contains no sentences", path.display());
    }
    Ok(sentences)
}

/// Shuffle for counterbalancing; a seed makes the order reproducible.
pub fn shuffled(mut sentences: Vec<String>, seed: Option<u64>) -> Vec<String> {
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    sentences.shuffle(&mut rng);
    sentences
}
