mod ui;

use std::{
    fs::{self, File, OpenOptions},
    io::{self, stdin, Write},
    path::PathBuf,
    time::Duration,
};

use anyhow::{Context, Result};
use clap::{error::ErrorKind, CommandFactory, Parser, Subcommand};
use crossterm::{
    event::{DisableBracketedPaste, EnableBracketedPaste},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use entrylab::{
    analyze,
    app_dirs::AppDirs,
    config::{Config, ConfigStore, FileConfigStore},
    runtime::{Clock, CrosstermEventSource, FixedTicker, Runner, SystemClock},
    sentences::{self, SentenceSet},
    study::{Flow, Study, StudyPlan},
    survey::Questionnaire,
};
use env_logger::{Env, Target};
use log::info;
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};

const TICK_RATE_MS: u64 = 100;

/// terminal harness for text-entry studies
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "Runs a text-entry study: a timed practice block, a measured block of sentences with live matching feedback, and SUS / NASA-TLX questionnaires. Results are exported as JSON with a CSV sidecar."
)]
pub struct Cli {
    #[clap(subcommand)]
    command: Option<Command>,

    /// participant identifier recorded with the export
    #[clap(short = 'p', long)]
    participant: Option<String>,

    /// built-in sentence set to measure
    #[clap(short = 's', long, value_enum)]
    set: Option<SentenceSet>,

    /// built-in sentence set to practice with
    #[clap(long, value_enum)]
    practice_set: Option<SentenceSet>,

    /// measure sentences from a file instead (.json list or one sentence per line)
    #[clap(short = 'f', long)]
    sentences_file: Option<PathBuf>,

    /// countdown before each sentence, in seconds (0 disables it)
    #[clap(long)]
    countdown: Option<u64>,

    /// length of the practice block in seconds (0 skips practice)
    #[clap(long)]
    practice_secs: Option<u64>,

    /// questionnaires shown after the measurement
    #[clap(short = 'q', long, value_enum)]
    questionnaire: Option<Questionnaire>,

    /// shuffle the measured sentences
    #[clap(long)]
    shuffle: bool,

    /// seed for --shuffle, for a reproducible order
    #[clap(long)]
    seed: Option<u64>,

    /// directory for exported records
    #[clap(short = 'o', long)]
    output_dir: Option<PathBuf>,

    /// remember these settings as the defaults
    #[clap(long)]
    save_config: bool,
}

#[derive(Subcommand, Debug, Clone)]
enum Command {
    /// extract per-sentence rows from exported records as CSV
    Analyze {
        #[clap(required = true)]
        files: Vec<PathBuf>,

        /// keep only these 1-based sentence indexes
        #[clap(long = "sentence")]
        sentences: Vec<usize>,

        /// write to a file instead of stdout
        #[clap(long)]
        out: Option<PathBuf>,
    },
    /// list SUS scores of exported records as CSV, oldest first
    SusScores {
        #[clap(required = true)]
        files: Vec<PathBuf>,

        /// write to a file instead of stdout
        #[clap(long)]
        out: Option<PathBuf>,
    },
    /// per-target-sentence CER, speed and input time statistics as CSV
    Stats {
        #[clap(required = true)]
        files: Vec<PathBuf>,

        /// ignore interrupted attempts
        #[clap(long)]
        completed_only: bool,

        /// write to a file instead of stdout
        #[clap(long)]
        out: Option<PathBuf>,
    },
    /// mean, deviation and range of each SUS item and the overall score
    SusDetail {
        #[clap(required = true)]
        files: Vec<PathBuf>,

        /// write to a file instead of stdout
        #[clap(long)]
        out: Option<PathBuf>,
    },
}

impl Cli {
    /// Flags win over the stored configuration.
    fn apply(&self, mut cfg: Config) -> Config {
        if let Some(p) = &self.participant {
            cfg.participant_id = Some(p.clone());
        }
        if let Some(set) = self.set {
            cfg.sentence_set = set;
        }
        if let Some(set) = self.practice_set {
            cfg.practice_set = set;
        }
        if let Some(secs) = self.countdown {
            cfg.countdown_secs = secs;
        }
        if let Some(secs) = self.practice_secs {
            cfg.practice_secs = secs;
        }
        if let Some(q) = self.questionnaire {
            cfg.questionnaire = q;
        }
        if let Some(dir) = &self.output_dir {
            cfg.output_dir = Some(dir.clone());
        }
        cfg.shuffle |= self.shuffle;
        cfg
    }

    fn plan(&self, cfg: &Config) -> Result<StudyPlan> {
        let Some(participant_id) = cfg.participant_id.clone() else {
            Cli::command()
                .error(ErrorKind::MissingRequiredArgument, "a participant id is required (--participant)")
                .exit();
        };

        let mut measurement = match &self.sentences_file {
            Some(path) => sentences::load_file(path)?,
            None => cfg.sentence_set.load()?.sentences,
        };
        if cfg.shuffle {
            measurement = sentences::shuffled(measurement, self.seed);
        }
        let practice = (cfg.practice_secs > 0)
            .then(|| cfg.practice_set.load().map(|list| list.sentences))
            .transpose()?;

        Ok(StudyPlan {
            participant_id,
            practice,
            practice_secs: cfg.practice_secs,
            measurement,
            countdown_secs: cfg.countdown_secs,
            questionnaire: cfg.questionnaire,
            output_dir: cfg.output_dir.clone().unwrap_or_else(AppDirs::export_dir),
        })
    }
}

/// The TUI owns the terminal, so its log goes to a file; the subcommands
/// log to stderr.
fn init_logging(to_file: bool) -> Result<()> {
    let mut builder = env_logger::Builder::from_env(Env::default().default_filter_or("info"));
    if to_file {
        let path = AppDirs::log_path();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("unable to open log file {}", path.display()))?;
        builder.target(Target::Pipe(Box::new(file)));
    }
    builder.init();
    Ok(())
}

fn output(out: &Option<PathBuf>) -> Result<Box<dyn Write>> {
    Ok(match out {
        Some(path) => Box::new(
            File::create(path).with_context(|| format!("unable to create {}", path.display()))?,
        ),
        None => Box::new(io::stdout().lock()),
    })
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match &cli.command {
        Some(Command::Analyze {
            files,
            sentences,
            out,
        }) => {
            init_logging(false)?;
            analyze::write_sentence_table(output(out)?, files, sentences)?;
            return Ok(());
        }
        Some(Command::SusScores { files, out }) => {
            init_logging(false)?;
            analyze::write_sus_table(output(out)?, files)?;
            return Ok(());
        }
        Some(Command::Stats {
            files,
            completed_only,
            out,
        }) => {
            init_logging(false)?;
            analyze::write_target_stats(output(out)?, files, *completed_only)?;
            return Ok(());
        }
        Some(Command::SusDetail { files, out }) => {
            init_logging(false)?;
            analyze::write_sus_detail(output(out)?, files)?;
            return Ok(());
        }
        None => {}
    }

    init_logging(true)?;
    let store = FileConfigStore::new();
    let cfg = cli.apply(store.load());
    if cli.save_config {
        store.save(&cfg)?;
        info!("saved settings to {}", store.path().display());
    }
    let plan = cli.plan(&cfg)?;

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    let mut study = Study::new(plan, SystemClock.now_ms())?;

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableBracketedPaste)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run(&mut terminal, &mut study);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), DisableBracketedPaste, LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    result?;

    if let Some(paths) = study.exported() {
        println!("{}", paths.json.display());
    }
    Ok(())
}

fn run<B: Backend>(terminal: &mut Terminal<B>, study: &mut Study) -> Result<()> {
    let runner = Runner::new(
        CrosstermEventSource::new(),
        FixedTicker::new(Duration::from_millis(TICK_RATE_MS)),
    );
    let clock = SystemClock;

    loop {
        let now = clock.now_ms();
        terminal.draw(|f| ui::draw(study, now, f))?;

        let (event, at) = runner.step_at(&clock);
        if study.on_event(event, at) == Flow::Quit {
            break;
        }
    }
    Ok(())
}
