use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use streak_core::{ColorToken, ElementId};
use streak_experiment::{
    BlockSummary, Driver, ExperimentConfig, InputSource, JsonLinesRecorder, ParticipantModel,
    RenderError, Renderer, SimulatedParticipant, run_experiment,
};
use streak_timing::{Clock, HighPrecisionTimer, VirtualClock};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    name = "streak",
    version,
    about = "Runs the streak race game against a simulated participant",
    long_about = "Runs every block of an experiment configuration with a simulated \
                  participant and writes one JSON line per trial.\n\n\
                  Without --config the built-in two-round game is used. \
                  Without --realtime the session runs on a virtual clock and \
                  finishes immediately."
)]
struct Args {
    /// Experiment configuration (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Seed for trial order, partner latencies and the simulated participant
    #[arg(short, long)]
    seed: Option<u64>,

    /// Run on the wall clock instead of the virtual one
    #[arg(long)]
    realtime: bool,

    /// Trial records go here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Chance of pressing during the inter-trial delay
    #[arg(long, default_value_t = 0.0)]
    anticipation: f64,

    /// Chance of ignoring a stimulus
    #[arg(long, default_value_t = 0.0)]
    lapse: f64,
}

pub struct App {
    args: Args,
    config: ExperimentConfig,
}

impl App {
    pub fn new() -> Result<Self> {
        let args = Args::parse();
        init_tracing();

        let mut config = match &args.config {
            Some(path) => ExperimentConfig::from_path(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => ExperimentConfig::default(),
        };
        if args.seed.is_some() {
            config.seed = args.seed;
        }
        anyhow::ensure!(
            (0.0..=1.0).contains(&args.anticipation) && (0.0..=1.0).contains(&args.lapse),
            "--anticipation and --lapse must lie in 0..=1"
        );

        Ok(Self { args, config })
    }

    pub fn run(self) -> Result<()> {
        let model = ParticipantModel {
            anticipation: self.args.anticipation,
            lapse: self.args.lapse,
            ..ParticipantModel::default()
        };
        let participant_seed = self.config.seed.map(|seed| seed.wrapping_add(1));
        let participant = SimulatedParticipant::new(model, participant_seed);

        let out: Box<dyn Write> = match &self.args.output {
            Some(path) => Box::new(BufWriter::new(
                File::create(path).with_context(|| format!("creating {}", path.display()))?,
            )),
            None => Box::new(BufWriter::new(io::stdout().lock())),
        };
        let mut recorder = JsonLinesRecorder::new(out);

        tracing::info!(
            blocks = self.config.blocks.len(),
            trials = self.config.trial_count(),
            seed = ?self.config.seed,
            realtime = self.args.realtime,
            "session starting"
        );

        let summaries = if self.args.realtime {
            let mut driver = Driver::new(HighPrecisionTimer::new(), participant);
            let summaries = self.session(&mut driver, &mut recorder)?;
            let lag = driver.lag().summary();
            tracing::info!(
                samples = lag.samples,
                mean_ms = lag.mean_ms,
                jitter_ms = lag.jitter_ms,
                max_ms = lag.max_ms,
                "timer lateness"
            );
            summaries
        } else {
            let mut driver = Driver::new(VirtualClock::new(), participant);
            self.session(&mut driver, &mut recorder)?
        };

        recorder
            .into_inner()
            .flush()
            .context("flushing trial records")?;
        for summary in &summaries {
            report(summary);
        }
        Ok(())
    }

    fn session<C, I>(
        &self,
        driver: &mut Driver<C, I>,
        recorder: &mut JsonLinesRecorder<Box<dyn Write>>,
    ) -> Result<Vec<BlockSummary>>
    where
        C: Clock,
        I: InputSource,
    {
        let mut renderer = LogRenderer;
        run_experiment(&self.config, driver, &mut renderer, recorder).context("session aborted")
    }
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().with_writer(io::stderr))
        .init();
}

fn report(summary: &BlockSummary) {
    let o = &summary.outcomes;
    tracing::info!(
        block = %summary.name,
        completed = summary.completed,
        abandoned = summary.abandoned,
        early = summary.early_responses,
        ww = o.ww,
        wl = o.wl,
        lw = o.lw,
        ll = o.ll,
        participant = summary.totals.participant,
        partner = summary.totals.partner,
        "summary"
    );
}

/// Traces every display change instead of drawing it.
struct LogRenderer;

impl Renderer for LogRenderer {
    fn show(&mut self, element: ElementId, html: &str) -> Result<(), RenderError> {
        tracing::debug!(%element, html, "show");
        Ok(())
    }

    fn set_background(&mut self, element: ElementId, color: ColorToken) -> Result<(), RenderError> {
        tracing::debug!(%element, ?color, "background");
        Ok(())
    }
}
