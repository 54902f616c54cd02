//! CLI binary for doc2anki.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `GenerationConfig`, renders run stages as a spinner, and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use doc2anki::{
    DeliveryController, Doc2AnkiError, GenerationConfig, PromptVariant, RunStage, StatusCallback,
    DEFAULT_ANKI_URL,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}

// ── Spinner-backed status callback ───────────────────────────────────────────

/// Terminal status callback: one spinner whose message tracks the run stage,
/// plus per-batch progress lines while images are being described.
struct CliStatusCallback {
    spinner: ProgressBar,
}

impl CliStatusCallback {
    fn new() -> Arc<Self> {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
        );
        spinner.enable_steady_tick(Duration::from_millis(80));
        spinner.set_message("starting…");
        Arc::new(Self { spinner })
    }

    fn finish(&self) {
        self.spinner.finish_and_clear();
    }
}

impl StatusCallback for CliStatusCallback {
    fn on_stage(&self, stage: RunStage) {
        match stage {
            RunStage::Done | RunStage::Error | RunStage::Idle => {}
            other => self.spinner.set_message(other.to_string()),
        }
    }

    fn on_extracted(&self, text_len: usize, image_count: usize) {
        self.spinner.println(format!(
            "  {} extracted {} chars, {} image(s)",
            green("✓"),
            text_len,
            image_count
        ));
    }

    fn on_batch_described(&self, batch_num: usize, batch_total: usize) {
        self.spinner.println(format!(
            "  {} image batch {}/{} described",
            green("✓"),
            batch_num,
            batch_total
        ));
    }

    fn on_notes_submitted(&self, created: usize, submitted: usize) {
        let mark = if created == submitted {
            green("✓")
        } else {
            yellow("!")
        };
        self.spinner.println(format!(
            "  {mark} store accepted {created}/{submitted} note(s)"
        ));
    }
}

// ── CLI definition ───────────────────────────────────────────────────────────

/// Generate Anki flashcards from a Word or PDF document.
#[derive(Parser, Debug)]
#[command(name = "doc2anki", version, about)]
struct Cli {
    /// Path to the input document (.docx, .doc, or .pdf)
    input: String,

    /// Gemini API key
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    api_key: String,

    /// AnkiConnect endpoint
    #[arg(long, default_value = DEFAULT_ANKI_URL)]
    anki_url: String,

    /// Model used for flashcard synthesis
    #[arg(long)]
    text_model: Option<String>,

    /// Model used for image description
    #[arg(long)]
    vision_model: Option<String>,

    /// Use the simple prompt (no provenance tags on questions)
    #[arg(long)]
    simple: bool,

    /// Pause between image-description batches, in milliseconds
    #[arg(long, default_value_t = 4000)]
    batch_pause_ms: u64,

    /// Suppress the spinner and progress lines
    #[arg(short, long)]
    quiet: bool,

    /// Verbose logging (equivalent to RUST_LOG=doc2anki=debug)
    #[arg(short, long)]
    verbose: bool,
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "doc2anki=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn build_config(cli: &Cli, callback: Option<Arc<CliStatusCallback>>) -> Result<GenerationConfig> {
    let mut builder = GenerationConfig::builder(cli.api_key.clone())
        .anki_url(cli.anki_url.clone())
        .batch_pause_ms(cli.batch_pause_ms);
    if let Some(ref model) = cli.text_model {
        builder = builder.text_model(model.clone());
    }
    if let Some(ref model) = cli.vision_model {
        builder = builder.vision_model(model.clone());
    }
    if cli.simple {
        builder = builder.prompt(PromptVariant::Simple);
    }
    if let Some(cb) = callback {
        builder = builder.status_callback(cb);
    }
    builder.build().context("invalid configuration")
}

fn report_error(e: &Doc2AnkiError) {
    eprintln!();
    eprintln!("{} {}", red("✗"), bold(e.category().headline()));
    for line in e.to_string().lines() {
        eprintln!("  {line}");
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let callback = if cli.quiet {
        None
    } else {
        Some(CliStatusCallback::new())
    };
    let config = build_config(&cli, callback.clone())?;
    let controller = DeliveryController::from_config(config)
        .context("failed to construct pipeline clients")?;

    let outcome = controller.run(&cli.input).await;
    if let Some(ref cb) = callback {
        cb.finish();
    }

    match outcome {
        Ok(report) => {
            println!(
                "{} {} {}",
                green("✓"),
                bold(&format!(
                    "{}/{} flashcards added to deck '{}'",
                    report.created, report.submitted, report.deck_name
                )),
                dim(&cli.input),
            );
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            report_error(&e);
            Ok(ExitCode::FAILURE)
        }
    }
}
