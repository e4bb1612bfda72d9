//! Terminal output: per-file spinners and colored summaries.
//!
//! Uses `indicatif` for the spinner and `console` for styling. Logging goes
//! through `tracing`; this module only renders what the user watches.

use std::time::Duration;

use console::Style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::conversation::ConversationOutcome;
use crate::probe::{ModelProbe, RECOMMENDED_MODELS};
use crate::scheduler::RunSummary;

/// Spinner shown while one file is being analyzed.
pub struct FileProgress {
    pb: ProgressBar,
    green: Style,
    red: Style,
}

impl FileProgress {
    pub fn start(path: &str) -> Self {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg} {elapsed:.dim}")
                .expect("invalid template"),
        );
        pb.set_message(format!("Analyzing {path}"));
        pb.enable_steady_tick(Duration::from_millis(100));

        Self {
            pb,
            green: Style::new().green().bold(),
            red: Style::new().red().bold(),
        }
    }

    /// The file could not be read; nothing was sent.
    pub fn unreadable(&self, path: &str, reason: &str) {
        self.pb.finish_and_clear();
        println!("  {} {path}: {reason}", self.red.apply_to("✗"));
    }

    pub fn complete(&self, path: &str, outcome: &ConversationOutcome) {
        self.pb.finish_and_clear();
        match outcome {
            ConversationOutcome::Completed { artifacts } => {
                println!(
                    "  {} {path} ({} files written)",
                    self.green.apply_to("✓"),
                    artifacts.len()
                );
            }
            ConversationOutcome::Failed {
                question, reason, ..
            } => {
                println!(
                    "  {} {path}: question {} failed: {reason}",
                    self.red.apply_to("✗"),
                    question + 1
                );
            }
        }
    }
}

pub fn print_summary(summary: &RunSummary) {
    let bold = Style::new().bold();
    let green = Style::new().green();
    let red = Style::new().red();
    let yellow = Style::new().yellow();

    println!();
    println!("{}", bold.apply_to("─── Run Summary ───"));
    println!("  processed  {}", summary.processed);
    println!("  completed  {}", green.apply_to(summary.completed));
    println!("  failed     {}", red.apply_to(summary.failed));
    println!("  remaining  {}", summary.remaining);
    if summary.interrupted {
        println!(
            "  {}",
            yellow.apply_to("Interrupted: progress saved, run again to resume.")
        );
    }
}

pub fn print_recommended_models() {
    println!("Recommended DeepSeek models for code analysis:");
    for (model, note) in RECOMMENDED_MODELS {
        println!("  {model:<26} ({note})");
    }
    println!();
    println!("Model availability may vary. Use `check-models` to probe them.");
}

pub fn print_probe_results(results: &[ModelProbe]) {
    let green = Style::new().green().bold();
    let red = Style::new().red().bold();

    println!();
    println!("{}", Style::new().bold().apply_to("Model Availability Summary:"));
    for probe in results {
        match &probe.error {
            None => println!("  {} {}: available", green.apply_to("✓"), probe.model),
            Some(reason) => println!("  {} {}: {reason}", red.apply_to("✗"), probe.model),
        }
    }

    match results.iter().find(|p| p.is_available()) {
        Some(first) => {
            println!();
            println!("Recommended model: {}", first.model);
            println!("Use with: --model {}", first.model);
        }
        None => {
            println!();
            println!("No models are available. Please check your API key.");
        }
    }
}

pub fn print_connection(model: &str, result: &Result<String, String>) {
    match result {
        Ok(reply) => {
            println!(
                "{} Connection to the DeepSeek API succeeded ({model})",
                Style::new().green().bold().apply_to("✓")
            );
            println!("API response: {reply}");
        }
        Err(reason) => {
            println!(
                "{} Connection to the DeepSeek API failed ({model}): {reason}",
                Style::new().red().bold().apply_to("✗")
            );
        }
    }
}
