//! Command-line interface built on clap.
//!
//! Defines [`Cli`] with the [`Command`] subcommands (run, index,
//! list-models, check-models, test-connection) and the global flags
//! (--config, --verbose).

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::AnalyzerConfig;

/// Explains C, C++ and Device Tree sources with the DeepSeek API, one
/// resumable batch at a time.
#[derive(Debug, Parser)]
#[command(name = "code-analyzer", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Configuration file (defaults to ./code-analyzer.toml when present).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging.
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Scan a directory and analyze pending files in batches.
    Run(RunArgs),

    /// Write the markdown index of existing analyses.
    Index {
        /// Directory to index.
        #[arg(long, default_value = ".")]
        dir: PathBuf,

        /// Name of the analysis directories.
        #[arg(long)]
        output_dir: Option<String>,
    },

    /// Print the recommended model names.
    ListModels,

    /// Probe which models answer a tiny request.
    CheckModels {
        /// Models to probe (defaults to the known DeepSeek models).
        models: Vec<String>,
    },

    /// Send one tiny request with the configured model.
    TestConnection {
        /// Model to test instead of the configured one.
        #[arg(long)]
        model: Option<String>,
    },
}

#[derive(Debug, Clone, Default, Args)]
pub struct RunArgs {
    /// Directory to process.
    #[arg(long, default_value = ".")]
    pub dir: PathBuf,

    /// Model to use.
    #[arg(long)]
    pub model: Option<String>,

    /// Files per batch.
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Seconds to wait between files (0 disables).
    #[arg(long)]
    pub throttle: Option<u64>,

    /// Attempts per request, including the first.
    #[arg(long)]
    pub max_attempts: Option<u32>,

    /// Per-request timeout in seconds.
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Characters of code to send before condensing.
    #[arg(long)]
    pub max_code_length: Option<usize>,

    /// Name of the output directory created next to each file.
    #[arg(long)]
    pub output_dir: Option<String>,

    /// Analyze files even when their artifacts already exist.
    #[arg(long, default_value_t = false)]
    pub process_all: bool,

    /// Forget completed and failed files before scanning.
    #[arg(long, default_value_t = false)]
    pub reset: bool,

    /// Write the analysis index after processing.
    #[arg(long, default_value_t = false)]
    pub create_index: bool,
}

impl RunArgs {
    /// Overlay the flags that were given on top of `config`.
    pub fn apply_to(&self, config: &mut AnalyzerConfig) {
        if let Some(model) = &self.model {
            config.model = model.clone();
        }
        if let Some(batch_size) = self.batch_size {
            config.batch_size = batch_size;
        }
        if let Some(throttle) = self.throttle {
            config.throttle_secs = throttle;
        }
        if let Some(max_attempts) = self.max_attempts {
            config.max_attempts = max_attempts;
        }
        if let Some(timeout) = self.timeout {
            config.timeout_secs = timeout;
        }
        if let Some(max_code_length) = self.max_code_length {
            config.max_code_length = max_code_length;
        }
        if let Some(output_dir) = &self.output_dir {
            config.output_dir = output_dir.clone();
        }
    }
}
