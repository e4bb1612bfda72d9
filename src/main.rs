mod analyzer;
mod artifacts;
mod cli;
mod config;
mod conversation;
mod deepseek;
mod error;
mod index;
mod logging;
mod probe;
mod prompts;
mod queue;
mod retry;
mod scanner;
mod scheduler;
#[cfg(test)]
mod test_support;
mod ui;

use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use analyzer::FileAnalyzer;
use cli::{Cli, Command, RunArgs};
use config::AnalyzerConfig;
use deepseek::DeepSeekClient;
use queue::FileStateStore;
use retry::RetryingClient;
use scanner::{EligibilityRules, ScanOptions};
use scheduler::{Scheduler, Shutdown};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = AnalyzerConfig::load(cli.config.as_deref())?;
    match &cli.command {
        Command::Run(args) => args.apply_to(&mut config),
        Command::Index {
            output_dir: Some(output_dir),
            ..
        } => config.output_dir = output_dir.clone(),
        _ => {}
    }
    config.validate()?;
    logging::init(cli.verbose, config.log_file.as_deref())?;

    match cli.command {
        Command::Run(args) => run(&args, &config).await,
        Command::Index { dir, .. } => write_index(&dir, &config),
        Command::ListModels => {
            ui::print_recommended_models();
            Ok(())
        }
        Command::CheckModels { models } => {
            let client = client(&config)?;
            let models = if models.is_empty() {
                probe::DEFAULT_PROBE_MODELS
                    .iter()
                    .map(|m| m.to_string())
                    .collect()
            } else {
                models
            };
            println!("Testing DeepSeek model availability...");
            let results = probe::probe_models(&client, &models).await;
            ui::print_probe_results(&results);
            Ok(())
        }
        Command::TestConnection { model } => {
            let client = client(&config)?;
            let model = model.unwrap_or_else(|| config.model.clone());
            println!("Testing DeepSeek API connectivity...");
            let result = probe::test_connection(&client, &model)
                .await
                .map_err(|err| err.to_string());
            ui::print_connection(&model, &result);
            Ok(())
        }
    }
}

fn client(config: &AnalyzerConfig) -> Result<DeepSeekClient> {
    let api_key = config.require_api_key()?;
    let client =
        DeepSeekClient::with_base_url(api_key.to_string(), &config.api_base_url, config.timeout())
            .context("building HTTP client")?;
    Ok(client)
}

async fn run(args: &RunArgs, config: &AnalyzerConfig) -> Result<()> {
    let client = client(config)?;
    let shutdown = Shutdown::new();
    let listener = shutdown.listen_for_ctrl_c().await;
    let store = FileStateStore::new(&config.state_file);
    if args.reset {
        store
            .reset()
            .with_context(|| format!("removing state file {}", store.path().display()))?;
    }

    let questions = prompts::default_questions();
    let options = ScanOptions {
        rules: EligibilityRules::default(),
        output_dir: config.output_dir.clone(),
        skip_existing: !args.process_all,
        suffixes: questions.suffixes(),
    };
    let mut state = scanner::scan(&args.dir, &options, &store);

    // the scan blocks the runtime; let the listener see a Ctrl-C pressed during it
    tokio::task::yield_now().await;
    if shutdown.is_requested() {
        listener.abort();
        info!(pending = state.pending.len(), "interrupted during scan, nothing processed");
        return Ok(());
    }

    if state.pending.is_empty() {
        info!("no files to process");
    } else {
        info!(
            model = %config.model,
            batch_size = config.batch_size,
            throttle_secs = config.throttle_secs,
            output_dir = %config.output_dir,
            "starting batch processing"
        );
        let retrying = RetryingClient::new(client, &config.model, config.retry_policy())
            .with_fallbacks(config.fallback_models.clone())
            .with_sampling(config.max_tokens, config.temperature);
        let analyzer = FileAnalyzer::new(
            retrying,
            questions.clone(),
            &config.output_dir,
            config.max_code_length,
            config.pacing(),
        );

        let scheduler = Scheduler::new(&analyzer, &store, config.scheduler(), shutdown);
        let summary = scheduler.run(&mut state).await;

        ui::print_summary(&summary);
        if summary.interrupted {
            listener.abort();
            return Ok(());
        }
    }

    listener.abort();

    if args.create_index {
        write_index(&args.dir, config)?;
    }
    Ok(())
}

fn write_index(dir: &Path, config: &AnalyzerConfig) -> Result<()> {
    let path = index::write_index(
        dir,
        &config.output_dir,
        &prompts::default_questions(),
        &EligibilityRules::default(),
    )?;
    println!("Created analysis index: {}", path.display());
    Ok(())
}
