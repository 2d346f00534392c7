//! Application entry point: IPA transcription lookup.
//!
//! # Startup sequence
//!
//! 1. Initialise logging.
//! 2. Parse the command line.
//! 3. Load [`AppConfig`] from disk (returns default on first run).
//! 4. Create the [`tokio`] runtime.
//! 5. Build the [`IpaLookupService`] (variety table, HTTP fetcher, disk cache).
//! 6. Run the subcommand and print its result as JSON.

use std::io::Read;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;

use ipa_resolver::{
    batch::{BatchProcessor, DocumentAnnotator},
    config::AppConfig,
    lexicon::IpaLookupService,
};

#[derive(Parser)]
#[command(name = "ipa-resolver", version)]
#[command(about = "Look up IPA transcriptions in pronunciation datasets", long_about = None)]
struct Cli {
    /// Settings file (default: platform config directory)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Transcribe a single word
    Lookup {
        /// 2-letter language code (e.g. "en")
        language: String,
        word: String,
    },
    /// Add IPA to every token of a JSON document
    Annotate {
        /// Language of tokens without their own language field
        #[arg(long)]
        lang: String,

        /// Token field holding the word (overrides settings)
        #[arg(long)]
        token_field: Option<String>,

        /// JSON document (stdin when absent)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
    },
    /// Re-download every dataset of a language
    Refresh {
        language: String,
    },
    /// Delete every persisted dataset
    CleanCache,
    /// List configured language codes and their varieties
    Languages,
}

fn main() -> Result<()> {
    // 1. Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // 2. Command line
    let cli = Cli::parse();

    // 3. Configuration
    let loaded = match &cli.config {
        Some(path) => AppConfig::load_from(path)
            .with_context(|| format!("cannot read settings {}", path.display())),
        None => AppConfig::load(),
    };
    let config = loaded.unwrap_or_else(|e| {
        log::warn!("Failed to load config ({e:#}); using defaults");
        AppConfig::default()
    });

    // 4. Tokio runtime
    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to create tokio runtime")?;

    rt.block_on(run(cli.command, config))
}

async fn run(command: Command, config: AppConfig) -> Result<()> {
    // 5. Service
    let service = IpaLookupService::from_config(&config)?;

    match command {
        Command::Lookup { language, word } => {
            let result = service.lookup(&language, &word).await?;
            print_json(&result)
        }

        Command::Annotate {
            lang,
            token_field,
            file,
        } => {
            let document: serde_json::Value =
                serde_json::from_str(&read_input(file.as_ref())?).context("input is not JSON")?;

            let mut fields = config.batch.clone();
            if let Some(field) = token_field {
                fields.token_text_field = field;
            }
            let annotator = DocumentAnnotator::new(BatchProcessor::new(service), fields);

            let annotated = annotator.annotate(document, &lang).await;
            print_json(&annotated)
        }

        Command::Refresh { language } => {
            let outcomes = service.resolver().refresh(&language).await?;
            let mut failed = 0;
            for outcome in &outcomes {
                match outcome {
                    Ok(v) => println!("{}: {} words", v.descriptor.key(), v.dataset.index().len()),
                    Err(f) => {
                        failed += 1;
                        println!("{}: {}", f.descriptor.key(), f.error);
                    }
                }
            }
            if failed == outcomes.len() {
                anyhow::bail!("no dataset of '{language}' could be refreshed");
            }
            Ok(())
        }

        Command::CleanCache => {
            let report = service.resolver().cache().clear_all().await?;
            println!(
                "Removed {} files, freed {}",
                report.files_removed,
                report.formatted_size()
            );
            Ok(())
        }

        Command::Languages => {
            let table = service.resolver().table();
            for code in table.codes() {
                println!("{code}\t{}", table.labels(code)?.join(", "));
            }
            Ok(())
        }
    }
}

fn read_input(file: Option<&PathBuf>) -> Result<String> {
    match file {
        Some(path) => {
            std::fs::read_to_string(path).with_context(|| format!("cannot read {}", path.display()))
        }
        None => {
            let mut input = String::new();
            std::io::stdin()
                .read_to_string(&mut input)
                .context("cannot read stdin")?;
            Ok(input)
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
