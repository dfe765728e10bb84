//! Bomi Control - CLI client for the Bomi insurance comparison assistant.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use bomi_common::classify::{classify, classify_ex};
use bomi_common::config::{BomiConfig, DEFAULT_CONFIG_FILE};
use bomi_common::extract;

#[derive(Parser)]
#[command(name = "bomictl")]
#[command(about = "Bomi - Korean insurance comparison assistant", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to the configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the interactive chat
    Chat,

    /// Send a single message and print the answer
    Ask {
        /// The question, e.g. "보험료 저렴한 순서로 top 4"
        text: String,
    },

    /// Show how a message classifies and which slots it yields (debug)
    Classify {
        text: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config_path = cli
        .config
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
    let config = BomiConfig::load(&config_path)?;

    match cli.command {
        Commands::Chat => bomictl::repl::run(config).await,
        Commands::Ask { text } => bomictl::repl::ask(config, &text).await,
        Commands::Classify { text } => {
            let report = serde_json::json!({
                "kind": classify(&text),
                "ex_kind": classify_ex(&text),
                "sex": extract::extract_sex(&text),
                "age_band": extract::extract_age_band(&text),
                "sort_by": extract::extract_sort_by(&text),
                "premium_mode": extract::extract_premium_mode(&text),
                "coverage_query": extract::extract_coverage_query(&text),
                "insurers": extract::extract_insurers(&text),
                "coverage_name": extract::extract_coverage_name(&text),
                "disease_subtypes": extract::extract_disease_subtypes(&text),
                "comparison_intent": extract::is_comparison_intent(&text),
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
    }
}
