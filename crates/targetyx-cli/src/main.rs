//! targetyx: Biomedical target annotation aggregator.
//! Entry point for the command-line binary.

mod commands;
mod config;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "targetyx", version, about = "Annotate drug targets from public biomedical databases")]
pub struct Cli {
    /// Config file; defaults to targetyx.toml when present.
    #[arg(long, global = true, env = "TARGETYX_CONFIG")]
    pub config: Option<PathBuf>,

    /// Skip the persistent response cache.
    #[arg(long, global = true)]
    pub no_cache: bool,

    #[arg(long, global = true)]
    pub max_tries: Option<u32>,

    #[arg(long, global = true)]
    pub seconds_to_wait: Option<f64>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Fetch every source for each target and write target_annotation.json.
    Annotate {
        /// Ensembl gene ids (ENSG + 11 digits).
        #[arg(num_args = 0..)]
        targets: Vec<String>,
        /// Disease id such as EFO_0001378.
        #[arg(long)]
        disease: Option<String>,
        #[arg(long)]
        results_path: Option<PathBuf>,
        /// Also write the summary tables next to the annotation file.
        #[arg(long)]
        tables: bool,
        #[arg(long)]
        no_progress: bool,
    },
    /// Build the summary, key and expression tables from an annotation file.
    Table {
        /// Defaults to <results_path>/target_annotation.json.
        #[arg(long)]
        annotation: Option<PathBuf>,
        #[arg(long)]
        output_path: Option<PathBuf>,
        #[arg(long)]
        top_expression_count: Option<usize>,
    },
    /// List the ontology prefixes known to EBI OLS.
    Ontologies {
        #[arg(long)]
        timeout_secs: Option<f64>,
    },
    /// Interaction partners of one gene from STRING-DB.
    Interactions {
        gene: String,
        #[command(flatten)]
        network: NetworkArgs,
    },
    /// Interaction network among several genes from STRING-DB.
    Network {
        #[arg(required = true)]
        genes: Vec<String>,
        #[command(flatten)]
        network: NetworkArgs,
    },
    /// PNG rendering of a STRING-DB network.
    NetworkImage {
        #[arg(required = true)]
        genes: Vec<String>,
        #[command(flatten)]
        network: NetworkArgs,
        /// evidence, confidence or actions.
        #[arg(long, default_value = "evidence")]
        flavor: String,
        #[arg(long, short)]
        output: PathBuf,
    },
    /// Ensembl gene id for UniProt accessions.
    Uniprot {
        #[arg(required = true)]
        accessions: Vec<String>,
        #[arg(long, default_value_t = 5.0)]
        timeout_secs: f64,
    },
}

#[derive(Args, Debug, Clone)]
pub struct NetworkArgs {
    /// physical or functional.
    #[arg(long, default_value = "physical")]
    pub network_type: String,
    #[arg(long, default_value_t = 400)]
    pub required_score: u32,
    #[arg(long, default_value_t = 10)]
    pub limit: u32,
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("targetyx=info,warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = commands::resolve_config(&cli)?;
    commands::dispatch(cli.command, &config)
}
