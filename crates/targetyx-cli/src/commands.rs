//! Subcommand handlers.

use std::path::{Path, PathBuf};
use std::rc::Rc;

use anyhow::Context;
use targetyx_annotate::{ExtractTable, TargetAnnotation, ANNOTATION_FILE_NAME};
use targetyx_sources::{
    CachedSession, NetworkFlavor, NetworkParams, OntologyClient, SandboxTransport, SqliteCache, StringDbClient,
    UniProtClient,
};
use tracing::{info, warn};

use crate::config::{timeout_from_secs, Config};
use crate::{Cli, Command, NetworkArgs};

/// Config file plus global flag overrides.
pub fn resolve_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(max_tries) = cli.max_tries {
        config.retry.max_tries = max_tries;
    }
    if let Some(seconds) = cli.seconds_to_wait {
        config.retry.seconds_to_wait = seconds;
    }
    if cli.no_cache {
        config.cache.enabled = false;
    }
    config.validate()?;
    Ok(config)
}

pub fn build_session(config: &Config) -> anyhow::Result<Rc<CachedSession>> {
    let timeout = config.timeout()?;
    if !config.cache.enabled {
        info!("Response cache disabled");
        return Ok(CachedSession::uncached(timeout)?);
    }
    let path = config.cache_path();
    let cache = SqliteCache::open_with_expiry(&path, config.cache_expiry()?)
        .with_context(|| format!("opening response cache at {}", path.display()))?;
    info!(path = %path.display(), "Using response cache");
    Ok(Rc::new(CachedSession::new(
        Box::new(SandboxTransport::new(timeout)?),
        Box::new(cache),
    )))
}

pub fn dispatch(command: Command, config: &Config) -> anyhow::Result<()> {
    match command {
        Command::Annotate { targets, disease, results_path, tables, no_progress } => {
            let session = build_session(config)?;
            annotate(config, session, targets, disease, results_path, tables, !no_progress)
        }
        Command::Table { annotation, output_path, top_expression_count } => {
            let annotation = annotation
                .unwrap_or_else(|| config.annotation.results_path.join(ANNOTATION_FILE_NAME));
            let output = output_path.unwrap_or_else(|| config.table_output_path());
            let count = top_expression_count.unwrap_or(config.table.top_expression_count);
            table(&annotation, &output, count)
        }
        Command::Ontologies { timeout_secs } => {
            let timeout = timeout_secs
                .map(|secs| timeout_from_secs(secs, "--timeout-secs"))
                .transpose()?;
            let client = OntologyClient::new(build_session(config)?).with_retry(config.retry);
            let sources = client.ontology_sources(timeout)?;
            for source in sources {
                println!("{}", source);
            }
            Ok(())
        }
        Command::Interactions { gene, network } => {
            let client = StringDbClient::new(build_session(config)?).with_retry(config.retry);
            let edges = client.interactions(&gene, &network_params(&network)?)?;
            println!("{}", serde_json::to_string_pretty(&edges)?);
            Ok(())
        }
        Command::Network { genes, network } => {
            let client = StringDbClient::new(build_session(config)?).with_retry(config.retry);
            let edges = client.network(&genes, &network_params(&network)?)?;
            println!("{}", serde_json::to_string_pretty(&edges)?);
            Ok(())
        }
        Command::NetworkImage { genes, network, flavor, output } => {
            let flavor: NetworkFlavor = flavor.parse()?;
            let client = StringDbClient::new(build_session(config)?).with_retry(config.retry);
            let png = client.network_image(&genes, &network_params(&network)?, flavor)?;
            write_file(&output, &png)?;
            info!(path = %output.display(), bytes = png.len(), "Wrote network image");
            Ok(())
        }
        Command::Uniprot { accessions, timeout_secs } => {
            let timeout = Some(timeout_from_secs(timeout_secs, "--timeout-secs")?);
            let client = UniProtClient::new(build_session(config)?);
            for accession in accessions {
                let ensembl = client.ensembl_from_uniprot(&accession, timeout)?;
                println!("{}\t{}", accession, ensembl.unwrap_or_default());
            }
            Ok(())
        }
    }
}

fn network_params(args: &NetworkArgs) -> anyhow::Result<NetworkParams> {
    let params = NetworkParams {
        network_type: args.network_type.parse()?,
        required_score: args.required_score,
        limit: args.limit,
    };
    params.validate()?;
    Ok(params)
}

fn annotate(
    config: &Config,
    session: Rc<CachedSession>,
    targets: Vec<String>,
    disease: Option<String>,
    results_path: Option<PathBuf>,
    tables: bool,
    show_progress: bool,
) -> anyhow::Result<()> {
    let targets = if targets.is_empty() { config.annotation.targets.clone() } else { targets };
    let disease = disease
        .or_else(|| config.annotation.disease_code.clone())
        .context("no disease code given (use --disease or annotation.disease_code)")?;
    let results_path = results_path.unwrap_or_else(|| config.annotation.results_path.clone());

    let mut run = TargetAnnotation::with_session(targets, &disease, &results_path, session, config.retry)?
        .show_progress(show_progress);
    let path = run.export()?;
    println!("{}", path.display());

    if tables {
        let output = config
            .table
            .output_path
            .clone()
            .unwrap_or_else(|| results_path.join("tables"));
        table(&path, &output, config.table.top_expression_count)?;
    }
    Ok(())
}

fn table(annotation: &Path, output: &Path, top_expression_count: usize) -> anyhow::Result<()> {
    let extract = ExtractTable::from_json_file(annotation)?.with_top_expression_count(top_expression_count);
    let summary = extract.export(output)?;
    for warning in &summary.warnings {
        warn!("{}", warning);
    }
    println!("{}", output.display());
    Ok(())
}

fn write_file(path: &Path, bytes: &[u8]) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, bytes).with_context(|| format!("writing {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use pretty_assertions::assert_eq;
    use targetyx_sources::NetworkType;

    fn args(network_type: &str, required_score: u32) -> NetworkArgs {
        NetworkArgs { network_type: network_type.to_string(), required_score, limit: 5 }
    }

    #[test]
    fn test_network_params_parse_and_validate() {
        let params = network_params(&args("functional", 700)).unwrap();
        assert_eq!(params.network_type, NetworkType::Functional);
        assert_eq!(params.required_score, 700);
        assert_eq!(params.limit, 5);

        assert!(network_params(&args("genetic", 400)).is_err());
        assert!(network_params(&args("physical", 1001)).is_err());
    }

    #[test]
    fn test_flags_override_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("targetyx.toml");
        std::fs::write(&path, "[retry]\nmax_tries = 4\nseconds_to_wait = 1.0\n").unwrap();
        let path_arg = path.to_string_lossy().to_string();

        let cli = Cli::try_parse_from([
            "targetyx",
            "--config",
            path_arg.as_str(),
            "--seconds-to-wait",
            "0",
            "--no-cache",
            "ontologies",
        ])
        .unwrap();
        let config = resolve_config(&cli).unwrap();
        assert_eq!(config.retry.max_tries, 4);
        assert_eq!(config.retry.seconds_to_wait, 0.0);
        assert!(!config.cache.enabled);
    }

    #[test]
    fn test_invalid_retry_override_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("targetyx.toml");
        std::fs::write(&path, "").unwrap();
        let path_arg = path.to_string_lossy().to_string();

        let cli = Cli::try_parse_from(["targetyx", "--config", path_arg.as_str(), "--max-tries", "0", "ontologies"])
            .unwrap();
        assert!(resolve_config(&cli).is_err());
    }

    fn offline_config() -> Config {
        let mut config = Config::default();
        config.cache.enabled = false;
        config
    }

    #[test]
    fn test_bad_timeout_flag_is_an_error() {
        let config = offline_config();
        for secs in [-1.0, 0.0, f64::NAN, 1e20] {
            let err = dispatch(Command::Ontologies { timeout_secs: Some(secs) }, &config).unwrap_err();
            assert!(err.to_string().contains("--timeout-secs"), "{}", err);

            let uniprot = Command::Uniprot { accessions: vec!["O14757".to_string()], timeout_secs: secs };
            let err = dispatch(uniprot, &config).unwrap_err();
            assert!(err.to_string().contains("--timeout-secs"), "{}", err);
        }
    }

    #[test]
    fn test_oversized_cache_expiry_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.cache.path = Some(dir.path().join("cache.sqlite"));
        config.cache.expire_after_days = i64::MAX;
        assert!(build_session(&config).is_err());
    }

    #[test]
    fn test_write_file_creates_parent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("images").join("chek1.png");
        write_file(&path, b"\x89PNG").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"\x89PNG");
    }
}
