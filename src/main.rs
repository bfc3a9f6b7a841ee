use anyhow::{anyhow, Context, Result};
use clap::Parser;
use std::io::Write;
use std::path::Path;
use tracing_subscriber::EnvFilter;

mod cli;
mod config;
mod evidence;
mod execution;
mod filter;
mod model;
mod oauth;
mod pipeline;
mod report;
mod steps;
mod tags;
mod walker;
mod wire;
mod xray;

use cli::{Command, ConvertArgs, ImportArgs, InfoArgs, ReportArgs, RootArgs};
use config::{resolve_config, ConfigFile, ImportConfig};
use model::ExecutionDocument;
use wire::to_wire;
use xray::{submit_documents, Credentials, XrayClient, XraySettings};

fn main() -> Result<()> {
    let args = RootArgs::parse();
    match args.command {
        Command::Import(args) => cmd_import(args),
        Command::Convert(args) => cmd_convert(args),
    }
}

fn init_logging(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Layer CLI options over the config file.
fn build_import_config(
    report: &ReportArgs,
    info: &InfoArgs,
    file: &ConfigFile,
) -> ImportConfig {
    ImportConfig {
        evidence_mode: report.evidences_selection,
        import_steps: !report.no_steps,
        filters: report.filters(),
        keywords: file.keywords(),
        info: file.info.clone().overlay(&info.to_info()),
    }
}

fn load_documents(
    path: &Path,
    config: &ImportConfig,
) -> Result<Vec<ExecutionDocument>> {
    let documents = pipeline::import_report(path, config)?;
    if documents.is_empty() {
        tracing::warn!(report = %path.display(), "no tests selected; nothing to import");
    }
    Ok(documents)
}

fn cmd_import(args: ImportArgs) -> Result<()> {
    init_logging(args.report.debug);
    let file = resolve_config(args.report.config.as_deref())?;
    let mut config = build_import_config(&args.report, &args.info, &file);
    if config.info.user.is_none() {
        config.info.user = Some(args.username.clone());
    }
    let credentials = select_credentials(&args, &file)?;

    let documents = load_documents(&args.file, &config)?;
    let client = XrayClient::new(&XraySettings {
        base_url: args.url.clone(),
        endpoint: args
            .endpoint
            .clone()
            .unwrap_or_else(|| file.endpoint().to_string()),
        credentials,
        certificate: args.certificate.clone(),
    })?;
    let keys = submit_documents(&client, &documents, &args.components)?;
    let mut stdout = std::io::stdout().lock();
    for key in keys {
        writeln!(stdout, "{key}").context("write execution key")?;
    }
    Ok(())
}

/// A password wins; otherwise the config file's OAuth link signs requests.
fn select_credentials(args: &ImportArgs, file: &ConfigFile) -> Result<Credentials> {
    match (args.password.as_ref(), file.oauth.as_ref()) {
        (Some(password), _) => Ok(Credentials::Basic {
            username: args.username.clone(),
            password: password.clone(),
        }),
        (None, Some(oauth)) => {
            tracing::debug!(consumer_key = %oauth.consumer_key, "using OAuth credentials");
            Ok(Credentials::OAuth(oauth.clone()))
        }
        (None, None) => Err(anyhow!(
            "missing password; pass --password, set {}, or configure oauth",
            cli::PASSWORD_ENV
        )),
    }
}

fn cmd_convert(args: ConvertArgs) -> Result<()> {
    init_logging(args.report.debug);
    let file = resolve_config(args.report.config.as_deref())?;
    let config = build_import_config(&args.report, &args.info, &file);
    let documents = load_documents(&args.file, &config)?;
    let wire: Vec<_> = documents.iter().map(to_wire).collect();
    let mut json = serde_json::to_vec_pretty(&wire).context("serialize executions")?;
    json.push(b'\n');

    match args.out.as_deref() {
        Some(path) => {
            write_atomic(path, &json)?;
            tracing::info!(path = %path.display(), executions = wire.len(), "wrote executions");
        }
        None => std::io::stdout()
            .lock()
            .write_all(&json)
            .context("write executions to stdout")?,
    }
    Ok(())
}

/// Write `bytes` next to `path` and rename into place.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
    let mut staged = tempfile::NamedTempFile::new_in(parent)
        .with_context(|| format!("stage {}", path.display()))?;
    staged
        .write_all(bytes)
        .with_context(|| format!("write {}", path.display()))?;
    staged
        .persist(path)
        .with_context(|| format!("publish {}", path.display()))?;
    Ok(())
}
