use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use jira_lookup_api::ApiClient;
use jira_lookup_bulk::BulkExecutor;
use jira_lookup_config::{Config, Settings};
use jira_lookup_output::{OutputFormat, OutputRenderer};
use jira_lookup_server::{IssueFetcher, IssueHandler, Server, StringOrList};
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "jira-lookup", version, about = "Batch issue lookup against a Jira-style REST API", long_about = None)]
struct Cli {
    /// Path to config file (defaults to ~/.jira-lookup/config.yaml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(long)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone)]
enum Command {
    /// Serve GET /jira/search over HTTP
    Serve {
        /// Address to listen on (overrides server.bind)
        #[arg(long)]
        bind: Option<SocketAddr>,
    },
    /// Look up issues once and print the result
    Fetch {
        /// Issue keys, separated by spaces or commas
        keys: Vec<String>,

        /// Output format for the result
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        output: OutputFormat,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.debug)?;

    let settings = load_settings(cli.config.as_deref())?;
    let handler = build_handler(&settings)?;

    match cli.command {
        Command::Serve { bind } => serve(handler, bind.unwrap_or(settings.bind)).await,
        Command::Fetch { keys, output } => {
            let batch = handler.handle(StringOrList::List(keys)).await;
            OutputRenderer::new(output).render(&batch)
        }
    }
}

fn init_tracing(debug: bool) -> Result<()> {
    let default = if debug {
        "info,jira_lookup=debug,jira_lookup_server=debug,jira_lookup_api=debug,jira_lookup_bulk=debug"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| anyhow!("failed to initialize logger: {err}"))
}

fn load_settings(path: Option<&Path>) -> Result<Settings> {
    let mut config = Config::load(path)?;
    config
        .apply_process_env()
        .context("Invalid environment configuration")?;
    let settings = config.resolve().context("Invalid configuration")?;

    info!(
        base_url = %settings.upstream.base_url,
        username = settings.upstream.credentials.username(),
        timeout_ms = settings.upstream.timeout.as_millis() as u64,
        concurrency = settings.concurrency,
        "Configuration loaded"
    );

    Ok(settings)
}

fn build_handler(settings: &Settings) -> Result<IssueHandler> {
    let upstream = &settings.upstream;
    let client = ApiClient::new(
        upstream.base_url.clone(),
        upstream.credentials.clone(),
        upstream.timeout,
    )
    .context("Unable to build upstream HTTP client")?;

    let fetcher = IssueFetcher::new(Arc::new(client), BulkExecutor::new(settings.concurrency));
    Ok(IssueHandler::new(fetcher))
}

async fn serve(handler: IssueHandler, addr: SocketAddr) -> Result<()> {
    let server = Server::bind(addr, handler)
        .await
        .with_context(|| format!("Unable to bind {addr}"))?;

    server.serve(shutdown_signal()).await.context("Server failed")
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Unable to listen for Ctrl-C, running until killed");
        std::future::pending::<()>().await;
    }
}
