use clap::{Parser, Subcommand};
use dotenvy::from_path as dotenv_from_path;
use memory_mesh::{
    Filters, MemoryRecord, MeshClient, MeshConfig, QueryMemoriesRequest, DEFAULT_QUERY_LIMIT,
    ENV_API_KEY, ENV_BASE_URL, ENV_TIMEOUT_MS,
};
use serde_json::json;
use serde_json::Value as JsonValue;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Error)]
enum CliError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("memory mesh error: {0}")]
    Mesh(#[from] memory_mesh::MeshError),
    #[error("config error: {0}")]
    Config(String),
    #[error("invalid input: {0}")]
    Input(String),
}

#[derive(Parser)]
#[command(name = "memory-mesh", version, about = "Command-line client for the Memory Mesh API")]
struct Args {
    /// Service root. Falls back to MEMORY_MESH_BASE_URL, then the built-in default.
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Bearer token. Falls back to MEMORY_MESH_API_KEY.
    #[arg(long, global = true)]
    api_key: Option<String>,

    /// Per-request timeout. Falls back to MEMORY_MESH_TIMEOUT_MS; unset means transport default.
    #[arg(long, global = true)]
    timeout_ms: Option<u64>,

    /// Load variables from this file instead of ./.env
    #[arg(long, global = true)]
    env_file: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Submit memory records and print the ids the server stored.
    ///
    /// Input is a JSON array of objects.
    Add {
        /// File to read, or "-" for stdin
        #[arg(long, default_value = "-")]
        input: String,
    },

    /// Search stored memories and print the hits.
    Query {
        /// Query text
        query: String,

        /// Advisory result limit (server-enforced).
        #[arg(long, default_value_t = DEFAULT_QUERY_LIMIT)]
        limit: u32,

        /// Filters as a JSON object, e.g. '{"type":"note"}'
        #[arg(long)]
        filters: Option<String>,

        /// Single filter KEY=VALUE; VALUE is parsed as JSON when possible. Repeatable.
        #[arg(long = "filter", value_name = "KEY=VALUE")]
        filter: Vec<String>,
    },
}

#[tokio::main]
async fn main() {
    init_tracing();
    if let Err(e) = run().await {
        eprintln!("ERROR: {e}");
        std::process::exit(1);
    }
}

fn init_tracing() {
    // stdout carries JSON results only; logs go to stderr.
    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn run() -> Result<(), CliError> {
    let args = Args::parse();
    load_env(args.env_file.as_deref())?;
    let config = resolve_config(args.api_key, args.base_url, args.timeout_ms)?;
    let client = MeshClient::from_config(config)?;

    match args.cmd {
        Command::Add { input } => {
            let raw = read_input(&input)?;
            let memories = parse_records(&raw)?;
            let stored_ids = client.add_memories(&memories).await?;
            println!("{}", serde_json::to_string(&json!({ "stored_ids": stored_ids }))?);
        }

        Command::Query { query, limit, filters, filter } => {
            let filters = parse_filters(filters.as_deref(), &filter)?;
            let mut req = QueryMemoriesRequest::new(query).with_limit(limit);
            if !filters.is_empty() {
                req = req.with_filters(filters);
            }
            let hits = client.query_memories(&req).await?;
            println!("{}", serde_json::to_string(&json!({ "hits": hits }))?);
        }
    }
    Ok(())
}

/// Explicit --env-file must exist; ./.env is optional. Existing env vars win.
fn load_env(env_file: Option<&Path>) -> Result<(), CliError> {
    if let Some(p) = env_file {
        dotenv_from_path(p)
            .map_err(|e| CliError::Config(format!("cannot load {}: {e}", p.display())))?;
        debug!("loaded env from {}", p.display());
    } else if Path::new(".env").exists() {
        let _ = dotenv_from_path(".env");
        debug!("loaded env from ./.env");
    }
    Ok(())
}

fn env_nonempty(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn resolve_config(
    api_key: Option<String>,
    base_url: Option<String>,
    timeout_ms: Option<u64>,
) -> Result<MeshConfig, CliError> {
    let key = api_key
        .filter(|k| !k.is_empty())
        .or_else(|| env_nonempty(ENV_API_KEY))
        .ok_or_else(|| {
            CliError::Config(format!("missing api key (pass --api-key or set {ENV_API_KEY})"))
        })?;

    let mut config = MeshConfig::new(key);
    if let Some(url) = base_url.or_else(|| env_nonempty(ENV_BASE_URL)) {
        config = config.with_base_url(url);
    }

    let timeout_ms = match timeout_ms {
        Some(ms) => Some(ms),
        None => env_nonempty(ENV_TIMEOUT_MS)
            .map(|raw| {
                raw.trim().parse::<u64>().map_err(|_| {
                    CliError::Config(format!("{ENV_TIMEOUT_MS} must be milliseconds, got {raw:?}"))
                })
            })
            .transpose()?,
    };
    if let Some(ms) = timeout_ms {
        config = config.with_timeout(Duration::from_millis(ms));
    }
    Ok(config)
}

fn read_input(input: &str) -> Result<String, CliError> {
    if input == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        Ok(buf)
    } else {
        Ok(fs::read_to_string(input)?)
    }
}

fn parse_records(raw: &str) -> Result<Vec<MemoryRecord>, CliError> {
    let v: JsonValue = serde_json::from_str(raw)?;
    let items = match v {
        JsonValue::Array(items) => items,
        _ => return Err(CliError::Input("expected a JSON array of memory objects".into())),
    };
    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| match item {
            JsonValue::Object(o) => Ok(o),
            _ => Err(CliError::Input(format!("memory #{i} is not a JSON object"))),
        })
        .collect()
}

/// --filters object first, then each --filter KEY=VALUE on top.
fn parse_filters(filters: Option<&str>, pairs: &[String]) -> Result<Filters, CliError> {
    let mut out = match filters {
        Some(raw) => match serde_json::from_str::<JsonValue>(raw)? {
            JsonValue::Object(o) => o,
            _ => return Err(CliError::Input("--filters must be a JSON object".into())),
        },
        None => Filters::new(),
    };

    for pair in pairs {
        let (k, v) = pair
            .split_once('=')
            .filter(|(k, _)| !k.is_empty())
            .ok_or_else(|| CliError::Input(format!("--filter expects KEY=VALUE, got {pair:?}")))?;
        let value = serde_json::from_str(v).unwrap_or_else(|_| JsonValue::String(v.to_string()));
        out.insert(k.to_string(), value);
    }
    Ok(out)
}
