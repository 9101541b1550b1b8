use anyhow::{Context, Result};
use clap::Parser;
use crashline_server::{Api, Server, ServerConfig};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tracing::{info, Level};

fn init_tracing(level: Level) {
    tracing_subscriber::fmt().with_max_level(level).init();
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Host interface to bind (default: localhost).
    #[arg(long, default_value = "127.0.0.1")]
    host: IpAddr,

    #[arg(short, long, default_value_t = 8080)]
    port: u16,

    /// Maximum log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: Level,

    /// Seed for the crash point generator (entropy when omitted).
    #[arg(long)]
    deterministic_seed: Option<u64>,

    /// Active rounds older than this are reclaimed by the next round start.
    #[arg(long)]
    stale_round_ms: Option<u64>,

    /// Round starts accepted per user per rate window.
    #[arg(long)]
    rate_limit_max_starts: Option<u32>,

    /// Length of the per-user round start window.
    #[arg(long)]
    rate_limit_window_ms: Option<u64>,

    /// Minimum gap between two round starts of one user (0 disables).
    #[arg(long)]
    start_cooldown_ms: Option<u64>,

    /// Rounds older than this are removed by the reconciler.
    #[arg(long)]
    round_retention_ms: Option<u64>,

    /// Interval between reconciler sweeps.
    #[arg(long)]
    reconcile_interval_ms: Option<u64>,

    /// Per-IP HTTP requests per second (0 disables the limiter).
    #[arg(long)]
    http_rate_limit_per_second: Option<u64>,

    /// Per-IP HTTP burst size (0 disables the limiter).
    #[arg(long)]
    http_rate_limit_burst: Option<u32>,

    /// Maximum request body size in bytes (0 disables limit).
    #[arg(long)]
    http_body_limit_bytes: Option<usize>,

    /// Comma-separated browser origins allowed to call the API (`*` for any).
    #[arg(long)]
    allowed_origins: Option<String>,

    /// Reject requests that carry no Origin header.
    #[arg(long, default_value_t = false)]
    require_origin: bool,
}

/// Maps an optional arg value where 0 disables: 0 => None, Some(v) => Some(v), None => default
fn map_optional_limit<T: Copy + PartialEq + From<u8>>(
    arg: Option<T>,
    default: Option<T>,
) -> Option<T> {
    match arg {
        Some(v) if v == T::from(0) => None,
        Some(v) => Some(v),
        None => default,
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .collect()
}

fn parse_env<T: std::str::FromStr>(var: &str) -> Option<T> {
    std::env::var(var).ok().and_then(|v| v.trim().parse().ok())
}

fn build_config(args: &Args) -> Result<ServerConfig> {
    let defaults = ServerConfig::default();
    let mut engine = defaults.engine;
    if let Some(value) = args.stale_round_ms {
        engine.stale_round_ms = value;
    }
    if let Some(value) = args.rate_limit_max_starts {
        engine.rate_limit_max_starts = value;
    }
    if let Some(value) = args.rate_limit_window_ms {
        engine.rate_limit_window_ms = value;
    }
    if let Some(value) = args.start_cooldown_ms {
        engine.start_cooldown_ms = value;
    }
    if let Some(value) = args.round_retention_ms {
        engine.round_retention_ms = value;
    }
    if let Some(value) = args.reconcile_interval_ms {
        engine.reconcile_interval_ms = value;
    }

    // Environment variables override flags
    let allowed_origins = std::env::var("ALLOWED_HTTP_ORIGINS")
        .ok()
        .or_else(|| args.allowed_origins.clone())
        .map(|raw| parse_origins(&raw))
        .unwrap_or(defaults.allowed_origins);
    let http_rate_limit_per_second = parse_env("RATE_LIMIT_HTTP_PER_SEC")
        .or(args.http_rate_limit_per_second);
    let http_rate_limit_burst =
        parse_env("RATE_LIMIT_HTTP_BURST").or(args.http_rate_limit_burst);

    let config = ServerConfig {
        engine,
        deterministic_seed: args.deterministic_seed,
        http_rate_limit_per_second: map_optional_limit(
            http_rate_limit_per_second,
            defaults.http_rate_limit_per_second,
        ),
        http_rate_limit_burst: map_optional_limit(
            http_rate_limit_burst,
            defaults.http_rate_limit_burst,
        ),
        http_body_limit_bytes: map_optional_limit(
            args.http_body_limit_bytes,
            defaults.http_body_limit_bytes,
        ),
        allowed_origins,
        allow_no_origin: !args.require_origin,
    };
    if let Err(reason) = config.validate() {
        anyhow::bail!("invalid configuration: {reason}");
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse args
    let args = Args::parse();

    // Create logger
    init_tracing(args.log_level);

    let config = build_config(&args)?;
    info!(
        seeded = config.deterministic_seed.is_some(),
        stale_round_ms = config.engine.stale_round_ms,
        reconcile_interval_ms = config.engine.reconcile_interval_ms,
        "crashline configuration loaded"
    );

    let server = Arc::new(Server::new(config));
    let reconciler = server.spawn_reconciler();
    let app = Api::new(server).router();

    // Start server
    let addr = SocketAddr::new(args.host, args.port);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Listening on {}", addr);
    let served = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .context("axum server error");
    reconciler.abort();
    served
}
