use std::path::PathBuf;

use anyhow::Context;
use axum::http::{HeaderValue, Method};
use clap::Parser;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing_subscriber::EnvFilter;

use cortex_domain::config::{Config, CorsConfig};
use cortex_gateway::api;
use cortex_gateway::state::AppState;

#[derive(Parser, Debug)]
#[command(name = "cortex-gateway", version, about = "Conversational assistant backend")]
struct Cli {
    /// Path to a TOML config file. Missing fields fall back to defaults.
    #[arg(short, long, default_value = "cortex.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = load_config(&cli.config)?;

    tracing::info!("cortex-gateway starting");

    let db = cortex_store::connect(&config.database.url, config.database.max_connections)
        .await
        .context("connecting to the conversation store")?;

    let state = AppState::new(db, config.clone());

    let cors_layer = build_cors_layer(&config.server.cors);
    let app = api::router(state.clone()).layer(cors_layer).with_state(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding to {addr}"))?;

    tracing::info!(addr = %addr, "cortex-gateway listening");

    axum::serve(listener, app).await.context("axum server error")?;

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,cortex_gateway=debug")))
        .json()
        .init();
}

fn load_config(path: &PathBuf) -> anyhow::Result<Config> {
    if !path.exists() {
        tracing::warn!(path = %path.display(), "config file not found, using defaults");
        return Ok(Config::default());
    }
    let raw = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    toml::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
}

/// One configured origin, resolved into a matching rule. A trailing `:*`
/// wildcards the port segment (e.g. `http://localhost:*` matches any numeric
/// port on that host); anything else must match byte-for-byte.
enum OriginRule {
    Exact(HeaderValue),
    WildcardPort(String),
}

fn parse_origin_rules(allowed: &[String]) -> Vec<OriginRule> {
    allowed
        .iter()
        .filter_map(|origin| {
            if origin.ends_with(":*") {
                let host_prefix = &origin[..origin.len() - 1];
                return Some(OriginRule::WildcardPort(host_prefix.to_owned()));
            }
            match origin.parse::<HeaderValue>() {
                Ok(hv) => Some(OriginRule::Exact(hv)),
                Err(_) => {
                    tracing::warn!(origin = %origin, "invalid CORS origin, skipping");
                    None
                }
            }
        })
        .collect()
}

/// A wildcard-port rule only matches when everything after the host prefix
/// is non-empty and numeric — otherwise `http://localhost:3000.evil.com`
/// would slip past a naive `starts_with` check.
fn origin_matches(origin_str: &str, rules: &[OriginRule]) -> bool {
    rules.iter().any(|rule| match rule {
        OriginRule::Exact(hv) => hv.as_bytes() == origin_str.as_bytes(),
        OriginRule::WildcardPort(prefix) => origin_str
            .strip_prefix(prefix.as_str())
            .is_some_and(|port| !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit())),
    })
}

/// A config of just `["*"]` turns on fully permissive CORS — credentials are
/// disabled in that mode since the two are mutually exclusive per the CORS
/// spec. Anything else is resolved into [`OriginRule`]s and matched with
/// credentials enabled.
fn build_cors_layer(cors: &CorsConfig) -> CorsLayer {
    use axum::http::header;

    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    if cors.allowed_origins.iter().map(String::as_str).eq(["*"]) {
        tracing::warn!("CORS configured with wildcard \"*\" — all origins allowed, no credentials");
        return base.allow_origin(tower_http::cors::Any);
    }

    let rules = parse_origin_rules(&cors.allowed_origins);
    let allow_origin = AllowOrigin::predicate(move |origin, _| {
        origin_matches(origin.to_str().unwrap_or_default(), &rules)
    });

    base.allow_origin(allow_origin).allow_credentials(true)
}
