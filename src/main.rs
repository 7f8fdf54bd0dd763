use anyhow::{Context, Result};
use axum::{routing::get, Router};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use ditchfork_server::community_store::{CommunityStore, SqliteCommunityStore};
use ditchfork_server::config::{AppConfig, CliConfig, FileConfig};
use ditchfork_server::festivals::FestivalClassifier;
use ditchfork_server::server::{self, metrics, ServerConfig, ServerState, SystemClock};
use ditchfork_server::user::{RoleClaimAdminPolicy, SqliteUserStore, UserManager};
use ditchfork_server::RequestsLoggingLevel;

fn parse_path(s: &str) -> Result<PathBuf> {
    let original_path = PathBuf::from(s);
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
struct CliArgs {
    /// Directory holding community.db and user.db.
    #[clap(long, value_parser = parse_path)]
    pub db_dir: Option<PathBuf>,

    /// Optional TOML file, its values override the command line.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// The port to listen on.
    #[clap(short, long, default_value_t = 3001)]
    pub port: u16,

    /// The port for the metrics server (Prometheus scraping).
    #[clap(long, default_value_t = 9091)]
    pub metrics_port: u16,

    /// The level of logging to perform on each request.
    #[clap(long, default_value = "path")]
    pub logging_level: RequestsLoggingLevel,

    /// Path to the frontend directory to be statically served.
    #[clap(long)]
    pub frontend_dir_path: Option<String>,

    /// Interval in hours between runs of unused auth token pruning.
    #[clap(long, default_value_t = 24)]
    pub prune_interval_hours: u64,

    /// Offset of the community's local time from UTC, in minutes.
    #[clap(long, allow_hyphen_values = true)]
    pub utc_offset_minutes: Option<i32>,
}

impl CliArgs {
    fn to_cli_config(&self) -> CliConfig {
        CliConfig {
            db_dir: self.db_dir.clone(),
            port: self.port,
            metrics_port: self.metrics_port,
            logging_level: self.logging_level.clone(),
            frontend_dir_path: self.frontend_dir_path.clone(),
            prune_interval_hours: self.prune_interval_hours,
            utc_offset_minutes: self.utc_offset_minutes,
        }
    }
}

fn count_items(store: &dyn CommunityStore) -> Result<(usize, usize, usize)> {
    Ok((
        store.list_reviews(None)?.len(),
        store.list_festivals()?.len(),
        store.list_notices()?.len(),
    ))
}

fn refresh_item_metrics(store: &dyn CommunityStore) {
    match count_items(store) {
        Ok((reviews, festivals, notices)) => {
            metrics::set_community_items(reviews, festivals, notices)
        }
        Err(e) => error!("Failed to count community items: {:#}", e),
    }
}

async fn run_metrics_server(port: u16) -> Result<()> {
    let app = Router::new().route("/metrics", get(metrics::metrics_handler));
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port))
        .await
        .with_context(|| format!("Failed to bind metrics port {}", port))?;
    Ok(axum::serve(listener, app).await?)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .context("Failed to initialize logging")?;

    let file_config = match &cli_args.config {
        Some(path) => {
            info!("Loading configuration from {:?}", path);
            Some(FileConfig::load(path)?)
        }
        None => None,
    };
    let config = AppConfig::resolve(&cli_args.to_cli_config(), file_config)?;

    info!(
        "Opening community database at {:?}...",
        config.community_db_path()
    );
    let community_store = Arc::new(SqliteCommunityStore::new(config.community_db_path())?);

    info!("Opening user database at {:?}...", config.user_db_path());
    let user_store = SqliteUserStore::new(config.user_db_path())?;
    let user_manager = UserManager::new(Box::new(user_store));

    info!("Initializing metrics...");
    metrics::init_metrics();
    refresh_item_metrics(community_store.as_ref());

    let state = ServerState::new(
        ServerConfig {
            requests_logging_level: config.logging_level.clone(),
            port: config.port,
            frontend_dir_path: config.frontend_dir_path.clone(),
        },
        community_store.clone(),
        user_manager,
        Arc::new(RoleClaimAdminPolicy::new(config.admin_roles.clone())),
        FestivalClassifier::new(config.utc_offset),
        Arc::new(SystemClock),
    );

    if config.prune_interval_hours > 0 {
        let retention_days = config.auth_token_retention_days;
        let interval_hours = config.prune_interval_hours;
        let pruning_user_manager = state.user_manager.clone();
        let metrics_store = community_store.clone();

        info!(
            "Auth token pruning enabled: retaining {} days, pruning every {} hours",
            retention_days, interval_hours
        );

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_secs(interval_hours * 60 * 60));
            loop {
                ticker.tick().await;

                let pruned = pruning_user_manager
                    .lock()
                    .unwrap()
                    .prune_unused_auth_tokens(retention_days);
                match pruned {
                    Ok(count) => {
                        metrics::record_pruned_tokens(count);
                        if count > 0 {
                            info!("Pruned {} unused auth tokens", count);
                        }
                    }
                    Err(e) => error!("Failed to prune auth tokens: {:#}", e),
                }
                refresh_item_metrics(metrics_store.as_ref());
            }
        });
    }

    let metrics_port = config.metrics_port;
    tokio::spawn(async move {
        if let Err(e) = run_metrics_server(metrics_port).await {
            error!("Metrics server stopped: {:#}", e);
        }
    });

    info!(
        "Local time offset is {}, admin roles are {:?}",
        config.utc_offset, config.admin_roles
    );
    info!("Ready to serve at port {}!", config.port);
    info!("Metrics available at port {}!", metrics_port);
    server::run_server(state).await
}
