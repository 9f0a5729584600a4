use prism_api::config::AppConfig;
use prism_api::state::AppState;
use prism_api::{database, routes};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    init_tracing();

    let config = AppConfig::from_env();
    if let Err(message) = config.validate() {
        anyhow::bail!("invalid configuration: {message}");
    }
    tracing::info!("starting Prism API in {:?} mode", config.environment);

    let pool = database::connect(&config.database).await?;
    database::run_migrations(&pool).await?;

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState::new(config, pool)?;
    let app = routes::app(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("listening on http://{}", bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("prism_api=info,audit=info,tower_http=warn"));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}
