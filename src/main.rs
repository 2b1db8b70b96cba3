use std::{
    error::Error,
    net::SocketAddr,
    path::{Path, PathBuf},
};

use clap::{Parser, Subcommand};
use sqlx::{postgres::PgPoolOptions, Pool, Postgres};
use tracing_subscriber::{fmt, EnvFilter};

use cookbook_sdk::{
    actions::replace_catalog, api, config::Config, serializers::IngredientPayload,
    state::AppState,
};

#[derive(Parser)]
#[command(name = "cookbook", version, about = "Recipe sharing backend")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run migrations and serve the HTTP API.
    Serve,
    /// Replace the ingredient catalog with the records of a JSON file.
    LoadIngredients {
        /// JSON array of `{"name", "measurement_unit"}` objects.
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = Config::load()?;
    let pool = connect(&config).await?;

    match cli.command {
        Command::Serve => serve(pool, &config).await,
        Command::LoadIngredients { path } => load_ingredients(&path, &pool).await,
    }
}

async fn connect(config: &Config) -> Result<Pool<Postgres>, Box<dyn Error>> {
    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .connect(&config.database_url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;
    log::info!("Database ready");
    Ok(pool)
}

async fn serve(pool: Pool<Postgres>, config: &Config) -> Result<(), Box<dyn Error>> {
    let state = AppState::new(pool, config)?;
    tokio::fs::create_dir_all(state.media.root()).await?;

    let address: SocketAddr = config.address().parse()?;
    let (address, server) = warp::serve(api::routes(state))
        .try_bind_with_graceful_shutdown(address, shutdown_signal())?;

    log::info!("Server running on {address}");
    server.await;
    log::info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for shutdown signal: {e}");
    }
}

async fn load_ingredients(path: &Path, pool: &Pool<Postgres>) -> Result<(), Box<dyn Error>> {
    let contents = tokio::fs::read_to_string(path).await?;
    let records: Vec<IngredientPayload> = serde_json::from_str(&contents)?;
    log::info!("Read {} ingredients from {}", records.len(), path.display());

    let inserted = replace_catalog(records, pool).await?;
    log::info!("Loaded {inserted} ingredients");
    Ok(())
}
