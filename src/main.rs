use clap::Parser;
use std::path::PathBuf;

use forage::api;
use forage::catalog::QueryCatalog;
use forage::config::CONFIG;
use forage::state::AppState;

#[derive(Parser)]
#[command(about = "AI-assisted ingredient search and report service")]
struct Args {
    /// Bind address, overriding BIND_ADDR
    #[arg(long)]
    bind: Option<String>,
    /// Catalog file, overriding PREDEFINED_QUERIES_FILE
    #[arg(long)]
    catalog: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_target(true)
        .init();

    let args = Args::parse();
    let mut config = CONFIG.clone();
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }
    if let Some(catalog) = args.catalog {
        config.predefined_queries_file = catalog;
    }

    let catalog = QueryCatalog::load(&config.predefined_queries_file)?;
    tracing::info!(
        "loaded {} predefined queries from {}",
        catalog.len(),
        config.predefined_queries_file.display()
    );

    let bind_addr = config.bind_addr.clone();
    let state = AppState::new(config, catalog)?;
    let app = api::create_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("Server listening on {}", bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}
