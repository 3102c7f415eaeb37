use anyhow::Context;
use clap::Parser;
use interfaces::SqliteSubscriptionStore;
use rss_merger::config::{Command, Config, ServeArgs};
use rss_merger::server::{create_app, shutdown_signal, AppState};
use rss_merger::Aggregator;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::parse();

    let store = SqliteSubscriptionStore::connect(&config.database_url)
        .await
        .with_context(|| format!("failed to open database {}", config.database_url))?;
    store.setup_schema().await.context("failed to set up schema")?;

    match config.command {
        Command::Serve(args) => serve(store, args).await,
        Command::AddUser { nickname, email } => {
            let (user_id, token) = store.create_user(&nickname, &email).await?;
            println!("user id: {}", user_id);
            println!("feed link: /rss?token={}", token);
            Ok(())
        }
        Command::AddFeed { user_id, name, url, keywords } => {
            let source_id = store.add_source(user_id, &name, &url, &keywords).await?;
            println!("feed id: {}", source_id);
            Ok(())
        }
    }
}

async fn serve(store: SqliteSubscriptionStore, args: ServeArgs) -> anyhow::Result<()> {
    info!("Starting RSS merger");

    let aggregator = Aggregator::new(args.aggregator_config()).context("failed to build HTTP client")?;
    let state = AppState::new(Arc::new(store), Arc::new(aggregator), args.feed_title.clone());
    let app = create_app(state);

    let listener = tokio::net::TcpListener::bind(args.bind)
        .await
        .with_context(|| format!("failed to bind {}", args.bind))?;
    info!("Server listening on {}", args.bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("RSS merger stopped");
    Ok(())
}
