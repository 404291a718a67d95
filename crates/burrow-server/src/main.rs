use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use burrow_api::{AppState, AppStateInner};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "burrow=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let db_path = std::env::var("BURROW_DB_PATH").unwrap_or_else(|_| "burrow.db".into());
    let host = std::env::var("BURROW_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("BURROW_PORT")
        .unwrap_or_else(|_| "8080".into())
        .parse()?;

    // The process owns one database handle for its lifetime; every
    // component receives it through the shared state.
    let db = burrow_db::Database::open(&PathBuf::from(&db_path))?;
    let state: AppState = Arc::new(AppStateInner { db });

    // CatchPanicLayer is outermost: a panic anywhere in request handling
    // becomes a generic 500 instead of taking the process down.
    let app = burrow_api::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::new());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Burrow forum listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
