use axum::Router;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::compression::CompressionLayer;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::db::{create_pool, migrations, DbPool};
use crate::handlers;
use crate::state::AppState;

/// Router with every endpoint and the shared middleware stack.
pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(handlers::routes())
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run pending migrations on one pooled connection.
pub fn migrate(db: &DbPool, config: &Config) -> Result<usize, Box<dyn std::error::Error>> {
    let conn = db.get()?;
    Ok(migrations::run_migrations(&conn, &config.migrations_path)?)
}

/// Build the application state and Axum router from a [`Config`].
///
/// Creates the database pool and runs migrations before returning.
pub fn build_app(config: Config) -> Result<(AppState, Router), Box<dyn std::error::Error>> {
    let db = create_pool(&config.database_path)?;
    let applied = migrate(&db, &config)?;
    tracing::debug!(applied, "Database ready");

    let state = AppState::new(db, config);
    let app = router(state.clone());
    Ok((state, app))
}

/// Bind the router to `host:port` and spawn the server as a tokio task.
///
/// Returns the actual port the server bound to (useful when `port` is 0 for
/// OS-assigned ports) and a [`JoinHandle`] for the server task.
pub async fn serve(
    app: Router,
    host: &str,
    port: u16,
) -> Result<(u16, JoinHandle<()>), Box<dyn std::error::Error>> {
    let addr = format!("{host}:{port}");
    let listener = TcpListener::bind(&addr).await?;
    let actual_port = listener.local_addr()?.port();

    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!(error = %e, "Server error");
        }
    });

    Ok((actual_port, handle))
}
