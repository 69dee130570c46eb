use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use registro::identity::HttpIdentityResolver;
use registro::registry::SubmissionRegistry;
use registro::storage::FsDocumentStore;
use registro::store::{create_pool, run_migrations, PgStore};
use registro::{config, routes, state};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "registro=info,tower_http=info".into()),
        )
        .init();

    let config = config::Config::from_env()?;

    let pool = create_pool(&config.database_url).await?;
    run_migrations(pool.as_ref()).await?;

    let documents = FsDocumentStore::new(config.upload_folder.clone())?;
    let identity = HttpIdentityResolver::new(&config.identity_url, config.dependency_timeout)?;

    let state = Arc::new(state::AppState {
        registry: SubmissionRegistry::new(Arc::new(PgStore::new(pool))),
        documents: Arc::new(documents),
        identity: Arc::new(identity),
    });

    let app = Router::new()
        .route("/api/me", get(routes::me))
        .route(
            "/api/submissions",
            post(routes::create_submission).get(routes::list_own),
        )
        .route("/api/submissions/all", get(routes::list_all))
        .route(
            "/api/submissions/:id",
            get(routes::get_submission).delete(routes::delete_submission),
        )
        .route("/api/submissions/:id/reviews", post(routes::add_review))
        .route("/api/submissions/:id/document", get(routes::download_document))
        .route("/api/submissions/:id/record", get(routes::download_record))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let addr = format!("{}:{}", config.host, config.port);
    tracing::info!("Registro listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
