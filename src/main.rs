use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use formflow_backend::{
    config::{get_config, init_config},
    database::pool::create_pool,
    routes,
    storage::PgStore,
    AppState,
};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    init_config()?;
    let config = get_config();

    let pool = create_pool().await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    let store = Arc::new(PgStore::new(pool));
    let app_state = AppState::new(store, config.session_token_length);

    let base_routes = Router::new().route("/health", get(routes::health::health));

    let public_api = Router::new()
        .route(
            "/api/respond/forms/:form_id/start",
            post(routes::public::start_session),
        )
        .route(
            "/api/respond/sessions/:token",
            get(routes::public::resume_session),
        )
        .route(
            "/api/respond/sessions/:token/answer",
            post(routes::public::submit_answer),
        )
        .route(
            "/api/respond/sessions/:token/back",
            post(routes::public::navigate_back),
        )
        .layer(axum::middleware::from_fn_with_state(
            formflow_backend::middleware::rate_limit::new_rps_state(config.public_rps),
            formflow_backend::middleware::rate_limit::rps_middleware,
        ));

    let integration_api = Router::new()
        .route(
            "/api/integration/forms",
            get(routes::integration::list_forms).post(routes::integration::create_form),
        )
        .route(
            "/api/integration/forms/:id",
            get(routes::integration::get_form),
        )
        .route(
            "/api/integration/forms/:id/responses",
            get(routes::integration::list_form_responses),
        )
        .route(
            "/api/integration/responses/:id",
            get(routes::integration::get_response),
        )
        .layer(axum::middleware::from_fn_with_state(
            formflow_backend::middleware::rate_limit::new_rps_state(config.integration_rps),
            formflow_backend::middleware::rate_limit::rps_middleware,
        ));

    let app = base_routes
        .merge(public_api)
        .merge(integration_api)
        .with_state(app_state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(1024 * 1024));

    let addr: SocketAddr = config.server_address.parse()?;
    info!("Server listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
