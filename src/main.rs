mod api;
mod assets;
mod blob;
mod compose;
mod layout;
mod normalize;
mod openapi;
mod photos;
mod record;
mod render;
mod state;
mod store;
mod util;

use std::net::SocketAddr;

use axum::{
    routing::{get, post},
    Router,
};
use tracing::info;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use state::AppState;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let host = std::env::var("BACKEND_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port: u16 = std::env::var("BACKEND_PORT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(8080);

    let state = AppState::load().expect("failed to build app state");

    let openapi = openapi::ApiDoc::openapi();

    let app = Router::new()
        // Swagger UI + OpenAPI schema
        .merge(SwaggerUi::new("/docs").url("/openapi.json", openapi))
        // API
        .route("/residents", post(api::create_resident).get(api::list_residents))
        .route(
            "/residents/:id",
            get(api::get_resident).put(api::update_resident),
        )
        .route("/generate-resident-card", post(api::generate_card))
        .route(
            "/drafts/:owner",
            get(api::get_draft)
                .put(api::put_draft)
                .delete(api::delete_draft),
        )
        .route("/health", get(api::health))
        // Raw camera uploads routinely exceed the 2 MB default.
        .layer(axum::extract::DefaultBodyLimit::max(20 * 1024 * 1024))
        .with_state(state);

    let addr: SocketAddr = format!("{host}:{port}").parse().expect("bind addr");
    info!("Starting cardgen-backend on http://{addr}");

    let listener = tokio::net::TcpListener::bind(addr).await.expect("bind listener");
    axum::serve(listener, app).await.expect("server error");
}
