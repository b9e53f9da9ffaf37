pub mod admin;
pub mod auth;
pub mod categories;
pub mod comments;
pub mod contact;
pub mod posts;
pub mod uploads;
pub mod users;

use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue};
use axum::Router;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Room for multipart boundaries and headers on top of the image itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// The whole HTTP surface: JSON API under `/api`, stored images under `/uploads`.
pub fn app(state: AppState) -> Router {
    let api = Router::new()
        .merge(auth::router())
        .merge(posts::router())
        .merge(comments::router())
        .merge(users::router())
        .merge(categories::router())
        .merge(contact::router())
        .merge(uploads::router())
        .merge(admin::router());

    let body_limit = state.images.max_bytes() + MULTIPART_OVERHEAD;
    let images = ServiceBuilder::new()
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .service(ServeDir::new(state.images.dir().clone()));

    Router::new()
        .nest("/api", api)
        .nest_service("/uploads", images)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
