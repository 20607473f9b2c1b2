mod analytics;
pub mod auth;
pub mod error;
pub mod extract;
pub mod policy;
mod products;
pub mod response;
mod users;
mod validation;
mod websites;

pub use analytics::extract_client_ip;

use axum::{
    http::HeaderValue,
    middleware,
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::CorsConfig;
use crate::AppState;
use response::ApiResponse;

pub fn create_router(state: Arc<AppState>) -> Router {
    // Auth routes (login is public, me requires a bearer token)
    let auth_routes = Router::new()
        .route("/login", post(auth::login))
        .route("/me", get(auth::me));

    // Reads by slug are public; everything else resolves a Caller
    let website_routes = Router::new()
        .route(
            "/",
            get(websites::list_websites).post(websites::create_website),
        )
        .route(
            "/:slug",
            get(websites::get_website)
                .put(websites::update_website)
                .delete(websites::delete_website),
        )
        .route("/:slug/products", get(websites::list_website_products));

    let product_routes = Router::new()
        .route(
            "/",
            get(products::list_products).post(products::create_product),
        )
        .route(
            "/:slug",
            get(products::get_product)
                .put(products::update_product)
                .delete(products::delete_product),
        );

    let analytics_routes = Router::new()
        .route("/track", post(analytics::track_event))
        .route("/summary/:website_slug", get(analytics::get_summary))
        .route("/daily/:website_slug", get(analytics::get_daily_stats))
        .route("/top-products/:website_slug", get(analytics::get_top_products))
        .route("/events/:website_slug", get(analytics::get_events));

    let user_routes = Router::new()
        .route("/", get(users::list_users).post(users::create_user))
        .route(
            "/:id",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        );

    let api_routes = Router::new()
        .nest("/auth", auth_routes)
        .nest("/websites", website_routes)
        .nest("/products", product_routes)
        .nest("/analytics", analytics_routes)
        .nest("/users", user_routes);

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api_routes)
        .fallback(error::handler_404)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            error::error_detail,
        ))
        .layer(cors_layer(&state.config.cors))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    let allow_origin = if origins.is_empty() {
        AllowOrigin::from(Any)
    } else {
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(Any)
        .allow_headers(Any)
}

async fn health_check() -> ApiResponse<Value> {
    ApiResponse::success("OK", json!({ "status": "ok" }))
}
