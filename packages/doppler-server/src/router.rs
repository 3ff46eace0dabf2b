use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use crate::handlers::{
    analyze_audio, analyze_sound, car_health, car_test, generate_sound, health_check, root,
};
use crate::state::ServerState;

/// 1MB for JSON requests
const MAX_API_BODY_SIZE: usize = 1024 * 1024;
/// Room for multipart boundaries and text fields around the file
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// A registered route, listed by `doppler-server routes`
pub struct RouteInfo {
    pub method: &'static str,
    pub path: &'static str,
    pub description: &'static str,
}

pub const ROUTES: &[RouteInfo] = &[
    RouteInfo {
        method: "GET",
        path: "/",
        description: "Welcome message",
    },
    RouteInfo {
        method: "GET",
        path: "/health",
        description: "Server health and uptime",
    },
    RouteInfo {
        method: "GET",
        path: "/api/car/health",
        description: "Generator and analyzer availability",
    },
    RouteInfo {
        method: "GET",
        path: "/api/car/test",
        description: "List the car sound endpoints",
    },
    RouteInfo {
        method: "POST",
        path: "/api/car/generate-sound",
        description: "Synthesize a pass-by WAV from {velocity, frequency}",
    },
    RouteInfo {
        method: "POST",
        path: "/api/car/analyze-sound",
        description: "Estimate speed from a WAV upload (fields: audio, expected_frequency)",
    },
    RouteInfo {
        method: "POST",
        path: "/api/audio/analyze",
        description: "Summarize a WAV upload (field: file)",
    },
];

fn cors_layer(config: &ServerConfig) -> CorsLayer {
    let methods = [Method::GET, Method::POST, Method::OPTIONS];

    if config.allows_any_origin() {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(methods)
            .allow_headers(Any);
    }

    let cors_origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse::<HeaderValue>().ok())
        .collect();
    CorsLayer::new()
        .allow_origin(cors_origins)
        .allow_methods(methods)
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .allow_credentials(true)
}

pub fn create_router(state: Arc<ServerState>) -> Router {
    let max_upload_size = state.config.max_upload_size as usize + MULTIPART_OVERHEAD;

    let api_routes: Router<Arc<ServerState>> = Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/api/car/health", get(car_health))
        .route("/api/car/test", get(car_test))
        .route("/api/car/generate-sound", post(generate_sound))
        .layer(RequestBodyLimitLayer::new(MAX_API_BODY_SIZE));

    // Uploads get their own, larger body limit
    let upload_routes: Router<Arc<ServerState>> = Router::new()
        .route("/api/car/analyze-sound", post(analyze_sound))
        .route("/api/audio/analyze", post(analyze_audio))
        .layer(DefaultBodyLimit::max(max_upload_size))
        .layer(RequestBodyLimitLayer::new(max_upload_size));

    Router::new()
        .merge(api_routes)
        .merge(upload_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&state.config))
        .with_state(state)
}

#[cfg(test)]
#[path = "router_tests.rs"]
mod router_tests;
