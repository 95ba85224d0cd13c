// CORS 中间件
use axum::http::Method;
use tower_http::cors::{Any, CorsLayer};

/// 创建 CORS layer
///
/// The relay is called straight from browser pages served on other origins.
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
        .allow_credentials(false)
        .max_age(std::time::Duration::from_secs(3600))
}
