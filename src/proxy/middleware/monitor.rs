// 请求监控中间件
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::time::Instant;

use crate::proxy::server::AppState;

/// Counts every request except health probes and logs its latency.
pub async fn monitor_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    // 过滤健康检查请求,避免日志噪音
    if path == "/healthz" {
        tracing::trace!("Heartbeat: {} {}", method, path);
        return next.run(request).await;
    }

    let start = Instant::now();
    let response = next.run(request).await;
    let status = response.status();

    state.monitor.record(status.as_u16());
    tracing::info!(
        "{} {} -> {} ({} ms)",
        method,
        path,
        status.as_u16(),
        start.elapsed().as_millis()
    );

    response
}
