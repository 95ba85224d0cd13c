// Gemini Handler
use axum::{
    body::Body,
    extract::{rejection::JsonRejection, Json, State},
    http::{HeaderMap, HeaderName},
    response::Response,
};
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::proxy::common::error::ProxyError;
use crate::proxy::common::relay_body::RelayBody;
use crate::proxy::mappers::gemini::models::{GenerateContentRequest, InboundRequest};
use crate::proxy::server::AppState;

/// Connection-scoped headers that must not be copied onto our own response.
fn is_hop_by_hop(name: &HeaderName) -> bool {
    matches!(
        name.as_str(),
        "connection"
            | "keep-alive"
            | "proxy-authenticate"
            | "proxy-authorization"
            | "te"
            | "trailer"
            | "transfer-encoding"
            | "upgrade"
    )
}

/// 处理 POST /api/gemini
///
/// 1. 校验 `message` (400，不发起上游请求)
/// 2. 检查凭证 (500，不发起上游请求)
/// 3. 单次上游调用，状态码、响应头、响应体原样透传
pub async fn handle_relay(
    State(state): State<AppState>,
    payload: Result<Json<InboundRequest>, JsonRejection>,
) -> Result<Response, ProxyError> {
    let Json(request) = payload.map_err(|rejection| {
        debug!("Rejected relay body: {}", rejection.body_text());
        ProxyError::InvalidRequest(rejection.body_text())
    })?;
    let message = request.validate()?;

    let Some(api_key) = state.config.api_key.as_deref() else {
        error!("GEMINI_API_KEY is not configured; refusing to relay");
        return Err(ProxyError::Configuration(
            "GEMINI_API_KEY is not configured on the server".to_string(),
        ));
    };

    let upstream_payload = GenerateContentRequest::from_message(message);
    info!(
        "Relaying message ({} chars) to model {}",
        message.chars().count(),
        state.config.model
    );

    let upstream_response = state
        .upstream
        .generate_content(api_key, &upstream_payload)
        .await?;

    Ok(relay_response(
        upstream_response,
        state.upstream.request_timeout(),
    ))
}

/// Mirrors status, end-to-end headers and body of the upstream response.
///
/// A body that goes quiet for `idle_timeout` is cut off with an error, which makes
/// hyper abort the response instead of holding both connections open.
fn relay_response(upstream: reqwest::Response, idle_timeout: Duration) -> Response {
    let status = upstream.status();
    if !status.is_success() {
        warn!("Upstream returned {}, relaying unchanged", status);
    }

    let headers = copy_headers(upstream.headers());
    let body = Body::from_stream(RelayBody::new(upstream.bytes_stream(), idle_timeout));

    let mut response = Response::new(body);
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}

fn copy_headers(source: &HeaderMap) -> HeaderMap {
    let mut headers = HeaderMap::with_capacity(source.len());
    for (name, value) in source {
        if is_hop_by_hop(name) {
            continue;
        }
        headers.append(name.clone(), value.clone());
    }
    headers
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{header, HeaderValue};

    #[test]
    fn test_copy_headers_drops_hop_by_hop() {
        let mut source = HeaderMap::new();
        source.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json; charset=UTF-8"));
        source.insert(header::TRANSFER_ENCODING, HeaderValue::from_static("chunked"));
        source.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
        source.insert("keep-alive", HeaderValue::from_static("timeout=5"));
        source.insert("x-goog-request-id", HeaderValue::from_static("abc"));
        source.append(header::SET_COOKIE, HeaderValue::from_static("a=1"));
        source.append(header::SET_COOKIE, HeaderValue::from_static("b=2"));

        let copied = copy_headers(&source);
        assert_eq!(copied.get(header::CONTENT_TYPE).unwrap(), "application/json; charset=UTF-8");
        assert_eq!(copied.get("x-goog-request-id").unwrap(), "abc");
        assert_eq!(copied.get_all(header::SET_COOKIE).iter().count(), 2);
        assert!(copied.get(header::TRANSFER_ENCODING).is_none());
        assert!(copied.get(header::CONNECTION).is_none());
        assert!(copied.get("keep-alive").is_none());
    }
}
