// 上游客户端实现
// 单端点、单次调用，不做重试或 Fallback

use reqwest::{header, Client, Response};
use tokio::time::Duration;

use crate::error::AppResult;
use crate::proxy::common::error::ProxyError;
use crate::proxy::config::RelayConfig;
use crate::proxy::mappers::gemini::models::GenerateContentRequest;

pub struct UpstreamClient {
    http_client: Client,
    url: String,
    request_timeout: Duration,
}

impl UpstreamClient {
    pub fn new(config: &RelayConfig) -> AppResult<Self> {
        let mut builder = Client::builder()
            // Connection settings (优化连接复用，减少建立开销)
            .connect_timeout(Duration::from_secs(20))
            .pool_max_idle_per_host(16)                  // 每主机最多 16 个空闲连接
            .pool_idle_timeout(Duration::from_secs(90))  // 空闲连接保持 90 秒
            .tcp_keepalive(Duration::from_secs(60))      // TCP 保活探测 60 秒
            .user_agent(concat!("gemini-relay/", env!("CARGO_PKG_VERSION")));

        let proxy_config = &config.upstream_proxy;
        if proxy_config.enabled && !proxy_config.url.is_empty() {
            match reqwest::Proxy::all(&proxy_config.url) {
                Ok(proxy) => {
                    builder = builder.proxy(proxy);
                    tracing::info!("UpstreamClient enabled proxy: {}", proxy_config.url);
                }
                Err(e) => {
                    tracing::error!("无效的代理地址: {}, 错误: {}", proxy_config.url, e);
                }
            }
        }

        Ok(Self {
            http_client: builder.build()?,
            url: config.relay_url(),
            request_timeout: Duration::from_secs(config.request_timeout),
        })
    }

    /// Deadline for upstream headers, reused as the idle limit between body chunks.
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// 调用 generateContent
    ///
    /// Exactly one POST per call. Any HTTP status counts as success; only transport
    /// failures and the header deadline map to `UpstreamUnavailable`. The body is left
    /// unread so the caller can stream it.
    pub async fn generate_content(
        &self,
        api_key: &str,
        payload: &GenerateContentRequest,
    ) -> Result<Response, ProxyError> {
        let request = self
            .http_client
            .post(&self.url)
            .query(&[("key", api_key)])
            .header(header::CONTENT_TYPE, "application/json")
            .json(payload)
            .send();

        match tokio::time::timeout(self.request_timeout, request).await {
            Ok(Ok(resp)) => {
                tracing::debug!(
                    "✓ Upstream responded | Endpoint: {} | Status: {}",
                    self.url,
                    resp.status()
                );
                Ok(resp)
            }
            Ok(Err(e)) => {
                // reqwest 错误里带完整 URL（含 key），记录前先去掉
                let cause = e.without_url().to_string();
                tracing::error!("Upstream request failed at {}: {}", self.url, cause);
                Err(ProxyError::UpstreamUnavailable(cause))
            }
            Err(_) => {
                let cause = format!(
                    "no response from {} within {:?}",
                    self.url, self.request_timeout
                );
                tracing::error!("Upstream request timed out: {}", cause);
                Err(ProxyError::UpstreamUnavailable(cause))
            }
        }
    }
}
