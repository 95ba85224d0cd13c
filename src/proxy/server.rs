use axum::{
    extract::{DefaultBodyLimit, State},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::oneshot;
use tower_http::trace::TraceLayer;
use tracing::{debug, error};

use crate::proxy::config::RelayConfig;
use crate::proxy::monitor::ProxyMonitor;
use crate::proxy::upstream::client::UpstreamClient;

/// Inbound route the browser posts `{ "message": ... }` to.
pub const RELAY_ROUTE: &str = "/api/gemini";

const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Axum 应用状态
///
/// Everything here is read-only after startup; requests share nothing mutable
/// except the monitor's atomic counters.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<RelayConfig>,
    pub upstream: Arc<UpstreamClient>,
    pub monitor: Arc<ProxyMonitor>,
}

/// Axum 服务器实例
pub struct AxumServer {
    shutdown_tx: Option<oneshot::Sender<()>>,
    local_addr: SocketAddr,
}

impl AxumServer {
    /// 启动 Axum 服务器
    ///
    /// Binds `get_bind_address():port` (port 0 picks a free one) and serves in a
    /// background task. Each connection is handled on its own task.
    pub async fn start(
        config: RelayConfig,
        monitor: Arc<ProxyMonitor>,
    ) -> Result<(Self, tokio::task::JoinHandle<()>), String> {
        let upstream = UpstreamClient::new(&config)
            .map_err(|e| format!("上游客户端创建失败: {}", e))?;

        let addr = format!("{}:{}", config.get_bind_address(), config.port);
        let state = AppState {
            config: Arc::new(config),
            upstream: Arc::new(upstream),
            monitor,
        };
        let app = build_router(state);

        // 绑定地址
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| format!("地址 {} 绑定失败: {}", addr, e))?;
        let local_addr = listener
            .local_addr()
            .map_err(|e| format!("无法获取监听地址: {}", e))?;

        tracing::info!("反代服务器启动在 http://{}", local_addr);

        // 创建关闭通道
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

        // 在新任务中启动服务器
        let handle = tokio::spawn(async move {
            use hyper::server::conn::http1;
            use hyper_util::rt::TokioIo;
            use hyper_util::service::TowerToHyperService;

            loop {
                tokio::select! {
                    res = listener.accept() => {
                        match res {
                            Ok((stream, _)) => {
                                let io = TokioIo::new(stream);
                                let service = TowerToHyperService::new(app.clone());

                                // Dropping this future (peer hung up) drops the in-flight
                                // handler, which aborts its upstream request.
                                tokio::task::spawn(async move {
                                    if let Err(err) = http1::Builder::new()
                                        .serve_connection(io, service)
                                        .await
                                    {
                                        debug!("连接处理结束或出错: {:?}", err);
                                    }
                                });
                            }
                            Err(e) => {
                                error!("接收连接失败: {:?}", e);
                            }
                        }
                    }
                    _ = &mut shutdown_rx => {
                        tracing::info!("反代服务器停止监听");
                        break;
                    }
                }
            }
        });

        Ok((
            Self {
                shutdown_tx: Some(shutdown_tx),
                local_addr,
            },
            handle,
        ))
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// 停止服务器
    pub fn stop(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    use crate::proxy::handlers;

    Router::new()
        .route(RELAY_ROUTE, post(handlers::gemini::handle_relay))
        .route("/healthz", get(health_check_handler))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            crate::proxy::middleware::monitor_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(crate::proxy::middleware::cors_layer())
        .with_state(state)
}

/// 健康检查处理器
async fn health_check_handler(State(state): State<AppState>) -> Response {
    Json(serde_json::json!({
        "status": "ok",
        "credential_configured": state.config.has_credential(),
        "model": state.config.model,
        "started_at": state.monitor.started_at().to_rfc3339(),
        "stats": state.monitor.get_stats(),
    }))
    .into_response()
}
