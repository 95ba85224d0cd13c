// proxy 模块 - Gemini 反代服务

pub mod config;
pub mod server;
pub mod monitor;           // 请求计数

pub mod mappers;           // 上游请求结构
pub mod handlers;          // API 端点处理器
pub mod middleware;        // Axum 中间件
pub mod upstream;          // 上游客户端
pub mod common;            // 公共工具

pub use config::RelayConfig;
pub use monitor::ProxyMonitor;
pub use server::AxumServer;
