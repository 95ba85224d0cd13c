use std::path::PathBuf;

use crate::error::{AppError, AppResult};

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_UPSTREAM_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1";
pub const DEFAULT_PORT: u16 = 3002;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// 上游代理配置
#[derive(Debug, Clone, Default)]
pub struct UpstreamProxyConfig {
    /// 是否启用
    pub enabled: bool,
    /// 代理地址 (http://, https://, socks5://)
    pub url: String,
}

/// 反代服务配置
///
/// Read once at startup and handed to the server by value. Nothing else in the
/// process reads the environment for these settings.
#[derive(Clone)]
pub struct RelayConfig {
    /// Upstream credential. `None` keeps the server up but fails every relay call.
    pub api_key: Option<String>,

    /// 上游模型名
    pub model: String,

    /// Base of the generative API, without the `/models/...` suffix.
    pub upstream_base_url: String,

    /// 监听端口
    pub port: u16,

    /// 是否允许局域网访问
    /// - false: 仅本机访问 127.0.0.1（默认，隐私优先）
    /// - true: 允许局域网访问 0.0.0.0
    pub allow_lan_access: bool,

    /// API 请求超时时间(秒)
    /// Bounds both the wait for upstream headers and each gap between body chunks.
    pub request_timeout: u64,

    /// 上游代理配置
    pub upstream_proxy: UpstreamProxyConfig,

    /// Directory for rolling log files; stdout only when unset.
    pub log_dir: Option<PathBuf>,
}

impl std::fmt::Debug for RelayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("upstream_base_url", &self.upstream_base_url)
            .field("port", &self.port)
            .field("allow_lan_access", &self.allow_lan_access)
            .field("request_timeout", &self.request_timeout)
            .field("upstream_proxy", &self.upstream_proxy)
            .field("log_dir", &self.log_dir)
            .finish()
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            upstream_base_url: DEFAULT_UPSTREAM_BASE_URL.to_string(),
            port: DEFAULT_PORT,
            allow_lan_access: false, // 默认仅本机访问，隐私优先
            request_timeout: DEFAULT_REQUEST_TIMEOUT_SECS,
            upstream_proxy: UpstreamProxyConfig::default(),
            log_dir: None,
        }
    }
}

impl RelayConfig {
    /// Builds the config from a key lookup (normally the process environment).
    ///
    /// Empty values count as unset. A missing `GEMINI_API_KEY` is not an error here.
    pub fn from_lookup<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let mut config = Self::default();
        config.api_key = get("GEMINI_API_KEY");

        if let Some(model) = get("GEMINI_MODEL") {
            config.model = model;
        }
        if let Some(base) = get("GEMINI_API_BASE") {
            config.upstream_base_url = base.trim_end_matches('/').to_string();
        }
        if let Some(port) = get("PORT") {
            config.port = port
                .parse()
                .map_err(|e| AppError::Config(format!("invalid PORT {:?}: {}", port, e)))?;
        }
        if let Some(flag) = get("ALLOW_LAN_ACCESS") {
            config.allow_lan_access = parse_bool("ALLOW_LAN_ACCESS", &flag)?;
        }
        if let Some(secs) = get("REQUEST_TIMEOUT_SECS") {
            config.request_timeout = secs.parse().map_err(|e| {
                AppError::Config(format!("invalid REQUEST_TIMEOUT_SECS {:?}: {}", secs, e))
            })?;
            if config.request_timeout == 0 {
                return Err(AppError::Config(
                    "REQUEST_TIMEOUT_SECS must be greater than zero".to_string(),
                ));
            }
        }
        if let Some(proxy_url) = get("UPSTREAM_PROXY_URL") {
            config.upstream_proxy = UpstreamProxyConfig {
                enabled: true,
                url: proxy_url,
            };
        }
        config.log_dir = get("LOG_DIR").map(PathBuf::from);

        url::Url::parse(&config.upstream_base_url).map_err(|e| {
            AppError::Config(format!(
                "invalid GEMINI_API_BASE {:?}: {}",
                config.upstream_base_url, e
            ))
        })?;

        Ok(config)
    }

    /// 获取实际的监听地址
    /// - allow_lan_access = false: 返回 "127.0.0.1"（默认，隐私优先）
    /// - allow_lan_access = true: 返回 "0.0.0.0"（允许局域网访问）
    pub fn get_bind_address(&self) -> &str {
        if self.allow_lan_access {
            "0.0.0.0"
        } else {
            "127.0.0.1"
        }
    }

    /// `<base>/models/<model>:generateContent`, credential not included.
    pub fn relay_url(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.upstream_base_url.trim_end_matches('/'),
            self.model
        )
    }

    pub fn has_credential(&self) -> bool {
        self.api_key.is_some()
    }
}

fn parse_bool(key: &str, value: &str) -> AppResult<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(AppError::Config(format!("invalid {} {:?}", key, other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_without_env() {
        let config = RelayConfig::from_lookup(|_| None).unwrap();
        assert!(config.api_key.is_none());
        assert_eq!(config.model, "gemini-2.5-flash");
        assert_eq!(config.port, 3002);
        assert_eq!(config.request_timeout, 30);
        assert_eq!(config.get_bind_address(), "127.0.0.1");
        assert!(!config.upstream_proxy.enabled);
        assert_eq!(
            config.relay_url(),
            "https://generativelanguage.googleapis.com/v1/models/gemini-2.5-flash:generateContent"
        );
    }

    #[test]
    fn test_env_overrides() {
        let config = RelayConfig::from_lookup(lookup_from(&[
            ("GEMINI_API_KEY", "secret"),
            ("GEMINI_MODEL", "gemini-pro"),
            ("GEMINI_API_BASE", "http://127.0.0.1:9999/v1/"),
            ("PORT", "8080"),
            ("ALLOW_LAN_ACCESS", "true"),
            ("REQUEST_TIMEOUT_SECS", "5"),
            ("UPSTREAM_PROXY_URL", "socks5://127.0.0.1:1080"),
        ]))
        .unwrap();

        assert_eq!(config.api_key.as_deref(), Some("secret"));
        assert_eq!(config.port, 8080);
        assert_eq!(config.get_bind_address(), "0.0.0.0");
        assert_eq!(config.request_timeout, 5);
        assert!(config.upstream_proxy.enabled);
        assert_eq!(
            config.relay_url(),
            "http://127.0.0.1:9999/v1/models/gemini-pro:generateContent"
        );
    }

    #[test]
    fn test_empty_key_is_missing_credential() {
        let config = RelayConfig::from_lookup(lookup_from(&[("GEMINI_API_KEY", "  ")])).unwrap();
        assert!(!config.has_credential());
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(RelayConfig::from_lookup(lookup_from(&[("PORT", "abc")])).is_err());
        assert!(RelayConfig::from_lookup(lookup_from(&[("ALLOW_LAN_ACCESS", "maybe")])).is_err());
        assert!(RelayConfig::from_lookup(lookup_from(&[("REQUEST_TIMEOUT_SECS", "0")])).is_err());
        assert!(RelayConfig::from_lookup(lookup_from(&[("GEMINI_API_BASE", "not a url")])).is_err());
    }

    #[test]
    fn test_debug_redacts_key() {
        let config = RelayConfig::from_lookup(lookup_from(&[("GEMINI_API_KEY", "top-secret")])).unwrap();
        let printed = format!("{:?}", config);
        assert!(!printed.contains("top-secret"));
        assert!(printed.contains("<redacted>"));
    }
}
