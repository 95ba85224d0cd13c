use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ProxyStats {
    pub total_requests: u64,
    pub success_count: u64,
    pub error_count: u64,
}

/// 请求计数 (仅内存，进程退出即清空)
pub struct ProxyMonitor {
    total_requests: AtomicU64,
    success_count: AtomicU64,
    error_count: AtomicU64,
    started_at: DateTime<Utc>,
}

impl Default for ProxyMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl ProxyMonitor {
    pub fn new() -> Self {
        Self {
            total_requests: AtomicU64::new(0),
            success_count: AtomicU64::new(0),
            error_count: AtomicU64::new(0),
            started_at: Utc::now(),
        }
    }

    /// Anything below 400 counts as success. Relayed upstream errors count as errors.
    pub fn record(&self, status: u16) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        if status < 400 {
            self.success_count.fetch_add(1, Ordering::Relaxed);
        } else {
            self.error_count.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn get_stats(&self) -> ProxyStats {
        ProxyStats {
            total_requests: self.total_requests.load(Ordering::Relaxed),
            success_count: self.success_count.load(Ordering::Relaxed),
            error_count: self.error_count.load(Ordering::Relaxed),
        }
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }
}
