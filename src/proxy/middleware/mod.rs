pub mod cors;
pub mod monitor;

pub use cors::cors_layer;
pub use monitor::monitor_middleware;
