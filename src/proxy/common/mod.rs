pub mod error;
pub mod relay_body;
