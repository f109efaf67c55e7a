pub mod clients;
pub mod config;
pub mod credentials;
pub mod document;
pub mod errors;
pub mod models;
pub mod offload;
pub mod prompt;
pub mod service;

pub use config::Settings;
pub use errors::{ServiceError, ServiceResult};
pub use offload::Offload;
pub use service::AgentService;
