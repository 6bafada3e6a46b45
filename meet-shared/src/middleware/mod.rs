mod auth_extractor;
mod metrics_layer;
mod tracing_layer;
mod webhook_verify;
mod ws_auth;

pub use auth_extractor::*;
pub use metrics_layer::*;
pub use tracing_layer::*;
pub use webhook_verify::*;
pub use ws_auth::*;
