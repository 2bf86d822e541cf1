//! API interface implementations

pub mod call_handler;
pub mod dto;
pub mod metrics_handler;
pub mod router;
pub mod ws_handler;

pub use dto::{ApiResponse, CallStatusResponse};
pub use metrics_handler::init_metrics;
pub use router::build_router;
