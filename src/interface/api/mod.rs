//! HTTP API: REST handlers, WebSocket stream and metrics

pub mod call_handler;
pub mod dm_handler;
pub mod dto;
pub mod error;
pub mod friend_handler;
pub mod identity;
pub mod metrics_handler;
pub mod router;
pub mod state;
pub mod user_handler;
pub mod websocket;

pub use dto::ApiResponse;
pub use error::{ApiError, ApiResult};
pub use identity::{CurrentUser, USER_ID_HEADER};
pub use metrics_handler::init_metrics;
pub use router::build_router;
pub use state::{AppState, Repositories};
