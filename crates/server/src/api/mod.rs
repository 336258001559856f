pub mod handlers;
pub mod middleware;
pub mod releases;
pub mod routes;
pub mod statistics;
pub mod sync;
pub mod ws;

pub use handlers::{ApiError, ErrorResponse, SuccessResponse};
pub use routes::create_router;
pub use ws::{WsBroadcaster, WsMessage};
