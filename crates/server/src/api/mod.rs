pub mod conversions;
pub mod error;
pub mod handlers;
pub mod jobs;
pub mod middleware;
pub mod routes;

pub use error::ApiError;
pub use routes::create_router;
