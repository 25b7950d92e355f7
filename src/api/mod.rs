//! HTTP 边界：axum 路由 + 共享状态

pub mod routes;
pub mod state;

pub use routes::router;
pub use state::AppState;
