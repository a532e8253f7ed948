//! HTTP and WebSocket surface.

pub mod auth;
pub mod campus;
pub mod error;
pub mod extract;
pub mod faces;
pub mod middleware;
pub mod routes;
pub mod status;
pub mod tutor;
pub mod ws;

pub use routes::*;
