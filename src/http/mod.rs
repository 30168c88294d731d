//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware, /ping, catch-all)
//!     → request.rs (request ID, buffer into InboundRequest)
//!     → transform.rs (strip prefix, resolve origin, rewrite query)
//!     → client.rs (pooled upstream call)
//!     → [rewrite: decode + JavaScript host rewrite]
//!     → response.rs (status, content-type, x-proxy-by)
//!     → Send to client
//! ```

pub mod client;
pub mod request;
pub mod response;
pub mod server;
pub mod transform;

pub use client::{UpstreamClient, UpstreamResponse};
pub use request::{InboundRequest, X_REQUEST_ID};
pub use server::{AppState, HttpServer};
pub use transform::{InjectRule, RequestTransformer, UpstreamRequest};
