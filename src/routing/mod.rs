//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Inbound path (route prefix already stripped)
//!     → resolver.rs (hard-coded /g/collect check)
//!     → Return: GA collection origin or configured default origin
//! ```
//!
//! # Design Decisions
//! - Origins compiled at startup, immutable at runtime
//! - Deterministic: same path always resolves to the same origin

pub mod resolver;

pub use resolver::{Origin, OriginResolver, GA_COLLECT_ORIGIN, GA_COLLECT_PATH};
