//! Response body processing.
//!
//! # Data Flow
//! ```text
//! UpstreamResponse (raw, possibly compressed)
//!     → decode.rs (gzip / br / deflate, else passthrough)
//!     → body.rs (hostname rewrite for JavaScript only)
//!     → Response Assembler
//! ```

pub mod body;
pub mod decode;

pub use body::{is_javascript, BodyRewriter, REWRITE_RULES};
pub use decode::{decode_body, ContentEncoding};
