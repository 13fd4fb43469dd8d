//! HTTP surface.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (axum router, request id / trace / timeout layers)
//!     → /<handler>: request.rs buffers into RequestContext
//!         → security pipeline → handler
//!     → /: index.rs renders the template (password auth)
//!     → /mcp: bridge router, no authorization
//! ```

pub mod index;
pub mod request;
pub mod server;

pub use index::{GitCli, GitInfoSource, GitVersion, IndexPage, StaticGitInfo};
pub use request::{RequestContext, X_REQUEST_ID};
pub use server::HttpServer;
