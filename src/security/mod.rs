//! Request authorization.
//!
//! # Data Flow
//! ```text
//! RequestContext (buffered request)
//!     → pipeline.rs (checks built from the handler's AuthRequirement)
//!         → checks.rs: loopback → password → API key → CSRF
//!     → Allow: handler runs
//!     → Deny: 401/403 response, handler never sees the request
//! ```
//!
//! # Design Decisions
//! - Fail closed: the first failing check ends evaluation
//! - Credentials live in an `ArcSwap` (credentials.rs) and can be reloaded
//! - CSRF tokens are session-scoped (session.rs), never global

pub mod checks;
pub mod credentials;
pub mod pipeline;
pub mod requirement;
pub mod session;

pub use checks::AuthCheck;
pub use credentials::{CredentialStore, Credentials};
pub use pipeline::{AuthorizationPipeline, SecurityState};
pub use requirement::{AuthRequirement, AuthzDecision, Denial};
pub use session::SessionStore;
