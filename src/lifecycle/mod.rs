//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     RuntimeMode::initialize (mode.rs)
//!     → LifecycleOrchestrator::ensure_running (orchestrator.rs)
//!         → compose strategy, else native API strategy
//!         → progress.rs reports image downloads meanwhile
//!     → server starts serving
//!
//! Shutdown:
//!     SIGINT/SIGTERM (signals.rs)
//!     → Shutdown::trigger (shutdown.rs)
//!     → server drains
//!     → LifecycleOrchestrator::teardown
//!     → exit 0
//! ```
//!
//! # Design Decisions
//! - The orchestrator is owned by `main` and shared by reference, not a global
//! - Lifecycle failures are logged; the web server keeps serving without the backend
//! - Teardown is idempotent and never fails

pub mod mode;
pub mod orchestrator;
pub mod progress;
pub mod shutdown;
pub mod signals;

pub use mode::RuntimeMode;
pub use orchestrator::{
    AutoStart, LifecycleOrchestrator, LifecyclePhase, LifecycleSnapshot, StartOutcome,
    TeardownOutcome,
};
pub use shutdown::Shutdown;
