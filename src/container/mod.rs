//! Container control subsystem.
//!
//! # Data Flow
//! ```text
//! ServiceConfig
//!     → spec.rs (ServiceSpec: name, image, ports, volumes, definition files)
//!
//! ComposeStrategy (compose.rs)
//!     → probe.rs (docker compose | docker-compose, bounded `version` calls)
//!     → command.rs (bounded process execution)
//!
//! NativeApiStrategy (native.rs)
//!     → engine.rs (ContainerEngine trait, bollard implementation)
//! ```
//!
//! # Design Decisions
//! - Both strategies sit behind `ServiceStrategy` (strategy.rs)
//! - Every external call has a timeout; a timeout abandons the wait, it
//!   does not kill the child process
//! - `stop` with nothing to stop is success

pub mod command;
pub mod compose;
pub mod engine;
pub mod native;
pub mod probe;
pub mod spec;
pub mod strategy;

#[cfg(test)]
pub(crate) mod testing;

pub use compose::ComposeStrategy;
pub use engine::{BollardEngine, ContainerEngine, ContainerInfo, EngineError};
pub use native::NativeApiStrategy;
pub use probe::{RuntimeKind, RuntimeProbe};
pub use spec::{PortMapping, ServiceSpec, VolumeBinding};
pub use strategy::{LifecycleError, ServiceStatus, ServiceStrategy, StrategyHandle, StrategyKind};
