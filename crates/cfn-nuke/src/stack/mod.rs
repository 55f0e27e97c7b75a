//! Stack deletion
//!
//! - handle: Stack and child resource types
//! - operations: Provider traits the state machine runs against
//! - orchestrator: The bounded-retry removal state machine
//! - probe, stabilize, protection, retain, service_role: Its building blocks
//! - events: Reporting hooks

pub mod error;
pub mod events;
pub mod handle;
pub mod operations;
pub mod orchestrator;
pub mod probe;
pub mod protection;
pub mod retain;
pub mod service_role;
pub mod stabilize;

pub use error::{RemovalOutcome, RemoveError};
pub use events::{EventSink, RemovalEvent, TracingSink};
pub use handle::{StackHandle, StackResource};
pub use operations::{RoleOperations, StackOperations};
pub use orchestrator::DeletionOrchestrator;
pub use service_role::{ServiceRole, ServiceRoleProvisioner, service_role_name};
