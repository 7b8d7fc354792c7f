//! Multi-agent orchestration: the conversation monitor and the
//! manager-directed coordinator.

pub mod error;
pub mod magentic;
pub mod monitor;

pub use error::{OrchestrationError, OrchestrationResult};
pub use magentic::{MagenticCoordinator, ManagerState, OrchestrationConfig, OrchestrationOutcome};
pub use monitor::{render_fragments, OrchestrationMonitor};
