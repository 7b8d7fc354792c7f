//! Stage executor and worker agent adapters.

mod command;
mod magentic;
pub mod mock_agent;
mod remote;

pub use command::{CommandAgent, CommandExecutor};
pub use magentic::MagenticExecutor;
pub use mock_agent::{MockAgent, MockExecutor, MockManager};
pub use remote::RemoteExecutor;
