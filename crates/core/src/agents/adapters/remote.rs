//! Stage executor that delegates to a remote agent service.

use crate::agents::base::{AgentError, AgentExecutor, ExecutionContext};
use crate::cancel::CancellationToken;
use crate::remote::{GuardedClient, RemoteClient, RemoteRequest};
use async_trait::async_trait;
use serde_json::json;

/// Sends the stage to a remote service through a [`GuardedClient`].
///
/// The request operation is the stage name; the body carries the task
/// parameter and the rendered instruction.
pub struct RemoteExecutor<C> {
    client: GuardedClient<C>,
}

impl<C: RemoteClient> RemoteExecutor<C> {
    pub fn new(client: GuardedClient<C>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl<C: RemoteClient> AgentExecutor for RemoteExecutor<C> {
    async fn invoke(
        &self,
        context: &ExecutionContext,
        cancel: &CancellationToken,
    ) -> Result<String, AgentError> {
        let request = RemoteRequest::new(
            context.stage_name.as_str(),
            json!({
                "task_parameter": context.task_parameter,
                "instruction": context.instruction,
            }),
        );
        let response = self.client.send(&request, cancel).await?;
        Ok(response.text())
    }
}
