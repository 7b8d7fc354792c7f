//! Executors and agents backed by an external command.
//!
//! The command is spawned once per invocation. For a stage, its stdout
//! becomes the response and a non-zero exit status fails the stage with
//! stderr as the reason. As an orchestration worker, stdout is streamed
//! line by line.

use crate::agents::base::{
    Agent, AgentError, AgentEvent, AgentExecutor, AgentStream, ExecutionContext,
};
use crate::cancel::CancellationToken;
use async_trait::async_trait;
use gk_protocol::conversation_models::{AuthorRole, StreamFragment};
use gk_protocol::pipeline_models::{StageDefinition, PARAM_PLACEHOLDER};
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::{Child, Command};
use tracing::{debug, warn};

const INSTRUCTION_PLACEHOLDER: &str = "{instruction}";
const STAGE_PLACEHOLDER: &str = "{stage}";

/// Runs an external program for a stage.
///
/// Arguments may contain `{param}`, `{instruction}` and `{stage}`, which are
/// replaced with values from the [`ExecutionContext`].
#[derive(Debug, Clone)]
pub struct CommandExecutor {
    program: String,
    args: Vec<String>,
    working_dir: Option<PathBuf>,
}

impl CommandExecutor {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            working_dir: None,
        }
    }

    /// Build from a stage definition, if it names a command.
    pub fn from_definition(definition: &StageDefinition) -> Option<Self> {
        definition
            .command
            .as_ref()
            .map(|command| Self::new(command.clone(), definition.args.clone()))
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Arguments with placeholders expanded for `context`.
    pub fn render_args(&self, context: &ExecutionContext) -> Vec<String> {
        self.args
            .iter()
            .map(|arg| {
                arg.replace(PARAM_PLACEHOLDER, &context.task_parameter)
                    .replace(INSTRUCTION_PLACEHOLDER, &context.instruction)
                    .replace(STAGE_PLACEHOLDER, &context.stage_name)
            })
            .collect()
    }

    fn spawn(&self, context: &ExecutionContext, stderr: Stdio) -> Result<Child, AgentError> {
        let args = self.render_args(context);
        let mut cmd = Command::new(&self.program);
        cmd.args(&args);
        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(stderr);
        cmd.kill_on_drop(true);

        debug!(program = %self.program, ?args, stage = %context.stage_name, "spawning command");
        cmd.spawn().map_err(|e| {
            AgentError::ExecutionError(format!("Failed to spawn command '{}': {e}", self.program))
        })
    }

    async fn run(&self, context: &ExecutionContext) -> Result<String, AgentError> {
        let mut child = self.spawn(context, Stdio::piped())?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| AgentError::ExecutionError("Failed to capture stdout".to_string()))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| AgentError::ExecutionError("Failed to capture stderr".to_string()))?;

        let read_stdout = async {
            let mut lines = BufReader::new(stdout).lines();
            let mut output = Vec::new();
            while let Some(line) = lines.next_line().await? {
                output.push(line);
            }
            Ok::<_, std::io::Error>(output.join("\n"))
        };
        let read_stderr = async {
            let mut buffer = Vec::new();
            stderr.read_to_end(&mut buffer).await?;
            Ok::<_, std::io::Error>(String::from_utf8_lossy(&buffer).into_owned())
        };

        let (output, errors) = tokio::join!(read_stdout, read_stderr);
        let output = output
            .map_err(|e| AgentError::StreamParseError(format!("Failed to read stdout: {e}")))?;
        let errors = errors.unwrap_or_else(|e| {
            warn!(program = %self.program, error = %e, "failed to read stderr");
            String::new()
        });

        let status = child
            .wait()
            .await
            .map_err(|e| AgentError::ExecutionError(format!("Failed to wait for command: {e}")))?;

        if status.success() {
            Ok(output)
        } else {
            let reason = match errors.trim() {
                "" => format!("'{}' exited with {status}", self.program),
                errors => format!("'{}' exited with {status}: {errors}", self.program),
            };
            warn!(program = %self.program, %status, "stage command failed");
            Err(AgentError::ExecutionError(reason))
        }
    }
}

#[async_trait]
impl AgentExecutor for CommandExecutor {
    async fn invoke(
        &self,
        context: &ExecutionContext,
        cancel: &CancellationToken,
    ) -> Result<String, AgentError> {
        // Dropping the run future kills the child
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(AgentError::Canceled),
            result = self.run(context) => result,
        }
    }
}

/// Orchestration worker backed by an external command.
///
/// Each stdout line is yielded as a fragment; the fragment group closes when
/// the process exits successfully.
pub struct CommandAgent {
    name: String,
    description: String,
    command: CommandExecutor,
}

impl CommandAgent {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        command: CommandExecutor,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            command,
        }
    }
}

#[async_trait]
impl Agent for CommandAgent {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    async fn execute(&self, context: &ExecutionContext) -> Result<AgentStream, AgentError> {
        let mut child = self.command.spawn(context, Stdio::null())?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| AgentError::ExecutionError("Failed to capture stdout".to_string()))?;
        let name = self.name.clone();
        let program = self.command.program.clone();

        let stream = async_stream::stream! {
            let mut lines = BufReader::new(stdout).lines();
            let mut first = true;

            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        let fragment = if first {
                            first = false;
                            StreamFragment::text(line).from_author(AuthorRole::Assistant, name.as_str())
                        } else {
                            StreamFragment::text(format!("\n{line}"))
                        };
                        yield Ok(AgentEvent::Fragment { fragment, is_final: false });
                    }
                    Ok(None) => break,
                    Err(e) => {
                        yield Err(AgentError::StreamParseError(format!("Failed to read stdout: {e}")));
                        return;
                    }
                }
            }

            match child.wait().await {
                Ok(status) if status.success() => {
                    yield Ok(AgentEvent::Fragment {
                        fragment: StreamFragment::default().from_author(AuthorRole::Assistant, name.as_str()),
                        is_final: true,
                    });
                    yield Ok(AgentEvent::Completed);
                }
                Ok(status) => {
                    yield Err(AgentError::ExecutionError(format!("'{program}' exited with {status}")));
                }
                Err(e) => {
                    yield Err(AgentError::ExecutionError(format!("Failed to wait for command: {e}")));
                }
            }
        };

        Ok(Box::pin(stream))
    }
}
