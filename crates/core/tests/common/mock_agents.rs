//! Recording broadcaster and scripted executors for deterministic testing.

use async_trait::async_trait;
use gk_core::agents::{AgentError, AgentExecutor, ExecutionContext};
use gk_core::broadcast::Broadcaster;
use gk_core::cancel::CancellationToken;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

/// Keeps every published message.
#[derive(Default)]
pub struct RecordingBroadcaster {
    messages: Mutex<Vec<String>>,
}

impl RecordingBroadcaster {
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

impl Broadcaster for RecordingBroadcaster {
    fn publish(&self, message: &str) {
        self.messages.lock().unwrap().push(message.to_string());
    }
}

/// Blocks on its first call until cancelled; later calls succeed.
///
/// `started` is notified when the first call begins.
#[allow(dead_code)]
#[derive(Default)]
pub struct GatedExecutor {
    pub started: Notify,
    calls: AtomicUsize,
}

#[allow(dead_code)]
impl GatedExecutor {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AgentExecutor for GatedExecutor {
    async fn invoke(
        &self,
        context: &ExecutionContext,
        cancel: &CancellationToken,
    ) -> Result<String, AgentError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call > 0 {
            return Ok(format!("{} done on retry", context.stage_name));
        }

        self.started.notify_one();
        cancel.cancelled().await;
        Err(AgentError::Canceled)
    }
}

/// Appends `start:<stage>` and `end:<stage>` to a shared log around a delay.
#[allow(dead_code)]
pub struct OrderRecordingExecutor {
    log: Arc<Mutex<Vec<String>>>,
    delay: Duration,
}

#[allow(dead_code)]
impl OrderRecordingExecutor {
    pub fn new(log: Arc<Mutex<Vec<String>>>, delay: Duration) -> Self {
        Self { log, delay }
    }
}

#[async_trait]
impl AgentExecutor for OrderRecordingExecutor {
    async fn invoke(
        &self,
        context: &ExecutionContext,
        _cancel: &CancellationToken,
    ) -> Result<String, AgentError> {
        self.log
            .lock()
            .unwrap()
            .push(format!("start:{}", context.stage_name));
        tokio::time::sleep(self.delay).await;
        self.log
            .lock()
            .unwrap()
            .push(format!("end:{}", context.stage_name));
        Ok(String::new())
    }
}
