//! Canned decision service.

use async_trait::async_trait;
use meadow_core::{AgentService, AgentServiceError};
use meadow_protocol::{AgentSyncOutput, AgentSyncRequest};
use parking_lot::Mutex;
use std::collections::VecDeque;

/// Replays queued output batches in order and records every request.
/// A sync that arrives after the queue drains gets an empty output list.
#[derive(Default)]
pub struct QueuedAgentService {
    outputs: Mutex<VecDeque<Vec<AgentSyncOutput>>>,
    requests: Mutex<Vec<AgentSyncRequest>>,
}

impl QueuedAgentService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the outputs returned by the next sync request.
    pub fn push_outputs(&self, outputs: Vec<AgentSyncOutput>) {
        self.outputs.lock().push_back(outputs);
    }

    /// Every request received so far, in arrival order.
    pub fn requests(&self) -> Vec<AgentSyncRequest> {
        self.requests.lock().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }
}

#[async_trait]
impl AgentService for QueuedAgentService {
    async fn send_sync_request(
        &self,
        request: AgentSyncRequest,
    ) -> Result<Vec<AgentSyncOutput>, AgentServiceError> {
        self.requests.lock().push(request);
        Ok(self.outputs.lock().pop_front().unwrap_or_default())
    }
}
