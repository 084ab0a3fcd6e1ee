//! Decision-service client.

use crate::error::AgentServiceError;
use async_trait::async_trait;
use log::debug;
use meadow_config::ServiceConfig;
use meadow_protocol::{AgentSyncOutput, AgentSyncRequest, AgentSyncResponse};
use std::time::Duration;

/// Transport seam to the remote decision service.
///
/// One request may yield several outputs; each output carries at most one of
/// a script or an action list.
#[async_trait]
pub trait AgentService: Send + Sync {
    async fn send_sync_request(
        &self,
        request: AgentSyncRequest,
    ) -> Result<Vec<AgentSyncOutput>, AgentServiceError>;
}

/// HTTP client posting sync requests as JSON to `{endpoint}/api/sync`.
pub struct HttpAgentService {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpAgentService {
    pub fn new(config: &ServiceConfig) -> Result<Self, AgentServiceError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl AgentService for HttpAgentService {
    async fn send_sync_request(
        &self,
        request: AgentSyncRequest,
    ) -> Result<Vec<AgentSyncOutput>, AgentServiceError> {
        let url = format!("{}/api/sync", self.endpoint);
        debug!(
            "sending sync request (agent_id={}, sync_id={})",
            request.agent_id, request.sync_id
        );
        let response = self.client.post(&url).json(&request).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AgentServiceError::Status {
                status: status.as_u16(),
            });
        }
        let body: AgentSyncResponse = response
            .json()
            .await
            .map_err(|error| AgentServiceError::Decode(error.to_string()))?;
        Ok(body.outputs)
    }
}
