//! HTTP Control-Plane Client
//!
//! Reference [`ClusterClient`] implementation against a REST control plane.
//! Conditions and assignments are JSON; checkpoint downloads are raw blobs;
//! the watch endpoint long-polls.

use super::{ClusterClient, NodeEvent};
use crate::checkpoint::{Checkpoint, ConfigSource};
use crate::error::ClusterError;
use crate::status::Condition;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
// the watch endpoint holds the connection open until something changes
const WATCH_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Debug, Deserialize)]
struct AssignmentResponse {
    assignment: Option<ConfigSource>,
}

/// REST client for the cluster control plane.
pub struct HttpClusterClient {
    base_url: String,
    client: reqwest::Client,
    watch_client: reqwest::Client,
}

impl HttpClusterClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClusterError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ClusterError::Request(e.to_string()))?;
        let watch_client = reqwest::Client::builder()
            .timeout(WATCH_TIMEOUT)
            .build()
            .map_err(|e| ClusterError::Request(e.to_string()))?;
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Ok(Self {
            base_url,
            client,
            watch_client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

fn check_status(response: &reqwest::Response) -> Result<(), ClusterError> {
    let status = response.status();
    if !status.is_success() {
        return Err(ClusterError::Status(status.as_u16()));
    }
    Ok(())
}

#[async_trait]
impl ClusterClient for HttpClusterClient {
    async fn publish_condition(
        &self,
        node_name: &str,
        condition: &Condition,
    ) -> Result<(), ClusterError> {
        let response = self
            .client
            .put(self.url(&format!("/v1/nodes/{}/conditions/config-ok", node_name)))
            .json(condition)
            .send()
            .await
            .map_err(|e| ClusterError::Request(e.to_string()))?;
        check_status(&response)
    }

    async fn node_assignment(
        &self,
        node_name: &str,
    ) -> Result<Option<ConfigSource>, ClusterError> {
        let response = self
            .client
            .get(self.url(&format!("/v1/nodes/{}/assignment", node_name)))
            .send()
            .await
            .map_err(|e| ClusterError::Request(e.to_string()))?;
        check_status(&response)?;
        let body: AssignmentResponse = response
            .json()
            .await
            .map_err(|e| ClusterError::Decode(e.to_string()))?;
        Ok(body.assignment)
    }

    async fn download(&self, source: &ConfigSource) -> Result<Checkpoint, ClusterError> {
        let response = self
            .client
            .get(self.url(&format!("/v1/configs/{}", source.uid)))
            .send()
            .await
            .map_err(|e| ClusterError::Request(e.to_string()))?;
        check_status(&response)?;
        let payload = response
            .bytes()
            .await
            .map_err(|e| ClusterError::Request(e.to_string()))?;
        Ok(Checkpoint::from_bytes(source.uid.clone(), payload.to_vec()))
    }

    async fn next_event(&self, node_name: &str) -> Result<NodeEvent, ClusterError> {
        let response = self
            .watch_client
            .get(self.url(&format!("/v1/nodes/{}/events", node_name)))
            .send()
            .await
            .map_err(|e| ClusterError::Request(e.to_string()))?;
        check_status(&response)?;
        response
            .json()
            .await
            .map_err(|e| ClusterError::Decode(e.to_string()))
    }
}
