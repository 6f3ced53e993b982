//! HTTP client for the container runtime endpoint
//!
//! Speaks the runtime's HTTP API over the instance's TCP endpoint
//! (local-to-remote tunnel or direct path, established out of scope).
//! The transport is unauthenticated; the trust boundary is the
//! instance's own network.

use std::collections::{BTreeMap, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::container::runtime::{
    ContainerDetails, ContainerRuntime, ContainerSummary, PullProgress, RuntimeConnector,
    RuntimeError,
};
use crate::models::container::{ContainerSpec, VolumeBinding};

/// Fixed remote port the runtime listens on
pub const DEFAULT_RUNTIME_PORT: u16 = 2375;

/// Container runtime client over HTTP.
pub struct DockerEngine {
    client: reqwest::Client,
    base: Url,
}

impl DockerEngine {
    /// Connect-timeout only: log following is unbounded by design, so no
    /// overall request timeout is set.
    pub fn new(host: &str, port: u16) -> Result<Self, RuntimeError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        let base = Url::parse(&format!("http://{}:{}", host, port))
            .map_err(|e| RuntimeError::Decode(format!("invalid endpoint address: {}", e)))?;
        Ok(Self { client, base })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path.trim_start_matches('/'))
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, RuntimeError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ApiErrorBody>(&body)
            .map(|b| b.message)
            .unwrap_or(body);
        Err(RuntimeError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl ContainerRuntime for DockerEngine {
    async fn list_containers(&self) -> Result<Vec<ContainerSummary>, RuntimeError> {
        let response = self
            .client
            .get(self.url("containers/json"))
            .query(&[("all", "true")])
            .send()
            .await?;
        let entries: Vec<ContainerSummaryDto> = Self::check_status(response).await?.json().await?;
        Ok(entries.into_iter().map(ContainerSummaryDto::into_summary).collect())
    }

    async fn inspect_container(&self, id: &str) -> Result<ContainerDetails, RuntimeError> {
        let response = self
            .client
            .get(self.url(&format!("containers/{}/json", id)))
            .send()
            .await?;
        let details: InspectResponseDto = Self::check_status(response).await?.json().await?;
        Ok(details.into_details())
    }

    async fn create_container(&self, spec: &ContainerSpec) -> Result<String, RuntimeError> {
        let request = CreateContainerRequest::from_spec(spec);
        let response = self
            .client
            .post(self.url("containers/create"))
            .json(&request)
            .send()
            .await?;
        let created: CreateContainerResponse = Self::check_status(response).await?.json().await?;
        Ok(created.id)
    }

    async fn start_container(&self, id: &str) -> Result<(), RuntimeError> {
        let response = self
            .client
            .post(self.url(&format!("containers/{}/start", id)))
            .send()
            .await?;
        // 304: already started
        if response.status().as_u16() == 304 {
            return Ok(());
        }
        Self::check_status(response).await?;
        Ok(())
    }

    async fn remove_container(&self, id: &str) -> Result<(), RuntimeError> {
        let response = self
            .client
            .delete(self.url(&format!("containers/{}", id)))
            .query(&[("force", "true"), ("v", "false")])
            .send()
            .await?;
        Self::check_status(response).await?;
        Ok(())
    }

    async fn pull_image(
        &self,
        image: &str,
    ) -> Result<BoxStream<'static, Result<PullProgress, RuntimeError>>, RuntimeError> {
        debug!("Pulling image {}", image);
        let response = self
            .client
            .post(self.url("images/create"))
            .query(&[("fromImage", image)])
            .send()
            .await?;
        let response = Self::check_status(response).await?;

        // The pull endpoint emits newline-delimited JSON progress events
        // for the duration of the download.
        let body = response.bytes_stream().boxed();
        let stream = futures::stream::try_unfold(
            (body, Vec::new(), VecDeque::new()),
            |(mut body, mut buffer, mut pending)| async move {
                loop {
                    if let Some(event) = pending.pop_front() {
                        return Ok(Some((event, (body, buffer, pending))));
                    }
                    match body.next().await {
                        Some(Ok(chunk)) => {
                            buffer.extend_from_slice(&chunk);
                            for event in drain_progress_lines(&mut buffer)? {
                                pending.push_back(event);
                            }
                        }
                        Some(Err(e)) => return Err(RuntimeError::Transport(e)),
                        None => {
                            if let Some(event) = parse_progress_line(&buffer)? {
                                buffer.clear();
                                return Ok(Some((event, (body, buffer, pending))));
                            }
                            return Ok(None);
                        }
                    }
                }
            },
        );
        Ok(stream.boxed())
    }

    async fn container_logs(
        &self,
        id: &str,
        follow: bool,
    ) -> Result<BoxStream<'static, Result<Vec<u8>, RuntimeError>>, RuntimeError> {
        let response = self
            .client
            .get(self.url(&format!("containers/{}/logs", id)))
            .query(&[
                ("follow", if follow { "true" } else { "false" }),
                ("stdout", "true"),
                ("stderr", "true"),
                ("tail", "all"),
            ])
            .send()
            .await?;
        let response = Self::check_status(response).await?;

        let stream = response
            .bytes_stream()
            .map(|chunk| chunk.map(|b| b.to_vec()).map_err(RuntimeError::Transport));
        Ok(stream.boxed())
    }
}

/// Produces `DockerEngine` clients on a fixed port.
pub struct DockerConnector {
    port: u16,
}

impl DockerConnector {
    pub fn new(port: u16) -> Self {
        Self { port }
    }
}

impl Default for DockerConnector {
    fn default() -> Self {
        Self::new(DEFAULT_RUNTIME_PORT)
    }
}

#[async_trait]
impl RuntimeConnector for DockerConnector {
    type Runtime = DockerEngine;

    async fn connect(&self, host: &str) -> Result<DockerEngine, RuntimeError> {
        DockerEngine::new(host, self.port)
    }
}

// ================================ WIRE DTOS ===================================== //

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

#[derive(Debug, Deserialize)]
struct ContainerSummaryDto {
    #[serde(rename = "Id")]
    id: String,
    #[serde(rename = "Names", default)]
    names: Vec<String>,
    #[serde(rename = "Image", default)]
    image: String,
    #[serde(rename = "State", default)]
    state: String,
}

impl ContainerSummaryDto {
    fn into_summary(self) -> ContainerSummary {
        let name = self
            .names
            .first()
            .map(|n| n.trim_start_matches('/').to_string())
            .unwrap_or_default();
        ContainerSummary {
            id: self.id,
            name,
            image: self.image,
            state: self.state,
        }
    }
}

#[derive(Debug, Serialize)]
struct CreateContainerRequest {
    #[serde(rename = "Image")]
    image: String,
    #[serde(rename = "Env")]
    env: Vec<String>,
    #[serde(rename = "HostConfig")]
    host_config: HostConfigDto,
}

impl CreateContainerRequest {
    fn from_spec(spec: &ContainerSpec) -> Self {
        let port_bindings = spec
            .port_bindings
            .iter()
            .map(|(port, host_port)| {
                (
                    port.clone(),
                    vec![PortBindingDto {
                        host_port: host_port.to_string(),
                    }],
                )
            })
            .collect();
        Self {
            image: spec.image.clone(),
            env: spec.env_list(),
            host_config: HostConfigDto {
                binds: spec.bind_list(),
                port_bindings,
            },
        }
    }
}

#[derive(Debug, Serialize)]
struct HostConfigDto {
    #[serde(rename = "Binds")]
    binds: Vec<String>,
    #[serde(rename = "PortBindings")]
    port_bindings: BTreeMap<String, Vec<PortBindingDto>>,
}

#[derive(Debug, Serialize, Deserialize)]
struct PortBindingDto {
    #[serde(rename = "HostPort")]
    host_port: String,
}

#[derive(Debug, Deserialize)]
struct CreateContainerResponse {
    #[serde(rename = "Id")]
    id: String,
}

#[derive(Debug, Deserialize)]
struct InspectResponseDto {
    #[serde(rename = "Id")]
    id: String,
    #[serde(rename = "Name", default)]
    name: String,
    #[serde(rename = "Config")]
    config: InspectConfigDto,
    #[serde(rename = "State")]
    state: InspectStateDto,
    #[serde(rename = "HostConfig")]
    host_config: InspectHostConfigDto,
}

impl InspectResponseDto {
    fn into_details(self) -> ContainerDetails {
        let env = ContainerSpec::env_from_list(&self.config.env.unwrap_or_default());
        let volume_bindings = self
            .host_config
            .binds
            .unwrap_or_default()
            .iter()
            .filter_map(|bind| VolumeBinding::from_bind_string(bind))
            .collect();
        let port_bindings = self
            .host_config
            .port_bindings
            .unwrap_or_default()
            .into_iter()
            .filter_map(|(port, bindings)| {
                let host_port = bindings.first()?.host_port.parse().ok()?;
                Some((port, host_port))
            })
            .collect();
        ContainerDetails {
            id: self.id,
            name: self.name.trim_start_matches('/').to_string(),
            running: self.state.running,
            spec: ContainerSpec {
                image: self.config.image,
                env,
                volume_bindings,
                port_bindings,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct InspectConfigDto {
    #[serde(rename = "Image", default)]
    image: String,
    #[serde(rename = "Env")]
    env: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct InspectStateDto {
    #[serde(rename = "Running", default)]
    running: bool,
}

#[derive(Debug, Deserialize)]
struct InspectHostConfigDto {
    #[serde(rename = "Binds")]
    binds: Option<Vec<String>>,
    #[serde(rename = "PortBindings")]
    port_bindings: Option<BTreeMap<String, Vec<PortBindingDto>>>,
}

#[derive(Debug, Deserialize)]
struct PullProgressDto {
    status: Option<String>,
    progress: Option<String>,
    error: Option<String>,
    #[serde(rename = "errorDetail")]
    error_detail: Option<PullErrorDetailDto>,
}

#[derive(Debug, Deserialize)]
struct PullErrorDetailDto {
    message: Option<String>,
}

impl PullProgressDto {
    fn into_progress(self) -> PullProgress {
        let error = self
            .error_detail
            .and_then(|detail| detail.message)
            .or(self.error);
        PullProgress {
            status: self.status,
            progress: self.progress,
            error,
        }
    }
}

/// Split complete newline-terminated JSON events off the front of the
/// buffer, leaving any partial trailing line in place.
fn drain_progress_lines(buffer: &mut Vec<u8>) -> Result<Vec<PullProgress>, RuntimeError> {
    let mut events = Vec::new();
    while let Some(pos) = buffer.iter().position(|&b| b == b'\n') {
        let line: Vec<u8> = buffer.drain(..=pos).collect();
        if let Some(event) = parse_progress_line(&line)? {
            events.push(event);
        }
    }
    Ok(events)
}

fn parse_progress_line(line: &[u8]) -> Result<Option<PullProgress>, RuntimeError> {
    let trimmed: &[u8] = match std::str::from_utf8(line) {
        Ok(s) => s.trim().as_bytes(),
        Err(_) => line,
    };
    if trimmed.is_empty() {
        return Ok(None);
    }
    let dto: PullProgressDto = serde_json::from_slice(trimmed)
        .map_err(|e| RuntimeError::Decode(format!("bad pull progress event: {}", e)))?;
    Ok(Some(dto.into_progress()))
}
