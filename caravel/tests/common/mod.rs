//! Shared in-memory fakes for the component seams
#![allow(dead_code)]

use std::collections::BTreeSet;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use futures::stream::{self, BoxStream};
use futures::StreamExt;

use caravel::container::runtime::{
    ContainerDetails, ContainerRuntime, ContainerSummary, PullProgress, RuntimeConnector,
    RuntimeError,
};
use caravel::models::container::{ContainerSpec, VolumeBinding};
use caravel::models::instance::{ComputeInstance, InstanceHealth, InstanceState, LaunchTemplate};
use caravel::provision::cloud::{CloudCompute, CloudError};
use caravel::remote::shell::{
    ExecOutput, RemoteShell, ScriptDelivery, ScriptOutcome, ShellError, ShellSession, ShellTarget,
};
use caravel::utils::SleepFn;

pub const FAKE_INSTANCE_ID: &str = "i-0123456789abcdef0";
pub const FAKE_PUBLIC_ADDRESS: &str = "198.51.100.7";
pub const FAKE_PRIVATE_ADDRESS: &str = "10.0.0.7";

/// A sleep that completes instantly and records the requested delays.
pub fn recording_sleep() -> (SleepFn, Arc<Mutex<Vec<Duration>>>) {
    let delays = Arc::new(Mutex::new(Vec::new()));
    let recorded = delays.clone();
    let sleep: SleepFn = Arc::new(move |wait| {
        recorded.lock().unwrap().push(wait);
        let fut: Pin<Box<dyn Future<Output = ()> + Send>> = Box::pin(async {});
        fut
    });
    (sleep, delays)
}

/// The workload spec used across these tests.
pub fn minecraft_spec() -> ContainerSpec {
    let mut spec = ContainerSpec::new("itzg/minecraft-server");
    spec.env.insert("EULA".to_string(), "true".to_string());
    spec.env.insert("VERSION".to_string(), "latest".to_string());
    spec.env.insert("TYPE".to_string(), "spigot".to_string());
    spec.port_bindings.insert("25565/tcp".to_string(), 25565);
    spec.volume_bindings
        .push(VolumeBinding::new("container-data", "/data"));
    spec
}

/// Write a throwaway bootstrap script and return its path.
pub fn temp_script(contents: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("caravel-test-{}.sh", uuid::Uuid::new_v4()));
    std::fs::write(&path, contents).expect("write temp script");
    path
}

// ================================== CLOUD ======================================= //

#[derive(Default)]
pub struct CloudLog {
    pub launched: Vec<LaunchTemplate>,
    pub status_polls: u32,
    pub terminated: Vec<String>,
}

/// Control-plane fake: one instance, ready after a fixed number of polls.
pub struct FakeCloud {
    pub log: Arc<Mutex<CloudLog>>,
    ready_after_polls: u32,
}

impl FakeCloud {
    /// Ready after `polls` Initializing responses.
    pub fn ready_after(polls: u32) -> Self {
        Self {
            log: Arc::new(Mutex::new(CloudLog::default())),
            ready_after_polls: polls,
        }
    }

    /// Never passes its status checks.
    pub fn never_ready() -> Self {
        Self::ready_after(u32::MAX)
    }
}

#[async_trait]
impl CloudCompute for FakeCloud {
    async fn run_instance(&self, template: &LaunchTemplate) -> Result<String, CloudError> {
        self.log.lock().unwrap().launched.push(template.clone());
        Ok(FAKE_INSTANCE_ID.to_string())
    }

    async fn instance_status(&self, _id: &str) -> Result<InstanceHealth, CloudError> {
        let mut log = self.log.lock().unwrap();
        log.status_polls += 1;
        if log.status_polls > self.ready_after_polls {
            Ok(InstanceHealth::Ok)
        } else {
            Ok(InstanceHealth::Initializing)
        }
    }

    async fn describe_instance(&self, id: &str) -> Result<ComputeInstance, CloudError> {
        Ok(ComputeInstance {
            id: id.to_string(),
            instance_type: "t3.small".to_string(),
            public_address: Some(FAKE_PUBLIC_ADDRESS.to_string()),
            private_address: Some(FAKE_PRIVATE_ADDRESS.to_string()),
            launch_time: Utc::now(),
            state: InstanceState::Running,
        })
    }

    async fn terminate_instance(&self, id: &str) -> Result<(), CloudError> {
        self.log.lock().unwrap().terminated.push(id.to_string());
        Ok(())
    }
}

// ================================== SHELL ======================================= //

#[derive(Default, Debug)]
pub struct ShellLog {
    pub attempts: u32,
    pub commands: Vec<String>,
    pub scripts: Vec<Vec<u8>>,
    pub closed: u32,
}

/// Shell transport fake: fails the first N connection attempts, then
/// hands out sessions whose scripts exit with a configured code.
pub struct FakeShell {
    pub log: Arc<Mutex<ShellLog>>,
    fail_first: u32,
    script_exit_code: u32,
}

impl FakeShell {
    pub fn new() -> Self {
        Self::failing_first(0)
    }

    pub fn failing_first(fail_first: u32) -> Self {
        Self {
            log: Arc::new(Mutex::new(ShellLog::default())),
            fail_first,
            script_exit_code: 0,
        }
    }

    pub fn never_connecting() -> Self {
        Self::failing_first(u32::MAX)
    }

    pub fn with_script_exit_code(mut self, exit_code: u32) -> Self {
        self.script_exit_code = exit_code;
        self
    }
}

impl Default for FakeShell {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RemoteShell for FakeShell {
    type Session = FakeSession;

    async fn connect(&self, _target: &ShellTarget) -> Result<FakeSession, ShellError> {
        let mut log = self.log.lock().unwrap();
        log.attempts += 1;
        if log.attempts <= self.fail_first {
            return Err(ShellError::Connect("connection refused".to_string()));
        }
        Ok(FakeSession {
            log: self.log.clone(),
            script_exit_code: self.script_exit_code,
        })
    }
}

#[derive(Debug)]
pub struct FakeSession {
    log: Arc<Mutex<ShellLog>>,
    script_exit_code: u32,
}

#[async_trait]
impl ShellSession for FakeSession {
    async fn execute(&mut self, command: &str) -> Result<ExecOutput, ShellError> {
        self.log.lock().unwrap().commands.push(command.to_string());
        Ok(ExecOutput {
            output: Vec::new(),
            exit_code: 0,
        })
    }

    async fn run_script(
        &mut self,
        script: &[u8],
        delivery: ScriptDelivery,
    ) -> Result<ScriptOutcome, ShellError> {
        self.log.lock().unwrap().scripts.push(script.to_vec());
        if let ScriptDelivery::Streaming(observer) = &delivery {
            let _ = observer.send(b"bootstrap output\n".to_vec()).await;
        }
        Ok(ScriptOutcome {
            exit_code: self.script_exit_code,
            output: Vec::new(),
        })
    }

    async fn close(&mut self) -> Result<(), ShellError> {
        self.log.lock().unwrap().closed += 1;
        Ok(())
    }
}

// ================================= RUNTIME ====================================== //

#[derive(Clone)]
pub struct FakeContainer {
    pub id: String,
    pub name: String,
    pub running: bool,
    pub spec: ContainerSpec,
}

#[derive(Default)]
pub struct HostLog {
    pub containers: Vec<FakeContainer>,
    pub volumes: BTreeSet<String>,
    pub pulled: Vec<String>,
    pub removed: Vec<String>,
    pub started: Vec<String>,
    pub created: u32,
    pub pull_error: Option<String>,
    next_id: u32,
}

/// Container runtime fake backed by one shared host state.
#[derive(Clone, Default)]
pub struct FakeRuntime {
    pub log: Arc<Mutex<HostLog>>,
}

impl FakeRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Place a pre-existing container on the host without touching the
    /// call counters.
    pub fn seed_container(&self, spec: &ContainerSpec, running: bool) -> String {
        let mut log = self.log.lock().unwrap();
        log.next_id += 1;
        let id = format!("ctr-{:04}", log.next_id);
        let name = format!("workload-{}", log.next_id);
        for binding in &spec.volume_bindings {
            log.volumes.insert(binding.source.clone());
        }
        log.containers.push(FakeContainer {
            id: id.clone(),
            name,
            running,
            spec: spec.clone(),
        });
        id
    }

    pub fn fail_pulls_with(&self, message: &str) {
        self.log.lock().unwrap().pull_error = Some(message.to_string());
    }
}

#[async_trait]
impl ContainerRuntime for FakeRuntime {
    async fn list_containers(&self) -> Result<Vec<ContainerSummary>, RuntimeError> {
        let log = self.log.lock().unwrap();
        Ok(log
            .containers
            .iter()
            .map(|c| ContainerSummary {
                id: c.id.clone(),
                name: c.name.clone(),
                image: c.spec.image.clone(),
                state: if c.running { "running" } else { "created" }.to_string(),
            })
            .collect())
    }

    async fn inspect_container(&self, id: &str) -> Result<ContainerDetails, RuntimeError> {
        let log = self.log.lock().unwrap();
        let container = log
            .containers
            .iter()
            .find(|c| c.id == id)
            .ok_or_else(|| RuntimeError::Api {
                status: 404,
                message: format!("no such container: {}", id),
            })?;
        Ok(ContainerDetails {
            id: container.id.clone(),
            name: container.name.clone(),
            running: container.running,
            spec: container.spec.clone(),
        })
    }

    async fn create_container(&self, spec: &ContainerSpec) -> Result<String, RuntimeError> {
        let mut log = self.log.lock().unwrap();
        log.created += 1;
        log.next_id += 1;
        let id = format!("ctr-{:04}", log.next_id);
        let name = format!("workload-{}", log.next_id);
        for binding in &spec.volume_bindings {
            log.volumes.insert(binding.source.clone());
        }
        log.containers.push(FakeContainer {
            id: id.clone(),
            name,
            running: false,
            spec: spec.clone(),
        });
        Ok(id)
    }

    async fn start_container(&self, id: &str) -> Result<(), RuntimeError> {
        let mut log = self.log.lock().unwrap();
        let container = log
            .containers
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| RuntimeError::Api {
                status: 404,
                message: format!("no such container: {}", id),
            })?;
        container.running = true;
        log.started.push(id.to_string());
        Ok(())
    }

    async fn remove_container(&self, id: &str) -> Result<(), RuntimeError> {
        let mut log = self.log.lock().unwrap();
        let position = log
            .containers
            .iter()
            .position(|c| c.id == id)
            .ok_or_else(|| RuntimeError::Api {
                status: 404,
                message: format!("no such container: {}", id),
            })?;
        log.containers.remove(position);
        log.removed.push(id.to_string());
        // Volumes are retained on removal.
        Ok(())
    }

    async fn pull_image(
        &self,
        image: &str,
    ) -> Result<BoxStream<'static, Result<PullProgress, RuntimeError>>, RuntimeError> {
        let mut log = self.log.lock().unwrap();
        log.pulled.push(image.to_string());
        let events = if let Some(error) = &log.pull_error {
            vec![Ok(PullProgress {
                error: Some(error.clone()),
                ..Default::default()
            })]
        } else {
            vec![
                Ok(PullProgress {
                    status: Some(format!("Pulling from {}", image)),
                    ..Default::default()
                }),
                Ok(PullProgress {
                    status: Some("Download complete".to_string()),
                    ..Default::default()
                }),
            ]
        };
        Ok(stream::iter(events).boxed())
    }

    async fn container_logs(
        &self,
        _id: &str,
        _follow: bool,
    ) -> Result<BoxStream<'static, Result<Vec<u8>, RuntimeError>>, RuntimeError> {
        let chunks = vec![
            Ok(b"[init] starting workload\n".to_vec()),
            Ok(b"[init] ready\n".to_vec()),
        ];
        Ok(stream::iter(chunks).boxed())
    }
}

/// Connector fake handing out clones of one shared runtime.
pub struct FakeConnector {
    pub runtime: FakeRuntime,
    pub hosts: Arc<Mutex<Vec<String>>>,
}

impl FakeConnector {
    pub fn new(runtime: FakeRuntime) -> Self {
        Self {
            runtime,
            hosts: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[async_trait]
impl RuntimeConnector for FakeConnector {
    type Runtime = FakeRuntime;

    async fn connect(&self, host: &str) -> Result<FakeRuntime, RuntimeError> {
        self.hosts.lock().unwrap().push(host.to_string());
        Ok(self.runtime.clone())
    }
}
