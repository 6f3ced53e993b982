//! Deployment orchestrator
//!
//! Sequences provisioning, remote access, bootstrap, and container
//! bring-up into one pipeline, and owns the rollback policy: any failure
//! after an instance id exists terminates that instance exactly once
//! before the error surfaces. No billable resource may be leaked on
//! failure.

use std::future::Future;

use futures::StreamExt;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::container::runtime::RuntimeConnector;
use crate::container::service::ContainerService;
use crate::deploy::fsm::{DeploymentEvent, DeploymentFsm, DeploymentState};
use crate::errors::DeployError;
use crate::models::container::{ContainerInstance, ContainerSpec, ContainerState};
use crate::models::instance::{ComputeInstance, InstanceState};
use crate::models::plan::DeploymentPlan;
use crate::provision::provisioner::InstanceProvisioner;
use crate::remote::bootstrap::RemoteBootstrapper;
use crate::remote::client::RemoteAccessClient;
use crate::remote::shell::{RemoteShell, ShellIdentity, ShellSession};

/// Result of a completed (explicitly stopped) run. The workload is left
/// running: teardown on the happy path is the operator's decision, not
/// the orchestrator's.
#[derive(Debug, Clone)]
pub struct DeploymentReport {
    pub run_id: Uuid,
    pub instance: ComputeInstance,
    pub container: ContainerInstance,
    pub final_state: DeploymentState,
}

/// Drives one deployment run end to end.
pub struct DeploymentOrchestrator<S: RemoteShell, C: RuntimeConnector> {
    provisioner: InstanceProvisioner,
    access: RemoteAccessClient<S>,
    connector: C,
    bootstrapper: RemoteBootstrapper,
    identity: ShellIdentity,
}

impl<S: RemoteShell, C: RuntimeConnector> DeploymentOrchestrator<S, C> {
    pub fn new(
        provisioner: InstanceProvisioner,
        access: RemoteAccessClient<S>,
        connector: C,
        bootstrapper: RemoteBootstrapper,
        identity: ShellIdentity,
    ) -> Self {
        Self {
            provisioner,
            access,
            connector,
            bootstrapper,
            identity,
        }
    }

    /// Run the pipeline. Container log output and bootstrap script output
    /// are mirrored to `log_sink`; the run blocks in the log-streaming
    /// state until `stop` resolves, then detaches and leaves the workload
    /// running.
    pub async fn run(
        &self,
        plan: &DeploymentPlan,
        spec: &ContainerSpec,
        log_sink: mpsc::Sender<Vec<u8>>,
        stop: impl Future<Output = ()> + Send,
    ) -> Result<DeploymentReport, DeployError> {
        let run_id = Uuid::new_v4();
        info!("Starting deployment {} (plan {})", run_id, plan.name);

        let mut fsm = DeploymentFsm::new();
        let mut launched: Option<ComputeInstance> = None;

        match self
            .execute(run_id, plan, spec, &mut fsm, &mut launched, log_sink, stop)
            .await
        {
            Ok(report) => Ok(report),
            Err(err) => {
                let _ = fsm.process(DeploymentEvent::Fail(err.to_string()));
                self.rollback(&launched, &err).await;
                Err(err)
            }
        }
    }

    /// Terminate the launched instance, if one exists. A timeout error
    /// carries the instance id even though launch returned no instance.
    /// Rollback failure is reported but never masks the original error.
    async fn rollback(&self, launched: &Option<ComputeInstance>, err: &DeployError) {
        let instance_id = launched.as_ref().map(|instance| instance.id.clone()).or_else(
            || match err {
                DeployError::ProvisioningTimeout { instance_id, .. } => instance_id.clone(),
                _ => None,
            },
        );

        let Some(id) = instance_id else {
            info!("No instance launched; nothing to roll back");
            return;
        };

        info!("Rolling back: terminating instance {}", id);
        if let Err(rollback_err) = self.provisioner.terminate(&id).await {
            error!(
                "Rollback failed, instance {} may be leaked: {}",
                id, rollback_err
            );
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn execute(
        &self,
        run_id: Uuid,
        plan: &DeploymentPlan,
        spec: &ContainerSpec,
        fsm: &mut DeploymentFsm,
        launched: &mut Option<ComputeInstance>,
        log_sink: mpsc::Sender<Vec<u8>>,
        stop: impl Future<Output = ()> + Send,
    ) -> Result<DeploymentReport, DeployError> {
        step(fsm, DeploymentEvent::Launch)?;
        let mut instance = self.provisioner.launch(plan).await?;
        *launched = Some(instance.clone());
        step(fsm, DeploymentEvent::Ready)?;

        let host = instance
            .public_address
            .clone()
            .ok_or_else(|| DeployError::Cloud("instance has no public address".to_string()))?;

        step(fsm, DeploymentEvent::Connect)?;
        let target = self.identity.target(&host);
        let mut session = self.access.connect_with_retry(&target).await?;
        step(fsm, DeploymentEvent::Connected)?;

        step(fsm, DeploymentEvent::Bootstrap)?;
        let bootstrap_result = self
            .bootstrapper
            .bootstrap(&mut session, log_sink.clone())
            .await;
        // The session is single-use; close it on both exit paths.
        if let Err(close_err) = session.close().await {
            warn!("Failed to close remote session: {}", close_err);
        }
        bootstrap_result?;
        step(fsm, DeploymentEvent::Bootstrapped)?;

        let runtime = self
            .connector
            .connect(&host)
            .await
            .map_err(DeployError::Runtime)?;
        let containers = ContainerService::new(runtime);

        step(fsm, DeploymentEvent::PullImage)?;
        let mut container = containers.create(spec).await?;
        step(fsm, DeploymentEvent::ImagePulled)?;

        containers.start(&container.id).await?;
        container.state = ContainerState::Running;
        step(fsm, DeploymentEvent::Started)?;

        step(fsm, DeploymentEvent::StreamLogs)?;
        let logs = containers.stream_logs(&container.id, true).await?;
        let mirror = tokio::spawn(async move {
            let mut logs = logs;
            while let Some(chunk) = logs.next().await {
                match chunk {
                    Ok(chunk) => {
                        if log_sink.send(chunk).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        warn!("Log stream interrupted: {}", e);
                        break;
                    }
                }
            }
        });

        // Log streaming is not an exit condition: the run stays here
        // until the external stop signal resolves, even if the stream
        // itself ends.
        info!("Deployment {} streaming logs; waiting for stop signal", run_id);
        stop.await;
        info!("Stop signal received; detaching from {}", container.id);
        mirror.abort();
        let _ = mirror.await;

        step(fsm, DeploymentEvent::Stop)?;
        instance.state = InstanceState::Running;
        Ok(DeploymentReport {
            run_id,
            instance,
            container,
            final_state: fsm.state().clone(),
        })
    }
}

fn step(fsm: &mut DeploymentFsm, event: DeploymentEvent) -> Result<(), DeployError> {
    fsm.process(event).map_err(DeployError::InvalidTransition)
}
