//! Programmatic deployment entry
//!
//! The front door (CLI or HTTP, out of scope) calls `run_deployment`
//! with a control-plane client, a plan, and a container spec.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::app::options::DeployOptions;
use crate::container::engine::DockerConnector;
use crate::deploy::orchestrator::{DeploymentOrchestrator, DeploymentReport};
use crate::errors::DeployError;
use crate::models::container::ContainerSpec;
use crate::models::plan::DeploymentPlan;
use crate::provision::cloud::CloudCompute;
use crate::provision::provisioner::InstanceProvisioner;
use crate::remote::bootstrap::RemoteBootstrapper;
use crate::remote::client::RemoteAccessClient;
use crate::remote::ssh::SshTransport;

/// Wire the production transports and run one deployment.
///
/// `log_sink` receives bootstrap output followed by the container log
/// stream; `stop` ends the run and leaves the workload running.
pub async fn run_deployment(
    cloud: Arc<dyn CloudCompute>,
    options: DeployOptions,
    plan: DeploymentPlan,
    spec: ContainerSpec,
    log_sink: mpsc::Sender<Vec<u8>>,
    stop: impl Future<Output = ()> + Send,
) -> Result<DeploymentReport, DeployError> {
    let provisioner = InstanceProvisioner::new(
        cloud,
        options.image_id.clone(),
        options.key_pair_name.clone(),
        options.provision.clone(),
    );
    let access = RemoteAccessClient::new(SshTransport::new(), options.connect.clone());
    let connector = DockerConnector::new(options.runtime_port);
    let bootstrapper = RemoteBootstrapper::new(options.bootstrap_script.clone());

    let orchestrator = DeploymentOrchestrator::new(
        provisioner,
        access,
        connector,
        bootstrapper,
        options.shell_identity(),
    );
    orchestrator.run(&plan, &spec, log_sink, stop).await
}
