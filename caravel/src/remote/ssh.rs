//! SSH transport implementation

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use russh::client;
use russh::{ChannelMsg, Disconnect};
use russh_keys::key;
use tracing::debug;

use crate::remote::shell::{
    ExecOutput, RemoteShell, ScriptDelivery, ScriptOutcome, ShellError, ShellSession, ShellTarget,
};

/// SSH client transport backed by russh.
pub struct SshTransport {
    inactivity_timeout: Duration,
}

impl SshTransport {
    pub fn new() -> Self {
        Self {
            inactivity_timeout: Duration::from_secs(3600),
        }
    }
}

impl Default for SshTransport {
    fn default() -> Self {
        Self::new()
    }
}

/// Client handler. The target host is freshly provisioned and its host
/// key unknown, so any server key is accepted; the trust anchor is the
/// key-pair identity installed at launch.
struct AcceptingHandler;

#[async_trait]
impl client::Handler for AcceptingHandler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        _server_public_key: &key::PublicKey,
    ) -> Result<bool, Self::Error> {
        Ok(true)
    }
}

#[async_trait]
impl RemoteShell for SshTransport {
    type Session = SshSession;

    async fn connect(&self, target: &ShellTarget) -> Result<SshSession, ShellError> {
        let key_pair = russh_keys::load_secret_key(&target.key_path, None)
            .map_err(|e| ShellError::Auth(format!("unable to load private key: {}", e)))?;

        let config = Arc::new(client::Config {
            inactivity_timeout: Some(self.inactivity_timeout),
            ..Default::default()
        });

        let mut handle = client::connect(
            config,
            (target.host.as_str(), target.port),
            AcceptingHandler,
        )
        .await
        .map_err(|e| ShellError::Connect(e.to_string()))?;

        let authenticated = handle
            .authenticate_publickey(target.user.as_str(), Arc::new(key_pair))
            .await
            .map_err(|e| ShellError::Connect(e.to_string()))?;
        if !authenticated {
            return Err(ShellError::Auth(format!(
                "public key rejected for {}@{}",
                target.user, target.host
            )));
        }

        debug!("SSH session established with {}", target.address());
        Ok(SshSession { handle })
    }
}

/// An authenticated SSH session.
pub struct SshSession {
    handle: client::Handle<AcceptingHandler>,
}

impl SshSession {
    fn lost(err: russh::Error) -> ShellError {
        ShellError::SessionLost(err.to_string())
    }
}

#[async_trait]
impl ShellSession for SshSession {
    async fn execute(&mut self, command: &str) -> Result<ExecOutput, ShellError> {
        let mut channel = self
            .handle
            .channel_open_session()
            .await
            .map_err(Self::lost)?;
        channel.exec(true, command).await.map_err(Self::lost)?;

        let mut output = Vec::new();
        let mut exit_code = None;
        while let Some(msg) = channel.wait().await {
            match msg {
                ChannelMsg::Data { ref data } => output.extend_from_slice(data),
                ChannelMsg::ExtendedData { ref data, .. } => output.extend_from_slice(data),
                ChannelMsg::ExitStatus { exit_status } => exit_code = Some(exit_status),
                _ => {}
            }
        }

        match exit_code {
            Some(exit_code) => Ok(ExecOutput { output, exit_code }),
            None => Err(ShellError::SessionLost(
                "channel closed without exit status".to_string(),
            )),
        }
    }

    async fn run_script(
        &mut self,
        script: &[u8],
        delivery: ScriptDelivery,
    ) -> Result<ScriptOutcome, ShellError> {
        let mut channel = self
            .handle
            .channel_open_session()
            .await
            .map_err(Self::lost)?;

        // The script is piped to the remote shell's stdin rather than
        // uploaded as a file.
        channel.exec(true, "bash -s").await.map_err(Self::lost)?;
        channel.data(script).await.map_err(Self::lost)?;
        channel.eof().await.map_err(Self::lost)?;

        let mut captured = Vec::new();
        let mut exit_code = None;
        while let Some(msg) = channel.wait().await {
            let chunk: Option<Vec<u8>> = match msg {
                ChannelMsg::Data { ref data } => Some(data.to_vec()),
                ChannelMsg::ExtendedData { ref data, .. } => Some(data.to_vec()),
                ChannelMsg::ExitStatus { exit_status } => {
                    exit_code = Some(exit_status);
                    None
                }
                _ => None,
            };
            if let Some(chunk) = chunk {
                match &delivery {
                    ScriptDelivery::Buffered => captured.extend_from_slice(&chunk),
                    ScriptDelivery::Streaming(observer) => {
                        // A closed observer only stops mirroring; the
                        // remote process still runs to completion.
                        let _ = observer.send(chunk).await;
                    }
                }
            }
        }

        match exit_code {
            Some(exit_code) => Ok(ScriptOutcome {
                exit_code,
                output: captured,
            }),
            None => Err(ShellError::SessionLost(
                "channel closed without exit status".to_string(),
            )),
        }
    }

    async fn close(&mut self) -> Result<(), ShellError> {
        self.handle
            .disconnect(Disconnect::ByApplication, "", "en")
            .await
            .map_err(Self::lost)
    }
}
