//! Remote shell seam
//!
//! A transport produces authenticated sessions; a session executes
//! commands and runs scripts. The SSH implementation lives in
//! `remote::ssh`; tests substitute in-memory fakes.

use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

/// Transport-level errors.
///
/// `Connect`/`Auth` happen while establishing a session and are retried
/// by `RemoteAccessClient`; `SessionLost` is a drop mid-session and is
/// fatal to the run.
#[derive(Error, Debug)]
pub enum ShellError {
    #[error("connection failed: {0}")]
    Connect(String),

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("session lost: {0}")]
    SessionLost(String),
}

/// Where and as whom to connect
#[derive(Debug, Clone)]
pub struct ShellTarget {
    /// Host address
    pub host: String,

    /// Shell port, normally 22
    pub port: u16,

    /// Login user (a provider-specific default, e.g. "ec2-user")
    pub user: String,

    /// Path to the private key authenticating the user
    pub key_path: PathBuf,
}

impl ShellTarget {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// The fixed half of a shell target: who connects, with what key, on
/// which port. The host is only known once an instance is running.
#[derive(Debug, Clone)]
pub struct ShellIdentity {
    /// Login user
    pub user: String,

    /// Path to the private key
    pub key_path: PathBuf,

    /// Shell port
    pub port: u16,
}

impl ShellIdentity {
    pub fn target(&self, host: &str) -> ShellTarget {
        ShellTarget {
            host: host.to_string(),
            port: self.port,
            user: self.user.clone(),
            key_path: self.key_path.clone(),
        }
    }
}

/// Result of a single command
#[derive(Debug, Clone)]
pub struct ExecOutput {
    /// Combined stdout and stderr
    pub output: Vec<u8>,

    /// Remote exit code
    pub exit_code: u32,
}

/// How script output is delivered to the caller
pub enum ScriptDelivery {
    /// Capture all output; return it after the remote process exits
    Buffered,

    /// Mirror output chunks to the observer as they arrive. Required for
    /// long-running bootstrap scripts an operator watches live.
    Streaming(mpsc::Sender<Vec<u8>>),
}

/// Result of a script run
#[derive(Debug, Clone)]
pub struct ScriptOutcome {
    /// Remote exit code
    pub exit_code: u32,

    /// Captured output; empty in streaming mode
    pub output: Vec<u8>,
}

/// An authenticated interactive channel to a remote host's shell.
///
/// Sessions are single-use per bootstrap call; concurrent commands on the
/// same session are not supported. Owners must call `close` on every exit
/// path.
#[async_trait]
pub trait ShellSession: Send {
    /// Run a single command synchronously and return its combined output.
    async fn execute(&mut self, command: &str) -> Result<ExecOutput, ShellError>;

    /// Pipe a script into the remote shell and wait for it to exit.
    async fn run_script(
        &mut self,
        script: &[u8],
        delivery: ScriptDelivery,
    ) -> Result<ScriptOutcome, ShellError>;

    /// Close the underlying transport.
    async fn close(&mut self) -> Result<(), ShellError>;
}

/// A remote shell transport: one `connect` call is one connection attempt.
#[async_trait]
pub trait RemoteShell: Send + Sync {
    type Session: ShellSession;

    async fn connect(&self, target: &ShellTarget) -> Result<Self::Session, ShellError>;
}
