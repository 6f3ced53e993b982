//! Remote shell access and host bootstrap

pub mod bootstrap;
pub mod client;
pub mod shell;
pub mod ssh;

pub use bootstrap::RemoteBootstrapper;
pub use client::{RemoteAccessClient, RetryOptions};
pub use shell::{
    ExecOutput, RemoteShell, ScriptDelivery, ScriptOutcome, ShellError, ShellIdentity,
    ShellSession, ShellTarget,
};
pub use ssh::SshTransport;
