//! Setup commands run before a driver connects
//!
//! Every process is spawned with `kill_on_drop` and tied to the connection's
//! [`LifetimeToken`]: foreground commands are abandoned (and killed) when the
//! token fires, background commands are killed when it fires later.

use std::process::Stdio;
use std::time::Duration;
use tessera_core::{Result, TesseraError};
use tokio::net::TcpStream;
use tokio::process::Command;
use tokio::task::JoinHandle;

use crate::{LifetimeToken, SetupCommand};

const PORT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// A setup command that stays up for its connection's lifetime.
///
/// Dropping the handle kills the process.
pub struct BackgroundProcess {
    command: String,
    task: JoinHandle<()>,
}

impl BackgroundProcess {
    pub fn command(&self) -> &str {
        &self.command
    }

    /// True once the process exited or was killed
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for BackgroundProcess {
    fn drop(&mut self) {
        self.task.abort();
    }
}

impl std::fmt::Debug for BackgroundProcess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackgroundProcess")
            .field("command", &self.command)
            .field("finished", &self.is_finished())
            .finish()
    }
}

fn shell(command: &str) -> Command {
    #[cfg(windows)]
    let mut cmd = {
        let mut cmd = Command::new("cmd");
        cmd.arg("/C").arg(command);
        cmd
    };
    #[cfg(not(windows))]
    let mut cmd = {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(command);
        cmd
    };
    cmd.stdin(Stdio::null()).kill_on_drop(true);
    cmd
}

fn spawn_error(command: &str, err: std::io::Error) -> TesseraError {
    TesseraError::Connection(format!("Failed to start setup command `{}`: {}", command, err))
}

/// Run a connection's setup commands in order.
///
/// Returns the background processes, which must be kept alive as long as
/// the connection. On error everything started so far is killed.
#[tracing::instrument(skip_all, fields(count = commands.len()))]
pub async fn run_setup_commands(
    commands: &[SetupCommand],
    lifetime: &LifetimeToken,
    default_port_timeout: Duration,
) -> Result<Vec<BackgroundProcess>> {
    let mut background = Vec::new();
    for command in commands {
        if command.background {
            background.push(spawn_background(command, lifetime)?);
        } else {
            run_foreground(command, lifetime).await?;
        }

        if let Some(port) = command.wait_port {
            let timeout = command
                .wait_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(default_port_timeout);
            wait_for_port(port, timeout, lifetime).await?;
        }
    }
    Ok(background)
}

async fn run_foreground(command: &SetupCommand, lifetime: &LifetimeToken) -> Result<()> {
    tracing::info!(command = %command.run, "running setup command");
    let child = shell(&command.run)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| spawn_error(&command.run, e))?;

    // A cancelled wait drops the child, which kills it
    let output = lifetime
        .guard(async { child.wait_with_output().await.map_err(TesseraError::Io) })
        .await?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(TesseraError::Connection(format!(
            "Setup command `{}` failed ({}): {}",
            command.run,
            output.status,
            stderr.trim()
        )));
    }
    tracing::debug!(command = %command.run, "setup command finished");
    Ok(())
}

fn spawn_background(command: &SetupCommand, lifetime: &LifetimeToken) -> Result<BackgroundProcess> {
    tracing::info!(command = %command.run, "starting background setup command");
    let mut child = shell(&command.run)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| spawn_error(&command.run, e))?;

    let token = lifetime.clone();
    let run = command.run.clone();
    let task = tokio::spawn(async move {
        let cancelled = tokio::select! {
            _ = token.cancelled() => true,
            status = child.wait() => {
                match status {
                    Ok(status) => tracing::warn!(command = %run, %status, "background setup command exited"),
                    Err(e) => tracing::warn!(command = %run, error = %e, "lost background setup command"),
                }
                false
            }
        };
        if cancelled {
            tracing::debug!(command = %run, "stopping background setup command");
            if let Err(e) = child.kill().await {
                tracing::warn!(command = %run, error = %e, "failed to kill background setup command");
            }
        }
    });

    Ok(BackgroundProcess {
        command: command.run.clone(),
        task,
    })
}

/// Wait until something accepts TCP connections on `127.0.0.1:port`.
pub async fn wait_for_port(port: u16, timeout: Duration, lifetime: &LifetimeToken) -> Result<()> {
    tracing::debug!(port, ?timeout, "waiting for local port");
    let probe = async {
        while TcpStream::connect(("127.0.0.1", port)).await.is_err() {
            tokio::time::sleep(PORT_POLL_INTERVAL).await;
        }
    };

    lifetime
        .guard(async {
            tokio::time::timeout(timeout, probe).await.map_err(|_| {
                TesseraError::Timeout(format!(
                    "port {} did not accept connections within {:?}",
                    port, timeout
                ))
            })
        })
        .await
}
