//! Service host loop.
//!
//! The controller is owned by a single tokio task. Commands arrive over an
//! mpsc queue, so at most one lifecycle transition runs at a time, and every
//! caller gets the resulting [`HostDirective`] back on a oneshot.
//!
//! A headless host keeps the session up until SIGINT or SIGTERM:
//!
//! ```rust,ignore
//! let handle = ServiceHost::spawn(controller, DEFAULT_QUEUE_DEPTH);
//! handle.submit(Command::Start { request, callback: None }).await?;
//! handle.run_until_signal().await?;
//! ```

use crate::command::{Command, HostDirective};
use crate::controller::SessionController;
use crate::error::{Result, SessionError};
use crate::session::{SessionEvent, SessionStatus};
use std::io;
use tokio::signal;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Default command queue depth
pub const DEFAULT_QUEUE_DEPTH: usize = 16;

/// Messages sent to the host task
#[derive(Debug)]
enum HostMessage {
    Command {
        command: Command,
        reply: oneshot::Sender<HostDirective>,
    },
    Status {
        reply: oneshot::Sender<SessionStatus>,
    },
    /// Tear down and exit
    Shutdown,
}

/// Spawns the task that owns a [`SessionController`]
pub struct ServiceHost;

impl ServiceHost {
    /// Move `controller` onto its own task and return a handle to it.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(controller: SessionController, queue_depth: usize) -> ServiceHandle {
        let (tx, rx) = mpsc::channel(queue_depth.max(1));
        let events_source = controller.subscribe();

        let task = tokio::spawn(async move {
            info!("VeilNet service host started");
            run_host_loop(controller, rx).await;
            info!("VeilNet service host stopped");
        });

        ServiceHandle {
            tx,
            events_source,
            task: Some(task),
        }
    }
}

async fn run_host_loop(mut controller: SessionController, mut rx: mpsc::Receiver<HostMessage>) {
    loop {
        let Some(msg) = rx.recv().await else {
            // Every handle is gone
            debug!("Host channel closed, shutting down");
            controller.dispatch(Command::Destroy).await;
            break;
        };

        match msg {
            HostMessage::Command { command, reply } => {
                let directive = controller.dispatch(command).await;
                // Caller may have stopped waiting
                let _ = reply.send(directive);
            }
            HostMessage::Status { reply } => {
                let _ = reply.send(controller.status().await);
            }
            HostMessage::Shutdown => {
                debug!("Host received shutdown");
                controller.dispatch(Command::Destroy).await;
                break;
            }
        }
    }
}

/// Client side of a running host
pub struct ServiceHandle {
    tx: mpsc::Sender<HostMessage>,
    events_source: broadcast::Receiver<SessionEvent>,
    task: Option<JoinHandle<()>>,
}

impl ServiceHandle {
    /// Queue a command and wait for the host's directive
    pub async fn submit(&self, command: Command) -> Result<HostDirective> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(HostMessage::Command { command, reply })
            .await
            .map_err(|_| SessionError::HostClosed)?;
        rx.await.map_err(|_| SessionError::HostClosed)
    }

    /// Deliver an OS permission revocation
    pub async fn revoke(&self) -> Result<HostDirective> {
        self.submit(Command::Revoke).await
    }

    /// Current session status
    pub async fn status(&self) -> Result<SessionStatus> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(HostMessage::Status { reply })
            .await
            .map_err(|_| SessionError::HostClosed)?;
        rx.await.map_err(|_| SessionError::HostClosed)
    }

    /// Subscribe to lifecycle events
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events_source.resubscribe()
    }

    /// Tear down any session and wait for the host task to exit
    pub async fn shutdown(mut self) -> Result<()> {
        // Host may already be gone; the join below still settles
        let _ = self.tx.send(HostMessage::Shutdown).await;

        if let Some(task) = self.task.take() {
            task.await.map_err(|_| SessionError::HostClosed)?;
        }
        Ok(())
    }

    /// Keep the host running until `trigger` resolves, then shut down
    pub async fn run_until<F>(self, trigger: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        trigger.await;
        info!("Shutdown requested");
        self.shutdown().await
    }

    /// Keep the host running until SIGINT or SIGTERM, then shut down.
    ///
    /// The session is torn down even if the signal listener fails; that
    /// failure is returned afterwards.
    pub async fn run_until_signal(self) -> Result<()> {
        let received = wait_for_shutdown().await;
        self.shutdown().await?;
        received.map_err(SessionError::from)
    }
}

async fn wait_for_shutdown() -> io::Result<()> {
    #[cfg(unix)]
    {
        let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())?;
        let mut sigint = signal::unix::signal(signal::unix::SignalKind::interrupt())?;

        tokio::select! {
            _ = sigterm.recv() => {
                info!("Received SIGTERM");
            }
            _ = sigint.recv() => {
                info!("Received SIGINT");
            }
        }
    }

    #[cfg(not(unix))]
    {
        signal::ctrl_c().await?;
        info!("Received Ctrl+C");
    }

    Ok(())
}
