use std::sync::Arc;
use tokio::sync::watch;

/// A struct which can be used to shut down a simulation.
/// You can create multiple connected shutdowns by cloning.
#[derive(Debug, Clone)]
pub struct Shutdown {
    /// This channel can be used tell the simulation to shut down.
    notify: Arc<watch::Sender<Option<ExitStatus>>>,
    /// Sees the status once one was sent, even if it was sent before anyone
    /// started waiting.
    status: watch::Receiver<Option<ExitStatus>>,
}

impl Shutdown {
    /// Creates a new active shutdown.
    pub fn new() -> Self {
        let (notify, status) = watch::channel(None);
        Self {
            notify: Arc::new(notify),
            status,
        }
    }

    /// Sends `ExitStatus::Exited` to all `Shutdowns` cloned from this one.
    pub fn shut_down(&self) {
        self.shut_down_with_status(ExitStatus::Exited)
    }

    /// Sends `status` to all `Shutdowns` cloned from this one. Only the first
    /// status sent sticks.
    pub fn shut_down_with_status(&self, status: ExitStatus) {
        let sent = self.notify.send_if_modified(|current| match current {
            Some(_) => false,
            None => {
                *current = Some(status);
                true
            }
        });
        if sent {
            tracing::info!(?status, "Shutting down");
        }
    }

    /// The status the simulation was shut down with, if it was.
    pub fn status(&self) -> Option<ExitStatus> {
        *self.status.borrow()
    }

    /// Waits to receive a shutdown status.
    pub async fn wait_for_shutdown(&mut self) -> ExitStatus {
        loop {
            if let Some(status) = *self.status.borrow_and_update() {
                return status;
            }
            // Every shutdown holds the sender, so this one being alive keeps
            // the channel open.
            if self.status.changed().await.is_err() {
                return ExitStatus::Exited;
            }
        }
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ExitStatus {
    /// The simulation ran to completion
    Exited,
    /// The simulation was cut short by its time limit
    TimedOut,
    /// An endpoint reported an error
    Failed,
    /// The user asked the simulation to stop
    Interrupted,
}
