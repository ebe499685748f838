//! The single pending phase deadline of a session task

use crate::coordinator::SessionCommand;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Owns at most one sleeping timer. When it fires it posts
/// `DeadlineElapsed { epoch }` back into the session's command queue, where a
/// stale epoch is ignored.
pub struct DeadlineTimer {
    commands: mpsc::WeakSender<SessionCommand>,
    pending: Option<JoinHandle<()>>,
}

impl DeadlineTimer {
    pub fn new(commands: mpsc::WeakSender<SessionCommand>) -> Self {
        Self {
            commands,
            pending: None,
        }
    }

    /// Arm a new deadline, dropping the previous one
    pub fn arm(&mut self, epoch: u64, after: Duration) {
        self.cancel();

        let commands = self.commands.clone();
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(after).await;

            // The session task is gone: nothing to notify
            let Some(tx) = commands.upgrade() else {
                return;
            };
            if tx
                .send(SessionCommand::DeadlineElapsed { epoch })
                .await
                .is_err()
            {
                tracing::debug!(epoch, "Session closed before deadline fired");
            }
        }));
        tracing::debug!(epoch, after_ms = after.as_millis() as u64, "Deadline armed");
    }

    pub fn cancel(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }

    #[cfg(test)]
    fn is_armed(&self) -> bool {
        self.pending
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

impl Drop for DeadlineTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}
