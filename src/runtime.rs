//! The session task: a single writer that owns the game session

use crate::config::SessionConfig;
use crate::coordinator::{SessionCommand, SessionCoordinator};
use crate::deadline::DeadlineTimer;
use crate::protocol::{ClientMessage, Outbound};
use crate::state::{Outbox, TimerOp};
use crate::types::{ParticipantId, SessionSnapshot};
use tokio::sync::{broadcast, mpsc, oneshot};

const COMMAND_CAPACITY: usize = 256;
const EVENT_CAPACITY: usize = 256;

/// Cheap, cloneable access to the running session
#[derive(Clone)]
pub struct SessionHandle {
    cmd_tx: mpsc::Sender<SessionCommand>,
    event_tx: broadcast::Sender<Outbound>,
}

impl SessionHandle {
    /// Queue a client command. Returns false if the session task has stopped.
    pub async fn send(&self, sender: &str, msg: ClientMessage) -> bool {
        self.cmd_tx
            .send(SessionCommand::Client {
                sender: sender.to_string(),
                msg,
            })
            .await
            .is_ok()
    }

    pub async fn disconnect(&self, sender: &str) {
        let _ = self
            .cmd_tx
            .send(SessionCommand::Disconnect {
                sender: sender.to_string(),
            })
            .await;
    }

    /// Receive every outbound event; callers filter with `Outbound::is_for`
    pub fn subscribe(&self) -> broadcast::Receiver<Outbound> {
        self.event_tx.subscribe()
    }

    /// Point-in-time copy of the session, taken between two commands
    pub async fn snapshot(&self) -> Option<SessionSnapshot> {
        let (reply, rx) = oneshot::channel();
        self.cmd_tx
            .send(SessionCommand::Snapshot { reply })
            .await
            .ok()?;
        rx.await.ok()
    }
}

/// Spawn the session task and return a handle to it
pub fn spawn_session(config: SessionConfig) -> SessionHandle {
    let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_CAPACITY);
    let (event_tx, _) = broadcast::channel(EVENT_CAPACITY);

    let timer = DeadlineTimer::new(cmd_tx.downgrade());
    let coordinator = SessionCoordinator::new(config);

    tokio::spawn(session_task(coordinator, timer, cmd_rx, event_tx.clone()));
    tracing::info!("Session task started");

    SessionHandle { cmd_tx, event_tx }
}

async fn session_task(
    mut coordinator: SessionCoordinator,
    mut timer: DeadlineTimer,
    mut cmd_rx: mpsc::Receiver<SessionCommand>,
    event_tx: broadcast::Sender<Outbound>,
) {
    while let Some(cmd) = cmd_rx.recv().await {
        let outbox = coordinator.handle(cmd);
        apply(outbox, &mut timer, &event_tx);
    }

    timer.cancel();
    tracing::info!("Session task ended");
}

fn apply(outbox: Outbox, timer: &mut DeadlineTimer, event_tx: &broadcast::Sender<Outbound>) {
    match outbox.timer {
        Some(TimerOp::Arm { epoch, after }) => timer.arm(epoch, after),
        Some(TimerOp::Cancel) => timer.cancel(),
        None => {}
    }

    for outbound in outbox.messages {
        // No subscribers is fine
        let _ = event_tx.send(outbound);
    }
}
