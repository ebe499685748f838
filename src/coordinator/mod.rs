//! Session coordinator
//!
//! The single entry point for inbound events. Every command is validated
//! against the sender and the current phase here, then dispatched to the
//! host or player handlers. Handlers either mutate the session and fill the
//! outbox, or return an error without touching anything.

use crate::config::SessionConfig;
use crate::error::CommandError;
use crate::protocol::{ClientMessage, ServerMessage};
use crate::state::{GameSession, Outbox};
use crate::types::{ParticipantId, Phase, SessionSnapshot};

/// Everything the session task can be asked to do
#[derive(Debug)]
pub enum SessionCommand {
    Client {
        sender: ParticipantId,
        msg: ClientMessage,
    },
    Disconnect {
        sender: ParticipantId,
    },
    DeadlineElapsed {
        epoch: u64,
    },
    Snapshot {
        reply: tokio::sync::oneshot::Sender<SessionSnapshot>,
    },
}

/// Reject a command unless it comes from the host
macro_rules! require_host {
    ($session:expr, $sender:expr, $command:expr) => {
        if !$session.is_host($sender) {
            return Err(CommandError::GuardViolation {
                command: $command,
                phase: $session.phase,
                reason: "sender is not the host",
            });
        }
    };
}

/// Reject a command unless it comes from a registered non-host participant
macro_rules! require_player {
    ($session:expr, $sender:expr, $command:expr) => {
        if !$session.is_player($sender) {
            return Err(CommandError::GuardViolation {
                command: $command,
                phase: $session.phase,
                reason: "sender is not a registered player",
            });
        }
    };
}

/// Reject a command unless the session is in the given phase
macro_rules! require_phase {
    ($session:expr, $phase:expr, $command:expr) => {
        if $session.phase != $phase {
            return Err(CommandError::GuardViolation {
                command: $command,
                phase: $session.phase,
                reason: "wrong phase",
            });
        }
    };
}

mod host;
mod player;

pub struct SessionCoordinator {
    session: GameSession,
}

impl SessionCoordinator {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            session: GameSession::new(config),
        }
    }

    pub fn session(&self) -> &GameSession {
        &self.session
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.session.snapshot()
    }

    /// Apply one inbound event. Never fails: rejected commands produce either
    /// nothing or an error notice for the requester.
    pub fn handle(&mut self, cmd: SessionCommand) -> Outbox {
        let mut out = Outbox::default();

        let (sender, result) = match cmd {
            SessionCommand::Client { sender, msg } => {
                let result = self.dispatch(&sender, msg, &mut out);
                (Some(sender), result)
            }
            SessionCommand::Disconnect { sender } => {
                let result = player::handle_leave(&mut self.session, &sender, &mut out);
                (Some(sender), result)
            }
            SessionCommand::DeadlineElapsed { epoch } => {
                (None, self.session.on_deadline(epoch, &mut out))
            }
            SessionCommand::Snapshot { reply } => {
                let _ = reply.send(self.session.snapshot());
                (None, Ok(()))
            }
        };

        match result {
            Ok(()) => out,
            Err(err) => {
                let mut out = Outbox::default();
                match (&err, err.notice(), sender) {
                    (_, Some(notice), Some(sender)) => {
                        tracing::info!(participant_id = %sender, "{}", err);
                        out.send_to(&sender, ServerMessage::ErrorNotice { message: notice });
                    }
                    (CommandError::RaceNoop { .. }, _, _) => {
                        tracing::debug!("{}", err);
                    }
                    (_, _, sender) => {
                        tracing::debug!(participant_id = ?sender, "Ignoring stale command: {}", err);
                    }
                }
                out
            }
        }
    }

    fn dispatch(
        &mut self,
        sender: &str,
        msg: ClientMessage,
        out: &mut Outbox,
    ) -> Result<(), CommandError> {
        let session = &mut self.session;

        match msg {
            ClientMessage::CheckHost => {
                out.send_to(
                    sender,
                    ServerMessage::HostStatus {
                        has_host: session.host_id.is_some(),
                    },
                );
                Ok(())
            }

            ClientMessage::Join {
                name,
                emoji,
                wants_host,
            } => player::handle_join(session, sender, name, emoji, wants_host, out),

            ClientMessage::ArtifactSubmit { url, preview_url } => {
                player::handle_submit_artifact(session, sender, url, preview_url, out)
            }

            ClientMessage::VoteCast { target_id } => {
                player::handle_cast_vote(session, sender, target_id, out)
            }

            ClientMessage::CommentSubmit {
                voted_target_id,
                vote_comment,
                own_target_id,
                own_comment,
            } => player::handle_submit_comment(
                session,
                sender,
                crate::types::CommentEntry {
                    voted_target_id,
                    vote_comment,
                    own_target_id,
                    own_comment,
                },
                out,
            ),

            // Host-only commands
            ClientMessage::Start { max_rounds } => {
                require_host!(session, sender, "start");
                host::handle_start(session, max_rounds, out)
            }

            ClientMessage::PromptSubmit { prompt } => {
                require_host!(session, sender, "prompt_submit");
                host::handle_submit_prompt(session, prompt, out)
            }

            ClientMessage::RequestCommenting => {
                require_host!(session, sender, "request_commenting");
                host::handle_request_commenting(session, out)
            }

            ClientMessage::RequestNextRound => {
                require_host!(session, sender, "request_next_round");
                host::handle_request_next_round(session, out)
            }
        }
    }
}

/// True when a late joiner should receive a phase snapshot
pub(crate) fn needs_reconciliation(phase: Phase) -> bool {
    matches!(
        phase,
        Phase::Submitting | Phase::Voting | Phase::Results | Phase::Commenting
    )
}
