mod game;
mod player;
mod round;
pub mod score;
mod submission;
mod vote;

pub use game::Trigger;
pub use round::build_round_record;

use crate::config::SessionConfig;
use crate::protocol::{Outbound, Recipient, ServerMessage};
use crate::types::*;
use chrono::{TimeDelta, Utc};
use std::collections::{HashMap, HashSet};
use std::time::Duration;

/// Instruction for the single outstanding deadline timer
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TimerOp {
    Arm { epoch: u64, after: Duration },
    Cancel,
}

/// Effects produced by one session command, executed by the session task
#[derive(Debug, Default)]
pub struct Outbox {
    pub messages: Vec<Outbound>,
    /// Only the last timer operation matters: at most one deadline is pending
    pub timer: Option<TimerOp>,
}

impl Outbox {
    pub fn broadcast(&mut self, msg: ServerMessage) {
        self.messages.push(Outbound {
            to: Recipient::All,
            msg,
        });
    }

    pub fn send_to(&mut self, id: &str, msg: ServerMessage) {
        self.messages.push(Outbound {
            to: Recipient::Participant(id.to_string()),
            msg,
        });
    }
}

/// The single shared game session. Owned by the session task; every other
/// component borrows it for the duration of one command.
#[derive(Debug)]
pub struct GameSession {
    pub config: SessionConfig,
    pub phase: Phase,
    pub current_round: u32,
    pub max_rounds: u32,
    pub current_prompt: String,
    pub participants: HashMap<ParticipantId, Participant>,
    pub host_id: Option<ParticipantId>,
    pub submissions: HashMap<ParticipantId, Artifact>,
    /// target id -> voter ids
    pub votes: HashMap<ParticipantId, HashSet<ParticipantId>>,
    pub comments: HashMap<ParticipantId, CommentEntry>,
    pub deadline: Option<Deadline>,
    pub history: Vec<RoundRecord>,
    /// Shuffled order broadcast when voting opened, replayed to late joiners
    pub voting_order: Vec<VotingArtifact>,
    /// Tally frozen when the round entered Results
    pub round_results: Vec<ArtifactResult>,
    epoch: u64,
    next_seq: u64,
}

impl GameSession {
    pub fn new(config: SessionConfig) -> Self {
        let max_rounds = config.default_max_rounds;
        Self {
            config,
            phase: Phase::Waiting,
            current_round: 0,
            max_rounds,
            current_prompt: String::new(),
            participants: HashMap::new(),
            host_id: None,
            submissions: HashMap::new(),
            votes: HashMap::new(),
            comments: HashMap::new(),
            deadline: None,
            history: Vec::new(),
            voting_order: Vec::new(),
            round_results: Vec::new(),
            epoch: 0,
            next_seq: 0,
        }
    }

    /// Current phase epoch. Bumped whenever the pending deadline changes.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn is_final_round(&self) -> bool {
        self.current_round >= self.max_rounds
    }

    /// Arm the phase deadline, superseding any previous one
    pub(crate) fn set_deadline(&mut self, after: Duration, out: &mut Outbox) -> Deadline {
        self.epoch += 1;
        let now = Utc::now();
        let at = TimeDelta::from_std(after)
            .ok()
            .and_then(|d| now.checked_add_signed(d))
            .unwrap_or(now);
        let deadline = Deadline {
            epoch: self.epoch,
            at,
        };
        self.deadline = Some(deadline);
        out.timer = Some(TimerOp::Arm {
            epoch: self.epoch,
            after,
        });
        deadline
    }

    pub(crate) fn clear_deadline(&mut self, out: &mut Outbox) {
        self.epoch += 1;
        if self.deadline.take().is_some() || out.timer.is_some() {
            out.timer = Some(TimerOp::Cancel);
        }
    }

    pub fn deadline_at(&self) -> Option<chrono::DateTime<Utc>> {
        self.deadline.map(|d| d.at)
    }

    /// Discard everything and return to Waiting. The epoch keeps counting so
    /// timers armed before the reset can never match again.
    pub fn reset(&mut self, out: &mut Outbox) {
        self.clear_deadline(out);
        self.phase = Phase::Waiting;
        self.current_round = 0;
        self.max_rounds = self.config.default_max_rounds;
        self.current_prompt.clear();
        self.participants.clear();
        self.host_id = None;
        self.submissions.clear();
        self.votes.clear();
        self.comments.clear();
        self.history.clear();
        self.voting_order.clear();
        self.round_results.clear();
        tracing::info!(epoch = self.epoch, "Session reset to Waiting");
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            phase: self.phase,
            current_round: self.current_round,
            max_rounds: self.max_rounds,
            current_prompt: self.current_prompt.clone(),
            host_id: self.host_id.clone(),
            participants: self.roster(),
            submission_count: self.submissions.len(),
            deadline: self.deadline_at(),
            history: self.history.clone(),
        }
    }

    pub(crate) fn session_state_message(&self) -> ServerMessage {
        ServerMessage::SessionState {
            phase: self.phase,
            round: self.current_round,
            max_rounds: self.max_rounds,
            prompt: self.current_prompt.clone(),
            host: self.host_id.clone(),
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// Session with a host and `players` non-host participants, ids "host", "p1".."pN"
    pub fn session_with_players(players: usize) -> GameSession {
        let mut session = GameSession::new(SessionConfig::default());
        session.register_participant("host", "Host", "🎩", true);
        for i in 1..=players {
            session.register_participant(&format!("p{}", i), &format!("Player {}", i), "😀", false);
        }
        session
    }

    pub fn artifact(url: &str) -> Artifact {
        Artifact {
            url: url.to_string(),
            preview_url: format!("{}?preview", url),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    #[test]
    fn test_new_session_is_waiting() {
        let session = GameSession::new(SessionConfig::default());
        assert_eq!(session.phase, Phase::Waiting);
        assert_eq!(session.current_round, 0);
        assert_eq!(session.max_rounds, 10);
        assert!(session.deadline.is_none());
    }

    #[test]
    fn test_new_deadline_supersedes_previous() {
        let mut session = GameSession::new(SessionConfig::default());
        let mut out = Outbox::default();

        let first = session.set_deadline(Duration::from_secs(60), &mut out);
        let second = session.set_deadline(Duration::from_secs(90), &mut out);

        assert!(second.epoch > first.epoch);
        assert_eq!(session.deadline, Some(second));
        assert_eq!(
            out.timer,
            Some(TimerOp::Arm {
                epoch: second.epoch,
                after: Duration::from_secs(90)
            })
        );
    }

    #[test]
    fn test_clear_deadline_cancels_timer() {
        let mut session = GameSession::new(SessionConfig::default());
        let mut out = Outbox::default();
        let armed = session.set_deadline(Duration::from_secs(60), &mut out);

        session.clear_deadline(&mut out);

        assert!(session.deadline.is_none());
        assert!(session.epoch() > armed.epoch);
        assert_eq!(out.timer, Some(TimerOp::Cancel));
    }

    #[test]
    fn test_reset_keeps_epoch_monotonic() {
        let mut session = session_with_players(2);
        let mut out = Outbox::default();
        let armed = session.set_deadline(Duration::from_secs(60), &mut out);
        session.phase = Phase::Submitting;
        session.current_round = 4;

        session.reset(&mut out);

        assert_eq!(session.phase, Phase::Waiting);
        assert_eq!(session.current_round, 0);
        assert!(session.participants.is_empty());
        assert!(session.host_id.is_none());
        assert!(session.epoch() > armed.epoch);
    }
}
