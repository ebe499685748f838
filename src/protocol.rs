use crate::types::*;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Inbound frames from a connected client. The sender identity is supplied by
/// the transport, never by the payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ClientMessage {
    CheckHost,
    Join {
        name: String,
        emoji: String,
        #[serde(default)]
        wants_host: bool,
    },
    Start {
        #[serde(default)]
        max_rounds: Option<u32>,
    },
    PromptSubmit {
        prompt: String,
    },
    ArtifactSubmit {
        url: String,
        #[serde(default)]
        preview_url: Option<String>,
    },
    VoteCast {
        target_id: ParticipantId,
    },
    CommentSubmit {
        #[serde(default)]
        voted_target_id: Option<ParticipantId>,
        #[serde(default)]
        vote_comment: Option<String>,
        #[serde(default)]
        own_target_id: Option<ParticipantId>,
        #[serde(default)]
        own_comment: Option<String>,
    },
    RequestCommenting,
    RequestNextRound,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ServerMessage {
    HostStatus {
        has_host: bool,
    },
    Joined {
        participant_id: ParticipantId,
        is_host: bool,
    },
    RosterUpdated {
        participants: Vec<Participant>,
    },
    SessionState {
        phase: Phase,
        round: u32,
        max_rounds: u32,
        prompt: String,
        host: Option<ParticipantId>,
    },
    SubmittingStarted {
        prompt: String,
        deadline: Option<DateTime<Utc>>,
    },
    SubmissionProgress {
        count: usize,
        total: usize,
    },
    VotingStarted {
        artifacts: Vec<VotingArtifact>,
        deadline: Option<DateTime<Utc>>,
    },
    VoteTallyUpdated {
        counts: HashMap<ParticipantId, u32>,
    },
    ResultsReady {
        results: Vec<ArtifactResult>,
        leaderboard: Vec<Participant>,
        is_final_round: bool,
        deadline: Option<DateTime<Utc>>,
        has_artifacts: bool,
    },
    CommentingStarted {
        artifacts: Vec<OwnedArtifact>,
        voter_map: HashMap<ParticipantId, ParticipantId>,
        deadline: Option<DateTime<Utc>>,
    },
    CommentProgress {
        count: usize,
        total: usize,
    },
    GameEnded {
        leaderboard: Vec<Participant>,
        winner: Winner,
        history: Vec<RoundRecord>,
        #[serde(skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
    SessionReset {
        message: String,
    },
    ErrorNotice {
        message: String,
    },
}

/// Who should receive an outbound message
#[derive(Debug, Clone, PartialEq)]
pub enum Recipient {
    All,
    Participant(ParticipantId),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Outbound {
    pub to: Recipient,
    pub msg: ServerMessage,
}

impl Outbound {
    pub fn is_for(&self, id: &str) -> bool {
        match &self.to {
            Recipient::All => true,
            Recipient::Participant(target) => target == id,
        }
    }
}
