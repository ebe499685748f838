use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque connection-scoped identity
pub type ParticipantId = String;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Waiting,
    Prompt,
    Submitting,
    Voting,
    Results,
    Commenting,
    Ended,
}

impl Phase {
    /// Phases in which a departing host ends the game with a `game_ended` broadcast
    pub fn is_in_progress(self) -> bool {
        !matches!(self, Phase::Waiting | Phase::Ended)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Participant {
    pub id: ParticipantId,
    pub name: String,
    pub emoji: String,
    pub points: u32,
    pub is_host: bool,
    /// Registration sequence number, used for stable leaderboard ordering
    #[serde(skip)]
    pub joined_seq: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Artifact {
    pub url: String,
    pub preview_url: String,
}

/// Artifact as shown during voting: no owner details beyond the id
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VotingArtifact {
    pub id: ParticipantId,
    pub url: String,
    pub preview_url: String,
}

/// Artifact as shown during commenting (owner revealed)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OwnedArtifact {
    pub id: ParticipantId,
    pub owner_name: String,
    pub owner_emoji: String,
    pub url: String,
    pub preview_url: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CommentEntry {
    pub voted_target_id: Option<ParticipantId>,
    pub vote_comment: Option<String>,
    pub own_target_id: Option<ParticipantId>,
    pub own_comment: Option<String>,
}

/// One artifact's outcome for a round
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ArtifactResult {
    pub owner_id: ParticipantId,
    pub owner_name: String,
    pub owner_emoji: String,
    pub url: String,
    pub preview_url: String,
    pub votes: u32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum CommentKind {
    Vote,
    Own,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecordedComment {
    pub commenter_id: ParticipantId,
    pub commenter_name: String,
    pub comment: String,
    pub kind: CommentKind,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecordedArtifact {
    pub owner_id: ParticipantId,
    pub owner_name: String,
    pub owner_emoji: String,
    pub url: String,
    pub preview_url: String,
    pub votes: u32,
    pub comments: Vec<RecordedComment>,
}

/// Immutable history entry for a completed round
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoundRecord {
    pub round: u32,
    pub prompt: String,
    pub artifacts: Vec<RecordedArtifact>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Winner {
    None,
    Single { participant: Participant },
    Tie { participants: Vec<Participant> },
}

/// Pending auto-advance for the current phase
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Deadline {
    pub epoch: u64,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionSnapshot {
    pub phase: Phase,
    pub current_round: u32,
    pub max_rounds: u32,
    pub current_prompt: String,
    pub host_id: Option<ParticipantId>,
    pub participants: Vec<Participant>,
    pub submission_count: usize,
    pub deadline: Option<DateTime<Utc>>,
    pub history: Vec<RoundRecord>,
}
