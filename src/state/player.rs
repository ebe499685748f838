use super::GameSession;
use crate::types::*;

impl GameSession {
    /// Register a participant (or refresh an already registered one).
    /// The host flag is granted only when requested and no host exists yet.
    pub fn register_participant(
        &mut self,
        id: &str,
        name: &str,
        emoji: &str,
        wants_host: bool,
    ) -> Participant {
        if let Some(existing) = self.participants.get_mut(id) {
            existing.name = name.to_string();
            existing.emoji = emoji.to_string();
            return existing.clone();
        }

        let is_host = wants_host && self.host_id.is_none();
        if is_host {
            self.host_id = Some(id.to_string());
        }

        self.next_seq += 1;
        let participant = Participant {
            id: id.to_string(),
            name: name.to_string(),
            emoji: emoji.to_string(),
            points: 0,
            is_host,
            joined_seq: self.next_seq,
        };

        self.participants
            .insert(participant.id.clone(), participant.clone());
        tracing::info!(
            participant_id = %participant.id,
            is_host,
            "Participant joined: {}",
            participant.name
        );
        participant
    }

    /// Remove a participant and purge everything they own this round:
    /// their artifact (including its slot in the voting order), their vote,
    /// votes cast for their artifact, and their comment.
    pub fn remove_participant(&mut self, id: &str) -> Option<Participant> {
        let participant = self.participants.remove(id)?;

        if self.host_id.as_deref() == Some(id) {
            self.host_id = None;
        }

        self.submissions.remove(id);
        self.voting_order.retain(|a| a.id != id);
        self.comments.remove(id);
        self.votes.remove(id);
        for voters in self.votes.values_mut() {
            voters.remove(id);
        }
        self.votes.retain(|_, voters| !voters.is_empty());

        tracing::info!(
            participant_id = %id,
            was_host = participant.is_host,
            "Participant left: {}",
            participant.name
        );
        Some(participant)
    }

    pub fn is_host(&self, id: &str) -> bool {
        self.host_id.as_deref() == Some(id)
    }

    /// Registered and not the host
    pub fn is_player(&self, id: &str) -> bool {
        self.participants.contains_key(id) && !self.is_host(id)
    }

    /// Completion threshold for the submitting, voting and commenting phases
    pub fn quorum_denominator(&self) -> usize {
        let hosts = usize::from(self.host_id.is_some());
        self.participants.len() - hosts
    }

    /// All participants in registration order
    pub fn roster(&self) -> Vec<Participant> {
        let mut list: Vec<Participant> = self.participants.values().cloned().collect();
        list.sort_by_key(|p| p.joined_seq);
        list
    }
}
