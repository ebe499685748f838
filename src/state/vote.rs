use super::GameSession;
use crate::types::*;
use std::collections::HashMap;

impl GameSession {
    /// Record a vote, dropping any earlier vote by the same voter so that each
    /// voter holds at most one vote across the whole map.
    pub fn cast_vote(&mut self, voter: &str, target: &str) {
        for voters in self.votes.values_mut() {
            voters.remove(voter);
        }
        self.votes.retain(|_, voters| !voters.is_empty());

        self.votes
            .entry(target.to_string())
            .or_default()
            .insert(voter.to_string());
    }

    /// Vote count per targeted artifact owner
    pub fn vote_counts(&self) -> HashMap<ParticipantId, u32> {
        self.votes
            .iter()
            .map(|(target, voters)| (target.clone(), voters.len() as u32))
            .collect()
    }

    pub fn total_votes(&self) -> usize {
        self.votes.values().map(|voters| voters.len()).sum()
    }

    /// voter id -> voted target id
    pub fn voter_map(&self) -> HashMap<ParticipantId, ParticipantId> {
        self.votes
            .iter()
            .flat_map(|(target, voters)| {
                voters
                    .iter()
                    .map(move |voter| (voter.clone(), target.clone()))
            })
            .collect()
    }
}
