//! Scoring engine: pure functions over the vote map and the roster.

use crate::types::*;
use std::collections::{HashMap, HashSet};

/// Per-artifact results for a round. Every submitted artifact whose owner is
/// still registered appears, including those with zero votes. Sorted by votes
/// descending, ties in registration order.
pub fn tally_round(
    participants: &HashMap<ParticipantId, Participant>,
    submissions: &HashMap<ParticipantId, Artifact>,
    votes: &HashMap<ParticipantId, HashSet<ParticipantId>>,
) -> Vec<ArtifactResult> {
    let mut results: Vec<(u64, ArtifactResult)> = submissions
        .iter()
        .filter_map(|(owner_id, artifact)| {
            let owner = participants.get(owner_id)?;
            let votes = votes.get(owner_id).map(|v| v.len() as u32).unwrap_or(0);
            Some((
                owner.joined_seq,
                ArtifactResult {
                    owner_id: owner_id.clone(),
                    owner_name: owner.name.clone(),
                    owner_emoji: owner.emoji.clone(),
                    url: artifact.url.clone(),
                    preview_url: artifact.preview_url.clone(),
                    votes,
                },
            ))
        })
        .collect();

    results.sort_by(|(seq_a, a), (seq_b, b)| b.votes.cmp(&a.votes).then(seq_a.cmp(seq_b)));
    results.into_iter().map(|(_, r)| r).collect()
}

/// Points earned this round: one per voter, for every registered target
pub fn point_deltas(
    participants: &HashMap<ParticipantId, Participant>,
    votes: &HashMap<ParticipantId, HashSet<ParticipantId>>,
) -> Vec<(ParticipantId, u32)> {
    votes
        .iter()
        .filter(|(target, voters)| !voters.is_empty() && participants.contains_key(*target))
        .map(|(target, voters)| (target.clone(), voters.len() as u32))
        .collect()
}

/// Participants sorted by points descending, stable on registration order
pub fn leaderboard(participants: &HashMap<ParticipantId, Participant>) -> Vec<Participant> {
    let mut list: Vec<Participant> = participants.values().cloned().collect();
    list.sort_by_key(|p| p.joined_seq);
    list.sort_by(|a, b| b.points.cmp(&a.points));
    list
}

/// Winner from a leaderboard: nobody if the top score is zero, every
/// participant sharing the top score on a tie
pub fn determine_winner(leaderboard: &[Participant]) -> Winner {
    let top = leaderboard.iter().map(|p| p.points).max().unwrap_or(0);
    if top == 0 {
        return Winner::None;
    }

    let mut tied: Vec<Participant> = leaderboard
        .iter()
        .filter(|p| p.points == top)
        .cloned()
        .collect();

    if tied.len() == 1 {
        Winner::Single {
            participant: tied.remove(0),
        }
    } else {
        Winner::Tie { participants: tied }
    }
}
