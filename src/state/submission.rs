use super::GameSession;
use crate::types::*;

impl GameSession {
    /// Store a participant's artifact for this round. Re-submission overwrites,
    /// so the submission count never exceeds one per participant.
    pub fn record_submission(&mut self, id: &str, url: String, preview_url: Option<String>) {
        let preview_url = preview_url
            .filter(|p| !p.trim().is_empty())
            .unwrap_or_else(|| url.clone());

        let replaced = self
            .submissions
            .insert(id.to_string(), Artifact { url, preview_url })
            .is_some();

        tracing::debug!(
            participant_id = %id,
            replaced,
            count = self.submissions.len(),
            "Artifact submitted"
        );
    }

    /// Submitted artifacts in owner registration order
    pub fn voting_artifacts(&self) -> Vec<VotingArtifact> {
        let mut list: Vec<(u64, VotingArtifact)> = self
            .submissions
            .iter()
            .map(|(owner, artifact)| {
                (
                    self.seq_of(owner),
                    VotingArtifact {
                        id: owner.clone(),
                        url: artifact.url.clone(),
                        preview_url: artifact.preview_url.clone(),
                    },
                )
            })
            .collect();
        list.sort_by_key(|(seq, _)| *seq);
        list.into_iter().map(|(_, a)| a).collect()
    }

    /// Submitted artifacts with their owners revealed, for the commenting phase
    pub fn owned_artifacts(&self) -> Vec<OwnedArtifact> {
        self.voting_artifacts()
            .into_iter()
            .map(|a| {
                let owner = self.participants.get(&a.id);
                OwnedArtifact {
                    owner_name: owner
                        .map(|p| p.name.clone())
                        .unwrap_or_else(|| "Unknown".to_string()),
                    owner_emoji: owner
                        .map(|p| p.emoji.clone())
                        .unwrap_or_else(|| "😀".to_string()),
                    id: a.id,
                    url: a.url,
                    preview_url: a.preview_url,
                }
            })
            .collect()
    }

    pub(crate) fn seq_of(&self, id: &str) -> u64 {
        self.participants
            .get(id)
            .map(|p| p.joined_seq)
            .unwrap_or(u64::MAX)
    }
}
