use crate::types::*;
use std::collections::HashMap;

/// Assemble the history entry for a finished round from the results frozen at
/// tally time and whatever comments were collected (possibly none).
pub fn build_round_record(
    round: u32,
    prompt: &str,
    results: &[ArtifactResult],
    comments: &HashMap<ParticipantId, CommentEntry>,
    participants: &HashMap<ParticipantId, Participant>,
) -> RoundRecord {
    let mut commenters: Vec<(&ParticipantId, &CommentEntry)> = comments.iter().collect();
    commenters.sort_by_key(|(id, _)| {
        participants
            .get(*id)
            .map(|p| p.joined_seq)
            .unwrap_or(u64::MAX)
    });

    let commenter_name = |id: &str| {
        participants
            .get(id)
            .map(|p| p.name.clone())
            .unwrap_or_else(|| "Anonymous".to_string())
    };

    let artifacts = results
        .iter()
        .map(|result| {
            let mut recorded = Vec::new();
            for (commenter_id, entry) in &commenters {
                if let Some(text) =
                    attributed(&entry.voted_target_id, &entry.vote_comment, &result.owner_id)
                {
                    recorded.push(RecordedComment {
                        commenter_id: (*commenter_id).clone(),
                        commenter_name: commenter_name(commenter_id),
                        comment: text,
                        kind: CommentKind::Vote,
                    });
                }
                if let Some(text) =
                    attributed(&entry.own_target_id, &entry.own_comment, &result.owner_id)
                {
                    recorded.push(RecordedComment {
                        commenter_id: (*commenter_id).clone(),
                        commenter_name: commenter_name(commenter_id),
                        comment: text,
                        kind: CommentKind::Own,
                    });
                }
            }

            RecordedArtifact {
                owner_id: result.owner_id.clone(),
                owner_name: result.owner_name.clone(),
                owner_emoji: result.owner_emoji.clone(),
                url: result.url.clone(),
                preview_url: result.preview_url.clone(),
                votes: result.votes,
                comments: recorded,
            }
        })
        .collect();

    RoundRecord {
        round,
        prompt: prompt.to_string(),
        artifacts,
    }
}

/// Comment text if it targets `owner` and is not blank
fn attributed(
    target: &Option<ParticipantId>,
    text: &Option<String>,
    owner: &str,
) -> Option<String> {
    match (target, text) {
        (Some(t), Some(text)) if t == owner && !text.trim().is_empty() => {
            Some(text.trim().to_string())
        }
        _ => None,
    }
}
