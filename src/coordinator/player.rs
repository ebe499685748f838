use crate::error::{CommandError, CommandResult};
use crate::protocol::ServerMessage;
use crate::state::{GameSession, Outbox};
use crate::types::{CommentEntry, Phase};

const HOST_LEFT_REASON: &str = "Host left";
const HOST_LEFT_NOTICE: &str = "Host left. Returning to lobby...";

/// Handle Join: register (or refresh) the sender and bring them up to date
pub fn handle_join(
    session: &mut GameSession,
    sender: &str,
    name: String,
    emoji: String,
    wants_host: bool,
    out: &mut Outbox,
) -> CommandResult<()> {
    let name = name.trim();
    if name.is_empty() {
        return Err(CommandError::InvalidPayload("name is empty"));
    }

    let participant = session.register_participant(sender, name, &emoji, wants_host);

    out.send_to(
        sender,
        ServerMessage::Joined {
            participant_id: participant.id.clone(),
            is_host: participant.is_host,
        },
    );
    out.broadcast(ServerMessage::HostStatus {
        has_host: session.host_id.is_some(),
    });
    out.broadcast(ServerMessage::RosterUpdated {
        participants: session.roster(),
    });
    out.broadcast(session.session_state_message());

    if super::needs_reconciliation(session.phase) {
        tracing::debug!(
            participant_id = %sender,
            phase = ?session.phase,
            "Sending phase snapshot to late joiner"
        );
        send_phase_snapshot(session, sender, out);
    }

    Ok(())
}

/// Replay the current phase's opening event to a single participant
fn send_phase_snapshot(session: &GameSession, to: &str, out: &mut Outbox) {
    let deadline = session.deadline_at();
    match session.phase {
        Phase::Submitting => out.send_to(
            to,
            ServerMessage::SubmittingStarted {
                prompt: session.current_prompt.clone(),
                deadline,
            },
        ),
        Phase::Voting => {
            out.send_to(
                to,
                ServerMessage::VotingStarted {
                    artifacts: session.voting_order.clone(),
                    deadline,
                },
            );
            out.send_to(
                to,
                ServerMessage::VoteTallyUpdated {
                    counts: session.vote_counts(),
                },
            );
        }
        Phase::Results => out.send_to(to, session.results_message(deadline)),
        Phase::Commenting => out.send_to(to, session.commenting_message(deadline)),
        Phase::Waiting | Phase::Prompt | Phase::Ended => {}
    }
}

/// Count-versus-total update for the phase's completion guard
fn progress_message(session: &GameSession) -> Option<ServerMessage> {
    match session.phase {
        Phase::Submitting => Some(ServerMessage::SubmissionProgress {
            count: session.submissions.len(),
            total: session.quorum_denominator(),
        }),
        Phase::Voting => Some(ServerMessage::VoteTallyUpdated {
            counts: session.vote_counts(),
        }),
        Phase::Commenting => Some(ServerMessage::CommentProgress {
            count: session.comments.len(),
            total: session.quorum_denominator(),
        }),
        _ => None,
    }
}

/// Handle ArtifactSubmit from a player during Submitting
pub fn handle_submit_artifact(
    session: &mut GameSession,
    sender: &str,
    url: String,
    preview_url: Option<String>,
    out: &mut Outbox,
) -> CommandResult<()> {
    require_player!(session, sender, "artifact_submit");
    require_phase!(session, Phase::Submitting, "artifact_submit");

    let url = url.trim();
    if url.is_empty() {
        return Err(CommandError::InvalidPayload("artifact url is empty"));
    }

    session.record_submission(sender, url.to_string(), preview_url);

    if let Some(progress) = progress_message(session) {
        out.broadcast(progress);
    }
    session.evaluate_quorum(out);
    Ok(())
}

/// Handle VoteCast from a player during Voting
pub fn handle_cast_vote(
    session: &mut GameSession,
    sender: &str,
    target_id: String,
    out: &mut Outbox,
) -> CommandResult<()> {
    require_player!(session, sender, "vote_cast");
    require_phase!(session, Phase::Voting, "vote_cast");

    if target_id == sender {
        return Err(CommandError::GuardViolation {
            command: "vote_cast",
            phase: session.phase,
            reason: "cannot vote for own artifact",
        });
    }
    if !session.submissions.contains_key(&target_id) {
        return Err(CommandError::GuardViolation {
            command: "vote_cast",
            phase: session.phase,
            reason: "target has no artifact this round",
        });
    }

    session.cast_vote(sender, &target_id);
    tracing::debug!(
        participant_id = %sender,
        target_id = %target_id,
        total = session.total_votes(),
        "Vote cast"
    );

    if let Some(progress) = progress_message(session) {
        out.broadcast(progress);
    }
    session.evaluate_quorum(out);
    Ok(())
}

/// Handle CommentSubmit from a player during Commenting. Empty comments are
/// accepted and still count toward completion. A vote comment only sticks to
/// the artifact the sender actually voted for, an own comment only to the
/// sender's artifact; mismatched targets are dropped with their text.
pub fn handle_submit_comment(
    session: &mut GameSession,
    sender: &str,
    mut entry: CommentEntry,
    out: &mut Outbox,
) -> CommandResult<()> {
    require_player!(session, sender, "comment_submit");
    require_phase!(session, Phase::Commenting, "comment_submit");

    let voted_for = session.voter_map().remove(sender);
    if entry.voted_target_id.is_some() && entry.voted_target_id != voted_for {
        tracing::debug!(participant_id = %sender, "Dropping vote comment for an unvoted artifact");
        entry.voted_target_id = None;
        entry.vote_comment = None;
    }
    if entry.own_target_id.as_deref().is_some_and(|id| id != sender) {
        tracing::debug!(participant_id = %sender, "Dropping own comment on another artifact");
        entry.own_target_id = None;
        entry.own_comment = None;
    }

    session.comments.insert(sender.to_string(), entry);
    tracing::debug!(
        participant_id = %sender,
        count = session.comments.len(),
        "Comment submitted"
    );

    if let Some(progress) = progress_message(session) {
        out.broadcast(progress);
    }
    session.evaluate_quorum(out);
    Ok(())
}

/// Handle a departure. The host leaving ends any running game and resets the
/// lobby; anyone else is purged and the current phase re-checks its quorum.
pub fn handle_leave(session: &mut GameSession, sender: &str, out: &mut Outbox) -> CommandResult<()> {
    if !session.participants.contains_key(sender) {
        return Err(CommandError::GuardViolation {
            command: "disconnect",
            phase: session.phase,
            reason: "sender never joined",
        });
    }

    if session.is_host(sender) {
        tracing::warn!(participant_id = %sender, phase = ?session.phase, "Host left");

        if session.phase.is_in_progress() {
            session.end_game(Some(HOST_LEFT_REASON.to_string()), out);
        }
        session.reset(out);
        out.broadcast(ServerMessage::SessionReset {
            message: HOST_LEFT_NOTICE.to_string(),
        });
        out.broadcast(ServerMessage::RosterUpdated {
            participants: Vec::new(),
        });
        out.broadcast(session.session_state_message());
        return Ok(());
    }

    session.remove_participant(sender);
    out.broadcast(ServerMessage::RosterUpdated {
        participants: session.roster(),
    });
    // Totals shrank with the roster
    if let Some(progress) = progress_message(session) {
        out.broadcast(progress);
    }
    session.evaluate_quorum(out);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SessionConfig;
    use crate::protocol::Recipient;
    use crate::state::{TimerOp, Trigger};

    fn lobby(players: usize) -> GameSession {
        let mut session = GameSession::new(SessionConfig::default());
        let mut out = Outbox::default();
        handle_join(&mut session, "host", "Host".into(), "🎩".into(), true, &mut out).unwrap();
        for i in 1..=players {
            handle_join(
                &mut session,
                &format!("p{}", i),
                format!("Player {}", i),
                "😀".into(),
                false,
                &mut out,
            )
            .unwrap();
        }
        session
    }

    fn submitting(players: usize) -> GameSession {
        let mut session = lobby(players);
        let mut out = Outbox::default();
        session.fire(Trigger::StartRequested, &mut out).unwrap();
        session.current_prompt = "Friday deploy".to_string();
        session.fire(Trigger::PromptSubmitted, &mut out).unwrap();
        session
    }

    fn voting(players: usize) -> GameSession {
        let mut session = submitting(players);
        let mut out = Outbox::default();
        for i in 1..=players {
            let id = format!("p{}", i);
            handle_submit_artifact(
                &mut session,
                &id,
                format!("https://gifs/{}", i),
                None,
                &mut out,
            )
            .unwrap();
        }
        assert_eq!(session.phase, Phase::Voting);
        session
    }

    fn private_to<'a>(out: &'a Outbox, id: &str) -> Vec<&'a ServerMessage> {
        out.messages
            .iter()
            .filter(|m| m.to == Recipient::Participant(id.to_string()))
            .map(|m| &m.msg)
            .collect()
    }

    #[test]
    fn test_join_acknowledges_and_broadcasts_roster() {
        let mut session = lobby(1);
        let mut out = Outbox::default();

        handle_join(&mut session, "p2", "Bea".into(), "🐝".into(), true, &mut out).unwrap();

        assert_eq!(
            private_to(&out, "p2"),
            vec![&ServerMessage::Joined {
                participant_id: "p2".to_string(),
                is_host: false
            }]
        );
        assert!(out.messages.iter().any(|m| matches!(
            &m.msg,
            ServerMessage::RosterUpdated { participants } if participants.len() == 3
        )));
        assert!(out
            .messages
            .iter()
            .any(|m| m.msg == ServerMessage::HostStatus { has_host: true }));
    }

    #[test]
    fn test_late_joiner_gets_voting_snapshot() {
        let mut session = voting(2);
        handle_cast_vote(&mut session, "p1", "p2".to_string(), &mut Outbox::default()).unwrap();
        let order = session.voting_order.clone();

        let mut out = Outbox::default();
        handle_join(&mut session, "late", "Late".into(), "🐢".into(), false, &mut out).unwrap();

        let private = private_to(&out, "late");
        assert_eq!(private.len(), 3);
        assert!(matches!(
            private[1],
            ServerMessage::VotingStarted { artifacts, .. } if *artifacts == order
        ));
        assert!(matches!(
            private[2],
            ServerMessage::VoteTallyUpdated { counts } if counts.get("p2") == Some(&1)
        ));
    }

    #[test]
    fn test_late_joiner_in_submitting_gets_prompt() {
        let mut session = submitting(2);
        let mut out = Outbox::default();
        handle_join(&mut session, "late", "Late".into(), "🐢".into(), false, &mut out).unwrap();

        assert!(private_to(&out, "late").iter().any(|m| matches!(
            m,
            ServerMessage::SubmittingStarted { prompt, deadline: Some(_) } if prompt == "Friday deploy"
        )));
    }

    #[test]
    fn test_host_cannot_submit_artifact() {
        let mut session = submitting(2);
        let mut out = Outbox::default();
        let err = handle_submit_artifact(
            &mut session,
            "host",
            "https://gifs/h".to_string(),
            None,
            &mut out,
        )
        .unwrap_err();
        assert!(matches!(err, CommandError::GuardViolation { .. }));
        assert!(session.submissions.is_empty());
        assert!(out.messages.is_empty());
    }

    #[test]
    fn test_resubmission_does_not_double_count() {
        let mut session = submitting(3);
        let mut out = Outbox::default();
        handle_submit_artifact(&mut session, "p1", "https://gifs/a".into(), None, &mut out)
            .unwrap();
        handle_submit_artifact(&mut session, "p1", "https://gifs/b".into(), None, &mut out)
            .unwrap();

        assert_eq!(session.submissions.len(), 1);
        assert_eq!(session.submissions["p1"].url, "https://gifs/b");
        assert_eq!(session.phase, Phase::Submitting);
    }

    #[test]
    fn test_vote_for_self_is_rejected() {
        let mut session = voting(2);
        let mut out = Outbox::default();
        let err = handle_cast_vote(&mut session, "p1", "p1".to_string(), &mut out).unwrap_err();
        assert!(matches!(err, CommandError::GuardViolation { .. }));
        assert_eq!(session.total_votes(), 0);
    }

    #[test]
    fn test_vote_for_non_submitter_is_rejected() {
        let mut session = submitting(3);
        let mut out = Outbox::default();
        handle_submit_artifact(&mut session, "p1", "https://gifs/1".into(), None, &mut out)
            .unwrap();
        handle_submit_artifact(&mut session, "p2", "https://gifs/2".into(), None, &mut out)
            .unwrap();
        let epoch = session.deadline.map(|d| d.epoch).unwrap();
        session.on_deadline(epoch, &mut out).unwrap();
        assert_eq!(session.phase, Phase::Voting);

        assert!(handle_cast_vote(&mut session, "p1", "p3".to_string(), &mut out).is_err());
    }

    #[test]
    fn test_comments_complete_round() {
        let mut session = voting(2);
        let mut out = Outbox::default();
        handle_cast_vote(&mut session, "p1", "p2".to_string(), &mut out).unwrap();
        handle_cast_vote(&mut session, "p2", "p1".to_string(), &mut out).unwrap();
        session.fire(Trigger::CommentingRequested, &mut out).unwrap();

        handle_submit_comment(&mut session, "p1", CommentEntry::default(), &mut out).unwrap();
        assert_eq!(session.phase, Phase::Commenting);
        handle_submit_comment(&mut session, "p2", CommentEntry::default(), &mut out).unwrap();

        assert_eq!(session.phase, Phase::Prompt);
        assert_eq!(session.current_round, 2);
        assert_eq!(session.history.len(), 1);
    }

    #[test]
    fn test_player_departure_completes_quorum() {
        let mut session = submitting(3);
        let mut out = Outbox::default();
        handle_submit_artifact(&mut session, "p1", "https://gifs/1".into(), None, &mut out)
            .unwrap();
        handle_submit_artifact(&mut session, "p2", "https://gifs/2".into(), None, &mut out)
            .unwrap();
        assert_eq!(session.phase, Phase::Submitting);

        let mut out = Outbox::default();
        handle_leave(&mut session, "p3", &mut out).unwrap();

        assert_eq!(session.phase, Phase::Voting);
        assert_eq!(session.quorum_denominator(), 2);
    }

    #[test]
    fn test_player_departure_purges_votes_for_them() {
        let mut session = voting(3);
        let mut out = Outbox::default();
        handle_cast_vote(&mut session, "p1", "p3".to_string(), &mut out).unwrap();

        handle_leave(&mut session, "p3", &mut out).unwrap();

        assert_eq!(session.total_votes(), 0);
        assert!(!session.submissions.contains_key("p3"));
        assert_eq!(session.phase, Phase::Voting);
    }

    #[test]
    fn test_host_leaving_mid_game_ends_then_resets() {
        let mut session = voting(2);
        let mut out = Outbox::default();

        handle_leave(&mut session, "host", &mut out).unwrap();

        let ended = out.messages.iter().position(|m| {
            matches!(&m.msg, ServerMessage::GameEnded { reason: Some(r), .. } if r == "Host left")
        });
        let reset = out.messages.iter().position(|m| {
            matches!(&m.msg, ServerMessage::SessionReset { message } if message == HOST_LEFT_NOTICE)
        });
        assert!(ended.unwrap() < reset.unwrap());
        assert_eq!(session.phase, Phase::Waiting);
        assert!(session.participants.is_empty());
        assert!(session.deadline.is_none());
        assert_eq!(out.timer, Some(TimerOp::Cancel));
    }

    #[test]
    fn test_host_leaving_lobby_skips_game_ended() {
        let mut session = lobby(2);
        let mut out = Outbox::default();

        handle_leave(&mut session, "host", &mut out).unwrap();

        assert!(!out
            .messages
            .iter()
            .any(|m| matches!(m.msg, ServerMessage::GameEnded { .. })));
        assert!(out
            .messages
            .iter()
            .any(|m| matches!(m.msg, ServerMessage::SessionReset { .. })));
        assert!(session.host_id.is_none());
    }

    #[test]
    fn test_unknown_disconnect_is_ignored() {
        let mut session = lobby(2);
        let mut out = Outbox::default();
        assert!(handle_leave(&mut session, "stranger", &mut out).is_err());
        assert_eq!(session.participants.len(), 3);
    }

    fn commenting(players: usize) -> GameSession {
        let mut session = voting(players);
        let mut out = Outbox::default();
        handle_cast_vote(&mut session, "p1", "p2".to_string(), &mut out).unwrap();
        handle_cast_vote(&mut session, "p2", "p1".to_string(), &mut out).unwrap();
        if players > 2 {
            handle_cast_vote(&mut session, "p3", "p1".to_string(), &mut out).unwrap();
        }
        assert_eq!(session.phase, Phase::Results);
        session.fire(Trigger::CommentingRequested, &mut out).unwrap();
        session
    }

    #[test]
    fn test_late_joiner_after_departure_sees_live_artifacts() {
        let mut session = voting(3);
        let mut out = Outbox::default();
        handle_leave(&mut session, "p3", &mut out).unwrap();

        let mut out = Outbox::default();
        handle_join(&mut session, "late", "Late".into(), "🐢".into(), false, &mut out).unwrap();

        let replayed: Vec<String> = private_to(&out, "late")
            .into_iter()
            .find_map(|m| match m {
                ServerMessage::VotingStarted { artifacts, .. } => {
                    Some(artifacts.iter().map(|a| a.id.clone()).collect())
                }
                _ => None,
            })
            .unwrap();
        let mut replayed_sorted = replayed.clone();
        replayed_sorted.sort();
        assert_eq!(replayed_sorted, vec!["p1", "p2"]);

        // Every replayed artifact is a valid vote target
        for target in replayed {
            handle_cast_vote(&mut session, "late", target, &mut Outbox::default()).unwrap();
        }
    }

    #[test]
    fn test_own_comment_on_other_artifact_is_dropped() {
        let mut session = commenting(3);
        let mut out = Outbox::default();

        handle_submit_comment(
            &mut session,
            "p1",
            CommentEntry {
                voted_target_id: Some("p2".to_string()),
                vote_comment: Some("great timing".to_string()),
                own_target_id: Some("p2".to_string()),
                own_comment: Some("I made this".to_string()),
            },
            &mut out,
        )
        .unwrap();

        let stored = &session.comments["p1"];
        assert_eq!(stored.voted_target_id.as_deref(), Some("p2"));
        assert_eq!(stored.vote_comment.as_deref(), Some("great timing"));
        assert_eq!(stored.own_target_id, None);
        assert_eq!(stored.own_comment, None);
    }

    #[test]
    fn test_vote_comment_for_unvoted_artifact_is_dropped() {
        let mut session = commenting(3);
        let mut out = Outbox::default();

        handle_submit_comment(
            &mut session,
            "p1",
            CommentEntry {
                voted_target_id: Some("p3".to_string()),
                vote_comment: Some("loved it".to_string()),
                own_target_id: Some("p1".to_string()),
                own_comment: Some("mine is better".to_string()),
            },
            &mut out,
        )
        .unwrap();
        handle_submit_comment(&mut session, "p2", CommentEntry::default(), &mut out).unwrap();
        handle_submit_comment(&mut session, "p3", CommentEntry::default(), &mut out).unwrap();

        assert_eq!(session.phase, Phase::Prompt);
        let record = &session.history[0];
        let p3 = record.artifacts.iter().find(|a| a.owner_id == "p3").unwrap();
        assert!(p3.comments.is_empty());
        let p1 = record.artifacts.iter().find(|a| a.owner_id == "p1").unwrap();
        assert_eq!(p1.comments.len(), 1);
        assert_eq!(p1.comments[0].kind, crate::types::CommentKind::Own);
        assert_eq!(p1.comments[0].comment, "mine is better");
    }

    #[test]
    fn test_departure_rebroadcasts_progress_totals() {
        let mut session = submitting(3);
        let mut out = Outbox::default();
        handle_submit_artifact(&mut session, "p1", "https://gifs/1".into(), None, &mut out)
            .unwrap();

        let mut out = Outbox::default();
        handle_leave(&mut session, "p3", &mut out).unwrap();
        assert!(out.messages.iter().any(|m| m.msg
            == ServerMessage::SubmissionProgress {
                count: 1,
                total: 2
            }));

        let mut session = commenting(3);
        let mut out = Outbox::default();
        handle_submit_comment(&mut session, "p1", CommentEntry::default(), &mut out).unwrap();

        let mut out = Outbox::default();
        handle_leave(&mut session, "p3", &mut out).unwrap();
        assert!(out.messages.iter().any(|m| m.msg
            == ServerMessage::CommentProgress {
                count: 1,
                total: 2
            }));
        assert_eq!(session.phase, Phase::Commenting);
    }
}
