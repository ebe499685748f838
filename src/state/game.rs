use super::{build_round_record, score, GameSession, Outbox};
use crate::error::{CommandError, CommandResult};
use crate::protocol::ServerMessage;
use crate::types::*;
use rand::seq::SliceRandom;
use std::collections::HashMap;

/// Events that can move the session to another phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    StartRequested,
    PromptSubmitted,
    QuorumReached,
    DeadlineElapsed,
    CommentingRequested,
    SkipRequested,
}

impl GameSession {
    /// Transition table. `None` means the trigger does nothing in this phase.
    pub fn next_phase(&self, trigger: Trigger) -> Option<Phase> {
        use Phase::*;
        use Trigger::*;

        match (self.phase, trigger) {
            (Waiting, StartRequested) => Some(Prompt),
            (Waiting, _) => None,

            (Prompt, PromptSubmitted) => Some(Submitting),
            (Prompt, _) => None,

            // Nobody submitted: nothing to vote on
            (Submitting, QuorumReached | DeadlineElapsed) if self.submissions.is_empty() => {
                Some(Results)
            }
            (Submitting, QuorumReached | DeadlineElapsed) => Some(Voting),
            (Submitting, _) => None,

            (Voting, QuorumReached | DeadlineElapsed) => Some(Results),
            (Voting, _) => None,

            (Results, CommentingRequested) => Some(Commenting),
            (Results, SkipRequested) => Some(self.phase_after_round()),
            (Results, DeadlineElapsed) if self.is_final_round() => Some(Ended),
            (Results, _) => None,

            (Commenting, QuorumReached | DeadlineElapsed) => Some(self.phase_after_round()),
            (Commenting, _) => None,

            // Leaving Ended is a reset, not a transition
            (Ended, _) => None,
        }
    }

    fn phase_after_round(&self) -> Phase {
        if self.is_final_round() {
            Phase::Ended
        } else {
            Phase::Prompt
        }
    }

    /// Fire a trigger: look up the target phase and run its entry side effects.
    pub fn fire(&mut self, trigger: Trigger, out: &mut Outbox) -> CommandResult<Phase> {
        let from = self.phase;
        let to = self
            .next_phase(trigger)
            .ok_or(CommandError::GuardViolation {
                command: "transition",
                phase: from,
                reason: "trigger has no transition from this phase",
            })?;

        tracing::info!(
            ?from,
            ?to,
            ?trigger,
            round = self.current_round,
            "Phase transition"
        );

        match (from, to) {
            (Phase::Waiting, Phase::Prompt) => self.enter_first_prompt(out),
            (_, Phase::Submitting) => self.enter_submitting(out),
            (_, Phase::Voting) => self.enter_voting(out),
            (_, Phase::Results) => self.enter_results(out),
            (_, Phase::Commenting) => self.enter_commenting(out),
            (Phase::Results | Phase::Commenting, Phase::Prompt) => {
                self.close_round(from == Phase::Commenting);
                self.enter_next_prompt(out);
            }
            (Phase::Results | Phase::Commenting, Phase::Ended) => {
                // Timing out of the final results screen also closes the round
                self.close_round(from == Phase::Commenting);
                self.end_game(None, out);
            }
            (from, to) => {
                tracing::error!(?from, ?to, "Unhandled transition");
                return Err(CommandError::GuardViolation {
                    command: "transition",
                    phase: from,
                    reason: "unhandled transition",
                });
            }
        }

        Ok(to)
    }

    /// Re-check the current phase's completion guard. Called after every
    /// change to a quorum-relevant count, including roster changes.
    pub fn evaluate_quorum(&mut self, out: &mut Outbox) -> Option<Phase> {
        let denominator = self.quorum_denominator();
        let count = match self.phase {
            Phase::Submitting => self.submissions.len(),
            Phase::Voting => self.total_votes(),
            Phase::Commenting => self.comments.len(),
            _ => return None,
        };

        if count < denominator {
            return None;
        }

        tracing::debug!(phase = ?self.phase, count, denominator, "Quorum reached");
        self.fire(Trigger::QuorumReached, out).ok()
    }

    /// Timer callback. Only the deadline of the current epoch may act; a
    /// deadline that lost the race against a quorum is a no-op.
    pub fn on_deadline(&mut self, epoch: u64, out: &mut Outbox) -> CommandResult<()> {
        match self.deadline {
            Some(d) if d.epoch == epoch => {}
            _ => return Err(CommandError::RaceNoop { epoch }),
        }

        if self.phase == Phase::Ended {
            self.reset(out);
            out.broadcast(ServerMessage::SessionReset {
                message: "Game over! Returning to lobby...".to_string(),
            });
            out.broadcast(ServerMessage::RosterUpdated {
                participants: Vec::new(),
            });
            out.broadcast(self.session_state_message());
            return Ok(());
        }

        self.fire(Trigger::DeadlineElapsed, out).map(|_| ())
    }

    fn enter_first_prompt(&mut self, out: &mut Outbox) {
        self.phase = Phase::Prompt;
        self.current_round = 1;
        self.current_prompt.clear();
        self.clear_deadline(out);
        out.broadcast(self.session_state_message());
    }

    fn enter_next_prompt(&mut self, out: &mut Outbox) {
        self.phase = Phase::Prompt;
        self.current_round += 1;
        self.current_prompt.clear();
        self.clear_deadline(out);
        out.broadcast(self.session_state_message());
    }

    fn enter_submitting(&mut self, out: &mut Outbox) {
        self.phase = Phase::Submitting;
        self.submissions.clear();
        self.votes.clear();
        self.comments.clear();
        self.voting_order.clear();
        self.round_results.clear();

        let deadline = self.set_deadline(self.config.submit_timeout, out);
        out.broadcast(self.session_state_message());
        out.broadcast(ServerMessage::SubmittingStarted {
            prompt: self.current_prompt.clone(),
            deadline: Some(deadline.at),
        });
    }

    fn enter_voting(&mut self, out: &mut Outbox) {
        self.phase = Phase::Voting;

        let mut artifacts = self.voting_artifacts();
        artifacts.shuffle(&mut rand::rng());
        self.voting_order = artifacts.clone();

        let deadline = self.set_deadline(self.config.vote_timeout, out);
        out.broadcast(self.session_state_message());
        out.broadcast(ServerMessage::VotingStarted {
            artifacts,
            deadline: Some(deadline.at),
        });
    }

    fn enter_results(&mut self, out: &mut Outbox) {
        self.phase = Phase::Results;
        self.clear_deadline(out);

        for (target, points) in score::point_deltas(&self.participants, &self.votes) {
            if let Some(p) = self.participants.get_mut(&target) {
                p.points += points;
            }
        }
        self.round_results =
            score::tally_round(&self.participants, &self.submissions, &self.votes);

        let is_final_round = self.is_final_round();
        let deadline = if is_final_round {
            Some(self.set_deadline(self.config.final_results_grace, out).at)
        } else {
            None
        };

        tracing::info!(
            round = self.current_round,
            artifacts = self.round_results.len(),
            is_final_round,
            "Round tallied"
        );

        out.broadcast(self.session_state_message());
        out.broadcast(self.results_message(deadline));
    }

    fn enter_commenting(&mut self, out: &mut Outbox) {
        self.phase = Phase::Commenting;
        self.comments.clear();

        let deadline = self.set_deadline(self.config.comment_timeout, out);
        out.broadcast(self.session_state_message());
        out.broadcast(self.commenting_message(Some(deadline.at)));
    }

    /// Append the round's record to history, with comments only if commenting ran
    fn close_round(&mut self, with_comments: bool) {
        let empty: HashMap<ParticipantId, CommentEntry> = HashMap::new();
        let comments = if with_comments { &self.comments } else { &empty };
        let record = build_round_record(
            self.current_round,
            &self.current_prompt,
            &self.round_results,
            comments,
            &self.participants,
        );
        self.history.push(record);
        tracing::info!(
            round = self.current_round,
            history_len = self.history.len(),
            "Round recorded"
        );
    }

    /// Move to Ended and announce the final standings. The reset back to
    /// Waiting follows after `reset_delay`.
    pub fn end_game(&mut self, reason: Option<String>, out: &mut Outbox) {
        self.phase = Phase::Ended;
        let leaderboard = score::leaderboard(&self.participants);
        let winner = score::determine_winner(&leaderboard);

        tracing::info!(?winner, ?reason, rounds = self.history.len(), "Game ended");

        self.set_deadline(self.config.reset_delay, out);
        out.broadcast(self.session_state_message());
        out.broadcast(ServerMessage::GameEnded {
            leaderboard,
            winner,
            history: self.history.clone(),
            reason,
        });
    }

    pub(crate) fn results_message(
        &self,
        deadline: Option<chrono::DateTime<chrono::Utc>>,
    ) -> ServerMessage {
        ServerMessage::ResultsReady {
            results: self.round_results.clone(),
            leaderboard: score::leaderboard(&self.participants),
            is_final_round: self.is_final_round(),
            deadline,
            has_artifacts: !self.round_results.is_empty(),
        }
    }

    pub(crate) fn commenting_message(
        &self,
        deadline: Option<chrono::DateTime<chrono::Utc>>,
    ) -> ServerMessage {
        ServerMessage::CommentingStarted {
            artifacts: self.owned_artifacts(),
            voter_map: self.voter_map(),
            deadline,
        }
    }
}
