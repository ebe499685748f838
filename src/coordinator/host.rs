use crate::error::{CommandError, CommandResult};
use crate::state::{GameSession, Outbox, Trigger};
use crate::types::Phase;

/// Handle StartGame: check the player quorum, set the round count, open round one
pub fn handle_start(
    session: &mut GameSession,
    max_rounds: Option<u32>,
    out: &mut Outbox,
) -> CommandResult<()> {
    require_phase!(session, Phase::Waiting, "start");

    let present = session.quorum_denominator();
    let required = session.config.min_players;
    if present < required {
        return Err(CommandError::QuorumUnmet { required, present });
    }

    session.max_rounds = session.config.clamp_max_rounds(max_rounds);
    session.history.clear();
    for participant in session.participants.values_mut() {
        participant.points = 0;
    }

    tracing::info!(
        players = present,
        max_rounds = session.max_rounds,
        "Starting game"
    );
    session.fire(Trigger::StartRequested, out).map(|_| ())
}

/// Handle SubmitPrompt: store the round's prompt and open submissions
pub fn handle_submit_prompt(
    session: &mut GameSession,
    prompt: String,
    out: &mut Outbox,
) -> CommandResult<()> {
    require_phase!(session, Phase::Prompt, "prompt_submit");

    let prompt = prompt.trim();
    if prompt.is_empty() {
        return Err(CommandError::InvalidPayload("prompt is empty"));
    }

    session.current_prompt = prompt.to_string();
    tracing::info!(round = session.current_round, "Prompt set: {}", prompt);
    session.fire(Trigger::PromptSubmitted, out).map(|_| ())
}

/// Handle RequestCommenting from the results screen
pub fn handle_request_commenting(session: &mut GameSession, out: &mut Outbox) -> CommandResult<()> {
    require_phase!(session, Phase::Results, "request_commenting");
    session.fire(Trigger::CommentingRequested, out).map(|_| ())
}

/// Handle RequestNextRound: skip commenting, record the round and move on
pub fn handle_request_next_round(session: &mut GameSession, out: &mut Outbox) -> CommandResult<()> {
    require_phase!(session, Phase::Results, "request_next_round");
    session.fire(Trigger::SkipRequested, out).map(|_| ())
}
