use crate::types::Phase;

/// Why a session command did not change the session
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CommandError {
    /// Stale or duplicate client event: wrong phase or wrong sender
    #[error("{command} rejected in phase {phase:?}: {reason}")]
    GuardViolation {
        command: &'static str,
        phase: Phase,
        reason: &'static str,
    },

    #[error("Need at least {required} players (not including the host) to start, have {present}")]
    QuorumUnmet { required: usize, present: usize },

    /// A deadline fired after its phase was already superseded
    #[error("Deadline for epoch {epoch} already superseded")]
    RaceNoop { epoch: u64 },

    #[error("Invalid payload: {0}")]
    InvalidPayload(&'static str),
}

impl CommandError {
    /// Message surfaced to the requester, if this error is user-visible
    pub fn notice(&self) -> Option<String> {
        match self {
            CommandError::QuorumUnmet { .. } => Some(self.to_string()),
            _ => None,
        }
    }
}

pub type CommandResult<T> = Result<T, CommandError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_quorum_unmet_is_surfaced() {
        let unmet = CommandError::QuorumUnmet {
            required: 2,
            present: 1,
        };
        assert_eq!(
            unmet.notice().as_deref(),
            Some("Need at least 2 players (not including the host) to start, have 1")
        );

        let guard = CommandError::GuardViolation {
            command: "vote_cast",
            phase: Phase::Submitting,
            reason: "not voting",
        };
        assert!(guard.notice().is_none());
        assert!(CommandError::RaceNoop { epoch: 3 }.notice().is_none());
        assert!(CommandError::InvalidPayload("empty prompt").notice().is_none());
    }
}
