//! Core Events
//!
//! Discrete tokens produced by the buttons and the rotary encoder, and the
//! lifecycle states a sampling session moves through.

/// A single input event from the front panel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputToken {
    /// The stop button was pressed.
    Stop,
    /// The rotary encoder moved by one detent; `+1` or `-1`.
    Rotate(i8),
    /// The rotary encoder button was pressed.
    Select,
}

impl InputToken {
    /// Parses a console command into a token.
    ///
    /// An empty line counts as a stop request so that pressing enter ends a session.
    pub fn parse(line: &str) -> Option<Self> {
        match line.trim() {
            "" | "q" | "quit" | "stop" => Some(Self::Stop),
            "+" | "up" => Some(Self::Rotate(1)),
            "-" | "down" => Some(Self::Rotate(-1)),
            "s" | "select" => Some(Self::Select),
            _ => None,
        }
    }
}

/// Lifecycle of one acquisition run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SessionState {
    #[default]
    Idle,
    Sampling,
    Cancelled,
    Completed,
}

impl SessionState {
    /// Returns `true` if a session may move from `self` to `next`.
    pub fn can_transition_to(self, next: SessionState) -> bool {
        matches!(
            (self, next),
            (Self::Idle, Self::Sampling)
                | (Self::Cancelled, Self::Sampling)
                | (Self::Completed, Self::Sampling)
                | (Self::Sampling, Self::Cancelled)
                | (Self::Sampling, Self::Completed)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Cancelled | Self::Completed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tokens() {
        assert_eq!(InputToken::parse("q"), Some(InputToken::Stop));
        assert_eq!(InputToken::parse("  \n"), Some(InputToken::Stop));
        assert_eq!(InputToken::parse("+"), Some(InputToken::Rotate(1)));
        assert_eq!(InputToken::parse("-"), Some(InputToken::Rotate(-1)));
        assert_eq!(InputToken::parse("select"), Some(InputToken::Select));
        assert_eq!(InputToken::parse("bogus"), None);
    }

    #[test]
    fn test_session_transitions() {
        assert!(SessionState::Idle.can_transition_to(SessionState::Sampling));
        assert!(SessionState::Sampling.can_transition_to(SessionState::Cancelled));
        assert!(SessionState::Sampling.can_transition_to(SessionState::Completed));
        assert!(!SessionState::Idle.can_transition_to(SessionState::Completed));
        assert!(!SessionState::Cancelled.can_transition_to(SessionState::Completed));
        assert!(SessionState::Completed.is_terminal());
        assert!(!SessionState::Sampling.is_terminal());
    }
}
