use thiserror::Error;

/// Errors raised while building task automata.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AutomatonError {
    #[error("State {state} does not exist in an automaton with {n_states} states")]
    UnknownState { state: usize, n_states: usize },

    #[error("State {state} already has a transition on label '{label}'")]
    ConflictingTransition { state: usize, label: String },

    #[error("State {0} cannot be both accepting and rejecting")]
    OverlappingTerminal(usize),

    #[error("A product automaton needs at least one task")]
    EmptyTaskSet,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_state_display() {
        let e = AutomatonError::UnknownState {
            state: 4,
            n_states: 2,
        };
        assert_eq!(
            e.to_string(),
            "State 4 does not exist in an automaton with 2 states"
        );
    }

    #[test]
    fn conflicting_transition_display() {
        let e = AutomatonError::ConflictingTransition {
            state: 0,
            label: "key".into(),
        };
        assert!(e.to_string().contains("'key'"));
    }
}
