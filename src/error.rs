use thiserror::Error;

use crate::automaton::AutomatonError;

/// Errors raised while stepping environments or assembling training losses.
///
/// Every variant is a contract violation by one of the collaborators
/// (environment, automaton, model) or by the caller. Numeric degeneracies
/// never surface here; they are absorbed with [`crate::EPS`].
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TrainError {
    #[error("Action {action} is outside the action space of size {action_dim}")]
    UnknownAction { action: usize, action_dim: usize },

    #[error("Reward vector has {found} components, expected {expected}")]
    RewardShape { expected: usize, found: usize },

    #[error("Value vector has {found} components, expected {expected}")]
    ValueShape { expected: usize, found: usize },

    #[error("State vector has {found} components, expected {expected}")]
    StateShape { expected: usize, found: usize },

    #[error("Allocation matrix is {rows}x{cols}, expected {n_agents}x{n_tasks}")]
    AllocationShape {
        rows: usize,
        cols: usize,
        n_agents: usize,
        n_tasks: usize,
    },

    #[error("Allocation weight {value} at ({agent}, {task}) is outside [0, 1]")]
    AllocationValue { agent: usize, task: usize, value: f64 },

    #[error("Expected {expected} agents, found {found}")]
    AgentCount { expected: usize, found: usize },

    #[error("Trajectory is empty: at least one timestep is required")]
    EmptyTrajectory,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Automaton(#[from] AutomatonError),

    #[error("Model error: {0}")]
    Model(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_action_display() {
        let e = TrainError::UnknownAction {
            action: 7,
            action_dim: 5,
        };
        assert_eq!(
            e.to_string(),
            "Action 7 is outside the action space of size 5"
        );
    }

    #[test]
    fn reward_shape_display() {
        let e = TrainError::RewardShape {
            expected: 3,
            found: 2,
        };
        assert_eq!(e.to_string(), "Reward vector has 2 components, expected 3");
    }

    #[test]
    fn automaton_error_converts() {
        let e: TrainError = AutomatonError::EmptyTaskSet.into();
        assert!(matches!(e, TrainError::Automaton(AutomatonError::EmptyTaskSet)));
        assert_eq!(e.to_string(), AutomatonError::EmptyTaskSet.to_string());
    }
}
