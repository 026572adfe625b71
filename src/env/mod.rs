//! Environments and the reward-vector adapter.

pub mod adapter;
pub mod fetch;

pub use adapter::{TaskEnv, VectorStep};
pub use fetch::{FetchAction, FetchGrid};

use crate::error::TrainError;

/// Result of a raw environment step.
#[derive(Debug, Clone, PartialEq)]
pub struct EnvStep {
    /// Observation after the step.
    pub state: Vec<f64>,
    /// Scalar environment reward.
    pub reward: f64,
    /// The environment's own termination flag.
    pub done: bool,
}

/// An episodic environment with a discrete action space.
pub trait Environment {
    /// Starts a new episode and returns the initial observation.
    fn reset(&mut self) -> Vec<f64>;

    /// Applies `action`. Actions outside `0..action_dim()` are rejected
    /// with [`TrainError::UnknownAction`].
    fn step(&mut self, action: usize) -> Result<EnvStep, TrainError>;

    /// Number of discrete actions.
    fn action_dim(&self) -> usize;

    /// Length of the observation vector.
    fn state_dim(&self) -> usize;

    /// Text rendering of the current state, if supported.
    fn render(&self) -> Option<String> {
        None
    }
}
