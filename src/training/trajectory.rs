//! Per-episode rollout storage.
//!
//! Log-probabilities and value vectors are kept as tensors attached to the
//! autograd graph of the rollout, so the loss built from them back-propagates
//! into the model that produced them.

use tch::Tensor;

use crate::error::TrainError;
use crate::model::{tch_err, to_vec};

/// One timestep of an agent's episode.
#[derive(Debug)]
pub struct Transition {
    /// Chosen action.
    pub action: usize,
    /// Log-probability of the chosen action (0-dim tensor).
    pub log_prob: Tensor,
    /// Critic value vector for the observed state, `[M+1]`.
    pub value: Tensor,
    /// Reward vector produced by the step.
    pub reward: Vec<f64>,
}

/// One agent's episode, discarded after the training step that consumes it.
#[derive(Debug, Default)]
pub struct Trajectory {
    /// Stored transitions, in time order.
    pub transitions: Vec<Transition>,
    /// True when the step bound ended the episode before the automaton did.
    pub truncated: bool,
}

impl Trajectory {
    /// Creates a new empty trajectory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a transition.
    pub fn push(&mut self, transition: Transition) {
        self.transitions.push(transition);
    }

    /// Returns the number of stored transitions.
    pub fn len(&self) -> usize {
        self.transitions.len()
    }

    /// Returns true if the trajectory is empty.
    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }

    /// Detached copy of the value vector at the first timestep.
    pub fn initial_value(&self) -> Result<Vec<f64>, TrainError> {
        let first = self.transitions.first().ok_or(TrainError::EmptyTrajectory)?;
        to_vec(&first.value)
    }

    /// Log-probabilities of the chosen actions stacked into a `[T]` tensor.
    pub fn log_probs(&self) -> Result<Tensor, TrainError> {
        let log_probs: Vec<&Tensor> = self.transitions.iter().map(|t| &t.log_prob).collect();
        self.stack(&log_probs)
    }

    /// Value vectors stacked into a `[T, M+1]` tensor.
    pub fn values(&self) -> Result<Tensor, TrainError> {
        let values: Vec<&Tensor> = self.transitions.iter().map(|t| &t.value).collect();
        self.stack(&values)
    }

    /// Reward vectors in time order.
    pub fn rewards(&self) -> Vec<Vec<f64>> {
        self.transitions.iter().map(|t| t.reward.clone()).collect()
    }

    /// Undiscounted reward vector summed over the episode.
    pub fn reward_sum(&self, width: usize) -> Vec<f64> {
        let mut sum = vec![0.0; width];
        for t in &self.transitions {
            for (s, r) in sum.iter_mut().zip(&t.reward) {
                *s += r;
            }
        }
        sum
    }

    fn stack(&self, tensors: &[&Tensor]) -> Result<Tensor, TrainError> {
        if tensors.is_empty() {
            return Err(TrainError::EmptyTrajectory);
        }
        Tensor::f_stack(tensors, 0).map_err(tch_err)
    }
}
