//! Hyperparameters for constrained multi-task training.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::TrainError;

/// How the allocation matrix μ evolves across training steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum AllocationLearning {
    /// μ is held at its configured value for the whole run.
    #[default]
    Fixed,
    /// After each joint model update, μ takes one descent step on the
    /// allocator loss and is clamped back into `[0, 1]`.
    Gradient,
}

/// Training hyperparameters.
///
/// Defaults follow the reference experiments: a long discount horizon,
/// unit penalty weights and a 0.8 task-success threshold.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct TrainingConfig {
    /// Discount factor γ, in `(0, 1]`.
    pub gamma: f64,
    /// Hard bound on the length of one episode.
    pub max_steps_per_episode: usize,
    /// Weight λ of the agent-performance penalty.
    pub lambda: f64,
    /// Weight χ of the task-performance penalties.
    pub chi: f64,
    /// Task success threshold e, in `(0, 1)`.
    pub task_threshold: f64,
    /// Agent performance threshold c.
    pub agent_threshold: f64,
    /// Adam learning rate of the joint model update.
    pub learning_rate: f64,
    /// Learning rate α scaling the allocator loss.
    pub allocator_lr: f64,
    /// Standardize discounted returns over all timesteps and components.
    pub standardize_returns: bool,
    /// Transition point of the Huber critic loss.
    pub huber_delta: f64,
    /// Seed for action sampling.
    pub seed: u64,
    /// Emit each environment frame at `trace` level during rollouts.
    pub render: bool,
    /// Emit an `info` log line every this many training steps (0 disables).
    pub log_interval: u32,
    /// Whether μ is learned.
    pub allocation_learning: AllocationLearning,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            gamma: 0.99,
            max_steps_per_episode: 100,
            lambda: 1.0,
            chi: 1.0,
            task_threshold: 0.8,
            agent_threshold: 0.0,
            learning_rate: 0.01,
            allocator_lr: 0.001,
            standardize_returns: false,
            huber_delta: 1.0,
            seed: 42,
            render: false,
            log_interval: 10,
            allocation_learning: AllocationLearning::Fixed,
        }
    }
}

impl TrainingConfig {
    /// Checks that every hyperparameter lies in its admissible range.
    pub fn validate(&self) -> Result<(), TrainError> {
        if !(self.gamma > 0.0 && self.gamma <= 1.0) {
            return Err(invalid(format!("gamma must be in (0, 1], got {}", self.gamma)));
        }
        if self.max_steps_per_episode == 0 {
            return Err(invalid("max_steps_per_episode must be positive".into()));
        }
        if !(self.task_threshold > 0.0 && self.task_threshold < 1.0) {
            return Err(invalid(format!(
                "task_threshold must be in (0, 1), got {}",
                self.task_threshold
            )));
        }
        if self.lambda < 0.0 || self.chi < 0.0 || self.allocator_lr < 0.0 {
            return Err(invalid("lambda, chi and allocator_lr must be non-negative".into()));
        }
        if !(self.learning_rate > 0.0 && self.learning_rate.is_finite()) {
            return Err(invalid(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            )));
        }
        if self.huber_delta <= 0.0 {
            return Err(invalid(format!(
                "huber_delta must be positive, got {}",
                self.huber_delta
            )));
        }
        if !self.agent_threshold.is_finite() {
            return Err(invalid("agent_threshold must be finite".into()));
        }
        Ok(())
    }
}

fn invalid(msg: String) -> TrainError {
    TrainError::InvalidConfig(msg)
}
