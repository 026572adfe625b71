//! Task-tracking automata.
//!
//! Each task is a small deterministic automaton over labels emitted by the
//! environment. The [`CrossProductDfa`] runs all task automata in lockstep
//! and reports per-task rewards plus overall success or failure; the
//! reward-vector adapter treats those reports as the sole authority on
//! episode termination.

pub mod dfa;
pub mod error;
pub mod product;

pub use dfa::Dfa;
pub use error::AutomatonError;
pub use product::{CrossProductDfa, Labeller, TaskStatus};

/// Capability consumed by [`crate::env::TaskEnv`].
///
/// `E` is the environment type the automaton observes after every step.
pub trait TaskAutomaton<E> {
    /// Number of tracked tasks M.
    fn num_tasks(&self) -> usize;

    /// Returns every task to its initial state.
    fn reset(&mut self);

    /// Advances the product state from the environment's current state.
    fn advance(&mut self, env: &E);

    /// Rewards produced by the last [`advance`](Self::advance), one per task.
    fn task_rewards(&self) -> Vec<f64>;

    /// True once every task is accepted.
    fn is_success(&self) -> bool;

    /// True once every task is resolved and at least one failed.
    fn is_failed(&self) -> bool;

    /// Fails every pending task that can no longer reach acceptance.
    fn mark_unreachable_tasks(&mut self);
}
