//! motap - Multi-Objective Task Allocation and Planning
//!
//! Multi-agent constrained reinforcement learning in which several agents
//! share a set of tasks, each task specified as a finite automaton over the
//! labels an environment emits. Every agent sees a reward vector (its own
//! reward plus one component per task), learns a vector-valued critic and
//! is trained jointly with the other agents through a penalty-weighted
//! actor-critic loss driven by a task-allocation matrix.
//!
//! The automata, the task-aware environment adapter, returns and the H
//! weighting are plain Rust. The tch models, the differentiable losses and
//! the joint `Trainer` are behind the `nn` feature flag (which brings in
//! `tch`).

pub mod automaton;
pub mod config;
pub mod env;
pub mod error;
#[cfg(feature = "nn")]
pub mod model;
pub mod training;

pub use automaton::{CrossProductDfa, Dfa, TaskAutomaton, TaskStatus};
pub use config::{AllocationLearning, TrainingConfig};
pub use env::{Environment, FetchGrid, TaskEnv};
pub use error::TrainError;
#[cfg(feature = "nn")]
pub use model::{ActorCritic, MlpActorCritic};
pub use training::Allocation;
#[cfg(feature = "nn")]
pub use training::{Agent, StepReport, Trainer};

/// Machine epsilon of `f32`, used to keep return standardization finite
/// when every return is equal.
pub const EPS: f64 = f32::EPSILON as f64;
