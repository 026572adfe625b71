//! Actor-critic models on tch.
//!
//! A model maps a batch of observations to action logits and a value vector
//! with one entry per reward component. Every agent's model registers its
//! variables under its own sub-path of one shared [`tch::nn::VarStore`], so
//! a single `nn::Optimizer` updates all agents at once.
//!
//! This module is only available with the `nn` feature.

pub mod network;

pub use network::MlpActorCritic;

use tch::{Kind, Tensor};

use crate::error::TrainError;

/// A policy/value network.
pub trait ActorCritic {
    fn state_dim(&self) -> usize;

    fn action_dim(&self) -> usize;

    /// Width of the value head (number of reward components).
    fn value_dim(&self) -> usize;

    /// Forward pass on a `[batch, state_dim]` tensor.
    ///
    /// Returns `([batch, action_dim]` logits, `[batch, value_dim]` values`)`,
    /// both attached to the autograd graph.
    fn forward(&self, states: &Tensor) -> (Tensor, Tensor);
}

pub(crate) fn tch_err(e: tch::TchError) -> TrainError {
    TrainError::Model(e.to_string())
}

/// Copies a tensor of any shape to a flat `Vec<f64>`, outside the graph.
pub(crate) fn to_vec(t: &Tensor) -> Result<Vec<f64>, TrainError> {
    let flat = t
        .detach()
        .to_kind(Kind::Double)
        .to_device(tch::Device::Cpu)
        .flatten(0, -1);
    Vec::<f64>::try_from(&flat).map_err(tch_err)
}
