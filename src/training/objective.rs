//! Differentiable losses on tch tensors.
//!
//! The actor-critic loss back-propagates into the model through the rollout's
//! log-probabilities and value estimates. H and the returns enter as
//! constants. The allocator loss is differentiated with respect to the
//! allocation matrix μ only.

use tch::{Kind, Reduction, Tensor};

use super::allocation::Allocation;
use super::loss::{compute_h, InitialValues, LossWeights};
use crate::error::TrainError;

/// Loss terms of one agent for one training step.
#[derive(Debug)]
pub struct ActorLoss {
    /// `Σ_t logπ(a_t|s_t) · ((G_t − V_t)·H)`.
    pub actor: Tensor,
    /// Huber loss between values and returns, averaged over components and
    /// summed over timesteps.
    pub critic: Tensor,
    /// `actor + critic`.
    pub total: Tensor,
    /// Weighting vector H used for the advantage.
    pub h: Vec<f64>,
}

/// Builds one agent's actor-critic loss.
///
/// `log_probs` is `[T]` and `values` is `[T, M+1]`, both attached to the
/// agent's rollout graph. `returns` is `[T, M+1]` and is detached before
/// use. H is computed from the constant snapshot `x`, so other agents reach
/// this loss only through H. An empty episode (`T = 0`) gives zero losses.
pub fn compute_actor_loss(
    log_probs: &Tensor,
    values: &Tensor,
    returns: &Tensor,
    x: &InitialValues,
    agent: usize,
    mu: &Allocation,
    weights: &LossWeights,
) -> Result<ActorLoss, TrainError> {
    let h = compute_h(x, agent, weights, mu)?;
    let width = h.len();
    let steps = log_probs.size().first().copied().unwrap_or(0);
    let expected = [steps, width as i64];
    for t in [values, returns] {
        if t.size() != expected {
            return Err(TrainError::ValueShape {
                expected: width,
                found: t.size().last().copied().unwrap_or(0) as usize,
            });
        }
    }

    let kind = values.kind();
    let device = values.device();
    let h_t = Tensor::from_slice(&h).to_kind(kind).to_device(device);
    let returns = returns.detach().to_kind(kind).to_device(device);

    // Gradient flows through V in both the advantage and the critic.
    let advantage = (&returns - values).matmul(&h_t);
    let actor = (log_probs * &advantage).sum(kind);
    let critic = values
        .huber_loss(&returns, Reduction::None, weights.huber_delta)
        .sum(kind)
        / width as f64;
    let total = &actor + &critic;

    Ok(ActorLoss {
        actor,
        critic,
        total,
        h,
    })
}

/// Allocator loss of every agent, summed, as a function of the allocation
/// tensor `mu` (`[N, M]`).
///
/// Each row contributes `lr · Σ_j S_j · χ · dh(μ_ij·S_j, e) · μ_ij` with
/// `S_j = Σ_a X[a][j+1]`. Row `i` only enters agent `i`'s term, so the
/// gradient of the sum with respect to row `i` is agent `i`'s own gradient.
pub fn allocator_loss(
    mu: &Tensor,
    x: &InitialValues,
    chi: f64,
    e: f64,
    lr: f64,
) -> Result<Tensor, TrainError> {
    let n_tasks = x.width().saturating_sub(1);
    let expected = [x.n_agents() as i64, n_tasks as i64];
    if mu.size() != expected {
        let size = mu.size();
        return Err(TrainError::AllocationShape {
            rows: size.first().copied().unwrap_or(0) as usize,
            cols: size.get(1).copied().unwrap_or(0) as usize,
            n_agents: x.n_agents(),
            n_tasks,
        });
    }

    let sums: Vec<f64> = (1..=n_tasks).map(|k| x.column_sum(k)).collect();
    let s = Tensor::from_slice(&sums)
        .to_kind(mu.kind())
        .to_device(mu.device());
    let share = mu * &s;
    let task_h = dh(&share, e) * mu * chi;
    Ok((task_h * &s).sum(mu.kind()) * lr)
}

/// Elementwise task penalty; zero (with zero gradient) outside `(0, e]`.
fn dh(x: &Tensor, e: f64) -> Tensor {
    let support = x.gt(0.0).logical_and(&x.le(e)).to_kind(x.kind());
    let xs = x.clamp(f64::EPSILON, e);
    let gap = (&xs / e).log() - ((-&xs + 1.0) / (1.0 - e)).log();
    gap * support
}
