//! Constrained multi-objective weighting.
//!
//! Each agent's advantage is the projection of its per-component return
//! errors onto a weighting vector H. H couples the agents: its task entries
//! depend on every agent's initial value estimate, which enters only as a
//! constant snapshot ([`InitialValues`]). Everything here is plain `f64`
//! because nothing is ever differentiated through the snapshot; the
//! differentiable losses built from H live in `objective` (feature `nn`).

use super::allocation::Allocation;
use super::penalty::{df, dh};
use crate::config::TrainingConfig;
use crate::error::TrainError;

/// Critic value estimates at the first timestep of every agent's episode.
///
/// Built once per training step after all rollouts finish and read-only
/// afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct InitialValues {
    rows: Vec<Vec<f64>>,
    width: usize,
}

impl InitialValues {
    /// Stacks one value vector per agent; every row must have `width`
    /// entries (M+1).
    pub fn new(rows: Vec<Vec<f64>>, width: usize) -> Result<Self, TrainError> {
        if let Some(bad) = rows.iter().find(|r| r.len() != width) {
            return Err(TrainError::ValueShape {
                expected: width,
                found: bad.len(),
            });
        }
        Ok(Self { rows, width })
    }

    /// Number of agents N.
    pub fn n_agents(&self) -> usize {
        self.rows.len()
    }

    /// Number of reward components M+1.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Initial value vector of one agent.
    pub fn agent(&self, agent: usize) -> &[f64] {
        &self.rows[agent]
    }

    /// Sum over agents of component `k`.
    pub fn column_sum(&self, k: usize) -> f64 {
        self.rows.iter().map(|r| r[k]).sum()
    }
}

/// Penalty weights and thresholds entering H and the critic loss.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LossWeights {
    /// λ, agent-performance weight.
    pub lambda: f64,
    /// χ, task-performance weight.
    pub chi: f64,
    /// e, task success threshold.
    pub task_threshold: f64,
    /// c, agent performance threshold.
    pub agent_threshold: f64,
    pub huber_delta: f64,
}

impl From<&TrainingConfig> for LossWeights {
    fn from(cfg: &TrainingConfig) -> Self {
        Self {
            lambda: cfg.lambda,
            chi: cfg.chi,
            task_threshold: cfg.task_threshold,
            agent_threshold: cfg.agent_threshold,
            huber_delta: cfg.huber_delta,
        }
    }
}

fn check_agents(
    x: &InitialValues,
    agent: usize,
    mu: &Allocation,
) -> Result<(), TrainError> {
    if agent >= x.n_agents() {
        return Err(TrainError::AgentCount {
            expected: agent + 1,
            found: x.n_agents(),
        });
    }
    mu.check_shape(x.n_agents(), x.width().saturating_sub(1))
}

/// Task entries of H for `agent`, one per task:
/// `χ · dh(Σ_a μ[agent][j]·X[a][j+1], e) · μ[agent][j]`.
pub fn compute_task_h(
    x: &InitialValues,
    agent: usize,
    mu: &Allocation,
    chi: f64,
    e: f64,
) -> Result<Vec<f64>, TrainError> {
    check_agents(x, agent, mu)?;
    Ok((0..mu.n_tasks())
        .map(|j| {
            let share = mu.get(agent, j);
            chi * dh(share * x.column_sum(j + 1), e) * share
        })
        .collect())
}

/// Full weighting vector H (length M+1) for `agent`: the agent penalty
/// `λ · df(Xi[0], c)` followed by [`compute_task_h`].
pub fn compute_h(
    x: &InitialValues,
    agent: usize,
    weights: &LossWeights,
    mu: &Allocation,
) -> Result<Vec<f64>, TrainError> {
    let task_h = compute_task_h(x, agent, mu, weights.chi, weights.task_threshold)?;
    let xi = x.agent(agent);
    let mut h = Vec::with_capacity(task_h.len() + 1);
    h.push(weights.lambda * df(xi[0], weights.agent_threshold));
    h.extend(task_h);
    Ok(h)
}

/// Allocator loss for `agent`:
/// `lr · Σ_j (Σ_a X[a][j+1]) · H_task[j]`.
pub fn compute_allocator_loss(
    x: &InitialValues,
    agent: usize,
    mu: &Allocation,
    chi: f64,
    e: f64,
    lr: f64,
) -> Result<f64, TrainError> {
    let task_h = compute_task_h(x, agent, mu, chi, e)?;
    Ok(lr
        * task_h
            .iter()
            .enumerate()
            .map(|(j, h)| x.column_sum(j + 1) * h)
            .sum::<f64>())
}
