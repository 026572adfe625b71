//! The task-allocation matrix μ.

use crate::error::TrainError;

/// N agents × M tasks matrix of allocation weights in `[0, 1]`.
///
/// `μ[a][j]` is the share of task `j` assigned to agent `a`. An agent with a
/// larger share bears a larger part of that task's penalty gradient.
#[derive(Debug, Clone, PartialEq)]
pub struct Allocation {
    n_agents: usize,
    n_tasks: usize,
    weights: Vec<f64>,
}

impl Allocation {
    /// Builds an allocation from one row per agent.
    pub fn new(rows: Vec<Vec<f64>>) -> Result<Self, TrainError> {
        let n_agents = rows.len();
        let n_tasks = rows.first().map_or(0, Vec::len);
        if let Some(bad) = rows.iter().find(|r| r.len() != n_tasks) {
            return Err(TrainError::AllocationShape {
                rows: n_agents,
                cols: bad.len(),
                n_agents,
                n_tasks,
            });
        }
        for (a, row) in rows.iter().enumerate() {
            for (j, &value) in row.iter().enumerate() {
                if !(0.0..=1.0).contains(&value) {
                    return Err(TrainError::AllocationValue {
                        agent: a,
                        task: j,
                        value,
                    });
                }
            }
        }
        Ok(Self {
            n_agents,
            n_tasks,
            weights: rows.into_iter().flatten().collect(),
        })
    }

    /// Every task shared equally among all agents.
    pub fn uniform(n_agents: usize, n_tasks: usize) -> Self {
        let w = if n_agents == 0 { 0.0 } else { 1.0 / n_agents as f64 };
        Self {
            n_agents,
            n_tasks,
            weights: vec![w; n_agents * n_tasks],
        }
    }

    /// Number of agents (rows).
    pub fn n_agents(&self) -> usize {
        self.n_agents
    }

    /// Number of tasks (columns).
    pub fn n_tasks(&self) -> usize {
        self.n_tasks
    }

    /// Share of `task` assigned to `agent`.
    pub fn get(&self, agent: usize, task: usize) -> f64 {
        self.weights[agent * self.n_tasks + task]
    }

    /// Allocation weights of one agent, in task order.
    pub fn row(&self, agent: usize) -> &[f64] {
        &self.weights[agent * self.n_tasks..(agent + 1) * self.n_tasks]
    }

    /// Fails unless the matrix is `n_agents × n_tasks`.
    pub fn check_shape(&self, n_agents: usize, n_tasks: usize) -> Result<(), TrainError> {
        if self.n_agents != n_agents || self.n_tasks != n_tasks {
            return Err(TrainError::AllocationShape {
                rows: self.n_agents,
                cols: self.n_tasks,
                n_agents,
                n_tasks,
            });
        }
        Ok(())
    }

    /// Descends one step along `grad` on an agent's row and clamps the
    /// result back into `[0, 1]`.
    pub fn apply_gradient(&mut self, agent: usize, grad: &[f64]) -> Result<(), TrainError> {
        if grad.len() != self.n_tasks {
            return Err(TrainError::AllocationShape {
                rows: 1,
                cols: grad.len(),
                n_agents: 1,
                n_tasks: self.n_tasks,
            });
        }
        let n_tasks = self.n_tasks;
        for (w, g) in self.weights[agent * n_tasks..(agent + 1) * n_tasks]
            .iter_mut()
            .zip(grad)
        {
            *w = (*w - g).clamp(0.0, 1.0);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_splits_tasks() {
        let mu = Allocation::uniform(4, 2);
        assert_eq!(mu.get(3, 1), 0.25);
        assert_eq!(mu.row(0), &[0.25, 0.25]);
        assert!(mu.check_shape(4, 2).is_ok());
        assert!(mu.check_shape(2, 4).is_err());
    }

    #[test]
    fn ragged_rows_rejected() {
        let r = Allocation::new(vec![vec![0.5, 0.5], vec![0.5]]);
        assert!(matches!(r, Err(TrainError::AllocationShape { .. })));
    }

    #[test]
    fn out_of_range_weight_rejected() {
        let r = Allocation::new(vec![vec![0.5], vec![1.5]]);
        assert_eq!(
            r,
            Err(TrainError::AllocationValue {
                agent: 1,
                task: 0,
                value: 1.5
            })
        );
    }

    #[test]
    fn gradient_step_is_clamped() {
        let mut mu = Allocation::new(vec![vec![0.5, 0.1], vec![0.5, 0.9]]).unwrap();
        mu.apply_gradient(0, &[-0.7, 0.3]).unwrap();
        assert_eq!(mu.row(0), &[1.0, 0.0]);
        assert_eq!(mu.row(1), &[0.5, 0.9]);
        assert!(mu.apply_gradient(0, &[0.0]).is_err());
    }
}
