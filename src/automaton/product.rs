//! Product of task automata driven by an environment labelling function.

use std::fmt;

use super::dfa::Dfa;
use super::error::AutomatonError;
use super::TaskAutomaton;

/// Maps an environment to the labels it currently emits.
pub type Labeller<E> = Box<dyn Fn(&E) -> Vec<String> + Send + Sync>;

/// Resolution of one task within an episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Pending,
    Accepted,
    Failed,
}

/// Cross product of one [`Dfa`] per task.
///
/// The product state is the tuple of component states. Components stop
/// moving once their task is resolved, so a task is rewarded at most once
/// per episode.
pub struct CrossProductDfa<E> {
    dfas: Vec<Dfa>,
    states: Vec<usize>,
    status: Vec<TaskStatus>,
    rewards: Vec<f64>,
    labeller: Labeller<E>,
    success_reward: f64,
    failure_reward: f64,
}

impl<E> CrossProductDfa<E> {
    /// Creates a product automaton over `dfas`, in task order.
    pub fn new(dfas: Vec<Dfa>, labeller: Labeller<E>) -> Result<Self, AutomatonError> {
        if dfas.is_empty() {
            return Err(AutomatonError::EmptyTaskSet);
        }
        let n = dfas.len();
        let states = dfas.iter().map(Dfa::initial).collect();
        Ok(Self {
            dfas,
            states,
            status: vec![TaskStatus::Pending; n],
            rewards: vec![0.0; n],
            labeller,
            success_reward: 1.0,
            failure_reward: 0.0,
        })
    }

    /// Overrides the rewards emitted when a task is accepted or failed.
    pub fn with_rewards(mut self, success: f64, failure: f64) -> Self {
        self.success_reward = success;
        self.failure_reward = failure;
        self
    }

    /// Current product state.
    pub fn product_state(&self) -> &[usize] {
        &self.states
    }

    /// Resolution status of every task, in task order.
    pub fn status(&self) -> &[TaskStatus] {
        &self.status
    }

    fn resolve(&mut self, task: usize, status: TaskStatus) {
        self.status[task] = status;
        self.rewards[task] = match status {
            TaskStatus::Accepted => self.success_reward,
            TaskStatus::Failed => self.failure_reward,
            TaskStatus::Pending => 0.0,
        };
    }

    /// Advances every pending component on an explicit label set.
    pub fn advance_labels(&mut self, labels: &[String]) {
        self.rewards.iter_mut().for_each(|r| *r = 0.0);
        for j in 0..self.dfas.len() {
            if self.status[j] != TaskStatus::Pending {
                continue;
            }
            let next = self.dfas[j].next(self.states[j], labels);
            self.states[j] = next;
            if self.dfas[j].is_accepting(next) {
                self.resolve(j, TaskStatus::Accepted);
            } else if self.dfas[j].is_rejecting(next) {
                self.resolve(j, TaskStatus::Failed);
            }
        }
    }
}

impl<E> TaskAutomaton<E> for CrossProductDfa<E> {
    fn num_tasks(&self) -> usize {
        self.dfas.len()
    }

    fn reset(&mut self) {
        for (state, dfa) in self.states.iter_mut().zip(&self.dfas) {
            *state = dfa.initial();
        }
        self.status.iter_mut().for_each(|s| *s = TaskStatus::Pending);
        self.rewards.iter_mut().for_each(|r| *r = 0.0);
    }

    fn advance(&mut self, env: &E) {
        let labels = (self.labeller)(env);
        self.advance_labels(&labels);
    }

    fn task_rewards(&self) -> Vec<f64> {
        self.rewards.clone()
    }

    fn is_success(&self) -> bool {
        self.status.iter().all(|s| *s == TaskStatus::Accepted)
    }

    fn is_failed(&self) -> bool {
        self.status.iter().all(|s| *s != TaskStatus::Pending)
            && self.status.iter().any(|s| *s == TaskStatus::Failed)
    }

    fn mark_unreachable_tasks(&mut self) {
        for j in 0..self.dfas.len() {
            if self.status[j] == TaskStatus::Pending && !self.dfas[j].can_accept(self.states[j]) {
                self.resolve(j, TaskStatus::Failed);
            }
        }
    }
}

impl<E> fmt::Debug for CrossProductDfa<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CrossProductDfa")
            .field("tasks", &self.dfas.iter().map(Dfa::name).collect::<Vec<_>>())
            .field("states", &self.states)
            .field("status", &self.status)
            .finish()
    }
}
