//! Couples an environment with its task automaton.
//!
//! A step of the wrapped environment becomes a reward vector of length
//! M+1: component 0 is the environment's own reward, components 1..=M are
//! the task rewards reported by the automaton. Termination is decided by the
//! automaton alone.

use super::{EnvStep, Environment};
use crate::automaton::TaskAutomaton;
use crate::error::TrainError;

/// Result of one adapted step.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorStep {
    /// Observation after the step.
    pub state: Vec<f64>,
    /// Reward vector `[agent, task_1, .., task_M]`.
    pub rewards: Vec<f64>,
    /// Episode termination as decided by the automaton.
    pub done: bool,
    /// The environment's own termination flag, for diagnostics only.
    pub raw_done: bool,
}

/// Reward-vector adapter around one (environment, automaton) pair.
///
/// The pair is reset together and never independently; their states form
/// one combined episode state.
#[derive(Debug)]
pub struct TaskEnv<E, A> {
    env: E,
    automaton: A,
}

impl<E, A> TaskEnv<E, A>
where
    E: Environment,
    A: TaskAutomaton<E>,
{
    /// Wraps `env`, tracking its tasks with `automaton`.
    pub fn new(env: E, automaton: A) -> Self {
        Self { env, automaton }
    }

    /// Number of tasks M.
    pub fn num_tasks(&self) -> usize {
        self.automaton.num_tasks()
    }

    /// Length of every reward vector (M+1).
    pub fn reward_dim(&self) -> usize {
        self.num_tasks() + 1
    }

    /// Size of the wrapped environment's action space.
    pub fn action_dim(&self) -> usize {
        self.env.action_dim()
    }

    /// Length of the wrapped environment's observations.
    pub fn state_dim(&self) -> usize {
        self.env.state_dim()
    }

    /// The wrapped environment.
    pub fn env(&self) -> &E {
        &self.env
    }

    /// The task automaton, in the state reached by the last step.
    pub fn automaton(&self) -> &A {
        &self.automaton
    }

    /// Resets environment and automaton and returns the initial observation.
    pub fn reset(&mut self) -> Vec<f64> {
        let state = self.env.reset();
        self.automaton.reset();
        state
    }

    /// Steps the environment, advances the automaton and assembles the
    /// reward vector.
    pub fn step(&mut self, action: usize) -> Result<VectorStep, TrainError> {
        let action_dim = self.env.action_dim();
        if action >= action_dim {
            return Err(TrainError::UnknownAction { action, action_dim });
        }

        let EnvStep {
            state,
            reward,
            done: raw_done,
        } = self.env.step(action)?;
        if state.len() != self.env.state_dim() {
            return Err(TrainError::StateShape {
                expected: self.env.state_dim(),
                found: state.len(),
            });
        }

        self.automaton.advance(&self.env);
        self.automaton.mark_unreachable_tasks();

        let task_rewards = self.automaton.task_rewards();
        if task_rewards.len() != self.num_tasks() {
            return Err(TrainError::RewardShape {
                expected: self.reward_dim(),
                found: task_rewards.len() + 1,
            });
        }

        let mut rewards = Vec::with_capacity(task_rewards.len() + 1);
        rewards.push(reward);
        rewards.extend(task_rewards);

        let success = self.automaton.is_success();
        let failed = self.automaton.is_failed();
        let mut done = raw_done;
        if !success {
            // The agent reward is withheld until every task is accepted so
            // that stopping early never pays.
            done = false;
            rewards[0] = 0.0;
        }
        if success || failed {
            done = true;
        }

        Ok(VectorStep {
            state,
            rewards,
            done,
            raw_done,
        })
    }

    /// Rendering of the wrapped environment.
    pub fn render(&self) -> Option<String> {
        self.env.render()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Environment whose step outcomes are scripted in advance.
    struct Scripted {
        steps: Vec<(f64, bool)>,
        t: usize,
    }

    impl Environment for Scripted {
        fn reset(&mut self) -> Vec<f64> {
            self.t = 0;
            vec![0.0]
        }

        fn step(&mut self, _action: usize) -> Result<EnvStep, TrainError> {
            let (reward, done) = self.steps[self.t];
            self.t += 1;
            Ok(EnvStep {
                state: vec![self.t as f64],
                reward,
                done,
            })
        }

        fn action_dim(&self) -> usize {
            2
        }

        fn state_dim(&self) -> usize {
            1
        }
    }

    /// Automaton whose verdicts are scripted per environment timestep.
    struct Verdicts {
        /// (task reward, success, failed) after step t.
        script: Vec<(f64, bool, bool)>,
        current: (f64, bool, bool),
        width: usize,
    }

    impl TaskAutomaton<Scripted> for Verdicts {
        fn num_tasks(&self) -> usize {
            1
        }
        fn reset(&mut self) {
            self.current = (0.0, false, false);
        }
        fn advance(&mut self, env: &Scripted) {
            self.current = self.script[env.t - 1];
        }
        fn task_rewards(&self) -> Vec<f64> {
            vec![self.current.0; self.width]
        }
        fn is_success(&self) -> bool {
            self.current.1
        }
        fn is_failed(&self) -> bool {
            self.current.2
        }
        fn mark_unreachable_tasks(&mut self) {}
    }

    fn adapter(
        steps: Vec<(f64, bool)>,
        script: Vec<(f64, bool, bool)>,
    ) -> TaskEnv<Scripted, Verdicts> {
        TaskEnv::new(
            Scripted { steps, t: 0 },
            Verdicts {
                script,
                current: (0.0, false, false),
                width: 1,
            },
        )
    }

    #[test]
    fn raw_done_suppressed_without_verdict() {
        let mut env = adapter(vec![(5.0, true)], vec![(0.0, false, false)]);
        env.reset();
        let step = env.step(0).unwrap();
        assert!(step.raw_done);
        assert!(!step.done);
        assert_eq!(step.rewards, vec![0.0, 0.0]);
    }

    #[test]
    fn success_terminates_and_releases_agent_reward() {
        let mut env = adapter(vec![(5.0, false)], vec![(1.0, true, false)]);
        env.reset();
        let step = env.step(1).unwrap();
        assert!(step.done);
        assert_eq!(step.rewards, vec![5.0, 1.0]);
    }

    #[test]
    fn failure_terminates_with_zero_agent_reward() {
        let mut env = adapter(vec![(5.0, false)], vec![(0.0, false, true)]);
        env.reset();
        let step = env.step(0).unwrap();
        assert!(step.done);
        assert_eq!(step.rewards, vec![0.0, 0.0]);
    }

    #[test]
    fn done_iff_success_or_failure() {
        let cases = [
            ((1.0, false), (0.0, false, false), false),
            ((1.0, true), (0.0, false, false), false),
            ((1.0, false), (1.0, true, false), true),
            ((1.0, true), (0.0, false, true), true),
        ];
        for (raw, verdict, expected) in cases {
            let mut env = adapter(vec![raw], vec![verdict]);
            env.reset();
            assert_eq!(env.step(0).unwrap().done, expected);
        }
    }

    #[test]
    fn unknown_action_rejected() {
        let mut env = adapter(vec![(0.0, false)], vec![(0.0, false, false)]);
        env.reset();
        assert_eq!(
            env.step(2),
            Err(TrainError::UnknownAction {
                action: 2,
                action_dim: 2
            })
        );
    }

    #[test]
    fn reward_width_checked() {
        let mut env = adapter(vec![(0.0, false)], vec![(0.0, false, false)]);
        env.automaton.width = 2;
        env.reset();
        assert_eq!(
            env.step(0),
            Err(TrainError::RewardShape {
                expected: 2,
                found: 3
            })
        );
    }

    #[test]
    fn reward_vector_has_task_count_plus_one() {
        let mut env = adapter(vec![(0.0, false), (0.0, false)], vec![(0.0, false, false); 2]);
        assert_eq!(env.reward_dim(), 2);
        env.reset();
        for _ in 0..2 {
            assert_eq!(env.step(0).unwrap().rewards.len(), env.reward_dim());
        }
    }
}
