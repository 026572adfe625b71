//! Joint multi-agent training loop.
//!
//! One training step:
//! 1. every agent resets its environment and automaton and plays one
//!    episode, bounded by `max_steps_per_episode`, keeping the autograd
//!    graph of its log-probabilities and value estimates;
//! 2. discounted reward-vector returns are computed per agent;
//! 3. the first-timestep value vectors of all agents are copied out of the
//!    graph into an [`InitialValues`] snapshot (no loss is computed before
//!    every rollout has finished);
//! 4. each agent's actor-critic loss is assembled against that snapshot;
//! 5. the agents' losses are summed and one Adam step is taken over the
//!    shared `VarStore` holding every agent's variables.

use tch::{nn, nn::OptimizerConfig, Device, Kind, Tensor};
use tracing::{debug, info, trace, warn};

use super::allocation::Allocation;
use super::loss::{compute_allocator_loss, InitialValues, LossWeights};
use super::objective::{allocator_loss, compute_actor_loss};
use super::returns::expected_returns;
use super::trajectory::{Trajectory, Transition};
use crate::automaton::TaskAutomaton;
use crate::config::{AllocationLearning, TrainingConfig};
use crate::env::{Environment, TaskEnv};
use crate::error::TrainError;
use crate::model::{tch_err, to_vec, ActorCritic};

/// An agent: its own model and its own (environment, automaton) pair.
#[derive(Debug)]
pub struct Agent<E, A, M> {
    pub env: TaskEnv<E, A>,
    pub model: M,
}

impl<E, A, M> Agent<E, A, M>
where
    E: Environment,
    A: TaskAutomaton<E>,
    M: ActorCritic,
{
    /// Pairs a task-wrapped environment with the model that acts in it.
    pub fn new(env: TaskEnv<E, A>, model: M) -> Self {
        Self { env, model }
    }

    fn check(&self, index: usize, n_tasks: usize) -> Result<(), TrainError> {
        if self.env.num_tasks() != n_tasks {
            return Err(TrainError::InvalidConfig(format!(
                "agent {index} tracks {} tasks, expected {n_tasks}",
                self.env.num_tasks()
            )));
        }
        if self.model.value_dim() != n_tasks + 1 {
            return Err(TrainError::ValueShape {
                expected: n_tasks + 1,
                found: self.model.value_dim(),
            });
        }
        if self.model.state_dim() != self.env.state_dim() {
            return Err(TrainError::StateShape {
                expected: self.env.state_dim(),
                found: self.model.state_dim(),
            });
        }
        if self.model.action_dim() != self.env.action_dim() {
            return Err(TrainError::InvalidConfig(format!(
                "agent {index} model has {} actions, environment has {}",
                self.model.action_dim(),
                self.env.action_dim()
            )));
        }
        Ok(())
    }
}

/// Plays one episode with actions sampled from the agent's policy.
///
/// The episode ends when the adapter reports termination or after
/// `config.max_steps_per_episode` steps; in the latter case the trajectory
/// is marked truncated. With `config.render` set, every frame the
/// environment draws is emitted at `trace` level.
pub fn run_episode<E, A, M>(
    agent: &mut Agent<E, A, M>,
    index: usize,
    config: &TrainingConfig,
    device: Device,
) -> Result<Trajectory, TrainError>
where
    E: Environment,
    A: TaskAutomaton<E>,
    M: ActorCritic,
{
    let width = agent.env.reward_dim();
    let mut trajectory = Trajectory::new();
    let mut state = agent.env.reset();
    let mut done = false;

    for t in 0..config.max_steps_per_episode {
        let input = Tensor::from_slice(&state)
            .to_kind(Kind::Float)
            .to_device(device)
            .unsqueeze(0);
        let (logits, values) = agent.model.forward(&input);
        let value = values.squeeze_dim(0);
        if value.size() != [width as i64] {
            return Err(TrainError::ValueShape {
                expected: width,
                found: value.size().last().copied().unwrap_or(0) as usize,
            });
        }

        let log_probs = logits.log_softmax(-1, Kind::Float);
        let action_t = log_probs.exp().detach().f_multinomial(1, true).map_err(tch_err)?;
        let action = action_t.int64_value(&[0, 0]) as usize;
        let log_prob = log_probs.gather(-1, &action_t, false).squeeze();

        let step = agent.env.step(action)?;
        if config.render {
            if let Some(frame) = agent.env.render() {
                trace!(agent = index, step = t, "\n{frame}");
            }
        }
        state = step.state;
        trajectory.push(Transition {
            action,
            log_prob,
            value,
            reward: step.rewards,
        });

        if step.done {
            done = true;
            break;
        }
    }

    trajectory.truncated = !done;
    Ok(trajectory)
}

/// Outcome of one training step.
#[derive(Debug, Clone, PartialEq)]
pub struct StepReport {
    pub episode_lengths: Vec<usize>,
    /// Per-agent reward vector summed over the episode.
    pub episode_rewards: Vec<Vec<f64>>,
    pub truncated: Vec<bool>,
    pub actor_losses: Vec<f64>,
    pub critic_losses: Vec<f64>,
    pub allocator_losses: Vec<f64>,
    /// Weighting vectors H used for each agent.
    pub h: Vec<Vec<f64>>,
    /// Snapshot the losses of this step were built against.
    pub initial_values: InitialValues,
}

impl StepReport {
    /// Mean over agents of the total episode reward (all components).
    pub fn mean_reward(&self) -> f64 {
        if self.episode_rewards.is_empty() {
            return 0.0;
        }
        self.episode_rewards
            .iter()
            .map(|r| r.iter().sum::<f64>())
            .sum::<f64>()
            / self.episode_rewards.len() as f64
    }
}

/// Trains N agents on M shared tasks with one joint update per step.
///
/// Every agent's model must register its variables in the `VarStore` handed
/// to [`Trainer::new`], typically under `vs.root() / format!("agent{i}")`.
pub struct Trainer<E, A, M> {
    agents: Vec<Agent<E, A, M>>,
    vs: nn::VarStore,
    optimizer: nn::Optimizer,
    allocation: Allocation,
    config: TrainingConfig,
    steps_done: u32,
}

impl<E, A, M> Trainer<E, A, M>
where
    E: Environment,
    A: TaskAutomaton<E>,
    M: ActorCritic,
{
    /// Creates a trainer with an Adam optimizer over every variable in `vs`,
    /// checking that agents, models and μ agree on the number of agents and
    /// tasks.
    ///
    /// Seeds the global tch generator with `config.seed`.
    pub fn new(
        agents: Vec<Agent<E, A, M>>,
        vs: nn::VarStore,
        allocation: Allocation,
        config: TrainingConfig,
    ) -> Result<Self, TrainError> {
        config.validate()?;
        let Some(first) = agents.first() else {
            return Err(TrainError::AgentCount {
                expected: 1,
                found: 0,
            });
        };
        let n_tasks = first.env.num_tasks();
        for (i, agent) in agents.iter().enumerate() {
            agent.check(i, n_tasks)?;
        }
        allocation.check_shape(agents.len(), n_tasks)?;

        let optimizer = nn::Adam::default()
            .build(&vs, config.learning_rate)
            .map_err(tch_err)?;
        tch::manual_seed(config.seed as i64);

        Ok(Self {
            agents,
            vs,
            optimizer,
            allocation,
            config,
            steps_done: 0,
        })
    }

    /// The agents, in index order.
    pub fn agents(&self) -> &[Agent<E, A, M>] {
        &self.agents
    }

    /// Current allocation matrix μ.
    pub fn allocation(&self) -> &Allocation {
        &self.allocation
    }

    /// Variables of every agent's model.
    pub fn var_store(&self) -> &nn::VarStore {
        &self.vs
    }

    /// Number of training steps applied so far.
    pub fn steps_done(&self) -> u32 {
        self.steps_done
    }

    /// Runs one episode per agent and applies one joint update.
    pub fn train_step(&mut self) -> Result<StepReport, TrainError> {
        let width = self.allocation.n_tasks() + 1;
        let device = self.vs.device();

        let mut trajectories = Vec::with_capacity(self.agents.len());
        for (i, agent) in self.agents.iter_mut().enumerate() {
            let trajectory = run_episode(agent, i, &self.config, device)?;
            debug!(
                agent = i,
                steps = trajectory.len(),
                truncated = trajectory.truncated,
                reward = ?trajectory.reward_sum(width),
                "episode finished"
            );
            if trajectory.truncated {
                warn!(
                    agent = i,
                    max_steps = self.config.max_steps_per_episode,
                    "episode truncated at step bound"
                );
            }
            trajectories.push(trajectory);
        }

        // Every rollout has finished: snapshot the initial values.
        let initial_rows = trajectories
            .iter()
            .map(Trajectory::initial_value)
            .collect::<Result<Vec<_>, _>>()?;
        let initial = InitialValues::new(initial_rows, width)?;

        let weights = LossWeights::from(&self.config);
        let mut losses = Vec::with_capacity(self.agents.len());
        let mut allocator_losses = Vec::with_capacity(self.agents.len());
        for (i, trajectory) in trajectories.iter().enumerate() {
            let returns = expected_returns(
                &trajectory.rewards(),
                self.config.gamma,
                self.config.standardize_returns,
            )?;
            losses.push(compute_actor_loss(
                &trajectory.log_probs()?,
                &trajectory.values()?,
                &returns_tensor(&returns, width, device),
                &initial,
                i,
                &self.allocation,
                &weights,
            )?);
            allocator_losses.push(compute_allocator_loss(
                &initial,
                i,
                &self.allocation,
                self.config.chi,
                self.config.task_threshold,
                self.config.allocator_lr,
            )?);
        }

        let totals: Vec<&Tensor> = losses.iter().map(|l| &l.total).collect();
        let joint = Tensor::f_stack(&totals, 0).map_err(tch_err)?.sum(Kind::Float);
        self.optimizer.zero_grad();
        joint.f_backward().map_err(tch_err)?;
        self.optimizer.step();

        if self.config.allocation_learning == AllocationLearning::Gradient {
            // Gradients are taken at the μ used for this step's losses.
            self.update_allocation(&initial)?;
        }

        self.steps_done += 1;
        Ok(StepReport {
            episode_lengths: trajectories.iter().map(Trajectory::len).collect(),
            episode_rewards: trajectories.iter().map(|t| t.reward_sum(width)).collect(),
            truncated: trajectories.iter().map(|t| t.truncated).collect(),
            actor_losses: losses.iter().map(|l| l.actor.double_value(&[])).collect(),
            critic_losses: losses.iter().map(|l| l.critic.double_value(&[])).collect(),
            allocator_losses,
            h: losses.into_iter().map(|l| l.h).collect(),
            initial_values: initial,
        })
    }

    /// One descent step of μ on the allocator loss, differentiated by tch.
    fn update_allocation(&mut self, initial: &InitialValues) -> Result<(), TrainError> {
        let n_agents = self.allocation.n_agents();
        let n_tasks = self.allocation.n_tasks();
        if n_tasks == 0 {
            return Ok(());
        }
        let flat: Vec<f64> = (0..n_agents)
            .flat_map(|a| self.allocation.row(a).to_vec())
            .collect();
        let mu = Tensor::from_slice(&flat)
            .reshape([n_agents as i64, n_tasks as i64])
            .set_requires_grad(true);
        let loss = allocator_loss(
            &mu,
            initial,
            self.config.chi,
            self.config.task_threshold,
            self.config.allocator_lr,
        )?;
        loss.f_backward().map_err(tch_err)?;

        let grad = to_vec(&mu.grad())?;
        for (a, row) in grad.chunks(n_tasks).enumerate() {
            self.allocation.apply_gradient(a, row)?;
        }
        Ok(())
    }

    /// Runs `n_steps` training steps.
    ///
    /// Returns the learning curve as `(step, mean episode reward)` pairs.
    pub fn train(&mut self, n_steps: u32) -> Result<Vec<(u32, f64)>, TrainError> {
        let mut curve = Vec::with_capacity(n_steps as usize);
        for _ in 0..n_steps {
            let report = self.train_step()?;
            let step = self.steps_done;
            let mean_reward = report.mean_reward();
            curve.push((step, mean_reward));

            let interval = self.config.log_interval;
            if interval > 0 && step % interval == 0 {
                info!(
                    step,
                    mean_reward,
                    actor_loss = ?report.actor_losses,
                    critic_loss = ?report.critic_losses,
                    "training progress"
                );
            }
        }
        Ok(curve)
    }
}

/// Constant `[T, width]` tensor of returns.
fn returns_tensor(returns: &[Vec<f64>], width: usize, device: Device) -> Tensor {
    let flat: Vec<f64> = returns.iter().flatten().copied().collect();
    Tensor::from_slice(&flat)
        .reshape([returns.len() as i64, width as i64])
        .to_kind(Kind::Float)
        .to_device(device)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::automaton::{CrossProductDfa, Dfa};
    use crate::env::FetchGrid;
    use crate::model::MlpActorCritic;

    type FetchAgent = Agent<FetchGrid, CrossProductDfa<FetchGrid>, MlpActorCritic>;

    fn fetch_agent(vs: &nn::VarStore, index: usize, value_dim: usize) -> FetchAgent {
        let env = FetchGrid::new(5, index as u64 + 1).unwrap();
        let dfa = CrossProductDfa::new(vec![Dfa::eventually("key")], FetchGrid::labeller()).unwrap();
        let model = MlpActorCritic::new(
            &(vs.root() / format!("agent{index}")),
            FetchGrid::STATE_DIM,
            5,
            value_dim,
        );
        Agent::new(TaskEnv::new(env, dfa), model)
    }

    fn team(n: usize) -> (nn::VarStore, Vec<FetchAgent>) {
        let vs = nn::VarStore::new(Device::Cpu);
        let agents = (0..n).map(|i| fetch_agent(&vs, i, 2)).collect();
        (vs, agents)
    }

    fn config() -> TrainingConfig {
        TrainingConfig {
            max_steps_per_episode: 20,
            ..TrainingConfig::default()
        }
    }

    fn snapshot(vs: &nn::VarStore) -> Vec<(String, Tensor)> {
        let mut vars: Vec<_> = vs
            .variables()
            .into_iter()
            .map(|(name, t)| (name, t.detach().copy()))
            .collect();
        vars.sort_by(|a, b| a.0.cmp(&b.0));
        vars
    }

    #[test]
    fn trainer_rejects_mismatched_allocation() {
        let (vs, agents) = team(2);
        let r = Trainer::new(agents, vs, Allocation::uniform(3, 1), config());
        assert!(matches!(r, Err(TrainError::AllocationShape { .. })));
    }

    #[test]
    fn trainer_rejects_wrong_value_width() {
        let vs = nn::VarStore::new(Device::Cpu);
        let agent = fetch_agent(&vs, 0, 3);
        let r = Trainer::new(vec![agent], vs, Allocation::uniform(1, 1), config());
        assert!(matches!(
            r,
            Err(TrainError::ValueShape {
                expected: 2,
                found: 3
            })
        ));
    }

    #[test]
    fn trainer_rejects_no_agents() {
        let r = Trainer::<FetchGrid, CrossProductDfa<FetchGrid>, MlpActorCritic>::new(
            vec![],
            nn::VarStore::new(Device::Cpu),
            Allocation::uniform(0, 0),
            config(),
        );
        assert!(matches!(r, Err(TrainError::AgentCount { .. })));
    }

    #[test]
    fn episode_respects_step_bound() {
        let (_vs, mut agents) = team(1);
        let cfg = TrainingConfig {
            max_steps_per_episode: 7,
            ..config()
        };
        let traj = run_episode(&mut agents[0], 0, &cfg, Device::Cpu).unwrap();
        assert!(traj.len() <= 7);
        assert_eq!(
            traj.truncated,
            traj.len() == 7 && !agents[0].env.automaton().is_success()
        );
        for t in &traj.transitions {
            assert!(t.action < 5);
            assert_eq!(t.reward.len(), 2);
            assert_eq!(t.value.size(), &[2]);
            assert!(t.log_prob.double_value(&[]) <= 0.0);
        }
        assert!(traj.log_probs().unwrap().requires_grad());
    }

    #[test]
    fn train_step_updates_every_agent() {
        let (vs, agents) = team(2);
        let before = snapshot(&vs);
        let mut trainer = Trainer::new(agents, vs, Allocation::uniform(2, 1), config()).unwrap();

        let report = trainer.train_step().unwrap();
        assert_eq!(report.episode_lengths.len(), 2);
        assert_eq!(report.h.len(), 2);
        assert!(report.h.iter().all(|h| h.len() == 2));
        assert_eq!(report.initial_values.n_agents(), 2);
        assert_eq!(trainer.steps_done(), 1);

        let after = snapshot(trainer.var_store());
        for agent in ["agent0.", "agent1."] {
            let moved = before.iter().zip(&after).any(|((name, old), (_, new))| {
                name.starts_with(agent) && !old.equal(new)
            });
            assert!(moved, "{agent} variables unchanged");
        }
        assert_eq!(trainer.allocation(), &Allocation::uniform(2, 1));
    }

    #[test]
    fn gradient_allocation_stays_in_unit_interval() {
        let (vs, agents) = team(2);
        let cfg = TrainingConfig {
            allocation_learning: AllocationLearning::Gradient,
            allocator_lr: 1.0,
            ..config()
        };
        let mu = Allocation::new(vec![vec![0.5], vec![0.5]]).unwrap();
        let mut trainer = Trainer::new(agents, vs, mu, cfg).unwrap();
        for _ in 0..3 {
            trainer.train_step().unwrap();
        }
        let mu = trainer.allocation();
        for a in 0..2 {
            assert!((0.0..=1.0).contains(&mu.get(a, 0)));
        }
    }

    #[test]
    fn train_returns_learning_curve() {
        let (vs, agents) = team(1);
        let mut trainer = Trainer::new(agents, vs, Allocation::uniform(1, 1), config()).unwrap();
        let curve = trainer.train(3).unwrap();
        assert_eq!(curve.iter().map(|(s, _)| *s).collect::<Vec<_>>(), vec![1, 2, 3]);
    }
}
