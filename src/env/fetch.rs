//! A walled grid with a key and a ball to fetch.
//!
//! Reference environment for task-driven training: it exposes no goal of
//! its own beyond a time-decayed pickup reward, and its labels ("key",
//! "ball") drive task automata.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use super::{EnvStep, Environment};
use crate::automaton::Labeller;
use crate::error::TrainError;

/// Discrete moves available in [`FetchGrid`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchAction {
    Left,
    Right,
    Up,
    Down,
    Pickup,
}

impl FetchAction {
    pub const COUNT: usize = 5;
}

impl TryFrom<usize> for FetchAction {
    type Error = TrainError;

    fn try_from(action: usize) -> Result<Self, Self::Error> {
        match action {
            0 => Ok(FetchAction::Left),
            1 => Ok(FetchAction::Right),
            2 => Ok(FetchAction::Up),
            3 => Ok(FetchAction::Down),
            4 => Ok(FetchAction::Pickup),
            _ => Err(TrainError::UnknownAction {
                action,
                action_dim: Self::COUNT,
            }),
        }
    }
}

type Cell = (usize, usize);

/// Square grid of side `size` whose border cells are walls.
///
/// The layout (agent start, key, ball) is drawn once at construction, so
/// every reset reproduces the same initial observation.
#[derive(Debug, Clone)]
pub struct FetchGrid {
    size: usize,
    start: Cell,
    key_start: Cell,
    ball_start: Cell,
    agent: Cell,
    key: Option<Cell>,
    ball: Option<Cell>,
    step_count: usize,
    max_steps: usize,
}

impl FetchGrid {
    /// Number of features in an observation.
    pub const STATE_DIM: usize = 8;

    /// Creates a grid with a random layout drawn from `seed`.
    pub fn new(size: usize, seed: u64) -> Result<Self, TrainError> {
        if size < 4 {
            return Err(TrainError::InvalidConfig(format!(
                "fetch grid needs size >= 4, got {size}"
            )));
        }
        let mut rng = StdRng::seed_from_u64(seed);
        let interior: Vec<Cell> = (1..size - 1)
            .flat_map(|x| (1..size - 1).map(move |y| (x, y)))
            .collect();
        let picked: Vec<Cell> = interior.choose_multiple(&mut rng, 3).copied().collect();
        Self::with_layout(size, picked[0], picked[1], picked[2])
    }

    /// Creates a grid with an explicit layout.
    pub fn with_layout(size: usize, agent: Cell, key: Cell, ball: Cell) -> Result<Self, TrainError> {
        let inside = |(x, y): Cell| x >= 1 && y >= 1 && x + 1 < size && y + 1 < size;
        if !(inside(agent) && inside(key) && inside(ball)) {
            return Err(TrainError::InvalidConfig(
                "agent, key and ball must lie inside the walls".into(),
            ));
        }
        Ok(Self {
            size,
            start: agent,
            key_start: key,
            ball_start: ball,
            agent,
            key: Some(key),
            ball: Some(ball),
            step_count: 0,
            max_steps: 5 * size * size,
        })
    }

    /// Step limit after which the grid reports `done` on its own.
    pub fn max_steps(&self) -> usize {
        self.max_steps
    }

    /// Agent cell as `(x, y)`.
    pub fn agent_position(&self) -> (usize, usize) {
        self.agent
    }

    /// Whether the key has been picked up this episode.
    pub fn has_key(&self) -> bool {
        self.key.is_none()
    }

    /// Whether the ball has been picked up this episode.
    pub fn has_ball(&self) -> bool {
        self.ball.is_none()
    }

    /// Labels emitted in the current state.
    pub fn labels(&self) -> Vec<String> {
        let mut labels = Vec::new();
        if self.has_key() {
            labels.push("key".to_string());
        }
        if self.has_ball() {
            labels.push("ball".to_string());
        }
        labels
    }

    /// Labelling function for a [`crate::automaton::CrossProductDfa`].
    pub fn labeller() -> Labeller<FetchGrid> {
        Box::new(|env: &FetchGrid| env.labels())
    }

    fn observation(&self) -> Vec<f64> {
        let s = self.size as f64;
        let pos = |c: Option<Cell>| c.map_or((0.0, 0.0), |(x, y)| (x as f64 / s, y as f64 / s));
        let (kx, ky) = pos(self.key);
        let (bx, by) = pos(self.ball);
        vec![
            self.agent.0 as f64 / s,
            self.agent.1 as f64 / s,
            kx,
            ky,
            bx,
            by,
            if self.has_key() { 1.0 } else { 0.0 },
            if self.has_ball() { 1.0 } else { 0.0 },
        ]
    }

    fn pickup_reward(&self) -> f64 {
        1.0 - 0.9 * (self.step_count as f64 / self.max_steps as f64)
    }
}

impl Environment for FetchGrid {
    fn reset(&mut self) -> Vec<f64> {
        self.agent = self.start;
        self.key = Some(self.key_start);
        self.ball = Some(self.ball_start);
        self.step_count = 0;
        self.observation()
    }

    fn step(&mut self, action: usize) -> Result<EnvStep, TrainError> {
        let action = FetchAction::try_from(action)?;
        self.step_count += 1;

        let (x, y) = self.agent;
        let mut reward = 0.0;
        match action {
            FetchAction::Left => self.agent = (x.saturating_sub(1).max(1), y),
            FetchAction::Right => self.agent = ((x + 1).min(self.size - 2), y),
            FetchAction::Up => self.agent = (x, y.saturating_sub(1).max(1)),
            FetchAction::Down => self.agent = (x, (y + 1).min(self.size - 2)),
            FetchAction::Pickup => {
                if self.key == Some(self.agent) {
                    self.key = None;
                    reward = self.pickup_reward();
                } else if self.ball == Some(self.agent) {
                    self.ball = None;
                    reward = self.pickup_reward();
                }
            }
        }

        Ok(EnvStep {
            state: self.observation(),
            reward,
            done: self.step_count >= self.max_steps,
        })
    }

    fn action_dim(&self) -> usize {
        FetchAction::COUNT
    }

    fn state_dim(&self) -> usize {
        Self::STATE_DIM
    }

    fn render(&self) -> Option<String> {
        let mut out = String::with_capacity(self.size * (self.size + 1));
        for y in 0..self.size {
            for x in 0..self.size {
                let c = if x == 0 || y == 0 || x + 1 == self.size || y + 1 == self.size {
                    '#'
                } else if self.agent == (x, y) {
                    'A'
                } else if self.key == Some((x, y)) {
                    'K'
                } else if self.ball == Some((x, y)) {
                    'B'
                } else {
                    '.'
                };
                out.push(c);
            }
            out.push('\n');
        }
        Some(out)
    }
}
