//! Two agents sharing a "fetch the key" and a "fetch the ball" task.
//!
//! Run with `cargo run --example fetch_team --features nn`. Set
//! `RUST_LOG=motap=debug` to see per-episode logs.

use motap::automaton::{CrossProductDfa, Dfa};
use motap::env::{FetchGrid, TaskEnv};
use motap::model::MlpActorCritic;
use motap::training::{Agent, Allocation, Trainer};
use motap::TrainingConfig;
use tch::{nn, Device};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const N_AGENTS: usize = 2;
const N_TASKS: usize = 2;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "motap=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = TrainingConfig {
        max_steps_per_episode: 60,
        log_interval: 20,
        ..TrainingConfig::default()
    };

    let vs = nn::VarStore::new(Device::cuda_if_available());
    let mut agents = Vec::with_capacity(N_AGENTS);
    for i in 0..N_AGENTS {
        let seed = config.seed + i as u64;
        let grid = FetchGrid::new(5, seed)?;
        let tasks = CrossProductDfa::new(
            vec![Dfa::eventually("key"), Dfa::eventually("ball")],
            FetchGrid::labeller(),
        )?;
        let model = MlpActorCritic::new(
            &(vs.root() / format!("agent{i}")),
            FetchGrid::STATE_DIM,
            5,
            N_TASKS + 1,
        );
        agents.push(Agent::new(TaskEnv::new(grid, tasks), model));
    }

    if let Some(view) = agents[0].env.render() {
        println!("Agent 0 layout:\n{view}");
    }

    let mut trainer = Trainer::new(
        agents,
        vs,
        Allocation::uniform(N_AGENTS, N_TASKS),
        config,
    )?;
    let curve = trainer.train(200)?;

    println!("\nLearning curve (every 20 steps):");
    for (step, reward) in curve.iter().filter(|(s, _)| s % 20 == 0) {
        println!("  step {step:>4}: mean episode reward {reward:.3}");
    }
    Ok(())
}
