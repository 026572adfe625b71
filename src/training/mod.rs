//! Training infrastructure: discounted reward-vector returns, the
//! df/dh penalty terms, the H weighting and, with the `nn` feature, the
//! differentiable losses and the joint multi-agent trainer.

pub mod allocation;
pub mod loss;
#[cfg(feature = "nn")]
pub mod objective;
pub mod penalty;
pub mod returns;
#[cfg(feature = "nn")]
pub mod trainer;
#[cfg(feature = "nn")]
pub mod trajectory;


pub use allocation::Allocation;
pub use loss::{compute_allocator_loss, compute_h, compute_task_h, InitialValues, LossWeights};
#[cfg(feature = "nn")]
pub use objective::{allocator_loss, compute_actor_loss, ActorLoss};
pub use penalty::{df, dh};
pub use returns::expected_returns;
#[cfg(feature = "nn")]
pub use trainer::{run_episode, Agent, StepReport, Trainer};
#[cfg(feature = "nn")]
pub use trajectory::{Trajectory, Transition};
