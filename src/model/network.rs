//! MLP actor-critic using tch-rs (PyTorch bindings).

use tch::{nn, nn::Module, Tensor};

use super::ActorCritic;

/// MLP with a shared trunk and two heads.
///
/// Architecture: `state_dim → 128 → 64` with ReLU activations, then a
/// linear actor head (`64 → action_dim`) and a linear critic head
/// (`64 → value_dim`).
pub struct MlpActorCritic {
    trunk: nn::Sequential,
    actor: nn::Linear,
    critic: nn::Linear,
    state_dim: usize,
    action_dim: usize,
    value_dim: usize,
}

impl MlpActorCritic {
    /// Creates a network whose variables live under `p`
    /// (`l1`, `l2`, `actor`, `critic`).
    pub fn new(p: &nn::Path, state_dim: usize, action_dim: usize, value_dim: usize) -> Self {
        let trunk = nn::seq()
            .add(nn::linear(
                p / "l1",
                state_dim as i64,
                128,
                Default::default(),
            ))
            .add_fn(|x| x.relu())
            .add(nn::linear(p / "l2", 128, 64, Default::default()))
            .add_fn(|x| x.relu());
        let actor = nn::linear(p / "actor", 64, action_dim as i64, Default::default());
        let critic = nn::linear(p / "critic", 64, value_dim as i64, Default::default());

        Self {
            trunk,
            actor,
            critic,
            state_dim,
            action_dim,
            value_dim,
        }
    }
}

impl ActorCritic for MlpActorCritic {
    fn state_dim(&self) -> usize {
        self.state_dim
    }

    fn action_dim(&self) -> usize {
        self.action_dim
    }

    fn value_dim(&self) -> usize {
        self.value_dim
    }

    fn forward(&self, states: &Tensor) -> (Tensor, Tensor) {
        let h = self.trunk.forward(states);
        (self.actor.forward(&h), self.critic.forward(&h))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tch::{Device, Kind};

    #[test]
    fn forward_shapes() {
        let vs = nn::VarStore::new(Device::Cpu);
        let net = MlpActorCritic::new(&vs.root(), 8, 5, 3);
        let states = Tensor::randn([4, 8], (Kind::Float, Device::Cpu));
        let (logits, values) = net.forward(&states);
        assert_eq!(logits.size(), &[4, 5]);
        assert_eq!(values.size(), &[4, 3]);
    }

    #[test]
    fn agents_get_disjoint_variables() {
        let vs = nn::VarStore::new(Device::Cpu);
        let root = vs.root();
        let _a = MlpActorCritic::new(&(&root / "agent0"), 4, 2, 2);
        let _b = MlpActorCritic::new(&(&root / "agent1"), 4, 2, 2);
        let names: Vec<String> = vs.variables().into_keys().collect();
        // Four linear layers with weight and bias each.
        assert_eq!(names.len(), 16);
        assert_eq!(names.iter().filter(|n| n.starts_with("agent0.")).count(), 8);
        assert!(names.iter().any(|n| n == "agent1.critic.bias"));
    }

    #[test]
    fn outputs_track_gradients() {
        let vs = nn::VarStore::new(Device::Cpu);
        let net = MlpActorCritic::new(&vs.root(), 3, 2, 2);
        let (logits, values) = net.forward(&Tensor::ones([1, 3], (Kind::Float, Device::Cpu)));
        assert!(logits.requires_grad());
        assert!(values.requires_grad());
    }
}
