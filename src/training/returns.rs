//! Discounted returns over reward vectors.

use crate::error::TrainError;
use crate::EPS;

/// Computes discounted returns for every reward component at once.
///
/// Walks the episode backwards keeping one running sum per component,
/// `G_t = r_t + γ·G_{t+1}`, so all components stay aligned in time.
/// With `standardize`, the returns are shifted and scaled by the mean and
/// standard deviation taken over all timesteps and components together.
///
/// An empty episode yields an empty result.
pub fn expected_returns(
    rewards: &[Vec<f64>],
    gamma: f64,
    standardize: bool,
) -> Result<Vec<Vec<f64>>, TrainError> {
    let Some(first) = rewards.first() else {
        return Ok(Vec::new());
    };
    let width = first.len();
    if let Some(bad) = rewards.iter().find(|r| r.len() != width) {
        return Err(TrainError::RewardShape {
            expected: width,
            found: bad.len(),
        });
    }

    let mut running = vec![0.0; width];
    let mut returns = Vec::with_capacity(rewards.len());
    for reward in rewards.iter().rev() {
        for (g, r) in running.iter_mut().zip(reward) {
            *g = r + gamma * *g;
        }
        returns.push(running.clone());
    }
    returns.reverse();

    if standardize {
        standardize_all(&mut returns);
    }
    Ok(returns)
}

/// Standardizes in place over the flattened set of values.
fn standardize_all(values: &mut [Vec<f64>]) {
    let n = values.iter().map(Vec::len).sum::<usize>();
    if n == 0 {
        return;
    }
    let mean = values.iter().flatten().sum::<f64>() / n as f64;
    let var = values
        .iter()
        .flatten()
        .map(|v| (v - mean).powi(2))
        .sum::<f64>()
        / n as f64;
    let std = var.sqrt();
    for v in values.iter_mut().flatten() {
        *v = (*v - mean) / (std + EPS);
    }
}
