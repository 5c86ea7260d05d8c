//! Empirical transition table and stationary distribution.

use serde::{Deserialize, Serialize};

use crate::domain::error::RegimeChainError;
use crate::domain::state::State;

const STATIONARY_TOLERANCE: f64 = 1e-9;
const STATIONARY_MAX_ITERATIONS: usize = 10_000;

/// One-step transition probability matrix over the three regime states,
/// estimated by counting adjacent pairs in a state sequence. Rows are
/// indexed by [`State::index`] and each row sums to 1.
///
/// A from-state that never occurs as a predecessor gets a uniform row
/// (1/3 each) rather than an undefined one. This keeps every row usable by
/// arg-max prediction and the stationary solve on short slices where a
/// state is simply absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionTable {
    probs: [[f64; 3]; 3],
    counts: [[u64; 3]; 3],
}

impl TransitionTable {
    /// Count every adjacent (states[i], states[i+1]) pair and normalize each
    /// row by its total.
    pub fn from_states(states: &[State]) -> Self {
        let mut counts = [[0u64; 3]; 3];
        for pair in states.windows(2) {
            counts[pair[0].index()][pair[1].index()] += 1;
        }

        let mut probs = [[0.0f64; 3]; 3];
        for from in 0..3 {
            let total: u64 = counts[from].iter().sum();
            if total == 0 {
                probs[from] = [1.0 / 3.0; 3];
            } else {
                for to in 0..3 {
                    probs[from][to] = counts[from][to] as f64 / total as f64;
                }
            }
        }

        Self { probs, counts }
    }

    pub fn prob(&self, from: State, to: State) -> f64 {
        self.probs[from.index()][to.index()]
    }

    pub fn count(&self, from: State, to: State) -> u64 {
        self.counts[from.index()][to.index()]
    }

    /// Probability row for a from-state, ordered as [`State::ALL`].
    pub fn row(&self, from: State) -> [f64; 3] {
        self.probs[from.index()]
    }

    /// Total observed transitions out of a from-state.
    pub fn row_total(&self, from: State) -> u64 {
        self.counts[from.index()].iter().sum()
    }

    /// Most probable next state. Ties resolve in [`State::ALL`] order, so a
    /// fully uniform row predicts Bull.
    pub fn predict_next(&self, from: State) -> State {
        let row = self.row(from);
        let mut best = State::ALL[0];
        let mut best_prob = row[0];
        for state in State::ALL.iter().skip(1) {
            let p = row[state.index()];
            if p > best_prob {
                best = *state;
                best_prob = p;
            }
        }
        best
    }

    /// Solve pi P = pi by power iteration from the uniform distribution,
    /// stopping once the L1 change drops below 1e-9. The iteration cap
    /// guarantees termination; hitting it is reported, not truncated.
    pub fn stationary(&self) -> Result<StationaryDistribution, RegimeChainError> {
        let mut pi = [1.0 / 3.0; 3];

        for _ in 0..STATIONARY_MAX_ITERATIONS {
            let mut next = [0.0f64; 3];
            for to in 0..3 {
                for from in 0..3 {
                    next[to] += pi[from] * self.probs[from][to];
                }
            }

            let delta: f64 = pi
                .iter()
                .zip(next.iter())
                .map(|(a, b)| (a - b).abs())
                .sum();
            pi = next;

            if delta < STATIONARY_TOLERANCE {
                return Ok(StationaryDistribution { probs: pi });
            }
        }

        Err(RegimeChainError::NoConvergence {
            iterations: STATIONARY_MAX_ITERATIONS,
        })
    }
}

/// Long-run state occupancy probabilities, the left eigenvector of the
/// transition table for eigenvalue 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StationaryDistribution {
    probs: [f64; 3],
}

impl StationaryDistribution {
    pub fn prob(&self, state: State) -> f64 {
        self.probs[state.index()]
    }

    pub fn as_array(&self) -> [f64; 3] {
        self.probs
    }
}
