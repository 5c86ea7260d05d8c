//! Out-of-sample predictive validation against a matched-random baseline.

use serde::{Deserialize, Serialize};

use crate::domain::error::RegimeChainError;
use crate::domain::state::State;
use crate::domain::transition::TransitionTable;

pub const DEFAULT_TEST_FRACTION: f64 = 0.2;

/// Fewest test-split observations for a meaningful accuracy estimate.
const MIN_TEST_OBSERVATIONS: usize = 10;

/// Accuracy of arg-max next-state prediction on a held-out chronological
/// test split, compared against guessing each state with its test-split
/// frequency.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictionReport {
    pub accuracy: f64,
    pub baseline_accuracy: f64,
    pub correct: usize,
    pub total: usize,
}

/// Split the sequence chronologically, fit a transition table on the
/// training prefix, and predict each next state in the test suffix.
///
/// The split is never shuffled: order encodes time, and shuffling would
/// leak future information into the fit.
pub fn validate(
    states: &[State],
    test_fraction: f64,
) -> Result<PredictionReport, RegimeChainError> {
    if !test_fraction.is_finite() || test_fraction <= 0.0 || test_fraction >= 1.0 {
        return Err(RegimeChainError::InvalidRange {
            reason: format!("test fraction {test_fraction} not in (0, 1)"),
        });
    }

    let split = (states.len() as f64 * (1.0 - test_fraction)) as usize;
    let train = &states[..split];
    let test = &states[split..];

    if test.len() < MIN_TEST_OBSERVATIONS {
        return Err(RegimeChainError::InsufficientData {
            operation: "predictive validation".into(),
            have: test.len(),
            need: MIN_TEST_OBSERVATIONS,
        });
    }

    let table = TransitionTable::from_states(train);

    let mut correct = 0usize;
    let total = test.len() - 1;
    for pair in test.windows(2) {
        if table.predict_next(pair[0]) == pair[1] {
            correct += 1;
        }
    }

    Ok(PredictionReport {
        accuracy: correct as f64 / total as f64,
        baseline_accuracy: matched_random_baseline(test),
        correct,
        total,
    })
}

/// Expected accuracy of a strategy that guesses each state with probability
/// equal to its observed frequency: the sum of squared frequencies. This is
/// the correct comparator for the arg-max predictor, not uniform 1/3
/// guessing.
pub fn matched_random_baseline(states: &[State]) -> f64 {
    if states.is_empty() {
        return 0.0;
    }

    let mut counts = [0usize; 3];
    for state in states {
        counts[state.index()] += 1;
    }

    let n = states.len() as f64;
    counts.iter().map(|&c| (c as f64 / n).powi(2)).sum()
}
