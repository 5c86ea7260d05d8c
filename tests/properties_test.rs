//! Property tests for the estimator and classifier invariants.

use proptest::prelude::*;
use regimechain::domain::classifier::Thresholds;
use regimechain::domain::prediction::{matched_random_baseline, validate};
use regimechain::domain::state::State;
use regimechain::domain::transition::TransitionTable;

fn states_strategy(max_len: usize) -> impl Strategy<Value = Vec<State>> {
    prop::collection::vec(0usize..3, 0..max_len)
        .prop_map(|indices| indices.into_iter().map(|i| State::ALL[i]).collect())
}

proptest! {
    #[test]
    fn rows_always_stochastic(states in states_strategy(200)) {
        let table = TransitionTable::from_states(&states);
        for from in State::ALL {
            let sum: f64 = table.row(from).iter().sum();
            prop_assert!((sum - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn row_counts_match_sequence_length(states in states_strategy(200)) {
        let table = TransitionTable::from_states(&states);
        let total: u64 = State::ALL.iter().map(|&s| table.row_total(s)).sum();
        prop_assert_eq!(total as usize, states.len().saturating_sub(1));
    }

    #[test]
    fn stationary_is_fixed_point_when_it_converges(states in states_strategy(200)) {
        let table = TransitionTable::from_states(&states);
        // Periodic chains are allowed to report NoConvergence; everything
        // that converges must satisfy the fixed-point equation.
        if let Ok(pi) = table.stationary() {
            let sum: f64 = pi.as_array().iter().sum();
            prop_assert!((sum - 1.0).abs() < 1e-6);
            for to in State::ALL {
                let projected: f64 = State::ALL
                    .iter()
                    .map(|from| pi.prob(*from) * table.prob(*from, to))
                    .sum();
                prop_assert!((projected - pi.prob(to)).abs() < 1e-6);
            }
        }
    }

    #[test]
    fn classification_respects_band(
        pct in -20.0f64..20.0,
        bear_abs in 0.1f64..5.0,
        extra in 0.0f64..3.0,
    ) {
        let thresholds = Thresholds::new(bear_abs + extra, -bear_abs).unwrap();
        let state = thresholds.state_for(pct);
        match state {
            State::Bull => prop_assert!(pct >= thresholds.bull()),
            State::Bear => prop_assert!(pct <= thresholds.bear()),
            State::Stagnant => {
                prop_assert!(pct > thresholds.bear() && pct < thresholds.bull())
            }
        }
    }

    #[test]
    fn baseline_in_unit_interval(states in states_strategy(300)) {
        let baseline = matched_random_baseline(&states);
        prop_assert!((0.0..=1.0).contains(&baseline));
    }

    #[test]
    fn validation_metrics_in_range(states in states_strategy(300)) {
        // Sequences with a long enough test split produce sane metrics; the
        // rest must error, never panic.
        match validate(&states, 0.2) {
            Ok(report) => {
                prop_assert!((0.0..=1.0).contains(&report.accuracy));
                prop_assert!((0.0..=1.0).contains(&report.baseline_accuracy));
                prop_assert!(report.correct <= report.total);
            }
            Err(_) => {}
        }
    }
}
