//! Integration tests for the analysis engine.
//!
//! Tests cover:
//! - Full pipeline from a mock price port through snapshot and report
//! - The worked classification scenario and threshold boundary behavior
//! - Transition counting, row-stochastic rows, stationary fixed point
//! - Matched-random baseline arithmetic
//! - Period segmentation independence
//! - Scenario drawing and grading with a seeded RNG
//! - CSV adapter round trip from files on disk

mod common;

use approx::assert_relative_eq;
use common::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use regimechain::adapters::csv_adapter::CsvAdapter;
use regimechain::domain::analysis::{
    run_analysis, AnalysisOptions, GameSession, MarketSnapshot, DEFAULT_EXCLUDE_RECENT,
};
use regimechain::domain::classifier::{classify, Thresholds};
use regimechain::domain::error::RegimeChainError;
use regimechain::domain::periods::PeriodRange;
use regimechain::domain::prediction::matched_random_baseline;
use regimechain::domain::price::{pct_returns, resample_weekly};
use regimechain::domain::state::State;
use regimechain::domain::transition::TransitionTable;
use regimechain::ports::data_port::PriceDataPort;

use State::{Bear, Bull, Stagnant};

mod full_pipeline {
    use super::*;

    #[test]
    fn snapshot_from_mock_port() {
        let series = generate_weekly_series(date(2015, 1, 2), 200);
        let port = MockPricePort::new().with_prices("GSPC", series.clone());

        let prices = port
            .fetch_prices("GSPC", date(2015, 1, 1), date(2020, 1, 1))
            .unwrap();
        assert!(!prices.is_empty());

        let snapshot = MarketSnapshot::build(
            "GSPC",
            prices,
            AnalysisOptions::default(),
            DEFAULT_EXCLUDE_RECENT,
        )
        .unwrap();

        let report = snapshot.report();
        assert_eq!(report.state_counts.total(), snapshot.states().len());
        assert!(report.prediction.total >= 10);
        assert!(!report.chi_square.is_empty());
    }

    #[test]
    fn port_date_filter_applies() {
        let series = generate_weekly_series(date(2015, 1, 2), 200);
        let port = MockPricePort::new().with_prices("GSPC", series);

        let prices = port
            .fetch_prices("GSPC", date(2016, 1, 1), date(2017, 1, 1))
            .unwrap();
        assert!(prices.iter().all(|p| p.date >= date(2016, 1, 1)));
        assert!(prices.iter().all(|p| p.date <= date(2017, 1, 1)));
    }

    #[test]
    fn port_error_propagates() {
        let port = MockPricePort::new().with_error("GSPC", "store offline");
        let err = port
            .fetch_prices("GSPC", date(2015, 1, 1), date(2020, 1, 1))
            .unwrap_err();
        assert!(matches!(err, RegimeChainError::Data { .. }));
    }

    #[test]
    fn analyze_twice_is_bit_identical() {
        let series = generate_weekly_series(date(2015, 1, 2), 200);
        let returns = pct_returns(&series).unwrap();

        let first = run_analysis(&returns, AnalysisOptions::default()).unwrap();
        let second = run_analysis(&returns, AnalysisOptions::default()).unwrap();

        assert_eq!(first, second);
        assert_eq!(
            first.stationary.as_array().map(f64::to_bits),
            second.stationary.as_array().map(f64::to_bits),
        );
    }

    #[test]
    fn daily_series_resamples_before_analysis() {
        let daily = generate_daily_series(date(2015, 1, 5), 80, 1.004);
        let weekly = resample_weekly(&daily);

        assert_eq!(weekly.len(), 80);
        // Five compounded daily moves land at ~2% weekly: all Bull.
        let states = classify(&weekly, Thresholds::default()).unwrap();
        assert!(states.iter().all(|&s| s == Bull));
    }
}

mod classification {
    use super::*;

    #[test]
    fn worked_scenario() {
        let prices = vec![
            make_point("2024-01-05", 100.0),
            make_point("2024-01-12", 102.0),
            make_point("2024-01-19", 101.0),
            make_point("2024-01-26", 105.0),
        ];

        let returns = pct_returns(&prices).unwrap();
        assert_relative_eq!(returns[0].pct, 2.0, epsilon = 1e-9);
        assert_relative_eq!(returns[1].pct, -0.980392156862745, epsilon = 1e-9);
        assert_relative_eq!(returns[2].pct, 3.96039603960396, epsilon = 1e-9);

        let states = classify(&prices, Thresholds::new(1.5, -1.5).unwrap()).unwrap();
        assert_eq!(states, vec![Bull, Stagnant, Bull]);
    }

    #[test]
    fn boundary_returns_classify_as_extremes() {
        let t = Thresholds::new(2.0, -1.5).unwrap();
        assert_eq!(t.state_for(2.0), Bull);
        assert_eq!(t.state_for(-1.5), Bear);
        assert_eq!(t.state_for(1.99), Stagnant);
    }

    #[test]
    fn contradictory_thresholds_rejected() {
        let err = Thresholds::new(1.0, -1.5).unwrap_err();
        assert!(matches!(err, RegimeChainError::InvalidThreshold { .. }));
    }
}

mod estimation {
    use super::*;

    #[test]
    fn known_sequence_counts() {
        let states = [Bull, Bull, Bear, Bull, Bear, Bear];
        let table = TransitionTable::from_states(&states);

        assert_eq!(table.count(Bull, Bull), 1);
        assert_eq!(table.count(Bull, Bear), 2);
        assert_eq!(table.count(Bull, Stagnant), 0);
        assert_eq!(table.count(Bear, Bull), 1);
        assert_eq!(table.count(Bear, Bear), 1);
        assert_eq!(table.row_total(Bull), 3);
        assert_eq!(table.row_total(Bear), 2);
    }

    #[test]
    fn bull_row_half_and_half() {
        // Exactly two from-Bull transitions, one to each of Bull and Bear.
        let states = [Bull, Bull, Bear, Bear];
        let table = TransitionTable::from_states(&states);

        assert_relative_eq!(table.prob(Bull, Bull), 0.5);
        assert_relative_eq!(table.prob(Bull, Bear), 0.5);
        assert_relative_eq!(table.prob(Bull, Stagnant), 0.0);
    }

    #[test]
    fn all_rows_stochastic_on_real_series() {
        let series = generate_weekly_series(date(2015, 1, 2), 300);
        let states = classify(&series, Thresholds::default()).unwrap();
        let table = TransitionTable::from_states(&states);

        for from in State::ALL {
            let sum: f64 = table.row(from).iter().sum();
            assert_relative_eq!(sum, 1.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn stationary_is_fixed_point() {
        let series = generate_weekly_series(date(2015, 1, 2), 300);
        let states = classify(&series, Thresholds::default()).unwrap();
        let table = TransitionTable::from_states(&states);
        let pi = table.stationary().unwrap();

        assert_relative_eq!(pi.as_array().iter().sum::<f64>(), 1.0, epsilon = 1e-9);
        for to in State::ALL {
            let projected: f64 = State::ALL
                .iter()
                .map(|from| pi.prob(*from) * table.prob(*from, to))
                .sum();
            assert_relative_eq!(projected, pi.prob(to), epsilon = 1e-6);
        }
    }
}

mod baseline {
    use super::*;

    #[test]
    fn squared_frequency_sum() {
        let mut states = Vec::new();
        states.extend(std::iter::repeat(Stagnant).take(592));
        states.extend(std::iter::repeat(Bull).take(252));
        states.extend(std::iter::repeat(Bear).take(155));

        let baseline = matched_random_baseline(&states);
        assert!((baseline - 0.439).abs() < 0.001);
    }
}

mod segmentation {
    use super::*;

    #[test]
    fn periods_are_independent() {
        let series = generate_weekly_series(date(2015, 1, 2), 120);
        let mid = series[59].date;
        let boundaries = vec![
            PeriodRange {
                label: "first".into(),
                start: series[0].date,
                end: mid,
            },
            PeriodRange {
                label: "second".into(),
                start: mid + chrono::Duration::days(1),
                end: series.last().unwrap().date,
            },
        ];

        let snapshot = MarketSnapshot::build(
            "GSPC",
            series.clone(),
            AnalysisOptions::default(),
            DEFAULT_EXCLUDE_RECENT,
        )
        .unwrap();
        let before = snapshot.periods(&boundaries).unwrap();
        assert_eq!(before.len(), 2);

        // Changing only the second period's prices must leave the first
        // period's table untouched. Scale alternate points so the ratios
        // (and therefore the classified states) actually change.
        let mut perturbed = series;
        for (i, point) in perturbed.iter_mut().enumerate().skip(60) {
            if i % 2 == 0 {
                point.close *= 1.10;
            }
        }
        let snapshot2 = MarketSnapshot::build(
            "GSPC",
            perturbed,
            AnalysisOptions::default(),
            DEFAULT_EXCLUDE_RECENT,
        )
        .unwrap();
        let after = snapshot2.periods(&boundaries).unwrap();

        assert_eq!(before[0].table, after[0].table);
        assert_ne!(before[1].table, after[1].table);
    }

    #[test]
    fn overlapping_boundaries_rejected() {
        let series = generate_weekly_series(date(2015, 1, 2), 120);
        let snapshot = MarketSnapshot::build(
            "GSPC",
            series,
            AnalysisOptions::default(),
            DEFAULT_EXCLUDE_RECENT,
        )
        .unwrap();

        let boundaries = vec![
            PeriodRange {
                label: "a".into(),
                start: date(2015, 1, 1),
                end: date(2016, 1, 1),
            },
            PeriodRange {
                label: "b".into(),
                start: date(2015, 6, 1),
                end: date(2017, 1, 1),
            },
        ];
        assert!(matches!(
            snapshot.periods(&boundaries),
            Err(RegimeChainError::InvalidRange { .. })
        ));
    }
}

mod scenario_game {
    use super::*;

    fn sample_snapshot() -> MarketSnapshot {
        MarketSnapshot::build(
            "GSPC",
            generate_weekly_series(date(2015, 1, 2), 200),
            AnalysisOptions::default(),
            DEFAULT_EXCLUDE_RECENT,
        )
        .unwrap()
    }

    #[test]
    fn scenario_grade_session_round_trip() {
        let snapshot = sample_snapshot();
        let mut rng = StdRng::seed_from_u64(99);
        let mut session = GameSession::new();

        for _ in 0..20 {
            let scenario = snapshot.scenario(&mut rng).unwrap();
            let verdict = snapshot.grade(scenario.id, Bull, &mut rng).unwrap();
            session.record(&verdict);
        }

        assert_eq!(session.rounds_played, 20);
        assert_eq!(session.player_score % 10, 0);
        assert!(session.player_score <= 200);
    }

    #[test]
    fn scenario_row_matches_default_table() {
        let snapshot = sample_snapshot();
        let mut rng = StdRng::seed_from_u64(1);

        let scenario = snapshot.scenario(&mut rng).unwrap();
        assert_eq!(
            scenario.transition_row,
            snapshot.report().table.row(scenario.state),
        );
    }

    #[test]
    fn grading_is_consistent_with_states() {
        let snapshot = sample_snapshot();
        let mut rng = StdRng::seed_from_u64(2);

        for _ in 0..50 {
            let scenario = snapshot.scenario(&mut rng).unwrap();
            let actual = snapshot.states()[scenario.id + 1];
            let verdict = snapshot.grade(scenario.id, actual, &mut rng).unwrap();
            assert!(verdict.player_correct);
            assert_eq!(verdict.actual, actual);
        }
    }
}

mod serialization {
    use super::*;

    #[test]
    fn report_serializes_for_presentation_layer() {
        let series = generate_weekly_series(date(2015, 1, 2), 160);
        let returns = pct_returns(&series).unwrap();
        let report = run_analysis(&returns, AnalysisOptions::default()).unwrap();

        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"prediction\""));
        assert!(json.contains("\"stationary\""));

        let back: regimechain::domain::analysis::AnalysisReport =
            serde_json::from_str(&json).unwrap();
        assert_eq!(back.state_counts, report.state_counts);
        assert_eq!(back.prediction, report.prediction);
    }
}

mod csv_round_trip {
    use super::*;
    use std::fs;

    #[test]
    fn analysis_from_csv_store() {
        let dir = tempfile::TempDir::new().unwrap();
        let series = generate_weekly_series(date(2015, 1, 2), 160);

        let mut content = String::from("date,close\n");
        for point in &series {
            content.push_str(&format!("{},{}\n", point.date, point.close));
        }
        fs::write(dir.path().join("GSPC.csv"), content).unwrap();

        let adapter = CsvAdapter::new(dir.path().to_path_buf());
        let prices = adapter
            .fetch_prices("GSPC", date(2015, 1, 1), date(2020, 1, 1))
            .unwrap();
        assert_eq!(prices.len(), 160);

        let snapshot = MarketSnapshot::build(
            "GSPC",
            prices,
            AnalysisOptions::default(),
            DEFAULT_EXCLUDE_RECENT,
        )
        .unwrap();
        assert_eq!(snapshot.states().len(), 159);

        let range = adapter.get_data_range("GSPC").unwrap().unwrap();
        assert_eq!(range.2, 160);
    }
}
