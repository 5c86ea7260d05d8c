//! Full analysis bundle, startup snapshot, and scenario grading.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::domain::classifier::{classify_returns, Thresholds};
use crate::domain::error::RegimeChainError;
use crate::domain::markov_test::{default_test_lags, test_independence, ChiSquareResult};
use crate::domain::periods::{segment, Period, PeriodRange};
use crate::domain::prediction::{validate, PredictionReport, DEFAULT_TEST_FRACTION};
use crate::domain::price::{pct_returns, validate_ordering, PricePoint, ReturnObservation};
use crate::domain::state::State;
use crate::domain::transition::{StationaryDistribution, TransitionTable};

/// How many of the most recent weeks are excluded from scenario drawing.
pub const DEFAULT_EXCLUDE_RECENT: usize = 50;

/// Parameters for one analysis run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnalysisOptions {
    pub thresholds: Thresholds,
    pub test_fraction: f64,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            thresholds: Thresholds::default(),
            test_fraction: DEFAULT_TEST_FRACTION,
        }
    }
}

/// Occurrences of each state in a labeled sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateCounts {
    counts: [usize; 3],
}

impl StateCounts {
    pub fn from_states(states: &[State]) -> Self {
        let mut counts = [0usize; 3];
        for state in states {
            counts[state.index()] += 1;
        }
        Self { counts }
    }

    pub fn count(&self, state: State) -> usize {
        self.counts[state.index()]
    }

    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }
}

/// Everything one analysis run produces. Derived, immutable, recomputed from
/// scratch whenever thresholds change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub options: AnalysisOptions,
    pub state_counts: StateCounts,
    pub table: TransitionTable,
    pub stationary: StationaryDistribution,
    /// One result per default-sweep lag that passed the expected-frequency
    /// validity rule.
    pub chi_square: Vec<ChiSquareResult>,
    /// Lags whose contingency table failed the validity rule. Reported so
    /// sparse classifications (extreme thresholds) surface instead of
    /// yielding misleading p-values.
    pub skipped_lags: Vec<usize>,
    pub prediction: PredictionReport,
}

/// Classify a return series and compute the full bundle: counts, transition
/// table, stationary distribution, independence tests, and out-of-sample
/// prediction accuracy.
pub fn run_analysis(
    returns: &[ReturnObservation],
    options: AnalysisOptions,
) -> Result<AnalysisReport, RegimeChainError> {
    let states = classify_returns(returns, options.thresholds);
    let table = TransitionTable::from_states(&states);
    let stationary = table.stationary()?;

    let mut chi_square = Vec::new();
    let mut skipped_lags = Vec::new();
    for lag in default_test_lags(states.len()) {
        match test_independence(&states, lag) {
            Ok(result) => chi_square.push(result),
            Err(RegimeChainError::InsufficientData { .. }) => skipped_lags.push(lag),
            Err(e) => return Err(e),
        }
    }

    let prediction = validate(&states, options.test_fraction)?;

    Ok(AnalysisReport {
        options,
        state_counts: StateCounts::from_states(&states),
        table,
        stationary,
        chi_square,
        skipped_lags,
        prediction,
    })
}

/// A historical week offered for prediction: its regime, its return, and the
/// transition row out of its state. The true next state stays internal to
/// the snapshot and is revealed by grading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub id: usize,
    pub date: chrono::NaiveDate,
    pub state: State,
    pub pct_return: f64,
    /// Transition probabilities out of `state`, ordered as [`State::ALL`].
    pub transition_row: [f64; 3],
}

/// The graded outcome of one scenario round.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub scenario_id: usize,
    pub actual: State,
    pub model_prediction: State,
    pub random_prediction: State,
    pub player_correct: bool,
    pub model_correct: bool,
    pub random_correct: bool,
}

/// Immutable snapshot of the default-parameter analysis, built once at
/// process start and shared by reference across callers.
///
/// Nothing here mutates after construction: custom-threshold analysis and
/// scenario grading recompute from the owned series, so concurrent callers
/// need no locking.
#[derive(Debug, Clone)]
pub struct MarketSnapshot {
    symbol: String,
    weekly: Vec<PricePoint>,
    returns: Vec<ReturnObservation>,
    states: Vec<State>,
    options: AnalysisOptions,
    exclude_recent: usize,
    report: AnalysisReport,
}

impl MarketSnapshot {
    /// Build the snapshot from an ordered weekly price series.
    pub fn build(
        symbol: impl Into<String>,
        weekly: Vec<PricePoint>,
        options: AnalysisOptions,
        exclude_recent: usize,
    ) -> Result<Self, RegimeChainError> {
        validate_ordering(&weekly)?;
        let returns = pct_returns(&weekly)?;
        let states = classify_returns(&returns, options.thresholds);
        let report = run_analysis(&returns, options)?;

        Ok(Self {
            symbol: symbol.into(),
            weekly,
            returns,
            states,
            options,
            exclude_recent,
            report,
        })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn weekly(&self) -> &[PricePoint] {
        &self.weekly
    }

    pub fn returns(&self) -> &[ReturnObservation] {
        &self.returns
    }

    pub fn states(&self) -> &[State] {
        &self.states
    }

    /// The precomputed default-threshold analysis.
    pub fn report(&self) -> &AnalysisReport {
        &self.report
    }

    /// Re-run the full analysis with custom thresholds over the same return
    /// series. The snapshot itself is untouched.
    pub fn analyze_with(&self, thresholds: Thresholds) -> Result<AnalysisReport, RegimeChainError> {
        run_analysis(
            &self.returns,
            AnalysisOptions {
                thresholds,
                test_fraction: self.options.test_fraction,
            },
        )
    }

    /// Independent per-period estimation over the snapshot's series with its
    /// default thresholds.
    pub fn periods(&self, boundaries: &[PeriodRange]) -> Result<Vec<Period>, RegimeChainError> {
        segment(&self.weekly, boundaries, self.options.thresholds)
    }

    /// Draw a random interior week, excluding the most recent
    /// `exclude_recent` weeks and the final index (which has no successor).
    pub fn scenario(&self, rng: &mut impl Rng) -> Result<Scenario, RegimeChainError> {
        let needed = self.exclude_recent + 2;
        if self.states.len() < needed {
            return Err(RegimeChainError::InsufficientData {
                operation: "scenario selection".into(),
                have: self.states.len(),
                need: needed,
            });
        }

        let max_id = self.states.len() - self.exclude_recent - 1;
        let id = rng.gen_range(0..max_id);

        Ok(Scenario {
            id,
            date: self.returns[id].date,
            state: self.states[id],
            pct_return: self.returns[id].pct,
            transition_row: self.report.table.row(self.states[id]),
        })
    }

    /// Grade a prediction for a scenario id: the true next state, the
    /// model's arg-max prediction, and a random draw weighted by the
    /// transition row.
    pub fn grade(
        &self,
        scenario_id: usize,
        predicted: State,
        rng: &mut impl Rng,
    ) -> Result<Verdict, RegimeChainError> {
        if scenario_id >= self.states.len().saturating_sub(1) {
            return Err(RegimeChainError::InvalidRange {
                reason: format!(
                    "scenario id {scenario_id} has no successor in {} observations",
                    self.states.len()
                ),
            });
        }

        let current = self.states[scenario_id];
        let actual = self.states[scenario_id + 1];
        let model_prediction = self.report.table.predict_next(current);
        let random_prediction = weighted_draw(self.report.table.row(current), rng);

        Ok(Verdict {
            scenario_id,
            actual,
            model_prediction,
            random_prediction,
            player_correct: predicted == actual,
            model_correct: model_prediction == actual,
            random_correct: random_prediction == actual,
        })
    }
}

/// Sample a state with probability equal to its row entry.
fn weighted_draw(row: [f64; 3], rng: &mut impl Rng) -> State {
    let roll: f64 = rng.gen_range(0.0..1.0);
    let mut cumulative = 0.0;
    for state in State::ALL {
        cumulative += row[state.index()];
        if roll < cumulative {
            return state;
        }
    }
    // Row sums to 1 within rounding; a roll at the very top lands here.
    State::Stagnant
}

/// Running score for one interactive prediction session: player vs model vs
/// weighted-random, ten points per correct call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSession {
    pub player_score: u32,
    pub model_score: u32,
    pub random_score: u32,
    pub rounds_played: u32,
}

const POINTS_PER_CORRECT: u32 = 10;

impl GameSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, verdict: &Verdict) {
        if verdict.player_correct {
            self.player_score += POINTS_PER_CORRECT;
        }
        if verdict.model_correct {
            self.model_score += POINTS_PER_CORRECT;
        }
        if verdict.random_correct {
            self.random_score += POINTS_PER_CORRECT;
        }
        self.rounds_played += 1;
    }
}
