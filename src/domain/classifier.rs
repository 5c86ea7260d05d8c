//! Regime classification from weekly returns.

use serde::{Deserialize, Serialize};

use crate::domain::error::RegimeChainError;
use crate::domain::price::{pct_returns, PricePoint, ReturnObservation};
use crate::domain::state::State;

pub const DEFAULT_BULL_THRESHOLD: f64 = 1.5;
pub const DEFAULT_BEAR_THRESHOLD: f64 = -1.5;

/// A validated threshold pair. `bull` is positive, `bear` negative, and
/// `bull >= |bear|`. Construct through [`Thresholds::new`] so invalid pairs
/// never reach classification.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    bull: f64,
    bear: f64,
}

impl Thresholds {
    pub fn new(bull: f64, bear: f64) -> Result<Self, RegimeChainError> {
        if !bull.is_finite() || !bear.is_finite() {
            return Err(RegimeChainError::InvalidThreshold {
                bull,
                bear,
                reason: "thresholds must be finite".into(),
            });
        }
        if bull <= 0.0 {
            return Err(RegimeChainError::InvalidThreshold {
                bull,
                bear,
                reason: "bull threshold must be positive".into(),
            });
        }
        if bear >= 0.0 {
            return Err(RegimeChainError::InvalidThreshold {
                bull,
                bear,
                reason: "bear threshold must be negative".into(),
            });
        }
        if bull < bear.abs() {
            return Err(RegimeChainError::InvalidThreshold {
                bull,
                bear,
                reason: "bull threshold must be at least |bear threshold|".into(),
            });
        }
        Ok(Self { bull, bear })
    }

    pub fn bull(&self) -> f64 {
        self.bull
    }

    pub fn bear(&self) -> f64 {
        self.bear
    }

    /// Label a single return. Ties go to the extreme state, not Stagnant.
    pub fn state_for(&self, pct: f64) -> State {
        if pct >= self.bull {
            State::Bull
        } else if pct <= self.bear {
            State::Bear
        } else {
            State::Stagnant
        }
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            bull: DEFAULT_BULL_THRESHOLD,
            bear: DEFAULT_BEAR_THRESHOLD,
        }
    }
}

/// Label every return observation with its regime state.
pub fn classify_returns(returns: &[ReturnObservation], thresholds: Thresholds) -> Vec<State> {
    returns.iter().map(|r| thresholds.state_for(r.pct)).collect()
}

/// Derive returns from a price series and label them in one step. Needs at
/// least two price points.
pub fn classify(
    prices: &[PricePoint],
    thresholds: Thresholds,
) -> Result<Vec<State>, RegimeChainError> {
    let returns = pct_returns(prices)?;
    Ok(classify_returns(&returns, thresholds))
}
