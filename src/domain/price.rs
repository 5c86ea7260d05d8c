//! Price series and percentage-return derivation.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::domain::error::RegimeChainError;

/// A single closing price observation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub close: f64,
}

/// A percentage return between two consecutive price points, carrying the
/// date of the later point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReturnObservation {
    pub date: NaiveDate,
    pub pct: f64,
}

/// Week-over-week percentage returns. The first point produces no
/// observation, so the output has one fewer element than the input.
pub fn pct_returns(prices: &[PricePoint]) -> Result<Vec<ReturnObservation>, RegimeChainError> {
    if prices.len() < 2 {
        return Err(RegimeChainError::InsufficientData {
            operation: "return calculation".into(),
            have: prices.len(),
            need: 2,
        });
    }

    for point in prices {
        if !point.close.is_finite() || point.close <= 0.0 {
            return Err(RegimeChainError::Data {
                reason: format!("non-positive price {} on {}", point.close, point.date),
            });
        }
    }

    let returns = prices
        .windows(2)
        .map(|w| ReturnObservation {
            date: w[1].date,
            pct: (w[1].close - w[0].close) / w[0].close * 100.0,
        })
        .collect();

    Ok(returns)
}

/// Reduce a daily series to one point per ISO week (Monday-Sunday bins),
/// keeping the last close of each week. The kept point carries the date of
/// the last observation in the week, not the bin boundary.
pub fn resample_weekly(prices: &[PricePoint]) -> Vec<PricePoint> {
    let mut weekly: Vec<PricePoint> = Vec::new();
    let mut current_week: Option<(i32, u32)> = None;

    for point in prices {
        let week = (point.date.iso_week().year(), point.date.iso_week().week());
        if current_week == Some(week) {
            // Later observation in the same week replaces the earlier one.
            if let Some(last) = weekly.last_mut() {
                *last = *point;
            }
        } else {
            weekly.push(*point);
            current_week = Some(week);
        }
    }

    weekly
}

/// Validate that a series is strictly increasing by date.
pub fn validate_ordering(prices: &[PricePoint]) -> Result<(), RegimeChainError> {
    for w in prices.windows(2) {
        if w[1].date <= w[0].date {
            return Err(RegimeChainError::Data {
                reason: format!(
                    "price series not strictly increasing: {} follows {}",
                    w[1].date, w[0].date
                ),
            });
        }
    }
    Ok(())
}
