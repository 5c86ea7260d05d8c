//! Time-homogeneity comparison across fixed historical sub-ranges.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::classifier::{classify, Thresholds};
use crate::domain::error::RegimeChainError;
use crate::domain::price::PricePoint;
use crate::domain::transition::TransitionTable;

/// A labeled inclusive date range to analyze in isolation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodRange {
    pub label: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// One sub-range with its independently estimated transition table. Nothing
/// is shared across periods; diverging tables expose drift in the chain's
/// rules over time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Period {
    pub label: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub weeks: usize,
    pub table: TransitionTable,
}

/// Slice the price series per boundary range (inclusive of both endpoints)
/// and run classification and estimation on each slice alone.
///
/// Boundaries must be chronologically ordered and non-overlapping.
pub fn segment(
    prices: &[PricePoint],
    boundaries: &[PeriodRange],
    thresholds: Thresholds,
) -> Result<Vec<Period>, RegimeChainError> {
    validate_boundaries(boundaries)?;

    let mut periods = Vec::with_capacity(boundaries.len());
    for range in boundaries {
        let slice: Vec<PricePoint> = prices
            .iter()
            .filter(|p| p.date >= range.start && p.date <= range.end)
            .copied()
            .collect();

        let states = classify(&slice, thresholds)?;
        periods.push(Period {
            label: range.label.clone(),
            start_date: range.start,
            end_date: range.end,
            weeks: states.len(),
            table: TransitionTable::from_states(&states),
        });
    }

    Ok(periods)
}

fn validate_boundaries(boundaries: &[PeriodRange]) -> Result<(), RegimeChainError> {
    if boundaries.is_empty() {
        return Err(RegimeChainError::InvalidRange {
            reason: "no period boundaries given".into(),
        });
    }

    for range in boundaries {
        if range.start > range.end {
            return Err(RegimeChainError::InvalidRange {
                reason: format!(
                    "period {} starts {} after its end {}",
                    range.label, range.start, range.end
                ),
            });
        }
    }

    for pair in boundaries.windows(2) {
        if pair[1].start <= pair[0].end {
            return Err(RegimeChainError::InvalidRange {
                reason: format!(
                    "period {} overlaps or precedes period {}",
                    pair[1].label, pair[0].label
                ),
            });
        }
    }

    Ok(())
}
