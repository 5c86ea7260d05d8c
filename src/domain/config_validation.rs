//! Configuration validation.
//!
//! Validates all config fields before the analysis pipeline runs.

use chrono::NaiveDate;

use crate::domain::analysis::{AnalysisOptions, DEFAULT_EXCLUDE_RECENT};
use crate::domain::classifier::{Thresholds, DEFAULT_BEAR_THRESHOLD, DEFAULT_BULL_THRESHOLD};
use crate::domain::error::RegimeChainError;
use crate::domain::periods::PeriodRange;
use crate::domain::prediction::DEFAULT_TEST_FRACTION;
use crate::ports::config_port::ConfigPort;

pub const DEFAULT_START_DATE: &str = "2015-01-01";
pub const DEFAULT_END_DATE: &str = "2024-10-19";
pub const DEFAULT_SYMBOL: &str = "GSPC";

pub fn validate_data_config(config: &dyn ConfigPort) -> Result<(), RegimeChainError> {
    validate_path(config)?;
    validate_dates(config)?;
    Ok(())
}

pub fn validate_analysis_config(config: &dyn ConfigPort) -> Result<(), RegimeChainError> {
    validate_thresholds(config)?;
    validate_test_fraction(config)?;
    validate_exclude_recent(config)?;
    Ok(())
}

fn validate_path(config: &dyn ConfigPort) -> Result<(), RegimeChainError> {
    match config.get_string("data", "path") {
        Some(s) if !s.trim().is_empty() => Ok(()),
        _ => Err(RegimeChainError::ConfigMissing {
            section: "data".to_string(),
            key: "path".to_string(),
        }),
    }
}

fn validate_dates(config: &dyn ConfigPort) -> Result<(), RegimeChainError> {
    let start = parse_date(
        &config
            .get_string("data", "start_date")
            .unwrap_or_else(|| DEFAULT_START_DATE.to_string()),
        "start_date",
    )?;
    let end = parse_date(
        &config
            .get_string("data", "end_date")
            .unwrap_or_else(|| DEFAULT_END_DATE.to_string()),
        "end_date",
    )?;

    if start >= end {
        return Err(RegimeChainError::ConfigInvalid {
            section: "data".to_string(),
            key: "start_date".to_string(),
            reason: "start_date must be before end_date".to_string(),
        });
    }
    Ok(())
}

fn parse_date(value: &str, field: &str) -> Result<NaiveDate, RegimeChainError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| RegimeChainError::ConfigInvalid {
        section: "data".to_string(),
        key: field.to_string(),
        reason: format!("invalid {} format, expected YYYY-MM-DD", field),
    })
}

fn validate_thresholds(config: &dyn ConfigPort) -> Result<(), RegimeChainError> {
    let bull = config.get_double("analysis", "bull_threshold", DEFAULT_BULL_THRESHOLD);
    let bear = config.get_double("analysis", "bear_threshold", DEFAULT_BEAR_THRESHOLD);

    Thresholds::new(bull, bear).map_err(|e| RegimeChainError::ConfigInvalid {
        section: "analysis".to_string(),
        key: "bull_threshold".to_string(),
        reason: e.to_string(),
    })?;
    Ok(())
}

fn validate_test_fraction(config: &dyn ConfigPort) -> Result<(), RegimeChainError> {
    let value = config.get_double("analysis", "test_fraction", DEFAULT_TEST_FRACTION);
    if !value.is_finite() || value <= 0.0 || value >= 1.0 {
        return Err(RegimeChainError::ConfigInvalid {
            section: "analysis".to_string(),
            key: "test_fraction".to_string(),
            reason: "test_fraction must be between 0 and 1 exclusive".to_string(),
        });
    }
    Ok(())
}

fn validate_exclude_recent(config: &dyn ConfigPort) -> Result<(), RegimeChainError> {
    let value = config.get_int("analysis", "exclude_recent", DEFAULT_EXCLUDE_RECENT as i64);
    if value < 0 {
        return Err(RegimeChainError::ConfigInvalid {
            section: "analysis".to_string(),
            key: "exclude_recent".to_string(),
            reason: "exclude_recent must be non-negative".to_string(),
        });
    }
    Ok(())
}

/// Assemble validated analysis options from config, applying defaults for
/// absent keys.
pub fn build_analysis_options(
    config: &dyn ConfigPort,
) -> Result<AnalysisOptions, RegimeChainError> {
    validate_analysis_config(config)?;

    let bull = config.get_double("analysis", "bull_threshold", DEFAULT_BULL_THRESHOLD);
    let bear = config.get_double("analysis", "bear_threshold", DEFAULT_BEAR_THRESHOLD);

    Ok(AnalysisOptions {
        thresholds: Thresholds::new(bull, bear)?,
        test_fraction: config.get_double("analysis", "test_fraction", DEFAULT_TEST_FRACTION),
    })
}

/// Parse period boundaries from the `label=start:end,label=start:end` form
/// used by `[periods] boundaries` and the `--boundaries` flag.
pub fn parse_period_boundaries(input: &str) -> Result<Vec<PeriodRange>, RegimeChainError> {
    let mut ranges = Vec::new();

    for entry in input.split(',') {
        let entry = entry.trim();
        if entry.is_empty() {
            continue;
        }

        let (label, dates) = entry.split_once('=').ok_or_else(|| invalid_boundary(entry))?;
        let (start, end) = dates.split_once(':').ok_or_else(|| invalid_boundary(entry))?;

        let label = label.trim();
        if label.is_empty() {
            return Err(invalid_boundary(entry));
        }

        let start = NaiveDate::parse_from_str(start.trim(), "%Y-%m-%d")
            .map_err(|_| invalid_boundary(entry))?;
        let end = NaiveDate::parse_from_str(end.trim(), "%Y-%m-%d")
            .map_err(|_| invalid_boundary(entry))?;

        ranges.push(PeriodRange {
            label: label.to_string(),
            start,
            end,
        });
    }

    if ranges.is_empty() {
        return Err(RegimeChainError::ConfigInvalid {
            section: "periods".to_string(),
            key: "boundaries".to_string(),
            reason: "no period boundaries given".to_string(),
        });
    }

    Ok(ranges)
}

fn invalid_boundary(entry: &str) -> RegimeChainError {
    RegimeChainError::ConfigInvalid {
        section: "periods".to_string(),
        key: "boundaries".to_string(),
        reason: format!("malformed boundary '{}', expected label=YYYY-MM-DD:YYYY-MM-DD", entry),
    }
}
