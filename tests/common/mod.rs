#![allow(dead_code)]

use chrono::NaiveDate;
use regimechain::domain::error::RegimeChainError;
pub use regimechain::domain::price::PricePoint;
use regimechain::ports::data_port::PriceDataPort;
use std::collections::HashMap;

pub struct MockPricePort {
    pub data: HashMap<String, Vec<PricePoint>>,
    pub errors: HashMap<String, String>,
}

impl MockPricePort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_prices(mut self, symbol: &str, prices: Vec<PricePoint>) -> Self {
        self.data.insert(symbol.to_string(), prices);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }
}

impl PriceDataPort for MockPricePort {
    fn fetch_prices(
        &self,
        symbol: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<PricePoint>, RegimeChainError> {
        if let Some(reason) = self.errors.get(symbol) {
            return Err(RegimeChainError::Data {
                reason: reason.clone(),
            });
        }
        Ok(self
            .data
            .get(symbol)
            .map(|prices| {
                prices
                    .iter()
                    .filter(|p| p.date >= start_date && p.date <= end_date)
                    .copied()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn list_symbols(&self) -> Result<Vec<String>, RegimeChainError> {
        let mut symbols: Vec<String> = self.data.keys().cloned().collect();
        symbols.sort();
        Ok(symbols)
    }

    fn get_data_range(
        &self,
        symbol: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, RegimeChainError> {
        if let Some(reason) = self.errors.get(symbol) {
            return Err(RegimeChainError::Data {
                reason: reason.clone(),
            });
        }
        match self.data.get(symbol) {
            Some(prices) if !prices.is_empty() => {
                let min = prices.iter().map(|p| p.date).min().unwrap();
                let max = prices.iter().map(|p| p.date).max().unwrap();
                Ok(Some((min, max, prices.len())))
            }
            _ => Ok(None),
        }
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn make_point(date_str: &str, close: f64) -> PricePoint {
    PricePoint {
        date: NaiveDate::parse_from_str(date_str, "%Y-%m-%d").unwrap(),
        close,
    }
}

/// Weekly series cycling through all three regimes, one point per Friday.
/// The factor pattern yields returns of roughly +2, -3, +0.1, +3, -0.1, -4
/// and +0.5 percent per seven weeks.
pub fn generate_weekly_series(start: NaiveDate, count: usize) -> Vec<PricePoint> {
    const FACTORS: [f64; 7] = [1.02, 0.97, 1.001, 1.03, 0.999, 0.96, 1.005];

    let mut close = 1000.0;
    (0..count)
        .map(|i| {
            let point = PricePoint {
                date: start + chrono::Duration::weeks(i as i64),
                close,
            };
            close *= FACTORS[i % FACTORS.len()];
            point
        })
        .collect()
}

/// Daily series over consecutive weekdays, trending by `daily_factor`.
pub fn generate_daily_series(start: NaiveDate, weeks: usize, daily_factor: f64) -> Vec<PricePoint> {
    let mut points = Vec::new();
    let mut close = 1000.0;
    for week in 0..weeks {
        for weekday in 0..5 {
            points.push(PricePoint {
                date: start + chrono::Duration::weeks(week as i64) + chrono::Duration::days(weekday),
                close,
            });
            close *= daily_factor;
        }
    }
    points
}
