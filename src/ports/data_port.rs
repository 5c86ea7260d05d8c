//! Price data access port trait.

use crate::domain::error::RegimeChainError;
use crate::domain::price::PricePoint;
use chrono::NaiveDate;

pub trait PriceDataPort {
    fn fetch_prices(
        &self,
        symbol: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<PricePoint>, RegimeChainError>;

    fn list_symbols(&self) -> Result<Vec<String>, RegimeChainError>;

    fn get_data_range(
        &self,
        symbol: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, RegimeChainError>;
}
