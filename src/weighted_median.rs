// src/weighted_median.rs

use crate::error::RateError;
use crate::trade::Trade;

#[derive(Debug, Clone, PartialEq)]
pub struct WeightedMedianResult {
    pub price: f64,
    pub exchange: String,
}

/// Volume-weighted median over a group of trades.
pub struct VolumeWeightedMedian;

impl VolumeWeightedMedian {
    /// Sorts the group by price and returns the price at which the cumulative
    /// size fraction first reaches one half, with the exchange that traded it.
    ///
    /// When the cumulative fraction lands exactly on one half, the result is
    /// the mean of that price and the next one, attributed to the lower
    /// trade's exchange.
    pub fn compute<'a, I>(trades: I) -> Result<WeightedMedianResult, RateError>
    where
        I: IntoIterator<Item = &'a Trade>,
    {
        let mut observations: Vec<&Trade> = trades.into_iter().collect();
        if observations.is_empty() {
            return Err(RateError::EmptyInput);
        }

        observations.sort_by(|a, b| a.price.total_cmp(&b.price));

        let total: f64 = observations.iter().map(|trade| trade.size).sum();
        if !(total > 0.0) {
            return Err(RateError::NonPositiveVolume(total));
        }

        let mut running = 0.0;
        let cum_frac: Vec<f64> = observations
            .iter()
            .map(|trade| {
                running += trade.size;
                running / total
            })
            .collect();

        // Index right after the last fraction below one half. Flagged negative
        // sizes can make the fractions non-monotone, hence the clamp.
        let last = observations.len() - 1;
        let index = match cum_frac.iter().rposition(|fraction| *fraction < 0.5) {
            Some(below) => (below + 1).min(last),
            None => 0,
        };

        let chosen = observations[index];
        let price = match observations.get(index + 1) {
            Some(next) if cum_frac[index] == 0.5 => (chosen.price + next.price) / 2.0,
            _ => chosen.price,
        };

        Ok(WeightedMedianResult {
            price,
            exchange: chosen.exchange.clone(),
        })
    }
}
