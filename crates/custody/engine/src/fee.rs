//! Network fee estimation.

use custody_domain::amount::{Amount, FeeAdjustment, FeeAdjustmentRange, FeeRate};

use crate::{
    error::{CustodyEngineErrorKind, Result},
    node::{FeeEstimator, RawTx},
};

/// Computes the fee of a provisional transaction.
#[derive(Debug, Clone, Copy)]
pub struct FeeCalculator {
    range: FeeAdjustmentRange,
}

impl FeeCalculator {
    /// Creates a calculator accepting multipliers within `range`.
    pub fn new(range: FeeAdjustmentRange) -> Self {
        Self { range }
    }

    /// Validates an operator supplied multiplier before any node call is made.
    pub fn adjustment(&self, value: Option<f64>) -> Result<Option<FeeAdjustment>> {
        value
            .map(|value| self.range.validate(value))
            .transpose()
            .map_err(|e| CustodyEngineErrorKind::from(e).into())
    }

    /// Returns the fee for `raw_tx`.
    ///
    /// The estimated rate is applied to the transaction size. The result is raised to the
    /// node's minimum relay fee, then scaled by `adjustment`. A failed relay fee lookup
    /// keeps the estimate.
    #[tracing::instrument(skip_all, fields(size = raw_tx.size()))]
    pub async fn calculate<N>(
        &self,
        node: &N,
        raw_tx: &RawTx,
        adjustment: Option<FeeAdjustment>,
    ) -> Result<Amount>
    where
        N: FeeEstimator,
    {
        let rate = node.estimate_fee_rate().await.map_err(CustodyEngineErrorKind::node)?;

        let fee = compute_fee(rate, raw_tx.size(), node.min_relay_fee().await, adjustment)?;

        tracing::debug!(rate = rate.to_sat_per_kb(), %fee, "fee calculated");

        Ok(fee)
    }
}

fn compute_fee<E>(
    rate: FeeRate,
    size: usize,
    min_relay_fee: core::result::Result<Amount, E>,
    adjustment: Option<FeeAdjustment>,
) -> Result<Amount>
where
    E: std::error::Error,
{
    let mut fee = rate.fee_for(size);

    match min_relay_fee {
        Ok(relay_fee) if relay_fee > fee => {
            tracing::info!(%fee, %relay_fee, "fee raised to min relay fee");
            fee = relay_fee;
        },
        Ok(_) => {},
        Err(e) => tracing::warn!(error = %e, "failed to fetch min relay fee, keeping estimate"),
    }

    match adjustment {
        Some(adjustment) => adjustment.apply(fee).map_err(From::from),
        None => Ok(fee),
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use custody_domain::amount::{Amount, FeeAdjustmentRange, FeeRate};
    use rstest::rstest;

    use super::{FeeCalculator, compute_fee};
    use crate::error::CustodyEngineErrorKind;

    fn relay(sat: u64) -> Result<Amount, io::Error> {
        Ok(Amount::from_sat(sat))
    }

    #[rstest]
    #[case(1_000, 226, 100, 226)]
    #[case(1_000, 226, 1_000, 1_000)]
    #[case(20_000, 500, 1_000, 10_000)]
    fn rate_times_size_raised_to_relay_fee(
        #[case] rate: u64,
        #[case] size: usize,
        #[case] relay_fee: u64,
        #[case] expected: u64,
    ) {
        let fee =
            compute_fee(FeeRate::from_sat_per_kb(rate), size, relay(relay_fee), None).unwrap();

        assert_eq!(fee, Amount::from_sat(expected));
    }

    #[test]
    fn relay_fee_failure_keeps_estimate() {
        let fee = compute_fee(
            FeeRate::from_sat_per_kb(1_000),
            300,
            Err(io::Error::other("node down")),
            None,
        )
        .unwrap();

        assert_eq!(fee, Amount::from_sat(300));
    }

    #[test]
    fn adjustment_scales_after_relay_floor() {
        let calculator = FeeCalculator::new(FeeAdjustmentRange::new(0.5, 3.0).unwrap());
        let adjustment = calculator.adjustment(Some(1.5)).unwrap();

        let fee =
            compute_fee(FeeRate::from_sat_per_kb(1_000), 100, relay(1_000), adjustment).unwrap();

        assert_eq!(fee, Amount::from_sat(1_500));
    }

    #[rstest]
    #[case(0.1)]
    #[case(3.5)]
    #[case(f64::INFINITY)]
    fn out_of_range_adjustment_is_refused(#[case] value: f64) {
        let calculator = FeeCalculator::new(FeeAdjustmentRange::new(0.5, 3.0).unwrap());

        let err = calculator.adjustment(Some(value)).unwrap_err();

        assert!(matches!(err.kind(), CustodyEngineErrorKind::FeeAdjustment(_)));
    }

    #[test]
    fn no_adjustment_is_accepted() {
        let calculator = FeeCalculator::new(FeeAdjustmentRange::new(0.5, 3.0).unwrap());

        assert_eq!(calculator.adjustment(None).unwrap(), None);
    }
}
