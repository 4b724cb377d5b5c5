//! Unspent output selection.

use bon::Builder;
use custody_domain::{
    address::{Unspent, UnspentDissolved},
    amount::Amount,
    tx::TxInput,
};
use dissolve_derive::Dissolve;

use crate::{
    error::{CustodyEngineErrorKind, Result},
    file::PrevTx,
    node::RawTxInput,
};

/// The outputs consumed by a transaction, in every shape later steps need them.
#[derive(Debug, Clone, PartialEq, Eq, Builder, Dissolve)]
pub struct Selection {
    /// Outpoints for the raw transaction.
    inputs: Vec<RawTxInput>,
    /// Records persisted alongside the transaction.
    input_records: Vec<TxInput>,
    /// Signing context for the offline signer.
    prev_txs: Vec<PrevTx>,
    /// Addresses holding the consumed outputs, one per input.
    addresses: Vec<String>,
    /// Sum of the consumed outputs.
    input_total: Amount,
}

impl Selection {
    /// Returns the outpoints.
    pub fn inputs(&self) -> &[RawTxInput] {
        &self.inputs
    }

    /// Returns the input records.
    pub fn input_records(&self) -> &[TxInput] {
        &self.input_records
    }

    /// Returns the sum of the consumed outputs.
    pub fn input_total(&self) -> Amount {
        self.input_total
    }
}

/// Picks unspent outputs in the order given until their sum exceeds `required`.
///
/// A zero `required` sweeps every candidate. Returns `None` when sweeping an empty list,
/// which is the nothing-to-do outcome rather than an error.
///
/// # Errors
///
/// Returns [`CustodyEngineErrorKind::InsufficientFunds`] when a non-zero target is not
/// exceeded by the full candidate list; the sum must exceed the target strictly so that
/// the change output can bear the fee.
pub fn select_unspents(unspents: &[Unspent], required: Amount) -> Result<Option<Selection>> {
    let sweep = required.is_zero();

    let mut input_total = Amount::ZERO;
    let mut consumed = Vec::new();

    for unspent in unspents {
        input_total = input_total.checked_add(unspent.amount())?;
        consumed.push(unspent);

        if !sweep && input_total > required {
            break;
        }
    }

    if !sweep && input_total <= required {
        let available = Amount::checked_sum(unspents.iter().map(Unspent::amount))?;
        return Err(CustodyEngineErrorKind::InsufficientFunds { required, available }.into());
    }

    if consumed.is_empty() {
        return Ok(None);
    }

    let inputs = consumed.iter().copied().map(RawTxInput::from).collect();

    let mut input_records = Vec::with_capacity(consumed.len());
    let mut prev_txs = Vec::with_capacity(consumed.len());
    let mut addresses = Vec::with_capacity(consumed.len());

    for UnspentDissolved {
        txid,
        vout,
        address,
        account,
        script_pub_key,
        redeem_script,
        amount,
        confirmations,
    } in consumed.into_iter().cloned().map(Unspent::dissolve)
    {
        input_records.push(
            TxInput::builder()
                .input_txid(txid.clone())
                .input_vout(vout)
                .input_address(address.clone())
                .input_account(account)
                .input_amount(amount)
                .input_confirmations(confirmations)
                .build(),
        );

        prev_txs.push(
            PrevTx::builder()
                .txid(txid)
                .vout(vout)
                .script_pub_key(script_pub_key)
                .maybe_redeem_script(redeem_script)
                .amount(amount)
                .build(),
        );

        addresses.push(address);
    }

    let selection = Selection::builder()
        .inputs(inputs)
        .input_records(input_records)
        .prev_txs(prev_txs)
        .addresses(addresses)
        .input_total(input_total)
        .build();

    Ok(Some(selection))
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use custody_domain::{account::AccountKind, address::Unspent, amount::Amount};
    use rstest::rstest;

    use super::select_unspents;
    use crate::error::CustodyEngineErrorKind;

    fn unspents(amounts: &[u64]) -> Vec<Unspent> {
        amounts
            .iter()
            .enumerate()
            .map(|(i, &sat)| {
                Unspent::builder()
                    .txid(format!("{i:064x}"))
                    .vout(i as u32)
                    .address(format!("2Nclient{i}"))
                    .account(AccountKind::Client)
                    .script_pub_key("a914".into())
                    .amount(Amount::from_sat(sat))
                    .confirmations(6)
                    .build()
            })
            .collect()
    }

    #[test]
    fn sweep_consumes_everything() {
        let candidates = unspents(&[2_000_000, 3_000_000, 5_000_000]);

        let selection = select_unspents(&candidates, Amount::ZERO).unwrap().unwrap();

        assert_eq!(selection.inputs().len(), 3);
        assert_eq!(selection.input_records().len(), 3);
        assert_eq!(selection.input_total(), Amount::from_sat(10_000_000));
    }

    #[test]
    fn sweeping_nothing_is_nothing_to_do() {
        assert_eq!(select_unspents(&[], Amount::ZERO).unwrap(), None);
    }

    #[rstest]
    #[case(&[2_000_000, 3_000_000, 5_000_000], 1_000_000, 1, 2_000_000)]
    #[case(&[2_000_000, 3_000_000, 5_000_000], 2_000_000, 2, 5_000_000)]
    #[case(&[2_000_000, 3_000_000, 5_000_000], 9_999_999, 3, 10_000_000)]
    fn stops_once_target_is_exceeded(
        #[case] amounts: &[u64],
        #[case] required: u64,
        #[case] consumed: usize,
        #[case] total: u64,
    ) {
        let selection =
            select_unspents(&unspents(amounts), Amount::from_sat(required)).unwrap().unwrap();

        assert_eq!(selection.inputs().len(), consumed);
        assert_eq!(selection.input_total(), Amount::from_sat(total));
    }

    #[rstest]
    #[case(&[], 1)]
    #[case(&[2_000_000, 3_000_000], 6_000_000)]
    #[case(&[2_000_000, 3_000_000], 5_000_000)]
    fn never_under_funds(#[case] amounts: &[u64], #[case] required: u64) {
        let err = select_unspents(&unspents(amounts), Amount::from_sat(required)).unwrap_err();

        let CustodyEngineErrorKind::InsufficientFunds { required: r, available } = err.kind()
        else {
            panic!("unexpected error {err}");
        };
        assert_eq!(r.to_sat(), required);
        assert_eq!(available.to_sat(), amounts.iter().sum::<u64>());
    }

    #[test]
    fn every_consumed_output_is_recorded_once() {
        let candidates = unspents(&[1, 2, 3]);

        let selection = select_unspents(&candidates, Amount::ZERO).unwrap().unwrap();

        let inputs = selection.input_records();
        let outpoints: HashSet<_> =
            inputs.iter().map(|input| (input.input_txid(), input.input_vout())).collect();

        assert_eq!(inputs.len(), candidates.len());
        assert_eq!(outpoints.len(), inputs.len());
    }
}
