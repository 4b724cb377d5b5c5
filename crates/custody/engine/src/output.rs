//! Output construction and fee re-balancing.

use bon::Builder;
use custody_domain::{
    account::AccountKind,
    amount::Amount,
    payment::PaymentRequest,
    tx::TxOutput,
};
use dissolve_derive::Dissolve;

use crate::{
    error::{CustodyEngineErrorKind, Result},
    node::RawTxOutput,
};

/// An address and the account owning it.
#[derive(Debug, Clone, PartialEq, Eq, Builder, Dissolve)]
pub struct Destination {
    address: String,
    account: AccountKind,
}

/// One output of a transaction being built.
#[derive(Debug, Clone, PartialEq, Eq, Builder, Dissolve)]
pub struct PlannedOutput {
    address: String,
    account: AccountKind,
    amount: Amount,
    is_change: bool,
}

/// The outputs after the fee was deducted.
#[derive(Debug, Clone, PartialEq, Eq, Dissolve)]
pub struct FeeApplied {
    outputs: Vec<PlannedOutput>,
    fee: Amount,
    output_total: Amount,
}

impl Destination {
    /// Returns the address.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Returns the owning account.
    pub fn account(&self) -> AccountKind {
        self.account
    }
}

impl PlannedOutput {
    /// Returns the destination address.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Returns the owning account.
    pub fn account(&self) -> AccountKind {
        self.account
    }

    /// Returns the amount.
    pub fn amount(&self) -> Amount {
        self.amount
    }

    /// Whether the output returns change to the sender.
    pub fn is_change(&self) -> bool {
        self.is_change
    }

    /// Returns the raw transaction output.
    pub fn to_raw(&self) -> RawTxOutput {
        RawTxOutput::builder().address(self.address.clone()).amount(self.amount).build()
    }

    /// Returns the persisted output record.
    pub fn to_record(&self) -> TxOutput {
        TxOutput::builder()
            .output_address(self.address.clone())
            .output_account(self.account)
            .output_amount(self.amount)
            .is_change(self.is_change)
            .build()
    }
}

impl FeeApplied {
    /// Returns the adjusted outputs.
    pub fn outputs(&self) -> &[PlannedOutput] {
        &self.outputs
    }

    /// Returns the fee.
    pub fn fee(&self) -> Amount {
        self.fee
    }

    /// Returns the output total, always `input_total - fee`.
    pub fn output_total(&self) -> Amount {
        self.output_total
    }

    /// Returns the raw transaction outputs.
    pub fn raw_outputs(&self) -> Vec<RawTxOutput> {
        self.outputs.iter().map(PlannedOutput::to_raw).collect()
    }

    /// Returns the persisted output records.
    pub fn output_records(&self) -> Vec<TxOutput> {
        self.outputs.iter().map(PlannedOutput::to_record).collect()
    }
}

/// Builds the outputs of a single-receiver transfer.
///
/// A zero `required` sweeps: the receiver gets the whole input total. Otherwise the
/// receiver gets `required` and the rest returns to `change`.
pub fn build_transfer_outputs(
    receiver: Destination,
    change: Destination,
    required: Amount,
    input_total: Amount,
) -> Result<Vec<PlannedOutput>> {
    if required.is_zero() {
        let output = PlannedOutput::builder()
            .address(receiver.address)
            .account(receiver.account)
            .amount(input_total)
            .is_change(false)
            .build();

        return Ok(vec![output]);
    }

    let change_amount = input_total.checked_sub(required)?;

    let outputs = vec![
        PlannedOutput::builder()
            .address(receiver.address)
            .account(receiver.account)
            .amount(required)
            .is_change(false)
            .build(),
        PlannedOutput::builder()
            .address(change.address)
            .account(change.account)
            .amount(change_amount)
            .is_change(true)
            .build(),
    ];

    Ok(outputs)
}

/// Builds the outputs of a payment batch.
///
/// Requests to the same receiver are summed into one output. Receivers keep the order
/// they first appear in; the change output comes last. Change landing on a receiver
/// address is folded into that output.
pub fn build_payment_outputs<AUX>(
    requests: &[PaymentRequest<AUX>],
    change: Destination,
    input_total: Amount,
) -> Result<Vec<PlannedOutput>> {
    let mut outputs: Vec<PlannedOutput> = Vec::new();

    for request in requests {
        match outputs.iter_mut().find(|o| o.address == request.receiver_address()) {
            Some(output) => output.amount = output.amount.checked_add(request.amount())?,
            None => outputs.push(
                PlannedOutput::builder()
                    .address(request.receiver_address().to_owned())
                    .account(AccountKind::Anonymous)
                    .amount(request.amount())
                    .is_change(false)
                    .build(),
            ),
        }
    }

    let required = Amount::checked_sum(requests.iter().map(PaymentRequest::amount))?;
    let change_amount = input_total.checked_sub(required)?;

    if change_amount.is_zero() {
        return Ok(outputs);
    }

    match outputs.iter_mut().find(|o| o.address == change.address) {
        Some(output) => {
            output.amount = output.amount.checked_add(change_amount)?;
            output.account = change.account;
            output.is_change = true;
        },
        None => outputs.push(
            PlannedOutput::builder()
                .address(change.address)
                .account(change.account)
                .amount(change_amount)
                .is_change(true)
                .build(),
        ),
    }

    Ok(outputs)
}

/// Deducts `fee` from exactly one output.
///
/// A single output bears the fee itself; otherwise the output owned by `sender` does.
/// Receiver outputs are never reduced.
///
/// # Errors
///
/// - [`CustodyEngineErrorKind::InsufficientFee`] when the fee reaches the input total or
///   the fee-bearing output would drop to zero or below.
/// - [`CustodyEngineErrorKind::MissingChangeOutput`] when several outputs exist but none
///   belongs to `sender`.
/// - [`CustodyEngineErrorKind::InconsistentTotals`] when the adjusted outputs do not sum
///   to `input_total - fee`.
pub fn apply_fee(
    mut outputs: Vec<PlannedOutput>,
    fee: Amount,
    input_total: Amount,
    sender: AccountKind,
) -> Result<FeeApplied> {
    if fee >= input_total {
        return Err(CustodyEngineErrorKind::InsufficientFee { fee }.into());
    }

    let idx = match outputs.len() {
        0 => return Err(CustodyEngineErrorKind::other("no outputs to bear the fee").into()),
        1 => 0,
        _ => outputs
            .iter()
            .position(|o| o.account == sender)
            .ok_or(CustodyEngineErrorKind::MissingChangeOutput)?,
    };

    let bearer = &mut outputs[idx];
    bearer.amount = match bearer.amount.checked_sub(fee) {
        Ok(amount) if !amount.is_zero() => amount,
        _ => return Err(CustodyEngineErrorKind::InsufficientFee { fee }.into()),
    };

    let output_total = input_total.checked_sub(fee)?;
    let output_sum = Amount::checked_sum(outputs.iter().map(PlannedOutput::amount))?;

    if output_sum != output_total {
        return Err(CustodyEngineErrorKind::InconsistentTotals {
            input: input_total,
            output: output_sum,
            fee,
        }
        .into());
    }

    Ok(FeeApplied { outputs, fee, output_total })
}
