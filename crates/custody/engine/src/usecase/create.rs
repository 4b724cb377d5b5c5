use custody_domain::{
    account::AccountKind,
    amount::{Amount, FeeAdjustment},
    payment::PaymentRequest,
    tx::{ActionType, TxStatus, UnsignedTx},
};

use crate::{
    CustodyEngine,
    error::{CustodyEngineErrorKind, Result},
    file::{PrevTxContext, TxFileBody, TxFileName},
    node::{FeeEstimator, RawTxBuilder, RawTxOutput, UnspentSource},
    output::{Destination, apply_fee, build_payment_outputs, build_transfer_outputs},
    repository::{AddressRepository, PaymentRepository, TxRepository},
    selector::{SelectionDissolved, select_unspents},
    types::{
        request::{
            CreateDepositTxRequest, CreateDepositTxRequestDissolved, CreatePaymentTxRequest,
            CreatePaymentTxRequestDissolved, CreateTransferTxRequest,
            CreateTransferTxRequestDissolved,
        },
        response::CreatedTx,
    },
};

enum Target {
    /// An internal account, paid on a fresh address.
    Account(AccountKind),
    /// External receivers of pending payment requests.
    Payments(Vec<PaymentRequest>),
}

struct TxPlan {
    action: ActionType,
    sender: AccountKind,
    target: Target,
    required: Amount,
    adjustment: Option<FeeAdjustment>,
}

impl<N, R> CustodyEngine<N, R>
where
    N: UnspentSource + RawTxBuilder + FeeEstimator,
    R: AddressRepository + TxRepository + PaymentRepository,
{
    /// Sweeps every spendable client output into a fresh deposit address.
    #[tracing::instrument(skip_all, fields(action = %ActionType::Deposit))]
    pub async fn create_deposit_tx(&self, request: CreateDepositTxRequest) -> Result<CreatedTx> {
        let CreateDepositTxRequestDissolved { adjustment } = request.dissolve();

        let plan = TxPlan {
            action: ActionType::Deposit,
            sender: AccountKind::Client,
            target: Target::Account(self.settings.deposit_receiver()),
            required: Amount::ZERO,
            adjustment: self.fee.adjustment(adjustment)?,
        };

        self.create_tx(plan).await
    }

    /// Bundles every pending payment request into one transaction.
    #[tracing::instrument(skip_all, fields(action = %ActionType::Payment))]
    pub async fn create_payment_tx(&self, request: CreatePaymentTxRequest) -> Result<CreatedTx> {
        let CreatePaymentTxRequestDissolved { adjustment } = request.dissolve();
        let adjustment = self.fee.adjustment(adjustment)?;

        let requests = self
            .repo
            .fetch_pending_payment_requests()
            .await
            .map_err(CustodyEngineErrorKind::repository)?;

        if requests.is_empty() {
            tracing::info!("no pending payment requests");
            return Ok(CreatedTx::NothingToDo);
        }

        let sender = self.settings.payment_sender();
        let required = Amount::checked_sum(requests.iter().map(PaymentRequest::amount))?;

        let balance = self
            .node
            .balance_by_account(sender, self.settings.confirmation_num())
            .await
            .map_err(CustodyEngineErrorKind::node)?;

        if balance <= required {
            tracing::info!(%sender, %balance, %required, "payment balance is insufficient");
            return Ok(CreatedTx::NothingToDo);
        }

        let plan = TxPlan {
            action: ActionType::Payment,
            sender,
            target: Target::Payments(requests),
            required,
            adjustment,
        };

        self.create_tx(plan).await
    }

    /// Moves `amount` from one custody account to a fresh address of another. A zero
    /// amount sweeps the sender.
    #[tracing::instrument(skip_all, fields(action = %ActionType::Transfer))]
    pub async fn create_transfer_tx(&self, request: CreateTransferTxRequest) -> Result<CreatedTx> {
        let CreateTransferTxRequestDissolved { sender, receiver, amount, adjustment } =
            request.dissolve();
        let adjustment = self.fee.adjustment(adjustment)?;

        if !amount.is_zero() {
            let balance = self
                .node
                .balance_by_account(sender, self.settings.confirmation_num())
                .await
                .map_err(CustodyEngineErrorKind::node)?;

            if balance <= amount {
                return Err(CustodyEngineErrorKind::InsufficientFunds {
                    required: amount,
                    available: balance,
                }
                .into());
            }
        }

        let plan = TxPlan {
            action: ActionType::Transfer,
            sender,
            target: Target::Account(receiver),
            required: amount,
            adjustment,
        };

        self.create_tx(plan).await
    }

    #[tracing::instrument(skip_all, fields(sender = %plan.sender, required = %plan.required))]
    async fn create_tx(&self, plan: TxPlan) -> Result<CreatedTx> {
        let TxPlan { action, sender, target, required, adjustment } = plan;

        let unspents = self
            .node
            .list_unspent_by_account(sender, self.settings.confirmation_num())
            .await
            .map_err(CustodyEngineErrorKind::node)?;

        let Some(selection) = select_unspents(&unspents, required)? else {
            tracing::info!("no spendable outputs");
            return Ok(CreatedTx::NothingToDo);
        };

        let SelectionDissolved { inputs, input_records, prev_txs, addresses, input_total } =
            selection.dissolve();

        let change = addresses
            .first()
            .map(|address| Destination::builder().address(address.clone()).account(sender).build())
            .ok_or(CustodyEngineErrorKind::other("selection without input addresses"))?;

        let (outputs, payment_ids) = match target {
            Target::Account(receiver) => {
                let address = self
                    .repo
                    .fetch_unallocated_address(receiver)
                    .await
                    .map_err(CustodyEngineErrorKind::repository)?
                    .ok_or_else(|| {
                        CustodyEngineErrorKind::not_found(format!(
                            "no unallocated address left for {receiver}"
                        ))
                    })?;

                let receiver = Destination::builder()
                    .address(address.wallet_address().to_owned())
                    .account(receiver)
                    .build();

                (build_transfer_outputs(receiver, change, required, input_total)?, Vec::new())
            },
            Target::Payments(requests) => {
                let ids = requests.iter().map(PaymentRequest::id).collect();

                (build_payment_outputs(&requests, change, input_total)?, ids)
            },
        };

        let provisional_outputs: Vec<RawTxOutput> =
            outputs.iter().map(|output| output.to_raw()).collect();

        let provisional = self
            .node
            .create_raw_transaction(&inputs, &provisional_outputs)
            .await
            .map_err(CustodyEngineErrorKind::node)?;

        let fee = self.fee.calculate(&self.node, &provisional, adjustment).await?;
        let applied = apply_fee(outputs, fee, input_total, sender)?;

        let hex = self
            .node
            .create_raw_transaction(&inputs, &applied.raw_outputs())
            .await
            .map_err(CustodyEngineErrorKind::node)?
            .into_hex();

        let recorded = self
            .repo
            .count_by_unsigned_hex(action, &hex)
            .await
            .map_err(CustodyEngineErrorKind::repository)?;

        if recorded > 0 {
            tracing::info!("unsigned tx is already recorded");
            return Ok(CreatedTx::Duplicate { hex });
        }

        let tx = UnsignedTx::builder()
            .action(action)
            .unsigned_hex(hex.clone())
            .total_input(input_total)
            .total_output(applied.output_total())
            .fee(applied.fee())
            .build();

        let tx_id = self
            .repo
            .create_unsigned_tx(&tx, &input_records, &applied.output_records(), &payment_ids)
            .await
            .map_err(CustodyEngineErrorKind::repository)?;

        let context = PrevTxContext::builder()
            .sender_account(sender)
            .prev_txs(prev_txs)
            .addresses(addresses)
            .build();

        let name = TxFileName::now(action, tx_id, TxStatus::Unsigned, 0);
        let body = TxFileBody::builder().hex(hex.clone()).context(context).build();

        let path = self.tx_files.write(&name, &body).map_err(CustodyEngineErrorKind::from)?;

        tracing::info!(%tx_id, %fee, inputs = inputs.len(), "unsigned tx created");

        Ok(CreatedTx::Created { tx_id, hex, path })
    }
}
