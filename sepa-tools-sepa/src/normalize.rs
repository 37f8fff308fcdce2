//! Differences between a complete batch and the part of it that was already
//! collected or paid.
//!
//! Transactions are matched on the counterparty IBAN, never on the
//! end-to-end id. When an IBAN appears more than once, the first
//! transaction with that IBAN in the partial batch is the one matched.

use std::cmp::Ordering;

use crate::{
    CreditTransfer, CreditTransferTransaction, DebitTransfer, SepaError, Transfer, TransferInfo,
};

/// Outcome of [`reconcile`].
#[derive(Debug, Clone)]
pub struct Reconciliation {
    /// Still to collect from debtors that paid too little.
    pub debits: DebitTransfer,
    /// To refund to debtors that paid too much.
    pub credits: CreditTransfer,
}

/// Outcome of [`reconcile_credit`].
#[derive(Debug, Clone)]
pub struct CreditReconciliation {
    /// Still to pay to creditors that received too little.
    pub top_ups: CreditTransfer,
    /// Excess paid to each creditor. These can not be put in a direct
    /// debit without a mandate, so they are only reported.
    pub overpaid: Vec<CreditTransferTransaction>,
}

/// Computes the debits and refunds that turn `partial` into `complete`.
///
/// Only accounts present in `partial` are adjusted. An account that is in
/// `complete` but was never collected in `partial` gets no debit, so the
/// per-account totals of `partial` plus the adjustments match `complete`
/// only for accounts `partial` contains.
///
/// The header of both results is copied from `complete`, which must have a
/// creditor.
pub fn reconcile(
    complete: &DebitTransfer,
    partial: &DebitTransfer,
) -> Result<Reconciliation, SepaError> {
    let creditor = complete
        .creditor()
        .ok_or_else(|| SepaError::rule("The creditor of the complete batch is mandatory."))?;
    let header = complete.header();

    let mut debits = DebitTransfer::new().with_currency(complete.creditor_account_currency())?;
    debits.set_creditor(creditor.clone())?;
    debits.set_person_id(complete.person_id().map(str::to_string));
    {
        let out = debits.header_mut();
        out.message_identification = header.message_identification.clone();
        out.initiating_party_id = header.initiating_party_id.clone();
        out.initiating_party_name = header.initiating_party_name.clone();
        out.requested_execution_date = header.requested_execution_date;
    }

    let mut credits = CreditTransfer::new().with_currency(complete.creditor_account_currency())?;
    credits.set_debtor(creditor.clone())?;
    {
        let out = credits.header_mut();
        out.message_identification = header.message_identification.clone();
        out.payment_info_id = complete.person_id().map(str::to_string);
        out.initiating_party_id = header.initiating_party_id.clone();
        out.initiating_party_name = header.initiating_party_name.clone();
        out.requested_execution_date = header.requested_execution_date;
    }

    let mut visited = vec![false; partial.transactions().len()];
    for entry in complete.transactions() {
        let iban = entry.debtor().iban();
        let Some(index) = partial
            .transactions()
            .iter()
            .position(|t| t.debtor().iban() == iban)
        else {
            continue;
        };
        visited[index] = true;
        let collected = partial.transactions()[index].amount();
        match collected.cmp(&entry.amount()) {
            Ordering::Less => {
                let difference = entry.amount() - collected;
                tracing::debug!("{} still owes {}", iban, difference);
                debits.add_debit_transfer(entry.with_amount(difference)?);
            }
            Ordering::Greater => {
                let difference = collected - entry.amount();
                tracing::debug!("{} paid {} too much", iban, difference);
                credits.add_credit_transfer(refund(entry.info(), entry.debtor(), difference)?);
            }
            Ordering::Equal => {}
        }
    }
    for (entry, _) in partial
        .transactions()
        .iter()
        .zip(&visited)
        .filter(|(_, visited)| !**visited)
    {
        tracing::debug!("{} is not in the complete batch, refunding", entry.debtor().iban());
        credits.add_credit_transfer(refund(entry.info(), entry.debtor(), entry.amount())?);
    }

    tracing::info!(
        "reconciled: {} debits ({}), {} refunds ({})",
        debits.number_of_transactions(),
        debits.header_control_sum(),
        credits.number_of_transactions(),
        credits.header_control_sum()
    );
    Ok(Reconciliation { debits, credits })
}

/// Computes the extra payments that turn `partial` into `complete` for two
/// credit transfer batches. The header of `top_ups` is copied from
/// `complete`, which must have a debtor.
pub fn reconcile_credit(
    complete: &CreditTransfer,
    partial: &CreditTransfer,
) -> Result<CreditReconciliation, SepaError> {
    let debtor = complete
        .debtor()
        .ok_or_else(|| SepaError::rule("The debtor of the complete batch is mandatory."))?;

    let mut top_ups = CreditTransfer::new().with_currency(complete.debtor_account_currency())?;
    top_ups.set_debtor(debtor.clone())?;
    *top_ups.header_mut() = complete.header().clone();

    let mut overpaid = Vec::new();
    let mut visited = vec![false; partial.transactions().len()];
    for entry in complete.transactions() {
        let iban = entry.creditor().iban();
        let Some(index) = partial
            .transactions()
            .iter()
            .position(|t| t.creditor().iban() == iban)
        else {
            continue;
        };
        visited[index] = true;
        let paid = partial.transactions()[index].amount();
        match paid.cmp(&entry.amount()) {
            Ordering::Less => {
                top_ups.add_credit_transfer(with_amount(entry, entry.amount() - paid)?);
            }
            Ordering::Greater => {
                overpaid.push(with_amount(entry, paid - entry.amount())?);
            }
            Ordering::Equal => {}
        }
    }
    for (entry, _) in partial
        .transactions()
        .iter()
        .zip(&visited)
        .filter(|(_, visited)| !**visited)
    {
        overpaid.push(entry.clone());
    }

    Ok(CreditReconciliation { top_ups, overpaid })
}

fn refund(
    info: &TransferInfo,
    debtor: &crate::IbanData,
    amount: sepa_tools_types::Amount,
) -> Result<CreditTransferTransaction, SepaError> {
    let info = TransferInfo::new(info.end_to_end_id(), amount)?.with_currency(info.currency())?;
    CreditTransferTransaction::new(debtor.clone(), info)
}

fn with_amount(
    entry: &CreditTransferTransaction,
    amount: sepa_tools_types::Amount,
) -> Result<CreditTransferTransaction, SepaError> {
    let mut entry = entry.clone();
    *entry.info_mut() = entry.info().with_amount(amount)?;
    Ok(entry)
}
