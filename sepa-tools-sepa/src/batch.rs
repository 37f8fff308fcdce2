use sepa_tools_types::{Amount, Date, Timestamp};

use crate::{IbanData, SepaError, SepaSchema};

const MAX_END_TO_END_ID_LEN: usize = 35;
const MAX_REMITTANCE_LEN: usize = 140;

/// Fields shared by credit transfer and direct debit transactions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferInfo {
    id: Option<String>,
    end_to_end_id: String,
    amount: Amount,
    currency: String,
    remittance_information: Option<String>,
}

impl TransferInfo {
    pub fn new(end_to_end_id: impl ToString, amount: Amount) -> Result<Self, SepaError> {
        let end_to_end_id = end_to_end_id.to_string();
        let end_to_end_id = end_to_end_id.trim();
        if end_to_end_id.is_empty() {
            return Err(SepaError::rule("The end to end id is mandatory."));
        }
        if !amount.is_positive() {
            return Err(SepaError::rule(format!(
                "Amount must be positive, got {}.",
                amount
            )));
        }
        Ok(Self {
            id: None,
            end_to_end_id: limited(end_to_end_id, MAX_END_TO_END_ID_LEN),
            amount,
            currency: "EUR".to_string(),
            remittance_information: None,
        })
    }

    pub fn with_id(mut self, id: impl ToString) -> Self {
        self.id = Some(limited(&id.to_string(), MAX_END_TO_END_ID_LEN));
        self
    }

    pub fn with_currency(mut self, currency: &str) -> Result<Self, SepaError> {
        self.currency = checked_currency(currency)?;
        Ok(self)
    }

    pub fn with_remittance_information(mut self, text: impl ToString) -> Self {
        let text = text.to_string();
        let text = text.trim();
        self.remittance_information =
            (!text.is_empty()).then(|| limited(text, MAX_REMITTANCE_LEN));
        self
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn end_to_end_id(&self) -> &str {
        &self.end_to_end_id
    }

    pub fn amount(&self) -> Amount {
        self.amount
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub fn remittance_information(&self) -> Option<&str> {
        self.remittance_information.as_deref()
    }

    pub(crate) fn add_amount(&mut self, amount: Amount) {
        self.amount += amount;
    }

    /// Same id, currency and remittance text with a different amount.
    pub(crate) fn with_amount(&self, amount: Amount) -> Result<Self, SepaError> {
        if !amount.is_positive() {
            return Err(SepaError::rule(format!(
                "Amount must be positive, got {}.",
                amount
            )));
        }
        Ok(Self {
            amount,
            ..self.clone()
        })
    }
}

/// A transaction held by a [`PaymentBatch`].
pub trait Transfer {
    fn info(&self) -> &TransferInfo;

    fn info_mut(&mut self) -> &mut TransferInfo;

    /// The creditor of a credit transfer or the debtor of a direct debit.
    fn counterparty(&self) -> &IbanData;

    fn amount(&self) -> Amount {
        self.info().amount()
    }
}

/// Group header and payment information fields common to both kinds of
/// batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchHeader {
    pub message_identification: String,
    /// Falls back to the message identification when `None`.
    pub payment_info_id: Option<String>,
    pub creation_date: Timestamp,
    pub requested_execution_date: Date,
    pub initiating_party_name: Option<String>,
    pub initiating_party_id: Option<String>,
    pub local_instrument_code: Option<String>,
    pub category_purpose_code: Option<String>,
}

impl Default for BatchHeader {
    fn default() -> Self {
        Self {
            message_identification: String::new(),
            payment_info_id: None,
            creation_date: Timestamp::now(),
            requested_execution_date: Date::today(),
            initiating_party_name: None,
            initiating_party_id: None,
            local_instrument_code: None,
            category_purpose_code: None,
        }
    }
}

impl BatchHeader {
    pub fn payment_info_id(&self) -> &str {
        self.payment_info_id
            .as_deref()
            .unwrap_or(&self.message_identification)
    }

    pub(crate) fn check_message_identification(&self) -> Result<(), SepaError> {
        if self.message_identification.trim().is_empty() {
            return Err(SepaError::rule("The message identification is mandatory."));
        }
        Ok(())
    }
}

/// An ordered set of transactions plus the header they are sent under.
#[derive(Debug, Clone)]
pub struct PaymentBatch<T> {
    pub header: BatchHeader,
    schema: SepaSchema,
    transactions: Vec<T>,
}

impl<T: Transfer> PaymentBatch<T> {
    pub(crate) fn new(schema: SepaSchema) -> Self {
        Self {
            header: BatchHeader::default(),
            schema,
            transactions: Vec::new(),
        }
    }

    pub fn schema(&self) -> SepaSchema {
        self.schema
    }

    pub(crate) fn set_schema(&mut self, schema: SepaSchema) {
        self.schema = schema;
    }

    /// With `merge` set, a transfer to an IBAN already in the batch is added
    /// to the amount of the existing transaction instead of being appended.
    /// Only transactions in the same currency are merged.
    pub(crate) fn add_transfer(&mut self, transfer: T, merge: bool) {
        if merge {
            let iban = transfer.counterparty().iban();
            let currency = transfer.info().currency();
            if let Some(existing) = self.transactions.iter_mut().find(|t| {
                t.counterparty().iban() == iban && t.info().currency() == currency
            }) {
                tracing::debug!(
                    "merging {} into existing transaction for {}",
                    transfer.amount(),
                    iban
                );
                existing.info_mut().add_amount(transfer.amount());
                return;
            }
        }
        self.transactions.push(transfer);
    }

    pub fn transactions(&self) -> &[T] {
        &self.transactions
    }

    /// First transaction with `iban` as counterparty.
    pub fn transaction(&self, iban: &str) -> Option<&T> {
        self.transactions
            .iter()
            .find(|t| t.counterparty().iban() == iban)
    }

    pub fn number_of_transactions(&self) -> usize {
        self.transactions.len()
    }

    pub fn header_control_sum(&self) -> Amount {
        self.transactions.iter().map(|t| t.amount()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }
}

pub(crate) fn checked_currency(currency: &str) -> Result<String, SepaError> {
    let currency = currency.trim();
    if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(SepaError::rule(
            "Currency has to be a valid 3 character code in ISO format.",
        ));
    }
    Ok(currency.to_uppercase())
}

pub(crate) fn limited(value: &str, max: usize) -> String {
    value.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transfer_info_rules() {
        assert!(TransferInfo::new("", Amount::from_cents(100)).is_err());
        assert!(TransferInfo::new("E2E", Amount::ZERO).is_err());
        assert!(TransferInfo::new("E2E", Amount::from_cents(-1)).is_err());

        let info = TransferInfo::new("x".repeat(50), Amount::from_cents(100))
            .unwrap()
            .with_remittance_information("r".repeat(200));
        assert_eq!(info.end_to_end_id().len(), 35);
        assert_eq!(info.remittance_information().unwrap().len(), 140);
        assert_eq!(info.currency(), "EUR");
    }

    #[test]
    fn blank_remittance_is_none() {
        let info = TransferInfo::new("E2E", Amount::from_cents(100))
            .unwrap()
            .with_remittance_information("   ");
        assert_eq!(info.remittance_information(), None);
    }

    #[test]
    fn currency_rules() {
        let info = TransferInfo::new("E2E", Amount::from_cents(100)).unwrap();
        assert_eq!(info.clone().with_currency("usd").unwrap().currency(), "USD");
        assert!(info.clone().with_currency("EURO").is_err());
        assert!(info.with_currency("E1R").is_err());
    }

    #[test]
    fn payment_info_id_defaults_to_message_id() {
        let mut header = BatchHeader {
            message_identification: "MSG1".to_string(),
            ..Default::default()
        };
        assert_eq!(header.payment_info_id(), "MSG1");
        header.payment_info_id = Some("PMT1".to_string());
        assert_eq!(header.payment_info_id(), "PMT1");
    }
}
