use std::io::Write;

use sepa_tools_types::Amount;
use xml::EventWriter;

use crate::{
    batch::{checked_currency, BatchHeader, PaymentBatch, Transfer, TransferInfo},
    IbanData, SepaDocument, SepaError, SepaSchema, ToXml,
};

use self::transfer_gen::DocumentString;

mod transfer_gen;

/// One payment to a creditor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreditTransferTransaction {
    info: TransferInfo,
    creditor: IbanData,
    purpose: Option<String>,
}

impl CreditTransferTransaction {
    pub fn new(creditor: IbanData, info: TransferInfo) -> Result<Self, SepaError> {
        if !creditor.is_valid() {
            return Err(SepaError::rule("Creditor IBAN data are invalid."));
        }
        Ok(Self {
            info,
            creditor,
            purpose: None,
        })
    }

    /// ISO 20022 purpose code, e.g. `SALA`.
    pub fn with_purpose(mut self, purpose: impl ToString) -> Self {
        let purpose = purpose.to_string();
        self.purpose = (!purpose.trim().is_empty()).then(|| purpose.trim().to_uppercase());
        self
    }

    pub fn creditor(&self) -> &IbanData {
        &self.creditor
    }

    pub fn purpose(&self) -> Option<&str> {
        self.purpose.as_deref()
    }
}

impl Transfer for CreditTransferTransaction {
    fn info(&self) -> &TransferInfo {
        &self.info
    }

    fn info_mut(&mut self) -> &mut TransferInfo {
        &mut self.info
    }

    fn counterparty(&self) -> &IbanData {
        &self.creditor
    }
}

/// A pain.001 credit transfer batch: one debtor paying many creditors.
///
/// All transactions go into a single payment information block.
#[derive(Debug, Clone)]
pub struct CreditTransfer {
    batch: PaymentBatch<CreditTransferTransaction>,
    debtor: Option<IbanData>,
    debtor_account_currency: String,
}

impl Default for CreditTransfer {
    fn default() -> Self {
        Self::new()
    }
}

impl CreditTransfer {
    pub fn new() -> Self {
        Self {
            batch: PaymentBatch::new(SepaSchema::Pain00100103),
            debtor: None,
            debtor_account_currency: "EUR".to_string(),
        }
    }

    pub fn with_currency(mut self, currency: &str) -> Result<Self, SepaError> {
        self.debtor_account_currency = checked_currency(currency)?;
        Ok(self)
    }

    pub fn header(&self) -> &BatchHeader {
        &self.batch.header
    }

    pub fn header_mut(&mut self) -> &mut BatchHeader {
        &mut self.batch.header
    }

    pub fn debtor(&self) -> Option<&IbanData> {
        self.debtor.as_ref()
    }

    pub fn set_debtor(&mut self, debtor: IbanData) -> Result<(), SepaError> {
        if !debtor.is_valid() || debtor.unknown_bic() {
            return Err(SepaError::rule("Debtor IBAN data are invalid."));
        }
        self.debtor = Some(debtor);
        Ok(())
    }

    pub fn debtor_account_currency(&self) -> &str {
        &self.debtor_account_currency
    }

    /// Pays into an account already in the batch are merged into one
    /// transaction.
    pub fn add_credit_transfer(&mut self, transfer: CreditTransferTransaction) {
        self.batch.add_transfer(transfer, true);
    }

    pub fn transactions(&self) -> &[CreditTransferTransaction] {
        self.batch.transactions()
    }

    pub fn transaction(&self, iban: &str) -> Option<&CreditTransferTransaction> {
        self.batch.transaction(iban)
    }

    pub fn number_of_transactions(&self) -> usize {
        self.batch.number_of_transactions()
    }

    pub fn header_control_sum(&self) -> Amount {
        self.batch.header_control_sum()
    }

    /// Always equal to the header sum, there is only one payment block.
    pub fn payment_control_sum(&self) -> Amount {
        self.batch.header_control_sum()
    }

    pub fn is_empty(&self) -> bool {
        self.batch.is_empty()
    }

    pub fn schema(&self) -> SepaSchema {
        self.batch.schema()
    }

    pub fn set_schema(&mut self, schema: SepaSchema) -> Result<(), SepaError> {
        if !Self::supports_schema(schema) {
            return Err(SepaError::Schema(schema));
        }
        self.batch.set_schema(schema);
        Ok(())
    }
}

impl SepaDocument for CreditTransfer {
    fn check_mandatory_data(&self) -> Result<(), SepaError> {
        self.batch.header.check_message_identification()?;
        if self.debtor.is_none() {
            return Err(SepaError::rule("The debtor is mandatory."));
        }
        Ok(())
    }

    fn supports_schema(schema: SepaSchema) -> bool {
        matches!(schema, SepaSchema::Pain00100103 | SepaSchema::Pain00100104)
    }

    fn emit<W: Write>(&self, writer: &mut EventWriter<W>) -> Result<(), SepaError> {
        let doc = DocumentString::try_from(self)?;
        tracing::info!(
            "writing {} credit transfers, total {}, as {}",
            self.number_of_transactions(),
            self.header_control_sum(),
            self.schema()
        );
        for event in doc.to_xml() {
            writer.write(event)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn debtor() -> IbanData {
        IbanData::new("Club", "ES9121000418450200051332", "CAIXESBBXXX").unwrap()
    }

    fn transfer(iban: &str, cents: i64) -> CreditTransferTransaction {
        CreditTransferTransaction::new(
            IbanData::without_bic("Supplier", iban).unwrap(),
            TransferInfo::new("E2E-1", Amount::from_cents(cents)).unwrap(),
        )
        .unwrap()
    }

    fn ready_batch() -> CreditTransfer {
        let mut batch = CreditTransfer::new();
        batch.header_mut().message_identification = "MSG1".to_string();
        batch.set_debtor(debtor()).unwrap();
        batch
    }

    #[test]
    fn same_creditor_is_merged() {
        let mut batch = ready_batch();
        batch.add_credit_transfer(transfer("NL91ABNA0417164300", 1250));
        batch.add_credit_transfer(transfer("NL91ABNA0417164300", 750));
        batch.add_credit_transfer(transfer("ES6000491500051234567892", 100));
        assert_eq!(batch.number_of_transactions(), 2);
        assert_eq!(batch.transactions()[0].amount(), Amount::from_cents(2000));
        assert_eq!(batch.header_control_sum(), Amount::from_cents(2100));
        assert_eq!(batch.payment_control_sum(), batch.header_control_sum());
    }

    #[test]
    fn different_currencies_are_not_merged() {
        let mut batch = ready_batch();
        batch.add_credit_transfer(transfer("NL91ABNA0417164300", 1000));
        let dollars = CreditTransferTransaction::new(
            IbanData::without_bic("Supplier", "NL91ABNA0417164300").unwrap(),
            TransferInfo::new("E2E-2", Amount::from_cents(500))
                .unwrap()
                .with_currency("USD")
                .unwrap(),
        )
        .unwrap();
        batch.add_credit_transfer(dollars);
        batch.add_credit_transfer(transfer("NL91ABNA0417164300", 250));

        assert_eq!(batch.number_of_transactions(), 2);
        assert_eq!(batch.transactions()[0].amount(), Amount::from_cents(1250));
        assert_eq!(batch.transactions()[0].info().currency(), "EUR");
        assert_eq!(batch.transactions()[1].amount(), Amount::from_cents(500));
        assert_eq!(batch.transactions()[1].info().currency(), "USD");
    }

    #[test]
    fn mandatory_data() {
        let mut batch = CreditTransfer::new();
        assert!(matches!(
            batch.check_mandatory_data(),
            Err(SepaError::RuleViolation(_))
        ));
        batch.header_mut().message_identification = "MSG1".to_string();
        assert!(matches!(
            batch.check_mandatory_data(),
            Err(SepaError::RuleViolation(_))
        ));
        batch.set_debtor(debtor()).unwrap();
        assert!(batch.check_mandatory_data().is_ok());
    }

    #[test]
    fn debtor_needs_bic() {
        let mut batch = CreditTransfer::new();
        let no_bic = IbanData::without_bic("Club", "ES9121000418450200051332").unwrap();
        assert!(batch.set_debtor(no_bic).is_err());
        assert!(batch.debtor().is_none());
    }

    #[test]
    fn schema_restrictions() {
        let mut batch = CreditTransfer::new();
        assert!(batch.set_schema(SepaSchema::Pain00100104).is_ok());
        assert!(matches!(
            batch.set_schema(SepaSchema::Pain00800102),
            Err(SepaError::Schema(SepaSchema::Pain00800102))
        ));
        assert_eq!(batch.schema(), SepaSchema::Pain00100104);
    }

    #[test]
    fn emits_group_header() {
        let mut batch = ready_batch();
        batch.add_credit_transfer(transfer("NL91ABNA0417164300", 10000));
        let xml = String::from_utf8(batch.to_xml_bytes().unwrap()).unwrap();
        assert!(xml.starts_with(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#));
        assert!(xml.contains(r#"xmlns="urn:iso:std:iso:20022:tech:xsd:pain.001.001.03""#));
        assert!(xml.contains("<MsgId>MSG1</MsgId>"));
        assert!(xml.contains("<NbOfTxs>1</NbOfTxs>"));
        assert!(xml.contains("<CtrlSum>100.00</CtrlSum>"));
        assert!(xml.contains(r#"<InstdAmt Ccy="EUR">100.00</InstdAmt>"#));
        assert_eq!(xml.matches("<PmtInf>").count(), 1);
        // creditor without BIC
        assert!(xml.contains("<Id>NOTPROVIDED</Id>"));
    }

    #[test]
    fn emission_is_deterministic() {
        let mut batch = ready_batch();
        batch.add_credit_transfer(transfer("NL91ABNA0417164300", 10000).with_purpose("sala"));
        let first = batch.to_xml_bytes().unwrap();
        let second = batch.to_xml_bytes().unwrap();
        assert_eq!(first, second);
        let xml = String::from_utf8(first).unwrap();
        assert!(xml.contains("<Purp>"));
        assert!(xml.contains("<Cd>SALA</Cd>"));
    }

    #[test]
    fn incomplete_batch_writes_nothing() {
        let batch = CreditTransfer::new();
        let mut out = Vec::new();
        assert!(batch.write(&mut out).is_err());
        assert!(out.is_empty());
    }
}
