use std::{fmt::Display, io::Write, str::FromStr};

use sepa_tools_types::{Amount, Date};
use xml::EventWriter;

use crate::{
    batch::{checked_currency, limited, BatchHeader, PaymentBatch, Transfer, TransferInfo},
    iban, BicDirectory, IbanData, SepaDocument, SepaError, SepaSchema, ToXml,
};

use self::direct_debit_gen::DocumentString;

mod direct_debit_gen;

const MAX_MANDATE_ID_LEN: usize = 35;

/// Position of a collection within its mandate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SequenceType {
    First,
    Recurring,
    #[default]
    OneOff,
    Final,
}

impl SequenceType {
    /// The order payment information blocks are written in.
    pub const ALL: [SequenceType; 4] = [
        SequenceType::First,
        SequenceType::Recurring,
        SequenceType::OneOff,
        SequenceType::Final,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            SequenceType::First => "FRST",
            SequenceType::Recurring => "RCUR",
            SequenceType::OneOff => "OOFF",
            SequenceType::Final => "FNAL",
        }
    }
}

impl Display for SequenceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for SequenceType {
    type Err = SepaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SequenceType::ALL
            .into_iter()
            .find(|t| t.code().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| SepaError::Format(format!("Unknown sequence type \"{}\".", s)))
    }
}

/// One collection from a debtor under a mandate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebitTransferTransaction {
    info: TransferInfo,
    debtor: IbanData,
    mandate_identification: String,
    date_of_signature: Date,
    sequence_type: SequenceType,
}

impl DebitTransferTransaction {
    pub fn new(
        debtor: IbanData,
        info: TransferInfo,
        mandate_identification: impl ToString,
    ) -> Result<Self, SepaError> {
        if !debtor.is_valid() {
            return Err(SepaError::rule("Debtor IBAN data are invalid."));
        }
        let mandate = mandate_identification.to_string();
        let mandate = mandate.trim();
        if mandate.is_empty() {
            return Err(SepaError::rule("The mandate identification is mandatory."));
        }
        Ok(Self {
            info,
            debtor,
            mandate_identification: limited(mandate, MAX_MANDATE_ID_LEN),
            date_of_signature: Date::today(),
            sequence_type: SequenceType::default(),
        })
    }

    pub fn with_date_of_signature(mut self, date: Date) -> Self {
        self.date_of_signature = date;
        self
    }

    pub fn with_sequence_type(mut self, sequence_type: SequenceType) -> Self {
        self.sequence_type = sequence_type;
        self
    }

    pub fn debtor(&self) -> &IbanData {
        &self.debtor
    }

    pub fn mandate_identification(&self) -> &str {
        &self.mandate_identification
    }

    pub fn date_of_signature(&self) -> Date {
        self.date_of_signature
    }

    pub fn sequence_type(&self) -> SequenceType {
        self.sequence_type
    }

    /// Same debtor and mandate, a different amount.
    pub(crate) fn with_amount(&self, amount: Amount) -> Result<Self, SepaError> {
        Ok(Self {
            info: self.info.with_amount(amount)?,
            ..self.clone()
        })
    }
}

impl Transfer for DebitTransferTransaction {
    fn info(&self) -> &TransferInfo {
        &self.info
    }

    fn info_mut(&mut self) -> &mut TransferInfo {
        &mut self.info
    }

    fn counterparty(&self) -> &IbanData {
        &self.debtor
    }
}

/// A pain.008 direct debit batch: one creditor collecting from many
/// debtors.
///
/// Transactions are written in one payment information block per
/// sequence type.
#[derive(Debug, Clone)]
pub struct DebitTransfer {
    batch: PaymentBatch<DebitTransferTransaction>,
    creditor: Option<IbanData>,
    creditor_account_currency: String,
    person_id: Option<String>,
    merge_duplicates: bool,
}

impl Default for DebitTransfer {
    fn default() -> Self {
        Self::new()
    }
}

impl DebitTransfer {
    pub fn new() -> Self {
        let mut batch = PaymentBatch::new(SepaSchema::Pain00800102);
        batch.header.local_instrument_code = Some("CORE".to_string());
        Self {
            batch,
            creditor: None,
            creditor_account_currency: "EUR".to_string(),
            person_id: None,
            merge_duplicates: true,
        }
    }

    /// Keeps every added transaction, even when a debtor account repeats.
    pub fn without_merging(mut self) -> Self {
        self.merge_duplicates = false;
        self
    }

    pub fn with_currency(mut self, currency: &str) -> Result<Self, SepaError> {
        self.creditor_account_currency = checked_currency(currency)?;
        Ok(self)
    }

    pub fn merges_duplicates(&self) -> bool {
        self.merge_duplicates
    }

    pub fn header(&self) -> &BatchHeader {
        &self.batch.header
    }

    pub fn header_mut(&mut self) -> &mut BatchHeader {
        &mut self.batch.header
    }

    pub fn creditor(&self) -> Option<&IbanData> {
        self.creditor.as_ref()
    }

    pub fn set_creditor(&mut self, creditor: IbanData) -> Result<(), SepaError> {
        if !creditor.is_valid() || creditor.unknown_bic() {
            return Err(SepaError::rule("Creditor IBAN data are invalid."));
        }
        self.creditor = Some(creditor);
        Ok(())
    }

    pub fn creditor_account_currency(&self) -> &str {
        &self.creditor_account_currency
    }

    /// The SEPA creditor scheme identification.
    pub fn person_id(&self) -> Option<&str> {
        self.person_id.as_deref()
    }

    pub fn set_person_id(&mut self, person_id: Option<String>) {
        self.person_id = person_id;
    }

    /// Derives the creditor identifier from a tax id and business code and
    /// uses it as both initiating party id and creditor scheme id. Nothing
    /// changes when the derivation fails.
    pub fn set_creditor_identifier(
        &mut self,
        country_code: &str,
        business_code: &str,
        tax_id: &str,
    ) -> Result<(), SepaError> {
        let id = iban::creditor_identifier(country_code, business_code, tax_id)?;
        self.batch.header.initiating_party_id = Some(id.clone());
        self.person_id = Some(id);
        Ok(())
    }

    /// Business code and tax id of the current creditor identifier.
    pub fn creditor_identifier_parts(&self) -> Option<(&str, &str)> {
        let id = self.person_id.as_deref()?;
        if !id.is_ascii() || id.len() <= 7 {
            return None;
        }
        Some((&id[4..7], &id[7..]))
    }

    /// Points the creditor at a domestic account. The BIC is taken from the
    /// bank code (the first four digits) and the creditor name is kept.
    pub fn set_creditor_account(
        &mut self,
        country_code: &str,
        account: &str,
        banks: &impl BicDirectory,
    ) -> Result<(), SepaError> {
        let creditor = self
            .creditor
            .clone()
            .ok_or_else(|| SepaError::rule("The creditor is mandatory."))?;
        let account: String = account.split_whitespace().collect();
        let iban = iban::iban_from_domestic(country_code, &account)?;
        let bank_code: String = account.chars().take(4).collect();
        let bic = banks.lookup(&bank_code)?;
        self.set_creditor(creditor.with_iban(&iban)?.with_bic(&bic)?)
    }

    pub fn add_debit_transfer(&mut self, transfer: DebitTransferTransaction) {
        self.batch.add_transfer(transfer, self.merge_duplicates);
    }

    pub fn transactions(&self) -> &[DebitTransferTransaction] {
        self.batch.transactions()
    }

    /// First transaction collecting from `iban`.
    pub fn transaction(&self, iban: &str) -> Option<&DebitTransferTransaction> {
        self.batch.transaction(iban)
    }

    pub fn transactions_of(
        &self,
        sequence_type: SequenceType,
    ) -> impl Iterator<Item = &DebitTransferTransaction> {
        self.transactions()
            .iter()
            .filter(move |t| t.sequence_type() == sequence_type)
    }

    pub fn number_of_transactions(&self) -> usize {
        self.batch.number_of_transactions()
    }

    pub fn header_control_sum(&self) -> Amount {
        self.batch.header_control_sum()
    }

    /// Sum of the payment information block for `sequence_type`.
    pub fn payment_control_sum(&self, sequence_type: SequenceType) -> Amount {
        self.transactions_of(sequence_type).map(|t| t.amount()).sum()
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

impl SepaDocument for DebitTransfer {
    fn check_mandatory_data(&self) -> Result<(), SepaError> {
        self.batch.header.check_message_identification()?;
        if self.creditor.is_none() {
            return Err(SepaError::rule("The creditor is mandatory."));
        }
        Ok(())
    }

    fn supports_schema(schema: SepaSchema) -> bool {
        matches!(schema, SepaSchema::Pain00800102 | SepaSchema::Pain00800103)
    }

    fn emit<W: Write>(&self, writer: &mut EventWriter<W>) -> Result<(), SepaError> {
        let doc = DocumentString::try_from(self)?;
        tracing::info!(
            "writing {} direct debits, total {}, as {}",
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

    const CREDITOR_IBAN: &str = "ES9121000418450200051332";

    fn debit(iban: &str, cents: i64, sequence_type: SequenceType) -> DebitTransferTransaction {
        DebitTransferTransaction::new(
            IbanData::new("Debtor", iban, "BSCHESMMXXX").unwrap(),
            TransferInfo::new("12345678Z", Amount::from_cents(cents)).unwrap(),
            "MANDATE-1",
        )
        .unwrap()
        .with_date_of_signature(Date::new(2020, 1, 15).unwrap())
        .with_sequence_type(sequence_type)
    }

    fn ready_batch() -> DebitTransfer {
        let mut batch = DebitTransfer::new();
        batch.header_mut().message_identification = "MSG1".to_string();
        batch
            .set_creditor(IbanData::new("Club", CREDITOR_IBAN, "CAIXESBBXXX").unwrap())
            .unwrap();
        batch
            .set_creditor_identifier("ES", "000", "G12345678")
            .unwrap();
        batch
    }

    #[test]
    fn sequence_type_codes() {
        assert_eq!("rcur".parse::<SequenceType>().unwrap(), SequenceType::Recurring);
        assert_eq!(SequenceType::default(), SequenceType::OneOff);
        assert!("MONTHLY".parse::<SequenceType>().is_err());
    }

    #[test]
    fn merging_can_be_disabled() {
        let mut merged = ready_batch();
        let mut kept = ready_batch().without_merging();
        for _ in 0..2 {
            merged.add_debit_transfer(debit("ES6000491500051234567892", 1000, SequenceType::OneOff));
            kept.add_debit_transfer(debit("ES6000491500051234567892", 1000, SequenceType::OneOff));
        }
        assert_eq!(merged.number_of_transactions(), 1);
        assert_eq!(merged.header_control_sum(), Amount::from_cents(2000));
        assert_eq!(kept.number_of_transactions(), 2);
        assert_eq!(kept.header_control_sum(), Amount::from_cents(2000));
    }

    #[test]
    fn creditor_identifier_updates_both_ids() {
        let batch = ready_batch();
        assert_eq!(batch.person_id(), batch.header().initiating_party_id.as_deref());
        assert!(batch.person_id().unwrap().ends_with("000G12345678"));

        let mut batch = batch;
        let before = batch.person_id().map(str::to_string);
        assert!(batch.set_creditor_identifier("ES", "0000", "G12345678").is_err());
        assert_eq!(batch.person_id().map(str::to_string), before);
    }

    #[test]
    fn creditor_identifier_parts_split_the_id() {
        let batch = ready_batch();
        assert_eq!(batch.creditor_identifier_parts(), Some(("000", "G12345678")));
        assert_eq!(DebitTransfer::new().creditor_identifier_parts(), None);
    }

    #[test]
    fn creditor_account_from_domestic_code() {
        let banks: std::collections::BTreeMap<String, String> =
            [("0049".to_string(), "BSCHESMMXXX".to_string())].into_iter().collect();
        let mut batch = ready_batch();
        batch
            .set_creditor_account("ES", "0049 1500 05 1234567892", &banks)
            .unwrap();
        let creditor = batch.creditor().unwrap();
        assert_eq!(creditor.iban(), "ES6000491500051234567892");
        assert_eq!(creditor.bic(), Some("BSCHESMMXXX"));
        assert_eq!(creditor.name(), "Club");

        assert!(matches!(
            batch.set_creditor_account("ES", "21000418450200051332", &banks),
            Err(SepaError::Lookup(code)) if code == "2100"
        ));
        assert_eq!(batch.creditor().unwrap().iban(), "ES6000491500051234567892");
        assert!(DebitTransfer::new()
            .set_creditor_account("ES", "00491500051234567892", &banks)
            .is_err());
    }

    #[test]
    fn mandatory_creditor() {
        let mut batch = DebitTransfer::new();
        batch.header_mut().message_identification = "MSG1".to_string();
        assert!(matches!(
            batch.check_mandatory_data(),
            Err(SepaError::RuleViolation(_))
        ));
        assert!(batch.to_xml_bytes().is_err());
    }

    #[test]
    fn schema_restrictions() {
        let mut batch = DebitTransfer::new();
        assert!(batch.set_schema(SepaSchema::Pain00800103).is_ok());
        assert!(matches!(
            batch.set_schema(SepaSchema::Pain00100103),
            Err(SepaError::Schema(_))
        ));
    }

    #[test]
    fn one_payment_block_per_sequence_type() {
        let mut batch = ready_batch();
        batch.add_debit_transfer(debit("ES6000491500051234567892", 1000, SequenceType::First));
        batch.add_debit_transfer(debit("ES1001822370420201234567", 2550, SequenceType::Recurring));
        batch.add_debit_transfer(debit("ES9820385778983000760236", 450, SequenceType::Recurring));
        assert_eq!(batch.payment_control_sum(SequenceType::First), Amount::from_cents(1000));
        assert_eq!(batch.payment_control_sum(SequenceType::Recurring), Amount::from_cents(3000));

        let xml = String::from_utf8(batch.to_xml_bytes().unwrap()).unwrap();
        assert!(xml.contains(r#"xmlns="urn:iso:std:iso:20022:tech:xsd:pain.008.001.02""#));
        assert_eq!(xml.matches("<PmtInf>").count(), 2);
        // group header, then one block each
        assert!(xml.contains("<NbOfTxs>3</NbOfTxs>"));
        assert!(xml.contains("<CtrlSum>40.00</CtrlSum>"));
        assert!(xml.contains("<NbOfTxs>1</NbOfTxs>"));
        assert!(xml.contains("<CtrlSum>10.00</CtrlSum>"));
        assert!(xml.contains("<NbOfTxs>2</NbOfTxs>"));
        assert!(xml.contains("<CtrlSum>30.00</CtrlSum>"));

        let first = xml.find("<SeqTp>FRST</SeqTp>").unwrap();
        let recurring = xml.find("<SeqTp>RCUR</SeqTp>").unwrap();
        assert!(first < recurring);
        assert!(!xml.contains("<SeqTp>OOFF</SeqTp>"));
        assert!(xml.contains("<PmtInfId>MSG1-FRST</PmtInfId>"));
        assert!(xml.contains("<PmtInfId>MSG1-RCUR</PmtInfId>"));
        assert!(xml.contains("<ReqdColltnDt>"));
        assert!(xml.contains("<DtOfSgntr>2020-01-15</DtOfSgntr>"));
        assert!(xml.contains("<MndtId>MANDATE-1</MndtId>"));
        assert!(xml.contains("<Prtry>SEPA</Prtry>"));
        assert!(xml.contains("<Cd>CORE</Cd>"));
    }

    #[test]
    fn emission_is_deterministic() {
        let mut batch = ready_batch();
        batch.add_debit_transfer(debit("ES6000491500051234567892", 1000, SequenceType::First));
        batch.add_debit_transfer(debit("ES1001822370420201234567", 2550, SequenceType::Recurring));
        batch.add_debit_transfer(debit("ES9820385778983000760236", 450, SequenceType::Final));
        let first = batch.to_xml_bytes().unwrap();
        let second = batch.to_xml_bytes().unwrap();
        assert_eq!(first, second);
        assert_eq!(String::from_utf8(first).unwrap().matches("<PmtInf>").count(), 3);
    }

    #[test]
    fn single_block_keeps_payment_info_id() {
        let mut batch = ready_batch();
        batch.add_debit_transfer(debit("ES6000491500051234567892", 1000, SequenceType::OneOff));
        let xml = String::from_utf8(batch.to_xml_bytes().unwrap()).unwrap();
        assert!(xml.contains("<PmtInfId>MSG1</PmtInfId>"));
    }
}
