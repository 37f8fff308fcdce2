use sepa_tools_sepa::{
    iban, BicDirectory, DebitTransfer, DebitTransferTransaction, IbanData, SepaError,
    TransferInfo,
};
use sepa_tools_types::{Amount, Date};

use crate::{ccc::is_ccc_valid, Norma19Error, Norma19Options};

const DEBTOR_RECORD: &str = "5680";
/// Every debtor record is followed by optional lines we do not read.
const RECORD_LINES: usize = 4;

/// The contents of one Norma 19 presentation.
#[derive(Debug, Clone)]
pub struct Norma19File {
    creditor: IbanData,
    tax_id: String,
    business_code: String,
    creditor_identifier: String,
    presentation_date: Date,
    debits: Vec<DebitTransferTransaction>,
    options: Norma19Options,
}

impl Norma19File {
    pub fn creditor(&self) -> &IbanData {
        &self.creditor
    }

    pub fn tax_id(&self) -> &str {
        &self.tax_id
    }

    pub fn business_code(&self) -> &str {
        &self.business_code
    }

    /// SEPA creditor identifier built from the tax id and business code.
    pub fn creditor_identifier(&self) -> &str {
        &self.creditor_identifier
    }

    pub fn presentation_date(&self) -> Date {
        self.presentation_date
    }

    pub fn debits(&self) -> &[DebitTransferTransaction] {
        &self.debits
    }

    /// Builds a direct debit batch that keeps every record separate, even
    /// when a debtor account appears more than once. The message id is
    /// left empty.
    pub fn into_debit_transfer(self) -> Result<DebitTransfer, SepaError> {
        let execution_date = Date::in_some_days(self.options.execution_offset_days)
            .ok_or_else(|| {
                SepaError::RuleViolation("The execution date is out of range.".to_string())
            })?;

        let mut batch = DebitTransfer::new()
            .without_merging()
            .with_currency(&self.options.currency)?;
        batch.set_person_id(Some(self.creditor_identifier.clone()));
        {
            let header = batch.header_mut();
            header.initiating_party_name = Some(self.creditor.name().to_string());
            header.initiating_party_id = Some(self.creditor_identifier);
            header.local_instrument_code = Some(self.options.local_instrument);
            header.requested_execution_date = execution_date;
        }
        batch.set_creditor(self.creditor)?;
        for debit in self.debits {
            batch.add_debit_transfer(debit);
        }
        Ok(batch)
    }
}

/// Reads the decoded lines of a presentation file.
///
/// Line 1 holds the creditor, line 2 the presentation date and the
/// creditor account. Debtor records start at line 3 and run until a line
/// with another record type, or the end of the input.
pub fn parse<S: AsRef<str>>(
    lines: &[S],
    banks: &impl BicDirectory,
    options: &Norma19Options,
) -> Result<Norma19File, Norma19Error> {
    let header = line_at(lines, 0, "creditor record")?;
    let tax_id = field(header, 1, "creditor tax id", 4, 9)?
        .trim()
        .to_uppercase();
    let business_code = field(header, 1, "creditor suffix", 13, 3)?;
    let name = field(header, 1, "creditor name", 28, 40)?;

    let presenter = line_at(lines, 1, "presentation record")?;
    let date = field(presenter, 2, "presentation date", 22, 6)?;
    let presentation_date = Date::from_ddmmyy(&date).ok_or_else(|| Norma19Error::Parse {
        line: 2,
        field: "presentation date",
        reason: format!("\"{}\" is not a ddmmyy date", date),
    })?;
    let account = account(presenter, 2, "creditor account")?;

    let creditor = IbanData::new(
        name.trim(),
        &iban::iban_from_domestic(&options.country_code, &account)?,
        &banks.lookup(&account[..4])?,
    )?;
    let creditor_identifier =
        iban::creditor_identifier(&options.country_code, &business_code, &tax_id)?;
    tracing::debug!(
        "creditor {} ({}), presented {}",
        creditor.name(),
        creditor_identifier,
        presentation_date
    );

    let mut debits = Vec::new();
    let mut index = 2;
    while let Some(line) = lines.get(index) {
        let line: &str = line.as_ref();
        if !line.starts_with(DEBTOR_RECORD) {
            break;
        }
        if let Some(debit) = parse_debtor(line, index + 1, banks, options)? {
            debits.push(debit);
        }
        index += RECORD_LINES;
    }
    tracing::info!("read {} debtor records", debits.len());

    Ok(Norma19File {
        creditor,
        tax_id,
        business_code,
        creditor_identifier,
        presentation_date,
        debits,
        options: options.clone(),
    })
}

fn parse_debtor(
    line: &str,
    number: usize,
    banks: &impl BicDirectory,
    options: &Norma19Options,
) -> Result<Option<DebitTransferTransaction>, Norma19Error> {
    let account = account(line, number, "debtor account")?;
    let amount = field(line, number, "amount", 88, 10)?;
    let cents: i64 = amount.trim().parse().map_err(|_| Norma19Error::Parse {
        line: number,
        field: "amount",
        reason: format!("\"{}\" is not a number", amount),
    })?;
    let name = field(line, number, "debtor name", 28, 40)?;
    let tax_id = field(line, number, "debtor tax id", 16, 9)?.to_uppercase();
    let reference = field(line, number, "reference", 114, 40)?;

    if cents <= 0 {
        tracing::warn!("line {}: skipping {} with amount {}", number, name.trim(), cents);
        return Ok(None);
    }
    if !is_ccc_valid(&account) {
        tracing::warn!("line {}: control digits of account {} do not match", number, account);
    }

    let debit = debtor_transaction(
        name.trim(),
        tax_id.trim(),
        reference.trim(),
        &account,
        Amount::from_cents(cents),
        banks,
        options,
    )
    .map_err(|source| Norma19Error::Record {
        line: number,
        source,
    })?;
    tracing::debug!("line {}: {} {}", number, debit.debtor().iban(), cents);
    Ok(Some(debit))
}

fn debtor_transaction(
    name: &str,
    tax_id: &str,
    reference: &str,
    account: &str,
    amount: Amount,
    banks: &impl BicDirectory,
    options: &Norma19Options,
) -> Result<DebitTransferTransaction, SepaError> {
    let debtor = IbanData::new(
        name,
        &iban::iban_from_domestic(&options.country_code, account)?,
        &banks.lookup(&account[..4])?,
    )?;
    let info = TransferInfo::new(tax_id, amount)?
        .with_currency(&options.currency)?
        .with_remittance_information(reference);
    Ok(DebitTransferTransaction::new(debtor, info, reference)?
        .with_sequence_type(options.sequence_type))
}

fn line_at<'a, S: AsRef<str>>(
    lines: &'a [S],
    index: usize,
    record: &'static str,
) -> Result<&'a str, Norma19Error> {
    lines
        .get(index)
        .map(|line| line.as_ref())
        .ok_or_else(|| Norma19Error::Parse {
            line: index + 1,
            field: record,
            reason: "missing line".to_string(),
        })
}

/// `len` characters starting at character `offset`.
fn field(
    line: &str,
    number: usize,
    name: &'static str,
    offset: usize,
    len: usize,
) -> Result<String, Norma19Error> {
    let value: String = line.chars().skip(offset).take(len).collect();
    if value.chars().count() < len {
        return Err(Norma19Error::Parse {
            line: number,
            field: name,
            reason: format!("line is shorter than {} characters", offset + len),
        });
    }
    Ok(value)
}

/// A 20 digit domestic account code at offset 68.
fn account(line: &str, number: usize, name: &'static str) -> Result<String, Norma19Error> {
    let account = field(line, number, name, 68, 20)?;
    if !account.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Norma19Error::Parse {
            line: number,
            field: name,
            reason: format!("\"{}\" is not a 20 digit account", account),
        });
    }
    Ok(account)
}
