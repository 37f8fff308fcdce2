use std::fmt::Display;

use crate::{iban, SepaError};

const MAX_NAME_LEN: usize = 70;

/// Name, IBAN and BIC of one party of a payment.
///
/// Only built through validating constructors, so a value that exists is
/// always usable in a document. Changing a field goes through a consuming
/// `with_*` method that validates again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IbanData {
    name: String,
    iban: String,
    bic: Option<String>,
    unknown_bic: bool,
}

/// An IBAN cut up the way Spanish account numbers are shown:
/// `ES91` `2100` `0418` `45` `0200051332`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IbanSegments<'a> {
    pub country_and_check: &'a str,
    pub bank: &'a str,
    pub branch: &'a str,
    pub control: &'a str,
    pub account: &'a str,
}

impl IbanData {
    pub fn new(name: impl ToString, iban: &str, bic: &str) -> Result<Self, SepaError> {
        Ok(Self {
            name: checked_name(name)?,
            iban: iban::validate_iban(iban)?,
            bic: Some(iban::validate_bic(bic)?),
            unknown_bic: false,
        })
    }

    /// For counterparties whose bank is reached through the IBAN only.
    pub fn without_bic(name: impl ToString, iban: &str) -> Result<Self, SepaError> {
        Ok(Self {
            name: checked_name(name)?,
            iban: iban::validate_iban(iban)?,
            bic: None,
            unknown_bic: true,
        })
    }

    pub fn with_name(self, name: impl ToString) -> Result<Self, SepaError> {
        Ok(Self {
            name: checked_name(name)?,
            ..self
        })
    }

    pub fn with_iban(self, iban: &str) -> Result<Self, SepaError> {
        Ok(Self {
            iban: iban::validate_iban(iban)?,
            ..self
        })
    }

    pub fn with_bic(self, bic: &str) -> Result<Self, SepaError> {
        Ok(Self {
            bic: Some(iban::validate_bic(bic)?),
            unknown_bic: false,
            ..self
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn iban(&self) -> &str {
        &self.iban
    }

    pub fn bic(&self) -> Option<&str> {
        self.bic.as_deref()
    }

    pub fn unknown_bic(&self) -> bool {
        self.unknown_bic
    }

    pub fn is_valid(&self) -> bool {
        (self.bic.is_some() || self.unknown_bic) && !self.name.is_empty() && !self.iban.is_empty()
    }

    /// `None` unless the IBAN has the 24 character Spanish layout.
    pub fn segments(&self) -> Option<IbanSegments<'_>> {
        if self.iban.len() != 24 {
            return None;
        }
        Some(IbanSegments {
            country_and_check: &self.iban[0..4],
            bank: &self.iban[4..8],
            branch: &self.iban[8..12],
            control: &self.iban[12..14],
            account: &self.iban[14..24],
        })
    }
}

impl Display for IbanData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}

fn checked_name(name: impl ToString) -> Result<String, SepaError> {
    let name = name.to_string();
    let name = name.trim();
    if name.is_empty() {
        return Err(SepaError::rule("The name of an account holder is mandatory."));
    }
    Ok(name.chars().take(MAX_NAME_LEN).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    const IBAN: &str = "ES9121000418450200051332";

    #[test]
    fn builds_valid_data() {
        let data = IbanData::new("Club", "es91 2100 0418 4502 0005 1332", "caixesbbxxx").unwrap();
        assert_eq!(data.iban(), IBAN);
        assert_eq!(data.bic(), Some("CAIXESBBXXX"));
        assert!(data.is_valid());
        assert!(!data.unknown_bic());
    }

    #[test]
    fn name_is_truncated() {
        let data = IbanData::without_bic("x".repeat(100), IBAN).unwrap();
        assert_eq!(data.name().chars().count(), 70);
        assert!(data.is_valid());
    }

    #[test]
    fn empty_name_is_rejected() {
        assert!(matches!(
            IbanData::new("  ", IBAN, "CAIXESBB"),
            Err(SepaError::RuleViolation(_))
        ));
    }

    #[test]
    fn failed_reassignment_leaves_nothing_behind() {
        let data = IbanData::new("Club", IBAN, "CAIXESBB").unwrap();
        let copy = data.clone();
        assert!(matches!(
            copy.with_iban("ES9121000418450200051333"),
            Err(SepaError::Checksum(_))
        ));
        assert_eq!(data.iban(), IBAN);

        let data = data.with_bic("BSCHESMM").unwrap();
        assert_eq!(data.bic(), Some("BSCHESMM"));
    }

    #[test]
    fn spanish_segments() {
        let data = IbanData::without_bic("Club", IBAN).unwrap();
        let segments = data.segments().unwrap();
        assert_eq!(segments.country_and_check, "ES91");
        assert_eq!(segments.bank, "2100");
        assert_eq!(segments.branch, "0418");
        assert_eq!(segments.control, "45");
        assert_eq!(segments.account, "0200051332");

        let dutch = IbanData::without_bic("Club", "NL91ABNA0417164300").unwrap();
        assert!(dutch.segments().is_none());
    }
}
