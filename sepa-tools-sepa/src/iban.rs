//! IBAN, BIC and creditor identifier checks.
//!
//! All the check digit arithmetic here is ISO 7064 mod 97-10, done one digit
//! at a time so it never needs more than a `u32`.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::SepaError;

static BIC_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z]{6}[A-Z2-9][A-NP-Z0-9]([A-Z0-9]{3})?$").unwrap());

static IBAN_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Z]{2}[0-9]{2}[A-Z0-9]{4}[0-9]{7}([A-Z0-9]?){0,16}$").unwrap()
});

/// Checks a BIC/SWIFT code and returns it in uppercase.
pub fn validate_bic(value: &str) -> Result<String, SepaError> {
    let len = value.chars().count();
    if len != 8 && len != 11 {
        return Err(SepaError::Format(format!(
            "Invalid length of BIC/swift code \"{}\", must be 8 or 11 chars.",
            value
        )));
    }
    let value = value.to_uppercase();
    if !BIC_REGEX.is_match(&value) {
        return Err(SepaError::Format(format!(
            "Invalid format of BIC/swift code \"{}\".",
            value
        )));
    }
    Ok(value)
}

/// Strips whitespace, uppercases and checks shape and checksum of an IBAN.
pub fn validate_iban(value: &str) -> Result<String, SepaError> {
    let value: String = value
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_uppercase();
    let len = value.chars().count();
    if !(14..=34).contains(&len) {
        return Err(SepaError::Format(format!(
            "Invalid length of IBAN code \"{}\", must contain between 14 and 34 characters.",
            value
        )));
    }
    if !IBAN_REGEX.is_match(&value) {
        return Err(SepaError::Format(format!(
            "Invalid format of IBAN code \"{}\".",
            value
        )));
    }
    if !is_iban_checksum_valid(&value)? {
        return Err(SepaError::Checksum(value));
    }
    Ok(value)
}

/// Runs the IBAN checksum over `iban` as it is laid out, reading it
/// cyclically from the fifth character so the country code and check
/// digits are consumed last.
pub fn is_iban_checksum_valid(iban: &str) -> Result<bool, SepaError> {
    let chars: Vec<char> = iban.chars().collect();
    let len = chars.len();
    let mut checksum = 0;
    for i in 0..len {
        checksum = fold_char(checksum, chars[(i + 4) % len]).ok_or_else(|| {
            SepaError::Format(format!("Invalid character in IBAN \"{}\".", iban))
        })?;
    }
    Ok(checksum == 1)
}

/// Builds an IBAN from a domestic account number, e.g. a Spanish
/// 20 digit CCC (`bank` `branch` `control` `account`).
pub fn iban_from_domestic(country_code: &str, account: &str) -> Result<String, SepaError> {
    let country = country_code.to_uppercase();
    if country.len() != 2 || !country.chars().all(|c| c.is_ascii_uppercase()) {
        return Err(SepaError::Format(format!(
            "Invalid country code \"{}\".",
            country_code
        )));
    }
    let account: String = account
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_uppercase();
    let check = check_digits(&account, &country).ok_or_else(|| {
        SepaError::Format(format!("Invalid domestic account \"{}\".", account))
    })?;
    validate_iban(&format!("{}{:02}{}", country, check, account))
}

/// Builds a SEPA creditor identifier (AT-02): country code, two check
/// digits, a three character business code and the national tax id.
/// The business code is not covered by the check digits.
pub fn creditor_identifier(
    country_code: &str,
    business_code: &str,
    tax_id: &str,
) -> Result<String, SepaError> {
    let country = country_code.to_uppercase();
    if country.len() != 2 || !country.chars().all(|c| c.is_ascii_uppercase()) {
        return Err(SepaError::Format(format!(
            "Invalid country code \"{}\".",
            country_code
        )));
    }
    let business_code = business_code.trim().to_uppercase();
    if business_code.len() != 3 || !business_code.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(SepaError::Format(format!(
            "Invalid creditor business code \"{}\", must be 3 alphanumeric chars.",
            business_code
        )));
    }
    let tax_id = tax_id.trim().to_uppercase();
    let check = check_digits(&tax_id, &country)
        .ok_or_else(|| SepaError::Format(format!("Invalid tax identifier \"{}\".", tax_id)))?;
    Ok(format!("{}{:02}{}{}", country, check, business_code, tax_id))
}

/// Recomputes the check digits of a creditor identifier.
pub fn is_creditor_identifier_valid(identifier: &str) -> bool {
    if identifier.len() < 8 || !identifier.is_ascii() {
        return false;
    }
    let (country, check) = (&identifier[0..2], &identifier[2..4]);
    let tax_id = &identifier[7..];
    mod97(&format!("{}{}{}", tax_id, country, check)) == Some(1)
}

fn check_digits(body: &str, country: &str) -> Option<u32> {
    if body.is_empty() || !body.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    let remainder = mod97(&format!("{}{}00", body, country))?;
    Some(98 - remainder)
}

fn mod97(value: &str) -> Option<u32> {
    value.chars().try_fold(0, fold_char)
}

/// Feeds one character into a running mod 97 remainder. Letters count as
/// the two digit numbers 10 (A) to 35 (Z).
fn fold_char(checksum: u32, c: char) -> Option<u32> {
    match c {
        '0'..='9' => Some((checksum * 10 + c.to_digit(10)?) % 97),
        'A'..='Z' => {
            let value = c as u32 - 'A' as u32 + 10;
            let checksum = (checksum * 10 + value / 10) % 97;
            Some((checksum * 10 + value % 10) % 97)
        }
        _ => None,
    }
}
