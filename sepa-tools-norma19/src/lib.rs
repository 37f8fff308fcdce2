//! Reader for "Norma 19" direct debit presentation files, the fixed width
//! format Spanish banks used before SEPA.

use std::io::Read;

use encoding_rs::WINDOWS_1252;
use sepa_tools_config::SEPAConfig;
use sepa_tools_sepa::{SepaError, SequenceType};

mod ccc;
mod file;

pub use ccc::is_ccc_valid;
pub use file::{parse, Norma19File};

#[derive(Debug, thiserror::Error)]
pub enum Norma19Error {
    #[error("Line {line}, {field}: {reason}")]
    Parse {
        line: usize,
        field: &'static str,
        reason: String,
    },
    #[error("Line {line}: {source}")]
    Record {
        line: usize,
        #[source]
        source: SepaError,
    },
    #[error(transparent)]
    Sepa(#[from] SepaError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Settings that the file itself does not carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Norma19Options {
    pub country_code: String,
    pub currency: String,
    pub local_instrument: String,
    pub execution_offset_days: u64,
    pub sequence_type: SequenceType,
}

impl Default for Norma19Options {
    fn default() -> Self {
        Self {
            country_code: "ES".to_string(),
            currency: "EUR".to_string(),
            local_instrument: "CORE".to_string(),
            execution_offset_days: 1,
            sequence_type: SequenceType::OneOff,
        }
    }
}

impl Norma19Options {
    pub fn from_config(config: &SEPAConfig) -> Result<Self, SepaError> {
        Ok(Self {
            country_code: config.country_code.to_uppercase(),
            currency: config.currency.to_uppercase(),
            local_instrument: config.local_instrument.clone(),
            execution_offset_days: config.execution_offset_days,
            sequence_type: config.sequence_type.parse()?,
        })
    }
}

/// Splits the raw bytes of a Windows-1252 file into lines.
pub fn decode(bytes: &[u8]) -> Vec<String> {
    let (text, had_errors) = WINDOWS_1252.decode_without_bom_handling(bytes);
    if had_errors {
        tracing::warn!("file contains bytes that are not Windows-1252");
    }
    text.lines().map(str::to_string).collect()
}

pub fn read(mut reader: impl Read) -> Result<Vec<String>, Norma19Error> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    Ok(decode(&bytes))
}
