mod bank;
mod batch;
mod direct_debit;
mod header_gen;
mod identity;
mod normalize;
mod transfer;

pub mod iban;

use std::{fmt::Display, io::Write, str::FromStr};

use rand::{thread_rng, Rng};
use sepa_tools_types::Date;
use xml::{writer::XmlEvent, EmitterConfig, EventWriter};

pub use bank::BicDirectory;
pub use batch::{BatchHeader, PaymentBatch, Transfer, TransferInfo};
pub use direct_debit::{DebitTransfer, DebitTransferTransaction, SequenceType};
pub use identity::{IbanData, IbanSegments};
pub use normalize::{reconcile, reconcile_credit, CreditReconciliation, Reconciliation};
pub use transfer::{CreditTransfer, CreditTransferTransaction};

#[derive(Debug, thiserror::Error)]
pub enum SepaError {
    #[error("Format error: {0}")]
    Format(String),
    #[error("Invalid IBAN checksum on \"{0}\".")]
    Checksum(String),
    #[error("{0}")]
    RuleViolation(String),
    #[error("Schema {0} is not supported by this kind of transfer.")]
    Schema(SepaSchema),
    #[error("No BIC known for bank code \"{0}\".")]
    Lookup(String),
    #[error("XML error: {0}")]
    Xml(#[from] xml::writer::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SepaError {
    pub(crate) fn rule(message: impl ToString) -> Self {
        SepaError::RuleViolation(message.to_string())
    }
}

/// The ISO 20022 message versions that can be written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SepaSchema {
    Pain00100103,
    Pain00100104,
    Pain00800102,
    Pain00800103,
}

impl SepaSchema {
    pub fn as_str(&self) -> &'static str {
        match self {
            SepaSchema::Pain00100103 => "pain.001.001.03",
            SepaSchema::Pain00100104 => "pain.001.001.04",
            SepaSchema::Pain00800102 => "pain.008.001.02",
            SepaSchema::Pain00800103 => "pain.008.001.03",
        }
    }

    pub fn namespace(&self) -> String {
        format!("urn:iso:std:iso:20022:tech:xsd:{}", self.as_str())
    }
}

impl Display for SepaSchema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SepaSchema {
    type Err = SepaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pain.001.001.03" => Ok(SepaSchema::Pain00100103),
            "pain.001.001.04" => Ok(SepaSchema::Pain00100104),
            "pain.008.001.02" => Ok(SepaSchema::Pain00800102),
            "pain.008.001.03" => Ok(SepaSchema::Pain00800103),
            _ => Err(SepaError::Format(format!("Unknown SEPA schema \"{}\".", s))),
        }
    }
}

trait ToXml {
    fn to_xml(&self) -> Vec<XmlEvent>;
}

/// A batch that can be written as a pain document.
pub trait SepaDocument {
    /// Fails with [`SepaError::RuleViolation`] when a field required for
    /// writing is missing.
    fn check_mandatory_data(&self) -> Result<(), SepaError>;

    fn supports_schema(schema: SepaSchema) -> bool
    where
        Self: Sized;

    /// Writes every event of the document. Nothing is written when the
    /// mandatory data check fails.
    fn emit<W: Write>(&self, writer: &mut EventWriter<W>) -> Result<(), SepaError>
    where
        Self: Sized;

    fn to_xml_bytes(&self) -> Result<Vec<u8>, SepaError>
    where
        Self: Sized,
    {
        let mut writer = EmitterConfig::new()
            .perform_indent(true)
            .create_writer(Vec::new());
        self.emit(&mut writer)?;
        Ok(writer.into_inner())
    }

    /// Builds the whole document in memory first so `writer` only ever sees
    /// a complete file.
    fn write<W: Write>(&self, mut writer: W) -> Result<(), SepaError>
    where
        Self: Sized,
    {
        let bytes = self.to_xml_bytes()?;
        writer.write_all(&bytes)?;
        writer.flush()?;
        Ok(())
    }
}

/// `YYYYMMDD-<16 hex digits>`, unique enough for a message id.
pub fn generate_message_id() -> String {
    let id = thread_rng().gen::<u64>();
    format!("{}-{:0>16x}", Date::today().to_string().replace('-', ""), id)
}

fn start_document<'a>() -> XmlEvent<'a> {
    XmlEvent::StartDocument {
        version: xml::common::XmlVersion::Version10,
        encoding: Some("UTF-8"),
        standalone: Some(true),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_names() {
        for schema in [
            SepaSchema::Pain00100103,
            SepaSchema::Pain00100104,
            SepaSchema::Pain00800102,
            SepaSchema::Pain00800103,
        ] {
            assert_eq!(schema.as_str().parse::<SepaSchema>().unwrap(), schema);
        }
        assert_eq!(
            SepaSchema::Pain00800102.namespace(),
            "urn:iso:std:iso:20022:tech:xsd:pain.008.001.02"
        );
        assert!("pain.002.001.03".parse::<SepaSchema>().is_err());
    }

    #[test]
    fn message_id_shape() {
        let id = generate_message_id();
        assert_eq!(id.len(), 8 + 1 + 16);
        assert!(id.len() <= 35);
    }
}
