use serde::{Deserialize, Serialize};

/// Defaults applied to batches read from legacy bank files.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SEPAConfig {
    #[serde(default = "default_country_code")]
    pub country_code: String,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default = "default_local_instrument")]
    pub local_instrument: String,
    /// Days between reading a file and the requested collection date.
    #[serde(default = "default_execution_offset_days")]
    pub execution_offset_days: u64,
    /// `FRST`, `RCUR`, `OOFF` or `FNAL`
    #[serde(default = "default_sequence_type")]
    pub sequence_type: String,
}

fn default_country_code() -> String {
    "ES".to_string()
}

fn default_currency() -> String {
    "EUR".to_string()
}

fn default_local_instrument() -> String {
    "CORE".to_string()
}

fn default_execution_offset_days() -> u64 {
    1
}

fn default_sequence_type() -> String {
    "OOFF".to_string()
}

impl Default for SEPAConfig {
    fn default() -> Self {
        Self {
            country_code: default_country_code(),
            currency: default_currency(),
            local_instrument: default_local_instrument(),
            execution_offset_days: default_execution_offset_days(),
            sequence_type: default_sequence_type(),
        }
    }
}
