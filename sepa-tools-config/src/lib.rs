use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

pub use v1::banks::BankDirectory;
pub use v1::sepa::SEPAConfig;

mod v1 {
    /// SEPA defaults
    pub mod sepa;

    /// Bank code to BIC table
    pub mod banks;
}

pub const CURRENT_VERSION: usize = 1;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Could not parse config file: {0}")]
    Deserialize(#[from] toml::de::Error),
    #[error("Could not serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    sepa: v1::sepa::SEPAConfig,
    #[serde(default)]
    banks: v1::banks::BankDirectory,
    #[serde(default = "current_version")]
    version: usize,
}

fn current_version() -> usize {
    CURRENT_VERSION
}

impl Config {
    pub fn sepa(&self) -> &v1::sepa::SEPAConfig {
        &self.sepa
    }

    pub fn sepa_mut(&mut self) -> &mut v1::sepa::SEPAConfig {
        &mut self.sepa
    }

    pub fn banks(&self) -> &v1::banks::BankDirectory {
        &self.banks
    }

    pub fn banks_mut(&mut self) -> &mut v1::banks::BankDirectory {
        &mut self.banks
    }

    pub fn needs_upgrade(&self) -> bool {
        self.version < CURRENT_VERSION
    }

    pub fn from_toml(toml: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(toml)
    }

    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string(self)
    }

    /// Reads the config at `path`, or at the default location when `None`.
    /// A missing file yields the defaults.
    pub fn load_from_file(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config_file = match path {
            Some(p) => p.to_path_buf(),
            None => config_location()?,
        };
        if !config_file.exists() {
            tracing::debug!("no config at {}, using defaults", config_file.display());
            return Ok(Default::default());
        }
        tracing::debug!("loading config from {}", config_file.display());
        let config = std::fs::read_to_string(config_file)?;
        Ok(Self::from_toml(&config)?)
    }

    pub fn save_to_file(&self, path: Option<&Path>) -> Result<(), ConfigError> {
        let config_file = match path {
            Some(p) => p.to_path_buf(),
            None => config_location()?,
        };
        let toml = self.to_toml()?;
        let mut buf = BufWriter::new(std::fs::File::create(config_file)?);
        buf.write_all(toml.as_bytes())?;
        buf.flush()?;
        Ok(())
    }

    /// get a list of all things potentially wrong with the config
    pub fn config_errors(&self) -> Vec<&str> {
        let mut errors = Vec::new();
        let sepa = self.sepa();
        if sepa.country_code.len() != 2 || !sepa.country_code.chars().all(|c| c.is_ascii_alphabetic())
        {
            errors.push("SEPA country code must be two letters");
        }
        if sepa.currency.len() != 3 || !sepa.currency.chars().all(|c| c.is_ascii_alphabetic()) {
            errors.push("SEPA currency must be a three letter ISO code");
        }
        if sepa.local_instrument.is_empty() {
            errors.push("SEPA local instrument is empty");
        }
        if !["FRST", "RCUR", "OOFF", "FNAL"]
            .iter()
            .any(|code| code.eq_ignore_ascii_case(sepa.sequence_type.trim()))
        {
            errors.push("SEPA sequence type must be FRST, RCUR, OOFF or FNAL");
        }

        if self.banks().is_empty() {
            errors.push("Bank directory is empty");
        }
        if self
            .banks()
            .iter()
            .any(|(code, _)| code.len() != 4 || !code.chars().all(|c| c.is_ascii_digit()))
        {
            errors.push("Bank directory contains a bank code that is not four digits");
        }

        errors
    }
}

fn config_location() -> Result<PathBuf, std::io::Error> {
    if let Some(config_dir) = dirs::config_dir() {
        let dir = config_dir.join("sepa-tools");
        std::fs::create_dir_all(&dir)?;
        Ok(dir.join("config.toml"))
    } else {
        Ok(PathBuf::from("sepa-tools.toml"))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CURRENT_VERSION,
            sepa: v1::sepa::SEPAConfig::default(),
            banks: v1::banks::BankDirectory::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
version = 1

[sepa]
country_code = "ES"
execution_offset_days = 3

[banks]
"2100" = "CAIXESBBXXX"
"0049" = "bschesmmxxx"
"#;

    #[test]
    fn parses_sample() {
        let config = Config::from_toml(SAMPLE).unwrap();
        assert_eq!(config.sepa().execution_offset_days, 3);
        assert_eq!(config.sepa().currency, "EUR");
        assert_eq!(config.banks().get("2100"), Some("CAIXESBBXXX"));
        assert_eq!(config.banks().get("9999"), None);
        assert!(config.config_errors().is_empty());
    }

    #[test]
    fn toml_round_trip() {
        let mut config = Config::default();
        config.banks_mut().insert("0182", "BBVAESMMXXX");
        let text = config.to_toml().unwrap();
        let back = Config::from_toml(&text).unwrap();
        assert_eq!(back.banks(), config.banks());
        assert!(!back.needs_upgrade());
    }

    #[test]
    fn empty_directory_is_reported() {
        let config = Config::default();
        assert_eq!(config.config_errors(), vec!["Bank directory is empty"]);
    }

    #[test]
    fn sequence_type_is_case_insensitive() {
        let mut config = Config::from_toml(SAMPLE).unwrap();
        config.sepa_mut().sequence_type = "rcur".to_string();
        assert!(config.config_errors().is_empty());
        config.sepa_mut().sequence_type = "MONTHLY".to_string();
        assert_eq!(
            config.config_errors(),
            vec!["SEPA sequence type must be FRST, RCUR, OOFF or FNAL"]
        );
    }

    #[test]
    fn missing_file_gives_defaults() {
        let path = std::env::temp_dir().join("sepa-tools-does-not-exist.toml");
        let config = Config::load_from_file(Some(&path)).unwrap();
        assert_eq!(config.sepa().country_code, "ES");
    }
}
