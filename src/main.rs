//! # sepa-tools
//!
//! Turns Norma 19 presentation files into SEPA direct debit documents and
//! reconciles two presentations of the same remittance.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use sepa_tools_config::Config;
use sepa_tools_norma19::Norma19Options;
use sepa_tools_sepa::{iban, DebitTransfer, SepaDocument, SepaSchema};
use sepa_tools_types::Date;

#[derive(Parser, Debug)]
#[command(name = "sepa-tools", version, about)]
struct Cli {
    /// Config file to use instead of the one in the user config directory.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Convert a Norma 19 file into a pain.008 direct debit document.
    Convert {
        input: PathBuf,
        /// Written to stdout when omitted.
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Generated when omitted.
        #[arg(long)]
        message_id: Option<String>,
        #[arg(long, default_value = "pain.008.001.02")]
        schema: String,
        #[command(flatten)]
        edits: BatchEdits,
    },
    /// Write the debits and refunds that turn a partial presentation into
    /// the complete one.
    Reconcile {
        complete: PathBuf,
        partial: PathBuf,
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
        #[arg(long)]
        message_id: Option<String>,
        /// Applied to the complete presentation before reconciling.
        #[command(flatten)]
        edits: BatchEdits,
    },
    /// Validate an IBAN, or derive one from a domestic account code.
    Iban {
        value: String,
        #[arg(long)]
        domestic: bool,
    },
}

/// Overrides for values the Norma 19 header carries or the config derives.
#[derive(clap::Args, Debug, Default)]
struct BatchEdits {
    /// Creditor tax id. The suffix is kept unless `--suffix` is given.
    #[arg(long)]
    tax_id: Option<String>,
    /// Three character creditor business code.
    #[arg(long)]
    suffix: Option<String>,
    /// Domestic account (CCC) the money is collected into.
    #[arg(long, value_name = "CCC")]
    creditor_account: Option<String>,
    /// Requested collection date, `YYYY-MM-DD`.
    #[arg(long)]
    execution_date: Option<Date>,
}

impl BatchEdits {
    fn apply(&self, batch: &mut DebitTransfer, config: &Config) -> anyhow::Result<()> {
        let country = &config.sepa().country_code;
        if self.tax_id.is_some() || self.suffix.is_some() {
            let (suffix, tax_id) = batch.creditor_identifier_parts().unwrap_or(("000", ""));
            let suffix = self.suffix.clone().unwrap_or_else(|| suffix.to_string());
            let tax_id = self.tax_id.clone().unwrap_or_else(|| tax_id.to_string());
            batch
                .set_creditor_identifier(country, &suffix, &tax_id)
                .context("could not set the creditor identifier")?;
        }
        if let Some(account) = &self.creditor_account {
            let account: String = account.split_whitespace().collect();
            if !sepa_tools_norma19::is_ccc_valid(&account) {
                tracing::warn!("control digits of {} do not match", account);
            }
            batch
                .set_creditor_account(country, &account, config.banks())
                .context("could not set the creditor account")?;
        }
        if let Some(date) = self.execution_date {
            batch.header_mut().requested_execution_date = date;
        }
        Ok(())
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = Config::load_from_file(cli.config.as_deref()).context("could not load config")?;
    for error in config.config_errors() {
        tracing::warn!("config: {}", error);
    }

    match cli.command {
        Commands::Convert {
            input,
            output,
            message_id,
            schema,
            edits,
        } => {
            let mut batch = read_batch(&input, &config)?;
            edits.apply(&mut batch, &config)?;
            batch.header_mut().message_identification =
                message_id.unwrap_or_else(sepa_tools_sepa::generate_message_id);
            batch.set_schema(schema.parse::<SepaSchema>()?)?;
            match output {
                Some(path) => write_document(&batch, &path)?,
                None => batch.write(std::io::stdout().lock())?,
            }
        }
        Commands::Reconcile {
            complete,
            partial,
            out_dir,
            message_id,
            edits,
        } => {
            let mut complete_batch = read_batch(&complete, &config)?;
            edits.apply(&mut complete_batch, &config)?;
            let partial_batch = read_batch(&partial, &config)?;
            complete_batch.header_mut().message_identification =
                message_id.unwrap_or_else(sepa_tools_sepa::generate_message_id);

            let result = sepa_tools_sepa::reconcile(&complete_batch, &partial_batch)?;
            let stem = complete
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "reconciled".to_string());
            if result.debits.is_empty() {
                tracing::info!("nothing left to collect");
            } else {
                write_document(&result.debits, &out_dir.join(format!("{}.debit.xml", stem)))?;
            }
            if result.credits.is_empty() {
                tracing::info!("nothing to refund");
            } else {
                write_document(&result.credits, &out_dir.join(format!("{}.credit.xml", stem)))?;
            }
        }
        Commands::Iban { value, domestic } => {
            let iban = if domestic {
                let account: String = value.split_whitespace().collect();
                if !sepa_tools_norma19::is_ccc_valid(&account) {
                    tracing::warn!("control digits of {} do not match", account);
                }
                iban::iban_from_domestic(&config.sepa().country_code, &account)?
            } else {
                iban::validate_iban(&value)?
            };
            println!("{}", iban);
        }
    }

    Ok(())
}

fn read_batch(path: &Path, config: &Config) -> anyhow::Result<DebitTransfer> {
    let options = Norma19Options::from_config(config.sepa())?;
    let file = std::fs::File::open(path)
        .with_context(|| format!("could not open {}", path.display()))?;
    let lines = sepa_tools_norma19::read(file)?;
    let parsed = sepa_tools_norma19::parse(&lines, config.banks(), &options)
        .with_context(|| format!("could not read {}", path.display()))?;
    Ok(parsed.into_debit_transfer()?)
}

fn write_document(document: &impl SepaDocument, path: &Path) -> anyhow::Result<()> {
    let bytes = document.to_xml_bytes()?;
    std::fs::write(path, bytes).with_context(|| format!("could not write {}", path.display()))?;
    tracing::info!("wrote {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sepa_tools_sepa::IbanData;

    fn batch() -> DebitTransfer {
        let mut batch = DebitTransfer::new();
        batch
            .set_creditor(IbanData::new("Club", "ES9121000418450200051332", "CAIXESBBXXX").unwrap())
            .unwrap();
        batch.set_creditor_identifier("ES", "001", "G12345678").unwrap();
        batch
    }

    #[test]
    fn cli_parses_edits() {
        let cli = Cli::try_parse_from([
            "sepa-tools",
            "convert",
            "in.txt",
            "--tax-id",
            "B87654321",
            "--execution-date",
            "2024-03-07",
        ])
        .unwrap();
        let Commands::Convert { edits, .. } = cli.command else {
            panic!("expected convert");
        };
        assert_eq!(edits.tax_id.as_deref(), Some("B87654321"));
        assert_eq!(edits.execution_date, Date::new(2024, 3, 7));
        assert!(Cli::try_parse_from([
            "sepa-tools",
            "convert",
            "in.txt",
            "--execution-date",
            "07/03/2024",
        ])
        .is_err());
    }

    #[test]
    fn edits_override_the_batch() {
        let mut config = Config::default();
        config.banks_mut().insert("0049", "BSCHESMMXXX");
        let mut batch = batch();

        let edits = BatchEdits {
            tax_id: Some("B87654321".to_string()),
            creditor_account: Some("0049 1500 05 1234567892".to_string()),
            execution_date: Date::new(2024, 3, 7),
            ..Default::default()
        };
        edits.apply(&mut batch, &config).unwrap();

        assert_eq!(batch.creditor_identifier_parts(), Some(("001", "B87654321")));
        assert_eq!(batch.header().initiating_party_id.as_deref(), batch.person_id());
        let creditor = batch.creditor().unwrap();
        assert_eq!(creditor.iban(), "ES6000491500051234567892");
        assert_eq!(creditor.bic(), Some("BSCHESMMXXX"));
        assert_eq!(batch.header().requested_execution_date, Date::new(2024, 3, 7).unwrap());

        let suffix_only = BatchEdits {
            suffix: Some("002".to_string()),
            ..Default::default()
        };
        suffix_only.apply(&mut batch, &config).unwrap();
        assert_eq!(batch.creditor_identifier_parts(), Some(("002", "B87654321")));
    }

    #[test]
    fn unknown_creditor_bank_is_an_error() {
        let config = Config::default();
        let mut batch = batch();
        let edits = BatchEdits {
            creditor_account: Some("00491500051234567892".to_string()),
            ..Default::default()
        };
        assert!(edits.apply(&mut batch, &config).is_err());
        assert_eq!(batch.creditor().unwrap().iban(), "ES9121000418450200051332");
    }
}
