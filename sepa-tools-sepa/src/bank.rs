use std::collections::{BTreeMap, HashMap};

use sepa_tools_config::BankDirectory;

use crate::{iban, SepaError};

/// Resolves a national bank code to the BIC of that bank.
pub trait BicDirectory {
    fn find_bic(&self, bank_code: &str) -> Option<&str>;

    /// Like [`find_bic`](Self::find_bic), but a missing entry is an error
    /// and the BIC is validated.
    fn lookup(&self, bank_code: &str) -> Result<String, SepaError> {
        let bic = self
            .find_bic(bank_code)
            .ok_or_else(|| SepaError::Lookup(bank_code.to_string()))?;
        iban::validate_bic(bic)
    }
}

impl BicDirectory for BankDirectory {
    fn find_bic(&self, bank_code: &str) -> Option<&str> {
        self.get(bank_code)
    }
}

impl BicDirectory for HashMap<String, String> {
    fn find_bic(&self, bank_code: &str) -> Option<&str> {
        self.get(bank_code).map(String::as_str)
    }
}

impl BicDirectory for BTreeMap<String, String> {
    fn find_bic(&self, bank_code: &str) -> Option<&str> {
        self.get(bank_code).map(String::as_str)
    }
}

impl<T: BicDirectory + ?Sized> BicDirectory for &T {
    fn find_bic(&self, bank_code: &str) -> Option<&str> {
        (**self).find_bic(bank_code)
    }
}
