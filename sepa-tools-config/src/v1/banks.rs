use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Spanish four digit bank codes (`entidad`) mapped to their BIC.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct BankDirectory {
    banks: BTreeMap<String, String>,
}

impl BankDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, bank_code: impl ToString, bic: impl ToString) {
        self.banks
            .insert(bank_code.to_string(), bic.to_string().to_uppercase());
    }

    pub fn get(&self, bank_code: &str) -> Option<&str> {
        self.banks.get(bank_code).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.banks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.banks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.banks.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: ToString, V: ToString> FromIterator<(K, V)> for BankDirectory {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut directory = Self::new();
        for (code, bic) in iter {
            directory.insert(code, bic);
        }
        directory
    }
}
