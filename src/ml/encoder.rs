//! Categorical encoder for inverter ids
//!
//! Codes are dense indices into the sorted list of distinct ids seen at fit
//! time. The encoder has no mutating methods once fitted; it is persisted
//! next to the forest so serving reproduces the training-time codes.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::{PredictorError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryEncoder {
    categories: Vec<String>,
}

impl CategoryEncoder {
    /// Fit on the distinct values, ordered lexicographically by byte
    pub fn fit<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let unique: BTreeSet<String> = values
            .into_iter()
            .map(|v| v.as_ref().to_string())
            .collect();

        Self {
            categories: unique.into_iter().collect(),
        }
    }

    pub fn encode(&self, value: &str) -> Result<u32> {
        self.categories
            .binary_search_by(|c| c.as_str().cmp(value))
            .map(|idx| idx as u32)
            .map_err(|_| PredictorError::UnknownCategory(value.to_string()))
    }

    pub fn decode(&self, code: u32) -> Option<&str> {
        self.categories.get(code as usize).map(String::as_str)
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// Strictly increasing order, which `encode` relies on.
    /// A deserialized encoder that fails this was not written by `fit`.
    pub fn is_well_formed(&self) -> bool {
        self.categories.windows(2).all(|w| w[0] < w[1])
    }
}
