use std::fmt;
use std::hash::{Hash, Hasher};

use chrono::NaiveDate;
use serde::Serialize;

use crate::models::Transaction;

/// Grouping key for a transaction. Used only for comparison, never for display
/// of the transaction itself.
#[derive(Debug, Clone, Serialize)]
pub struct NormalizedKey {
    pub date: Option<NaiveDate>,
    pub description: String,
    pub amount: f64,
}

impl NormalizedKey {
    // -0.0 and 0.0 are the same amount; everything else compares bit-exact.
    fn amount_bits(&self) -> u64 {
        if self.amount == 0.0 {
            0.0f64.to_bits()
        } else {
            self.amount.to_bits()
        }
    }
}

impl PartialEq for NormalizedKey {
    fn eq(&self, other: &Self) -> bool {
        self.date == other.date
            && self.description == other.description
            && self.amount_bits() == other.amount_bits()
    }
}

impl Eq for NormalizedKey {}

impl Hash for NormalizedKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.date.hash(state);
        self.description.hash(state);
        self.amount_bits().hash(state);
    }
}

/// Stable textual form, e.g. `2024-01-16|legal fees - conveyancing|1850.5`.
/// A null date renders as `-`.
impl fmt::Display for NormalizedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let amount = if self.amount == 0.0 { 0.0 } else { self.amount };
        match self.date {
            Some(d) => write!(f, "{}|{}|{}", d.format("%Y-%m-%d"), self.description, amount),
            None => write!(f, "-|{}|{}", self.description, amount),
        }
    }
}

pub fn normalize_description(description: &str) -> String {
    description.trim().to_lowercase()
}

pub fn normalize(txn: &Transaction) -> NormalizedKey {
    NormalizedKey {
        date: txn.date,
        description: normalize_description(&txn.description),
        amount: txn.amount,
    }
}
