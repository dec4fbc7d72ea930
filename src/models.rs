use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Debit,
    Credit,
    Income,
    Expense,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Debit => "debit",
            Self::Credit => "credit",
            Self::Income => "income",
            Self::Expense => "expense",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "debit" => Some(Self::Debit),
            "credit" => Some(Self::Credit),
            "income" => Some(Self::Income),
            "expense" => Some(Self::Expense),
            _ => None,
        }
    }
}

/// A transaction as produced by the extraction collaborator for one source file.
///
/// Never mutated once extracted: conflict groups hold clones and annotate
/// membership around them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Option<i64>,
    pub date: Option<NaiveDate>,
    pub description: String,
    pub category: Option<String>,
    pub amount: f64,
    pub transaction_type: TransactionType,
    pub confidence: f64,
    pub source_location: String,
    pub file_id: i64,
    pub file_name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SourceFile {
    pub id: i64,
    pub name: String,
    pub checksum: Option<String>,
    pub record_count: i64,
    pub imported_at: String,
}

/// Intermediate representation from a JSON/CSV extraction payload before DB insert.
#[derive(Debug, Clone)]
pub struct ParsedRecord {
    pub date: Option<NaiveDate>,
    pub description: String,
    pub category: Option<String>,
    pub amount: f64,
    pub transaction_type: TransactionType,
    pub confidence: f64,
    pub source_location: String,
}
