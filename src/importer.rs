use std::path::Path;

use chrono::NaiveDate;
use rusqlite::Connection;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::info;

use crate::db;
use crate::error::{CrosscheckError, RecordPosition, Result};
use crate::models::{ParsedRecord, TransactionType};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

pub fn parse_amount(raw: &str) -> Option<f64> {
    let s = raw.replace([',', '"', '$'], "");
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Some(inner) = s.strip_prefix('(').and_then(|v| v.strip_suffix(')')) {
        return inner.trim().parse::<f64>().ok().map(|v| -v);
    }
    s.parse().ok()
}

pub fn parse_date_mdy(raw: &str) -> Option<NaiveDate> {
    let parts: Vec<&str> = raw.trim().split('/').collect();
    if parts.len() != 3 {
        return None;
    }
    let m: u32 = parts[0].parse().ok()?;
    let d: u32 = parts[1].parse().ok()?;
    let y: i32 = parts[2].parse().ok()?;
    NaiveDate::from_ymd_opt(y, m, d)
}

/// Blank (or literal `null`) is an unknown date, not an error.
pub fn parse_date(raw: &str) -> std::result::Result<Option<NaiveDate>, String> {
    let raw = raw.trim();
    if raw.is_empty() || raw.eq_ignore_ascii_case("null") {
        return Ok(None);
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| parse_date_mdy(raw))
        .map(Some)
        .ok_or_else(|| format!("unrecognized date '{raw}'"))
}

fn compute_checksum(file_path: &Path) -> Result<String> {
    let data = std::fs::read(file_path)?;
    let mut hasher = Sha256::new();
    hasher.update(&data);
    Ok(hex::encode(hasher.finalize()))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Fields as they arrive from the extraction collaborator, before validation.
struct RawFields {
    date: Option<String>,
    description: String,
    category: Option<String>,
    amount: Option<f64>,
    amount_text: String,
    transaction_type: String,
    confidence: String,
    source_location: String,
}

fn validate(raw: RawFields, at: RecordPosition) -> Result<ParsedRecord> {
    let invalid = |reason: String| CrosscheckError::InvalidRecord { at, reason };

    if raw.description.trim().is_empty() {
        return Err(invalid("description is empty".to_string()));
    }
    let date = match raw.date {
        Some(d) => parse_date(&d).map_err(invalid)?,
        None => None,
    };
    let amount = raw
        .amount
        .or_else(|| parse_amount(&raw.amount_text))
        .ok_or_else(|| invalid(format!("unparseable amount '{}'", raw.amount_text)))?;
    if !amount.is_finite() {
        return Err(invalid(format!("amount '{}' is not a finite number", raw.amount_text)));
    }
    let transaction_type = TransactionType::parse(&raw.transaction_type)
        .ok_or_else(|| invalid(format!("unknown transaction type '{}'", raw.transaction_type)))?;
    let confidence: f64 = raw
        .confidence
        .trim()
        .parse()
        .map_err(|_| invalid(format!("unparseable confidence '{}'", raw.confidence)))?;
    if !(0.0..=1.0).contains(&confidence) {
        return Err(invalid(format!("confidence {confidence} outside [0, 1]")));
    }

    Ok(ParsedRecord {
        date,
        // kept as extracted; only the grouping key is trimmed and case-folded
        description: raw.description,
        category: non_empty(raw.category),
        amount,
        transaction_type,
        confidence,
        // verbatim: this is the audit pointer back into the source document
        source_location: raw.source_location,
    })
}

// ---------------------------------------------------------------------------
// Payload kinds
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PayloadKind {
    Json,
    Csv,
}

impl PayloadKind {
    pub fn key(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Csv => "csv",
        }
    }

    pub fn detect(file_path: &Path) -> Option<Self> {
        let ext = file_path.extension()?.to_str()?.to_lowercase();
        ALL_PAYLOADS.iter().find(|k| k.key() == ext).copied()
    }

    pub fn parse(&self, file_path: &Path) -> Result<Vec<ParsedRecord>> {
        match self {
            Self::Json => parse_json(file_path),
            Self::Csv => parse_csv(file_path),
        }
    }
}

const ALL_PAYLOADS: &[PayloadKind] = &[PayloadKind::Json, PayloadKind::Csv];

// ---------------------------------------------------------------------------
// import_file
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct ImportResult {
    pub file_id: Option<i64>,
    pub imported: usize,
    pub duplicate_file: bool,
}

pub fn import_file(conn: &Connection, file_path: &Path, name: Option<&str>) -> Result<ImportResult> {
    let kind = PayloadKind::detect(file_path).ok_or_else(|| {
        CrosscheckError::Other(format!(
            "{} is not a .json or .csv extraction payload",
            file_path.display()
        ))
    })?;

    let checksum = compute_checksum(file_path)?;
    if db::checksum_exists(conn, &checksum)? {
        return Ok(ImportResult {
            file_id: None,
            imported: 0,
            duplicate_file: true,
        });
    }

    let name = match name {
        Some(n) => n.trim().to_string(),
        None => file_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("")
            .to_string(),
    };
    if name.is_empty() {
        return Err(CrosscheckError::Other("source file name is empty".to_string()));
    }
    if conn.prepare("SELECT 1 FROM files WHERE name = ?1")?.exists([&name])? {
        return Err(CrosscheckError::Other(format!(
            "a source file named '{name}' is already loaded"
        )));
    }

    let records = kind.parse(file_path)?;
    let file_id = db::insert_file(conn, &name, Some(&checksum), &records)?;
    info!(file_id, name = %name, records = records.len(), kind = kind.key(), "imported source file");

    Ok(ImportResult {
        file_id: Some(file_id),
        imported: records.len(),
        duplicate_file: false,
    })
}

// ---------------------------------------------------------------------------
// JSON payload
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
#[serde(untagged)]
enum JsonAmount {
    Number(f64),
    Text(String),
}

#[derive(Deserialize)]
struct JsonRecord {
    #[serde(default)]
    date: Option<String>,
    description: String,
    #[serde(default)]
    category: Option<String>,
    amount: JsonAmount,
    transaction_type: String,
    confidence: f64,
    source_location: String,
}

fn parse_json(file_path: &Path) -> Result<Vec<ParsedRecord>> {
    let content = std::fs::read_to_string(file_path)?;
    let raw: Vec<JsonRecord> = serde_json::from_str(&content)?;
    raw.into_iter()
        .enumerate()
        .map(|(i, r)| {
            let (amount, amount_text) = match r.amount {
                JsonAmount::Number(n) => (Some(n), n.to_string()),
                JsonAmount::Text(s) => (None, s),
            };
            validate(
                RawFields {
                    date: r.date,
                    description: r.description,
                    category: r.category,
                    amount,
                    amount_text,
                    transaction_type: r.transaction_type,
                    confidence: r.confidence.to_string(),
                    source_location: r.source_location,
                },
                RecordPosition::Index(i + 1),
            )
        })
        .collect()
}

// ---------------------------------------------------------------------------
// CSV payload
// ---------------------------------------------------------------------------

fn parse_csv(file_path: &Path) -> Result<Vec<ParsedRecord>> {
    let file = std::fs::File::open(file_path)?;
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(std::io::BufReader::new(file));

    let headers = rdr.headers()?.clone();
    let column = |name: &str| headers.iter().position(|h| h.trim().eq_ignore_ascii_case(name));
    let missing = |name: &str| CrosscheckError::InvalidRecord {
        at: RecordPosition::Line(1),
        reason: format!("missing column '{name}'"),
    };
    let idx_desc = column("description").ok_or_else(|| missing("description"))?;
    let idx_amount = column("amount").ok_or_else(|| missing("amount"))?;
    let idx_type = column("transaction_type").ok_or_else(|| missing("transaction_type"))?;
    let idx_conf = column("confidence").ok_or_else(|| missing("confidence"))?;
    let idx_loc = column("source_location").ok_or_else(|| missing("source_location"))?;
    let idx_date = column("date");
    let idx_cat = column("category");

    let mut rows = Vec::new();
    for result in rdr.records() {
        let record = result?;
        let line = record.position().map(|p| p.line() as usize).unwrap_or(0);
        let field = |idx: usize| record.get(idx).unwrap_or("").to_string();
        if record.iter().all(|f| f.trim().is_empty()) {
            continue;
        }
        rows.push(validate(
            RawFields {
                date: idx_date.map(field),
                description: field(idx_desc),
                category: idx_cat.map(field),
                amount: None,
                amount_text: field(idx_amount),
                transaction_type: field(idx_type),
                confidence: field(idx_conf),
                source_location: field(idx_loc),
            },
            RecordPosition::Line(line),
        )?);
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::tests::test_db;
    use crate::db::{list_files, load_pool};

    fn write(dir: &Path, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    const JSON_PAYLOAD: &str = r#"[
  {"date": "2024-01-16", "description": "Legal Fees - Conveyancing", "category": "Professional Fees",
   "amount": 1850.50, "transaction_type": "debit", "confidence": 0.89, "source_location": "page 2, row 7"},
  {"date": null, "description": "Site Survey", "amount": "(420.00)",
   "transaction_type": "expense", "confidence": 0.7, "source_location": "page 3"}
]"#;

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("1,234.56"), Some(1234.56));
        assert_eq!(parse_amount("\"500.00\""), Some(500.0));
        assert_eq!(parse_amount("  -42.50  "), Some(-42.5));
        assert_eq!(parse_amount("$1,850.50"), Some(1850.5));
        assert_eq!(parse_amount("(1,234.56)"), Some(-1234.56));
        assert_eq!(parse_amount("100.001"), Some(100.001));
        assert_eq!(parse_amount("not_a_number"), None);
        assert_eq!(parse_amount(""), None);
    }

    #[test]
    fn test_parse_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 1, 16);
        assert_eq!(parse_date("2024-01-16").unwrap(), expected);
        assert_eq!(parse_date("01/16/2024").unwrap(), expected);
        assert_eq!(parse_date("").unwrap(), None);
        assert_eq!(parse_date("null").unwrap(), None);
        assert!(parse_date("16th Jan").is_err());
        assert!(parse_date("02/30/2024").is_err());
    }

    #[test]
    fn test_parse_json_payload() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "bank.json", JSON_PAYLOAD);
        let rows = PayloadKind::Json.parse(&path).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].amount, 1850.50);
        assert_eq!(rows[0].category.as_deref(), Some("Professional Fees"));
        assert_eq!(rows[0].transaction_type, TransactionType::Debit);
        assert_eq!(rows[1].date, None);
        assert_eq!(rows[1].amount, -420.0);
        assert_eq!(rows[1].source_location, "page 3");
    }

    #[test]
    fn test_parse_csv_payload() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "ledger.csv",
            "date,description,category,amount,transaction_type,confidence,source_location\n\
             2024-01-16,Legal Fees - Conveyancing,,\"1,850.50\",credit,0.92,Sheet1!C14\n\
             ,Retention release,Retention,500,income,0.8,Sheet1!C15\n",
        );
        let rows = PayloadKind::Csv.parse(&path).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].amount, 1850.50);
        assert_eq!(rows[0].category, None);
        assert_eq!(rows[0].transaction_type, TransactionType::Credit);
        assert_eq!(rows[1].date, None);
        assert_eq!(rows[1].source_location, "Sheet1!C15");
    }

    #[test]
    fn test_confidence_out_of_range_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "bad.csv",
            "date,description,amount,transaction_type,confidence,source_location\n\
             2024-01-16,Fee,10,debit,0.5,A1\n\
             2024-01-17,Fee,10,debit,1.5,A2\n",
        );
        let err = PayloadKind::Csv.parse(&path).unwrap_err();
        assert!(matches!(err, CrosscheckError::InvalidRecord { at: RecordPosition::Line(3), .. }));
    }

    #[test]
    fn test_empty_description_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "bad.json",
            r#"[{"description": "  ", "amount": 1, "transaction_type": "debit",
                 "confidence": 0.5, "source_location": "p1"}]"#,
        );
        let err = PayloadKind::Json.parse(&path).unwrap_err();
        assert!(matches!(
            err,
            CrosscheckError::InvalidRecord { at: RecordPosition::Index(1), .. }
        ));
    }

    #[test]
    fn test_non_finite_amounts_rejected() {
        let dir = tempfile::tempdir().unwrap();
        for amount in ["inf", "NaN", "-infinity"] {
            let csv_path = write(
                dir.path(),
                "bad.csv",
                &format!(
                    "date,description,amount,transaction_type,confidence,source_location\n\
                     2024-01-16,Fee,{amount},debit,0.5,A1\n"
                ),
            );
            let err = PayloadKind::Csv.parse(&csv_path).unwrap_err();
            assert!(
                matches!(err, CrosscheckError::InvalidRecord { at: RecordPosition::Line(2), .. }),
                "csv amount {amount} accepted"
            );

            let json_path = write(
                dir.path(),
                "bad.json",
                &format!(
                    r#"[{{"description": "Fee", "amount": "{amount}", "transaction_type": "debit",
                         "confidence": 0.5, "source_location": "p1"}}]"#
                ),
            );
            let err = PayloadKind::Json.parse(&json_path).unwrap_err();
            assert!(
                matches!(err, CrosscheckError::InvalidRecord { at: RecordPosition::Index(1), .. }),
                "json amount {amount} accepted"
            );
        }
    }

    #[test]
    fn test_non_finite_amount_stores_nothing() {
        let (dir, conn) = test_db();
        let path = write(
            dir.path(),
            "bad.csv",
            "date,description,amount,transaction_type,confidence,source_location\n\
             2024-01-16,Fee,NaN,debit,0.5,A1\n",
        );
        let err = import_file(&conn, &path, None).unwrap_err();
        assert!(matches!(err, CrosscheckError::InvalidRecord { .. }));
        assert!(list_files(&conn).unwrap().is_empty());
    }

    #[test]
    fn test_json_errors_name_the_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "bad.json",
            r#"[{"description": "Fee", "amount": 1, "transaction_type": "debit",
                 "confidence": 0.5, "source_location": "p1"},
                {"description": "Fee", "amount": 1, "transaction_type": "debit",
                 "confidence": 2.0, "source_location": "p2"}]"#,
        );
        let err = PayloadKind::Json.parse(&path).unwrap_err();
        assert!(err.to_string().starts_with("Invalid record #2:"), "{err}");
    }

    #[test]
    fn test_description_stored_as_extracted() {
        let (dir, conn) = test_db();
        let path = write(
            dir.path(),
            "bank.json",
            r#"[{"date": "2024-01-16", "description": "  Legal Fees  ", "amount": 1850.50,
                 "transaction_type": "debit", "confidence": 0.89, "source_location": "page 2"}]"#,
        );
        let result = import_file(&conn, &path, None).unwrap();
        let pool = load_pool(&conn, &[result.file_id.unwrap()]).unwrap();
        assert_eq!(pool[0].description, "  Legal Fees  ");
    }

    #[test]
    fn test_missing_column_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "bad.csv", "date,description,amount\n2024-01-01,Fee,1\n");
        let err = PayloadKind::Csv.parse(&path).unwrap_err();
        assert!(matches!(err, CrosscheckError::InvalidRecord { at: RecordPosition::Line(1), .. }));
    }

    #[test]
    fn test_detect_by_extension() {
        assert_eq!(PayloadKind::detect(Path::new("a.JSON")), Some(PayloadKind::Json));
        assert_eq!(PayloadKind::detect(Path::new("b.csv")), Some(PayloadKind::Csv));
        assert_eq!(PayloadKind::detect(Path::new("c.pdf")), None);
    }

    #[test]
    fn test_import_file_stores_records() {
        let (dir, conn) = test_db();
        let path = write(dir.path(), "bank.json", JSON_PAYLOAD);
        let result = import_file(&conn, &path, Some("Bank statement Jan")).unwrap();
        assert_eq!(result.imported, 2);
        assert!(!result.duplicate_file);
        let files = list_files(&conn).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].name, "Bank statement Jan");
        assert_eq!(files[0].record_count, 2);
        let pool = load_pool(&conn, &[result.file_id.unwrap()]).unwrap();
        assert_eq!(pool[0].file_name, "Bank statement Jan");
    }

    #[test]
    fn test_import_file_detects_duplicate_file() {
        let (dir, conn) = test_db();
        let path = write(dir.path(), "bank.json", JSON_PAYLOAD);
        import_file(&conn, &path, None).unwrap();
        let again = import_file(&conn, &path, Some("copy")).unwrap();
        assert!(again.duplicate_file);
        assert_eq!(again.imported, 0);
        assert_eq!(list_files(&conn).unwrap().len(), 1);
    }

    #[test]
    fn test_invalid_payload_stores_nothing() {
        let (dir, conn) = test_db();
        let path = write(
            dir.path(),
            "bad.json",
            r#"[{"description": "Fee", "amount": 1, "transaction_type": "transfer",
                 "confidence": 0.5, "source_location": "p1"}]"#,
        );
        assert!(import_file(&conn, &path, None).is_err());
        assert!(list_files(&conn).unwrap().is_empty());
    }
}
