use chrono::NaiveDate;
use rusqlite::Connection;

use super::open_store;
use crate::db::{init_db, insert_file};
use crate::error::Result;
use crate::models::{ParsedRecord, TransactionType};

struct DemoTxn {
    date: Option<(i32, u32, u32)>,
    description: &'static str,
    category: Option<&'static str>,
    amount: f64,
    kind: TransactionType,
    confidence: f64,
    location: &'static str,
}

struct DemoFile {
    name: &'static str,
    txns: &'static [DemoTxn],
}

const BANK: &[DemoTxn] = &[
    DemoTxn { date: Some((2024, 1, 4)), description: "Concrete supply - Batch 14", category: None, amount: -12450.00, kind: TransactionType::Debit, confidence: 0.95, location: "page 1, line 6" },
    DemoTxn { date: Some((2024, 1, 9)), description: "Progress claim #3 - Harbour View", category: None, amount: 48200.00, kind: TransactionType::Credit, confidence: 0.98, location: "page 1, line 11" },
    DemoTxn { date: Some((2024, 1, 16)), description: "Legal Fees - Conveyancing", category: None, amount: -1850.50, kind: TransactionType::Debit, confidence: 0.89, location: "page 2, line 3" },
    DemoTxn { date: Some((2024, 1, 18)), description: "Scaffold hire", category: None, amount: -2300.00, kind: TransactionType::Debit, confidence: 0.81, location: "page 2, line 8" },
    DemoTxn { date: Some((2024, 1, 31)), description: "Account keeping fee", category: None, amount: -15.00, kind: TransactionType::Debit, confidence: 0.99, location: "page 3, line 1" },
];

const LEDGER: &[DemoTxn] = &[
    DemoTxn { date: Some((2024, 1, 4)), description: "CONCRETE SUPPLY - BATCH 14", category: Some("Materials"), amount: -12450.00, kind: TransactionType::Debit, confidence: 0.88, location: "Ledger!B7" },
    DemoTxn { date: Some((2024, 1, 16)), description: "Legal Fees - Conveyancing ", category: Some("Professional Fees"), amount: -1850.50, kind: TransactionType::Debit, confidence: 0.92, location: "Ledger!B12" },
    DemoTxn { date: None, description: "Council permit fee", category: Some("Permits"), amount: -375.00, kind: TransactionType::Debit, confidence: 0.64, location: "Ledger!B15" },
    DemoTxn { date: Some((2024, 1, 22)), description: "Site amenities", category: Some("Site Costs"), amount: -640.00, kind: TransactionType::Debit, confidence: 0.9, location: "Ledger!B19" },
];

const INVOICES: &[DemoTxn] = &[
    DemoTxn { date: Some((2024, 1, 4)), description: "Concrete supply - Batch 14", category: Some("Materials"), amount: -12450.00, kind: TransactionType::Expense, confidence: 0.97, location: "INV-20417, p1" },
    DemoTxn { date: Some((2024, 1, 18)), description: "Scaffold Hire", category: Some("Equipment Hire"), amount: -2300.00, kind: TransactionType::Expense, confidence: 0.81, location: "INV-88123, p1" },
    DemoTxn { date: None, description: "council permit fee", category: Some("Permits"), amount: -375.00, kind: TransactionType::Expense, confidence: 0.71, location: "INV-0032, p2" },
    DemoTxn { date: Some((2024, 1, 25)), description: "Crane hire - half day", category: Some("Equipment Hire"), amount: -1980.00, kind: TransactionType::Expense, confidence: 0.93, location: "INV-5510, p1" },
];

const FILES: &[DemoFile] = &[
    DemoFile { name: "Bank statement - Jan 2024.pdf", txns: BANK },
    DemoFile { name: "Project ledger - Harbour View.xlsx", txns: LEDGER },
    DemoFile { name: "Supplier invoices - Jan 2024.pdf", txns: INVOICES },
];

fn to_record(t: &DemoTxn) -> ParsedRecord {
    ParsedRecord {
        date: t.date.and_then(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d)),
        description: t.description.to_string(),
        category: t.category.map(str::to_string),
        amount: t.amount,
        transaction_type: t.kind,
        confidence: t.confidence,
        source_location: t.location.to_string(),
    }
}

fn insert_demo_data(conn: &Connection) -> Result<usize> {
    let mut total = 0usize;
    for file in FILES {
        let records: Vec<ParsedRecord> = file.txns.iter().map(to_record).collect();
        insert_file(conn, file.name, None, &records)?;
        total += records.len();
    }
    Ok(total)
}

pub fn run() -> Result<()> {
    let conn = open_store()?;
    init_db(&conn)?;

    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM files WHERE name = ?1)",
        [FILES[0].name],
        |r| r.get(0),
    )?;
    if exists {
        println!("Demo data already loaded (file '{}' exists).", FILES[0].name);
        return Ok(());
    }

    let txn_count = insert_demo_data(&conn)?;

    println!("Demo data loaded!");
    for file in FILES {
        println!("  {:<40} {} transactions", file.name, file.txns.len());
    }
    println!("  Total:       {txn_count}");
    println!();
    println!("Try these next:");
    println!("  crosscheck files list");
    println!("  crosscheck conflicts --files 1,2,3");
    println!("  crosscheck select 2 2 --files 1,2,3");
    println!("  crosscheck apply --files 1,2,3");
    println!("  crosscheck report");

    Ok(())
}
