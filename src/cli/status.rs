use crate::db::{get_connection, DB_FILE};
use crate::error::Result;
use crate::fmt::format_bytes;
use crate::settings::load_settings;

pub fn run() -> Result<()> {
    let settings = load_settings();
    let data_dir = std::path::PathBuf::from(&settings.data_dir);
    let db_path = data_dir.join(DB_FILE);

    println!("Reviewer:   {}", settings.reviewer().unwrap_or("(not set)"));
    println!("Data dir:   {}", data_dir.display());
    println!("Database:   {}", db_path.display());

    if db_path.exists() {
        let size = std::fs::metadata(&db_path)?.len();
        println!("DB size:    {}", format_bytes(size));

        let conn = get_connection(&db_path)?;
        let count = |table: &str| -> Result<i64> {
            Ok(conn.query_row(&format!("SELECT count(*) FROM {table}"), [], |r| r.get(0))?)
        };

        println!();
        println!("Source files:   {}", count("files")?);
        println!("Transactions:   {}", count("transactions")?);
        println!("Overrides:      {}", count("overrides")?);
        println!("Applied:        {}", count("apply_batches")?);
    } else {
        println!();
        println!("Database not found. Run `crosscheck init` to set up.");
    }

    Ok(())
}
