pub mod conflicts;
pub mod demo;
pub mod files;
pub mod init;
pub mod report;
pub mod review;
pub mod status;

use clap::{Parser, Subcommand};
use rusqlite::Connection;

use crate::conflicts::{detect_conflicts, has_sufficient_sources, ConflictGroup};
use crate::db::{self, get_connection, DB_FILE};
use crate::error::{CrosscheckError, Result};
use crate::resolution::reapply_overrides;
use crate::settings::get_data_dir;

pub(crate) fn open_store() -> Result<Connection> {
    let db_path = get_data_dir().join(DB_FILE);
    if !db_path.exists() {
        return Err(CrosscheckError::Other(
            "Database not found. Run `crosscheck init` to set up.".to_string(),
        ));
    }
    get_connection(&db_path)
}

/// Resolve `--files` arguments (names or ids) to file ids, keeping the given order.
pub(crate) fn resolve_files(conn: &Connection, files: &[String]) -> Result<Vec<i64>> {
    let mut ids = Vec::with_capacity(files.len());
    for f in files {
        let id = db::find_file(conn, f)?.id;
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
    Ok(ids)
}

/// The comparison session for a file selection: the detected groups, with
/// persisted overrides reapplied unless `fresh` is set.
pub(crate) struct Session {
    pub file_ids: Vec<i64>,
    pub groups: Vec<ConflictGroup>,
    pub sufficient: bool,
    pub reapplied: usize,
}

pub(crate) fn detect_session(conn: &Connection, files: &[String], fresh: bool) -> Result<Session> {
    let file_ids = resolve_files(conn, files)?;
    let pool = db::load_pool(conn, &file_ids)?;
    let sufficient = has_sufficient_sources(&pool);
    let mut groups = detect_conflicts(&pool);
    let reapplied = if fresh {
        0
    } else {
        reapply_overrides(&mut groups, &db::load_overrides(conn)?)
    };
    Ok(Session {
        file_ids,
        groups,
        sufficient,
        reapplied,
    })
}

#[derive(Parser)]
#[command(
    name = "crosscheck",
    about = "Detect and resolve duplicate transactions across extracted source documents."
)]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug). RUST_LOG overrides.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Choose a data directory and initialize the database.
    Init {
        /// Path for crosscheck data (default: ~/Documents/crosscheck)
        #[arg(long = "data-dir")]
        data_dir: Option<String>,
        /// Reviewer name recorded on manual overrides
        #[arg(long)]
        reviewer: Option<String>,
    },
    /// Manage extracted source files.
    Files {
        #[command(subcommand)]
        command: FilesCommands,
    },
    /// Show conflicts between the selected source files.
    Conflicts {
        /// Source files to compare (names or ids, comma separated)
        #[arg(long, value_delimiter = ',', required = true)]
        files: Vec<String>,
        /// Print the conflict report as JSON
        #[arg(long)]
        json: bool,
        /// Ignore saved manual overrides
        #[arg(long)]
        fresh: bool,
    },
    /// Pin a member of a conflict group as the winner.
    Select {
        /// Conflict group number (as shown by `crosscheck conflicts`)
        #[arg(allow_negative_numbers = true)]
        group: i64,
        /// Member number within the group
        #[arg(allow_negative_numbers = true, required_unless_present = "auto")]
        member: Option<i64>,
        /// Source files to compare (names or ids, comma separated)
        #[arg(long, value_delimiter = ',', required = true)]
        files: Vec<String>,
        /// Drop the saved override and go back to the highest-confidence winner
        #[arg(long, conflicts_with = "member")]
        auto: bool,
    },
    /// Interactively pick winners for each conflict group.
    Review {
        /// Source files to compare (names or ids, comma separated)
        #[arg(long, value_delimiter = ',', required = true)]
        files: Vec<String>,
    },
    /// Commit the current resolutions: keep winners, discard the rest.
    Apply {
        /// Source files to compare (names or ids, comma separated)
        #[arg(long, value_delimiter = ',', required = true)]
        files: Vec<String>,
        /// Print the apply result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Audit report of the last applied resolutions.
    Report,
    /// Load sample construction-finance source files.
    Demo,
    /// Show current database and summary statistics.
    Status,
}

#[derive(Subcommand)]
pub enum FilesCommands {
    /// Load an extraction payload (.json or .csv) as a source file.
    Add {
        /// Path to the extraction payload
        path: String,
        /// Display name for the source file (default: file name)
        #[arg(long)]
        name: Option<String>,
    },
    /// List loaded source files.
    List,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::tests::{record, test_db};
    use crate::db::{insert_file, save_override};
    use crate::resolution::Override;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_files_list() {
        let cli = Cli::parse_from(["crosscheck", "conflicts", "--files", "a.json,b.csv", "--json"]);
        match cli.command {
            Commands::Conflicts { files, json, fresh } => {
                assert_eq!(files, vec!["a.json", "b.csv"]);
                assert!(json);
                assert!(!fresh);
            }
            _ => panic!("expected conflicts"),
        }
    }

    #[test]
    fn test_parse_negative_member() {
        let cli = Cli::parse_from(["crosscheck", "select", "1", "-1", "--files", "a,b"]);
        match cli.command {
            Commands::Select { group, member, .. } => {
                assert_eq!(group, 1);
                assert_eq!(member, Some(-1));
            }
            _ => panic!("expected select"),
        }
    }

    #[test]
    fn test_detect_session_reapplies_overrides() {
        let (_dir, conn) = test_db();
        let a = insert_file(
            &conn,
            "a.json",
            None,
            &[record(Some("2024-01-16"), "Legal Fees - Conveyancing", 1850.50, 0.89, "p2")],
        )
        .unwrap();
        insert_file(
            &conn,
            "b.csv",
            None,
            &[record(Some("2024-01-16"), "Legal Fees - Conveyancing", 1850.50, 0.92, "C14")],
        )
        .unwrap();
        save_override(
            &conn,
            &Override {
                group_key: "2024-01-16|legal fees - conveyancing|1850.5".to_string(),
                file_id: a,
                source_location: "p2".to_string(),
                reviewer: None,
            },
        )
        .unwrap();

        let files = vec!["a.json".to_string(), "b.csv".to_string()];
        let session = detect_session(&conn, &files, false).unwrap();
        assert!(session.sufficient);
        assert_eq!(session.reapplied, 1);
        assert_eq!(session.groups[0].winner().source_location, "p2");

        let fresh = detect_session(&conn, &files, true).unwrap();
        assert_eq!(fresh.reapplied, 0);
        assert_eq!(fresh.groups[0].winner().source_location, "C14");
    }

    #[test]
    fn test_resolve_files_dedups_and_keeps_order() {
        let (_dir, conn) = test_db();
        let a = insert_file(&conn, "a.json", None, &[]).unwrap();
        let b = insert_file(&conn, "b.csv", None, &[]).unwrap();
        let ids = resolve_files(
            &conn,
            &["b.csv".to_string(), a.to_string(), "b.csv".to_string()],
        )
        .unwrap();
        assert_eq!(ids, vec![b, a]);
    }
}
