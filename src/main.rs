//! Binary entry point for the SQL bridge.
//!
//! Small CLI wrapper: initializes the executor, runs either a single
//! statement or the sample query sequence, and prints result rows as JSON.

#![allow(clippy::print_stdout, clippy::print_stderr)]

use clap::{Parser, Subcommand};
use sql_bridge::{BackendConfig, SqlBridge};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sql-bridge", version, about = "SQL bridge to an isolated SQLite executor")]
struct Cli {
    /// Directory for durable storage; omit to run purely in memory.
    #[arg(long, env = "SQL_BRIDGE_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Force transient in-memory storage even if a data directory is set.
    #[arg(long)]
    transient: bool,

    /// Database file name inside the data directory.
    #[arg(long, default_value = sql_bridge::DEFAULT_DB_NAME)]
    db_file: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Execute a single SQL statement and print its rows.
    Exec {
        /// Statement to run.
        sql: String,
    },
    /// Run the sample query sequence (create, insert, select).
    Demo,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = if cli.transient {
        BackendConfig::transient()
    } else {
        BackendConfig {
            data_dir: cli.data_dir,
            db_file: cli.db_file,
        }
    };

    let bridge = SqlBridge::connect(config)?;
    let ack = bridge.init().await?;
    info!(%ack, "storage engine initialized");

    match cli.command {
        Command::Exec { sql } => {
            let rows = bridge.execute_sql(&sql).await?;
            println!("{}", serde_json::to_string_pretty(&rows)?);
        }
        Command::Demo => run_demo(&bridge).await?,
    }

    bridge.shutdown();
    Ok(())
}

/// Sample sequence: create a table, insert a row, read it back.
async fn run_demo(bridge: &SqlBridge) -> anyhow::Result<()> {
    bridge
        .execute_sql("CREATE TABLE IF NOT EXISTS test (id INTEGER PRIMARY KEY, value TEXT)")
        .await?;
    bridge
        .execute_sql("INSERT INTO test (value) VALUES ('Hello, world!')")
        .await?;

    let rows = bridge.execute_sql("SELECT * FROM test").await?;
    println!("{}", serde_json::to_string_pretty(&rows)?);
    Ok(())
}
