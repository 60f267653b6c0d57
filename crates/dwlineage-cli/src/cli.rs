//! CLI argument parsing using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// dwlineage - warehouse catalog and lineage from SQL scripts
#[derive(Parser, Debug)]
#[command(name = "dwlineage")]
#[command(about = "Build a table/column catalog and lineage graph from SQL scripts", long_about = None)]
#[command(version)]
pub struct Args {
    /// DuckDB catalog file
    #[arg(long, global = true, value_name = "PATH")]
    pub db: Option<PathBuf>,

    /// TOML file with engine settings
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// More log output on stderr (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Process one SQL script into the catalog
    Process {
        /// Script file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        #[command(flatten)]
        run: RunArgs,
    },

    /// Process every .sql file under a directory
    Batch {
        /// Directory searched recursively for .sql files
        #[arg(value_name = "DIR")]
        dir: PathBuf,

        #[command(flatten)]
        run: RunArgs,

        /// Worker threads (defaults to the configured value)
        #[arg(short, long)]
        workers: Option<usize>,
    },

    /// Export lineage as node-link JSON
    Export {
        /// Script id to export (all scripts if omitted)
        #[arg(short, long)]
        script: Option<String>,

        /// Export a single layer as one document instead of both layer files
        #[arg(short, long, value_enum)]
        layer: Option<LayerArg>,

        /// Output directory for layer files, or output file with --layer
        /// (stdout if omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },

    /// Create an empty catalog file
    Init,
}

/// Options shared by `process` and `batch`.
#[derive(clap::Args, Debug, Clone)]
pub struct RunArgs {
    /// SQL dialect (defaults to the configured value)
    #[arg(short, long, value_enum)]
    pub dialect: Option<DialectArg>,

    /// How already-processed scripts are treated
    #[arg(short, long, default_value = "clear", value_enum)]
    pub mode: ModeArg,

    /// Report format
    #[arg(short, long, default_value = "table", value_enum)]
    pub format: OutputFormat,
}

/// SQL dialect options
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DialectArg {
    Generic,
    Ansi,
    Bigquery,
    Clickhouse,
    Databricks,
    Duckdb,
    Hive,
    Mssql,
    Mysql,
    Postgres,
    Redshift,
    Snowflake,
    Sqlite,
}

impl From<DialectArg> for dwlineage_core::Dialect {
    fn from(d: DialectArg) -> Self {
        match d {
            DialectArg::Generic => dwlineage_core::Dialect::Generic,
            DialectArg::Ansi => dwlineage_core::Dialect::Ansi,
            DialectArg::Bigquery => dwlineage_core::Dialect::Bigquery,
            DialectArg::Clickhouse => dwlineage_core::Dialect::Clickhouse,
            DialectArg::Databricks => dwlineage_core::Dialect::Databricks,
            DialectArg::Duckdb => dwlineage_core::Dialect::Duckdb,
            DialectArg::Hive => dwlineage_core::Dialect::Hive,
            DialectArg::Mssql => dwlineage_core::Dialect::Mssql,
            DialectArg::Mysql => dwlineage_core::Dialect::Mysql,
            DialectArg::Postgres => dwlineage_core::Dialect::Postgres,
            DialectArg::Redshift => dwlineage_core::Dialect::Redshift,
            DialectArg::Snowflake => dwlineage_core::Dialect::Snowflake,
            DialectArg::Sqlite => dwlineage_core::Dialect::Sqlite,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    /// Replace what the script produced before
    Clear,
    /// Fail for scripts already in the catalog
    Insert,
}

impl From<ModeArg> for dwlineage_core::ProcessMode {
    fn from(m: ModeArg) -> Self {
        match m {
            ModeArg::Clear => dwlineage_core::ProcessMode::Clear,
            ModeArg::Insert => dwlineage_core::ProcessMode::Insert,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LayerArg {
    Detail,
    Summary,
}

impl From<LayerArg> for dwlineage_export::Layer {
    fn from(l: LayerArg) -> Self {
        match l {
            LayerArg::Detail => dwlineage_export::Layer::Detail,
            LayerArg::Summary => dwlineage_export::Layer::Summary,
        }
    }
}
