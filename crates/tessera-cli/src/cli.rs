//! `tessera` - a command-line database client
//!
//! Connects through a saved connection (`-c name`) or an ad-hoc URL, then
//! browses tables, runs statements, and previews or commits change scripts.

mod logging;
mod output;
mod script;

#[cfg(test)]
mod script_tests;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use tessera_connection::{
    ConnectionManager, ConnectionsFile, DocumentSession, RelationalSession, SavedConnection,
    Session,
};
use tessera_core::{
    DocumentsRequest, ProviderKind, RecordsRequest, SchemaIntrospection, TesseraError,
    is_query_mutation,
};

use crate::logging::LoggingConfig;
use crate::script::{ChangeScript, KeyColumns};

#[derive(Parser)]
#[command(name = "tessera", version)]
#[command(about = "Browse and edit SQL databases and MongoDB from the terminal", long_about = None)]
struct Args {
    /// Saved connections file (defaults to the user config directory)
    #[arg(long, env = "TESSERA_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Name of a saved connection
    #[arg(short = 'c', long, global = true, conflicts_with = "url")]
    connection: Option<String>,

    /// Connection URL for an ad-hoc connection
    #[arg(long, env = "TESSERA_URL", global = true)]
    url: Option<String>,

    /// Driver for --url when the scheme is ambiguous
    #[arg(long, global = true, requires = "url")]
    provider: Option<ProviderKind>,

    /// Reject statements that modify data
    #[arg(long, global = true)]
    read_only: bool,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Also write JSON logs to the log directory
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List saved connections
    Connections,
    /// Connect, ping, and disconnect
    Test,
    /// List databases (schemas for Postgres and SQL Server)
    Databases,
    /// List tables, or collections for MongoDB
    Tables {
        #[arg(short, long, default_value = "")]
        database: String,
    },
    /// Show one page of a table or collection
    Records {
        table: String,
        #[arg(short, long, default_value = "")]
        database: String,
        /// WHERE fragment, or a JSON filter document for MongoDB
        #[arg(short, long)]
        filter: Option<String>,
        /// ORDER BY fragment, or a JSON sort document for MongoDB
        #[arg(short, long)]
        sort: Option<String>,
        #[arg(long, default_value_t = 0)]
        offset: u64,
        /// Rows per page; 0 uses the default page size
        #[arg(long, default_value_t = 0)]
        limit: u64,
    },
    /// Run a statement and print its result set
    Query { sql: String },
    /// Run a data-modifying statement
    Exec { sql: String },
    /// Preview a change script, or commit it in one transaction
    Changes {
        script: PathBuf,
        #[arg(short, long, default_value = "")]
        database: String,
        /// Commit instead of printing the statements
        #[arg(long)]
        apply: bool,
    },
    /// Report whether a statement would be rejected on a read-only connection
    Classify { sql: String },
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let _log_guard = match logging::init(
        LoggingConfig::for_verbosity(args.verbose).with_json_logs(args.log_json),
    ) {
        Ok(guard) => guard,
        Err(err) => {
            eprintln!("warning: logging disabled: {err:#}");
            None
        }
    };

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    match &args.command {
        Command::Connections => return list_connections(&args).await,
        Command::Classify { sql } => {
            let verdict = if is_query_mutation(sql) {
                "mutation"
            } else {
                "read-only"
            };
            println!("{verdict}");
            return Ok(());
        }
        _ => {}
    }

    let (_, file) = load_connections(&args).await?;
    let saved = target(&args, &file)?;
    let manager = ConnectionManager::new(file.settings.clone());

    if let Command::Test = args.command {
        manager
            .test_saved(&saved)
            .await
            .with_context(|| format!("connection '{}' failed", saved.name))?;
        println!("ok");
        return Ok(());
    }

    let session = manager
        .connect_saved(&saved)
        .await
        .with_context(|| format!("could not connect to '{}'", saved.name))?;

    let outcome = match &session {
        Session::Relational(session) => run_relational(session, &args.command).await,
        Session::Document(session) => run_document(session, &args.command).await,
    };

    if let Err(err) = manager.shutdown().await {
        tracing::warn!(error = %err, "error while disconnecting");
    }
    outcome
}

async fn load_connections(args: &Args) -> anyhow::Result<(PathBuf, ConnectionsFile)> {
    let path = match &args.config {
        Some(path) => path.clone(),
        None => ConnectionsFile::default_path()?,
    };
    let file = ConnectionsFile::load(&path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    Ok((path, file))
}

async fn list_connections(args: &Args) -> anyhow::Result<()> {
    let (path, file) = load_connections(args).await?;
    if file.connections.is_empty() {
        println!("no saved connections in {}", path.display());
        return Ok(());
    }
    let names: Vec<String> = file
        .connections
        .iter()
        .map(|c| {
            let provider = c
                .resolve_provider()
                .map(|p| p.to_string())
                .unwrap_or_else(|_| "?".into());
            let mode = if c.read_only { ", read-only" } else { "" };
            format!("{} ({}{})", c.name, provider, mode)
        })
        .collect();
    println!("{}", output::render_list("connection", &names));
    Ok(())
}

/// The saved connection to open, built from `--url` when no name is given.
fn target(args: &Args, file: &ConnectionsFile) -> anyhow::Result<SavedConnection> {
    let mut saved = match (&args.connection, &args.url) {
        (Some(name), _) => file
            .find(name)
            .cloned()
            .with_context(|| format!("no saved connection named '{}'", name))?,
        (None, Some(url)) => {
            let saved = SavedConnection::new("adhoc", url.clone());
            match args.provider {
                Some(provider) => saved.with_provider(provider),
                None => saved,
            }
        }
        (None, None) => bail!("pass -c <name> or --url <url>"),
    };
    if args.read_only {
        saved.read_only = true;
    }
    Ok(saved)
}

async fn run_relational(session: &Arc<RelationalSession>, command: &Command) -> anyhow::Result<()> {
    let conn = session.connection();
    match command {
        Command::Databases => {
            let names: Vec<String> = conn
                .list_databases()
                .await?
                .into_iter()
                .map(|d| d.name)
                .collect();
            println!("{}", output::render_list("database", &names));
        }
        Command::Tables { database } => {
            let names: Vec<String> = conn
                .list_tables(database)
                .await?
                .into_iter()
                .map(|t| t.name)
                .collect();
            println!("{}", output::render_list("table", &names));
        }
        Command::Records {
            table,
            database,
            filter,
            sort,
            offset,
            limit,
        } => {
            let mut request = RecordsRequest::new(database.as_str(), table.as_str()).page(*offset, *limit);
            request.filter = filter.clone();
            request.sort = sort.clone();
            let page = session.get_records(&request).await?;
            tracing::debug!(query = %page.executed_query, "records fetched");
            println!("{}", output::render_page(&page));
        }
        Command::Query { sql } => {
            let result = session.execute_query(sql).await?;
            println!("{}", output::render_result(&result));
        }
        Command::Exec { sql } => {
            let summary = session.execute_dml_statement(sql).await?;
            println!("{} ({} ms)", summary, summary.execution_time_ms);
        }
        Command::Changes {
            script,
            database,
            apply,
        } => {
            let content = tokio::fs::read_to_string(script)
                .await
                .with_context(|| format!("reading {}", script.display()))?;
            let script = ChangeScript::parse(&content)?;

            let mut keys = KeyColumns::new();
            for (db, table) in script.keyed_tables(database) {
                let columns = conn.get_primary_key_columns(&db, &table).await?;
                keys.insert((db, table), columns);
            }
            let changes = script.replay(database, &keys)?.to_changes();

            if changes.is_empty() {
                println!("nothing to do");
            } else if *apply {
                let summary = session.execute_pending_changes(&changes).await?;
                println!("committed: {}", summary);
            } else {
                for statement in session.preview(&changes)? {
                    println!("{statement};");
                }
            }
        }
        Command::Connections | Command::Test | Command::Classify { .. } => {}
    }
    Ok(())
}

async fn run_document(session: &Arc<DocumentSession>, command: &Command) -> anyhow::Result<()> {
    match command {
        Command::Databases => {
            let names = session.list_databases().await?;
            println!("{}", output::render_list("database", &names));
        }
        Command::Tables { database } => {
            let names = session.list_collections(database).await?;
            println!("{}", output::render_list("collection", &names));
        }
        Command::Records {
            table,
            database,
            filter,
            sort,
            offset,
            limit,
        } => {
            let mut request = DocumentsRequest::new(database.as_str(), table.as_str()).page(*offset, *limit);
            request.filter = filter.clone();
            request.sort = sort.clone();
            let page = session.get_documents(&request).await?;
            println!("{}", output::render_documents(&page));
        }
        Command::Query { .. } | Command::Exec { .. } | Command::Changes { .. } => {
            return Err(TesseraError::NotSupported(format!(
                "{} connections do not run SQL",
                session.config().provider
            ))
            .into());
        }
        Command::Connections | Command::Test | Command::Classify { .. } => {}
    }
    Ok(())
}
