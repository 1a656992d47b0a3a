//! Quarry CLI - build, run and export ad-hoc reports
//!
//! Usage:
//!   quarry connections
//!   quarry tables <connection>
//!   quarry columns <connection> <table>
//!   quarry validate <config.json>
//!   quarry run <config.json> [--page <n>]
//!   quarry export <config.json> [--format <excel|csv|pdf>] [--out <dir>]
//!   quarry saved list | show <id> | save <name> <config.json>
//!
//! Examples:
//!   quarry run reports/sales.json --page 2
//!   quarry export reports/sales.json --format excel --out ./exports
//!   quarry --local saved save "Weekly sales" reports/sales.json

use async_trait::async_trait;
use clap::{Parser, Subcommand};
use quarry::catalog::{ColumnInfo, Connection, SchemaProvider};
use quarry::client::{ClientResult, HttpClient};
use quarry::config::{Settings, StorageMode};
use quarry::engine::ReportEngine;
use quarry::execution::{ExecutionPage, ReportExecutor};
use quarry::export::{ExportFormat, ExportService};
use quarry::model::{ReportConfig, ReportResult, SavedReport, SavedReportSummary};
use quarry::persistence::{LocalReportRepository, PersistenceResult, ReportRepository};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "quarry")]
#[command(about = "Quarry - build, run and export ad-hoc reports against a report backend")]
#[command(version)]
struct Cli {
    /// Keep saved reports in the local SQLite store instead of the backend
    #[arg(long, global = true)]
    local: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List available connections
    Connections,

    /// List tables of a connection
    Tables {
        /// Connection id
        connection: String,
    },

    /// List columns of a table
    Columns {
        /// Connection id
        connection: String,

        /// Table name
        table: String,
    },

    /// Check a report config against the connection's schema
    Validate {
        /// Path to the report config (JSON)
        file: PathBuf,
    },

    /// Execute a report config and print one page
    Run {
        /// Path to the report config (JSON)
        file: PathBuf,

        /// Page to fetch (1-based)
        #[arg(short, long, default_value_t = 1)]
        page: u32,
    },

    /// Execute a report config and export the result
    Export {
        /// Path to the report config (JSON)
        file: PathBuf,

        /// File format
        #[arg(short, long, default_value = "csv")]
        format: ExportFormat,

        /// Output directory (defaults to [export] output_dir)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Manage saved reports
    Saved {
        #[command(subcommand)]
        command: SavedCommands,
    },
}

#[derive(Subcommand)]
enum SavedCommands {
    /// List saved reports
    List,

    /// Print a saved report's config
    Show {
        /// Report id
        id: String,
    },

    /// Save a report config under a name
    Save {
        /// Report name
        name: String,

        /// Path to the report config (JSON)
        file: PathBuf,
    },
}

/// The HTTP backend, optionally with saved reports kept locally.
struct CliBackend {
    http: HttpClient,
    local: Option<LocalReportRepository>,
}

#[async_trait]
impl SchemaProvider for CliBackend {
    async fn list_connections(&self) -> ClientResult<Vec<Connection>> {
        self.http.list_connections().await
    }

    async fn list_tables(&self, connection_id: &str) -> ClientResult<Vec<String>> {
        self.http.list_tables(connection_id).await
    }

    async fn list_columns(&self, connection_id: &str, table: &str) -> ClientResult<Vec<ColumnInfo>> {
        self.http.list_columns(connection_id, table).await
    }
}

#[async_trait]
impl ReportExecutor for CliBackend {
    async fn execute_report(
        &self,
        config: &ReportConfig,
        page: u32,
        page_size: u32,
    ) -> ClientResult<ExecutionPage> {
        self.http.execute_report(config, page, page_size).await
    }
}

#[async_trait]
impl ExportService for CliBackend {
    async fn export_report(
        &self,
        config: &ReportConfig,
        format: ExportFormat,
        data: &ReportResult,
    ) -> ClientResult<Vec<u8>> {
        self.http.export_report(config, format, data).await
    }
}

#[async_trait]
impl ReportRepository for CliBackend {
    async fn save_report(&self, name: &str, config: &ReportConfig) -> PersistenceResult<SavedReport> {
        match &self.local {
            Some(local) => local.save_report(name, config).await,
            None => self.http.save_report(name, config).await,
        }
    }

    async fn update_report(
        &self,
        id: &str,
        name: &str,
        config: &ReportConfig,
    ) -> PersistenceResult<SavedReport> {
        match &self.local {
            Some(local) => local.update_report(id, name, config).await,
            None => self.http.update_report(id, name, config).await,
        }
    }

    async fn list_reports(&self) -> PersistenceResult<Vec<SavedReportSummary>> {
        match &self.local {
            Some(local) => local.list_reports().await,
            None => self.http.list_reports().await,
        }
    }

    async fn load_report(&self, id: &str) -> PersistenceResult<SavedReport> {
        match &self.local {
            Some(local) => local.load_report(id).await,
            None => self.http.load_report(id).await,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("quarry=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let settings = match Settings::load() {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error loading settings: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let backend = match open_backend(&settings, cli.local) {
        Ok(b) => b,
        Err(message) => {
            eprintln!("{}", message);
            return ExitCode::FAILURE;
        }
    };
    let mut engine = ReportEngine::with_settings(backend, &settings);

    match cli.command {
        Commands::Connections => cmd_connections(&mut engine).await,
        Commands::Tables { connection } => cmd_tables(&mut engine, connection).await,
        Commands::Columns { connection, table } => {
            cmd_columns(&mut engine, connection, &table).await
        }
        Commands::Validate { file } => cmd_validate(&mut engine, &file).await,
        Commands::Run { file, page } => cmd_run(&mut engine, &file, page).await,
        Commands::Export { file, format, out } => {
            let out = match out {
                Some(dir) => dir,
                None => match settings.export.resolved_output_dir() {
                    Ok(dir) => dir,
                    Err(e) => {
                        eprintln!("Error in [export] settings: {}", e);
                        return ExitCode::FAILURE;
                    }
                },
            };
            cmd_export(&mut engine, &file, format, &out).await
        }
        Commands::Saved { command } => match command {
            SavedCommands::List => cmd_saved_list(&mut engine).await,
            SavedCommands::Show { id } => cmd_saved_show(&mut engine, &id).await,
            SavedCommands::Save { name, file } => cmd_saved_save(&mut engine, &name, &file).await,
        },
    }
}

fn open_backend(settings: &Settings, force_local: bool) -> Result<CliBackend, String> {
    let http = HttpClient::from_settings(settings)
        .map_err(|e| format!("Error configuring backend client: {}", e))?;

    let local = if force_local || settings.storage.mode == StorageMode::Local {
        let path = match settings.storage.resolved_path() {
            Ok(Some(path)) => path,
            Ok(None) => LocalReportRepository::default_path()
                .map_err(|e| format!("Error locating report store: {}", e))?,
            Err(e) => return Err(format!("Error in [storage] settings: {}", e)),
        };
        let repo = LocalReportRepository::open_at(&path)
            .map_err(|e| format!("Error opening report store '{}': {}", path.display(), e))?;
        Some(repo)
    } else {
        None
    };

    Ok(CliBackend { http, local })
}

fn read_config(file: &Path) -> Result<ReportConfig, String> {
    let source = fs::read_to_string(file)
        .map_err(|e| format!("Error reading file '{}': {}", file.display(), e))?;
    serde_json::from_str(&source)
        .map_err(|e| format!("Error parsing report config '{}': {}", file.display(), e))
}

async fn cmd_connections(engine: &mut ReportEngine<CliBackend>) -> ExitCode {
    match engine.refresh_connections().await {
        Ok(connections) => {
            if connections.is_empty() {
                println!("No connections available.");
            }
            for conn in connections {
                println!("{}\t{}", conn.id, conn.nickname);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn cmd_tables(engine: &mut ReportEngine<CliBackend>, connection: String) -> ExitCode {
    if let Err(e) = engine.apply(quarry::engine::Command::SelectConnection(Some(connection))) {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }
    match engine.load_tables().await {
        Ok(tables) => {
            for table in tables {
                println!("{}", table);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn cmd_columns(
    engine: &mut ReportEngine<CliBackend>,
    connection: String,
    table: &str,
) -> ExitCode {
    if let Err(e) = engine.apply(quarry::engine::Command::SelectConnection(Some(connection))) {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }
    match engine.load_columns(table).await {
        Ok(columns) => {
            for column in columns {
                let marker = if column.is_numeric() { " (numeric)" } else { "" };
                println!("{}\t{}{}", column.name, column.data_type, marker);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn cmd_validate(engine: &mut ReportEngine<CliBackend>, file: &Path) -> ExitCode {
    let config = match read_config(file) {
        Ok(c) => c,
        Err(message) => {
            eprintln!("{}", message);
            return ExitCode::FAILURE;
        }
    };

    // Load the schema of every table the config mentions.
    let mut tables: Vec<String> = config
        .referenced_fields()
        .into_iter()
        .filter_map(|f| f.table().map(str::to_string))
        .collect();
    tables.sort();
    tables.dedup();

    engine.open(config);
    if engine.config().connection_id.is_some() {
        if let Err(e) = engine.load_tables().await {
            eprintln!("Warning: {}", e);
        }
        if let Err(e) = engine.load_columns_batch(&tables).await {
            eprintln!("Warning: {}", e);
        }
        for notice in engine.take_notices() {
            eprintln!("Warning: {}", notice.message);
        }
    }

    let issues = engine.validate();
    if issues.is_empty() {
        println!("OK: {} is valid", file.display());
        return ExitCode::SUCCESS;
    }

    let mut failed = false;
    eprintln!("Validation issues:");
    for issue in &issues {
        let label = if issue.is_error() { "error" } else { "warning" };
        failed |= issue.is_error();
        eprintln!("  {}: {}", label, issue);
    }
    if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

async fn cmd_run(engine: &mut ReportEngine<CliBackend>, file: &Path, page: u32) -> ExitCode {
    let config = match read_config(file) {
        Ok(c) => c,
        Err(message) => {
            eprintln!("{}", message);
            return ExitCode::FAILURE;
        }
    };
    engine.open(config);

    if let Err(e) = engine.run(page).await {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }

    print_result(engine.result());
    let pagination = engine.pagination();
    println!();
    println!(
        "Page {} of {} ({} rows)",
        pagination.current_page,
        pagination.total_pages(),
        pagination.total_rows
    );
    ExitCode::SUCCESS
}

fn print_result(result: &ReportResult) {
    if result.is_empty() {
        println!("No results.");
        return;
    }
    println!("{}", result.headers.join("\t"));
    for row in &result.rows {
        let cells: Vec<String> = result
            .headers
            .iter()
            .map(|h| row.get(h).map(|v| v.to_string()).unwrap_or_default())
            .collect();
        println!("{}", cells.join("\t"));
    }
}

async fn cmd_export(
    engine: &mut ReportEngine<CliBackend>,
    file: &Path,
    format: ExportFormat,
    out: &Path,
) -> ExitCode {
    let config = match read_config(file) {
        Ok(c) => c,
        Err(message) => {
            eprintln!("{}", message);
            return ExitCode::FAILURE;
        }
    };
    engine.open(config);

    if let Err(e) = engine.run(1).await {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }

    let exported = match engine.export(format).await {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match exported.save_in(out) {
        Ok(path) => {
            println!("Exported to {}", path.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn cmd_saved_list(engine: &mut ReportEngine<CliBackend>) -> ExitCode {
    match engine.list_saved().await {
        Ok(reports) => {
            if reports.is_empty() {
                println!("No saved reports.");
            }
            for report in reports {
                println!(
                    "{}\t{}\t{}",
                    report.id,
                    report.name,
                    report.created_at.format("%Y-%m-%d %H:%M")
                );
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn cmd_saved_show(engine: &mut ReportEngine<CliBackend>, id: &str) -> ExitCode {
    let config = match engine.load(id).await {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match serde_json::to_string_pretty(config) {
        Ok(json) => {
            println!("{}", json);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error serializing report config: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn cmd_saved_save(engine: &mut ReportEngine<CliBackend>, name: &str, file: &Path) -> ExitCode {
    let config = match read_config(file) {
        Ok(c) => c,
        Err(message) => {
            eprintln!("{}", message);
            return ExitCode::FAILURE;
        }
    };
    engine.open(config);

    match engine.save(name).await {
        Ok(saved) => {
            println!("Saved '{}' as {}", saved.name, saved.id);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
