//! src/main.rs – catalog-export launcher: config, logging, exit status
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use log::info;

use catalog_export::config::{Config, FileConfig};
use catalog_export::output_dir::{base_dir, kind_dir};
use catalog_export::source::create_environment;
use catalog_export::{
    export_all, ErrorPolicy, ExportOptions, ExportStatus, NullDefinitionPolicy, ObjectKind,
    OdbcCatalog,
};

const EXIT_SUCCESS: u8 = 0;
const EXIT_FAILURE: u8 = 1;
const EXIT_PARTIAL: u8 = 2;

/*──────────────────────── CLI structures ──────────────────────*/
#[derive(Parser)]
#[command(name = "catalog-export")]
#[command(
    about = "Script SQL Server functions, views and stored procedures to .sql files",
    long_about = None
)]
struct Cli {
    /// Kind of object to export
    #[arg(short, long, value_enum)]
    kind: KindArg,

    /// SQL Server instance
    #[arg(short, long, env = "CATALOG_EXPORT_SERVER")]
    server: Option<String>,

    /// Database name
    #[arg(short, long, env = "CATALOG_EXPORT_DATABASE")]
    database: Option<String>,

    /// SQL login; omit for integrated security
    #[arg(short, long, env = "CATALOG_EXPORT_USER")]
    user: Option<String>,

    #[arg(long, env = "CATALOG_EXPORT_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Force integrated security even if a user is configured
    #[arg(long)]
    trusted: bool,

    /// ODBC driver name
    #[arg(long)]
    driver: Option<String>,

    /// Full ODBC connection string (overrides server/database/auth)
    #[arg(long, env = "CATALOG_EXPORT_CONNECTION_STRING", hide_env_values = true)]
    connection_string: Option<String>,

    /// Output directory for scripts
    #[arg(short, long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Config file (default: catalog-export.toml next to the executable)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// What to do with encrypted / NULL definitions (skip, empty, error)
    #[arg(long, default_value = "skip")]
    null_definitions: NullDefinitionPolicy,

    /// Exit immediately on first error
    #[arg(short, long)]
    exit_on_error: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum KindArg {
    Function,
    View,
    Procedure,
    All,
}

impl KindArg {
    fn kinds(self) -> Vec<ObjectKind> {
        match self {
            KindArg::Function => vec![ObjectKind::Function],
            KindArg::View => vec![ObjectKind::View],
            KindArg::Procedure => vec![ObjectKind::StoredProcedure],
            KindArg::All => ObjectKind::ALL.to_vec(),
        }
    }
}

/*──────────────────────── main ────────────────────────────────*/
fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    let outcome = run(cli);
    if let Err(e) = &outcome {
        eprintln!("Error: {:#}", e);
    }
    ExitCode::from(exit_code(&outcome))
}

/// 0 when everything was written or skipped by policy, 2 when some entries
/// failed, 1 when the run could not complete.
fn exit_code(outcome: &anyhow::Result<ExportStatus>) -> u8 {
    match outcome {
        Ok(ExportStatus::Success) => EXIT_SUCCESS,
        Ok(ExportStatus::PartialFailure) => EXIT_PARTIAL,
        Err(_) => EXIT_FAILURE,
    }
}

fn run(cli: Cli) -> anyhow::Result<ExportStatus> {
    let config_path = cli.config.clone().unwrap_or_else(FileConfig::default_path);
    let file_cfg = FileConfig::load_from(&config_path)?;
    let config = Config::resolve(file_cfg.merge(FileConfig {
        server: cli.server,
        database: cli.database,
        driver: cli.driver,
        trusted_connection: cli.trusted.then_some(true),
        user: cli.user,
        password: cli.password,
        connection_string: cli.connection_string,
        output_dir: cli.output_dir,
    }))?;

    info!("Connecting with {}", config.redacted_connection_string());
    let env = create_environment()?;
    let catalog = OdbcCatalog::connect(&env, &config.connection_string)?;

    let kinds = cli.kind.kinds();
    let explicit = config.output_dir.is_some();
    let base = base_dir(config.output_dir.as_deref(), config.database.as_deref());

    let mut status = ExportStatus::Success;
    for kind in kinds.iter().copied() {
        let options = ExportOptions {
            output_dir: kind_dir(&base, kind, explicit, kinds.len() > 1),
            on_error: if cli.exit_on_error {
                ErrorPolicy::Abort
            } else {
                ErrorPolicy::Continue
            },
            null_definitions: cli.null_definitions,
        };

        let report = export_all(&catalog, kind, &options)
            .with_context(|| format!("exporting {} failed", kind.noun()))?;

        println!(
            "\nAll {} scripted to: {} ({} written, {} skipped)",
            kind.noun(),
            report.output_dir.display(),
            report.count(),
            report.skipped.len()
        );
        if report.status() == ExportStatus::PartialFailure {
            let total = report.failures.len() + report.count() + report.skipped.len();
            eprintln!("{} of {} {} failed:", report.failures.len(), total, kind.noun());
            for failure in &report.failures {
                eprintln!("  [{}] {}: {}", failure.error.kind_name(), failure.entry, failure.error);
            }
            status = ExportStatus::PartialFailure;
        }
    }

    Ok(status)
}
