//! resq CLI - compile and run resource queries
//!
//! Usage:
//!   resq compile <type> [-p key=value]... [--dialect <dialect>] [--output sql|plan]
//!   resq query <type> [-p key=value]... [--database <file>]
//!   resq schema [type]
//!   resq check
//!
//! Examples:
//!   resq compile posts -p 'sort=-title' -p 'filter[title][like]=New'
//!   resq compile comments -p 'filter[comments][post.writer.email][like]=example' --dialect postgres
//!   resq query posts -p 'page[size]=5' --database blog.db

use clap::{Parser, Subcommand, ValueEnum};
use resq::config::Settings;
use resq::engine::QueryEngine;
use resq::error::QueryError;
use resq::params::QueryParams;
use resq::schema::{builtin, RelationKind, SchemaRegistry};
use resq::sql::Dialect;
use resq::store::SqliteExecutor;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "resq")]
#[command(about = "resq - compile JSON:API query strings into SQL over a resource graph")]
#[command(version)]
struct Cli {
    /// Config file (defaults to RESQ_CONFIG, ./resq.toml, then the user config dir)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a request to SQL without running it
    Compile {
        /// Resource type, e.g. posts
        resource_type: String,

        /// Query parameter as key=value (repeatable)
        #[arg(short, long = "param", value_name = "KEY=VALUE")]
        params: Vec<String>,

        /// SQL dialect to generate (defaults to the configured dialect)
        #[arg(short, long)]
        dialect: Option<DialectArg>,

        /// Output format
        #[arg(short, long, default_value = "sql")]
        output: OutputFormat,
    },

    /// Run a request against a SQLite database and print the page as JSON
    Query {
        /// Resource type, e.g. posts
        resource_type: String,

        /// Query parameter as key=value (repeatable)
        #[arg(short, long = "param", value_name = "KEY=VALUE")]
        params: Vec<String>,

        /// SQLite database file (defaults to database.path from the config)
        #[arg(long)]
        database: Option<PathBuf>,
    },

    /// Describe the registered resources
    Schema {
        /// Only this resource type
        resource_type: Option<String>,
    },

    /// Validate the config file and the resource registry
    Check,
}

#[derive(Clone, Copy, ValueEnum)]
enum DialectArg {
    Sqlite,
    Postgres,
    Duckdb,
}

impl From<DialectArg> for Dialect {
    fn from(arg: DialectArg) -> Self {
        match arg {
            DialectArg::Sqlite => Dialect::Sqlite,
            DialectArg::Postgres => Dialect::Postgres,
            DialectArg::Duckdb => Dialect::DuckDb,
        }
    }
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Page query and count query
    Sql,
    /// The compiled plan as JSON
    Plan,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let settings = match &cli.config {
        Some(path) => Settings::from_file(path),
        None => Settings::load(),
    };
    let settings = match settings {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    init_tracing(&settings.logging.filter);

    let registry = match builtin::registry() {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Schema error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match cli.command {
        Commands::Compile {
            resource_type,
            params,
            dialect,
            output,
        } => {
            let dialect = dialect.map(Dialect::from).unwrap_or(settings.database.dialect);
            cmd_compile(&settings, registry, &resource_type, &params, dialect, output)
        }
        Commands::Query {
            resource_type,
            params,
            database,
        } => cmd_query(&settings, registry, &resource_type, &params, database),
        Commands::Schema { resource_type } => cmd_schema(&registry, resource_type.as_deref()),
        Commands::Check => cmd_check(&settings, &registry),
    }
}

/// Log to stderr. RUST_LOG wins over the configured filter.
fn init_tracing(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    // A subscriber may already be installed when embedded; that is fine.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

fn parse_params(raw: &[String]) -> Result<QueryParams, String> {
    let pairs = raw
        .iter()
        .map(|p| {
            p.split_once('=')
                .ok_or_else(|| format!("expected key=value, got '{}'", p))
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(QueryParams::from_pairs(pairs))
}

fn report(err: &QueryError) -> ExitCode {
    eprintln!("{}", serde_json::json!({ "errors": [err.to_error_object()] }));
    if err.kind() == resq::error::ErrorKind::Storage {
        eprintln!("Storage error: {}", err);
    }
    ExitCode::FAILURE
}

fn cmd_compile(
    settings: &Settings,
    registry: SchemaRegistry,
    resource_type: &str,
    raw_params: &[String],
    dialect: Dialect,
    output: OutputFormat,
) -> ExitCode {
    let params = match parse_params(raw_params) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let engine = QueryEngine::new(registry, settings.pagination);
    let plan = match engine.compile(resource_type, &params) {
        Ok(plan) => plan,
        Err(e) => return report(&e),
    };

    match output {
        OutputFormat::Sql => {
            println!("-- page ({})", dialect);
            println!("{};", plan.to_sql(dialect));
            println!();
            println!("-- count");
            println!("{};", plan.count_sql(dialect));
        }
        OutputFormat::Plan => match serde_json::to_string_pretty(&plan) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error serializing plan: {}", e);
                return ExitCode::FAILURE;
            }
        },
    }
    ExitCode::SUCCESS
}

fn cmd_query(
    settings: &Settings,
    registry: SchemaRegistry,
    resource_type: &str,
    raw_params: &[String],
    database: Option<PathBuf>,
) -> ExitCode {
    let params = match parse_params(raw_params) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let path = match database {
        Some(path) => path,
        None => match settings.database.resolved_path() {
            Ok(Some(path)) => path,
            Ok(None) => {
                eprintln!("Error: no database given (use --database or set database.path)");
                return ExitCode::FAILURE;
            }
            Err(e) => {
                eprintln!("Configuration error: {}", e);
                return ExitCode::FAILURE;
            }
        },
    };

    let executor = match SqliteExecutor::open(&path) {
        Ok(executor) => executor,
        Err(e) => return report(&e),
    };

    let engine = QueryEngine::new(registry, settings.pagination);
    match engine.query(&executor, resource_type, &params) {
        Ok(page) => match serde_json::to_string_pretty(&page) {
            Ok(json) => {
                println!("{}", json);
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("Error serializing page: {}", e);
                ExitCode::FAILURE
            }
        },
        Err(e) => report(&e),
    }
}

fn cmd_schema(registry: &SchemaRegistry, only: Option<&str>) -> ExitCode {
    let schemas: Vec<_> = match only {
        Some(resource_type) => match registry.get(resource_type) {
            Ok(schema) => vec![schema],
            Err(e) => return report(&e),
        },
        None => registry.schemas().collect(),
    };

    for schema in schemas {
        println!(
            "{} (table: \"{}\", key: {})",
            schema.resource_type, schema.table, schema.primary_key
        );

        let fields: Vec<_> = schema.fields.keys().map(String::as_str).collect();
        println!("  fields: {}", fields.join(", "));

        for relation in registry.graph().relations_of(&schema.resource_type) {
            let kind = match relation.edge.kind {
                RelationKind::ManyToOne => "many-to-one",
                RelationKind::OneToMany => "one-to-many",
            };
            println!(
                "  relation {} -> {} ({}, fk {})",
                relation.edge.name,
                relation.target.resource_type,
                kind,
                relation.edge.foreign_key_column
            );
        }

        let sorts: Vec<_> = schema.sortable.keys().map(String::as_str).collect();
        if !sorts.is_empty() {
            println!("  sort: {}", sorts.join(", "));
        }

        for (token, rule) in &schema.filterable {
            let ops: Vec<_> = rule.operators.iter().map(|op| op.token()).collect();
            println!("  filter {}: {}", token, ops.join(", "));
        }
        println!();
    }
    ExitCode::SUCCESS
}

fn cmd_check(settings: &Settings, registry: &SchemaRegistry) -> ExitCode {
    let types: Vec<_> = registry.resource_types().collect();
    println!(
        "OK: {} resource types ({}), page size {} (max {}), dialect {}",
        types.len(),
        types.join(", "),
        settings.pagination.default_size,
        settings.pagination.max_size,
        settings.database.dialect
    );
    ExitCode::SUCCESS
}
