//! apiquery Command-Line Client
//!
//! Runs one `get` against a SQLite database, or against an in-memory demo
//! database seeded with the discovery sample data, and prints the result.

mod formatter;

use std::path::PathBuf;

use apiquery_core::discovery::{self, fixture};
use apiquery_core::{CallerContext, Engine, EngineConfig, SqliteStore, UserRole};
use clap::Parser;
use formatter::OutputFormat;
use tracing::info;

/// apiquery Command-Line Client
#[derive(Parser, Debug)]
#[command(name = "apiquery")]
#[command(version, about = "Run entity get requests against a discovery database")]
pub struct Args {
    /// Entity to query (e.g. dservice, drule, host)
    #[arg(short = 'e', long)]
    pub entity: String,

    /// Options as a JSON object
    #[arg(short = 'o', long, conflicts_with = "file")]
    pub options: Option<String>,

    /// Read the options object from a file
    #[arg(short = 'f', long)]
    pub file: Option<PathBuf>,

    /// SQLite database file
    #[arg(long, required_unless_present = "demo")]
    pub db: Option<PathBuf>,

    /// Seed the discovery sample data (in memory unless --db is given, skipped
    /// when the database already holds it)
    #[arg(long)]
    pub demo: bool,

    /// Role of the calling user
    #[arg(long, default_value = "admin")]
    pub role: UserRole,

    /// Id of the calling user
    #[arg(long, default_value_t = 1)]
    pub user_id: i64,

    /// Output format
    #[arg(long, default_value = "json", value_enum)]
    pub format: OutputFormat,

    /// Maximum nesting of related-object selects
    #[arg(long, default_value_t = apiquery_core::config::DEFAULT_MAX_RELATION_DEPTH)]
    pub max_relation_depth: usize,

    /// Row limit applied when the options set none
    #[arg(long)]
    pub row_ceiling: Option<u64>,

    /// Make search case-sensitive unless the options say otherwise
    #[arg(long)]
    pub case_sensitive_search: bool,
}

impl Args {
    fn engine_config(&self) -> EngineConfig {
        let mut config = EngineConfig::new().with_max_relation_depth(self.max_relation_depth);
        if let Some(ceiling) = self.row_ceiling {
            config = config.with_row_ceiling(ceiling);
        }
        if self.case_sensitive_search {
            config = config.with_case_sensitive_search();
        }
        config
    }

    fn raw_options(&self) -> Result<serde_json::Value, Box<dyn std::error::Error>> {
        let text = match (&self.options, &self.file) {
            (Some(options), _) => options.clone(),
            (None, Some(file)) => std::fs::read_to_string(file)?,
            (None, None) => return Ok(serde_json::Value::Null),
        };
        Ok(serde_json::from_str(&text)?)
    }
}

fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("apiquery=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let formatter = formatter::create_formatter(args.format);

    match run(&args) {
        Ok(output) => println!("{}", output),
        Err(e) => {
            eprintln!("{}", formatter.format_error(&e.to_string()));
            std::process::exit(1);
        }
    }
}

/// Execute the request and return the formatted result.
fn run(args: &Args) -> Result<String, Box<dyn std::error::Error>> {
    let raw = args.raw_options()?;

    let store = match &args.db {
        Some(path) => SqliteStore::open(path)?,
        None => SqliteStore::open_in_memory()?,
    };
    if args.demo {
        if store.has_rows("dservices")? {
            info!("database already holds discovery data, skipping demo seed");
        } else {
            fixture::load(&store)?;
        }
    }

    let engine = Engine::new(discovery::catalog()?, store).with_config(args.engine_config());
    let caller = CallerContext::new(args.user_id, args.role);
    info!(entity = %args.entity, role = %caller.role, "running get");

    let result = engine.get_json(&args.entity, &raw, &caller)?;
    Ok(formatter::create_formatter(args.format).format_result(&result))
}
