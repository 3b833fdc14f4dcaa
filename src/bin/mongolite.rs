use clap::{Parser, Subcommand};
use mongolite::cli::{self as prog_cli, Command};
use mongolite::{Database, DbConfig, logger};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "mongolite", version, about = "Query JSON documents stored in SQLite tables", long_about = None)]
struct Cli {
    /// Path to a config file (TOML)
    #[arg(long, help = "Path to a config file (TOML). Read before MONGOLITE_CONFIG and the default locations.")]
    config: Option<PathBuf>,
    /// Override DB path (takes precedence over config)
    #[arg(long, help = "Database file path. Takes precedence over config files and MONGOLITE_DB.")]
    db: Option<PathBuf>,
    #[arg(long, help = "Log level (error|warn|info|debug|trace). Overrides the configured level.")]
    log_level: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(name = "collections", about = "List collection names")]
    Collections,
    #[command(name = "create-collection", about = "Create a collection table if it does not exist")]
    CreateCollection { name: String },
    #[command(name = "drop-collection", about = "Drop a collection table")]
    DropCollection { name: String },
    #[command(name = "insert", about = "Insert one JSON object or a JSON array of objects")]
    Insert {
        #[arg(help = "Document JSON")]
        json: String,
        #[arg(short, long, help = "Collection name; falls back to default_collection")]
        collection: Option<String>,
    },
    #[command(name = "find", about = "Stream matching documents as NDJSON")]
    Find {
        #[arg(help = "Criteria JSON, e.g. '{\"age\":{\"$gt\":21}}'")]
        filter: Option<String>,
        #[arg(short, long)]
        collection: Option<String>,
        #[arg(long, help = "Projection JSON, e.g. '{\"name\":1}'")]
        fields: Option<String>,
        #[arg(long, help = "Sort JSON, e.g. '{\"age\":-1}'")]
        sort: Option<String>,
        #[arg(long)]
        limit: Option<usize>,
        #[arg(long, help = "Rows to skip; ignored unless --limit is also given")]
        skip: Option<usize>,
    },
    #[command(name = "find-one", about = "Print the first matching document or null")]
    FindOne {
        filter: Option<String>,
        #[arg(short, long)]
        collection: Option<String>,
        #[arg(long)]
        fields: Option<String>,
    },
    #[command(name = "count", about = "Count matching documents")]
    Count {
        filter: Option<String>,
        #[arg(short, long)]
        collection: Option<String>,
    },
    #[command(name = "update", about = "Merge JSON fields into every matching document")]
    Update {
        #[arg(help = "Fields to set, as a JSON object")]
        json: String,
        #[arg(long)]
        filter: Option<String>,
        #[arg(short, long)]
        collection: Option<String>,
    },
    #[command(name = "remove", about = "Remove matching documents (all if no filter)")]
    Remove {
        filter: Option<String>,
        #[arg(short, long)]
        collection: Option<String>,
    },
    #[command(name = "info", about = "Show build features, configuration and collections")]
    Info,
}

impl From<Commands> for Command {
    fn from(c: Commands) -> Self {
        match c {
            Commands::Collections => Command::Collections,
            Commands::CreateCollection { name } => Command::CreateCollection { name },
            Commands::DropCollection { name } => Command::DropCollection { name },
            Commands::Insert { json, collection } => Command::Insert { collection, json },
            Commands::Find { filter, collection, fields, sort, limit, skip } => {
                Command::Find { collection, filter, fields, sort, limit, skip }
            }
            Commands::FindOne { filter, collection, fields } => Command::FindOne { collection, filter, fields },
            Commands::Count { filter, collection } => Command::Count { collection, filter },
            Commands::Update { json, filter, collection } => Command::Update { collection, filter, json },
            Commands::Remove { filter, collection } => Command::Remove { collection, filter },
            Commands::Info => Command::Info,
        }
    }
}

fn load(cli: &Cli) -> Result<DbConfig, Box<dyn std::error::Error>> {
    // Precedence: CLI > config files > env > defaults
    let mut cfg = DbConfig::load(cli.config.as_deref())?;
    if let Some(db) = &cli.db {
        cfg.db_path = Some(db.clone());
    }
    if let Some(level) = &cli.log_level {
        cfg.log_level = Some(level.clone());
    }
    Ok(cfg)
}

fn main() {
    let cli = Cli::parse();
    let cfg = match load(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(2);
        }
    };
    if cfg.log_dir.is_some() || cfg.log_level.is_some() {
        if let Err(e) = logger::configure_from_config(&cfg) {
            eprintln!("warning: logging disabled: {e}");
        }
    }
    let command: Command = cli.command.into();
    if let Err(e) = prog_cli::require_persistent(&cfg, &command) {
        eprintln!("error: {e}");
        std::process::exit(2);
    }
    if cfg.db_path.is_none() {
        log::warn!("no db_path configured; using an in-memory database");
    }
    let db = match Database::open_with_config(&cfg) {
        Ok(db) => db,
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    };
    let mut stdout = std::io::stdout().lock();
    if let Err(e) = prog_cli::run(&db, command, &mut stdout) {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
