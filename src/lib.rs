pub mod cli;
pub mod collection;
pub mod config;
pub mod connection;
pub mod database;
pub mod document;
pub mod errors;
pub mod logger;
pub mod query;
pub mod types;
pub mod utils;

pub use crate::collection::Collection;
pub use crate::config::DbConfig;
pub use crate::database::Database;
pub use crate::errors::DbError;
pub use crate::query::{Cursor, Projection, SortSpec};
pub use crate::types::Document;

include!(concat!(env!("OUT_DIR"), "/compiled_features.rs"));

/// Cargo features this build was compiled with.
#[must_use]
pub fn compiled_features() -> &'static [&'static str] {
    COMPILED_FEATURES
}

/// Initializes logging from `MONGOLITE_LOG_*` environment variables.
///
/// Call once before other operations; a second call fails because a logger is already set.
///
/// # Errors
/// Returns an error if the log directory cannot be created or a logger is already installed.
pub fn init() -> Result<(), Box<dyn std::error::Error>> {
    logger::configure_from_env()
}
