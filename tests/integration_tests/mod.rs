mod collection;
mod query;
mod support;
mod utils;
