#[path = "mod_collection.rs"]
mod collection_tests;
