#[path = "mod_errors.rs"]
mod errors_tests;
#[path = "mod_querylog.rs"]
mod querylog_tests;
