// Cursor behaviour end to end, plus the SQL functions as seen through real statements.
#[path = "mod_criteria.rs"]
mod criteria_tests;
#[path = "mod_cursor.rs"]
mod cursor_tests;
#[path = "mod_projection.rs"]
mod projection_tests;
