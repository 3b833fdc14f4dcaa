// Submodules for separation of concerns
mod builder;
mod cursor;
mod eval;
mod functions;
mod parse;
mod projection;
mod types;

// Public API re-exports
pub use builder::{SqlQuery, count_query, fetch_query};
pub use cursor::{Cursor, CursorState, Iter};
pub use eval::{compare_json, eval_filter, get_path, values_equal};
pub use functions::{
    CRITERIA_FN, DEFAULT_CRITERIA_CACHE_SIZE, KEY_FN, compiled_criteria, key_value, register_functions,
    set_criteria_cache_capacity,
};
pub use parse::{filter_from_value, is_truthy, parse_filter_json, parse_projection_json, parse_sort_json};
pub use projection::CompiledProjection;
pub use types::{CmpOp, Filter, FindOptions, Order, Page, Projection, SortSpec};
