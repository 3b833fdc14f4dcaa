#[path = "prop_criteria.rs"]
mod criteria_props;
#[path = "prop_paging.rs"]
mod paging_props;
#[path = "prop_sort.rs"]
mod sort_props;
