pub mod kvd;
pub mod similar;
pub mod view;

pub use kvd::{kvd, VOLUME_FLOOR};
pub use similar::{local_related, related_keywords, MAX_RELATED};
pub use view::{sort_table, RangeColumn, RangeFilter, SortColumn, ViewFilter};
