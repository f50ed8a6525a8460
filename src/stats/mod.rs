mod int_histogram;
mod string_histogram;
mod table_stats;

pub use int_histogram::IntHistogram;
pub use string_histogram::{string_to_int, StringHistogram};
pub use table_stats::{StatsRegistry, TableStats, DEFAULT_IO_COST_PER_PAGE};
