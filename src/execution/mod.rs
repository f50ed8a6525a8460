mod aggregate;
mod delete;
mod filter;
mod insert;
mod op;
mod predicate;
mod seq_scan;
mod tuple_iterator;

pub use aggregate::{Aggregate, AggregateOp, Aggregator};
pub use delete::Delete;
pub use filter::Filter;
pub use insert::Insert;
pub use op::OpIterator;
pub use predicate::Predicate;
pub use seq_scan::SeqScan;
pub use tuple_iterator::TupleIterator;
