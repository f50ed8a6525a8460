use std::sync::Arc;

use crate::common::Result;
use crate::tuple::{Tuple, TupleDesc};

/// Pull-based operator protocol. Operators form a tree and control flows
/// from the root: `open`, then alternating `has_next`/`next`, optionally
/// `rewind`, finally `close`.
///
/// `open` on a closed operator re-initializes it; `next` past the end fails
/// with `NoMoreTuples`; a closed operator yields nothing.
pub trait OpIterator {
    fn open(&mut self) -> Result<()>;

    fn has_next(&mut self) -> Result<bool>;

    fn next(&mut self) -> Result<Tuple>;

    /// Restarts the stream from the beginning.
    fn rewind(&mut self) -> Result<()>;

    fn close(&mut self);

    /// Schema of the tuples this operator produces.
    fn tuple_desc(&self) -> Arc<TupleDesc>;

    /// Child operators, in order. Leaves return an empty list.
    fn children(&self) -> Vec<&dyn OpIterator> {
        Vec::new()
    }

    /// Replaces the child operators. Leaves ignore the call.
    fn set_children(&mut self, _children: Vec<Box<dyn OpIterator>>) {}
}
