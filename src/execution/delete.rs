use std::sync::Arc;

use crate::buffer::BufferPool;
use crate::common::{MarlError, Result, TransactionId};
use crate::tuple::{Field, Tuple, TupleDesc};

use super::insert::count_desc;
use super::OpIterator;

/// Deletes every child tuple from the table its record id names, then
/// yields one tuple holding the deletion count.
pub struct Delete {
    bp: Arc<BufferPool>,
    tid: TransactionId,
    child: Box<dyn OpIterator>,
    desc: Arc<TupleDesc>,
    done: bool,
    opened: bool,
}

impl Delete {
    pub fn new(bp: Arc<BufferPool>, tid: TransactionId, child: Box<dyn OpIterator>) -> Self {
        Self {
            bp,
            tid,
            child,
            desc: count_desc("deleted"),
            done: false,
            opened: false,
        }
    }
}

impl OpIterator for Delete {
    fn open(&mut self) -> Result<()> {
        self.child.open()?;
        self.opened = true;
        self.done = false;
        Ok(())
    }

    fn has_next(&mut self) -> Result<bool> {
        Ok(self.opened && !self.done)
    }

    fn next(&mut self) -> Result<Tuple> {
        if !self.has_next()? {
            return Err(MarlError::NoMoreTuples);
        }
        let mut count = 0;
        while self.child.has_next()? {
            let tuple = self.child.next()?;
            self.bp.delete_tuple(self.tid, &tuple)?;
            count += 1;
        }
        self.done = true;
        Ok(Tuple::new(self.desc.clone(), vec![Field::Int(count)]))
    }

    fn rewind(&mut self) -> Result<()> {
        self.child.rewind()?;
        self.done = false;
        Ok(())
    }

    fn close(&mut self) {
        self.opened = false;
        self.child.close();
    }

    fn tuple_desc(&self) -> Arc<TupleDesc> {
        self.desc.clone()
    }

    fn children(&self) -> Vec<&dyn OpIterator> {
        vec![self.child.as_ref()]
    }

    fn set_children(&mut self, mut children: Vec<Box<dyn OpIterator>>) {
        if let Some(child) = children.pop() {
            self.child = child;
        }
    }
}
