use std::sync::Arc;

use crate::buffer::BufferPool;
use crate::common::{MarlError, Result, TableId, TransactionId};
use crate::tuple::{Field, FieldType, Tuple, TupleDesc};

use super::OpIterator;

/// Schema of the single count tuple Insert and Delete produce.
pub(crate) fn count_desc(name: &str) -> Arc<TupleDesc> {
    TupleDesc::new(vec![FieldType::Int], vec![Some(name.to_string())]).into_arc()
}

/// Inserts every child tuple into a table through the buffer pool, then
/// yields one tuple holding the insertion count. Duplicates are not checked.
pub struct Insert {
    bp: Arc<BufferPool>,
    tid: TransactionId,
    child: Box<dyn OpIterator>,
    table_id: TableId,
    desc: Arc<TupleDesc>,
    done: bool,
    opened: bool,
}

impl std::fmt::Debug for Insert {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Insert")
            .field("tid", &self.tid)
            .field("table_id", &self.table_id)
            .field("desc", &self.desc)
            .field("done", &self.done)
            .field("opened", &self.opened)
            .finish()
    }
}

impl Insert {
    /// Fails with `SchemaMismatch` when the child schema differs from the
    /// table's.
    pub fn new(
        bp: Arc<BufferPool>,
        tid: TransactionId,
        child: Box<dyn OpIterator>,
        table_id: TableId,
    ) -> Result<Self> {
        if *child.tuple_desc() != *bp.catalog().tuple_desc(table_id)? {
            return Err(MarlError::SchemaMismatch(table_id));
        }
        Ok(Self {
            bp,
            tid,
            child,
            table_id,
            desc: count_desc("inserted"),
            done: false,
            opened: false,
        })
    }
}

impl OpIterator for Insert {
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
            let mut tuple = self.child.next()?;
            self.bp.insert_tuple(self.tid, self.table_id, &mut tuple)?;
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
