use std::sync::Arc;

use crate::buffer::BufferPool;
use crate::common::{Result, TableId, TransactionId};
use crate::storage::HeapFileScan;
use crate::tuple::{Tuple, TupleDesc};

use super::OpIterator;

/// Sequential scan over every tuple of a table, in page order.
///
/// The leaf of most operator trees: each page is acquired READ_ONLY through
/// the buffer pool as the scan reaches it, so a full scan shared-locks the
/// whole table for the scanning transaction.
pub struct SeqScan {
    scan: HeapFileScan,
    desc: Arc<TupleDesc>,
}

impl SeqScan {
    pub fn new(bp: Arc<BufferPool>, tid: TransactionId, table_id: TableId) -> Result<Self> {
        let file = bp.catalog().file(table_id)?;
        let desc = file.tuple_desc().clone();
        Ok(Self {
            scan: file.scan(bp, tid),
            desc,
        })
    }
}

impl OpIterator for SeqScan {
    fn open(&mut self) -> Result<()> {
        self.scan.open()
    }

    fn has_next(&mut self) -> Result<bool> {
        self.scan.has_next()
    }

    fn next(&mut self) -> Result<Tuple> {
        self.scan.next()
    }

    fn rewind(&mut self) -> Result<()> {
        self.scan.rewind()
    }

    fn close(&mut self) {
        self.scan.close();
    }

    fn tuple_desc(&self) -> Arc<TupleDesc> {
        self.desc.clone()
    }
}
