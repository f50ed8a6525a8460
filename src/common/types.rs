use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Table identifier - a stable hash of the heap file's absolute path
pub type TableId = u32;

/// Page identifier - locates a page within a table's heap file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PageId {
    /// The table this page belongs to
    pub table: TableId,
    /// Zero-based page number within the file
    pub page_no: u32,
}

impl PageId {
    pub fn new(table: TableId, page_no: u32) -> Self {
        Self { table, page_no }
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PageId({}, {})", self.table, self.page_no)
    }
}

/// Record identifier - a page plus a slot index within it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordId {
    pub page_id: PageId,
    pub slot: usize,
}

impl RecordId {
    pub fn new(page_id: PageId, slot: usize) -> Self {
        Self { page_id, slot }
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "RecordId({}, {}, {})",
            self.page_id.table, self.page_id.page_no, self.slot
        )
    }
}

static NEXT_TRANSACTION_ID: AtomicU64 = AtomicU64::new(0);

/// Transaction identifier, minted from a process-wide counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransactionId(u64);

impl TransactionId {
    /// Mints a fresh transaction id.
    pub fn new() -> Self {
        Self(NEXT_TRANSACTION_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tx({})", self.0)
    }
}
