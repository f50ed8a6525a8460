//! Marl - a page-based relational storage and query engine
//!
//! Marl stores tables as heap files of fixed-size pages, caches pages in a
//! locking buffer pool, and executes queries through a pull-based operator
//! tree. Each transaction runs on its own thread; page-level shared and
//! exclusive locks (two-phase, with sole-holder upgrade) provide isolation.
//!
//! # Architecture
//!
//! The system is organized into several layers:
//!
//! - **Tuples** (`tuple`): typed fields, schemas, and rows
//!   - `Field`/`FieldType`: 32-bit integers and fixed-max-length strings
//!   - `TupleDesc`: ordered field types with advisory names
//!   - `Tuple`: a row, carrying its `RecordId` once stored
//!
//! - **Storage** (`storage`): on-disk heap files
//!   - `HeapPage`: bitmap-slotted page of fixed-size tuple slots
//!   - `HeapFile`: one file per table; page I/O and tuple placement
//!
//! - **Buffer** (`buffer`): memory and concurrency management
//!   - `LockManager`: page-level S/X locks with upgrade and a bounded wait
//!   - `BufferPool`: bounded page cache with NO-STEAL eviction and
//!     transaction commit/abort handling
//!
//! - **Catalog** (`catalog`): table directory injected by the application
//!
//! - **Execution** (`execution`): iterator-model operators
//!   - `SeqScan`, `Filter`, `Insert`, `Delete`, `Aggregate`
//!
//! - **Statistics** (`stats`): equi-width histograms and per-table stats
//!   for selectivity and scan-cost estimation
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use marl::buffer::BufferPool;
//! use marl::catalog::Catalog;
//! use marl::storage::HeapFile;
//! use marl::tuple::{Field, FieldType, Tuple, TupleDesc};
//! use marl::TransactionId;
//!
//! let desc = TupleDesc::named(&[(FieldType::Int, "id")]).into_arc();
//! let file = Arc::new(HeapFile::open("users.dat", desc.clone()).unwrap());
//!
//! let catalog = Arc::new(Catalog::new());
//! let table_id = catalog.add_table(file, "users");
//! let bp = Arc::new(BufferPool::new(catalog));
//!
//! let tid = TransactionId::new();
//! let mut row = Tuple::new(desc, vec![Field::Int(1)]);
//! bp.insert_tuple(tid, table_id, &mut row).unwrap();
//! bp.transaction_complete(tid, true).unwrap();
//! ```

pub mod buffer;
pub mod catalog;
pub mod common;
pub mod execution;
pub mod stats;
pub mod storage;
pub mod tuple;

// Re-export commonly used types at the crate root
pub use common::{MarlError, PageId, RecordId, Result, TableId, TransactionId};
