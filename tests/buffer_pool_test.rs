//! Integration tests for the buffer pool: caching, NO-STEAL eviction, and
//! transaction commit/abort behavior

use std::collections::HashSet;
use std::sync::Arc;
use std::thread;

use marl::buffer::BufferPool;
use marl::catalog::Catalog;
use marl::storage::{HeapFile, HeapPage};
use marl::tuple::{Field, FieldType, Tuple, TupleDesc};
use marl::{MarlError, PageId, TransactionId};
use rand::Rng;
use tempfile::TempDir;

fn int_desc() -> Arc<TupleDesc> {
    TupleDesc::named(&[(FieldType::Int, "v")]).into_arc()
}

struct Fixture {
    bp: Arc<BufferPool>,
    table_a: u32,
    table_b: u32,
    _dir: TempDir,
}

fn create_fixture(capacity: usize) -> Fixture {
    let dir = TempDir::new().unwrap();
    let desc = int_desc();
    let file_a = Arc::new(HeapFile::open(dir.path().join("a.dat"), desc.clone()).unwrap());
    let file_b = Arc::new(HeapFile::open(dir.path().join("b.dat"), desc).unwrap());

    let catalog = Arc::new(Catalog::new());
    let table_a = catalog.add_table(file_a, "a");
    let table_b = catalog.add_table(file_b, "b");
    Fixture {
        bp: Arc::new(BufferPool::with_capacity(catalog, capacity)),
        table_a,
        table_b,
        _dir: dir,
    }
}

fn insert_committed(bp: &Arc<BufferPool>, table_id: u32, values: &[i32]) {
    let desc = int_desc();
    let tid = TransactionId::new();
    for &v in values {
        let mut tuple = Tuple::new(desc.clone(), vec![Field::Int(v)]);
        bp.insert_tuple(tid, table_id, &mut tuple).unwrap();
    }
    bp.transaction_complete(tid, true).unwrap();
}

fn scan_values(bp: &Arc<BufferPool>, table_id: u32) -> HashSet<i32> {
    let tid = TransactionId::new();
    let file = bp.catalog().file(table_id).unwrap();
    let mut scan = file.scan(bp.clone(), tid);
    scan.open().unwrap();
    let mut values = HashSet::new();
    while scan.has_next().unwrap() {
        if let Field::Int(v) = scan.next().unwrap().value(0) {
            values.insert(*v);
        }
    }
    bp.transaction_complete(tid, true).unwrap();
    values
}

#[test]
fn test_eviction_preserves_committed_data() {
    let fixture = create_fixture(1);

    // commit a tuple into table A; its page is now clean in the cache
    insert_committed(&fixture.bp, fixture.table_a, &[7]);
    assert_eq!(fixture.bp.cached_pages(), 1);

    // touching table B forces the single-slot pool to evict A's page
    insert_committed(&fixture.bp, fixture.table_b, &[8]);
    assert_eq!(fixture.bp.cached_pages(), 1);

    // a re-read of A's page comes from disk and still holds the tuple
    assert_eq!(scan_values(&fixture.bp, fixture.table_a), HashSet::from([7]));
}

#[test]
fn test_no_steal_refuses_dirty_eviction() {
    let fixture = create_fixture(1);

    // give table B a page on disk so a later read of it is valid
    insert_committed(&fixture.bp, fixture.table_b, &[1]);

    // t1 dirties the only cache slot and stays uncommitted
    let desc = int_desc();
    let t1 = TransactionId::new();
    let mut tuple = Tuple::new(desc, vec![Field::Int(2)]);
    fixture.bp.insert_tuple(t1, fixture.table_a, &mut tuple).unwrap();

    // fetching another page would need to evict the dirty one
    let t2 = TransactionId::new();
    let err = fixture
        .bp
        .get_page(t2, PageId::new(fixture.table_b, 0), marl::buffer::Permissions::ReadOnly)
        .unwrap_err();
    assert!(matches!(err, MarlError::BufferFull));

    fixture.bp.transaction_complete(t1, true).unwrap();
    fixture.bp.transaction_complete(t2, true).unwrap();
}

#[test]
fn test_abort_discards_dirty_pages() {
    let fixture = create_fixture(10);
    insert_committed(&fixture.bp, fixture.table_a, &[1]);

    let desc = int_desc();
    let t1 = TransactionId::new();
    let mut tuple = Tuple::new(desc, vec![Field::Int(2)]);
    fixture.bp.insert_tuple(t1, fixture.table_a, &mut tuple).unwrap();
    fixture.bp.transaction_complete(t1, false).unwrap();

    // the aborted insert is gone; the committed tuple survives
    assert_eq!(scan_values(&fixture.bp, fixture.table_a), HashSet::from([1]));
}

#[test]
fn test_commit_is_durable_across_pools() {
    let dir = TempDir::new().unwrap();
    let desc = int_desc();
    let path = dir.path().join("t.dat");

    {
        let file = Arc::new(HeapFile::open(&path, desc.clone()).unwrap());
        let catalog = Arc::new(Catalog::new());
        let table_id = catalog.add_table(file, "t");
        let bp = Arc::new(BufferPool::new(catalog));
        insert_committed(&bp, table_id, &[11, 22]);
    }

    // a fresh pool over the same file reads the committed image from disk
    let file = Arc::new(HeapFile::open(&path, desc).unwrap());
    let catalog = Arc::new(Catalog::new());
    let table_id = catalog.add_table(file, "t");
    let bp = Arc::new(BufferPool::new(catalog));
    assert_eq!(scan_values(&bp, table_id), HashSet::from([11, 22]));
}

#[test]
fn test_flush_page_clears_dirty_but_keeps_page() {
    let fixture = create_fixture(10);

    let desc = int_desc();
    let tid = TransactionId::new();
    let mut tuple = Tuple::new(desc, vec![Field::Int(5)]);
    fixture.bp.insert_tuple(tid, fixture.table_a, &mut tuple).unwrap();
    let pid = tuple.record_id().unwrap().page_id;

    fixture.bp.flush_page(pid).unwrap();
    assert_eq!(fixture.bp.cached_pages(), 1);

    // the page is clean now, so abort has nothing to discard
    fixture.bp.transaction_complete(tid, false).unwrap();
    assert_eq!(scan_values(&fixture.bp, fixture.table_a), HashSet::from([5]));
}

#[test]
fn test_discard_page_forces_reread() {
    let fixture = create_fixture(10);
    insert_committed(&fixture.bp, fixture.table_a, &[9]);

    let pid = PageId::new(fixture.table_a, 0);
    fixture.bp.discard_page(pid);
    assert_eq!(fixture.bp.cached_pages(), 0);
    assert_eq!(scan_values(&fixture.bp, fixture.table_a), HashSet::from([9]));
}

#[test]
fn test_write_page_directly_then_scan() {
    let fixture = create_fixture(10);
    let file = fixture.bp.catalog().file(fixture.table_a).unwrap();

    let pid = PageId::new(fixture.table_a, 0);
    let mut page = HeapPage::new_empty(pid, file.tuple_desc().clone());
    let mut tuple = Tuple::new(file.tuple_desc().clone(), vec![Field::Int(77)]);
    page.insert_tuple(&mut tuple).unwrap();
    file.write_page(&page).unwrap();

    assert_eq!(scan_values(&fixture.bp, fixture.table_a), HashSet::from([77]));
}

#[test]
fn test_concurrent_inserts_are_all_visible() {
    let fixture = create_fixture(20);
    let threads = 4;
    let per_thread = 50;

    let handles: Vec<_> = (0..threads)
        .map(|t| {
            let bp = fixture.bp.clone();
            let table_id = fixture.table_a;
            thread::spawn(move || {
                let desc = int_desc();
                let mut rng = rand::thread_rng();
                let tid = TransactionId::new();
                for i in 0..per_thread {
                    let mut tuple =
                        Tuple::new(desc.clone(), vec![Field::Int(t * per_thread + i)]);
                    bp.insert_tuple(tid, table_id, &mut tuple).unwrap();
                    if rng.gen_bool(0.1) {
                        thread::yield_now();
                    }
                }
                bp.transaction_complete(tid, true).unwrap();
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let expected: HashSet<i32> = (0..threads * per_thread).collect();
    assert_eq!(scan_values(&fixture.bp, fixture.table_a), expected);
}
