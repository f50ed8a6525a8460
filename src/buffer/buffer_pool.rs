use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use log::debug;
use parking_lot::{Mutex, RwLock};

use crate::catalog::Catalog;
use crate::common::{config, MarlError, PageId, Result, TableId, TransactionId};
use crate::storage::HeapPage;
use crate::tuple::Tuple;

use super::lock_manager::{LockManager, Permissions};

/// A cached page shared between the pool and its readers/writers. The
/// `RwLock` is the per-page latch; logical exclusion between transactions is
/// the lock manager's job.
pub type PageHandle = Arc<RwLock<HeapPage>>;

/// BufferPool caches up to a fixed number of heap pages in memory and routes
/// every page access through the page-level lock manager: fetching a page
/// first acquires the lock the requested permission implies, blocking (with a
/// bounded wait) while another transaction holds a conflicting one.
///
/// Eviction is NO-STEAL: only clean pages leave the cache, so a page dirtied
/// by a live transaction is never written ahead of its commit. When every
/// resident page is dirty the pool reports `BufferFull` instead of stealing.
/// Commit flushes the transaction's dirty pages; abort discards them so the
/// next access re-reads the on-disk image.
pub struct BufferPool {
    capacity: usize,
    catalog: Arc<Catalog>,
    lock_manager: LockManager,
    cache: Mutex<HashMap<PageId, PageHandle>>,
}

impl BufferPool {
    /// Creates a pool with the default capacity.
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self::with_capacity(catalog, config::DEFAULT_POOL_SIZE)
    }

    /// Creates a pool caching at most `capacity` pages.
    pub fn with_capacity(catalog: Arc<Catalog>, capacity: usize) -> Self {
        Self {
            capacity,
            catalog,
            lock_manager: LockManager::default(),
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Replaces the lock-acquisition timeout (the deadlock bound).
    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_manager = LockManager::new(timeout);
        self
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of pages currently cached.
    pub fn cached_pages(&self) -> usize {
        self.cache.lock().len()
    }

    /// Fetches a page on behalf of `tid`, locking it according to `perm`
    /// (READ_ONLY acquires shared, READ_WRITE exclusive). Blocks while a
    /// conflicting lock is held; a cache miss reads the page through its
    /// heap file, evicting a clean page first when the pool is full.
    pub fn get_page(
        &self,
        tid: TransactionId,
        pid: PageId,
        perm: Permissions,
    ) -> Result<PageHandle> {
        self.lock_manager.acquire(tid, pid, perm.into())?;

        let mut cache = self.cache.lock();
        if let Some(handle) = cache.get(&pid) {
            return Ok(handle.clone());
        }
        if cache.len() >= self.capacity {
            self.evict_locked(&mut cache)?;
        }
        let file = self.catalog.file(pid.table)?;
        let page = file.read_page(pid)?;
        let handle = Arc::new(RwLock::new(page));
        cache.insert(pid, handle.clone());
        Ok(handle)
    }

    /// Inserts a tuple into `table_id` on behalf of `tid`. The heap file
    /// picks (or appends) the target page under an exclusive lock; every
    /// page it modified is marked dirty with `tid` and reinstated in the
    /// cache. The tuple's record id is set on return.
    pub fn insert_tuple(
        &self,
        tid: TransactionId,
        table_id: TableId,
        tuple: &mut Tuple,
    ) -> Result<()> {
        let file = self.catalog.file(table_id)?;
        let dirtied = file.insert_tuple(self, tid, tuple)?;
        self.admit_dirty(tid, dirtied)
    }

    /// Deletes the tuple its record id names, on behalf of `tid`.
    pub fn delete_tuple(&self, tid: TransactionId, tuple: &Tuple) -> Result<()> {
        let rid = tuple
            .record_id()
            .ok_or(MarlError::TupleNotOnPage(PageId::new(0, 0)))?;
        let file = self.catalog.file(rid.page_id.table)?;
        let dirtied = file.delete_tuple(self, tid, tuple)?;
        self.admit_dirty(tid, dirtied)
    }

    fn admit_dirty(&self, tid: TransactionId, pages: Vec<PageHandle>) -> Result<()> {
        let mut cache = self.cache.lock();
        for handle in pages {
            let pid = {
                let mut page = handle.write();
                page.mark_dirty(Some(tid));
                page.id()
            };
            if !cache.contains_key(&pid) && cache.len() >= self.capacity {
                self.evict_locked(&mut cache)?;
            }
            cache.insert(pid, handle);
        }
        Ok(())
    }

    /// Evicts one clean page. NO-STEAL: a dirty page never leaves the cache
    /// before the transaction that dirtied it resolves.
    fn evict_locked(&self, cache: &mut HashMap<PageId, PageHandle>) -> Result<()> {
        let victim = cache
            .iter()
            .find(|(_, handle)| handle.read().dirtied_by().is_none())
            .map(|(pid, _)| *pid);
        match victim {
            Some(pid) => {
                debug!("evicting clean page {}", pid);
                cache.remove(&pid);
                Ok(())
            }
            None => Err(MarlError::BufferFull),
        }
    }

    /// Writes a page's image to disk if it is resident and dirty, clearing
    /// the dirty bit but keeping the page cached.
    pub fn flush_page(&self, pid: PageId) -> Result<()> {
        let handle = self.cache.lock().get(&pid).cloned();
        if let Some(handle) = handle {
            let mut page = handle.write();
            if page.dirtied_by().is_some() {
                debug!("flushing page {}", pid);
                let file = self.catalog.file(pid.table)?;
                file.write_page(&page)?;
                page.mark_dirty(None);
            }
        }
        Ok(())
    }

    /// Flushes every resident page.
    pub fn flush_all_pages(&self) -> Result<()> {
        let pids: Vec<PageId> = self.cache.lock().keys().copied().collect();
        for pid in pids {
            self.flush_page(pid)?;
        }
        Ok(())
    }

    /// Flushes every cached page dirtied by `tid`.
    pub fn flush_pages(&self, tid: TransactionId) -> Result<()> {
        for pid in self.pages_dirtied_by(tid) {
            self.flush_page(pid)?;
        }
        Ok(())
    }

    /// Drops a page from the cache without writing it. The next access
    /// re-reads the on-disk image.
    pub fn discard_page(&self, pid: PageId) {
        self.cache.lock().remove(&pid);
    }

    /// Finishes a transaction. Commit flushes the pages it dirtied; abort
    /// discards them. Either way every lock the transaction holds is
    /// released.
    pub fn transaction_complete(&self, tid: TransactionId, commit: bool) -> Result<()> {
        if commit {
            self.flush_pages(tid)?;
        } else {
            for pid in self.pages_dirtied_by(tid) {
                debug!("discarding page {} dirtied by aborted {}", pid, tid);
                self.discard_page(pid);
            }
        }
        self.lock_manager.release_all(tid);
        Ok(())
    }

    fn pages_dirtied_by(&self, tid: TransactionId) -> Vec<PageId> {
        self.cache
            .lock()
            .iter()
            .filter(|(_, handle)| handle.read().dirtied_by() == Some(tid))
            .map(|(pid, _)| *pid)
            .collect()
    }

    /// Releases `tid`'s lock on one page early, outside of the two-phase
    /// protocol. Callers own the consistency consequences.
    pub fn release_page(&self, tid: TransactionId, pid: PageId) {
        self.lock_manager.release(tid, pid);
    }

    /// Reports whether `tid` holds a lock on `pid`.
    pub fn holds_lock(&self, tid: TransactionId, pid: PageId) -> bool {
        self.lock_manager.holds(tid, pid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::HeapFile;
    use crate::tuple::{Field, FieldType, TupleDesc};
    use tempfile::TempDir;

    fn create_pool(capacity: usize) -> (Arc<BufferPool>, TableId, TempDir) {
        let dir = TempDir::new().unwrap();
        let desc = TupleDesc::with_types(vec![FieldType::Int]).into_arc();
        let file = Arc::new(HeapFile::open(dir.path().join("t.dat"), desc).unwrap());
        let catalog = Arc::new(Catalog::new());
        let table_id = catalog.add_table(file, "t");
        (
            Arc::new(BufferPool::with_capacity(catalog, capacity)),
            table_id,
            dir,
        )
    }

    fn int_tuple(bp: &BufferPool, table_id: TableId, v: i32) -> Tuple {
        let desc = bp.catalog().tuple_desc(table_id).unwrap();
        Tuple::new(desc, vec![Field::Int(v)])
    }

    #[test]
    fn test_get_page_caches_and_locks() {
        let (bp, table_id, _dir) = create_pool(10);

        let tid = TransactionId::new();
        let mut tuple = int_tuple(&bp, table_id, 1);
        bp.insert_tuple(tid, table_id, &mut tuple).unwrap();
        let pid = tuple.record_id().unwrap().page_id;
        assert!(bp.holds_lock(tid, pid));
        assert_eq!(bp.cached_pages(), 1);

        // a second fetch by the same transaction hits the cache
        let first = bp.get_page(tid, pid, Permissions::ReadWrite).unwrap();
        let second = bp.get_page(tid, pid, Permissions::ReadWrite).unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        bp.transaction_complete(tid, true).unwrap();
        assert!(!bp.holds_lock(tid, pid));
    }

    #[test]
    fn test_commit_flushes_and_cleans() {
        let (bp, table_id, _dir) = create_pool(10);

        let tid = TransactionId::new();
        let mut tuple = int_tuple(&bp, table_id, 2);
        bp.insert_tuple(tid, table_id, &mut tuple).unwrap();
        let pid = tuple.record_id().unwrap().page_id;

        {
            let handle = bp.get_page(tid, pid, Permissions::ReadWrite).unwrap();
            assert_eq!(handle.read().dirtied_by(), Some(tid));
        }
        bp.transaction_complete(tid, true).unwrap();

        let tid = TransactionId::new();
        let handle = bp.get_page(tid, pid, Permissions::ReadOnly).unwrap();
        assert_eq!(handle.read().dirtied_by(), None);
        assert_eq!(handle.read().tuple_count(), 1);
        bp.transaction_complete(tid, true).unwrap();

        // the flushed image is on disk
        let file = bp.catalog().file(table_id).unwrap();
        assert_eq!(file.read_page(pid).unwrap().tuple_count(), 1);
    }

    #[test]
    fn test_abort_restores_disk_image() {
        let (bp, table_id, _dir) = create_pool(10);

        let tid = TransactionId::new();
        let mut tuple = int_tuple(&bp, table_id, 1);
        bp.insert_tuple(tid, table_id, &mut tuple).unwrap();
        bp.transaction_complete(tid, true).unwrap();

        let tid = TransactionId::new();
        let pid = tuple.record_id().unwrap().page_id;
        let mut doomed = int_tuple(&bp, table_id, 2);
        bp.insert_tuple(tid, table_id, &mut doomed).unwrap();
        bp.transaction_complete(tid, false).unwrap();

        let tid = TransactionId::new();
        let handle = bp.get_page(tid, pid, Permissions::ReadOnly).unwrap();
        assert_eq!(handle.read().tuple_count(), 1);
        bp.transaction_complete(tid, true).unwrap();
    }

    #[test]
    fn test_capacity_bound_holds() {
        let (bp, table_id, _dir) = create_pool(2);
        assert_eq!(bp.capacity(), 2);

        // four clean pages on disk, read through a two-page cache
        let file = bp.catalog().file(table_id).unwrap();
        let desc = file.tuple_desc().clone();
        for page_no in 0..4 {
            let page = HeapPage::new_empty(PageId::new(table_id, page_no), desc.clone());
            file.write_page(&page).unwrap();
        }

        let tid = TransactionId::new();
        for page_no in 0..4 {
            bp.get_page(tid, PageId::new(table_id, page_no), Permissions::ReadOnly)
                .unwrap();
            assert!(bp.cached_pages() <= 2);
        }
        bp.transaction_complete(tid, true).unwrap();
    }
}
