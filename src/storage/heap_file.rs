use std::collections::hash_map::DefaultHasher;
use std::fs::{File, OpenOptions};
use std::hash::{Hash, Hasher};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::debug;
use parking_lot::Mutex;

use crate::buffer::{BufferPool, PageHandle, Permissions};
use crate::common::{config, MarlError, PageId, Result, TableId, TransactionId};
use crate::tuple::{Tuple, TupleDesc};

use super::HeapPage;

/// A table's on-disk backing store: a sequence of fixed-size heap pages.
///
/// Page `p` lives at byte offset `p * page_size`; the file length stays a
/// multiple of the page size. The table id is a stable hash of the file's
/// absolute path, so reopening the same file yields the same id.
///
/// All page access from query execution goes through the buffer pool, which
/// holds the page-level locks; `read_page`/`write_page` are the raw I/O the
/// pool itself uses.
pub struct HeapFile {
    file: Mutex<File>,
    path: PathBuf,
    id: TableId,
    desc: Arc<TupleDesc>,
}

impl HeapFile {
    /// Opens (creating if absent) the heap file at `path`.
    pub fn open<P: AsRef<Path>>(path: P, desc: Arc<TupleDesc>) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path.as_ref())?;
        let path = std::fs::canonicalize(path.as_ref())?;
        let id = stable_table_id(&path);
        Ok(Self {
            file: Mutex::new(file),
            path,
            id,
            desc,
        })
    }

    /// Returns the table id.
    pub fn id(&self) -> TableId {
        self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn tuple_desc(&self) -> &Arc<TupleDesc> {
        &self.desc
    }

    /// Returns the number of pages in the file.
    pub fn num_pages(&self) -> Result<usize> {
        let len = self.file.lock().metadata()?.len() as usize;
        let page_size = config::page_size();
        Ok((len + page_size - 1) / page_size)
    }

    /// Reads a page from disk.
    ///
    /// Fails with `InvalidPage` when the page lies beyond the file length or
    /// the read comes up short.
    pub fn read_page(&self, pid: PageId) -> Result<HeapPage> {
        debug_assert_eq!(pid.table, self.id, "page belongs to another table");
        let page_size = config::page_size();
        let offset = pid.page_no as u64 * page_size as u64;

        let mut file = self.file.lock();
        let len = file.metadata()?.len();
        if offset + page_size as u64 > len {
            return Err(MarlError::InvalidPage(pid));
        }
        file.seek(SeekFrom::Start(offset))?;
        let mut data = vec![0; page_size];
        file.read_exact(&mut data)
            .map_err(|_| MarlError::InvalidPage(pid))?;
        drop(file);

        HeapPage::deserialize(pid, self.desc.clone(), &data)
    }

    /// Writes a page's image to disk at its offset, extending the file if
    /// needed.
    pub fn write_page(&self, page: &HeapPage) -> Result<()> {
        let data = page.serialize();
        let offset = page.id().page_no as u64 * config::page_size() as u64;

        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(&data)?;
        file.flush()?;
        Ok(())
    }

    /// Appends a zeroed page to the file and returns its page number.
    fn append_empty_page(&self) -> Result<u32> {
        let mut file = self.file.lock();
        let len = file.metadata()?.len();
        let page_no = (len / config::page_size() as u64) as u32;
        file.seek(SeekFrom::Start(len))?;
        file.write_all(&HeapPage::empty_page_data())?;
        file.flush()?;
        debug!("heap file {} grew to page {}", self.id, page_no);
        Ok(page_no)
    }

    /// Inserts a tuple into the first page with a free slot, appending a new
    /// page when every existing one is full. Pages are acquired READ_WRITE
    /// through the buffer pool; the modified page list is returned for the
    /// pool to mark dirty and reinstate.
    pub fn insert_tuple(
        &self,
        bp: &BufferPool,
        tid: TransactionId,
        tuple: &mut Tuple,
    ) -> Result<Vec<PageHandle>> {
        let num_pages = self.num_pages()?;
        for page_no in 0..num_pages {
            let pid = PageId::new(self.id, page_no as u32);
            let handle = bp.get_page(tid, pid, Permissions::ReadWrite)?;
            let mut page = handle.write();
            if page.num_empty_slots() > 0 {
                page.insert_tuple(tuple)?;
                drop(page);
                return Ok(vec![handle]);
            }
        }

        let page_no = self.append_empty_page()?;
        let handle = bp.get_page(tid, PageId::new(self.id, page_no), Permissions::ReadWrite)?;
        handle.write().insert_tuple(tuple)?;
        Ok(vec![handle])
    }

    /// Deletes a tuple from the page its record id names. The page is
    /// acquired READ_WRITE through the buffer pool and returned for the pool
    /// to mark dirty.
    pub fn delete_tuple(
        &self,
        bp: &BufferPool,
        tid: TransactionId,
        tuple: &Tuple,
    ) -> Result<Vec<PageHandle>> {
        let rid = tuple
            .record_id()
            .ok_or(MarlError::TupleNotOnPage(PageId::new(self.id, 0)))?;
        let handle = bp.get_page(tid, rid.page_id, Permissions::ReadWrite)?;
        handle.write().delete_tuple(tuple)?;
        Ok(vec![handle])
    }

    /// Returns a lazy scan over every tuple in the file on behalf of `tid`.
    /// Pages are acquired READ_ONLY one at a time as the scan advances.
    pub fn scan(self: &Arc<Self>, bp: Arc<BufferPool>, tid: TransactionId) -> HeapFileScan {
        HeapFileScan {
            file: self.clone(),
            bp,
            tid,
            next_page_no: 0,
            current: Vec::new().into_iter(),
            lookahead: None,
            opened: false,
        }
    }
}

fn stable_table_id(path: &Path) -> TableId {
    let mut hasher = DefaultHasher::new();
    path.to_string_lossy().hash(&mut hasher);
    hasher.finish() as TableId
}

/// Page-by-page tuple scan over a heap file.
///
/// Follows the open/has_next/next/rewind/close protocol of the operator
/// layer; a closed (or never-opened) scan yields nothing.
pub struct HeapFileScan {
    file: Arc<HeapFile>,
    bp: Arc<BufferPool>,
    tid: TransactionId,
    next_page_no: usize,
    current: std::vec::IntoIter<Tuple>,
    lookahead: Option<Tuple>,
    opened: bool,
}

impl HeapFileScan {
    pub fn open(&mut self) -> Result<()> {
        self.opened = true;
        self.next_page_no = 0;
        self.current = Vec::new().into_iter();
        self.lookahead = None;
        Ok(())
    }

    pub fn has_next(&mut self) -> Result<bool> {
        if !self.opened {
            return Ok(false);
        }
        if self.lookahead.is_none() {
            self.lookahead = self.advance()?;
        }
        Ok(self.lookahead.is_some())
    }

    pub fn next(&mut self) -> Result<Tuple> {
        self.has_next()?;
        self.lookahead.take().ok_or(MarlError::NoMoreTuples)
    }

    pub fn rewind(&mut self) -> Result<()> {
        self.close();
        self.open()
    }

    pub fn close(&mut self) {
        self.opened = false;
        self.current = Vec::new().into_iter();
        self.lookahead = None;
    }

    fn advance(&mut self) -> Result<Option<Tuple>> {
        loop {
            if let Some(tuple) = self.current.next() {
                return Ok(Some(tuple));
            }
            if self.next_page_no >= self.file.num_pages()? {
                return Ok(None);
            }
            let pid = PageId::new(self.file.id(), self.next_page_no as u32);
            self.next_page_no += 1;
            let handle = self.bp.get_page(self.tid, pid, Permissions::ReadOnly)?;
            let tuples: Vec<Tuple> = handle.read().iter().cloned().collect();
            self.current = tuples.into_iter();
        }
    }
}
