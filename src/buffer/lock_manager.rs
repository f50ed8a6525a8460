use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::warn;
use parking_lot::{Condvar, Mutex};

use crate::common::{config, MarlError, PageId, Result, TransactionId};

/// Access level a transaction requests on a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permissions {
    ReadOnly,
    ReadWrite,
}

/// Lock mode held on a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    Shared,
    Exclusive,
}

impl From<Permissions> for LockMode {
    fn from(perm: Permissions) -> Self {
        match perm {
            Permissions::ReadOnly => LockMode::Shared,
            Permissions::ReadWrite => LockMode::Exclusive,
        }
    }
}

struct LockEntry {
    holders: Vec<(TransactionId, LockMode)>,
    waiters: Arc<Condvar>,
}

enum Acquisition {
    Granted,
    Blocked,
}

/// Page-level shared/exclusive lock table.
///
/// Grant policy:
/// - no holders: grant
/// - requester already holds the page: same mode is idempotent; a held
///   exclusive lock subsumes a shared request; a sole shared holder upgrades
///   in place to exclusive
/// - otherwise a shared request joins an all-shared holder set; everything
///   else blocks
///
/// Blocked requests wait on the page's condition and retry on every release
/// of that page; fairness is not guaranteed. A request that waits longer
/// than the configured timeout fails with `TransactionAborted` - the bound
/// that stands in for deadlock detection.
pub struct LockManager {
    table: Mutex<HashMap<PageId, LockEntry>>,
    timeout: Duration,
}

impl LockManager {
    pub fn new(timeout: Duration) -> Self {
        Self {
            table: Mutex::new(HashMap::new()),
            timeout,
        }
    }

    /// Blocks until `tid` holds `pid` in (at least) the requested mode.
    pub fn acquire(&self, tid: TransactionId, pid: PageId, mode: LockMode) -> Result<()> {
        let deadline = Instant::now() + self.timeout;
        let mut table = self.table.lock();
        loop {
            match Self::try_acquire(&mut table, tid, pid, mode) {
                Acquisition::Granted => return Ok(()),
                Acquisition::Blocked => {
                    let waiters = table
                        .get(&pid)
                        .map(|entry| entry.waiters.clone())
                        .unwrap_or_default();
                    if waiters.wait_until(&mut table, deadline).timed_out() {
                        warn!("{} timed out waiting for {:?} on {}", tid, mode, pid);
                        return Err(MarlError::TransactionAborted(tid, pid));
                    }
                }
            }
        }
    }

    fn try_acquire(
        table: &mut HashMap<PageId, LockEntry>,
        tid: TransactionId,
        pid: PageId,
        mode: LockMode,
    ) -> Acquisition {
        let entry = table.entry(pid).or_insert_with(|| LockEntry {
            holders: Vec::new(),
            waiters: Arc::new(Condvar::new()),
        });

        if entry.holders.is_empty() {
            entry.holders.push((tid, mode));
            return Acquisition::Granted;
        }

        if let Some(held) = entry.holders.iter().position(|(t, _)| *t == tid) {
            let held_mode = entry.holders[held].1;
            return match (held_mode, mode) {
                // idempotent re-request, and exclusive subsumes shared
                (m, n) if m == n => Acquisition::Granted,
                (LockMode::Exclusive, LockMode::Shared) => Acquisition::Granted,
                (LockMode::Shared, LockMode::Exclusive) => {
                    if entry.holders.len() == 1 {
                        entry.holders[held].1 = LockMode::Exclusive;
                        Acquisition::Granted
                    } else {
                        Acquisition::Blocked
                    }
                }
                _ => unreachable!(),
            };
        }

        let all_shared = entry
            .holders
            .iter()
            .all(|(_, m)| *m == LockMode::Shared);
        if mode == LockMode::Shared && all_shared {
            entry.holders.push((tid, mode));
            Acquisition::Granted
        } else {
            Acquisition::Blocked
        }
    }

    /// Drops `tid`'s hold on `pid` (no-op when absent) and wakes the page's
    /// waiters.
    pub fn release(&self, tid: TransactionId, pid: PageId) {
        let mut table = self.table.lock();
        Self::release_locked(&mut table, tid, pid);
    }

    /// Releases every page `tid` holds.
    pub fn release_all(&self, tid: TransactionId) {
        let mut table = self.table.lock();
        let held: Vec<PageId> = table
            .iter()
            .filter(|(_, entry)| entry.holders.iter().any(|(t, _)| *t == tid))
            .map(|(pid, _)| *pid)
            .collect();
        for pid in held {
            Self::release_locked(&mut table, tid, pid);
        }
    }

    fn release_locked(table: &mut HashMap<PageId, LockEntry>, tid: TransactionId, pid: PageId) {
        if let Some(entry) = table.get_mut(&pid) {
            entry.holders.retain(|(t, _)| *t != tid);
            let waiters = entry.waiters.clone();
            if entry.holders.is_empty() {
                table.remove(&pid);
            }
            waiters.notify_all();
        }
    }

    /// Reports whether `tid` holds a lock on `pid` in any mode.
    pub fn holds(&self, tid: TransactionId, pid: PageId) -> bool {
        self.table
            .lock()
            .get(&pid)
            .map(|entry| entry.holders.iter().any(|(t, _)| *t == tid))
            .unwrap_or(false)
    }
}

impl Default for LockManager {
    fn default() -> Self {
        Self::new(config::DEFAULT_LOCK_TIMEOUT)
    }
}
