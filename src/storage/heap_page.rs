use std::sync::Arc;

use crate::common::{config, MarlError, PageId, RecordId, Result, TransactionId};
use crate::tuple::{Tuple, TupleDesc};

/// Heap page layout:
///
/// +--------------------+
/// | Header Bitmap      |  ceil(S / 8) bytes
/// +--------------------+
/// | Tuple Slot 0       |  tuple_size bytes each
/// | Tuple Slot 1       |
/// | ...                |
/// | Tuple Slot S-1     |
/// +--------------------+
/// | Zero Padding       |
/// +--------------------+
///
/// `S = floor((page_size * 8) / (tuple_size * 8 + 1))`. Bit `i` of the
/// header (LSB-first within each byte) marks slot `i` used. Bytes of unused
/// slots are ignored on read and zeroed on write.
#[derive(Debug)]
pub struct HeapPage {
    pid: PageId,
    desc: Arc<TupleDesc>,
    num_slots: usize,
    header: Vec<u8>,
    slots: Vec<Option<Tuple>>,
    dirty: Option<TransactionId>,
}

impl HeapPage {
    /// Number of tuple slots a page holds under the given schema, at the
    /// current page size.
    pub fn slots_per_page(desc: &TupleDesc) -> usize {
        (config::page_size() * 8) / (desc.tuple_size() * 8 + 1)
    }

    /// Number of header bytes needed for `num_slots` slot bits.
    pub fn header_size(num_slots: usize) -> usize {
        (num_slots + 7) / 8
    }

    /// The byte form of an empty page: all zeros.
    pub fn empty_page_data() -> Vec<u8> {
        vec![0; config::page_size()]
    }

    /// Creates an empty page.
    pub fn new_empty(pid: PageId, desc: Arc<TupleDesc>) -> Self {
        let num_slots = Self::slots_per_page(&desc);
        Self {
            pid,
            desc,
            num_slots,
            header: vec![0; Self::header_size(num_slots)],
            slots: vec![None; num_slots],
            dirty: None,
        }
    }

    /// Parses a page from its on-disk byte form.
    ///
    /// Fails with `CorruptPage` when the buffer is not exactly one page long
    /// or a used slot does not parse. Bytes of unused slots are skipped
    /// without inspection; they are not required to be zero.
    pub fn deserialize(pid: PageId, desc: Arc<TupleDesc>, data: &[u8]) -> Result<Self> {
        let page_size = config::page_size();
        if data.len() != page_size {
            return Err(MarlError::CorruptPage(
                pid,
                format!("expected {} bytes, got {}", page_size, data.len()),
            ));
        }

        let num_slots = Self::slots_per_page(&desc);
        let header_size = Self::header_size(num_slots);
        let header = data[..header_size].to_vec();
        let tuple_size = desc.tuple_size();

        let mut slots = Vec::with_capacity(num_slots);
        for i in 0..num_slots {
            if header[i / 8] & (1 << (i % 8)) == 0 {
                slots.push(None);
                continue;
            }
            let offset = header_size + i * tuple_size;
            let mut tuple = Tuple::from_bytes(desc.clone(), &data[offset..offset + tuple_size])
                .ok_or_else(|| {
                    MarlError::CorruptPage(pid, format!("slot {} does not parse", i))
                })?;
            tuple.set_record_id(Some(RecordId::new(pid, i)));
            slots.push(Some(tuple));
        }

        Ok(Self {
            pid,
            desc,
            num_slots,
            header,
            slots,
            dirty: None,
        })
    }

    /// Emits the on-disk byte form: header bitmap, slot payloads, zero
    /// padding to page size. Unused slots serialize as zeros.
    pub fn serialize(&self) -> Vec<u8> {
        let mut out = vec![0; config::page_size()];
        out[..self.header.len()].copy_from_slice(&self.header);

        let tuple_size = self.desc.tuple_size();
        for (i, slot) in self.slots.iter().enumerate() {
            if let Some(tuple) = slot {
                let offset = self.header.len() + i * tuple_size;
                out[offset..offset + tuple_size].copy_from_slice(&tuple.to_bytes());
            }
        }
        out
    }

    pub fn id(&self) -> PageId {
        self.pid
    }

    pub fn tuple_desc(&self) -> &Arc<TupleDesc> {
        &self.desc
    }

    pub fn num_slots(&self) -> usize {
        self.num_slots
    }

    /// Counts empty slots by scanning the header bitmap.
    pub fn num_empty_slots(&self) -> usize {
        (0..self.num_slots).filter(|&i| !self.is_slot_used(i)).count()
    }

    pub fn is_slot_used(&self, slot: usize) -> bool {
        slot < self.num_slots && self.header[slot / 8] & (1 << (slot % 8)) != 0
    }

    fn set_slot_used(&mut self, slot: usize, used: bool) {
        if used {
            self.header[slot / 8] |= 1 << (slot % 8);
        } else {
            self.header[slot / 8] &= !(1 << (slot % 8));
        }
    }

    /// Stores a tuple in the lowest-index empty slot and assigns its record
    /// id (both on the stored copy and on the caller's tuple).
    pub fn insert_tuple(&mut self, tuple: &mut Tuple) -> Result<RecordId> {
        if *tuple.desc().as_ref() != *self.desc {
            return Err(MarlError::TupleDescMismatch);
        }
        let slot = (0..self.num_slots)
            .find(|&i| !self.is_slot_used(i))
            .ok_or(MarlError::PageFull(self.pid))?;

        let rid = RecordId::new(self.pid, slot);
        tuple.set_record_id(Some(rid));
        self.slots[slot] = Some(tuple.clone());
        self.set_slot_used(slot, true);
        Ok(rid)
    }

    /// Removes a tuple. The record id must name this page, its slot must be
    /// used, and the stored tuple must equal the argument.
    pub fn delete_tuple(&mut self, tuple: &Tuple) -> Result<()> {
        let rid = tuple
            .record_id()
            .filter(|rid| rid.page_id == self.pid)
            .ok_or(MarlError::TupleNotOnPage(self.pid))?;
        if rid.slot >= self.num_slots || !self.is_slot_used(rid.slot) {
            return Err(MarlError::TupleNotOnPage(self.pid));
        }
        if self.slots[rid.slot].as_ref() != Some(tuple) {
            return Err(MarlError::TupleNotOnPage(self.pid));
        }
        self.slots[rid.slot] = None;
        self.set_slot_used(rid.slot, false);
        Ok(())
    }

    /// One-shot iterator over the stored tuples in slot order.
    pub fn iter(&self) -> impl Iterator<Item = &Tuple> + '_ {
        self.slots.iter().filter_map(|slot| slot.as_ref())
    }

    /// Number of tuples on the page.
    pub fn tuple_count(&self) -> usize {
        self.num_slots - self.num_empty_slots()
    }

    /// Marks the page dirty on behalf of a transaction, or clean.
    pub fn mark_dirty(&mut self, tid: Option<TransactionId>) {
        self.dirty = tid;
    }

    /// Returns the transaction that dirtied this page, if any.
    pub fn dirtied_by(&self) -> Option<TransactionId> {
        self.dirty
    }
}
