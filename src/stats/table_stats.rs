use std::collections::HashMap;
use std::sync::Arc;

use log::debug;
use parking_lot::Mutex;

use crate::buffer::BufferPool;
use crate::common::{config, MarlError, Result, TableId, TransactionId};
use crate::execution::{OpIterator, SeqScan};
use crate::tuple::{CmpOp, Field, FieldType};

use super::{string_histogram::string_to_int, IntHistogram, StringHistogram};

/// Default I/O cost charged per page by the scan-cost estimate.
pub const DEFAULT_IO_COST_PER_PAGE: usize = 1000;

enum FieldHistogram {
    Int(IntHistogram),
    Str(StringHistogram),
}

/// The integer the statistics layer tracks for a field: the value itself
/// for ints, the order-preserving hash for strings.
fn stat_value(field: &Field) -> i32 {
    match field {
        Field::Int(v) => *v,
        Field::Str(s) => string_to_int(s),
    }
}

/// Per-table statistics: tuple count, page count, and one equi-width
/// histogram per field, built by two sequential scans (min/max discovery,
/// then population). Drives the planner's selectivity and cost estimates.
pub struct TableStats {
    io_cost_per_page: usize,
    num_pages: usize,
    total_tuples: usize,
    histograms: Vec<FieldHistogram>,
}

impl TableStats {
    /// Scans `table_id` and builds its statistics. The scan runs in its own
    /// transaction, committed (releasing the scan locks) before returning.
    pub fn build(
        bp: &Arc<BufferPool>,
        table_id: TableId,
        io_cost_per_page: usize,
    ) -> Result<Self> {
        let tid = TransactionId::new();
        let stats = Self::scan_table(bp, tid, table_id, io_cost_per_page);
        bp.transaction_complete(tid, stats.is_ok())?;
        stats
    }

    fn scan_table(
        bp: &Arc<BufferPool>,
        tid: TransactionId,
        table_id: TableId,
        io_cost_per_page: usize,
    ) -> Result<Self> {
        let file = bp.catalog().file(table_id)?;
        let desc = file.tuple_desc().clone();
        let num_fields = desc.field_count();

        let mut mins = vec![i32::MAX; num_fields];
        let mut maxs = vec![i32::MIN; num_fields];
        let mut total_tuples = 0;

        let mut scan = SeqScan::new(bp.clone(), tid, table_id)?;
        scan.open()?;
        while scan.has_next()? {
            let tuple = scan.next()?;
            total_tuples += 1;
            for i in 0..num_fields {
                let v = stat_value(tuple.value(i));
                mins[i] = mins[i].min(v);
                maxs[i] = maxs[i].max(v);
            }
        }

        let mut histograms: Vec<FieldHistogram> = (0..num_fields)
            .map(|i| match desc.field_type(i) {
                FieldType::Int => {
                    // an empty table has no observed bounds; use a point domain
                    let (lo, hi) = if total_tuples == 0 {
                        (0, 0)
                    } else {
                        (mins[i], maxs[i])
                    };
                    FieldHistogram::Int(IntHistogram::new(config::NUM_HIST_BUCKETS, lo, hi))
                }
                FieldType::Str(_) => {
                    FieldHistogram::Str(StringHistogram::new(config::NUM_HIST_BUCKETS))
                }
            })
            .collect();

        scan.rewind()?;
        while scan.has_next()? {
            let tuple = scan.next()?;
            for (i, histogram) in histograms.iter_mut().enumerate() {
                match (histogram, tuple.value(i)) {
                    (FieldHistogram::Int(h), Field::Int(v)) => h.add_value(*v),
                    (FieldHistogram::Str(h), Field::Str(s)) => h.add_value(s),
                    _ => unreachable!("tuple field diverges from its schema"),
                }
            }
        }
        scan.close();

        Ok(Self {
            io_cost_per_page,
            num_pages: file.num_pages()?,
            total_tuples,
            histograms,
        })
    }

    /// Cost of a full sequential scan: every page is read whole, regardless
    /// of how many tuples it holds.
    pub fn estimate_scan_cost(&self) -> f64 {
        (self.num_pages * self.io_cost_per_page) as f64
    }

    /// Expected cardinality of a scan filtered with the given selectivity.
    pub fn estimate_table_cardinality(&self, selectivity: f64) -> usize {
        (self.total_tuples as f64 * selectivity).round() as usize
    }

    /// Estimated selectivity of `field op constant` over the table.
    pub fn estimate_selectivity(&self, field: usize, op: CmpOp, constant: &Field) -> Result<f64> {
        match (&self.histograms[field], constant) {
            (FieldHistogram::Int(h), Field::Int(v)) => Ok(h.estimate_selectivity(op, *v)),
            (FieldHistogram::Str(h), Field::Str(s)) => Ok(h.estimate_selectivity(op, s)),
            (_, constant) => Err(MarlError::TypeMismatch(format!(
                "constant {} does not match field {} type",
                constant, field
            ))),
        }
    }

    /// Expected selectivity of `field op ?` when the operand is unknown.
    pub fn avg_selectivity(&self, field: usize, _op: CmpOp) -> f64 {
        match &self.histograms[field] {
            FieldHistogram::Int(h) => h.avg_selectivity(),
            FieldHistogram::Str(h) => h.avg_selectivity(),
        }
    }

    /// Total number of tuples in the table.
    pub fn total_tuples(&self) -> usize {
        self.total_tuples
    }
}

/// Table-name-keyed statistics registry. One per process, constructed by the
/// embedding application and passed to the planner; tests build fresh ones.
#[derive(Default)]
pub struct StatsRegistry {
    map: Mutex<HashMap<String, Arc<TableStats>>>,
}

impl StatsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, table_name: &str) -> Option<Arc<TableStats>> {
        self.map.lock().get(table_name).cloned()
    }

    pub fn set(&self, table_name: impl Into<String>, stats: Arc<TableStats>) {
        self.map.lock().insert(table_name.into(), stats);
    }

    /// Builds statistics for every table in the catalog.
    pub fn compute_statistics(&self, bp: &Arc<BufferPool>) -> Result<()> {
        for table_id in bp.catalog().table_ids() {
            let name = bp.catalog().table_name(table_id)?;
            debug!("computing statistics for table {}", name);
            let stats = TableStats::build(bp, table_id, DEFAULT_IO_COST_PER_PAGE)?;
            self.set(name, Arc::new(stats));
        }
        Ok(())
    }
}
