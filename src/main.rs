use std::sync::Arc;

use marl::buffer::BufferPool;
use marl::catalog::Catalog;
use marl::execution::{
    Aggregate, AggregateOp, Filter, OpIterator, Predicate, SeqScan,
};
use marl::stats::StatsRegistry;
use marl::storage::HeapFile;
use marl::tuple::{CmpOp, Field, FieldType, Tuple, TupleDesc};
use marl::TransactionId;

fn main() {
    println!("Marl - a page-based relational storage and query engine");
    println!("=======================================================\n");

    let db_path = "demo.dat";

    // Define a table and register it
    let desc = TupleDesc::named(&[(FieldType::Int, "id"), (FieldType::Int, "score")]).into_arc();
    let file = Arc::new(HeapFile::open(db_path, desc.clone()).expect("failed to open heap file"));

    let catalog = Arc::new(Catalog::new());
    let table_id = catalog.add_table(file, "scores");
    let bp = Arc::new(BufferPool::new(catalog));
    println!("Created table 'scores' (id {})", table_id);

    // Insert a few rows
    let tid = TransactionId::new();
    for (id, score) in [(1, 70), (2, 85), (3, 90), (4, 85), (5, 60)] {
        let mut row = Tuple::new(desc.clone(), vec![Field::Int(id), Field::Int(score)]);
        bp.insert_tuple(tid, table_id, &mut row)
            .expect("failed to insert");
        println!("Inserted {} at {}", row, row.record_id().unwrap());
    }
    bp.transaction_complete(tid, true).expect("commit failed");
    println!();

    // Scan with a filter: score > 80
    let tid = TransactionId::new();
    let scan = SeqScan::new(bp.clone(), tid, table_id).expect("failed to build scan");
    let mut filter = Filter::new(
        Predicate::new(1, CmpOp::GreaterThan, Field::Int(80)),
        Box::new(scan),
    );
    filter.open().expect("failed to open filter");
    println!("Rows with score > 80:");
    while filter.has_next().expect("scan failed") {
        println!("  {}", filter.next().expect("scan failed"));
    }
    filter.close();

    // Aggregate: average score
    let scan = SeqScan::new(bp.clone(), tid, table_id).expect("failed to build scan");
    let mut avg =
        Aggregate::new(Box::new(scan), 1, None, AggregateOp::Avg).expect("failed to build avg");
    avg.open().expect("failed to open aggregate");
    println!("\nAverage score: {}", avg.next().expect("aggregate failed"));
    avg.close();
    bp.transaction_complete(tid, true).expect("commit failed");

    // Table statistics
    let registry = StatsRegistry::new();
    registry
        .compute_statistics(&bp)
        .expect("failed to compute statistics");
    let stats = registry.get("scores").unwrap();
    println!("\nTable statistics:");
    println!("  - Tuples: {}", stats.total_tuples());
    println!("  - Scan cost: {}", stats.estimate_scan_cost());
    println!(
        "  - Selectivity of score > 80: {:.2}",
        stats
            .estimate_selectivity(1, CmpOp::GreaterThan, &Field::Int(80))
            .unwrap()
    );

    // Clean up
    std::fs::remove_file(db_path).ok();
    println!("\nDemo completed successfully!");
}
