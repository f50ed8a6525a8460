use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::common::{MarlError, Result};
use crate::tuple::{Field, FieldType, Tuple, TupleDesc};

use super::{OpIterator, TupleIterator};

/// Supported aggregate operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateOp {
    Min,
    Max,
    Sum,
    Avg,
    Count,
}

impl fmt::Display for AggregateOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AggregateOp::Min => "MIN",
            AggregateOp::Max => "MAX",
            AggregateOp::Sum => "SUM",
            AggregateOp::Avg => "AVG",
            AggregateOp::Count => "COUNT",
        };
        write!(f, "{}", s)
    }
}

/// Per-group accumulator state, one variant per operator.
///
/// AVG carries separate sum and count and divides only on emission.
#[derive(Debug)]
enum AggState {
    Min(i32),
    Max(i32),
    Sum(i32),
    Avg { sum: i64, count: i64 },
    Count(i32),
}

impl AggState {
    fn init(op: AggregateOp, value: Option<i32>) -> Self {
        match (op, value) {
            (AggregateOp::Min, Some(v)) => AggState::Min(v),
            (AggregateOp::Max, Some(v)) => AggState::Max(v),
            (AggregateOp::Sum, Some(v)) => AggState::Sum(v),
            (AggregateOp::Avg, Some(v)) => AggState::Avg {
                sum: v as i64,
                count: 1,
            },
            (AggregateOp::Count, _) => AggState::Count(1),
            _ => unreachable!("numeric op without a numeric value"),
        }
    }

    fn merge(&mut self, value: Option<i32>) {
        match (self, value) {
            (AggState::Min(m), Some(v)) => *m = (*m).min(v),
            (AggState::Max(m), Some(v)) => *m = (*m).max(v),
            (AggState::Sum(s), Some(v)) => *s += v,
            (AggState::Avg { sum, count }, Some(v)) => {
                *sum += v as i64;
                *count += 1;
            }
            (AggState::Count(c), _) => *c += 1,
            _ => unreachable!("numeric op without a numeric value"),
        }
    }

    fn emit(&self) -> i32 {
        match self {
            AggState::Min(v) | AggState::Max(v) | AggState::Sum(v) | AggState::Count(v) => *v,
            AggState::Avg { sum, count } => sum.div_euclid(*count) as i32,
        }
    }
}

/// Computes one aggregate over a tuple stream, optionally grouped by a
/// second field. Feed tuples with [`merge`](Aggregator::merge), then read the
/// per-group results from [`iterator`](Aggregator::iterator).
///
/// The group key is the group-by field's value (int or string); without
/// grouping every tuple lands in a single synthetic group. Result rows carry
/// no particular group order.
#[derive(Debug)]
pub struct Aggregator {
    group_by: Option<(usize, FieldType)>,
    agg_field: usize,
    op: AggregateOp,
    groups: HashMap<Option<Field>, AggState>,
}

impl Aggregator {
    /// Creates an aggregator over `agg_field` (whose declared type is
    /// `agg_type`), grouped by `group_by` when present.
    ///
    /// Fails with `UnsupportedOp` for a numeric operator over a string
    /// field; only COUNT applies to strings.
    pub fn new(
        group_by: Option<(usize, FieldType)>,
        agg_field: usize,
        agg_type: FieldType,
        op: AggregateOp,
    ) -> Result<Self> {
        if op != AggregateOp::Count && !matches!(agg_type, FieldType::Int) {
            return Err(MarlError::UnsupportedOp(format!(
                "{} over a {} field",
                op, agg_type
            )));
        }
        Ok(Self {
            group_by,
            agg_field,
            op,
            groups: HashMap::new(),
        })
    }

    /// Folds one tuple into its group.
    ///
    /// Fails with `TypeMismatch` when the tuple's group-by field does not
    /// match the declared group type, or a numeric operator meets a non-int
    /// aggregate value.
    pub fn merge(&mut self, tuple: &Tuple) -> Result<()> {
        let key = match self.group_by {
            None => None,
            Some((field, ty)) => {
                let value = tuple.value(field);
                if !value.matches(ty) {
                    return Err(MarlError::TypeMismatch(format!(
                        "group field {} is not a {}",
                        value, ty
                    )));
                }
                Some(value.clone())
            }
        };

        let value = match tuple.value(self.agg_field) {
            Field::Int(v) => Some(*v),
            Field::Str(_) => None,
        };
        if value.is_none() && self.op != AggregateOp::Count {
            return Err(MarlError::TypeMismatch(format!(
                "{} requires an int aggregate field",
                self.op
            )));
        }

        match self.groups.get_mut(&key) {
            Some(state) => state.merge(value),
            None => {
                self.groups.insert(key, AggState::init(self.op, value));
            }
        }
        Ok(())
    }

    /// Schema of the result rows: `(aggregateVal)` without grouping,
    /// `(groupVal, aggregateVal)` with.
    pub fn result_desc(&self) -> Arc<TupleDesc> {
        match self.group_by {
            None => TupleDesc::new(
                vec![FieldType::Int],
                vec![Some("aggregateVal".to_string())],
            )
            .into_arc(),
            Some((_, gb_type)) => TupleDesc::new(
                vec![gb_type, FieldType::Int],
                vec![Some("groupVal".to_string()), Some("aggregateVal".to_string())],
            )
            .into_arc(),
        }
    }

    /// Returns an operator over the per-group results.
    pub fn iterator(&self) -> TupleIterator {
        let desc = self.result_desc();
        let tuples = self
            .groups
            .iter()
            .map(|(key, state)| {
                let agg = Field::Int(state.emit());
                match key {
                    None => Tuple::new(desc.clone(), vec![agg]),
                    Some(group) => Tuple::new(desc.clone(), vec![group.clone(), agg]),
                }
            })
            .collect();
        TupleIterator::new(desc, tuples)
    }
}

/// Iterator-model aggregation operator: drains its child into an
/// [`Aggregator`] on open and streams the result rows.
pub struct Aggregate {
    child: Box<dyn OpIterator>,
    group_by: Option<usize>,
    agg_field: usize,
    op: AggregateOp,
    desc: Arc<TupleDesc>,
    results: Option<TupleIterator>,
}

impl Aggregate {
    pub fn new(
        child: Box<dyn OpIterator>,
        agg_field: usize,
        group_by: Option<usize>,
        op: AggregateOp,
    ) -> Result<Self> {
        let aggregator = Self::make_aggregator(&*child, agg_field, group_by, op)?;
        let desc = aggregator.result_desc();
        Ok(Self {
            child,
            group_by,
            agg_field,
            op,
            desc,
            results: None,
        })
    }

    fn make_aggregator(
        child: &dyn OpIterator,
        agg_field: usize,
        group_by: Option<usize>,
        op: AggregateOp,
    ) -> Result<Aggregator> {
        let child_desc = child.tuple_desc();
        let group = group_by.map(|field| (field, child_desc.field_type(field)));
        Aggregator::new(group, agg_field, child_desc.field_type(agg_field), op)
    }

    pub fn op(&self) -> AggregateOp {
        self.op
    }
}

impl OpIterator for Aggregate {
    fn open(&mut self) -> Result<()> {
        let mut aggregator =
            Self::make_aggregator(&*self.child, self.agg_field, self.group_by, self.op)?;
        self.child.open()?;
        while self.child.has_next()? {
            aggregator.merge(&self.child.next()?)?;
        }
        let mut results = aggregator.iterator();
        results.open()?;
        self.results = Some(results);
        Ok(())
    }

    fn has_next(&mut self) -> Result<bool> {
        match self.results.as_mut() {
            Some(results) => results.has_next(),
            None => Ok(false),
        }
    }

    fn next(&mut self) -> Result<Tuple> {
        match self.results.as_mut() {
            Some(results) => results.next(),
            None => Err(MarlError::NoMoreTuples),
        }
    }

    fn rewind(&mut self) -> Result<()> {
        match self.results.as_mut() {
            Some(results) => results.rewind(),
            None => Ok(()),
        }
    }

    fn close(&mut self) {
        self.results = None;
        self.child.close();
    }

    fn tuple_desc(&self) -> Arc<TupleDesc> {
        self.desc.clone()
    }

    fn children(&self) -> Vec<&dyn OpIterator> {
        vec![self.child.as_ref()]
    }

    fn set_children(&mut self, mut children: Vec<Box<dyn OpIterator>>) {
        if let Some(child) = children.pop() {
            self.child = child;
        }
    }
}
