use std::sync::Arc;

use crate::common::{MarlError, Result};
use crate::tuple::{Tuple, TupleDesc};

use super::{OpIterator, Predicate};

/// Relational select: passes the child tuples satisfying a predicate.
/// The predicate is evaluated exactly once per child tuple.
pub struct Filter {
    predicate: Predicate,
    child: Box<dyn OpIterator>,
    lookahead: Option<Tuple>,
    opened: bool,
}

impl Filter {
    pub fn new(predicate: Predicate, child: Box<dyn OpIterator>) -> Self {
        Self {
            predicate,
            child,
            lookahead: None,
            opened: false,
        }
    }

    pub fn predicate(&self) -> &Predicate {
        &self.predicate
    }

    fn advance(&mut self) -> Result<Option<Tuple>> {
        while self.child.has_next()? {
            let tuple = self.child.next()?;
            if self.predicate.eval(&tuple) {
                return Ok(Some(tuple));
            }
        }
        Ok(None)
    }
}

impl OpIterator for Filter {
    fn open(&mut self) -> Result<()> {
        self.child.open()?;
        self.opened = true;
        self.lookahead = None;
        Ok(())
    }

    fn has_next(&mut self) -> Result<bool> {
        if !self.opened {
            return Ok(false);
        }
        if self.lookahead.is_none() {
            self.lookahead = self.advance()?;
        }
        Ok(self.lookahead.is_some())
    }

    fn next(&mut self) -> Result<Tuple> {
        self.has_next()?;
        self.lookahead.take().ok_or(MarlError::NoMoreTuples)
    }

    fn rewind(&mut self) -> Result<()> {
        self.child.rewind()?;
        self.lookahead = None;
        Ok(())
    }

    fn close(&mut self) {
        self.opened = false;
        self.lookahead = None;
        self.child.close();
    }

    fn tuple_desc(&self) -> Arc<TupleDesc> {
        self.child.tuple_desc()
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::TupleIterator;
    use crate::tuple::{CmpOp, Field, FieldType};

    fn int_source(values: &[i32]) -> Box<dyn OpIterator> {
        let desc = TupleDesc::with_types(vec![FieldType::Int]).into_arc();
        let tuples = values
            .iter()
            .map(|&v| Tuple::new(desc.clone(), vec![Field::Int(v)]))
            .collect();
        Box::new(TupleIterator::new(desc, tuples))
    }

    fn drain(op: &mut dyn OpIterator) -> Vec<i32> {
        let mut out = Vec::new();
        while op.has_next().unwrap() {
            match op.next().unwrap().value(0) {
                Field::Int(v) => out.push(*v),
                other => panic!("unexpected field {}", other),
            }
        }
        out
    }

    #[test]
    fn test_filter_passes_matches() {
        let mut filter = Filter::new(
            Predicate::new(0, CmpOp::GreaterThan, Field::Int(2)),
            int_source(&[1, 2, 3, 4, 5]),
        );
        filter.open().unwrap();
        assert_eq!(drain(&mut filter), vec![3, 4, 5]);
        filter.close();
    }

    #[test]
    fn test_filter_empty_result() {
        let mut filter = Filter::new(
            Predicate::new(0, CmpOp::LessThan, Field::Int(0)),
            int_source(&[1, 2, 3]),
        );
        filter.open().unwrap();
        assert!(!filter.has_next().unwrap());
        assert!(matches!(filter.next(), Err(MarlError::NoMoreTuples)));
    }

    #[test]
    fn test_filter_rewind() {
        let mut filter = Filter::new(
            Predicate::new(0, CmpOp::NotEquals, Field::Int(2)),
            int_source(&[1, 2, 3]),
        );
        filter.open().unwrap();
        assert_eq!(drain(&mut filter), vec![1, 3]);

        filter.rewind().unwrap();
        assert_eq!(drain(&mut filter), vec![1, 3]);
    }

    #[test]
    fn test_reopen_after_close() {
        let mut filter = Filter::new(
            Predicate::new(0, CmpOp::Equals, Field::Int(1)),
            int_source(&[1, 2]),
        );
        filter.open().unwrap();
        assert_eq!(drain(&mut filter), vec![1]);
        filter.close();
        assert!(!filter.has_next().unwrap());

        filter.open().unwrap();
        assert_eq!(drain(&mut filter), vec![1]);
    }
}
