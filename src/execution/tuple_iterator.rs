use std::sync::Arc;

use crate::common::{MarlError, Result};
use crate::tuple::{Tuple, TupleDesc};

use super::OpIterator;

/// Operator over an in-memory, already materialized tuple list. Used for
/// aggregate results and as a convenient test source.
pub struct TupleIterator {
    desc: Arc<TupleDesc>,
    tuples: Vec<Tuple>,
    pos: usize,
    opened: bool,
}

impl TupleIterator {
    pub fn new(desc: Arc<TupleDesc>, tuples: Vec<Tuple>) -> Self {
        Self {
            desc,
            tuples,
            pos: 0,
            opened: false,
        }
    }
}

impl OpIterator for TupleIterator {
    fn open(&mut self) -> Result<()> {
        self.opened = true;
        self.pos = 0;
        Ok(())
    }

    fn has_next(&mut self) -> Result<bool> {
        Ok(self.opened && self.pos < self.tuples.len())
    }

    fn next(&mut self) -> Result<Tuple> {
        if !self.has_next()? {
            return Err(MarlError::NoMoreTuples);
        }
        let tuple = self.tuples[self.pos].clone();
        self.pos += 1;
        Ok(tuple)
    }

    fn rewind(&mut self) -> Result<()> {
        self.pos = 0;
        Ok(())
    }

    fn close(&mut self) {
        self.opened = false;
    }

    fn tuple_desc(&self) -> Arc<TupleDesc> {
        self.desc.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tuple::{Field, FieldType};

    fn source(values: &[i32]) -> TupleIterator {
        let desc = TupleDesc::with_types(vec![FieldType::Int]).into_arc();
        let tuples = values
            .iter()
            .map(|&v| Tuple::new(desc.clone(), vec![Field::Int(v)]))
            .collect();
        TupleIterator::new(desc, tuples)
    }

    #[test]
    fn test_iteration_and_rewind() {
        let mut it = source(&[1, 2, 3]);
        assert!(!it.has_next().unwrap()); // not yet opened

        it.open().unwrap();
        let mut seen = Vec::new();
        while it.has_next().unwrap() {
            seen.push(it.next().unwrap().value(0).clone());
        }
        assert_eq!(seen.len(), 3);
        assert!(matches!(it.next(), Err(MarlError::NoMoreTuples)));

        it.rewind().unwrap();
        assert!(it.has_next().unwrap());

        it.close();
        assert!(!it.has_next().unwrap());
    }
}
