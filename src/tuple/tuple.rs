use std::fmt;
use std::sync::Arc;

use crate::common::RecordId;

use super::{Field, TupleDesc};

/// A single row: a schema plus one value per field.
///
/// Once stored in a page the tuple also carries the [`RecordId`] of the slot
/// holding it. Equality compares schema and values; the record id is an
/// address, not part of the value.
#[derive(Debug, Clone)]
pub struct Tuple {
    desc: Arc<TupleDesc>,
    values: Vec<Field>,
    record_id: Option<RecordId>,
}

impl Tuple {
    /// Creates a new tuple.
    ///
    /// # Panics
    /// Panics if the value count differs from the schema field count or a
    /// value does not match its declared type.
    pub fn new(desc: Arc<TupleDesc>, values: Vec<Field>) -> Self {
        assert_eq!(
            values.len(),
            desc.field_count(),
            "value count must match schema field count"
        );
        for (i, value) in values.iter().enumerate() {
            assert!(
                value.matches(desc.field_type(i)),
                "value {} does not match field type {}",
                value,
                desc.field_type(i)
            );
        }
        Self {
            desc,
            values,
            record_id: None,
        }
    }

    /// Returns the schema of this tuple.
    pub fn desc(&self) -> &Arc<TupleDesc> {
        &self.desc
    }

    /// Returns the value of field `i`.
    ///
    /// # Panics
    /// Panics if `i` is out of range.
    pub fn value(&self, i: usize) -> &Field {
        &self.values[i]
    }

    /// Returns all values in schema order.
    pub fn values(&self) -> &[Field] {
        &self.values
    }

    /// Replaces the value of field `i`.
    ///
    /// # Panics
    /// Panics if `i` is out of range or the value does not match the type.
    pub fn set_value(&mut self, i: usize, value: Field) {
        assert!(
            value.matches(self.desc.field_type(i)),
            "value {} does not match field type {}",
            value,
            self.desc.field_type(i)
        );
        self.values[i] = value;
    }

    /// Returns the slot address, if this tuple has been stored.
    pub fn record_id(&self) -> Option<RecordId> {
        self.record_id
    }

    pub fn set_record_id(&mut self, record_id: Option<RecordId>) {
        self.record_id = record_id;
    }

    /// Serializes the tuple to its fixed-size byte form.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.desc.tuple_size());
        for (i, value) in self.values.iter().enumerate() {
            value.serialize(self.desc.field_type(i), &mut out);
        }
        out
    }

    /// Deserializes a tuple from the start of `data`.
    /// Returns None if the bytes are ill-formed.
    pub fn from_bytes(desc: Arc<TupleDesc>, data: &[u8]) -> Option<Self> {
        let mut values = Vec::with_capacity(desc.field_count());
        let mut offset = 0;
        for i in 0..desc.field_count() {
            let (value, consumed) = Field::deserialize(&data[offset..], desc.field_type(i))?;
            values.push(value);
            offset += consumed;
        }
        Some(Self {
            desc,
            values,
            record_id: None,
        })
    }
}

impl PartialEq for Tuple {
    fn eq(&self, other: &Self) -> bool {
        self.desc == other.desc && self.values == other.values
    }
}

impl Eq for Tuple {}

impl fmt::Display for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, value) in self.values.iter().enumerate() {
            if i > 0 {
                write!(f, "\t")?;
            }
            write!(f, "{}", value)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::PageId;
    use crate::tuple::FieldType;

    fn test_desc() -> Arc<TupleDesc> {
        TupleDesc::named(&[(FieldType::Int, "id"), (FieldType::Str(16), "name")]).into_arc()
    }

    #[test]
    fn test_roundtrip() {
        let desc = test_desc();
        let tuple = Tuple::new(desc.clone(), vec![Field::Int(7), Field::Str("alice".into())]);

        let bytes = tuple.to_bytes();
        assert_eq!(bytes.len(), desc.tuple_size());

        let recovered = Tuple::from_bytes(desc, &bytes).unwrap();
        assert_eq!(recovered, tuple);
    }

    #[test]
    fn test_record_id_ignored_by_equality() {
        let desc = test_desc();
        let a = Tuple::new(desc.clone(), vec![Field::Int(1), Field::Str("x".into())]);
        let mut b = a.clone();
        b.set_record_id(Some(RecordId::new(PageId::new(1, 0), 3)));

        assert_eq!(a, b);
    }

    #[test]
    #[should_panic(expected = "value count")]
    fn test_arity_checked() {
        let desc = test_desc();
        Tuple::new(desc, vec![Field::Int(1)]);
    }

    #[test]
    #[should_panic(expected = "does not match field type")]
    fn test_types_checked() {
        let desc = test_desc();
        Tuple::new(desc, vec![Field::Str("oops".into()), Field::Str("x".into())]);
    }
}
