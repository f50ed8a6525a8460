use std::fmt;
use std::sync::Arc;

use crate::common::{MarlError, Result};

use super::FieldType;

/// Schema of a tuple: an ordered sequence of field types with optional names.
///
/// Two descriptors are equal iff their type sequences are equal; names are
/// advisory and do not participate in equality.
#[derive(Debug, Clone)]
pub struct TupleDesc {
    types: Vec<FieldType>,
    names: Vec<Option<String>>,
}

impl TupleDesc {
    /// Creates a descriptor from parallel type and name lists.
    ///
    /// # Panics
    /// Panics if the lists differ in length.
    pub fn new(types: Vec<FieldType>, names: Vec<Option<String>>) -> Self {
        assert_eq!(
            types.len(),
            names.len(),
            "type and name lists must have equal length"
        );
        Self { types, names }
    }

    /// Creates an anonymous descriptor from a type list.
    pub fn with_types(types: Vec<FieldType>) -> Self {
        let names = vec![None; types.len()];
        Self { types, names }
    }

    /// Creates a descriptor from `(type, name)` pairs.
    pub fn named(fields: &[(FieldType, &str)]) -> Self {
        Self {
            types: fields.iter().map(|(ty, _)| *ty).collect(),
            names: fields.iter().map(|(_, n)| Some(n.to_string())).collect(),
        }
    }

    /// Returns the number of fields.
    pub fn field_count(&self) -> usize {
        self.types.len()
    }

    /// Returns the type of field `i`.
    ///
    /// # Panics
    /// Panics if `i` is out of range.
    pub fn field_type(&self, i: usize) -> FieldType {
        self.types[i]
    }

    /// Returns the name of field `i`, if one was declared.
    pub fn field_name(&self, i: usize) -> Option<&str> {
        self.names.get(i).and_then(|n| n.as_deref())
    }

    /// Returns the index of the field with the given name.
    pub fn find_field(&self, name: &str) -> Result<usize> {
        self.names
            .iter()
            .position(|n| n.as_deref() == Some(name))
            .ok_or_else(|| MarlError::NoSuchField(name.to_string()))
    }

    /// Returns the serialized size of one tuple under this schema.
    pub fn tuple_size(&self) -> usize {
        self.types.iter().map(|ty| ty.byte_size()).sum()
    }

    /// Wraps this descriptor in an `Arc` for shared ownership.
    pub fn into_arc(self) -> Arc<TupleDesc> {
        Arc::new(self)
    }
}

impl PartialEq for TupleDesc {
    fn eq(&self, other: &Self) -> bool {
        self.types == other.types
    }
}

impl Eq for TupleDesc {}

impl fmt::Display for TupleDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, ty) in self.types.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            match self.field_name(i) {
                Some(name) => write!(f, "{}({})", ty, name)?,
                None => write!(f, "{}", ty)?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equality_ignores_names() {
        let a = TupleDesc::named(&[(FieldType::Int, "id"), (FieldType::Str(16), "name")]);
        let b = TupleDesc::with_types(vec![FieldType::Int, FieldType::Str(16)]);
        let c = TupleDesc::with_types(vec![FieldType::Int, FieldType::Int]);

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_string_length_distinguishes_types() {
        let a = TupleDesc::with_types(vec![FieldType::Str(16)]);
        let b = TupleDesc::with_types(vec![FieldType::Str(32)]);
        assert_ne!(a, b);
    }

    #[test]
    fn test_tuple_size() {
        let desc = TupleDesc::with_types(vec![FieldType::Int, FieldType::Str(16), FieldType::Int]);
        assert_eq!(desc.tuple_size(), 4 + (4 + 16) + 4);
    }

    #[test]
    fn test_find_field() {
        let desc = TupleDesc::named(&[(FieldType::Int, "id"), (FieldType::Str(16), "name")]);
        assert_eq!(desc.find_field("name").unwrap(), 1);
        assert!(desc.find_field("missing").is_err());
    }
}
