use std::fmt;

/// Comparison operator applied to a pair of fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Equals,
    GreaterThan,
    LessThan,
    LessThanOrEq,
    GreaterThanOrEq,
    NotEquals,
}

impl fmt::Display for CmpOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CmpOp::Equals => "=",
            CmpOp::GreaterThan => ">",
            CmpOp::LessThan => "<",
            CmpOp::LessThanOrEq => "<=",
            CmpOp::GreaterThanOrEq => ">=",
            CmpOp::NotEquals => "<>",
        };
        write!(f, "{}", s)
    }
}

/// Scalar type of a field.
///
/// Strings carry their schema-declared maximum byte length; a string field is
/// serialized as a 4-byte little-endian length prefix followed by the value
/// bytes zero-padded to the maximum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    /// 32-bit signed integer: 4 bytes, little-endian
    Int,
    /// String of at most `n` bytes: 4-byte length prefix + `n` bytes
    Str(u16),
}

impl FieldType {
    /// Returns the serialized size of a field of this type in bytes.
    pub fn byte_size(&self) -> usize {
        match self {
            FieldType::Int => 4,
            FieldType::Str(n) => 4 + *n as usize,
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Int => write!(f, "int"),
            FieldType::Str(n) => write!(f, "string({})", n),
        }
    }
}

/// A typed scalar value stored in a tuple.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Field {
    Int(i32),
    Str(String),
}

impl Field {
    /// Returns true if this value is storable under the given type.
    pub fn matches(&self, ty: FieldType) -> bool {
        match (self, ty) {
            (Field::Int(_), FieldType::Int) => true,
            (Field::Str(s), FieldType::Str(max)) => s.len() <= max as usize,
            _ => false,
        }
    }

    /// Evaluates `self op other`. Fields of different types never compare true.
    pub fn compare(&self, op: CmpOp, other: &Field) -> bool {
        let ord = match (self, other) {
            (Field::Int(a), Field::Int(b)) => a.cmp(b),
            (Field::Str(a), Field::Str(b)) => a.cmp(b),
            _ => return false,
        };
        match op {
            CmpOp::Equals => ord.is_eq(),
            CmpOp::GreaterThan => ord.is_gt(),
            CmpOp::LessThan => ord.is_lt(),
            CmpOp::LessThanOrEq => ord.is_le(),
            CmpOp::GreaterThanOrEq => ord.is_ge(),
            CmpOp::NotEquals => ord.is_ne(),
        }
    }

    /// Serializes this field under the given type, appending to `out`.
    ///
    /// The value must match the type; callers validate on construction.
    pub fn serialize(&self, ty: FieldType, out: &mut Vec<u8>) {
        match (self, ty) {
            (Field::Int(v), FieldType::Int) => out.extend_from_slice(&v.to_le_bytes()),
            (Field::Str(s), FieldType::Str(max)) => {
                let bytes = s.as_bytes();
                out.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
                out.extend_from_slice(bytes);
                out.resize(out.len() + max as usize - bytes.len(), 0);
            }
            _ => unreachable!("field does not match its declared type"),
        }
    }

    /// Deserializes a field of the given type from the start of `data`.
    /// Returns the field and the number of bytes consumed, or None if the
    /// bytes are ill-formed.
    pub fn deserialize(data: &[u8], ty: FieldType) -> Option<(Self, usize)> {
        match ty {
            FieldType::Int => {
                let bytes: [u8; 4] = data.get(..4)?.try_into().ok()?;
                Some((Field::Int(i32::from_le_bytes(bytes)), 4))
            }
            FieldType::Str(max) => {
                let max = max as usize;
                let len_bytes: [u8; 4] = data.get(..4)?.try_into().ok()?;
                let len = u32::from_le_bytes(len_bytes) as usize;
                if len > max || data.len() < 4 + max {
                    return None;
                }
                let s = String::from_utf8(data[4..4 + len].to_vec()).ok()?;
                Some((Field::Str(s), 4 + max))
            }
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Int(v) => write!(f, "{}", v),
            Field::Str(s) => write!(f, "{}", s),
        }
    }
}

impl From<i32> for Field {
    fn from(v: i32) -> Self {
        Field::Int(v)
    }
}

impl From<&str> for Field {
    fn from(v: &str) -> Self {
        Field::Str(v.to_string())
    }
}

impl From<String> for Field {
    fn from(v: String) -> Self {
        Field::Str(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_int_roundtrip() {
        let field = Field::Int(-42);
        let mut bytes = Vec::new();
        field.serialize(FieldType::Int, &mut bytes);
        assert_eq!(bytes.len(), 4);

        let (recovered, consumed) = Field::deserialize(&bytes, FieldType::Int).unwrap();
        assert_eq!(recovered, field);
        assert_eq!(consumed, 4);
    }

    #[test]
    fn test_string_padding() {
        let field = Field::Str("hi".to_string());
        let mut bytes = Vec::new();
        field.serialize(FieldType::Str(8), &mut bytes);
        assert_eq!(bytes.len(), 12);
        assert_eq!(&bytes[..4], &2u32.to_le_bytes());
        assert_eq!(&bytes[4..6], b"hi");
        assert!(bytes[6..].iter().all(|&b| b == 0));

        let (recovered, consumed) = Field::deserialize(&bytes, FieldType::Str(8)).unwrap();
        assert_eq!(recovered, field);
        assert_eq!(consumed, 12);
    }

    #[test]
    fn test_deserialize_rejects_oversized_length() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&100u32.to_le_bytes());
        bytes.resize(12, 0);
        assert!(Field::deserialize(&bytes, FieldType::Str(8)).is_none());
    }

    #[test]
    fn test_compare() {
        assert!(Field::Int(1).compare(CmpOp::LessThan, &Field::Int(2)));
        assert!(Field::Int(2).compare(CmpOp::GreaterThanOrEq, &Field::Int(2)));
        assert!(Field::Str("a".into()).compare(CmpOp::LessThan, &Field::Str("b".into())));
        assert!(Field::Int(5).compare(CmpOp::NotEquals, &Field::Int(6)));

        // cross-type comparisons are always false
        assert!(!Field::Int(1).compare(CmpOp::Equals, &Field::Str("1".into())));
        assert!(!Field::Int(1).compare(CmpOp::NotEquals, &Field::Str("1".into())));
    }

    #[test]
    fn test_matches() {
        assert!(Field::Int(1).matches(FieldType::Int));
        assert!(Field::Str("abc".into()).matches(FieldType::Str(3)));
        assert!(!Field::Str("abcd".into()).matches(FieldType::Str(3)));
        assert!(!Field::Int(1).matches(FieldType::Str(3)));
    }
}
