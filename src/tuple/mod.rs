mod desc;
mod field;
mod tuple;

pub use desc::TupleDesc;
pub use field::{CmpOp, Field, FieldType};
pub use tuple::Tuple;
