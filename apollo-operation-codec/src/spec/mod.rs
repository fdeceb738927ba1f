//! The compile-time model of a selected operation: field descriptors and the
//! typed value tree they decode into.
//!
//! Everything in this module is built once per operation from the validated
//! schema + document pair, then shared read-only across every codec
//! invocation for that operation.

mod descriptor;
mod value;

pub use descriptor::FieldDescriptor;
pub use descriptor::FieldKind;
pub use descriptor::FragmentVariant;
pub use descriptor::ScalarType;
pub use value::ScalarValue;
pub use value::TypedValue;

/// The discriminator field used to select polymorphic fragment variants.
pub const TYPENAME: &str = "__typename";
