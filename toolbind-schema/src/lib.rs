//! Schema model and type descriptors shared by the toolbind crates.
//!
//! [`TypeDescriptor`] is the explicit, registration-time description of a
//! parameter type. [`SchemaDefinition`] is the JSON-schema-like shape that a
//! descriptor is mapped to when a tool is published for discovery.

#![warn(missing_docs, clippy::pedantic)]

mod descriptor;
mod schema;

/// Registration-time descriptions of parameter types.
pub use descriptor::{
    EnumDescriptor, FieldDescriptor, FieldTag, FloatKind, IntegerKind, StructDescriptor,
    TypeDescriptor,
};
/// Discovery-facing schema model.
pub use schema::{FunctionSchema, Properties, Property, SchemaDefinition, SchemaType};
