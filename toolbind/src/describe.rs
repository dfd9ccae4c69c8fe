//! Schema derivation from type descriptors.

use toolbind_schema::{
    Property, SchemaDefinition, SchemaType, StructDescriptor, TypeDescriptor,
};

use crate::convert::check_map;
use crate::docs::DocProvider;
use crate::error::{RegistrationError, RegistrationResult};

/// Derives the schema of a type.
///
/// Struct field descriptions come from `docs`, keyed by the struct owner and
/// field identifier.
///
/// # Errors
///
/// Returns [`RegistrationError`] for open, opaque or self-referential types,
/// maps whose keys are not string-like or whose values are open, and structs
/// exposing the same name twice.
pub fn describe(ty: &TypeDescriptor, docs: &dyn DocProvider) -> RegistrationResult<SchemaDefinition> {
    let definition = match ty {
        TypeDescriptor::Boolean => SchemaDefinition::of(SchemaType::Boolean),
        TypeDescriptor::Integer(_) => SchemaDefinition::of(SchemaType::Integer),
        TypeDescriptor::Float(_) => SchemaDefinition::of(SchemaType::Number),
        TypeDescriptor::String => SchemaDefinition::of(SchemaType::String),
        TypeDescriptor::Enumeration(descriptor) => SchemaDefinition::of(SchemaType::String)
            .with_enum_values(descriptor.variants.clone()),
        TypeDescriptor::Pointer(element) => describe(element, docs)?,
        TypeDescriptor::Struct(descriptor) => describe_struct(descriptor, docs)?,
        TypeDescriptor::Array { element, .. } | TypeDescriptor::Sequence(element) => {
            SchemaDefinition::of(SchemaType::Array).with_items(describe(element, docs)?)
        }
        TypeDescriptor::Map { key, value } => {
            check_map(ty, key, value)?;
            SchemaDefinition::of(SchemaType::Object).with_items(describe(value, docs)?)
        }
        TypeDescriptor::Dynamic | TypeDescriptor::Opaque(_) | TypeDescriptor::Recursive(_) => {
            return Err(RegistrationError::UnsupportedType {
                ty: ty.to_string(),
                kind: ty.kind(),
            });
        }
    };
    Ok(definition)
}

fn describe_struct(
    descriptor: &StructDescriptor,
    docs: &dyn DocProvider,
) -> RegistrationResult<SchemaDefinition> {
    let mut definition = SchemaDefinition::of(SchemaType::Object);
    for field in &descriptor.fields {
        let Some(name) = field.resolved_name() else {
            continue;
        };
        let mut property = describe(&field.ty, docs)?;
        if let Some(text) = docs.field(&descriptor.owner, &field.ident) {
            property.description = text;
        }
        if !definition.properties.push(Property::new(name, property)) {
            return Err(RegistrationError::DuplicateField {
                owner: descriptor.owner.clone(),
                name: name.to_owned(),
            });
        }
    }
    Ok(definition)
}
