//! JSON-schema-like description of tool parameters.

use serde::ser::{SerializeMap, SerializeStruct};
use serde::{Deserialize, Serialize, Serializer};

/// Primitive schema type names.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaType {
    /// Keyed object, either with named properties or variable keys.
    Object,
    /// Floating point number.
    Number,
    /// Whole number.
    Integer,
    /// Text.
    String,
    /// Ordered list of items.
    Array,
    /// The null value.
    Null,
    /// `true` or `false`.
    Boolean,
}

/// Describes the shape of a single value.
///
/// Empty fields are omitted when serialized, so `SchemaDefinition::default()`
/// renders as `{}`.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct SchemaDefinition {
    /// Data type of the value. `None` leaves the type unconstrained.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub schema_type: Option<SchemaType>,
    /// Human-readable description.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// Allowed values, used with [`SchemaType::String`].
    #[serde(rename = "enum", skip_serializing_if = "Vec::is_empty")]
    pub enum_values: Vec<String>,
    /// Named properties of an object.
    #[serde(skip_serializing_if = "Properties::is_empty")]
    pub properties: Properties,
    /// Names of properties that must be present.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
    /// Shape of array items, or of the values of a variable-key object.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<SchemaDefinition>>,
}

impl SchemaDefinition {
    /// Creates a definition of the given type with no further constraints.
    #[must_use]
    pub fn of(schema_type: SchemaType) -> Self {
        Self {
            schema_type: Some(schema_type),
            ..Self::default()
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Sets the item shape.
    #[must_use]
    pub fn with_items(mut self, items: SchemaDefinition) -> Self {
        self.items = Some(Box::new(items));
        self
    }

    /// Sets the allowed values.
    #[must_use]
    pub fn with_enum_values(mut self, values: Vec<String>) -> Self {
        self.enum_values = values;
        self
    }

    /// Returns `true` when nothing about the value is constrained.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// A named property of an object definition.
#[derive(Clone, Debug, PartialEq)]
pub struct Property {
    /// Property name as seen by callers.
    pub name: String,
    /// Shape of the property value.
    pub definition: SchemaDefinition,
}

impl Property {
    /// Creates a property.
    #[must_use]
    pub fn new(name: impl Into<String>, definition: SchemaDefinition) -> Self {
        Self {
            name: name.into(),
            definition,
        }
    }
}

/// Ordered property list with unique names.
///
/// Serializes as a JSON object whose keys keep insertion order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Properties(Vec<Property>);

impl Properties {
    /// Creates an empty list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a property. Returns `false` and leaves the list unchanged if a
    /// property with the same name already exists.
    pub fn push(&mut self, property: Property) -> bool {
        if self.get(&property.name).is_some() {
            return false;
        }
        self.0.push(property);
        true
    }

    /// Looks up a property by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&SchemaDefinition> {
        self.0
            .iter()
            .find(|property| property.name == name)
            .map(|property| &property.definition)
    }

    /// Iterates over properties in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Property> {
        self.0.iter()
    }

    /// Returns the property names in insertion order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.0.iter().map(|property| property.name.as_str()).collect()
    }

    /// Number of properties.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` when there are no properties.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for Properties {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for property in &self.0 {
            map.serialize_entry(&property.name, &property.definition)?;
        }
        map.end()
    }
}

/// Discovery-facing description of one tool.
///
/// Serializes in the function-calling wire shape:
///
/// ```
/// use toolbind_schema::{FunctionSchema, SchemaDefinition};
///
/// let schema = FunctionSchema::new("ping", "Checks liveness", SchemaDefinition::default());
/// let json = serde_json::to_value(&schema).unwrap();
/// assert_eq!(json["type"], "function");
/// assert_eq!(json["function"]["name"], "ping");
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct FunctionSchema {
    /// Dispatch name.
    pub name: String,
    /// What the tool does.
    pub description: String,
    /// Shape of the argument object.
    pub parameters: SchemaDefinition,
}

impl FunctionSchema {
    /// Creates a schema entry.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: SchemaDefinition,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }
}

impl Serialize for FunctionSchema {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        struct Function<'a>(&'a FunctionSchema);

        impl Serialize for Function<'_> {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                let mut function = serializer.serialize_struct("Function", 3)?;
                function.serialize_field("name", &self.0.name)?;
                function.serialize_field("description", &self.0.description)?;
                function.serialize_field("parameters", &self.0.parameters)?;
                function.end()
            }
        }

        let mut tool = serializer.serialize_struct("Tool", 2)?;
        tool.serialize_field("type", "function")?;
        tool.serialize_field("function", &Function(self))?;
        tool.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_definition_serializes_as_empty_object() {
        let json = serde_json::to_value(SchemaDefinition::default()).unwrap();
        assert_eq!(json, json!({}));
        assert!(SchemaDefinition::default().is_empty());
    }

    #[test]
    fn properties_keep_insertion_order_and_reject_duplicates() {
        let mut properties = Properties::new();
        assert!(properties.push(Property::new("b", SchemaDefinition::of(SchemaType::Integer))));
        assert!(properties.push(Property::new("a", SchemaDefinition::of(SchemaType::String))));
        assert!(!properties.push(Property::new("b", SchemaDefinition::of(SchemaType::Boolean))));

        assert_eq!(properties.names(), vec!["b", "a"]);
        assert_eq!(
            properties.get("b").and_then(|def| def.schema_type),
            Some(SchemaType::Integer)
        );

        let rendered = serde_json::to_string(&properties).unwrap();
        assert_eq!(rendered, r#"{"b":{"type":"integer"},"a":{"type":"string"}}"#);
    }

    #[test]
    fn nested_definition_renders_items_and_required() {
        let mut parameters = SchemaDefinition::of(SchemaType::Object);
        parameters.properties.push(Property::new(
            "tags",
            SchemaDefinition::of(SchemaType::Array)
                .with_items(SchemaDefinition::of(SchemaType::String))
                .with_description("labels to apply"),
        ));
        parameters.required.push("tags".into());

        let json = serde_json::to_value(FunctionSchema::new("label", "Labels things", parameters))
            .unwrap();
        assert_eq!(
            json,
            json!({
                "type": "function",
                "function": {
                    "name": "label",
                    "description": "Labels things",
                    "parameters": {
                        "type": "object",
                        "properties": {
                            "tags": {
                                "type": "array",
                                "description": "labels to apply",
                                "items": { "type": "string" }
                            }
                        },
                        "required": ["tags"]
                    }
                }
            })
        );
    }

    #[test]
    fn enum_values_render_under_enum_key() {
        let def = SchemaDefinition::of(SchemaType::String)
            .with_enum_values(vec!["low".into(), "high".into()]);
        let json = serde_json::to_value(def).unwrap();
        assert_eq!(json, json!({ "type": "string", "enum": ["low", "high"] }));
    }
}
