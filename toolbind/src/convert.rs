//! Type-directed coercion of untyped argument values.
//!
//! A [`Converter`] is built once per declared type and turns whatever the
//! caller decoded (numbers as text, floats for integers, and so on) into the
//! canonical value for that type. The typed parameter is then materialized
//! from the canonical value by [`ToolArg::from_canonical`](crate::ToolArg).

use std::collections::HashMap;
use std::fmt::{self, Display, Formatter};
use std::sync::Arc;

use serde_json::{Map, Number, Value};
use thiserror::Error;
use toolbind_schema::{FloatKind, IntegerKind, StructDescriptor, TypeDescriptor};

use crate::error::{RegistrationError, RegistrationResult};

/// Step in the traversal path of a nested value.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum PathSegment {
    /// Position in an array or sequence.
    Index(usize),
    /// Key of a map.
    Key(String),
    /// Field of a struct.
    Field(String),
}

/// What went wrong while converting a value.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum ConvertErrorKind {
    /// The value had the wrong shape or could not be parsed.
    #[error("cannot convert {found} to {expected}")]
    TypeMismatch {
        /// Target type.
        expected: String,
        /// Description of the supplied value.
        found: String,
    },

    /// A fixed-length array received the wrong number of elements.
    #[error("expected {expected} elements, found {found}")]
    LengthMismatch {
        /// Declared length.
        expected: usize,
        /// Supplied length.
        found: usize,
    },

    /// A struct key matched no field.
    #[error("unexpected argument `{key}`")]
    UnexpectedArgument {
        /// Offending key.
        key: String,
    },
}

/// Conversion failure with the path to the offending value.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ConvertError {
    path: Vec<PathSegment>,
    kind: ConvertErrorKind,
}

impl ConvertError {
    /// Creates an error at the root of the value.
    #[must_use]
    pub fn new(kind: ConvertErrorKind) -> Self {
        Self {
            path: Vec::new(),
            kind,
        }
    }

    /// Creates a type mismatch describing `found`.
    #[must_use]
    pub fn type_mismatch(expected: impl Into<String>, found: &Value) -> Self {
        Self::new(ConvertErrorKind::TypeMismatch {
            expected: expected.into(),
            found: describe_value(found),
        })
    }

    /// Prefixes the path with an enclosing segment.
    #[must_use]
    pub fn at(mut self, segment: PathSegment) -> Self {
        self.path.insert(0, segment);
        self
    }

    /// Path from the parameter root to the offending value.
    #[must_use]
    pub fn path(&self) -> &[PathSegment] {
        &self.path
    }

    /// The failure itself.
    #[must_use]
    pub fn kind(&self) -> &ConvertErrorKind {
        &self.kind
    }
}

impl Display for ConvertError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            return Display::fmt(&self.kind, f);
        }
        for (position, segment) in self.path.iter().enumerate() {
            match segment {
                PathSegment::Index(index) => write!(f, "[{index}]")?,
                PathSegment::Key(key) => write!(f, "[{key:?}]")?,
                PathSegment::Field(name) if position == 0 => f.write_str(name)?,
                PathSegment::Field(name) => write!(f, ".{name}")?,
            }
        }
        write!(f, ": {}", self.kind)
    }
}

impl std::error::Error for ConvertError {}

fn describe_value(value: &Value) -> String {
    match value {
        Value::Null => "null".into(),
        Value::Bool(flag) => format!("boolean {flag}"),
        Value::Number(number) => format!("number {number}"),
        Value::String(text) => format!("string {text:?}"),
        Value::Array(items) => format!("array of {}", items.len()),
        Value::Object(_) => "object".into(),
    }
}

type ConvertFn = dyn Fn(Value) -> Result<Value, ConvertError> + Send + Sync;

/// Coerces untyped values into the canonical value of one declared type.
#[derive(Clone)]
pub struct Converter {
    target: String,
    run: Arc<ConvertFn>,
}

impl Converter {
    /// Builds the converter for `ty`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistrationError`] if `ty` or anything nested in it has no
    /// caller-facing representation, or if a map key is not string-like.
    pub fn build(ty: &TypeDescriptor) -> RegistrationResult<Self> {
        Ok(Self {
            target: ty.to_string(),
            run: build(ty)?,
        })
    }

    /// Converts `value`.
    ///
    /// # Errors
    ///
    /// Returns [`ConvertError`] if the value cannot be coerced.
    pub fn convert(&self, value: Value) -> Result<Value, ConvertError> {
        (self.run)(value)
    }

    /// Rendered name of the target type.
    #[must_use]
    pub fn target(&self) -> &str {
        &self.target
    }
}

impl fmt::Debug for Converter {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Converter")
            .field("target", &self.target)
            .finish_non_exhaustive()
    }
}

/// Builds the converter for `ty`. See [`Converter::build`].
///
/// # Errors
///
/// Returns [`RegistrationError`] for unsupported types.
pub fn build_converter(ty: &TypeDescriptor) -> RegistrationResult<Converter> {
    Converter::build(ty)
}

pub(crate) fn check_map(
    ty: &TypeDescriptor,
    key: &TypeDescriptor,
    value: &TypeDescriptor,
) -> RegistrationResult<()> {
    if !key.is_string_like() {
        return Err(RegistrationError::NonStringMapKey { ty: ty.to_string() });
    }
    if value.is_dynamic() {
        return Err(RegistrationError::DynamicMapValue { ty: ty.to_string() });
    }
    Ok(())
}

fn build(ty: &TypeDescriptor) -> RegistrationResult<Arc<ConvertFn>> {
    let run: Arc<ConvertFn> = match ty {
        TypeDescriptor::Boolean => Arc::new(to_bool),
        TypeDescriptor::Integer(kind) => {
            let kind = *kind;
            Arc::new(move |value| to_integer(kind, value))
        }
        TypeDescriptor::Float(kind) => {
            let kind = *kind;
            Arc::new(move |value| to_float(kind, value))
        }
        TypeDescriptor::String => Arc::new(to_string),
        TypeDescriptor::Enumeration(descriptor) => {
            let descriptor = descriptor.clone();
            Arc::new(move |value| {
                value
                    .as_str()
                    .and_then(|text| descriptor.wire_name(text))
                    .map(|wire| Value::String(wire.to_owned()))
                    .ok_or_else(|| ConvertError::type_mismatch(&descriptor.owner, &value))
            })
        }
        TypeDescriptor::Pointer(element) => build(element)?,
        TypeDescriptor::Array { len, element } => {
            let len = *len;
            let element = build(element)?;
            let target = ty.to_string();
            Arc::new(move |value| {
                let items = expect_array(&target, value)?;
                if items.len() != len {
                    return Err(ConvertError::new(ConvertErrorKind::LengthMismatch {
                        expected: len,
                        found: items.len(),
                    }));
                }
                convert_items(&element, items)
            })
        }
        TypeDescriptor::Sequence(element) => {
            let element = build(element)?;
            let target = ty.to_string();
            Arc::new(move |value| convert_items(&element, expect_array(&target, value)?))
        }
        TypeDescriptor::Map { key, value } => {
            check_map(ty, key, value)?;
            let key = build(key)?;
            let element = build(value)?;
            let target = ty.to_string();
            Arc::new(move |value| {
                let Value::Object(entries) = value else {
                    return Err(ConvertError::type_mismatch(&target, &value));
                };
                let mut converted = Map::new();
                for (name, value) in entries {
                    let wire = match key(Value::String(name.clone())) {
                        Ok(Value::String(wire)) => wire,
                        Ok(other) => return Err(ConvertError::type_mismatch(&target, &other)),
                        Err(err) => return Err(err.at(PathSegment::Key(name))),
                    };
                    match element(value) {
                        Ok(value) => {
                            converted.insert(wire, value);
                        }
                        Err(err) => return Err(err.at(PathSegment::Key(name))),
                    }
                }
                Ok(Value::Object(converted))
            })
        }
        TypeDescriptor::Struct(descriptor) => build_struct(descriptor)?,
        TypeDescriptor::Dynamic | TypeDescriptor::Opaque(_) | TypeDescriptor::Recursive(_) => {
            return Err(RegistrationError::UnsupportedType {
                ty: ty.to_string(),
                kind: ty.kind(),
            });
        }
    };
    Ok(run)
}

struct FieldBinding {
    wire: String,
    run: Arc<ConvertFn>,
}

fn build_struct(descriptor: &StructDescriptor) -> RegistrationResult<Arc<ConvertFn>> {
    let mut fields: HashMap<String, FieldBinding> = HashMap::new();
    let mut zero = Map::new();

    for field in &descriptor.fields {
        let Some(wire) = field.wire_name() else {
            continue;
        };
        zero.insert(wire.to_owned(), zero_value(&field.ty));

        let Some(name) = field.resolved_name() else {
            continue;
        };
        let binding = FieldBinding {
            wire: wire.to_owned(),
            run: build(&field.ty)?,
        };
        if fields.insert(name.to_owned(), binding).is_some() {
            return Err(RegistrationError::DuplicateField {
                owner: descriptor.owner.clone(),
                name: name.to_owned(),
            });
        }
    }

    let owner = descriptor.owner.clone();
    Ok(Arc::new(move |value| {
        let Value::Object(entries) = value else {
            return Err(ConvertError::type_mismatch(&owner, &value));
        };
        let mut converted = zero.clone();
        for (key, value) in entries {
            let Some(field) = fields.get(&key) else {
                return Err(ConvertError::new(ConvertErrorKind::UnexpectedArgument { key }));
            };
            match (field.run)(value) {
                Ok(value) => {
                    converted.insert(field.wire.clone(), value);
                }
                Err(err) => return Err(err.at(PathSegment::Field(key))),
            }
        }
        Ok(Value::Object(converted))
    }))
}

/// Canonical value a field holds when the caller leaves it out.
pub(crate) fn zero_value(ty: &TypeDescriptor) -> Value {
    match ty {
        TypeDescriptor::Boolean => Value::Bool(false),
        TypeDescriptor::Integer(_) => Value::from(0),
        TypeDescriptor::Float(_) => Value::from(0.0),
        TypeDescriptor::String => Value::String(String::new()),
        TypeDescriptor::Enumeration(descriptor) => descriptor
            .first_wire_name()
            .map_or(Value::Null, |wire| Value::String(wire.to_owned())),
        TypeDescriptor::Struct(descriptor) => Value::Object(
            descriptor
                .fields
                .iter()
                .filter_map(|field| {
                    field
                        .wire_name()
                        .map(|wire| (wire.to_owned(), zero_value(&field.ty)))
                })
                .collect(),
        ),
        TypeDescriptor::Array { len, element } => {
            Value::Array(std::iter::repeat_with(|| zero_value(element)).take(*len).collect())
        }
        TypeDescriptor::Sequence(_) => Value::Array(Vec::new()),
        TypeDescriptor::Map { .. } => Value::Object(Map::new()),
        TypeDescriptor::Pointer(element) => zero_value(element),
        TypeDescriptor::Dynamic | TypeDescriptor::Opaque(_) | TypeDescriptor::Recursive(_) => {
            Value::Null
        }
    }
}

fn expect_array(target: &str, value: Value) -> Result<Vec<Value>, ConvertError> {
    match value {
        Value::Array(items) => Ok(items),
        other => Err(ConvertError::type_mismatch(target, &other)),
    }
}

fn convert_items(element: &Arc<ConvertFn>, items: Vec<Value>) -> Result<Value, ConvertError> {
    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| element(item).map_err(|err| err.at(PathSegment::Index(index))))
        .collect::<Result<Vec<_>, _>>()
        .map(Value::Array)
}

/// Accepts the spellings of the standard boolean parser.
fn parse_bool(text: &str) -> Option<bool> {
    match text {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}

fn to_bool(value: Value) -> Result<Value, ConvertError> {
    if value.is_boolean() {
        return Ok(value);
    }
    let flag = match &value {
        Value::String(text) => parse_bool(text),
        Value::Number(number) => number
            .as_i64()
            .map(|int| int != 0)
            .or_else(|| number.as_u64().map(|uint| uint != 0)),
        _ => None,
    };
    flag.map(Value::Bool)
        .ok_or_else(|| ConvertError::type_mismatch("bool", &value))
}

fn to_integer(kind: IntegerKind, value: Value) -> Result<Value, ConvertError> {
    let mismatch = |value: &Value| ConvertError::type_mismatch(kind.to_string(), value);

    let (parsed, pass_through) = match &value {
        Value::Number(number) => {
            if let Some(int) = number.as_i64() {
                (i128::from(int), true)
            } else if let Some(uint) = number.as_u64() {
                (i128::from(uint), true)
            } else if kind.is_signed() {
                let float = number.as_f64().ok_or_else(|| mismatch(&value))?;
                (truncate(float).ok_or_else(|| mismatch(&value))?, false)
            } else {
                return Err(mismatch(&value));
            }
        }
        Value::String(text) => {
            let parsed = if kind.is_signed() {
                text.parse::<i64>().map(i128::from).ok()
            } else {
                text.parse::<u64>().map(i128::from).ok()
            };
            (parsed.ok_or_else(|| mismatch(&value))?, false)
        }
        _ => return Err(mismatch(&value)),
    };

    if !kind.contains(parsed) {
        return Err(mismatch(&value));
    }
    if pass_through {
        return Ok(value);
    }
    u64::try_from(parsed)
        .map(Value::from)
        .or_else(|_| i64::try_from(parsed).map(Value::from))
        .map_err(|_| mismatch(&value))
}

#[allow(clippy::cast_possible_truncation)]
fn truncate(float: f64) -> Option<i128> {
    float.is_finite().then(|| float.trunc() as i128)
}

fn to_float(kind: FloatKind, value: Value) -> Result<Value, ConvertError> {
    let mismatch = |value: &Value| ConvertError::type_mismatch(kind.to_string(), value);

    let parsed = match &value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.parse::<f64>().ok(),
        _ => None,
    }
    .filter(|&float| fits_float(kind, float))
    .ok_or_else(|| mismatch(&value))?;

    if value.is_number() {
        return Ok(value);
    }
    Number::from_f64(parsed)
        .map(Value::Number)
        .ok_or_else(|| mismatch(&value))
}

/// Finite after narrowing to the target width.
#[allow(clippy::cast_possible_truncation)]
fn fits_float(kind: FloatKind, float: f64) -> bool {
    match kind {
        FloatKind::F32 => (float as f32).is_finite(),
        FloatKind::F64 => float.is_finite(),
    }
}

fn to_string(value: Value) -> Result<Value, ConvertError> {
    match value {
        Value::String(_) => Ok(value),
        other => Err(ConvertError::type_mismatch("String", &other)),
    }
}
