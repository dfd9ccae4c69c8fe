//! Types that can appear as tool parameters.

use std::any::TypeId;
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::hash::{BuildHasher, Hash};

use serde::de::DeserializeOwned;
use serde_json::Value;
use toolbind_schema::{FloatKind, IntegerKind, TypeDescriptor};

use crate::convert::{ConvertError, ConvertErrorKind, PathSegment};

/// A type whose shape is known at registration and which can be rebuilt from
/// a canonical value.
///
/// Implemented for primitives, `String`, `Vec`, fixed arrays, string-keyed
/// maps, `Box` and `serde_json::Value`. Structs and fieldless enums derive it:
///
/// ```
/// use toolbind::ToolArg;
/// use toolbind::schema::TypeDescriptor;
///
/// #[derive(ToolArg, serde::Deserialize)]
/// struct Window {
///     /// Width in pixels.
///     width: u32,
///     #[serde(rename = "h")]
///     height: u32,
/// }
///
/// let TypeDescriptor::Struct(descriptor) = Window::descriptor() else {
///     unreachable!()
/// };
/// assert_eq!(descriptor.fields[1].wire_name(), Some("h"));
/// ```
pub trait ToolArg: Sized + Send + 'static {
    /// Registration-time description of the type.
    fn descriptor() -> TypeDescriptor;

    /// Materializes a value from the output of the type's converter.
    ///
    /// # Errors
    ///
    /// Returns [`ConvertError`] if `value` does not have the canonical shape.
    fn from_canonical(value: Value) -> Result<Self, ConvertError>;
}

/// Deserializes a canonical value with serde.
///
/// # Errors
///
/// Returns a type mismatch naming `T` if deserialization fails.
pub fn deserialize_canonical<T: DeserializeOwned>(value: Value) -> Result<T, ConvertError> {
    match serde::Deserialize::deserialize(&value) {
        Ok(parsed) => Ok(parsed),
        Err(_) => Err(ConvertError::type_mismatch(
            std::any::type_name::<T>(),
            &value,
        )),
    }
}

thread_local! {
    static BUILDING: RefCell<Vec<TypeId>> = const { RefCell::new(Vec::new()) };
}

struct Building;

impl Drop for Building {
    fn drop(&mut self) {
        BUILDING.with_borrow_mut(|stack| {
            stack.pop();
        });
    }
}

/// Builds the descriptor of a derived type, cutting self-reference short.
///
/// A type reached again while its own descriptor is still being built is
/// described as [`TypeDescriptor::Recursive`], which registration rejects.
#[doc(hidden)]
pub fn guard_descriptor<T: 'static>(
    name: &'static str,
    build: impl FnOnce() -> TypeDescriptor,
) -> TypeDescriptor {
    let id = TypeId::of::<T>();
    let entered = BUILDING.with_borrow_mut(|stack| {
        if stack.contains(&id) {
            false
        } else {
            stack.push(id);
            true
        }
    });
    if !entered {
        return TypeDescriptor::Recursive(name);
    }
    let _building = Building;
    build()
}

/// Rejects every value. Used by types that can only be injected.
///
/// # Errors
///
/// Always returns a type mismatch naming `name`.
pub fn opaque_canonical<T>(name: &'static str, value: &Value) -> Result<T, ConvertError> {
    Err(ConvertError::type_mismatch(name, value))
}

macro_rules! serde_arg {
    ($($ty:ty => $descriptor:expr),* $(,)?) => {
        $(
            impl ToolArg for $ty {
                fn descriptor() -> TypeDescriptor {
                    $descriptor
                }

                fn from_canonical(value: Value) -> Result<Self, ConvertError> {
                    deserialize_canonical(value)
                }
            }
        )*
    };
}

serde_arg! {
    bool => TypeDescriptor::Boolean,
    i8 => TypeDescriptor::Integer(IntegerKind::I8),
    i16 => TypeDescriptor::Integer(IntegerKind::I16),
    i32 => TypeDescriptor::Integer(IntegerKind::I32),
    i64 => TypeDescriptor::Integer(IntegerKind::I64),
    isize => TypeDescriptor::Integer(IntegerKind::ISIZE),
    u8 => TypeDescriptor::Integer(IntegerKind::U8),
    u16 => TypeDescriptor::Integer(IntegerKind::U16),
    u32 => TypeDescriptor::Integer(IntegerKind::U32),
    u64 => TypeDescriptor::Integer(IntegerKind::U64),
    usize => TypeDescriptor::Integer(IntegerKind::USIZE),
    f32 => TypeDescriptor::Float(FloatKind::F32),
    f64 => TypeDescriptor::Float(FloatKind::F64),
    String => TypeDescriptor::String,
}

impl ToolArg for Value {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::Dynamic
    }

    fn from_canonical(value: Value) -> Result<Self, ConvertError> {
        Ok(value)
    }
}

impl<T: ToolArg> ToolArg for Box<T> {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::pointer(T::descriptor())
    }

    fn from_canonical(value: Value) -> Result<Self, ConvertError> {
        T::from_canonical(value).map(Box::new)
    }
}

fn items<T: ToolArg>(expected: impl FnOnce() -> String, value: Value) -> Result<Vec<T>, ConvertError> {
    let Value::Array(items) = value else {
        return Err(ConvertError::type_mismatch(expected(), &value));
    };
    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| T::from_canonical(item).map_err(|err| err.at(PathSegment::Index(index))))
        .collect()
}

impl<T: ToolArg> ToolArg for Vec<T> {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::sequence(T::descriptor())
    }

    fn from_canonical(value: Value) -> Result<Self, ConvertError> {
        items(|| Self::descriptor().to_string(), value)
    }
}

impl<T: ToolArg, const N: usize> ToolArg for [T; N] {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::array(N, T::descriptor())
    }

    fn from_canonical(value: Value) -> Result<Self, ConvertError> {
        let items: Vec<T> = items(|| Self::descriptor().to_string(), value)?;
        items.try_into().map_err(|items: Vec<T>| {
            ConvertError::new(ConvertErrorKind::LengthMismatch {
                expected: N,
                found: items.len(),
            })
        })
    }
}

fn entries<K, V>(expected: impl FnOnce() -> String, value: Value) -> Result<Vec<(K, V)>, ConvertError>
where
    K: ToolArg,
    V: ToolArg,
{
    let Value::Object(entries) = value else {
        return Err(ConvertError::type_mismatch(expected(), &value));
    };
    entries
        .into_iter()
        .map(|(key, value)| {
            let parsed_key = K::from_canonical(Value::String(key.clone()))
                .map_err(|err| err.at(PathSegment::Key(key.clone())))?;
            let parsed_value =
                V::from_canonical(value).map_err(|err| err.at(PathSegment::Key(key)))?;
            Ok((parsed_key, parsed_value))
        })
        .collect()
}

impl<K, V, S> ToolArg for HashMap<K, V, S>
where
    K: ToolArg + Eq + Hash,
    V: ToolArg,
    S: BuildHasher + Default + Send + 'static,
{
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::map(K::descriptor(), V::descriptor())
    }

    fn from_canonical(value: Value) -> Result<Self, ConvertError> {
        Ok(entries(|| Self::descriptor().to_string(), value)?
            .into_iter()
            .collect())
    }
}

impl<K, V> ToolArg for BTreeMap<K, V>
where
    K: ToolArg + Ord,
    V: ToolArg,
{
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::map(K::descriptor(), V::descriptor())
    }

    fn from_canonical(value: Value) -> Result<Self, ConvertError> {
        Ok(entries(|| Self::descriptor().to_string(), value)?
            .into_iter()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn scalars_materialize_from_canonical_values() {
        assert_eq!(i64::from_canonical(json!(-3)).unwrap(), -3);
        assert_eq!(u8::from_canonical(json!(200)).unwrap(), 200);
        assert!((f32::from_canonical(json!(1.5)).unwrap() - 1.5).abs() < f32::EPSILON);
        assert_eq!(String::from_canonical(json!("x")).unwrap(), "x");
        assert!(bool::from_canonical(json!("true")).is_err());
    }

    #[test]
    fn reentrant_descriptors_are_marked_recursive() {
        struct Node;

        let outer = guard_descriptor::<Node>("tree::Node", || {
            TypeDescriptor::sequence(guard_descriptor::<Node>("tree::Node", || {
                TypeDescriptor::String
            }))
        });
        assert_eq!(
            outer,
            TypeDescriptor::sequence(TypeDescriptor::Recursive("tree::Node"))
        );
        assert_eq!(
            guard_descriptor::<Node>("tree::Node", || TypeDescriptor::String),
            TypeDescriptor::String
        );
    }

    #[test]
    fn fixed_arrays_report_length_mismatch() {
        let pair = <[u16; 2]>::from_canonical(json!([1, 2])).unwrap();
        assert_eq!(pair, [1, 2]);

        let err = <[u16; 2]>::from_canonical(json!([1])).unwrap_err();
        assert_eq!(
            err.kind(),
            &ConvertErrorKind::LengthMismatch {
                expected: 2,
                found: 1
            }
        );
    }

    #[test]
    fn nested_collections_keep_error_paths() {
        let err = Vec::<Vec<i32>>::from_canonical(json!([[1], [2, "x"]])).unwrap_err();
        assert_eq!(err.path(), &[PathSegment::Index(1), PathSegment::Index(1)]);
    }

    #[test]
    fn maps_parse_keys_through_the_key_type() {
        let map = BTreeMap::<String, Vec<u8>>::from_canonical(json!({ "a": [1], "b": [] })).unwrap();
        assert_eq!(map["a"], vec![1]);
        assert!(map["b"].is_empty());

        let map = HashMap::<String, bool>::from_canonical(json!({ "on": true })).unwrap();
        assert_eq!(map.get("on"), Some(&true));
    }

    #[test]
    fn descriptors_compose() {
        assert_eq!(
            HashMap::<String, [Box<i8>; 3]>::descriptor().to_string(),
            "Map<String, [Box<i8>; 3]>"
        );
        assert!(Value::descriptor().is_dynamic());
    }
}
