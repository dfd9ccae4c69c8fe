//! Explicit descriptions of parameter types.

use std::fmt::{self, Display, Formatter};

/// Width and signedness of an integer type.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct IntegerKind {
    signed: bool,
    bits: u32,
}

impl IntegerKind {
    /// `i8`.
    pub const I8: Self = Self::new(true, 8);
    /// `i16`.
    pub const I16: Self = Self::new(true, 16);
    /// `i32`.
    pub const I32: Self = Self::new(true, 32);
    /// `i64`.
    pub const I64: Self = Self::new(true, 64);
    /// `isize`.
    pub const ISIZE: Self = Self::new(true, usize::BITS);
    /// `u8`.
    pub const U8: Self = Self::new(false, 8);
    /// `u16`.
    pub const U16: Self = Self::new(false, 16);
    /// `u32`.
    pub const U32: Self = Self::new(false, 32);
    /// `u64`.
    pub const U64: Self = Self::new(false, 64);
    /// `usize`.
    pub const USIZE: Self = Self::new(false, usize::BITS);

    const fn new(signed: bool, bits: u32) -> Self {
        Self { signed, bits }
    }

    /// Returns `true` for signed integers.
    #[must_use]
    pub const fn is_signed(self) -> bool {
        self.signed
    }

    /// Width in bits.
    #[must_use]
    pub const fn bits(self) -> u32 {
        self.bits
    }

    /// Smallest representable value.
    #[must_use]
    pub const fn min(self) -> i128 {
        if self.signed {
            -(1_i128 << (self.bits - 1))
        } else {
            0
        }
    }

    /// Largest representable value.
    #[must_use]
    pub const fn max(self) -> i128 {
        if self.signed {
            (1_i128 << (self.bits - 1)) - 1
        } else {
            (1_i128 << self.bits) - 1
        }
    }

    /// Returns `true` if `value` fits in this integer type.
    #[must_use]
    pub const fn contains(self, value: i128) -> bool {
        value >= self.min() && value <= self.max()
    }
}

impl Display for IntegerKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let prefix = if self.signed { 'i' } else { 'u' };
        write!(f, "{prefix}{}", self.bits)
    }
}

/// Width of a floating point type.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum FloatKind {
    /// `f32`.
    F32,
    /// `f64`.
    F64,
}

impl Display for FloatKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::F32 => f.write_str("f32"),
            Self::F64 => f.write_str("f64"),
        }
    }
}

/// Naming tag attached to a struct field.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum FieldTag {
    /// Use this name instead of the identifier.
    Rename(String),
    /// Hide the field.
    Skip,
}

/// One field of a struct descriptor.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldDescriptor {
    /// Field identifier as declared.
    pub ident: String,
    /// Explicit override tag (`#[tool_arg(...)]`).
    pub tag: Option<FieldTag>,
    /// Interchange-format tag (`#[serde(...)]`).
    pub wire_tag: Option<FieldTag>,
    /// Declared type of the field.
    pub ty: TypeDescriptor,
}

impl FieldDescriptor {
    /// Creates an untagged field.
    #[must_use]
    pub fn new(ident: impl Into<String>, ty: TypeDescriptor) -> Self {
        Self {
            ident: ident.into(),
            tag: None,
            wire_tag: None,
            ty,
        }
    }

    /// Sets the explicit override tag.
    #[must_use]
    pub fn with_tag(mut self, tag: FieldTag) -> Self {
        self.tag = Some(tag);
        self
    }

    /// Sets the interchange-format tag.
    #[must_use]
    pub fn with_wire_tag(mut self, tag: FieldTag) -> Self {
        self.wire_tag = Some(tag);
        self
    }

    /// Name under which callers see the field, or `None` if it is hidden.
    ///
    /// The override tag wins over the interchange tag, which wins over the
    /// identifier. A field the interchange format skips is never exposed, and
    /// an empty resolved name hides the field.
    #[must_use]
    pub fn resolved_name(&self) -> Option<&str> {
        let wire = self.wire_name()?;
        let name = match &self.tag {
            Some(FieldTag::Skip) => return None,
            Some(FieldTag::Rename(name)) => name.as_str(),
            None => wire,
        };
        (!name.is_empty()).then_some(name)
    }

    /// Key the interchange format reads the field from, or `None` if it skips
    /// the field.
    #[must_use]
    pub fn wire_name(&self) -> Option<&str> {
        match &self.wire_tag {
            Some(FieldTag::Skip) => None,
            Some(FieldTag::Rename(name)) => Some(name),
            None => Some(&self.ident),
        }
    }
}

/// Descriptor of a struct type.
#[derive(Clone, Debug, PartialEq)]
pub struct StructDescriptor {
    /// Fully qualified identifier used to look up field documentation.
    pub owner: String,
    /// Fields in declaration order.
    pub fields: Vec<FieldDescriptor>,
}

impl StructDescriptor {
    /// Creates a descriptor.
    #[must_use]
    pub fn new(owner: impl Into<String>, fields: Vec<FieldDescriptor>) -> Self {
        Self {
            owner: owner.into(),
            fields,
        }
    }
}

/// Descriptor of a fieldless enum represented as text.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct EnumDescriptor {
    /// Fully qualified identifier of the enum.
    pub owner: String,
    /// Accepted values in declaration order.
    pub variants: Vec<String>,
    /// Interchange-format name of each accepted value, index for index.
    pub wire_names: Vec<String>,
}

impl EnumDescriptor {
    /// Creates a descriptor whose accepted values are also its interchange
    /// names.
    #[must_use]
    pub fn new(owner: impl Into<String>, variants: Vec<String>) -> Self {
        Self {
            owner: owner.into(),
            wire_names: variants.clone(),
            variants,
        }
    }

    /// Sets the interchange names, index for index with the accepted values.
    ///
    /// Missing trailing entries fall back to the accepted value.
    #[must_use]
    pub fn with_wire_names(mut self, wire_names: Vec<String>) -> Self {
        self.wire_names = wire_names;
        self
    }

    /// Interchange name of the accepted value `variant`, or `None` if the
    /// enum does not accept it.
    #[must_use]
    pub fn wire_name(&self, variant: &str) -> Option<&str> {
        let index = self.variants.iter().position(|name| name == variant)?;
        Some(
            self.wire_names
                .get(index)
                .map_or(self.variants[index].as_str(), String::as_str),
        )
    }

    /// Interchange name of the first accepted value.
    #[must_use]
    pub fn first_wire_name(&self) -> Option<&str> {
        self.variants.first().and_then(|first| self.wire_name(first))
    }
}

/// Registration-time description of a declared parameter type.
#[derive(Clone, Debug, PartialEq)]
pub enum TypeDescriptor {
    /// `bool`.
    Boolean,
    /// Any integer type.
    Integer(IntegerKind),
    /// Any floating point type.
    Float(FloatKind),
    /// `String`.
    String,
    /// Fieldless enum carried as text.
    Enumeration(EnumDescriptor),
    /// Struct with named fields.
    Struct(StructDescriptor),
    /// Fixed-length array.
    Array {
        /// Declared length.
        len: usize,
        /// Element type.
        element: Box<TypeDescriptor>,
    },
    /// Variable-length sequence.
    Sequence(Box<TypeDescriptor>),
    /// Keyed map.
    Map {
        /// Key type.
        key: Box<TypeDescriptor>,
        /// Value type.
        value: Box<TypeDescriptor>,
    },
    /// Singly-owned box around another type.
    Pointer(Box<TypeDescriptor>),
    /// Open value of any shape.
    Dynamic,
    /// A type with no caller-facing representation. Such types can only be
    /// injected from a scope.
    Opaque(&'static str),
    /// A type reached again while its own descriptor was being built.
    Recursive(&'static str),
}

impl TypeDescriptor {
    /// Fixed-length array of `element`.
    #[must_use]
    pub fn array(len: usize, element: TypeDescriptor) -> Self {
        Self::Array {
            len,
            element: Box::new(element),
        }
    }

    /// Sequence of `element`.
    #[must_use]
    pub fn sequence(element: TypeDescriptor) -> Self {
        Self::Sequence(Box::new(element))
    }

    /// Map from `key` to `value`.
    #[must_use]
    pub fn map(key: TypeDescriptor, value: TypeDescriptor) -> Self {
        Self::Map {
            key: Box::new(key),
            value: Box::new(value),
        }
    }

    /// Box around `element`.
    #[must_use]
    pub fn pointer(element: TypeDescriptor) -> Self {
        Self::Pointer(Box::new(element))
    }

    /// Returns `true` if values of this type can serve as map keys.
    #[must_use]
    pub fn is_string_like(&self) -> bool {
        match self {
            Self::String | Self::Enumeration(_) => true,
            Self::Pointer(element) => element.is_string_like(),
            _ => false,
        }
    }

    /// Returns `true` for open values.
    #[must_use]
    pub fn is_dynamic(&self) -> bool {
        match self {
            Self::Dynamic => true,
            Self::Pointer(element) => element.is_dynamic(),
            _ => false,
        }
    }

    /// Short name of the descriptor kind.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Boolean => "boolean",
            Self::Integer(_) => "integer",
            Self::Float(_) => "float",
            Self::String => "string",
            Self::Enumeration(_) => "enumeration",
            Self::Struct(_) => "struct",
            Self::Array { .. } => "array",
            Self::Sequence(_) => "sequence",
            Self::Map { .. } => "map",
            Self::Pointer(_) => "pointer",
            Self::Dynamic => "dynamic",
            Self::Opaque(_) => "opaque",
            Self::Recursive(_) => "recursive",
        }
    }
}

impl Display for TypeDescriptor {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Boolean => f.write_str("bool"),
            Self::Integer(kind) => Display::fmt(kind, f),
            Self::Float(kind) => Display::fmt(kind, f),
            Self::String => f.write_str("String"),
            Self::Enumeration(descriptor) => f.write_str(&descriptor.owner),
            Self::Struct(descriptor) => f.write_str(&descriptor.owner),
            Self::Array { len, element } => write!(f, "[{element}; {len}]"),
            Self::Sequence(element) => write!(f, "Vec<{element}>"),
            Self::Map { key, value } => write!(f, "Map<{key}, {value}>"),
            Self::Pointer(element) => write!(f, "Box<{element}>"),
            Self::Dynamic => f.write_str("Value"),
            Self::Opaque(name) | Self::Recursive(name) => f.write_str(name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_bounds_follow_width_and_sign() {
        assert_eq!(IntegerKind::I8.min(), -128);
        assert_eq!(IntegerKind::I8.max(), 127);
        assert_eq!(IntegerKind::U8.min(), 0);
        assert_eq!(IntegerKind::U8.max(), 255);
        assert_eq!(IntegerKind::U64.max(), i128::from(u64::MAX));
        assert!(IntegerKind::I64.contains(i128::from(i64::MIN)));
        assert!(!IntegerKind::U32.contains(-1));
    }

    #[test]
    fn resolved_name_follows_tag_precedence() {
        let plain = FieldDescriptor::new("count", TypeDescriptor::Integer(IntegerKind::I32));
        assert_eq!(plain.resolved_name(), Some("count"));

        let wire = plain
            .clone()
            .with_wire_tag(FieldTag::Rename("total".into()));
        assert_eq!(wire.resolved_name(), Some("total"));
        assert_eq!(wire.wire_name(), Some("total"));

        let both = wire.clone().with_tag(FieldTag::Rename("n".into()));
        assert_eq!(both.resolved_name(), Some("n"));
        assert_eq!(both.wire_name(), Some("total"));

        let hidden = plain.clone().with_tag(FieldTag::Skip);
        assert_eq!(hidden.resolved_name(), None);
        assert_eq!(hidden.wire_name(), Some("count"));

        let empty = plain.clone().with_tag(FieldTag::Rename(String::new()));
        assert_eq!(empty.resolved_name(), None);
    }

    #[test]
    fn wire_skipped_field_is_never_exposed() {
        let field = FieldDescriptor::new("cache", TypeDescriptor::String)
            .with_tag(FieldTag::Rename("cache".into()))
            .with_wire_tag(FieldTag::Skip);
        assert_eq!(field.resolved_name(), None);
        assert_eq!(field.wire_name(), None);
    }

    #[test]
    fn enum_wire_names_follow_accepted_values() {
        let descriptor = EnumDescriptor::new("app::Mode", vec!["fast".into(), "slow".into()])
            .with_wire_names(vec!["Quick".into()]);
        assert_eq!(descriptor.wire_name("fast"), Some("Quick"));
        assert_eq!(descriptor.wire_name("slow"), Some("slow"));
        assert_eq!(descriptor.wire_name("Quick"), None);
        assert_eq!(descriptor.first_wire_name(), Some("Quick"));
        assert_eq!(EnumDescriptor::new("app::Empty", Vec::new()).first_wire_name(), None);
    }

    #[test]
    fn display_renders_rust_like_names() {
        let descriptor = TypeDescriptor::map(
            TypeDescriptor::String,
            TypeDescriptor::array(2, TypeDescriptor::Integer(IntegerKind::U16)),
        );
        assert_eq!(descriptor.to_string(), "Map<String, [u16; 2]>");
        assert!(TypeDescriptor::pointer(TypeDescriptor::String).is_string_like());
        assert!(!TypeDescriptor::Integer(IntegerKind::I64).is_string_like());
    }
}
