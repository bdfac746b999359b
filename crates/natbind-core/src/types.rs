//! The closed semantic type set and its native layouts.

use std::borrow::Cow;
use std::fmt;

/// Value categories understood by the binding layer.
///
/// The set is closed: there is no widening or coercion between kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SemanticType {
    Int32,
    Int64,
    /// Nul-terminated byte sequence, nullable.
    NativeString,
    /// Opaque native address, nullable.
    Handle,
    /// Return-only.
    Void,
}

impl SemanticType {
    pub const ALL: [SemanticType; 5] = [
        SemanticType::Int32,
        SemanticType::Int64,
        SemanticType::NativeString,
        SemanticType::Handle,
        SemanticType::Void,
    ];

    /// Native layout of this type. Total over the closed set.
    pub const fn layout(self) -> NativeLayout {
        match self {
            SemanticType::Int32 => NativeLayout::Int32,
            SemanticType::Int64 => NativeLayout::Int64,
            SemanticType::NativeString | SemanticType::Handle => NativeLayout::Pointer,
            SemanticType::Void => NativeLayout::Void,
        }
    }

    /// Whether managed `null` is a valid value of this type.
    pub const fn is_nullable(self) -> bool {
        matches!(self, SemanticType::NativeString | SemanticType::Handle)
    }

    /// Whether this type may appear in parameter position.
    pub const fn is_param_type(self) -> bool {
        !matches!(self, SemanticType::Void)
    }

    /// Parse a type name as written in signature files.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "i32" | "int" | "int32" => Some(SemanticType::Int32),
            "i64" | "int64" | "long" => Some(SemanticType::Int64),
            "string" | "str" | "cstr" => Some(SemanticType::NativeString),
            "handle" | "ptr" | "pointer" => Some(SemanticType::Handle),
            "void" => Some(SemanticType::Void),
            _ => None,
        }
    }

    /// Canonical signature-file spelling.
    pub const fn name(self) -> &'static str {
        match self {
            SemanticType::Int32 => "i32",
            SemanticType::Int64 => "i64",
            SemanticType::NativeString => "string",
            SemanticType::Handle => "handle",
            SemanticType::Void => "void",
        }
    }
}

impl fmt::Display for SemanticType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// ABI representation class of a semantic type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum NativeLayout {
    Void,
    Int32,
    Int64,
    /// Pointer-sized address.
    Pointer,
}

impl NativeLayout {
    /// Width in bytes on the host platform.
    pub const fn size(self) -> usize {
        match self {
            NativeLayout::Void => 0,
            NativeLayout::Int32 => 4,
            NativeLayout::Int64 => 8,
            NativeLayout::Pointer => std::mem::size_of::<usize>(),
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            NativeLayout::Void => "void",
            NativeLayout::Int32 => "int32",
            NativeLayout::Int64 => "int64",
            NativeLayout::Pointer => "pointer",
        }
    }
}

impl fmt::Display for NativeLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A type as written in an interface description.
///
/// Names are kept verbatim until planning so that an unknown name is
/// reported as `UnsupportedType` at bind time, with its position.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeSpec {
    Known(SemanticType),
    Named(String),
}

impl TypeSpec {
    pub fn named(name: impl Into<String>) -> Self {
        TypeSpec::Named(name.into())
    }

    pub fn resolve(&self) -> Option<SemanticType> {
        match self {
            TypeSpec::Known(ty) => Some(*ty),
            TypeSpec::Named(name) => SemanticType::from_name(name),
        }
    }
}

impl From<SemanticType> for TypeSpec {
    fn from(ty: SemanticType) -> Self {
        TypeSpec::Known(ty)
    }
}

impl From<&str> for TypeSpec {
    fn from(name: &str) -> Self {
        TypeSpec::Named(name.to_string())
    }
}

impl fmt::Display for TypeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeSpec::Known(ty) => write!(f, "{}", ty),
            TypeSpec::Named(name) => f.write_str(name),
        }
    }
}

/// The (return layout, parameter layouts) shape of one native call.
///
/// Generated code lists every shape it uses as `&'static` data, so the
/// parameter list is a `Cow` that can be borrowed in a `const`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct CallShape {
    pub ret: NativeLayout,
    pub params: Cow<'static, [NativeLayout]>,
}

impl CallShape {
    pub const fn new(ret: NativeLayout, params: &'static [NativeLayout]) -> Self {
        Self {
            ret,
            params: Cow::Borrowed(params),
        }
    }

    pub fn owned(ret: NativeLayout, params: Vec<NativeLayout>) -> Self {
        Self {
            ret,
            params: Cow::Owned(params),
        }
    }
}

impl fmt::Display for CallShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, p) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", p)?;
        }
        write!(f, ") -> {}", self.ret)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_is_total() {
        for ty in SemanticType::ALL {
            // Every type maps to exactly one layout; strings and handles share one.
            let layout = ty.layout();
            assert_eq!(layout, ty.layout());
        }
        assert_eq!(SemanticType::NativeString.layout(), NativeLayout::Pointer);
        assert_eq!(SemanticType::Handle.layout(), NativeLayout::Pointer);
        assert_eq!(SemanticType::Int32.layout().size(), 4);
        assert_eq!(SemanticType::Void.layout().size(), 0);
    }

    #[test]
    fn test_from_name_aliases() {
        assert_eq!(SemanticType::from_name("int"), Some(SemanticType::Int32));
        assert_eq!(SemanticType::from_name("INT64"), Some(SemanticType::Int64));
        assert_eq!(SemanticType::from_name(" cstr "), Some(SemanticType::NativeString));
        assert_eq!(SemanticType::from_name("ptr"), Some(SemanticType::Handle));
        assert_eq!(SemanticType::from_name("f64"), None);
        for ty in SemanticType::ALL {
            assert_eq!(SemanticType::from_name(ty.name()), Some(ty));
        }
    }

    #[test]
    fn test_nullability() {
        assert!(SemanticType::NativeString.is_nullable());
        assert!(SemanticType::Handle.is_nullable());
        assert!(!SemanticType::Int32.is_nullable());
        assert!(!SemanticType::Int64.is_nullable());
    }

    #[test]
    fn test_call_shape_display() {
        const SHAPE: CallShape =
            CallShape::new(NativeLayout::Int32, &[NativeLayout::Pointer, NativeLayout::Int64]);
        assert_eq!(SHAPE.to_string(), "(pointer, int64) -> int32");
        assert_eq!(
            SHAPE,
            CallShape::owned(
                NativeLayout::Int32,
                vec![NativeLayout::Pointer, NativeLayout::Int64]
            )
        );
    }
}
