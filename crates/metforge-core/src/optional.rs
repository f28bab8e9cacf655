//! Optional value kinds
//!
//! Four wrapper kinds mark a schema member as not required: a generic
//! optional over any inner type, and three primitive-specialized kinds for
//! int, long and double. Each kind has its own canonical empty value, which is
//! what an omitted member materializes to.

use std::fmt;
use std::hash::{Hash, Hasher};

use crate::error::ConversionError;
use crate::types::ValueType;
use crate::value::Value;

/// A recognized optional wrapper kind
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum OptionalKind {
    /// Optional over an arbitrary inner type
    Generic(Box<ValueType>),
    /// Optional int
    Int,
    /// Optional long
    Long,
    /// Optional double
    Double,
}

impl OptionalKind {
    /// Generic optional over `inner`
    pub fn of(inner: ValueType) -> Self {
        Self::Generic(Box::new(inner))
    }

    /// Generic optional without a declared inner type
    pub fn untyped() -> Self {
        Self::of(ValueType::Any)
    }

    /// Type carried by the wrapper
    pub fn inner_type(&self) -> ValueType {
        match self {
            Self::Generic(inner) => (**inner).clone(),
            Self::Int => ValueType::Int,
            Self::Long => ValueType::Long,
            Self::Double => ValueType::Double,
        }
    }

    /// Canonical absent value of this kind
    pub fn empty(&self) -> OptionalValue {
        match self {
            Self::Generic(_) => OptionalValue::Generic(None),
            Self::Int => OptionalValue::Int(None),
            Self::Long => OptionalValue::Long(None),
            Self::Double => OptionalValue::Double(None),
        }
    }

    /// Wrap a value already converted to [`inner_type`](Self::inner_type)
    pub fn wrap(&self, value: Value) -> Result<OptionalValue, ConversionError> {
        let wrapped = match (self, value) {
            (_, Value::Null) => self.empty(),
            (Self::Generic(_), value) => OptionalValue::Generic(Some(Box::new(value))),
            (Self::Int, Value::Int(n)) => OptionalValue::Int(Some(n)),
            (Self::Long, Value::Long(n)) => OptionalValue::Long(Some(n)),
            (Self::Double, Value::Double(n)) => OptionalValue::Double(Some(n)),
            (_, other) => {
                return Err(ConversionError::incompatible(
                    &self.inner_type(),
                    other.kind(),
                ));
            }
        };
        Ok(wrapped)
    }

    pub(crate) fn is_assignable_from(&self, other: &OptionalKind) -> bool {
        match (self, other) {
            (Self::Generic(target), Self::Generic(source)) => target.is_assignable_from(source),
            _ => self == other,
        }
    }
}

impl fmt::Display for OptionalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Generic(inner) => write!(f, "optional<{}>", inner),
            Self::Int => f.write_str("optional_int"),
            Self::Long => f.write_str("optional_long"),
            Self::Double => f.write_str("optional_double"),
        }
    }
}

impl From<OptionalKind> for ValueType {
    fn from(kind: OptionalKind) -> Self {
        ValueType::Optional(kind)
    }
}

/// Whether `ty` is one of the optional kinds
pub fn is_optional(ty: &ValueType) -> bool {
    kind_of(ty).is_some()
}

/// The optional kind of `ty`, if any
pub fn kind_of(ty: &ValueType) -> Option<&OptionalKind> {
    match ty {
        ValueType::Optional(kind) => Some(kind),
        _ => None,
    }
}

/// Inner type of an optional `ty`, `None` when `ty` is not optional
pub fn inner_type(ty: &ValueType) -> Option<ValueType> {
    kind_of(ty).map(OptionalKind::inner_type)
}

/// Canonical empty value for an optional `ty`
pub fn empty(ty: &ValueType) -> Option<OptionalValue> {
    kind_of(ty).map(OptionalKind::empty)
}

/// `ty` with any optional wrapper removed
pub fn unwrap(ty: &ValueType) -> ValueType {
    inner_type(ty).unwrap_or_else(|| ty.clone())
}

/// A value of one of the optional kinds
#[derive(Debug, Clone)]
pub enum OptionalValue {
    /// Generic optional
    Generic(Option<Box<Value>>),
    /// Optional int
    Int(Option<i32>),
    /// Optional long
    Long(Option<i64>),
    /// Optional double
    Double(Option<f64>),
}

impl OptionalValue {
    /// Whether a value is present
    pub fn is_present(&self) -> bool {
        match self {
            Self::Generic(v) => v.is_some(),
            Self::Int(v) => v.is_some(),
            Self::Long(v) => v.is_some(),
            Self::Double(v) => v.is_some(),
        }
    }

    /// The carried value, if present
    pub fn get(&self) -> Option<Value> {
        match self {
            Self::Generic(v) => v.as_deref().cloned(),
            Self::Int(v) => v.map(Value::Int),
            Self::Long(v) => v.map(Value::Long),
            Self::Double(v) => v.map(Value::Double),
        }
    }

    /// Consume into the carried value, if present
    pub fn into_inner(self) -> Option<Value> {
        match self {
            Self::Generic(v) => v.map(|boxed| *boxed),
            other => other.get(),
        }
    }

    /// Kind of this value; generic values report an untyped inner type
    pub fn kind(&self) -> OptionalKind {
        match self {
            Self::Generic(_) => OptionalKind::untyped(),
            Self::Int(_) => OptionalKind::Int,
            Self::Long(_) => OptionalKind::Long,
            Self::Double(_) => OptionalKind::Double,
        }
    }

    fn prefix(&self) -> &'static str {
        match self {
            Self::Generic(_) => "Optional",
            Self::Int(_) => "OptionalInt",
            Self::Long(_) => "OptionalLong",
            Self::Double(_) => "OptionalDouble",
        }
    }
}

impl PartialEq for OptionalValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Generic(a), Self::Generic(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Long(a), Self::Long(b)) => a == b,
            (Self::Double(a), Self::Double(b)) => a.map(f64::to_bits) == b.map(f64::to_bits),
            _ => false,
        }
    }
}

impl Eq for OptionalValue {}

impl Hash for OptionalValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Self::Generic(v) => v.hash(state),
            Self::Int(v) => v.hash(state),
            Self::Long(v) => v.hash(state),
            Self::Double(v) => v.map(f64::to_bits).hash(state),
        }
    }
}

impl fmt::Display for OptionalValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.get() {
            Some(value) => write!(f, "{}[{}]", self.prefix(), value),
            None => write!(f, "{}.empty", self.prefix()),
        }
    }
}
