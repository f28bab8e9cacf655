//! Dynamic configuration values
//!
//! [`Value`] carries both raw configuration input (strings, numbers, booleans,
//! lists and nested maps, as produced by a YAML or JSON loader) and the
//! converted values the framework produces from it (optional wrappers,
//! materialized [`ConfigValue`]s, opaque dependency objects).

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use serde::de::Deserializer;
use serde::ser::{SerializeMap, SerializeSeq, Serializer};
use serde::{Deserialize, Serialize};

use crate::config::ConfigValue;
use crate::error::ConversionError;
use crate::optional::OptionalValue;
use crate::types::{ObjectType, ValueType};

/// Ordered map from option name to value
pub type ValueMap = BTreeMap<String, Value>;

/// A configuration value
#[derive(Debug, Clone)]
pub enum Value {
    /// Explicit null
    Null,
    /// Boolean
    Bool(bool),
    /// 32-bit integer
    Int(i32),
    /// 64-bit integer
    Long(i64),
    /// 64-bit float
    Double(f64),
    /// String
    String(String),
    /// List
    List(Vec<Value>),
    /// Nested map
    Map(ValueMap),
    /// Optional wrapper
    Optional(OptionalValue),
    /// Materialized schema value
    Config(ConfigValue),
    /// Opaque shared object
    Object(ObjectValue),
}

impl Value {
    /// Wrap a Rust value as an opaque object
    pub fn object<T: Any + Send + Sync>(value: T) -> Self {
        Self::Object(ObjectValue::new(value))
    }

    /// Short name of the variant, used in error messages
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Long(_) => "long",
            Self::Double(_) => "double",
            Self::String(_) => "string",
            Self::List(_) => "list",
            Self::Map(_) => "map",
            Self::Optional(_) => "optional",
            Self::Config(_) => "config",
            Self::Object(_) => "object",
        }
    }

    /// Whether this is [`Value::Null`]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Declared type inferred from the value itself
    ///
    /// Nulls and materialized configs infer as [`ValueType::Any`]; declare the
    /// type explicitly when a narrower one is needed.
    pub fn value_type(&self) -> ValueType {
        match self {
            Self::Null | Self::Config(_) => ValueType::Any,
            Self::Bool(_) => ValueType::Bool,
            Self::Int(_) => ValueType::Int,
            Self::Long(_) => ValueType::Long,
            Self::Double(_) => ValueType::Double,
            Self::String(_) => ValueType::String,
            Self::List(_) => ValueType::list(ValueType::Any),
            Self::Map(_) => ValueType::Map,
            Self::Optional(optional) => ValueType::Optional(optional.kind()),
            Self::Object(object) => ValueType::Object(object.object_type()),
        }
    }

    /// String content, if this is a string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Map content, if this is a map
    pub fn as_map(&self) -> Option<&ValueMap> {
        match self {
            Self::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Consume into a map, if this is a map
    pub fn into_map(self) -> Option<ValueMap> {
        match self {
            Self::Map(map) => Some(map),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Long(a), Self::Long(b)) => a == b,
            (Self::Double(a), Self::Double(b)) => a.to_bits() == b.to_bits(),
            (Self::String(a), Self::String(b)) => a == b,
            (Self::List(a), Self::List(b)) => a == b,
            (Self::Map(a), Self::Map(b)) => a == b,
            (Self::Optional(a), Self::Optional(b)) => a == b,
            (Self::Config(a), Self::Config(b)) => a == b,
            (Self::Object(a), Self::Object(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Self::Null => {}
            Self::Bool(v) => v.hash(state),
            Self::Int(v) => v.hash(state),
            Self::Long(v) => v.hash(state),
            Self::Double(v) => v.to_bits().hash(state),
            Self::String(v) => v.hash(state),
            Self::List(v) => v.hash(state),
            Self::Map(v) => v.hash(state),
            Self::Optional(v) => v.hash(state),
            Self::Config(v) => v.hash(state),
            Self::Object(v) => v.hash(state),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(v) => write!(f, "{}", v),
            Self::Int(v) => write!(f, "{}", v),
            Self::Long(v) => write!(f, "{}", v),
            Self::Double(v) => write!(f, "{:?}", v),
            Self::String(v) => write!(f, "{:?}", v),
            Self::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
            Self::Map(map) => write_map(f, map),
            Self::Optional(v) => write!(f, "{}", v),
            Self::Config(v) => write!(f, "{}", v),
            Self::Object(v) => write!(f, "<{}>", v.object_type().name()),
        }
    }
}

pub(crate) fn write_map(f: &mut fmt::Formatter<'_>, map: &ValueMap) -> fmt::Result {
    f.write_str("{")?;
    for (i, (key, value)) in map.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{}={}", key, value)?;
    }
    f.write_str("}")
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_none(),
            Self::Bool(v) => serializer.serialize_bool(*v),
            Self::Int(v) => serializer.serialize_i32(*v),
            Self::Long(v) => serializer.serialize_i64(*v),
            Self::Double(v) => serializer.serialize_f64(*v),
            Self::String(v) => serializer.serialize_str(v),
            Self::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Self::Map(map) => serialize_map(map, serializer),
            Self::Optional(v) => match v.get() {
                Some(inner) => inner.serialize(serializer),
                None => serializer.serialize_none(),
            },
            Self::Config(v) => serialize_map(v.properties(), serializer),
            Self::Object(v) => serializer.serialize_str(&format!("<{}>", v.object_type().name())),
        }
    }
}

pub(crate) fn serialize_map<S: Serializer>(map: &ValueMap, serializer: S) -> Result<S::Ok, S::Error> {
    let mut out = serializer.serialize_map(Some(map.len()))?;
    for (key, value) in map {
        out.serialize_entry(key, value)?;
    }
    out.end()
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(Value::from)
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Self::Long(i),
                None => Self::Double(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Self::String(s),
            serde_json::Value::Array(items) => {
                Self::List(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => Self::Map(
                map.into_iter()
                    .map(|(key, value)| (key, Value::from(value)))
                    .collect(),
            ),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Int(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Long(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Double(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Self::List(value)
    }
}

impl From<ValueMap> for Value {
    fn from(value: ValueMap) -> Self {
        Self::Map(value)
    }
}

impl From<OptionalValue> for Value {
    fn from(value: OptionalValue) -> Self {
        Self::Optional(value)
    }
}

impl From<ConfigValue> for Value {
    fn from(value: ConfigValue) -> Self {
        Self::Config(value)
    }
}

impl From<ObjectValue> for Value {
    fn from(value: ObjectValue) -> Self {
        Self::Object(value)
    }
}

/// A shared, type-erased Rust object
///
/// Equality and hashing use pointer identity.
#[derive(Clone)]
pub struct ObjectValue {
    object_type: ObjectType,
    value: Arc<dyn Any + Send + Sync>,
}

impl ObjectValue {
    /// Wrap a value
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self::from_arc(Arc::new(value))
    }

    /// Wrap an already shared value
    pub fn from_arc<T: Any + Send + Sync>(value: Arc<T>) -> Self {
        Self {
            object_type: ObjectType::of::<T>(),
            value,
        }
    }

    /// Identity of the wrapped type
    pub fn object_type(&self) -> ObjectType {
        self.object_type
    }

    /// Recover the wrapped value as `T`
    pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        Arc::clone(&self.value).downcast::<T>().ok()
    }
}

impl PartialEq for ObjectValue {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&self.value), Arc::as_ptr(&other.value))
    }
}

impl Eq for ObjectValue {}

impl Hash for ObjectValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (Arc::as_ptr(&self.value) as *const () as usize).hash(state);
    }
}

impl fmt::Debug for ObjectValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ObjectValue")
            .field(&self.object_type.name())
            .finish()
    }
}

/// Strict extraction of a Rust value from a converted [`Value`]
///
/// No parsing happens here; coercion from raw input is the converter's job.
pub trait FromValue: Sized {
    /// Extract `Self`
    fn from_value(value: Value) -> Result<Self, ConversionError>;
}

impl FromValue for Value {
    fn from_value(value: Value) -> Result<Self, ConversionError> {
        Ok(value)
    }
}

impl FromValue for bool {
    fn from_value(value: Value) -> Result<Self, ConversionError> {
        match value {
            Value::Bool(v) => Ok(v),
            other => Err(ConversionError::incompatible(&ValueType::Bool, other.kind())),
        }
    }
}

impl FromValue for i32 {
    fn from_value(value: Value) -> Result<Self, ConversionError> {
        match value {
            Value::Int(v) => Ok(v),
            Value::Long(v) => i32::try_from(v).map_err(|_| ConversionError::OutOfRange {
                expected: ValueType::Int,
                value: v.to_string(),
            }),
            other => Err(ConversionError::incompatible(&ValueType::Int, other.kind())),
        }
    }
}

impl FromValue for i64 {
    fn from_value(value: Value) -> Result<Self, ConversionError> {
        match value {
            Value::Int(v) => Ok(i64::from(v)),
            Value::Long(v) => Ok(v),
            other => Err(ConversionError::incompatible(&ValueType::Long, other.kind())),
        }
    }
}

impl FromValue for f64 {
    fn from_value(value: Value) -> Result<Self, ConversionError> {
        match value {
            Value::Double(v) => Ok(v),
            Value::Int(v) => Ok(f64::from(v)),
            other => Err(ConversionError::incompatible(&ValueType::Double, other.kind())),
        }
    }
}

impl FromValue for String {
    fn from_value(value: Value) -> Result<Self, ConversionError> {
        match value {
            Value::String(v) => Ok(v),
            other => Err(ConversionError::incompatible(&ValueType::String, other.kind())),
        }
    }
}

impl FromValue for ValueMap {
    fn from_value(value: Value) -> Result<Self, ConversionError> {
        match value {
            Value::Map(v) => Ok(v),
            Value::Config(v) => Ok(v.to_map()),
            other => Err(ConversionError::incompatible(&ValueType::Map, other.kind())),
        }
    }
}

impl FromValue for ConfigValue {
    fn from_value(value: Value) -> Result<Self, ConversionError> {
        match value {
            Value::Config(v) => Ok(v),
            other => Err(ConversionError::incompatible(&ValueType::Any, other.kind())),
        }
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    fn from_value(value: Value) -> Result<Self, ConversionError> {
        match value {
            Value::List(items) => items
                .into_iter()
                .enumerate()
                .map(|(index, item)| {
                    T::from_value(item).map_err(|source| ConversionError::Element {
                        index,
                        source: Box::new(source),
                    })
                })
                .collect(),
            other => Err(ConversionError::incompatible(
                &ValueType::list(ValueType::Any),
                other.kind(),
            )),
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: Value) -> Result<Self, ConversionError> {
        match value {
            Value::Null => Ok(None),
            Value::Optional(optional) => optional.into_inner().map(T::from_value).transpose(),
            other => T::from_value(other).map(Some),
        }
    }
}

impl<T: Any + Send + Sync> FromValue for Arc<T> {
    fn from_value(value: Value) -> Result<Self, ConversionError> {
        let expected = ValueType::object::<T>();
        match value {
            Value::Object(object) => object
                .downcast::<T>()
                .ok_or_else(|| ConversionError::incompatible(&expected, "object")),
            other => Err(ConversionError::incompatible(&expected, other.kind())),
        }
    }
}
