//! Materialized configuration values
//!
//! A [`ConfigValue`] is the runtime value of a schema type: the schema name
//! plus a map from property name to converted value. It is immutable and
//! cheap to clone. Equality, hashing and rendering depend only on the schema
//! name and the property map, never on how or when the value was built.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use serde::{Serialize, Serializer};
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};
use crate::value::{FromValue, Value, ValueMap, serialize_map, write_map};

/// Immutable materialization of a schema type
#[derive(Clone)]
pub struct ConfigValue {
    inner: Arc<Inner>,
}

#[derive(PartialEq, Eq, Hash)]
struct Inner {
    schema: String,
    properties: ValueMap,
}

impl ConfigValue {
    /// Create a config value from its schema name and property map
    pub fn new(schema: impl Into<String>, properties: ValueMap) -> Self {
        Self {
            inner: Arc::new(Inner {
                schema: schema.into(),
                properties,
            }),
        }
    }

    /// Name of the schema this value materializes
    pub fn schema_name(&self) -> &str {
        &self.inner.schema
    }

    /// All properties, ordered by name
    pub fn properties(&self) -> &ValueMap {
        &self.inner.properties
    }

    /// Raw property value
    pub fn get_raw(&self, property: &str) -> Option<&Value> {
        self.inner.properties.get(property)
    }

    /// Typed property value
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let retries: Option<i32> = config.get("retries")?;
    /// ```
    pub fn get<T: FromValue>(&self, property: &str) -> Result<T> {
        let value = self
            .get_raw(property)
            .cloned()
            .ok_or_else(|| Error::UnknownOption {
                target: self.schema_name().to_string(),
                option: property.to_string(),
            })?;
        T::from_value(value).map_err(|source| Error::Conversion {
            target: self.schema_name().to_string(),
            option: property.to_string(),
            source,
        })
    }

    /// Copy of the property map
    pub fn to_map(&self) -> ValueMap {
        self.inner.properties.clone()
    }

    /// Whether both handles share the same allocation
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Hex SHA-256 of the canonical rendering
    ///
    /// Equal config values always produce the same fingerprint.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.to_string().as_bytes());
        hex::encode(hasher.finalize())
    }
}

impl PartialEq for ConfigValue {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || self.inner == other.inner
    }
}

impl Eq for ConfigValue {}

impl Hash for ConfigValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.hash(state);
    }
}

impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.inner.schema)?;
        write_map(f, &self.inner.properties)
    }
}

impl fmt::Debug for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigValue")
            .field("schema", &self.inner.schema)
            .field("properties", &self.inner.properties)
            .finish()
    }
}

impl Serialize for ConfigValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serialize_map(&self.inner.properties, serializer)
    }
}
