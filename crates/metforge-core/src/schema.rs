//! Schema validation and config materialization
//!
//! A schema is a [`TypeDescriptor`] for a tagged contract type whose abstract
//! members are zero-argument accessors. [`ConfigMaterializer`] checks that a
//! descriptor is a legal schema, compiles it into a property table, and turns
//! raw nested maps into [`ConfigValue`]s.
//!
//! Validation is recursive: every member whose (optional-unwrapped) type is a
//! nested schema is validated too, and a revisit of a schema that is still
//! being validated fails with a circular reference naming the whole path.
//! Successful validations are cached per schema name together with the
//! descriptor they were compiled from; a lookup only hits when the descriptor
//! is equal, so another descriptor reusing a name is validated on its own.
//! Failures are not cached since validation is a pure function of the
//! descriptor.
//!
//! # Example
//!
//! ```rust,ignore
//! let descriptor = TypeDescriptor::schema("Retry")
//!     .accessor("getName", ValueType::String)
//!     .accessor("retries", OptionalKind::Int.into());
//!
//! let materializer = ConfigMaterializer::new();
//! let config = materializer.materialize(&descriptor, &raw)?;
//! assert_eq!(config.get::<String>("name")?, "x");
//! ```

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::config::ConfigValue;
use crate::convert::{DefaultConverter, ValueConverter};
use crate::error::{Error, Result, SchemaError};
use crate::naming;
use crate::optional::{self, OptionalKind};
use crate::types::{MemberBody, SchemaRef, Signature, TypeDescriptor, TypeForm, ValueType};
use crate::value::{Value, ValueMap};

/// A strongly-typed view over a materialized schema
pub trait Schema: Sized + 'static {
    /// Schema name, unique among the schemas of a process
    const NAME: &'static str;

    /// Describe the schema's accessors
    fn descriptor() -> TypeDescriptor;

    /// Read the typed view out of a materialized value
    fn from_config(config: ConfigValue) -> Result<Self>;
}

/// One configuration property of a compiled schema
#[derive(Debug, Clone)]
struct Property {
    name: String,
    accessor: Signature,
    optional: Option<OptionalKind>,
    nested: Option<SchemaRef>,
}

/// Validated property table of a schema
#[derive(Debug)]
pub struct CompiledSchema {
    name: String,
    properties: Vec<Property>,
}

impl CompiledSchema {
    /// Schema name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Look up a property by canonical name
    fn property(&self, name: &str) -> Option<&Property> {
        self.properties
            .binary_search_by(|p| p.name.as_str().cmp(name))
            .ok()
            .map(|i| &self.properties[i])
    }

    /// Canonical names of all properties
    pub fn option_names(&self) -> Vec<String> {
        self.properties.iter().map(|p| p.name.clone()).collect()
    }
}

type SchemaCache = RwLock<HashMap<String, (TypeDescriptor, Arc<CompiledSchema>)>>;

/// Validates schemas and materializes raw maps into config values
///
/// Safe to share between threads: the only mutable state is the validation
/// cache, and materialization itself only reads compiled schemas.
pub struct ConfigMaterializer {
    converter: Arc<dyn ValueConverter>,
    validated: SchemaCache,
}

impl Default for ConfigMaterializer {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigMaterializer {
    /// Materializer using [`DefaultConverter`]
    pub fn new() -> Self {
        Self::with_converter(Arc::new(DefaultConverter))
    }

    /// Materializer using a custom converter
    pub fn with_converter(converter: Arc<dyn ValueConverter>) -> Self {
        Self {
            converter,
            validated: RwLock::new(HashMap::new()),
        }
    }

    /// Whether `descriptor` is a legal schema; never fails
    pub fn is_valid_schema(&self, descriptor: &TypeDescriptor) -> bool {
        self.validate(descriptor).is_ok()
    }

    /// Validate `descriptor` and every schema reachable from it
    pub fn validate(&self, descriptor: &TypeDescriptor) -> Result<Arc<CompiledSchema>> {
        self.pass().compile(descriptor, &mut Vec::new())
    }

    /// Build a config value for `descriptor` from `raw`
    pub fn materialize(&self, descriptor: &TypeDescriptor, raw: &ValueMap) -> Result<ConfigValue> {
        self.pass().materialize(descriptor, raw)
    }

    /// Build the typed view `S` from `raw`
    pub fn materialize_as<S: Schema>(&self, raw: &ValueMap) -> Result<S> {
        let config = self.materialize(&S::descriptor(), raw)?;
        S::from_config(config)
    }

    fn pass(&self) -> Pass<'_> {
        Pass {
            converter: self.converter.as_ref(),
            cache: Some(&self.validated),
        }
    }
}

/// Uncached materialization, used by converters for nested schema values
pub(crate) fn materialize_with(
    converter: &dyn ValueConverter,
    descriptor: &TypeDescriptor,
    raw: &ValueMap,
) -> Result<ConfigValue> {
    Pass {
        converter,
        cache: None,
    }
    .materialize(descriptor, raw)
}

struct Pass<'a> {
    converter: &'a dyn ValueConverter,
    cache: Option<&'a SchemaCache>,
}

impl Pass<'_> {
    fn materialize(&self, descriptor: &TypeDescriptor, raw: &ValueMap) -> Result<ConfigValue> {
        let schema = self.compile(descriptor, &mut Vec::new())?;
        self.build(&schema, raw, &mut Vec::new())
    }

    fn compile(
        &self,
        descriptor: &TypeDescriptor,
        stack: &mut Vec<String>,
    ) -> Result<Arc<CompiledSchema>> {
        if let Some(cached) = self.cached(descriptor) {
            tracing::trace!("Schema '{}' served from cache", descriptor.name());
            return Ok(cached);
        }

        let mut visit = Visit::enter(stack, descriptor.name())?;
        let schema = Arc::new(check(descriptor)?);

        for property in &schema.properties {
            if let Some(nested) = &property.nested {
                self.compile(&nested.resolve(), visit.stack())?;
            }
        }

        tracing::debug!(
            "Validated schema '{}' with {} properties",
            schema.name,
            schema.properties.len()
        );
        if let Some(cache) = self.cache {
            cache
                .write()
                .insert(schema.name.clone(), (descriptor.clone(), Arc::clone(&schema)));
        }
        Ok(schema)
    }

    fn cached(&self, descriptor: &TypeDescriptor) -> Option<Arc<CompiledSchema>> {
        self.cache?
            .read()
            .get(descriptor.name())
            .filter(|(validated, _)| validated == descriptor)
            .map(|(_, schema)| Arc::clone(schema))
    }

    fn build(
        &self,
        schema: &CompiledSchema,
        raw: &ValueMap,
        stack: &mut Vec<String>,
    ) -> Result<ConfigValue> {
        let mut visit = Visit::enter(stack, &schema.name)?;

        if let Some(key) = raw.keys().find(|key| schema.property(key).is_none()) {
            return Err(Error::UnknownOption {
                target: schema.name.clone(),
                option: key.clone(),
            });
        }

        let mut properties = ValueMap::new();
        for property in &schema.properties {
            let value = match raw.get(&property.name) {
                Some(Value::Map(nested_raw)) if property.nested.is_some() => {
                    let nested = self.nested_schema(property)?;
                    let config = self.build(&nested, nested_raw, visit.stack())?;
                    match &property.optional {
                        Some(kind) => kind
                            .wrap(Value::Config(config))
                            .map(Value::Optional)
                            .map_err(|source| conversion(schema, property, source))?,
                        None => Value::Config(config),
                    }
                }
                Some(supplied) => self
                    .converter
                    .to_return_value_type(supplied, &property.accessor)
                    .map_err(|source| conversion(schema, property, source))?,
                None => match &property.optional {
                    Some(kind) => Value::Optional(kind.empty()),
                    None => {
                        return Err(Error::MissingRequiredOption {
                            target: schema.name.clone(),
                            option: property.name.clone(),
                        });
                    }
                },
            };
            tracing::trace!("{}.{} = {}", schema.name, property.name, value);
            properties.insert(property.name.clone(), value);
        }

        Ok(ConfigValue::new(schema.name.clone(), properties))
    }

    fn nested_schema(&self, property: &Property) -> Result<Arc<CompiledSchema>> {
        match &property.nested {
            Some(reference) => self.compile(&reference.resolve(), &mut Vec::new()),
            None => Err(SchemaError::Violation {
                schema: property.accessor.owner().to_string(),
                reason: format!("'{}' is not a nested schema", property.name),
            }
            .into()),
        }
    }
}

fn conversion(
    schema: &CompiledSchema,
    property: &Property,
    source: crate::error::ConversionError,
) -> Error {
    Error::Conversion {
        target: schema.name.clone(),
        option: property.name.clone(),
        source,
    }
}

// Structural checks for one descriptor, without recursing.
fn check(descriptor: &TypeDescriptor) -> std::result::Result<CompiledSchema, SchemaError> {
    let violation = |reason: String| SchemaError::Violation {
        schema: descriptor.name().to_string(),
        reason,
    };

    if descriptor.form() != TypeForm::Contract {
        return Err(violation(
            "concrete types cannot describe configuration".to_string(),
        ));
    }
    if !descriptor.is_tagged() {
        return Err(violation("type is not tagged as a schema".to_string()));
    }

    let mut groups: BTreeMap<String, Vec<&Signature>> = BTreeMap::new();
    for member in descriptor.members() {
        if member.body() != MemberBody::Abstract {
            continue;
        }
        let signature = member.signature();
        if !signature.params().is_empty() {
            return Err(violation(format!(
                "accessor '{}' takes parameters",
                signature.name()
            )));
        }
        groups
            .entry(naming::strip_any(signature.name()))
            .or_default()
            .push(signature);
    }

    let ambiguous: Vec<(String, Vec<String>)> = groups
        .iter()
        .filter(|(_, accessors)| accessors.len() > 1)
        .map(|(property, accessors)| {
            let mut names: Vec<String> = accessors.iter().map(|s| s.name().to_string()).collect();
            names.sort();
            (property.clone(), names)
        })
        .collect();
    if !ambiguous.is_empty() {
        return Err(SchemaError::AmbiguousNames {
            schema: descriptor.name().to_string(),
            groups: ambiguous,
        });
    }

    let properties = groups
        .into_iter()
        .filter_map(|(name, accessors)| accessors.into_iter().next().map(|a| (name, a)))
        .map(|(name, accessor)| {
            let returns = accessor.returns();
            let nested = match optional::unwrap(returns) {
                ValueType::Schema(reference) => Some(reference),
                _ => None,
            };
            Property {
                name,
                accessor: accessor.clone(),
                optional: optional::kind_of(returns).cloned(),
                nested,
            }
        })
        .collect();

    Ok(CompiledSchema {
        name: descriptor.name().to_string(),
        properties,
    })
}

/// Marks a schema as in progress for as long as it lives
struct Visit<'a> {
    stack: &'a mut Vec<String>,
}

impl<'a> Visit<'a> {
    fn enter(stack: &'a mut Vec<String>, name: &str) -> std::result::Result<Self, SchemaError> {
        if stack.iter().any(|entry| entry == name) {
            let mut path = stack.clone();
            path.push(name.to_string());
            return Err(SchemaError::CircularReference { path });
        }
        stack.push(name.to_string());
        Ok(Self { stack })
    }

    fn stack(&mut self) -> &mut Vec<String> {
        self.stack
    }
}

impl Drop for Visit<'_> {
    fn drop(&mut self) {
        self.stack.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::optional::OptionalValue;

    fn retry() -> TypeDescriptor {
        TypeDescriptor::schema("Retry")
            .accessor("getName", ValueType::String)
            .accessor("retries", OptionalKind::Int.into())
    }

    fn raw(pairs: &[(&str, Value)]) -> ValueMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn node_a() -> TypeDescriptor {
        TypeDescriptor::schema("NodeA").accessor(
            "getPeer",
            OptionalKind::of(ValueType::Schema(SchemaRef::new("NodeB", node_b))).into(),
        )
    }

    fn node_b() -> TypeDescriptor {
        TypeDescriptor::schema("NodeB")
            .accessor("getPeer", ValueType::Schema(SchemaRef::new("NodeA", node_a)))
    }

    #[test]
    fn test_optional_defaults_to_empty() {
        let config = ConfigMaterializer::new()
            .materialize(&retry(), &raw(&[("name", Value::from("x"))]))
            .unwrap();
        assert_eq!(config.get_raw("name"), Some(&Value::from("x")));
        assert_eq!(
            config.get_raw("retries"),
            Some(&Value::Optional(OptionalValue::Int(None)))
        );
    }

    #[test]
    fn test_supplied_values_are_converted() {
        let config = ConfigMaterializer::new()
            .materialize(
                &retry(),
                &raw(&[("name", Value::from("x")), ("retries", Value::from("3"))]),
            )
            .unwrap();
        assert_eq!(config.get::<Option<i32>>("retries").unwrap(), Some(3));
    }

    #[test]
    fn test_unknown_and_missing_options() {
        let materializer = ConfigMaterializer::new();
        let err = materializer
            .materialize(
                &retry(),
                &raw(&[
                    ("name", Value::from("x")),
                    ("retries", Value::Long(3)),
                    ("bogus", Value::Long(1)),
                ]),
            )
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownOption);
        assert!(err.to_string().contains("bogus"));

        let err = materializer.materialize(&retry(), &ValueMap::new()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredOption);
        assert!(err.to_string().contains("name"));
    }

    #[test]
    fn test_concrete_and_untagged_types_are_rejected() {
        let materializer = ConfigMaterializer::new();
        assert!(!materializer.is_valid_schema(&TypeDescriptor::concrete("Record")));
        assert!(!materializer.is_valid_schema(&TypeDescriptor::contract("Plain")));
        assert!(materializer.is_valid_schema(&retry()));
    }

    #[test]
    fn test_parameterized_accessor_needs_a_body() {
        let materializer = ConfigMaterializer::new();
        let with_default = retry().default_method("describe", vec![ValueType::Int], ValueType::String);
        assert!(materializer.is_valid_schema(&with_default));

        let without_body = retry().abstract_method("lookup", vec![ValueType::Int], ValueType::String);
        let err = materializer.validate(&without_body).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SchemaViolation);
        assert!(err.to_string().contains("lookup"));
    }

    #[test]
    fn test_ambiguous_names_fail_regardless_of_input() {
        let descriptor = retry().accessor("getRetries", ValueType::Int);
        let materializer = ConfigMaterializer::new();
        assert!(!materializer.is_valid_schema(&descriptor));

        let err = materializer
            .materialize(&descriptor, &raw(&[("name", Value::from("x"))]))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SchemaViolation);
        assert!(err.to_string().contains("'retries' <- [getRetries, retries]"));
    }

    #[test]
    fn test_cycle_names_both_types() {
        let materializer = ConfigMaterializer::new();
        let err = materializer.materialize(&node_a(), &ValueMap::new()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CircularReference);
        assert_eq!(
            err.to_string(),
            "circular schema reference: NodeA -> NodeB -> NodeA"
        );
        assert!(!materializer.is_valid_schema(&node_b()));
    }

    #[test]
    fn test_validation_is_cached() {
        let materializer = ConfigMaterializer::new();
        let first = materializer.validate(&retry()).unwrap();
        let second = materializer.validate(&retry()).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.option_names(), vec!["name", "retries"]);
    }

    #[test]
    fn test_cache_does_not_leak_between_descriptors_sharing_a_name() {
        let materializer = ConfigMaterializer::new();
        assert!(materializer.is_valid_schema(&retry()));

        let ambiguous = retry().accessor("getRetries", ValueType::Int);
        assert!(!materializer.is_valid_schema(&ambiguous));
        assert!(
            materializer
                .materialize(&ambiguous, &raw(&[("name", Value::from("x"))]))
                .is_err()
        );

        let other = TypeDescriptor::schema("Retry").accessor("getHost", ValueType::String);
        let config = materializer
            .materialize(&other, &raw(&[("host", Value::from("example.org"))]))
            .unwrap();
        assert_eq!(config.get::<String>("host").unwrap(), "example.org");
        assert!(materializer.is_valid_schema(&retry()));
    }

    #[test]
    fn test_visit_pops_on_failure() {
        let mut stack = Vec::new();
        {
            let mut outer = Visit::enter(&mut stack, "A").unwrap();
            assert!(Visit::enter(outer.stack(), "A").is_err());
            let _inner = Visit::enter(outer.stack(), "B").unwrap();
        }
        assert!(stack.is_empty());
    }
}
