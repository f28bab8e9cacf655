//! Factory registry
//!
//! Maps the `type` names used in configuration documents to the factories
//! that build them.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::factory::Factory;
use crate::value::ValueMap;

/// Shared factory handle
pub type SharedFactory<T> = Arc<dyn Factory<Output = T>>;

/// Name to factory table for one component kind
pub struct FactoryRegistry<T> {
    factories: BTreeMap<String, SharedFactory<T>>,
}

impl<T> Default for FactoryRegistry<T> {
    fn default() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }
}

impl<T: 'static> FactoryRegistry<T> {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `factory` under its own name
    pub fn register<F>(&mut self, factory: F) -> Result<()>
    where
        F: Factory<Output = T> + 'static,
    {
        self.register_shared(Arc::new(factory))
    }

    /// Register an already shared factory under its own name
    pub fn register_shared(&mut self, factory: SharedFactory<T>) -> Result<()> {
        let name = factory.name().to_string();
        if self.factories.contains_key(&name) {
            return Err(Error::DuplicateFactory { name });
        }
        tracing::debug!("Registered factory '{}'", name);
        self.factories.insert(name, factory);
        Ok(())
    }

    /// Factory registered as `name`
    pub fn get(&self, name: &str) -> Option<&SharedFactory<T>> {
        self.factories.get(name)
    }

    /// Build a `name` component from `config`
    pub fn create(&self, name: &str, config: &ValueMap) -> Result<T> {
        let factory = self.get(name).ok_or_else(|| Error::UnknownFactory {
            name: name.to_string(),
        })?;
        factory.create(config)
    }

    /// Registered names, sorted
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    /// Registered factories, sorted by name
    pub fn iter(&self) -> impl Iterator<Item = (&str, &SharedFactory<T>)> {
        self.factories.iter().map(|(name, f)| (name.as_str(), f))
    }

    /// Number of registered factories
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    /// Whether nothing is registered
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::factory::{Constructor, ObjectFactoryBuilder, ReflectiveFactory, TargetType};
    use crate::types::ValueType;
    use crate::value::Value;

    fn counter(name: &str) -> ReflectiveFactory<i64> {
        let target = TargetType::new("Counter").constructor(Constructor::new(
            vec![ValueType::Long],
            |mut args| args.take::<i64>(0).map_err(Into::into),
        ));
        ObjectFactoryBuilder::new(target)
            .named(name)
            .config_slot("start", ValueType::Long)
            .build()
            .unwrap()
    }

    #[test]
    fn test_register_and_create() {
        let mut registry = FactoryRegistry::new();
        registry.register(counter("a")).unwrap();
        registry.register(counter("b")).unwrap();
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["a", "b"]);

        let config: ValueMap = [("start".to_string(), Value::from("7"))].into_iter().collect();
        assert_eq!(registry.create("b", &config).unwrap(), 7);
    }

    #[test]
    fn test_duplicate_and_unknown_names() {
        let mut registry = FactoryRegistry::new();
        registry.register(counter("a")).unwrap();
        let err = registry.register(counter("a")).unwrap_err();
        assert!(matches!(err, Error::DuplicateFactory { .. }));

        let err = registry.create("missing", &ValueMap::new()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Assembly);
        assert!(err.to_string().contains("missing"));
    }
}
