//! Decorating factories
//!
//! [`ForwardingFactory`] is the base for decorators: implement `delegate` and
//! override only the `forward_*` methods that change, and the type is a
//! [`Factory`] through the blanket implementation. Shared and boxed factories
//! (`Arc<F>`, `Box<F>`, including trait objects) forward the same way.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::factory::Factory;
use crate::value::ValueMap;

/// A factory that delegates to another factory
pub trait ForwardingFactory: Send + Sync {
    /// The wrapped factory
    type Delegate: Factory + ?Sized;

    /// Borrow the wrapped factory
    fn delegate(&self) -> &Self::Delegate;

    /// Name reported as [`Factory::name`]
    fn forward_name(&self) -> &str {
        self.delegate().name()
    }

    /// Implementation of [`Factory::create`]
    fn forward_create(&self, config: &ValueMap) -> Result<<Self::Delegate as Factory>::Output> {
        self.delegate().create(config)
    }

    /// Implementation of [`Factory::option_names`]
    fn forward_option_names(&self) -> Vec<String> {
        self.delegate().option_names()
    }
}

impl<F: ForwardingFactory> Factory for F {
    type Output = <F::Delegate as Factory>::Output;

    fn name(&self) -> &str {
        self.forward_name()
    }

    fn create(&self, config: &ValueMap) -> Result<Self::Output> {
        self.forward_create(config)
    }

    fn option_names(&self) -> Vec<String> {
        self.forward_option_names()
    }
}

impl<F: Factory + ?Sized> ForwardingFactory for Arc<F> {
    type Delegate = F;

    fn delegate(&self) -> &F {
        self
    }
}

impl<F: Factory + ?Sized> ForwardingFactory for Box<F> {
    type Delegate = F;

    fn delegate(&self) -> &F {
        self
    }
}

/// Logs every creation through `tracing`
pub struct LoggingFactory<F> {
    delegate: F,
}

impl<F: Factory> LoggingFactory<F> {
    /// Wrap `delegate`
    pub fn new(delegate: F) -> Self {
        Self { delegate }
    }
}

impl<F: Factory> ForwardingFactory for LoggingFactory<F> {
    type Delegate = F;

    fn delegate(&self) -> &F {
        &self.delegate
    }

    fn forward_create(&self, config: &ValueMap) -> Result<F::Output> {
        tracing::debug!(
            "Factory '{}' creating from {} options",
            self.forward_name(),
            config.len()
        );
        self.delegate.create(config).inspect_err(|err| {
            tracing::warn!("Factory '{}' failed: {}", self.forward_name(), err);
        })
    }
}

type Rename = dyn Fn(&str) -> String + Send + Sync;

/// Rewrites option names before delegating
///
/// Lets one factory serve several external naming schemes, e.g. a legacy
/// option name kept alive next to the current one.
pub struct RenamingFactory<F> {
    delegate: F,
    name: Option<String>,
    rename: Box<Rename>,
}

impl<F: Factory> RenamingFactory<F> {
    /// Rename every key through `rename`
    pub fn new<R>(delegate: F, rename: R) -> Self
    where
        R: Fn(&str) -> String + Send + Sync + 'static,
    {
        Self {
            delegate,
            name: None,
            rename: Box::new(rename),
        }
    }

    /// Rename keys found in `aliases`, keep the rest
    pub fn with_aliases<I, K, V>(delegate: F, aliases: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let aliases: HashMap<String, String> = aliases
            .into_iter()
            .map(|(from, to)| (from.into(), to.into()))
            .collect();
        Self::new(delegate, move |key| {
            aliases
                .get(key)
                .cloned()
                .unwrap_or_else(|| key.to_string())
        })
    }

    /// Remove `prefix` from keys that carry it
    pub fn strip_prefix(delegate: F, prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        Self::new(delegate, move |key| {
            key.strip_prefix(prefix.as_str()).unwrap_or(key).to_string()
        })
    }

    /// Report a different factory name
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Apply the rewrite to every key of `config`
    pub fn rename_keys(&self, config: &ValueMap) -> Result<ValueMap> {
        let mut sources: BTreeMap<String, &str> = BTreeMap::new();
        let mut renamed = ValueMap::new();
        for (key, value) in config {
            let target = (self.rename)(key);
            if let Some(first) = sources.get(&target) {
                return Err(Error::DuplicateRenamedKey {
                    factory: self.forward_name().to_string(),
                    target,
                    first: first.to_string(),
                    second: key.clone(),
                });
            }
            sources.insert(target.clone(), key);
            renamed.insert(target, value.clone());
        }
        Ok(renamed)
    }
}

impl<F: Factory> ForwardingFactory for RenamingFactory<F> {
    type Delegate = F;

    fn delegate(&self) -> &F {
        &self.delegate
    }

    fn forward_name(&self) -> &str {
        self.name.as_deref().unwrap_or_else(|| self.delegate.name())
    }

    fn forward_create(&self, config: &ValueMap) -> Result<F::Output> {
        let renamed = self.rename_keys(config)?;
        self.delegate.create(&renamed)
    }
}

/// Converts the output of another factory
///
/// Built by [`Factory::map_output`].
pub struct MappedFactory<F, M> {
    delegate: F,
    map: M,
}

impl<F, M> MappedFactory<F, M> {
    pub(crate) fn new(delegate: F, map: M) -> Self {
        Self { delegate, map }
    }
}

impl<F, M, U> Factory for MappedFactory<F, M>
where
    F: Factory,
    M: Fn(F::Output) -> U + Send + Sync,
{
    type Output = U;

    fn name(&self) -> &str {
        self.delegate.name()
    }

    fn create(&self, config: &ValueMap) -> Result<U> {
        self.delegate.create(config).map(&self.map)
    }

    fn option_names(&self) -> Vec<String> {
        self.delegate.option_names()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::factory::{Constructor, ObjectFactoryBuilder, ReflectiveFactory, TargetType};
    use crate::types::ValueType;
    use crate::value::Value;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug)]
    struct Replace {
        pattern: String,
    }

    fn replace_factory() -> ReflectiveFactory<Replace> {
        let target = TargetType::new("Replace").constructor(Constructor::new(
            vec![ValueType::String],
            |mut args| Ok(Replace { pattern: args.take(0)? }),
        ));
        ObjectFactoryBuilder::new(target)
            .named("regex_replace")
            .config_slot("pattern", ValueType::String)
            .build()
            .unwrap()
    }

    fn config(pairs: &[(&str, &str)]) -> ValueMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), Value::from(*v)))
            .collect()
    }

    #[test]
    fn test_aliases_rename_legacy_keys() {
        let factory =
            RenamingFactory::with_aliases(replace_factory(), [("regex", "pattern")]).named("replace");
        assert_eq!(factory.name(), "replace");

        let built = factory.create(&config(&[("regex", "^X")])).unwrap();
        assert_eq!(built.pattern, "^X");
        let built = factory.create(&config(&[("pattern", "^Y")])).unwrap();
        assert_eq!(built.pattern, "^Y");
    }

    #[test]
    fn test_duplicate_targets_name_both_sources() {
        let factory = RenamingFactory::with_aliases(replace_factory(), [("regex", "pattern")]);
        let err = factory
            .create(&config(&[("pattern", "a"), ("regex", "b")]))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DuplicateOption);
        let message = err.to_string();
        assert!(message.contains("'pattern'") && message.contains("'regex'"));
    }

    #[test]
    fn test_strip_prefix() {
        let factory = RenamingFactory::strip_prefix(replace_factory(), "replace.");
        let built = factory.create(&config(&[("replace.pattern", "Z")])).unwrap();
        assert_eq!(built.pattern, "Z");
        assert_eq!(factory.name(), "regex_replace");
    }

    #[test]
    fn test_shared_and_boxed_factories_forward() {
        let shared: Arc<dyn Factory<Output = Replace>> = Arc::new(replace_factory());
        assert_eq!(shared.name(), "regex_replace");
        assert_eq!(shared.option_names(), vec!["pattern"]);

        let logged = LoggingFactory::new(Box::new(replace_factory()));
        assert!(logged.create(&ValueMap::new()).is_err());
        assert_eq!(logged.create(&config(&[("pattern", "p")])).unwrap().pattern, "p");
    }

    struct Counting<F> {
        inner: F,
        calls: AtomicUsize,
    }

    impl<F: Factory> ForwardingFactory for Counting<F> {
        type Delegate = F;

        fn delegate(&self) -> &F {
            &self.inner
        }

        fn forward_create(&self, config: &ValueMap) -> Result<F::Output> {
            self.calls.fetch_add(1, Ordering::Relaxed);
            self.inner.create(config)
        }
    }

    #[test]
    fn test_forwarding_overrides_only_what_changes() {
        let counting = Counting {
            inner: replace_factory(),
            calls: AtomicUsize::new(0),
        };
        counting.create(&config(&[("pattern", "p")])).unwrap();
        assert_eq!(counting.calls.load(Ordering::Relaxed), 1);
        assert_eq!(counting.name(), "regex_replace");
    }

    #[test]
    fn test_map_output() {
        let lengths = replace_factory().map_output(|r: Replace| r.pattern.len());
        assert_eq!(lengths.create(&config(&[("pattern", "abc")])).unwrap(), 3);
    }
}
