//! Built-in component catalog
//!
//! Every built-in component is described once as a [`TargetType`] and bound
//! to its constructor slots through [`ObjectFactoryBuilder`]. The resulting
//! factories are logged and registered by their `type` name.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use metforge_core::{
    ActivationPredicate, Constructor, Factory, FactoryRegistry, LoggingFactory, MessageTransformer,
    Mutator, ObjectFactoryBuilder, PostAction, ReflectiveFactory, RenamingFactory, TargetType,
    ValueType,
};

use crate::components::{
    ArchiveAction, KindPredicate, RegexReplaceTransformer, StationPredicate, TrimTransformer,
    UppercaseTransformer,
};

/// Shared transformer
pub type Transformer = Arc<dyn MessageTransformer>;
/// Shared predicate
pub type Predicate = Arc<dyn ActivationPredicate>;
/// Shared action
pub type Action = Arc<dyn PostAction>;

/// Legacy name of `regex_replace`, which spelled `pattern` as `regex`
pub const LEGACY_REPLACE: &str = "replace";

/// Factories for every component kind
pub struct Catalog {
    pub transformers: FactoryRegistry<Transformer>,
    pub predicates: FactoryRegistry<Predicate>,
    pub actions: FactoryRegistry<Action>,
}

impl Catalog {
    /// Built-in components; archives are written below `output_root`
    pub fn builtin(output_root: &Path) -> Result<Self> {
        let mut transformers = FactoryRegistry::new();
        let mut predicates = FactoryRegistry::new();
        let mut actions = FactoryRegistry::new();

        transformers.register(transformer(trim_factory()?))?;
        transformers.register(transformer(uppercase_factory()?))?;
        let replace = Arc::new(regex_replace_factory()?);
        transformers.register(transformer(Arc::clone(&replace)))?;
        transformers.register(transformer(
            RenamingFactory::with_aliases(replace, [("regex", "pattern")]).named(LEGACY_REPLACE),
        ))?;

        predicates.register(predicate(station_factory()?))?;
        predicates.register(predicate(kind_factory()?))?;

        actions.register(action(archive_factory(output_root)?))?;

        Ok(Self {
            transformers,
            predicates,
            actions,
        })
    }
}

fn transformer<F>(factory: F) -> impl Factory<Output = Transformer>
where
    F: Factory + 'static,
    F::Output: MessageTransformer + 'static,
{
    LoggingFactory::new(factory).map_output(|t| Arc::new(t) as Transformer)
}

fn predicate<F>(factory: F) -> impl Factory<Output = Predicate>
where
    F: Factory + 'static,
    F::Output: ActivationPredicate + 'static,
{
    LoggingFactory::new(factory).map_output(|p| Arc::new(p) as Predicate)
}

fn action<F>(factory: F) -> impl Factory<Output = Action>
where
    F: Factory + 'static,
    F::Output: PostAction + 'static,
{
    LoggingFactory::new(factory).map_output(|a| Arc::new(a) as Action)
}

fn trim_factory() -> Result<ReflectiveFactory<TrimTransformer>> {
    let target = TargetType::new("TrimTransformer")
        .constructor(Constructor::new(vec![], |_| Ok(TrimTransformer::new())))
        .mutator(Mutator::setter(
            "setCollapseWhitespace",
            ValueType::Bool,
            TrimTransformer::set_collapse_whitespace,
        ));
    ObjectFactoryBuilder::new(target)
        .named("trim")
        .build()
        .context("Failed to build 'trim' factory")
}

fn uppercase_factory() -> Result<ReflectiveFactory<UppercaseTransformer>> {
    let target = TargetType::new("UppercaseTransformer")
        .constructor(Constructor::new(vec![], |_| Ok(UppercaseTransformer)));
    ObjectFactoryBuilder::new(target)
        .named("uppercase")
        .build()
        .context("Failed to build 'uppercase' factory")
}

fn regex_replace_factory() -> Result<ReflectiveFactory<RegexReplaceTransformer>> {
    let target = TargetType::new("RegexReplaceTransformer")
        .constructor(Constructor::new(
            vec![ValueType::String, ValueType::String],
            |mut args| {
                let pattern: String = args.take(0)?;
                Ok(RegexReplaceTransformer::new(&pattern, args.take(1)?)?)
            },
        ))
        .mutator(Mutator::new(
            "setLimit",
            ValueType::Int,
            |t: &mut RegexReplaceTransformer, value| {
                let limit: i32 = metforge_core::FromValue::from_value(value)?;
                t.set_limit(usize::try_from(limit)?);
                Ok(())
            },
        ));
    ObjectFactoryBuilder::new(target)
        .named("regex_replace")
        .config_slot("pattern", ValueType::String)
        .config_slot("replacement", ValueType::String)
        .build()
        .context("Failed to build 'regex_replace' factory")
}

fn station_factory() -> Result<ReflectiveFactory<StationPredicate>> {
    let target = TargetType::new("StationPredicate")
        .constructor(Constructor::new(
            vec![ValueType::list(ValueType::String)],
            |mut args| Ok(StationPredicate::new(args.take(0)?)),
        ))
        .mutator(Mutator::setter(
            "setInvert",
            ValueType::Bool,
            StationPredicate::set_invert,
        ));
    ObjectFactoryBuilder::new(target)
        .named("station")
        .config_slot("stations", ValueType::list(ValueType::String))
        .build()
        .context("Failed to build 'station' factory")
}

fn kind_factory() -> Result<ReflectiveFactory<KindPredicate>> {
    let target = TargetType::new("KindPredicate").constructor(Constructor::new(
        vec![ValueType::list(ValueType::String)],
        |mut args| Ok(KindPredicate::new(args.take(0)?)),
    ));
    ObjectFactoryBuilder::new(target)
        .named("kind")
        .config_slot("kinds", ValueType::list(ValueType::String))
        .build()
        .context("Failed to build 'kind' factory")
}

fn archive_factory(output_root: &Path) -> Result<ReflectiveFactory<ArchiveAction>> {
    let target = TargetType::new("ArchiveAction")
        .constructor(Constructor::new(
            vec![ValueType::String, ValueType::String],
            |mut args| {
                let root: String = args.take(0)?;
                let directory: String = args.take(1)?;
                Ok(ArchiveAction::new(root, &directory))
            },
        ))
        .mutator(Mutator::setter(
            "setExtension",
            ValueType::String,
            ArchiveAction::set_extension,
        ));
    ObjectFactoryBuilder::new(target)
        .named("archive")
        .dependency_slot(output_root.to_string_lossy().into_owned())
        .config_slot("directory", ValueType::String)
        .build()
        .context("Failed to build 'archive' factory")
}
