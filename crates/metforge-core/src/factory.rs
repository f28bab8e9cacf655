//! Object factories
//!
//! [`ObjectFactoryBuilder`] binds a [`TargetType`] (its constructors and
//! property mutators, declared explicitly) to an ordered list of constructor
//! slots. Dependency slots carry a value fixed at build time; config slots
//! name an option read from each configuration map. [`build`] resolves the
//! single public constructor accepting the slot types and fails immediately
//! when there is none or more than one.
//!
//! The resulting [`ReflectiveFactory`] builds one fresh instance per call:
//! constructor arguments first, then every remaining option applied through
//! its mutator. Factories hold no mutable state and can be shared across
//! threads.
//!
//! [`build`]: ObjectFactoryBuilder::build

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use crate::config::ConfigValue;
use crate::convert::{DefaultConverter, ValueConverter};
use crate::decorate::MappedFactory;
use crate::error::{BoxError, ConversionError, Error, Result};
use crate::naming;
use crate::schema::{CompiledSchema, ConfigMaterializer, Schema};
use crate::types::{Signature, TypeDescriptor, ValueType};
use crate::value::{FromValue, Value, ValueMap};

/// Something that builds a value from a configuration map
pub trait Factory: Send + Sync {
    /// What the factory builds
    type Output;

    /// Name used in error messages and registries
    fn name(&self) -> &str;

    /// Build one value from `config`
    fn create(&self, config: &ValueMap) -> Result<Self::Output>;

    /// Option names the factory understands, sorted
    fn option_names(&self) -> Vec<String>;

    /// Post-process every created value with `map`
    fn map_output<U, M>(self, map: M) -> MappedFactory<Self, M>
    where
        Self: Sized,
        M: Fn(Self::Output) -> U + Send + Sync,
    {
        MappedFactory::new(self, map)
    }
}

type ConstructFn<T> = dyn Fn(Arguments<'_>) -> std::result::Result<T, BoxError> + Send + Sync;
type MutateFn<T> = dyn Fn(&mut T, Value) -> std::result::Result<(), BoxError> + Send + Sync;

/// Converted constructor arguments, in declared order
pub struct Arguments<'a> {
    values: Vec<Value>,
    signature: &'a Signature,
}

impl Arguments<'_> {
    /// Take argument `index` as `V`, leaving null in its place
    pub fn take<V: FromValue>(&mut self, index: usize) -> std::result::Result<V, ConversionError> {
        let slot = self
            .values
            .get_mut(index)
            .ok_or_else(|| ConversionError::NoSuchParameter {
                executable: self.signature.to_string(),
                index,
            })?;
        V::from_value(std::mem::replace(slot, Value::Null))
    }
}

/// A constructor of `T`
pub struct Constructor<T> {
    params: Vec<ValueType>,
    public: bool,
    invoke: Arc<ConstructFn<T>>,
}

impl<T> Constructor<T> {
    /// Public constructor taking `params`
    pub fn new<F>(params: Vec<ValueType>, invoke: F) -> Self
    where
        F: Fn(Arguments<'_>) -> std::result::Result<T, BoxError> + Send + Sync + 'static,
    {
        Self {
            params,
            public: true,
            invoke: Arc::new(invoke),
        }
    }

    /// Hide the constructor from resolution
    pub fn private(mut self) -> Self {
        self.public = false;
        self
    }

    /// Parameter types
    pub fn params(&self) -> &[ValueType] {
        &self.params
    }

    fn accepts(&self, declared: &[ValueType]) -> bool {
        self.public
            && self.params.len() == declared.len()
            && self
                .params
                .iter()
                .zip(declared)
                .all(|(param, slot)| param.is_assignable_from(slot))
    }
}

impl<T> Clone for Constructor<T> {
    fn clone(&self) -> Self {
        Self {
            params: self.params.clone(),
            public: self.public,
            invoke: Arc::clone(&self.invoke),
        }
    }
}

/// A single-parameter property mutator of `T`
pub struct Mutator<T> {
    name: String,
    param: ValueType,
    public: bool,
    apply: Arc<MutateFn<T>>,
}

impl<T> Mutator<T> {
    /// Public mutator receiving the converted value
    pub fn new<F>(name: impl Into<String>, param: ValueType, apply: F) -> Self
    where
        F: Fn(&mut T, Value) -> std::result::Result<(), BoxError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            param,
            public: true,
            apply: Arc::new(apply),
        }
    }

    /// Public mutator receiving the value extracted as `V`
    pub fn setter<V, F>(name: impl Into<String>, param: ValueType, apply: F) -> Self
    where
        T: 'static,
        V: FromValue + 'static,
        F: Fn(&mut T, V) + Send + Sync + 'static,
    {
        Self::new(name, param, move |target, value| {
            apply(target, V::from_value(value)?);
            Ok(())
        })
    }

    /// Hide the mutator from property lookup
    pub fn private(mut self) -> Self {
        self.public = false;
        self
    }

    /// Mutator name as declared
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Explicit description of a concrete target type
pub struct TargetType<T> {
    name: String,
    constructors: Vec<Constructor<T>>,
    mutators: Vec<Mutator<T>>,
}

impl<T> TargetType<T> {
    /// Describe a type called `name`
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            constructors: Vec::new(),
            mutators: Vec::new(),
        }
    }

    /// Add a constructor
    pub fn constructor(mut self, constructor: Constructor<T>) -> Self {
        self.constructors.push(constructor);
        self
    }

    /// Add a mutator
    pub fn mutator(mut self, mutator: Mutator<T>) -> Self {
        self.mutators.push(mutator);
        self
    }

    /// Type name
    pub fn name(&self) -> &str {
        &self.name
    }
}

enum Slot {
    Dependency { value: Value, ty: ValueType },
    Config { name: String, ty: ValueType },
}

impl Slot {
    fn ty(&self) -> &ValueType {
        match self {
            Self::Dependency { ty, .. } | Self::Config { ty, .. } => ty,
        }
    }
}

/// Declares the constructor slots of a [`ReflectiveFactory`]
pub struct ObjectFactoryBuilder<T> {
    target: TargetType<T>,
    name: Option<String>,
    converter: Arc<dyn ValueConverter>,
    slots: Vec<Slot>,
}

impl<T> ObjectFactoryBuilder<T> {
    /// Start a factory for `target`
    pub fn new(target: TargetType<T>) -> Self {
        Self {
            target,
            name: None,
            converter: Arc::new(DefaultConverter),
            slots: Vec::new(),
        }
    }

    /// Factory name, defaults to the target type name
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Use a custom converter
    pub fn converter(mut self, converter: Arc<dyn ValueConverter>) -> Self {
        self.converter = converter;
        self
    }

    /// Append a fixed argument whose type is inferred from the value
    pub fn dependency_slot(self, value: impl Into<Value>) -> Self {
        let value = value.into();
        let ty = value.value_type();
        self.dependency_slot_as(value, ty)
    }

    /// Append a fixed argument with an explicit declared type
    pub fn dependency_slot_as(mut self, value: impl Into<Value>, ty: ValueType) -> Self {
        self.slots.push(Slot::Dependency {
            value: value.into(),
            ty,
        });
        self
    }

    /// Append an argument read from option `name` on every call
    pub fn config_slot(mut self, name: impl Into<String>, ty: ValueType) -> Self {
        self.slots.push(Slot::Config {
            name: name.into(),
            ty,
        });
        self
    }

    /// Resolve the constructor and freeze the factory
    pub fn build(self) -> Result<ReflectiveFactory<T>> {
        let type_name = self.target.name.clone();
        let name = self.name.unwrap_or_else(|| type_name.clone());

        let mut seen = HashSet::new();
        for slot in &self.slots {
            if let Slot::Config { name: slot, .. } = slot
                && !seen.insert(slot.as_str())
            {
                return Err(Error::DuplicateSlotName {
                    type_name,
                    slot: slot.clone(),
                });
            }
        }

        let declared: Vec<ValueType> = self.slots.iter().map(|s| s.ty().clone()).collect();
        let mut candidates = self
            .target
            .constructors
            .iter()
            .filter(|c| c.accepts(&declared));
        let constructor = match (candidates.next(), candidates.count()) {
            (Some(constructor), 0) => constructor.clone(),
            (None, _) => {
                return Err(Error::NoMatchingConstructor {
                    type_name,
                    attempted: declared,
                });
            }
            (Some(_), others) => {
                return Err(Error::AmbiguousConstructor {
                    type_name,
                    attempted: declared,
                    candidates: others + 1,
                });
            }
        };
        let signature = Signature::new(
            type_name.clone(),
            "new",
            constructor.params.clone(),
            ValueType::Any,
        );

        let mut template = Vec::with_capacity(self.slots.len());
        let mut config_slots = Vec::new();
        for (index, slot) in self.slots.into_iter().enumerate() {
            match slot {
                Slot::Dependency { value, .. } => template.push(value),
                Slot::Config { name, .. } => {
                    template.push(Value::Null);
                    config_slots.push((name, index));
                }
            }
        }

        let mut groups: BTreeMap<String, Vec<Mutator<T>>> = BTreeMap::new();
        for mutator in self.target.mutators.into_iter().filter(|m| m.public) {
            groups
                .entry(naming::strip_any(&mutator.name))
                .or_default()
                .push(mutator);
        }
        let mut mutators = HashMap::with_capacity(groups.len());
        for (property, mut group) in groups {
            if group.len() > 1 {
                return Err(Error::AmbiguousProperty {
                    type_name,
                    property,
                    mutators: group.into_iter().map(|m| m.name).collect(),
                });
            }
            if let Some(mutator) = group.pop() {
                let signature = Signature::new(
                    type_name.clone(),
                    mutator.name,
                    vec![mutator.param],
                    ValueType::Any,
                );
                mutators.insert(
                    property,
                    BoundMutator {
                        signature,
                        apply: mutator.apply,
                    },
                );
            }
        }

        tracing::debug!("Factory '{}' resolved constructor {}", name, signature);

        Ok(ReflectiveFactory {
            name,
            type_name,
            converter: self.converter,
            constructor,
            signature,
            template,
            config_slots,
            mutators,
        })
    }
}

struct BoundMutator<T> {
    signature: Signature,
    apply: Arc<MutateFn<T>>,
}

/// Builds instances of `T` from configuration maps
pub struct ReflectiveFactory<T> {
    name: String,
    type_name: String,
    converter: Arc<dyn ValueConverter>,
    constructor: Constructor<T>,
    signature: Signature,
    template: Vec<Value>,
    config_slots: Vec<(String, usize)>,
    mutators: HashMap<String, BoundMutator<T>>,
}

impl<T> ReflectiveFactory<T> {
    /// Target type name
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Build one instance
    pub fn new_instance(&self, config: &ValueMap) -> Result<T> {
        if let Some(key) = config
            .keys()
            .find(|key| !self.is_config_slot(key) && !self.mutators.contains_key(key.as_str()))
        {
            return Err(Error::UnknownOption {
                target: self.name.clone(),
                option: key.clone(),
            });
        }

        let mut values = self.template.clone();
        for (slot, index) in &self.config_slots {
            let raw = config
                .get(slot)
                .ok_or_else(|| Error::MissingRequiredOption {
                    target: self.name.clone(),
                    option: slot.clone(),
                })?;
            values[*index] = self
                .converter
                .to_parameter_type(raw, &self.signature, *index)
                .map_err(|source| Error::Conversion {
                    target: self.name.clone(),
                    option: slot.clone(),
                    source,
                })?;
        }

        let arguments = Arguments {
            values,
            signature: &self.signature,
        };
        let mut instance =
            (self.constructor.invoke)(arguments).map_err(|source| Error::Construction {
                factory: self.name.clone(),
                type_name: self.type_name.clone(),
                source,
            })?;

        for (key, raw) in config {
            let Some(mutator) = self.mutators.get(key.as_str()) else {
                continue;
            };
            if self.is_config_slot(key) {
                continue;
            }
            let property_error = |source: BoxError| Error::PropertySet {
                factory: self.name.clone(),
                type_name: self.type_name.clone(),
                property: key.clone(),
                source,
            };
            let value = self
                .converter
                .to_parameter_type(raw, &mutator.signature, 0)
                .map_err(|err| property_error(Box::new(err)))?;
            (mutator.apply)(&mut instance, value).map_err(property_error)?;
            tracing::trace!("{}: applied {}", self.name, mutator.signature.name());
        }

        Ok(instance)
    }

    fn is_config_slot(&self, key: &str) -> bool {
        self.config_slots.iter().any(|(name, _)| name == key)
    }
}

impl<T> Factory for ReflectiveFactory<T> {
    type Output = T;

    fn name(&self) -> &str {
        &self.name
    }

    fn create(&self, config: &ValueMap) -> Result<T> {
        self.new_instance(config)
    }

    fn option_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .config_slots
            .iter()
            .map(|(name, _)| name.clone())
            .chain(self.mutators.keys().cloned())
            .collect();
        names.sort();
        names.dedup();
        names
    }
}

impl<T> fmt::Debug for ReflectiveFactory<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReflectiveFactory")
            .field("name", &self.name)
            .field("constructor", &self.signature.to_string())
            .finish()
    }
}

/// Config factory: materializes one schema per call
pub struct SchemaFactory {
    name: String,
    materializer: Arc<ConfigMaterializer>,
    descriptor: TypeDescriptor,
    schema: Arc<CompiledSchema>,
}

impl SchemaFactory {
    /// Validate `descriptor` up front and bind it to `materializer`
    pub fn new(materializer: Arc<ConfigMaterializer>, descriptor: TypeDescriptor) -> Result<Self> {
        let schema = materializer.validate(&descriptor)?;
        Ok(Self {
            name: descriptor.name().to_string(),
            materializer,
            descriptor,
            schema,
        })
    }

    /// Factory for the schema `S`
    pub fn of<S: Schema>(materializer: Arc<ConfigMaterializer>) -> Result<Self> {
        Self::new(materializer, S::descriptor())
    }
}

impl Factory for SchemaFactory {
    type Output = ConfigValue;

    fn name(&self) -> &str {
        &self.name
    }

    fn create(&self, config: &ValueMap) -> Result<ConfigValue> {
        self.materializer.materialize(&self.descriptor, config)
    }

    fn option_names(&self) -> Vec<String> {
        self.schema.option_names()
    }
}
