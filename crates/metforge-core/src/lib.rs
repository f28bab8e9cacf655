//! Metforge Core Library
//!
//! This crate turns untyped, nested configuration maps into:
//! - Schema-validated, immutable configuration values
//! - Pipeline components built by configuration-driven factories
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌──────────────┐     ┌─────────────┐
//! │  Raw map    │────▶│ Materializer │────▶│ ConfigValue │
//! │ (YAML/JSON) │     │  + Converter │     └─────────────┘
//! └─────────────┘     └──────────────┘            │
//!        │                                        ▼
//!        │            ┌──────────────┐     ┌─────────────┐
//!        └───────────▶│   Factory    │────▶│  Component  │
//!                     └──────────────┘     └─────────────┘
//! ```
//!
//! Rust has no runtime reflection, so schema types and factory targets are
//! described explicitly with [`TypeDescriptor`] and [`TargetType`].
//!
//! # Example
//!
//! ```rust,ignore
//! use metforge_core::{ConfigMaterializer, OptionalKind, TypeDescriptor, ValueType};
//!
//! let retry = TypeDescriptor::schema("Retry")
//!     .accessor("getName", ValueType::String)
//!     .accessor("retries", OptionalKind::Int.into());
//!
//! let config = ConfigMaterializer::new().materialize(&retry, &raw)?;
//! println!("{}", config);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod component;
pub mod config;
pub mod convert;
pub mod decorate;
pub mod error;
pub mod factory;
pub mod naming;
pub mod optional;
pub mod registry;
pub mod schema;
pub mod types;
pub mod value;

pub use component::{ActionError, ActivationPredicate, Bulletin, MessageTransformer, PostAction};
pub use config::ConfigValue;
pub use convert::{DefaultConverter, ValueConverter};
pub use decorate::{ForwardingFactory, LoggingFactory, MappedFactory, RenamingFactory};
pub use error::{BoxError, ConversionError, Error, ErrorKind, Result, SchemaError};
pub use factory::{
    Arguments, Constructor, Factory, Mutator, ObjectFactoryBuilder, ReflectiveFactory,
    SchemaFactory, TargetType,
};
pub use optional::{OptionalKind, OptionalValue};
pub use registry::{FactoryRegistry, SharedFactory};
pub use schema::{CompiledSchema, ConfigMaterializer, Schema};
pub use types::{
    Member, MemberBody, ObjectType, SchemaRef, Signature, TypeDescriptor, TypeForm, ValueType,
};
pub use value::{FromValue, ObjectValue, Value, ValueMap};
