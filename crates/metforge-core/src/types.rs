//! Runtime type model
//!
//! Rust has no runtime reflection, so every type the framework reasons about
//! is described explicitly: [`ValueType`] for declared value types,
//! [`Signature`] for accessors, constructors and mutators, and
//! [`TypeDescriptor`] for the contract types that describe configuration.
//! Descriptors are plain data and are built once, typically from a
//! [`Schema`](crate::schema::Schema) implementation.

use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::optional::OptionalKind;
use crate::schema::Schema;

/// Declared type of an accessor, parameter or slot
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ValueType {
    /// Untyped object, accepts anything
    Any,
    /// Boolean
    Bool,
    /// 32-bit integer
    Int,
    /// 64-bit integer
    Long,
    /// 64-bit float
    Double,
    /// UTF-8 string
    String,
    /// Homogeneous list
    List(Box<ValueType>),
    /// Raw nested map
    Map,
    /// One of the optional wrapper kinds
    Optional(OptionalKind),
    /// Nested schema type
    Schema(SchemaRef),
    /// Opaque Rust type, typically a shared dependency
    Object(ObjectType),
}

impl ValueType {
    /// List of `inner`
    pub fn list(inner: ValueType) -> Self {
        Self::List(Box::new(inner))
    }

    /// Nested schema `S`
    pub fn schema<S: Schema>() -> Self {
        Self::Schema(SchemaRef::of::<S>())
    }

    /// Opaque Rust type `T`
    pub fn object<T: Any>() -> Self {
        Self::Object(ObjectType::of::<T>())
    }

    /// Whether this is one of the optional wrapper kinds
    pub fn is_optional(&self) -> bool {
        matches!(self, Self::Optional(_))
    }

    /// Whether a value declared as `other` may be passed where `self` is expected
    ///
    /// Mirrors reflective assignability: no numeric widening, `Any` accepts
    /// everything, lists are covariant in their element type.
    pub fn is_assignable_from(&self, other: &ValueType) -> bool {
        match (self, other) {
            (Self::Any, _) => true,
            (Self::List(target), Self::List(source)) => target.is_assignable_from(source),
            (Self::Optional(target), Self::Optional(source)) => target.is_assignable_from(source),
            _ => self == other,
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str("any"),
            Self::Bool => f.write_str("bool"),
            Self::Int => f.write_str("int"),
            Self::Long => f.write_str("long"),
            Self::Double => f.write_str("double"),
            Self::String => f.write_str("string"),
            Self::List(inner) => write!(f, "list<{}>", inner),
            Self::Map => f.write_str("map"),
            Self::Optional(kind) => write!(f, "{}", kind),
            Self::Schema(schema) => f.write_str(schema.name()),
            Self::Object(object) => f.write_str(object.name()),
        }
    }
}

/// Identity of an opaque Rust type
#[derive(Debug, Clone, Copy)]
pub struct ObjectType {
    id: TypeId,
    name: &'static str,
}

impl ObjectType {
    /// Identity of `T`
    pub fn of<T: Any>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// Rust type name
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Rust type id
    pub fn type_id(&self) -> TypeId {
        self.id
    }
}

impl PartialEq for ObjectType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ObjectType {}

impl Hash for ObjectType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// Lazily resolved reference to a schema descriptor
///
/// Resolution is deferred so that mutually referencing schemas can be
/// declared; the materializer detects the resulting cycle.
#[derive(Clone, Copy)]
pub struct SchemaRef {
    name: &'static str,
    resolve: fn() -> TypeDescriptor,
}

impl SchemaRef {
    /// Reference a descriptor by name and constructor
    pub const fn new(name: &'static str, resolve: fn() -> TypeDescriptor) -> Self {
        Self { name, resolve }
    }

    /// Reference the descriptor of `S`
    pub fn of<S: Schema>() -> Self {
        Self::new(S::NAME, S::descriptor)
    }

    /// Schema name
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Build the referenced descriptor
    pub fn resolve(&self) -> TypeDescriptor {
        (self.resolve)()
    }
}

impl PartialEq for SchemaRef {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for SchemaRef {}

impl Hash for SchemaRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl fmt::Debug for SchemaRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SchemaRef").field(&self.name).finish()
    }
}

/// Shape of an executable member: accessor, constructor or mutator
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Signature {
    owner: String,
    name: String,
    params: Vec<ValueType>,
    returns: ValueType,
}

impl Signature {
    /// Create a signature
    pub fn new(
        owner: impl Into<String>,
        name: impl Into<String>,
        params: Vec<ValueType>,
        returns: ValueType,
    ) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
            params,
            returns,
        }
    }

    /// Zero-argument accessor returning `returns`
    pub fn accessor(owner: impl Into<String>, name: impl Into<String>, returns: ValueType) -> Self {
        Self::new(owner, name, Vec::new(), returns)
    }

    /// Name of the declaring type
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Member name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parameter types, in order
    pub fn params(&self) -> &[ValueType] {
        &self.params
    }

    /// Parameter type at `index`
    pub fn param(&self, index: usize) -> Option<&ValueType> {
        self.params.get(index)
    }

    /// Return type
    pub fn returns(&self) -> &ValueType {
        &self.returns
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let params = self
            .params
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        write!(f, "{}.{}({}) -> {}", self.owner, self.name, params, self.returns)
    }
}

/// Whether a type is a capability contract or a concrete type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeForm {
    /// Contract made of accessors; may describe configuration
    Contract,
    /// Concrete data type; never a schema
    Concrete,
}

/// How a member is provided
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemberBody {
    /// No body: a configuration accessor
    Abstract,
    /// Provided method with a body, ignored by validation
    Default,
    /// Associated function, ignored by validation
    Static,
}

/// One member of a described type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    signature: Signature,
    body: MemberBody,
}

impl Member {
    /// Create a member
    pub fn new(signature: Signature, body: MemberBody) -> Self {
        Self { signature, body }
    }

    /// Member signature
    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// How the member is provided
    pub fn body(&self) -> MemberBody {
        self.body
    }
}

/// Explicit description of a type, as validated by the materializer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDescriptor {
    name: String,
    form: TypeForm,
    tagged: bool,
    members: Vec<Member>,
}

impl TypeDescriptor {
    /// A contract tagged as a configuration schema
    pub fn schema(name: impl Into<String>) -> Self {
        Self::new(name, TypeForm::Contract, true)
    }

    /// A contract without the schema tag
    pub fn contract(name: impl Into<String>) -> Self {
        Self::new(name, TypeForm::Contract, false)
    }

    /// A concrete type
    pub fn concrete(name: impl Into<String>) -> Self {
        Self::new(name, TypeForm::Concrete, false)
    }

    fn new(name: impl Into<String>, form: TypeForm, tagged: bool) -> Self {
        Self {
            name: name.into(),
            form,
            tagged,
            members: Vec::new(),
        }
    }

    /// Add a configuration accessor
    pub fn accessor(self, name: impl Into<String>, returns: ValueType) -> Self {
        let signature = Signature::accessor(self.name.clone(), name, returns);
        self.member(Member::new(signature, MemberBody::Abstract))
    }

    /// Add a bodiless member taking parameters
    pub fn abstract_method(
        self,
        name: impl Into<String>,
        params: Vec<ValueType>,
        returns: ValueType,
    ) -> Self {
        let signature = Signature::new(self.name.clone(), name, params, returns);
        self.member(Member::new(signature, MemberBody::Abstract))
    }

    /// Add a provided method
    pub fn default_method(
        self,
        name: impl Into<String>,
        params: Vec<ValueType>,
        returns: ValueType,
    ) -> Self {
        let signature = Signature::new(self.name.clone(), name, params, returns);
        self.member(Member::new(signature, MemberBody::Default))
    }

    /// Add an associated function
    pub fn static_method(
        self,
        name: impl Into<String>,
        params: Vec<ValueType>,
        returns: ValueType,
    ) -> Self {
        let signature = Signature::new(self.name.clone(), name, params, returns);
        self.member(Member::new(signature, MemberBody::Static))
    }

    /// Add an arbitrary member
    pub fn member(mut self, member: Member) -> Self {
        self.members.push(member);
        self
    }

    /// Type name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Contract or concrete
    pub fn form(&self) -> TypeForm {
        self.form
    }

    /// Whether the type is tagged as a configuration schema
    pub fn is_tagged(&self) -> bool {
        self.tagged
    }

    /// Declared members
    pub fn members(&self) -> &[Member] {
        &self.members
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_any_accepts_everything() {
        assert!(ValueType::Any.is_assignable_from(&ValueType::String));
        assert!(ValueType::Any.is_assignable_from(&ValueType::list(ValueType::Int)));
        assert!(!ValueType::String.is_assignable_from(&ValueType::Any));
    }

    #[test]
    fn test_no_numeric_widening() {
        assert!(ValueType::Int.is_assignable_from(&ValueType::Int));
        assert!(!ValueType::Long.is_assignable_from(&ValueType::Int));
        assert!(!ValueType::Double.is_assignable_from(&ValueType::Long));
    }

    #[test]
    fn test_list_covariance() {
        let strings = ValueType::list(ValueType::String);
        let anys = ValueType::list(ValueType::Any);
        assert!(anys.is_assignable_from(&strings));
        assert!(!strings.is_assignable_from(&anys));
    }

    #[test]
    fn test_object_types_compare_by_identity() {
        struct Clock;
        struct Other;
        assert!(ValueType::object::<Clock>().is_assignable_from(&ValueType::object::<Clock>()));
        assert!(!ValueType::object::<Clock>().is_assignable_from(&ValueType::object::<Other>()));
    }

    #[test]
    fn test_signature_display() {
        let signature = Signature::new(
            "Archive",
            "new",
            vec![ValueType::String, ValueType::Int],
            ValueType::Any,
        );
        assert_eq!(signature.to_string(), "Archive.new(string, int) -> any");
    }

    #[test]
    fn test_descriptor_builder_records_members() {
        let descriptor = TypeDescriptor::schema("Retry")
            .accessor("getAttempts", ValueType::Int)
            .default_method("describe", vec![], ValueType::String);
        assert_eq!(descriptor.name(), "Retry");
        assert!(descriptor.is_tagged());
        assert_eq!(descriptor.members().len(), 2);
        assert_eq!(descriptor.members()[0].body(), MemberBody::Abstract);
        assert_eq!(descriptor.members()[0].signature().owner(), "Retry");
    }
}
