//! Error types for metforge-core

use thiserror::Error;

use crate::types::ValueType;

/// Result type alias for metforge-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Boxed cause carried by construction and property failures
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Structural problems found while validating a schema type
///
/// These depend only on the schema descriptor, never on configuration data.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// The type cannot describe configuration at all
    #[error("'{schema}' is not a valid schema type: {reason}")]
    Violation {
        /// Name of the offending schema type
        schema: String,
        /// Description of what's invalid
        reason: String,
    },

    /// Two or more accessors resolve to the same property name
    #[error("ambiguous config names in '{schema}': {}", render_groups(.groups))]
    AmbiguousNames {
        /// Name of the offending schema type
        schema: String,
        /// Property name and the accessors that collide on it
        groups: Vec<(String, Vec<String>)>,
    },

    /// The schema graph revisits a type that is still being processed
    #[error("circular schema reference: {}", .path.join(" -> "))]
    CircularReference {
        /// Types from the entry point to the revisited type
        path: Vec<String>,
    },
}

fn render_groups(groups: &[(String, Vec<String>)]) -> String {
    groups
        .iter()
        .map(|(property, accessors)| format!("'{}' <- [{}]", property, accessors.join(", ")))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Failures of the value converter
#[derive(Error, Debug)]
pub enum ConversionError {
    /// The raw value has a shape the target type cannot accept
    #[error("cannot convert {found} to {expected}")]
    Incompatible {
        /// Declared target type
        expected: ValueType,
        /// Kind of the supplied value
        found: &'static str,
    },

    /// A numeric value does not fit the target type
    #[error("value {value} is out of range for {expected}")]
    OutOfRange {
        /// Declared target type
        expected: ValueType,
        /// Rendering of the supplied value
        value: String,
    },

    /// A string could not be parsed into the target type
    #[error("cannot parse '{input}' as {expected}: {message}")]
    Parse {
        /// Declared target type
        expected: ValueType,
        /// The supplied string
        input: String,
        /// Parser message
        message: String,
    },

    /// One element of a list failed to convert
    #[error("invalid list element {index}: {source}")]
    Element {
        /// Position of the element
        index: usize,
        /// Why the element failed
        #[source]
        source: Box<ConversionError>,
    },

    /// The executable has no parameter at the requested position
    #[error("'{executable}' has no parameter at position {index}")]
    NoSuchParameter {
        /// Rendering of the target executable
        executable: String,
        /// Requested position
        index: usize,
    },

    /// A nested map could not be materialized into its schema
    #[error("invalid nested configuration: {0}")]
    Nested(#[source] Box<Error>),
}

impl ConversionError {
    pub(crate) fn incompatible(expected: &ValueType, found: &'static str) -> Self {
        Self::Incompatible {
            expected: expected.clone(),
            found,
        }
    }

    /// The nested materialization failure behind this error, if any
    pub fn nested(&self) -> Option<&Error> {
        match self {
            Self::Nested(inner) => Some(inner),
            Self::Element { source, .. } => source.nested(),
            _ => None,
        }
    }
}

/// Failure categories, one per class of misconfiguration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Illegal schema type, parameterized accessor or ambiguous naming
    SchemaViolation,
    /// A schema (or value) graph revisits a type being processed
    CircularReference,
    /// A supplied key matches no property or mutator
    UnknownOption,
    /// A required key is absent from the supplied map
    MissingRequiredOption,
    /// Two supplied keys collapse onto the same option
    DuplicateOption,
    /// A raw value could not be coerced to the declared type
    ConversionFailure,
    /// A constructor or mutator failed while building an instance
    ConstructionFailure,
    /// A factory or registry was declared inconsistently
    Assembly,
}

/// Errors that can occur in metforge-core
#[derive(Error, Debug)]
pub enum Error {
    /// Schema validation failed
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// A supplied key matches no known option
    #[error("unknown config option '{option}' for '{target}'")]
    UnknownOption {
        /// Schema or factory the map was supplied to
        target: String,
        /// The offending key
        option: String,
    },

    /// A required option was not supplied
    #[error("missing required option '{option}' for '{target}'")]
    MissingRequiredOption {
        /// Schema or factory the map was supplied to
        target: String,
        /// Name of the missing option
        option: String,
    },

    /// A supplied value could not be converted to its declared type
    #[error("invalid value for option '{option}' of '{target}': {source}")]
    Conversion {
        /// Schema or factory the map was supplied to
        target: String,
        /// Name of the option
        option: String,
        /// Converter failure
        #[source]
        source: ConversionError,
    },

    /// The resolved constructor failed
    #[error("factory '{factory}' failed to construct '{type_name}': {source}")]
    Construction {
        /// Factory name
        factory: String,
        /// Target type name
        type_name: String,
        /// Constructor failure
        #[source]
        source: BoxError,
    },

    /// A property mutator (or the conversion feeding it) failed
    #[error("factory '{factory}' failed to set property '{property}' on '{type_name}': {source}")]
    PropertySet {
        /// Factory name
        factory: String,
        /// Target type name
        type_name: String,
        /// Property name
        property: String,
        /// Mutator or conversion failure
        #[source]
        source: BoxError,
    },

    /// No public constructor accepts the declared slot types
    #[error("no public constructor of '{type_name}' accepts ({})", render_types(.attempted))]
    NoMatchingConstructor {
        /// Target type name
        type_name: String,
        /// Declared slot types, in order
        attempted: Vec<ValueType>,
    },

    /// More than one public constructor accepts the declared slot types
    #[error(
        "{candidates} public constructors of '{type_name}' accept ({})",
        render_types(.attempted)
    )]
    AmbiguousConstructor {
        /// Target type name
        type_name: String,
        /// Declared slot types, in order
        attempted: Vec<ValueType>,
        /// Number of matching constructors
        candidates: usize,
    },

    /// Two config slots share a name
    #[error("duplicate config slot '{slot}' for '{type_name}'")]
    DuplicateSlotName {
        /// Target type name
        type_name: String,
        /// Repeated slot name
        slot: String,
    },

    /// Two mutators resolve to the same property name
    #[error("ambiguous property '{property}' on '{type_name}': {}", .mutators.join(", "))]
    AmbiguousProperty {
        /// Target type name
        type_name: String,
        /// Property name
        property: String,
        /// Colliding mutator names
        mutators: Vec<String>,
    },

    /// Renaming mapped two source keys onto one target key
    #[error("factory '{factory}' maps both '{first}' and '{second}' to '{target}'")]
    DuplicateRenamedKey {
        /// Factory name
        factory: String,
        /// Rewritten key
        target: String,
        /// First source key
        first: String,
        /// Second source key
        second: String,
    },

    /// A factory name was registered twice
    #[error("factory '{name}' is already registered")]
    DuplicateFactory {
        /// Factory name
        name: String,
    },

    /// No factory is registered under the requested name
    #[error("no factory registered for '{name}'")]
    UnknownFactory {
        /// Requested factory name
        name: String,
    },
}

impl Error {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Schema(SchemaError::CircularReference { .. }) => ErrorKind::CircularReference,
            Self::Schema(_) => ErrorKind::SchemaViolation,
            Self::UnknownOption { .. } => ErrorKind::UnknownOption,
            Self::MissingRequiredOption { .. } => ErrorKind::MissingRequiredOption,
            Self::DuplicateRenamedKey { .. } => ErrorKind::DuplicateOption,
            // A nested map reports what was actually wrong with it
            Self::Conversion { source, .. } => source
                .nested()
                .map_or(ErrorKind::ConversionFailure, Error::kind),
            Self::Construction { .. } | Self::PropertySet { .. } => ErrorKind::ConstructionFailure,
            Self::NoMatchingConstructor { .. }
            | Self::AmbiguousConstructor { .. }
            | Self::DuplicateSlotName { .. }
            | Self::AmbiguousProperty { .. }
            | Self::DuplicateFactory { .. }
            | Self::UnknownFactory { .. } => ErrorKind::Assembly,
        }
    }
}

fn render_types(types: &[ValueType]) -> String {
    types
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_circular_reference_message_names_path() {
        let err = SchemaError::CircularReference {
            path: vec!["A".to_string(), "B".to_string(), "A".to_string()],
        };
        assert_eq!(err.to_string(), "circular schema reference: A -> B -> A");
    }

    #[test]
    fn test_ambiguous_names_message_lists_accessors() {
        let err = SchemaError::AmbiguousNames {
            schema: "Retry".to_string(),
            groups: vec![(
                "count".to_string(),
                vec!["count".to_string(), "getCount".to_string()],
            )],
        };
        let message = err.to_string();
        assert!(message.contains("'count' <- [count, getCount]"));
    }

    #[test]
    fn test_kind_classification() {
        let circular: Error = SchemaError::CircularReference { path: vec![] }.into();
        assert_eq!(circular.kind(), ErrorKind::CircularReference);

        let violation: Error = SchemaError::Violation {
            schema: "X".to_string(),
            reason: "nope".to_string(),
        }
        .into();
        assert_eq!(violation.kind(), ErrorKind::SchemaViolation);

        let constructor = Error::NoMatchingConstructor {
            type_name: "T".to_string(),
            attempted: vec![ValueType::String, ValueType::Int],
        };
        assert_eq!(constructor.kind(), ErrorKind::Assembly);
        assert_eq!(
            constructor.to_string(),
            "no public constructor of 'T' accepts (string, int)"
        );
    }
}
