//! Value conversion
//!
//! The materializer and the object factories never coerce raw input
//! themselves. They hand every raw value, together with the executable it is
//! destined for, to a [`ValueConverter`]. [`DefaultConverter`] covers the
//! usual cases: scalar parsing, lists, optional wrapping and nested schema
//! maps.

use crate::error::ConversionError;
use crate::optional::OptionalKind;
use crate::schema;
use crate::types::{Signature, ValueType};
use crate::value::Value;

/// Pluggable coercion of raw configuration values
pub trait ValueConverter: Send + Sync {
    /// Convert `raw` to the type of parameter `index` of `target`
    fn to_parameter_type(
        &self,
        raw: &Value,
        target: &Signature,
        index: usize,
    ) -> Result<Value, ConversionError>;

    /// Convert `raw` to the return type of `target`
    fn to_return_value_type(&self, raw: &Value, target: &Signature)
    -> Result<Value, ConversionError>;
}

/// Converter used when none is configured
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultConverter;

impl ValueConverter for DefaultConverter {
    fn to_parameter_type(
        &self,
        raw: &Value,
        target: &Signature,
        index: usize,
    ) -> Result<Value, ConversionError> {
        let ty = target
            .param(index)
            .ok_or_else(|| ConversionError::NoSuchParameter {
                executable: target.to_string(),
                index,
            })?;
        self.convert(raw, ty)
    }

    fn to_return_value_type(
        &self,
        raw: &Value,
        target: &Signature,
    ) -> Result<Value, ConversionError> {
        self.convert(raw, target.returns())
    }
}

impl DefaultConverter {
    /// Convert `raw` to `ty`
    ///
    /// Null converts to null, or to the empty value of an optional kind.
    pub fn convert(&self, raw: &Value, ty: &ValueType) -> Result<Value, ConversionError> {
        if raw.is_null() {
            return Ok(match ty {
                ValueType::Optional(kind) => Value::Optional(kind.empty()),
                _ => Value::Null,
            });
        }

        // Already wrapped values are unwrapped and converted again
        if let Value::Optional(optional) = raw {
            if let ValueType::Optional(kind) = ty
                && kind.is_assignable_from(&optional.kind())
                && !matches!(kind, OptionalKind::Generic(_))
            {
                return Ok(raw.clone());
            }
            let inner = optional.get().unwrap_or(Value::Null);
            return self.convert(&inner, ty);
        }

        match ty {
            ValueType::Any => Ok(raw.clone()),
            ValueType::Bool => to_bool(raw).map(Value::Bool),
            ValueType::Int => to_int(raw).map(Value::Int),
            ValueType::Long => to_long(raw).map(Value::Long),
            ValueType::Double => to_double(raw).map(Value::Double),
            ValueType::String => to_string(raw).map(Value::String),
            ValueType::List(inner) => self.to_list(raw, inner),
            ValueType::Map => match raw {
                Value::Map(map) => Ok(Value::Map(map.clone())),
                Value::Config(config) => Ok(Value::Map(config.to_map())),
                other => Err(ConversionError::incompatible(ty, other.kind())),
            },
            ValueType::Optional(kind) => {
                let inner = self.convert(raw, &kind.inner_type())?;
                kind.wrap(inner).map(Value::Optional)
            }
            ValueType::Schema(reference) => match raw {
                Value::Config(config) if config.schema_name() == reference.name() => {
                    Ok(raw.clone())
                }
                Value::Map(map) => schema::materialize_with(self, &reference.resolve(), map)
                    .map(Value::Config)
                    .map_err(|err| ConversionError::Nested(Box::new(err))),
                other => Err(ConversionError::incompatible(ty, other.kind())),
            },
            ValueType::Object(object) => match raw {
                Value::Object(value) if value.object_type() == *object => Ok(raw.clone()),
                other => Err(ConversionError::incompatible(ty, other.kind())),
            },
        }
    }

    fn to_list(&self, raw: &Value, inner: &ValueType) -> Result<Value, ConversionError> {
        let items = match raw {
            Value::List(items) => items.as_slice(),
            single => std::slice::from_ref(single),
        };
        items
            .iter()
            .enumerate()
            .map(|(index, item)| {
                self.convert(item, inner)
                    .map_err(|source| ConversionError::Element {
                        index,
                        source: Box::new(source),
                    })
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Value::List)
    }
}

fn to_bool(raw: &Value) -> Result<bool, ConversionError> {
    match raw {
        Value::Bool(b) => Ok(*b),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" => Ok(true),
            "false" => Ok(false),
            _ => Err(parse_error(&ValueType::Bool, s, "expected 'true' or 'false'")),
        },
        other => Err(ConversionError::incompatible(&ValueType::Bool, other.kind())),
    }
}

fn to_long(raw: &Value) -> Result<i64, ConversionError> {
    match raw {
        Value::Int(n) => Ok(i64::from(*n)),
        Value::Long(n) => Ok(*n),
        Value::Double(d) if d.fract() == 0.0 && d.abs() < 9.2e18 => Ok(*d as i64),
        Value::Double(d) => Err(ConversionError::OutOfRange {
            expected: ValueType::Long,
            value: d.to_string(),
        }),
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|err| parse_error(&ValueType::Long, s, &err.to_string())),
        other => Err(ConversionError::incompatible(&ValueType::Long, other.kind())),
    }
}

fn to_int(raw: &Value) -> Result<i32, ConversionError> {
    if let Value::String(s) = raw {
        return s
            .trim()
            .parse::<i32>()
            .map_err(|err| parse_error(&ValueType::Int, s, &err.to_string()));
    }
    let wide = to_long(raw).map_err(|err| match err {
        ConversionError::Incompatible { found, .. } => {
            ConversionError::incompatible(&ValueType::Int, found)
        }
        other => other,
    })?;
    i32::try_from(wide).map_err(|_| ConversionError::OutOfRange {
        expected: ValueType::Int,
        value: wide.to_string(),
    })
}

fn to_double(raw: &Value) -> Result<f64, ConversionError> {
    match raw {
        Value::Int(n) => Ok(f64::from(*n)),
        Value::Long(n) => Ok(*n as f64),
        Value::Double(d) => Ok(*d),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|err| parse_error(&ValueType::Double, s, &err.to_string())),
        other => Err(ConversionError::incompatible(&ValueType::Double, other.kind())),
    }
}

fn to_string(raw: &Value) -> Result<String, ConversionError> {
    match raw {
        Value::String(s) => Ok(s.clone()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Int(n) => Ok(n.to_string()),
        Value::Long(n) => Ok(n.to_string()),
        Value::Double(d) => Ok(d.to_string()),
        other => Err(ConversionError::incompatible(&ValueType::String, other.kind())),
    }
}

fn parse_error(expected: &ValueType, input: &str, message: &str) -> ConversionError {
    ConversionError::Parse {
        expected: expected.clone(),
        input: input.to_string(),
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optional::OptionalValue;
    use rstest::rstest;

    fn convert(raw: Value, ty: ValueType) -> Result<Value, ConversionError> {
        DefaultConverter.convert(&raw, &ty)
    }

    #[rstest]
    #[case(Value::from("5"), ValueType::Int, Value::Int(5))]
    #[case(Value::from(" 7 "), ValueType::Long, Value::Long(7))]
    #[case(Value::Long(3), ValueType::Int, Value::Int(3))]
    #[case(Value::Double(4.0), ValueType::Int, Value::Int(4))]
    #[case(Value::Long(2), ValueType::Double, Value::Double(2.0))]
    #[case(Value::from("12.3"), ValueType::Double, Value::Double(12.3))]
    #[case(Value::from("TRUE"), ValueType::Bool, Value::Bool(true))]
    #[case(Value::Long(42), ValueType::String, Value::from("42"))]
    #[case(Value::from("x"), ValueType::Any, Value::from("x"))]
    fn test_scalar_coercion(#[case] raw: Value, #[case] ty: ValueType, #[case] expected: Value) {
        assert_eq!(convert(raw, ty).unwrap(), expected);
    }

    #[rstest]
    #[case(Value::from("five"), ValueType::Int)]
    #[case(Value::Long(i64::MAX), ValueType::Int)]
    #[case(Value::Double(1.5), ValueType::Long)]
    #[case(Value::from("maybe"), ValueType::Bool)]
    #[case(Value::List(vec![]), ValueType::String)]
    #[case(Value::Bool(true), ValueType::Map)]
    fn test_conversion_failures(#[case] raw: Value, #[case] ty: ValueType) {
        assert!(convert(raw, ty).is_err());
    }

    #[test]
    fn test_null_converts_to_null_or_empty() {
        assert_eq!(convert(Value::Null, ValueType::String).unwrap(), Value::Null);
        assert_eq!(
            convert(Value::Null, ValueType::Optional(OptionalKind::Long)).unwrap(),
            Value::Optional(OptionalValue::Long(None))
        );
    }

    #[test]
    fn test_optional_wraps_converted_inner() {
        assert_eq!(
            convert(Value::from("3"), ValueType::Optional(OptionalKind::Int)).unwrap(),
            Value::Optional(OptionalValue::Int(Some(3)))
        );
        assert_eq!(
            convert(
                Value::Long(3),
                ValueType::Optional(OptionalKind::of(ValueType::String))
            )
            .unwrap(),
            Value::Optional(OptionalValue::Generic(Some(Box::new(Value::from("3")))))
        );
    }

    #[test]
    fn test_present_optional_unwraps_for_plain_target() {
        let raw = Value::Optional(OptionalValue::Int(Some(9)));
        assert_eq!(convert(raw, ValueType::Long).unwrap(), Value::Long(9));
    }

    #[test]
    fn test_list_elements_are_converted() {
        let raw = Value::List(vec![Value::from("1"), Value::Long(2)]);
        assert_eq!(
            convert(raw, ValueType::list(ValueType::Int)).unwrap(),
            Value::List(vec![Value::Int(1), Value::Int(2)])
        );
        assert_eq!(
            convert(Value::from("EFHK"), ValueType::list(ValueType::String)).unwrap(),
            Value::List(vec![Value::from("EFHK")])
        );

        let err = convert(
            Value::List(vec![Value::Long(1), Value::from("x")]),
            ValueType::list(ValueType::Int),
        )
        .unwrap_err();
        assert!(matches!(err, ConversionError::Element { index: 1, .. }));
    }

    #[test]
    fn test_parameter_index_is_checked() {
        let signature = Signature::new("T", "new", vec![ValueType::Int], ValueType::Any);
        let converter = DefaultConverter;
        assert_eq!(
            converter
                .to_parameter_type(&Value::from("1"), &signature, 0)
                .unwrap(),
            Value::Int(1)
        );
        assert!(matches!(
            converter.to_parameter_type(&Value::from("1"), &signature, 1),
            Err(ConversionError::NoSuchParameter { index: 1, .. })
        ));
    }
}
