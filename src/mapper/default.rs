//! Default converter set installed at client construction.

use rmpv::Value;

use super::{ValueMapper, WireType};
use crate::error::ClientError;

/// Build a registry with converters for the common Rust types.
///
/// Implicit decode targets: nil -> `()`, boolean -> `bool`, integer -> `i64`,
/// float -> `f64`, string -> `String`, binary -> `Vec<u8>`, array ->
/// `Vec<Value>`, map -> `Vec<(Value, Value)>`. Identity converters to
/// [`Value`] are registered for every wire type.
pub fn default_mapper() -> ValueMapper {
    let mut mapper = ValueMapper::new();

    mapper.register_default::<(), _, _>(WireType::Nil, |_| Ok(()), |_| Ok(Value::Nil));

    mapper.register_default::<bool, _, _>(
        WireType::Boolean,
        |value| {
            value
                .as_bool()
                .ok_or_else(|| ClientError::Protocol("expected a boolean".to_string()))
        },
        |flag| Ok(Value::from(*flag)),
    );

    mapper.register_default::<i64, _, _>(
        WireType::Integer,
        |value| {
            value
                .as_i64()
                .ok_or_else(|| ClientError::Protocol("integer does not fit into i64".to_string()))
        },
        |n| Ok(Value::from(*n)),
    );
    mapper.register::<u64, _, _>(
        WireType::Integer,
        |value| {
            value
                .as_u64()
                .ok_or_else(|| ClientError::Protocol("integer does not fit into u64".to_string()))
        },
        |n| Ok(Value::from(*n)),
    );
    mapper.register::<i32, _, _>(
        WireType::Integer,
        |value| {
            value
                .as_i64()
                .and_then(|n| i32::try_from(n).ok())
                .ok_or_else(|| ClientError::Protocol("integer does not fit into i32".to_string()))
        },
        |n| Ok(Value::from(*n)),
    );

    mapper.register_default::<f64, _, _>(
        WireType::Float,
        |value| {
            value
                .as_f64()
                .ok_or_else(|| ClientError::Protocol("expected a float".to_string()))
        },
        |x| Ok(Value::from(*x)),
    );
    mapper.register::<f32, _, _>(
        WireType::Float,
        |value| {
            value
                .as_f64()
                .map(|x| x as f32)
                .ok_or_else(|| ClientError::Protocol("expected a float".to_string()))
        },
        |x| Ok(Value::from(*x)),
    );

    mapper.register_default::<String, _, _>(
        WireType::String,
        |value| {
            value
                .as_str()
                .map(str::to_string)
                .ok_or_else(|| ClientError::Protocol("string is not valid utf-8".to_string()))
        },
        |s| Ok(Value::from(s.as_str())),
    );

    mapper.register_default::<Vec<u8>, _, _>(
        WireType::Binary,
        |value| {
            value
                .as_slice()
                .map(<[u8]>::to_vec)
                .ok_or_else(|| ClientError::Protocol("expected binary".to_string()))
        },
        |bytes| Ok(Value::Binary(bytes.clone())),
    );

    mapper.register_default::<Vec<Value>, _, _>(
        WireType::Array,
        |value| {
            value
                .as_array()
                .cloned()
                .ok_or_else(|| ClientError::Protocol("expected an array".to_string()))
        },
        |items| Ok(Value::Array(items.clone())),
    );

    mapper.register_default::<Vec<(Value, Value)>, _, _>(
        WireType::Map,
        |value| {
            value
                .as_map()
                .cloned()
                .ok_or_else(|| ClientError::Protocol("expected a map".to_string()))
        },
        |entries| Ok(Value::Map(entries.clone())),
    );

    // Identity pass-through, usable from every wire type.
    for wire_type in [
        WireType::Nil,
        WireType::Boolean,
        WireType::Integer,
        WireType::Float,
        WireType::String,
        WireType::Binary,
        WireType::Array,
        WireType::Map,
    ] {
        mapper.register::<Value, _, _>(wire_type, |value| Ok(value.clone()), |value| {
            Ok(value.clone())
        });
    }

    mapper
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_converter_for_every_wire_type() {
        let mapper = default_mapper();
        let values = vec![
            Value::Nil,
            Value::from(false),
            Value::from(9),
            Value::F64(2.5),
            Value::from("x"),
            Value::Binary(vec![1, 2]),
            Value::Array(vec![Value::from(1)]),
            Value::Map(vec![(Value::from("k"), Value::from(1))]),
        ];

        for value in values {
            let round_tripped: Value = mapper.decode(&value).unwrap();
            assert_eq!(round_tripped, value);
        }
    }

    #[test]
    fn test_integer_width_converters() {
        let mapper = default_mapper();

        let n: u64 = mapper.decode(&Value::from(7u64)).unwrap();
        assert_eq!(n, 7);
        let n: i32 = mapper.decode(&Value::from(-3)).unwrap();
        assert_eq!(n, -3);

        // u64::MAX does not fit into i64: converter exists but data is bad.
        let err = mapper.decode::<i64>(&Value::from(u64::MAX)).unwrap_err();
        assert!(matches!(err, ClientError::Protocol(_)));
    }

    #[test]
    fn test_binary_and_array_targets() {
        let mapper = default_mapper();

        let bytes: Vec<u8> = mapper.decode(&Value::Binary(vec![1, 2, 3])).unwrap();
        assert_eq!(bytes, vec![1, 2, 3]);

        let items: Vec<Value> = mapper
            .decode(&Value::Array(vec![Value::from(1), Value::from("a")]))
            .unwrap();
        assert_eq!(items.len(), 2);
    }
}
