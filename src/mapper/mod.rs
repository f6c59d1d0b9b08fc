//! Conversion between MessagePack wire values and Rust objects.
//!
//! The registry holds one bidirectional converter per (wire type, target type)
//! pair. It is built once at client construction (see [`default_mapper`]) and
//! treated as read-only afterwards, so lookups are safe to call concurrently.
//! Re-registering a pair before first use overwrites the previous converter;
//! the last registration wins.

mod default;

pub use default::default_mapper;

use std::any::{Any, TypeId};
use std::collections::HashMap;

use rmpv::Value;

use crate::error::{ClientError, ClientResult};

/// Tag identifying the wire-level representation of a [`Value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WireType {
    Nil,
    Boolean,
    Integer,
    Float,
    String,
    Binary,
    Array,
    Map,
}

impl WireType {
    /// The self-described wire type of a value. Extension payloads are
    /// treated as opaque binary.
    pub fn of(value: &Value) -> WireType {
        match value {
            Value::Nil => WireType::Nil,
            Value::Boolean(_) => WireType::Boolean,
            Value::Integer(_) => WireType::Integer,
            Value::F32(_) | Value::F64(_) => WireType::Float,
            Value::String(_) => WireType::String,
            Value::Binary(_) | Value::Ext(..) => WireType::Binary,
            Value::Array(_) => WireType::Array,
            Value::Map(_) => WireType::Map,
        }
    }
}

type BoxedObject = Box<dyn Any + Send>;
type DecodeFn = Box<dyn Fn(&Value) -> ClientResult<BoxedObject> + Send + Sync>;
type EncodeFn = Box<dyn Fn(&dyn Any) -> ClientResult<Value> + Send + Sync>;

/// Registry of converters between wire values and Rust objects.
///
/// Decoding dispatches on the (wire type, target type) pair; encoding
/// dispatches on the runtime type of the object. A missing converter is
/// reported as [`ClientError::ConverterNotFound`], distinct from a converter
/// failing on malformed data.
pub struct ValueMapper {
    decoders: HashMap<(WireType, TypeId), DecodeFn>,
    encoders: HashMap<TypeId, EncodeFn>,
    implicit_targets: HashMap<WireType, TypeId>,
}

impl std::fmt::Debug for ValueMapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValueMapper")
            .field("decoders", &self.decoders.len())
            .field("encoders", &self.encoders.len())
            .field("implicit_targets", &self.implicit_targets.len())
            .finish()
    }
}

impl ValueMapper {
    /// An empty registry with no converters. Most callers want
    /// [`default_mapper`] instead.
    pub fn new() -> Self {
        Self {
            decoders: HashMap::new(),
            encoders: HashMap::new(),
            implicit_targets: HashMap::new(),
        }
    }

    /// Register a converter pair for `(wire_type, T)`. Overwrites any prior
    /// converter for that pair.
    pub fn register<T, D, E>(&mut self, wire_type: WireType, decode: D, encode: E)
    where
        T: Any + Send,
        D: Fn(&Value) -> ClientResult<T> + Send + Sync + 'static,
        E: Fn(&T) -> ClientResult<Value> + Send + Sync + 'static,
    {
        self.decoders.insert(
            (wire_type, TypeId::of::<T>()),
            Box::new(move |value| decode(value).map(|object| Box::new(object) as BoxedObject)),
        );
        self.encoders.insert(
            TypeId::of::<T>(),
            Box::new(move |object| match object.downcast_ref::<T>() {
                Some(typed) => encode(typed),
                None => Err(ClientError::ConverterNotFound(
                    std::any::type_name::<T>().to_string(),
                )),
            }),
        );
    }

    /// Register a converter pair and make `T` the implicit decode target for
    /// `wire_type`, used by [`decode_value`](Self::decode_value) when the
    /// caller does not name a target type.
    pub fn register_default<T, D, E>(&mut self, wire_type: WireType, decode: D, encode: E)
    where
        T: Any + Send,
        D: Fn(&Value) -> ClientResult<T> + Send + Sync + 'static,
        E: Fn(&T) -> ClientResult<Value> + Send + Sync + 'static,
    {
        self.register(wire_type, decode, encode);
        self.implicit_targets.insert(wire_type, TypeId::of::<T>());
    }

    /// Decode a wire value into an explicit target type.
    pub fn decode<T: Any + Send>(&self, value: &Value) -> ClientResult<T> {
        let wire_type = WireType::of(value);
        let decoder = self
            .decoders
            .get(&(wire_type, TypeId::of::<T>()))
            .ok_or_else(|| {
                ClientError::ConverterNotFound(format!(
                    "{:?} -> {}",
                    wire_type,
                    std::any::type_name::<T>()
                ))
            })?;

        match decoder(value)?.downcast::<T>() {
            Ok(object) => Ok(*object),
            Err(_) => Err(ClientError::ConverterNotFound(format!(
                "{:?} -> {}",
                wire_type,
                std::any::type_name::<T>()
            ))),
        }
    }

    /// Decode a wire value into the implicit target type registered for its
    /// wire type.
    pub fn decode_value(&self, value: &Value) -> ClientResult<BoxedObject> {
        let wire_type = WireType::of(value);
        let target = self
            .implicit_targets
            .get(&wire_type)
            .ok_or_else(|| ClientError::ConverterNotFound(format!("{:?}", wire_type)))?;
        let decoder = self
            .decoders
            .get(&(wire_type, *target))
            .ok_or_else(|| ClientError::ConverterNotFound(format!("{:?}", wire_type)))?;

        decoder(value)
    }

    /// Encode an object into a wire value, dispatching on its runtime type.
    pub fn encode<T: Any>(&self, object: &T) -> ClientResult<Value> {
        let encoder = self.encoders.get(&TypeId::of::<T>()).ok_or_else(|| {
            ClientError::ConverterNotFound(std::any::type_name::<T>().to_string())
        })?;

        encoder(object)
    }
}

impl Default for ValueMapper {
    fn default() -> Self {
        default_mapper()
    }
}
