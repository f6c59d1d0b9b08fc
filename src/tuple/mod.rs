//! Tuple data model: an ordered, sparse, name-addressable row of fields.
//!
//! Name resolution is deliberately asymmetric: reading an unknown name
//! behaves like reading past the end of the tuple and returns `None`, while
//! writing an unknown name fails with [`ClientError::FieldNotFound`]. Reads
//! are defensive, writes are strict.

pub mod operations;

use std::any::Any;
use std::sync::Arc;

use rmpv::Value;
use serde::de::DeserializeOwned;

use crate::error::{ClientError, ClientResult};
use crate::mapper::ValueMapper;
use crate::metadata::SpaceMetadata;

/// One tuple slot: either a decoded wire value or an explicit null.
///
/// The null sentinel is distinct from "absent": a field that was never set
/// reads as `None` from [`Tuple::get`], while an interleaving position filled
/// by a sparse write reads as `Field::Null`.
#[derive(Debug, Clone, PartialEq)]
pub enum Field {
    Null,
    Value(Value),
}

impl Field {
    pub(crate) fn from_wire(value: Value) -> Self {
        match value {
            Value::Nil => Field::Null,
            other => Field::Value(other),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Field::Null)
    }

    /// The wire representation of this field.
    pub fn as_value(&self) -> Value {
        match self {
            Field::Null => Value::Nil,
            Field::Value(value) => value.clone(),
        }
    }

    /// Decode the field into a typed object via the conversion registry.
    /// A null field decodes to `None`.
    pub fn decode<T: Any + Send>(&self, mapper: &ValueMapper) -> ClientResult<Option<T>> {
        match self {
            Field::Null => Ok(None),
            Field::Value(value) => mapper.decode(value).map(Some),
        }
    }
}

/// An ordered sequence of fields representing one database row, optionally
/// backed by space metadata for name-based access.
///
/// Not safe for concurrent mutation; callers must not mutate a tuple already
/// handed to the dispatcher until the corresponding call completes.
#[derive(Debug, Clone)]
pub struct Tuple {
    fields: Vec<Field>,
    metadata: Option<Arc<SpaceMetadata>>,
    mapper: Arc<ValueMapper>,
}

impl Tuple {
    /// An empty tuple without space metadata.
    pub fn new(mapper: Arc<ValueMapper>) -> Self {
        Self {
            fields: Vec::new(),
            metadata: None,
            mapper,
        }
    }

    /// An empty tuple bound to space metadata for name-based access and
    /// format-length bounds checking.
    pub fn with_metadata(mapper: Arc<ValueMapper>, metadata: Arc<SpaceMetadata>) -> Self {
        Self {
            fields: Vec::new(),
            metadata: Some(metadata),
            mapper,
        }
    }

    /// Build a tuple from a decoded wire array (the response path).
    pub fn from_wire(
        value: Value,
        mapper: Arc<ValueMapper>,
        metadata: Option<Arc<SpaceMetadata>>,
    ) -> ClientResult<Self> {
        let items = match value {
            Value::Array(items) => items,
            other => {
                return Err(ClientError::Protocol(format!(
                    "expected a tuple array, got {}",
                    other
                )))
            }
        };

        Ok(Self {
            fields: items.into_iter().map(Field::from_wire).collect(),
            metadata,
            mapper,
        })
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn metadata(&self) -> Option<&Arc<SpaceMetadata>> {
        self.metadata.as_ref()
    }

    /// Read a field by position. Out of range is a valid "absent" result,
    /// not an error.
    pub fn get(&self, position: usize) -> Option<&Field> {
        self.fields.get(position)
    }

    /// Read a field by name. An unknown name, or a tuple without metadata,
    /// reads as absent.
    pub fn get_by_name(&self, field_name: &str) -> Option<&Field> {
        self.get(self.position_by_name(field_name)?)
    }

    /// Read a field by position and decode it through the registry.
    pub fn get_decoded<T: Any + Send>(&self, position: usize) -> ClientResult<Option<T>> {
        match self.get(position) {
            Some(field) => field.decode(&self.mapper),
            None => Ok(None),
        }
    }

    /// Decode the whole tuple into a serde-deserializable type.
    pub fn decode_into<T: DeserializeOwned>(&self) -> ClientResult<T> {
        rmpv::ext::from_value(self.to_wire())
            .map_err(|e| ClientError::Protocol(format!("tuple does not match target type: {}", e)))
    }

    /// Set a field at a position, encoding the value through the registry.
    ///
    /// Positions between the current size and `position` are filled with null
    /// sentinels. When metadata is present the position must stay below the
    /// declared format length.
    pub fn set<T: Any>(&mut self, position: usize, value: &T) -> ClientResult<()> {
        let wire_value = self.mapper.encode(value)?;
        self.set_wire(position, wire_value)
    }

    /// Set an explicit null sentinel at a position.
    pub fn set_null(&mut self, position: usize) -> ClientResult<()> {
        self.set_wire(position, Value::Nil)
    }

    /// Set a field from an already-encoded wire value.
    pub fn set_wire(&mut self, position: usize, value: Value) -> ClientResult<()> {
        if let Some(metadata) = &self.metadata {
            if position >= metadata.format_length() {
                return Err(ClientError::IndexError {
                    position,
                    format_length: metadata.format_length(),
                });
            }
        }

        while self.fields.len() < position {
            self.fields.push(Field::Null);
        }

        let field = Field::from_wire(value);
        if self.fields.len() == position {
            self.fields.push(field);
        } else {
            self.fields[position] = field;
        }
        Ok(())
    }

    /// Set a field by name. Unlike the read path, an unknown name is an
    /// error here.
    pub fn set_by_name<T: Any>(&mut self, field_name: &str, value: &T) -> ClientResult<()> {
        let position = self
            .position_by_name(field_name)
            .ok_or_else(|| ClientError::FieldNotFound(field_name.to_string()))?;
        self.set(position, value)
    }

    /// Serialize the tuple into its wire array. This is the serialization
    /// entry point used by the proxy dispatcher.
    pub fn to_wire(&self) -> Value {
        Value::Array(self.fields.iter().map(Field::as_value).collect())
    }

    fn position_by_name(&self, field_name: &str) -> Option<usize> {
        self.metadata
            .as_ref()
            .and_then(|metadata| metadata.field_position_by_name(field_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapper::default_mapper;

    fn books_metadata() -> Arc<SpaceMetadata> {
        Arc::new(SpaceMetadata::new(
            "books",
            ["id", "isbn", "title", "author", "year"],
        ))
    }

    fn empty_tuple() -> Tuple {
        Tuple::with_metadata(Arc::new(default_mapper()), books_metadata())
    }

    #[test]
    fn test_set_then_get_returns_last_value() {
        let mut tuple = empty_tuple();
        tuple.set(0, &1i64).unwrap();
        tuple.set(0, &2i64).unwrap();

        assert_eq!(tuple.get_decoded::<i64>(0).unwrap(), Some(2));
        assert_eq!(tuple.len(), 1);
    }

    #[test]
    fn test_sparse_write_fills_with_null_sentinels() {
        let mut tuple = empty_tuple();
        tuple.set(3, &"George Orwell".to_string()).unwrap();

        assert_eq!(tuple.len(), 4);
        for position in 0..3 {
            assert!(tuple.get(position).unwrap().is_null(), "position {}", position);
        }
        assert_eq!(
            tuple.get_decoded::<String>(3).unwrap().as_deref(),
            Some("George Orwell")
        );
        // Past the end is absent, never null.
        assert!(tuple.get(4).is_none());
    }

    #[test]
    fn test_set_past_format_length_is_an_index_error() {
        let mut tuple = empty_tuple();
        let err = tuple.set(5, &1i64).unwrap_err();
        assert!(matches!(
            err,
            ClientError::IndexError {
                position: 5,
                format_length: 5
            }
        ));
    }

    #[test]
    fn test_without_metadata_positions_are_unbounded() {
        let mut tuple = Tuple::new(Arc::new(default_mapper()));
        tuple.set(9, &1i64).unwrap();
        assert_eq!(tuple.len(), 10);
    }

    #[test]
    fn test_name_access_asymmetry() {
        let mut tuple = empty_tuple();
        tuple.set_by_name("title", &"Nineteen Eighty-Four".to_string()).unwrap();

        assert_eq!(
            tuple
                .get_by_name("title")
                .map(Field::as_value),
            Some(Value::from("Nineteen Eighty-Four"))
        );
        // Unknown name reads as absent...
        assert!(tuple.get_by_name("publisher").is_none());
        // ...but writes strictly.
        let err = tuple.set_by_name("publisher", &1i64).unwrap_err();
        assert!(matches!(err, ClientError::FieldNotFound(name) if name == "publisher"));
    }

    #[test]
    fn test_name_read_without_metadata_is_absent() {
        let tuple = Tuple::new(Arc::new(default_mapper()));
        assert!(tuple.get_by_name("title").is_none());
    }

    #[test]
    fn test_from_wire_and_back() {
        let mapper = Arc::new(default_mapper());
        let wire = Value::Array(vec![
            Value::from(4),
            Value::from("a4"),
            Value::from("Nineteen Eighty-Four"),
            Value::Nil,
            Value::from(1984),
        ]);

        let tuple = Tuple::from_wire(wire.clone(), mapper, Some(books_metadata())).unwrap();
        assert_eq!(tuple.len(), 5);
        assert!(tuple.get(3).unwrap().is_null());
        assert_eq!(tuple.to_wire(), wire);
    }

    #[test]
    fn test_from_wire_rejects_non_arrays() {
        let err = Tuple::from_wire(Value::from(1), Arc::new(default_mapper()), None).unwrap_err();
        assert!(matches!(err, ClientError::Protocol(_)));
    }

    #[test]
    fn test_decode_into_struct() {
        #[derive(serde::Deserialize)]
        struct Book(i64, String, String, Option<String>, i64);

        let mapper = Arc::new(default_mapper());
        let wire = Value::Array(vec![
            Value::from(4),
            Value::from("a4"),
            Value::from("Nineteen Eighty-Four"),
            Value::Nil,
            Value::from(1984),
        ]);
        let tuple = Tuple::from_wire(wire, mapper, None).unwrap();

        let book: Book = tuple.decode_into().unwrap();
        assert_eq!(book.0, 4);
        assert_eq!(book.2, "Nineteen Eighty-Four");
        assert!(book.3.is_none());
        assert_eq!(book.4, 1984);
    }
}
