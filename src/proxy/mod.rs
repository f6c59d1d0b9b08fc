//! Space-level operations dispatched through cluster router procedures.
//!
//! Every operation assembles the argument tuple `[space_name, payload...,
//! options_map]`, picks a live connection through the selection strategy,
//! invokes the procedure bound to the operation kind and decodes the result
//! rows into tuples. Server-reported failures are handed to the error
//! classifier; this layer performs a single attempt and never interprets
//! error contents or retries.

pub mod options;

use std::sync::Arc;

use rmpv::Value;

use crate::connection::strategy::ConnectionSelectionStrategy;
use crate::connection::CallResponse;
use crate::error::{classifier, ClientError, ClientResult};
use crate::mapper::ValueMapper;
use crate::metadata::SpaceMetadata;
use crate::tuple::operations::TupleUpdateOperations;
use crate::tuple::Tuple;

use options::{
    DeleteOptions, InsertOptions, ReplaceOptions, SelectOptions, TruncateOptions, UpdateOptions,
    UpsertOptions,
};

/// Names of the router procedures serving each space operation.
#[derive(Debug, Clone)]
pub struct ProxyOperationsMapping {
    pub insert: String,
    pub replace: String,
    pub delete: String,
    pub update: String,
    pub upsert: String,
    pub select: String,
    pub truncate: String,
}

impl Default for ProxyOperationsMapping {
    fn default() -> Self {
        Self {
            insert: "crud.insert".to_string(),
            replace: "crud.replace".to_string(),
            delete: "crud.delete".to_string(),
            update: "crud.update".to_string(),
            upsert: "crud.upsert".to_string(),
            select: "crud.select".to_string(),
            truncate: "crud.truncate".to_string(),
        }
    }
}

/// Proxy dispatcher for one space.
pub struct ProxySpace {
    metadata: Arc<SpaceMetadata>,
    mapper: Arc<ValueMapper>,
    strategy: Arc<dyn ConnectionSelectionStrategy>,
    mapping: ProxyOperationsMapping,
}

impl ProxySpace {
    pub fn new(
        metadata: Arc<SpaceMetadata>,
        mapper: Arc<ValueMapper>,
        strategy: Arc<dyn ConnectionSelectionStrategy>,
        mapping: ProxyOperationsMapping,
    ) -> Self {
        Self {
            metadata,
            mapper,
            strategy,
            mapping,
        }
    }

    pub fn name(&self) -> &str {
        self.metadata.name()
    }

    /// An empty tuple bound to this space's metadata and mapper.
    pub fn tuple(&self) -> Tuple {
        Tuple::with_metadata(Arc::clone(&self.mapper), Arc::clone(&self.metadata))
    }

    pub async fn insert(&self, tuple: &Tuple, options: &InsertOptions) -> ClientResult<Vec<Tuple>> {
        let args = vec![self.space_arg(), tuple.to_wire(), options.to_wire()];
        self.dispatch(&self.mapping.insert, args).await
    }

    pub async fn replace(
        &self,
        tuple: &Tuple,
        options: &ReplaceOptions,
    ) -> ClientResult<Vec<Tuple>> {
        let args = vec![self.space_arg(), tuple.to_wire(), options.to_wire()];
        self.dispatch(&self.mapping.replace, args).await
    }

    pub async fn delete(&self, key: &Tuple, options: &DeleteOptions) -> ClientResult<Vec<Tuple>> {
        let args = vec![self.space_arg(), key.to_wire(), options.to_wire()];
        self.dispatch(&self.mapping.delete, args).await
    }

    pub async fn update(
        &self,
        key: &Tuple,
        operations: &TupleUpdateOperations,
        options: &UpdateOptions,
    ) -> ClientResult<Vec<Tuple>> {
        let args = vec![
            self.space_arg(),
            key.to_wire(),
            self.lower_operations(operations)?,
            options.to_wire(),
        ];
        self.dispatch(&self.mapping.update, args).await
    }

    pub async fn upsert(
        &self,
        tuple: &Tuple,
        operations: &TupleUpdateOperations,
        options: &UpsertOptions,
    ) -> ClientResult<Vec<Tuple>> {
        let args = vec![
            self.space_arg(),
            tuple.to_wire(),
            self.lower_operations(operations)?,
            options.to_wire(),
        ];
        self.dispatch(&self.mapping.upsert, args).await
    }

    /// Select tuples matching a key prefix; `None` selects from the start of
    /// the index, bounded by the options' limit and pagination cursor.
    pub async fn select(
        &self,
        key: Option<&Tuple>,
        options: &SelectOptions,
    ) -> ClientResult<Vec<Tuple>> {
        let conditions = match key {
            Some(key) => key.to_wire(),
            None => Value::Nil,
        };
        let args = vec![self.space_arg(), conditions, options.to_wire()];
        self.dispatch(&self.mapping.select, args).await
    }

    pub async fn truncate(&self, options: &TruncateOptions) -> ClientResult<()> {
        let args = vec![self.space_arg(), options.to_wire()];
        self.dispatch(&self.mapping.truncate, args).await?;
        Ok(())
    }

    fn space_arg(&self) -> Value {
        Value::from(self.metadata.name())
    }

    /// Lower an operation set to its fully positional proxy form.
    fn lower_operations(&self, operations: &TupleUpdateOperations) -> ClientResult<Value> {
        let lowered = operations.resolve_proxy_list(&self.metadata)?;
        Ok(Value::Array(
            lowered.iter().map(|operation| operation.to_wire()).collect(),
        ))
    }

    async fn dispatch(&self, procedure: &str, args: Vec<Value>) -> ClientResult<Vec<Tuple>> {
        let connection = self.strategy.next()?;
        tracing::debug!(
            procedure,
            space = self.metadata.name(),
            address = connection.address(),
            "dispatching proxy call"
        );

        match connection.call(procedure, args).await? {
            CallResponse::Ok(result) => self.decode_rows(result),
            CallResponse::Error(payload) => Err(classifier::classify(&payload)),
        }
    }

    /// Decode a router result into tuples. Routers answer either with a bare
    /// array of rows or with a map carrying a `rows` array next to response
    /// metadata.
    fn decode_rows(&self, result: Value) -> ClientResult<Vec<Tuple>> {
        let rows = match result {
            Value::Nil => Vec::new(),
            Value::Array(rows) => rows,
            Value::Map(entries) => {
                let rows = entries
                    .into_iter()
                    .find(|(key, _)| key.as_str() == Some("rows"))
                    .map(|(_, value)| value);
                match rows {
                    Some(Value::Array(rows)) => rows,
                    Some(other) => {
                        return Err(ClientError::Protocol(format!(
                            "expected a rows array, got {}",
                            other
                        )))
                    }
                    None => Vec::new(),
                }
            }
            other => {
                return Err(ClientError::Protocol(format!(
                    "unexpected result shape: {}",
                    other
                )))
            }
        };

        rows.into_iter()
            .map(|row| {
                Tuple::from_wire(
                    row,
                    Arc::clone(&self.mapper),
                    Some(Arc::clone(&self.metadata)),
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::strategy::RoundRobinStrategy;
    use crate::connection::{PooledConnection, RpcClient};
    use crate::mapper::default_mapper;
    use async_trait::async_trait;

    struct FixedRpc(CallResponse);

    #[async_trait]
    impl RpcClient for FixedRpc {
        async fn call(&self, _procedure: &str, _args: Vec<Value>) -> ClientResult<CallResponse> {
            Ok(self.0.clone())
        }
    }

    fn space_with_response(response: CallResponse) -> ProxySpace {
        let connection = Arc::new(PooledConnection::new(
            "127.0.0.1:3301",
            Arc::new(FixedRpc(response)),
        ));
        ProxySpace::new(
            Arc::new(SpaceMetadata::new(
                "books",
                ["id", "isbn", "title", "author", "year"],
            )),
            Arc::new(default_mapper()),
            Arc::new(RoundRobinStrategy::new(vec![connection])),
            ProxyOperationsMapping::default(),
        )
    }

    #[tokio::test]
    async fn test_rows_envelope_is_unwrapped() {
        let response = CallResponse::Ok(Value::Map(vec![
            (
                Value::from("metadata"),
                Value::Array(vec![Value::from("id")]),
            ),
            (
                Value::from("rows"),
                Value::Array(vec![Value::Array(vec![Value::from(1), Value::from("a1")])]),
            ),
        ]));
        let space = space_with_response(response);

        let rows = space.select(None, &SelectOptions::new()).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get_decoded::<i64>(0).unwrap(), Some(1));
    }

    #[tokio::test]
    async fn test_error_payload_is_classified() {
        let payload = Value::Map(vec![
            (Value::from("code"), Value::from(3u64)),
            (Value::from("message"), Value::from("Space 'books' does not exist")),
        ]);
        let space = space_with_response(CallResponse::Error(payload));

        let err = space
            .insert(&space.tuple(), &InsertOptions::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::BoxError { code: 3, .. }));
    }

    #[tokio::test]
    async fn test_update_rejects_unknown_field_name_before_the_wire() {
        let space = space_with_response(CallResponse::Ok(Value::Nil));
        let mut key = space.tuple();
        key.set(0, &4i64).unwrap();
        let operations = TupleUpdateOperations::set("publisher", "Secker & Warburg");

        let err = space
            .update(&key, &operations, &UpdateOptions::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::FieldNotFound(name) if name == "publisher"));
    }
}
