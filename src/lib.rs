//! TupleDB Rust client driver core.
//!
//! Provides the request/response pipeline for manipulating remote tuples over
//! the MessagePack binary protocol, against a single node or a sharded
//! cluster reached through `crud.*` stored-procedure proxies: typed value
//! conversion, the tuple data model, the update-operation DSL, connection
//! selection strategies and the cluster proxy dispatcher with server-error
//! classification.
//!
//! Transport framing, authentication and space-format discovery are supplied
//! by the embedding application through the [`RpcClient`] and
//! [`SpaceMetadata`] boundaries.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tupledb_client::{
//!     default_mapper, BaseOptions, ParallelRoundRobinStrategy, PooledConnection,
//!     ProxyOperationsMapping, ProxySpace, SelectionConfig, SpaceMetadata,
//!     TupleUpdateOperations, UpdateOptions,
//! };
//! # fn transport(_addr: &str) -> Arc<dyn tupledb_client::RpcClient> { unimplemented!() }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), tupledb_client::ClientError> {
//!     let pool = vec![
//!         Arc::new(PooledConnection::new("10.0.0.1:3301", transport("10.0.0.1:3301"))),
//!         Arc::new(PooledConnection::new("10.0.0.2:3301", transport("10.0.0.2:3301"))),
//!     ];
//!     let strategy = Arc::new(ParallelRoundRobinStrategy::new(
//!         &SelectionConfig::default(),
//!         pool,
//!     ));
//!
//!     let books = ProxySpace::new(
//!         Arc::new(SpaceMetadata::new("books", ["id", "isbn", "title", "author", "year"])),
//!         Arc::new(default_mapper()),
//!         strategy,
//!         ProxyOperationsMapping::default(),
//!     );
//!
//!     let mut tuple = books.tuple();
//!     tuple.set(0, &4i64)?;
//!     tuple.set_by_name("title", &"Nineteen Eighty-Four".to_string())?;
//!     books.insert(&tuple, &BaseOptions::new().with_timeout(1000)).await?;
//!
//!     let mut key = books.tuple();
//!     key.set(0, &4i64)?;
//!     let bump_year = TupleUpdateOperations::add("year", 1);
//!     books.update(&key, &bump_year, &UpdateOptions::new()).await?;
//!     Ok(())
//! }
//! ```

pub mod connection;
pub mod error;
pub mod mapper;
pub mod metadata;
pub mod proxy;
pub mod tuple;

pub use rmpv::Value;

pub use connection::strategy::{
    ConnectionSelectionStrategy, ParallelRoundRobinStrategy, RoundRobinStrategy, SelectionConfig,
};
pub use connection::{CallResponse, PooledConnection, RpcClient};
pub use error::{classifier, ClientError, ClientResult};
pub use mapper::{default_mapper, ValueMapper, WireType};
pub use metadata::SpaceMetadata;
pub use proxy::options::{
    BaseOptions, DeleteOptions, InsertOptions, ReplaceOptions, SelectOptions, TruncateOptions,
    UpdateOptions, UpsertOptions,
};
pub use proxy::{ProxyOperationsMapping, ProxySpace};
pub use tuple::operations::{
    FieldLocator, OperationKind, TupleUpdateOperations, UpdateOperation,
};
pub use tuple::{Field, Tuple};
